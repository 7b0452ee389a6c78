use docx_rs::{read_docx, DocumentChild, InsertChild, ParagraphChild, Run, RunChild};

/// Paragraph texts in document order, one per line.
pub fn extract(bytes: &[u8]) -> anyhow::Result<String> {
    let document = read_docx(bytes)?;

    let mut paragraphs = Vec::new();
    for child in &document.document.children {
        if let DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            push_children(&p.children, &mut text);
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Runs directly in the paragraph, inside hyperlinks and inside tracked insertions.
fn push_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, text),
            ParagraphChild::Hyperlink(link) => push_children(&link.children, text),
            ParagraphChild::Insert(insert) => {
                for inserted in &insert.children {
                    if let InsertChild::Run(run) = inserted {
                        push_run(run, text);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run(run: &Run, text: &mut String) {
    for node in &run.children {
        match node {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}
