use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Text of every text-bearing shape, slide by slide, each followed by a newline.
pub fn extract(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .context("Failed to open presentation")?;

    let mut text = String::new();
    for name in slide_parts(&mut archive)? {
        let xml = read_part(&mut archive, &name)?;
        for shape in shape_texts(&xml)? {
            text.push_str(&shape);
            text.push('\n');
        }
    }
    Ok(text)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut xml = String::new();
    archive.by_name(name)
        .with_context(|| format!("Presentation is missing {}", name))?
        .read_to_string(&mut xml)
        .with_context(|| format!("Failed to read {}", name))?;
    Ok(xml)
}

/// Slide part names in presentation order.
///
/// The order is the `p:sldIdLst` of `presentation.xml`, resolved through its
/// relationships. Decks without those parts fall back to the slide file numbers.
fn slide_parts<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let listed = archive.index_for_name(PRESENTATION).is_some()
        && archive.index_for_name(PRESENTATION_RELS).is_some();
    if !listed {
        log::debug!("No slide list in presentation, ordering slides by file name");
        let mut slides: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slides.sort();
        return Ok(slides.into_iter().map(|(_, name)| name).collect());
    }

    let targets = relationship_targets(&read_part(archive, PRESENTATION_RELS)?)?;
    slide_ids(&read_part(archive, PRESENTATION)?)?
        .into_iter()
        .map(|id| {
            targets.get(&id)
                .map(|target| part_name(target))
                .ok_or_else(|| anyhow::anyhow!("Slide relationship {} not found", id))
        })
        .collect()
}

fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Targets in `presentation.xml.rels` are relative to `ppt/` unless absolute.
fn part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

fn slide_ids(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"p:sldId" => {
                if let Some(id) = attribute(&e, b"r:id")? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Texts of the top-level shapes on one slide that carry a text body.
fn shape_texts(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut shapes = Vec::new();

    let mut group_depth = 0usize;
    let mut shape: Option<Vec<String>> = None;
    let mut has_body = false;
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"p:grpSp" => group_depth += 1,
                b"p:sp" if group_depth == 0 => {
                    shape = Some(Vec::new());
                    has_body = false;
                }
                b"p:txBody" if shape.is_some() => has_body = true,
                b"a:p" if shape.is_some() => paragraph = Some(String::new()),
                b"a:t" if paragraph.is_some() => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"a:p" => {
                    if let Some(paragraphs) = shape.as_mut() {
                        paragraphs.push(String::new());
                    }
                }
                b"a:br" => {
                    if let Some(p) = paragraph.as_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = paragraph.as_mut() {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"p:grpSp" => group_depth = group_depth.saturating_sub(1),
                b"a:t" => in_text = false,
                b"a:p" => {
                    if let (Some(paragraphs), Some(p)) = (shape.as_mut(), paragraph.take()) {
                        paragraphs.push(p);
                    }
                }
                b"p:sp" if group_depth == 0 => {
                    if let Some(paragraphs) = shape.take() {
                        if has_body {
                            shapes.push(paragraphs.join("\n"));
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(shapes)
}
