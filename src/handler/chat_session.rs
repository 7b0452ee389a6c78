use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::db::open_store;
use crate::document::Upload;
use crate::session::Session;
use crate::Config;

use super::history::{export, print_entries};
use super::{account::current_user, provider_from_args, ProviderArgs};

/// What a line typed at the chat prompt asks for.
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Quit,
    History,
    Starred,
    Star(i64),
    Export(&'a str),
    Invalid(&'static str),
    Message(&'a str),
    Empty,
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if line.eq_ignore_ascii_case("quit") {
        return Command::Quit;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Message(line);
    };
    let (name, arg) = rest.split_once(' ').map(|(n, a)| (n, a.trim())).unwrap_or((rest, ""));
    match name {
        "history" => Command::History,
        "starred" => Command::Starred,
        "star" => arg.parse()
            .map(Command::Star)
            .unwrap_or(Command::Invalid("usage: /star <id>")),
        "export" if !arg.is_empty() => Command::Export(arg),
        "export" => Command::Invalid("usage: /export <path>"),
        "quit" => Command::Quit,
        _ => Command::Message(line),
    }
}

pub async fn handle_chat_session(config: &Config, file: Option<PathBuf>, llm: ProviderArgs) -> anyhow::Result<()> {
    let owner = current_user(config)?;
    let Some(provider) = provider_from_args(config, llm) else {
        return Ok(());
    };
    let store = open_store(config)?;
    let mut session = Session::new(provider, store, owner, config.prompt_settings());
    let mut stdout = io::stdout();

    if let Some(path) = file {
        let upload = Upload::from_path(&path)?;
        if !session.attach_document(&upload, &mut stdout)? {
            return Ok(());
        }
    }

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        match session.document_name() {
            Some(name) => print!("[{}] Ask a question (type 'quit' to exit)>>> ", name),
            None => print!("Ask a question (type 'quit' to exit)>>> "),
        }
        stdout.flush()?;
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        match parse_command(&input) {
            Command::Quit => break,
            Command::Empty => continue,
            Command::History => print_entries(&mut stdout, &session.history()?, false)?,
            Command::Starred => print_entries(&mut stdout, &session.history()?, true)?,
            Command::Star(id) => match session.toggle_bookmark(id) {
                Ok(true) => println!("Starred #{}", id),
                Ok(false) => println!("Unstarred #{}", id),
                Err(err) => println!("{}", err),
            },
            Command::Export(path) => export(&session.history()?, Path::new(path))?,
            Command::Invalid(usage) => println!("{}", usage),
            Command::Message(message) => {
                println!();
                session.chat(message, &mut stdout).await?;
                println!();
            }
        }
    }

    Ok(())
}
