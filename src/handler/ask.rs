use std::io;
use std::path::PathBuf;

use crate::db::{open_store, HistoryBackend};
use crate::document::Upload;
use crate::session::{Outcome, Session};
use crate::Config;

use super::{account::current_user, provider_from_args, ProviderArgs};

pub async fn handle_ask(config: &Config, file: PathBuf, question: String, llm: ProviderArgs) -> anyhow::Result<()> {
    let owner = current_user(config)?;
    let Some(provider) = provider_from_args(config, llm) else {
        return Ok(());
    };
    if question.trim().is_empty() {
        println!("Please ask a question about the document.");
        return Ok(());
    }

    let upload = Upload::from_path(&file)?;
    log::info!("Asking {} about {}", provider.name(), upload.name);
    let store = open_store(config)?;
    let mut session = Session::new(provider, store, owner, config.prompt_settings());

    let mut stdout = io::stdout();
    let outcome = session.ask(&upload, &question, &mut stdout).await?;
    if let (Outcome::Answered(entry), HistoryBackend::Sqlite) = (outcome, config.history_backend) {
        println!("\n(saved as #{}, star it with `docqa history star {}`)", entry.id, entry.id);
    }
    Ok(())
}
