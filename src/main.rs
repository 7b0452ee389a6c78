use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;
use handler::Cli;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use chat::ProviderKind;
use db::HistoryBackend;
use session::PromptSettings;

mod auth;
mod chat;
mod db;
mod document;
mod handler;
mod session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();
    let config = read_config()?;
    let args = Cli::parse();
    handler::handler(args, config).await?;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    // Chat
    provider: ProviderKind,

    openai_url: String,
    openai_chat_model: String,
    openai_api_key: String,

    deepseek_url: String,
    deepseek_chat_model: String,
    deepseek_api_key: String,

    // Prompt
    prompt_preamble: String,
    chat_system_prompt: String,
    document_warn_chars: usize,

    // History
    history_backend: HistoryBackend,
    history_db: PathBuf,

    // Auth
    auth_enabled: bool,
    cookie_file: PathBuf,
    cookie_key: String,
    cookie_expiry_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Openai,
            openai_url: "https://api.openai.com/v1/chat/completions".to_string(),
            openai_chat_model: "gpt-3.5-turbo".to_string(),
            openai_api_key: String::new(),
            deepseek_url: "https://api.deepseek.com/chat/completions".to_string(),
            deepseek_chat_model: "deepseek-chat".to_string(),
            deepseek_api_key: String::new(),
            prompt_preamble: "Here is a document: ".to_string(),
            chat_system_prompt: "You are a helpful assistant.".to_string(),
            document_warn_chars: 100_000,
            history_backend: HistoryBackend::Sqlite,
            history_db: PathBuf::from("history.db"),
            auth_enabled: false,
            cookie_file: PathBuf::from(".docqa_session"),
            cookie_key: "some_signature_key".to_string(),
            cookie_expiry_days: 30,
        }
    }
}

impl Config {
    pub fn prompt_settings(&self) -> PromptSettings {
        PromptSettings {
            preamble: self.prompt_preamble.clone(),
            chat_system_prompt: self.chat_system_prompt.clone(),
            warn_chars: self.document_warn_chars,
        }
    }
}

fn read_config() -> anyhow::Result<Config> {
    Ok(config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("DOCQA"))
        .build()?
        .try_deserialize::<Config>()?)
}
