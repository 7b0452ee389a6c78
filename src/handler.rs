use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};
use crate::chat::{self, ChatProvider, ProviderKind};
use crate::Config;

mod account;
mod ask;
mod chat_session;
mod history;
mod write;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask an LLM questions about your documents", version = "0.1")]
pub enum Cli {
    /// Ask one question about a document
    Ask {
        #[arg(help = "Document to ask about (.txt .md .pdf .docx .xlsx .pptx)")]
        file: PathBuf,

        #[arg(short, long, help = "Question about the document")]
        question: String,

        #[command(flatten)]
        llm: ProviderArgs,
    },

    /// Start an interactive chat
    Chat {
        #[arg(short, long, help = "Document to chat about")]
        file: Option<PathBuf>,

        #[command(flatten)]
        llm: ProviderArgs,
    },

    /// Browse, star and export past answers
    #[command(subcommand)]
    History(HistoryCommand),

    /// Log in as one of the configured users
    Login {
        #[arg(help = "User name")]
        username: String,

        #[arg(long, help = "Password (read from stdin when omitted)")]
        password: Option<String>,
    },

    /// Forget the current login
    Logout,

    /// Show the logged in user
    Whoami,
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List past answers, most recent first
    List {
        #[arg(long, help = "Only starred entries")]
        starred: bool,
    },

    /// Star or unstar an entry
    Star {
        #[arg(help = "Entry id")]
        id: i64,
    },

    /// Export history as JSON, or as Excel when the path ends in .xlsx
    Export {
        #[arg(help = "Output file path")]
        path: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    #[arg(long, value_enum, help = "LLM provider")]
    pub provider: Option<ProviderKind>,

    #[arg(long, help = "Provider API key")]
    pub api_key: Option<String>,
}

pub async fn handler(args: Cli, config: Config) -> anyhow::Result<()> {
    match args {
        Cli::Ask { file, question, llm } => ask::handle_ask(&config, file, question, llm).await,
        Cli::Chat { file, llm } => chat_session::handle_chat_session(&config, file, llm).await,
        Cli::History(cmd) => history::handle_history_command(&config, cmd),
        Cli::Login { username, password } => account::login(&config, &username, password),
        Cli::Logout => account::logout(&config),
        Cli::Whoami => account::whoami(&config),
    }
}

/// The provider to use, or `None` (after telling the user) when no key is known.
fn provider_from_args(config: &Config, args: ProviderArgs) -> Option<Box<dyn ChatProvider>> {
    let kind = args.provider.unwrap_or(config.provider);
    match chat::resolve_api_key(kind, config, args.api_key) {
        Some(key) => Some(chat::build_provider(kind, config, key)),
        None => {
            println!("Please enter your {} API key (--api-key or {}).", kind.label(), kind.env_key());
            None
        }
    }
}
