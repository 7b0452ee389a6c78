use std::pin::Pin;

use async_trait::async_trait;
use clap::ValueEnum;
use futures::Stream;
use serde::{Deserialize, Serialize};

pub mod deepseek;
pub mod openai;

use crate::Config;

/// Separator between the document and the question in a prompt.
pub const PROMPT_SEPARATOR: &str = " \n\n---\n\n ";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Talk {
    pub role: Role,
    pub content: String,
}

impl Talk {
    pub fn new(role: Role, content: String) -> Self {
        Self { role, content }
    }
}

/// Answer text as it arrives from the provider.
pub type TokenStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// What the caller does when a provider call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the current command with the error.
    Propagate,
    /// Show the message to the user and carry on.
    Report,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn stream(&self, talks: &[Talk]) -> anyhow::Result<TokenStream>;

    fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::Propagate
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Deepseek,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "OpenAI",
            ProviderKind::Deepseek => "DeepSeek",
        }
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Deepseek => "DEEPSEEK_API_KEY",
        }
    }
}

/// Picks the API key from the command line, then the config, then the environment.
pub fn resolve_api_key(kind: ProviderKind, config: &Config, flag: Option<String>) -> Option<String> {
    let configured = match kind {
        ProviderKind::Openai => &config.openai_api_key,
        ProviderKind::Deepseek => &config.deepseek_api_key,
    };
    flag.into_iter()
        .chain(std::iter::once(configured.clone()))
        .chain(std::env::var(kind.env_key()).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

pub fn build_provider(kind: ProviderKind, config: &Config, api_key: String) -> Box<dyn ChatProvider> {
    match kind {
        ProviderKind::Openai => Box::new(openai::StreamingClient::new(
            api_key,
            config.openai_chat_model.clone(),
            config.openai_url.clone(),
        )),
        ProviderKind::Deepseek => Box::new(deepseek::ChatClient::new(
            api_key,
            config.deepseek_chat_model.clone(),
            config.deepseek_url.clone(),
        )),
    }
}

/// The whole document is inlined; nothing is truncated.
pub fn build_prompt(preamble: &str, document: &str, question: &str) -> String {
    format!("{}{}{}{}", preamble, document, PROMPT_SEPARATOR, question)
}
