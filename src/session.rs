use std::io::Write;

use futures::StreamExt;

use crate::chat::{build_prompt, ChatProvider, ErrorPolicy, Role, Talk};
use crate::db::{HistoryEntry, HistoryStore, NewEntry};
use crate::document::{extract_upload, Upload, SUPPORTED_EXTENSIONS};

pub const EXTRACTION_FAILED: &str = "Could not extract text from file.";

/// Prompt wording shared by every question in a session.
#[derive(Debug, Clone)]
pub struct PromptSettings {
    pub preamble: String,
    pub chat_system_prompt: String,
    /// Documents longer than this are sent anyway, with a warning.
    pub warn_chars: usize,
}

#[derive(Debug)]
pub enum Outcome {
    Answered(HistoryEntry),
    ExtractionFailed,
    ProviderFailed(String),
}

/// State of one interaction: who is asking, which provider answers, the
/// running conversation and where answers are recorded.
pub struct Session {
    provider: Box<dyn ChatProvider>,
    store: Box<dyn HistoryStore>,
    owner: Option<String>,
    prompts: PromptSettings,
    talks: Vec<Talk>,
    document_name: Option<String>,
}

impl Session {
    pub fn new(
        provider: Box<dyn ChatProvider>,
        store: Box<dyn HistoryStore>,
        owner: Option<String>,
        prompts: PromptSettings,
    ) -> Self {
        let talks = Self::initial_talks(&prompts);
        Self {
            provider,
            store,
            owner,
            prompts,
            talks,
            document_name: None,
        }
    }

    fn initial_talks(prompts: &PromptSettings) -> Vec<Talk> {
        if prompts.chat_system_prompt.trim().is_empty() {
            Vec::new()
        } else {
            vec![Talk::new(Role::System, prompts.chat_system_prompt.clone())]
        }
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    fn extract<W: Write>(&self, upload: &Upload, out: &mut W) -> anyhow::Result<Option<String>> {
        let Some(document) = extract_upload(upload)? else {
            log::warn!("No text extracted from {} (supported: {})", upload.name, SUPPORTED_EXTENSIONS.join(", "));
            writeln!(out, "{}", EXTRACTION_FAILED)?;
            return Ok(None);
        };
        let chars = document.chars().count();
        if chars > self.prompts.warn_chars {
            log::warn!(
                "{} has {} characters; the whole document is sent without truncation",
                upload.name,
                chars
            );
        }
        Ok(Some(document))
    }

    /// Answers one question about one document.
    pub async fn ask<W: Write>(&mut self, upload: &Upload, question: &str, out: &mut W) -> anyhow::Result<Outcome> {
        let Some(document) = self.extract(upload, out)? else {
            return Ok(Outcome::ExtractionFailed);
        };
        let prompt = build_prompt(&self.prompts.preamble, &document, question);
        let talks = vec![Talk::new(Role::User, prompt)];

        match self.relay(&talks, out).await? {
            Ok(answer) => Ok(Outcome::Answered(self.record(question, answer, Some(upload.name.clone()))?)),
            Err(message) => Ok(Outcome::ProviderFailed(message)),
        }
    }

    /// Makes the document the context of the following chat turns.
    pub fn attach_document<W: Write>(&mut self, upload: &Upload, out: &mut W) -> anyhow::Result<bool> {
        let Some(document) = self.extract(upload, out)? else {
            return Ok(false);
        };
        let mut talks = Self::initial_talks(&self.prompts);
        talks.push(Talk::new(Role::System, format!("{}{}", self.prompts.preamble, document)));
        self.talks = talks;
        self.document_name = Some(upload.name.clone());
        log::info!("Chatting about {}", upload.name);
        Ok(true)
    }

    /// One turn of a multi-turn conversation.
    pub async fn chat<W: Write>(&mut self, message: &str, out: &mut W) -> anyhow::Result<Outcome> {
        self.talks.push(Talk::new(Role::User, message.to_string()));
        let talks = self.talks.clone();
        let reply = match self.relay(&talks, out).await {
            Ok(reply) => reply,
            Err(err) => {
                self.talks.pop();
                return Err(err);
            }
        };
        match reply {
            Ok(answer) => {
                self.talks.push(Talk::new(Role::Assistant, answer.clone()));
                let document_name = self.document_name.clone();
                Ok(Outcome::Answered(self.record(message, answer, document_name)?))
            }
            Err(message) => {
                self.talks.pop();
                Ok(Outcome::ProviderFailed(message))
            }
        }
    }

    pub fn history(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        self.store.list(self.owner.as_deref())
    }

    pub fn toggle_bookmark(&mut self, id: i64) -> anyhow::Result<bool> {
        self.store.toggle_bookmark(id, self.owner.as_deref())
    }

    fn record(&mut self, question: &str, answer: String, document_name: Option<String>) -> anyhow::Result<HistoryEntry> {
        let entry = self.store.append(NewEntry {
            owner: self.owner.clone(),
            question: question.to_string(),
            answer,
            document_name,
        })?;
        log::debug!("Recorded history entry {}", entry.id);
        Ok(entry)
    }

    /// Streams the answer to `out`. Errors the provider asks to report are
    /// printed and returned as the inner `Err`.
    async fn relay<W: Write>(&self, talks: &[Talk], out: &mut W) -> anyhow::Result<Result<String, String>> {
        match self.stream_answer(talks, out).await {
            Ok(answer) => Ok(Ok(answer)),
            Err(err) => match self.provider.error_policy() {
                ErrorPolicy::Report => {
                    log::error!("{} call failed: {:#}", self.provider.name(), err);
                    writeln!(out, "An error occurred: {}", err)?;
                    Ok(Err(err.to_string()))
                }
                ErrorPolicy::Propagate => Err(err),
            },
        }
    }

    async fn stream_answer<W: Write>(&self, talks: &[Talk], out: &mut W) -> anyhow::Result<String> {
        let mut tokens = self.provider.stream(talks).await?;
        let mut answer = String::new();
        while let Some(token) = tokens.next().await {
            let token = token?;
            out.write_all(token.as_bytes())?;
            out.flush()?;
            answer.push_str(&token);
        }
        writeln!(out)?;
        Ok(answer)
    }
}
