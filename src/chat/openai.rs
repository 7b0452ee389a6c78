use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, Talk, TokenStream};

/// OpenAI chat completions, requested as a server-sent event stream.
pub struct StreamingClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Talk],
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize, Debug)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug)]
struct StreamErrorDetail {
    message: String,
}

/// An `error` event sent in place of a chunk once the stream has started.
#[derive(Deserialize, Debug)]
struct StreamError {
    error: StreamErrorDetail,
}

impl StreamingClient {
    pub fn new(api_key: String, model: String, url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            url,
        }
    }
}

#[async_trait]
impl ChatProvider for StreamingClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream(&self, talks: &[Talk]) -> anyhow::Result<TokenStream> {
        let request = ChatRequest {
            model: &self.model,
            messages: talks,
            stream: true,
        };
        log::info!("Requesting streamed completion from {} ({})", self.url, self.model);
        let response = self.client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| "Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Request failed:\n\tstatus: {}\n\tbody: {}",
                response.status(),
                response.text().await?
            ));
        }

        let tokens = response
            .bytes_stream()
            .scan(SseDecoder::default(), |decoder, chunk| {
                let items = match chunk {
                    Ok(bytes) => decoder.push(&bytes),
                    Err(err) => vec![Err(anyhow::Error::new(err).context("OpenAI stream interrupted"))],
                };
                futures::future::ready(Some(futures::stream::iter(items)))
            })
            .flatten();
        Ok(Box::pin(tokens))
    }
}

/// Turns raw `data:` lines of a completion stream into content tokens.
///
/// Bytes are buffered until a full line is available, so events split across
/// network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<anyhow::Result<String>> {
        let mut tokens = Vec::new();
        if self.done {
            return tokens;
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                self.done = true;
                self.buffer.clear();
                break;
            }
            if let Ok(StreamError { error }) = serde_json::from_str::<StreamError>(data) {
                tokens.push(Err(anyhow::anyhow!("OpenAI stream error: {}", error.message)));
                self.done = true;
                self.buffer.clear();
                break;
            }
            match serde_json::from_str::<ChatChunk>(data) {
                Ok(chunk) => {
                    if let Some(content) = chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
                        if !content.is_empty() {
                            tokens.push(Ok(content));
                        }
                    }
                }
                Err(err) => log::debug!("Skipping unparsable stream event: {}", err),
            }
        }
        tokens
    }
}
