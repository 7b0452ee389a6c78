use serde::{Deserialize, Serialize};
use reqwest::Client;
use anyhow::Context;
use async_trait::async_trait;

use super::{ChatProvider, ErrorPolicy, Talk, TokenStream};

pub struct ChatClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl ChatClient {
    pub fn new(api_key: String, model: String, url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            url,
        }
    }

    pub async fn get_completion(&self, messages: &[Talk]) -> anyhow::Result<String> {
        let request = DSRequest {
            messages,
            model: &self.model,
            stream: false,
        };
        log::info!("Requesting completion from {} ({})", self.url, self.model);
        let response = self.client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| "Failed to send request to Deepseek API")?;

        if response.status() != 200 {
            return Err(anyhow::anyhow!(
                "Request failed:\n\tstatus: {}\n\tbody: {}",
                response.status(),
                response.text().await?
            ));
        }

        let response_body: DSResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse Deepseek API response.")?;

        response_body.into_content()
    }
}

#[async_trait]
impl ChatProvider for ChatClient {
    fn name(&self) -> &str {
        "deepseek"
    }

    async fn stream(&self, talks: &[Talk]) -> anyhow::Result<TokenStream> {
        let answer = self.get_completion(talks).await?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(answer)])))
    }

    fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::Report
    }
}

#[derive(Deserialize, Serialize, Debug)]
struct Choice {
    message: Talk,
}

#[derive(Serialize, Debug)]
struct DSRequest<'a> {
    messages: &'a [Talk],
    model: &'a str,
    stream: bool,
}

#[derive(Deserialize, Serialize, Debug)]
struct DSResponse {
    choices: Vec<Choice>,
}

impl DSResponse {
    fn into_content(self) -> anyhow::Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Deepseek API returned no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() -> anyhow::Result<()> {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Answer"},"finish_reason":"stop"}]}"#;
        let response: DSResponse = serde_json::from_str(body)?;
        assert_eq!(response.into_content()?, "Answer");
        Ok(())
    }

    #[test]
    fn test_empty_choices_is_error() -> anyhow::Result<()> {
        let response: DSResponse = serde_json::from_str(r#"{"choices":[]}"#)?;
        assert!(response.into_content().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() -> anyhow::Result<()> {
        let client = ChatClient::new(
            "key".to_string(),
            "deepseek-chat".to_string(),
            "http://127.0.0.1:9/chat/completions".to_string(),
        );
        let talks = vec![Talk::new(super::super::Role::User, "hello".to_string())];
        assert!(client.stream(&talks).await.is_err());
        Ok(())
    }
}
