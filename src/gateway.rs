use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::credentials::Credential;
use crate::http_errors::chat_api_request_error;
use crate::model::Message;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Value,
}

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<ChatResponse>> + Send + 'a>>;

pub trait ChatGateway: Send + Sync {
    fn send<'a>(&'a self, credential: &'a Credential, request: ChatRequest) -> ChatFuture<'a>;
}

pub struct HttpChatGateway {
    client: Client,
    api_url: String,
    timeout_secs: Option<u64>,
}

impl HttpChatGateway {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = cfg.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("Failed to initialize HTTP client")?;

        Ok(Self {
            client,
            api_url: chat_url(&cfg.api_base_url),
            timeout_secs: cfg.request_timeout_secs,
        })
    }
}

fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

impl ChatGateway for HttpChatGateway {
    fn send<'a>(&'a self, credential: &'a Credential, request: ChatRequest) -> ChatFuture<'a> {
        Box::pin(async move {
            debug!(
                api_url = %self.api_url,
                model = %request.model,
                message_count = request.messages.len(),
                "sending chat completion request"
            );

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(credential.expose())
                .json(&request)
                .send()
                .await
                .map_err(|err| {
                    warn!(api_url = %self.api_url, error = %err, "chat request failed");
                    chat_api_request_error(err, &self.api_url, self.timeout_secs)
                })?;

            let status = response.status();
            let text = response
                .text()
                .await
                .context("Failed to read chat API response body")?;
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            debug!(status = status.as_u16(), "received chat completion response");

            Ok(ChatResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            })
        })
    }
}
