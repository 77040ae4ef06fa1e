use anyhow::{Context, Result};
use indicatif::ProgressDrawTarget;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::credentials::Credential;
use crate::gateway::{ChatGateway, ChatRequest, ChatResponse};
use crate::model::Message;
use crate::progress::ProgressIndicator;

const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub finish_reason: Option<String>,
    pub raw: Value,
}

impl ChatReply {
    pub fn is_truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }

    pub fn display_text(&self) -> String {
        if self.is_truncated() {
            format!("{}{}", self.content, TRUNCATION_MARKER)
        } else {
            self.content.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub status: u16,
    pub status_text: String,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Answered(ChatReply),
    Unauthorized(ApiFailure),
    Failed(ApiFailure),
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

type DrawTargetFactory = Box<dyn Fn() -> ProgressDrawTarget + Send + Sync>;

pub struct QueryExecutor {
    gateway: Box<dyn ChatGateway>,
    model: String,
    system_prompt: String,
    progress_target: Option<DrawTargetFactory>,
}

impl QueryExecutor {
    pub fn new(gateway: Box<dyn ChatGateway>, cfg: &Config) -> Self {
        Self {
            gateway,
            model: cfg.model.clone(),
            system_prompt: cfg.system_prompt.clone(),
            progress_target: None,
        }
    }

    pub fn with_progress(
        mut self,
        target: impl Fn() -> ProgressDrawTarget + Send + Sync + 'static,
    ) -> Self {
        self.progress_target = Some(Box::new(target));
        self
    }

    pub fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::system(self.system_prompt.clone()), Message::user(prompt)],
        }
    }

    pub async fn send(&self, credential: &Credential, prompt: &str) -> Result<QueryOutcome> {
        let request = self.build_request(prompt);
        debug!(model = %request.model, prompt_len = prompt.len(), "submitting prompt");

        let indicator = self
            .progress_target
            .as_ref()
            .map(|target| ProgressIndicator::start(target()));
        let response = self.gateway.send(credential, request).await;
        if let Some(indicator) = indicator {
            indicator.stop();
        }

        classify(response?)
    }
}

pub fn classify(response: ChatResponse) -> Result<QueryOutcome> {
    let ChatResponse {
        status,
        status_text,
        body,
    } = response;

    match status {
        200 => {
            let reply = extract_reply(body)?;
            info!(
                finish_reason = reply.finish_reason.as_deref().unwrap_or("none"),
                reply_len = reply.content.len(),
                "received chat reply"
            );
            Ok(QueryOutcome::Answered(reply))
        }
        401 => {
            warn!("chat API rejected the API key");
            Ok(QueryOutcome::Unauthorized(ApiFailure {
                status,
                status_text,
                body,
            }))
        }
        _ => {
            warn!(status, status_text = %status_text, "chat API returned an error");
            Ok(QueryOutcome::Failed(ApiFailure {
                status,
                status_text,
                body,
            }))
        }
    }
}

fn extract_reply(body: Value) -> Result<ChatReply> {
    let completion = Completion::deserialize(&body)
        .context("Chat API returned a success status with an unexpected payload")?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .context("Chat API returned no choices")?;

    Ok(ChatReply {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        raw: body,
    })
}
