use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

/// Something the bot sends back to the requester
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text { text: String },
    Document {
        path: PathBuf,
        caption: String,
        byte_size: u64,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Reply transport failed: {0}")]
    Transport(String),
}

/// Where replies go; implemented by each messaging transport
#[async_trait]
pub trait ReplySink: Send {
    async fn send(&mut self, reply: Reply) -> Result<(), SinkError>;
}

/// Buffers replies so a request/response transport can return them together
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub replies: Vec<Reply>,
}

#[async_trait]
impl ReplySink for CollectingSink {
    async fn send(&mut self, reply: Reply) -> Result<(), SinkError> {
        self.replies.push(reply);
        Ok(())
    }
}
