use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::bot::dispatcher::Dispatcher;
use crate::bot::reply::{Reply, ReplySink, SinkError};

/// Prints replies as they are produced
pub struct ConsoleSink<W> {
    out: W,
}

impl<W> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ReplySink for ConsoleSink<W> {
    async fn send(&mut self, reply: Reply) -> Result<(), SinkError> {
        let line = match reply {
            Reply::Text { text } => format!("{}\n\n", text),
            Reply::Document {
                path,
                caption,
                byte_size,
            } => format!("[{}] {} ({} bytes)\n\n", caption, path.display(), byte_size),
        };
        self.out
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        self.out
            .flush()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }
}

/// Line-per-message transport over any reader/writer pair (stdin/stdout in the binary)
pub async fn run_console<R, W>(dispatcher: &Dispatcher, input: R, output: W) -> std::io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    let mut lines = input.lines();
    let mut sink = ConsoleSink::new(output);

    info!("Console transport ready, one command per line");
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        dispatcher.handle(&line, &mut sink).await;
    }

    Ok(sink.into_inner())
}
