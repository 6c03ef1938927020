//! Destinations for the rendered markup. A sink is written to at most once
//! per run, and only with a complete document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tracing::info;

use crate::errors::{RenderError, RenderResult};
use crate::extract::RenderedDocument;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitReceipt {
    pub destination: String,
    pub bytes: usize,
}

#[async_trait]
pub trait OutputSink: Send {
    async fn emit(&mut self, document: RenderedDocument) -> RenderResult<EmitReceipt>;

    fn describe(&self) -> String;
}

/// Writes the markup to a file, replacing earlier content.
#[derive(Clone, Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutputSink for FileSink {
    async fn emit(&mut self, document: RenderedDocument) -> RenderResult<EmitReceipt> {
        let markup = document.into_string();
        tokio::fs::write(&self.path, markup.as_bytes())
            .await
            .map_err(|source| RenderError::EmissionError {
                destination: self.describe(),
                source,
            })?;
        info!("wrote to {}", self.path.display());
        Ok(EmitReceipt {
            destination: self.describe(),
            bytes: markup.len(),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Writes the markup followed by a newline to a byte stream.
#[derive(Debug)]
pub struct StreamSink<W> {
    writer: W,
    label: String,
}

/// The default destination.
pub type StdoutSink = StreamSink<Stdout>;

impl<W> StreamSink<W> {
    pub fn new(writer: W, label: impl Into<String>) -> Self {
        Self {
            writer,
            label: label.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl StdoutSink {
    pub fn stdout() -> Self {
        StreamSink::new(tokio::io::stdout(), "stdout")
    }
}

#[async_trait]
impl<W> OutputSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn emit(&mut self, document: RenderedDocument) -> RenderResult<EmitReceipt> {
        let mut payload = document.into_string();
        payload.push('\n');

        let written = async {
            self.writer.write_all(payload.as_bytes()).await?;
            self.writer.flush().await
        };
        if let Err(source) = written.await {
            return Err(RenderError::EmissionError {
                destination: self.describe(),
                source,
            });
        }
        Ok(EmitReceipt {
            destination: self.describe(),
            bytes: payload.len(),
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

pub fn sink_for(outfile: Option<&Path>) -> Box<dyn OutputSink> {
    match outfile {
        Some(path) => Box::new(FileSink::new(path)),
        None => Box::new(StdoutSink::stdout()),
    }
}
