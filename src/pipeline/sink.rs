// src/pipeline/sink.rs
// =============================================================================
// The default place updated repositories go.
//
// Each changed repository is written as one JSON object per line (JSON
// Lines), carrying everything a pull request needs: ids, default branch and
// the new README text. Another process (or a queue consumer) can pick these
// up and open the pull requests.
// =============================================================================

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use super::PullRequestSink;
use crate::github::Repository;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("could not serialize repository: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonLinesSink<Box<dyn Write + Send>> {
    // Writes to `path`, or to stdout when no path is given.
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        let writer: Box<dyn Write + Send> = match path {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(io::stdout()),
        };
        Ok(Self::new(writer))
    }
}

#[async_trait]
impl<W: Write + Send> PullRequestSink for JsonLinesSink<W> {
    async fn submit(&self, repository: Repository) -> Result<(), HandoffError> {
        let line = serde_json::to_string(&repository)?;

        // Blocking write: one short line per changed repository. The lock
        // is never held across an await, so concurrent units just take turns.
        // A poisoned lock only means another writer panicked mid-line.
        let mut writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}
