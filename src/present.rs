//! Presentation adapter: feeds a run's progress to an interactive caller.
//!
//! Chunks accumulate. Each one is appended to what the caller already shows;
//! nothing is replaced. A run is triggered either by submitting a query
//! directly ([`stream_to`]) or by confirming a line at the prompt
//! ([`interactive`]); both go through the same pipeline, and every trigger
//! starts an independent run with its own trace id.

use std::io::Write;

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::Result;
use crate::manager::AnalysisManager;
use crate::service::ReasoningService;

/// Prompt shown before each interactive query.
pub const QUERY_PROMPT: &str = "What's your product idea?";

/// Everything a run has displayed so far.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Transcript {
    chunks: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    pub fn push(&mut self, chunk: impl Into<String>) {
        self.chunks.push(chunk.into());
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The most recent chunk; the report markdown once a run completes.
    pub fn last(&self) -> Option<&str> {
        self.chunks.last().map(String::as_str)
    }

    /// All chunks, separated by blank lines.
    pub fn render(&self) -> String {
        self.chunks.join("\n\n")
    }
}

/// Run `query` and write each chunk to `out` as soon as it arrives.
///
/// On failure the error is written after the chunks already shown and then
/// returned.
pub async fn stream_to<S, W>(
    manager: &AnalysisManager<S>,
    query: &str,
    out: &mut W,
) -> Result<Transcript>
where
    S: ReasoningService + 'static,
    W: Write,
{
    let mut transcript = Transcript::new();
    let mut chunks = Box::pin(manager.run(query));

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(text) => {
                if !transcript.is_empty() {
                    writeln!(out)?;
                }
                writeln!(out, "{}", text)?;
                out.flush()?;
                transcript.push(text);
            }
            Err(e) => {
                writeln!(out, "\nError: {}", e)?;
                out.flush()?;
                return Err(e);
            }
        }
    }
    Ok(transcript)
}

/// Prompt for queries on `input` until EOF or `exit`/`quit`, running one
/// analysis per non-empty line. A failed run is reported and the prompt
/// returns. Returns the number of runs that completed.
pub async fn interactive<S, R, W>(
    manager: &AnalysisManager<S>,
    input: R,
    out: &mut W,
) -> Result<usize>
where
    S: ReasoningService + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut completed = 0;

    loop {
        write!(out, "{} ", QUERY_PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        writeln!(out)?;
        match stream_to(manager, query, out).await {
            Ok(_) => completed += 1,
            Err(e) => tracing::warn!(error = %e, "Run failed"),
        }
        writeln!(out)?;
    }

    Ok(completed)
}
