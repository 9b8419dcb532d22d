use anyhow::Result;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::gate::Gate;
use crate::request::RequestSpec;

/// Counters reported at the end of a batch run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub allowed: usize,
    pub denied: usize,
    pub errors: usize,
}

/// Evaluate one JSON request per input line, writing one JSON result per line.
///
/// Blank lines are skipped. A line that cannot be parsed or evaluated
/// produces `{"line": n, "error": "..."}` and processing continues. Only I/O
/// failures abort the run.
pub async fn run<R, W>(gate: &Gate, input: R, mut output: W) -> Result<BatchStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = BatchStats::default();
    let mut lines = input.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<RequestSpec>(&line) {
            Ok(request) => gate.check(&request).await,
            Err(e) => Err(e.into()),
        };

        let value = match result {
            Ok(outcome) => {
                if outcome.allowed {
                    stats.allowed += 1;
                } else {
                    stats.denied += 1;
                }
                serde_json::to_value(&outcome)?
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed request");
                stats.errors += 1;
                json!({ "line": line_no, "error": format!("{e:#}") })
            }
        };

        let mut buf = serde_json::to_vec(&value)?;
        buf.push(b'\n');
        output.write_all(&buf).await?;
    }

    output.flush().await?;
    debug!(?stats, "batch finished");
    Ok(stats)
}
