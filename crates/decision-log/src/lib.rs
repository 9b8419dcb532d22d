//! Append-only JSON-lines log of admission decisions.
//!
//! Every evaluated request can be recorded as a [`DecisionEntry`] holding the
//! host, a [`VisitorSummary`] and the [`RuleDecision`](rule_engine::RuleDecision)
//! that was reached. Lifecycle events (process start/stop, policy load) share
//! the same stream.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use decision_log::{DecisionEntry, DecisionEvent, DecisionSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (sink, handle) = DecisionSink::start("/var/log/sitegate/decisions.jsonl").await?;
//!
//! sink.record(DecisionEntry::new(
//!     DecisionEvent::ProcessStarted,
//!     serde_json::json!({"version": "0.1.0"}),
//! ))
//! .await;
//!
//! drop(sink);
//! handle.await?;
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod sink;
pub mod writer;

pub use entry::{DecisionEntry, DecisionEvent, VisitorSummary};
pub use sink::{DecisionSink, DEFAULT_CAPACITY};
pub use writer::{DecisionWriteError, DecisionWriter};
