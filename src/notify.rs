//! Stage notifications.
//!
//! The pipeline reports progress through a [`Notifier`] handed to it at
//! construction instead of a process-wide logger. The binary and server use
//! [`TracingNotifier`]; tests can pass their own recorder.

use std::fmt;

use crate::models::SuppressedFailure;

/// Resolution stages, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Library,
    Generation,
    KeywordIndex,
    Stock,
    /// Category enumeration by a generative provider.
    Enumeration,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Library => "library",
            Stage::Generation => "generation",
            Stage::KeywordIndex => "keyword-index",
            Stage::Stock => "stock",
            Stage::Enumeration => "enumeration",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Notifier: Send + Sync {
    /// A stage produced `count` records for `subject`.
    fn stage_resolved(&self, stage: Stage, subject: &str, count: usize);

    /// A stage produced nothing or failed; the pipeline moves on.
    fn stage_failed(&self, stage: Stage, subject: &str, reason: &str);

    /// A failure recorded instead of propagated.
    fn suppressed(&self, failure: &SuppressedFailure);
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn stage_resolved(&self, stage: Stage, subject: &str, count: usize) {
        tracing::info!(stage = stage.as_str(), subject, count, "stage resolved");
    }

    fn stage_failed(&self, stage: Stage, subject: &str, reason: &str) {
        tracing::warn!(stage = stage.as_str(), subject, reason, "stage failed");
    }

    fn suppressed(&self, failure: &SuppressedFailure) {
        tracing::debug!(
            source = %failure.source,
            item = %failure.item,
            reason = %failure.reason,
            "suppressed failure"
        );
    }
}
