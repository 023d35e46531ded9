// Error taxonomy for the Navigation Brain (spec §7).
//
// Public Brain entry points never propagate one of these across their
// boundary — they catch it internally and fold it into a success/message
// outcome (see `brain::tools`). `BrainError` exists so internal plumbing can
// match on *kind* (e.g. "was this recoverable?") without string-sniffing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrainError {
    /// OCR backend missing or failed. Non-fatal: callers continue with an
    /// empty element list.
    #[error("OCR unavailable: {0}")]
    PerceptionUnavailable(String),

    /// Capture or VLM returned nothing parseable while identifying a node.
    #[error("failed to identify current screen state: {0}")]
    IdentificationFailed(String),

    /// The VLM's learned plan was empty or under-confident (§4.C8 learning
    /// threshold).
    #[error("learned path rejected: {0}")]
    LearningRejected(String),

    /// A single action dispatch threw.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// Post-action OCR/VLM verification failed.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// Graph JSON failed to parse on load.
    #[error("graph file corrupted: {0}")]
    GraphCorruption(String),

    /// Provider signaled throttling and the single automatic retry also
    /// failed.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// OS input subsystem unusable. Not recoverable by retry.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl BrainError {
    /// Whether a caller should consider retrying the containing operation
    /// rather than aborting outright.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BrainError::Fatal(_))
    }
}
