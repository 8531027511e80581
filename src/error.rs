use thiserror::Error;

/// Errors raised while applying a ledger event to the store.
///
/// `DependencyNotFound` is the one retryable variant: it signals that a
/// parent entity referenced by the event (e.g. the tier behind a
/// subscription purchase) has not been written yet because its own event is
/// still in flight on another poll cycle. The retry engine re-attempts the
/// resolution with backoff; everything else propagates immediately.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("malformed event payload: {0}")]
    Payload(String),

    #[error("store error: {0:#}")]
    Store(#[source] anyhow::Error),
}

impl HandlerError {
    /// Retryability predicate handed to the retry engine.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::DependencyNotFound(_))
    }

    pub fn payload(err: impl std::fmt::Display) -> Self {
        HandlerError::Payload(err.to_string())
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        HandlerError::Store(err)
    }
}
