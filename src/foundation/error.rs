use crate::host::FlowError;

/// Result type used across the demuxer.
pub type DemuxResult<T> = Result<T, DemuxError>;

/// Error taxonomy of the element.
#[derive(thiserror::Error, Debug)]
pub enum DemuxError {
    /// The engine rejected the document bytes.
    #[error("parse error: {0}")]
    Parse(String),

    /// The document lacks a feature playback needs.
    #[error("missing feature: {0}")]
    MissingFeature(String),

    /// No output format or buffer pool could be agreed downstream.
    #[error("negotiation error: {0}")]
    Negotiation(String),

    /// Downstream refused a buffer or event.
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),

    /// An embedded video provider failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// A resource could not be loaded.
    #[error("io error: {0}")]
    Io(String),

    /// Invalid settings or caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation is not valid in the current state.
    #[error("state error: {0}")]
    State(String),

    /// Wrapped lower-level error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DemuxError {
    /// Build a [`DemuxError::Parse`] value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Build a [`DemuxError::MissingFeature`] value.
    pub fn missing_feature(msg: impl Into<String>) -> Self {
        Self::MissingFeature(msg.into())
    }

    /// Build a [`DemuxError::Negotiation`] value.
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Self::Negotiation(msg.into())
    }

    /// Build a [`DemuxError::Provider`] value.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Build a [`DemuxError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`DemuxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DemuxError::State`] value.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Whether this error belongs to the fatal-setup class (reported once on the bus, no frames).
    pub fn is_fatal_setup(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::MissingFeature(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
