//! Unified error taxonomy for the registry, props, and source machinery.
//!
//! Mirrors the error kinds a source, a converter, and the declaration parser
//! can each raise, keeping them in one enum so callers have a single `Result`
//! type to match on regardless of which layer produced the failure.

use std::fmt;
use std::sync::Arc;

/// Boxed, cloneable cause shared across error variants and subscriber dispatch.
///
/// `Arc` rather than `Box` because the same cause is often handed to several
/// error subscribers (SubscriberProxy fan-out) and to a PropGroup's holder.
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The unified error type propagated by props, the registry, and declaration
/// parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum PropsError {
    /// A source's backing store could not be read. The prior snapshot for
    /// that layer remains authoritative; this is reported for diagnostics
    /// only and never prevents the registry from serving stale-but-present
    /// values.
    #[error("source {source_id} unavailable: {context}")]
    SourceUnavailable { source_id: String, context: String },

    /// A converter rejected a raw value.
    #[error("conversion failed for key {key}: {context}")]
    ConversionFailed {
        key: String,
        context: String,
        #[source]
        cause: Option<ErrorCause>,
    },

    /// A prop-specific validator rejected a converted value.
    #[error("validation failed for key {key}: {context}")]
    ValidationFailed { key: String, context: String },

    /// At least one member of a PropGroup errored during its
    /// construction-time snapshot read.
    #[error("prop group failed to read {} of its members: {}", causes.len(), ErrorKindList(causes))]
    MultiValueRead { causes: Vec<PropsError> },

    /// The declaration parser hit an unknown source type or a malformed
    /// line.
    #[error("invalid source declaration at line {line}: {context}")]
    InvalidConfig { line: usize, context: String },

    /// A subscriber handler panicked; isolated via `catch_unwind` and never
    /// surfaced to the producer that triggered it.
    #[error("subscriber handler panicked: {context}")]
    SubscriberPanic { context: String },
}

impl PropsError {
    pub fn source_unavailable(source_id: impl Into<String>, context: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            context: context.into(),
        }
    }

    pub fn conversion_failed(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ConversionFailed {
            key: key.into(),
            context: context.into(),
            cause: None,
        }
    }

    pub fn conversion_failed_with_cause(
        key: impl Into<String>,
        context: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConversionFailed {
            key: key.into(),
            context: context.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn validation_failed(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ValidationFailed {
            key: key.into(),
            context: context.into(),
        }
    }

    pub fn invalid_config(line: usize, context: impl Into<String>) -> Self {
        Self::InvalidConfig {
            line,
            context: context.into(),
        }
    }

    pub fn subscriber_panic(context: impl Into<String>) -> Self {
        Self::SubscriberPanic {
            context: context.into(),
        }
    }

    /// A stable, machine-readable category for metrics/log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::ConversionFailed { .. } => "conversion_failed",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::MultiValueRead { .. } => "multi_value_read",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::SubscriberPanic { .. } => "subscriber_panic",
        }
    }
}

/// Recovers a displayable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Small display helper used when formatting `MultiValueRead` causes inline.
pub struct ErrorKindList<'a>(pub &'a [PropsError]);

impl fmt::Display for ErrorKindList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
