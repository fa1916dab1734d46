/// Convenience result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The declared artifact type is not an image, audio, or video type.
    #[error("unsupported media kind: {0}")]
    UnsupportedKind(String),

    /// Source metadata could not be read.
    #[error("probe error: {0}")]
    Probe(String),

    /// A single field update violates the field's own range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the rejected field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The parameter set as a whole violates a cross-field invariant.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A transformation job failed inside an encoder backend.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Engine configuration could not be loaded or is inconsistent.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Build an [`EngineError::UnsupportedKind`] value.
    pub fn unsupported_kind(msg: impl Into<String>) -> Self {
        Self::UnsupportedKind(msg.into())
    }

    /// Build an [`EngineError::Probe`] value.
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Build an [`EngineError::InvalidValue`] value.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Build an [`EngineError::InvalidParameters`] value.
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// Build an [`EngineError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Return `true` when the caller must drop the loaded source and start over.
    ///
    /// Every other failure leaves the prior parameter set usable.
    pub fn resets_source(&self) -> bool {
        matches!(self, Self::Probe(_) | Self::UnsupportedKind(_))
    }
}

/// Pipeline stage at which an encoder backend failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeStage {
    /// Opening the encoder or attaching it to a surface.
    Open,
    /// Handing input bytes or frames to the encoder.
    Write,
    /// Running the encoder itself.
    Run,
    /// Reading the produced output back.
    Read,
    /// Stopping the encoder and flushing its buffered output.
    Flush,
}

impl std::fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Write => "write",
            Self::Run => "run",
            Self::Read => "read",
            Self::Flush => "flush",
        };
        f.write_str(s)
    }
}

/// Failure reported by an encoder backend. Aborts the in-flight job.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("encode error ({stage}): {message}")]
pub struct EncodeError {
    /// Stage that failed.
    pub stage: EncodeStage,
    /// Single-line description of the failure.
    pub message: String,
}

impl EncodeError {
    /// Create an error for `stage`.
    pub fn new(stage: EncodeStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Shorthand for [`EncodeStage::Open`].
    pub fn open(message: impl Into<String>) -> Self {
        Self::new(EncodeStage::Open, message)
    }

    /// Shorthand for [`EncodeStage::Write`].
    pub fn write(message: impl Into<String>) -> Self {
        Self::new(EncodeStage::Write, message)
    }

    /// Shorthand for [`EncodeStage::Run`].
    pub fn run(message: impl Into<String>) -> Self {
        Self::new(EncodeStage::Run, message)
    }

    /// Shorthand for [`EncodeStage::Read`].
    pub fn read(message: impl Into<String>) -> Self {
        Self::new(EncodeStage::Read, message)
    }

    /// Shorthand for [`EncodeStage::Flush`].
    pub fn flush(message: impl Into<String>) -> Self {
        Self::new(EncodeStage::Flush, message)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
