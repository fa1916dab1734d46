//! Job executors and the encoder collaborators they drive.

use crate::{compile::job::TransformJob, foundation::error::EncodeError};

pub(crate) mod batch;
pub(crate) mod ffmpeg;
pub(crate) mod image_codec;

/// Transformed output. Owned by the caller once returned.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Vec<u8>,
    mime: &'static str,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, mime: &'static str) -> Self {
        Self { bytes, mime }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("mime", &self.mime)
            .field("byte_size", &self.bytes.len())
            .finish()
    }
}

/// Runs a compiled job to completion.
///
/// A failed run yields no partial artifact and is never retried internally.
pub trait Executor: Send {
    fn execute(&mut self, job: &TransformJob) -> Result<Artifact, EncodeError>;
}

/// External encoding tool invoked once over the whole input.
///
/// `translate` renders a job into the tool's own argument grammar; `invoke` runs the tool
/// with the input bytes placed in its namespace and returns the bytes of `output_name`.
pub trait ExternalEncoder: Send {
    /// Short tool name used in logs.
    fn name(&self) -> &'static str;

    fn translate(&self, job: &TransformJob, output_name: &str) -> Vec<String>;

    fn invoke(
        &mut self,
        input: &[u8],
        args: &[String],
        output_name: &str,
    ) -> Result<Vec<u8>, EncodeError>;
}
