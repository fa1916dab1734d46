use crate::{
    compile::job::{Backend, TransformJob},
    encode::{Artifact, Executor, ExternalEncoder},
    foundation::error::EncodeError,
};

/// Executes batch jobs with a single blocking call into an [`ExternalEncoder`].
pub struct BatchExecutor<E> {
    encoder: E,
}

impl<E: ExternalEncoder> BatchExecutor<E> {
    pub fn new(encoder: E) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Name of the file the encoder is asked to produce.
    pub fn output_name(job: &TransformJob) -> String {
        format!("output.{}", job.output_format().extension())
    }
}

impl<E: ExternalEncoder> Executor for BatchExecutor<E> {
    #[tracing::instrument(skip(self, job), fields(encoder = self.encoder.name(), kind = job.kind().as_str()))]
    fn execute(&mut self, job: &TransformJob) -> Result<Artifact, EncodeError> {
        if job.backend() != Backend::Batch {
            return Err(EncodeError::open(
                "batch executor received a streaming job",
            ));
        }

        let output_name = Self::output_name(job);
        let args = self.encoder.translate(job, &output_name);
        tracing::debug!(?args, "invoking external encoder");

        let bytes = self
            .encoder
            .invoke(job.source().bytes(), &args, &output_name)?;
        if bytes.is_empty() {
            return Err(EncodeError::read(format!(
                "{} produced an empty '{output_name}'",
                self.encoder.name()
            )));
        }

        tracing::debug!(bytes = bytes.len(), "external encoder finished");
        Ok(Artifact::new(bytes, job.output_mime()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/batch.rs"]
mod tests;
