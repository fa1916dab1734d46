use crate::{
    compile::job::{Backend, EncoderScale, Operation, TransformJob},
    foundation::error::{EngineError, EngineResult},
    metadata::parse_metadata_entries,
    params::{
        kind::{MediaKind, MetadataPolicy},
        set::{BASELINE_QUALITY, MAX_FRAME_RATE, ParameterSet},
    },
};

/// Freeze a parameter set into an executable [`TransformJob`].
///
/// Operation order is fixed: trim, scale, frame rate, quality, format, metadata. Trim, scale,
/// frame rate, and quality are emitted only when they differ from the source (quality 75 is the
/// "no change" baseline), so an untouched set compiles to a passthrough job.
///
/// Fails with [`EngineError::InvalidParameters`] when a cross-field invariant does not hold; no
/// partial job is produced.
#[tracing::instrument(skip(set), fields(kind = set.kind().as_str()))]
pub fn compile(set: &ParameterSet, backend: Backend) -> EngineResult<TransformJob> {
    validate(set, backend)?;

    let kind = set.kind();
    let stats = set.source_stats();
    let mut ops = Vec::with_capacity(6);

    if kind.has_duration()
        && let Some(duration) = stats.duration()
        && (set.trim_start() > 0.0 || set.trim_end() < duration)
    {
        ops.push(Operation::Trim {
            start: set.trim_start(),
            end: set.trim_end(),
        });
    }

    if kind.has_dimensions()
        && stats.dimensions() != Some((set.target_width(), set.target_height()))
    {
        ops.push(Operation::Scale {
            width: set.target_width(),
            height: set.target_height(),
        });
    }

    if kind == MediaKind::Video && set.frame_rate() != stats.frame_rate_or_assumed() {
        ops.push(Operation::SetFrameRate {
            fps: set.frame_rate(),
        });
    }

    if set.quality() != BASELINE_QUALITY {
        ops.push(Operation::SetQuality {
            scale: EncoderScale::for_quality(kind, set.quality()),
        });
    }

    ops.push(Operation::SetFormat {
        format: set.output_format(),
    });
    ops.push(Operation::SetMetadataPolicy {
        policy: set.metadata_policy().clone(),
    });

    tracing::debug!(ops = ops.len(), ?backend, "compiled transform job");
    Ok(TransformJob::new(set.clone(), backend, ops))
}

fn validate(set: &ParameterSet, backend: Backend) -> EngineResult<()> {
    let kind = set.kind();
    let stats = set.source_stats();

    if backend == Backend::Streaming && kind != MediaKind::Video {
        return Err(EngineError::invalid_parameters(format!(
            "real-time re-encoding needs a video source, got {}",
            kind.as_str()
        )));
    }

    if !kind.allowed_formats().contains(&set.output_format()) {
        return Err(EngineError::invalid_parameters(format!(
            "{} output is not available for {} sources",
            set.output_format(),
            kind.as_str()
        )));
    }

    if !(1..=100).contains(&set.quality()) {
        return Err(EngineError::invalid_parameters("quality must be within 1..=100"));
    }

    if kind.has_dimensions() {
        let (w, h) = (set.target_width(), set.target_height());
        if w == 0 || h == 0 {
            return Err(EngineError::invalid_parameters(format!(
                "target dimensions must be positive, got {w}x{h}"
            )));
        }
        let ar = stats.aspect_ratio().ok_or_else(|| {
            EngineError::invalid_parameters("source dimensions are not known")
        })?;
        if set.maintain_aspect() {
            let (wf, hf) = (f64::from(w), f64::from(h));
            if (hf - wf / ar).abs() > 1.0 && (wf - hf * ar).abs() > 1.0 {
                return Err(EngineError::invalid_parameters(format!(
                    "{w}x{h} does not keep the source aspect ratio {ar:.4}"
                )));
            }
        }
    }

    if kind == MediaKind::Video && !(1..=MAX_FRAME_RATE).contains(&set.frame_rate()) {
        return Err(EngineError::invalid_parameters(format!(
            "frame rate must be within 1..={MAX_FRAME_RATE}"
        )));
    }

    if kind.has_duration() {
        let duration = stats
            .duration()
            .ok_or_else(|| EngineError::invalid_parameters("source duration is not known"))?;
        let (start, end) = (set.trim_start(), set.trim_end());
        if !(start >= 0.0 && start < end && end <= duration) {
            return Err(EngineError::invalid_parameters(format!(
                "trim range {start}s..{end}s must satisfy 0 <= start < end <= {duration}s"
            )));
        }
    }

    if let MetadataPolicy::Edit(text) = set.metadata_policy() {
        parse_metadata_entries(text)
            .map_err(|e| EngineError::invalid_parameters(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiler.rs"]
mod tests;
