use crate::params::{kind::MediaKind, set::ParameterSet};

/// Estimate the output size in bytes with the multiplicative cost model.
///
/// Factors, applied to the source byte size:
/// 1. kept duration fraction `(trim_end - trim_start) / duration` (audio/video)
/// 2. area ratio of target to source (image/video)
/// 3. frame-rate ratio against the source rate (video)
/// 4. `quality / 75`
/// 5. format factor (webm/ogg/webp 0.8, png 1.5, otherwise 1.0)
///
/// The result is advisory. Factors whose inputs are not known yet are skipped.
pub fn estimate_size(set: &ParameterSet) -> u64 {
    let stats = set.source_stats();
    let mut size = stats.byte_size as f64;

    if set.kind().has_duration()
        && let Some(duration) = stats.duration()
    {
        let kept = (set.trim_end() - set.trim_start()).max(0.0);
        size *= kept / duration;
    }

    if set.kind().has_dimensions()
        && let Some((sw, sh)) = stats.dimensions()
    {
        let target_area = f64::from(set.target_width()) * f64::from(set.target_height());
        size *= target_area / (f64::from(sw) * f64::from(sh));
    }

    if set.kind() == MediaKind::Video {
        size *= f64::from(set.frame_rate()) / f64::from(stats.frame_rate_or_assumed());
    }

    size *= f64::from(set.quality()) / 75.0;
    size *= set.output_format().size_factor();

    if size.is_finite() && size > 0.0 {
        size.round() as u64
    } else {
        0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/estimate/cost.rs"]
mod tests;
