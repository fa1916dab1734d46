use crate::{
    foundation::error::{EngineError, EngineResult},
    metadata::parse_metadata_entries,
    params::kind::{MediaKind, MetadataPolicy, OutputFormat},
    params::set::{MAX_FRAME_RATE, ParameterSet},
};

/// A single field update requested by the caller.
///
/// Serialized as `{"field": "<name>", "value": ...}` with camelCase field names.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum ParamChange {
    /// Target width in pixels.
    TargetWidth(u32),
    /// Target height in pixels.
    TargetHeight(u32),
    /// Toggle aspect-ratio locking.
    MaintainAspect(bool),
    /// Output area as a percentage of the source area.
    SizeScalePercent(f64),
    /// Output width as a percentage of the source width.
    ResolutionScalePercent(f64),
    /// Quality in `1..=100`.
    Quality(u32),
    /// Output frame rate in `1..=60`.
    FrameRate(u32),
    /// Trim start in seconds.
    TrimStart(f64),
    /// Trim end in seconds; clamped to the source duration.
    TrimEnd(f64),
    /// Output format; must be allowed for the source kind.
    OutputFormat(OutputFormat),
    /// Preserve alpha for png/webp output.
    KeepTransparency(bool),
    /// Metadata handling.
    MetadataPolicy(MetadataPolicy),
    /// The source duration became known or changed.
    SourceDuration(f64),
}

impl ParamChange {
    /// camelCase name of the field this change targets.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::TargetWidth(_) => "targetWidth",
            Self::TargetHeight(_) => "targetHeight",
            Self::MaintainAspect(_) => "maintainAspect",
            Self::SizeScalePercent(_) => "sizeScalePercent",
            Self::ResolutionScalePercent(_) => "resolutionScalePercent",
            Self::Quality(_) => "quality",
            Self::FrameRate(_) => "frameRate",
            Self::TrimStart(_) => "trimStart",
            Self::TrimEnd(_) => "trimEnd",
            Self::OutputFormat(_) => "outputFormat",
            Self::KeepTransparency(_) => "keepTransparency",
            Self::MetadataPolicy(_) => "metadataPolicy",
            Self::SourceDuration(_) => "sourceDuration",
        }
    }

    /// Parse a `field=value` pair as typed on a command line.
    ///
    /// `metadataPolicy` takes `keep`, `remove`, or `edit:<text>`.
    pub fn parse_assignment(assignment: &str) -> EngineResult<Self> {
        let (field, value) = assignment.split_once('=').ok_or_else(|| {
            EngineError::invalid_value("assignment", format!("expected field=value, got '{assignment}'"))
        })?;
        let field = field.trim();
        let value = value.trim();

        fn num<T: std::str::FromStr>(field: &'static str, v: &str) -> EngineResult<T> {
            v.parse::<T>()
                .map_err(|_| EngineError::invalid_value(field, format!("'{v}' is not a number")))
        }
        fn flag(field: &'static str, v: &str) -> EngineResult<bool> {
            match v {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(EngineError::invalid_value(field, format!("'{v}' is not a boolean"))),
            }
        }

        Ok(match field {
            "targetWidth" | "width" => Self::TargetWidth(num("targetWidth", value)?),
            "targetHeight" | "height" => Self::TargetHeight(num("targetHeight", value)?),
            "maintainAspect" => Self::MaintainAspect(flag("maintainAspect", value)?),
            "sizeScalePercent" => Self::SizeScalePercent(num("sizeScalePercent", value)?),
            "resolutionScalePercent" => {
                Self::ResolutionScalePercent(num("resolutionScalePercent", value)?)
            }
            "quality" => Self::Quality(num("quality", value)?),
            "frameRate" => Self::FrameRate(num("frameRate", value)?),
            "trimStart" => Self::TrimStart(num("trimStart", value)?),
            "trimEnd" => Self::TrimEnd(num("trimEnd", value)?),
            "outputFormat" | "format" => Self::OutputFormat(OutputFormat::parse(value)?),
            "keepTransparency" => Self::KeepTransparency(flag("keepTransparency", value)?),
            "metadataPolicy" | "metadata" => Self::MetadataPolicy(match value {
                "keep" => MetadataPolicy::Keep,
                "remove" => MetadataPolicy::Remove,
                other => match other.strip_prefix("edit:") {
                    Some(text) => MetadataPolicy::Edit(text.replace("\\n", "\n")),
                    None => {
                        return Err(EngineError::invalid_value(
                            "metadataPolicy",
                            format!("expected keep, remove, or edit:<text>, got '{other}'"),
                        ));
                    }
                },
            }),
            other => {
                return Err(EngineError::invalid_value(
                    "assignment",
                    format!("unknown field '{other}'"),
                ));
            }
        })
    }
}

/// Apply one field change and recompute every dependent field.
///
/// Pure: returns a new set and leaves `set` untouched. On [`EngineError::InvalidValue`] the
/// caller keeps the prior set.
pub fn apply(set: &ParameterSet, change: &ParamChange) -> EngineResult<ParameterSet> {
    let mut next = set.clone();
    let field = change.field_name();

    match *change {
        ParamChange::TargetWidth(w) => {
            require_dimensions(set.kind, field)?;
            require_positive(field, w)?;
            next.target_width = w;
            if next.maintain_aspect
                && let Some(ar) = next.stats.aspect_ratio()
            {
                next.target_height = round_dim(f64::from(w) / ar);
            }
            sync_scale_percentages(&mut next);
        }
        ParamChange::TargetHeight(h) => {
            require_dimensions(set.kind, field)?;
            require_positive(field, h)?;
            next.target_height = h;
            if next.maintain_aspect
                && let Some(ar) = next.stats.aspect_ratio()
            {
                next.target_width = round_dim(f64::from(h) * ar);
            }
            sync_scale_percentages(&mut next);
        }
        ParamChange::MaintainAspect(on) => {
            require_dimensions(set.kind, field)?;
            next.maintain_aspect = on;
            if on
                && next.target_width > 0
                && let Some(ar) = next.stats.aspect_ratio()
            {
                next.target_height = round_dim(f64::from(next.target_width) / ar);
                sync_scale_percentages(&mut next);
            }
        }
        ParamChange::SizeScalePercent(pct) => {
            require_dimensions(set.kind, field)?;
            require_percent(field, pct)?;
            if let Some((sw, sh)) = next.stats.dimensions() {
                // Area tracks the byte-size proxy, so each side scales by the square root.
                let scale = (pct / 100.0).sqrt();
                next.target_width = round_dim(f64::from(sw) * scale);
                next.target_height = round_dim(f64::from(sh) * scale);
                sync_scale_percentages(&mut next);
            }
        }
        ParamChange::ResolutionScalePercent(pct) => {
            require_dimensions(set.kind, field)?;
            require_percent(field, pct)?;
            if let Some((sw, sh)) = next.stats.dimensions() {
                next.target_width = round_dim(f64::from(sw) * pct / 100.0);
                next.target_height = round_dim(f64::from(sh) * pct / 100.0);
                sync_scale_percentages(&mut next);
            }
        }
        ParamChange::Quality(q) => {
            if !(1..=100).contains(&q) {
                return Err(EngineError::invalid_value(field, "must be within 1..=100"));
            }
            next.quality = q as u8;
        }
        ParamChange::FrameRate(fr) => {
            if set.kind != MediaKind::Video {
                return Err(inactive(set.kind, field));
            }
            if !(1..=MAX_FRAME_RATE).contains(&fr) {
                return Err(EngineError::invalid_value(
                    field,
                    format!("must be within 1..={MAX_FRAME_RATE}"),
                ));
            }
            next.frame_rate = fr;
        }
        ParamChange::TrimStart(t) => {
            require_duration(set.kind, field)?;
            require_seconds(field, t)?;
            if let Some(d) = next.stats.duration()
                && t > d
            {
                return Err(EngineError::invalid_value(
                    field,
                    format!("{t}s is past the source duration of {d}s"),
                ));
            }
            next.trim_start = t;
        }
        ParamChange::TrimEnd(t) => {
            require_duration(set.kind, field)?;
            require_seconds(field, t)?;
            next.trim_end = match next.stats.duration() {
                Some(d) => t.min(d),
                None => t,
            };
        }
        ParamChange::OutputFormat(fmt) => {
            if !set.kind.allowed_formats().contains(&fmt) {
                return Err(EngineError::invalid_value(
                    field,
                    format!("{fmt} is not available for {} sources", set.kind.as_str()),
                ));
            }
            next.output_format = fmt;
        }
        ParamChange::KeepTransparency(on) => {
            next.keep_transparency = on;
        }
        ParamChange::MetadataPolicy(ref policy) => {
            if let MetadataPolicy::Edit(text) = policy {
                parse_metadata_entries(text)?;
            }
            next.metadata_policy = policy.clone();
        }
        ParamChange::SourceDuration(d) => {
            require_duration(set.kind, field)?;
            if !d.is_finite() || d <= 0.0 {
                return Err(EngineError::invalid_value(field, "must be a positive number of seconds"));
            }
            let was_known = next.stats.duration().is_some();
            next.stats.duration_secs = Some(d);
            next.trim_end = if was_known { next.trim_end.min(d) } else { d };
        }
    }

    Ok(next)
}

/// Apply a sequence of changes, stopping at the first rejected one.
pub fn apply_all<'a>(
    set: &ParameterSet,
    changes: impl IntoIterator<Item = &'a ParamChange>,
) -> EngineResult<ParameterSet> {
    let mut cur = set.clone();
    for change in changes {
        cur = apply(&cur, change)?;
    }
    Ok(cur)
}

fn sync_scale_percentages(set: &mut ParameterSet) {
    let Some((sw, sh)) = set.stats.dimensions() else {
        return;
    };
    let (w, h) = (f64::from(set.target_width), f64::from(set.target_height));
    let (sw, sh) = (f64::from(sw), f64::from(sh));
    set.size_scale_percent = ((w * h) / (sw * sh) * 100.0).clamp(1.0, 100.0);
    set.resolution_scale_percent = (w / sw * 100.0).clamp(1.0, 100.0);
}

fn round_dim(v: f64) -> u32 {
    v.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

fn inactive(kind: MediaKind, field: &'static str) -> EngineError {
    EngineError::invalid_value(field, format!("not applicable to {} sources", kind.as_str()))
}

fn require_dimensions(kind: MediaKind, field: &'static str) -> EngineResult<()> {
    if kind.has_dimensions() {
        Ok(())
    } else {
        Err(inactive(kind, field))
    }
}

fn require_duration(kind: MediaKind, field: &'static str) -> EngineResult<()> {
    if kind.has_duration() {
        Ok(())
    } else {
        Err(inactive(kind, field))
    }
}

fn require_positive(field: &'static str, v: u32) -> EngineResult<()> {
    if v == 0 {
        return Err(EngineError::invalid_value(field, "must be at least 1"));
    }
    Ok(())
}

fn require_percent(field: &'static str, pct: f64) -> EngineResult<()> {
    if !pct.is_finite() || !(1.0..=100.0).contains(&pct) {
        return Err(EngineError::invalid_value(field, "must be within 1..=100"));
    }
    Ok(())
}

fn require_seconds(field: &'static str, t: f64) -> EngineResult<()> {
    if !t.is_finite() || t < 0.0 {
        return Err(EngineError::invalid_value(field, "must be a non-negative number of seconds"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/params/solver.rs"]
mod tests;
