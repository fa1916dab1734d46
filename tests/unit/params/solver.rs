use super::*;
use crate::params::set::{SourceRef, SourceStats};

fn video_set() -> ParameterSet {
    ParameterSet::populated(
        MediaKind::Video,
        SourceRef::new(vec![0u8; 8], "video/mp4"),
        SourceStats {
            duration_secs: Some(10.0),
            width: Some(1920),
            height: Some(1080),
            frame_rate: Some(30),
            byte_size: 10_000_000,
        },
    )
}

fn image_set(w: u32, h: u32) -> ParameterSet {
    ParameterSet::populated(
        MediaKind::Image,
        SourceRef::new(vec![0u8; 8], "image/png"),
        SourceStats {
            width: Some(w),
            height: Some(h),
            byte_size: 400_000,
            ..SourceStats::default()
        },
    )
}

fn audio_set() -> ParameterSet {
    ParameterSet::populated(
        MediaKind::Audio,
        SourceRef::new(vec![0u8; 8], "audio/mpeg"),
        SourceStats {
            duration_secs: Some(10.0),
            byte_size: 1_000_000,
            ..SourceStats::default()
        },
    )
}

#[test]
fn width_change_derives_height_from_aspect() {
    let set = apply(&video_set(), &ParamChange::TargetWidth(1280)).unwrap();
    assert_eq!(set.target_width(), 1280);
    assert_eq!(set.target_height(), 720);
    assert!((set.resolution_scale_percent() - 66.666_666).abs() < 1e-3);
    assert!((set.size_scale_percent() - 44.444_444).abs() < 1e-3);
}

#[test]
fn height_change_derives_width_from_aspect() {
    let set = apply(&video_set(), &ParamChange::TargetHeight(540)).unwrap();
    assert_eq!((set.target_width(), set.target_height()), (960, 540));
}

#[test]
fn unlocked_aspect_changes_one_side_only() {
    let set = apply(&video_set(), &ParamChange::MaintainAspect(false)).unwrap();
    let set = apply(&set, &ParamChange::TargetWidth(1000)).unwrap();
    assert_eq!((set.target_width(), set.target_height()), (1000, 1080));
}

#[test]
fn relocking_aspect_resyncs_height() {
    let set = apply(&video_set(), &ParamChange::MaintainAspect(false)).unwrap();
    let set = apply(&set, &ParamChange::TargetWidth(960)).unwrap();
    assert_eq!(set.target_height(), 1080);
    let set = apply(&set, &ParamChange::MaintainAspect(true)).unwrap();
    assert_eq!(set.target_height(), 540);
}

#[test]
fn size_percent_scales_area_not_sides() {
    let set = apply(&image_set(1000, 500), &ParamChange::SizeScalePercent(25.0)).unwrap();
    assert_eq!((set.target_width(), set.target_height()), (500, 250));
    assert!((set.size_scale_percent() - 25.0).abs() < 1e-9);
    assert!((set.resolution_scale_percent() - 50.0).abs() < 1e-9);
}

#[test]
fn resolution_percent_scales_sides_linearly() {
    let set = apply(&image_set(1000, 500), &ParamChange::ResolutionScalePercent(25.0)).unwrap();
    assert_eq!((set.target_width(), set.target_height()), (250, 125));
    assert!((set.size_scale_percent() - 6.25).abs() < 1e-9);
    assert!((set.resolution_scale_percent() - 25.0).abs() < 1e-9);
}

#[test]
fn dimensions_never_round_below_one() {
    let set = apply(&image_set(3, 1000), &ParamChange::ResolutionScalePercent(1.0)).unwrap();
    assert_eq!(set.target_width(), 1);
    assert_eq!(set.target_height(), 10);

    let set = apply(&image_set(1000, 1), &ParamChange::TargetWidth(10)).unwrap();
    assert_eq!(set.target_height(), 1);
}

#[test]
fn derived_percentages_clamp_to_slider_range() {
    let set = apply(&image_set(100, 100), &ParamChange::TargetWidth(400)).unwrap();
    assert_eq!(set.target_height(), 400);
    assert_eq!(set.size_scale_percent(), 100.0);
    assert_eq!(set.resolution_scale_percent(), 100.0);
}

#[test]
fn apply_is_idempotent() {
    let base = video_set();
    let changes = [
        ParamChange::TargetWidth(1279),
        ParamChange::TargetHeight(333),
        ParamChange::SizeScalePercent(37.0),
        ParamChange::ResolutionScalePercent(51.5),
        ParamChange::Quality(12),
        ParamChange::FrameRate(24),
        ParamChange::TrimStart(1.5),
        ParamChange::TrimEnd(20.0),
        ParamChange::MaintainAspect(true),
        ParamChange::OutputFormat(OutputFormat::Webm),
        ParamChange::MetadataPolicy(MetadataPolicy::Remove),
    ];
    for change in &changes {
        let once = apply(&base, change).unwrap();
        let twice = apply(&once, change).unwrap();
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap(),
            "{change:?}"
        );
    }
}

#[test]
fn aspect_is_kept_within_rounding_for_many_widths() {
    let base = image_set(1366, 768);
    let ar = 1366.0 / 768.0;
    for w in (1..2000).step_by(37) {
        let set = apply(&base, &ParamChange::TargetWidth(w)).unwrap();
        let got = f64::from(set.target_width()) / f64::from(set.target_height());
        assert!(
            (got.round() - f64::round(ar)).abs() <= 1.0,
            "w={w} h={}",
            set.target_height()
        );
    }
    for h in (1..2000).step_by(41) {
        let set = apply(&base, &ParamChange::TargetHeight(h)).unwrap();
        let got = f64::from(set.target_width()) / f64::from(set.target_height());
        assert!((got.round() - f64::round(ar)).abs() <= 1.0, "h={h}");
    }
}

#[test]
fn trim_end_is_clamped_to_duration() {
    let set = apply(&video_set(), &ParamChange::TrimEnd(20.0)).unwrap();
    assert_eq!(set.trim_end(), 10.0);
    let set = apply(&set, &ParamChange::TrimEnd(4.0)).unwrap();
    assert_eq!(set.trim_end(), 4.0);
}

#[test]
fn shrinking_duration_clamps_trim_end() {
    let set = apply(&audio_set(), &ParamChange::SourceDuration(6.0)).unwrap();
    assert_eq!(set.source_stats().duration_secs, Some(6.0));
    assert_eq!(set.trim_end(), 6.0);
}

#[test]
fn duration_becoming_known_opens_the_trim_window() {
    let set = ParameterSet::empty(MediaKind::Audio, SourceRef::new(vec![1u8; 4], "audio/wav"));
    assert_eq!(set.trim_end(), 0.0);
    let set = apply(&set, &ParamChange::SourceDuration(12.5)).unwrap();
    assert_eq!(set.trim_end(), 12.5);
}

#[test]
fn solver_noops_linking_before_dimensions_are_known() {
    let set = ParameterSet::empty(MediaKind::Video, SourceRef::new(vec![1u8; 4], "video/mp4"));
    let set = apply(&set, &ParamChange::TargetWidth(640)).unwrap();
    assert_eq!(set.target_width(), 640);
    assert_eq!(set.target_height(), 0);
    assert_eq!(set.size_scale_percent(), 100.0);

    let same = apply(&set, &ParamChange::SizeScalePercent(50.0)).unwrap();
    assert_eq!(same.target_width(), 640);
}

#[test]
fn out_of_range_values_are_rejected_and_prior_set_survives() {
    let base = video_set();
    let bad = [
        ParamChange::Quality(0),
        ParamChange::Quality(101),
        ParamChange::FrameRate(0),
        ParamChange::FrameRate(61),
        ParamChange::TargetWidth(0),
        ParamChange::SizeScalePercent(0.5),
        ParamChange::ResolutionScalePercent(150.0),
        ParamChange::TrimStart(-1.0),
        ParamChange::TrimStart(11.0),
        ParamChange::TrimEnd(f64::NAN),
        ParamChange::OutputFormat(OutputFormat::Png),
        ParamChange::SourceDuration(0.0),
    ];
    for change in &bad {
        let err = apply(&base, change).unwrap_err();
        match err {
            EngineError::InvalidValue { field, .. } => assert_eq!(field, change.field_name()),
            other => panic!("unexpected error for {change:?}: {other}"),
        }
    }
    assert_eq!(base.quality(), 75);
    assert_eq!(base.target_width(), 1920);
}

#[test]
fn kind_inactive_fields_are_rejected() {
    assert!(apply(&audio_set(), &ParamChange::TargetWidth(10)).is_err());
    assert!(apply(&audio_set(), &ParamChange::FrameRate(24)).is_err());
    assert!(apply(&image_set(10, 10), &ParamChange::TrimEnd(1.0)).is_err());
    assert!(apply(&image_set(10, 10), &ParamChange::FrameRate(24)).is_err());
}

#[test]
fn malformed_metadata_edit_is_rejected() {
    let err = apply(
        &video_set(),
        &ParamChange::MetadataPolicy(MetadataPolicy::Edit("no separator here".to_string())),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidValue { field: "metadataPolicy", .. }));
}

#[test]
fn apply_all_stops_at_first_rejection() {
    let changes = vec![ParamChange::Quality(50), ParamChange::Quality(500)];
    assert!(apply_all(&video_set(), &changes).is_err());
    let ok = apply_all(&video_set(), &changes[..1]).unwrap();
    assert_eq!(ok.quality(), 50);
}

#[test]
fn assignments_parse_from_cli_text() {
    assert_eq!(
        ParamChange::parse_assignment("quality=40").unwrap(),
        ParamChange::Quality(40)
    );
    assert_eq!(
        ParamChange::parse_assignment("width = 640").unwrap(),
        ParamChange::TargetWidth(640)
    );
    assert_eq!(
        ParamChange::parse_assignment("format=webm").unwrap(),
        ParamChange::OutputFormat(OutputFormat::Webm)
    );
    assert_eq!(
        ParamChange::parse_assignment("metadata=edit:title=Hi").unwrap(),
        ParamChange::MetadataPolicy(MetadataPolicy::Edit("title=Hi".to_string()))
    );
    assert!(ParamChange::parse_assignment("quality").is_err());
    assert!(ParamChange::parse_assignment("bogus=1").is_err());
    assert!(ParamChange::parse_assignment("maintainAspect=maybe").is_err());
}

#[test]
fn changes_deserialize_from_json() {
    let changes: Vec<ParamChange> = serde_json::from_str(
        r#"[{"field":"trimEnd","value":5.0},{"field":"outputFormat","value":"webm"}]"#,
    )
    .unwrap();
    assert_eq!(
        changes,
        vec![
            ParamChange::TrimEnd(5.0),
            ParamChange::OutputFormat(OutputFormat::Webm)
        ]
    );
}
