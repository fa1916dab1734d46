use super::*;
use crate::params::{
    kind::OutputFormat,
    set::{SourceRef, SourceStats},
    solver::{ParamChange, apply_all},
};

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

fn audio_set() -> ParameterSet {
    ParameterSet::populated(
        MediaKind::Audio,
        SourceRef::new(vec![0u8; 8], "audio/wav"),
        SourceStats {
            duration_secs: Some(30.0),
            byte_size: 5_000_000,
            ..SourceStats::default()
        },
    )
}

fn image_set() -> ParameterSet {
    ParameterSet::populated(
        MediaKind::Image,
        SourceRef::new(vec![0u8; 8], "image/png"),
        SourceStats {
            width: Some(800),
            height: Some(600),
            byte_size: 90_000,
            ..SourceStats::default()
        },
    )
}

#[test]
fn untouched_sets_compile_to_passthrough_jobs() {
    for set in [video_set(), audio_set(), image_set()] {
        let job = compile(&set, Backend::Batch).unwrap();
        assert_eq!(
            job.operations(),
            &[
                Operation::SetFormat {
                    format: set.kind().default_format()
                },
                Operation::SetMetadataPolicy {
                    policy: MetadataPolicy::Keep
                },
            ]
        );
        assert!(job.is_passthrough());
    }
}

#[test]
fn operations_follow_fixed_order() {
    let set = apply_all(
        &video_set(),
        &[
            ParamChange::MetadataPolicy(MetadataPolicy::Remove),
            ParamChange::OutputFormat(OutputFormat::Webm),
            ParamChange::Quality(50),
            ParamChange::FrameRate(24),
            ParamChange::TargetWidth(1280),
            ParamChange::TrimStart(2.0),
            ParamChange::TrimEnd(8.0),
        ],
    )
    .unwrap();
    let job = compile(&set, Backend::Batch).unwrap();
    assert_eq!(
        job.operations(),
        &[
            Operation::Trim {
                start: 2.0,
                end: 8.0
            },
            Operation::Scale {
                width: 1280,
                height: 720
            },
            Operation::SetFrameRate { fps: 24 },
            Operation::SetQuality {
                scale: EncoderScale::VideoCrf(26.0)
            },
            Operation::SetFormat {
                format: OutputFormat::Webm
            },
            Operation::SetMetadataPolicy {
                policy: MetadataPolicy::Remove
            },
        ]
    );
    assert!(!job.is_passthrough());
    assert_eq!(job.output_mime(), "video/webm");
    assert_eq!(job.output_dimensions(), Some((1280, 720)));
    assert_eq!(job.output_frame_rate(), Some(24));
}

#[test]
fn quality_maps_to_inverted_encoder_scales() {
    assert_eq!(
        EncoderScale::for_quality(MediaKind::Audio, 100),
        EncoderScale::AudioVbr(1.0)
    );
    assert_eq!(
        EncoderScale::for_quality(MediaKind::Audio, 25),
        EncoderScale::AudioVbr(4.0)
    );
    assert_eq!(
        EncoderScale::for_quality(MediaKind::Video, 100),
        EncoderScale::VideoCrf(1.0)
    );
    assert_eq!(
        EncoderScale::for_quality(MediaKind::Video, 1),
        EncoderScale::VideoCrf(50.5)
    );
    assert_eq!(
        EncoderScale::for_quality(MediaKind::Image, 40),
        EncoderScale::ImageQuality(40)
    );
}

#[test]
fn trim_is_emitted_when_only_the_end_moves() {
    let set = apply_all(&audio_set(), &[ParamChange::TrimEnd(12.0)]).unwrap();
    let job = compile(&set, Backend::Batch).unwrap();
    assert_eq!(
        job.operations()[0],
        Operation::Trim {
            start: 0.0,
            end: 12.0
        }
    );
}

#[test]
fn inverted_trim_is_invalid_parameters() {
    let set = apply_all(
        &audio_set(),
        &[ParamChange::TrimStart(10.0), ParamChange::TrimEnd(10.0)],
    )
    .unwrap();
    let err = compile(&set, Backend::Batch).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameters(_)));
}

#[test]
fn zero_dimension_is_invalid_parameters() {
    let mut set = image_set();
    set.target_height = 0;
    assert!(matches!(
        compile(&set, Backend::Batch).unwrap_err(),
        EngineError::InvalidParameters(_)
    ));
}

#[test]
fn broken_aspect_lock_is_invalid_parameters() {
    let mut set = image_set();
    set.target_width = 400;
    set.target_height = 100;
    assert!(compile(&set, Backend::Batch).is_err());

    set.maintain_aspect = false;
    assert!(compile(&set, Backend::Batch).is_ok());
}

#[test]
fn unprobed_sources_cannot_compile() {
    let set = ParameterSet::empty(MediaKind::Audio, SourceRef::new(vec![1u8], "audio/wav"));
    assert!(compile(&set, Backend::Batch).is_err());
}

#[test]
fn streaming_requires_video() {
    assert!(compile(&audio_set(), Backend::Streaming).is_err());
    assert!(compile(&image_set(), Backend::Streaming).is_err());
    let job = compile(&video_set(), Backend::Streaming).unwrap();
    assert_eq!(job.backend(), Backend::Streaming);
}

#[test]
fn streaming_bitrate_is_linear_in_quality() {
    let base = compile(&video_set(), Backend::Streaming).unwrap();
    assert_eq!(base.streaming_bitrate(), 1_000_000);
    let high = apply_all(&video_set(), &[ParamChange::Quality(100)]).unwrap();
    let high = compile(&high, Backend::Streaming).unwrap();
    assert_eq!(high.streaming_bitrate(), 1_333_333);
}

#[test]
fn job_is_frozen_against_later_edits() {
    let live = video_set();
    let job = compile(&live, Backend::Batch).unwrap();
    let live = apply_all(&live, &[ParamChange::Quality(10)]).unwrap();
    assert_eq!(live.quality(), 10);
    assert_eq!(job.params().quality(), 75);
}

#[test]
fn job_serializes_without_source_bytes() {
    let job = compile(&video_set(), Backend::Batch).unwrap();
    let json = serde_json::to_value(&job).unwrap();
    assert_eq!(json["kind"], "video");
    assert_eq!(json["backend"], "batch");
    assert_eq!(json["operations"][0]["op"], "set_format");
    assert!(json.get("params").is_none());
}
