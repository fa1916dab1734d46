use super::*;
use crate::{
    compile::{compiler::compile, job::Backend},
    params::{
        kind::MediaKind,
        set::{ParameterSet, SourceRef, SourceStats},
        solver::{ParamChange, apply_all},
    },
};

fn video_job(changes: &[ParamChange]) -> TransformJob {
    let set = ParameterSet::populated(
        MediaKind::Video,
        SourceRef::new(vec![0u8; 4], "video/mp4"),
        SourceStats {
            duration_secs: Some(10.0),
            width: Some(1920),
            height: Some(1080),
            frame_rate: Some(30),
            byte_size: 4,
        },
    );
    compile(&apply_all(&set, changes).unwrap(), Backend::Batch).unwrap()
}

fn audio_job(changes: &[ParamChange]) -> TransformJob {
    let set = ParameterSet::populated(
        MediaKind::Audio,
        SourceRef::new(vec![0u8; 4], "audio/wav"),
        SourceStats {
            duration_secs: Some(30.0),
            byte_size: 4,
            ..SourceStats::default()
        },
    );
    compile(&apply_all(&set, changes).unwrap(), Backend::Batch).unwrap()
}

fn args_of(job: &TransformJob) -> Vec<String> {
    ffmpeg_args(job, "output.x")
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

#[test]
fn passthrough_job_pins_baseline_quality_and_muxer() {
    assert_eq!(
        args_of(&video_job(&[])),
        vec![
            "-y", "-hide_banner", "-loglevel", "error", "-i", "input", "-crf", "13.5", "-f", "mp4",
            "output.x"
        ]
    );
    let audio = args_of(&audio_job(&[ParamChange::OutputFormat(OutputFormat::Mp3)]));
    assert_eq!(value_after(&audio, "-q:a").as_deref(), Some("2"));
}

#[test]
fn crf_falls_strictly_as_quality_rises_through_the_baseline() {
    let crf = |q: u32| -> f64 {
        let args = args_of(&video_job(&[ParamChange::Quality(q)]));
        value_after(&args, "-crf").unwrap().parse().unwrap()
    };
    let (q74, q75, q76) = (crf(74), crf(75), crf(76));
    assert!(q74 > q75 && q75 > q76, "{q74} {q75} {q76}");
}

#[test]
fn audio_vbr_is_emitted_at_every_quality() {
    for q in [1, 50, 74, 75, 76, 100] {
        let args = args_of(&audio_job(&[ParamChange::Quality(q)]));
        assert_eq!(args.iter().filter(|a| *a == "-q:a").count(), 1, "quality {q}");
    }
}

#[test]
fn odd_mp4_target_is_padded_to_even() {
    let job = video_job(&[ParamChange::ResolutionScalePercent(41.0)]);
    assert_eq!(
        (job.params().target_width(), job.params().target_height()),
        (787, 443)
    );
    assert_eq!(
        value_after(&args_of(&job), "-vf").as_deref(),
        Some("scale=787:443,pad=ceil(iw/2)*2:ceil(ih/2)*2")
    );
}

#[test]
fn even_or_non_mp4_targets_are_not_padded() {
    let even = video_job(&[ParamChange::TargetWidth(1280)]);
    assert_eq!(value_after(&args_of(&even), "-vf").as_deref(), Some("scale=1280:720"));

    let webm = video_job(&[
        ParamChange::ResolutionScalePercent(41.0),
        ParamChange::OutputFormat(OutputFormat::Webm),
    ]);
    assert_eq!(value_after(&args_of(&webm), "-vf").as_deref(), Some("scale=787:443"));
}

#[test]
fn full_video_job_maps_every_operation() {
    let job = video_job(&[
        ParamChange::TrimStart(1.5),
        ParamChange::TrimEnd(6.0),
        ParamChange::TargetWidth(1280),
        ParamChange::FrameRate(24),
        ParamChange::Quality(50),
        ParamChange::OutputFormat(OutputFormat::Webm),
        ParamChange::MetadataPolicy(MetadataPolicy::Remove),
    ]);
    assert_eq!(
        args_of(&job),
        vec![
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "input",
            "-ss",
            "1.500",
            "-t",
            "4.500",
            "-vf",
            "scale=1280:720",
            "-r",
            "24",
            "-crf",
            "26",
            "-f",
            "webm",
            "-map_metadata",
            "-1",
            "output.x",
        ]
    );
}

#[test]
fn trim_to_the_end_omits_duration_flag() {
    let args = args_of(&audio_job(&[ParamChange::TrimStart(5.0)]));
    assert!(args.windows(2).any(|w| w == ["-ss", "5.000"]));
    assert!(!args.iter().any(|a| a == "-t"));
}

#[test]
fn trim_from_zero_omits_seek_flag() {
    let args = args_of(&audio_job(&[ParamChange::TrimEnd(12.0)]));
    assert!(!args.iter().any(|a| a == "-ss"));
    assert!(args.windows(2).any(|w| w == ["-t", "12.000"]));
}

#[test]
fn audio_quality_uses_vbr_scale() {
    let args = args_of(&audio_job(&[ParamChange::Quality(50)]));
    assert!(args.windows(2).any(|w| w == ["-q:a", "3"]));

    let args = args_of(&audio_job(&[ParamChange::Quality(90)]));
    assert!(args.windows(2).any(|w| w == ["-q:a", "1.4"]));
}

#[test]
fn edited_metadata_becomes_metadata_flags() {
    let job = audio_job(&[ParamChange::MetadataPolicy(MetadataPolicy::Edit(
        "title=Demo\nartist = Someone".to_string(),
    ))]);
    let args = args_of(&job);
    assert!(args.windows(2).any(|w| w == ["-metadata", "title=Demo"]));
    assert!(args.windows(2).any(|w| w == ["-metadata", "artist=Someone"]));
    assert!(!args.iter().any(|a| a == "-map_metadata"));
}

#[test]
fn number_formatting_trims_trailing_zeros() {
    assert_eq!(number(26.0), "26");
    assert_eq!(number(1.4), "1.4");
    assert_eq!(number(50.5), "50.5");
}

#[test]
fn missing_binary_is_an_open_error() {
    let mut enc = FfmpegEncoder::new("/nonexistent/ffmpeg-binary");
    let err = enc
        .invoke(b"data", &["output.mp3".to_string()], "output.mp3")
        .unwrap_err();
    assert_eq!(err.stage, crate::foundation::error::EncodeStage::Open);
}

#[test]
fn ensure_parent_dir_creates_nested_directories() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a/b/out.mp4");
    ensure_parent_dir(&out).unwrap();
    assert!(dir.path().join("a/b").is_dir());
}
