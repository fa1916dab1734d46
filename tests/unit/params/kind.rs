use super::*;

#[test]
fn mime_prefix_selects_kind() {
    assert_eq!(MediaKind::from_mime("image/png").unwrap(), MediaKind::Image);
    assert_eq!(MediaKind::from_mime("audio/mpeg").unwrap(), MediaKind::Audio);
    assert_eq!(MediaKind::from_mime("Video/MP4").unwrap(), MediaKind::Video);
}

#[test]
fn unknown_or_malformed_mime_is_unsupported() {
    for declared in ["text/plain", "application/pdf", "video", ""] {
        let err = MediaKind::from_mime(declared).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedKind(_)), "{declared}");
    }
}

#[test]
fn default_format_is_first_allowed() {
    assert_eq!(MediaKind::Image.default_format(), OutputFormat::Jpeg);
    assert_eq!(MediaKind::Audio.default_format(), OutputFormat::Mp3);
    assert_eq!(MediaKind::Video.default_format(), OutputFormat::Mp4);
    assert!(MediaKind::Audio.allowed_formats().contains(&OutputFormat::Ogg));
    assert!(MediaKind::Video.allowed_formats().contains(&OutputFormat::Ogg));
    assert!(!MediaKind::Image.allowed_formats().contains(&OutputFormat::Mp4));
}

#[test]
fn ogg_mime_follows_source_kind() {
    assert_eq!(OutputFormat::Ogg.mime(MediaKind::Audio), "audio/ogg");
    assert_eq!(OutputFormat::Ogg.mime(MediaKind::Video), "video/ogg");
    assert_eq!(OutputFormat::Mp3.mime(MediaKind::Audio), "audio/mpeg");
}

#[test]
fn format_size_factors() {
    assert_eq!(OutputFormat::Webm.size_factor(), 0.8);
    assert_eq!(OutputFormat::Ogg.size_factor(), 0.8);
    assert_eq!(OutputFormat::Webp.size_factor(), 0.8);
    assert_eq!(OutputFormat::Png.size_factor(), 1.5);
    assert_eq!(OutputFormat::Mp4.size_factor(), 1.0);
    assert_eq!(OutputFormat::Jpeg.size_factor(), 1.0);
}

#[test]
fn parse_accepts_jpg_alias() {
    assert_eq!(OutputFormat::parse("JPG").unwrap(), OutputFormat::Jpeg);
    assert!(OutputFormat::parse("gif").is_err());
}

#[test]
fn metadata_policy_serde_shape() {
    let json = serde_json::to_value(MetadataPolicy::Edit("title=x".to_string())).unwrap();
    assert_eq!(json, serde_json::json!({ "mode": "edit", "text": "title=x" }));
    let keep: MetadataPolicy = serde_json::from_str(r#"{"mode":"keep"}"#).unwrap();
    assert_eq!(keep, MetadataPolicy::Keep);
}

#[test]
fn mime_guess_from_extension() {
    use std::path::Path;
    assert_eq!(mime_from_extension(Path::new("a/b.JPG")), Some("image/jpeg"));
    assert_eq!(mime_from_extension(Path::new("clip.webm")), Some("video/webm"));
    assert_eq!(mime_from_extension(Path::new("notes.txt")), None);
    assert_eq!(mime_from_extension(Path::new("noext")), None);
}
