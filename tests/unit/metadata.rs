use super::*;

#[test]
fn key_value_lines_keep_order() {
    let entries = parse_metadata_entries("title = Trip\n\nartist=Me\ncomment=a=b\n").unwrap();
    assert_eq!(
        entries,
        vec![
            ("title".to_string(), "Trip".to_string()),
            ("artist".to_string(), "Me".to_string()),
            ("comment".to_string(), "a=b".to_string()),
        ]
    );
}

#[test]
fn json_object_scalars_are_stringified() {
    let entries =
        parse_metadata_entries(r#"{ "name": "clip.mp4", "size": 1024, "public": true }"#).unwrap();
    assert!(entries.contains(&("name".to_string(), "clip.mp4".to_string())));
    assert!(entries.contains(&("size".to_string(), "1024".to_string())));
    assert!(entries.contains(&("public".to_string(), "true".to_string())));
}

#[test]
fn malformed_text_is_rejected() {
    assert!(parse_metadata_entries("just words").is_err());
    assert!(parse_metadata_entries("=value").is_err());
    assert!(parse_metadata_entries("two words=x").is_err());
    assert!(parse_metadata_entries("{ not json").is_err());
    assert!(parse_metadata_entries(r#"{ "nested": { "a": 1 } }"#).is_err());
}

#[test]
fn empty_text_means_no_entries() {
    assert!(parse_metadata_entries("   \n").unwrap().is_empty());
}

#[test]
fn prefilled_document_round_trips_through_the_edit_parser() {
    let doc = MetadataDocument {
        name: "holiday.mp4".to_string(),
        mime: "video/mp4".to_string(),
        size: 4096,
        last_modified: Some("2024-05-01T10:00:00Z".to_string()),
    };
    let text = doc.to_edit_text().unwrap();
    assert!(text.contains("\"type\": \"video/mp4\""));
    assert!(text.contains("\"lastModified\""));

    let entries = parse_metadata_entries(&text).unwrap();
    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["name", "type", "size", "lastModified"]);
    assert!(entries.contains(&("type".to_string(), "video/mp4".to_string())));
    assert!(entries.contains(&("size".to_string(), "4096".to_string())));
}

#[test]
fn json_object_keeps_written_order() {
    let entries =
        parse_metadata_entries(r#"{ "title": "Trip", "artist": "Me", "album": "Roads" }"#)
            .unwrap();
    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["title", "artist", "album"]);
}

#[test]
fn document_for_file_fills_size_and_modification_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    std::fs::write(&path, vec![0u8; 321]).unwrap();

    let doc = MetadataDocument::for_file(&path, "audio/wav").unwrap();
    assert_eq!(doc.name, "clip.wav");
    assert_eq!(doc.mime, "audio/wav");
    assert_eq!(doc.size, 321);
    let stamp = doc.last_modified.expect("modification time");
    assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok(), "{stamp}");
}

#[test]
fn document_for_missing_file_is_not_a_value_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MetadataDocument::for_file(&dir.path().join("gone.mp4"), "video/mp4").unwrap_err();
    assert!(matches!(err, EngineError::Other(_)));
}
