//! Integration tests for stowage.
#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use std::error::Error as _;
use std::io::Cursor;
use stowage::formats::{Json, Text};
use stowage::io::{Sink, Source};
use stowage::{
    Direction, Error, LoadOptions, Registry, SaveOptions, Stowage, StowageConfig, Value,
};
use tempfile::TempDir;

#[test]
fn test_error_types() {
    let err = Error::InvalidInput("test message".to_string());
    let display = format!("{err}");
    assert!(display.contains("invalid input"));
    assert!(display.contains("test message"));

    let err = Error::OperationFailed {
        operation: "load_config".to_string(),
        cause: "bad toml".to_string(),
    };
    let display = format!("{err}");
    assert!(display.contains("load_config"));
    assert!(display.contains("bad toml"));

    let err = Error::format("json", Direction::Load, "expected value at line 1");
    assert_eq!(
        err.to_string(),
        "json failed to load: expected value at line 1"
    );
    assert!(err.source().is_some());

    let err = Error::io(
        "write csv",
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
    );
    assert!(err.to_string().contains("write csv"));
    assert!(err.source().is_some());
}

/// A registry built by hand only knows the codecs it was given.
mod custom_registry_tests {
    use super::*;

    fn text_only() -> Stowage {
        Stowage::new(
            Registry::new().with_format(Text),
            StowageConfig::default(),
        )
    }

    #[test]
    fn test_unregistered_format_is_exhausted() {
        let mut sink = Cursor::new(Vec::new());
        let err = text_only()
            .save_stream(
                &Value::from(json!({"a": 1})),
                &mut sink,
                &SaveOptions::new().with_hint(".json"),
            )
            .unwrap_err();
        match err {
            Error::Exhausted {
                direction,
                hint,
                value_type,
            } => {
                assert_eq!(direction, Direction::Save);
                assert_eq!(hint.as_deref(), Some(".json"));
                assert_eq!(value_type, Some("json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_compressed_registration_adds_wrapper() {
        let stowage = Stowage::new(
            Registry::new().with_compressed(Json, 9),
            StowageConfig::default(),
        );
        assert_eq!(stowage.registry().len(), 2);

        let mut sink = Cursor::new(Vec::new());
        let suffix = stowage
            .save_stream(
                &Value::from(json!([1, 2, 3])),
                &mut sink,
                &SaveOptions::new().with_hint("nums.json.gz"),
            )
            .unwrap();
        assert_eq!(suffix, ".json.gz");

        sink.set_position(0);
        let loaded = stowage
            .load(Source::Stream(&mut sink), &LoadOptions::new())
            .unwrap();
        assert_eq!(loaded, Value::from(json!([1, 2, 3])));
    }
}

/// Configuration flows into resolution.
mod configuration_tests {
    use super::*;

    #[test]
    fn test_gzip_level_from_config() {
        let text = Value::from("stowage ".repeat(512));
        let save = |level: u32| {
            let stowage = Stowage::with_config(StowageConfig::default().with_gzip_level(level));
            let mut sink = Cursor::new(Vec::new());
            stowage
                .save_stream(&text, &mut sink, &SaveOptions::new().with_hint(".txt.gz"))
                .unwrap();
            sink.into_inner()
        };

        let stored = save(0);
        let compressed = save(9);
        assert!(compressed.len() < stored.len());
        assert!(stored.len() > 4096);
    }

    #[test]
    fn test_fallback_disabled_by_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.unknown");
        std::fs::write(&path, b"[1, 2]").unwrap();

        let sniffing = Stowage::default();
        assert_eq!(
            sniffing.load_path(&path, &LoadOptions::new()).unwrap(),
            Value::from(json!([1, 2]))
        );

        let strict = Stowage::with_config(StowageConfig::default().with_sniff_fallback(false));
        let err = strict.load_path(&path, &LoadOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Exhausted { .. }));
    }

    #[test]
    fn test_config_file_drives_facade() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stowage.toml");
        std::fs::write(&path, "[resolver]\nallow_lazy = false\n\n[gzip]\nlevel = 4\n").unwrap();

        let config = StowageConfig::load(Some(path.as_path())).unwrap();
        assert!(!config.resolver.allow_lazy);
        assert!(config.resolver.sniff_fallback);
        assert_eq!(config.gzip.level, 4);

        let stowage = Stowage::with_config(config);
        assert!(!stowage.resolver().settings().allow_lazy);
    }
}

/// Sources and sinks behave the same whichever way they are passed.
mod target_tests {
    use super::*;

    #[test]
    fn test_path_and_stream_targets_agree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let value = Value::from(json!({"k": [true, null]}));
        let stowage = Stowage::default();

        let suffix = stowage
            .save(&value, Sink::Path(&path), &SaveOptions::new())
            .unwrap();
        assert_eq!(suffix, ".json");

        let mut sink = Cursor::new(Vec::new());
        stowage
            .save(
                &value,
                Sink::Stream(&mut sink),
                &SaveOptions::new().with_hint(".json"),
            )
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), sink.get_ref().clone());

        let from_path = stowage
            .load(Source::Path(&path), &LoadOptions::new())
            .unwrap();
        sink.set_position(0);
        let from_stream = stowage
            .load(Source::Stream(&mut sink), &LoadOptions::new())
            .unwrap();
        assert_eq!(from_path, value);
        assert_eq!(from_stream, value);
    }

    #[test]
    fn test_stream_save_appends_after_existing_bytes() {
        let stowage = Stowage::default();
        let mut sink = Cursor::new(b"HEAD".to_vec());
        sink.set_position(4);

        stowage
            .save_stream(
                &Value::from("body"),
                &mut sink,
                &SaveOptions::new().with_hint(".txt"),
            )
            .unwrap();
        assert_eq!(sink.into_inner(), b"HEADbody");
    }
}
