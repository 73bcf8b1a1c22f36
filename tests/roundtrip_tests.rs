//! Round trips through the standard registry.
//!
//! Every codec is exercised end to end on real files:
//! - Files written by a codec load back to the same value and re-save byte for byte
//! - Compound suffixes produce gzip of the plain payload
//! - Content sniffing picks the right codec without a hint
//! - Explicit hints surface backing errors; garbage without a hint is exhausted

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
#![cfg(all(
    feature = "npy",
    feature = "csv",
    feature = "yaml",
    feature = "image",
    feature = "nifti",
    feature = "dicom",
    feature = "packed"
))]

use flate2::{Compression, GzBuilder};
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::Path;
use stowage::codec::DEFAULT_LEVEL;
use stowage::io::Unseekable;
use stowage::{
    Capability, DType, DicomFile, Direction, Error, LoadOptions, NdArray, SaveOptions, Stowage,
    StowageConfig, Table, Value, Volume,
};
use tempfile::TempDir;
use test_case::test_case;

fn stowage() -> Stowage {
    Stowage::default()
}

fn table() -> Table {
    Table::new(
        vec!["name".to_string(), "score".to_string()],
        vec![
            vec!["ada".to_string(), "3".to_string()],
            vec!["grace".to_string(), "5".to_string()],
        ],
    )
    .unwrap()
}

fn sample(kind: &str) -> Value {
    match kind {
        "json" => Value::from(json!({"name": "scan", "sizes": [1, 2, 3], "ok": true})),
        "text" => Value::from("line one\nline two\n"),
        "table" => Value::from(table()),
        "array" => Value::from(NdArray::from_elements(&[2, 3], &[1.5f64, 2.0, -3.0, 0.0, 8.25, 1e9]).unwrap()),
        "pixels" => {
            let data: Vec<u8> = (0u8..24).collect();
            Value::from(NdArray::new(DType::U8, vec![2, 4, 3], data).unwrap())
        }
        "volume" => {
            Value::from(Volume::from_voxels(DType::I16, &[2, 2, 2], vec![7u8; 16]).unwrap())
        }
        "dicom" => Value::from(DicomFile::from_parts(
            "1.2.840.10008.5.1.4.1.1.2",
            "1.2.840.10008.1.2.1",
            b"\x10\x00\x20\x00LO\x06\x00PAT001",
        )),
        other => panic!("no sample for {other}"),
    }
}

fn write_gzip(payload: &[u8]) -> Vec<u8> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), Compression::new(DEFAULT_LEVEL));
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

fn save_and_reload(name: &str, value: &Value) -> (String, Value, Vec<u8>, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    let stowage = stowage();
    let suffix = stowage.save_path(value, &path, &SaveOptions::new()).unwrap();
    let loaded = stowage.load_path(&path, &LoadOptions::new()).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    (suffix, loaded, bytes, dir)
}

// ============================================================================
// Per-codec round trips
// ============================================================================

#[test_case("doc.json", "json", ".json"; "json")]
#[test_case("doc.json.gz", "json", ".json.gz"; "compressed json")]
#[test_case("notes.txt", "text", ".txt"; "text")]
#[test_case("notes.txt.gz", "text", ".txt.gz"; "compressed text")]
#[test_case("table.csv", "table", ".csv"; "csv")]
#[test_case("table.csv.gz", "table", ".csv.gz"; "compressed csv")]
#[test_case("config.yaml", "json", ".yaml"; "yaml")]
#[test_case("config.yml", "json", ".yml"; "yml")]
#[test_case("weights.npy", "array", ".npy"; "npy")]
#[test_case("weights.npy.gz", "array", ".npy.gz"; "compressed npy")]
#[test_case("tile.png", "pixels", ".png"; "png")]
#[test_case("tile.bmp", "pixels", ".bmp"; "bmp")]
#[test_case("tile.tiff", "pixels", ".tiff"; "tiff")]
#[test_case("brain.nii", "volume", ".nii"; "nifti")]
#[test_case("brain.nii.gz", "volume", ".nii.gz"; "compressed nifti")]
#[test_case("slice.dcm", "dicom", ".dcm"; "dicom")]
#[test_case("slice.dcm.gz", "dicom", ".dcm.gz"; "compressed dicom")]
#[test_case("state.pkl", "table", ".pkl"; "packed")]
#[test_case("state.pkl.gz", "volume", ".pkl.gz"; "compressed packed")]
fn test_roundtrip_is_byte_exact(name: &str, kind: &str, expected_suffix: &str) {
    let value = sample(kind);
    let (suffix, loaded, bytes, dir) = save_and_reload(name, &value);

    assert_eq!(suffix, expected_suffix);
    assert_eq!(loaded, value);

    let again = dir.path().join(format!("again-{name}"));
    stowage().save_path(&loaded, &again, &SaveOptions::new()).unwrap();
    assert_eq!(std::fs::read(&again).unwrap(), bytes);
}

#[test]
fn test_compound_suffix_is_gzip_of_plain_payload() {
    let value = sample("array");
    let (_, _, plain, dir) = save_and_reload("plain.npy", &value);

    let compressed = dir.path().join("packed.npy.gz");
    stowage().save_path(&value, &compressed, &SaveOptions::new()).unwrap();
    assert_eq!(std::fs::read(&compressed).unwrap(), write_gzip(&plain));
}

#[test]
fn test_compression_parameter_changes_level_only() {
    let dir = TempDir::new().unwrap();
    let value = Value::from("a".repeat(4096));
    let path = dir.path().join("big.txt.gz");
    let options = SaveOptions::new().with_param("compression", 9);

    stowage().save_path(&value, &path, &options).unwrap();
    let loaded = stowage().load_path(&path, &LoadOptions::new()).unwrap();
    assert_eq!(loaded, value);

    let err = stowage()
        .save_path(&value, &path, &SaveOptions::new().with_param("compression", 12))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_nifti_compression_follows_configured_level() {
    let dir = TempDir::new().unwrap();
    let value = sample("volume");
    let save = |level: u32| {
        let path = dir.path().join(format!("brain{level}.nii.gz"));
        Stowage::with_config(StowageConfig::default().with_gzip_level(level))
            .save_path(&value, &path, &SaveOptions::new())
            .unwrap();
        std::fs::read(&path).unwrap()
    };

    let stored = save(0);
    let compressed = save(9);
    assert!(compressed.len() < stored.len());
    assert_eq!(
        stowage().load_path(dir.path().join("brain0.nii.gz"), &LoadOptions::new()).unwrap(),
        value
    );
}

// ============================================================================
// Sniffing
// ============================================================================

#[test_case("array", ".npy"; "npy")]
#[test_case("array", ".npy.gz"; "compressed npy")]
#[test_case("json", ".json"; "json")]
#[test_case("json", ".json.gz"; "compressed json")]
#[test_case("pixels", ".png"; "png")]
#[test_case("volume", ".nii"; "nifti")]
#[test_case("volume", ".nii.gz"; "compressed nifti")]
#[test_case("dicom", ".dcm"; "dicom")]
#[test_case("dicom", ".dcm.gz"; "compressed dicom")]
#[test_case("table", ".pkl"; "packed")]
fn test_sniffs_without_hint(kind: &str, hint: &str) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("anonymous");
    let value = sample(kind);

    stowage()
        .save_path(&value, &path, &SaveOptions::new().with_hint(hint))
        .unwrap();
    let loaded = stowage()
        .load_path(&path, &LoadOptions::new().sniff())
        .unwrap();
    assert_eq!(loaded, value);
}

#[test]
fn test_unknown_extension_falls_back_to_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.data");
    std::fs::write(&path, br#"{"fallback": true}"#).unwrap();

    let loaded = stowage().load_path(&path, &LoadOptions::new()).unwrap();
    assert_eq!(loaded, Value::from(json!({"fallback": true})));
}

#[test]
fn test_stream_sniffing_from_unseekable_source() {
    let mut plain = Cursor::new(Vec::new());
    let value = sample("array");
    stowage()
        .save_stream(&value, &mut plain, &SaveOptions::new().with_hint(".npy.gz"))
        .unwrap();

    let mut source = Unseekable::new(Cursor::new(plain.into_inner()));
    let loaded = stowage().load_stream(&mut source, &LoadOptions::new()).unwrap();
    assert_eq!(loaded, value);
}

#[test_case("table", ".csv"; "table goes to csv")]
#[test_case("json", ".json"; "json goes to json")]
#[test_case("text", ".txt"; "text goes to text")]
#[test_case("array", ".npy"; "array goes to npy")]
#[test_case("volume", ".pkl"; "volume on a stream is packed")]
#[test_case("dicom", ".dcm"; "dicom goes to dicom")]
fn test_hintless_stream_save_picks_by_type(kind: &str, expected: &str) {
    let mut sink = Cursor::new(Vec::new());
    let suffix = stowage()
        .save_stream(&sample(kind), &mut sink, &SaveOptions::new())
        .unwrap();
    assert_eq!(suffix, expected);
}

#[test]
fn test_images_need_a_hint_to_save() {
    let candidates = stowage().resolver().save_candidates(
        &sample("pixels"),
        stowage::TargetKind::Stream,
        &stowage::SaveRequest::new(None, &stowage::Params::new()),
    );
    assert!(candidates.iter().all(|c| c.codec.name() != "image"));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_garbage_without_hint_is_exhausted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blob");
    std::fs::write(&path, b"definitely not a known format").unwrap();

    let err = stowage()
        .load_path(&path, &LoadOptions::new().sniff())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Exhausted {
            direction: Direction::Load,
            hint: None,
            ..
        }
    ));
}

#[test]
fn test_empty_stream_is_exhausted() {
    let mut source = Cursor::new(Vec::new());
    let err = stowage()
        .load_stream(&mut source, &LoadOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Exhausted { .. }));
}

#[test]
fn test_oversized_npy_shape_without_hint_is_exhausted() {
    let mut dict =
        "{'descr': '<f8', 'fortran_order': False, 'shape': (99999999999999, 99999999999999), }"
            .to_string();
    while (10 + dict.len() + 1) % 64 != 0 {
        dict.push(' ');
    }
    dict.push('\n');
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&u16::try_from(dict.len()).unwrap().to_le_bytes());
    bytes.extend_from_slice(dict.as_bytes());

    let err = stowage()
        .load_stream(&mut Cursor::new(bytes.clone()), &LoadOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Exhausted { hint: None, .. }), "{err:?}");

    let err = stowage()
        .load_stream(&mut Cursor::new(bytes), &LoadOptions::new().with_hint(".npy"))
        .unwrap_err();
    assert!(matches!(err, Error::Format { .. }), "{err:?}");
}

#[test]
fn test_wrong_explicit_hint_surfaces_backing_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, b"{not json").unwrap();

    let err = stowage().load_path(&path, &LoadOptions::new()).unwrap_err();
    match err {
        Error::Format {
            codec, direction, ..
        } => {
            assert_eq!(codec, "json");
            assert_eq!(direction, Direction::Load);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_corrupt_gzip_with_hint_is_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.json.gz");
    let mut bytes = write_gzip(br#"{"a": 1}"#);
    bytes.truncate(bytes.len() - 6);
    std::fs::write(&path, bytes).unwrap();

    let err = stowage().load_path(&path, &LoadOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Format { .. }), "{err:?}");
}

#[test]
fn test_missing_paths_are_not_found() {
    let dir = TempDir::new().unwrap();
    let err = stowage()
        .load_path(dir.path().join("absent.npy"), &LoadOptions::new())
        .unwrap_err();
    assert!(err.is_not_found());

    let err = stowage()
        .save_path(
            &sample("json"),
            dir.path().join("no-such-dir").join("out.json"),
            &SaveOptions::new(),
        )
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_unsupported_option_rejects_codec() {
    let mut sink = Cursor::new(Vec::new());
    let err = stowage()
        .save_stream(
            &sample("text"),
            &mut sink,
            &SaveOptions::new().with_hint(".txt").with_param("indent", 2),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Exhausted { .. }));
    assert!(sink.get_ref().is_empty());
}

// ============================================================================
// Lazy arrays
// ============================================================================

fn lazy_fixture() -> (TempDir, std::path::PathBuf, Value) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.npy");
    let value = sample("array");
    stowage().save_path(&value, &path, &SaveOptions::new()).unwrap();
    (dir, path, value)
}

#[test]
fn test_lazy_npy_reads_on_demand() {
    let (_dir, path, value) = lazy_fixture();
    let loaded = stowage()
        .load_path(&path, &LoadOptions::new().with_param("lazy", true))
        .unwrap();

    let Value::LazyArray(lazy) = loaded else {
        panic!("expected a lazy array");
    };
    assert_eq!(lazy.path(), Path::new(&path));
    assert_eq!(Value::Array(lazy.load().unwrap()), value);
}

#[test]
fn test_lazy_refused_by_caller() {
    let (_dir, path, _) = lazy_fixture();
    let err = stowage()
        .load_path(
            &path,
            &LoadOptions::new()
                .with_param("lazy", true)
                .with_allow_lazy(false),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::RequiresCapability {
            capability: Capability::LazyLoading,
            ..
        }
    ));
}

#[test]
fn test_lazy_refused_by_configuration() {
    let (_dir, path, _) = lazy_fixture();
    let stowage = Stowage::with_config(stowage::StowageConfig::default().with_allow_lazy(false));
    let err = stowage
        .load_path(&path, &LoadOptions::new().with_param("lazy", true))
        .unwrap_err();
    assert!(matches!(err, Error::RequiresCapability { .. }));
}

#[test]
fn test_lazy_inside_gzip_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.npy.gz");
    stowage()
        .save_path(&sample("array"), &path, &SaveOptions::new())
        .unwrap();

    let err = stowage()
        .load_path(&path, &LoadOptions::new().with_param("lazy", true))
        .unwrap_err();
    assert!(matches!(err, Error::RequiresCapability { .. }));
}

#[test]
fn test_lazy_array_saves_materialised() {
    let (dir, path, value) = lazy_fixture();
    let lazy = stowage()
        .load_path(&path, &LoadOptions::new().with_param("lazy", true))
        .unwrap();

    let copy = dir.path().join("copy.npy");
    stowage().save_path(&lazy, &copy, &SaveOptions::new()).unwrap();
    assert_eq!(std::fs::read(&copy).unwrap(), std::fs::read(&path).unwrap());
    assert_eq!(
        stowage().load_path(&copy, &LoadOptions::new()).unwrap(),
        value
    );
}

// ============================================================================
// Free functions
// ============================================================================

#[test]
fn test_free_function_helpers() {
    let dir = TempDir::new().unwrap();

    let json_path = dir.path().join("doc");
    stowage::save_json(&json!({"k": "v"}), &json_path, Some(2)).unwrap();
    assert_eq!(
        std::fs::read_to_string(&json_path).unwrap(),
        "{\n  \"k\": \"v\"\n}"
    );
    assert_eq!(stowage::load_json(&json_path).unwrap(), json!({"k": "v"}));

    let csv_path = dir.path().join("t.csv.gz");
    assert_eq!(
        stowage::save_csv(&table(), &csv_path, false, Some(9)).unwrap(),
        ".csv.gz"
    );
    let loaded = stowage::load(&csv_path).unwrap();
    assert_eq!(loaded, Value::from(table()));

    let packed_path = dir.path().join("anything.bin");
    stowage::save_packed(&sample("volume"), &packed_path).unwrap();
    assert_eq!(stowage::load_packed(&packed_path).unwrap(), sample("volume"));
}
