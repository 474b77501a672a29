//! Golden structure test.
//!
//! Seed 42 in C major at 120 BPM with at most six sections must keep
//! producing the JSON stored in `tests/golden/seed42_c_major.json`.
//!
//! ## Updating
//!
//! ```bash
//! SONGSMITH_UPDATE_GOLDEN=1 cargo test -p songsmith-tests --test golden_structure
//! ```
//!
//! A missing golden file is a failure unless an update was requested.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use songsmith_backend::SongRequest;
use songsmith_spec::{MusicalKey, SectionRole, Song};
use songsmith_tests::{builtin_constants, song_json};

/// Whether to update the golden file instead of comparing.
fn should_update_golden() -> bool {
    std::env::var("SONGSMITH_UPDATE_GOLDEN")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn golden_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("golden")
        .join("seed42_c_major.json")
}

fn golden_request() -> SongRequest {
    SongRequest::new(42)
        .with_key(MusicalKey::major(songsmith_spec::PitchClass::new(0)))
        .with_tempo(120)
        .with_max_sections(6)
}

#[test]
fn golden_seed42_c_major() {
    let constants = builtin_constants();
    let actual = String::from_utf8(song_json(&constants, &golden_request())).unwrap();
    let path = golden_path();

    if should_update_golden() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create golden directory");
        }
        fs::write(&path, format!("{}\n", actual)).expect("Failed to write golden file");
        eprintln!("wrote golden file {}", path.display());
        return;
    }

    let is_missing_expected = !path.exists();
    assert!(
        !is_missing_expected,
        "golden file {} is missing; run with SONGSMITH_UPDATE_GOLDEN=1 to create it",
        path.display()
    );

    let expected = fs::read_to_string(&path).expect("Failed to read golden file");
    assert_eq!(expected.trim_end(), actual.trim_end());
}

#[test]
fn golden_role_sequence() {
    let constants = builtin_constants();
    let json = song_json(&constants, &golden_request());
    let song: Song = serde_json::from_slice(&json).unwrap();

    let roles: Vec<SectionRole> = song.structure.sections.iter().map(|s| s.role).collect();
    assert_eq!(
        roles,
        vec![
            SectionRole::Verse,
            SectionRole::PreChorus,
            SectionRole::Chorus,
            SectionRole::Outro
        ]
    );
    let labels: Vec<&str> = song.structure.sections.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["A", "AA", "AAA", "AAAA"]);
    let forms: Vec<&[u32]> = song.structure.sections.iter().map(|s| s.form.as_slice()).collect();
    assert_eq!(forms, vec![&[0, 0][..], &[0], &[0, 0], &[0]]);
}

#[test]
fn golden_song_shape() {
    let constants = builtin_constants();
    let json = song_json(&constants, &golden_request());
    let song: Song = serde_json::from_slice(&json).unwrap();

    assert_eq!(song.seed, 42);
    assert_eq!(song.tempo, 120);
    assert_eq!(song.key_name, "C major");
    assert!(song.structure.len() <= 6);
    assert_eq!(song.structure.validate_lineage(), Ok(()));

    // C major spells with flats; no chord in the song needs a sharp.
    for section in &song.structure.sections {
        for chord in &section.chords {
            assert!(!chord.symbol().contains('#'), "{}", chord.symbol());
        }
    }
}
