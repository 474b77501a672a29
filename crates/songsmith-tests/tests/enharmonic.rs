//! Enharmonic consistency across every tonic and mode.

use songsmith_backend::{generate_song, transpose_song, SongRequest};
use songsmith_spec::{Mode, MusicalKey, PitchClass, Song, Spelling};
use songsmith_tests::builtin_constants;

fn all_keys() -> Vec<MusicalKey> {
    (0..12)
        .flat_map(|pc| {
            Mode::all()
                .iter()
                .map(move |mode| MusicalKey::new(PitchClass::new(pc), *mode))
        })
        .collect()
}

/// Asserts that every spelled pitch in `song` uses the key's accidentals.
fn assert_consistent_spelling(song: &Song) {
    let key = song.key;
    let forbidden = match key.spelling() {
        Spelling::Sharps => 'b',
        Spelling::Flats => '#',
    };
    for section in &song.structure.sections {
        for chord in &section.chords {
            assert_eq!(chord.root_name, key.spell(chord.root), "{}", key);
            assert!(
                !chord.root_name[1..].contains(forbidden),
                "{} spelled {} in {}",
                chord.root_name,
                forbidden,
                key
            );
            if let (Some(bass), Some(name)) = (chord.bass, &chord.bass_name) {
                assert_eq!(name, key.spell(bass), "{}", key);
                assert!(!name[1..].contains(forbidden), "{} in {}", name, key);
            }
        }
    }
}

#[test]
fn every_key_spells_consistently() {
    let constants = builtin_constants();
    for key in all_keys() {
        for seed in 0..5 {
            let request = SongRequest::new(seed).with_key(key).with_tempo(100);
            let song = generate_song(&constants, &request, 0)
                .unwrap_or_else(|e| panic!("{} seed {}: {}", key, seed, e));
            assert_consistent_spelling(&song);
        }
    }
}

#[test]
fn key_name_uses_its_own_spelling() {
    for key in all_keys() {
        let name = key.to_string();
        let tonic = name.split(' ').next().unwrap();
        assert_eq!(tonic, key.spell(key.tonic));
        let parsed: MusicalKey = name.parse().unwrap();
        assert_eq!(parsed, key);
    }
}

#[test]
fn transposed_songs_respell_for_target() {
    let constants = builtin_constants();
    let request = SongRequest::new(12).with_key("D".parse().unwrap());
    let song = generate_song(&constants, &request, 0).unwrap();
    for tonic in 0..12 {
        let moved = transpose_song(&song, &MusicalKey::major(PitchClass::new(tonic)));
        assert_eq!(moved.key.mode, Mode::Major);
        assert_consistent_spelling(&moved);
    }
}
