//! Song and album generation.
//!
//! This module is the entry point used by the CLI. It fills in tempo and key
//! when the caller leaves them open, runs the [`SectionGraphSampler`], and
//! assembles the [`Song`] artifact.
//!
//! Every song draws from three independent streams derived from its seed:
//! the structure stream (sampler attempts), the `"tempo"` component stream
//! and the `"key"` component stream. Supplying a tempo or key therefore never
//! shifts the structure that the same seed would otherwise produce.

use serde::{Deserialize, Serialize};
use tracing::info;

use songsmith_spec::{
    derive_song_seed, Constants, Mode, MusicalKey, PitchClass, Song, SongParams, SongStructure,
};

use crate::error::GenerateError;
use crate::rng::{create_component_rng, standard_normal, weighted_choice};
use crate::sampler::SectionGraphSampler;
use crate::transpose::transpose_chord;

/// Default upper bound on the number of performed sections.
pub const DEFAULT_MAX_SECTIONS: usize = 12;

/// Parameters for a single song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRequest {
    pub seed: u64,
    /// Fixed key; sampled from the key weights when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<MusicalKey>,
    /// Fixed tempo in BPM; sampled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,
    pub max_sections: usize,
}

impl SongRequest {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            key: None,
            tempo: None,
            max_sections: DEFAULT_MAX_SECTIONS,
        }
    }

    pub fn with_key(mut self, key: MusicalKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_tempo(mut self, tempo: u32) -> Self {
        self.tempo = Some(tempo);
        self
    }

    pub fn with_max_sections(mut self, max_sections: usize) -> Self {
        self.max_sections = max_sections;
        self
    }
}

/// Parameters for a batch of songs sharing one base seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRequest {
    pub base_seed: u64,
    pub num_songs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<MusicalKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,
    pub max_sections: usize,
}

impl AlbumRequest {
    pub fn new(base_seed: u64, num_songs: u32) -> Self {
        Self {
            base_seed,
            num_songs,
            key: None,
            tempo: None,
            max_sections: DEFAULT_MAX_SECTIONS,
        }
    }

    /// Request for track `index` alone.
    ///
    /// Track 0 keeps the base seed, so a one-song album matches a plain
    /// single-song run with the same seed.
    pub fn track(&self, index: u32) -> SongRequest {
        SongRequest {
            seed: derive_song_seed(self.base_seed, index),
            key: self.key,
            tempo: self.tempo,
            max_sections: self.max_sections,
        }
    }
}

/// Generates one song.
///
/// `index` is recorded in the artifact; it does not affect the output.
pub fn generate_song(
    constants: &Constants,
    request: &SongRequest,
    index: u32,
) -> Result<Song, GenerateError> {
    let tempo = match request.tempo {
        Some(0) => {
            return Err(GenerateError::InvalidParameter(
                "tempo must be positive".to_string(),
            ))
        }
        Some(tempo) => tempo,
        None => sample_tempo(&constants.song, request.seed),
    };
    let key = match request.key {
        Some(key) => key,
        None => sample_key(&constants.song, request.seed)?,
    };

    let structure =
        SectionGraphSampler::new(constants, key).generate(request.seed, request.max_sections)?;

    info!(
        index,
        seed = request.seed,
        key = %key,
        tempo,
        sections = structure.len(),
        "generated song"
    );

    Ok(Song {
        index,
        seed: request.seed,
        key,
        key_name: key.to_string(),
        tempo,
        structure,
    })
}

/// Generates track `index` of an album.
pub fn generate_track(
    constants: &Constants,
    request: &AlbumRequest,
    index: u32,
) -> Result<Song, GenerateError> {
    if index >= request.num_songs {
        return Err(GenerateError::InvalidParameter(format!(
            "song index {} out of range for {} song(s)",
            index, request.num_songs
        )));
    }
    generate_song(constants, &request.track(index), index)
}

/// Generates every track of an album in order.
pub fn generate_album(
    constants: &Constants,
    request: &AlbumRequest,
) -> Result<Vec<Song>, GenerateError> {
    if request.num_songs == 0 {
        return Err(GenerateError::InvalidParameter(
            "num_songs must be at least 1".to_string(),
        ));
    }
    (0..request.num_songs)
        .map(|index| generate_song(constants, &request.track(index), index))
        .collect()
}

/// Samples a tempo from a log-normal distribution over the tempo range.
///
/// The median sits at the arithmetic middle of the range; `tempo_variation`
/// scales the spread, and the result is clamped into the range.
pub fn sample_tempo(params: &SongParams, seed: u64) -> u32 {
    let min = f64::from(params.min_tempo.max(1));
    let max = f64::from(params.max_tempo.max(params.min_tempo.max(1)));
    let mean = ((min + max) / 2.0).ln();
    let sd = (max / min).ln() / 6.0 * f64::from(params.tempo_variation) / 100.0;

    let mut rng = create_component_rng(seed, "tempo");
    let z = standard_normal(&mut rng);
    (mean + sd * z).exp().clamp(min, max).round() as u32
}

/// Samples a key from the tonic and mode weights.
///
/// Tonic weights are accumulated per pitch class, so `"C#"` and `"Db"`
/// count toward the same tonic.
pub fn sample_key(params: &SongParams, seed: u64) -> Result<MusicalKey, GenerateError> {
    let mut tonic_weights = [0.0_f64; 12];
    for (name, weight) in &params.key_weights {
        if let Ok(pitch) = PitchClass::parse(name) {
            tonic_weights[usize::from(pitch.value())] += weight.max(0.0);
        }
    }

    let modes: Vec<(Mode, f64)> = params
        .mode_weights
        .iter()
        .map(|(mode, weight)| (*mode, weight.max(0.0)))
        .collect();

    let mut rng = create_component_rng(seed, "key");
    let tonic = weighted_choice(&mut rng, &tonic_weights).ok_or_else(|| {
        GenerateError::InvalidParameter("key weights must include a positive weight".to_string())
    })?;
    let mode_weights: Vec<f64> = modes.iter().map(|(_, w)| *w).collect();
    let mode = match weighted_choice(&mut rng, &mode_weights) {
        Some(i) => modes[i].0,
        None => Mode::Major,
    };

    Ok(MusicalKey::new(PitchClass::new(tonic as u8), mode))
}

/// Moves a song to another tonic, keeping its mode.
///
/// Only `target.tonic` is used. Every chord root and bass shifts by the same
/// interval and is re-spelled for the new key; the form is unchanged.
pub fn transpose_song(song: &Song, target: &MusicalKey) -> Song {
    let key = MusicalKey::new(target.tonic, song.key.mode);
    let semitones = i32::from(song.key.tonic.interval_to(key.tonic));

    let sections = song
        .structure
        .sections
        .iter()
        .map(|section| {
            let mut section = section.clone();
            section.chords = section
                .chords
                .iter()
                .map(|chord| transpose_chord(chord, semitones, &key))
                .collect();
            section
        })
        .collect();

    Song {
        key,
        key_name: key.to_string(),
        structure: SongStructure {
            sections,
            lineage: song.structure.lineage.clone(),
        },
        ..song.clone()
    }
}
