//! Songsmith Backend - Deterministic Song Form and Chord Generation
//!
//! This crate turns a seed and a set of constants tables into a [`Song`]:
//! a sampled form of labeled sections, each carrying a chord progression in
//! the song's key.
//!
//! # Pipeline
//!
//! - [`SectionGraphSampler`] walks the weighted role graph until the terminal
//!   role, giving each role one label so its repeats share an identity, then
//!   arranges every performance as passes over the role's kernel
//! - [`ChordProgressionSynthesizer`] builds each kernel from a progression
//!   template (modal borrowing, extensions, cadences, inversions), derives
//!   its variants, and adds passing basses
//! - [`Transposer`] resolves scale degrees and spells every pitch in the key
//!
//! # Determinism
//!
//! Given the same constants, seed, and inputs, output is identical across
//! runs and platforms:
//!
//! - PCG32 random number generator, one explicit stream per consumer
//! - Sub-streams (album tracks, sampler retries, tempo, key) derived with
//!   BLAKE3
//! - Candidates ordered by role identifier before every weighted draw
//!
//! # Example
//!
//! ```
//! use songsmith_backend::{generate_song, SongRequest};
//! use songsmith_spec::Constants;
//!
//! let constants = Constants::builtin().unwrap();
//! let request = SongRequest::new(42).with_key("C".parse().unwrap()).with_tempo(120);
//! let song = generate_song(&constants, &request, 0).unwrap();
//!
//! assert_eq!(song.key_name, "C major");
//! assert!(song.structure.len() <= request.max_sections);
//! ```
//!
//! [`Song`]: songsmith_spec::Song

pub mod debug;
pub mod error;
pub mod generate;
pub mod rng;
pub mod sampler;
pub mod synthesize;
pub mod transpose;

pub use debug::{chord_bars, render, render_role_graph_dot, StructureDiagram};
pub use error::{GenerateError, StructureError, TemplateError};
pub use generate::{
    generate_album, generate_song, generate_track, sample_key, sample_tempo, transpose_song,
    AlbumRequest, SongRequest, DEFAULT_MAX_SECTIONS,
};
pub use sampler::{generate_structure, CacheKey, CacheStats, ChordCache, SectionGraphSampler};
pub use synthesize::{synthesize, ChordProgressionSynthesizer};
pub use transpose::{transpose_chord, Transposer};

/// Crate version for backend identification.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend identifier.
pub const BACKEND_ID: &str = "songsmith-backend";
