//! Songsmith Song Model Library
//!
//! This crate provides the types shared by every stage of song generation:
//! keys and pitch spelling, section roles and labels, chord events, the
//! generated song artifact, and the constants tables that drive the engine.
//!
//! # Overview
//!
//! - **Constants**: scales, chord qualities, progression templates, and the
//!   weighted role-transition graph, loaded once and validated up front
//! - **Song artifact**: a [`Song`] carries tempo, key, and a [`SongStructure`]
//!   of sections in performance order plus the label tree they came from
//!
//! # Example
//!
//! ```
//! use songsmith_spec::{Constants, MusicalKey, SectionRole};
//!
//! let constants = Constants::builtin().unwrap();
//! let key: MusicalKey = "Eb major".parse().unwrap();
//!
//! assert_eq!(key.to_string(), "Eb major");
//! assert!(!constants.templates_for(SectionRole::Chorus, key.mode).is_empty());
//! ```
//!
//! # Modules
//!
//! - [`constants`]: Constants tables, loading, and validation
//! - [`error`]: Error and warning types
//! - [`hash`]: Seed derivation
//! - [`key`]: Pitch classes, modes, and keys
//! - [`role`]: Section roles
//! - [`song`]: Labels, chord events, sections, and songs

pub mod constants;
pub mod error;
pub mod hash;
pub mod key;
pub mod role;
pub mod song;

// Re-export commonly used types at the crate root
pub use constants::{
    validate_constants, Constants, HarmonyRules, ProgressionTemplate, RoleGraph, Slot,
    SongParams, Transition, VariationKind, WeightedLength, WeightedQuality,
};
pub use error::{
    BackendError, ConfigError, ErrorCode, ValidationError, ValidationResult, ValidationWarning,
    WarningCode,
};
pub use hash::{derive_attempt_seed, derive_component_seed, derive_song_seed};
pub use key::{Mode, MusicalKey, PitchClass, Spelling};
pub use role::SectionRole;
pub use song::{ChordEvent, Label, Section, SectionNode, Song, SongStructure};
