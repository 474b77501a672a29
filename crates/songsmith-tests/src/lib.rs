//! Songsmith End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the flows that must stay
//! reproducible:
//!
//! - Generation: seed and constants -> song JSON
//! - **Determinism**: byte-identical JSON across runs
//! - Albums: track seeds are independent and individually reproducible
//! - Spelling: every key spells its chords with one accidental family
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p songsmith-tests
//!
//! # Rewrite the golden structure file after an intended change
//! SONGSMITH_UPDATE_GOLDEN=1 cargo test -p songsmith-tests --test golden_structure
//! ```
//!
//! ## Determinism Testing
//!
//! ```rust,ignore
//! use songsmith_tests::determinism::verify_determinism;
//!
//! let result = verify_determinism(|| song_json(&constants, &request), 3);
//! assert!(result.is_deterministic);
//! ```

pub mod determinism;
pub mod fixtures;

// Re-export commonly used items
pub use determinism::{
    assert_deterministic, compute_hash, verify_determinism, verify_hash_determinism,
    DeterminismResult, DiffInfo,
};
pub use fixtures::{builtin_constants, song_json, OverrideFixture};
