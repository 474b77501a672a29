//! Songsmith CLI library.
//!
//! This crate provides the commands behind the `songsmith` binary: song and
//! album generation, and inspection of the constants tables.

pub mod commands;
