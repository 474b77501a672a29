//! Error types for song generation.

use thiserror::Error;

use songsmith_spec::{BackendError, Mode, SectionRole};

/// No progression template exists for a role in the requested mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no progression template for role '{role}' in {mode} mode")]
pub struct TemplateError {
    pub role: SectionRole,
    pub mode: Mode,
}

impl BackendError for TemplateError {
    fn code(&self) -> &'static str {
        "SONG_TEMPLATE_001"
    }

    fn category(&self) -> &'static str {
        "template"
    }
}

/// The sampler could not produce a song that ends on the terminal role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// No walk from any start edge reaches the terminal role.
    #[error("role graph has no path from the start to terminal role '{terminal}'")]
    NoPathToTerminal { terminal: SectionRole },

    /// The shortest song is longer than the section budget.
    #[error("shortest song needs {needed} sections but max_sections is {max_sections}")]
    BudgetTooSmall { needed: usize, max_sections: usize },

    /// Every attempt failed.
    #[error("no song reached terminal role '{terminal}' after {attempts} attempts")]
    RetriesExhausted {
        terminal: SectionRole,
        attempts: u32,
    },
}

impl BackendError for StructureError {
    fn code(&self) -> &'static str {
        match self {
            StructureError::NoPathToTerminal { .. } => "SONG_STRUCTURE_001",
            StructureError::BudgetTooSmall { .. } => "SONG_STRUCTURE_002",
            StructureError::RetriesExhausted { .. } => "SONG_STRUCTURE_003",
        }
    }

    fn category(&self) -> &'static str {
        "structure"
    }
}

/// Errors that can occur while generating a song.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A request parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl BackendError for GenerateError {
    fn code(&self) -> &'static str {
        match self {
            GenerateError::Structure(err) => err.code(),
            GenerateError::Template(err) => err.code(),
            GenerateError::InvalidParameter(_) => "SONG_GENERATE_001",
        }
    }

    fn category(&self) -> &'static str {
        match self {
            GenerateError::Structure(err) => err.category(),
            GenerateError::Template(err) => err.category(),
            GenerateError::InvalidParameter(_) => "generate",
        }
    }
}
