//! Error types for constants validation and song generation.

use std::path::PathBuf;

use thiserror::Error;

/// Error codes for constants validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Scale and quality tables (C001-C004)
    /// C001: A required mode has no scale definition
    MissingScale,
    /// C002: Scale definition is not seven ascending offsets from 0
    MalformedScale,
    /// C003: The plain major triad quality ("") is not defined
    MissingMajorTriad,
    /// C004: Quality intervals are out of range or do not start at the root
    MalformedQuality,

    // Templates (C010-C013)
    /// C010: A role reachable in the role graph has no template
    MissingTemplate,
    /// C011: Template has no slots, no modes, or a non-positive weight
    MalformedTemplate,
    /// C012: Slot degree or duration is out of range
    MalformedSlot,
    /// C013: Slot or extension references an undefined quality
    UnknownQuality,

    // Role graph (C020-C023)
    /// C020: The graph has no start edges
    EmptyStart,
    /// C021: Transition weight is not positive
    InvalidTransitionWeight,
    /// C022: The terminal role has outgoing transitions
    TerminalHasTransitions,
    /// C023: A role has no outgoing transitions and is not terminal
    DeadEndRole,

    // Rules and song parameters (C030-C034)
    /// C030: Probability outside [0, 1]
    InvalidProbability,
    /// C031: Numeric rule outside its allowed range
    InvalidRule,
    /// C032: Tempo range is empty or non-positive
    InvalidTempoRange,
    /// C033: Key weights reference an unknown tonic or sum to zero
    InvalidKeyWeights,
    /// C034: Section length table is empty, zero-length, or badly weighted
    InvalidSectionLength,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "C001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::MissingScale => "C001",
            ErrorCode::MalformedScale => "C002",
            ErrorCode::MissingMajorTriad => "C003",
            ErrorCode::MalformedQuality => "C004",
            ErrorCode::MissingTemplate => "C010",
            ErrorCode::MalformedTemplate => "C011",
            ErrorCode::MalformedSlot => "C012",
            ErrorCode::UnknownQuality => "C013",
            ErrorCode::EmptyStart => "C020",
            ErrorCode::InvalidTransitionWeight => "C021",
            ErrorCode::TerminalHasTransitions => "C022",
            ErrorCode::DeadEndRole => "C023",
            ErrorCode::InvalidProbability => "C030",
            ErrorCode::InvalidRule => "C031",
            ErrorCode::InvalidTempoRange => "C032",
            ErrorCode::InvalidKeyWeights => "C033",
            ErrorCode::InvalidSectionLength => "C034",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Warning codes for constants validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// W001: Templates are defined for a role the graph never visits
    UnusedTemplates,
    /// W002: No walk from the start edges can reach the terminal role
    UnreachableTerminal,
}

impl WarningCode {
    /// Returns the warning code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::UnusedTemplates => "W001",
            WarningCode::UnreachableTerminal => "W002",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with code, message, and optional table path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Path to the problematic entry (e.g., "templates.chorus\[0\].slots\[2\]").
    pub path: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new validation error with a table path.
    pub fn with_path(code: ErrorCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validation warning with code, message, and optional table path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The warning code.
    pub code: WarningCode,
    /// Human-readable warning message.
    pub message: String,
    /// Path to the entry the warning refers to.
    pub path: Option<String>,
}

impl ValidationWarning {
    /// Creates a new validation warning with a table path.
    pub fn with_path(
        code: WarningCode,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Result of constants validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether validation passed (no errors).
    pub ok: bool,
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of validation warnings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
        self.ok = false;
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Returns true if any error carries the given code.
    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Converts to a Result, returning Err if there are errors.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        if self.ok {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::success()
    }
}

/// Fatal error raised while loading the constants tables.
///
/// Any of these aborts the run before generation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The override file could not be read.
    #[error("failed to read constants from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML source is malformed.
    #[error("constants YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON source is malformed.
    #[error("constants JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The merged tables failed validation.
    #[error("constants validation failed with {} error(s): {}", .0.errors.len(), first_error(.0))]
    Invalid(ValidationResult),
}

fn first_error(result: &ValidationResult) -> String {
    result
        .errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_default()
}

impl BackendError for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "SONG_CONFIG_001",
            ConfigError::Yaml(_) => "SONG_CONFIG_002",
            ConfigError::Json(_) => "SONG_CONFIG_003",
            ConfigError::Invalid(_) => "SONG_CONFIG_004",
        }
    }

    fn category(&self) -> &'static str {
        "config"
    }
}

/// Common trait for errors surfaced by the songsmith crates.
///
/// Each error type implements this trait so callers can report a stable
/// code alongside a human-readable message:
///
/// ```ignore
/// use songsmith_spec::error::BackendError;
///
/// fn report<E: BackendError>(err: E) {
///     eprintln!("[{}] {}", err.code(), err.message());
/// }
/// ```
pub trait BackendError: std::error::Error {
    /// Get the error code for reporting.
    ///
    /// Returns a static string like "SONG_CONFIG_001" or "SONG_STRUCTURE_002".
    /// These codes are stable and can be matched on programmatically.
    fn code(&self) -> &'static str;

    /// Get a human-readable message describing the error.
    fn message(&self) -> String {
        self.to_string()
    }

    /// Get the error category ("config", "structure", "template").
    fn category(&self) -> &'static str;
}
