//! Constants command implementation
//!
//! Validates a constants override and dumps the effective tables.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

use songsmith_spec::{validate_constants, ConfigError, Constants, ValidationResult};

use super::load_constants;

/// Run `constants validate`
///
/// Loads the built-in tables with the override at `path` applied and
/// reports every problem found.
///
/// # Returns
/// Exit code: 0 if valid, 1 if invalid
pub fn validate(path: Option<&Path>) -> Result<ExitCode> {
    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in constants".to_string());
    println!("{} {}", "Validating:".cyan().bold(), source);

    let result = match Constants::load(path) {
        Ok(constants) => validate_constants(&constants),
        Err(ConfigError::Invalid(result)) => result,
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to load constants from {}", source))
        }
    };

    print_validation_results(&result);

    if result.is_ok() {
        println!("\n{} Constants are valid", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "\n{} Constants have {} error(s)",
            "FAILED".red().bold(),
            result.errors.len()
        );
        Ok(ExitCode::from(1))
    }
}

/// Run `constants dump`
///
/// Prints the effective tables as YAML.
pub fn dump(path: Option<&Path>) -> Result<ExitCode> {
    let constants = load_constants(path)?;
    let yaml = constants
        .to_yaml()
        .context("Failed to serialize constants")?;
    print!("{}", yaml);
    Ok(ExitCode::SUCCESS)
}

fn print_validation_results(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("\n{}", "Errors:".red().bold());
        for error in &result.errors {
            let path_info = error
                .path
                .as_ref()
                .map(|p| format!(" at {}", p))
                .unwrap_or_default();
            println!(
                "  {} [{}]{}: {}",
                "x".red(),
                error.code.to_string().red(),
                path_info.dimmed(),
                error.message
            );
        }
    }

    if !result.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow().bold());
        for warning in &result.warnings {
            let path_info = warning
                .path
                .as_ref()
                .map(|p| format!(" at {}", p))
                .unwrap_or_default();
            println!(
                "  {} [{}]{}: {}",
                "!".yellow(),
                warning.code.to_string().yellow(),
                path_info.dimmed(),
                warning.message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_validate_builtin() {
        assert_eq!(validate(None).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_validate_reports_invalid_override() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.yaml");
        fs::write(&path, "rules:\n  borrow_probability: 1.5\n").unwrap();
        assert_eq!(validate(Some(&path)).unwrap(), ExitCode::from(1));
    }

    #[test]
    fn test_validate_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(validate(Some(&tmp.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn test_dump_builtin() {
        assert_eq!(dump(None).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_dump_invalid_override_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.yaml");
        fs::write(&path, "song:\n  min_tempo: 0\n  max_tempo: 10\n  tempo_variation: 100\n  key_weights: {}\n  mode_weights: {}\n").unwrap();
        assert!(dump(Some(&path)).is_err());
    }
}
