//! Songsmith CLI - Command-line interface for procedural song generation
//!
//! This binary generates song forms with chord progressions from a seed and
//! inspects the constants tables that drive generation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use songsmith_backend::DEFAULT_MAX_SECTIONS;
use songsmith_cli::commands;
use songsmith_cli::commands::generate::GenerateOptions;
use songsmith_spec::MusicalKey;

/// Songsmith - Deterministic Procedural Song Generator
#[derive(Parser)]
#[command(name = "songsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one or more songs
    Generate {
        /// Base seed (default: random, logged for reproduction)
        #[arg(long)]
        seed: Option<u64>,

        /// Fixed key, e.g. "C", "Am", "Eb major", "D dorian"
        #[arg(long)]
        key: Option<MusicalKey>,

        /// Fixed tempo in BPM
        #[arg(long)]
        tempo: Option<u32>,

        /// Number of songs to generate from the base seed
        #[arg(long, default_value_t = 1)]
        num_songs: u32,

        /// Regenerate only this song of the album (0-based)
        #[arg(long)]
        song_index: Option<u32>,

        /// Maximum number of performed sections per song
        #[arg(long, default_value_t = DEFAULT_MAX_SECTIONS)]
        max_sections: usize,

        /// Constants override file (YAML, or JSON by extension)
        #[arg(long, env = "SONGSMITH_CONSTANTS")]
        constants: Option<PathBuf>,

        /// Move generated songs to this tonic, keeping their mode
        #[arg(long)]
        transpose_to: Option<MusicalKey>,

        /// Print the section tree and performance order
        #[arg(long)]
        print_graph: bool,

        /// Write the role graph in Graphviz DOT format
        #[arg(long)]
        graph_dot: Option<PathBuf>,

        /// Directory to write song-<index>.json files into
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Print song JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Inspect the constants tables
    Constants {
        #[command(subcommand)]
        command: ConstantsCommands,
    },
}

#[derive(Subcommand)]
enum ConstantsCommands {
    /// Validate the built-in tables with an optional override applied
    Validate {
        /// Override file (default: built-in tables only)
        #[arg(env = "SONGSMITH_CONSTANTS")]
        path: Option<PathBuf>,
    },
    /// Print the effective tables as YAML
    Dump {
        /// Constants override file
        #[arg(long, env = "SONGSMITH_CONSTANTS")]
        constants: Option<PathBuf>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "songsmith=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Generate {
            seed,
            key,
            tempo,
            num_songs,
            song_index,
            max_sections,
            constants,
            transpose_to,
            print_graph,
            graph_dot,
            out_dir,
            json,
        } => commands::generate::run(&GenerateOptions {
            seed,
            key,
            tempo,
            num_songs,
            song_index,
            max_sections,
            constants,
            transpose_to,
            print_graph,
            graph_dot,
            out_dir,
            json,
        }),
        Commands::Constants { command } => match command {
            ConstantsCommands::Validate { path } => commands::constants::validate(path.as_deref()),
            ConstantsCommands::Dump { constants } => commands::constants::dump(constants.as_deref()),
        },
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_generate_defaults() {
        let cli = Cli::try_parse_from(["songsmith", "generate"]).unwrap();
        match cli.command {
            Commands::Generate {
                seed,
                key,
                num_songs,
                max_sections,
                json,
                ..
            } => {
                assert_eq!(seed, None);
                assert_eq!(key, None);
                assert_eq!(num_songs, 1);
                assert_eq!(max_sections, DEFAULT_MAX_SECTIONS);
                assert!(!json);
            }
            _ => panic!("expected generate command"),
        }
    }

    #[test]
    fn test_cli_parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "songsmith",
            "generate",
            "--seed",
            "42",
            "--key",
            "Eb major",
            "--tempo",
            "120",
            "--num-songs",
            "4",
            "--song-index",
            "2",
            "--max-sections",
            "6",
            "--print-graph",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                seed,
                key,
                tempo,
                num_songs,
                song_index,
                max_sections,
                print_graph,
                json,
                ..
            } => {
                assert_eq!(seed, Some(42));
                assert_eq!(key.map(|k| k.to_string()), Some("Eb major".to_string()));
                assert_eq!(tempo, Some(120));
                assert_eq!(num_songs, 4);
                assert_eq!(song_index, Some(2));
                assert_eq!(max_sections, 6);
                assert!(print_graph);
                assert!(json);
            }
            _ => panic!("expected generate command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_key() {
        let err = Cli::try_parse_from(["songsmith", "generate", "--key", "H"])
            .err()
            .unwrap();
        assert!(err.to_string().contains("--key"));
    }

    #[test]
    fn test_cli_parses_constants_validate() {
        let cli =
            Cli::try_parse_from(["songsmith", "constants", "validate", "override.yaml"]).unwrap();
        match cli.command {
            Commands::Constants {
                command: ConstantsCommands::Validate { path },
            } => assert_eq!(path, Some(PathBuf::from("override.yaml"))),
            _ => panic!("expected constants validate command"),
        }
    }

    #[test]
    fn test_cli_parses_constants_dump() {
        let cli = Cli::try_parse_from(["songsmith", "constants", "dump"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Constants {
                command: ConstantsCommands::Dump { .. }
            }
        ));
    }
}
