//! Generate command implementation
//!
//! Generates one song or an album and writes the artifacts.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use songsmith_backend::{
    chord_bars, generate_album, generate_track, render, render_role_graph_dot, transpose_song,
    AlbumRequest,
};
use songsmith_spec::{MusicalKey, Song};

use super::load_constants;

/// Options for the generate command, as parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Base seed; a random one is drawn and logged when absent.
    pub seed: Option<u64>,
    pub key: Option<MusicalKey>,
    pub tempo: Option<u32>,
    pub num_songs: u32,
    /// Regenerate only this album track.
    pub song_index: Option<u32>,
    pub max_sections: usize,
    pub constants: Option<PathBuf>,
    /// Move every generated song to this tonic after generation.
    pub transpose_to: Option<MusicalKey>,
    pub print_graph: bool,
    pub graph_dot: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub json: bool,
}

/// Run the generate command
///
/// # Returns
/// Exit code: 0 on success
pub fn run(options: &GenerateOptions) -> Result<ExitCode> {
    let constants = load_constants(options.constants.as_deref())?;

    let seed = match options.seed {
        Some(seed) => seed,
        None => {
            let seed = rand::random::<u64>();
            info!(seed, "no seed given, drew a random one");
            seed
        }
    };

    let album = AlbumRequest {
        base_seed: seed,
        num_songs: options.num_songs,
        key: options.key,
        tempo: options.tempo,
        max_sections: options.max_sections,
    };
    let mut songs = match options.song_index {
        Some(index) => vec![generate_track(&constants, &album, index)
            .with_context(|| format!("Failed to generate song {}", index))?],
        None => generate_album(&constants, &album).context("Failed to generate songs")?,
    };

    if let Some(target) = &options.transpose_to {
        songs = songs
            .iter()
            .map(|song| transpose_song(song, target))
            .collect();
    }

    if let Some(path) = &options.graph_dot {
        fs::write(path, render_role_graph_dot(&constants.structure))
            .with_context(|| format!("Failed to write role graph to {}", path.display()))?;
        info!(path = %path.display(), "wrote role graph");
    }

    if let Some(dir) = &options.out_dir {
        write_songs(dir, &songs)?;
    }

    if options.json {
        let json = if songs.len() == 1 {
            serde_json::to_string_pretty(&songs[0])
        } else {
            serde_json::to_string_pretty(&songs)
        }
        .context("Failed to serialize songs")?;
        println!("{}", json);
    } else if options.out_dir.is_none() {
        for song in &songs {
            print_summary(song);
        }
    }

    if options.print_graph {
        for song in &songs {
            let diagram = render(&song.structure);
            if options.json {
                eprint!("{}", diagram);
            } else {
                println!("{}", format!("Song {} structure:", song.index).cyan().bold());
                print!("{}", diagram);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Writes `song-<index>.json` for every song into `dir`.
fn write_songs(dir: &Path, songs: &[Song]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for song in songs {
        let path = dir.join(song_file_name(song.index));
        let json = song.to_json_pretty().context("Failed to serialize song")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote song");
        println!("{} {}", "Wrote:".green(), path.display());
    }
    Ok(())
}

fn song_file_name(index: u32) -> String {
    format!("song-{}.json", index)
}

/// Prints a colored summary of a song.
fn print_summary(song: &Song) {
    println!(
        "{} {} {} {} {}",
        format!("Song {}", song.index).cyan().bold(),
        song.key_name.bold(),
        format!("{} BPM", song.tempo).dimmed(),
        format!("seed {}", song.seed).dimmed(),
        format!(
            "({} sections, {} beats)",
            song.structure.len(),
            song.structure.total_beats()
        )
        .dimmed()
    );
    for section in &song.structure.sections {
        println!(
            "  {:<14} {:<9} {}",
            section.name,
            format!("[{} x{}]", section.label, section.passes()).dimmed(),
            chord_bars(&section.chords)
        );
    }
    println!();
}
