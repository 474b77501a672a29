//! Scale-degree resolution and enharmonic spelling.
//!
//! A [`Transposer`] maps abstract chord descriptions (scale degree plus
//! quality) to concrete pitch classes in one key, and spells every pitch with
//! that key's accidental preference. Spelling never consults the RNG.

use songsmith_spec::{ChordEvent, Constants, Mode, MusicalKey, PitchClass};

/// Resolves scale degrees in a fixed key.
#[derive(Debug, Clone, Copy)]
pub struct Transposer<'a> {
    key: MusicalKey,
    constants: &'a Constants,
}

impl<'a> Transposer<'a> {
    pub fn new(key: MusicalKey, constants: &'a Constants) -> Self {
        Self { key, constants }
    }

    pub fn key(&self) -> MusicalKey {
        self.key
    }

    /// Root of a scale degree (1..=7) in the given mode, on this key's tonic.
    pub fn degree_root(&self, degree: u8, mode: Mode) -> Option<PitchClass> {
        let index = usize::from(degree.checked_sub(1)?);
        let offset = *self.constants.scale(mode)?.get(index)?;
        Some(self.key.tonic.transpose(i32::from(offset)))
    }

    /// Resolves a degree of the key's own mode to its root and spelled symbol.
    ///
    /// Returns `None` for a degree outside 1..=7 or an undefined quality.
    pub fn resolve(&self, degree: u8, quality: &str) -> Option<(PitchClass, String)> {
        self.constants.intervals(quality)?;
        let root = self.degree_root(degree, self.key.mode)?;
        Some((root, format!("{}{}", self.spell(root), quality)))
    }

    /// Root and diatonic triad quality of a degree in another mode on the
    /// same tonic. Used to borrow chords from the parallel mode.
    pub fn resolve_in_mode(&self, degree: u8, mode: Mode) -> Option<(PitchClass, &'static str)> {
        let root = self.degree_root(degree, mode)?;
        let quality = self.diatonic_quality(degree, mode)?;
        Some((root, quality))
    }

    /// Triad quality built by stacking scale thirds on a degree.
    pub fn diatonic_quality(&self, degree: u8, mode: Mode) -> Option<&'static str> {
        let scale = self.constants.scale(mode)?;
        if scale.len() != 7 || !(1..=7).contains(&degree) {
            return None;
        }
        let i = usize::from(degree - 1);
        let above = |steps: usize| (scale[(i + steps) % 7] + 12 - scale[i]) % 12;
        match (above(2), above(4)) {
            (4, 7) => Some(""),
            (3, 7) => Some("m"),
            (3, 6) => Some("dim"),
            (4, 8) => Some("aug"),
            _ => None,
        }
    }

    /// Pitch classes of the key's scale, tonic first.
    pub fn scale_tones(&self) -> Vec<PitchClass> {
        self.constants
            .scale(self.key.mode)
            .unwrap_or(&[])
            .iter()
            .map(|&offset| self.key.tonic.transpose(i32::from(offset)))
            .collect()
    }

    /// Pitch classes of a chord, root first.
    pub fn chord_tones(&self, root: PitchClass, quality: &str) -> Vec<PitchClass> {
        self.constants
            .intervals(quality)
            .unwrap_or(&[])
            .iter()
            .map(|&interval| root.transpose(i32::from(interval)))
            .collect()
    }

    /// Spells a pitch class the way this key writes it.
    pub fn spell(&self, pitch: PitchClass) -> String {
        self.key.spell(pitch).to_string()
    }

    /// Builds a chord event with root and bass spelled in this key.
    pub fn event(
        &self,
        root: PitchClass,
        quality: &str,
        bass: Option<PitchClass>,
        beats: f64,
    ) -> ChordEvent {
        ChordEvent {
            root,
            root_name: self.spell(root),
            quality: quality.to_string(),
            bass,
            bass_name: bass.map(|b| self.spell(b)),
            beats,
            bar_start: false,
        }
    }
}

/// Moves a chord by `semitones` and re-spells it for `target`.
pub fn transpose_chord(chord: &ChordEvent, semitones: i32, target: &MusicalKey) -> ChordEvent {
    let root = chord.root.transpose(semitones);
    let bass = chord.bass.map(|b| b.transpose(semitones));
    ChordEvent {
        root,
        root_name: target.spell(root).to_string(),
        quality: chord.quality.clone(),
        bass,
        bass_name: bass.map(|b| target.spell(b).to_string()),
        beats: chord.beats,
        bar_start: chord.bar_start,
    }
}
