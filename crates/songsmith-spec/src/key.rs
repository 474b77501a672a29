//! Pitch classes, modes, and musical keys.
//!
//! A [`MusicalKey`] fixes a tonic and a mode for a whole song. Its spelling
//! preference (sharps or flats) is derived from the key alone, so every
//! pitch name emitted for the song is a pure function of the key.

use serde::{Deserialize, Serialize};

/// Note names used when a key prefers sharps.
const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note names used when a key prefers flats.
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Relative-major tonics whose signatures are written with flats.
///
/// C has no accidentals; it is grouped with the flat keys so that chromatic
/// chords in C (borrowed bVII, bVI, bIII) read naturally.
const FLAT_MAJOR_TONICS: [u8; 6] = [0, 1, 3, 5, 8, 10];

/// A pitch class in `0..12`, C = 0.
///
/// Deserialization rejects values of 12 and above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PitchClass(u8);

impl PitchClass {
    /// Creates a pitch class, reducing the value modulo 12.
    pub fn new(value: u8) -> Self {
        Self(value % 12)
    }

    /// Returns the numeric pitch class.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Shifts by a signed number of semitones.
    pub fn transpose(self, semitones: i32) -> Self {
        Self((self.0 as i32 + semitones).rem_euclid(12) as u8)
    }

    /// Upward interval in semitones from `self` to `other` (0..12).
    pub fn interval_to(self, other: PitchClass) -> u8 {
        (other.0 + 12 - self.0) % 12
    }

    /// Circular distance to `other` (0..=6).
    pub fn distance(self, other: PitchClass) -> u8 {
        let up = self.interval_to(other);
        up.min(12 - up)
    }

    /// Spells the pitch class with the given accidental preference.
    pub fn name(self, spelling: Spelling) -> &'static str {
        match spelling {
            Spelling::Sharps => SHARP_NAMES[self.0 as usize],
            Spelling::Flats => FLAT_NAMES[self.0 as usize],
        }
    }

    /// Parses a note name such as "C", "f#", "Bb" or "Cb".
    pub fn parse(name: &str) -> Result<Self, String> {
        let mut chars = name.trim().chars();
        let letter = chars
            .next()
            .ok_or_else(|| "empty note name".to_string())?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(format!("invalid note name: {}", name)),
        };
        let mut offset = 0;
        for accidental in chars {
            match accidental {
                '#' => offset += 1,
                'b' => offset -= 1,
                _ => return Err(format!("invalid note name: {}", name)),
            }
        }
        Ok(Self::new(0).transpose(base + offset))
    }
}

impl TryFrom<u8> for PitchClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value < 12 {
            Ok(Self(value))
        } else {
            Err(format!("pitch class must be below 12, got {}", value))
        }
    }
}

impl From<PitchClass> for u8 {
    fn from(pitch: PitchClass) -> u8 {
        pitch.0
    }
}

impl std::fmt::Display for PitchClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accidental preference for spelling pitch names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spelling {
    Sharps,
    Flats,
}

/// Scale mode of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Major,
    Minor,
    Dorian,
    Mixolydian,
}

impl Mode {
    /// Returns the mode as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
            Mode::Dorian => "dorian",
            Mode::Mixolydian => "mixolydian",
        }
    }

    /// Returns all modes.
    pub fn all() -> &'static [Mode] {
        &[Mode::Major, Mode::Minor, Mode::Dorian, Mode::Mixolydian]
    }

    /// The parallel mode chords are borrowed from.
    ///
    /// Modes with a major third borrow from minor; modes with a minor third
    /// borrow from major.
    pub fn parallel(&self) -> Mode {
        match self {
            Mode::Major | Mode::Mixolydian => Mode::Minor,
            Mode::Minor | Mode::Dorian => Mode::Major,
        }
    }

    /// Semitones from a tonic in this mode up to its relative major tonic.
    pub fn relative_major_offset(&self) -> i32 {
        match self {
            Mode::Major => 0,
            Mode::Minor => 3,
            Mode::Dorian => 10,
            Mode::Mixolydian => 5,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" | "maj" | "ionian" => Ok(Mode::Major),
            "minor" | "min" | "aeolian" => Ok(Mode::Minor),
            "dorian" => Ok(Mode::Dorian),
            "mixolydian" | "mixo" => Ok(Mode::Mixolydian),
            _ => Err(format!("unknown mode: {}", s)),
        }
    }
}

/// A tonic plus a mode, fixed for the whole song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MusicalKey {
    pub tonic: PitchClass,
    pub mode: Mode,
}

impl MusicalKey {
    pub fn new(tonic: PitchClass, mode: Mode) -> Self {
        Self { tonic, mode }
    }

    /// Shorthand for a major key.
    pub fn major(tonic: PitchClass) -> Self {
        Self::new(tonic, Mode::Major)
    }

    /// Accidental preference of this key, taken from its relative major.
    pub fn spelling(&self) -> Spelling {
        let relative = self.tonic.transpose(self.mode.relative_major_offset());
        if FLAT_MAJOR_TONICS.contains(&relative.value()) {
            Spelling::Flats
        } else {
            Spelling::Sharps
        }
    }

    /// Spells a pitch class the way this key writes it.
    pub fn spell(&self, pitch: PitchClass) -> &'static str {
        pitch.name(self.spelling())
    }

    /// Name of the tonic in this key's spelling.
    pub fn tonic_name(&self) -> &'static str {
        self.spell(self.tonic)
    }

    /// The twelve tonic names used for key selection, C upward.
    pub fn all_tonics() -> &'static [&'static str] {
        &[
            "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
        ]
    }
}

impl std::fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.tonic_name(), self.mode)
    }
}

impl std::str::FromStr for MusicalKey {
    type Err = String;

    /// Accepts "C", "C major", "Am", "A minor", "F#m", "D dorian".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (tonic_part, mode_part) = match s.split_once(char::is_whitespace) {
            Some((tonic, mode)) => (tonic, Some(mode.trim())),
            None => (s, None),
        };

        let (tonic_part, mode) = match mode_part {
            Some(mode) => (tonic_part, mode.parse::<Mode>()?),
            None => match tonic_part.strip_suffix('m') {
                Some(tonic) if !tonic.is_empty() => (tonic, Mode::Minor),
                _ => (tonic_part, Mode::Major),
            },
        };

        let tonic = PitchClass::parse(tonic_part).map_err(|_| format!("invalid key: {}", s))?;
        Ok(Self::new(tonic, mode))
    }
}
