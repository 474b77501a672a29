//! Song structure types: labels, sections, chord events.
//!
//! # Overview
//!
//! A generated song has two views of its sections:
//!
//! - The **lineage**: a flat map from [`Label`] to [`SectionNode`]. Labels are
//!   path strings ("A", "AB", "ABA"), so ancestry is a prefix test and the tree
//!   needs no parent pointers.
//! - The **performance order**: the [`Section`]s in the order they are played.
//!   A label may be performed several times. Each performance records its
//!   form, the kernel variant played in every pass, and two performances of
//!   one label with the same form carry the same chords.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::{MusicalKey, PitchClass};
use crate::role::SectionRole;

/// Branch marker of the first child of any node.
const FIRST_MARKER: u8 = b'A';

/// Maximum number of children a single lineage node can have.
pub const MAX_CHILDREN: usize = 26;

/// Path-encoded identifier of a section in the generation tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// The label of the first section of every song.
    pub fn root() -> Self {
        Self(char::from(FIRST_MARKER).to_string())
    }

    /// Returns the label of this node's `index`-th child, or `None` past
    /// [`MAX_CHILDREN`].
    pub fn child(&self, index: usize) -> Option<Self> {
        if index >= MAX_CHILDREN {
            return None;
        }
        let mut s = self.0.clone();
        s.push(char::from(FIRST_MARKER + index as u8));
        Some(Self(s))
    }

    /// Returns the parent label, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_string()))
        }
    }

    /// Number of branch markers below the root (root = 0).
    pub fn depth(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Label) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// True if every character is a valid branch marker.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .bytes()
                .all(|b| (FIRST_MARKER..FIRST_MARKER + MAX_CHILDREN as u8).contains(&b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One chord occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    /// Root pitch class.
    pub root: PitchClass,
    /// Root spelled in the song's key.
    pub root_name: String,
    /// Quality symbol ("", "m", "7", "maj7", ...).
    pub quality: String,
    /// Bass override for slash chords.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass: Option<PitchClass>,
    /// Bass override spelled in the song's key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bass_name: Option<String>,
    /// Duration in beats.
    pub beats: f64,
    /// True if the chord starts on a bar line.
    pub bar_start: bool,
}

impl ChordEvent {
    /// Chord symbol as written on a chart, e.g. "Am7" or "C/E".
    pub fn symbol(&self) -> String {
        match &self.bass_name {
            Some(bass) => format!("{}{}/{}", self.root_name, self.quality, bass),
            None => format!("{}{}", self.root_name, self.quality),
        }
    }
}

/// A node of the lineage tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionNode {
    pub label: Label,
    pub role: SectionRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Label>,
}

/// A performed section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Lineage node this performance belongs to.
    pub label: Label,
    pub role: SectionRole,
    /// Human-readable name, e.g. "Chorus 2".
    pub name: String,
    /// Kernel variant played in each pass; variant 0 is the plain kernel.
    pub form: Vec<u32>,
    pub chords: Vec<ChordEvent>,
}

impl Section {
    /// Number of kernel passes.
    pub fn passes(&self) -> usize {
        self.form.len()
    }

    /// True if every pass plays the plain kernel.
    pub fn is_plain(&self) -> bool {
        self.form.iter().all(|&variant| variant == 0)
    }
}

/// The generated form of a song.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SongStructure {
    /// Sections in performance order.
    pub sections: Vec<Section>,
    /// Lineage tree keyed by label.
    pub lineage: BTreeMap<Label, SectionNode>,
}

impl SongStructure {
    /// Returns the last performed section.
    pub fn terminal_section(&self) -> Option<&Section> {
        self.sections.last()
    }

    /// Number of performed sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Total duration in beats.
    pub fn total_beats(&self) -> f64 {
        self.sections
            .iter()
            .flat_map(|s| s.chords.iter())
            .map(|c| c.beats)
            .sum()
    }

    /// How many times a label is performed.
    pub fn occurrences(&self, label: &Label) -> usize {
        self.sections.iter().filter(|s| &s.label == label).count()
    }

    /// Children of a lineage node, in label order.
    pub fn children<'a>(&'a self, label: &'a Label) -> impl Iterator<Item = &'a SectionNode> + 'a {
        self.lineage
            .values()
            .filter(move |n| n.parent.as_ref() == Some(label))
    }

    /// Checks the label-tree invariants.
    ///
    /// Every non-root node's label is its parent's label plus one marker, the
    /// parent exists, and every performed section refers to a lineage node of
    /// the same role. Performances sharing a label and a form must carry
    /// identical chords.
    pub fn validate_lineage(&self) -> Result<(), String> {
        let root = Label::root();
        if !self.lineage.is_empty() && !self.lineage.contains_key(&root) {
            return Err("lineage has no root node".to_string());
        }

        for (label, node) in &self.lineage {
            if &node.label != label {
                return Err(format!("node keyed {} carries label {}", label, node.label));
            }
            if !label.is_well_formed() {
                return Err(format!("malformed label {}", label));
            }
            match (&node.parent, label.parent()) {
                (None, None) => {}
                (Some(parent), Some(expected)) if *parent == expected => {
                    if !self.lineage.contains_key(parent) {
                        return Err(format!("parent {} of {} is missing", parent, label));
                    }
                }
                _ => {
                    return Err(format!(
                        "label {} is not a one-marker extension of its parent",
                        label
                    ))
                }
            }
        }

        let mut first_chords: BTreeMap<(&Label, &Vec<u32>), &Vec<ChordEvent>> = BTreeMap::new();
        for section in &self.sections {
            let node = self
                .lineage
                .get(&section.label)
                .ok_or_else(|| format!("section {} has no lineage node", section.label))?;
            if node.role != section.role {
                return Err(format!(
                    "section {} is {} but its node is {}",
                    section.label, section.role, node.role
                ));
            }
            if section.form.is_empty() {
                return Err(format!("section {} has an empty form", section.name));
            }
            let chords = first_chords
                .entry((&section.label, &section.form))
                .or_insert(&section.chords);
            if *chords != &section.chords {
                return Err(format!(
                    "repeats of {} with form {:?} differ in chords",
                    section.label, section.form
                ));
            }
        }

        Ok(())
    }
}

/// The core output artifact for one song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    /// Position in the album (0 for a single song).
    pub index: u32,
    /// Seed the song's streams were derived from.
    pub seed: u64,
    pub key: MusicalKey,
    /// Key as written, e.g. "Eb major".
    pub key_name: String,
    /// Beats per minute.
    pub tempo: u32,
    pub structure: SongStructure,
}

impl Song {
    /// Serializes the song to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
