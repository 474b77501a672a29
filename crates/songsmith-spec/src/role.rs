//! Harmonic roles a section can play in a song.

use serde::{Deserialize, Serialize};

/// Structural role of a section.
///
/// Roles are the nodes of the role-transition graph and the keys of the
/// progression template table. Wherever candidates have to be put in a stable
/// order, roles are compared by their [`as_str`](Self::as_str) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionRole {
    Intro,
    Verse,
    PreChorus,
    Chorus,
    PostChorus,
    Bridge,
    Solo,
    Outro,
}

impl SectionRole {
    /// Returns the role identifier used in constants tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionRole::Intro => "intro",
            SectionRole::Verse => "verse",
            SectionRole::PreChorus => "pre_chorus",
            SectionRole::Chorus => "chorus",
            SectionRole::PostChorus => "post_chorus",
            SectionRole::Bridge => "bridge",
            SectionRole::Solo => "solo",
            SectionRole::Outro => "outro",
        }
    }

    /// Returns the name printed on chord charts.
    pub fn display_name(&self) -> &'static str {
        match self {
            SectionRole::Intro => "Intro",
            SectionRole::Verse => "Verse",
            SectionRole::PreChorus => "Pre-Chorus",
            SectionRole::Chorus => "Chorus",
            SectionRole::PostChorus => "Post-Chorus",
            SectionRole::Bridge => "Bridge",
            SectionRole::Solo => "Solo",
            SectionRole::Outro => "Outro",
        }
    }

    /// Returns all roles.
    pub fn all() -> &'static [SectionRole] {
        &[
            SectionRole::Intro,
            SectionRole::Verse,
            SectionRole::PreChorus,
            SectionRole::Chorus,
            SectionRole::PostChorus,
            SectionRole::Bridge,
            SectionRole::Solo,
            SectionRole::Outro,
        ]
    }
}

// Ordering follows the identifier string, not declaration order.
impl Ord for SectionRole {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for SectionRole {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for SectionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SectionRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intro" => Ok(SectionRole::Intro),
            "verse" => Ok(SectionRole::Verse),
            "pre_chorus" => Ok(SectionRole::PreChorus),
            "chorus" => Ok(SectionRole::Chorus),
            "post_chorus" => Ok(SectionRole::PostChorus),
            "bridge" => Ok(SectionRole::Bridge),
            "solo" => Ok(SectionRole::Solo),
            "outro" => Ok(SectionRole::Outro),
            _ => Err(format!("unknown section role: {}", s)),
        }
    }
}
