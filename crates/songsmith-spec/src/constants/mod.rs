//! Constants tables: scales, chord qualities, templates, and the role graph.
//!
//! # Overview
//!
//! [`Constants`] is loaded once per run and passed by reference to every
//! component afterwards. The built-in tables are embedded in the binary; an
//! override file may replace any of the top-level tables:
//!
//! | Table        | Contents                                            |
//! |--------------|-----------------------------------------------------|
//! | `scales`     | mode -> seven semitone offsets from the tonic        |
//! | `qualities`  | chord symbol -> intervals above the root            |
//! | `templates`  | role -> weighted progression templates              |
//! | `structure`  | weighted role-transition graph and terminal role    |
//! | `rules`      | probabilities and thresholds for the synthesizer    |
//! | `extensions` | quality -> weighted extended qualities              |
//! | `lengths`    | role -> weighted section lengths in bars            |
//! | `song`       | tempo range and key selection weights               |
//!
//! Override policy: a table present in the override replaces the built-in
//! table entirely. `rules` is the one exception: it is a record of scalar
//! settings rather than a table of entries, so an override sets only the
//! rules it names and every other rule keeps its built-in value.

mod validation;

pub use validation::validate_constants;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::key::Mode;
use crate::role::SectionRole;

/// Embedded default tables.
const DEFAULT_CONSTANTS_YAML: &str = include_str!("defaults.yaml");

/// One chord slot of a progression template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Slot {
    /// Scale degree, 1..=7.
    pub degree: u8,
    /// Default quality symbol.
    pub quality: String,
    /// Duration in beats.
    pub beats: f64,
    /// True at positions that resolve the phrase.
    #[serde(default)]
    pub cadential: bool,
}

/// A weighted harmonic skeleton for a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgressionTemplate {
    pub name: String,
    pub weight: f64,
    /// Modes the template is written for.
    pub modes: Vec<Mode>,
    pub slots: Vec<Slot>,
}

impl ProgressionTemplate {
    /// Total duration in beats.
    pub fn total_beats(&self) -> f64 {
        self.slots.iter().map(|s| s.beats).sum()
    }
}

/// A weighted edge of the role graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transition {
    pub to: SectionRole,
    pub weight: f64,
}

/// Weighted directed graph of section-role transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleGraph {
    /// Edges from the song start to its first section.
    pub start: Vec<Transition>,
    /// Outgoing edges per role.
    #[serde(default)]
    pub transitions: BTreeMap<SectionRole, Vec<Transition>>,
    /// Role that ends every song.
    pub terminal: SectionRole,
}

impl RoleGraph {
    /// Outgoing edges of a role (empty if it has none).
    pub fn outgoing(&self, role: SectionRole) -> &[Transition] {
        self.transitions
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every role mentioned anywhere in the graph.
    pub fn roles(&self) -> BTreeSet<SectionRole> {
        let mut roles: BTreeSet<SectionRole> = self.start.iter().map(|t| t.to).collect();
        roles.insert(self.terminal);
        for (from, edges) in &self.transitions {
            roles.insert(*from);
            roles.extend(edges.iter().map(|t| t.to));
        }
        roles
    }

    /// Roles reachable from the start edges.
    pub fn reachable_roles(&self) -> BTreeSet<SectionRole> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<SectionRole> = self.start.iter().map(|t| t.to).collect();
        while let Some(role) = queue.pop_front() {
            if seen.insert(role) {
                queue.extend(self.outgoing(role).iter().map(|t| t.to));
            }
        }
        seen
    }

    /// Shortest completion length of each role, in sections.
    ///
    /// The terminal role maps to 1 (itself); a role one edge away maps to 2.
    /// Roles that cannot reach the terminal are absent.
    pub fn completion_lengths(&self) -> BTreeMap<SectionRole, usize> {
        let mut reverse: BTreeMap<SectionRole, Vec<SectionRole>> = BTreeMap::new();
        for (from, edges) in &self.transitions {
            for edge in edges {
                reverse.entry(edge.to).or_default().push(*from);
            }
        }

        let mut lengths = BTreeMap::new();
        lengths.insert(self.terminal, 1);
        let mut queue = VecDeque::from([self.terminal]);
        while let Some(role) = queue.pop_front() {
            let next = lengths[&role] + 1;
            for pred in reverse.get(&role).into_iter().flatten() {
                if !lengths.contains_key(pred) {
                    lengths.insert(*pred, next);
                    queue.push_back(*pred);
                }
            }
        }
        lengths
    }

    /// Fewest sections any complete song can have, or `None` if no start
    /// edge leads to the terminal.
    pub fn shortest_song(&self) -> Option<usize> {
        let lengths = self.completion_lengths();
        self.start
            .iter()
            .filter_map(|t| lengths.get(&t.to).copied())
            .min()
    }
}

/// How a kernel is altered to make a section variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationKind {
    /// Split a chord and put a new chord in its second half.
    Add,
    /// Drop a chord other than the first; its predecessor rings on.
    Remove,
    /// Replace one chord with another diatonic chord.
    Change,
    /// Play the kernel twice.
    Double,
}

impl VariationKind {
    /// Returns all kinds in draw order.
    pub fn all() -> &'static [VariationKind] {
        &[
            VariationKind::Add,
            VariationKind::Remove,
            VariationKind::Change,
            VariationKind::Double,
        ]
    }
}

/// Probabilities and thresholds used by the synthesizer and sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarmonyRules {
    /// Chance of borrowing from the parallel mode at a non-cadential slot.
    pub borrow_probability: f64,
    /// Chance of turning a cadential major dominant into a seventh chord.
    pub cadence_intensify_probability: f64,
    /// Chance of extending a non-cadential chord's quality.
    pub extension_probability: f64,
    /// Chance of voicing a non-cadential chord over one of its upper tones.
    pub invert_probability: f64,
    /// Root movement (semitones, circular) above which a passing bass is added.
    pub passing_bass_threshold: u8,
    /// Shortest chord that may be split for a passing bass.
    pub passing_bass_min_beats: f64,
    pub beats_per_bar: u32,
    /// Sampler attempts before giving up.
    pub max_retries: u32,
    /// Chance that a pass after the first plays a new variant.
    pub pass_variation_probability: f64,
    /// Same, for the last pass of a section with several passes.
    pub final_pass_variation_probability: f64,
    /// Chance that the last repeat of a role gets a new variant; each earlier
    /// repeat has half the chance of the one after it.
    pub repeat_variation_probability: f64,
    pub double_final_chorus_probability: f64,
    pub halve_final_verse_probability: f64,
    /// Relative weight of each way of varying a kernel.
    pub variation_weights: BTreeMap<VariationKind, f64>,
}

/// Rules named in an override file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesOverride {
    borrow_probability: Option<f64>,
    cadence_intensify_probability: Option<f64>,
    extension_probability: Option<f64>,
    invert_probability: Option<f64>,
    passing_bass_threshold: Option<u8>,
    passing_bass_min_beats: Option<f64>,
    beats_per_bar: Option<u32>,
    max_retries: Option<u32>,
    pass_variation_probability: Option<f64>,
    final_pass_variation_probability: Option<f64>,
    repeat_variation_probability: Option<f64>,
    double_final_chorus_probability: Option<f64>,
    halve_final_verse_probability: Option<f64>,
    variation_weights: Option<BTreeMap<VariationKind, f64>>,
}

impl RulesOverride {
    fn apply(self, rules: &mut HarmonyRules) {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }
        set(&mut rules.borrow_probability, self.borrow_probability);
        set(
            &mut rules.cadence_intensify_probability,
            self.cadence_intensify_probability,
        );
        set(&mut rules.extension_probability, self.extension_probability);
        set(&mut rules.invert_probability, self.invert_probability);
        set(&mut rules.passing_bass_threshold, self.passing_bass_threshold);
        set(&mut rules.passing_bass_min_beats, self.passing_bass_min_beats);
        set(&mut rules.beats_per_bar, self.beats_per_bar);
        set(&mut rules.max_retries, self.max_retries);
        set(
            &mut rules.pass_variation_probability,
            self.pass_variation_probability,
        );
        set(
            &mut rules.final_pass_variation_probability,
            self.final_pass_variation_probability,
        );
        set(
            &mut rules.repeat_variation_probability,
            self.repeat_variation_probability,
        );
        set(
            &mut rules.double_final_chorus_probability,
            self.double_final_chorus_probability,
        );
        set(
            &mut rules.halve_final_verse_probability,
            self.halve_final_verse_probability,
        );
        set(&mut rules.variation_weights, self.variation_weights);
    }
}

/// A weighted section length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedLength {
    pub bars: u32,
    pub weight: f64,
}

/// A weighted alternative quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedQuality {
    pub quality: String,
    pub weight: f64,
}

/// Song-level parameters used when tempo or key are not supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SongParams {
    pub min_tempo: u32,
    pub max_tempo: u32,
    /// Spread of the tempo distribution in percent (100 = nominal).
    pub tempo_variation: u32,
    /// Tonic name -> selection weight.
    pub key_weights: BTreeMap<String, f64>,
    /// Mode -> selection weight.
    pub mode_weights: BTreeMap<Mode, f64>,
}

/// The complete, validated constants tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constants {
    pub scales: BTreeMap<Mode, Vec<u8>>,
    pub qualities: BTreeMap<String, Vec<u8>>,
    pub templates: BTreeMap<SectionRole, Vec<ProgressionTemplate>>,
    pub structure: RoleGraph,
    pub rules: HarmonyRules,
    #[serde(default)]
    pub extensions: BTreeMap<String, Vec<WeightedQuality>>,
    /// Roles without an entry play their kernel once.
    #[serde(default)]
    pub lengths: BTreeMap<SectionRole, Vec<WeightedLength>>,
    pub song: SongParams,
}

/// Override file contents: every table optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstantsOverride {
    scales: Option<BTreeMap<Mode, Vec<u8>>>,
    qualities: Option<BTreeMap<String, Vec<u8>>>,
    templates: Option<BTreeMap<SectionRole, Vec<ProgressionTemplate>>>,
    structure: Option<RoleGraph>,
    rules: Option<RulesOverride>,
    extensions: Option<BTreeMap<String, Vec<WeightedQuality>>>,
    lengths: Option<BTreeMap<SectionRole, Vec<WeightedLength>>>,
    song: Option<SongParams>,
}

impl Constants {
    /// Returns the built-in tables.
    ///
    /// The embedded tables are validated by the test suite, so this only
    /// fails if the binary was built from a broken `defaults.yaml`.
    pub fn builtin() -> Result<Self, ConfigError> {
        let constants: Constants = serde_yaml::from_str(DEFAULT_CONSTANTS_YAML)?;
        constants.validated()
    }

    /// Loads the constants, applying an optional override file.
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as YAML.
    pub fn load(override_path: Option<&Path>) -> Result<Self, ConfigError> {
        let base: Constants = serde_yaml::from_str(DEFAULT_CONSTANTS_YAML)?;
        let Some(path) = override_path else {
            return base.validated();
        };

        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let overrides: ConstantsOverride = if is_json {
            serde_json::from_str(&source)?
        } else if source.trim().is_empty() {
            ConstantsOverride::default()
        } else {
            serde_yaml::from_str(&source)?
        };

        base.with_overrides(overrides).validated()
    }

    /// Parses and validates a complete set of tables from YAML.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let constants: Constants = serde_yaml::from_str(source)?;
        constants.validated()
    }

    /// Parses an override document and applies it on top of the built-ins.
    pub fn from_override_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let base: Constants = serde_yaml::from_str(DEFAULT_CONSTANTS_YAML)?;
        let overrides: ConstantsOverride = serde_yaml::from_str(source)?;
        base.with_overrides(overrides).validated()
    }

    /// Serializes the tables as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Templates written for a role in the given mode, in declaration order.
    pub fn templates_for(&self, role: SectionRole, mode: Mode) -> Vec<&ProgressionTemplate> {
        self.templates
            .get(&role)
            .map(|templates| {
                templates
                    .iter()
                    .filter(|t| t.modes.contains(&mode))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Scale offsets for a mode.
    pub fn scale(&self, mode: Mode) -> Option<&[u8]> {
        self.scales.get(&mode).map(Vec::as_slice)
    }

    /// Section lengths a role may take (empty if the table has no entry).
    pub fn lengths_for(&self, role: SectionRole) -> &[WeightedLength] {
        self.lengths.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Intervals of a quality symbol.
    pub fn intervals(&self, quality: &str) -> Option<&[u8]> {
        self.qualities.get(quality).map(Vec::as_slice)
    }

    fn with_overrides(mut self, overrides: ConstantsOverride) -> Self {
        if let Some(scales) = overrides.scales {
            self.scales = scales;
        }
        if let Some(qualities) = overrides.qualities {
            self.qualities = qualities;
        }
        if let Some(templates) = overrides.templates {
            self.templates = templates;
        }
        if let Some(structure) = overrides.structure {
            self.structure = structure;
        }
        if let Some(rules) = overrides.rules {
            rules.apply(&mut self.rules);
        }
        if let Some(extensions) = overrides.extensions {
            self.extensions = extensions;
        }
        if let Some(lengths) = overrides.lengths {
            self.lengths = lengths;
        }
        if let Some(song) = overrides.song {
            self.song = song;
        }
        self
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let result = validate_constants(&self);
        if result.is_ok() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_builtin_constants_are_valid() {
        let constants = Constants::builtin().unwrap();
        let result = validate_constants(&constants);
        assert!(result.is_ok(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(constants.structure.terminal, SectionRole::Outro);
    }

    #[test]
    fn test_builtin_covers_every_role_and_mode() {
        let constants = Constants::builtin().unwrap();
        for role in constants.structure.reachable_roles() {
            for mode in Mode::all() {
                assert!(
                    !constants.templates_for(role, *mode).is_empty(),
                    "no {} template for {}",
                    mode,
                    role
                );
            }
        }
    }

    #[test]
    fn test_completion_lengths() {
        let constants = Constants::builtin().unwrap();
        let lengths = constants.structure.completion_lengths();
        assert_eq!(lengths[&SectionRole::Outro], 1);
        assert_eq!(lengths[&SectionRole::Chorus], 2);
        assert_eq!(lengths[&SectionRole::Verse], 3);
        assert_eq!(lengths[&SectionRole::Intro], 4);
        assert_eq!(constants.structure.shortest_song(), Some(3));
    }

    #[test]
    fn test_load_without_override_matches_builtin() {
        assert_eq!(Constants::load(None).unwrap(), Constants::builtin().unwrap());
    }

    #[test]
    fn test_override_replaces_whole_table() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "rules:\n  borrow_probability: 0.0\nstructure:\n  start:\n    - {{ to: verse, weight: 1.0 }}\n  transitions:\n    verse:\n      - {{ to: outro, weight: 1.0 }}\n  terminal: outro"
        )
        .unwrap();

        let constants = Constants::load(Some(file.path())).unwrap();
        let builtin = Constants::builtin().unwrap();

        // Replaced tables take the override's values; rules not named keep
        // their built-in values.
        assert_eq!(constants.rules.borrow_probability, 0.0);
        assert_eq!(
            HarmonyRules {
                borrow_probability: builtin.rules.borrow_probability,
                ..constants.rules.clone()
            },
            builtin.rules
        );
        assert!(constants.structure.outgoing(SectionRole::Chorus).is_empty());
        assert_eq!(constants.structure.roles().len(), 2);

        // Absent tables keep the built-ins.
        assert_eq!(constants.templates, builtin.templates);
        assert_eq!(constants.scales, builtin.scales);
    }

    #[test]
    fn test_json_override() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"rules": {{"beats_per_bar": 3}}}}"#).unwrap();
        let constants = Constants::load(Some(file.path())).unwrap();
        assert_eq!(constants.rules.beats_per_bar, 3);
    }

    #[test]
    fn test_rules_override_sets_named_entries_only() {
        let constants = Constants::from_override_yaml_str(
            "rules:\n  invert_probability: 0.0\n  variation_weights: { double: 1.0 }\n",
        )
        .unwrap();
        let builtin = Constants::builtin().unwrap();
        assert_eq!(constants.rules.invert_probability, 0.0);
        assert_eq!(
            constants.rules.variation_weights,
            BTreeMap::from([(VariationKind::Double, 1.0)])
        );
        assert_eq!(constants.rules.max_retries, builtin.rules.max_retries);
        assert_eq!(
            constants.rules.halve_final_verse_probability,
            builtin.rules.halve_final_verse_probability
        );

        let err = Constants::from_override_yaml_str("rules:\n  tempo: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_lengths_table() {
        let constants = Constants::builtin().unwrap();
        for role in constants.structure.reachable_roles() {
            assert!(!constants.lengths_for(role).is_empty(), "{}", role);
        }

        let constants =
            Constants::from_override_yaml_str("lengths:\n  chorus: [{ bars: 16, weight: 1.0 }]\n")
                .unwrap();
        assert_eq!(
            constants.lengths_for(SectionRole::Chorus),
            &[WeightedLength {
                bars: 16,
                weight: 1.0
            }]
        );
        assert!(constants.lengths_for(SectionRole::Verse).is_empty());
    }

    #[test]
    fn test_empty_override_file_keeps_builtin() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let constants = Constants::load(Some(file.path())).unwrap();
        assert_eq!(constants, Constants::builtin().unwrap());
    }

    #[test]
    fn test_missing_override_file_is_io_error() {
        let err = Constants::load(Some(Path::new("/nonexistent/songsmith.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_override_is_parse_error() {
        let err = Constants::from_override_yaml_str("scales: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));

        let err = Constants::from_override_yaml_str("tempo: 120").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let err = Constants::from_override_yaml_str("qualities:\n  m: [0, 3, 7]").unwrap_err();
        match err {
            ConfigError::Invalid(result) => {
                assert!(result.has_error(crate::error::ErrorCode::MissingMajorTriad));
            }
            other => panic!("expected validation failure, got {other}"),
        }
    }

    #[test]
    fn test_yaml_roundtrip_of_builtin() {
        let constants = Constants::builtin().unwrap();
        let yaml = constants.to_yaml().unwrap();
        assert_eq!(Constants::from_yaml_str(&yaml).unwrap(), constants);
    }
}
