//! Constants validation logic.

use crate::error::{
    ErrorCode, ValidationError, ValidationResult, ValidationWarning, WarningCode,
};
use crate::key::{Mode, MusicalKey};

use super::{Constants, HarmonyRules, RoleGraph, SongParams};

/// The quality every table must define: the plain major triad.
const MAJOR_TRIAD: &str = "";

/// Highest interval a quality may use: anything below two octaves, so
/// compound tones such as the ninth (14) are allowed.
const MAX_INTERVAL: u8 = 23;

/// Validates every table and collects all problems found.
///
/// # Returns
/// * `ValidationResult` with `ok=true` if the tables can drive generation.
/// * `ValidationResult` with `ok=false` and one error per problem otherwise.
///
/// A graph whose terminal cannot be reached is reported as a warning only;
/// generation surfaces it as a structure error.
pub fn validate_constants(constants: &Constants) -> ValidationResult {
    let mut result = ValidationResult::default();

    validate_scales(constants, &mut result);
    validate_qualities(constants, &mut result);
    validate_templates(constants, &mut result);
    validate_structure(&constants.structure, &mut result);
    validate_rules(&constants.rules, &mut result);
    validate_extensions(constants, &mut result);
    validate_lengths(constants, &mut result);
    validate_song(&constants.song, &mut result);

    result
}

fn validate_scales(constants: &Constants, result: &mut ValidationResult) {
    for mode in Mode::all() {
        let Some(offsets) = constants.scales.get(mode) else {
            result.add_error(ValidationError::with_path(
                ErrorCode::MissingScale,
                format!("mode '{}' has no scale definition", mode),
                "scales",
            ));
            continue;
        };

        let ascending = offsets.windows(2).all(|w| w[0] < w[1]);
        if offsets.len() != 7 || offsets[0] != 0 || !ascending || offsets[6] >= 12 {
            result.add_error(ValidationError::with_path(
                ErrorCode::MalformedScale,
                format!(
                    "scale must be seven ascending offsets from 0 below 12, got {:?}",
                    offsets
                ),
                format!("scales.{}", mode),
            ));
        }
    }
}

fn validate_qualities(constants: &Constants, result: &mut ValidationResult) {
    if !constants.qualities.contains_key(MAJOR_TRIAD) {
        result.add_error(ValidationError::with_path(
            ErrorCode::MissingMajorTriad,
            "the major triad quality \"\" must be defined",
            "qualities",
        ));
    }

    for (symbol, intervals) in &constants.qualities {
        if intervals.first() != Some(&0) || intervals.iter().any(|&i| i > MAX_INTERVAL) {
            result.add_error(ValidationError::with_path(
                ErrorCode::MalformedQuality,
                format!(
                    "intervals must start at 0 and stay within {}, got {:?}",
                    MAX_INTERVAL, intervals
                ),
                format!("qualities.{:?}", symbol),
            ));
        }
    }
}

fn validate_templates(constants: &Constants, result: &mut ValidationResult) {
    let reachable = constants.structure.reachable_roles();

    for role in &reachable {
        let has_templates = constants
            .templates
            .get(role)
            .map(|t| !t.is_empty())
            .unwrap_or(false);
        if !has_templates {
            result.add_error(ValidationError::with_path(
                ErrorCode::MissingTemplate,
                format!("role '{}' is reachable but has no progression template", role),
                "templates",
            ));
        }
    }

    for (role, templates) in &constants.templates {
        if !reachable.contains(role) {
            result.add_warning(ValidationWarning::with_path(
                WarningCode::UnusedTemplates,
                format!("role '{}' is never visited by the role graph", role),
                format!("templates.{}", role),
            ));
        }

        for (i, template) in templates.iter().enumerate() {
            let path = format!("templates.{}[{}]", role, i);

            if template.slots.is_empty() || template.modes.is_empty() || template.weight <= 0.0 {
                result.add_error(ValidationError::with_path(
                    ErrorCode::MalformedTemplate,
                    format!(
                        "template '{}' needs slots, modes and a positive weight",
                        template.name
                    ),
                    path.clone(),
                ));
            }

            for (j, slot) in template.slots.iter().enumerate() {
                let slot_path = format!("{}.slots[{}]", path, j);
                if !(1..=7).contains(&slot.degree) {
                    result.add_error(ValidationError::with_path(
                        ErrorCode::MalformedSlot,
                        format!("degree must be 1..=7, got {}", slot.degree),
                        slot_path.clone(),
                    ));
                }
                if !(slot.beats > 0.0) || !slot.beats.is_finite() {
                    result.add_error(ValidationError::with_path(
                        ErrorCode::MalformedSlot,
                        format!("beats must be positive, got {}", slot.beats),
                        slot_path.clone(),
                    ));
                }
                if !constants.qualities.contains_key(&slot.quality) {
                    result.add_error(ValidationError::with_path(
                        ErrorCode::UnknownQuality,
                        format!("unknown quality {:?}", slot.quality),
                        slot_path,
                    ));
                }
            }
        }
    }
}

fn validate_structure(graph: &RoleGraph, result: &mut ValidationResult) {
    if graph.start.is_empty() {
        result.add_error(ValidationError::with_path(
            ErrorCode::EmptyStart,
            "role graph needs at least one start edge",
            "structure.start",
        ));
    }

    for (i, edge) in graph.start.iter().enumerate() {
        if !(edge.weight > 0.0) || !edge.weight.is_finite() {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidTransitionWeight,
                format!("weight must be positive, got {}", edge.weight),
                format!("structure.start[{}]", i),
            ));
        }
    }

    for (from, edges) in &graph.transitions {
        if *from == graph.terminal && !edges.is_empty() {
            result.add_error(ValidationError::with_path(
                ErrorCode::TerminalHasTransitions,
                format!("terminal role '{}' must not have outgoing transitions", from),
                format!("structure.transitions.{}", from),
            ));
        }
        for (i, edge) in edges.iter().enumerate() {
            if !(edge.weight > 0.0) || !edge.weight.is_finite() {
                result.add_error(ValidationError::with_path(
                    ErrorCode::InvalidTransitionWeight,
                    format!("weight must be positive, got {}", edge.weight),
                    format!("structure.transitions.{}[{}]", from, i),
                ));
            }
        }
    }

    for role in graph.reachable_roles() {
        if role != graph.terminal && graph.outgoing(role).is_empty() {
            result.add_error(ValidationError::with_path(
                ErrorCode::DeadEndRole,
                format!("role '{}' has no outgoing transitions", role),
                format!("structure.transitions.{}", role),
            ));
        }
    }

    if !graph.start.is_empty() && graph.shortest_song().is_none() {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::UnreachableTerminal,
            format!("no path from the start edges reaches '{}'", graph.terminal),
            "structure",
        ));
    }
}

fn validate_probability(value: f64, name: &str, result: &mut ValidationResult) {
    if !(0.0..=1.0).contains(&value) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidProbability,
            format!("probability must be within [0, 1], got {}", value),
            format!("rules.{}", name),
        ));
    }
}

fn validate_rules(rules: &HarmonyRules, result: &mut ValidationResult) {
    validate_probability(rules.borrow_probability, "borrow_probability", result);
    validate_probability(
        rules.cadence_intensify_probability,
        "cadence_intensify_probability",
        result,
    );
    validate_probability(rules.extension_probability, "extension_probability", result);
    validate_probability(rules.invert_probability, "invert_probability", result);
    validate_probability(
        rules.pass_variation_probability,
        "pass_variation_probability",
        result,
    );
    validate_probability(
        rules.final_pass_variation_probability,
        "final_pass_variation_probability",
        result,
    );
    validate_probability(
        rules.repeat_variation_probability,
        "repeat_variation_probability",
        result,
    );
    validate_probability(
        rules.double_final_chorus_probability,
        "double_final_chorus_probability",
        result,
    );
    validate_probability(
        rules.halve_final_verse_probability,
        "halve_final_verse_probability",
        result,
    );
    for (kind, weight) in &rules.variation_weights {
        if !(*weight >= 0.0) || !weight.is_finite() {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidRule,
                format!("variation weight must be non-negative, got {}", weight),
                format!("rules.variation_weights.{:?}", kind),
            ));
        }
    }

    if rules.passing_bass_threshold > 6 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidRule,
            format!(
                "circular root distance is at most 6, threshold {} never triggers",
                rules.passing_bass_threshold
            ),
            "rules.passing_bass_threshold",
        ));
    }
    if !(rules.passing_bass_min_beats > 0.0) || !rules.passing_bass_min_beats.is_finite() {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidRule,
            format!(
                "passing_bass_min_beats must be positive, got {}",
                rules.passing_bass_min_beats
            ),
            "rules.passing_bass_min_beats",
        ));
    }
    if rules.beats_per_bar == 0 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidRule,
            "beats_per_bar must be at least 1",
            "rules.beats_per_bar",
        ));
    }
    if rules.max_retries == 0 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidRule,
            "max_retries must be at least 1",
            "rules.max_retries",
        ));
    }
}

fn validate_extensions(constants: &Constants, result: &mut ValidationResult) {
    for (base, options) in &constants.extensions {
        let path = format!("extensions.{:?}", base);
        if !constants.qualities.contains_key(base) {
            result.add_error(ValidationError::with_path(
                ErrorCode::UnknownQuality,
                format!("unknown base quality {:?}", base),
                path.clone(),
            ));
        }
        for option in options {
            if !constants.qualities.contains_key(&option.quality) {
                result.add_error(ValidationError::with_path(
                    ErrorCode::UnknownQuality,
                    format!("unknown extension quality {:?}", option.quality),
                    path.clone(),
                ));
            }
            if !(option.weight > 0.0) || !option.weight.is_finite() {
                result.add_error(ValidationError::with_path(
                    ErrorCode::InvalidRule,
                    format!("extension weight must be positive, got {}", option.weight),
                    path.clone(),
                ));
            }
        }
    }
}

fn validate_lengths(constants: &Constants, result: &mut ValidationResult) {
    for (role, lengths) in &constants.lengths {
        let path = format!("lengths.{}", role);
        if lengths.is_empty() {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidSectionLength,
                format!("role '{}' lists no section lengths", role),
                path.clone(),
            ));
        }
        for (i, length) in lengths.iter().enumerate() {
            if length.bars == 0 || !(length.weight > 0.0) || !length.weight.is_finite() {
                result.add_error(ValidationError::with_path(
                    ErrorCode::InvalidSectionLength,
                    format!(
                        "length needs at least one bar and a positive weight, got {} bar(s) at {}",
                        length.bars, length.weight
                    ),
                    format!("{}[{}]", path, i),
                ));
            }
        }
    }
}

fn validate_song(song: &SongParams, result: &mut ValidationResult) {
    if song.min_tempo == 0 || song.min_tempo > song.max_tempo {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidTempoRange,
            format!(
                "tempo range must satisfy 0 < min <= max, got {}..={}",
                song.min_tempo, song.max_tempo
            ),
            "song",
        ));
    }

    let tonics = MusicalKey::all_tonics();
    for (name, weight) in &song.key_weights {
        if !tonics.contains(&name.as_str()) {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidKeyWeights,
                format!("unknown tonic '{}', expected one of {:?}", name, tonics),
                format!("song.key_weights.{}", name),
            ));
        }
        if !(*weight >= 0.0) || !weight.is_finite() {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidKeyWeights,
                format!("weight must be non-negative, got {}", weight),
                format!("song.key_weights.{}", name),
            ));
        }
    }
    let key_total: f64 = song.key_weights.values().filter(|w| **w > 0.0).sum();
    if key_total <= 0.0 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidKeyWeights,
            "key weights must sum to more than zero",
            "song.key_weights",
        ));
    }

    let mode_total: f64 = song.mode_weights.values().filter(|w| **w > 0.0).sum();
    if mode_total <= 0.0 || song.mode_weights.values().any(|w| !(*w >= 0.0)) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidKeyWeights,
            "mode weights must be non-negative and sum to more than zero",
            "song.mode_weights",
        ));
    }
}
