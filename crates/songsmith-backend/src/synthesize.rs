//! Chord progression synthesis.
//!
//! # Overview
//!
//! [`ChordProgressionSynthesizer::synthesize`] turns a section role into a
//! concrete list of [`ChordEvent`]s in four passes:
//!
//! 1. Pick a progression template for the role and the key's mode (weighted).
//! 2. Resolve every slot to a chord. Non-cadential slots may borrow the
//!    parallel mode's chord on the same degree, extend their quality, or be
//!    voiced over an upper chord tone. Cadential slots keep their root in the
//!    bass; a minor dominant is raised to major and a major dominant may
//!    become a dominant seventh.
//! 3. Where the root jumps further than the passing-bass threshold, split the
//!    earlier chord in half and put a passing bass note under its second half.
//! 4. Mark the chords that start on a bar line.
//!
//! Passes 1 and 2 build the section's kernel ([`kernel`]); passes 3 and 4
//! ([`finish`]) draw no random values and run once over everything a
//! section plays. [`vary`] derives a variant from a kernel.
//!
//! [`kernel`]: ChordProgressionSynthesizer::kernel
//! [`finish`]: ChordProgressionSynthesizer::finish
//! [`vary`]: ChordProgressionSynthesizer::vary

use rand::Rng;
use tracing::debug;

use songsmith_spec::{
    ChordEvent, Constants, MusicalKey, PitchClass, SectionRole, Slot, VariationKind,
};

use crate::error::TemplateError;
use crate::rng::{chance, weighted_choice};
use crate::transpose::Transposer;

/// The dominant scale degree.
const DOMINANT: u8 = 5;

/// Quality symbols the cadence rule works with.
const MAJOR: &str = "";
const MINOR: &str = "m";
const DOMINANT_SEVENTH: &str = "7";

/// Tolerance for bar-line arithmetic on fractional beats.
const BEAT_EPSILON: f64 = 1e-9;

/// Shortest chord an added variation chord may split.
const MIN_SPLIT_BEATS: f64 = 2.0;

/// Pick weights of the first and last chord when varying a kernel.
const FIRST_CHORD_WEIGHT: f64 = 2.0;
const LAST_CHORD_WEIGHT: f64 = 3.0;

/// Synthesizes chord progressions for one key.
#[derive(Debug, Clone, Copy)]
pub struct ChordProgressionSynthesizer<'a> {
    constants: &'a Constants,
    transposer: Transposer<'a>,
}

impl<'a> ChordProgressionSynthesizer<'a> {
    pub fn new(constants: &'a Constants, key: MusicalKey) -> Self {
        Self {
            constants,
            transposer: Transposer::new(key, constants),
        }
    }

    pub fn key(&self) -> MusicalKey {
        self.transposer.key()
    }

    /// Returns an error if the role has no template for the key's mode.
    pub fn check_role(&self, role: SectionRole) -> Result<(), TemplateError> {
        if self.constants.templates_for(role, self.key().mode).is_empty() {
            Err(self.template_error(role))
        } else {
            Ok(())
        }
    }

    /// Produces the chord events of one section that plays its kernel once.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        role: SectionRole,
        rng: &mut R,
    ) -> Result<Vec<ChordEvent>, TemplateError> {
        let kernel = self.kernel(role, rng)?;
        Ok(self.finish(kernel))
    }

    /// Picks a template and resolves its slots.
    ///
    /// The result has neither passing basses nor bar marks; pass it (or a
    /// concatenation of kernels and variants) through [`finish`](Self::finish).
    pub fn kernel<R: Rng + ?Sized>(
        &self,
        role: SectionRole,
        rng: &mut R,
    ) -> Result<Vec<ChordEvent>, TemplateError> {
        let templates = self.constants.templates_for(role, self.key().mode);
        let weights: Vec<f64> = templates.iter().map(|t| t.weight).collect();
        let template = weighted_choice(rng, &weights)
            .and_then(|i| templates.get(i).copied())
            .ok_or_else(|| self.template_error(role))?;

        debug!(role = %role, template = %template.name, "selected progression template");

        let mut chords = Vec::with_capacity(template.slots.len());
        for slot in &template.slots {
            let (root, quality) = self
                .slot_chord(slot, rng)
                .ok_or_else(|| self.template_error(role))?;
            let bass = if slot.cadential {
                None
            } else {
                self.inversion(root, &quality, rng)
            };
            chords.push(self.transposer.event(root, &quality, bass, slot.beats));
        }
        Ok(chords)
    }

    /// Adds passing basses and bar marks.
    pub fn finish(&self, chords: Vec<ChordEvent>) -> Vec<ChordEvent> {
        let mut chords = self.add_passing_basses(chords);
        self.mark_bar_starts(&mut chords);
        chords
    }

    /// Derives a variant of `kernel`.
    ///
    /// The kind of change is drawn from the variation weights. Removing or
    /// changing a chord needs at least two chords, and adding one needs a
    /// chord long enough to split; otherwise the kernel comes back unchanged.
    /// The total length in beats is preserved except by [`VariationKind::Double`].
    pub fn vary<R: Rng + ?Sized>(&self, kernel: &[ChordEvent], rng: &mut R) -> Vec<ChordEvent> {
        let kinds = VariationKind::all();
        let weights: Vec<f64> = kinds
            .iter()
            .map(|kind| {
                self.constants
                    .rules
                    .variation_weights
                    .get(kind)
                    .copied()
                    .unwrap_or(0.0)
            })
            .collect();
        let Some(kind) = weighted_choice(rng, &weights).map(|i| kinds[i]) else {
            return kernel.to_vec();
        };
        debug!(?kind, chords = kernel.len(), "varying kernel");

        let mut chords = kernel.to_vec();
        let n = chords.len();
        match kind {
            VariationKind::Double => chords.extend_from_slice(kernel),
            VariationKind::Remove if n >= 2 => {
                let weights = edge_weights(n);
                if let Some(i) = weighted_choice(rng, &weights[1..]).map(|i| i + 1) {
                    let removed = chords.remove(i);
                    chords[i - 1].beats += removed.beats;
                }
            }
            VariationKind::Change if n >= 2 => {
                if let Some(i) = weighted_choice(rng, &edge_weights(n)) {
                    let mut avoid = vec![chords[i].root];
                    avoid.extend(i.checked_sub(1).map(|p| chords[p].root));
                    avoid.extend(chords.get(i + 1).map(|c| c.root));
                    if let Some(new) = self.substitute(&avoid, chords[i].beats, rng) {
                        chords[i] = new;
                    }
                }
            }
            VariationKind::Add => {
                let weights: Vec<f64> = chords
                    .iter()
                    .map(|c| {
                        if c.beats + BEAT_EPSILON >= MIN_SPLIT_BEATS {
                            c.beats
                        } else {
                            0.0
                        }
                    })
                    .collect();
                if let Some(i) = weighted_choice(rng, &weights) {
                    let half = chords[i].beats / 2.0;
                    let mut avoid = vec![chords[i].root];
                    avoid.extend(chords.get(i + 1).map(|c| c.root));
                    if let Some(new) = self.substitute(&avoid, half, rng) {
                        chords[i].beats = half;
                        chords.insert(i + 1, new);
                    }
                }
            }
            VariationKind::Remove | VariationKind::Change => {}
        }
        chords
    }

    /// A diatonic triad of the key whose root is not in `avoid`.
    fn substitute<R: Rng + ?Sized>(
        &self,
        avoid: &[PitchClass],
        beats: f64,
        rng: &mut R,
    ) -> Option<ChordEvent> {
        let mode = self.key().mode;
        let candidates: Vec<(PitchClass, &str)> = (1..=7)
            .filter_map(|degree| self.transposer.resolve_in_mode(degree, mode))
            .filter(|(root, quality)| {
                !avoid.contains(root) && self.constants.intervals(quality).is_some()
            })
            .collect();
        let pick = weighted_choice(rng, &vec![1.0; candidates.len()])?;
        let (root, quality) = candidates[pick];
        Some(self.transposer.event(root, quality, None, beats))
    }

    /// Maybe picks an upper chord tone to put in the bass.
    fn inversion<R: Rng + ?Sized>(
        &self,
        root: PitchClass,
        quality: &str,
        rng: &mut R,
    ) -> Option<PitchClass> {
        if !chance(rng, self.constants.rules.invert_probability) {
            return None;
        }
        let tones = self.transposer.chord_tones(root, quality);
        let upper: Vec<PitchClass> = tones.into_iter().skip(1).filter(|&pc| pc != root).collect();
        let pick = weighted_choice(rng, &vec![1.0; upper.len()])?;
        Some(upper[pick])
    }

    fn template_error(&self, role: SectionRole) -> TemplateError {
        TemplateError {
            role,
            mode: self.key().mode,
        }
    }

    /// Resolves one slot to a root and quality.
    fn slot_chord<R: Rng + ?Sized>(&self, slot: &Slot, rng: &mut R) -> Option<(PitchClass, String)> {
        let mode = self.key().mode;
        let root = self.transposer.degree_root(slot.degree, mode)?;
        let rules = &self.constants.rules;

        if slot.cadential {
            return Some((root, self.cadential_quality(slot, rng)));
        }

        if chance(rng, rules.borrow_probability) {
            if let Some(borrowed) = self.borrowed_chord(slot, root) {
                return Some(borrowed);
            }
        }

        let mut quality = slot.quality.clone();
        if chance(rng, rules.extension_probability) {
            if let Some(extended) = self.extended_quality(&quality, rng) {
                quality = extended;
            }
        }
        Some((root, quality))
    }

    /// The parallel mode's chord on the slot's degree, if it differs from the
    /// default chord and its quality is defined.
    fn borrowed_chord(&self, slot: &Slot, default_root: PitchClass) -> Option<(PitchClass, String)> {
        let parallel = self.key().mode.parallel();
        let (root, quality) = self.transposer.resolve_in_mode(slot.degree, parallel)?;
        self.constants.intervals(quality)?;
        if root == default_root && quality == slot.quality {
            return None;
        }
        debug!(degree = slot.degree, from = %parallel, "borrowed chord");
        Some((root, quality.to_string()))
    }

    fn extended_quality<R: Rng + ?Sized>(&self, quality: &str, rng: &mut R) -> Option<String> {
        let options = self.constants.extensions.get(quality)?;
        let weights: Vec<f64> = options.iter().map(|o| o.weight).collect();
        let pick = weighted_choice(rng, &weights)?;
        Some(options[pick].quality.clone())
    }

    /// Cadential slots resolve: a minor dominant gains its leading tone and a
    /// major dominant may be sharpened into a seventh chord.
    fn cadential_quality<R: Rng + ?Sized>(&self, slot: &Slot, rng: &mut R) -> String {
        if slot.degree != DOMINANT {
            return slot.quality.clone();
        }
        let quality = if slot.quality == MINOR {
            MAJOR
        } else {
            slot.quality.as_str()
        };
        if quality == MAJOR
            && self.constants.intervals(DOMINANT_SEVENTH).is_some()
            && chance(rng, self.constants.rules.cadence_intensify_probability)
        {
            return DOMINANT_SEVENTH.to_string();
        }
        quality.to_string()
    }

    /// Splits chords before wide root jumps and adds a passing bass.
    fn add_passing_basses(&self, chords: Vec<ChordEvent>) -> Vec<ChordEvent> {
        let rules = &self.constants.rules;
        let mut out = Vec::with_capacity(chords.len() * 2);

        for (i, chord) in chords.iter().enumerate() {
            let next = chords.get(i + 1);
            let bass = next.and_then(|next| {
                let wide = chord.root.distance(next.root) > rules.passing_bass_threshold;
                let long = chord.beats + BEAT_EPSILON >= rules.passing_bass_min_beats;
                if wide && long && chord.bass.is_none() {
                    self.passing_bass(chord, next.root)
                } else {
                    None
                }
            });

            match bass {
                Some(bass) => {
                    let half = chord.beats / 2.0;
                    out.push(ChordEvent {
                        beats: half,
                        ..chord.clone()
                    });
                    out.push(ChordEvent {
                        bass: Some(bass),
                        bass_name: Some(self.transposer.spell(bass)),
                        beats: half,
                        ..chord.clone()
                    });
                }
                None => out.push(chord.clone()),
            }
        }
        out
    }

    /// Picks the bass note that leads from `from` toward `target`.
    ///
    /// Candidates lie strictly between the two roots along the shorter way
    /// round (upward on a tritone) and are chord tones of `from` or scale
    /// tones of the key. The candidate nearest `target` wins; ties go to chord
    /// tones, then to the lower pitch class.
    pub fn passing_bass(&self, from: &ChordEvent, target: PitchClass) -> Option<PitchClass> {
        let up = from.root.interval_to(target);
        let (step, span) = if up <= 6 { (1, up) } else { (-1, 12 - up) };
        let chord_tones = self.transposer.chord_tones(from.root, &from.quality);
        let scale_tones = self.transposer.scale_tones();

        (1..span)
            .map(|k| from.root.transpose(step * i32::from(k)))
            .filter_map(|pc| {
                let is_chord_tone = chord_tones.contains(&pc);
                if is_chord_tone || scale_tones.contains(&pc) {
                    Some(((pc.distance(target), !is_chord_tone, pc.value()), pc))
                } else {
                    None
                }
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, pc)| pc)
    }

    fn mark_bar_starts(&self, chords: &mut [ChordEvent]) {
        let bar = f64::from(self.constants.rules.beats_per_bar);
        let mut position = 0.0;
        for chord in chords.iter_mut() {
            let offset = position % bar;
            chord.bar_start = offset < BEAT_EPSILON || bar - offset < BEAT_EPSILON;
            position += chord.beats;
        }
    }
}

/// Pick weights for a chord position: the first and last chords weigh more.
fn edge_weights(n: usize) -> Vec<f64> {
    let mut weights = vec![1.0; n];
    if let Some(first) = weights.first_mut() {
        *first = FIRST_CHORD_WEIGHT;
    }
    if let Some(last) = weights.last_mut() {
        *last = LAST_CHORD_WEIGHT;
    }
    weights
}

/// Produces the chord events of one section.
///
/// Convenience wrapper around [`ChordProgressionSynthesizer`].
pub fn synthesize<R: Rng + ?Sized>(
    role: SectionRole,
    constants: &Constants,
    key: MusicalKey,
    rng: &mut R,
) -> Result<Vec<ChordEvent>, TemplateError> {
    ChordProgressionSynthesizer::new(constants, key).synthesize(role, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use pretty_assertions::assert_eq;
    use songsmith_spec::{HarmonyRules, Mode, ProgressionTemplate};

    fn key(s: &str) -> MusicalKey {
        s.parse().unwrap()
    }

    fn slot(degree: u8, quality: &str, beats: f64, cadential: bool) -> Slot {
        Slot {
            degree,
            quality: quality.to_string(),
            beats,
            cadential,
        }
    }

    /// Constants with one verse template and no randomness in the rules.
    fn fixed_constants(slots: Vec<Slot>, rules: HarmonyRules) -> Constants {
        let mut constants = Constants::builtin().unwrap();
        constants.templates.insert(
            SectionRole::Verse,
            vec![ProgressionTemplate {
                name: "fixed".to_string(),
                weight: 1.0,
                modes: vec![Mode::Major, Mode::Minor],
                slots,
            }],
        );
        constants.rules = rules;
        constants
    }

    fn quiet_rules() -> HarmonyRules {
        HarmonyRules {
            borrow_probability: 0.0,
            cadence_intensify_probability: 0.0,
            extension_probability: 0.0,
            invert_probability: 0.0,
            passing_bass_threshold: 6,
            ..Constants::builtin().unwrap().rules
        }
    }

    fn only_variation(kind: VariationKind) -> HarmonyRules {
        HarmonyRules {
            variation_weights: [(kind, 1.0)].into_iter().collect(),
            ..quiet_rules()
        }
    }

    fn four_chord_slots() -> Vec<Slot> {
        vec![
            slot(1, "", 4.0, false),
            slot(5, "", 4.0, false),
            slot(6, "m", 4.0, false),
            slot(4, "", 4.0, true),
        ]
    }

    fn total_beats(chords: &[ChordEvent]) -> f64 {
        chords.iter().map(|c| c.beats).sum()
    }

    fn symbols(chords: &[ChordEvent]) -> Vec<String> {
        chords.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_plain_template_resolves_in_key() {
        let constants = fixed_constants(
            vec![
                slot(1, "", 4.0, false),
                slot(5, "", 4.0, false),
                slot(6, "m", 4.0, false),
                slot(4, "", 4.0, true),
            ],
            quiet_rules(),
        );
        let chords = synthesize(SectionRole::Verse, &constants, key("D"), &mut create_rng(1)).unwrap();
        assert_eq!(symbols(&chords), vec!["D", "A", "Bm", "G"]);
        assert!(chords.iter().all(|c| c.bar_start));
    }

    #[test]
    fn test_missing_template_for_mode() {
        let constants = Constants::builtin().unwrap();
        let mut only_major = constants.clone();
        for templates in only_major.templates.values_mut() {
            templates.retain(|t| t.modes == vec![Mode::Major]);
        }
        let err = synthesize(
            SectionRole::PostChorus,
            &only_major,
            key("C"),
            &mut create_rng(3),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TemplateError {
                role: SectionRole::PostChorus,
                mode: Mode::Major
            }
        );
    }

    #[test]
    fn test_cadential_minor_dominant_is_raised() {
        let constants = fixed_constants(
            vec![slot(1, "m", 4.0, false), slot(5, "m", 4.0, true)],
            quiet_rules(),
        );
        let chords = synthesize(SectionRole::Verse, &constants, key("Am"), &mut create_rng(9)).unwrap();
        assert_eq!(symbols(&chords), vec!["Am", "E"]);
    }

    #[test]
    fn test_cadential_dominant_intensified() {
        let rules = HarmonyRules {
            cadence_intensify_probability: 1.0,
            ..quiet_rules()
        };
        let constants = fixed_constants(
            vec![slot(4, "", 4.0, true), slot(5, "", 4.0, true)],
            rules,
        );
        let chords = synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(5)).unwrap();
        // Only the dominant is intensified.
        assert_eq!(symbols(&chords), vec!["F", "G7"]);
    }

    #[test]
    fn test_cadential_slots_never_borrow() {
        let rules = HarmonyRules {
            borrow_probability: 1.0,
            ..quiet_rules()
        };
        let constants = fixed_constants(
            vec![slot(6, "m", 4.0, false), slot(7, "dim", 4.0, true)],
            rules,
        );
        for seed in 0..20 {
            let chords =
                synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(seed)).unwrap();
            assert_eq!(symbols(&chords), vec!["Ab", "Bdim"]);
        }
    }

    #[test]
    fn test_borrow_that_matches_default_keeps_default() {
        let rules = HarmonyRules {
            borrow_probability: 1.0,
            ..quiet_rules()
        };
        // Degree 5 in C minor is G minor; degree 1 in C minor is C minor,
        // degree 2 in C minor is D diminished.
        let constants = fixed_constants(
            vec![
                slot(1, "m", 4.0, false),
                slot(2, "dim", 4.0, false),
                slot(5, "", 4.0, false),
            ],
            rules,
        );
        let chords = synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(2)).unwrap();
        assert_eq!(symbols(&chords), vec!["Cm", "Ddim", "Gm"]);
        assert_eq!(chords[0].quality, "m");
    }

    #[test]
    fn test_borrow_falls_back_when_quality_unknown() {
        let rules = HarmonyRules {
            borrow_probability: 1.0,
            ..quiet_rules()
        };
        let mut constants = fixed_constants(vec![slot(6, "m", 4.0, false)], rules);
        // Borrowing degree 6 from C minor yields an Ab major triad; with no
        // major triad symbol defined it cannot be written down.
        constants.qualities.remove("");
        let chords = synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(4)).unwrap();
        assert_eq!(symbols(&chords), vec!["Am"]);
    }

    #[test]
    fn test_extension_applies_to_plain_slots() {
        let rules = HarmonyRules {
            extension_probability: 1.0,
            ..quiet_rules()
        };
        let constants = fixed_constants(
            vec![slot(2, "m", 4.0, false), slot(5, "", 4.0, true)],
            rules,
        );
        let chords = synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(8)).unwrap();
        assert_eq!(symbols(&chords), vec!["Dm7", "G"]);
    }

    #[test]
    fn test_passing_bass_splits_wide_jump() {
        let rules = HarmonyRules {
            passing_bass_threshold: 4,
            ..quiet_rules()
        };
        let constants = fixed_constants(
            vec![
                slot(1, "", 4.0, false),
                slot(4, "", 4.0, false),
                slot(6, "m", 4.0, false),
                slot(2, "m", 4.0, false),
                slot(5, "", 4.0, true),
            ],
            rules,
        );
        let chords = synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(6)).unwrap();
        // C->F (5 semitones) and Am->Dm and Dm->G jump; F->Am does not.
        assert_eq!(
            symbols(&chords),
            vec!["C", "C/E", "F", "Am", "Am/C", "Dm", "Dm/F", "G"]
        );
        let beats: Vec<f64> = chords.iter().map(|c| c.beats).collect();
        assert_eq!(beats, vec![2.0, 2.0, 4.0, 2.0, 2.0, 2.0, 2.0, 4.0]);
        let bars: Vec<bool> = chords.iter().map(|c| c.bar_start).collect();
        assert_eq!(
            bars,
            vec![true, false, true, true, false, true, false, true]
        );
        // Total length is unchanged by the split.
        assert_eq!(beats.iter().sum::<f64>(), 20.0);
    }

    #[test]
    fn test_passing_bass_respects_min_beats() {
        let rules = HarmonyRules {
            passing_bass_threshold: 4,
            passing_bass_min_beats: 4.0,
            ..quiet_rules()
        };
        let constants = fixed_constants(
            vec![slot(1, "", 2.0, false), slot(4, "", 2.0, false)],
            rules,
        );
        let chords = synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(6)).unwrap();
        assert_eq!(symbols(&chords), vec!["C", "F"]);
        assert_eq!(
            chords.iter().map(|c| c.bar_start).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[test]
    fn test_inversion_voices_upper_tone_in_bass() {
        let rules = HarmonyRules {
            invert_probability: 1.0,
            ..quiet_rules()
        };
        let constants = fixed_constants(
            vec![slot(1, "", 4.0, false), slot(5, "", 4.0, true)],
            rules,
        );
        for seed in 0..20 {
            let chords =
                synthesize(SectionRole::Verse, &constants, key("C"), &mut create_rng(seed)).unwrap();
            let first = chords[0].symbol();
            assert!(first == "C/E" || first == "C/G", "{}", first);
            // Cadential chords stay in root position.
            assert_eq!(chords[1].symbol(), "G");
            assert_eq!(chords.len(), 2);
        }
    }

    #[test]
    fn test_vary_double_repeats_kernel() {
        let constants = fixed_constants(four_chord_slots(), only_variation(VariationKind::Double));
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        let mut rng = create_rng(3);
        let kernel = synth.kernel(SectionRole::Verse, &mut rng).unwrap();
        let variant = synth.vary(&kernel, &mut rng);
        assert_eq!(variant.len(), 8);
        assert_eq!(&variant[..4], &kernel[..]);
        assert_eq!(&variant[4..], &kernel[..]);
    }

    #[test]
    fn test_vary_remove_keeps_length_and_first_chord() {
        let constants = fixed_constants(four_chord_slots(), only_variation(VariationKind::Remove));
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        for seed in 0..20 {
            let mut rng = create_rng(seed);
            let kernel = synth.kernel(SectionRole::Verse, &mut rng).unwrap();
            let variant = synth.vary(&kernel, &mut rng);
            assert_eq!(variant.len(), 3);
            assert_eq!(variant[0].symbol(), "C");
            assert_eq!(total_beats(&variant), total_beats(&kernel));
        }
    }

    #[test]
    fn test_vary_change_replaces_one_chord() {
        let constants = fixed_constants(four_chord_slots(), only_variation(VariationKind::Change));
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        let scale = Transposer::new(key("C"), &constants).scale_tones();
        for seed in 0..20 {
            let mut rng = create_rng(seed);
            let kernel = synth.kernel(SectionRole::Verse, &mut rng).unwrap();
            let variant = synth.vary(&kernel, &mut rng);
            assert_eq!(variant.len(), kernel.len());
            let changed: Vec<usize> = (0..kernel.len())
                .filter(|&i| variant[i] != kernel[i])
                .collect();
            assert_eq!(changed.len(), 1, "seed {}", seed);
            let i = changed[0];
            assert_eq!(variant[i].beats, kernel[i].beats);
            assert!(scale.contains(&variant[i].root));
            assert_ne!(variant[i].root, kernel[i].root);
            if i > 0 {
                assert_ne!(variant[i].root, kernel[i - 1].root);
            }
            if i + 1 < kernel.len() {
                assert_ne!(variant[i].root, kernel[i + 1].root);
            }
        }
    }

    #[test]
    fn test_vary_add_splits_a_chord() {
        let constants = fixed_constants(four_chord_slots(), only_variation(VariationKind::Add));
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        for seed in 0..20 {
            let mut rng = create_rng(seed);
            let kernel = synth.kernel(SectionRole::Verse, &mut rng).unwrap();
            let variant = synth.vary(&kernel, &mut rng);
            assert_eq!(variant.len(), kernel.len() + 1);
            assert_eq!(total_beats(&variant), total_beats(&kernel));
            let halves = variant.iter().filter(|c| c.beats == 2.0).count();
            assert_eq!(halves, 2, "seed {}", seed);
        }
    }

    #[test]
    fn test_vary_without_room_returns_kernel() {
        let constants =
            fixed_constants(vec![slot(1, "", 1.0, false)], only_variation(VariationKind::Add));
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        let mut rng = create_rng(1);
        let kernel = synth.kernel(SectionRole::Verse, &mut rng).unwrap();
        assert_eq!(synth.vary(&kernel, &mut rng), kernel);

        let mut constants = fixed_constants(four_chord_slots(), quiet_rules());
        constants.rules.variation_weights.clear();
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        let kernel = synth.kernel(SectionRole::Verse, &mut rng).unwrap();
        assert_eq!(synth.vary(&kernel, &mut rng), kernel);
    }

    #[test]
    fn test_finish_marks_bars_across_passes() {
        let constants = fixed_constants(
            vec![slot(1, "", 2.0, false), slot(4, "", 4.0, false), slot(5, "", 2.0, true)],
            quiet_rules(),
        );
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        let kernel = synth.kernel(SectionRole::Verse, &mut create_rng(2)).unwrap();
        let mut twice = kernel.clone();
        twice.extend(kernel);
        let chords = synth.finish(twice);
        let bars: Vec<bool> = chords.iter().map(|c| c.bar_start).collect();
        assert_eq!(bars, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn test_passing_bass_choice() {
        let constants = Constants::builtin().unwrap();
        let synth = ChordProgressionSynthesizer::new(&constants, key("C"));
        let t = Transposer::new(key("C"), &constants);

        // G up to C: the third of G leads by step.
        let g = t.event(PitchClass::new(7), "", None, 4.0);
        assert_eq!(synth.passing_bass(&g, PitchClass::new(0)), Some(PitchClass::new(11)));

        // C down to G: only scale tones lie between; A is nearest.
        let c = t.event(PitchClass::new(0), "", None, 4.0);
        assert_eq!(synth.passing_bass(&c, PitchClass::new(7)), Some(PitchClass::new(9)));

        // Adjacent roots leave nothing in between.
        assert_eq!(synth.passing_bass(&c, PitchClass::new(2)), None);
    }

    #[test]
    fn test_flat_key_never_spells_sharps() {
        let constants = Constants::builtin().unwrap();
        for tonic in ["F", "Bb", "Eb", "Ab", "Db"] {
            let k = key(tonic);
            for seed in 0..10 {
                for role in constants.structure.reachable_roles() {
                    let chords = synthesize(role, &constants, k, &mut create_rng(seed)).unwrap();
                    for chord in chords {
                        assert!(!chord.symbol().contains('#'), "{} in {}", chord.symbol(), k);
                    }
                }
            }
        }
    }

    #[test]
    fn test_same_stream_same_progression() {
        let constants = Constants::builtin().unwrap();
        let a = synthesize(SectionRole::Chorus, &constants, key("G"), &mut create_rng(77)).unwrap();
        let b = synthesize(SectionRole::Chorus, &constants, key("G"), &mut create_rng(77)).unwrap();
        assert_eq!(a, b);
    }
}
