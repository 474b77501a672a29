//! Section-structure sampling.
//!
//! # Overview
//!
//! [`SectionGraphSampler`] builds a song in two stages.
//!
//! **Form.** A seeded weighted walk over the role-transition graph:
//!
//! - The walk starts from one of the graph's start edges and stops on the
//!   terminal role.
//! - Only transitions that can still reach the terminal within the section
//!   budget are candidates, so as the budget runs out the walk is forced
//!   along a shortest path to the terminal.
//! - Candidates are ordered by role identifier before each weighted draw;
//!   equal weights never depend on map iteration order.
//!
//! Each role owns one node of the label tree, allocated as a child of the
//! node the walk came from when the role is first performed. Every later
//! performance of the role returns to that node.
//!
//! **Arrangement.** Each node gets a kernel progression, synthesized once and
//! served from a [`ChordCache`]. The node's section length decides how many
//! passes of the kernel a performance plays, and the form records which
//! variant of the kernel each pass uses:
//!
//! - passes after the first may switch to a new variant;
//! - a repeat may swap one pass for a new variant, more likely the closer
//!   it is to the role's last performance;
//! - the last verse may drop the second half of its passes and the last
//!   chorus may play its form twice.
//!
//! Variants are cached under the node's label and their variant number, so
//! two performances of a role with the same form carry the same chords.
//!
//! A walk that cannot finish is retried on a perturbed stream derived from
//! the song seed; after the configured number of attempts the sampler gives
//! up with a [`StructureError`].

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use rand_pcg::Pcg32;
use tracing::{debug, warn};

use songsmith_spec::{
    derive_attempt_seed, ChordEvent, Constants, Label, MusicalKey, RoleGraph, Section,
    SectionNode, SectionRole, SongStructure, Transition,
};

use crate::error::{GenerateError, StructureError, TemplateError};
use crate::rng::{chance, create_rng, weighted_choice};
use crate::synthesize::ChordProgressionSynthesizer;

/// Identity under which a kernel or one of its variants is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub role: SectionRole,
    /// Label of the role's first performance.
    pub label: Label,
    pub key: MusicalKey,
    /// 0 for the kernel itself.
    pub variant: u32,
}

/// Counters reported by a [`ChordCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: usize,
    /// Lookups that called the synthesizer.
    pub misses: usize,
}

/// Memoized kernels and variants keyed by section identity.
#[derive(Debug, Default)]
pub struct ChordCache {
    entries: HashMap<CacheKey, Vec<ChordEvent>>,
    stats: CacheStats,
}

impl ChordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached chords for `key`, synthesizing them on first use.
    ///
    /// Variant 0 is a fresh kernel; any other variant is derived from the
    /// kernel cached under the same role and label.
    pub fn get_or_synthesize<R: Rng + ?Sized>(
        &mut self,
        key: CacheKey,
        synthesizer: &ChordProgressionSynthesizer<'_>,
        rng: &mut R,
    ) -> Result<Vec<ChordEvent>, TemplateError> {
        if let Some(chords) = self.entries.get(&key) {
            self.stats.hits += 1;
            debug!(label = %key.label, variant = key.variant, "chord cache hit");
            return Ok(chords.clone());
        }

        let chords = if key.variant == 0 {
            synthesizer.kernel(key.role, rng)?
        } else {
            let base = CacheKey {
                variant: 0,
                ..key.clone()
            };
            let kernel = match self.entries.get(&base) {
                Some(kernel) => kernel.clone(),
                None => {
                    let kernel = synthesizer.kernel(key.role, rng)?;
                    self.entries.insert(base, kernel.clone());
                    kernel
                }
            };
            synthesizer.vary(&kernel, rng)
        };
        self.stats.misses += 1;
        self.entries.insert(key, chords.clone());
        Ok(chords)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a single attempt stopped short of the terminal role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptFailure {
    /// No transition fits the remaining budget.
    NoCandidate,
    /// A node ran out of branch markers.
    LabelOverflow,
}

/// Generates song structures from a role graph.
#[derive(Debug, Clone, Copy)]
pub struct SectionGraphSampler<'a> {
    constants: &'a Constants,
    graph: &'a RoleGraph,
    synthesizer: ChordProgressionSynthesizer<'a>,
}

impl<'a> SectionGraphSampler<'a> {
    /// Creates a sampler over the constants' own role graph.
    pub fn new(constants: &'a Constants, key: MusicalKey) -> Self {
        Self::with_graph(constants, key, &constants.structure)
    }

    /// Creates a sampler over an explicit role graph.
    pub fn with_graph(constants: &'a Constants, key: MusicalKey, graph: &'a RoleGraph) -> Self {
        Self {
            constants,
            graph,
            synthesizer: ChordProgressionSynthesizer::new(constants, key),
        }
    }

    /// Generates a song structure of at most `max_sections` sections.
    pub fn generate(&self, seed: u64, max_sections: usize) -> Result<SongStructure, GenerateError> {
        self.generate_with_stats(seed, max_sections)
            .map(|(structure, _)| structure)
    }

    /// Like [`generate`](Self::generate), also returning the cache counters
    /// of the successful attempt.
    pub fn generate_with_stats(
        &self,
        seed: u64,
        max_sections: usize,
    ) -> Result<(SongStructure, CacheStats), GenerateError> {
        if max_sections == 0 {
            return Err(GenerateError::InvalidParameter(
                "max_sections must be at least 1".to_string(),
            ));
        }

        // Every role the walk could visit needs a template before any
        // section is produced.
        for role in self.graph.reachable_roles() {
            self.synthesizer.check_role(role)?;
        }

        let lengths = self.graph.completion_lengths();
        let attempts = self.constants.rules.max_retries.max(1);

        for attempt in 0..attempts {
            let mut rng = create_rng(derive_attempt_seed(seed, attempt));
            match self.walk(&mut rng, max_sections, &lengths) {
                Ok(walk) => {
                    let (structure, stats) = self.arrange(walk, &mut rng)?;
                    debug!(
                        attempt,
                        sections = structure.len(),
                        nodes = structure.lineage.len(),
                        cache_hits = stats.hits,
                        cache_misses = stats.misses,
                        "sampled song structure"
                    );
                    return Ok((structure, stats));
                }
                Err(failure) => {
                    debug!(attempt, ?failure, "structure attempt failed, retrying");
                }
            }
        }

        warn!(attempts, max_sections, "no structure reached the terminal role");
        Err(self.classify_failure(max_sections, attempts).into())
    }

    fn classify_failure(&self, max_sections: usize, attempts: u32) -> StructureError {
        match self.graph.shortest_song() {
            None => StructureError::NoPathToTerminal {
                terminal: self.graph.terminal,
            },
            Some(needed) if needed > max_sections => StructureError::BudgetTooSmall {
                needed,
                max_sections,
            },
            Some(_) => StructureError::RetriesExhausted {
                terminal: self.graph.terminal,
                attempts,
            },
        }
    }

    /// Samples the form of one attempt.
    fn walk(
        &self,
        rng: &mut Pcg32,
        max_sections: usize,
        lengths: &BTreeMap<SectionRole, usize>,
    ) -> Result<Walk, AttemptFailure> {
        let mut walk = Walk::default();

        let first = pick_transition(&self.graph.start, max_sections, lengths, rng)
            .ok_or(AttemptFailure::NoCandidate)?;
        let mut current = Label::root();
        walk.add_node(current.clone(), first, None);
        walk.performed.push(current.clone());

        loop {
            let role = walk.role_of(&current);
            if role == self.graph.terminal {
                return Ok(walk);
            }

            let remaining = max_sections.saturating_sub(walk.performed.len());
            let next = pick_transition(self.graph.outgoing(role), remaining, lengths, rng)
                .ok_or(AttemptFailure::NoCandidate)?;
            current = walk
                .move_to(&current, next)
                .ok_or(AttemptFailure::LabelOverflow)?;
            walk.performed.push(current.clone());
        }
    }

    /// Fills a sampled form with chords.
    fn arrange<R: Rng + ?Sized>(
        &self,
        walk: Walk,
        rng: &mut R,
    ) -> Result<(SongStructure, CacheStats), TemplateError> {
        let rules = &self.constants.rules;
        let key = self.synthesizer.key();

        let mut totals: BTreeMap<SectionRole, usize> = BTreeMap::new();
        for label in &walk.performed {
            *totals.entry(walk.role_of(label)).or_insert(0) += 1;
        }

        let mut cache = ChordCache::new();
        let mut forms: BTreeMap<Label, Vec<u32>> = BTreeMap::new();
        let mut counts: BTreeMap<SectionRole, usize> = BTreeMap::new();
        let mut sections = Vec::with_capacity(walk.performed.len());

        for label in &walk.performed {
            let role = walk.role_of(label);
            let count = counts.entry(role).or_insert(0);
            *count += 1;
            let number = *count;
            let total = totals.get(&role).copied().unwrap_or(number);
            let is_last = number == total;
            let cache_key = |variant| CacheKey {
                role,
                label: label.clone(),
                key,
                variant,
            };

            let mut form = if let Some(form) = forms.get_mut(label) {
                let later = i32::try_from(total - number).unwrap_or(i32::MAX);
                if chance(rng, rules.repeat_variation_probability * 0.5_f64.powi(later)) {
                    vary_one_pass(form, rng);
                }
                form.clone()
            } else {
                let kernel = cache.get_or_synthesize(cache_key(0), &self.synthesizer, rng)?;
                let passes = self.passes(role, &kernel, rng);
                let form = self.initial_form(passes, rng);
                forms.insert(label.clone(), form.clone());
                form
            };

            if role == SectionRole::Verse
                && is_last
                && form.len() % 2 == 0
                && chance(rng, rules.halve_final_verse_probability)
            {
                form.truncate(form.len() / 2);
            }
            if role == SectionRole::Chorus
                && is_last
                && chance(rng, rules.double_final_chorus_probability)
            {
                form.extend_from_within(..);
            }

            let mut chords = Vec::new();
            for &variant in &form {
                chords.extend(cache.get_or_synthesize(cache_key(variant), &self.synthesizer, rng)?);
            }

            sections.push(Section {
                label: label.clone(),
                role,
                name: format!("{} {}", role.display_name(), number),
                form,
                chords: self.synthesizer.finish(chords),
            });
        }

        let stats = cache.stats();
        Ok((
            SongStructure {
                sections,
                lineage: walk.lineage,
            },
            stats,
        ))
    }

    /// Number of kernel passes that fit a sampled section length.
    fn passes<R: Rng + ?Sized>(&self, role: SectionRole, kernel: &[ChordEvent], rng: &mut R) -> usize {
        let lengths = self.constants.lengths_for(role);
        let weights: Vec<f64> = lengths.iter().map(|l| l.weight).collect();
        let Some(pick) = weighted_choice(rng, &weights) else {
            return 1;
        };
        let bar = f64::from(self.constants.rules.beats_per_bar);
        let beats: f64 = kernel.iter().map(|c| c.beats).sum();
        let kernel_bars = (beats / bar).ceil().max(1.0) as u32;
        (lengths[pick].bars / kernel_bars).max(1) as usize
    }

    /// The form of a role's first performance.
    fn initial_form<R: Rng + ?Sized>(&self, passes: usize, rng: &mut R) -> Vec<u32> {
        let rules = &self.constants.rules;
        let mut form = vec![0; passes];
        let mut next = 1;
        for pass in 1..passes {
            let p = if pass + 1 == passes {
                rules.final_pass_variation_probability
            } else {
                rules.pass_variation_probability
            };
            if chance(rng, p) {
                form[pass] = next;
                next += 1;
            }
        }
        form
    }
}

/// Replaces one pass of `form` with a new variant; the last pass is twice as
/// likely as any other.
fn vary_one_pass<R: Rng + ?Sized>(form: &mut [u32], rng: &mut R) {
    let mut weights = vec![1.0; form.len()];
    if let Some(last) = weights.last_mut() {
        *last = 2.0;
    }
    if let Some(pass) = weighted_choice(rng, &weights) {
        let next = form.iter().max().map_or(1, |m| m + 1);
        form[pass] = next;
    }
}

/// Picks the next role among transitions that fit in `remaining` sections.
fn pick_transition<R: Rng + ?Sized>(
    edges: &[Transition],
    remaining: usize,
    lengths: &BTreeMap<SectionRole, usize>,
    rng: &mut R,
) -> Option<SectionRole> {
    let mut candidates: Vec<&Transition> = edges
        .iter()
        .filter(|t| lengths.get(&t.to).is_some_and(|&len| len <= remaining))
        .collect();
    candidates.sort_by_key(|t| t.to);

    let weights: Vec<f64> = candidates.iter().map(|t| t.weight).collect();
    let index = weighted_choice(rng, &weights)?;
    Some(candidates[index].to)
}

/// The form sampled by one walk.
#[derive(Default)]
struct Walk {
    lineage: BTreeMap<Label, SectionNode>,
    /// Node of each role performed so far.
    nodes: BTreeMap<SectionRole, Label>,
    /// Labels in performance order.
    performed: Vec<Label>,
}

impl Walk {
    fn role_of(&self, label: &Label) -> SectionRole {
        // Labels only come from add_node, so the lookup cannot miss.
        self.lineage[label].role
    }

    fn add_node(&mut self, label: Label, role: SectionRole, parent: Option<Label>) {
        self.nodes.entry(role).or_insert_with(|| label.clone());
        self.lineage
            .insert(label.clone(), SectionNode { label, role, parent });
    }

    /// Returns the node of `role`, allocating it under `from` on first use.
    fn move_to(&mut self, from: &Label, role: SectionRole) -> Option<Label> {
        if let Some(label) = self.nodes.get(&role) {
            return Some(label.clone());
        }
        let index = self
            .lineage
            .values()
            .filter(|n| n.parent.as_ref() == Some(from))
            .count();
        let child = from.child(index)?;
        self.add_node(child.clone(), role, Some(from.clone()));
        Some(child)
    }
}

/// Generates a song structure over an explicit role graph.
///
/// Convenience wrapper around [`SectionGraphSampler`].
pub fn generate_structure(
    seed: u64,
    key: MusicalKey,
    max_sections: usize,
    graph: &RoleGraph,
    constants: &Constants,
) -> Result<SongStructure, GenerateError> {
    SectionGraphSampler::with_graph(constants, key, graph).generate(seed, max_sections)
}
