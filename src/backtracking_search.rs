//! This module implements grid-filling using a recursive backtracking search. After establishing
//! node and arc consistency, we repeatedly pick the unassigned slot with the fewest remaining
//! options (breaking ties by how many slots cross it), try its options in least-constraining
//! order, and undo each choice exactly when the search below it fails. Optionally, we also
//! maintain arc consistency after each choice, which prunes more but costs more per step.

use smallvec::SmallVec;
use std::cmp::Reverse;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::arc_consistency::{establish_arc_consistency, propagate};
use crate::assignment::{Assignment, Choice};
use crate::domains::DomainStore;
use crate::grid_config::GridConfig;
use crate::layout::SlotId;
use crate::types::WordId;
use crate::util::{build_glyph_counts_for_cell, GlyphCounts};
use crate::{CHECK_INVARIANTS, LOG_FILL_PROCESS};

/// How many candidate attempts should we make between checks of the deadline and abort flags?
pub const INTERRUPT_FREQUENCY: usize = 10;

/// How many states should we visit between progress reports when `LOG_FILL_PROCESS` is on?
const LOG_FREQUENCY: usize = 10_000;

/// How much propagation to do after each choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InferenceMode {
    /// Only check each choice against the partial assignment; domains stay as they were after
    /// the initial propagation.
    #[default]
    None,

    /// After each choice, reduce the chosen slot's domain to the chosen word, remove that word
    /// from every other open slot, and re-run AC-3 from the chosen slot's neighbors.
    MaintainArcConsistency,
}

/// Per-run settings for a fill operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillOptions<'a> {
    pub inference: InferenceMode,

    /// Give up with `FillFailure::Timeout` after this long.
    pub timeout: Option<Duration>,

    /// An optional atomic flag that can be set to signal that the fill operation should be
    /// canceled.
    pub abort: Option<&'a AtomicBool>,
}

/// A struct tracking stats about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: usize,
    pub backtracks: usize,
    pub propagation_eliminations: usize,
    pub total_time: Duration,
    pub propagation_time: Duration,
}

impl Statistics {
    /// Fold the counters from a separate search (e.g. a parallel branch) into these.
    pub fn absorb(&mut self, other: &Statistics) {
        self.states += other.states;
        self.backtracks += other.backtracks;
    }
}

/// A struct representing the results of a successful fill operation.
#[derive(Debug, Clone)]
pub struct FillSuccess {
    pub assignment: Assignment,
    pub statistics: Statistics,
}

impl FillSuccess {
    #[must_use]
    pub fn choices(&self) -> Vec<Choice> {
        self.assignment.choices()
    }
}

/// The result of a fill operation that ran to completion.
#[derive(Debug, Clone)]
pub enum FillOutcome {
    Solved(FillSuccess),

    /// No assignment satisfies the layout with this word list.
    Unsatisfiable(Statistics),
}

impl FillOutcome {
    #[must_use]
    pub fn solution(&self) -> Option<&Assignment> {
        match self {
            FillOutcome::Solved(success) => Some(&success.assignment),
            FillOutcome::Unsatisfiable(_) => None,
        }
    }

    #[must_use]
    pub fn is_solved(&self) -> bool {
        matches!(self, FillOutcome::Solved(_))
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        match self {
            FillOutcome::Solved(success) => &success.statistics,
            FillOutcome::Unsatisfiable(statistics) => statistics,
        }
    }
}

/// Reasons a fill operation stopped before reaching an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillFailure {
    Timeout,
    Abort,
}

impl fmt::Display for FillFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillFailure::Timeout => write!(f, "Fill timed out"),
            FillFailure::Abort => write!(f, "Fill was canceled"),
        }
    }
}

impl std::error::Error for FillFailure {}

/// The state of a single depth-first search. The assignment and domains are shared by every
/// frame of the recursion, and each frame leaves them exactly as it found them.
pub(crate) struct Search<'a> {
    config: GridConfig<'a>,
    inference: InferenceMode,
    deadline: Option<Instant>,
    interrupts: SmallVec<[&'a AtomicBool; 2]>,
    attempts: usize,
    pub(crate) domains: DomainStore,
    pub(crate) assignment: Assignment,
    pub(crate) statistics: Statistics,
}

impl<'a> Search<'a> {
    pub(crate) fn new(
        config: GridConfig<'a>,
        domains: DomainStore,
        options: &FillOptions<'a>,
        deadline: Option<Instant>,
    ) -> Search<'a> {
        Search {
            config,
            inference: options.inference,
            deadline,
            interrupts: options.abort.into_iter().collect(),
            attempts: 0,
            assignment: Assignment::new(config.layout.slot_count()),
            domains,
            statistics: Statistics::default(),
        }
    }

    /// Also stop (with `FillFailure::Abort`) once this flag is set.
    pub(crate) fn add_interrupt(&mut self, flag: &'a AtomicBool) {
        self.interrupts.push(flag);
    }

    fn check_interrupts(&mut self) -> Result<(), FillFailure> {
        self.attempts += 1;
        if (self.attempts - 1) % INTERRUPT_FREQUENCY != 0 {
            return Ok(());
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(FillFailure::Timeout);
            }
        }
        if self
            .interrupts
            .iter()
            .any(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(FillFailure::Abort);
        }

        Ok(())
    }

    /// Pick the unassigned slot with the fewest remaining options, preferring slots with more
    /// crossings and then lower ids.
    pub(crate) fn select_unassigned_slot(&self) -> Option<SlotId> {
        (0..self.config.layout.slot_count())
            .filter(|&slot_id| !self.assignment.is_assigned(slot_id))
            .min_by_key(|&slot_id| {
                (
                    self.domains.len(slot_id),
                    Reverse(self.config.layout.degree(slot_id)),
                    slot_id,
                )
            })
    }

    /// Order a slot's remaining options by how many options each one would rule out in the
    /// crossing slots that are still unassigned, fewest first. An option rules out a crossing
    /// option if they disagree on the shared cell or if they're the same word.
    pub(crate) fn order_domain_values(&self, slot_id: SlotId) -> Vec<WordId> {
        let layout = self.config.layout;
        let word_list = self.config.word_list;

        // For each open crossing slot: its id, the offsets of the shared cell, its option count,
        // and how many of its options have each glyph in the shared cell.
        let crossings: Vec<(SlotId, usize, usize, usize, GlyphCounts)> = layout
            .neighbors(slot_id)
            .iter()
            .filter(|&&other_slot_id| !self.assignment.is_assigned(other_slot_id))
            .filter_map(|&other_slot_id| {
                let (cell_idx, other_cell_idx) = layout.overlap(slot_id, other_slot_id)?;
                Some((
                    other_slot_id,
                    cell_idx,
                    other_cell_idx,
                    self.domains.len(other_slot_id),
                    build_glyph_counts_for_cell(
                        word_list,
                        other_cell_idx,
                        self.domains.values(other_slot_id),
                    ),
                ))
            })
            .collect();

        let mut options: Vec<WordId> = self.domains.values(slot_id).collect();

        options.sort_by_cached_key(|&word_id| {
            let glyphs = &word_list.words[word_id].glyphs;

            let ruled_out: usize = crossings
                .iter()
                .map(|(other_slot_id, cell_idx, other_cell_idx, option_count, glyph_counts)| {
                    // A word too short to reach the crossing can't go here at all.
                    let Some(&glyph) = glyphs.get(*cell_idx) else {
                        return *option_count;
                    };
                    let compatible = glyph_counts[glyph] as usize;

                    // The word itself is compatible at the crossing only if it has the same
                    // glyph in both positions, in which case it's ruled out by the dupe rule
                    // instead.
                    let self_dupe = glyphs.get(*other_cell_idx) == Some(&glyph)
                        && self.domains.contains(*other_slot_id, word_id);

                    option_count - compatible + usize::from(self_dupe)
                })
                .sum();

            (ruled_out, word_id)
        });

        options
    }

    /// Prune the domains to reflect a choice that's just been added to the assignment. Returns
    /// false if some open slot ran out of options.
    fn infer(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        if self.inference == InferenceMode::None {
            return true;
        }

        self.domains
            .retain(slot_id, |other_word_id| other_word_id == word_id);

        for other_slot_id in 0..self.config.layout.slot_count() {
            if other_slot_id != slot_id
                && !self.assignment.is_assigned(other_slot_id)
                && self.domains.remove(other_slot_id, word_id)
                && self.domains.is_empty(other_slot_id)
            {
                return false;
            }
        }

        let arcs: Vec<(SlotId, SlotId)> = self
            .config
            .layout
            .neighbors(slot_id)
            .iter()
            .filter(|&&other_slot_id| !self.assignment.is_assigned(other_slot_id))
            .map(|&other_slot_id| (other_slot_id, slot_id))
            .collect();

        establish_arc_consistency(&self.config, &mut self.domains, Some(arcs)).is_ok()
    }

    /// Tentatively assign `word_id` to `slot_id` and search below it. Whatever the outcome, the
    /// assignment and domains are restored before returning; a solution is returned as a copy.
    pub(crate) fn try_choice(
        &mut self,
        slot_id: SlotId,
        word_id: WordId,
    ) -> Result<Option<Assignment>, FillFailure> {
        self.check_interrupts()?;

        if !self
            .assignment
            .is_consistent_with(&self.config, slot_id, word_id)
        {
            return Ok(None);
        }

        let checkpoint = self.domains.checkpoint();
        self.assignment.assign(slot_id, word_id);

        if CHECK_INVARIANTS {
            assert!(
                self.assignment.is_consistent(&self.config),
                "Incremental consistency check accepted an inconsistent assignment"
            );
        }

        let result = if self.infer(slot_id, word_id) {
            self.backtrack()
        } else {
            Ok(None)
        };

        self.assignment.unassign(slot_id);
        self.domains.rollback(checkpoint);

        if matches!(result, Ok(None)) {
            self.statistics.backtracks += 1;
        }

        result
    }

    /// Extend the current assignment to a complete one, if possible.
    pub(crate) fn backtrack(&mut self) -> Result<Option<Assignment>, FillFailure> {
        self.statistics.states += 1;

        if LOG_FILL_PROCESS && self.statistics.states % LOG_FREQUENCY == 0 {
            eprintln!(
                "search: {} states, {} backtracks, {} of {} slots assigned",
                self.statistics.states,
                self.statistics.backtracks,
                self.assignment.len(),
                self.config.layout.slot_count(),
            );
        }

        let Some(slot_id) = self.select_unassigned_slot() else {
            return Ok(Some(self.assignment.clone()));
        };

        for word_id in self.order_domain_values(slot_id) {
            if let Some(solution) = self.try_choice(slot_id, word_id)? {
                return Ok(Some(solution));
            }
        }

        Ok(None)
    }
}

/// When a run starting at `start` should give up. A timeout too large to represent as an
/// `Instant` means no deadline.
pub(crate) fn deadline_for(start: Instant, options: &FillOptions) -> Option<Instant> {
    options
        .timeout
        .and_then(|timeout| start.checked_add(timeout))
}

/// Build the initial domains for a grid and propagate node and arc consistency through them.
/// Returns `None` if propagation proves the grid can't be filled.
pub(crate) fn initial_domains(
    config: &GridConfig,
    statistics: &mut Statistics,
) -> Option<DomainStore> {
    let start = Instant::now();
    let mut domains = DomainStore::new(config.layout, config.word_list);
    let result = propagate(config, &mut domains);
    statistics.propagation_time = start.elapsed();

    let success = result.ok()?;
    statistics.propagation_eliminations = success.eliminations;
    domains.commit();
    Some(domains)
}

/// Search for a valid fill for the given grid: establish node and arc consistency, then run the
/// backtracking search. Running out of options is a normal `FillOutcome::Unsatisfiable`; only
/// timeouts and aborts are errors.
pub fn find_fill(
    config: &GridConfig,
    options: &FillOptions,
) -> Result<FillOutcome, FillFailure> {
    let start = Instant::now();
    let mut statistics = Statistics::default();

    let Some(domains) = initial_domains(config, &mut statistics) else {
        statistics.total_time = start.elapsed();
        return Ok(FillOutcome::Unsatisfiable(statistics));
    };

    let mut outcome = find_fill_with_domains(config, domains, options)?;

    let outcome_statistics = match &mut outcome {
        FillOutcome::Solved(success) => &mut success.statistics,
        FillOutcome::Unsatisfiable(search_statistics) => search_statistics,
    };
    outcome_statistics.propagation_time = statistics.propagation_time;
    outcome_statistics.propagation_eliminations = statistics.propagation_eliminations;
    outcome_statistics.total_time = start.elapsed();

    Ok(outcome)
}

/// Run the backtracking search over domains the caller has already prepared (for example, by
/// calling `propagate` or by building them by hand). Options whose length doesn't match their
/// slot are never chosen.
pub fn find_fill_with_domains(
    config: &GridConfig,
    domains: DomainStore,
    options: &FillOptions,
) -> Result<FillOutcome, FillFailure> {
    let start = Instant::now();
    let deadline = deadline_for(start, options);

    let mut search = Search::new(*config, domains, options, deadline);
    let solution = search.backtrack()?;

    let mut statistics = search.statistics;
    statistics.total_time = start.elapsed();

    if LOG_FILL_PROCESS {
        eprintln!(
            "search: {} after {} states and {} backtracks in {:?}",
            if solution.is_some() { "solved" } else { "exhausted" },
            statistics.states,
            statistics.backtracks,
            statistics.total_time,
        );
    }

    Ok(match solution {
        Some(assignment) => FillOutcome::Solved(FillSuccess {
            assignment,
            statistics,
        }),
        None => FillOutcome::Unsatisfiable(statistics),
    })
}
