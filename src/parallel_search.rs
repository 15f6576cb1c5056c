//! A parallel variant of the backtracking search. After propagation, we choose the first slot the
//! sequential search would branch on and hand each of its options to a separate rayon task, each
//! with its own copy of the domains and assignment. The first task to find a fill tells the rest
//! to stop.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::assignment::Assignment;
use crate::backtracking_search::{
    deadline_for, initial_domains, FillFailure, FillOptions, FillOutcome, FillSuccess, Search,
    Statistics,
};
use crate::grid_config::GridConfig;
use crate::LOG_FILL_PROCESS;

type BranchResult = (Result<Option<Assignment>, FillFailure>, Statistics);

/// Search for a valid fill for the given grid, exploring the options for the first chosen slot
/// in parallel. Finds a fill exactly when `find_fill` does, but when there are several, which one
/// comes back depends on scheduling.
pub fn find_fill_parallel(
    config: &GridConfig,
    options: &FillOptions,
) -> Result<FillOutcome, FillFailure> {
    let start = Instant::now();
    let deadline = deadline_for(start, options);
    let mut statistics = Statistics::default();

    let Some(domains) = initial_domains(config, &mut statistics) else {
        statistics.total_time = start.elapsed();
        return Ok(FillOutcome::Unsatisfiable(statistics));
    };

    let root = Search::new(*config, domains, options, deadline);
    statistics.states += 1;

    let Some(slot_id) = root.select_unassigned_slot() else {
        statistics.total_time = start.elapsed();
        return Ok(FillOutcome::Solved(FillSuccess {
            assignment: root.assignment,
            statistics,
        }));
    };
    let candidates = root.order_domain_values(slot_id);
    let domains = root.domains;

    if LOG_FILL_PROCESS {
        eprintln!(
            "parallel search: branching on slot {slot_id} with {} options",
            candidates.len()
        );
    }

    let found = AtomicBool::new(false);

    let results: Vec<BranchResult> = candidates
        .par_iter()
        .map(|&word_id| {
            let mut search = Search::new(*config, domains.clone(), options, deadline);
            search.add_interrupt(&found);

            let result = search.try_choice(slot_id, word_id);
            if matches!(result, Ok(Some(_))) {
                found.store(true, Ordering::Relaxed);
            }

            (result, search.statistics)
        })
        .collect();

    // Branches that stopped because another branch succeeded report `Abort`, so any fill takes
    // precedence over any failure.
    let mut solution: Option<Assignment> = None;
    let mut failure: Option<FillFailure> = None;

    for (result, branch_statistics) in results {
        statistics.absorb(&branch_statistics);
        match result {
            Ok(Some(assignment)) => {
                solution.get_or_insert(assignment);
            }
            Ok(None) => {}
            Err(branch_failure) => {
                failure.get_or_insert(branch_failure);
            }
        }
    }

    statistics.total_time = start.elapsed();

    match (solution, failure) {
        (Some(assignment), _) => Ok(FillOutcome::Solved(FillSuccess {
            assignment,
            statistics,
        })),
        (None, Some(failure)) => Err(failure),
        (None, None) => Ok(FillOutcome::Unsatisfiable(statistics)),
    }
}
