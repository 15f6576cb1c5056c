//! This module contains the constraint propagation used before and during the search:
//!
//! - Node consistency removes every option whose length doesn't match its slot.
//!
//! - Arc consistency (AC-3) removes every option that relies on a letter no option in a crossing
//!   slot can supply. For example, if 1D doesn't have any options starting with the letter A, we
//!   want to remove any options for 1A that start with the letter A.
//!
//! We keep revising arcs until no more eliminations are possible, or until some slot has no
//! options left, which means the grid can't be filled from this state.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use crate::domains::DomainStore;
use crate::grid_config::GridConfig;
use crate::layout::SlotId;
use crate::util::build_glyph_counts_for_cell;
use crate::LOG_FILL_PROCESS;

/// Result from a successful propagation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    /// How many arcs were revised.
    pub revisions: usize,

    /// How many (slot, word) options were removed.
    pub eliminations: usize,
}

/// Result from a failed propagation call: the first slot whose domain was wiped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub slot_id: SlotId,
}

/// Result from a propagation call.
pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Remove every option whose length differs from its slot's length. Words that
/// `DomainStore::new` never seeded count as eliminated here.
pub fn enforce_node_consistency(
    config: &GridConfig,
    domains: &mut DomainStore,
) -> ArcConsistencyResult {
    let mut eliminations = domains.take_unseeded_count();

    for slot_config in &config.layout.slot_configs {
        eliminations += domains.retain(slot_config.id, |word_id| {
            config.word_list.words[word_id].length() == slot_config.length
        });

        if domains.is_empty(slot_config.id) {
            return Err(ArcConsistencyFailure {
                slot_id: slot_config.id,
            });
        }
    }

    Ok(ArcConsistencySuccess {
        revisions: 0,
        eliminations,
    })
}

/// Make `slot_id` arc-consistent with `other_slot_id`, removing every option with no compatible
/// option in the other slot at their crossing. Returns whether anything was removed; slots that
/// don't cross are left alone.
pub fn revise(
    config: &GridConfig,
    domains: &mut DomainStore,
    slot_id: SlotId,
    other_slot_id: SlotId,
) -> bool {
    let Some((cell_idx, other_cell_idx)) = config.layout.overlap(slot_id, other_slot_id) else {
        return false;
    };

    // How many of the other slot's options have each glyph in the crossing cell?
    let other_glyph_counts = build_glyph_counts_for_cell(
        config.word_list,
        other_cell_idx,
        domains.values(other_slot_id),
    );

    let removed = domains.retain(slot_id, |word_id| {
        config.word_list.words[word_id]
            .glyphs
            .get(cell_idx)
            .map_or(false, |&glyph| other_glyph_counts[glyph] > 0)
    });

    removed > 0
}

/// Run AC-3 until every queued arc is consistent. If `arcs` is `None`, we start from every
/// ordered pair of crossing slots; otherwise we assume the rest of the grid was already
/// consistent and only start from the given arcs. An arc `(x, y)` means "revise x against y".
pub fn establish_arc_consistency(
    config: &GridConfig,
    domains: &mut DomainStore,
    arcs: Option<Vec<(SlotId, SlotId)>>,
) -> ArcConsistencyResult {
    if let Some(slot_id) = (0..domains.slot_count()).find(|&slot_id| domains.is_empty(slot_id)) {
        return Err(ArcConsistencyFailure { slot_id });
    }

    let mut queue: VecDeque<(SlotId, SlotId)> = VecDeque::new();
    let mut queued: HashSet<(SlotId, SlotId)> = HashSet::new();
    for arc in arcs.unwrap_or_else(|| config.layout.arcs()) {
        if queued.insert(arc) {
            queue.push_back(arc);
        }
    }

    let mut result = ArcConsistencySuccess::default();

    while let Some((slot_id, other_slot_id)) = queue.pop_front() {
        queued.remove(&(slot_id, other_slot_id));
        result.revisions += 1;

        let option_count = domains.len(slot_id);
        if !revise(config, domains, slot_id, other_slot_id) {
            continue;
        }
        result.eliminations += option_count - domains.len(slot_id);

        if domains.is_empty(slot_id) {
            return Err(ArcConsistencyFailure { slot_id });
        }

        // Losing options here may leave options in the slot's other neighbors unsupported.
        for &neighbor_id in config.layout.neighbors(slot_id) {
            if neighbor_id != other_slot_id && queued.insert((neighbor_id, slot_id)) {
                queue.push_back((neighbor_id, slot_id));
            }
        }
    }

    Ok(result)
}

/// Establish node consistency and then global arc consistency for a freshly-initialized store.
pub fn propagate(config: &GridConfig, domains: &mut DomainStore) -> ArcConsistencyResult {
    let start = Instant::now();

    let node = enforce_node_consistency(config, domains);
    let result = node.and_then(|node| {
        establish_arc_consistency(config, domains, None).map(|arc| ArcConsistencySuccess {
            revisions: arc.revisions,
            eliminations: node.eliminations + arc.eliminations,
        })
    });

    if LOG_FILL_PROCESS {
        match &result {
            Ok(success) => eprintln!(
                "propagation: {} revisions, {} eliminations in {:?}",
                success.revisions,
                success.eliminations,
                start.elapsed()
            ),
            Err(failure) => eprintln!(
                "propagation: domain of slot {} wiped out after {:?}",
                failure.slot_id,
                start.elapsed()
            ),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use crate::arc_consistency::{
        enforce_node_consistency, establish_arc_consistency, propagate, revise,
        ArcConsistencyFailure,
    };
    use crate::domains::DomainStore;
    use crate::grid_config::{GridConfig, OwnedGridConfig};
    use crate::layout::{Direction, Layout, SlotSpec};
    use crate::word_list::tests::{load_resource_word_list, resource_path};
    use crate::word_list::WordList;
    use std::fs;

    fn words(config: &GridConfig, domains: &DomainStore, slot_id: usize) -> Vec<String> {
        domains
            .values(slot_id)
            .map(|word_id| config.word_list.words[word_id].normalized_string.clone())
            .collect()
    }

    /// A three-letter across slot whose second cell is the first cell of a three-letter down slot.
    fn cat_ant_config() -> OwnedGridConfig {
        let layout = Layout::new(
            3,
            3,
            &[
                SlotSpec::new(0, 0, Direction::Across, 3),
                SlotSpec::new(0, 1, Direction::Down, 3),
            ],
        )
        .unwrap();
        OwnedGridConfig {
            layout,
            word_list: WordList::from_words(["cat", "dog", "ant"]),
        }
    }

    fn structure0_config() -> OwnedGridConfig {
        let template = fs::read_to_string(resource_path("structure0.txt")).unwrap();
        OwnedGridConfig {
            layout: Layout::from_template(&template).unwrap(),
            word_list: load_resource_word_list("words0.txt"),
        }
    }

    /// Assert that every remaining option has support in every crossing slot.
    fn assert_arc_consistent(config: &GridConfig, domains: &DomainStore) {
        for (slot_id, other_slot_id) in config.layout.arcs() {
            let (cell, other_cell) = config.layout.overlap(slot_id, other_slot_id).unwrap();
            for word_id in domains.values(slot_id) {
                let glyph = config.word_list.words[word_id].glyphs[cell];
                assert!(
                    domains
                        .values(other_slot_id)
                        .any(|other| config.word_list.words[other].glyphs[other_cell] == glyph),
                    "option {word_id} in slot {slot_id} has no support in slot {other_slot_id}"
                );
            }
        }
    }

    #[test]
    fn test_node_consistency_filters_by_length() {
        let owned = structure0_config();
        let config = owned.to_config_ref();
        let mut domains = DomainStore::new(config.layout, config.word_list);

        let result = enforce_node_consistency(&config, &mut domains).unwrap();

        for slot_config in &config.layout.slot_configs {
            assert!(domains
                .values(slot_config.id)
                .all(|word_id| config.word_list.words[word_id].length() == slot_config.length));
        }
        assert_eq!(words(&config, &domains, 0), vec!["one", "two", "six", "ten"]);
        assert_eq!(words(&config, &domains, 2), vec!["three", "seven", "eight"]);
        // 4 slots x 10 words, minus the 4 + 3 + 3 + 3 that fit
        assert_eq!(result.eliminations, 40 - 13);

        let again = enforce_node_consistency(&config, &mut domains).unwrap();
        assert_eq!(again.eliminations, 0);
    }

    #[test]
    fn test_node_consistency_fails_without_fitting_words() {
        let owned = OwnedGridConfig {
            layout: Layout::from_template("___").unwrap(),
            word_list: WordList::from_words(["ab", "abcd"]),
        };
        let config = owned.to_config_ref();
        let mut domains = DomainStore::new(config.layout, config.word_list);

        assert_eq!(
            enforce_node_consistency(&config, &mut domains),
            Err(ArcConsistencyFailure { slot_id: 0 })
        );
    }

    #[test]
    fn test_revise_ignores_slots_that_dont_cross() {
        let owned = structure0_config();
        let config = owned.to_config_ref();
        let mut domains = DomainStore::new(config.layout, config.word_list);
        enforce_node_consistency(&config, &mut domains).unwrap();

        assert!(!revise(&config, &mut domains, 0, 3));
        assert_eq!(domains.len(0), 4);
    }

    #[test]
    fn test_propagation_prunes_incompatible_crossings() {
        let owned = cat_ant_config();
        let config = owned.to_config_ref();
        let mut domains = DomainStore::new(config.layout, config.word_list);

        propagate(&config, &mut domains).unwrap();

        assert_eq!(words(&config, &domains, 0), vec!["cat"]);
        assert_eq!(words(&config, &domains, 1), vec!["ant"]);
    }

    #[test]
    fn test_arc_consistency_reaches_fixpoint() {
        let owned = structure0_config();
        let config = owned.to_config_ref();
        let mut domains = DomainStore::new(config.layout, config.word_list);

        let first = propagate(&config, &mut domains).unwrap();
        assert!(first.eliminations > 0);
        assert_arc_consistent(&config, &domains);

        let before: Vec<Vec<String>> = (0..4).map(|id| words(&config, &domains, id)).collect();
        let second = establish_arc_consistency(&config, &mut domains, None).unwrap();
        let after: Vec<Vec<String>> = (0..4).map(|id| words(&config, &domains, id)).collect();

        assert_eq!(second.eliminations, 0);
        assert_eq!(before, after);
    }

    #[test]
    fn test_arc_consistency_with_given_arcs() {
        let owned = cat_ant_config();
        let config = owned.to_config_ref();
        let mut domains = DomainStore::new(config.layout, config.word_list);
        enforce_node_consistency(&config, &mut domains).unwrap();

        // The down slot's only neighbor is the one it was revised against, so nothing else gets
        // queued and the across slot keeps its unsupported options.
        let result = establish_arc_consistency(&config, &mut domains, Some(vec![(1, 0)])).unwrap();

        assert_eq!(result.revisions, 1);
        assert_eq!(words(&config, &domains, 1), vec!["ant"]);
        assert_eq!(words(&config, &domains, 0), vec!["cat", "dog", "ant"]);
    }

    #[test]
    fn test_arc_consistency_reports_wipeout() {
        let owned = OwnedGridConfig {
            word_list: WordList::from_words(["abc", "xyz"]),
            ..cat_ant_config()
        };
        let config = owned.to_config_ref();
        let mut domains = DomainStore::new(config.layout, config.word_list);

        // The across slot needs a down word starting with 'b' or 'y'.
        assert!(propagate(&config, &mut domains).is_err());
    }
}
