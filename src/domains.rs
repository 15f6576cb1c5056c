//! Per-slot candidate sets ("domains"). Domains only ever shrink; every removal is also recorded
//! on a trail so that a search branch can prune speculatively and then roll the store back to
//! exactly the state it started from.

use bit_set::BitSet;

use crate::layout::{Layout, SlotId};
use crate::types::WordId;
use crate::word_list::WordList;

/// The live state of a single slot's domain.
#[derive(Debug, Clone)]
struct SlotDomain {
    /// Every word this slot has had since the last `commit`, in ascending id order.
    options: Vec<WordId>,

    /// Words removed from `options`, indexed by `WordId`.
    eliminations: BitSet,

    /// How many of `options` haven't been eliminated.
    remaining_option_count: usize,
}

impl SlotDomain {
    fn new(mut options: Vec<WordId>) -> SlotDomain {
        options.sort_unstable();
        options.dedup();
        SlotDomain {
            remaining_option_count: options.len(),
            eliminations: BitSet::new(),
            options,
        }
    }

    fn contains(&self, word_id: WordId) -> bool {
        !self.eliminations.contains(word_id) && self.options.binary_search(&word_id).is_ok()
    }
}

/// A position in the store's trail, as returned by `DomainStore::checkpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Mapping from each slot to the words still considered possible for it.
#[derive(Debug, Clone)]
pub struct DomainStore {
    domains: Vec<SlotDomain>,

    /// Every `(slot, word)` removal since the last `commit`, oldest first.
    trail: Vec<(SlotId, WordId)>,

    /// Words `new` never seeded because their length didn't fit the slot. Node consistency
    /// claims these as its eliminations.
    unseeded_count: usize,
}

impl DomainStore {
    /// Start each slot off with the words of its length. The other words count as not yet
    /// eliminated until `enforce_node_consistency` runs; see `take_unseeded_count`.
    #[must_use]
    pub fn new(layout: &Layout, word_list: &WordList) -> DomainStore {
        let options: Vec<Vec<WordId>> = layout
            .slot_configs
            .iter()
            .map(|slot_config| word_list.word_ids_of_length(slot_config.length).to_vec())
            .collect();
        let unseeded_count = options
            .iter()
            .map(|slot_options| word_list.len() - slot_options.len())
            .sum();

        DomainStore {
            unseeded_count,
            ..DomainStore::from_options(options)
        }
    }

    /// Build a store from an explicit candidate list for each slot.
    #[must_use]
    pub fn from_options(options: Vec<Vec<WordId>>) -> DomainStore {
        DomainStore {
            domains: options.into_iter().map(SlotDomain::new).collect(),
            trail: vec![],
            unseeded_count: 0,
        }
    }

    /// How many wrong-length words `new` left out, as a count of (slot, word) pairs. Returns zero
    /// after the first call.
    pub fn take_unseeded_count(&mut self) -> usize {
        std::mem::take(&mut self.unseeded_count)
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.domains.len()
    }

    /// How many words remain in this slot's domain?
    #[must_use]
    pub fn len(&self, slot_id: SlotId) -> usize {
        self.domains[slot_id].remaining_option_count
    }

    #[must_use]
    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.len(slot_id) == 0
    }

    #[must_use]
    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domains[slot_id].contains(word_id)
    }

    /// The words remaining in this slot's domain, in ascending id order.
    pub fn values(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        let domain = &self.domains[slot_id];
        domain
            .options
            .iter()
            .copied()
            .filter(move |&word_id| !domain.eliminations.contains(word_id))
    }

    /// Remove a word from a slot's domain, returning whether it was present.
    pub fn remove(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        let domain = &mut self.domains[slot_id];
        if !domain.contains(word_id) {
            return false;
        }

        domain.eliminations.insert(word_id);
        domain.remaining_option_count -= 1;
        self.trail.push((slot_id, word_id));
        true
    }

    /// Remove every word from a slot's domain that doesn't satisfy `keep`, returning how many
    /// were removed.
    pub fn retain<F>(&mut self, slot_id: SlotId, mut keep: F) -> usize
    where
        F: FnMut(WordId) -> bool,
    {
        let doomed: Vec<WordId> = self
            .values(slot_id)
            .filter(|&word_id| !keep(word_id))
            .collect();

        for &word_id in &doomed {
            self.remove(slot_id, word_id);
        }

        doomed.len()
    }

    /// Mark the current state so it can be restored with `rollback`.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.trail.len())
    }

    /// Undo every removal made since `checkpoint` was taken, newest first.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        assert!(
            checkpoint.0 <= self.trail.len(),
            "Rolling back to a checkpoint from before the last commit?"
        );

        for (slot_id, word_id) in self.trail.drain(checkpoint.0..).rev() {
            let domain = &mut self.domains[slot_id];
            domain.eliminations.remove(word_id);
            domain.remaining_option_count += 1;
        }
    }

    /// Make every removal so far permanent: forget the trail and drop eliminated words from each
    /// domain's option list. Checkpoints taken earlier are invalidated.
    pub fn commit(&mut self) {
        self.trail.clear();

        for domain in &mut self.domains {
            let eliminations = &domain.eliminations;
            domain
                .options
                .retain(|&word_id| !eliminations.contains(word_id));
            domain.eliminations.clear();
        }
    }
}
