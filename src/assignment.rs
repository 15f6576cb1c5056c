use crate::grid_config::GridConfig;
use crate::layout::SlotId;
use crate::types::WordId;

/// A struct recording a slot assignment made during a fill process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// A partial mapping from slots to words. The search grows it by one slot per step and shrinks it
/// by one slot when it backtracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    word_ids: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Assignment {
    /// An empty assignment for a layout with `slot_count` slots.
    #[must_use]
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            word_ids: vec![None; slot_count],
            assigned_count: 0,
        }
    }

    #[must_use]
    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.word_ids[slot_id]
    }

    #[must_use]
    pub fn is_assigned(&self, slot_id: SlotId) -> bool {
        self.word_ids[slot_id].is_some()
    }

    /// Assign a word to a slot that doesn't have one yet.
    pub fn assign(&mut self, slot_id: SlotId, word_id: WordId) {
        assert!(
            self.word_ids[slot_id].is_none(),
            "Assigning slot {slot_id} twice?"
        );
        self.word_ids[slot_id] = Some(word_id);
        self.assigned_count += 1;
    }

    /// Clear a slot's word, returning it.
    pub fn unassign(&mut self, slot_id: SlotId) -> Option<WordId> {
        let word_id = self.word_ids[slot_id].take();
        if word_id.is_some() {
            self.assigned_count -= 1;
        }
        word_id
    }

    /// How many slots have a word?
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned_count == 0
    }

    /// Does every slot have a word?
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.assigned_count == self.word_ids.len()
    }

    /// The assigned slots and their words, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.word_ids
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| (slot_id, word_id)))
    }

    #[must_use]
    pub fn choices(&self) -> Vec<Choice> {
        self.iter()
            .map(|(slot_id, word_id)| Choice { slot_id, word_id })
            .collect()
    }

    /// The normalized string assigned to each slot, if any.
    #[must_use]
    pub fn strings<'a>(&self, config: &GridConfig<'a>) -> Vec<Option<&'a str>> {
        let word_list = config.word_list;
        self.word_ids
            .iter()
            .map(|word_id| {
                word_id.map(|word_id| word_list.words[word_id].normalized_string.as_str())
            })
            .collect()
    }

    /// Could `word_id` be assigned to `slot_id` without breaking the assignment? It has to fit the
    /// slot, agree with every assigned crossing slot on the shared cell, and not already be used
    /// by another slot.
    #[must_use]
    pub fn is_consistent_with(
        &self,
        config: &GridConfig,
        slot_id: SlotId,
        word_id: WordId,
    ) -> bool {
        let word = &config.word_list.words[word_id];
        if word.length() != config.layout.slot(slot_id).length {
            return false;
        }

        let reused = self.iter().any(|(other_slot_id, other_word_id)| {
            other_slot_id != slot_id && other_word_id == word_id
        });
        if reused {
            return false;
        }

        config.layout.neighbors(slot_id).iter().all(|&other_slot_id| {
            let Some(other_word_id) = self.word_ids[other_slot_id] else {
                return true;
            };
            let (cell_idx, other_cell_idx) = config
                .layout
                .overlap(slot_id, other_slot_id)
                .expect("neighbors must have an overlap");
            config.word_list.words[other_word_id].glyphs.get(other_cell_idx)
                == Some(&word.glyphs[cell_idx])
        })
    }

    /// Check every assigned slot against every other: lengths match, crossing cells agree, and no
    /// word is used twice.
    #[must_use]
    pub fn is_consistent(&self, config: &GridConfig) -> bool {
        let assigned: Vec<(SlotId, WordId)> = self.iter().collect();

        for (idx, &(slot_id, word_id)) in assigned.iter().enumerate() {
            let word = &config.word_list.words[word_id];
            if word.length() != config.layout.slot(slot_id).length {
                return false;
            }

            for &(other_slot_id, other_word_id) in &assigned[idx + 1..] {
                if word_id == other_word_id {
                    return false;
                }

                if let Some((cell_idx, other_cell_idx)) =
                    config.layout.overlap(slot_id, other_slot_id)
                {
                    let other_word = &config.word_list.words[other_word_id];
                    if word.glyphs.get(cell_idx) != other_word.glyphs.get(other_cell_idx) {
                        return false;
                    }
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use crate::assignment::{Assignment, Choice};
    use crate::grid_config::OwnedGridConfig;
    use crate::layout::Layout;
    use crate::word_list::WordList;

    fn config() -> OwnedGridConfig {
        OwnedGridConfig {
            // Slot 0 is 0,0 across, slot 1 is 0,0 down, slot 2 is 0,2 down.
            layout: Layout::from_template(
                "
                ___
                _#_
                _#_
                ",
            )
            .unwrap(),
            word_list: WordList::from_words(["cat", "cow", "toe", "at", "dot"]),
        }
    }

    #[test]
    fn test_assign_and_unassign() {
        let mut assignment = Assignment::new(3);
        assert!(assignment.is_empty());

        assignment.assign(1, 4);
        assert_eq!(assignment.get(1), Some(4));
        assert_eq!(assignment.len(), 1);
        assert!(!assignment.is_complete());

        assert_eq!(assignment.unassign(1), Some(4));
        assert_eq!(assignment.unassign(1), None);
        assert_eq!(assignment, Assignment::new(3));
    }

    #[test]
    fn test_consistency_rules() {
        let owned = config();
        let config = owned.to_config_ref();
        let id = |word: &str| config.word_list.word_id(word).unwrap();

        let mut assignment = Assignment::new(3);
        assert!(!assignment.is_consistent_with(&config, 0, id("at")), "wrong length");
        assert!(assignment.is_consistent_with(&config, 0, id("cat")));

        assignment.assign(0, id("cat"));
        assert!(assignment.is_consistent_with(&config, 1, id("cow")));
        assert!(!assignment.is_consistent_with(&config, 1, id("dot")), "crossing disagrees");
        assert!(!assignment.is_consistent_with(&config, 1, id("cat")), "word reused");
        assert!(assignment.is_consistent_with(&config, 2, id("toe")));

        assignment.assign(1, id("cow"));
        assignment.assign(2, id("toe"));
        assert!(assignment.is_complete());
        assert!(assignment.is_consistent(&config));
        assert_eq!(
            assignment.strings(&config),
            vec![Some("cat"), Some("cow"), Some("toe")]
        );
        assert_eq!(
            assignment.choices()[2],
            Choice {
                slot_id: 2,
                word_id: id("toe")
            }
        );

        assignment.unassign(2);
        assignment.assign(2, id("cow"));
        assert!(!assignment.is_consistent(&config));
    }
}
