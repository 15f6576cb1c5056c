use smallvec::SmallVec;

use crate::types::WordId;
use crate::word_list::WordList;
use crate::MAX_GLYPH_COUNT;

/// Number of occurrences of each glyph at a single cell, across some set of words.
pub type GlyphCounts = SmallVec<[u32; MAX_GLYPH_COUNT]>;

/// Count the glyphs appearing at `cell_idx` in each of the given words. Words too short to have
/// that cell are skipped.
pub fn build_glyph_counts_for_cell<I>(
    word_list: &WordList,
    cell_idx: usize,
    options: I,
) -> GlyphCounts
where
    I: IntoIterator<Item = WordId>,
{
    let mut result: GlyphCounts = (0..word_list.glyphs.len()).map(|_| 0).collect();

    for word_id in options {
        if let Some(&glyph) = word_list.words[word_id].glyphs.get(cell_idx) {
            result[glyph] += 1;
        }
    }

    result
}
