//! This module bundles the inputs to a fill operation (a layout and a word list), independent of
//! the specific fill algorithm, along with helpers for building them and rendering results.

use crate::assignment::Assignment;
use crate::layout::{Layout, LayoutError};
use crate::word_list::WordList;

/// A struct holding references to all of the information needed as input to a crossword filling
/// operation.
#[derive(Debug, Clone, Copy)]
pub struct GridConfig<'a> {
    /// The slots in the grid and how they cross; see `layout.rs`.
    pub layout: &'a Layout,

    /// The word list used to fill the grid; see `word_list.rs`.
    pub word_list: &'a WordList,
}

/// A struct that owns a copy of each piece of information needed by `GridConfig`.
#[derive(Debug)]
pub struct OwnedGridConfig {
    pub layout: Layout,
    pub word_list: WordList,
}

impl OwnedGridConfig {
    #[must_use]
    pub fn to_config_ref(&self) -> GridConfig {
        GridConfig {
            layout: &self.layout,
            word_list: &self.word_list,
        }
    }
}

/// Generate an `OwnedGridConfig` from a template string with `_` or `.` representing open cells
/// and `#` representing blocks.
pub fn generate_grid_config_from_template_string(
    word_list: WordList,
    template: &str,
) -> Result<OwnedGridConfig, LayoutError> {
    Ok(OwnedGridConfig {
        layout: Layout::from_template(template)?,
        word_list,
    })
}

/// Lay out the letters of an assignment as rows of cells. Blocks and open cells that no assigned
/// slot covers are `None`.
#[must_use]
pub fn letter_grid(config: &GridConfig, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    let mut grid: Vec<Vec<Option<char>>> =
        vec![vec![None; config.layout.width]; config.layout.height];

    for (slot_id, word_id) in assignment.iter() {
        let spec = &config.layout.slot(slot_id).spec;
        let word = &config.word_list.words[word_id];

        for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
            let (row, column) = spec.cell_coord(cell_idx);
            grid[row][column] = Some(config.word_list.glyphs[glyph]);
        }
    }

    grid
}

/// Turn the given grid config and (possibly partial) assignment into a rendered string, with `#`
/// for blocks and `.` for open cells that haven't been filled.
#[must_use]
pub fn render_grid(config: &GridConfig, assignment: &Assignment) -> String {
    letter_grid(config, assignment)
        .iter()
        .enumerate()
        .map(|(row, line)| {
            line.iter()
                .enumerate()
                .map(|(column, cell)| match cell {
                    Some(letter) => *letter,
                    None if config.layout.is_open((row, column)) => '.',
                    None => '#',
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
