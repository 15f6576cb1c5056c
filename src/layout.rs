//! This module implements the static description of a puzzle: which slots exist, where they sit
//! in the grid, and at which offsets crossing slots have to agree. A `Layout` is validated when
//! it's built and is read-only afterwards.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An identifier for a given slot, based on its index in the `Layout`'s `slot_configs` field.
pub type SlotId = usize;

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Across => "across",
            Direction::Down => "down",
        }
    }
}

/// Errors describing a layout whose geometry doesn't hold together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    EmptyTemplate,
    InvalidCell { row: usize, column: usize, cell: char },
    InvalidSlotKey(String),
    ZeroLengthSlot(SlotId),
    SlotOutOfBounds(SlotId),
    ParallelSlotsOverlap(SlotId, SlotId),
    TooManySlotsInCell(GridCoord),
    UnknownSlot(SlotId),
    SelfOverlap(SlotId),
    OverlapOutOfRange { slot_id: SlotId, offset: usize },
    OverlapMismatch { slot_id: SlotId, other_slot_id: SlotId },
    MissingOverlap { slot_id: SlotId, other_slot_id: SlotId },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::EmptyTemplate => write!(f, "Grid must have at least one row"),
            LayoutError::InvalidCell { row, column, cell } => {
                write!(f, "Unexpected character “{cell}” at row {row}, column {column}")
            }
            LayoutError::InvalidSlotKey(key) => write!(f, "Invalid slot key: “{key}”"),
            LayoutError::ZeroLengthSlot(slot_id) => write!(f, "Slot {slot_id} has no cells"),
            LayoutError::SlotOutOfBounds(slot_id) => {
                write!(f, "Slot {slot_id} extends past the edge of the grid")
            }
            LayoutError::ParallelSlotsOverlap(a, b) => {
                write!(f, "Slots {a} and {b} run in the same direction through a shared cell")
            }
            LayoutError::TooManySlotsInCell((row, column)) => {
                write!(f, "More than two slots pass through row {row}, column {column}")
            }
            LayoutError::UnknownSlot(slot_id) => {
                write!(f, "Overlap refers to unknown slot {slot_id}")
            }
            LayoutError::SelfOverlap(slot_id) => write!(f, "Slot {slot_id} overlaps itself"),
            LayoutError::OverlapOutOfRange { slot_id, offset } => {
                write!(f, "Offset {offset} is outside slot {slot_id}")
            }
            LayoutError::OverlapMismatch {
                slot_id,
                other_slot_id,
            } => write!(
                f,
                "Overlap between slots {slot_id} and {other_slot_id} doesn't match the grid"
            ),
            LayoutError::MissingOverlap {
                slot_id,
                other_slot_id,
            } => write!(
                f,
                "Slots {slot_id} and {other_slot_id} cross but no overlap was declared"
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// A struct identifying a specific slot in the grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct SlotSpec {
    pub row: usize,
    pub column: usize,
    pub direction: Direction,
    pub length: usize,
}

impl SlotSpec {
    #[must_use]
    pub fn new(row: usize, column: usize, direction: Direction, length: usize) -> SlotSpec {
        SlotSpec {
            row,
            column,
            direction,
            length,
        }
    }

    /// Parse a string like "1,2,down,5" (row, column, direction, length) into a `SlotSpec`.
    pub fn from_key(key: &str) -> Result<SlotSpec, LayoutError> {
        let key_parts: Vec<&str> = key.split(',').map(str::trim).collect();
        let invalid = || LayoutError::InvalidSlotKey(key.to_string());

        let [row, column, direction, length] = key_parts.as_slice() else {
            return Err(invalid());
        };

        let direction = match *direction {
            "across" => Direction::Across,
            "down" => Direction::Down,
            _ => return Err(invalid()),
        };

        Ok(SlotSpec {
            row: row.parse().map_err(|_| invalid())?,
            column: column.parse().map_err(|_| invalid())?,
            direction,
            length: length.parse().map_err(|_| invalid())?,
        })
    }

    /// Represent this slot as a string like "1,2,down,5".
    #[must_use]
    pub fn to_key(&self) -> String {
        format!(
            "{},{},{},{}",
            self.row,
            self.column,
            self.direction.as_str(),
            self.length,
        )
    }

    /// The coords of the cell at `cell_idx` within this slot.
    #[must_use]
    pub fn cell_coord(&self, cell_idx: usize) -> GridCoord {
        match self.direction {
            Direction::Across => (self.row, self.column + cell_idx),
            Direction::Down => (self.row + cell_idx, self.column),
        }
    }

    /// Generate the coords for each cell of this slot.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| self.cell_coord(cell_idx))
            .collect()
    }

    fn fits_in(&self, width: usize, height: usize) -> bool {
        match self.direction {
            Direction::Across => self.row < height && self.column + self.length <= width,
            Direction::Down => self.column < width && self.row + self.length <= height,
        }
    }
}

/// Serialize a `SlotSpec` into a string key.
#[cfg(feature = "serde")]
impl Serialize for SlotSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_key())
    }
}

/// Deserialize a `SlotSpec` from a string key.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for SlotSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw_string = String::deserialize(deserializer)?;
        SlotSpec::from_key(&raw_string).map_err(serde::de::Error::custom)
    }
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the intersection within the other slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
}

/// A struct representing the aspects of a slot in the grid that are static during filling.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub id: SlotId,
    pub spec: SlotSpec,
    pub length: usize,

    /// For each cell of the slot, the slot crossing it there (if any).
    pub crossings: Vec<Option<Crossing>>,
}

impl SlotConfig {
    /// Generate a string key identifying this slot.
    #[must_use]
    pub fn slot_key(&self) -> String {
        self.spec.to_key()
    }
}

/// An overlap between two slots as declared by whoever built the layout: `offset` indexes into
/// `slot_id`'s word and `other_offset` into `other_slot_id`'s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub slot_id: SlotId,
    pub other_slot_id: SlotId,
    pub offset: usize,
    pub other_offset: usize,
}

/// The full set of slots in a grid together with their overlap relation.
#[derive(Debug, Clone)]
pub struct Layout {
    pub width: usize,
    pub height: usize,

    /// Config for each slot, indexed by `SlotId`.
    pub slot_configs: Vec<SlotConfig>,

    /// Which cells can hold a letter, as a flat row-major array.
    pub open_cells: Vec<bool>,

    /// Overlap offsets keyed by ordered slot pair; both orders are present.
    overlaps: HashMap<(SlotId, SlotId), (usize, usize)>,

    /// For each slot, the ids of the slots crossing it, ascending.
    neighbors: Vec<Vec<SlotId>>,
}

impl Layout {
    /// Build a layout from slot positions, deriving the overlaps from the grid geometry. Open cells
    /// are exactly the cells covered by some slot.
    pub fn new(width: usize, height: usize, specs: &[SlotSpec]) -> Result<Layout, LayoutError> {
        Layout::build(width, height, specs, None)
    }

    /// Build a layout from slot positions plus overlap data supplied by the caller, rejecting the
    /// overlap data unless it describes exactly the crossings present in the grid.
    pub fn with_declared_overlaps(
        width: usize,
        height: usize,
        specs: &[SlotSpec],
        declared: &[Overlap],
    ) -> Result<Layout, LayoutError> {
        let layout = Layout::build(width, height, specs, None)?;
        let mut declared_pairs: HashMap<(SlotId, SlotId), (usize, usize)> = HashMap::new();

        for overlap in declared {
            for slot_id in [overlap.slot_id, overlap.other_slot_id] {
                if slot_id >= specs.len() {
                    return Err(LayoutError::UnknownSlot(slot_id));
                }
            }
            if overlap.slot_id == overlap.other_slot_id {
                return Err(LayoutError::SelfOverlap(overlap.slot_id));
            }
            for (slot_id, offset) in [
                (overlap.slot_id, overlap.offset),
                (overlap.other_slot_id, overlap.other_offset),
            ] {
                if offset >= specs[slot_id].length {
                    return Err(LayoutError::OverlapOutOfRange { slot_id, offset });
                }
            }

            let mismatch = LayoutError::OverlapMismatch {
                slot_id: overlap.slot_id,
                other_slot_id: overlap.other_slot_id,
            };
            if layout.overlap(overlap.slot_id, overlap.other_slot_id)
                != Some((overlap.offset, overlap.other_offset))
            {
                return Err(mismatch);
            }

            // The same crossing may be declared from both sides, but not two different ways.
            for (key, offsets) in [
                (
                    (overlap.slot_id, overlap.other_slot_id),
                    (overlap.offset, overlap.other_offset),
                ),
                (
                    (overlap.other_slot_id, overlap.slot_id),
                    (overlap.other_offset, overlap.offset),
                ),
            ] {
                if *declared_pairs.entry(key).or_insert(offsets) != offsets {
                    return Err(mismatch);
                }
            }
        }

        for (slot_id, neighbors) in layout.neighbors.iter().enumerate() {
            for &other_slot_id in neighbors {
                if !declared_pairs.contains_key(&(slot_id, other_slot_id)) {
                    return Err(LayoutError::MissingOverlap {
                        slot_id: slot_id.min(other_slot_id),
                        other_slot_id: slot_id.max(other_slot_id),
                    });
                }
            }
        }

        Ok(layout)
    }

    /// Build a layout from a template string with `_` or `.` representing open cells and `#`
    /// representing blocks. Every horizontal or vertical run of two or more open cells becomes a
    /// slot: across slots first in reading order, then down slots column by column. Rows shorter
    /// than the longest row are padded with blocks.
    pub fn from_template(template: &str) -> Result<Layout, LayoutError> {
        fn build_runs(rows: &[Vec<bool>]) -> Vec<(usize, usize, usize)> {
            let mut result = vec![];

            for (row_idx, row) in rows.iter().enumerate() {
                let mut run_start: Option<usize> = None;

                for (column_idx, &open) in row.iter().chain([false].iter()).enumerate() {
                    match (open, run_start) {
                        (true, None) => run_start = Some(column_idx),
                        (false, Some(start)) => {
                            if column_idx - start > 1 {
                                result.push((row_idx, start, column_idx - start));
                            }
                            run_start = None;
                        }
                        _ => {}
                    }
                }
            }

            result
        }

        let lines: Vec<&str> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.is_empty() {
            return Err(LayoutError::EmptyTemplate);
        }

        let width = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let height = lines.len();

        let mut rows: Vec<Vec<bool>> = Vec::with_capacity(height);
        for (row, line) in lines.iter().enumerate() {
            let mut cells = Vec::with_capacity(width);
            for (column, cell) in line.chars().enumerate() {
                cells.push(match cell {
                    '_' | '.' => true,
                    '#' | '█' => false,
                    _ => return Err(LayoutError::InvalidCell { row, column, cell }),
                });
            }
            cells.resize(width, false);
            rows.push(cells);
        }

        let mut specs: Vec<SlotSpec> = build_runs(&rows)
            .into_iter()
            .map(|(row, column, length)| SlotSpec::new(row, column, Direction::Across, length))
            .collect();

        let transposed: Vec<Vec<bool>> = (0..width)
            .map(|column| rows.iter().map(|row| row[column]).collect())
            .collect();

        specs.extend(
            build_runs(&transposed)
                .into_iter()
                .map(|(column, row, length)| SlotSpec::new(row, column, Direction::Down, length)),
        );

        Layout::build(width, height, &specs, Some(rows.concat()))
    }

    /// Validate the slot geometry and derive crossings, overlaps, and neighbor lists.
    fn build(
        width: usize,
        height: usize,
        specs: &[SlotSpec],
        open_cells: Option<Vec<bool>>,
    ) -> Result<Layout, LayoutError> {
        for (slot_id, spec) in specs.iter().enumerate() {
            if spec.length == 0 {
                return Err(LayoutError::ZeroLengthSlot(slot_id));
            }
            if !spec.fits_in(width, height) {
                return Err(LayoutError::SlotOutOfBounds(slot_id));
            }
        }

        // Build a map from cell location to (slot id, cell index within slot) for every slot
        // passing through it, which we can then use to calculate crossings.
        let mut slots_by_cell: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();
        for (slot_id, spec) in specs.iter().enumerate() {
            for (cell_idx, loc) in spec.cell_coords().into_iter().enumerate() {
                slots_by_cell.entry(loc).or_default().push((slot_id, cell_idx));
            }
        }

        let mut slot_configs: Vec<SlotConfig> = Vec::with_capacity(specs.len());
        let mut overlaps: HashMap<(SlotId, SlotId), (usize, usize)> = HashMap::new();
        let mut neighbors: Vec<Vec<SlotId>> = vec![vec![]; specs.len()];

        for (slot_id, spec) in specs.iter().enumerate() {
            let mut crossings: Vec<Option<Crossing>> = Vec::with_capacity(spec.length);

            for (cell_idx, loc) in spec.cell_coords().into_iter().enumerate() {
                let others: Vec<(SlotId, usize)> = slots_by_cell[&loc]
                    .iter()
                    .copied()
                    .filter(|&(other_slot_id, _)| other_slot_id != slot_id)
                    .collect();

                let crossing = match others.as_slice() {
                    [] => None,
                    [(other_slot_id, other_slot_cell)] => {
                        if specs[*other_slot_id].direction == spec.direction {
                            return Err(LayoutError::ParallelSlotsOverlap(
                                slot_id.min(*other_slot_id),
                                slot_id.max(*other_slot_id),
                            ));
                        }
                        overlaps.insert((slot_id, *other_slot_id), (cell_idx, *other_slot_cell));
                        neighbors[slot_id].push(*other_slot_id);
                        Some(Crossing {
                            other_slot_id: *other_slot_id,
                            other_slot_cell: *other_slot_cell,
                        })
                    }
                    _ => return Err(LayoutError::TooManySlotsInCell(loc)),
                };

                crossings.push(crossing);
            }

            neighbors[slot_id].sort_unstable();
            neighbors[slot_id].dedup();

            slot_configs.push(SlotConfig {
                id: slot_id,
                spec: *spec,
                length: spec.length,
                crossings,
            });
        }

        let open_cells = open_cells.unwrap_or_else(|| {
            let mut open_cells = vec![false; width * height];
            for loc in slots_by_cell.keys() {
                open_cells[loc.0 * width + loc.1] = true;
            }
            open_cells
        });

        Ok(Layout {
            width,
            height,
            slot_configs,
            open_cells,
            overlaps,
            neighbors,
        })
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_configs.len()
    }

    #[must_use]
    pub fn slot(&self, slot_id: SlotId) -> &SlotConfig {
        &self.slot_configs[slot_id]
    }

    /// The offsets at which `slot_id` and `other_slot_id` must agree, as
    /// `(offset into slot_id, offset into other_slot_id)`, or `None` if they don't cross.
    #[must_use]
    pub fn overlap(&self, slot_id: SlotId, other_slot_id: SlotId) -> Option<(usize, usize)> {
        self.overlaps.get(&(slot_id, other_slot_id)).copied()
    }

    /// The slots crossing `slot_id`, in ascending order.
    #[must_use]
    pub fn neighbors(&self, slot_id: SlotId) -> &[SlotId] {
        &self.neighbors[slot_id]
    }

    /// The number of slots crossing `slot_id`.
    #[must_use]
    pub fn degree(&self, slot_id: SlotId) -> usize {
        self.neighbors[slot_id].len()
    }

    /// Every ordered pair of crossing slots, ordered by the first slot and then the second.
    #[must_use]
    pub fn arcs(&self) -> Vec<(SlotId, SlotId)> {
        self.neighbors
            .iter()
            .enumerate()
            .flat_map(|(slot_id, neighbors)| neighbors.iter().map(move |&other| (slot_id, other)))
            .collect()
    }

    #[must_use]
    pub fn is_open(&self, (row, column): GridCoord) -> bool {
        row < self.height && column < self.width && self.open_cells[row * self.width + column]
    }
}

#[cfg(test)]
mod tests {
    use crate::layout::{Direction, Layout, LayoutError, Overlap, SlotSpec};

    fn crossing_pair() -> Vec<SlotSpec> {
        vec![
            SlotSpec::new(1, 0, Direction::Across, 3),
            SlotSpec::new(0, 1, Direction::Down, 4),
        ]
    }

    #[test]
    fn test_derives_overlaps_from_geometry() {
        let layout = Layout::new(3, 4, &crossing_pair()).unwrap();

        assert_eq!(layout.overlap(0, 1), Some((1, 1)));
        assert_eq!(layout.overlap(1, 0), Some((1, 1)));
        assert_eq!(layout.neighbors(0), &[1]);
        assert_eq!(layout.degree(1), 1);
        assert_eq!(layout.arcs(), vec![(0, 1), (1, 0)]);
        assert!(layout.is_open((3, 1)));
        assert!(!layout.is_open((0, 0)));
    }

    #[test]
    fn test_from_template_orders_across_then_down() {
        let layout = Layout::from_template(
            "
            #___#
            #_##_
            #_##_
            #_##_
            #____
            ",
        )
        .unwrap();

        let keys: Vec<String> = layout
            .slot_configs
            .iter()
            .map(|slot| slot.slot_key())
            .collect();
        assert_eq!(
            keys,
            vec!["0,1,across,3", "4,1,across,4", "0,1,down,5", "1,4,down,4"]
        );

        assert_eq!(layout.overlap(0, 2), Some((0, 0)));
        assert_eq!(layout.overlap(1, 2), Some((0, 4)));
        assert_eq!(layout.overlap(1, 3), Some((3, 3)));
        assert_eq!(layout.overlap(0, 3), None);
        assert_eq!(layout.overlap(0, 1), None);
        assert_eq!(layout.degree(1), 2);
    }

    #[test]
    fn test_template_pads_short_rows_and_skips_single_cells() {
        let layout = Layout::from_template("___\n_\n").unwrap();

        assert_eq!((layout.width, layout.height), (3, 2));
        let keys: Vec<String> = layout
            .slot_configs
            .iter()
            .map(|slot| slot.slot_key())
            .collect();
        assert_eq!(keys, vec!["0,0,across,3", "0,0,down,2"]);
    }

    #[test]
    fn test_template_rejects_unknown_cells() {
        assert_eq!(
            Layout::from_template("_x_").unwrap_err(),
            LayoutError::InvalidCell {
                row: 0,
                column: 1,
                cell: 'x'
            }
        );
        assert_eq!(
            Layout::from_template("\n  \n").unwrap_err(),
            LayoutError::EmptyTemplate
        );
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert_eq!(
            Layout::new(3, 3, &[SlotSpec::new(0, 1, Direction::Across, 3)]).unwrap_err(),
            LayoutError::SlotOutOfBounds(0)
        );
        assert_eq!(
            Layout::new(3, 3, &[SlotSpec::new(0, 0, Direction::Down, 0)]).unwrap_err(),
            LayoutError::ZeroLengthSlot(0)
        );
        assert_eq!(
            Layout::new(
                4,
                1,
                &[
                    SlotSpec::new(0, 0, Direction::Across, 3),
                    SlotSpec::new(0, 2, Direction::Across, 2),
                ]
            )
            .unwrap_err(),
            LayoutError::ParallelSlotsOverlap(0, 1)
        );
    }

    #[test]
    fn test_declared_overlaps_must_match_geometry() {
        let specs = crossing_pair();
        let good = Overlap {
            slot_id: 0,
            other_slot_id: 1,
            offset: 1,
            other_offset: 1,
        };

        assert!(Layout::with_declared_overlaps(3, 4, &specs, &[good]).is_ok());

        let out_of_range = Overlap {
            offset: 3,
            ..good
        };
        assert_eq!(
            Layout::with_declared_overlaps(3, 4, &specs, &[out_of_range]).unwrap_err(),
            LayoutError::OverlapOutOfRange {
                slot_id: 0,
                offset: 3
            }
        );

        let wrong_cell = Overlap {
            other_offset: 2,
            ..good
        };
        assert_eq!(
            Layout::with_declared_overlaps(3, 4, &specs, &[wrong_cell]).unwrap_err(),
            LayoutError::OverlapMismatch {
                slot_id: 0,
                other_slot_id: 1
            }
        );

        let unknown = Overlap {
            other_slot_id: 7,
            ..good
        };
        assert_eq!(
            Layout::with_declared_overlaps(3, 4, &specs, &[unknown]).unwrap_err(),
            LayoutError::UnknownSlot(7)
        );

        assert_eq!(
            Layout::with_declared_overlaps(3, 4, &specs, &[]).unwrap_err(),
            LayoutError::MissingOverlap {
                slot_id: 0,
                other_slot_id: 1
            }
        );
    }

    #[test]
    fn test_slot_key_round_trip() {
        let spec = SlotSpec::from_key("3,4,down,12").unwrap();
        assert_eq!(spec, SlotSpec::new(3, 4, Direction::Down, 12));
        assert_eq!(spec.to_key(), "3,4,down,12");
        assert!(matches!(
            SlotSpec::from_key("3,4,sideways,12"),
            Err(LayoutError::InvalidSlotKey(_))
        ));
    }

    #[test]
    fn test_empty_layout() {
        let layout = Layout::new(0, 0, &[]).unwrap();
        assert_eq!(layout.slot_count(), 0);
        assert!(layout.arcs().is_empty());
    }
}
