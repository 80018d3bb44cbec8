/*!
Position mapping through document changes.

Every step publishes a [`StepMap`] describing the ranges it replaced, and a
[`Mapping`] chains the maps of a whole transaction so positions captured
against the old document can be carried into the new one.
*/

/// Which side a mapped position sticks to when content is inserted exactly
/// at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    /// Stay before inserted content.
    Before,
    /// Move past inserted content.
    #[default]
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MapRange {
    start: usize,
    old_size: usize,
    new_size: usize,
}

/// Result of mapping one position: where it landed and whether the content
/// it pointed into was deleted outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The position sat strictly inside a replaced range.
    pub deleted: bool,
}

/// The position changes made by a single step, as a sorted list of replaced
/// ranges in old-document coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
    ranges: Vec<MapRange>,
}

impl StepMap {
    /// Build from `(start, old_size, new_size)` triples sorted by start.
    pub fn new(ranges: impl IntoIterator<Item = (usize, usize, usize)>) -> StepMap {
        StepMap {
            ranges: ranges
                .into_iter()
                .map(|(start, old_size, new_size)| MapRange {
                    start,
                    old_size,
                    new_size,
                })
                .collect(),
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for range in &self.ranges {
            if range.start > pos {
                break;
            }
            let end = range.start + range.old_size;
            if pos <= end {
                let side = if range.old_size == 0 {
                    assoc
                } else if pos == range.start {
                    Assoc::Before
                } else if pos == end {
                    Assoc::After
                } else {
                    assoc
                };
                let base = (range.start as isize + diff) as usize;
                let mapped = match side {
                    Assoc::Before => base,
                    Assoc::After => base + range.new_size,
                };
                return MapResult {
                    pos: mapped,
                    deleted: pos > range.start && pos < end,
                };
            }
            diff += range.new_size as isize - range.old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }
}

/// A pipeline of step maps. Mapping a position applies each map in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Mapping {
        Mapping::default()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn append_map(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// The sub-pipeline starting at map index `from`, for positions captured
    /// partway through a transaction.
    pub fn slice_from(&self, from: usize) -> Mapping {
        Mapping {
            maps: self.maps[from..].to_vec(),
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps
            .iter()
            .fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut result = MapResult {
            pos,
            deleted: false,
        };
        for map in &self.maps {
            let step = map.map_result(result.pos, assoc);
            result = MapResult {
                pos: step.pos,
                deleted: result.deleted || step.deleted,
            };
        }
        result
    }
}
