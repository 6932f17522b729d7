use serde::{Deserialize, Serialize};

use crate::layout::Layout;

/// Integer cell coordinate: `x` is the column within a row, `y` the row index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        GridPoint { x, y }
    }
}

/// A placed space, derived from the layout on every render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSpace {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub row: String,
}

/// Where a grid coordinate falls inside one row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotLocation {
    /// Covered by a space group, at `offset` within its ids.
    Space { group: usize, offset: usize },
    /// Covered by a gap group.
    Gap { group: usize },
    /// Left of the first column.
    Before,
    /// Past the last group; `cursor` is the row's total width.
    Beyond { cursor: i32 },
    /// `y` names no row.
    NoRow,
}

/// Screen-to-grid mapping constants shared by rendering and hit-testing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub cell_size: f64,
    /// Width reserved on the left for row labels.
    pub gutter: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            cell_size: 48.0,
            gutter: 40.0,
        }
    }
}

impl GridConfig {
    pub fn screen_to_grid(&self, screen_x: f64, screen_y: f64) -> GridPoint {
        GridPoint {
            x: ((screen_x - self.gutter) / self.cell_size).floor() as i32,
            y: (screen_y / self.cell_size).floor() as i32,
        }
    }

    /// Top-left screen position of a cell.
    pub fn cell_origin(&self, point: GridPoint) -> (f64, f64) {
        (
            self.gutter + point.x as f64 * self.cell_size,
            point.y as f64 * self.cell_size,
        )
    }
}

pub fn project(layout: &Layout) -> Vec<ParkingSpace> {
    let mut spaces = Vec::with_capacity(layout.space_count());
    for (y, row) in layout.rows.iter().enumerate() {
        let mut current_x: i32 = 0;
        for group in &row.slots {
            if group.gap {
                current_x += 1;
                continue;
            }
            for id in &group.ids {
                spaces.push(ParkingSpace {
                    id: id.clone(),
                    x: current_x,
                    y: y as i32,
                    row: row.row.clone(),
                });
                current_x += 1;
            }
        }
    }
    spaces
}

/// Inverse of [`project`] for a single cell.
pub fn locate(layout: &Layout, x: i32, y: i32) -> SlotLocation {
    let row = match usize::try_from(y).ok().and_then(|y| layout.rows.get(y)) {
        Some(row) => row,
        None => return SlotLocation::NoRow,
    };
    if x < 0 {
        return SlotLocation::Before;
    }

    let mut cursor: i32 = 0;
    for (gi, group) in row.slots.iter().enumerate() {
        let width = group.width() as i32;
        if x < cursor + width {
            return if group.gap {
                SlotLocation::Gap { group: gi }
            } else {
                SlotLocation::Space {
                    group: gi,
                    offset: (x - cursor) as usize,
                }
            };
        }
        cursor += width;
    }
    SlotLocation::Beyond { cursor }
}

pub fn space_at(layout: &Layout, point: GridPoint) -> Option<ParkingSpace> {
    match locate(layout, point.x, point.y) {
        SlotLocation::Space { group, offset } => {
            let row = &layout.rows[point.y as usize];
            row.slots[group].ids.get(offset).map(|id| ParkingSpace {
                id: id.clone(),
                x: point.x,
                y: point.y,
                row: row.row.clone(),
            })
        }
        _ => None,
    }
}
