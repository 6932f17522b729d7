use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{DebounceConfig, EditorConfig};
use crate::layout::{self, Layout, LayoutGroup, LayoutRow, SpaceTotals};
use crate::projector::{self, GridPoint, ParkingSpace, SlotLocation};
use crate::saving::LayoutStore;

/// Rows beyond this index are never created (labels A..ZZ).
pub const MAX_ROWS: usize = 702;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Add,
    Delete,
}

/// A pointer, mouse or touch event already stripped down to what the
/// editor needs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer_id: i64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub timestamp_ms: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    Debounced,
    Occupied,
    NoSpace,
    OutOfRange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditOutcome {
    Added { id: String, x: i32, y: i32 },
    Deleted { id: String },
    Ignored { reason: IgnoreReason },
}

impl EditOutcome {
    fn ignored(reason: IgnoreReason) -> Self {
        EditOutcome::Ignored { reason }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, EditOutcome::Ignored { .. })
    }
}

fn within(now: i64, then: i64, window_ms: u64) -> bool {
    now.saturating_sub(then) < window_ms as i64
}

/// Drops the duplicate events that pointer, mouse and touch streams
/// deliver for one physical click.
#[derive(Debug, Default)]
pub struct Debouncer {
    config: DebounceConfig,
    recent_adds: HashMap<GridPoint, i64>,
    pointer_adds: HashMap<(i64, GridPoint), i64>,
    last_delete: Option<(String, i64, i64)>,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Debouncer {
            config,
            ..Default::default()
        }
    }

    /// Returns true when the add should be processed, and records it.
    pub fn admit_add(&mut self, point: GridPoint, pointer_id: i64, now: i64) -> bool {
        let add_window = self.config.add_window_ms;
        let pointer_window = self.config.pointer_window_ms;
        self.recent_adds.retain(|_, t| within(now, *t, add_window));
        self.pointer_adds.retain(|_, t| within(now, *t, pointer_window));

        if self.recent_adds.contains_key(&point)
            || self.pointer_adds.contains_key(&(pointer_id, point))
        {
            return false;
        }
        self.recent_adds.insert(point, now);
        self.pointer_adds.insert((pointer_id, point), now);
        true
    }

    pub fn admit_delete(&mut self, id: &str, pointer_id: i64, now: i64) -> bool {
        if let Some((last_id, last_pointer, at)) = &self.last_delete {
            if last_id == id
                && *last_pointer == pointer_id
                && within(now, *at, self.config.delete_window_ms)
            {
                return false;
            }
        }
        self.last_delete = Some((id.to_string(), pointer_id, now));
        true
    }

    pub fn reset(&mut self) {
        self.recent_adds.clear();
        self.pointer_adds.clear();
        self.last_delete = None;
    }
}

/// Owns a layout and applies every edit to it. Debounce state and undo
/// history live here, so one engine instance is one editing session.
#[derive(Debug)]
pub struct EditEngine {
    layout: Layout,
    tool: Tool,
    config: EditorConfig,
    debounce: Debouncer,
    history: Vec<Layout>,
}

impl EditEngine {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_layout(Layout::default(), config)
    }

    pub fn with_layout(layout: Layout, config: EditorConfig) -> Self {
        EditEngine {
            layout,
            tool: Tool::default(),
            config,
            debounce: Debouncer::new(config.debounce),
            history: Vec::new(),
        }
    }

    pub fn from_json(json_text: &str, config: EditorConfig) -> Self {
        Self::with_layout(layout::parse(json_text), config)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn spaces(&self) -> Vec<ParkingSpace> {
        projector::project(&self.layout)
    }

    pub fn to_json(&self) -> String {
        layout::serialize(&self.layout)
    }

    pub fn totals(&self) -> SpaceTotals {
        layout::space_totals(&self.to_json())
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Resolve a raw pointer event with the current tool.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> EditOutcome {
        let point = self
            .config
            .grid
            .screen_to_grid(event.screen_x, event.screen_y);
        match self.tool {
            Tool::Add => self.add_from_pointer(point, event.pointer_id, event.timestamp_ms),
            Tool::Delete => match projector::space_at(&self.layout, point) {
                Some(space) => self.activate_space(&space.id, event.pointer_id, event.timestamp_ms),
                None => EditOutcome::ignored(IgnoreReason::NoSpace),
            },
        }
    }

    pub fn add_from_pointer(&mut self, point: GridPoint, pointer_id: i64, now: i64) -> EditOutcome {
        if !self.debounce.admit_add(point, pointer_id, now) {
            debug!("Dropped duplicate add at ({}, {}) from pointer {}", point.x, point.y, pointer_id);
            return EditOutcome::ignored(IgnoreReason::Debounced);
        }
        self.add_space(point)
    }

    /// Delete a rendered space the user activated directly.
    pub fn activate_space(&mut self, id: &str, pointer_id: i64, now: i64) -> EditOutcome {
        if !self.debounce.admit_delete(id, pointer_id, now) {
            debug!("Dropped duplicate delete of {} from pointer {}", id, pointer_id);
            return EditOutcome::ignored(IgnoreReason::Debounced);
        }
        self.delete_space(id)
    }

    /// Place a new space at `point`, creating the row if needed.
    pub fn add_space(&mut self, point: GridPoint) -> EditOutcome {
        let y = match usize::try_from(point.y) {
            Ok(y) if y < MAX_ROWS => y,
            _ => return EditOutcome::ignored(IgnoreReason::OutOfRange),
        };
        if projector::space_at(&self.layout, point).is_some() {
            return EditOutcome::ignored(IgnoreReason::Occupied);
        }

        let snapshot = self.layout.clone();
        while self.layout.rows.len() <= y {
            let label = self.layout.free_label_from(self.layout.rows.len());
            self.layout.rows.push(LayoutRow::new(label));
        }
        let id = match next_space_id(&self.layout, y) {
            Some(id) => id,
            None => {
                self.layout = snapshot;
                return EditOutcome::ignored(IgnoreReason::OutOfRange);
            }
        };
        let location = projector::locate(&self.layout, point.x, point.y);
        let row = &mut self.layout.rows[y];

        match location {
            SlotLocation::Gap { group } => fill_gap(row, group, id.clone()),
            SlotLocation::Before => row.slots.insert(0, LayoutGroup::single(id.clone())),
            SlotLocation::Beyond { cursor } => {
                // Any run of empty columns collapses to one gap.
                let last_is_gap = row.slots.last().is_some_and(|g| g.gap);
                match row.slots.last_mut() {
                    Some(last) if point.x == cursor && !last.gap => last.ids.push(id.clone()),
                    _ => {
                        if point.x > cursor && !last_is_gap {
                            row.slots.push(LayoutGroup::gap());
                        }
                        row.slots.push(LayoutGroup::single(id.clone()));
                    }
                }
            }
            SlotLocation::Space { .. } | SlotLocation::NoRow => {
                self.layout = snapshot;
                return EditOutcome::ignored(IgnoreReason::Occupied);
            }
        }

        let x = row.column_of(&id).unwrap_or_default() as i32;
        self.remember(snapshot);
        debug!("Added {} at ({}, {})", id, x, point.y);
        EditOutcome::Added { id, x, y: point.y }
    }

    /// Replace a space with a gap, splitting its group around it.
    pub fn delete_space(&mut self, id: &str) -> EditOutcome {
        let (ri, gi, offset) = match self.layout.find_space(id) {
            Some(found) => found,
            None => return EditOutcome::ignored(IgnoreReason::NoSpace),
        };

        let snapshot = self.layout.clone();
        let row = &mut self.layout.rows[ri];
        let mut left = row.slots.remove(gi).ids;
        let right = left.split_off(offset + 1);
        left.truncate(offset);

        let mut replacement = Vec::with_capacity(3);
        if !left.is_empty() {
            replacement.push(LayoutGroup::spaces(left));
        }
        replacement.push(LayoutGroup::gap());
        if !right.is_empty() {
            replacement.push(LayoutGroup::spaces(right));
        }
        row.slots.splice(gi..gi, replacement);
        row.normalize();

        self.remember(snapshot);
        debug!("Deleted {}", id);
        EditOutcome::Deleted { id: id.to_string() }
    }

    pub fn delete_at(&mut self, point: GridPoint) -> EditOutcome {
        match projector::space_at(&self.layout, point) {
            Some(space) => self.delete_space(&space.id),
            None => EditOutcome::ignored(IgnoreReason::NoSpace),
        }
    }

    /// Append an empty row. Returns false when the name is blank or
    /// already used (case-insensitive).
    pub fn add_row(&mut self, name: &str) -> bool {
        let label = name.trim().to_uppercase();
        if label.is_empty() || self.layout.has_row(&label) {
            return false;
        }
        let snapshot = self.layout.clone();
        self.layout.rows.push(LayoutRow::new(label));
        self.remember(snapshot);
        true
    }

    /// Drop every row. Not undoable.
    pub fn clear(&mut self) {
        self.layout = Layout::default();
        self.history.clear();
        self.debounce.reset();
        info!("Layout cleared");
    }

    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.layout = previous;
                true
            }
            None => false,
        }
    }

    /// Replace the layout with parsed JSON (empty on malformed input).
    pub fn load_json(&mut self, json_text: &str) {
        self.set_layout(layout::parse(json_text));
    }

    /// Replace the whole layout, e.g. from an archive. History is dropped.
    pub fn set_layout(&mut self, mut layout: Layout) {
        layout.normalize();
        self.layout = layout;
        self.history.clear();
        self.debounce.reset();
    }

    /// Hand the serialized layout to `store`. Store errors are returned as is.
    pub fn save<S: LayoutStore>(&self, store: &mut S) -> Result<SpaceTotals, S::Error> {
        let json = self.to_json();
        let totals = layout::space_totals(&json);
        store.save_layout(&json)?;
        info!("Saved layout with {} spaces", totals.total);
        Ok(totals)
    }

    /// Returns false when the store holds no layout yet.
    pub fn load_from<S: LayoutStore>(&mut self, store: &S) -> Result<bool, S::Error> {
        match store.load_layout()? {
            Some(json) => {
                self.load_json(&json);
                info!("Loaded layout with {} rows", self.layout.rows.len());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remember(&mut self, snapshot: Layout) {
        if self.config.undo_limit == 0 {
            return;
        }
        if self.history.len() >= self.config.undo_limit {
            self.history.remove(0);
        }
        self.history.push(snapshot);
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// `label + (max suffix + 1)` over the row's own ids, skipping any
/// candidate already used elsewhere in the layout. `None` once the
/// suffix can no longer grow.
fn next_space_id(layout: &Layout, row_index: usize) -> Option<String> {
    let row = &layout.rows[row_index];
    let max = row
        .slots
        .iter()
        .filter(|g| !g.gap)
        .flat_map(|g| g.ids.iter())
        .filter_map(|id| id.strip_prefix(row.row.as_str()))
        .filter(|suffix| is_numeric(suffix))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    let mut n = max.checked_add(1)?;
    loop {
        let candidate = format!("{}{}", row.row, n);
        if layout.find_space(&candidate).is_none() {
            return Some(candidate);
        }
        n = n.checked_add(1)?;
    }
}

/// Put `id` where the gap at `group` was, joining neighbouring space groups.
fn fill_gap(row: &mut LayoutRow, group: usize, id: String) {
    let left_is_space = group > 0 && !row.slots[group - 1].gap;
    let right_is_space = row.slots.get(group + 1).is_some_and(|g| !g.gap);

    match (left_is_space, right_is_space) {
        (true, true) => {
            let right = row.slots.remove(group + 1);
            row.slots.remove(group);
            let left = &mut row.slots[group - 1];
            left.ids.push(id);
            left.ids.extend(right.ids);
        }
        (true, false) => {
            row.slots.remove(group);
            row.slots[group - 1].ids.push(id);
        }
        (false, true) => {
            row.slots.remove(group);
            row.slots[group].ids.insert(0, id);
        }
        (false, false) => row.slots[group] = LayoutGroup::single(id),
    }
}
