use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A contiguous run inside one row: either real space identifiers or a
/// single-column gap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutGroup {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub gap: bool,
}

impl LayoutGroup {
    pub fn gap() -> Self {
        LayoutGroup {
            ids: Vec::new(),
            gap: true,
        }
    }

    pub fn spaces(ids: Vec<String>) -> Self {
        LayoutGroup { ids, gap: false }
    }

    pub fn single(id: impl Into<String>) -> Self {
        Self::spaces(vec![id.into()])
    }

    /// Number of grid columns the group occupies.
    pub fn width(&self) -> usize {
        if self.gap { 1 } else { self.ids.len() }
    }
}

/// One horizontal lane of the facility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRow {
    pub row: String,
    #[serde(default)]
    pub slots: Vec<LayoutGroup>,
}

impl LayoutRow {
    pub fn new(label: impl Into<String>) -> Self {
        LayoutRow {
            row: label.into(),
            slots: Vec::new(),
        }
    }

    /// Total columns covered by the row's groups.
    pub fn width(&self) -> usize {
        self.slots.iter().map(LayoutGroup::width).sum()
    }

    pub fn space_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|g| !g.gap)
            .map(|g| g.ids.len())
            .sum()
    }

    /// Position of `id` as `(group index, offset inside the group)`.
    pub fn position_of(&self, id: &str) -> Option<(usize, usize)> {
        self.slots.iter().enumerate().find_map(|(gi, group)| {
            if group.gap {
                return None;
            }
            group
                .ids
                .iter()
                .position(|existing| existing == id)
                .map(|offset| (gi, offset))
        })
    }

    /// Grid column of `id`, counting gaps as one column each.
    pub fn column_of(&self, id: &str) -> Option<usize> {
        let (group, offset) = self.position_of(id)?;
        let before: usize = self.slots[..group].iter().map(LayoutGroup::width).sum();
        Some(before + offset)
    }

    pub fn normalize(&mut self) {
        self.slots = normalize(&self.slots);
    }
}

/// Ordered rows of a parking facility. Serializes as a bare JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layout {
    pub rows: Vec<LayoutRow>,
}

impl Layout {
    pub fn new(rows: Vec<LayoutRow>) -> Self {
        Layout { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the row whose label matches `label`, ignoring case.
    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| r.row.eq_ignore_ascii_case(label))
    }

    pub fn has_row(&self, label: &str) -> bool {
        self.row_index(label).is_some()
    }

    /// Locate a space anywhere in the layout as `(row, group, offset)`.
    pub fn find_space(&self, id: &str) -> Option<(usize, usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .find_map(|(ri, row)| row.position_of(id).map(|(gi, off)| (ri, gi, off)))
    }

    /// First unused label at or after alphabet position `start`.
    pub fn free_label_from(&self, start: usize) -> String {
        let mut index = start;
        loop {
            let label = row_label(index);
            if !self.has_row(&label) {
                return label;
            }
            index += 1;
        }
    }

    pub fn space_count(&self) -> usize {
        self.rows.iter().map(LayoutRow::space_count).sum()
    }

    pub fn normalize(&mut self) {
        for row in &mut self.rows {
            row.normalize();
        }
    }

    pub fn has_adjacent_gaps(&self) -> bool {
        self.rows
            .iter()
            .any(|row| row.slots.windows(2).any(|w| w[0].gap && w[1].gap))
    }
}

/// Shapes a persisted layout document may take.
#[derive(Debug, PartialEq)]
pub enum LayoutDocument {
    /// Flat list of identifiers with no row structure.
    Legacy(Vec<String>),
    Rows(Vec<LayoutRow>),
}

impl LayoutDocument {
    /// Decide the shape once, from the type of the first element.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let legacy = match &value {
            Value::Array(items) => items.first().is_none_or(Value::is_string),
            _ => false,
        };
        if legacy {
            Ok(LayoutDocument::Legacy(serde_json::from_value(value)?))
        } else {
            Ok(LayoutDocument::Rows(serde_json::from_value(value)?))
        }
    }

    pub fn into_layout(self) -> Layout {
        match self {
            LayoutDocument::Legacy(ids) if ids.is_empty() => Layout::default(),
            LayoutDocument::Legacy(ids) => Layout::new(vec![LayoutRow {
                row: row_label(0),
                slots: vec![LayoutGroup::spaces(ids)],
            }]),
            LayoutDocument::Rows(mut rows) => {
                for row in &mut rows {
                    for group in &mut row.slots {
                        if group.gap {
                            group.ids.clear();
                        }
                    }
                    row.normalize();
                }
                Layout::new(rows)
            }
        }
    }
}

/// Parse layout JSON. Malformed input yields an empty layout.
pub fn parse(json_text: &str) -> Layout {
    if json_text.trim().is_empty() {
        return Layout::default();
    }
    let value: Value = match serde_json::from_str(json_text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Discarding malformed layout JSON: {}", e);
            return Layout::default();
        }
    };
    match LayoutDocument::from_value(value) {
        Ok(doc) => doc.into_layout(),
        Err(e) => {
            warn!("Layout JSON has an unexpected shape: {}", e);
            Layout::default()
        }
    }
}

/// Canonical JSON form: an array of `{row, slots: [{ids, gap}]}`.
pub fn serialize(layout: &Layout) -> String {
    serde_json::to_string(layout).unwrap_or_else(|_| String::from("[]"))
}

/// Collapse every run of adjacent gaps into one gap. Space groups with no
/// ids occupy no columns and are dropped.
pub fn normalize(slots: &[LayoutGroup]) -> Vec<LayoutGroup> {
    let mut out: Vec<LayoutGroup> = Vec::with_capacity(slots.len());
    for group in slots {
        if group.gap {
            if out.last().is_some_and(|prev| prev.gap) {
                continue;
            }
            out.push(LayoutGroup::gap());
        } else if !group.ids.is_empty() {
            out.push(group.clone());
        }
    }
    out
}

/// Alphabetic label for a zero-based row index: A..Z, then AA, AB, ...
pub fn row_label(index: usize) -> String {
    let mut n = index + 1;
    let mut result = String::new();
    while n > 0 {
        n -= 1;
        result.push(((n % 26) as u8 + b'A') as char);
        n /= 26;
    }
    result.chars().rev().collect()
}

/// Space counts shown next to the editor when saving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceTotals {
    pub total: usize,
    /// Always 0 here: grid ids carry no disability marker. Disability
    /// spaces are designated through the bulk import path.
    pub disability: usize,
}

pub fn space_totals(json_text: &str) -> SpaceTotals {
    SpaceTotals {
        total: parse(json_text).space_count(),
        disability: 0,
    }
}
