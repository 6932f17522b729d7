/*!
# Parking Map Editor

Grid-based layout editor for a parking-management platform. Operators
place and delete parking-space markers on a grid; the editor keeps the
arrangement as a compact row/group layout document and hands it to the
platform's backend for persistence.

## Overview

A layout is an ordered list of rows. Each row holds an ordered list of
groups, and each group is either a contiguous run of space ids or a single
one-column gap:

```json
[
  {"row": "A", "slots": [{"ids": ["A1", "A2"], "gap": false},
                         {"ids": [], "gap": true},
                         {"ids": ["A3"], "gap": false}]}
]
```

Positions are never stored. They are projected from the layout on every
render: a space's column is the number of columns covered by the groups
to its left, and its row index is the row's position in the list.

## Architecture

### Layout Model
- Parsing (fail-soft), canonical serialization, gap normalization
- Legacy flat id lists are folded into a single row on load

### Spatial Projector
- Layout to positioned spaces, and grid cell back to group/offset
- Screen to grid mapping with a fixed row-label gutter and cell size

### Edit Engine
- Add and delete with per-row sequential ids (`A1`, `A2`, ...)
- Debouncing of duplicate pointer/mouse/touch deliveries
- Row creation, clearing, bounded undo

### Persistence and Import
- `LayoutStore` collaborator for saving layouts, with a JSON file store
- Gzip + bincode archives for export
- Bulk import of pre-existing space codes into an external catalog

## Modules

- **layout**: layout model, parsing, normalization, row labels, totals
- **projector**: projection, location, screen mapping
- **editor**: edit engine and debouncer
- **saving**: layout stores and archives
- **import**: code splitting and space catalog
- **config**: editor and server settings
- **app**: HTTP routes (feature `web`)
*/

#[cfg(feature = "web")]
pub mod app;
pub mod config;
pub mod editor;
pub mod import;
pub mod layout;
pub mod projector;
pub mod saving;

pub use config::*;
pub use editor::*;
pub use import::*;
pub use layout::{Layout, LayoutDocument, LayoutGroup, LayoutRow, SpaceTotals};
pub use projector::*;
pub use saving::*;
