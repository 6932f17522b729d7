use parkmap::editor::{EditEngine, EditOutcome, IgnoreReason, PointerEvent, Tool};
use parkmap::layout::{self, Layout, LayoutGroup, LayoutRow};
use parkmap::projector::{self, GridPoint, SlotLocation};
use parkmap::saving::{FileLayoutStore, LayoutStore};
use parkmap::{EditorConfig, SpaceTotals};

fn engine(json: &str) -> EditEngine {
    EditEngine::from_json(json, EditorConfig::default())
}

fn assert_projection_inverse(layout: &Layout) {
    for space in projector::project(layout) {
        match projector::locate(layout, space.x, space.y) {
            SlotLocation::Space { group, offset } => {
                let row = &layout.rows[space.y as usize];
                assert_eq!(row.slots[group].ids[offset], space.id);
                assert_eq!(row.row, space.row);
            }
            other => panic!("{} at ({}, {}) located as {:?}", space.id, space.x, space.y, other),
        }
    }
}

#[test]
fn round_trip_normalized_layout() {
    let layout = Layout::new(vec![
        LayoutRow {
            row: "A".into(),
            slots: vec![
                LayoutGroup::spaces(vec!["A1".into(), "A2".into()]),
                LayoutGroup::gap(),
                LayoutGroup::single("A4"),
            ],
        },
        LayoutRow::new("B"),
        LayoutRow {
            row: "VIP".into(),
            slots: vec![LayoutGroup::gap(), LayoutGroup::single("VIP1")],
        },
    ]);
    assert_eq!(layout::parse(&layout::serialize(&layout)), layout);
}

#[test]
fn delete_first_space_leaves_leading_gap() {
    let mut e = engine(r#"[{"row":"A","slots":[{"ids":["A1","A2"],"gap":false}]}]"#);
    e.delete_space("A1");
    assert_eq!(
        e.to_json(),
        r#"[{"row":"A","slots":[{"ids":[],"gap":true},{"ids":["A2"],"gap":false}]}]"#
    );
}

#[test]
fn add_at_origin_of_empty_layout() {
    let mut e = engine("[]");
    let (sx, sy) = e.config().grid.cell_origin(GridPoint::new(0, 0));
    let outcome = e.handle_pointer(&PointerEvent {
        pointer_id: 1,
        screen_x: sx + 5.0,
        screen_y: sy + 5.0,
        timestamp_ms: 10_000,
    });
    assert!(outcome.changed());
    assert_eq!(
        e.to_json(),
        r#"[{"row":"A","slots":[{"ids":["A1"],"gap":false}]}]"#
    );
}

#[test]
fn legacy_ids_become_one_row() {
    let layout = layout::parse(r#"["A1","A2","B1"]"#);
    assert_eq!(layout.rows.len(), 1);
    assert_eq!(
        layout.rows[0].slots,
        vec![LayoutGroup::spaces(vec!["A1".into(), "A2".into(), "B1".into()])]
    );
    let ids: Vec<String> = projector::project(&layout).into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["A1", "A2", "B1"]);
}

#[test]
fn sequential_ids_in_click_order() {
    let mut e = engine("[]");
    let mut added = Vec::new();
    for (i, x) in [0, 1, 2].into_iter().enumerate() {
        if let EditOutcome::Added { id, .. } =
            e.add_from_pointer(GridPoint::new(x, 0), 1, 1_000 + i as i64 * 1_000)
        {
            added.push(id);
        }
    }
    assert_eq!(added, vec!["A1", "A2", "A3"]);
}

#[test]
fn rows_number_independently() {
    let mut e = engine("[]");
    e.add_space(GridPoint::new(0, 0));
    e.add_space(GridPoint::new(1, 0));
    e.add_space(GridPoint::new(0, 1));
    let ids: Vec<String> = e.spaces().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["A1", "A2", "B1"]);
}

#[test]
fn repeated_delete_from_same_pointer_changes_once() {
    let mut e = engine(r#"[{"row":"A","slots":[{"ids":["A1","A2","A3"],"gap":false}]}]"#);
    e.set_tool(Tool::Delete);
    let (sx, sy) = e.config().grid.cell_origin(GridPoint::new(1, 0));
    let event = PointerEvent {
        pointer_id: 9,
        screen_x: sx + 1.0,
        screen_y: sy + 1.0,
        timestamp_ms: 50_000,
    };

    let first = e.handle_pointer(&event);
    let after_first = e.layout().clone();
    let second = e.activate_space(
        "A2",
        9,
        event.timestamp_ms + 50,
    );

    assert_eq!(first, EditOutcome::Deleted { id: "A2".into() });
    assert_eq!(
        second,
        EditOutcome::Ignored {
            reason: IgnoreReason::Debounced
        }
    );
    assert_eq!(e.layout(), &after_first);
}

#[test]
fn add_then_delete_beyond_row_keeps_other_spaces() {
    let mut e = engine(
        r#"[{"row":"A","slots":[{"ids":["A1","A2"],"gap":false}]},{"row":"B","slots":[{"ids":["B1"],"gap":false}]}]"#,
    );
    let before = e.spaces();

    let id = match e.add_space(GridPoint::new(4, 1)) {
        EditOutcome::Added { id, .. } => id,
        other => panic!("unexpected {:?}", other),
    };
    e.delete_space(&id);

    assert_eq!(e.spaces(), before);
    assert!(!e.layout().has_adjacent_gaps());
}

#[test]
fn edits_never_leave_adjacent_gaps() {
    let mut e = engine("[]");
    let script: &[(bool, i32, i32)] = &[
        (true, 0, 0),
        (true, 1, 0),
        (true, 2, 0),
        (true, 3, 0),
        (true, 7, 0),
        (false, 1, 0),
        (false, 2, 0),
        (true, 0, 2),
        (false, 0, 0),
        (true, 1, 0),
        (false, 3, 0),
        (true, -1, 2),
        (false, 0, 2),
        (true, 5, 1),
        (true, i32::MAX, 1),
        (true, i32::MIN, 1),
        (false, 6, 1),
    ];
    for &(add, x, y) in script {
        let point = GridPoint::new(x, y);
        if add {
            e.add_space(point);
        } else {
            e.delete_at(point);
        }
        assert!(!e.layout().has_adjacent_gaps(), "after {:?}", (add, x, y));
        assert_projection_inverse(e.layout());
        let normalized = {
            let mut copy = e.layout().clone();
            copy.normalize();
            copy
        };
        assert_eq!(&normalized, e.layout());
        assert_eq!(layout::parse(&e.to_json()), *e.layout());
    }
}

#[test]
fn save_reports_totals_and_propagates_errors() {
    struct FailingStore;

    impl LayoutStore for FailingStore {
        type Error = String;

        fn save_layout(&mut self, _layout_json: &str) -> Result<(), String> {
            Err("backend unavailable".to_string())
        }

        fn load_layout(&self) -> Result<Option<String>, String> {
            Err("backend unavailable".to_string())
        }
    }

    let mut e = engine(r#"[{"row":"A","slots":[{"ids":["A1","A2"],"gap":false},{"ids":[],"gap":true},{"ids":["A4"],"gap":false}]}]"#);
    assert_eq!(e.save(&mut FailingStore), Err("backend unavailable".to_string()));
    assert_eq!(e.load_from(&FailingStore), Err("backend unavailable".to_string()));
    assert_eq!(e.spaces().len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let mut store = FileLayoutStore::new(dir.path().join("layout.json"));
    assert_eq!(
        e.save(&mut store).unwrap(),
        SpaceTotals {
            total: 3,
            disability: 0
        }
    );

    let mut reloaded = EditEngine::new(EditorConfig::default());
    assert!(reloaded.load_from(&store).unwrap());
    assert_eq!(reloaded.layout(), e.layout());
}

#[test]
fn malformed_load_yields_empty_layout() {
    let mut e = engine(r#"[{"row":"A","slots":[{"ids":["A1"],"gap":false}]}]"#);
    e.load_json("{\"row\": ");
    assert!(e.layout().is_empty());
    assert!(e.spaces().is_empty());
}
