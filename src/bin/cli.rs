#![cfg(not(tarpaulin_include))]

use chrono::Utc;
use parkmap::config::EditorConfig;
use parkmap::editor::{EditEngine, EditOutcome, PointerEvent, Tool};
use parkmap::import;
use parkmap::layout::Layout;
use parkmap::projector::project;
use parkmap::saving::{self, FileLayoutStore};
use std::env;
use std::io::{self, Write};

const CELL_WIDTH: usize = 6;

fn display(layout: &Layout) {
    let spaces = project(layout);
    let width = spaces.iter().map(|s| s.x + 1).max().unwrap_or(0);
    let gutter = layout.rows.iter().map(|r| r.row.len()).max().unwrap_or(1) + 2;

    print!("{:gutter$}", "");
    for x in 0..width {
        print!("{:<CELL_WIDTH$}", x);
    }
    println!();

    for (y, row) in layout.rows.iter().enumerate() {
        print!("{:<gutter$}", row.row);
        for x in 0..width {
            match spaces.iter().find(|s| s.y == y as i32 && s.x == x) {
                Some(space) => print!("{:<CELL_WIDTH$}", space.id),
                None => print!("{:<CELL_WIDTH$}", "."),
            }
        }
        println!();
    }
}

fn describe(outcome: &EditOutcome) -> String {
    match outcome {
        EditOutcome::Added { id, x, y } => format!("added {} at ({}, {})", id, x, y),
        EditOutcome::Deleted { id } => format!("deleted {}", id),
        EditOutcome::Ignored { reason } => format!("ignored: {:?}", reason).to_lowercase(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let mut engine = EditEngine::new(EditorConfig::default());

    if let Some(path) = args.get(1) {
        let store = FileLayoutStore::new(path);
        if !engine.load_from(&store)? {
            eprintln!("{} does not exist yet, starting empty", path);
        }
    }

    let mut status = String::from("ok");
    let mut show = true;
    loop {
        if show {
            display(engine.layout());
        }

        print!("[{:?}] ({}) > ", engine.tool(), status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let mut words = command.split_whitespace();
        let verb = match words.next() {
            Some(verb) => verb,
            None => {
                status = String::from("invalid command");
                continue;
            }
        };
        let rest: Vec<&str> = words.collect();

        status = match (verb, rest.as_slice()) {
            ("q", _) => break,
            ("help", _) => {
                println!("Commands:");
                println!("  add <x> <y>       Place a space at a grid cell");
                println!("  click <sx> <sy>   Click at screen position with the current tool");
                println!("  tool add|delete   Select the click tool");
                println!("  del <id>          Delete a space");
                println!("  row <name>        Append an empty row");
                println!("  clear             Remove every row (cannot be undone)");
                println!("  undo              Revert the last edit");
                println!("  show / hide       Toggle grid output");
                println!("  save <path>       Save the layout as JSON (or archive for .bin.gz)");
                println!("  load <path>       Load a layout JSON file or .bin.gz archive");
                println!("  import <codes..>  List parsed codes from free text");
                println!("  q                 Quit");
                String::from("ok")
            }
            ("add", [x, y]) => match (x.parse(), y.parse()) {
                (Ok(x), Ok(y)) => describe(&engine.add_space(parkmap::GridPoint::new(x, y))),
                _ => String::from("invalid coordinate"),
            },
            ("click", [sx, sy]) => match (sx.parse(), sy.parse()) {
                (Ok(screen_x), Ok(screen_y)) => describe(&engine.handle_pointer(&PointerEvent {
                    pointer_id: 0,
                    screen_x,
                    screen_y,
                    timestamp_ms: Utc::now().timestamp_millis(),
                })),
                _ => String::from("invalid position"),
            },
            ("tool", ["add"]) => {
                engine.set_tool(Tool::Add);
                String::from("ok")
            }
            ("tool", ["delete"]) => {
                engine.set_tool(Tool::Delete);
                String::from("ok")
            }
            ("del", [id]) => describe(&engine.delete_space(id)),
            ("row", [name]) => {
                if engine.add_row(name) {
                    String::from("ok")
                } else {
                    String::from("row exists")
                }
            }
            ("clear", _) => {
                engine.clear();
                String::from("ok")
            }
            ("undo", _) => {
                if engine.undo() {
                    String::from("ok")
                } else {
                    String::from("no undo")
                }
            }
            ("show", _) => {
                show = true;
                String::from("ok")
            }
            ("hide", _) => {
                show = false;
                String::from("ok")
            }
            ("save", [path]) if saving::is_archive_path(path) => {
                match saving::write_archive(engine.layout(), path) {
                    Ok(()) => format!("archived {} spaces", engine.spaces().len()),
                    Err(e) => format!("save failed: {}", e),
                }
            }
            ("load", [path]) if saving::is_archive_path(path) => match saving::read_archive(path) {
                Ok(layout) => {
                    engine.set_layout(layout);
                    String::from("ok")
                }
                Err(e) => format!("load failed: {}", e),
            },
            ("save", [path]) => {
                let mut store = FileLayoutStore::new(path);
                match engine.save(&mut store) {
                    Ok(totals) => format!("saved {} spaces", totals.total),
                    Err(e) => format!("save failed: {}", e),
                }
            }
            ("load", [path]) => {
                let store = FileLayoutStore::new(path);
                match engine.load_from(&store) {
                    Ok(true) => String::from("ok"),
                    Ok(false) => String::from("no such file"),
                    Err(e) => format!("load failed: {}", e),
                }
            }
            ("import", codes) if !codes.is_empty() => {
                let spaces = import::parse_codes(&codes.join(" "));
                for space in &spaces {
                    let flag = if space.is_disability { " (disability)" } else { "" };
                    println!("  {}{}", space.code, flag);
                }
                format!("{} codes", spaces.len())
            }
            _ => String::from("invalid command"),
        };
    }

    Ok(())
}
