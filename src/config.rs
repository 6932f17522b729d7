use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use crate::projector::GridConfig;

/// Windows inside which repeated input is treated as one interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Any add at the same cell within this window is dropped.
    pub add_window_ms: u64,
    /// Any add from the same pointer within this window is dropped.
    pub pointer_window_ms: u64,
    /// A delete of the same space by the same pointer within this window is dropped.
    pub delete_window_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        DebounceConfig {
            add_window_ms: 300,
            pointer_window_ms: 120,
            delete_window_ms: 300,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub grid: GridConfig,
    pub debounce: DebounceConfig,
    /// Snapshots kept for undo.
    pub undo_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            grid: GridConfig::default(),
            debounce: DebounceConfig::default(),
            undo_limit: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub layout_path: PathBuf,
    pub catalog_path: PathBuf,
    pub static_dir: PathBuf,
    pub editor: EditorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: String::from("127.0.0.1:3000"),
            layout_path: PathBuf::from("database/layout.json"),
            catalog_path: PathBuf::from("database/spaces.json"),
            static_dir: PathBuf::from("static"),
            editor: EditorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(ServerConfig::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Config file (if given) first, then `PARKMAP_*` environment overrides.
    pub fn load(path: Option<&Path>) -> std::io::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => ServerConfig::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("PARKMAP_BIND") {
            self.bind = bind;
        }
        if let Some(path) = lookup("PARKMAP_LAYOUT") {
            self.layout_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("PARKMAP_CATALOG") {
            self.catalog_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("PARKMAP_STATIC") {
            self.static_dir = PathBuf::from(dir);
        }
    }
}
