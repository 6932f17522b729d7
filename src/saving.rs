use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use crate::layout::Layout;

/// Persistence collaborator that receives serialized layouts.
pub trait LayoutStore {
    type Error;

    fn save_layout(&mut self, layout_json: &str) -> Result<(), Self::Error>;

    /// `None` when nothing has been saved yet.
    fn load_layout(&self) -> Result<Option<String>, Self::Error>;
}

/// Keeps the layout as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileLayoutStore {
    path: PathBuf,
}

impl FileLayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLayoutStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LayoutStore for FileLayoutStore {
    type Error = std::io::Error;

    fn save_layout(&mut self, layout_json: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Re-indent for humans; the content stays the same document.
        let value: serde_json::Value = serde_json::from_str(layout_json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let pretty = serde_json::to_string_pretty(&value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let mut file = File::create(&self.path)?;
        file.write_all(pretty.as_bytes())?;
        Ok(())
    }

    fn load_layout(&self) -> std::io::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.path).map(Some)
    }
}

/// Write a `.bin.gz` archive of the layout.
pub fn write_archive(layout: &Layout, filename: impl AsRef<Path>) -> std::io::Result<()> {
    fs::write(filename, archive_bytes(layout)?)
}

pub fn read_archive(filename: impl AsRef<Path>) -> std::io::Result<Layout> {
    layout_from_archive(&fs::read(filename)?)
}

pub fn is_archive_path(path: impl AsRef<Path>) -> bool {
    path.as_ref().to_string_lossy().ends_with(".bin.gz")
}

/// Gzip-compressed bincode of the layout, for downloads.
pub fn archive_bytes(layout: &Layout) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serialize_into(&mut encoder, layout)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    encoder.finish()
}

pub fn layout_from_archive(buffer: &[u8]) -> std::io::Result<Layout> {
    let decoder = GzDecoder::new(Cursor::new(buffer));
    let mut reader = std::io::BufReader::new(decoder);

    let mut layout: Layout = deserialize_from(&mut reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    layout.normalize();

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::parse;

    const SAMPLE: &str = r#"[{"row":"A","slots":[{"ids":["A1"],"gap":false},{"ids":[],"gap":true},{"ids":["A3"],"gap":false}]},{"row":"B","slots":[]}]"#;

    #[test]
    fn test_file_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileLayoutStore::new(dir.path().join("nested/layout.json"));
        assert_eq!(store.load_layout().unwrap(), None);

        store.save_layout(SAMPLE).unwrap();
        let loaded = store.load_layout().unwrap().unwrap();
        assert!(loaded.contains('\n'));
        assert_eq!(parse(&loaded), parse(SAMPLE));
    }

    #[test]
    fn test_file_store_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileLayoutStore::new(dir.path().join("layout.json"));
        store.save_layout(SAMPLE).unwrap();

        let err = store.save_layout("{\"row\": ").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        let kept = store.load_layout().unwrap().unwrap();
        assert_eq!(parse(&kept), parse(SAMPLE));
    }

    #[test]
    fn test_file_store_writes_document_as_given() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileLayoutStore::new(dir.path().join("layout.json"));
        store.save_layout(r#"["A1","A2"]"#).unwrap();
        let stored: Vec<String> =
            serde_json::from_str(&store.load_layout().unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec!["A1", "A2"]);
    }

    #[test]
    fn test_archive_path_detection() {
        assert!(is_archive_path("backups/lot.bin.gz"));
        assert!(!is_archive_path("lot.json"));
        assert!(!is_archive_path("lot.gz"));
    }

    #[test]
    fn test_archive_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lot.bin.gz");
        let layout = parse(SAMPLE);

        write_archive(&layout, &path).unwrap();
        assert_eq!(read_archive(&path).unwrap(), layout);
    }

    #[test]
    fn test_archive_bytes() {
        let layout = parse(SAMPLE);
        let bytes = archive_bytes(&layout).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert_eq!(layout_from_archive(&bytes).unwrap(), layout);
    }

    #[test]
    fn test_archive_garbage_is_invalid_data() {
        let err = layout_from_archive(b"not an archive").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
