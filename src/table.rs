//! CSV persistence of stage tables.
//!
//! Every stage reads its input table whole and overwrites its output table;
//! there is no appending or in-place update.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PaletteError, Result};

/// Read every row of a headed CSV file.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| PaletteError::csv(path, e))?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| PaletteError::csv(path, e))?;
    debug!(path = %path.display(), rows = rows.len(), "read table");
    Ok(rows)
}

/// Write rows to a headed CSV file, replacing any previous content.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PaletteError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| PaletteError::csv(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| PaletteError::csv(path, e))?;
    }
    writer.flush().map_err(|e| PaletteError::io(path, e))?;
    debug!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

/// Write a value as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PaletteError::io(parent, e))?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|e| PaletteError::json(path, e))?;
    fs::write(path, text).map_err(|e| PaletteError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExtractedColor;

    #[test]
    fn reads_script_produced_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors_with_background.csv");
        fs::write(
            &path,
            "party,rgb,hsl,proportion\n\
             PT,\"[220, 220, 220]\",\"[0, 0, 220]\",0.61\n\
             PT,\"[200, 16, 46]\",\"[248, 218, 108]\",0.39\n",
        )
        .unwrap();

        let rows: Vec<ExtractedColor> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].party, "PT");
        assert_eq!(rows[1].rgb, [200, 16, 46]);
        assert_eq!(rows[1].hsl, [248.0, 218.0, 108.0]);
        assert_eq!(rows[1].proportion, 0.39);
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let rows = vec![ExtractedColor {
            party: "PSOL".into(),
            rgb: [255, 204, 0],
            hsl: [48.0, 1.0, 0.5],
            proportion: 0.25,
        }];
        write_rows(&path, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("party,rgb,hsl,proportion\n"));
        assert!(text.contains("\"[255, 204, 0]\""));

        let back: Vec<ExtractedColor> = read_rows(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn bad_cell_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "party,rgb,hsl,proportion\nPT,\"[1, 2]\",\"[0, 0, 0]\",0.5\n").unwrap();

        let err = read_rows::<ExtractedColor>(&path).unwrap_err();
        assert!(matches!(err, PaletteError::Csv { .. }));
        assert!(err.to_string().contains("bad.csv"));
    }
}
