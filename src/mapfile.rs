/*!
 * Rename plan and rename log files
 *
 * JSON files hold an array of `{"old": ..., "new": ...}` objects. Files with
 * a `.csv` extension hold one rename per row under an `old,new` header; the
 * `oldFileName,newFileName` header of older rename logs is accepted too.
 * Paths are relative to the bag root.
 */

use crate::error::{BagError, Result};
use bagmend_core_manifest::{RenameEntry, RenameMap};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// One CSV row
#[derive(Debug, Deserialize)]
struct CsvRename {
    #[serde(alias = "oldFileName")]
    old: String,
    #[serde(alias = "newFileName")]
    new: String,
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Read a rename map from a JSON or CSV file
pub fn load_rename_map(path: &Path) -> Result<RenameMap> {
    let file = File::open(path).map_err(|e| map_file_error(path, e))?;
    if !is_csv(path) {
        return serde_json::from_reader(BufReader::new(file)).map_err(|e| map_file_error(path, e));
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let mut map = RenameMap::new();
    for row in reader.deserialize::<CsvRename>() {
        let row = row.map_err(|e| map_file_error(path, e))?;
        map.insert(row.old, row.new).map_err(|e| map_file_error(path, e))?;
    }
    Ok(map)
}

/// Write a rename map as pretty-printed JSON, or as CSV for a `.csv` path
pub fn save_rename_map(path: &Path, map: &RenameMap) -> Result<()> {
    let file = File::create(path).map_err(|e| map_file_error(path, e))?;
    if is_csv(path) {
        let mut writer = csv::Writer::from_writer(file);
        for entry in map {
            writer
                .serialize::<&RenameEntry>(entry)
                .map_err(|e| map_file_error(path, e))?;
        }
        return writer.flush().map_err(|e| map_file_error(path, e));
    }

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, map).map_err(|e| map_file_error(path, e))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| map_file_error(path, e))
}

/// `renameLog-<bag>-<YYYYmmddTHHMMSS>.json`
pub fn default_log_name(bag_name: &str, now: NaiveDateTime) -> String {
    format!("renameLog-{}-{}.json", bag_name, now.format("%Y%m%dT%H%M%S"))
}

fn map_file_error<E: std::fmt::Display>(path: &Path, err: E) -> BagError {
    BagError::MapFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_preserve_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let map = RenameMap::from_pairs([("data/z.txt", "data/a.txt"), ("data/b.txt", "data/c.txt")])
            .unwrap();

        save_rename_map(&path, &map).unwrap();
        let loaded = load_rename_map(&path).unwrap();

        let order: Vec<&str> = loaded.iter().map(|e| e.old.as_str()).collect();
        assert_eq!(order, vec!["data/z.txt", "data/b.txt"]);
        assert_eq!(loaded, map);
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(
            &path,
            r#"[{"old": "data/a", "new": "data/b"}, {"old": "data/a", "new": "data/c"}]"#,
        )
        .unwrap();

        let err = load_rename_map(&path).unwrap_err();
        assert!(matches!(err, BagError::MapFile { .. }));
        assert!(err.to_string().contains("data/a"));
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("renames.csv");
        let map = RenameMap::from_pairs([("data/a b.txt", "data/c,d.txt"), ("data/x", "data/y")])
            .unwrap();

        save_rename_map(&path, &map).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("old,new\n"));
        assert!(written.contains("\"data/c,d.txt\""));

        assert_eq!(load_rename_map(&path).unwrap(), map);
    }

    #[test]
    fn test_csv_rename_log_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("renameLog.CSV");
        fs::write(
            &path,
            "oldFileName,newFileName\ndata/a.txt,data/b.txt\ndata/c.txt, data/d.txt\n",
        )
        .unwrap();

        let map = load_rename_map(&path).unwrap();
        assert_eq!(map.get("data/a.txt"), Some("data/b.txt"));
        assert_eq!(map.get("data/c.txt"), Some("data/d.txt"));
    }

    #[test]
    fn test_csv_missing_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.csv");
        fs::write(&path, "old\ndata/a.txt\n").unwrap();

        let err = load_rename_map(&path).unwrap_err();
        assert!(matches!(err, BagError::MapFile { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_rename_map(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BagError::MapFile { .. }));
    }

    #[test]
    fn test_default_log_name() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap();
        assert_eq!(
            default_log_name("ms-0412-bag", now),
            "renameLog-ms-0412-bag-20240309T140507.json"
        );
    }
}
