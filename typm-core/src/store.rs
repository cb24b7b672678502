//! YAML persistence for the index and per-folder metadata (made by FontLab https://www.fontlab.com/)

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FontError, Result};
use crate::fetch::set_asset_permissions;

/// Registry index at the root folder.
pub const INDEX_FILE: &str = "fonts.yml";
/// Metadata file inside each font and variant folder.
pub const META_FILE: &str = "font.yml";

/// Read a YAML document; a missing or blank file yields `None`.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|source| FontError::Yaml {
            path: path.to_path_buf(),
            source,
        })
}

/// Write a YAML document through a sibling temp file and a rename.
pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_yaml::to_string(value).map_err(|source| FontError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("yml.tmp");
    if let Err(err) = replace_with(&tmp, path, body.as_bytes()) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    set_asset_permissions(path)?;
    Ok(())
}

fn replace_with(tmp: &Path, target: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(body)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FontRecord;
    use tempfile::tempdir;

    #[test]
    fn missing_and_blank_files_read_as_none() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(INDEX_FILE);
        assert!(read_yaml::<Vec<FontRecord>>(&path).unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(read_yaml::<Vec<FontRecord>>(&path).unwrap().is_none());
    }

    #[test]
    fn failed_replace_leaves_no_temp_file() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("lato").join(META_FILE);
        fs::create_dir_all(&target).unwrap();

        let err = write_yaml(&target, &FontRecord::new("Lato")).unwrap_err();
        assert!(matches!(err, FontError::Io(_)));
        assert!(!target.with_extension("yml.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn written_documents_read_back() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("roboto").join(META_FILE);
        let record = FontRecord::new("Roboto").with_version("v30");

        write_yaml(&path, &record).unwrap();
        let back: FontRecord = read_yaml(&path).unwrap().unwrap();

        assert_eq!(back, record);
        assert!(!path.with_extension("yml.tmp").exists());
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(INDEX_FILE);
        fs::write(&path, "- id: [unterminated\n").unwrap();

        let err = read_yaml::<Vec<FontRecord>>(&path).unwrap_err();
        assert!(matches!(err, FontError::Yaml { .. }));
        assert!(err.to_string().contains(INDEX_FILE));
    }
}
