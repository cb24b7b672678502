//! Registry folder scanning for typm-core (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FontError, Result};
use crate::query::variant_id;
use crate::record::{FontRecord, VariantRecord};
use crate::store::{read_yaml, META_FILE};

/// A font folder found under the registry root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFont {
    pub dir: PathBuf,
    pub record: FontRecord,
    pub variants: Vec<ScannedVariant>,
}

/// A variant folder with its asset files keyed by extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedVariant {
    pub dir: PathBuf,
    pub record: VariantRecord,
    pub files: BTreeMap<String, String>,
}

/// Walks `<root>/<fontId>/<variantId>/` and reads every `font.yml` on the way.
///
/// Folders without a (non-empty) `font.yml` are not fonts and are skipped.
/// Symlinked folders and files are followed.
#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    root: PathBuf,
}

impl DirectoryDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn discover(&self) -> Result<Vec<ScannedFont>> {
        if !self.root.is_dir() {
            return Err(FontError::RootNotFound(self.root.clone()));
        }

        let mut found = Vec::new();
        for dir in self.children(&self.root, true)? {
            let Some(mut record) = read_yaml::<FontRecord>(&dir.join(META_FILE))? else {
                continue;
            };
            record.complete_identity();

            let mut variants = Vec::new();
            for variant_dir in self.children(&dir, true)? {
                if let Some(variant) = self.scan_variant(&variant_dir, &record.family)? {
                    variants.push(variant);
                }
            }

            debug!(font = %record.id, variants = variants.len(), "scanned font folder");
            found.push(ScannedFont {
                dir,
                record,
                variants,
            });
        }

        Ok(found)
    }

    fn scan_variant(&self, dir: &Path, family: &str) -> Result<Option<ScannedVariant>> {
        let Some(mut record) = read_yaml::<VariantRecord>(&dir.join(META_FILE))? else {
            return Ok(None);
        };
        if record.family.is_empty() {
            record.family = family.to_owned();
        }
        if record.id.is_empty() {
            record.id = variant_id(&record.weight, &record.style);
        }

        let mut files = BTreeMap::new();
        for path in self.children(dir, false)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name == META_FILE {
                continue;
            }
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                files.insert(ext.to_owned(), name.to_owned());
            }
        }

        Ok(Some(ScannedVariant {
            dir: dir.to_path_buf(),
            record,
            files,
        }))
    }

    /// Direct children of `dir`, sorted by name: folders or plain files.
    fn children(&self, dir: &Path, folders: bool) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            let kind = entry.file_type();
            if (folders && kind.is_dir()) || (!folders && kind.is_file()) {
                out.push(entry.into_path());
            }
        }
        Ok(out)
    }
}
