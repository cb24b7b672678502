//! Font families and the descriptors served to callers (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FontError, Result};
use crate::record::FontRecord;
use crate::variant::{FontStyle, FontVariant};

/// Version assumed for a family whose source did not report one.
pub const DEFAULT_VERSION: &str = "V1";

/// A family known to the registry, with the variants materialized locally.
#[derive(Debug, Clone)]
pub struct Font {
    id: String,
    family: String,
    category: String,
    version: String,
    last_modified: String,
    local: bool,
    subsets: Vec<String>,
    variants: Vec<String>,
    installed: bool,
    path: PathBuf,
    font_variants: BTreeMap<String, FontVariant>,
}

impl Font {
    /// Build a family rooted at `<root>/<id>`.
    pub fn from_record(mut record: FontRecord, root: &Path) -> Self {
        record.complete_identity();
        if record.version.is_empty() {
            record.version = DEFAULT_VERSION.to_owned();
        }

        let mut variants: Vec<String> = Vec::with_capacity(record.variants.len());
        for token in record.variants {
            if !variants.contains(&token) {
                variants.push(token);
            }
        }

        Self {
            path: root.join(&record.id),
            id: record.id,
            family: record.family,
            category: record.category,
            version: record.version,
            last_modified: record.last_modified,
            local: record.local,
            subsets: record.subsets,
            variants,
            installed: false,
            font_variants: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn last_modified(&self) -> &str {
        &self.last_modified
    }

    pub fn subsets(&self) -> &[String] {
        &self.subsets
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub(crate) fn mark_installed(&mut self) {
        self.installed = true;
    }

    /// Every variant the family may have, installed or not.
    pub fn available_variants(&self) -> &[String] {
        &self.variants
    }

    /// Variants materialized under the font folder.
    pub fn installed_variants(&self) -> Vec<&str> {
        self.font_variants.keys().map(String::as_str).collect()
    }

    pub fn has_variant(&self, id: &str) -> bool {
        self.variants.iter().any(|v| v == id)
    }

    pub fn add_variant(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.has_variant(&id) {
            self.variants.push(id);
        }
    }

    /// An empty subset list declares no constraint.
    pub fn supports_subsets(&self, requested: &[String]) -> bool {
        self.first_missing_subset(requested).is_none()
    }

    pub fn check_subsets(&self, requested: &[String]) -> Result<()> {
        match self.first_missing_subset(requested) {
            None => Ok(()),
            Some(subset) => Err(FontError::SubsetNotAvailable {
                family: self.family.clone(),
                subset: subset.to_owned(),
                available: self.subsets.clone(),
            }),
        }
    }

    fn first_missing_subset<'a>(&self, requested: &'a [String]) -> Option<&'a str> {
        if self.subsets.is_empty() {
            return None;
        }
        requested
            .iter()
            .find(|s| !self.subsets.contains(s))
            .map(String::as_str)
    }

    /// Relocate the family to the folder it was found in.
    pub(crate) fn set_path(&mut self, dir: PathBuf) {
        for variant in self.font_variants.values_mut() {
            variant.set_base_path(&dir);
        }
        self.path = dir;
    }

    /// Attach a materialized variant; its id joins the known variants.
    pub fn add_font_variant(&mut self, mut variant: FontVariant) {
        variant.set_base_path(&self.path);
        if variant.family().is_empty() {
            variant.set_family(&self.family);
        }
        let id = variant.id().to_owned();
        self.add_variant(id.clone());
        self.font_variants.insert(id, variant);
    }

    pub fn has_font_variant(&self, id: &str) -> bool {
        self.font_variants.contains_key(id)
    }

    pub fn font_variant(&self, id: &str) -> Option<&FontVariant> {
        self.font_variants.get(id)
    }

    pub fn font_variant_mut(&mut self, id: &str) -> Option<&mut FontVariant> {
        self.font_variants.get_mut(id)
    }

    pub(crate) fn take_font_variant(&mut self, id: &str) -> Option<FontVariant> {
        self.font_variants.remove(id)
    }

    pub fn font_variants(&self) -> impl Iterator<Item = &FontVariant> {
        self.font_variants.values()
    }

    pub fn has_installed_variants(&self) -> bool {
        self.font_variants.values().any(FontVariant::is_installed)
    }

    /// Descriptor of one materialized variant.
    pub fn face(&self, variant_id: &str) -> Option<FontFace> {
        let variant = self.font_variant(variant_id)?;
        let family = if variant.family().is_empty() {
            self.family.clone()
        } else {
            variant.family().to_owned()
        };
        Some(FontFace {
            id: self.id.clone(),
            variant: variant.id().to_owned(),
            family,
            style: variant.style(),
            weight: variant.weight().to_owned(),
            display: variant.display().to_owned(),
            version: self.version.clone(),
            local: self.local,
            files: variant.file_paths(),
        })
    }

    /// Entry of the root `fonts.yml` index.
    pub fn to_record(&self) -> FontRecord {
        FontRecord {
            local: self.local,
            id: self.id.clone(),
            family: self.family.clone(),
            category: self.category.clone(),
            version: self.version.clone(),
            last_modified: self.last_modified.clone(),
            variants: self.variants.clone(),
            subsets: self.subsets.clone(),
        }
    }

    /// Contents of `<root>/<id>/font.yml`: identity and metadata only.
    pub fn to_file_record(&self) -> FontRecord {
        FontRecord {
            variants: Vec::new(),
            subsets: Vec::new(),
            ..self.to_record()
        }
    }

    pub fn summary(&self) -> FontSummary {
        FontSummary {
            id: self.id.clone(),
            family: self.family.clone(),
            category: self.category.clone(),
            version: self.version.clone(),
            local: self.local,
            installed: self.installed,
            variants: self.variants.clone(),
            installed_variants: self
                .font_variants
                .values()
                .filter(|v| v.is_installed())
                .map(|v| v.id().to_owned())
                .collect(),
            subsets: self.subsets.clone(),
        }
    }
}

/// What a caller needs to reference an installed variant: metadata plus the
/// absolute path of each rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFace {
    pub id: String,
    pub variant: String,
    pub family: String,
    pub style: FontStyle,
    pub weight: String,
    pub display: String,
    pub version: String,
    pub local: bool,
    pub files: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSummary {
    pub id: String,
    pub family: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub version: String,
    pub local: bool,
    pub installed: bool,
    pub variants: Vec<String>,
    pub installed_variants: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subsets: Vec<String>,
}
