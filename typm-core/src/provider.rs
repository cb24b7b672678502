//! Remote font catalogs (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;

use anyhow::Result;

use crate::query::{canonical_variant, variant_params};
use crate::record::{FontRecord, VariantRecord};

/// Display hint given to provider variants that do not carry one.
pub const DEFAULT_DISPLAY: &str = "swap";

/// Full detail of one family: its metadata and, per variant id, where each
/// format can be fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontInfos {
    pub font: FontRecord,
    pub variants: BTreeMap<String, VariantRecord>,
}

impl FontInfos {
    pub fn new(font: FontRecord) -> Self {
        Self {
            font,
            variants: BTreeMap::new(),
        }
    }

    /// Add a variant from a catalog token (`regular`, `700italic`...) with
    /// its format sources.
    pub fn with_variant<I, K, V>(mut self, token: &str, files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let id = canonical_variant(token);
        let (weight, style) = variant_params(token);
        let record = VariantRecord {
            id: id.clone(),
            family: self.font.family.clone(),
            style: style.to_string(),
            weight,
            display: DEFAULT_DISPLAY.to_owned(),
            files: files
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        };
        if !self.font.variants.contains(&id) {
            self.font.variants.push(id.clone());
        }
        self.variants.insert(id, record);
        self
    }

    /// Variant ids in catalog order.
    pub fn variant_ids(&self) -> &[String] {
        &self.font.variants
    }
}

/// A source of font metadata and assets.
pub trait FontProvider: Send {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Coarse catalog keyed by font id.
    fn list(&self) -> Result<BTreeMap<String, FontRecord>>;

    /// Detail for one family; `Ok(None)` when the provider does not know it.
    fn infos(&self, id: &str, family: &str) -> Result<Option<FontInfos>>;
}

/// Fixed, in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    name: String,
    fonts: BTreeMap<String, FontInfos>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fonts: BTreeMap::new(),
        }
    }

    pub fn with_font(mut self, infos: FontInfos) -> Self {
        self.fonts.insert(infos.font.id.clone(), infos);
        self
    }
}

impl FontProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self) -> Result<BTreeMap<String, FontRecord>> {
        Ok(self
            .fonts
            .iter()
            .map(|(id, infos)| (id.clone(), infos.font.clone()))
            .collect())
    }

    fn infos(&self, id: &str, _family: &str) -> Result<Option<FontInfos>> {
        Ok(self.fonts.get(id).cloned())
    }
}
