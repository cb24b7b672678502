//! Google Fonts developer API provider (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::fetch::http_client;
use crate::provider::{FontInfos, FontProvider};
use crate::query::{canonical_variant, family_id};
use crate::record::FontRecord;

pub const GOOGLE_FONTS_URL: &str = "https://www.googleapis.com/webfonts/v1/webfonts";

#[derive(Debug, Default, Deserialize)]
struct Catalog {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    family: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    last_modified: String,
    #[serde(default)]
    variants: Vec<String>,
    #[serde(default)]
    subsets: Vec<String>,
    #[serde(default)]
    files: BTreeMap<String, String>,
}

impl Item {
    fn record(&self) -> FontRecord {
        FontRecord {
            id: family_id(&self.family),
            family: self.family.clone(),
            category: self.category.clone(),
            version: self.version.clone(),
            last_modified: self.last_modified.clone(),
            variants: self.variants.iter().map(|v| canonical_variant(v)).collect(),
            subsets: self.subsets.clone(),
            local: false,
        }
    }
}

/// Catalog response body to font records keyed by id.
pub fn parse_list(body: &str) -> Result<BTreeMap<String, FontRecord>> {
    let catalog: Catalog = serde_json::from_str(body).context("decoding Google Fonts catalog")?;
    Ok(catalog
        .items
        .iter()
        .map(|item| {
            let record = item.record();
            (record.id.clone(), record)
        })
        .collect())
}

/// Family-filtered response body to the family detail. Each variant gets the
/// single TTF listed in `files`.
pub fn parse_infos(body: &str) -> Result<Option<FontInfos>> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("decoding Google Fonts family")?;
    if !value.is_object() {
        return Ok(None);
    }
    let catalog: Catalog = serde_json::from_value(value)?;
    let Some(item) = catalog.items.into_iter().next() else {
        return Ok(None);
    };
    if item.files.is_empty() {
        return Ok(None);
    }

    let mut font = item.record();
    font.variants.clear();
    let mut infos = FontInfos::new(font);
    for (token, url) in &item.files {
        infos = infos.with_variant(token, [("ttf", url.as_str())]);
    }
    Ok(Some(infos))
}

/// Requires a developer API key.
#[derive(Debug, Clone)]
pub struct GoogleFontsProvider {
    api_key: String,
    url: String,
}

impl GoogleFontsProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: GOOGLE_FONTS_URL.to_owned(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn request(&self, family: Option<&str>) -> Result<String> {
        let mut query = vec![("key", self.api_key.as_str())];
        if let Some(family) = family {
            query.push(("family", family));
        }
        let body = http_client()?
            .get(&self.url)
            .query(&query)
            .send()
            .with_context(|| format!("requesting {}", self.url))?
            .error_for_status()?
            .text()?;
        Ok(body)
    }
}

impl FontProvider for GoogleFontsProvider {
    fn name(&self) -> &str {
        "google-fonts"
    }

    fn list(&self) -> Result<BTreeMap<String, FontRecord>> {
        let fonts = parse_list(&self.request(None)?)?;
        debug!(count = fonts.len(), "Google Fonts catalog fetched");
        Ok(fonts)
    }

    fn infos(&self, _id: &str, family: &str) -> Result<Option<FontInfos>> {
        parse_infos(&self.request(Some(family))?)
    }
}
