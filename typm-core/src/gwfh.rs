//! google-webfonts-helper provider (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::FontFormat;
use crate::fetch::http_client;
use crate::provider::{FontInfos, FontProvider};
use crate::query::{canonical_variant, family_id};
use crate::record::FontRecord;

pub const GWFH_URL: &str = "https://gwfh.mranftl.com/api/fonts";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    #[serde(default)]
    id: String,
    family: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    last_modified: String,
    #[serde(default)]
    subsets: Vec<String>,
}

impl Entry {
    fn record(&self, variants: Vec<String>) -> FontRecord {
        FontRecord {
            id: if self.id.is_empty() {
                family_id(&self.family)
            } else {
                self.id.clone()
            },
            family: self.family.clone(),
            category: self.category.clone(),
            version: self.version.clone(),
            last_modified: self.last_modified.clone(),
            variants,
            subsets: self.subsets.clone(),
            local: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(flatten)]
    entry: Entry,
    #[serde(default)]
    variants: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Detail {
    #[serde(flatten)]
    entry: Entry,
    #[serde(default)]
    variants: Vec<DetailVariant>,
}

/// One variant of a detail answer; every format field holds a download URL.
#[derive(Debug, Deserialize)]
struct DetailVariant {
    id: String,
    #[serde(default)]
    ttf: Option<String>,
    #[serde(default)]
    woff: Option<String>,
    #[serde(default)]
    woff2: Option<String>,
    #[serde(default)]
    eot: Option<String>,
    #[serde(default)]
    svg: Option<String>,
}

impl DetailVariant {
    fn sources(&self) -> Vec<(&'static str, String)> {
        [
            (FontFormat::Ttf, &self.ttf),
            (FontFormat::Woff, &self.woff),
            (FontFormat::Woff2, &self.woff2),
            (FontFormat::Eot, &self.eot),
            (FontFormat::Svg, &self.svg),
        ]
        .into_iter()
        .filter_map(|(format, url)| match url {
            Some(url) if !url.is_empty() => Some((format.extension(), url.clone())),
            _ => None,
        })
        .collect()
    }
}

pub fn parse_list(body: &str) -> Result<BTreeMap<String, FontRecord>> {
    let entries: Vec<ListEntry> =
        serde_json::from_str(body).context("decoding webfonts-helper catalog")?;
    Ok(entries
        .into_iter()
        .map(|item| {
            let variants = item.variants.iter().map(|v| canonical_variant(v)).collect();
            let record = item.entry.record(variants);
            (record.id.clone(), record)
        })
        .collect())
}

/// Detail body for one family. The service answers unknown ids with a bare
/// JSON string.
pub fn parse_infos(body: &str) -> Result<Option<FontInfos>> {
    let value: serde_json::Value =
        serde_json::from_str(body).context("decoding webfonts-helper family")?;
    if !value.is_object() {
        return Ok(None);
    }
    let detail: Detail = serde_json::from_value(value)?;
    if detail.variants.is_empty() {
        return Ok(None);
    }

    let mut infos = FontInfos::new(detail.entry.record(Vec::new()));
    for variant in &detail.variants {
        infos = infos.with_variant(&variant.id, variant.sources());
    }
    Ok(Some(infos))
}

#[derive(Debug, Clone)]
pub struct GwfhProvider {
    url: String,
}

impl Default for GwfhProvider {
    fn default() -> Self {
        Self::new(GWFH_URL)
    }
}

impl GwfhProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_owned(),
        }
    }
}

impl FontProvider for GwfhProvider {
    fn name(&self) -> &str {
        "gwfh"
    }

    fn list(&self) -> Result<BTreeMap<String, FontRecord>> {
        let body = http_client()?
            .get(&self.url)
            .header(reqwest::header::REFERER, &self.url)
            .send()
            .with_context(|| format!("requesting {}", self.url))?
            .error_for_status()?
            .text()?;
        let fonts = parse_list(&body)?;
        debug!(count = fonts.len(), "webfonts-helper catalog fetched");
        Ok(fonts)
    }

    fn infos(&self, id: &str, _family: &str) -> Result<Option<FontInfos>> {
        let url = format!("{}/{id}", self.url);
        let response = http_client()?
            .get(&url)
            .send()
            .with_context(|| format!("requesting {url}"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        parse_infos(&response.error_for_status()?.text()?)
    }
}
