//! Registry configuration (made by FontLab https://www.fontlab.com/)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// File formats a variant can be materialized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    Ttf,
    Woff,
    Woff2,
    Eot,
    Svg,
}

impl FontFormat {
    pub const ALL: [FontFormat; 5] = [
        FontFormat::Ttf,
        FontFormat::Woff,
        FontFormat::Woff2,
        FontFormat::Eot,
        FontFormat::Svg,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            FontFormat::Ttf => "ttf",
            FontFormat::Woff => "woff",
            FontFormat::Woff2 => "woff2",
            FontFormat::Eot => "eot",
            FontFormat::Svg => "svg",
        }
    }

    /// Formats the subsetting tool can derive from a TTF.
    pub fn is_web_flavor(self) -> bool {
        matches!(self, FontFormat::Woff | FontFormat::Woff2)
    }
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FontFormat {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let wanted = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        FontFormat::ALL
            .into_iter()
            .find(|format| format.extension() == wanted)
            .ok_or_else(|| anyhow!("unknown font format: {raw}"))
    }
}

pub const DEFAULT_FORMATS: [FontFormat; 3] = [FontFormat::Ttf, FontFormat::Woff2, FontFormat::Woff];

/// Parse a collection of format names, rejecting unknown ones.
pub fn parse_format_list(raw: &[String]) -> Result<Vec<FontFormat>> {
    let mut formats: Vec<FontFormat> = Vec::with_capacity(raw.len());
    for item in raw.iter().flat_map(|s| s.split(',')) {
        if item.trim().is_empty() {
            continue;
        }
        let format = item.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsDbConfig {
    /// Registry root: holds `fonts.yml` and one folder per font.
    pub root: PathBuf,
    /// Formats every installed variant must have on disk.
    pub formats: Vec<FontFormat>,
    /// Program used to derive WOFF/WOFF2 files from a TTF.
    pub subsetter: PathBuf,
}

impl Default for FontsDbConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("fonts"),
            formats: DEFAULT_FORMATS.to_vec(),
            subsetter: PathBuf::from("pyftsubset"),
        }
    }
}

impl FontsDbConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = FontFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    pub fn with_subsetter(mut self, program: impl Into<PathBuf>) -> Self {
        self.subsetter = program.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn requires_extension(&self, ext: &str) -> bool {
        self.formats.iter().any(|f| f.extension() == ext)
    }
}
