//! Query parsing and normalization (made by FontLab https://www.fontlab.com/)

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::variant::FontStyle;

static PROVIDER_ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})italic$").expect("static regex"));

/// A loosely specified font request, as typed by a human.
///
/// The family may carry the weight and subsets inline
/// (`"Roboto/700italic@latin,latin-ext"`); inline values win over the
/// builder ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontQuery {
    family: String,
    weight: Option<String>,
    style: Option<String>,
    subsets: Option<Vec<String>>,
}

impl FontQuery {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            ..Self::default()
        }
    }

    /// Accepts `700`, `"700"`, `"bold"`, `"700italic"`...
    pub fn with_weight(mut self, weight: impl ToString) -> Self {
        self.weight = Some(weight.to_string());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_subsets<I, S>(mut self, subsets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subsets = Some(subsets.into_iter().map(Into::into).collect());
        self
    }

    pub fn normalize(&self) -> NormalizedQuery {
        normalize(
            &self.family,
            self.weight.as_deref(),
            self.style.as_deref(),
            self.subsets.as_deref(),
        )
    }
}

impl From<&str> for FontQuery {
    fn from(family: &str) -> Self {
        Self::new(family)
    }
}

impl From<String> for FontQuery {
    fn from(family: String) -> Self {
        Self::new(family)
    }
}

impl From<&FontQuery> for FontQuery {
    fn from(query: &FontQuery) -> Self {
        query.clone()
    }
}

impl From<&NormalizedQuery> for FontQuery {
    fn from(query: &NormalizedQuery) -> Self {
        query.to_query()
    }
}

/// Canonical identity of a requested font variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedQuery {
    pub family: String,
    pub id: String,
    pub weight: String,
    pub style: String,
    pub variant_id: String,
    pub subsets: Vec<String>,
}

impl NormalizedQuery {
    /// Feed the canonical tuple back as a query; normalizing it again is a no-op.
    pub fn to_query(&self) -> FontQuery {
        FontQuery {
            family: self.family.clone(),
            weight: Some(self.weight.clone()),
            style: Some(self.style.clone()),
            subsets: Some(self.subsets.clone()),
        }
    }
}

impl fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.family, self.variant_id)?;
        if !self.subsets.is_empty() {
            write!(f, "@{}", self.subsets.join(","))?;
        }
        Ok(())
    }
}

/// Map a raw query onto its canonical `(family, id, weight, style, variant, subsets)`.
pub fn normalize(
    raw_family: &str,
    weight: Option<&str>,
    style: Option<&str>,
    subsets: Option<&[String]>,
) -> NormalizedQuery {
    let mut family = raw_family;
    let mut subsets: Vec<String> = subsets.map(<[String]>::to_vec).unwrap_or_default();
    let mut weight: Option<String> = weight.map(str::to_owned);
    let mut style = style
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    if let Some((head, tail)) = family.split_once('@') {
        family = head;
        if !tail.is_empty() {
            subsets = tail.split(',').map(str::to_owned).collect();
        }
    }

    if let Some((head, tail)) = family.split_once('/') {
        family = head;
        weight = Some(tail.to_owned());
    }

    let mut weight = weight
        .map(|w| w.trim().to_lowercase())
        .unwrap_or_default();

    while let Some(prefix) = weight.strip_suffix("italic") {
        weight = prefix.trim_end().to_owned();
        style = "italic".to_owned();
    }

    match weight.as_str() {
        "extralight" => weight = "100".to_owned(),
        "light" => weight = "300".to_owned(),
        "bold" => weight = "700".to_owned(),
        "extrabold" => weight = "900".to_owned(),
        "regular" => {
            weight.clear();
            style.clear();
        }
        _ => {}
    }

    let family = family.trim_matches(|c: char| c.is_whitespace() || c == '-');
    let variant_id = variant_id(&weight, &style);

    NormalizedQuery {
        family: family_name(family),
        id: family_id(family),
        weight,
        style,
        variant_id,
        subsets: clean_subsets(subsets),
    }
}

fn clean_subsets(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for subset in raw {
        let subset = subset.trim().to_lowercase();
        if !subset.is_empty() && !out.contains(&subset) {
            out.push(subset);
        }
    }
    out
}

/// `"Open Sans"` -> `"open-sans"`.
pub fn family_id(name: &str) -> String {
    name.replace(' ', "-").to_lowercase()
}

/// `"open-sans"` -> `"Open Sans"`; an already formatted name is left alone.
pub fn family_name(id: &str) -> String {
    let spaced = id.replace('-', " ");
    let mut name = String::with_capacity(spaced.len());
    let mut word_start = true;
    for ch in spaced.chars() {
        if word_start {
            name.push(ch.to_ascii_uppercase());
        } else {
            name.push(ch);
        }
        word_start = ch == ' ';
    }
    name
}

/// Canonical variant token for a weight/style pair.
///
/// An empty weight counts as `400` and any style other than `italic` counts
/// as normal, so `("", "")`, `("400", "")` and `("400", "normal")` all give
/// `regular`.
pub fn variant_id(weight: &str, style: &str) -> String {
    let regular_weight = weight.is_empty() || weight == "400";
    match (style == "italic", regular_weight) {
        (true, true) => "italic".to_owned(),
        (true, false) => format!("{weight}italic"),
        (false, true) => "regular".to_owned(),
        (false, false) => weight.to_owned(),
    }
}

/// Split a catalog variant token (`regular`, `italic`, `700italic`, `300`)
/// into its weight and style.
pub fn variant_params(token: &str) -> (String, FontStyle) {
    match token {
        "" | "regular" => ("400".to_owned(), FontStyle::Normal),
        "italic" => ("400".to_owned(), FontStyle::Italic),
        _ => match PROVIDER_ITALIC.captures(token) {
            Some(caps) => (caps[1].to_owned(), FontStyle::Italic),
            None => (token.to_owned(), FontStyle::Normal),
        },
    }
}

/// Canonical id of a catalog variant token.
pub fn canonical_variant(token: &str) -> String {
    let (weight, style) = variant_params(token);
    variant_id(&weight, style.as_str())
}
