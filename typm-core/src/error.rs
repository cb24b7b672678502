//! Registry error taxonomy (made by FontLab https://www.fontlab.com/)

use std::path::PathBuf;

use thiserror::Error;

use crate::query::NormalizedQuery;

pub type Result<T, E = FontError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FontError {
    /// The family id is unknown to the registry.
    #[error("font not available: {}", .query.family)]
    FontNotAvailable {
        query: Box<NormalizedQuery>,
        /// Whether the provider catalogs were already merged; when false a
        /// prefetch may still turn this font up.
        distant_loaded: bool,
    },

    #[error("font variant not available: {}", .query)]
    VariantNotAvailable {
        query: Box<NormalizedQuery>,
        available: Vec<String>,
    },

    #[error("subset {subset} is not available for {family}")]
    SubsetNotAvailable {
        family: String,
        subset: String,
        available: Vec<String>,
    },

    #[error("font variant {variant} of {family} is available but not installed")]
    InstallationInconsistent { family: String, variant: String },

    #[error("missing {format} format file for {family} {variant}")]
    MissingFormatFile {
        family: String,
        variant: String,
        format: String,
    },

    #[error("font {family} is local and cannot be installed")]
    LocalFont { family: String },

    #[error("fonts folder not found in {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("provider {provider} failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to fetch {from}: {source}")]
    Fetch {
        from: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to parse the YAML file in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FontError {
    fn title(&self) -> &'static str {
        match self {
            FontError::FontNotAvailable { .. } => "Font not available",
            FontError::VariantNotAvailable { .. } => "Font variant not available",
            FontError::SubsetNotAvailable { .. } => "Subset not available",
            FontError::InstallationInconsistent { .. }
            | FontError::MissingFormatFile { .. }
            | FontError::LocalFont { .. } => "Font Error",
            _ => "Registry Error",
        }
    }

    /// The query this error was raised for, when there is one.
    pub fn query(&self) -> Option<&NormalizedQuery> {
        match self {
            FontError::FontNotAvailable { query, .. }
            | FontError::VariantNotAvailable { query, .. } => Some(query),
            _ => None,
        }
    }

    /// Multi-line, human oriented rendering with the query data and hints.
    pub fn report(&self) -> String {
        let mut out = format!("{} .. {self}", self.title());

        if let Some(query) = self.query() {
            let mut data = vec![format!("F: {}", query.family)];
            if !query.weight.is_empty() {
                data.push(format!("W: {}", query.weight));
            }
            if !query.style.is_empty() {
                data.push(format!("S: {}", query.style));
            }
            data.push(format!("V: {}", query.variant_id));
            out.push_str("\nData: ");
            out.push_str(&data.join(" - "));
        }

        match self {
            FontError::FontNotAvailable {
                distant_loaded: false,
                ..
            } => out.push_str("\nTry to load with prefetch to check online availability"),
            FontError::VariantNotAvailable { available, .. }
            | FontError::SubsetNotAvailable { available, .. }
                if !available.is_empty() =>
            {
                out.push_str("\nAvailable: ");
                out.push_str(&available.join(", "));
            }
            _ => {}
        }

        out
    }
}
