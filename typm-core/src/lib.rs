//! typm-core: the patient custodian of a local font shelf
//!
//! Think of it as a small lending library for typefaces. You ask for
//! "Roboto, bold, with Greek" in whatever words come to mind; it works out
//! what you meant, looks on its own shelves first and, when the book is
//! missing, orders it from a remote catalog, unpacks it and files it away.
//!
//! ## Four Rooms of the Library
//!
//! **Reading the request**: [`query`] turns `"Montserrat/700italic@latin"`
//! or `("Roboto", 800)` into one canonical family id and variant id.
//!
//! **The shelves**: [`font::Font`] and [`variant::FontVariant`] describe
//! what is known and what is actually on disk; [`store`] and [`discovery`]
//! read and write the YAML index and the per-folder `font.yml` notes.
//!
//! **The catalogs**: [`provider::FontProvider`] is the single question we
//! ask the outside world. Google Fonts and google-webfonts-helper answer it
//! when the `http` feature is on.
//!
//! **The front desk**: [`db::FontsDb`] loads, checks, installs and hands
//! out [`font::FontFace`] descriptors with absolute file paths.
//!
//! ## A Sample Visit
//!
//! ```rust,no_run
//! use typm_core::config::FontsDbConfig;
//! use typm_core::db::FontsDb;
//! use typm_core::gwfh::GwfhProvider;
//! use typm_core::query::FontQuery;
//!
//! let mut db = FontsDb::new(FontsDbConfig::new("public/fonts"))
//!     .with_provider(GwfhProvider::default());
//! db.load(false)?;
//!
//! db.install(FontQuery::new("Roboto").with_weight(700))?;
//! if let Some(face) = db.get("Roboto/700") {
//!     for (format, path) in &face.files {
//!         println!("{format}: {}", path.display());
//!     }
//! }
//!
//! db.close()?;
//! # Ok::<(), typm_core::error::FontError>(())
//! ```
//!
//! ## House Rules
//!
//! - One registry, one writer: wrap it in a `Mutex` to share it.
//! - Sessions end with `close()`; dropping unsaved changes only earns a
//!   warning in the logs.
//! - WOFF and WOFF2 renditions are cut from the TTF by `pyftsubset`.
//!
//! ---
//!
//! Crafted with care at FontLab https://www.fontlab.com/

pub mod config;
pub mod convert;
pub mod db;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod font;
#[cfg(feature = "http")]
pub mod google;
#[cfg(feature = "http")]
pub mod gwfh;
pub mod output;
pub mod provider;
pub mod query;
pub mod record;
pub mod store;
pub mod variant;

pub use config::{FontFormat, FontsDbConfig};
pub use db::FontsDb;
pub use error::{FontError, Result};
pub use font::{Font, FontFace};
pub use query::{normalize, FontQuery, NormalizedQuery};
