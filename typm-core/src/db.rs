//! The font registry: local index, folder reconciliation and the
//! install/check/get workflow (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::FontsDbConfig;
use crate::convert::{Pyftsubset, WebFontConverter};
use crate::discovery::DirectoryDiscovery;
use crate::error::{FontError, Result};
use crate::fetch::{AssetFetcher, StdFetcher};
use crate::font::{Font, FontFace};
use crate::provider::{FontInfos, FontProvider};
use crate::query::{variant_id, FontQuery, NormalizedQuery};
use crate::record::{FontRecord, VariantRecord};
use crate::store::{read_yaml, write_yaml, INDEX_FILE, META_FILE};
use crate::variant::FontVariant;

/// Registry of fonts stored under one root folder.
///
/// Not synchronized; share it behind a `Mutex` when needed. Changes are
/// persisted by [`FontsDb::save`], which `load` and `install` call on
/// success; end a session with [`FontsDb::close`] or run it through
/// [`FontsDb::session`].
pub struct FontsDb {
    config: FontsDbConfig,
    providers: Vec<Box<dyn FontProvider>>,
    fetcher: Box<dyn AssetFetcher>,
    converter: Box<dyn WebFontConverter>,
    fonts: BTreeMap<String, Font>,
    distant_loaded: bool,
    loaded: bool,
    dirty: bool,
}

impl FontsDb {
    /// A relative root is resolved against the current directory once, here,
    /// so descriptors always carry absolute paths.
    pub fn new(mut config: FontsDbConfig) -> Self {
        if let Ok(root) = std::path::absolute(&config.root) {
            config.root = root;
        }
        let converter = Pyftsubset::new(config.subsetter.clone());
        Self {
            config,
            providers: Vec::new(),
            fetcher: Box::new(StdFetcher),
            converter: Box::new(converter),
            fonts: BTreeMap::new(),
            distant_loaded: false,
            loaded: false,
            dirty: false,
        }
    }

    pub fn with_provider(mut self, provider: impl FontProvider + 'static) -> Self {
        self.add_provider(Box::new(provider));
        self
    }

    /// Providers are consulted in registration order.
    pub fn add_provider(&mut self, provider: Box<dyn FontProvider>) {
        self.providers.push(provider);
    }

    pub fn with_fetcher(mut self, fetcher: impl AssetFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_converter(mut self, converter: impl WebFontConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn config(&self) -> &FontsDbConfig {
        &self.config
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Whether every provider catalog has been merged in.
    pub fn distant_loaded(&self) -> bool {
        self.distant_loaded
    }

    pub fn fonts(&self) -> impl Iterator<Item = &Font> {
        self.fonts.values()
    }

    pub fn font(&self, id: &str) -> Option<&Font> {
        self.fonts.get(id)
    }

    /// Read the index, reconcile it with the font folders and optionally
    /// merge the provider catalogs, then save.
    pub fn load(&mut self, prefetch: bool) -> Result<()> {
        let root = self.config.root().to_path_buf();
        if !root.is_dir() {
            return Err(FontError::RootNotFound(root));
        }

        self.load_index(&root)?;
        self.load_folders(&root)?;
        self.loaded = true;

        if prefetch {
            self.prefetch()?;
        }

        self.save()
    }

    fn load_index(&mut self, root: &Path) -> Result<()> {
        let records: Vec<FontRecord> = read_yaml(&root.join(INDEX_FILE))?.unwrap_or_default();
        debug!(count = records.len(), "index read");
        for record in records {
            create_font(&mut self.fonts, root, record);
        }
        Ok(())
    }

    fn load_folders(&mut self, root: &Path) -> Result<()> {
        for scanned in DirectoryDiscovery::new(root).discover()? {
            let Some(font) = create_font(&mut self.fonts, root, scanned.record) else {
                continue;
            };
            font.set_path(scanned.dir);
            let font_id = font.id().to_owned();

            for found in scanned.variants {
                let mut variant = FontVariant::from_record(&found.record);
                for (ext, name) in found.files {
                    variant.add_file(ext, name);
                }
                variant.set_base_path(font.path());
                variant.set_dir(found.dir);

                let checked =
                    variant.check(&font_id, &self.config.formats, &[], &*self.converter);
                if let Err(err) = &checked {
                    debug!(font = %font_id, variant = %variant.id(), error = %err, "variant folder incomplete");
                }
                font.add_font_variant(variant);
                if checked.is_ok() {
                    font.mark_installed();
                }
            }
        }
        Ok(())
    }

    /// Merge every provider's catalog: new families are added and known ones
    /// gain the variant ids they were missing. Runs once per registry.
    pub fn prefetch(&mut self) -> Result<()> {
        if self.distant_loaded {
            return Ok(());
        }

        let root = self.config.root().to_path_buf();
        for provider in &self.providers {
            let catalog = provider.list().map_err(|source| FontError::Provider {
                provider: provider.name().to_owned(),
                source,
            })?;
            info!(provider = provider.name(), fonts = catalog.len(), "catalog merged");

            for (id, mut record) in catalog {
                if record.id.is_empty() {
                    record.id = id;
                }
                let variants = record.variants.clone();
                if let Some(font) = create_font(&mut self.fonts, &root, record) {
                    for variant in variants {
                        font.add_variant(variant);
                    }
                }
            }
        }

        self.distant_loaded = true;
        self.dirty = true;
        Ok(())
    }

    /// The font is known, lists the variant and declares every subset.
    pub fn is_available(&self, query: impl Into<FontQuery>) -> bool {
        let query = query.into().normalize();
        self.fonts.get(&query.id).is_some_and(|font| {
            font.has_variant(&query.variant_id) && font.supports_subsets(&query.subsets)
        })
    }

    /// Available, materialized and passing the format check.
    pub fn is_installed(&mut self, query: impl Into<FontQuery>) -> bool {
        let query = query.into().normalize();
        self.probe(&query).is_ok()
    }

    /// Whether [`FontsDb::get`] would return a descriptor.
    pub fn has(&mut self, query: impl Into<FontQuery>) -> bool {
        self.is_installed(query)
    }

    pub fn check(&mut self, query: impl Into<FontQuery>) -> Result<()> {
        let query = query.into().normalize();
        self.probe(&query)
    }

    fn probe(&mut self, query: &NormalizedQuery) -> Result<()> {
        let distant_loaded = self.distant_loaded;
        let Some(font) = self.fonts.get_mut(&query.id) else {
            return Err(not_available(query, distant_loaded));
        };

        if !font.has_variant(&query.variant_id) {
            return Err(FontError::VariantNotAvailable {
                query: Box::new(query.clone()),
                available: font.available_variants().to_vec(),
            });
        }
        font.check_subsets(&query.subsets)?;

        let font_id = font.id().to_owned();
        let family = font.family().to_owned();
        let Some(variant) = font.font_variant_mut(&query.variant_id) else {
            return Err(FontError::InstallationInconsistent {
                family,
                variant: query.variant_id.clone(),
            });
        };
        variant.check(
            &font_id,
            &self.config.formats,
            &query.subsets,
            &*self.converter,
        )?;

        if !font.is_installed() {
            font.mark_installed();
            self.dirty = true;
        }
        Ok(())
    }

    /// Make the requested variant available locally, asking the providers
    /// for it when needed. Succeeds without side effects when it already is.
    pub fn install(&mut self, query: impl Into<FontQuery>) -> Result<()> {
        let query = query.into().normalize();
        match self.probe(&query) {
            Ok(()) => return Ok(()),
            Err(err) => debug!(query = %query, error = %err, "not installed yet"),
        }

        match self.fonts.get(&query.id) {
            None if self.distant_loaded => return Err(not_available(&query, true)),
            Some(font) if font.is_local() => {
                return Err(FontError::LocalFont {
                    family: font.family().to_owned(),
                })
            }
            _ => {}
        }

        let Some(infos) = self.lookup(&query) else {
            return Err(not_available(&query, self.distant_loaded));
        };
        if !infos.variant_ids().contains(&query.variant_id) {
            return Err(FontError::VariantNotAvailable {
                query: Box::new(query),
                available: infos.variant_ids().to_vec(),
            });
        }
        let FontInfos {
            font: mut detail,
            variants: mut sources,
        } = infos;
        let Some(source) = sources.remove(&query.variant_id) else {
            return Err(FontError::VariantNotAvailable {
                query: Box::new(query),
                available: detail.variants,
            });
        };

        let root = self.config.root().to_path_buf();
        let provider_variants = std::mem::take(&mut detail.variants);
        detail.id = query.id.clone();
        let Some(font) = create_font(&mut self.fonts, &root, detail) else {
            return Err(not_available(&query, self.distant_loaded));
        };
        for id in provider_variants {
            font.add_variant(id);
        }
        font.check_subsets(&query.subsets)?;

        let font_id = font.id().to_owned();
        let variant_key = if source.id.is_empty() {
            variant_id(&source.weight, &source.style)
        } else {
            source.id.clone()
        };

        let (mut variant, reused) = match font.take_font_variant(&variant_key) {
            Some(existing) => (existing, true),
            None => {
                let mut fresh = FontVariant::from_record(&VariantRecord {
                    id: variant_key.clone(),
                    ..source.clone()
                });
                if fresh.family().is_empty() {
                    fresh.set_family(font.family());
                }
                fresh.set_base_path(font.path());
                (fresh, false)
            }
        };

        let ready = reused
            && variant
                .check(&font_id, &self.config.formats, &query.subsets, &*self.converter)
                .is_ok();
        let outcome = if ready {
            Ok(())
        } else {
            materialize(
                &*self.fetcher,
                &*self.converter,
                &self.config,
                &font_id,
                &mut variant,
                &source,
                &query.subsets,
            )
        };

        font.add_font_variant(variant);
        self.dirty = true;
        outcome?;
        font.mark_installed();

        info!(font = %font_id, variant = %variant_key, "font variant installed");
        self.save()
    }

    /// First provider that knows the family wins; failures count as unknown.
    fn lookup(&self, query: &NormalizedQuery) -> Option<FontInfos> {
        for provider in &self.providers {
            match provider.infos(&query.id, &query.family) {
                Ok(Some(infos)) => {
                    debug!(provider = provider.name(), font = %query.id, "family detail found");
                    return Some(infos);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(provider = provider.name(), font = %query.id, error = %err, "provider lookup failed");
                }
            }
        }
        None
    }

    /// Descriptor of an installed variant, `None` otherwise.
    pub fn get(&mut self, query: impl Into<FontQuery>) -> Option<FontFace> {
        let query = query.into().normalize();
        if self.probe(&query).is_err() {
            return None;
        }
        self.fonts.get(&query.id)?.face(&query.variant_id)
    }

    /// Write `font.yml` for every installed font and variant, then the root
    /// index listing the installed fonts.
    pub fn save(&mut self) -> Result<()> {
        let root = self.config.root();
        let mut index = Vec::new();

        for font in self.fonts.values().filter(|f| f.is_installed()) {
            write_yaml(&font.path().join(META_FILE), &font.to_file_record())?;
            for variant in font.font_variants().filter(|v| v.is_installed()) {
                write_yaml(&variant.path().join(META_FILE), &variant.to_record())?;
            }
            index.push(font.to_record());
        }

        write_yaml(&root.join(INDEX_FILE), &index)?;
        self.dirty = false;
        debug!(fonts = index.len(), root = %root.display(), "registry saved");
        Ok(())
    }

    /// End the session, persisting pending changes.
    pub fn close(mut self) -> Result<()> {
        if self.loaded || self.dirty {
            self.save()?;
        }
        Ok(())
    }

    /// Run `f` and save afterwards, whatever `f` returned. A registry that
    /// never loaded and holds no changes is left untouched on disk.
    pub fn session<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<FontError>,
    {
        let outcome = f(self);
        let saved = if self.loaded || self.dirty {
            self.save()
        } else {
            Ok(())
        };
        let value = outcome?;
        saved?;
        Ok(value)
    }
}

impl Drop for FontsDb {
    fn drop(&mut self) {
        if self.dirty {
            warn!(
                root = %self.config.root().display(),
                "font registry dropped with unsaved changes"
            );
        }
    }
}

/// Insert a family unless one with the same id exists; the existing entry
/// always wins.
fn create_font<'a>(
    fonts: &'a mut BTreeMap<String, Font>,
    root: &Path,
    mut record: FontRecord,
) -> Option<&'a mut Font> {
    record.complete_identity();
    if record.id.is_empty() {
        warn!("skipping a font record without id or family");
        return None;
    }
    Some(
        fonts
            .entry(record.id.clone())
            .or_insert_with(|| Font::from_record(record, root)),
    )
}

/// Copy the configured formats the variant lacks, then run its format check.
fn materialize(
    fetcher: &dyn AssetFetcher,
    converter: &dyn WebFontConverter,
    config: &FontsDbConfig,
    font_id: &str,
    variant: &mut FontVariant,
    source: &VariantRecord,
    subsets: &[String],
) -> Result<()> {
    let dir = variant.path();
    for (ext, from) in &source.files {
        if !config.requires_extension(ext) || variant.has_file(ext) {
            continue;
        }
        let filename = format!("{font_id}-{}.{ext}", variant.id());
        fetcher
            .fetch(from, &dir.join(&filename))
            .map_err(|source| FontError::Fetch {
                from: from.clone(),
                source,
            })?;
        variant.add_file(ext.clone(), filename);
    }
    variant.check(font_id, &config.formats, subsets, converter)
}

fn not_available(query: &NormalizedQuery, distant_loaded: bool) -> FontError {
    FontError::FontNotAvailable {
        query: Box::new(query.clone()),
        distant_loaded,
    }
}
