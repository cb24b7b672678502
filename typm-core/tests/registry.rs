/// Walking a registry through its whole life: empty shelf, first install,
/// repeat visits, refusals and a fresh start from what was saved to disk.
///
/// Providers here are in-memory catalogs pointing at files in a temporary
/// "CDN" folder, and the converter simply copies the TTF, so nothing leaves
/// the machine and no external tool is needed.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use typm_core::config::{FontFormat, FontsDbConfig};
use typm_core::convert::WebFontConverter;
use typm_core::db::FontsDb;
use typm_core::error::FontError;
use typm_core::provider::{FontInfos, FontProvider, StaticProvider};
use typm_core::query::FontQuery;
use typm_core::record::FontRecord;
use typm_core::variant::FontStyle;

struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
    cdn: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("fonts");
    let cdn = tmp.path().join("cdn");
    fs::create_dir_all(&root).unwrap();
    fs::create_dir_all(&cdn).unwrap();
    for name in ["regular", "italic", "700"] {
        fs::write(cdn.join(format!("roboto-{name}.ttf")), format!("ttf {name}")).unwrap();
    }
    Fixture {
        _tmp: tmp,
        root,
        cdn,
    }
}

fn source(cdn: &Path, name: &str) -> String {
    cdn.join(format!("roboto-{name}.ttf"))
        .to_string_lossy()
        .into_owned()
}

fn roboto(cdn: &Path) -> FontInfos {
    FontInfos::new(
        FontRecord::new("Roboto")
            .with_category("sans-serif")
            .with_version("v30")
            .with_subsets(["latin", "greek"]),
    )
    .with_variant("regular", [("ttf", source(cdn, "regular"))])
    .with_variant("italic", [("ttf", source(cdn, "italic"))])
    .with_variant("700", [("ttf", source(cdn, "700"))])
}

/// Copies the TTF into place, like a subsetter keeping every glyph.
#[derive(Clone, Default)]
struct CopyConverter {
    calls: Arc<AtomicUsize>,
    produce: bool,
}

impl CopyConverter {
    fn working() -> Self {
        Self {
            produce: true,
            ..Self::default()
        }
    }
}

impl WebFontConverter for CopyConverter {
    fn convert(
        &self,
        ttf: &Path,
        target: &Path,
        _unicodes: &str,
        _flavor: FontFormat,
    ) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.produce {
            fs::copy(ttf, target)?;
        }
        Ok(())
    }
}

/// Counts detail lookups.
struct CountingProvider {
    inner: StaticProvider,
    lookups: Arc<AtomicUsize>,
}

impl FontProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn list(&self) -> anyhow::Result<BTreeMap<String, FontRecord>> {
        self.inner.list()
    }

    fn infos(&self, id: &str, family: &str) -> anyhow::Result<Option<FontInfos>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.infos(id, family)
    }
}

fn registry(fx: &Fixture, converter: CopyConverter) -> FontsDb {
    FontsDb::new(FontsDbConfig::new(&fx.root))
        .with_provider(StaticProvider::new("fixture").with_font(roboto(&fx.cdn)))
        .with_converter(converter)
}

#[test]
fn installs_a_variant_and_refuses_unknown_weights() {
    let fx = fixture();
    let mut db = registry(&fx, CopyConverter::working());
    db.load(false).unwrap();

    db.install(FontQuery::new("Roboto").with_weight("700"))
        .expect("install 700");

    let face = db
        .get(FontQuery::new("Roboto").with_weight(700))
        .expect("descriptor");
    assert_eq!(face.weight, "700");
    assert_eq!(face.style, FontStyle::Normal);
    assert_eq!(face.family, "Roboto");
    assert_eq!(face.version, "v30");
    for ext in ["ttf", "woff", "woff2"] {
        let path = &face.files[ext];
        assert!(path.is_file(), "{ext} missing at {}", path.display());
        assert_eq!(path.file_name().unwrap(), format!("roboto-700.{ext}").as_str());
    }

    let err = db
        .install(FontQuery::new("Roboto").with_weight("800"))
        .unwrap_err();
    match err {
        FontError::VariantNotAvailable { available, .. } => {
            assert_eq!(available, vec!["regular", "italic", "700"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    db.close().unwrap();
}

#[test]
fn check_after_install_has_no_side_effects() {
    let fx = fixture();
    let converter = CopyConverter::working();
    let calls = Arc::clone(&converter.calls);
    let mut db = registry(&fx, converter);
    db.load(false).unwrap();

    db.install("Roboto/italic").unwrap();
    let after_install = calls.load(Ordering::SeqCst);
    assert_eq!(after_install, 2);

    db.check("Roboto/italic").expect("installed");
    db.install("Roboto/italic").expect("already installed");
    assert_eq!(calls.load(Ordering::SeqCst), after_install);
    assert!(db.has("roboto/italic"));
}

#[test]
fn relative_root_yields_absolute_descriptor_paths() {
    let fx = fixture();
    let shelf = tempfile::Builder::new()
        .prefix("relative-root-")
        .tempdir_in(env!("CARGO_MANIFEST_DIR"))
        .unwrap();
    let relative = PathBuf::from(shelf.path().file_name().unwrap());
    assert!(relative.is_relative());

    let mut db = FontsDb::new(FontsDbConfig::new(&relative))
        .with_provider(StaticProvider::new("fixture").with_font(roboto(&fx.cdn)))
        .with_converter(CopyConverter::working());
    assert!(db.config().root().is_absolute());
    db.load(false).unwrap();
    db.install("Roboto/700").unwrap();

    let face = db.get("Roboto/700").expect("descriptor");
    for path in face.files.values() {
        assert!(path.is_absolute(), "{}", path.display());
        assert!(path.is_file(), "{}", path.display());
    }
    db.close().unwrap();
}

#[test]
fn folders_keep_their_own_names() {
    let fx = fixture();
    let shelf = fx.root.join("lato-files");
    fs::create_dir_all(shelf.join("a")).unwrap();
    fs::write(shelf.join("font.yml"), "id: lato\nfamily: Lato\nlocal: true\n").unwrap();
    fs::write(shelf.join("a/font.yml"), "weight: 300\nstyle: italic\n").unwrap();
    fs::write(shelf.join("a/lato-300italic.ttf"), "ttf").unwrap();

    let mut db = FontsDb::new(FontsDbConfig::new(&fx.root).with_formats([FontFormat::Ttf]));
    db.load(false).unwrap();

    let face = db.get("Lato/300italic").expect("descriptor");
    assert_eq!(face.files["ttf"], shelf.join("a/lato-300italic.ttf"));
    assert!(face.files["ttf"].is_file());
    db.close().unwrap();

    assert!(!fx.root.join("lato").exists());
    assert!(!shelf.join("300italic").exists());
    assert!(shelf.join("a/font.yml").is_file());

    let mut reopened = FontsDb::new(FontsDbConfig::new(&fx.root).with_formats([FontFormat::Ttf]));
    reopened.load(false).unwrap();
    assert_eq!(reopened.get("Lato/300italic"), Some(face));
}

#[test]
fn local_fonts_are_never_looked_up() {
    let fx = fixture();
    fs::create_dir_all(fx.root.join("house-serif")).unwrap();
    fs::write(
        fx.root.join("house-serif/font.yml"),
        "id: house-serif\nfamily: House Serif\nlocal: true\n",
    )
    .unwrap();

    let lookups = Arc::new(AtomicUsize::new(0));
    let mut db = FontsDb::new(FontsDbConfig::new(&fx.root)).with_provider(CountingProvider {
        inner: StaticProvider::new("fixture"),
        lookups: Arc::clone(&lookups),
    });
    db.load(false).unwrap();

    let err = db.install("House Serif/700").unwrap_err();
    assert!(matches!(err, FontError::LocalFont { .. }));
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn unknown_family_is_looked_up_once() {
    let fx = fixture();
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut db = FontsDb::new(FontsDbConfig::new(&fx.root)).with_provider(CountingProvider {
        inner: StaticProvider::new("fixture").with_font(roboto(&fx.cdn)),
        lookups: Arc::clone(&lookups),
    });
    db.load(false).unwrap();

    let err = db.check("Toto Font").unwrap_err();
    assert!(matches!(
        err,
        FontError::FontNotAvailable {
            distant_loaded: false,
            ..
        }
    ));
    assert!(err.report().contains("prefetch"));

    for query in ["Toto Font/700@cyrillic", "Toto Font@latin"] {
        assert!(matches!(
            db.check(query),
            Err(FontError::FontNotAvailable { .. })
        ));
    }

    let err = db.install("Toto Font").unwrap_err();
    assert!(matches!(err, FontError::FontNotAvailable { .. }));
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
    assert!(db.font("toto-font").is_none());
}

#[test]
fn subsets_must_be_declared_by_the_family() {
    let fx = fixture();
    let mut db = registry(&fx, CopyConverter::working());
    db.load(false).unwrap();

    let err = db.install("Roboto/700@cyrillic").unwrap_err();
    assert!(matches!(err, FontError::SubsetNotAvailable { ref subset, .. } if subset == "cyrillic"));
    assert!(!fx.root.join("roboto/700/roboto-700.ttf").exists());

    db.install("Roboto/700@latin,greek").unwrap();
    assert!(db.is_available("Roboto/700@latin"));
    assert!(db.is_available("Roboto/700"));
    assert!(!db.is_available("Roboto/700@cyrillic"));
    assert!(matches!(
        db.check("Roboto/700@cyrillic"),
        Err(FontError::SubsetNotAvailable { .. })
    ));
    assert!(db.get("Roboto/700@cyrillic").is_none());
}

#[test]
fn known_but_not_materialized_variant_is_inconsistent() {
    let fx = fixture();
    let mut db = registry(&fx, CopyConverter::working());
    db.load(true).unwrap();

    assert!(db.is_available("Roboto"));
    assert!(!db.is_installed("Roboto"));
    assert!(matches!(
        db.check("Roboto"),
        Err(FontError::InstallationInconsistent { .. })
    ));
}

#[test]
fn missing_web_fonts_fail_the_install() {
    let fx = fixture();
    let mut db = registry(&fx, CopyConverter::default());
    db.load(false).unwrap();

    let err = db.install("Roboto/700").unwrap_err();
    assert!(matches!(err, FontError::MissingFormatFile { ref format, .. } if format == "woff2"));
    assert!(fx.root.join("roboto/700/roboto-700.ttf").is_file());
    assert!(!db.has("Roboto/700"));
    assert!(db.get("Roboto/700").is_none());
}

#[test]
fn saved_registry_reloads_without_providers() {
    let fx = fixture();
    let mut db = registry(&fx, CopyConverter::working());
    db.load(false).unwrap();
    db.install("Roboto/700").unwrap();
    db.install("Roboto/regular").unwrap();
    let before = db.get("Roboto/700").unwrap();
    db.close().unwrap();

    let index = fs::read_to_string(fx.root.join("fonts.yml")).unwrap();
    assert!(index.contains("id: roboto"));
    assert!(index.contains("family: Roboto"));

    let mut reopened = FontsDb::new(
        FontsDbConfig::new(&fx.root).with_formats([FontFormat::Ttf, FontFormat::Woff2, FontFormat::Woff]),
    )
    .with_converter(CopyConverter::default());
    reopened.load(false).unwrap();

    let roboto = reopened.font("roboto").expect("roboto reloaded");
    assert!(roboto.is_installed());
    assert_eq!(roboto.installed_variants(), vec!["700", "regular"]);
    assert_eq!(roboto.subsets(), ["latin", "greek"]);
    assert_eq!(reopened.get("Roboto/700"), Some(before));
    assert!(reopened.has("Roboto"));
    assert!(!reopened.has("Roboto/italic"));
    reopened.close().unwrap();
}

#[test]
fn session_saves_whatever_the_outcome() {
    let fx = fixture();
    let mut db = registry(&fx, CopyConverter::working());

    let result: Result<(), FontError> = db.session(|db| {
        db.load(false)?;
        db.install("Roboto/700")?;
        db.install("Roboto/900")
    });

    assert!(matches!(result, Err(FontError::VariantNotAvailable { .. })));
    assert!(fx.root.join("fonts.yml").is_file());
    assert!(fx.root.join("roboto/700/font.yml").is_file());
}
