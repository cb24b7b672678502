//! Font variants and their on-disk renditions (made by FontLab https://www.fontlab.com/)

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::FontFormat;
use crate::convert::{unicode_range, WebFontConverter};
use crate::error::{FontError, Result};
use crate::record::VariantRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

impl FontStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        }
    }

    /// Anything but `italic` (including an empty string) is normal.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("italic") {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        }
    }
}

impl fmt::Display for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weight/style of a family, owned by its [`Font`](crate::font::Font).
#[derive(Debug, Clone, Default)]
pub struct FontVariant {
    id: String,
    family: String,
    style: FontStyle,
    weight: String,
    display: String,
    installed: bool,
    base_path: PathBuf,
    dir: Option<PathBuf>,
    files: BTreeMap<String, String>,
}

impl FontVariant {
    /// Build from a record; remote `files` in the record are not local files
    /// and are ignored here.
    pub fn from_record(record: &VariantRecord) -> Self {
        Self {
            id: record.id.clone(),
            family: record.family.clone(),
            style: FontStyle::parse(&record.style),
            weight: record.weight.clone(),
            display: record.display.clone(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn weight(&self) -> &str {
        &self.weight
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Folder holding this variant's files: the folder it was found in, or
    /// `<fontPath>/<variantId>` for a fresh one.
    pub fn path(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.clone(),
            None => self.base_path.join(&self.id),
        }
    }

    pub(crate) fn set_base_path(&mut self, font_path: &Path) {
        self.base_path = font_path.to_path_buf();
    }

    /// Pin the variant to an existing folder, whatever its name.
    pub(crate) fn set_dir(&mut self, dir: PathBuf) {
        self.dir = Some(dir);
    }

    pub(crate) fn set_family(&mut self, family: &str) {
        self.family = family.to_owned();
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn file(&self, ext: &str) -> Option<&str> {
        self.files.get(ext).map(String::as_str)
    }

    pub fn has_file(&self, ext: &str) -> bool {
        self.files.contains_key(ext)
    }

    pub fn add_file(&mut self, ext: impl Into<String>, filename: impl Into<String>) {
        self.files.insert(ext.into(), filename.into());
    }

    /// Absolute path of every recorded rendition, keyed by extension.
    pub fn file_paths(&self) -> BTreeMap<String, PathBuf> {
        let dir = self.path();
        self.files
            .iter()
            .map(|(ext, name)| (ext.clone(), dir.join(name)))
            .collect()
    }

    /// Verify the variant owns every required rendition, deriving missing
    /// WOFF/WOFF2 files from the TTF on the way, and mark it installed.
    ///
    /// A converter failure is not an error by itself: only the presence of
    /// the produced file counts.
    pub fn check(
        &mut self,
        font_id: &str,
        formats: &[FontFormat],
        subsets: &[String],
        converter: &dyn WebFontConverter,
    ) -> Result<()> {
        let Some(ttf) = self.file("ttf") else {
            return Err(self.missing(FontFormat::Ttf));
        };

        let dir = self.path();
        let ttf_path = dir.join(ttf);
        let stem = format!("{font_id}-{}", self.id);

        for flavor in [FontFormat::Woff, FontFormat::Woff2] {
            if self.has_file(flavor.extension()) || !formats.contains(&flavor) {
                continue;
            }

            let filename = format!("{stem}.{flavor}");
            let target = dir.join(&filename);
            debug!(variant = %self.id, %flavor, "generating web font from TTF");

            if let Err(err) = converter.convert(&ttf_path, &target, &unicode_range(subsets), flavor)
            {
                warn!(target = %target.display(), error = %err, "web font conversion failed");
            }

            if target.is_file() {
                self.add_file(flavor.extension(), filename);
            }
        }

        if let Some(format) = formats.iter().find(|f| !self.has_file(f.extension())) {
            return Err(self.missing(*format));
        }

        self.installed = true;
        Ok(())
    }

    fn missing(&self, format: FontFormat) -> FontError {
        FontError::MissingFormatFile {
            family: self.family.clone(),
            variant: self.id.clone(),
            format: format.to_string(),
        }
    }

    /// Record written to `<variant folder>/font.yml`.
    pub fn to_record(&self) -> VariantRecord {
        VariantRecord {
            id: self.id.clone(),
            family: self.family.clone(),
            style: self.style.to_string(),
            weight: self.weight.clone(),
            display: self.display.clone(),
            files: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::WebFontConverter;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingConverter {
        calls: Mutex<Vec<(FontFormat, String)>>,
        produce: bool,
    }

    impl WebFontConverter for RecordingConverter {
        fn convert(
            &self,
            ttf: &Path,
            target: &Path,
            unicodes: &str,
            flavor: FontFormat,
        ) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push((flavor, unicodes.to_owned()));
            if self.produce {
                fs::copy(ttf, target)?;
            }
            Ok(())
        }
    }

    fn variant_in(dir: &Path) -> FontVariant {
        let mut variant = FontVariant::from_record(&VariantRecord {
            id: "700".into(),
            family: "Roboto".into(),
            weight: "700".into(),
            ..VariantRecord::default()
        });
        variant.set_base_path(dir);
        fs::create_dir_all(variant.path()).unwrap();
        variant
    }

    #[test]
    fn check_requires_a_ttf() {
        let tmp = tempdir().unwrap();
        let mut variant = variant_in(tmp.path());
        let converter = RecordingConverter::default();

        let err = variant
            .check("roboto", &[FontFormat::Ttf], &[], &converter)
            .unwrap_err();
        assert!(matches!(err, FontError::MissingFormatFile { ref format, .. } if format == "ttf"));
        assert!(!variant.is_installed());
    }

    #[test]
    fn check_generates_missing_web_fonts_from_ttf() {
        let tmp = tempdir().unwrap();
        let mut variant = variant_in(tmp.path());
        fs::write(variant.path().join("roboto-700.ttf"), b"ttf").unwrap();
        variant.add_file("ttf", "roboto-700.ttf");

        let converter = RecordingConverter {
            produce: true,
            ..RecordingConverter::default()
        };
        let formats = [FontFormat::Ttf, FontFormat::Woff2, FontFormat::Woff];
        variant
            .check("roboto", &formats, &["greek".to_string()], &converter)
            .expect("check");

        assert!(variant.is_installed());
        assert_eq!(variant.file("woff"), Some("roboto-700.woff"));
        assert_eq!(variant.file("woff2"), Some("roboto-700.woff2"));
        let calls = converter.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "U+0370-03FF");
    }

    #[test]
    fn check_fails_when_conversion_produces_nothing() {
        let tmp = tempdir().unwrap();
        let mut variant = variant_in(tmp.path());
        fs::write(variant.path().join("roboto-700.ttf"), b"ttf").unwrap();
        variant.add_file("ttf", "roboto-700.ttf");

        let converter = RecordingConverter::default();
        let err = variant
            .check("roboto", &[FontFormat::Ttf, FontFormat::Woff2], &[], &converter)
            .unwrap_err();

        assert!(matches!(err, FontError::MissingFormatFile { ref format, .. } if format == "woff2"));
        assert!(!variant.has_file("woff2"));
        assert!(!variant.is_installed());
    }

    #[test]
    fn unconfigured_formats_are_not_generated() {
        let tmp = tempdir().unwrap();
        let mut variant = variant_in(tmp.path());
        variant.add_file("ttf", "roboto-700.ttf");

        let converter = RecordingConverter::default();
        variant
            .check("roboto", &[FontFormat::Ttf], &[], &converter)
            .expect("ttf only");
        assert!(converter.calls.lock().unwrap().is_empty());
        assert!(variant.is_installed());
    }
}
