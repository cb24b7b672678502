//! PyO3 bindings for typm-core (made by FontLab https://www.fontlab.com/)

use std::path::PathBuf;
use std::sync::Mutex;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};
use typm_core::config::{parse_format_list, FontsDbConfig};
use typm_core::db::FontsDb;
use typm_core::error::FontError;
use typm_core::font::{FontFace, FontSummary};
use typm_core::query::{FontQuery, NormalizedQuery};

/// Weights come in as `700` or `"700italic"` / `"bold"`.
#[derive(Clone, Debug, FromPyObject)]
enum WeightArg {
    Number(u32),
    Text(String),
}

impl WeightArg {
    fn into_string(self) -> String {
        match self {
            WeightArg::Number(n) => n.to_string(),
            WeightArg::Text(s) => s,
        }
    }
}

fn build_query(
    family: &str,
    weight: Option<WeightArg>,
    style: Option<String>,
    subsets: Option<Vec<String>>,
) -> FontQuery {
    let mut query = FontQuery::new(family);
    if let Some(weight) = weight {
        query = query.with_weight(weight.into_string());
    }
    if let Some(style) = style {
        query = query.with_style(style);
    }
    if let Some(subsets) = subsets {
        query = query.with_subsets(subsets);
    }
    query
}

/// A font registry rooted at a folder. Closing it (or leaving a `with`
/// block) writes the index back to disk.
#[pyclass(name = "FontsDb", module = "typm")]
struct PyFontsDb {
    inner: Mutex<Option<FontsDb>>,
}

impl PyFontsDb {
    fn with_db<T>(&self, f: impl FnOnce(&mut FontsDb) -> Result<T, FontError>) -> PyResult<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| PyRuntimeError::new_err("font registry lock poisoned"))?;
        let db = guard
            .as_mut()
            .ok_or_else(|| PyValueError::new_err("font registry is closed"))?;
        f(db).map_err(to_py_err)
    }
}

#[pymethods]
impl PyFontsDb {
    #[new]
    #[pyo3(signature = (root, formats=None, subsetter=None, google_api_key=None, gwfh=true))]
    fn new(
        root: PathBuf,
        formats: Option<Vec<String>>,
        subsetter: Option<PathBuf>,
        google_api_key: Option<String>,
        gwfh: bool,
    ) -> PyResult<Self> {
        let mut config = FontsDbConfig::new(root);
        if let Some(formats) = formats {
            let parsed =
                parse_format_list(&formats).map_err(|e| PyValueError::new_err(e.to_string()))?;
            config = config.with_formats(parsed);
        }
        if let Some(program) = subsetter {
            config = config.with_subsetter(program);
        }

        let mut db = FontsDb::new(config);
        register_providers(&mut db, google_api_key, gwfh);
        Ok(Self {
            inner: Mutex::new(Some(db)),
        })
    }

    /// Read the index and the font folders, optionally merging every
    /// provider catalog.
    #[pyo3(signature = (prefetch=false))]
    fn load(&self, py: Python<'_>, prefetch: bool) -> PyResult<()> {
        py.detach(|| self.with_db(|db| db.load(prefetch)))
    }

    #[pyo3(signature = (family, weight=None, style=None, subsets=None))]
    fn check(
        &self,
        py: Python<'_>,
        family: &str,
        weight: Option<WeightArg>,
        style: Option<String>,
        subsets: Option<Vec<String>>,
    ) -> PyResult<()> {
        let query = build_query(family, weight, style, subsets);
        py.detach(|| self.with_db(|db| db.check(query)))
    }

    /// Install a variant and return its descriptor.
    #[pyo3(signature = (family, weight=None, style=None, subsets=None))]
    fn install(
        &self,
        py: Python<'_>,
        family: &str,
        weight: Option<WeightArg>,
        style: Option<String>,
        subsets: Option<Vec<String>>,
    ) -> PyResult<Option<Py<PyAny>>> {
        let query = build_query(family, weight, style, subsets);
        let face = py.detach(|| {
            self.with_db(|db| {
                db.install(&query)?;
                Ok(db.get(&query))
            })
        })?;
        face.map(|face| face_to_dict(py, &face)).transpose()
    }

    #[pyo3(signature = (family, weight=None, style=None, subsets=None))]
    fn get(
        &self,
        py: Python<'_>,
        family: &str,
        weight: Option<WeightArg>,
        style: Option<String>,
        subsets: Option<Vec<String>>,
    ) -> PyResult<Option<Py<PyAny>>> {
        let query = build_query(family, weight, style, subsets);
        let face = self.with_db(|db| Ok(db.get(query)))?;
        face.map(|face| face_to_dict(py, &face)).transpose()
    }

    #[pyo3(signature = (family, weight=None, style=None, subsets=None))]
    fn is_available(
        &self,
        family: &str,
        weight: Option<WeightArg>,
        style: Option<String>,
        subsets: Option<Vec<String>>,
    ) -> PyResult<bool> {
        let query = build_query(family, weight, style, subsets);
        self.with_db(|db| Ok(db.is_available(query)))
    }

    #[pyo3(signature = (family, weight=None, style=None, subsets=None))]
    fn is_installed(
        &self,
        family: &str,
        weight: Option<WeightArg>,
        style: Option<String>,
        subsets: Option<Vec<String>>,
    ) -> PyResult<bool> {
        let query = build_query(family, weight, style, subsets);
        self.with_db(|db| Ok(db.is_installed(query)))
    }

    /// Summaries of the installed fonts, or of every known font with `all`.
    #[pyo3(signature = (all=false))]
    fn fonts(&self, py: Python<'_>, all: bool) -> PyResult<Vec<Py<PyAny>>> {
        let summaries: Vec<FontSummary> = self.with_db(|db| {
            Ok(db
                .fonts()
                .filter(|font| all || font.is_installed())
                .map(|font| font.summary())
                .collect())
        })?;
        summaries
            .iter()
            .map(|summary| summary_to_dict(py, summary))
            .collect()
    }

    /// Summaries of the installed fonts.
    fn installed(&self, py: Python<'_>) -> PyResult<Vec<Py<PyAny>>> {
        self.fonts(py, false)
    }

    fn save(&self) -> PyResult<()> {
        self.with_db(|db| db.save())
    }

    /// Save and release the registry; later calls raise `ValueError`.
    fn close(&self) -> PyResult<()> {
        let db = self
            .inner
            .lock()
            .map_err(|_| PyRuntimeError::new_err("font registry lock poisoned"))?
            .take();
        match db {
            Some(db) => db.close().map_err(to_py_err),
            None => Ok(()),
        }
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    #[pyo3(signature = (*_args))]
    fn __exit__(&self, _args: &Bound<'_, PyTuple>) -> PyResult<bool> {
        self.close()?;
        Ok(false)
    }
}

#[cfg(feature = "http")]
fn register_providers(db: &mut FontsDb, google_api_key: Option<String>, gwfh: bool) {
    use typm_core::google::GoogleFontsProvider;
    use typm_core::gwfh::GwfhProvider;

    if let Some(key) = google_api_key.filter(|k| !k.is_empty()) {
        db.add_provider(Box::new(GoogleFontsProvider::new(key)));
    }
    if gwfh {
        db.add_provider(Box::new(GwfhProvider::default()));
    }
}

#[cfg(not(feature = "http"))]
fn register_providers(_db: &mut FontsDb, _google_api_key: Option<String>, _gwfh: bool) {}

#[pyfunction]
#[pyo3(name = "normalize", signature = (family, weight=None, style=None, subsets=None))]
fn normalize_py(
    py: Python<'_>,
    family: &str,
    weight: Option<WeightArg>,
    style: Option<String>,
    subsets: Option<Vec<String>>,
) -> PyResult<Py<PyAny>> {
    let normalized = build_query(family, weight, style, subsets).normalize();
    query_to_dict(py, &normalized)
}

fn query_to_dict(py: Python<'_>, query: &NormalizedQuery) -> PyResult<Py<PyAny>> {
    let dict = PyDict::new(py);
    dict.set_item("family", &query.family)?;
    dict.set_item("id", &query.id)?;
    dict.set_item("weight", &query.weight)?;
    dict.set_item("style", &query.style)?;
    dict.set_item("variant", &query.variant_id)?;
    dict.set_item("subsets", query.subsets.clone())?;
    Ok(dict.into_any().unbind())
}

fn face_to_dict(py: Python<'_>, face: &FontFace) -> PyResult<Py<PyAny>> {
    let files = PyDict::new(py);
    for (format, path) in &face.files {
        files.set_item(format, path.to_string_lossy().to_string())?;
    }

    let dict = PyDict::new(py);
    dict.set_item("id", &face.id)?;
    dict.set_item("variant", &face.variant)?;
    dict.set_item("family", &face.family)?;
    dict.set_item("style", face.style.as_str())?;
    dict.set_item("weight", &face.weight)?;
    dict.set_item("display", &face.display)?;
    dict.set_item("version", &face.version)?;
    dict.set_item("local", face.local)?;
    dict.set_item("files", files)?;
    Ok(dict.into_any().unbind())
}

fn summary_to_dict(py: Python<'_>, summary: &FontSummary) -> PyResult<Py<PyAny>> {
    let dict = PyDict::new(py);
    dict.set_item("id", &summary.id)?;
    dict.set_item("family", &summary.family)?;
    dict.set_item("category", &summary.category)?;
    dict.set_item("version", &summary.version)?;
    dict.set_item("local", summary.local)?;
    dict.set_item("installed", summary.installed)?;
    dict.set_item("variants", summary.variants.clone())?;
    dict.set_item("installed_variants", summary.installed_variants.clone())?;
    dict.set_item("subsets", summary.subsets.clone())?;
    Ok(dict.into_any().unbind())
}

fn to_py_err(err: FontError) -> PyErr {
    PyValueError::new_err(err.report())
}

#[pymodule]
#[pyo3(name = "_typm_python")]
fn typm_python(_py: Python<'_>, m: &Bound<PyModule>) -> PyResult<()> {
    m.add_class::<PyFontsDb>()?;
    m.add_function(wrap_pyfunction!(normalize_py, m)?)?;
    Ok(())
}
