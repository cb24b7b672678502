//! HTTP server for typm, the registry's front desk (made by FontLab https://www.fontlab.com/)
//!
//! One registry, shared by every request behind a mutex. Each request runs
//! on the blocking pool since installs touch the disk, the network and the
//! subsetter.

use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task;
use tracing::{info, warn};
use typm_core::db::FontsDb;
use typm_core::error::FontError;
use typm_core::font::FontFace;
use typm_core::query::{FontQuery, NormalizedQuery};

pub type SharedDb = Arc<Mutex<FontsDb>>;

type ApiError = (StatusCode, String);

/// A font request, as JSON.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    /// Family, optionally with inline weight and subsets (`Roboto/700@latin`)
    pub family: String,
    /// `700`, `"700"`, `"bold"`, `"700italic"`...
    pub weight: Option<Weight>,
    pub style: Option<String>,
    pub subsets: Option<Vec<String>>,
}

/// Weights arrive as JSON numbers or strings.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Weight {
    Number(u64),
    Text(String),
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Number(n) => write!(f, "{n}"),
            Weight::Text(s) => f.write_str(s),
        }
    }
}

impl QueryRequest {
    fn to_query(&self) -> Result<FontQuery, ApiError> {
        if self.family.trim().is_empty() {
            return Err((StatusCode::BAD_REQUEST, "family is required".to_string()));
        }
        let mut query = FontQuery::new(self.family.as_str());
        if let Some(weight) = &self.weight {
            query = query.with_weight(weight);
        }
        if let Some(style) = &self.style {
            query = query.with_style(style.as_str());
        }
        if let Some(subsets) = &self.subsets {
            query = query.with_subsets(subsets.iter().cloned());
        }
        Ok(query)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub ok: bool,
    pub query: NormalizedQuery,
}

pub fn shared(db: FontsDb) -> SharedDb {
    Arc::new(Mutex::new(db))
}

/// Listen on `bind` until Ctrl-C.
pub async fn serve(bind: &str, db: SharedDb) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding HTTP server to {bind}"))?;
    info!(%bind, "serving font registry");

    axum::serve(listener, router(db))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for shutdown signal");
    }
}

/// Save and release the registry once the server is done with it.
pub fn close(db: SharedDb) -> Result<()> {
    match Arc::try_unwrap(db) {
        Ok(mutex) => {
            let db = mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
            db.close()?;
        }
        Err(shared) => {
            let mut db = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            db.save()?;
        }
    }
    Ok(())
}

pub fn router(db: SharedDb) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/check", post(check_handler))
        .route("/install", post(install_handler))
        .route("/get", post(get_handler))
        .with_state(db)
}

async fn check_handler(
    State(db): State<SharedDb>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let query = req.to_query()?;
    let normalized = query.normalize();
    with_db(db, move |db| db.check(&query)).await?;
    Ok(Json(CheckResponse {
        ok: true,
        query: normalized,
    }))
}

async fn install_handler(
    State(db): State<SharedDb>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<FontFace>, ApiError> {
    let query = req.to_query()?;
    let face = with_db(db, move |db| {
        db.install(&query)?;
        Ok(db.get(&query))
    })
    .await?;
    face.map(Json).ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "installed variant could not be read back".to_string(),
        )
    })
}

async fn get_handler(
    State(db): State<SharedDb>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<FontFace>, ApiError> {
    let query = req.to_query()?;
    let normalized = query.normalize();
    let face = with_db(db, move |db| Ok(db.get(&query))).await?;
    face.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("font variant not installed: {normalized}"),
        )
    })
}

/// Run `f` on the blocking pool with the registry locked.
async fn with_db<T, F>(db: SharedDb, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut FontsDb) -> Result<T, FontError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(move || {
        let mut guard = db.lock().map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "font registry lock poisoned".to_string(),
            )
        })?;
        f(&mut guard).map_err(to_response)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {e}"),
        )
    })?
}

fn status_for(err: &FontError) -> StatusCode {
    match err {
        FontError::FontNotAvailable { .. }
        | FontError::VariantNotAvailable { .. }
        | FontError::SubsetNotAvailable { .. } => StatusCode::NOT_FOUND,
        FontError::LocalFont { .. }
        | FontError::InstallationInconsistent { .. }
        | FontError::MissingFormatFile { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn to_response(err: FontError) -> ApiError {
    (status_for(&err), err.report())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use tower::util::ServiceExt;
    use typm_core::config::{FontFormat, FontsDbConfig};
    use typm_core::provider::{FontInfos, StaticProvider};
    use typm_core::record::FontRecord;

    /// A TTF-only registry with one remote family, Lato, in regular and 700.
    fn fixture() -> (TempDir, SharedDb) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("fonts");
        let cdn = tmp.path().join("cdn");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&cdn).unwrap();
        let mut infos = FontInfos::new(FontRecord::new("Lato").with_subsets(["latin"]));
        for token in ["regular", "700"] {
            let file = cdn.join(format!("lato-{token}.ttf"));
            fs::write(&file, token).unwrap();
            infos = infos.with_variant(token, [("ttf", file.to_string_lossy().into_owned())]);
        }

        let mut db = FontsDb::new(FontsDbConfig::new(&root).with_formats([FontFormat::Ttf]))
            .with_provider(StaticProvider::new("fixture").with_font(infos));
        db.load(false).unwrap();
        (tmp, shared(db))
    }

    async fn post_json(app: Router, path: &str, payload: serde_json::Value) -> (StatusCode, Vec<u8>) {
        let request = Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (_tmp, db) = fixture();
        let request = Request::get("/health").body(Body::empty()).unwrap();

        let response = router(db).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn install_then_get_returns_the_descriptor() {
        let (_tmp, db) = fixture();

        let (status, body) = post_json(
            router(db.clone()),
            "/install",
            json!({"family": "Lato", "weight": 700}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
        let face: FontFace = serde_json::from_slice(&body).expect("descriptor");
        assert_eq!(face.variant, "700");
        assert!(face.files["ttf"].is_file());

        let (status, body) = post_json(router(db.clone()), "/get", json!({"family": "lato/700"})).await;
        assert_eq!(status, StatusCode::OK);
        let again: FontFace = serde_json::from_slice(&body).unwrap();
        assert_eq!(again, face);

        let (status, body) = post_json(router(db), "/check", json!({"family": "Lato", "weight": "bold"})).await;
        assert_eq!(status, StatusCode::OK);
        let check: CheckResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(check.query.variant_id, "700");
    }

    #[tokio::test]
    async fn missing_fonts_and_variants_are_not_found() {
        let (_tmp, db) = fixture();

        let (status, body) = post_json(router(db.clone()), "/check", json!({"family": "Nope"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8_lossy(&body).starts_with("Font not available"));

        let (status, body) = post_json(router(db.clone()), "/install", json!({"family": "Lato/300"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8_lossy(&body).contains("Available: regular, 700"));

        let (status, _) = post_json(router(db), "/get", json!({"family": "Lato"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn known_but_absent_variant_is_a_conflict() {
        let (_tmp, db) = fixture();
        db.lock().unwrap().prefetch().unwrap();

        let (status, _) = post_json(router(db), "/check", json!({"family": "Lato"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn family_is_required() {
        let (_tmp, db) = fixture();
        let (status, body) = post_json(router(db), "/check", json!({"weight": 400})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, b"family is required");
    }
}
