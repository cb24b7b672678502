//! Materializing provider assets into the registry (made by FontLab https://www.fontlab.com/)

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Copies one asset (a local path or, with the `http` feature, a URL) to a
/// target file.
pub trait AssetFetcher: Send {
    fn fetch(&self, source: &str, target: &Path) -> Result<()>;
}

/// Default fetcher: plain file copy for paths, blocking HTTP GET for URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFetcher;

impl AssetFetcher for StdFetcher {
    fn fetch(&self, source: &str, target: &Path) -> Result<()> {
        ensure_file_target(target)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        if is_remote(source) {
            download(source, target)?;
        } else {
            fs::copy(source, target)
                .with_context(|| format!("copying {source} to {}", target.display()))?;
        }

        set_asset_permissions(target)
            .with_context(|| format!("setting permissions on {}", target.display()))?;
        debug!(%source, target = %target.display(), "asset fetched");
        Ok(())
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(feature = "http")]
fn download(url: &str, target: &Path) -> Result<()> {
    let response = http_client()?
        .get(url)
        .send()
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()?;
    let bytes = response.bytes()?;
    fs::write(target, &bytes).with_context(|| format!("writing {}", target.display()))?;
    Ok(())
}

#[cfg(not(feature = "http"))]
fn download(url: &str, _target: &Path) -> Result<()> {
    bail!("cannot download {url}: built without the `http` feature")
}

#[cfg(feature = "http")]
pub(crate) fn http_client() -> Result<reqwest::blocking::Client> {
    use std::time::Duration;

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("typm/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(60))
        .build()?;
    Ok(client)
}

/// Registry files are world readable and traversable.
#[cfg(unix)]
pub(crate) fn set_asset_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
pub(crate) fn set_asset_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Fail early when a caller hands a directory in place of a file target.
pub(crate) fn ensure_file_target(target: &Path) -> Result<()> {
    if target.is_dir() {
        bail!("{} is a directory", target.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn copies_local_sources_and_creates_parents() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("source.ttf");
        fs::write(&source, b"glyphs").unwrap();
        let target = tmp.path().join("roboto/700/roboto-700.ttf");

        StdFetcher
            .fetch(source.to_str().unwrap(), &target)
            .expect("fetch");

        assert_eq!(fs::read(&target).unwrap(), b"glyphs");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn missing_local_source_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = StdFetcher
            .fetch("/nonexistent/typm.ttf", &tmp.path().join("x.ttf"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/typm.ttf"));
    }

    #[test]
    fn recognizes_remote_sources() {
        assert!(is_remote("https://fonts.gstatic.com/s/roboto.ttf"));
        assert!(is_remote("http://example.com/a.woff"));
        assert!(!is_remote("/srv/fonts/a.ttf"));
    }

    #[test]
    fn directories_are_not_file_targets() {
        let tmp = tempdir().unwrap();
        assert!(ensure_file_target(tmp.path()).is_err());
        assert!(ensure_file_target(&tmp.path().join("a.ttf")).is_ok());
    }
}
