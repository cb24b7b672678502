//! TTF to WOFF/WOFF2 conversion through an external subsetter (made by FontLab https://www.fontlab.com/)

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::config::FontFormat;
use crate::fetch::set_asset_permissions;

/// Produces a web font rendition of a TTF.
///
/// Implementations may leave `target` absent on failure; callers decide on
/// success by checking that the file exists.
pub trait WebFontConverter: Send {
    fn convert(&self, ttf: &Path, target: &Path, unicodes: &str, flavor: FontFormat)
        -> Result<()>;
}

/// fontTools' `pyftsubset`.
#[derive(Debug, Clone)]
pub struct Pyftsubset {
    program: PathBuf,
}

impl Pyftsubset {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, ttf: &Path, target: &Path, unicodes: &str, flavor: FontFormat) -> Command {
        let unicodes = if unicodes.is_empty() { "*" } else { unicodes };
        let mut cmd = Command::new(&self.program);
        cmd.arg(ttf)
            .arg(format!("--output-file={}", target.display()))
            .arg(format!("--flavor={flavor}"))
            .arg("--layout-features=*")
            .arg("--with-zopfli")
            .arg(format!("--unicodes={unicodes}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Default for Pyftsubset {
    fn default() -> Self {
        Self::new("pyftsubset")
    }
}

impl WebFontConverter for Pyftsubset {
    fn convert(
        &self,
        ttf: &Path,
        target: &Path,
        unicodes: &str,
        flavor: FontFormat,
    ) -> Result<()> {
        if !flavor.is_web_flavor() {
            return Err(anyhow!("{flavor} cannot be derived from a TTF"));
        }

        let output = self
            .command(ttf, target, unicodes, flavor)
            .output()
            .with_context(|| format!("running {}", self.program.display()))?;

        if !output.status.success() {
            debug!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "subsetter exited with failure"
            );
        }

        if target.is_file() {
            set_asset_permissions(target)?;
        }
        Ok(())
    }
}

/// Unicode ranges covered by a named subset; unknown names cover nothing.
pub fn subset_range(subset: &str) -> Option<&'static str> {
    let range = match subset {
        "cyrillic-ext" => "U+0460-052F, U+1C80-1C88, U+20B4, U+2DE0-2DFF, U+A640-A69F, U+FE2E-FE2F",
        "cyrillic" => "U+0400-045F, U+0490-0491, U+04B0-04B1, U+2116",
        "greek-ext" => "U+1F00-1FFF",
        "greek" => "U+0370-03FF",
        "latin-ext" => "U+0100-024F, U+0259, U+1E00-1EFF, U+2020, U+20A0-20AB, U+20AD-20CF, U+2113, U+2C60-2C7F, U+A720-A7FF",
        "latin" => "U+0000-00FF, U+0131, U+0152-0153, U+02BB-02BC, U+02C6, U+02DA, U+02DC, U+2000-206F, U+2074, U+20AC, U+2122, U+2191, U+2193, U+2212, U+2215, U+FEFF, U+FFFD",
        _ => return None,
    };
    Some(range)
}

/// Joined `--unicodes` argument for a list of subsets.
pub fn unicode_range(subsets: &[String]) -> String {
    subsets
        .iter()
        .filter_map(|s| subset_range(s))
        .collect::<Vec<_>>()
        .join(", ")
}
