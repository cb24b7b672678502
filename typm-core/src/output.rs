//! Streaming output helpers (made by FontLab https://www.fontlab.com/)

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

/// Write items as a prettified JSON array.
pub fn write_json_pretty<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write items as newline-delimited JSON (NDJSON).
pub fn write_ndjson<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    for item in items {
        let line = serde_json::to_string(item)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontSummary;

    fn sample_summary(id: &str) -> FontSummary {
        FontSummary {
            id: id.to_string(),
            family: "Roboto".to_string(),
            category: String::new(),
            version: "V1".to_string(),
            local: false,
            installed: true,
            variants: vec!["regular".to_string(), "700".to_string()],
            installed_variants: vec!["700".to_string()],
            subsets: Vec::new(),
        }
    }

    #[test]
    fn ndjson_writes_one_line_per_item() {
        let items = vec![sample_summary("roboto"), sample_summary("lato")];
        let mut buf = Vec::new();

        write_ndjson(&items, &mut buf).expect("write ndjson");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: FontSummary = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(parsed.id, "lato");
        assert_eq!(parsed.installed_variants, vec!["700"]);
    }
}
