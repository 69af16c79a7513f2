//! Close-price series loading.
//!
//! Two formats are accepted, chosen by file extension: a JSON array of
//! numbers (`.json`), or a one-column CSV (anything else) with an optional
//! header line.

use std::path::Path;

use crate::error::{Error, Result};

/// Load a close-price series from `path`.
pub fn load_closes(path: &Path) -> Result<Vec<f64>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::InputRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let closes = if is_json {
        parse_json(&contents)?
    } else {
        parse_csv(&contents)?
    };
    validate(&closes)?;
    Ok(closes)
}

/// Parse a JSON array of numbers.
pub fn parse_json(contents: &str) -> Result<Vec<f64>> {
    Ok(serde_json::from_str(contents)?)
}

/// Parse a one-column CSV. A non-numeric first line is treated as a header.
pub fn parse_csv(contents: &str) -> Result<Vec<f64>> {
    let mut closes = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let field = line.trim();
        if field.is_empty() {
            continue;
        }
        if field.contains(',') {
            return Err(Error::Input(format!(
                "line {}: expected a single column, got '{field}'",
                line_no + 1
            )));
        }
        match field.parse::<f64>() {
            Ok(v) => closes.push(v),
            Err(_) if line_no == 0 => {}
            Err(_) => {
                return Err(Error::Input(format!(
                    "line {}: '{field}' is not a number",
                    line_no + 1
                )));
            }
        }
    }
    Ok(closes)
}

fn validate(closes: &[f64]) -> Result<()> {
    if closes.is_empty() {
        return Err(Error::Input("series is empty".into()));
    }
    if let Some(i) = closes.iter().position(|c| !c.is_finite()) {
        return Err(Error::Input(format!("value {i} is not finite")));
    }
    Ok(())
}
