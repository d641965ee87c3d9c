//! Key-table input: reads the ordered key list whose positions are the
//! desired hash values.

use crate::chm::MphError;
use log::debug;
use std::fs;
use std::path::Path;

/// How the key file is parsed.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Start-of-comment marker; the rest of the line is dropped.
    pub comment: String,
    /// Column separator.
    pub split_by: String,
    /// 1-based column holding the key.
    pub key_col: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            comment: "#".to_string(),
            split_by: ",".to_string(),
            key_col: 1,
        }
    }
}

/// Read keys from `path`, one per non-blank line, in file order. Comments
/// are stripped, lines are trimmed, and the configured column is selected.
pub fn read_table(path: &Path, opts: &TableOptions) -> Result<Vec<String>, MphError> {
    debug!("reading keys from {}", path.display());
    let text = fs::read_to_string(path)?;

    let mut keys = Vec::new();
    for (line_no, raw) in text.lines().enumerate() {
        let line = match raw.find(&opts.comment) {
            Some(i) if !opts.comment.is_empty() => &raw[..i],
            _ => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let key = opts
            .key_col
            .checked_sub(1)
            .and_then(|col| line.split(&opts.split_by).nth(col))
            .ok_or(MphError::MissingKeyColumn {
                line: line_no + 1,
                col: opts.key_col,
            })?
            .trim();
        keys.push(key.to_string());
    }
    debug!("{} keys read", keys.len());
    Ok(keys)
}
