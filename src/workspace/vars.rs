//! Reading and writing the workspace variable file.
//!
//! Each line is `KEY=value`. Values made of plain path-ish characters are
//! written bare; anything else is single-quoted so the file can also be
//! `source`d by a POSIX shell without word splitting or expansion.

use std::borrow::Cow;
use std::io;
use std::path::Path;

use crate::error::{EnvError, Result};

/// Format a single `KEY=value` line, including the trailing newline.
pub fn encode_line(key: &str, value: &str) -> String {
    format!("{}={}\n", key, quote(value))
}

fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_./:@%+,=-".contains(c)
}

/// Quote `value` for a POSIX shell, leaving plain words untouched.
pub fn quote(value: &str) -> Cow<'_, str> {
    if !value.is_empty() && value.chars().all(is_plain) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
}

fn parse_error(path: &Path, err: dotenvy::Error) -> EnvError {
    match err {
        dotenvy::Error::Io(e) => EnvError::setup(path, e),
        other => EnvError::setup(path, io::Error::new(io::ErrorKind::InvalidData, other.to_string())),
    }
}

/// Read a variable file into ordered `(key, value)` pairs.
///
/// Returns `None` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<Vec<(String, String)>>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(None),
        Err(e) => return Err(parse_error(path, e)),
    };
    iter.map(|item| item.map_err(|e| parse_error(path, e)))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
