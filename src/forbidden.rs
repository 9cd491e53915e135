//! Loads the forbidden-word list that feeds [`crate::filter::ContentFilter`].

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ForbiddenLoadError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads one word per line. Blank lines and lines whose first non-whitespace
/// character is `#` are skipped; surrounding whitespace is trimmed from the
/// remainder.
pub fn load_words(path: impl AsRef<Path>) -> Result<Vec<String>, ForbiddenLoadError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ForbiddenLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
