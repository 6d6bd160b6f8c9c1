use std::path::PathBuf;

use crate::error::Error;

/// Outcome of resolving one directive's path expression.
pub struct Resolution {
    /// Concrete files, in base-path order then the matcher's lexicographic
    /// order within each base. Order determines concatenation order.
    pub files: Vec<PathBuf>,
    /// Every pattern that was searched, for the missing-include diagnostic.
    pub patterns: Vec<String>,
}

/// Resolve a path expression against an ordered list of base directories.
///
/// Each base is joined with the expression and glob-matched; results are
/// concatenated across bases. Directory matches are excluded; only files
/// are includable. An empty `files` list means nothing matched anywhere.
///
/// # Errors
///
/// Returns `Error::Pattern` if the joined expression is not a valid glob.
pub fn resolve(expression: &str, bases: &[PathBuf]) -> Result<Resolution, Error> {
    let mut files = Vec::new();
    let mut patterns = Vec::new();

    for base in bases {
        let pattern = base.join(expression).to_string_lossy().into_owned();
        let matches = glob::glob(&pattern).map_err(|source| Error::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        files.extend(matches.filter_map(Result::ok).filter(|p| !p.is_dir()));
        patterns.push(pattern);
    }

    Ok(Resolution { files, patterns })
}
