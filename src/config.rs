use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Immutable run configuration, merged from `.graft.toml` and CLI arguments
/// before the expander is constructed.
#[derive(Debug, Default)]
pub struct Config {
    /// Allowed file-extension suffixes. Empty means no filtering.
    pub extensions: Vec<String>,
    /// Whether a missing include aborts the run instead of warning.
    pub hard_fail: bool,
    /// Base directories searched in order. Empty means resolve relative to
    /// each including file's own directory.
    pub include_paths: Vec<PathBuf>,
}

/// Raw TOML structure for `.graft.toml`.
#[derive(serde::Deserialize)]
struct GraftTomlConfig {
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default)]
    hard_fail: bool,
    #[serde(default)]
    include_paths: Vec<PathBuf>,
}

impl Config {
    /// Load config from `.graft.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist. Returns an error if the
    /// file exists but is malformed, never silently falling back to defaults
    /// when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".graft.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: GraftTomlConfig = toml::from_str(&content)?;
        Ok(Self {
            extensions: raw.extensions,
            hard_fail: raw.hard_fail,
            include_paths: raw.include_paths,
        })
    }

    /// Whether a resolved file may participate in inclusion.
    ///
    /// True when no suffix list is configured, otherwise true iff the path
    /// ends with at least one configured suffix. Rejected files are skipped
    /// silently; they still count as "found" for missing-include purposes.
    pub fn allows(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let path = path.to_string_lossy();
        self.extensions.iter().any(|suffix| path.ends_with(suffix.as_str()))
    }

    /// The base directories a directive in `including_file` resolves against.
    /// Explicit roots override relative-to-including-file resolution.
    pub fn bases_for(&self, including_file: &Path) -> Vec<PathBuf> {
        if self.include_paths.is_empty() {
            let dir = including_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            vec![dir.to_path_buf()]
        } else {
            self.include_paths.clone()
        }
    }
}

/// Key-presence oracle for conditional guards, supplied by the host
/// environment (here: `-D` arguments on the command line).
#[derive(Debug, Default)]
pub struct FlagSet(HashSet<String>);

impl FlagSet {
    /// Build from any collection of flag names.
    pub fn new<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self(names.into_iter().collect())
    }

    /// Whether the named flag is present.
    pub fn has(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_extension_list_allows_everything() {
        let config = Config::default();
        assert!(config.allows(Path::new("vendor/app.css")));
    }

    #[test]
    fn extension_suffixes_anchor_to_path_end() {
        let config = Config {
            extensions: vec![".js".to_string()],
            ..Config::default()
        };
        assert!(config.allows(Path::new("lib/app.js")));
        assert!(!config.allows(Path::new("lib/app.js.css")));
        assert!(!config.allows(Path::new("lib/app.css")));
    }

    #[test]
    fn bases_default_to_including_file_directory() {
        let config = Config::default();
        assert_eq!(
            config.bases_for(Path::new("src/app.js")),
            vec![PathBuf::from("src")]
        );
        assert_eq!(config.bases_for(Path::new("app.js")), vec![PathBuf::from(".")]);
    }

    #[test]
    fn explicit_roots_override_relative_resolution() {
        let config = Config {
            include_paths: vec![PathBuf::from("vendor"), PathBuf::from("lib")],
            ..Config::default()
        };
        assert_eq!(
            config.bases_for(Path::new("src/app.js")),
            vec![PathBuf::from("vendor"), PathBuf::from("lib")]
        );
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.extensions.is_empty());
        assert!(!config.hard_fail);
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".graft.toml"),
            "extensions = [\".js\"]\nhard_fail = true\ninclude_paths = [\"vendor\"]\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.extensions, vec![".js".to_string()]);
        assert!(config.hard_fail);
        assert_eq!(config.include_paths, vec![PathBuf::from("vendor")]);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".graft.toml"), "extensions = 3\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }
}
