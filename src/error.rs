/// Crate-level error types for graft diagnostics.
use std::path::PathBuf;

/// All errors in graft carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, pattern, or reason for
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Include nesting went past the recursion limit, almost always a cycle.
    #[error("include depth exceeded ({depth}) while expanding {}", path.display())]
    IncludeDepthExceeded {
        /// Depth at which expansion stopped.
        depth: usize,
        /// File whose expansion tripped the limit.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A textual position map could not be parsed as JSON.
    #[error("invalid position map: {0}")]
    MapParse(
        /// The wrapped JSON deserialization error.
        #[from]
        serde_json::Error,
    ),

    /// A directive's path expression matched no files in any base directory.
    /// Fatal only when `hard_fail` is configured.
    #[error("no files found matching {pattern}")]
    MissingInclude {
        /// The searched pattern(s), joined for display.
        pattern: String,
    },

    /// A directive's path expression is not a valid glob pattern.
    #[error("invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern string.
        pattern: String,
        /// The wrapped glob compilation error.
        source: glob::PatternError,
    },

    /// TOML deserialization of `.graft.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A resolved, extension-accepted file could not be read. Always fatal.
    #[error("could not read {}: {source}", path.display())]
    UnreadableFile {
        /// Path that failed to read.
        path: PathBuf,
        /// The underlying read error.
        source: std::io::Error,
    },

    /// Input bytes are not text the expander can process.
    #[error("{} is not valid UTF-8 text", path.display())]
    UnsupportedInput {
        /// Path whose contents were rejected.
        path: PathBuf,
    },
}
