use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";
const YELLOW: &str = "\x1b[33m";

/// Non-fatal missing-include warning, printed as expansion proceeds.
pub fn warn_missing_include(pattern: &str) {
    eprintln!("{YELLOW}WARN:{RESET} {CYAN}graft{RESET} - no files found matching {pattern}");
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is an
/// obvious remedy, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::MissingInclude { pattern } => format!("\
# Error: Missing Include

No files found matching `{pattern}`.

## Fix

Check the directive's path expression, or drop `--hard-fail` to treat
missing includes as warnings.
"),

        Error::UnreadableFile { path, source } => format!("\
# Error: Unreadable File

Could not read `{}`: {source}
", path.display()),

        Error::UnsupportedInput { path } => format!("\
# Error: Unsupported Input

`{}` is not valid UTF-8 text. The expander only processes text files.
", path.display()),

        Error::IncludeDepthExceeded { depth, path } => format!("\
# Error: Include Depth Exceeded

Expansion of `{}` reached nesting depth {depth}.

## Fix

This almost always means a file includes itself, directly or through a
chain. Break the cycle, or switch the inner directive to `@require`.
", path.display()),

        Error::Pattern { pattern, source } => format!("\
# Error: Invalid Pattern

`{pattern}` is not a valid glob pattern: {source}
"),

        Error::MapParse(e) => format!("\
# Error: Invalid Position Map

{e}
"),

        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.graft.toml`.
"),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_include_renders_the_pattern() {
        let e = Error::MissingInclude {
            pattern: "src/nope/*.js".to_string(),
        };
        let md = render_error(&e);
        assert!(md.contains("# Error: Missing Include"));
        assert!(md.contains("src/nope/*.js"));
    }
}
