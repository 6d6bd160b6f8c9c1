use regex::Regex;

use crate::types::{Condition, Directive, Guard, Mode};

/// Finds inclusion directives in a text buffer.
///
/// A directive is a single-line comment of the form
/// `// @include("path")` or `// @require("path")`, optionally followed by a
/// chained condition `.is("flag")` or `.not("flag")` and an optional
/// semicolon. The scanner performs zero syntax analysis of the surrounding
/// content: it is a single compiled pattern advanced by a byte cursor.
pub struct DirectiveScanner {
    closer: Regex,
    leader: Regex,
    pattern: Regex,
    whitespace: Regex,
}

impl DirectiveScanner {
    /// Compile the directive pattern and the path-cleanup patterns.
    ///
    /// # Panics
    ///
    /// Panics if a hardcoded regex is invalid (compile-time invariant).
    pub fn new() -> Self {
        Self {
            closer: Regex::new(r"(\*/|-->)$").expect("valid regex"),
            leader: Regex::new(r"(//|/\*|#|<!--)(\s+)?=(\s+)?").expect("valid regex"),
            pattern: Regex::new(
                r#"//\s*?@(\w+)\("([^"]+)"\)(?:\.(is|not)\("([^"]+)"\))*[ \t]*;?[ \t]*\r?\n?"#,
            )
            .expect("valid regex"),
            whitespace: Regex::new(r"\s+").expect("valid regex"),
        }
    }

    /// Find the next directive at or after byte offset `from`.
    ///
    /// Matches whose keyword is not a literal `include` or `require` are not
    /// directives; the scanner skips past them and keeps searching. The match
    /// span includes the directive's own line terminator when present, so
    /// replacing the span leaves no blank line behind.
    pub fn next(&self, content: &str, from: usize) -> Option<Directive> {
        let mut at = from;
        loop {
            let caps = self.pattern.captures_at(content, at)?;
            let whole = caps.get(0)?;

            let Some(mode) = Mode::parse(&caps[1]) else {
                at = whole.end();
                continue;
            };

            // A repeated condition group keeps its last occurrence. An
            // unrecognized guard word degrades to "no condition": the
            // directive is always honored.
            let condition = match (caps.get(3), caps.get(4)) {
                (Some(guard), Some(flag)) => Guard::parse(guard.as_str()).map(|guard| Condition {
                    flag: flag.as_str().to_string(),
                    guard,
                }),
                _ => None,
            };

            return Some(Directive {
                condition,
                line: line_of(content, whole.start()),
                mode,
                path: self.clean_path(&caps[2]),
                span: whole.range(),
            });
        }
    }

    /// Normalize a raw path expression: collapse internal whitespace, strip
    /// comment-leader prefixes (`//=`, `/*=`, `#=`, `<!--=`) and trailing
    /// comment closers (`*/`, `-->`), remove quotes, trim.
    fn clean_path(&self, raw: &str) -> String {
        let collapsed = self.whitespace.replace_all(raw, " ");
        let stripped = self.leader.replace_all(&collapsed, "");
        let stripped = self.closer.replace_all(&stripped, "");
        stripped.replace(['"', '\''], "").trim().to_string()
    }
}

/// One-based line number of a byte offset.
fn line_of(content: &str, offset: usize) -> u32 {
    let newlines = content[..offset].bytes().filter(|b| *b == b'\n').count();
    u32::try_from(newlines).unwrap_or(u32::MAX - 1) + 1
}
