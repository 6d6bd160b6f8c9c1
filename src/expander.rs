//! The recursive expansion loop: scan a buffer for directives, resolve each
//! to concrete files, expand those files depth-first, and splice the results
//! back in while the map builder keeps output coordinates honest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::{Config, FlagSet};
use crate::diagnostics;
use crate::error::Error;
use crate::resolver;
use crate::scanner::DirectiveScanner;
use crate::sourcemap::{MapBuilder, MapData, SourceMap};
use crate::types::Mode;

/// Nesting limit for recursive expansion. Inputs deeper than this are, in
/// practice, cyclic includes; failing cleanly beats a stack overflow.
const MAX_DEPTH: usize = 64;

/// Result of one top-level expansion.
pub struct Expansion {
    /// The flattened output text.
    pub content: String,
    /// The composed position map, present whenever mapping was requested.
    pub map: Option<SourceMap>,
}

/// Per-top-level-call state, threaded by reference through every recursive
/// step. A fresh registry per top-level call keeps independent invocations
/// from interfering; recursive calls share it so `require` semantics are
/// global to one run.
struct Context {
    included: HashSet<PathBuf>,
    mapping: bool,
    record_content: bool,
}

/// Drives directive expansion over text buffers. Configuration and the
/// condition-flag oracle are immutable for the expander's lifetime.
pub struct Expander<'a> {
    config: &'a Config,
    flags: &'a FlagSet,
    scanner: DirectiveScanner,
}

impl<'a> Expander<'a> {
    pub fn new(config: &'a Config, flags: &'a FlagSet) -> Self {
        Self {
            config,
            flags,
            scanner: DirectiveScanner::new(),
        }
    }

    /// Expand every directive in `text`, recursively, and return the
    /// flattened content. Position mapping is active iff `incoming` is
    /// supplied; literal source text is recorded iff the incoming map
    /// carries a non-empty sources-content table. An incoming map with
    /// entries is recomposed into the result, so provenance established by
    /// earlier tools survives this pass.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingInclude` when `hard_fail` is configured and a
    /// directive matches nothing, `Error::UnreadableFile` /
    /// `Error::UnsupportedInput` for unreadable or non-text matched files,
    /// `Error::MapParse` for an unparseable incoming map, `Error::Pattern`
    /// for an invalid glob, and `Error::IncludeDepthExceeded` past the
    /// nesting limit.
    pub fn expand(
        &self,
        text: &str,
        file_path: &Path,
        incoming: Option<MapData>,
    ) -> Result<Expansion, Error> {
        let incoming = match incoming {
            Some(data) => Some(data.into_map()?),
            None => None,
        };
        let mut ctx = Context {
            included: HashSet::new(),
            mapping: incoming.is_some(),
            record_content: incoming
                .as_ref()
                .is_some_and(|m| !m.sources_content.is_empty()),
        };

        let (content, map) = self.expand_buffer(text, file_path, incoming, &mut ctx, 0)?;
        Ok(Expansion { content, map })
    }

    /// Expand one buffer. Returns the new content and, when mapping is
    /// active, its composed map, except for a nested buffer that matched no
    /// directive, which returns `None` so the caller takes the whole-file
    /// branch (and records literal content) instead of recomposing a trivial
    /// identity map.
    fn expand_buffer(
        &self,
        text: &str,
        file_path: &Path,
        prior: Option<SourceMap>,
        ctx: &mut Context,
        depth: usize,
    ) -> Result<(String, Option<SourceMap>), Error> {
        if depth > MAX_DEPTH {
            return Err(Error::IncludeDepthExceeded {
                depth,
                path: file_path.to_path_buf(),
            });
        }

        let mut content = text.to_string();
        let mut cursor = 0usize;
        let prior_had_entries = prior.as_ref().is_some_and(|m| !m.mappings.is_empty());
        let mut builder = ctx
            .mapping
            .then(|| MapBuilder::new(file_path, prior));
        let mut matched_any = false;

        while let Some(directive) = self.scanner.next(&content, cursor) {
            matched_any = true;
            let removed_newlines = newline_count(&content[directive.span.clone()]);

            if let Some(condition) = &directive.condition {
                if !condition.passes(self.flags) {
                    // The directive is not honored, but its comment still
                    // goes away; only the line delta needs accounting.
                    if let Some(builder) = builder.as_mut() {
                        builder.pass_through(directive.line, file_path);
                        builder.commit_splice(directive.line, 0, removed_newlines);
                    }
                    cursor = directive.span.start;
                    content.replace_range(directive.span.clone(), "");
                    continue;
                }
            }

            let indent = indent_before(&content, directive.span.start);
            if let Some(builder) = builder.as_mut() {
                builder.pass_through(directive.line, file_path);
            }

            let bases = self.config.bases_for(file_path);
            let resolution = resolver::resolve(&directive.path, &bases)?;
            if resolution.files.is_empty() {
                let pattern = resolution.patterns.join(", ");
                if self.config.hard_fail {
                    return Err(Error::MissingInclude { pattern });
                }
                diagnostics::warn_missing_include(&pattern);
            }

            let mut replacement = String::new();
            let mut chunk_line = directive.line;
            let total = resolution.files.len();
            for (index, file) in resolution.files.iter().enumerate() {
                if directive.mode == Mode::Require && ctx.included.contains(file) {
                    continue;
                }
                if !self.config.allows(file) {
                    continue;
                }

                let raw = read_source(file)?;
                let (mut chunk, chunk_map) =
                    self.expand_buffer(&raw, file, None, ctx, depth + 1)?;
                ctx.included.insert(file.clone());

                // Globbed files concatenate on separate lines.
                let last = index + 1 == total;
                if !last && !chunk.ends_with('\n') {
                    chunk.push('\n');
                }

                if let Some(builder) = builder.as_mut() {
                    match chunk_map {
                        Some(sub) if !sub.mappings.is_empty() => {
                            builder.splice_mapped(chunk_line, indent, sub);
                        },
                        // No sub-map, or one with no entries: fall back to a
                        // whole-file 1:1 mapping.
                        _ => {
                            let literal = ctx.record_content.then_some(chunk.as_str());
                            builder.splice_file(
                                chunk_line,
                                indent,
                                line_span(&chunk),
                                file,
                                literal,
                            );
                        },
                    }
                    chunk_line += newline_count(&chunk);
                }

                replacement.push_str(&chunk);
            }

            if let Some(builder) = builder.as_mut() {
                builder.commit_splice(
                    directive.line,
                    newline_count(&replacement),
                    removed_newlines,
                );
            }
            cursor = directive.span.start + replacement.len();
            content.replace_range(directive.span.clone(), &replacement);
        }

        let map = match builder {
            Some(builder) if matched_any || prior_had_entries || depth == 0 => {
                Some(builder.finish(line_span(&content), file_path))
            },
            _ => None,
        };
        Ok((content, map))
    }
}

/// Read a file's text for inclusion, with any leading byte-order mark
/// stripped.
///
/// # Errors
///
/// Returns `Error::UnreadableFile` if the file cannot be read and
/// `Error::UnsupportedInput` if its bytes are not valid UTF-8.
pub fn read_source(path: &Path) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|source| Error::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| Error::UnsupportedInput {
        path: path.to_path_buf(),
    })?;
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => Ok(stripped.to_string()),
        None => Ok(text),
    }
}

fn newline_count(text: &str) -> u32 {
    let count = text.bytes().filter(|b| *b == b'\n').count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Number of generated line starts a chunk of text occupies.
fn line_span(text: &str) -> u32 {
    newline_count(text) + u32::from(!text.ends_with('\n'))
}

/// Width of the whitespace run between the start of the line and `offset`,
/// or 0 when the directive does not sit in a pure-indentation context.
fn indent_before(content: &str, offset: usize) -> u32 {
    let line_start = content[..offset].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &content[line_start..offset];
    if !prefix.is_empty() && prefix.chars().all(|c| c == ' ' || c == '\t') {
        u32::try_from(prefix.chars().count()).unwrap_or(0)
    } else {
        0
    }
}
