//! Position map data model, JSON codec, and the merge logic that keeps
//! output coordinates aligned with original sources across splices.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One translation entry: a generated (output) position mapped back to an
/// original source position. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    /// Column in the generated output.
    pub generated_column: u32,
    /// Line in the generated output.
    pub generated_line: u32,
    /// Optional symbol name associated with the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Column in the original source.
    pub original_column: u32,
    /// Line in the original source.
    pub original_line: u32,
    /// Path of the original source file, unix-style.
    pub source: String,
}

/// An ordered position map for one expansion. Entries are appended in
/// left-to-right, top-to-bottom order as the buffer is scanned, so generated
/// coordinates are monotonically non-decreasing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceMap {
    /// Path of the file this map describes, unix-style.
    pub file: String,
    /// Ordered translation entries.
    pub mappings: Vec<Mapping>,
    /// Optional literal source text per source path, for self-contained
    /// debugging.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sources_content: BTreeMap<String, String>,
}

impl SourceMap {
    /// An empty map for the given file.
    pub fn new(file: String) -> Self {
        Self {
            file,
            mappings: Vec::new(),
            sources_content: BTreeMap::new(),
        }
    }

    /// An empty map that also records the file's literal text. Supplying a
    /// map built this way to the expander both requests position mapping and
    /// enables sources-content recording.
    pub fn with_source(file: &Path, content: &str) -> Self {
        let mut map = Self::new(unix_style(file));
        map.sources_content.insert(unix_style(file), content.to_string());
        map
    }

    /// Parse the serialized textual form.
    ///
    /// # Errors
    ///
    /// Returns `Error::MapParse` if the text is not a valid map.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to the textual form.
    ///
    /// # Errors
    ///
    /// Returns `Error::MapParse` if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A position map as handed over by the host: either already structured or
/// still in its serialized textual form.
pub enum MapData {
    /// Serialized textual form.
    Json(String),
    /// Structured form.
    Map(SourceMap),
}

impl MapData {
    /// Normalize to the structured form.
    ///
    /// # Errors
    ///
    /// Returns `Error::MapParse` if a textual form is not a valid map.
    pub fn into_map(self) -> Result<SourceMap, Error> {
        match self {
            MapData::Json(text) => SourceMap::from_json(&text),
            MapData::Map(map) => Ok(map),
        }
    }
}

/// Incrementally builds the merged map for one buffer expansion.
///
/// Tracks the last generated line accounted for and the signed cumulative
/// line delta from committed splices, so pass-through regions after an
/// insertion or deletion keep pointing at the right original lines. When the
/// buffer arrived with a prior map, its entries are re-anchored during the
/// pass-through walk instead of being mapped 1:1, preserving provenance
/// established by earlier tools.
pub struct MapBuilder {
    inserted: i64,
    last_mapped: u32,
    map: SourceMap,
    prior_lines: BTreeMap<u32, Vec<Mapping>>,
}

impl MapBuilder {
    /// Start a map for `file`, seeded from an optional prior map whose
    /// generated space is the buffer's original text. A prior map with no
    /// entries contributes nothing beyond its sources-content table.
    pub fn new(file: &Path, prior: Option<SourceMap>) -> Self {
        let mut map = SourceMap::new(unix_style(file));
        let mut prior_lines: BTreeMap<u32, Vec<Mapping>> = BTreeMap::new();
        if let Some(prior) = prior {
            map.sources_content = prior.sources_content;
            for entry in prior.mappings {
                prior_lines.entry(entry.generated_line).or_default().push(entry);
            }
        }
        Self {
            inserted: 0,
            last_mapped: 1,
            map,
            prior_lines,
        }
    }

    /// Account for the pass-through region up to (excluding) generated line
    /// `upto`: lines covered by the prior map are recomposed at their shifted
    /// generated position; all others map 1:1, column 0, to `source`.
    pub fn pass_through(&mut self, upto: u32, source: &Path) {
        let source = unix_style(source);
        for generated in self.last_mapped..upto {
            let original = original_line(generated, self.inserted);
            if let Some(entries) = self.prior_lines.get(&original) {
                for entry in entries {
                    self.map.mappings.push(Mapping {
                        generated_column: entry.generated_column,
                        generated_line: generated,
                        name: entry.name.clone(),
                        original_column: entry.original_column,
                        original_line: entry.original_line,
                        source: entry.source.clone(),
                    });
                }
            } else {
                self.map.mappings.push(Mapping {
                    generated_column: 0,
                    generated_line: generated,
                    name: None,
                    original_column: 0,
                    original_line: original,
                    source: source.clone(),
                });
            }
        }
        self.last_mapped = upto;
    }

    /// 1:1 mapping for a spliced file that carried no map of its own: each of
    /// its `lines` maps to the corresponding line of the file, column 0. The
    /// file's literal text is recorded when `content` is supplied.
    pub fn splice_file(
        &mut self,
        start: u32,
        indent: u32,
        lines: u32,
        source: &Path,
        content: Option<&str>,
    ) {
        let source = unix_style(source);
        for offset in 0..lines {
            self.map.mappings.push(Mapping {
                generated_column: indent,
                generated_line: start + offset,
                name: None,
                original_column: 0,
                original_line: offset + 1,
                source: source.clone(),
            });
        }
        if let Some(content) = content {
            self.map.sources_content.insert(source, content.to_string());
        }
    }

    /// Re-anchor a sub-map produced by a recursive expansion: generated lines
    /// shift to the splice position, generated columns by the splice point's
    /// indentation; original coordinates and source identity pass through.
    pub fn splice_mapped(&mut self, start: u32, indent: u32, sub: SourceMap) {
        for entry in sub.mappings {
            if entry.source.is_empty() {
                continue;
            }
            self.map.mappings.push(Mapping {
                generated_column: entry.generated_column + indent,
                generated_line: entry.generated_line + start - 1,
                name: entry.name,
                original_column: entry.original_column,
                original_line: entry.original_line,
                source: entry.source,
            });
        }
        self.map.sources_content.extend(sub.sources_content);
    }

    /// Account for one committed directive replacement at generated line
    /// `line`: the replacement inserted `inserted_newlines` and the removed
    /// directive text contained `removed_newlines`.
    pub fn commit_splice(&mut self, line: u32, inserted_newlines: u32, removed_newlines: u32) {
        self.inserted += i64::from(inserted_newlines) - i64::from(removed_newlines);
        self.last_mapped = line + inserted_newlines;
    }

    /// Flush the buffer tail and return the finished map.
    pub fn finish(mut self, total_lines: u32, source: &Path) -> SourceMap {
        self.pass_through(total_lines + 1, source);
        self.map
    }
}

/// Record source paths with forward slashes regardless of platform.
pub fn unix_style(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn original_line(generated: u32, inserted: i64) -> u32 {
    u32::try_from((i64::from(generated) - inserted).max(1)).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_form_normalizes_to_structured() {
        let text = r#"{
            "file": "app.js",
            "mappings": [{
                "generatedColumn": 0,
                "generatedLine": 1,
                "originalColumn": 0,
                "originalLine": 4,
                "source": "lib/util.js"
            }]
        }"#;
        let map = MapData::Json(text.to_string()).into_map().unwrap();
        assert_eq!(map.file, "app.js");
        assert_eq!(map.mappings.len(), 1);
        assert_eq!(map.mappings[0].original_line, 4);
        assert_eq!(map.mappings[0].source, "lib/util.js");
    }

    #[test]
    fn invalid_textual_form_is_an_error() {
        let result = MapData::Json("not a map".to_string()).into_map();
        assert!(matches!(result, Err(Error::MapParse(_))));
    }

    #[test]
    fn pass_through_respects_the_cumulative_delta() {
        let mut builder = MapBuilder::new(Path::new("app.js"), None);
        builder.pass_through(2, Path::new("app.js"));
        builder.commit_splice(2, 3, 1);
        builder.pass_through(6, Path::new("app.js"));

        let map = builder.finish(6, Path::new("app.js"));
        let tail = map
            .mappings
            .iter()
            .find(|m| m.generated_line == 5)
            .unwrap();
        assert_eq!(tail.original_line, 3);
        assert_eq!(tail.source, "app.js");
    }

    #[test]
    fn prior_entries_are_recomposed_in_pass_through() {
        let mut prior = SourceMap::new("app.js".to_string());
        prior.mappings.push(Mapping {
            generated_column: 2,
            generated_line: 2,
            name: None,
            original_column: 0,
            original_line: 40,
            source: "deep/origin.src".to_string(),
        });

        let mut builder = MapBuilder::new(Path::new("app.js"), Some(prior));
        builder.commit_splice(1, 2, 1);
        let map = builder.finish(3, Path::new("app.js"));

        let recomposed = map
            .mappings
            .iter()
            .find(|m| m.source == "deep/origin.src")
            .unwrap();
        assert_eq!(recomposed.generated_line, 3);
        assert_eq!(recomposed.generated_column, 2);
        assert_eq!(recomposed.original_line, 40);
    }
}
