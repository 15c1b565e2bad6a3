//! Path expressions addressing values inside result documents.
//!
//! Grammar: segments separated by `.`, each segment `key([index])*` where the
//! key may be empty and every index is a non-negative integer, e.g.
//! `runs[0].latency.samples[2]`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use smallvec::SmallVec;
use thiserror::Error;

use crate::error::{PipelineError, PipelineResult};

static SEGMENT_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$"));
static INDEX_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub key: String,
    pub indices: SmallVec<[usize; 2]>,
}

/// Parsed, validated path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    source: String,
    segments: Vec<PathSegment>,
}

/// Why a path could not be resolved against one document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathMiss {
    #[error("key `{key}` not found")]
    MissingKey { key: String },

    #[error("value at `{key}` is not a mapping")]
    NotAMapping { key: String },

    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("value at index {index} is not a sequence")]
    NotASequence { index: usize },
}

impl PathExpression {
    pub fn parse(source: &str) -> PipelineResult<Self> {
        let invalid = |reason: String| PipelineError::InvalidPath {
            path: source.to_owned(),
            reason,
        };

        if source.trim().is_empty() {
            return Err(invalid("path must not be empty".to_owned()));
        }

        let segment_re = SEGMENT_RE.as_ref().map_err(|e| invalid(e.to_string()))?;
        let index_re = INDEX_RE.as_ref().map_err(|e| invalid(e.to_string()))?;

        let mut segments = Vec::new();
        for raw in source.split('.') {
            let caps = segment_re
                .captures(raw)
                .ok_or_else(|| invalid(format!("segment `{raw}` does not match key([index])*")))?;
            let key = caps.get(1).map_or("", |m| m.as_str()).to_owned();
            let mut indices = SmallVec::new();
            if let Some(group) = caps.get(2) {
                for index_caps in index_re.captures_iter(group.as_str()) {
                    let digits = index_caps.get(1).map_or("", |m| m.as_str());
                    let index = digits
                        .parse::<usize>()
                        .map_err(|e| invalid(format!("index `{digits}`: {e}")))?;
                    indices.push(index);
                }
            }
            segments.push(PathSegment { key, indices });
        }

        Ok(Self {
            source: source.to_owned(),
            segments,
        })
    }

    /// Appends positional indices after the last segment.
    #[must_use]
    pub fn with_trailing_indices(mut self, indices: &[usize]) -> Self {
        if let Some(last) = self.segments.last_mut() {
            for index in indices {
                last.indices.push(*index);
                self.source.push_str(&format!("[{index}]"));
            }
        }
        self
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walks `document` along this path.
    ///
    /// The document is only borrowed; the returned value points into it.
    pub fn resolve<'a>(&self, document: &'a Value) -> Result<&'a Value, PathMiss> {
        let mut current = document;
        for segment in &self.segments {
            if !segment.key.is_empty() {
                current = match current {
                    Value::Object(map) => {
                        map.get(&segment.key).ok_or_else(|| PathMiss::MissingKey {
                            key: segment.key.clone(),
                        })?
                    }
                    _ => {
                        return Err(PathMiss::NotAMapping {
                            key: segment.key.clone(),
                        });
                    }
                };
            }
            for &index in &segment.indices {
                current = match current {
                    Value::Array(items) => {
                        items.get(index).ok_or(PathMiss::IndexOutOfRange {
                            index,
                            len: items.len(),
                        })?
                    }
                    _ => return Err(PathMiss::NotASequence { index }),
                };
            }
        }
        Ok(current)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for PathExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
