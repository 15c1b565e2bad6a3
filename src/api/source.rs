use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Supplies the result documents referenced by a configuration's
/// `results_file`.
///
/// Hosts decide what a results file is (a path on disk, an object key, a
/// fixture name); the pipeline only asks for the parsed documents.
pub trait DocumentSource {
    fn load(&mut self, results_file: &str) -> PipelineResult<Vec<Value>>;
}

impl<F> DocumentSource for F
where
    F: FnMut(&str) -> PipelineResult<Vec<Value>>,
{
    fn load(&mut self, results_file: &str) -> PipelineResult<Vec<Value>> {
        self(results_file)
    }
}

/// Turns a results payload into a document list.
///
/// An array yields one document per element; anything else is a single
/// document.
pub fn parse_documents(input: &str) -> PipelineResult<Vec<Value>> {
    Ok(documents_from_value(serde_json::from_str(input)?))
}

#[must_use]
pub fn documents_from_value(value: Value) -> Vec<Value> {
    match value {
        Value::Array(documents) => documents,
        single => vec![single],
    }
}

/// Documents held in memory, keyed by results file in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: IndexMap<String, Vec<Value>>,
}

impl InMemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_documents(mut self, results_file: impl Into<String>, documents: Vec<Value>) -> Self {
        self.insert(results_file, documents);
        self
    }

    /// Registers the payload under `results_file`, replacing earlier content.
    pub fn insert(&mut self, results_file: impl Into<String>, documents: Vec<Value>) {
        self.documents.insert(results_file.into(), documents);
    }

    /// Parses `payload` with [`parse_documents`] and registers the result.
    pub fn insert_json(&mut self, results_file: impl Into<String>, payload: &str) -> PipelineResult<()> {
        let documents = parse_documents(payload)?;
        self.insert(results_file, documents);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentSource for InMemorySource {
    fn load(&mut self, results_file: &str) -> PipelineResult<Vec<Value>> {
        let documents = self
            .documents
            .get(results_file)
            .cloned()
            .ok_or_else(|| PipelineError::Source {
                results_file: results_file.to_owned(),
                message: "no documents registered".to_owned(),
            })?;
        debug!(results_file, documents = documents.len(), "loaded documents");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentSource, InMemorySource, parse_documents};
    use crate::error::PipelineResult;
    use serde_json::{Value, json};

    #[test]
    fn object_payload_is_wrapped_as_one_document() {
        let documents = parse_documents(r#"{"a": 1}"#).expect("parsed");
        assert_eq!(documents, vec![json!({"a": 1})]);

        let documents = parse_documents(r#"[{"a": 1}, {"a": 2}]"#).expect("parsed");
        assert_eq!(documents.len(), 2);
    }

    #[test]
    fn unknown_results_file_is_a_source_error() {
        let mut source = InMemorySource::new().with_documents("known.json", vec![json!({})]);
        assert!(source.load("known.json").is_ok());
        assert!(source.load("missing.json").is_err());
    }

    #[test]
    fn closures_act_as_sources() {
        let mut calls = 0;
        let mut source = |results_file: &str| -> PipelineResult<Vec<Value>> {
            calls += 1;
            Ok(vec![json!({ "file": results_file })])
        };
        let documents = source.load("r.json").expect("loaded");
        assert_eq!(documents[0]["file"], "r.json");
        drop(source);
        assert_eq!(calls, 1);
    }
}
