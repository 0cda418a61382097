//! Structural validation of serialized workflow files.
//!
//! Validation is independent of export: it re-opens the file from disk and
//! never shares state with the pipeline that wrote it. It also never
//! returns `Err` — every outcome, including an unreadable file, is a
//! structured report.

use crate::links::NodeType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Outcome of validating one workflow file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub node_count: usize,
    pub link_count: usize,
    pub has_save_node: bool,
    pub has_sampler_node: bool,
}

impl ValidationReport {
    /// Report for a file that could not be read or decoded: one error,
    /// everything else zeroed.
    fn unreadable(reason: String) -> Self {
        Self {
            valid: false,
            errors: vec![reason],
            warnings: Vec::new(),
            node_count: 0,
            link_count: 0,
            has_save_node: false,
            has_sampler_node: false,
        }
    }
}

/// Lenient read-side view of the envelope — only the checked fields.
#[derive(Debug, Deserialize)]
struct StoredDocument {
    #[serde(default)]
    nodes: serde_json::Map<String, Value>,
    #[serde(default)]
    links: Vec<Value>,
}

/// Validate the workflow file at `path`.
///
/// A missing sampler node is an error (`valid = false`); a missing
/// save-output node is a warning only.
pub fn validate(path: impl AsRef<Path>) -> ValidationReport {
    let path = path.as_ref();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            return ValidationReport::unreadable(format!(
                "failed to read workflow {}: {e}",
                path.display()
            ))
        }
    };
    let document: StoredDocument = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            return ValidationReport::unreadable(format!(
                "failed to parse workflow {}: {e}",
                path.display()
            ))
        }
    };

    let mut report = ValidationReport {
        valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
        node_count: document.nodes.len(),
        link_count: document.links.len(),
        has_save_node: false,
        has_sampler_node: false,
    };

    for node in document.nodes.values() {
        match node.get("type").and_then(Value::as_str).map(NodeType::from_tag) {
            Some(NodeType::SaveOutput) => report.has_save_node = true,
            Some(NodeType::Sampler) => report.has_sampler_node = true,
            _ => {}
        }
    }

    if !report.has_save_node {
        report.warnings.push("no save-output node found".to_string());
    }
    if !report.has_sampler_node {
        report.errors.push("no sampler node found".to_string());
        report.valid = false;
    }

    report
}
