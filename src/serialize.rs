//! Workflow file persistence.

use crate::error::ExportError;
use crate::workflow::Workflow;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the workflow's wire envelope to `path`, creating missing parent
/// directories.
///
/// The write is atomic: the document lands in a named temp file in the
/// destination directory and is renamed into place, so a concurrent reader
/// never observes a torn file. Concurrent writers to the same path remain
/// unguarded — last writer wins.
pub fn save(workflow: &Workflow, path: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
    let path = path.as_ref();
    let io_err = |source: std::io::Error| ExportError::Serialization {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(io_err)?;
            parent
        }
        _ => Path::new("."),
    };

    let document = workflow.to_document();
    let body = serde_json::to_vec_pretty(&document)
        .map_err(|e| io_err(std::io::Error::other(e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&body).map_err(io_err)?;
    tmp.persist(path)
        .map_err(|e| io_err(e.error))?;

    info!(
        workflow = %workflow.name,
        nodes = workflow.node_count(),
        links = workflow.link_count(),
        path = %path.display(),
        "workflow saved"
    );
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{ComposedGraph, NodeInstance};
    use crate::identity::CanonicalGraph;
    use crate::links::NodeType;
    use chrono::Utc;

    fn sample_workflow() -> Workflow {
        let mut composed = ComposedGraph::new();
        composed.insert_if_absent("ckpt", NodeInstance::bare(NodeType::CheckpointLoader));
        Workflow {
            name: "persist_test".to_string(),
            description: String::new(),
            version: "1.0.0".to_string(),
            nodes: CanonicalGraph::assign(composed),
            links: Vec::new(),
            groups: Vec::new(),
            config: serde_json::Map::new(),
            created: Utc::now(),
        }
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/wf.json");
        let saved = save(&sample_workflow(), &path).unwrap();
        assert_eq!(saved, path);
        assert!(path.is_file());
    }

    #[test]
    fn saved_file_is_valid_json_with_envelope_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        save(&sample_workflow(), &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(doc.get("meta").is_some());
        assert!(doc.get("nodes").is_some());
        assert_eq!(doc["version"], serde_json::json!(0.4));
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        std::fs::write(&path, "not json").unwrap();
        save(&sample_workflow(), &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
    }
}
