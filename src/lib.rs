//! Workflow-graph export for the character art generation pipeline.
//!
//! Converts a flat set of generation parameters and capability flags into a
//! directed graph of typed nodes, assigns canonical sequential identities,
//! infers data-flow links from node types, and serializes the result into
//! the ComfyUI wire format. The companion validator independently re-opens
//! any workflow file and checks its structural health.
//!
//! The pipeline is fully synchronous: compose → bind → assign → infer →
//! serialize, with no shared mutable state between calls. The template
//! library is built once and read-only thereafter.
//!
//! ```no_run
//! use comfyui_export::{Exporter, Parameters};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), comfyui_export::ExportError> {
//! let exporter = Exporter::new();
//! let mut params = Parameters::new();
//! params.insert("positive_prompt".to_string(), json!("Fantasy warrior"));
//! params.insert("seed".to_string(), json!(12345));
//!
//! let workflow = exporter.export_workflow("warrior", &params, false, false)?;
//! let path = exporter.save_workflow(&workflow, "assets/workflows/warrior.json")?;
//! let report = exporter.validate_workflow(&path);
//! assert!(report.valid);
//! # Ok(())
//! # }
//! ```

pub mod bind;
pub mod compose;
pub mod error;
pub mod export;
pub mod identity;
pub mod links;
pub mod serialize;
pub mod template;
pub mod validate;
pub mod workflow;

pub use bind::Parameters;
pub use compose::Capability;
pub use error::ExportError;
pub use export::{CharacterSheet, Exporter, DEFAULT_WORKFLOW_NAME};
pub use links::NodeType;
pub use template::TemplateLibrary;
pub use validate::ValidationReport;
pub use workflow::{DataKind, Link, Workflow};
