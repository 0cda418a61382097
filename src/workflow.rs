//! The exported workflow and its wire-format envelope.

use crate::compose::NodeInstance;
use crate::identity::CanonicalGraph;
use crate::links::NodeType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// Version of the wire envelope understood by the consuming tool.
pub const WIRE_VERSION: f64 = 0.4;

/// What flows across a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Model,
    Conditioning,
    Latent,
    Vae,
    Image,
    ControlNet,
}

impl DataKind {
    /// Numeric code carried in the wire row next to the name.
    pub fn code(&self) -> u32 {
        match self {
            DataKind::Model => 0,
            DataKind::Conditioning => 1,
            DataKind::Latent => 2,
            DataKind::Vae => 3,
            DataKind::Image => 4,
            DataKind::ControlNet => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataKind::Model => "MODEL",
            DataKind::Conditioning => "CONDITIONING",
            DataKind::Latent => "LATENT",
            DataKind::Vae => "VAE",
            DataKind::Image => "IMAGE",
            DataKind::ControlNet => "CONTROL_NET",
        }
    }
}

/// A directed edge between two canonical node slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub origin_id: u32,
    pub origin_slot: u32,
    pub dest_id: u32,
    pub dest_slot: u32,
    pub kind: DataKind,
}

impl Link {
    /// Six-element wire row:
    /// `[origin, origin_slot, kind_code, dest, dest_slot, kind_name]`.
    pub fn to_wire(&self) -> Value {
        json!([
            self.origin_id,
            self.origin_slot,
            self.kind.code(),
            self.dest_id,
            self.dest_slot,
            self.kind.name(),
        ])
    }
}

/// A fully composed, canonically addressed workflow. Created per export
/// call and discarded after serialization.
#[derive(Debug)]
pub struct Workflow {
    pub name: String,
    pub description: String,
    pub version: String,
    pub nodes: CanonicalGraph,
    pub links: Vec<Link>,
    pub groups: Vec<Value>,
    pub config: serde_json::Map<String, Value>,
    pub created: DateTime<Utc>,
}

impl Workflow {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Render the canonical wire envelope. Node keys are the decimal string
    /// forms of the sequential ids, emitted in id order.
    pub fn to_document(&self) -> WorkflowDocument {
        let mut nodes = serde_json::Map::new();
        for (id, node) in self.nodes.iter() {
            nodes.insert(id.to_string(), wire_node(node));
        }
        WorkflowDocument {
            meta: WorkflowMeta {
                title: self.name.clone(),
                description: self.description.clone(),
                version: self.version.clone(),
                created: self.created.to_rfc3339(),
            },
            nodes,
            links: self.links.iter().map(Link::to_wire).collect(),
            groups: self.groups.clone(),
            config: self.config.clone(),
            extra: json!({"ds": {"scale": 1, "offset": [0, 0]}}),
            version: WIRE_VERSION,
        }
    }
}

fn wire_node(node: &NodeInstance) -> Value {
    let mut inputs = serde_json::Map::new();
    for (slot, binding) in &node.inputs {
        inputs.insert(slot.clone(), Value::String(binding.clone()));
    }
    json!({
        "type": node.node_type.as_tag(),
        "inputs": inputs,
        "outputs": node.outputs,
        "settings": node.settings,
    })
}

/// Workflow provenance block of the envelope.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowMeta {
    pub title: String,
    pub description: String,
    pub version: String,
    pub created: String,
}

/// The serialized envelope, field order matching the wire format.
#[derive(Debug, Serialize)]
pub struct WorkflowDocument {
    pub meta: WorkflowMeta,
    pub nodes: serde_json::Map<String, Value>,
    pub links: Vec<Value>,
    pub groups: Vec<Value>,
    pub config: serde_json::Map<String, Value>,
    pub extra: Value,
    pub version: f64,
}

/// Convenience used by tests and callers probing a wire node's type tag.
pub fn node_type_of(wire_node: &Value) -> NodeType {
    wire_node
        .get("type")
        .and_then(Value::as_str)
        .map(NodeType::from_tag)
        .unwrap_or_else(|| NodeType::Unrecognized(String::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{ComposedGraph, NodeInstance};

    fn sample_workflow() -> Workflow {
        let mut composed = ComposedGraph::new();
        composed.insert_if_absent("ckpt", NodeInstance::bare(NodeType::CheckpointLoader));
        composed.insert_if_absent("sampler", NodeInstance::bare(NodeType::Sampler));
        Workflow {
            name: "test".to_string(),
            description: "test workflow".to_string(),
            version: "1.0.0".to_string(),
            nodes: CanonicalGraph::assign(composed),
            links: vec![Link {
                origin_id: 1,
                origin_slot: 0,
                dest_id: 2,
                dest_slot: 0,
                kind: DataKind::Model,
            }],
            groups: Vec::new(),
            config: serde_json::Map::new(),
            created: Utc::now(),
        }
    }

    #[test]
    fn wire_row_shape() {
        let wf = sample_workflow();
        let row = wf.links[0].to_wire();
        assert_eq!(row, json!([1, 0, 0, 2, 0, "MODEL"]));
    }

    #[test]
    fn document_keys_are_decimal_ids_in_order() {
        let doc = sample_workflow().to_document();
        let keys: Vec<_> = doc.nodes.keys().collect();
        assert_eq!(keys, vec!["1", "2"]);
        assert_eq!(node_type_of(&doc.nodes["2"]), NodeType::Sampler);
    }

    #[test]
    fn envelope_carries_fixed_extra_and_version() {
        let doc = sample_workflow().to_document();
        assert_eq!(doc.version, WIRE_VERSION);
        assert_eq!(doc.extra, json!({"ds": {"scale": 1, "offset": [0, 0]}}));
        let rendered = serde_json::to_value(&doc).unwrap();
        assert_eq!(rendered["meta"]["title"], json!("test"));
        assert!(rendered["meta"]["created"].as_str().unwrap().contains('T'));
    }
}
