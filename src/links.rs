//! Node type tags and type-driven link inference.
//!
//! Link inference is deliberately driven by node *type*, not by the declared
//! input bindings: each recognized type carries a fixed expected-slot
//! pattern, and the origin of each expected input is the lowest-id node of
//! the producing type. Unrecognized types contribute no links — inference
//! is total and an unlinked node is a valid (if degenerate) outcome.

use crate::identity::CanonicalGraph;
use crate::workflow::{DataKind, Link};
use serde::{Deserialize, Serialize};

/// Closed enumeration of the wire-format type tags.
///
/// Tags outside the closed set round-trip through `Unrecognized` instead of
/// failing deserialization or silently collapsing onto a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    CheckpointLoader,
    PositiveConditioningEncoder,
    NegativeConditioningEncoder,
    EmptyLatentSource,
    Sampler,
    Decoder,
    SaveOutput,
    ControlnetLoader,
    ControlnetApply,
    Unrecognized(String),
}

impl NodeType {
    pub fn as_tag(&self) -> &str {
        match self {
            NodeType::CheckpointLoader => "checkpoint-loader",
            NodeType::PositiveConditioningEncoder => "positive-conditioning-encoder",
            NodeType::NegativeConditioningEncoder => "negative-conditioning-encoder",
            NodeType::EmptyLatentSource => "empty-latent-source",
            NodeType::Sampler => "sampler",
            NodeType::Decoder => "decoder",
            NodeType::SaveOutput => "save-output",
            NodeType::ControlnetLoader => "controlnet-loader",
            NodeType::ControlnetApply => "controlnet-apply",
            NodeType::Unrecognized(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "checkpoint-loader" => NodeType::CheckpointLoader,
            "positive-conditioning-encoder" => NodeType::PositiveConditioningEncoder,
            "negative-conditioning-encoder" => NodeType::NegativeConditioningEncoder,
            "empty-latent-source" => NodeType::EmptyLatentSource,
            "sampler" => NodeType::Sampler,
            "decoder" => NodeType::Decoder,
            "save-output" => NodeType::SaveOutput,
            "controlnet-loader" => NodeType::ControlnetLoader,
            "controlnet-apply" => NodeType::ControlnetApply,
            other => NodeType::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        NodeType::from_tag(&tag)
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        node_type.as_tag().to_string()
    }
}

/// One entry in a type's expected-slot pattern.
struct ExpectedInput {
    dest_slot: u32,
    kind: DataKind,
    origin_type: NodeType,
    origin_slot: u32,
}

/// The closed type → expected-slot-pattern table. Types absent here expect
/// nothing.
fn expected_inputs(node_type: &NodeType) -> Vec<ExpectedInput> {
    match node_type {
        // A sampler always consumes model, positive conditioning, negative
        // conditioning, and a latent, in that slot order.
        NodeType::Sampler => vec![
            ExpectedInput {
                dest_slot: 0,
                kind: DataKind::Model,
                origin_type: NodeType::CheckpointLoader,
                origin_slot: 0,
            },
            ExpectedInput {
                dest_slot: 1,
                kind: DataKind::Conditioning,
                origin_type: NodeType::PositiveConditioningEncoder,
                origin_slot: 0,
            },
            ExpectedInput {
                dest_slot: 2,
                kind: DataKind::Conditioning,
                origin_type: NodeType::NegativeConditioningEncoder,
                origin_slot: 0,
            },
            ExpectedInput {
                dest_slot: 3,
                kind: DataKind::Latent,
                origin_type: NodeType::EmptyLatentSource,
                origin_slot: 0,
            },
        ],
        // A decoder consumes the sampled latent plus the checkpoint's VAE
        // (output slot 2 on the loader).
        NodeType::Decoder => vec![
            ExpectedInput {
                dest_slot: 0,
                kind: DataKind::Latent,
                origin_type: NodeType::Sampler,
                origin_slot: 0,
            },
            ExpectedInput {
                dest_slot: 1,
                kind: DataKind::Vae,
                origin_type: NodeType::CheckpointLoader,
                origin_slot: 2,
            },
        ],
        _ => Vec::new(),
    }
}

/// Derive the data-flow edges for a canonical graph.
///
/// Total: a missing origin type simply yields no link for that slot.
pub fn infer_links(graph: &CanonicalGraph) -> Vec<Link> {
    let mut links = Vec::new();
    for (id, node) in graph.iter() {
        for expected in expected_inputs(&node.node_type) {
            if let Some(origin_id) = graph.first_of_type(&expected.origin_type) {
                links.push(Link {
                    origin_id,
                    origin_slot: expected.origin_slot,
                    dest_id: id,
                    dest_slot: expected.dest_slot,
                    kind: expected.kind,
                });
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{ComposedGraph, NodeInstance};

    fn graph_of(types: &[(&str, NodeType)]) -> CanonicalGraph {
        let mut composed = ComposedGraph::new();
        for (key, node_type) in types {
            composed.insert_if_absent(key, NodeInstance::bare(node_type.clone()));
        }
        CanonicalGraph::assign(composed)
    }

    #[test]
    fn tag_round_trip() {
        for tag in [
            "checkpoint-loader",
            "positive-conditioning-encoder",
            "negative-conditioning-encoder",
            "empty-latent-source",
            "sampler",
            "decoder",
            "save-output",
            "controlnet-loader",
            "controlnet-apply",
        ] {
            assert_eq!(NodeType::from_tag(tag).as_tag(), tag);
        }
    }

    #[test]
    fn unknown_tag_is_unrecognized_not_error() {
        let t = NodeType::from_tag("upscaler");
        assert_eq!(t, NodeType::Unrecognized("upscaler".to_string()));
        assert_eq!(t.as_tag(), "upscaler");
    }

    #[test]
    fn sampler_links_follow_fixed_slot_order() {
        let graph = graph_of(&[
            ("ckpt", NodeType::CheckpointLoader),
            ("pos", NodeType::PositiveConditioningEncoder),
            ("neg", NodeType::NegativeConditioningEncoder),
            ("latent", NodeType::EmptyLatentSource),
            ("sampler", NodeType::Sampler),
        ]);
        let links = infer_links(&graph);
        assert_eq!(links.len(), 4);
        let dest_slots: Vec<u32> = links.iter().map(|l| l.dest_slot).collect();
        assert_eq!(dest_slots, vec![0, 1, 2, 3]);
        // Model comes from the checkpoint loader (id 1, slot 0).
        assert_eq!(links[0].origin_id, 1);
        assert_eq!(links[0].origin_slot, 0);
        assert_eq!(links[0].kind, DataKind::Model);
    }

    #[test]
    fn decoder_pulls_vae_from_loader_slot_two() {
        let graph = graph_of(&[
            ("ckpt", NodeType::CheckpointLoader),
            ("sampler", NodeType::Sampler),
            ("decode", NodeType::Decoder),
        ]);
        let links = infer_links(&graph);
        let vae = links
            .iter()
            .find(|l| l.kind == DataKind::Vae)
            .expect("vae link");
        assert_eq!(vae.origin_id, 1);
        assert_eq!(vae.origin_slot, 2);
        assert_eq!(vae.dest_slot, 1);
    }

    #[test]
    fn unrecognized_and_unmatched_types_yield_no_links() {
        let graph = graph_of(&[
            ("a", NodeType::Unrecognized("upscaler".to_string())),
            ("b", NodeType::SaveOutput),
            // A sampler with no producers in the graph links to nothing.
            ("c", NodeType::Sampler),
        ]);
        assert!(infer_links(&graph).is_empty());
    }
}
