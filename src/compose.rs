//! Fragment selection and first-writer-wins merge.

use crate::bind::{bind_settings, Parameters};
use crate::error::ExportError;
use crate::links::NodeType;
use crate::template::{NodeTemplate, TemplateLibrary, BASE_TEMPLATE};
use serde_json::Value;
use tracing::debug;

/// Optional pipeline capabilities, merged in this declaration order:
/// controlnet before refiner, always after the mandatory base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Controlnet,
    Refiner,
}

impl Capability {
    /// Fixed merge order.
    pub const ALL: [Capability; 2] = [Capability::Controlnet, Capability::Refiner];

    pub fn template_name(&self) -> &'static str {
        match self {
            Capability::Controlnet => crate::template::CONTROLNET_TEMPLATE,
            Capability::Refiner => crate::template::REFINER_TEMPLATE,
        }
    }
}

/// A node with resolved settings. Input bindings stay unresolved here; they
/// are carried verbatim to the wire and links are inferred from types, not
/// from these bindings.
#[derive(Debug, Clone)]
pub struct NodeInstance {
    pub node_type: NodeType,
    pub inputs: Vec<(String, String)>,
    pub outputs: Vec<String>,
    pub settings: serde_json::Map<String, Value>,
}

impl NodeInstance {
    fn from_template(template: &NodeTemplate, parameters: &Parameters) -> Self {
        Self {
            node_type: template.node_type.clone(),
            inputs: template.inputs.clone(),
            outputs: template.outputs.clone(),
            settings: bind_settings(&template.settings, parameters),
        }
    }

    #[cfg(test)]
    pub fn bare(node_type: NodeType) -> Self {
        Self {
            node_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
            settings: serde_json::Map::new(),
        }
    }
}

/// Insertion-ordered node map owned by a single export call.
///
/// The only mutator is `insert_if_absent`: a key written by an earlier
/// fragment is never overwritten by a later one.
#[derive(Debug, Default)]
pub struct ComposedGraph {
    entries: Vec<(String, NodeInstance)>,
}

impl ComposedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// First writer wins. Returns whether the node was inserted.
    pub fn insert_if_absent(&mut self, key: &str, node: NodeInstance) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.entries.push((key.to_string(), node));
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nodes in insertion order.
    pub fn into_entries(self) -> Vec<(String, NodeInstance)> {
        self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeInstance)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), n))
    }
}

/// Merge the mandatory base fragment plus the requested capabilities into
/// one composed graph, binding each node's settings with the full parameter
/// set before insertion.
///
/// Structural validation is deferred entirely to the workflow validator.
pub fn compose(
    library: &TemplateLibrary,
    parameters: &Parameters,
    capabilities: &[Capability],
) -> Result<ComposedGraph, ExportError> {
    let mut graph = ComposedGraph::new();

    let base = library.get(BASE_TEMPLATE)?;
    for (key, template) in base.nodes() {
        graph.insert_if_absent(key, NodeInstance::from_template(template, parameters));
    }

    for capability in Capability::ALL {
        if !capabilities.contains(&capability) {
            continue;
        }
        let name = capability.template_name();
        let fragment = library
            .get(name)
            .map_err(|_| ExportError::UnknownCapability(name.to_string()))?;
        let mut inserted = 0usize;
        for (key, template) in fragment.nodes() {
            if graph.insert_if_absent(key, NodeInstance::from_template(template, parameters)) {
                inserted += 1;
            }
        }
        debug!(fragment = name, inserted, "merged capability fragment");
    }

    Ok(graph)
}
