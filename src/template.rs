//! Immutable workflow fragments (capability templates).
//!
//! The library is populated once at construction with the builtin fragments
//! and never mutated afterwards, so it is safe to share across export calls
//! without locking.

use crate::error::ExportError;
use crate::links::NodeType;
use serde_json::{json, Value};
use std::collections::HashMap;

/// One setting value in a node template: either a literal passed through to
/// the wire untouched, or a `{{name}}` placeholder resolved against the
/// caller's parameters at composition time.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Literal(Value),
    Placeholder(String),
}

impl SettingValue {
    /// Classify a raw value. Only strings of the exact form `{{name}}` are
    /// placeholders; everything else (including strings that merely contain
    /// braces) is a literal.
    pub fn from_value(value: Value) -> Self {
        if let Value::String(s) = &value {
            if let Some(inner) = s.strip_prefix("{{").and_then(|r| r.strip_suffix("}}")) {
                if !inner.is_empty() && !inner.contains("{{") {
                    return SettingValue::Placeholder(inner.to_string());
                }
            }
        }
        SettingValue::Literal(value)
    }

    /// The verbatim wire form of an unresolved placeholder.
    pub fn verbatim(&self) -> Value {
        match self {
            SettingValue::Literal(v) => v.clone(),
            SettingValue::Placeholder(name) => Value::String(format!("{{{{{name}}}}}")),
        }
    }
}

/// A single node within a fragment: type tag, input bindings that reference
/// another node's output slot as `key.OUTPUT_NAME`, ordered output slot
/// names, and settings.
#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub node_type: NodeType,
    pub inputs: Vec<(String, String)>,
    pub outputs: Vec<String>,
    pub settings: Vec<(String, SettingValue)>,
}

impl NodeTemplate {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
            settings: Vec::new(),
        }
    }

    pub fn input(mut self, slot: &str, binding: &str) -> Self {
        self.inputs.push((slot.to_string(), binding.to_string()));
        self
    }

    pub fn outputs(mut self, names: &[&str]) -> Self {
        self.outputs = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn setting(mut self, name: &str, value: Value) -> Self {
        self.settings
            .push((name.to_string(), SettingValue::from_value(value)));
        self
    }
}

/// A named, immutable graph fragment. Node order is declaration order and
/// is load-bearing: identity assignment later follows it.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub description: String,
    nodes: Vec<(String, NodeTemplate)>,
}

impl Template {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            nodes: Vec::new(),
        }
    }

    fn node(mut self, key: &str, node: NodeTemplate) -> Self {
        debug_assert!(
            !self.nodes.iter().any(|(k, _)| k == key),
            "duplicate node key in template: {key}"
        );
        self.nodes.push((key.to_string(), node));
        self
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeTemplate)> {
        self.nodes.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Fragment name of the mandatory text-to-image base.
pub const BASE_TEMPLATE: &str = "sdxl_base";
/// Fragment name of the controlnet augmentation.
pub const CONTROLNET_TEMPLATE: &str = "sdxl_with_controlnet";
/// Fragment name of the refiner augmentation.
pub const REFINER_TEMPLATE: &str = "sdxl_with_refiner";

/// Read-only registry of the builtin fragments.
#[derive(Debug)]
pub struct TemplateLibrary {
    templates: HashMap<String, Template>,
}

impl TemplateLibrary {
    /// Build the library with the three builtin fragments.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        for template in [base_template(), controlnet_template(), refiner_template()] {
            templates.insert(template.name.clone(), template);
        }
        Self { templates }
    }

    pub fn get(&self, name: &str) -> Result<&Template, ExportError> {
        self.templates
            .get(name)
            .ok_or_else(|| ExportError::TemplateNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

fn base_template() -> Template {
    Template::new(BASE_TEMPLATE, "Basic SDXL text-to-image generation")
        .node(
            "checkpoint_loader",
            NodeTemplate::new(NodeType::CheckpointLoader)
                .outputs(&["MODEL", "CLIP", "VAE"])
                .setting("ckpt_name", json!("stabilityai/stable-diffusion-xl-base-1.0")),
        )
        .node(
            "positive_prompt",
            NodeTemplate::new(NodeType::PositiveConditioningEncoder)
                .input("clip", "checkpoint_loader.CLIP")
                .outputs(&["CONDITIONING"])
                .setting("text", json!("{{positive_prompt}}")),
        )
        .node(
            "negative_prompt",
            NodeTemplate::new(NodeType::NegativeConditioningEncoder)
                .input("clip", "checkpoint_loader.CLIP")
                .outputs(&["CONDITIONING"])
                .setting("text", json!("{{negative_prompt}}")),
        )
        .node(
            "empty_latent",
            NodeTemplate::new(NodeType::EmptyLatentSource)
                .outputs(&["LATENT"])
                .setting("width", json!("{{width}}"))
                .setting("height", json!("{{height}}"))
                .setting("batch_size", json!(1)),
        )
        .node(
            "ksampler",
            NodeTemplate::new(NodeType::Sampler)
                .input("model", "checkpoint_loader.MODEL")
                .input("positive", "positive_prompt.CONDITIONING")
                .input("negative", "negative_prompt.CONDITIONING")
                .input("latent_image", "empty_latent.LATENT")
                .outputs(&["LATENT"])
                .setting("seed", json!("{{seed}}"))
                .setting("steps", json!("{{steps}}"))
                .setting("cfg", json!("{{cfg}}"))
                .setting("sampler_name", json!("euler"))
                .setting("scheduler", json!("normal"))
                .setting("denoise", json!(1.0)),
        )
        .node(
            "vae_decode",
            NodeTemplate::new(NodeType::Decoder)
                .input("samples", "ksampler.LATENT")
                .input("vae", "checkpoint_loader.VAE")
                .outputs(&["IMAGE"]),
        )
        .node(
            "save_image",
            NodeTemplate::new(NodeType::SaveOutput)
                .input("images", "vae_decode.IMAGE")
                .setting("filename_prefix", json!("character_art")),
        )
}

fn controlnet_template() -> Template {
    Template::new(CONTROLNET_TEMPLATE, "SDXL generation with Line-Art ControlNet")
        .node(
            "checkpoint_loader",
            NodeTemplate::new(NodeType::CheckpointLoader)
                .outputs(&["MODEL", "CLIP", "VAE"])
                .setting("ckpt_name", json!("stabilityai/stable-diffusion-xl-base-1.0")),
        )
        .node(
            "controlnet_loader",
            NodeTemplate::new(NodeType::ControlnetLoader)
                .outputs(&["CONTROL_NET"])
                .setting(
                    "control_net_name",
                    json!("diffusers/controlnet-lineart-sdxl-1.0"),
                ),
        )
        .node(
            "controlnet_apply",
            NodeTemplate::new(NodeType::ControlnetApply)
                .input("conditioning", "positive_prompt.CONDITIONING")
                .input("control_net", "controlnet_loader.CONTROL_NET")
                .input("image", "controlnet_image.IMAGE")
                .outputs(&["CONDITIONING"])
                .setting("strength", json!(0.45)),
        )
}

fn refiner_template() -> Template {
    Template::new(REFINER_TEMPLATE, "SDXL generation with refiner enhancement")
        .node(
            "refiner_checkpoint",
            NodeTemplate::new(NodeType::CheckpointLoader)
                .outputs(&["MODEL", "CLIP", "VAE"])
                .setting(
                    "ckpt_name",
                    json!("stabilityai/stable-diffusion-xl-refiner-1.0"),
                ),
        )
        .node(
            "refiner_sampler",
            NodeTemplate::new(NodeType::Sampler)
                .input("model", "refiner_checkpoint.MODEL")
                .input("positive", "positive_prompt.CONDITIONING")
                .input("negative", "negative_prompt.CONDITIONING")
                .input("latent_image", "ksampler.LATENT")
                .outputs(&["LATENT"])
                .setting("seed", json!("{{seed}}"))
                .setting("steps", json!("{{refiner_steps}}"))
                .setting("cfg", json!("{{refiner_cfg}}"))
                .setting("sampler_name", json!("euler"))
                .setting("scheduler", json!("normal"))
                .setting("denoise", json!("{{refiner_strength}}")),
        )
}
