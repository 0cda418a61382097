//! Caller-facing export API.
//!
//! The [`Exporter`] owns the template library and runs the full synchronous
//! pipeline per call: compose → bind → assign identities → infer links →
//! serialize. Each call owns its own graphs; the library is the only shared
//! resource and is read-only.

use crate::bind::Parameters;
use crate::compose::{compose, Capability};
use crate::error::ExportError;
use crate::identity::CanonicalGraph;
use crate::links::infer_links;
use crate::serialize;
use crate::template::TemplateLibrary;
use crate::validate::{self, ValidationReport};
use crate::workflow::Workflow;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default name used when the caller does not pick one.
pub const DEFAULT_WORKFLOW_NAME: &str = "sdxl_character_art";

const DEFAULT_OUTPUT_ROOT: &str = "assets/workflows";

/// A character sheet, as handed over by the (external) character tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub appearance: String,
    #[serde(default)]
    pub equipment: Vec<String>,
}

/// Workflow exporter. Cheap to construct, safe to share across calls.
#[derive(Debug)]
pub struct Exporter {
    library: TemplateLibrary,
    output_root: PathBuf,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    pub fn new() -> Self {
        Self {
            library: TemplateLibrary::builtin(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
        }
    }

    /// Builder: redirect default-path saves (used by tests and embedders).
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// `<output_root>/<name>.json`
    pub fn default_output_path(&self, name: &str) -> PathBuf {
        self.output_root.join(format!("{name}.json"))
    }

    /// Run the pipeline up to (not including) serialization.
    pub fn export_workflow(
        &self,
        name: &str,
        parameters: &Parameters,
        include_controlnet: bool,
        include_refiner: bool,
    ) -> Result<Workflow, ExportError> {
        let mut capabilities = Vec::new();
        if include_controlnet {
            capabilities.push(Capability::Controlnet);
        }
        if include_refiner {
            capabilities.push(Capability::Refiner);
        }

        let composed = compose(&self.library, parameters, &capabilities)?;
        let canonical = CanonicalGraph::assign(composed);
        let links = infer_links(&canonical);

        Ok(Workflow {
            name: name.to_string(),
            description: format!("Generated workflow for {name}"),
            version: "1.0.0".to_string(),
            nodes: canonical,
            links,
            groups: Vec::new(),
            config: serde_json::Map::new(),
            created: Utc::now(),
        })
    }

    /// Persist a workflow to an explicit path.
    pub fn save_workflow(
        &self,
        workflow: &Workflow,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf, ExportError> {
        serialize::save(workflow, path)
    }

    /// Export straight from the app's loosely-typed settings bag and save
    /// to the default path. Capability flags derive from the bag:
    /// lineart or tile guidance enables controlnet, `use_refiner` the
    /// refiner.
    pub fn export_from_app_settings(
        &self,
        bag: &Parameters,
        name: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        let name = name.unwrap_or(DEFAULT_WORKFLOW_NAME);
        let parameters = normalize_app_settings(bag);
        let include_controlnet = flag(bag, "use_lineart") || flag(bag, "use_tile");
        let include_refiner = flag(bag, "use_refiner");

        let workflow =
            self.export_workflow(name, &parameters, include_controlnet, include_refiner)?;
        self.save_workflow(&workflow, self.default_output_path(name))
    }

    /// Export a workflow tuned for one character in one art style, with
    /// both optional capabilities enabled, and save to the default path.
    pub fn export_for_character(
        &self,
        character: &CharacterSheet,
        style: &str,
        base_parameters: &Parameters,
    ) -> Result<PathBuf, ExportError> {
        let mut parameters = base_parameters.clone();
        parameters.insert(
            "positive_prompt".to_string(),
            Value::String(character_prompt(character, style)),
        );
        parameters.insert("style".to_string(), json!(style));
        parameters.insert("character_name".to_string(), json!(character.name));
        parameters.insert("character_race".to_string(), json!(character.race));
        parameters.insert("character_class".to_string(), json!(character.class_name));

        let name = character_workflow_name(character, style);
        let workflow = self.export_workflow(&name, &parameters, true, true)?;
        self.save_workflow(&workflow, self.default_output_path(&name))
    }

    /// Validate a previously written workflow file. Never fails — problems
    /// land in the report.
    pub fn validate_workflow(&self, path: impl AsRef<Path>) -> ValidationReport {
        validate::validate(path)
    }

    /// Export one workflow per (character, style) pair. Failures are
    /// isolated: a failing pair is logged and recorded, the rest of the
    /// batch continues.
    pub fn batch_export(
        &self,
        characters: &[CharacterSheet],
        styles: &[String],
        base_parameters: &Parameters,
    ) -> Vec<Result<PathBuf, ExportError>> {
        let mut results = Vec::with_capacity(characters.len() * styles.len());
        for character in characters {
            for style in styles {
                let result = self.export_for_character(character, style, base_parameters);
                if let Err(e) = &result {
                    warn!(
                        character = %character.name,
                        style = %style,
                        error = %e,
                        "skipping failed workflow export"
                    );
                }
                results.push(result);
            }
        }
        results
    }
}

/// Map the app's setting names onto template placeholder names, filling in
/// the app defaults for anything absent.
fn normalize_app_settings(bag: &Parameters) -> Parameters {
    let mut parameters = Parameters::new();
    let mut put = |key: &str, source: &str, default: Value| {
        parameters.insert(
            key.to_string(),
            bag.get(source).cloned().unwrap_or(default),
        );
    };
    put("positive_prompt", "positive", json!(""));
    put("negative_prompt", "negative", json!(""));
    put("width", "width", json!(896));
    put("height", "height", json!(1120));
    put("steps", "steps", json!(30));
    put("cfg", "cfg", json!(6.5));
    put("seed", "seed", json!(-1));
    put("lineart_weight", "lineart_weight", json!(0.45));
    put("tile_weight", "tile_weight", json!(0.7));
    put("tile_steps", "tile_steps", json!(24));
    put("tile_cfg", "tile_cfg", json!(6.0));
    put("refiner_strength", "refiner_strength", json!(0.25));
    put("refiner_steps", "refiner_steps", json!(20));
    put("refiner_cfg", "refiner_cfg", json!(5.5));
    parameters
}

fn flag(bag: &Parameters, key: &str) -> bool {
    bag.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// `<lowercased name, spaces to underscores>_<style>`
fn character_workflow_name(character: &CharacterSheet, style: &str) -> String {
    let base = if character.name.is_empty() {
        "character".to_string()
    } else {
        character.name.to_lowercase().replace(' ', "_")
    };
    format!("{base}_{style}")
}

/// Assemble the positive prompt from the character sheet plus a fixed
/// per-style suffix.
fn character_prompt(character: &CharacterSheet, style: &str) -> String {
    let mut parts = Vec::new();
    if !character.name.is_empty() {
        parts.push(format!("Character: {}", character.name));
    }
    if !character.race.is_empty() {
        parts.push(format!("Race: {}", character.race));
    }
    if !character.class_name.is_empty() {
        parts.push(format!("Class: {}", character.class_name));
    }
    if !character.appearance.is_empty() {
        parts.push(format!("Appearance: {}", character.appearance));
    }
    if !character.equipment.is_empty() {
        parts.push(format!("Equipment: {}", character.equipment.join(", ")));
    }
    if let Some(suffix) = style_elements(style) {
        parts.push(suffix.to_string());
    }
    parts.join(", ")
}

fn style_elements(style: &str) -> Option<&'static str> {
    match style {
        "fantasy_realistic" => Some(
            "photorealistic fantasy character, detailed armor, magical weapons, \
             dramatic lighting, high quality, professional photography",
        ),
        "epic_fantasy" => Some(
            "epic fantasy character, heroic pose, detailed armor, magical weapons, \
             dramatic lighting, fantasy art style",
        ),
        "dark_fantasy" => Some(
            "dark fantasy character, gothic armor, shadowy lighting, mysterious \
             atmosphere, dark fantasy art",
        ),
        "anime_style" => Some(
            "anime character, manga style, detailed armor, magical weapons, \
             anime art style",
        ),
        "watercolor_fantasy" => Some(
            "watercolor fantasy character, hand-painted style, artistic, detailed \
             armor, magical weapons",
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::NodeType;

    fn scenario_params() -> Parameters {
        let mut p = Parameters::new();
        p.insert("positive_prompt".to_string(), json!("Fantasy warrior"));
        p.insert("negative_prompt".to_string(), json!("blurry"));
        p.insert("width".to_string(), json!(896));
        p.insert("height".to_string(), json!(1120));
        p.insert("steps".to_string(), json!(30));
        p.insert("cfg".to_string(), json!(6.5));
        p.insert("seed".to_string(), json!(12345));
        p
    }

    #[test]
    fn base_export_has_seven_contiguous_ids() {
        let exporter = Exporter::new();
        let wf = exporter
            .export_workflow("test", &scenario_params(), false, false)
            .unwrap();
        assert_eq!(wf.node_count(), 7);
        let ids: Vec<u32> = wf.nodes.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, (1..=7).collect::<Vec<u32>>());
    }

    #[test]
    fn exports_are_idempotent_apart_from_timestamp() {
        let exporter = Exporter::new();
        let params = scenario_params();
        let a = exporter.export_workflow("same", &params, true, true).unwrap();
        let b = exporter.export_workflow("same", &params, true, true).unwrap();
        let doc_a = serde_json::to_value(a.to_document()).unwrap();
        let doc_b = serde_json::to_value(b.to_document()).unwrap();
        assert_eq!(doc_a["nodes"], doc_b["nodes"]);
        assert_eq!(doc_a["links"], doc_b["links"]);
        assert_eq!(doc_a["config"], doc_b["config"]);
    }

    #[test]
    fn controlnet_flag_adds_two_nodes() {
        let exporter = Exporter::new();
        let base = exporter
            .export_workflow("a", &scenario_params(), false, false)
            .unwrap();
        let with_cn = exporter
            .export_workflow("b", &scenario_params(), true, false)
            .unwrap();
        assert_eq!(with_cn.node_count(), base.node_count() + 2);
        assert!(with_cn
            .nodes
            .first_of_type(&NodeType::ControlnetLoader)
            .is_some());
        assert!(with_cn
            .nodes
            .first_of_type(&NodeType::ControlnetApply)
            .is_some());
    }

    #[test]
    fn character_prompt_joins_sheet_and_style() {
        let character = CharacterSheet {
            name: "Thorin Oakenshield".to_string(),
            race: "Dwarf".to_string(),
            class_name: "Fighter".to_string(),
            appearance: "braided beard".to_string(),
            equipment: vec!["warhammer".to_string(), "oak shield".to_string()],
        };
        let prompt = character_prompt(&character, "dark_fantasy");
        assert!(prompt.starts_with("Character: Thorin Oakenshield, Race: Dwarf"));
        assert!(prompt.contains("Equipment: warhammer, oak shield"));
        assert!(prompt.ends_with("dark fantasy art"));
        // Unknown styles contribute no suffix.
        let bare = character_prompt(&character, "cubist");
        assert!(bare.ends_with("oak shield"));
    }

    #[test]
    fn character_workflow_name_is_lowercased_and_underscored() {
        let character = CharacterSheet {
            name: "Thorin Oakenshield".to_string(),
            ..Default::default()
        };
        assert_eq!(
            character_workflow_name(&character, "epic_fantasy"),
            "thorin_oakenshield_epic_fantasy"
        );
        assert_eq!(
            character_workflow_name(&CharacterSheet::default(), "epic_fantasy"),
            "character_epic_fantasy"
        );
    }

    #[test]
    fn app_settings_normalization_applies_defaults() {
        let mut bag = Parameters::new();
        bag.insert("positive".to_string(), json!("a hero"));
        bag.insert("use_refiner".to_string(), json!(true));
        let params = normalize_app_settings(&bag);
        assert_eq!(params["positive_prompt"], json!("a hero"));
        assert_eq!(params["negative_prompt"], json!(""));
        assert_eq!(params["width"], json!(896));
        assert_eq!(params["height"], json!(1120));
        assert_eq!(params["seed"], json!(-1));
        assert_eq!(params["refiner_strength"], json!(0.25));
        assert!(flag(&bag, "use_refiner"));
        assert!(!flag(&bag, "use_lineart"));
    }
}
