//! Placeholder resolution for template settings.

use crate::template::SettingValue;
use serde_json::Value;

/// Caller-supplied generation parameters, keyed by placeholder name.
pub type Parameters = serde_json::Map<String, Value>;

/// Resolve a settings template against caller parameters.
///
/// A `Placeholder(name)` takes the value of `parameters[name]` when present;
/// when the parameter is absent the literal `{{name}}` string is emitted
/// unchanged (preserved behavior — absence is not an error). Literals pass
/// through untouched. Pure function.
pub fn bind_settings(
    settings: &[(String, SettingValue)],
    parameters: &Parameters,
) -> serde_json::Map<String, Value> {
    let mut resolved = serde_json::Map::new();
    for (name, value) in settings {
        let bound = match value {
            SettingValue::Placeholder(param) => parameters
                .get(param)
                .cloned()
                .unwrap_or_else(|| value.verbatim()),
            SettingValue::Literal(v) => v.clone(),
        };
        resolved.insert(name.clone(), bound);
    }
    resolved
}
