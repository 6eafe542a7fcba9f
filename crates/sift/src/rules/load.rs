//! Loading rulesets from JSON

use log::info;
use std::path::Path;

use super::model::RuleSet;
use crate::error::RulesError;

/// Parse rulesets from a JSON string holding one ruleset or a list of them
///
/// A missing mode, conditions or actions key, or a condition without
/// field/predicate/value, rejects the whole document.
pub fn parse_rulesets(json: &str) -> Result<Vec<RuleSet>, RulesError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

/// Load rulesets from a JSON file
pub fn load_rulesets(path: &Path) -> Result<Vec<RuleSet>, RulesError> {
    let content = std::fs::read_to_string(path).map_err(|source| RulesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let rulesets = parse_rulesets(&content)?;
    info!("Loaded {} ruleset(s) from {}", rulesets.len(), path.display());
    Ok(rulesets)
}
