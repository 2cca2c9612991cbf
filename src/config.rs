//! Conversion options and their YAML configuration file.
//!
//! A configuration file is a single YAML mapping. It is checked against
//! [`BUILTIN_SCHEMA`] (or a caller-supplied schema) before any value is read.

use std::fs;
use std::path::Path;

use jsonschema::validator_for;
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};
use tracing::debug;
use yaml_rust2::{Yaml, YamlLoader, yaml::Hash};

use crate::{Md2mdocError, Result};

pub const BUILTIN_SCHEMA: &str = include_str!("../data/config_schema.yml");

/// Knobs that shape the generated macros without changing the dispatch rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Initial (and restored) value of the whitespace-stripping mode.
    pub strip_leading_whitespace: bool,
    /// Width argument of `.Bl -tag -width`.
    pub list_width: String,
    /// Offset argument of `.Bd -literal -offset`.
    pub display_offset: String,
    /// Whether an `OPTIONS` heading opens a tag list on its own.
    pub options_opens_list: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            strip_leading_whitespace: true,
            list_width: "Ds".to_string(),
            display_offset: "indent".to_string(),
            options_opens_list: true,
        }
    }
}

impl ConvertOptions {
    /// Parse a configuration document, validating it against the built-in schema.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::from_yaml_str_with_schema(yaml, BUILTIN_SCHEMA)
    }

    pub fn from_yaml_str_with_schema(yaml: &str, schema_source: &str) -> Result<Self> {
        let docs =
            YamlLoader::load_from_str(yaml).map_err(|err| Md2mdocError::Yaml(err.to_string()))?;
        let Some(document) = docs.first() else {
            debug!("empty configuration document, using defaults");
            return Ok(Self::default());
        };
        validate_document(document, schema_source)?;

        let config = ensure_mapping(document, "configuration root")?;
        let defaults = Self::default();
        Ok(Self {
            strip_leading_whitespace: map_get_bool(config, "strip_leading_whitespace")?
                .unwrap_or(defaults.strip_leading_whitespace),
            list_width: map_get_string(config, "list_width")?.unwrap_or(defaults.list_width),
            display_offset: map_get_string(config, "display_offset")?
                .unwrap_or(defaults.display_offset),
            options_opens_list: map_get_bool(config, "options_opens_list")?
                .unwrap_or(defaults.options_opens_list),
        })
    }
}

/// Read and parse a configuration file. `schema_path` replaces the built-in schema.
pub fn load_config<P: AsRef<Path>>(path: P, schema_path: Option<&Path>) -> Result<ConvertOptions> {
    let yaml = fs::read_to_string(path.as_ref())?;
    match schema_path {
        Some(schema_path) => {
            let schema_source = fs::read_to_string(schema_path)
                .map_err(|err| Md2mdocError::Schema(err.to_string()))?;
            ConvertOptions::from_yaml_str_with_schema(&yaml, &schema_source)
        }
        None => ConvertOptions::from_yaml_str(&yaml),
    }
}

pub fn validate_config_with_schema<P: AsRef<Path>>(yaml: &str, schema_path: P) -> Result<()> {
    let schema_source = fs::read_to_string(schema_path.as_ref())
        .map_err(|err| Md2mdocError::Schema(err.to_string()))?;
    validate_config_with_schema_str(yaml, &schema_source)
}

pub fn validate_config_with_schema_str(yaml: &str, schema_source: &str) -> Result<()> {
    let docs =
        YamlLoader::load_from_str(yaml).map_err(|err| Md2mdocError::Yaml(err.to_string()))?;
    let document = docs
        .first()
        .ok_or_else(|| Md2mdocError::Yaml("empty yaml document".to_string()))?;
    validate_document(document, schema_source)
}

fn validate_document(document: &Yaml, schema_source: &str) -> Result<()> {
    let schema_docs = YamlLoader::load_from_str(schema_source)
        .map_err(|err| Md2mdocError::Schema(err.to_string()))?;
    let schema_yaml = schema_docs
        .first()
        .ok_or_else(|| Md2mdocError::Schema("empty schema document".to_string()))?;
    let schema_json = yaml_to_json(schema_yaml);
    let instance_json = yaml_to_json(document);
    let validator =
        validator_for(&schema_json).map_err(|err| Md2mdocError::Schema(err.to_string()))?;
    validator
        .validate(&instance_json)
        .map_err(|err| Md2mdocError::Schema(err.to_string()))
}

fn ensure_mapping<'a>(value: &'a Yaml, context: &str) -> Result<&'a Hash> {
    value
        .as_hash()
        .ok_or_else(|| Md2mdocError::Config(format!("expected mapping for {context}")))
}

fn map_get_string(map: &Hash, key: &str) -> Result<Option<String>> {
    match map.get(&Yaml::String(key.to_string())) {
        None | Some(Yaml::Null) => Ok(None),
        Some(Yaml::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(Md2mdocError::Config(format!(
            "option '{key}' must be a string, found {}",
            describe_value(other)
        ))),
    }
}

fn map_get_bool(map: &Hash, key: &str) -> Result<Option<bool>> {
    match map.get(&Yaml::String(key.to_string())) {
        None | Some(Yaml::Null) => Ok(None),
        Some(Yaml::Boolean(value)) => Ok(Some(*value)),
        Some(other) => Err(Md2mdocError::Config(format!(
            "option '{key}' must be a boolean, found {}",
            describe_value(other)
        ))),
    }
}

fn describe_value(value: &Yaml) -> String {
    match value {
        Yaml::Boolean(value) => format!("boolean `{value}`"),
        Yaml::Integer(value) => format!("number `{value}`"),
        Yaml::Real(value) => format!("number `{value}`"),
        Yaml::String(value) => format!("string `{value}`"),
        Yaml::Array(items) => format!("list of {} item(s)", items.len()),
        Yaml::Hash(_) => "nested mapping".to_string(),
        Yaml::Null | Yaml::Alias(_) | Yaml::BadValue => "unresolved value".to_string(),
    }
}

fn yaml_key_to_string(value: &Yaml) -> String {
    match value {
        Yaml::String(value) | Yaml::Real(value) => value.clone(),
        Yaml::Integer(value) => value.to_string(),
        Yaml::Boolean(value) => value.to_string(),
        Yaml::Null => "null".to_string(),
        other => describe_value(other),
    }
}

fn yaml_to_json(value: &Yaml) -> JsonValue {
    match value {
        Yaml::Null => JsonValue::Null,
        Yaml::Boolean(value) => JsonValue::Bool(*value),
        Yaml::Integer(value) => JsonValue::Number(JsonNumber::from(*value)),
        Yaml::Real(value) => value
            .parse::<f64>()
            .ok()
            .and_then(JsonNumber::from_f64)
            .map_or_else(|| JsonValue::String(value.clone()), JsonValue::Number),
        Yaml::String(value) => JsonValue::String(value.clone()),
        Yaml::Array(values) => JsonValue::Array(values.iter().map(yaml_to_json).collect()),
        Yaml::Hash(map) => {
            let mut out = JsonMap::new();
            for (key, value) in map {
                out.insert(yaml_key_to_string(key), yaml_to_json(value));
            }
            JsonValue::Object(out)
        }
        Yaml::Alias(alias) => JsonValue::String(format!("*{alias}")),
        Yaml::BadValue => JsonValue::String("!!badvalue".to_string()),
    }
}
