//! Configuration files.
//!
//! A configuration maps Vensim variable names to the description of their
//! cellranges. JSON and YAML documents share one shape and one schema:
//!
//! ```yaml
//! var1:
//!   type: constants
//!   dims: [source, destination]
//!   cell: A24
//!   sheet: Region1
//!   file: inputs.xlsx
//!   dimensions:
//!     source: [col]
//!     destination: [row, 17]
//! ```

use crate::error::{E2vError, E2vResult};
use crate::subscripts::SubscriptRegistry;
use crate::types::{ExternalVariable, Loading, ReadAlong, SeriesDescriptor, Step, VariableKind};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

const VARIABLE_TYPES: &str = "It must be 'constants', 'lookups' or 'data'.";

/// Serialization of a configuration file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> E2vResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml" | "yml") => Ok(ConfigFormat::Yaml),
            _ => Err(E2vError::config(format!(
                "when parsing '{}'\nThe config file name must be a JSON (.json) or YAML (.yaml, .yml) file",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    name: String,
    cell: String,
    read_along: String,
    length: u32,
}

#[derive(Debug, Deserialize)]
struct VariableEntry {
    #[serde(rename = "type")]
    kind: String,
    dims: Vec<String>,
    cell: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    units: String,
    file: Option<String>,
    sheet: Option<String>,
    #[serde(default)]
    dimensions: serde_json::Map<String, Value>,
    time: Option<SeriesEntry>,
    x: Option<SeriesEntry>,
    interp: Option<String>,
    #[serde(default)]
    force: bool,
    loading: Option<String>,
}

/// Read a configuration file and build its variables, in file order.
pub fn load_config(path: &Path, registry: &SubscriptRegistry) -> E2vResult<Vec<ExternalVariable>> {
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;
    let variables = parse_config_str(&content, format, registry)?;
    debug!("{} variables in {}", variables.len(), path.display());
    Ok(variables)
}

/// Parse configuration text.
pub fn parse_config_str(
    text: &str,
    format: ConfigFormat,
    registry: &SubscriptRegistry,
) -> E2vResult<Vec<ExternalVariable>> {
    let document: Value = match format {
        ConfigFormat::Json => serde_json::from_str(text)?,
        ConfigFormat::Yaml => serde_yaml::from_str(text)?,
    };
    variables_from_value(&document, registry)
}

/// Validate a parsed document and convert each entry.
pub fn variables_from_value(document: &Value, registry: &SubscriptRegistry) -> E2vResult<Vec<ExternalVariable>> {
    validate_against_schema(document)?;

    let Some(entries) = document.as_object() else {
        return Err(E2vError::Validation(
            "the configuration must map variable names to their description".to_string(),
        ));
    };

    entries
        .iter()
        .map(|(name, entry)| build_variable(name, entry, registry))
        .collect()
}

fn validate_against_schema(document: &Value) -> E2vResult<()> {
    let schema_str = include_str!("../../schema/excels2vensim-config.schema.json");
    let schema_value: Value = serde_json::from_str(schema_str)
        .map_err(|e| E2vError::Validation(format!("Failed to parse schema: {}", e)))?;

    let compiled_schema = JSONSchema::compile(&schema_value)
        .map_err(|e| E2vError::Validation(format!("Failed to compile schema: {}", e)))?;

    if let Err(errors) = compiled_schema.validate(document) {
        let error_messages: Vec<String> = errors
            .map(|e| format!("  - {} (at '{}')", e, e.instance_path))
            .collect();
        return Err(E2vError::Validation(format!(
            "Schema validation failed:\n{}",
            error_messages.join("\n")
        )));
    }

    Ok(())
}

fn series(name: &str, entry: Option<SeriesEntry>, key: &str, kind: &str) -> E2vResult<SeriesDescriptor> {
    let entry = entry.ok_or_else(|| {
        E2vError::config(format!(
            "'{}' is a {} variable, it needs the '{}' series (name, cell, read_along, length)",
            name, kind, key
        ))
    })?;
    SeriesDescriptor::new(&entry.name, &entry.cell, entry.read_along.parse()?, entry.length)
}

fn build_variable(name: &str, entry: &Value, registry: &SubscriptRegistry) -> E2vResult<ExternalVariable> {
    let entry: VariableEntry = serde_json::from_value(entry.clone())
        .map_err(|e| E2vError::config(format!("invalid entry for '{}': {}", name, e)))?;

    let kind = match entry.kind.trim().to_lowercase().as_str() {
        "constants" => VariableKind::Constants,
        "lookups" => VariableKind::lookups(series(name, entry.x, "x", "lookups")?),
        "data" => VariableKind::data(series(name, entry.time, "time", "data")?, entry.interp.as_deref())?,
        _ => {
            return Err(E2vError::config(format!(
                "Invalid type of variable '{}' for '{}'. {}",
                entry.kind, name, VARIABLE_TYPES
            )))
        }
    };

    let dims: Vec<&str> = entry.dims.iter().map(String::as_str).collect();
    let mut variable = ExternalVariable::new(kind, name, &dims, &entry.cell)?
        .with_description(&entry.description)
        .with_units(&entry.units)
        .with_force(entry.force);
    if let Some(file) = &entry.file {
        variable = variable.in_file(file);
    }
    if let Some(sheet) = &entry.sheet {
        variable = variable.in_sheet(sheet);
    }
    if let Some(loading) = &entry.loading {
        variable = variable.with_loading(loading.parse::<Loading>()?);
    }

    for (dimension, along) in &entry.dimensions {
        let (read_along, step) = dimension_rule(name, dimension, along)?;
        variable.add_dimension(registry, dimension, read_along, step)?;
    }

    Ok(variable)
}

/// `[read_along]` or `[read_along, step]` where step is a number or a list.
fn dimension_rule(variable: &str, dimension: &str, along: &Value) -> E2vResult<(ReadAlong, Step)> {
    let invalid = || {
        E2vError::config(format!(
            "dimension '{}' of '{}' must be [read_along] or [read_along, step], got {}",
            dimension, variable, along
        ))
    };

    let items = along.as_array().ok_or_else(invalid)?;
    let read_along: ReadAlong = items
        .first()
        .and_then(Value::as_str)
        .ok_or_else(invalid)?
        .parse()?;

    let step = match items.get(1) {
        None => Step::Whole,
        Some(Value::Number(n)) => {
            let n = n.as_u64().and_then(|n| u32::try_from(n).ok()).ok_or_else(invalid)?;
            Step::from_number(n)?
        }
        Some(Value::Array(targets)) => Step::Targets(
            targets
                .iter()
                .map(|t| t.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<E2vResult<Vec<_>>>()?,
        ),
        Some(_) => return Err(invalid()),
    };

    Ok((read_along, step))
}
