//! Editing helpers for the backend configuration document.
//!
//! The backend speaks JSON; humans edit YAML. A [`ConfigDocument`] wraps the
//! JSON value fetched from `/query_config`, renders it as YAML for the
//! editor, and parses edited YAML back. Parsing failures are reported and the
//! remote configuration stays untouched until a valid document is applied.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::util::validate_backend_url;

#[derive(Debug, Error)]
pub enum ConfigDocError {
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Configuration must be a mapping at the top level")]
    NotAMapping,
    #[error("A source named '{0}' already exists")]
    DuplicateSource(String),
    #[error("Source name must not be empty")]
    EmptySourceName,
    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),
    #[error("scrape.sources must be a list")]
    SourcesNotAList,
}

/// Summary of one scrape source, for the sources list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub name: String,
    pub rss_url: Option<String>,
    pub labels: Vec<(String, String)>,
}

/// Summary of one notification route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummary {
    /// Nesting depth, 0 for the root route.
    pub depth: usize,
    pub receivers: Vec<String>,
    pub group_by: Vec<String>,
    pub matchers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    value: Value,
}

impl ConfigDocument {
    pub fn from_json(value: Value) -> Result<Self, ConfigDocError> {
        match value {
            Value::Object(_) => Ok(Self { value }),
            // A fresh backend may have no configuration yet.
            Value::Null => Ok(Self {
                value: Value::Object(Map::new()),
            }),
            _ => Err(ConfigDocError::NotAMapping),
        }
    }

    /// Parse edited YAML. Rejects anything but a top-level mapping.
    pub fn parse_yaml(text: &str) -> Result<Self, ConfigDocError> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_json(value)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigDocError> {
        Ok(serde_yaml::to_string(&self.value)?)
    }

    pub fn as_json(&self) -> &Value {
        &self.value
    }

    /// Configured scrape sources (`scrape.sources`).
    pub fn sources(&self) -> Vec<SourceSummary> {
        self.value
            .pointer("/scrape/sources")
            .and_then(Value::as_array)
            .map(|sources| {
                sources
                    .iter()
                    .map(|source| SourceSummary {
                        name: str_field(source, "/name").unwrap_or_default(),
                        rss_url: str_field(source, "/rss/url"),
                        labels: source
                            .get("labels")
                            .and_then(Value::as_object)
                            .map(|labels| {
                                labels
                                    .iter()
                                    .map(|(k, v)| (k.clone(), scalar_to_string(v)))
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append an RSS source to `scrape.sources`, creating the path as needed.
    pub fn add_rss_source(&mut self, name: &str, url: &str) -> Result<(), ConfigDocError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigDocError::EmptySourceName);
        }
        let url = validate_backend_url(url.trim())
            .map_err(|e| ConfigDocError::InvalidSourceUrl(e.to_string()))?;
        if self.sources().iter().any(|s| s.name == name) {
            return Err(ConfigDocError::DuplicateSource(name.to_string()));
        }

        let root = self
            .value
            .as_object_mut()
            .ok_or(ConfigDocError::NotAMapping)?;
        let scrape = object_entry(root, "scrape")?;
        let sources = scrape
            .entry("sources")
            .or_insert_with(|| Value::Array(Vec::new()));
        if sources.is_null() {
            *sources = Value::Array(Vec::new());
        }
        let list = sources
            .as_array_mut()
            .ok_or(ConfigDocError::SourcesNotAList)?;
        list.push(serde_json::json!({
            "name": name,
            "rss": { "url": url.as_str() },
        }));

        tracing::info!(name, url = %url, "Added RSS source to configuration draft");
        Ok(())
    }

    /// Flattened notification route tree (`notify.route`), depth first.
    pub fn notification_routes(&self) -> Vec<RouteSummary> {
        let mut out = Vec::new();
        if let Some(root) = self.value.pointer("/notify/route") {
            collect_routes(root, 0, &mut out);
        }
        out
    }

    /// Names of configured notification receivers (`notify.receivers[].name`).
    pub fn receivers(&self) -> Vec<String> {
        self.value
            .pointer("/notify/receivers")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(|r| str_field(r, "/name")).collect())
            .unwrap_or_default()
    }
}

fn collect_routes(route: &Value, depth: usize, out: &mut Vec<RouteSummary>) {
    out.push(RouteSummary {
        depth,
        receivers: string_list(route.get("receivers")),
        group_by: string_list(route.get("group_by")),
        matchers: string_list(route.get("matchers")),
    });
    if let Some(children) = route.get("sub_routes").and_then(Value::as_array) {
        for child in children {
            collect_routes(child, depth + 1, out);
        }
    }
}

fn object_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, ConfigDocError> {
    let entry = map
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if entry.is_null() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut().ok_or(ConfigDocError::NotAMapping)
}

fn str_field(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(scalar_to_string).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
