//! Tool declarations as written by workflow authors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::obs;
use crate::secrets::extract_secret_names;

/// Tools that are part of the built-in vocabulary rather than provider servers.
pub const BUILTIN_TOOLS: &[&str] = &["bash", "edit", "github", "playwright", "web-fetch", "web-search"];

/// Built-in tools that are backed by an MCP server.
pub const BUILTIN_MCP_SERVERS: &[&str] = &["github", "playwright"];

const MCP_TRANSPORT_TYPES: &[&str] = &["stdio", "local", "http", "remote"];
const MCP_SHAPE_KEYS: &[&str] = &["command", "container", "url"];

/// Shape of one declaration after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDeclaration<'a> {
    /// Null, a boolean, or an unrecognised shape: the category default applies.
    Default,
    /// A list of literal strings.
    Commands(Vec<&'a str>),
    /// A nested object (`allowed`, MCP connection settings, ...).
    Config(&'a Map<String, Value>),
}

impl<'a> ToolDeclaration<'a> {
    /// String entries of a config object's `allowed` list.
    ///
    /// Non-string entries are skipped, so a malformed list never grants more
    /// than its well-formed entries do.
    pub fn allowed(&self) -> Option<Vec<&'a str>> {
        match self {
            ToolDeclaration::Config(obj) => obj
                .get("allowed")
                .and_then(Value::as_array)
                .map(|items| string_entries(items)),
            _ => None,
        }
    }
}

/// Ordered map from tool name to its raw declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tools(BTreeMap<String, Value>);

impl Tools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Classify the declaration for `name`, if declared.
    pub fn declaration(&self, name: &str) -> Option<ToolDeclaration<'_>> {
        self.0.get(name).map(|value| classify(name, value))
    }

    /// Whether the declaration under `name` describes an MCP server.
    pub fn is_mcp_server(&self, name: &str) -> bool {
        if BUILTIN_MCP_SERVERS.contains(&name) {
            return self.contains(name);
        }
        self.0.get(name).is_some_and(is_mcp_config)
    }

    /// Names of every declared provider server (built-in and custom), sorted.
    pub fn mcp_servers(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|name| self.is_mcp_server(name))
            .collect()
    }

    /// Custom (non built-in) provider servers.
    pub fn custom_mcp_servers(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.0.iter().filter_map(|(name, value)| {
            if BUILTIN_TOOLS.contains(&name.as_str()) {
                return None;
            }
            match value {
                Value::Object(obj) if is_mcp_config(value) => Some((name.as_str(), obj)),
                _ => None,
            }
        })
    }

    /// `github-token` set on the github tool, if any.
    pub fn github_token(&self) -> Option<&str> {
        self.0
            .get("github")
            .and_then(|v| v.get("github-token"))
            .and_then(Value::as_str)
    }

    /// Secrets referenced by HTTP headers of custom provider servers, sorted.
    pub fn header_secrets(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .custom_mcp_servers()
            .filter_map(|(_, obj)| obj.get("headers").and_then(Value::as_object))
            .flat_map(|headers| headers.values())
            .filter_map(Value::as_str)
            .flat_map(extract_secret_names)
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl FromIterator<(String, Value)> for Tools {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Tools(iter.into_iter().collect())
    }
}

/// Classify a raw declaration. Unrecognised shapes fall back to
/// [`ToolDeclaration::Default`] with a warning; non-string list entries are
/// skipped with a warning and the rest of the list is kept.
pub fn classify<'a>(name: &str, value: &'a Value) -> ToolDeclaration<'a> {
    match value {
        Value::Null | Value::Bool(_) => ToolDeclaration::Default,
        Value::Object(obj) => {
            if obj
                .get("allowed")
                .and_then(Value::as_array)
                .is_some_and(|items| has_non_strings(items))
            {
                obs::emit_tool_declaration_recovered(name, "skipped non-string allowed entries");
            }
            ToolDeclaration::Config(obj)
        }
        Value::Array(items) => {
            if has_non_strings(items) {
                obs::emit_tool_declaration_recovered(name, "skipped non-string list entries");
            }
            ToolDeclaration::Commands(string_entries(items))
        }
        Value::String(_) | Value::Number(_) => {
            obs::emit_tool_declaration_recovered(name, "expected null, a list or an object");
            ToolDeclaration::Default
        }
    }
}

fn string_entries(items: &[Value]) -> Vec<&str> {
    items.iter().filter_map(Value::as_str).collect()
}

fn has_non_strings(items: &[Value]) -> bool {
    items.iter().any(|v| !v.is_string())
}

fn is_mcp_config(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if let Some(kind) = obj.get("type").and_then(Value::as_str) {
        if MCP_TRANSPORT_TYPES.contains(&kind) {
            return true;
        }
    }
    MCP_SHAPE_KEYS.iter().any(|k| obj.contains_key(*k))
}
