//! Tool-provider (MCP) server configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::config::expand_env;
use crate::error::Result;

/// Server name to its connection settings, passed through to the session.
pub type McpServers = BTreeMap<String, Value>;

#[derive(Deserialize)]
struct McpConfigFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: McpServers,
}

/// Read the `mcpServers` map from `path`.
///
/// A missing file yields `Ok(None)`. Unreadable or malformed files are
/// errors; callers treat them as warnings.
pub fn load_mcp_servers(path: &Path) -> Result<Option<McpServers>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file: McpConfigFile = serde_json::from_str(&expand_env(&raw))?;
    Ok(Some(file.mcp_servers))
}
