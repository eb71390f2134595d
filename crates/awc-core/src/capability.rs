//! Tool permission resolution.
//!
//! Turns a workflow's tool declarations into either the unrestricted
//! sentinel or a sorted, deduplicated set of capability tokens. The two are
//! different values: an empty [`Capabilities::Restricted`] grants nothing
//! extra, [`Capabilities::Unrestricted`] lifts every restriction.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::constants::{SAFE_INPUTS_SERVER_ID, SAFE_OUTPUTS_SERVER_ID, WEB_FETCH_TOKEN};
use crate::model::{ToolDeclaration, Tools, WorkflowModel, BUILTIN_TOOLS};
use crate::obs;

/// Literals in a bash command list that lift every restriction.
const SHELL_WILDCARDS: &[&str] = &["*", ":*"];

/// Resolved tool permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capabilities {
    /// No restriction at all.
    Unrestricted,
    /// Exactly these tokens, sorted ascending.
    Restricted(BTreeSet<String>),
}

impl Capabilities {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Capabilities::Unrestricted)
    }

    /// Tokens in sorted order; `None` for the sentinel.
    pub fn tokens(&self) -> Option<Vec<&str>> {
        match self {
            Capabilities::Unrestricted => None,
            Capabilities::Restricted(set) => Some(set.iter().map(String::as_str).collect()),
        }
    }

    /// Owned token list for the runner configuration, where absence means unrestricted.
    pub fn to_available_tools(&self) -> Option<Vec<String>> {
        match self {
            Capabilities::Unrestricted => None,
            Capabilities::Restricted(set) => Some(set.iter().cloned().collect()),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        match self {
            Capabilities::Unrestricted => true,
            Capabilities::Restricted(set) => set.contains(token),
        }
    }

    /// Shell comment lines summarising the result, one per line.
    pub fn summary_comment(&self, label: &str) -> Vec<String> {
        match self {
            Capabilities::Unrestricted => {
                vec![format!("# {label}: all tools enabled (wildcard)")]
            }
            Capabilities::Restricted(set) if set.is_empty() => Vec::new(),
            Capabilities::Restricted(set) => {
                let mut lines = vec![format!("# {label}:")];
                lines.extend(set.iter().map(|t| format!("# - {t}")));
                lines
            }
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capabilities::Unrestricted => write!(f, "unrestricted"),
            Capabilities::Restricted(set) => {
                let joined = set.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
                write!(f, "[{joined}]")
            }
        }
    }
}

/// Serialized as the string `"unrestricted"` or the token array.
impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Capabilities::Unrestricted => serializer.serialize_str("unrestricted"),
            Capabilities::Restricted(set) => set.serialize(serializer),
        }
    }
}

// ----------------------------------------------------------------------------
// Resolution
// ----------------------------------------------------------------------------

/// Resolve capabilities for a workflow.
pub fn resolve_for_workflow(workflow: &WorkflowModel) -> Capabilities {
    resolve_tool_permissions(
        &workflow.tools,
        workflow.safe_outputs_enabled(),
        workflow.safe_inputs_enabled(),
    )
}

/// Resolve tool declarations plus safe-output/safe-input flags.
///
/// A `*` or `:*` anywhere in the bash command list short-circuits to
/// [`Capabilities::Unrestricted`], discarding every other token. A wildcard
/// in `github.allowed` only collapses the github tokens.
pub fn resolve_tool_permissions(
    tools: &Tools,
    safe_outputs_enabled: bool,
    safe_inputs_enabled: bool,
) -> Capabilities {
    let mut tokens = BTreeSet::new();

    for (name, _) in tools.iter() {
        let Some(decl) = tools.declaration(name) else {
            continue;
        };
        match name.as_str() {
            "bash" => {
                if shell_tokens(&decl, &mut tokens).is_none() {
                    obs::emit_tools_resolved(true, 0);
                    return Capabilities::Unrestricted;
                }
            }
            "edit" => {
                tokens.insert("write".to_string());
            }
            "github" => github_tokens(&decl, &mut tokens),
            "web-fetch" => {
                tokens.insert(WEB_FETCH_TOKEN.to_string());
            }
            other if BUILTIN_TOOLS.contains(&other) => {}
            other => {
                if tools.is_mcp_server(other) {
                    tokens.insert(other.to_string());
                    for sub in decl.allowed().unwrap_or_default() {
                        tokens.insert(format!("{other}({sub})"));
                    }
                }
            }
        }
    }

    if safe_outputs_enabled {
        tokens.insert(SAFE_OUTPUTS_SERVER_ID.to_string());
    }
    if safe_inputs_enabled {
        tokens.insert(SAFE_INPUTS_SERVER_ID.to_string());
    }

    obs::emit_tools_resolved(false, tokens.len());
    Capabilities::Restricted(tokens)
}

/// Returns `None` when a wildcard lifts all restrictions.
fn shell_tokens(decl: &ToolDeclaration<'_>, tokens: &mut BTreeSet<String>) -> Option<()> {
    let commands = match decl {
        ToolDeclaration::Commands(list) => list.clone(),
        ToolDeclaration::Config(_) => match decl.allowed() {
            Some(list) => list,
            None => {
                tokens.insert("shell".to_string());
                return Some(());
            }
        },
        ToolDeclaration::Default => {
            tokens.insert("shell".to_string());
            return Some(());
        }
    };

    if commands.iter().any(|c| SHELL_WILDCARDS.contains(c)) {
        return None;
    }
    tokens.extend(commands.iter().map(|c| format!("shell({c})")));
    Some(())
}

/// Only a config object's `allowed` list narrows github; any other shape is full access.
fn github_tokens(decl: &ToolDeclaration<'_>, tokens: &mut BTreeSet<String>) {
    match decl.allowed() {
        Some(list) if !list.contains(&"*") => {
            tokens.extend(list.iter().map(|t| format!("github({t})")));
        }
        _ => {
            tokens.insert("github".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn tools(value: Value) -> Tools {
        serde_json::from_value(value).expect("tools map")
    }

    fn restricted(list: &[&str]) -> Capabilities {
        Capabilities::Restricted(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_bash_commands() {
        let caps = resolve_tool_permissions(&tools(json!({"bash": ["echo", "ls"]})), false, false);
        assert_eq!(caps, restricted(&["shell(echo)", "shell(ls)"]));
    }

    #[test]
    fn test_bash_wildcard_discards_everything() {
        let input = tools(json!({
            "bash": ["git status", ":*"],
            "edit": null,
            "github": null
        }));
        assert_eq!(
            resolve_tool_permissions(&input, true, true),
            Capabilities::Unrestricted
        );
    }

    #[test]
    fn test_bash_without_list_is_plain_shell() {
        let caps = resolve_tool_permissions(&tools(json!({"bash": null})), false, false);
        assert_eq!(caps, restricted(&["shell"]));
    }

    #[test]
    fn test_empty_bash_list_grants_nothing() {
        let caps = resolve_tool_permissions(&tools(json!({"bash": []})), false, false);
        assert_eq!(caps, restricted(&[]));
    }

    #[test]
    fn test_empty_is_not_unrestricted() {
        let caps = resolve_tool_permissions(&Tools::new(), false, false);
        assert_eq!(caps, Capabilities::Restricted(BTreeSet::new()));
        assert!(!caps.is_unrestricted());
        assert_eq!(caps.to_available_tools(), Some(Vec::new()));
    }

    #[test]
    fn test_github_wildcard_scoped_to_github() {
        let input = tools(json!({
            "github": {"allowed": ["*", "x"]},
            "bash": ["ls"]
        }));
        let caps = resolve_tool_permissions(&input, false, false);
        assert_eq!(caps, restricted(&["github", "shell(ls)"]));
    }

    #[test]
    fn test_mcp_server_with_allowed() {
        let input = tools(json!({
            "notion": {"type": "http", "url": "https://x", "allowed": ["search"]},
            "playwright": null,
            "web-search": null,
            "web-fetch": null
        }));
        let caps = resolve_tool_permissions(&input, false, false);
        assert_eq!(caps, restricted(&["notion", "notion(search)", "web_fetch"]));
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(Capabilities::Unrestricted.to_string(), "unrestricted");
        assert_eq!(
            serde_json::to_string(&Capabilities::Unrestricted).expect("json"),
            "\"unrestricted\""
        );
        let caps = restricted(&["write", "shell(ls)"]);
        assert_eq!(caps.to_string(), "[shell(ls), write]");
        assert_eq!(
            serde_json::to_string(&caps).expect("json"),
            r#"["shell(ls)","write"]"#
        );
    }

    #[test]
    fn test_summary_comment() {
        assert_eq!(
            Capabilities::Unrestricted.summary_comment("Allowed tools"),
            vec!["# Allowed tools: all tools enabled (wildcard)"]
        );
        assert!(restricted(&[]).summary_comment("Allowed tools").is_empty());
        assert_eq!(
            restricted(&["write"]).summary_comment("Allowed tools"),
            vec!["# Allowed tools:", "# - write"]
        );
    }
}
