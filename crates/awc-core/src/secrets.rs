//! Secret cascade resolution and step environment filtering.
//!
//! Every step environment built by an engine goes through
//! [`filter_env_for_secrets`] with that engine's required secret names, so a
//! compiled step can only reference secrets the engine declared.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::obs;

/// Logical secret roles that resolve through a three-level cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretRole {
    /// Token handed to the GitHub MCP server.
    GitHubMcpServer,
    /// Token used to clone plugin repositories.
    Plugins,
}

impl SecretRole {
    pub const ALL: [SecretRole; 2] = [SecretRole::GitHubMcpServer, SecretRole::Plugins];

    /// Candidate secret names, most specific first.
    pub fn cascade(&self) -> [&'static str; 3] {
        match self {
            SecretRole::GitHubMcpServer => {
                ["AWC_GITHUB_MCP_SERVER_TOKEN", "AWC_GITHUB_TOKEN", "GITHUB_TOKEN"]
            }
            SecretRole::Plugins => ["AWC_PLUGINS_TOKEN", "AWC_GITHUB_TOKEN", "GITHUB_TOKEN"],
        }
    }
}

/// Resolve a role to a secret reference expression.
///
/// A non-empty custom value wins outright and is returned verbatim.
/// Otherwise the result is `${{ secrets.A || secrets.B || secrets.C }}`.
pub fn resolve_secret(role: SecretRole, custom: Option<&str>) -> String {
    if let Some(value) = custom.filter(|v| !v.trim().is_empty()) {
        return value.to_string();
    }
    let chain = role
        .cascade()
        .iter()
        .map(|name| format!("secrets.{name}"))
        .collect::<Vec<_>>()
        .join(" || ");
    format!("${{{{ {chain} }}}}")
}

/// `${{ secrets.NAME }}`
pub fn secret_expr(name: &str) -> String {
    format!("${{{{ secrets.{name} }}}}")
}

/// Whether `name` appears in some role's cascade.
pub fn is_cascade_name(name: &str) -> bool {
    SecretRole::ALL.iter().any(|role| role.cascade().contains(&name))
}

/// Whether an env value references any secret.
pub fn is_secret_reference(value: &str) -> bool {
    value.contains("secrets.")
}

fn secret_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"secrets\.([A-Za-z_][A-Za-z0-9_]*)").expect("secret name pattern compiles")
    })
}

/// Secret names referenced in `text`, in order of first appearance.
pub fn extract_secret_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in secret_name_pattern().captures_iter(text) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Keep every non-secret entry, and secret-referencing entries only when
/// their key is in `allowed`. Dropped entries are logged, never forwarded.
///
/// See [`filter_env_with_overrides`] for the rule on referenced names.
pub fn filter_env_for_secrets(
    env: &BTreeMap<String, String>,
    allowed: &[String],
) -> BTreeMap<String, String> {
    filter_env_with_overrides(env, allowed, &[])
}

/// Like [`filter_env_for_secrets`], and every secret the value references
/// must itself be in `allowed`, a cascade name, or in `overrides` (secrets
/// named by the workflow's token overrides).
pub fn filter_env_with_overrides(
    env: &BTreeMap<String, String>,
    allowed: &[String],
    overrides: &[String],
) -> BTreeMap<String, String> {
    let permitted = |name: &str| {
        allowed.iter().chain(overrides).any(|a| a == name) || is_cascade_name(name)
    };
    env.iter()
        .filter(|(key, value)| {
            if !is_secret_reference(value) {
                return true;
            }
            let key_allowed = allowed.iter().any(|a| a == *key);
            if key_allowed && extract_secret_names(value).iter().all(|n| permitted(n)) {
                true
            } else {
                obs::emit_secret_dropped(key);
                false
            }
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_expression() {
        assert_eq!(
            resolve_secret(SecretRole::Plugins, None),
            "${{ secrets.AWC_PLUGINS_TOKEN || secrets.AWC_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}"
        );
    }

    #[test]
    fn test_custom_value_wins_verbatim() {
        let custom = "${{ secrets.MY_PAT }}";
        assert_eq!(
            resolve_secret(SecretRole::GitHubMcpServer, Some(custom)),
            custom
        );
    }

    #[test]
    fn test_blank_custom_value_falls_back() {
        let resolved = resolve_secret(SecretRole::GitHubMcpServer, Some("  "));
        assert!(resolved.starts_with("${{ secrets.AWC_GITHUB_MCP_SERVER_TOKEN"));
    }

    #[test]
    fn test_extract_secret_names_dedups() {
        let names = extract_secret_names(
            "Bearer ${{ secrets.API_KEY }} ${{ secrets.OTHER || secrets.API_KEY }}",
        );
        assert_eq!(names, vec!["API_KEY".to_string(), "OTHER".to_string()]);
    }

    #[test]
    fn test_filter_checks_referenced_names_not_just_key() {
        let allowed = vec!["ANTHROPIC_API_KEY".to_string()];
        let env = BTreeMap::from([(
            "ANTHROPIC_API_KEY".to_string(),
            secret_expr("PROD_DB_PASSWORD"),
        )]);
        assert!(filter_env_for_secrets(&env, &allowed).is_empty());

        let overrides = vec!["PROD_DB_PASSWORD".to_string()];
        assert_eq!(filter_env_with_overrides(&env, &allowed, &overrides), env);
    }

    #[test]
    fn test_cascade_names_are_permitted() {
        let allowed = vec!["GITHUB_MCP_SERVER_TOKEN".to_string()];
        let env = BTreeMap::from([(
            "GITHUB_MCP_SERVER_TOKEN".to_string(),
            resolve_secret(SecretRole::GitHubMcpServer, None),
        )]);
        assert_eq!(filter_env_for_secrets(&env, &allowed), env);
        assert!(is_cascade_name("AWC_PLUGINS_TOKEN"));
        assert!(!is_cascade_name("PROD_DB_PASSWORD"));
    }

    #[test]
    fn test_filter_drops_undeclared_secret() {
        let mut env = BTreeMap::new();
        env.insert("GITHUB_WORKSPACE".to_string(), "${{ github.workspace }}".to_string());
        env.insert("OPENAI_API_KEY".to_string(), secret_expr("OPENAI_API_KEY"));
        env.insert("COPILOT_GITHUB_TOKEN".to_string(), secret_expr("COPILOT_GITHUB_TOKEN"));

        let filtered = filter_env_for_secrets(&env, &["COPILOT_GITHUB_TOKEN".to_string()]);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key("GITHUB_WORKSPACE"));
        assert!(filtered.contains_key("COPILOT_GITHUB_TOKEN"));
        assert!(!filtered.contains_key("OPENAI_API_KEY"));
    }
}
