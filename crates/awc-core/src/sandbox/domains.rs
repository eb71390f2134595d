//! Domain allow/block policy for the firewall.

use std::collections::BTreeSet;

use crate::model::WorkflowModel;

/// Keyword in `network.allowed` that expands to [`DEFAULT_DOMAINS`].
pub const DEFAULTS_KEYWORD: &str = "defaults";

/// Infrastructure domains every job needs (package mirrors, certificate checks).
pub const DEFAULT_DOMAINS: &[&str] = &[
    "crl3.digicert.com",
    "crl4.digicert.com",
    "json.schemastore.org",
    "keyserver.ubuntu.com",
    "ocsp.digicert.com",
    "packagecloud.io",
    "packages.microsoft.com",
    "ppa.launchpad.net",
    "archive.ubuntu.com",
    "azure.archive.ubuntu.com",
    "security.ubuntu.com",
    "api.snapcraft.io",
];

/// Engine domains plus the workflow's allowed list, expanded, sorted and deduplicated.
pub fn allowed_domains(engine_domains: &[&str], workflow: &WorkflowModel) -> Vec<String> {
    let mut set: BTreeSet<String> = engine_domains.iter().map(|d| d.to_string()).collect();
    if let Some(network) = &workflow.network {
        for entry in &network.allowed {
            let entry = entry.trim();
            if entry == DEFAULTS_KEYWORD {
                set.extend(DEFAULT_DOMAINS.iter().map(|d| d.to_string()));
            } else if !entry.is_empty() {
                set.insert(entry.to_string());
            }
        }
    }
    set.into_iter().collect()
}

/// The workflow's blocked list, sorted and deduplicated.
pub fn blocked_domains(workflow: &WorkflowModel) -> Vec<String> {
    let set: BTreeSet<String> = workflow
        .network
        .iter()
        .flat_map(|n| n.blocked.iter())
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkPermissions;

    #[test]
    fn test_defaults_keyword_expands() {
        let mut wf = WorkflowModel::for_engine("claude");
        wf.network = Some(NetworkPermissions {
            allowed: vec!["defaults".into(), "example.com".into()],
            ..Default::default()
        });
        let domains = allowed_domains(&["api.anthropic.com"], &wf);
        assert!(domains.contains(&"example.com".to_string()));
        assert!(domains.contains(&"api.anthropic.com".to_string()));
        assert!(domains.contains(&"json.schemastore.org".to_string()));
        assert!(!domains.contains(&"defaults".to_string()));
        let mut sorted = domains.clone();
        sorted.sort();
        assert_eq!(domains, sorted);
    }

    #[test]
    fn test_blocked_sorted_dedup() {
        let mut wf = WorkflowModel::for_engine("codex");
        wf.network = Some(NetworkPermissions {
            blocked: vec!["b.com".into(), "a.com".into(), "b.com".into(), " ".into()],
            ..Default::default()
        });
        assert_eq!(blocked_domains(&wf), vec!["a.com", "b.com"]);
    }
}
