//! Workflow data model.
//!
//! - [`workflow`]: `WorkflowModel`, `EngineConfig`, network/sandbox/safe-output settings
//! - [`tools`]: `Tools` map and `ToolDeclaration` classification

pub mod tools;
pub mod workflow;

pub use tools::{classify, ToolDeclaration, Tools, BUILTIN_MCP_SERVERS, BUILTIN_TOOLS};
pub use workflow::{
    AgentSandboxConfig, EngineConfig, FirewallConfig, NetworkPermissions, PluginsConfig,
    SafeInputTool, SafeInputsConfig, SafeOutputsConfig, SandboxConfig, WorkflowModel,
};
