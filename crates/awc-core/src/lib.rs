//! awc core library
//!
//! Compiles an engine-agnostic agent workflow into CI steps: installation
//! steps, then one execution step with a resolved command line, a filtered
//! environment and an optional firewall wrapper.

pub mod capability;
pub mod constants;
pub mod engine;
pub mod error;
pub mod execution;
pub mod install;
pub mod model;
pub mod obs;
pub mod runner_config;
pub mod sandbox;
pub mod secrets;
pub mod shell;
pub mod step;
pub mod telemetry;

pub use capability::{resolve_for_workflow, resolve_tool_permissions, Capabilities};
pub use engine::{
    CompiledWorkflow, Engine, EngineFeatures, EngineKind, EngineProfile, EngineRegistry,
};
pub use error::{CompileError, Result};
pub use model::{
    AgentSandboxConfig, EngineConfig, FirewallConfig, NetworkPermissions, PluginsConfig,
    SafeInputTool, SafeInputsConfig, SafeOutputsConfig, SandboxConfig, ToolDeclaration, Tools,
    WorkflowModel,
};
pub use obs::{
    emit_compile_started, emit_feature_warning, emit_metrics_flush_error, emit_runner_cancelled,
    emit_runner_finished, emit_runner_started, emit_secret_dropped, emit_steps_generated,
    emit_tool_declaration_recovered, emit_tools_resolved, CompileSpan,
};
pub use runner_config::RunnerConfig;
pub use sandbox::{render_invocation, EngineSandboxProfile, SandboxPlan};
pub use secrets::{filter_env_for_secrets, filter_env_with_overrides, resolve_secret, SecretRole};
pub use shell::{escape_arg, join_args};
pub use step::Step;
