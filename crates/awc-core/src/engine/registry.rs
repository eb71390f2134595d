//! Engine registry: lookup by id and whole-workflow compilation.

use std::sync::OnceLock;

use serde::Serialize;

use super::{Engine, EngineKind};
use crate::error::Result;
use crate::model::WorkflowModel;
use crate::obs;
use crate::step::Step;

/// Immutable set of every engine, built once.
#[derive(Debug)]
pub struct EngineRegistry {
    engines: Vec<Engine>,
}

/// Steps compiled for one workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledWorkflow {
    pub engine: String,
    pub warnings: Vec<String>,
    pub installation: Vec<Step>,
    pub execution: Vec<Step>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: EngineKind::ALL.into_iter().map(Engine::new).collect(),
        }
    }

    /// Process-wide registry.
    pub fn global() -> &'static EngineRegistry {
        static REGISTRY: OnceLock<EngineRegistry> = OnceLock::new();
        REGISTRY.get_or_init(EngineRegistry::new)
    }

    /// Resolve an engine id, failing with `UnknownEngine`.
    pub fn lookup(&self, id: &str) -> Result<&Engine> {
        let kind = EngineKind::try_from(id)?;
        Ok(self.get(kind))
    }

    pub fn get(&self, kind: EngineKind) -> &Engine {
        // `engines` is built from `EngineKind::ALL` in declaration order.
        &self.engines[kind as usize]
    }

    pub fn engines(&self) -> impl Iterator<Item = &Engine> {
        self.engines.iter()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.engines.iter().map(Engine::id).collect()
    }

    /// Installation and execution steps for the workflow's selected engine.
    ///
    /// Any error aborts the whole compilation; no partial step list is returned.
    pub fn compile(&self, workflow: &WorkflowModel, log_file: &str) -> Result<CompiledWorkflow> {
        let engine = self.lookup(&workflow.engine.id)?;
        obs::emit_compile_started(engine.id(), &workflow.name);

        let warnings = engine.feature_warnings(workflow);
        let installation = engine.installation_steps(workflow);
        let execution = engine.execution_steps(workflow, log_file)?;

        Ok(CompiledWorkflow {
            engine: engine.id().to_string(),
            warnings,
            installation,
            execution,
        })
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;

    #[test]
    fn test_lookup_every_kind() {
        let registry = EngineRegistry::new();
        for kind in EngineKind::ALL {
            assert_eq!(registry.lookup(kind.id()).expect("known").kind(), kind);
            assert_eq!(registry.get(kind).kind(), kind);
        }
        assert_eq!(registry.ids(), EngineKind::known_ids());
    }

    #[test]
    fn test_unknown_engine() {
        let err = EngineRegistry::global().lookup("gemini").expect_err("unknown");
        assert!(matches!(err, CompileError::UnknownEngine(_)));
    }

    #[test]
    fn test_compile_unknown_engine_returns_no_steps() {
        let wf = WorkflowModel::for_engine("nope");
        assert!(EngineRegistry::new().compile(&wf, "/tmp/a.log").is_err());
    }
}
