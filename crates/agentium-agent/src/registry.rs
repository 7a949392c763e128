use crate::adapter::AgentAdapter;
use agentium_core::{AgentiumError, AgentiumResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Factory producing a configured adapter instance.
pub type AdapterFactory = Arc<dyn Fn() -> Arc<dyn AgentAdapter> + Send + Sync>;

/// Mapping from adapter name to factory.
///
/// Instance-based and injectable: tests register mock adapters, the CLI
/// builds the default set from the session config. Registration is
/// idempotent — the first factory for a name wins.
pub struct AdapterRegistry {
    factories: RwLock<HashMap<String, AdapterFactory>>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-loaded with the built-in adapters.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("claude-code", Arc::new(|| {
            Arc::new(crate::adapters::ClaudeCodeAdapter::new()) as Arc<dyn AgentAdapter>
        }));
        registry.register("codex", Arc::new(|| {
            Arc::new(crate::adapters::CodexAdapter::new()) as Arc<dyn AgentAdapter>
        }));
        registry.register("aider", Arc::new(|| {
            Arc::new(crate::adapters::AiderAdapter::new()) as Arc<dyn AgentAdapter>
        }));
        registry
    }

    /// Register a factory under a name. Re-registering an existing name is
    /// a no-op.
    pub fn register(&self, name: &str, factory: AdapterFactory) {
        let mut factories = self.factories.write();
        if factories.contains_key(name) {
            return;
        }
        info!(adapter = name, "Registered agent adapter");
        factories.insert(name.to_string(), factory);
    }

    /// Create an adapter by name.
    pub fn create(&self, name: &str) -> AgentiumResult<Arc<dyn AgentAdapter>> {
        let factories = self.factories.read();
        let factory = factories
            .get(name)
            .ok_or_else(|| AgentiumError::Adapter(format!("Unknown adapter: {name}")))?;
        Ok(factory())
    }

    /// Whether an adapter is registered under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Sorted names of all registered adapters.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
