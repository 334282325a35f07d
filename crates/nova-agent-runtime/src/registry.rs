//! Plugin registry

use crate::error::{LifecycleError, Result};
use nova_agent_plugin_api::{Plugin, PluginMetadata, WorkerState};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// One registered plugin and the state of its worker
#[derive(Clone)]
pub struct PluginDescriptor {
    name: String,
    plugin: Arc<dyn Plugin>,
    state: Arc<RwLock<WorkerState>>,
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl PluginDescriptor {
    fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            name: plugin.name().to_string(),
            plugin,
            state: Arc::new(RwLock::new(WorkerState::Unstarted)),
        }
    }

    /// Plugin identity
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin instance
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    /// Current worker state
    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Plugin metadata
    pub fn metadata(&self) -> PluginMetadata {
        self.plugin.metadata()
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write();
        let previous = *current;
        *current = state;
        debug!(plugin = %self.name, from = %previous, to = %state, "Worker state changed");
    }
}

/// Ordered collection of plugins, unique by name
///
/// Registration order is significant: plugins are initialized and joined in
/// this order and deinitialized in reverse.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin
    ///
    /// On error the registry is left unchanged.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = plugin.name();

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(LifecycleError::InvalidIdentity(name.to_string()));
        }

        if self.contains(name) {
            return Err(LifecycleError::DuplicateIdentity(name.to_string()));
        }

        let descriptor = PluginDescriptor::new(plugin);
        info!(plugin = %descriptor.name, position = self.plugins.len(), "Plugin registered");
        self.plugins.push(descriptor);

        Ok(())
    }

    /// All descriptors in registration order
    pub fn all(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    /// Get a descriptor by name
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|d| d.name == name)
    }

    /// Check if a plugin is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in order
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|d| d.name.as_str()).collect()
    }

    /// Get plugin count
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Check that every required dependency is registered before its dependent
    /// and matches the declared version requirement
    pub fn validate(&self) -> Result<()> {
        for (position, descriptor) in self.plugins.iter().enumerate() {
            let earlier = &self.plugins[..position];

            for dep in descriptor.plugin.dependencies() {
                let Some(found) = earlier.iter().find(|d| d.name == dep.name) else {
                    if dep.optional {
                        debug!(
                            plugin = %descriptor.name,
                            dependency = %dep.name,
                            "Optional dependency not registered"
                        );
                        continue;
                    }
                    return Err(LifecycleError::MissingDependency {
                        plugin: descriptor.name.clone(),
                        dependency: dep.name,
                    });
                };

                let version = found.plugin.version();
                if !dep.satisfies(version) {
                    return Err(LifecycleError::IncompatibleDependency {
                        plugin: descriptor.name.clone(),
                        dependency: dep.name.clone(),
                        required: dep.version_req.clone().unwrap_or_default(),
                        found: version.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Put every worker state back to `Unstarted`
    pub(crate) fn reset_states(&self) {
        for descriptor in &self.plugins {
            descriptor.set_state(WorkerState::Unstarted);
        }
    }

    /// Drop every descriptor
    pub(crate) fn clear(&mut self) {
        self.plugins.clear();
    }
}
