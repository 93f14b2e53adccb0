use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::plugins::branch_check::BranchCheckPlugin;
use crate::plugins::external::ExternalPlugin;
use crate::plugins::{Plugin, PluginPipeline};

/// Constructor for a built-in plugin.
pub type PluginFactory = fn() -> Box<dyn Plugin>;

const BUILTIN_PREFIX: &str = "builtin:";

/// Built-in plugins keyed by stable id.
pub struct PluginRegistry {
    builtins: HashMap<String, PluginFactory>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PluginRegistry {
    /// An empty registry; only external executables can be loaded.
    pub fn empty() -> Self {
        Self {
            builtins: HashMap::new(),
        }
    }

    /// Registry with every plugin shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(BranchCheckPlugin::ID, || Box::new(BranchCheckPlugin));
        registry
    }

    /// Register (or replace) a built-in plugin.
    pub fn register(&mut self, id: impl Into<String>, factory: PluginFactory) {
        self.builtins.insert(id.into(), factory);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.builtins.contains_key(id)
    }

    /// Resolve configured locations into a pipeline, preserving order.
    ///
    /// Relative paths are resolved against `base_dir`. Entries that cannot
    /// be loaded are logged and skipped.
    pub fn load(&self, locations: &[String], base_dir: &Path) -> PluginPipeline {
        let mut pipeline = PluginPipeline::default();
        for location in locations {
            match self.resolve(location, base_dir) {
                Ok(plugin) => {
                    log::info!("plugin loaded: {} ({location})", plugin.name());
                    pipeline.push(plugin);
                }
                Err(reason) => log::warn!("plugin {location:?} not loaded: {reason}"),
            }
        }
        pipeline
    }

    fn resolve(&self, location: &str, base_dir: &Path) -> Result<Box<dyn Plugin>, String> {
        if let Some(id) = location.strip_prefix(BUILTIN_PREFIX) {
            return self
                .builtins
                .get(id)
                .map(|factory| factory())
                .ok_or_else(|| format!("unknown built-in plugin {id:?}"));
        }

        if let Some(factory) = self.builtins.get(location) {
            return Ok(factory());
        }

        let path = expand_path(location, base_dir)?;
        if !path.is_file() {
            return Err(format!("file not found: {}", path.display()));
        }
        Ok(Box::new(ExternalPlugin::new(path)))
    }
}

/// Expand `~` and `$VARS`, then anchor relative paths at `base_dir`.
pub fn expand_path(raw: &str, base_dir: &Path) -> Result<PathBuf, String> {
    let expanded = shellexpand::full(raw).map_err(|e| e.to_string())?;
    let path = PathBuf::from(expanded.as_ref());
    Ok(if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    })
}
