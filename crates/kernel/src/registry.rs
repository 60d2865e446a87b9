use anyhow::Context;
use std::fmt;
use std::sync::Arc;

use crate::module::{InitCtx, Module};

const HTTP_METHODS: &[&str] = &["get", "post", "put", "patch", "delete"];

/// A single route advertised by a module, already prefixed with its mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    pub module: &'static str,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<7} {}", self.method, self.path)
    }
}

/// Module registry managing module lifecycle in registration order
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules.iter()
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Get the number of registered modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start modules in registration order
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect every endpoint the modules advertise in their OpenAPI fragments
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();

        for module in &self.modules {
            let Some(spec) = module.openapi() else {
                continue;
            };
            let Some(paths) = spec.get("paths").and_then(|paths| paths.as_object()) else {
                continue;
            };

            for (path, item) in paths {
                let prefixed_path = mount_path(module.name(), path);
                for &method in HTTP_METHODS {
                    if item.get(method).is_some() {
                        endpoints.push(Endpoint {
                            method: method.to_uppercase(),
                            path: prefixed_path.clone(),
                            module: module.name(),
                        });
                    }
                }
            }
        }

        endpoints
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Join a module mount point with a path relative to it.
pub fn mount_path(module_name: &str, path: &str) -> String {
    match path {
        "" | "/" => format!("/{}", module_name),
        _ => format!("/{}{}", module_name, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use serde_json::json;
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn openapi(&self) -> Option<serde_json::Value> {
            Some(json!({
                "paths": {
                    "/": { "get": {}, "post": {} },
                    "/{id}": { "delete": {} }
                }
            }))
        }

        async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("start {}", self.name));
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("stop {}", self.name));
            Ok(())
        }
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert_eq!(registry.module_count(), 0);
        assert!(registry.endpoints().is_empty());
    }

    #[test]
    fn test_endpoints_are_prefixed_with_module_name() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "books",
            log: Arc::default(),
        }));

        let endpoints: Vec<String> = registry
            .endpoints()
            .iter()
            .map(|e| format!("{} {}", e.method, e.path))
            .collect();

        assert_eq!(
            endpoints,
            vec!["GET /books", "POST /books", "DELETE /books/{id}"]
        );
        assert!(registry.get_module("books").is_some());
        assert!(registry.get_module("users").is_none());
    }

    #[tokio::test]
    async fn test_module_lifecycle_order() {
        let log: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "first",
            log: log.clone(),
        }));
        registry.register(Arc::new(TestModule {
            name: "second",
            log: log.clone(),
        }));

        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        registry.init_modules(&ctx).await.unwrap();
        registry.start_modules(&ctx).await.unwrap();
        registry.stop_modules().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["start first", "start second", "stop second", "stop first"]
        );
    }
}
