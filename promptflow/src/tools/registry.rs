//! Registry of provider factories.

use super::{LlmExecutionTools, MultipleLlmExecutionTools};
use crate::errors::PromptflowError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Builds a provider from its options.
pub type LlmToolsFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn LlmExecutionTools>, PromptflowError> + Send + Sync>;

/// One configured provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmToolsConfiguration {
    /// Name the factory was registered under.
    pub provider_name: String,
    /// Options passed to the factory.
    #[serde(default)]
    pub options: serde_json::Value,
}

impl LlmToolsConfiguration {
    /// Creates a configuration entry.
    #[must_use]
    pub fn new(provider_name: impl Into<String>, options: serde_json::Value) -> Self {
        Self {
            provider_name: provider_name.into(),
            options,
        }
    }
}

/// Factories of model providers, keyed by provider name.
///
/// The registry is an ordinary value owned by whoever assembles the tools.
#[derive(Default)]
pub struct LlmToolsRegistry {
    factories: RwLock<BTreeMap<String, LlmToolsFactory>>,
}

impl std::fmt::Debug for LlmToolsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmToolsRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl LlmToolsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory, replacing any earlier one with the same name.
    pub fn register<F>(&self, provider_name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn LlmExecutionTools>, PromptflowError>
            + Send
            + Sync
            + 'static,
    {
        let provider_name = provider_name.into();
        debug!(provider = %provider_name, "Registering LLM provider");
        self.factories.write().insert(provider_name, Arc::new(factory));
    }

    /// Checks if a provider is registered.
    #[must_use]
    pub fn contains(&self, provider_name: &str) -> bool {
        self.factories.read().contains_key(provider_name)
    }

    /// Returns the registered provider names, sorted.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    /// Builds one provider.
    ///
    /// # Errors
    ///
    /// Returns `PipelineExecutionError` for an unknown provider, or the
    /// factory's error.
    pub fn create_one(
        &self,
        configuration: &LlmToolsConfiguration,
    ) -> Result<Arc<dyn LlmExecutionTools>, PromptflowError> {
        let factory = self.factories.read().get(&configuration.provider_name).cloned();

        let Some(factory) = factory else {
            return Err(PromptflowError::execution(format!(
                "There is no LLM provider registered as \"{}\"\n\nRegistered providers:\n{}",
                configuration.provider_name,
                self.provider_names()
                    .iter()
                    .map(|name| format!("- {name}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )));
        };

        factory(&configuration.options)
    }

    /// Builds every configured provider, in order, behind one dispatcher.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`create_one`](Self::create_one).
    pub fn create(
        &self,
        configurations: &[LlmToolsConfiguration],
    ) -> Result<MultipleLlmExecutionTools, PromptflowError> {
        let tools = configurations
            .iter()
            .map(|configuration| self.create_one(configuration))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MultipleLlmExecutionTools::new(tools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockedEchoLlmTools;
    use serde_json::json;

    fn registry() -> LlmToolsRegistry {
        let registry = LlmToolsRegistry::new();
        registry.register("echo", |_options| {
            Ok(Arc::new(MockedEchoLlmTools::new()) as Arc<dyn LlmExecutionTools>)
        });
        registry
    }

    #[test]
    fn test_create_from_configuration() {
        let configurations: Vec<LlmToolsConfiguration> =
            serde_json::from_value(json!([{"providerName": "echo"}, {"providerName": "echo", "options": {"a": 1}}]))
                .unwrap();

        let tools = registry().create(&configurations).unwrap();
        assert_eq!(tools.len(), 2);
    }

    #[test]
    fn test_unknown_provider() {
        let err = registry()
            .create(&[LlmToolsConfiguration::new("openai", json!({}))])
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("no LLM provider registered as \"openai\""));
        assert!(message.contains("- echo"));
    }

    #[test]
    fn test_factory_receives_options() {
        let registry = LlmToolsRegistry::new();
        registry.register("strict", |options| {
            if options.get("apiKey").is_none() {
                return Err(PromptflowError::execution("apiKey is required"));
            }
            Ok(Arc::new(MockedEchoLlmTools::new()) as Arc<dyn LlmExecutionTools>)
        });

        assert!(registry.create(&[LlmToolsConfiguration::new("strict", json!({}))]).is_err());
        assert!(registry
            .create(&[LlmToolsConfiguration::new("strict", json!({"apiKey": "k"}))])
            .is_ok());
        assert!(registry.contains("strict"));
    }
}
