//! Provider configuration derived from the tracked-model set.

use crate::error::{DashboardError, DashboardResult};
use crate::models::{ProviderConfig, TrackedModel};
use std::collections::HashSet;

const FALLBACK_MODEL: &str = "default-model";

/// Curated model list and preferred selection for a known provider name.
fn default_models(name: &str) -> Option<(&'static [&'static str], &'static str)> {
    let defaults: (&'static [&'static str], &'static str) = match name {
        "OpenAI" => (&["gpt-4o", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"], "gpt-4o"),
        "Claude" => (
            &["claude-3-5-sonnet", "claude-3-opus", "claude-3-sonnet", "claude-3-haiku"],
            "claude-3-5-sonnet",
        ),
        "Google" => (
            &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"],
            "gemini-2.0-flash",
        ),
        "xAI" => (&["grok-2", "grok-2-mini"], "grok-2"),
        "Perplexity" => (&["sonar-pro", "sonar", "sonar-reasoning"], "sonar-pro"),
        _ => return None,
    };
    Some(defaults)
}

/// Default settings for a newly tracked model. Keyed by display name, so
/// models sharing a name share defaults.
pub fn default_provider_config(model: &TrackedModel) -> ProviderConfig {
    let (models, selected_model) = match default_models(&model.name) {
        Some((models, selected)) => (
            models.iter().map(|m| m.to_string()).collect(),
            selected.to_string(),
        ),
        None => (vec![FALLBACK_MODEL.to_string()], FALLBACK_MODEL.to_string()),
    };

    ProviderConfig {
        id: model.id.clone(),
        name: model.name.clone(),
        enabled: true,
        api_key: String::new(),
        show_key: false,
        models,
        selected_model,
    }
}

/// Holds one provider config per tracked model.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    configs: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configs(&self) -> &[ProviderConfig] {
        &self.configs
    }

    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    /// Brings the config list in line with `models`: configs of removed
    /// models are dropped, missing ones are created from defaults and
    /// appended. Returns true if the stored list was replaced.
    pub fn reconcile(&mut self, models: &[TrackedModel]) -> bool {
        let model_ids: HashSet<&str> = models.iter().map(|m| m.id.as_str()).collect();
        let current_ids: HashSet<&str> = self.configs.iter().map(|c| c.id.as_str()).collect();

        let retained: Vec<ProviderConfig> = self
            .configs
            .iter()
            .filter(|c| model_ids.contains(c.id.as_str()))
            .cloned()
            .collect();
        let added: Vec<ProviderConfig> = models
            .iter()
            .filter(|m| !current_ids.contains(m.id.as_str()))
            .map(default_provider_config)
            .collect();

        let removed_count = self.configs.len() - retained.len();
        if removed_count == 0 && added.is_empty() {
            return false;
        }

        log::info!(
            "Provider sync: {} removed, {} added ({} total)",
            removed_count,
            added.len(),
            retained.len() + added.len()
        );
        self.configs = retained.into_iter().chain(added).collect();
        true
    }

    fn get_mut(&mut self, id: &str) -> DashboardResult<&mut ProviderConfig> {
        self.configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| DashboardError::UnknownProvider(id.to_string()))
    }

    /// Flips `enabled`, returning the new value.
    pub fn toggle_enabled(&mut self, id: &str) -> DashboardResult<bool> {
        let config = self.get_mut(id)?;
        config.enabled = !config.enabled;
        log::info!("Provider {} enabled: {}", id, config.enabled);
        Ok(config.enabled)
    }

    pub fn set_api_key(&mut self, id: &str, api_key: &str) -> DashboardResult<()> {
        let config = self.get_mut(id)?;
        config.api_key = api_key.to_string();
        log::info!("Updated API key for provider {}", id);
        Ok(())
    }

    /// Flips the UI-only `show_key` flag, returning the new value.
    pub fn toggle_show_key(&mut self, id: &str) -> DashboardResult<bool> {
        let config = self.get_mut(id)?;
        config.show_key = !config.show_key;
        Ok(config.show_key)
    }

    /// Selects `model` for provider `id`. Only members of the provider's
    /// model list are accepted.
    pub fn set_selected_model(&mut self, id: &str, model: &str) -> DashboardResult<()> {
        let config = self.get_mut(id)?;
        if !config.models.iter().any(|m| m == model) {
            log::warn!("Rejected model '{}' for provider {}: not offered", model, id);
            return Err(DashboardError::ModelNotOffered {
                provider: id.to_string(),
                model: model.to_string(),
            });
        }
        config.selected_model = model.to_string();
        log::info!("Provider {} now uses model {}", id, model);
        Ok(())
    }
}

/// The key as it may be displayed: verbatim when revealed, masked otherwise.
pub fn masked_api_key(config: &ProviderConfig) -> String {
    if config.show_key {
        config.api_key.clone()
    } else {
        "•".repeat(config.api_key.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(id: &str, name: &str) -> TrackedModel {
        TrackedModel {
            id: id.to_string(),
            name: name.to_string(),
            sentiment: 70,
            mentions: 1000,
            rank: 1,
            change: 0,
            response_time_ms: 600,
            accuracy: 90,
            persona: None,
        }
    }

    fn ids(registry: &ProviderRegistry) -> Vec<&str> {
        registry.configs().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_known_and_fallback_defaults() {
        let claude = default_provider_config(&tracked("1", "Claude"));
        assert_eq!(claude.models.len(), 4);
        assert_eq!(claude.selected_model, "claude-3-5-sonnet");
        assert!(claude.enabled);
        assert!(!claude.show_key);
        assert!(claude.api_key.is_empty());

        let xai = default_provider_config(&tracked("2", "xAI"));
        assert_eq!(xai.models, vec!["grok-2", "grok-2-mini"]);

        // Display names without a curated entry (including "ChatGPT") fall back
        let llama = default_provider_config(&tracked("3", "ChatGPT"));
        assert_eq!(llama.models, vec!["default-model"]);
        assert_eq!(llama.selected_model, "default-model");
    }

    #[test]
    fn test_reconcile_adds_removes_and_reports_changes() {
        let mut registry = ProviderRegistry::new();
        let mut models = vec![tracked("1", "OpenAI"), tracked("2", "Perplexity")];

        assert!(registry.reconcile(&models));
        assert_eq!(ids(&registry), vec!["1", "2"]);
        assert!(!registry.reconcile(&models));

        registry.set_api_key("2", "pplx-123").unwrap();
        models.remove(0);
        models.push(tracked("3", "Llama"));
        assert!(registry.reconcile(&models));
        assert_eq!(ids(&registry), vec!["2", "3"]);
        // Retained configs keep their edits
        assert_eq!(registry.get("2").unwrap().api_key, "pplx-123");
    }

    #[test]
    fn test_set_selected_model_validates_membership() {
        let mut registry = ProviderRegistry::new();
        registry.reconcile(&[tracked("1", "Google")]);

        assert!(registry.set_selected_model("1", "gemini-1.5-pro").is_ok());
        assert_eq!(registry.get("1").unwrap().selected_model, "gemini-1.5-pro");

        let err = registry.set_selected_model("1", "gpt-4o").unwrap_err();
        assert!(matches!(err, DashboardError::ModelNotOffered { .. }));
        assert_eq!(registry.get("1").unwrap().selected_model, "gemini-1.5-pro");

        assert_eq!(
            registry.set_selected_model("9", "gpt-4o"),
            Err(DashboardError::UnknownProvider("9".to_string()))
        );
    }

    #[test]
    fn test_toggles_and_masking() {
        let mut registry = ProviderRegistry::new();
        registry.reconcile(&[tracked("1", "OpenAI")]);
        registry.set_api_key("1", "sk-abc").unwrap();

        assert_eq!(masked_api_key(registry.get("1").unwrap()), "••••••");
        assert_eq!(registry.toggle_show_key("1"), Ok(true));
        assert_eq!(masked_api_key(registry.get("1").unwrap()), "sk-abc");

        assert_eq!(registry.toggle_enabled("1"), Ok(false));
        assert_eq!(registry.toggle_enabled("1"), Ok(true));
        assert!(registry.toggle_enabled("missing").is_err());
    }
}
