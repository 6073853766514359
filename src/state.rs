use crate::api::ResponseSource;
use crate::config::DashboardConfig;
use crate::engine::{ResponseEngine, StreamOutcome};
use crate::error::{DashboardError, DashboardResult};
use crate::models::{MonitoringPrompt, TrackedModel};
use crate::providers::ProviderRegistry;
use crate::storage::EntityStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 1024;

/// Notifications for the presentation layer.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DashboardEvent {
    ModelsChanged { count: usize },
    ProvidersChanged { count: usize },
    PromptsChanged { count: usize },
    #[serde(rename_all = "camelCase")]
    AssistantMessageChunk {
        message_id: Uuid,
        delta: String,
        content: String,
        is_first_chunk: bool,
    },
    #[serde(rename_all = "camelCase")]
    AssistantStreamFinished {
        message_id: Uuid,
        outcome: StreamOutcome,
    },
}

/// Entity store plus everything derived from it. All model-set changes go
/// through here so provider sync always runs.
pub struct Dashboard {
    pub store: EntityStore,
    pub providers: ProviderRegistry,
    pub selected_model: Option<String>, // Tracked model the chat talks to
    events: broadcast::Sender<DashboardEvent>,
}

impl Dashboard {
    pub fn new(store: EntityStore, events: broadcast::Sender<DashboardEvent>) -> Self {
        let selected_model = store.models().first().map(|m| m.id.clone());
        let mut dashboard = Self {
            store,
            providers: ProviderRegistry::new(),
            selected_model,
            events,
        };
        dashboard.on_models_changed();
        dashboard
    }

    pub fn add_model(&mut self, name: &str) -> DashboardResult<TrackedModel> {
        let model = self.store.add_model(name)?;
        self.on_models_changed();
        Ok(model)
    }

    pub fn remove_model(&mut self, id: &str) -> bool {
        let removed = self.store.remove_model(id);
        if removed {
            self.on_models_changed();
        }
        removed
    }

    pub fn add_prompt(
        &mut self,
        label: &str,
        prompt: &str,
        country: Option<&str>,
        language: Option<&str>,
    ) -> DashboardResult<MonitoringPrompt> {
        let prompt = self.store.add_prompt(label, prompt, country, language)?;
        self.emit(DashboardEvent::PromptsChanged {
            count: self.store.prompts().len(),
        });
        Ok(prompt)
    }

    pub fn remove_prompt(&mut self, id: &str) -> bool {
        let removed = self.store.remove_prompt(id);
        if removed {
            self.emit(DashboardEvent::PromptsChanged {
                count: self.store.prompts().len(),
            });
        }
        removed
    }

    /// Model-set-changed hook: reconciles provider configs and drops a chat
    /// selection that no longer points at a tracked model.
    pub fn on_models_changed(&mut self) {
        let models = self.store.models();
        self.emit(DashboardEvent::ModelsChanged { count: models.len() });

        if self.providers.reconcile(models) {
            self.emit(DashboardEvent::ProvidersChanged {
                count: self.providers.configs().len(),
            });
        }

        if let Some(selected) = &self.selected_model {
            if self.store.model(selected).is_none() {
                log::warn!("Chat model {} was removed; clearing selection", selected);
                self.selected_model = None;
            }
        }
    }

    pub fn select_chat_model(&mut self, id: &str) -> DashboardResult<()> {
        if self.store.model(id).is_none() {
            return Err(DashboardError::UnknownModel(id.to_string()));
        }
        self.selected_model = Some(id.to_string());
        Ok(())
    }

    pub fn chat_model(&self) -> Option<&TrackedModel> {
        self.selected_model
            .as_deref()
            .and_then(|id| self.store.model(id))
    }

    fn emit(&self, event: DashboardEvent) {
        if self.events.send(event).is_err() {
            log::trace!("No subscribers for dashboard event");
        }
    }
}

// Core application state handed to every command
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Mutex<Dashboard>>,
    pub engine: ResponseEngine,
    events: broadcast::Sender<DashboardEvent>,
}

impl AppState {
    pub fn new(config: &DashboardConfig, source: Arc<dyn ResponseSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut rng = config.rng();

        let mut store = if config.seed_demo_data {
            EntityStore::with_seed_data(rng.fork())
        } else {
            EntityStore::new(rng.fork())
        };
        store.settings_mut().brand_name = config.brand_name.clone();
        store.settings_mut().automation_interval_minutes = config.automation_interval_minutes;

        let dashboard = Dashboard::new(store, events.clone());
        let engine = ResponseEngine::new(source, rng, events.clone());

        Self {
            dashboard: Arc::new(Mutex::new(dashboard)),
            engine,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }
}
