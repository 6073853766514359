// Commands exposed to the presentation layer

use crate::engine::StreamHandle;
use crate::error::DashboardError;
use crate::metrics;
use crate::models::{
    ChatMessage, Citation, CitationView, CompetitorModel, DashboardSummary, GeneralSettings,
    MonitoringPrompt, ProviderConfig, TrackedModel, AUTOMATION_INTERVALS, TIME_RANGES,
};
use crate::state::AppState;
use uuid::Uuid;

const BRAND_PLACEHOLDER: &str = "[Brand Name]";

// Logs a rejection and turns it into a message for the frontend
fn rejected(action: &str, e: DashboardError) -> String {
    log::warn!("{} rejected: {}", action, e);
    format!("{}: {}", action, e)
}

// --- Tracked models ---

pub async fn list_models(state: &AppState) -> Result<Vec<TrackedModel>, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(dashboard.store.models().to_vec())
}

pub async fn rankings(state: &AppState) -> Result<Vec<TrackedModel>, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(metrics::rankings(dashboard.store.models()))
}

pub async fn list_competitors(state: &AppState) -> Result<Vec<CompetitorModel>, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(metrics::rankings(dashboard.store.competitors()))
}

pub async fn add_model(state: &AppState, name: String) -> Result<TrackedModel, String> {
    log::info!("Frontend requested to add model: {}", name);
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .add_model(&name)
        .map_err(|e| rejected("Failed to add model", e))
}

/// Idempotent: removing an unknown id succeeds and changes nothing.
pub async fn remove_model(state: &AppState, model_id: String) -> Result<(), String> {
    log::info!("Frontend requested to remove model ID: {}", model_id);
    let mut dashboard = state.dashboard.lock().await;
    dashboard.remove_model(&model_id);
    Ok(())
}

/// Everything the presentation layer renders, as one JSON document.
pub async fn dashboard_snapshot(state: &AppState) -> Result<serde_json::Value, String> {
    let dashboard = state.dashboard.lock().await;
    let snapshot = serde_json::json!({
        "models": dashboard.store.models(),
        "competitors": metrics::rankings(dashboard.store.competitors()),
        "prompts": dashboard.store.prompts(),
        "citations": dashboard.store.citations(CitationView::Domain, ""),
        "providers": dashboard.providers.configs(),
        "summary": metrics::summarize(dashboard.store.models()),
        "settings": dashboard.store.settings(),
        "selectedModel": dashboard.selected_model,
    });
    Ok(snapshot)
}

pub async fn dashboard_summary(state: &AppState) -> Result<DashboardSummary, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(metrics::summarize(dashboard.store.models()))
}

// --- Citations ---

pub async fn list_citations(
    state: &AppState,
    view: CitationView,
    term: String,
) -> Result<Vec<Citation>, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(dashboard.store.citations(view, &term))
}

// --- Monitoring prompts ---

pub async fn list_prompts(state: &AppState) -> Result<Vec<MonitoringPrompt>, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(dashboard.store.prompts().to_vec())
}

pub async fn search_prompts(
    state: &AppState,
    term: String,
) -> Result<Vec<MonitoringPrompt>, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(dashboard.store.search_prompts(&term))
}

pub async fn add_prompt(
    state: &AppState,
    label: String,
    prompt: String,
    country: Option<String>,
    language: Option<String>,
) -> Result<MonitoringPrompt, String> {
    log::info!("Frontend requested to add prompt: {}", label);
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .add_prompt(&label, &prompt, country.as_deref(), language.as_deref())
        .map_err(|e| rejected("Failed to add prompt", e))
}

pub async fn remove_prompt(state: &AppState, prompt_id: String) -> Result<(), String> {
    log::info!("Frontend requested to remove prompt ID: {}", prompt_id);
    let mut dashboard = state.dashboard.lock().await;
    dashboard.remove_prompt(&prompt_id);
    Ok(())
}

/// Text to load into the chat input for a saved prompt, with the configured
/// brand name filled in.
pub async fn apply_prompt(state: &AppState, prompt_id: String) -> Result<String, String> {
    let dashboard = state.dashboard.lock().await;
    let prompt = dashboard
        .store
        .prompt(&prompt_id)
        .ok_or_else(|| {
            rejected(
                "Failed to apply prompt",
                DashboardError::UnknownPrompt(prompt_id.clone()),
            )
        })?;

    let brand = dashboard.store.settings().brand_name.trim();
    if brand.is_empty() {
        Ok(prompt.prompt.clone())
    } else {
        Ok(prompt.prompt.replace(BRAND_PLACEHOLDER, brand))
    }
}

// --- Provider configs ---

pub async fn list_providers(state: &AppState) -> Result<Vec<ProviderConfig>, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(dashboard.providers.configs().to_vec())
}

pub async fn toggle_enabled(state: &AppState, provider_id: String) -> Result<bool, String> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .providers
        .toggle_enabled(&provider_id)
        .map_err(|e| rejected("Failed to toggle provider", e))
}

pub async fn set_api_key(
    state: &AppState,
    provider_id: String,
    api_key: String,
) -> Result<(), String> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .providers
        .set_api_key(&provider_id, &api_key)
        .map_err(|e| rejected("Failed to set API key", e))
}

pub async fn toggle_show_key(state: &AppState, provider_id: String) -> Result<bool, String> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .providers
        .toggle_show_key(&provider_id)
        .map_err(|e| rejected("Failed to toggle key visibility", e))
}

pub async fn set_selected_model(
    state: &AppState,
    provider_id: String,
    model: String,
) -> Result<(), String> {
    log::info!("Frontend requested model {} for provider {}", model, provider_id);
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .providers
        .set_selected_model(&provider_id, &model)
        .map_err(|e| rejected("Failed to select model", e))
}

// --- Chat ---

pub async fn select_chat_model(state: &AppState, model_id: String) -> Result<(), String> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard
        .select_chat_model(&model_id)
        .map_err(|e| rejected("Failed to select chat model", e))
}

/// Appends the user message and starts streaming the reply of the selected
/// chat model. Returns as soon as the placeholder is in the transcript.
pub async fn send_message(state: &AppState, content: String) -> Result<StreamHandle, String> {
    log::info!("Frontend requested to send a message ({} chars)", content.len());
    // Snapshot the model so the dashboard lock is not held while streaming
    let model = {
        let dashboard = state.dashboard.lock().await;
        match (&dashboard.selected_model, dashboard.chat_model()) {
            (Some(id), None) => {
                let e = DashboardError::UnknownModel(id.clone());
                return Err(rejected("Failed to send message", e));
            }
            (_, model) => model.cloned(),
        }
    };

    state
        .engine
        .submit(&content, model.as_ref())
        .await
        .map_err(|e| rejected("Failed to send message", e))
}

pub async fn stop_generation(state: &AppState, message_id: String) -> Result<(), String> {
    log::warn!("Frontend requested to stop generation for message ID: {}", message_id);
    let Ok(msg_uuid) = Uuid::parse_str(&message_id) else {
        let err_msg = format!("Invalid message ID format for stop: {}", message_id);
        log::error!("{}", err_msg);
        return Err(err_msg);
    };
    state.engine.stop(msg_uuid).await;
    Ok(())
}

pub async fn get_messages(state: &AppState) -> Result<Vec<ChatMessage>, String> {
    Ok(state.engine.messages().await)
}

pub async fn clear_messages(state: &AppState) -> Result<(), String> {
    state
        .engine
        .clear()
        .await
        .map_err(|e| rejected("Failed to clear messages", e))
}

// --- General settings ---

pub async fn get_settings(state: &AppState) -> Result<GeneralSettings, String> {
    let dashboard = state.dashboard.lock().await;
    Ok(dashboard.store.settings().clone())
}

pub async fn set_brand_name(state: &AppState, brand_name: String) -> Result<(), String> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.store.settings_mut().brand_name = brand_name.trim().to_string();
    log::info!("Brand name set to '{}'", dashboard.store.settings().brand_name);
    Ok(())
}

pub async fn set_automation_interval(state: &AppState, minutes: u32) -> Result<(), String> {
    if !AUTOMATION_INTERVALS.contains(&minutes) {
        return Err(rejected(
            "Failed to set automation interval",
            DashboardError::InvalidSetting {
                setting: "automation interval",
                value: minutes.to_string(),
            },
        ));
    }
    let mut dashboard = state.dashboard.lock().await;
    dashboard.store.settings_mut().automation_interval_minutes = minutes;
    Ok(())
}

pub async fn set_time_range(state: &AppState, time_range: String) -> Result<(), String> {
    if !TIME_RANGES.contains(&time_range.as_str()) {
        return Err(rejected(
            "Failed to set time range",
            DashboardError::InvalidSetting {
                setting: "time range",
                value: time_range,
            },
        ));
    }
    let mut dashboard = state.dashboard.lock().await;
    dashboard.store.settings_mut().time_range = time_range;
    Ok(())
}
