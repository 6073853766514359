use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::Persona;

// Represents an AI model the user is tracking (competitors share the shape)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedModel {
    pub id: String,
    pub name: String,
    pub sentiment: u8, // 0-100
    pub mentions: u32,
    pub rank: u32, // Static label assigned at creation, never renumbered
    pub change: i32, // Rank delta
    pub response_time_ms: u32,
    pub accuracy: u8, // 0-100
    // Canned-response style, fixed when the model is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
}

pub type CompetitorModel = TrackedModel;

// A saved question template used to gauge brand perception
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringPrompt {
    pub id: String,
    pub label: String,
    pub prompt: String, // May contain the `[Brand Name]` placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

// Per-tracked-model provider settings, derived from the tracked-model set
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String, // Same id as the tracked model it belongs to
    pub name: String,
    pub enabled: bool,
    pub api_key: String, // Literal key or an `env:VAR` reference
    pub show_key: bool, // UI-only reveal flag
    pub models: Vec<String>,
    pub selected_model: String, // Always a member of `models`
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// Represents a single message in the chat transcript
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatMessage {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub role: Role,
    pub content: String, // Grows in place while an assistant reply streams
    // Name of the responding model, assistant messages only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            llm: None,
            timestamp: Utc::now(),
        }
    }

    /// An empty assistant placeholder that a stream fills in.
    pub fn assistant_placeholder(llm: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: String::new(),
            llm: Some(llm.into()),
            timestamp: Utc::now(),
        }
    }
}

pub const AUTOMATION_INTERVALS: [u32; 7] = [15, 30, 60, 180, 360, 720, 1440];
pub const TIME_RANGES: [&str; 4] = ["24h", "7d", "30d", "90d"];

// Session-wide settings from the "General" settings tab
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    pub brand_name: String, // Replaces `[Brand Name]` when a prompt is applied
    pub automation_interval_minutes: u32,
    pub time_range: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            brand_name: String::new(),
            automation_interval_minutes: 30,
            time_range: "7d".to_string(),
        }
    }
}

// Aggregates shown on the metrics cards
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_mentions: u64,
    pub avg_sentiment: u32,
    pub avg_response_time_ms: u32,
    pub avg_accuracy: u32,
    pub tracked_count: usize,
}

// A site AI models cite when answering, with its mock citation count
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub domain: String, // Bare domain, or the page URL in the page view
    pub total_citations: u32,
    pub position: u32, // 1-based place in the citation list
}

/// How the citations table groups its rows.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CitationView {
    #[default]
    Domain,
    Host,
    Page,
}
