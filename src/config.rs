use crate::models::{ProviderConfig, AUTOMATION_INTERVALS};
use anyhow::{Context, Result};

// --- Startup configuration ---

const ENV_SEED: &str = "LLM_PULSE_SEED";
const ENV_BRAND: &str = "LLM_PULSE_BRAND";
const ENV_INTERVAL: &str = "LLM_PULSE_INTERVAL";
const ENV_NO_SEED_DATA: &str = "LLM_PULSE_NO_SEED_DATA";

/// Settings read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Seed for every random draw (mock metrics, stream delays). Unset means
    /// a fresh seed per session.
    pub seed: Option<u64>,
    pub brand_name: String,
    pub automation_interval_minutes: u32,
    pub seed_demo_data: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            seed: None,
            brand_name: String::new(),
            automation_interval_minutes: 30,
            seed_demo_data: true,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(seed) = lookup(ENV_SEED) {
            let seed = seed
                .trim()
                .parse::<u64>()
                .context(format!("Failed to parse {} as an unsigned integer", ENV_SEED))?;
            config.seed = Some(seed);
        }

        if let Some(brand) = lookup(ENV_BRAND) {
            config.brand_name = brand.trim().to_string();
        }

        if let Some(interval) = lookup(ENV_INTERVAL) {
            let minutes = interval
                .trim()
                .parse::<u32>()
                .context(format!("Failed to parse {} as minutes", ENV_INTERVAL))?;
            if !AUTOMATION_INTERVALS.contains(&minutes) {
                anyhow::bail!(
                    "{} must be one of {:?}, got {}",
                    ENV_INTERVAL,
                    AUTOMATION_INTERVALS,
                    minutes
                );
            }
            config.automation_interval_minutes = minutes;
        }

        if let Some(flag) = lookup(ENV_NO_SEED_DATA) {
            config.seed_demo_data = !matches!(flag.trim(), "1" | "true" | "yes");
        }

        log::debug!("Loaded dashboard config: {:?}", config);
        Ok(config)
    }

    pub fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}

// --- API Key Retrieval ---

/// Resolves the effective API key of a provider config. A key of the form
/// `env:VAR` is read from the environment; anything else is used verbatim.
pub fn resolve_api_key(config: &ProviderConfig) -> Result<String> {
    resolve_api_key_with(config, |key| std::env::var(key).ok())
}

pub fn resolve_api_key_with(
    config: &ProviderConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    match config.api_key.trim() {
        "" => Err(anyhow::anyhow!(
            "API key not set for provider '{}'. Please set it in settings.",
            config.name
        )),
        key if key.starts_with("env:") => {
            let env_var_name = key.trim_start_matches("env:");
            log::debug!("Retrieving API key from environment variable: {}", env_var_name);
            lookup(env_var_name).context(format!(
                "Failed to get API key from environment variable '{}'",
                env_var_name
            ))
        }
        key => Ok(key.to_string()),
    }
}
