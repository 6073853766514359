use crate::api::Persona;
use crate::error::{DashboardError, DashboardResult};
use crate::models::{
    Citation, CitationView, CompetitorModel, GeneralSettings, MonitoringPrompt, TrackedModel,
};
use chrono::Utc;
use fastrand::Rng;

// Ranges for the mock metrics of a newly added model (inclusive)
const SENTIMENT_RANGE: std::ops::RangeInclusive<u8> = 60..=89;
const MENTIONS_RANGE: std::ops::RangeInclusive<u32> = 1000..=5999;
const RESPONSE_TIME_RANGE: std::ops::RangeInclusive<u32> = 500..=999;
const ACCURACY_RANGE: std::ops::RangeInclusive<u8> = 80..=94;
const CITATIONS_RANGE: std::ops::RangeInclusive<u32> = 1000..=20999;

// Host view only lists these top-level domains
const HOST_SUFFIXES: [&str; 2] = [".com", ".ai"];

/// Hands out time-derived ids that are strictly increasing within a session,
/// so two entities created in the same millisecond never share an id.
#[derive(Debug, Default)]
struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    fn next(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last = if now > self.last { now } else { self.last + 1 };
        self.last.to_string()
    }
}

/// In-memory owner of the tracked models, competitors, monitoring prompts and
/// general settings. Nothing here outlives the session.
#[derive(Debug)]
pub struct EntityStore {
    models: Vec<TrackedModel>,
    competitors: Vec<CompetitorModel>,
    prompts: Vec<MonitoringPrompt>,
    citations: Vec<Citation>,
    settings: GeneralSettings,
    ids: IdGenerator,
    rng: Rng,
}

impl EntityStore {
    /// Creates an empty store drawing mock metrics from `rng`.
    pub fn new(rng: Rng) -> Self {
        Self {
            models: Vec::new(),
            competitors: Vec::new(),
            prompts: Vec::new(),
            citations: Vec::new(),
            settings: GeneralSettings::default(),
            ids: IdGenerator::default(),
            rng,
        }
    }

    /// Creates a store pre-populated with the demo models, competitors and prompts.
    pub fn with_seed_data(rng: Rng) -> Self {
        let mut store = Self::new(rng);
        store.models = seed_models();
        store.competitors = seed_competitors();
        store.prompts = seed_prompts();
        store.citations = seed_citations(&mut store.rng);
        log::info!(
            "Seeded store with {} models, {} competitors, {} prompts, {} citations",
            store.models.len(),
            store.competitors.len(),
            store.prompts.len(),
            store.citations.len()
        );
        store
    }

    pub fn models(&self) -> &[TrackedModel] {
        &self.models
    }

    pub fn model(&self, id: &str) -> Option<&TrackedModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn competitors(&self) -> &[CompetitorModel] {
        &self.competitors
    }

    pub fn prompts(&self) -> &[MonitoringPrompt] {
        &self.prompts
    }

    pub fn prompt(&self, id: &str) -> Option<&MonitoringPrompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn settings(&self) -> &GeneralSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut GeneralSettings {
        &mut self.settings
    }

    /// Adds a tracked model with randomized metrics. The rank is the next
    /// position at the time of creation.
    pub fn add_model(&mut self, name: &str) -> DashboardResult<TrackedModel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DashboardError::EmptyField("Model name"));
        }

        let model = TrackedModel {
            id: self.ids.next(),
            name: name.to_string(),
            sentiment: self.rng.u8(SENTIMENT_RANGE),
            mentions: self.rng.u32(MENTIONS_RANGE),
            rank: self.models.len() as u32 + 1,
            change: 0,
            response_time_ms: self.rng.u32(RESPONSE_TIME_RANGE),
            accuracy: self.rng.u8(ACCURACY_RANGE),
            persona: Persona::from_display_name(name),
        };

        log::info!("Tracking new model '{}' with ID: {}", model.name, model.id);
        self.models.push(model.clone());
        Ok(model)
    }

    /// Removes a tracked model. Returns false if nothing matched.
    pub fn remove_model(&mut self, id: &str) -> bool {
        let before = self.models.len();
        self.models.retain(|m| m.id != id);
        let removed = self.models.len() != before;
        if removed {
            log::info!("Removed tracked model {}", id);
        } else {
            log::debug!("Attempted to remove non-existent model: {}", id);
        }
        removed
    }

    /// Adds a monitoring prompt. Label and prompt text are required; blank
    /// country/language tags are dropped.
    pub fn add_prompt(
        &mut self,
        label: &str,
        prompt: &str,
        country: Option<&str>,
        language: Option<&str>,
    ) -> DashboardResult<MonitoringPrompt> {
        let (label, prompt) = (label.trim(), prompt.trim());
        if label.is_empty() {
            return Err(DashboardError::EmptyField("Prompt label"));
        }
        if prompt.is_empty() {
            return Err(DashboardError::EmptyField("Prompt text"));
        }

        let tag = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let new_prompt = MonitoringPrompt {
            id: self.ids.next(),
            label: label.to_string(),
            prompt: prompt.to_string(),
            country: tag(country),
            language: tag(language),
        };

        log::info!("Added monitoring prompt '{}' with ID: {}", new_prompt.label, new_prompt.id);
        self.prompts.push(new_prompt.clone());
        Ok(new_prompt)
    }

    /// Case-insensitive search over label, text, country and language.
    pub fn search_prompts(&self, term: &str) -> Vec<MonitoringPrompt> {
        let term = term.trim().to_lowercase();
        let matches = |field: &str| field.to_lowercase().contains(&term);
        self.prompts
            .iter()
            .filter(|p| {
                matches(&p.label)
                    || matches(&p.prompt)
                    || p.country.as_deref().is_some_and(matches)
                    || p.language.as_deref().is_some_and(matches)
            })
            .cloned()
            .collect()
    }

    /// Citation rows for `view`, keeping those whose shown domain contains
    /// `term` (case-insensitive). The page view matches against the page URL.
    pub fn citations(&self, view: CitationView, term: &str) -> Vec<Citation> {
        let term = term.trim().to_lowercase();
        self.citations
            .iter()
            .filter(|c| match view {
                CitationView::Host => HOST_SUFFIXES.iter().any(|s| c.domain.contains(s)),
                CitationView::Domain | CitationView::Page => true,
            })
            .map(|c| match view {
                CitationView::Page => Citation {
                    domain: format!("https://{}/page/{}", c.domain, c.position),
                    ..c.clone()
                },
                CitationView::Domain | CitationView::Host => c.clone(),
            })
            .filter(|c| c.domain.to_lowercase().contains(&term))
            .collect()
    }

    /// Removes a monitoring prompt. Returns false if nothing matched.
    pub fn remove_prompt(&mut self, id: &str) -> bool {
        let before = self.prompts.len();
        self.prompts.retain(|p| p.id != id);
        let removed = self.prompts.len() != before;
        if removed {
            log::info!("Removed monitoring prompt {}", id);
        }
        removed
    }
}

fn model(id: &str, name: &str, metrics: (u8, u32, u32, i32, u32, u8)) -> TrackedModel {
    let (sentiment, mentions, rank, change, response_time_ms, accuracy) = metrics;
    TrackedModel {
        id: id.to_string(),
        name: name.to_string(),
        sentiment,
        mentions,
        rank,
        change,
        response_time_ms,
        accuracy,
        persona: Persona::from_display_name(name),
    }
}

fn seed_models() -> Vec<TrackedModel> {
    vec![
        model("1", "ChatGPT", (85, 12458, 1, 0, 850, 94)),
        model("2", "Claude", (82, 9234, 2, 1, 720, 92)),
        model("3", "Gemini", (78, 8567, 3, -1, 920, 89)),
        model("4", "Grok", (75, 6234, 4, 0, 880, 87)),
        model("5", "Perplexity", (73, 5123, 5, 2, 650, 90)),
    ]
}

fn seed_competitors() -> Vec<CompetitorModel> {
    vec![
        model("comp1", "Cohere", (79, 7234, 1, 1, 680, 91)),
        model("comp2", "Anthropic Claude 2", (81, 8921, 2, -1, 750, 93)),
        model("comp3", "Mistral AI", (76, 5432, 3, 0, 820, 88)),
        model("comp4", "Stability AI", (72, 4123, 4, 2, 950, 85)),
        model("comp5", "Hugging Face", (70, 3876, 5, -1, 780, 86)),
    ]
}

fn seed_prompts() -> Vec<MonitoringPrompt> {
    [
        (
            "1",
            "Brand Awareness",
            "What do you know about [Brand Name]? Can you tell me about their products and reputation?",
        ),
        (
            "2",
            "Feature Comparison",
            "Compare the key features and capabilities of [Brand Name] with its main competitors.",
        ),
        (
            "3",
            "User Sentiment",
            "What do users typically say about [Brand Name]? What are the main pros and cons?",
        ),
        (
            "4",
            "Market Position",
            "Where does [Brand Name] stand in the market compared to other similar products?",
        ),
    ]
    .into_iter()
    .map(|(id, label, prompt)| MonitoringPrompt {
        id: id.to_string(),
        label: label.to_string(),
        prompt: prompt.to_string(),
        country: None,
        language: None,
    })
    .collect()
}

const CITATION_DOMAINS: [&str; 95] = [
    "openai.com",
    "anthropic.com",
    "google.com",
    "x.ai",
    "perplexity.ai",
    "mistral.ai",
    "cohere.com",
    "stability.ai",
    "huggingface.co",
    "replicate.com",
    "meta.ai",
    "microsoft.com",
    "apple.com",
    "amazon.com",
    "tesla.com",
    "nvidia.com",
    "intel.com",
    "ibm.com",
    "oracle.com",
    "salesforce.com",
    "adobe.com",
    "spotify.com",
    "netflix.com",
    "twitter.com",
    "linkedin.com",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "snapchat.com",
    "pinterest.com",
    "reddit.com",
    "quora.com",
    "stackoverflow.com",
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "heroku.com",
    "vercel.com",
    "netlify.com",
    "aws.amazon.com",
    "azure.microsoft.com",
    "gcp.google.com",
    "digitalocean.com",
    "linode.com",
    "vultr.com",
    "hetzner.com",
    "ovh.com",
    "godaddy.com",
    "namecheap.com",
    "cloudflare.com",
    "fastly.com",
    "akamai.com",
    "cdnjs.com",
    "unpkg.com",
    "jsdelivr.net",
    "esm.sh",
    "skypack.dev",
    "jspm.org",
    "deno.land",
    "bun.sh",
    "node.js",
    "npmjs.com",
    "yarnpkg.com",
    "pnpm.io",
    "rushjs.io",
    "lerna.js.org",
    "nx.dev",
    "turborepo.com",
    "parceljs.org",
    "webpack.js.org",
    "vitejs.dev",
    "rollupjs.org",
    "esbuild.github.io",
    "swc.rs",
    "babeljs.io",
    "typescriptlang.org",
    "eslint.org",
    "prettier.io",
    "stylelint.io",
    "jestjs.io",
    "vitest.dev",
    "cypress.io",
    "playwright.dev",
    "selenium.dev",
    "puppeteer.dev",
    "cheerio.js.org",
    "axios-http.com",
    "gotjs.github.io",
    "node-fetch.netlify.app",
    "undici.nodejs.org",
    "superagent-http.com",
    "request.mitre.org",
    "urllib3.readthedocs.io",
    "requests.readthedocs.io",
    "httpx.readthedocs.io",
];

fn seed_citations(rng: &mut Rng) -> Vec<Citation> {
    CITATION_DOMAINS
        .iter()
        .zip(1..)
        .map(|(domain, position)| Citation {
            domain: domain.to_string(),
            total_citations: rng.u32(CITATIONS_RANGE),
            position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntityStore {
        EntityStore::new(Rng::with_seed(7))
    }

    #[test]
    fn test_add_model_assigns_next_rank_and_metric_ranges() {
        let mut store = store();
        for i in 0..20 {
            let model = store.add_model(&format!("Model {i}")).unwrap();
            assert_eq!(model.rank, i + 1);
            assert_eq!(model.change, 0);
            assert!(SENTIMENT_RANGE.contains(&model.sentiment));
            assert!(MENTIONS_RANGE.contains(&model.mentions));
            assert!(RESPONSE_TIME_RANGE.contains(&model.response_time_ms));
            assert!(ACCURACY_RANGE.contains(&model.accuracy));
        }
        assert_eq!(store.models().len(), 20);
    }

    #[test]
    fn test_add_model_trims_and_rejects_blank_names() {
        let mut store = store();
        assert_eq!(store.add_model("   "), Err(DashboardError::EmptyField("Model name")));
        assert!(store.models().is_empty());

        let model = store.add_model("  Llama  ").unwrap();
        assert_eq!(model.name, "Llama");
        assert_eq!(model.persona, None);
    }

    #[test]
    fn test_ids_are_unique_within_a_session() {
        let mut store = store();
        let a = store.add_model("A").unwrap();
        let b = store.add_model("B").unwrap();
        let p = store.add_prompt("Label", "Text", None, None).unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, p.id);
        assert!(b.id.parse::<i64>().unwrap() > a.id.parse::<i64>().unwrap());
    }

    #[test]
    fn test_remove_model_is_idempotent_and_keeps_ranks() {
        let mut store = store();
        let a = store.add_model("A").unwrap();
        let b = store.add_model("B").unwrap();

        assert!(store.remove_model(&a.id));
        assert!(!store.remove_model(&a.id));
        assert_eq!(store.models().len(), 1);
        assert_eq!(store.model(&b.id).unwrap().rank, 2);

        // Rank is a static label: the next model continues from the current count
        let c = store.add_model("C").unwrap();
        assert_eq!(c.rank, 2);
    }

    #[test]
    fn test_add_prompt_requires_label_and_text() {
        let mut store = store();
        assert!(store.add_prompt("", "text", None, None).is_err());
        assert!(store.add_prompt("label", "  ", None, None).is_err());
        assert!(store.prompts().is_empty());

        let prompt = store
            .add_prompt(" Awareness ", " About [Brand Name] ", Some("US"), Some(" "))
            .unwrap();
        assert_eq!(prompt.label, "Awareness");
        assert_eq!(prompt.prompt, "About [Brand Name]");
        assert_eq!(prompt.country.as_deref(), Some("US"));
        assert_eq!(prompt.language, None);

        assert!(store.remove_prompt(&prompt.id));
        assert!(!store.remove_prompt(&prompt.id));
    }

    #[test]
    fn test_search_prompts_matches_tags() {
        let mut store = EntityStore::with_seed_data(Rng::with_seed(1));
        store
            .add_prompt("Local", "¿Qué sabes sobre [Brand Name]?", Some("Spain"), Some("Spanish"))
            .unwrap();

        assert_eq!(store.search_prompts("spanish").len(), 1);
        assert_eq!(store.search_prompts("COMPARE").len(), 2);
        assert_eq!(store.search_prompts("").len(), 5);
        assert!(store.search_prompts("nothing like this").is_empty());
    }

    #[test]
    fn test_seed_data() {
        let store = EntityStore::with_seed_data(Rng::with_seed(1));
        assert_eq!(store.models().len(), 5);
        assert_eq!(store.competitors().len(), 5);
        assert_eq!(store.prompts().len(), 4);
        assert_eq!(store.model("1").unwrap().persona, Some(Persona::ChatGpt));
        assert_eq!(store.competitors()[0].persona, None);
        assert!(EntityStore::new(Rng::with_seed(1))
            .citations(CitationView::Domain, "")
            .is_empty());
    }

    #[test]
    fn test_citation_views() {
        let store = EntityStore::with_seed_data(Rng::with_seed(1));

        let domains = store.citations(CitationView::Domain, "");
        assert_eq!(domains.len(), 95);
        assert_eq!(domains[0].domain, "openai.com");
        assert_eq!(domains[0].position, 1);
        assert!(domains.iter().all(|c| CITATIONS_RANGE.contains(&c.total_citations)));

        let hosts = store.citations(CitationView::Host, "");
        assert_eq!(hosts.len(), 57);
        assert!(hosts.iter().all(|c| c.domain.contains(".com") || c.domain.contains(".ai")));

        let pages = store.citations(CitationView::Page, "");
        assert_eq!(pages.len(), 95);
        assert_eq!(pages[2].domain, "https://google.com/page/3");
        assert_eq!(pages[2].total_citations, domains[2].total_citations);
    }

    #[test]
    fn test_citation_search_is_case_insensitive_per_view() {
        let store = EntityStore::with_seed_data(Rng::with_seed(1));

        assert_eq!(store.citations(CitationView::Domain, "AI").len(), 7);
        assert_eq!(store.citations(CitationView::Domain, "huggingface").len(), 1);
        // huggingface.co is neither .com nor .ai
        assert!(store.citations(CitationView::Host, "huggingface").is_empty());
        assert_eq!(store.citations(CitationView::Host, "Google").len(), 2);
        assert_eq!(store.citations(CitationView::Page, "PAGE/3").len(), 11);
        assert!(store.citations(CitationView::Domain, "page/3").is_empty());
    }
}
