use crate::models::{DashboardSummary, TrackedModel};

/// Totals and rounded averages for the metrics cards. An empty set yields
/// zeros rather than dividing by zero.
pub fn summarize(models: &[TrackedModel]) -> DashboardSummary {
    if models.is_empty() {
        return DashboardSummary::default();
    }

    let count = models.len() as f64;
    let avg = |f: fn(&TrackedModel) -> u32| {
        (models.iter().map(|m| f(m) as f64).sum::<f64>() / count).round() as u32
    };

    DashboardSummary {
        total_mentions: models.iter().map(|m| m.mentions as u64).sum(),
        avg_sentiment: avg(|m| m.sentiment as u32),
        avg_response_time_ms: avg(|m| m.response_time_ms),
        avg_accuracy: avg(|m| m.accuracy as u32),
        tracked_count: models.len(),
    }
}

/// Models ordered by their rank label; equal ranks keep insertion order.
pub fn rankings(models: &[TrackedModel]) -> Vec<TrackedModel> {
    let mut sorted = models.to_vec();
    sorted.sort_by_key(|m| m.rank);
    sorted
}
