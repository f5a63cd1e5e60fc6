//! Token pricing for cost estimates.

use super::provider::Usage;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const GPT_4O: ModelRate = ModelRate { input_per_million: 2.50, output_per_million: 10.00 };

/// Longest prefixes first so `gpt-4o-mini-*` does not price as `gpt-4o`.
const RATES: &[(&str, ModelRate)] = &[
    ("gpt-4o-mini", ModelRate { input_per_million: 0.15, output_per_million: 0.60 }),
    ("gpt-4-turbo", ModelRate { input_per_million: 10.00, output_per_million: 30.00 }),
    ("gpt-4o", GPT_4O),
];

/// Rate for `model`: exact name, then prefix (dated snapshots), else gpt-4o.
pub fn rate_for(model: &str) -> ModelRate {
    RATES
        .iter()
        .find(|(name, _)| *name == model)
        .or_else(|| RATES.iter().find(|(name, _)| model.starts_with(name)))
        .map(|(_, rate)| *rate)
        .unwrap_or(GPT_4O)
}

/// Estimated USD cost of one call.
pub fn estimate_cost(model: &str, usage: &Usage) -> f64 {
    let rate = rate_for(model);
    (usage.prompt_tokens as f64 / 1_000_000.0) * rate.input_per_million
        + (usage.completion_tokens as f64 / 1_000_000.0) * rate.output_per_million
}
