//! Cross-session aggregation: merge, order, measure, and find structural patterns.

use crate::analyze::{Prompt, SessionAnalysis};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 100;
pub const SHORT_PROMPT_CHARS: usize = 20;
pub const LONG_PROMPT_CHARS: usize = 2000;
pub const CHAIN_TEXT_CHARS: usize = 100;

const MAX_SHORT: usize = 5;
const MAX_LONG: usize = 5;
const MAX_TRIGGERED: usize = 10;

/// One session's analysis tagged with where it came from.
#[derive(Debug)]
pub struct SessionResult {
    pub project: String,
    pub analysis: SessionAnalysis,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_prompts: usize,
    pub corrections: usize,
    pub acknowledgments: usize,
    pub followed_by_correction: usize,
    /// Percentage, one decimal.
    pub first_time_success_rate: f64,
    /// Mean characters per prompt, rounded.
    pub avg_prompt_length: u64,
    /// Mean input+output tokens over prompts with a linked response, rounded.
    pub avg_tokens_per_prompt: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionChain {
    /// Offset of the first member in the sequence that was scanned.
    pub start: usize,
    pub length: usize,
    pub texts: Vec<String>,
}

/// Structural findings over the corpus. Prompt lists hold indices into
/// [`Corpus::prompts`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PatternSet {
    pub very_short: Vec<usize>,
    pub very_long: Vec<usize>,
    pub correction_chains: Vec<CorrectionChain>,
    pub triggered_corrections: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct Corpus {
    /// Most recent first, at most `limit` entries.
    pub prompts: Vec<Prompt>,
    /// Prompts across all sessions before truncation.
    pub total_found: usize,
    pub metrics: Metrics,
    pub patterns: PatternSet,
}

impl Corpus {
    pub fn prompt(&self, idx: usize) -> &Prompt {
        &self.prompts[idx]
    }
}

/// Merge per-session prompts, newest first, keep the `limit` most recent,
/// then compute metrics and patterns over what was kept.
pub fn merge(sessions: &[SessionResult], limit: usize) -> Corpus {
    let mut prompts: Vec<Prompt> = sessions
        .iter()
        .flat_map(|s| {
            s.analysis.prompts.iter().map(|p| Prompt {
                project: s.project.clone(),
                ..p.clone()
            })
        })
        .collect();
    let total_found = prompts.len();

    // Stable sort; prompts without a timestamp sink to the end.
    prompts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    prompts.truncate(limit);

    let metrics = compute_metrics(&prompts);
    let patterns = detect_patterns(&prompts);
    Corpus {
        prompts,
        total_found,
        metrics,
        patterns,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn compute_metrics(prompts: &[Prompt]) -> Metrics {
    let total_prompts = prompts.len();
    let corrections = prompts.iter().filter(|p| p.is_correction).count();
    let acknowledgments = prompts.iter().filter(|p| p.is_acknowledgment).count();
    let followed_by_correction = prompts.iter().filter(|p| p.followed_by_correction).count();

    let substantive: Vec<&Prompt> = prompts.iter().filter(|p| p.is_substantive()).collect();
    let first_time_success_rate = if substantive.is_empty() {
        0.0
    } else {
        let clean = substantive
            .iter()
            .filter(|p| !p.followed_by_correction)
            .count();
        round1(clean as f64 / substantive.len() as f64 * 100.0)
    };

    let avg_prompt_length = if total_prompts == 0 {
        0
    } else {
        let chars: usize = prompts.iter().map(|p| p.char_count).sum();
        (chars as f64 / total_prompts as f64).round() as u64
    };

    let costs: Vec<u64> = prompts
        .iter()
        .filter_map(|p| p.usage.map(|u| u.cost()))
        .collect();
    let avg_tokens_per_prompt = if costs.is_empty() {
        0
    } else {
        (costs.iter().sum::<u64>() as f64 / costs.len() as f64).round() as u64
    };

    Metrics {
        total_prompts,
        corrections,
        acknowledgments,
        followed_by_correction,
        first_time_success_rate,
        avg_prompt_length,
        avg_tokens_per_prompt,
    }
}

pub fn detect_patterns(prompts: &[Prompt]) -> PatternSet {
    let indices = |pred: &dyn Fn(&Prompt) -> bool, max: usize| -> Vec<usize> {
        prompts
            .iter()
            .enumerate()
            .filter(|(_, p)| pred(p))
            .map(|(i, _)| i)
            .take(max)
            .collect()
    };

    PatternSet {
        very_short: indices(
            &|p: &Prompt| p.char_count < SHORT_PROMPT_CHARS && p.is_substantive(),
            MAX_SHORT,
        ),
        very_long: indices(&|p: &Prompt| p.char_count > LONG_PROMPT_CHARS, MAX_LONG),
        correction_chains: correction_chains(prompts),
        triggered_corrections: indices(
            &|p: &Prompt| p.followed_by_correction && !p.is_correction,
            MAX_TRIGGERED,
        ),
    }
}

/// Maximal runs of two or more consecutive correction prompts, in the order given.
pub fn correction_chains(prompts: &[Prompt]) -> Vec<CorrectionChain> {
    let mut chains = Vec::new();
    let mut start = 0;
    while start < prompts.len() {
        if !prompts[start].is_correction {
            start += 1;
            continue;
        }
        let end = prompts[start..]
            .iter()
            .position(|p| !p.is_correction)
            .map_or(prompts.len(), |n| start + n);
        if end - start >= 2 {
            chains.push(CorrectionChain {
                start,
                length: end - start,
                texts: prompts[start..end]
                    .iter()
                    .map(|p| truncate_chars(&p.text, CHAIN_TEXT_CHARS))
                    .collect(),
            });
        }
        start = end;
    }
    chains
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
