use crate::corpus::{Metrics, PatternSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SuccessRate,
    ShortPrompts,
    LongPrompts,
    CorrectionChains,
    TokenUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
}

const SHORT_PROMPT_LIMIT: usize = 3;
const LONG_PROMPT_LIMIT: usize = 3;
const TOKEN_COST_LIMIT: u64 = 50_000;

impl Insight {
    fn new(severity: Severity, category: Category, message: String) -> Self {
        Self {
            severity,
            category,
            message,
        }
    }
}

/// Threshold rules over metrics and patterns. Rules are independent of each
/// other; the success-rate bands are exclusive and 70-80% says nothing.
pub fn generate(metrics: &Metrics, patterns: &PatternSet) -> Vec<Insight> {
    let mut insights = Vec::new();
    let rate = metrics.first_time_success_rate;

    if rate < 50.0 {
        insights.push(Insight::new(
            Severity::Warning,
            Category::SuccessRate,
            format!(
                "Only {rate}% of prompts landed without a follow-up correction. \
                 Over half need another round; be more specific about the expected outcome, \
                 constraints, and files involved."
            ),
        ));
    } else if rate < 70.0 {
        insights.push(Insight::new(
            Severity::Info,
            Category::SuccessRate,
            format!(
                "{rate}% of prompts landed first time. There is room to push this toward 80% \
                 by stating acceptance criteria up front."
            ),
        ));
    } else if rate >= 80.0 {
        insights.push(Insight::new(
            Severity::Success,
            Category::SuccessRate,
            format!("{rate}% of prompts landed first time. You are prompting effectively."),
        ));
    }

    let short = patterns.very_short.len();
    if short > SHORT_PROMPT_LIMIT {
        insights.push(Insight::new(
            Severity::Warning,
            Category::ShortPrompts,
            format!(
                "{short} very short prompts found. Short prompts often lack the context \
                 needed to get it right the first time."
            ),
        ));
    }

    let long = patterns.very_long.len();
    if long > LONG_PROMPT_LIMIT {
        insights.push(Insight::new(
            Severity::Info,
            Category::LongPrompts,
            format!(
                "{long} very long prompts found. Consider trimming them or pointing at files \
                 instead of pasting their contents."
            ),
        ));
    }

    let chains = patterns.correction_chains.len();
    if chains > 0 {
        insights.push(Insight::new(
            Severity::Warning,
            Category::CorrectionChains,
            format!(
                "{chains} correction chain(s) detected. When corrections pile up, stop and \
                 re-explain the goal from scratch instead of patching."
            ),
        ));
    }

    let cost = metrics.avg_tokens_per_prompt;
    if cost > TOKEN_COST_LIMIT {
        insights.push(Insight::new(
            Severity::Info,
            Category::TokenUsage,
            format!(
                "Responses average {cost} tokens per prompt. More focused requests keep \
                 context and cost down."
            ),
        ));
    }

    insights
}
