//! Per-session prompt reconstruction.
//!
//! Walks one transcript's records in append order, turning qualifying user
//! messages into [`Prompt`]s. Each prompt is linked to the usage of the most
//! recent assistant response that followed it, and is flagged when the next
//! prompt in the session is a correction.

use crate::classify::Classifier;
use crate::transcript::{LogRecord, RecordKind, UsageCounters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cache_creation_input_tokens: u64,
}

impl Usage {
    /// Input plus output tokens, the per-response cost used by metrics.
    pub fn cost(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl From<UsageCounters> for Usage {
    fn from(c: UsageCounters) -> Self {
        Self {
            input_tokens: c.input_tokens.unwrap_or(0),
            output_tokens: c.output_tokens.unwrap_or(0),
            cache_read_input_tokens: c.cache_read_input_tokens.unwrap_or(0),
            cache_creation_input_tokens: c.cache_creation_input_tokens.unwrap_or(0),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_input_tokens += other.cache_read_input_tokens;
        self.cache_creation_input_tokens += other.cache_creation_input_tokens;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub timestamp: Option<DateTime<Utc>>,
    pub text: String,
    pub char_count: usize,
    pub est_tokens: usize,
    pub is_correction: bool,
    pub is_acknowledgment: bool,
    pub uuid: Option<String>,
    pub parent_uuid: Option<String>,
    pub session_id: Option<String>,
    /// Filled in when sessions are merged into a corpus.
    pub project: String,
    pub followed_by_correction: bool,
    pub usage: Option<Usage>,
}

impl Prompt {
    pub fn is_substantive(&self) -> bool {
        !self.is_correction && !self.is_acknowledgment
    }
}

#[derive(Debug, Default)]
pub struct SessionAnalysis {
    /// First session id seen in the records.
    pub session_id: Option<String>,
    pub prompts: Vec<Prompt>,
    pub usage: Usage,
    /// Assistant responses carrying usage counters.
    pub turn_count: usize,
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(char_count: usize) -> usize {
    char_count.div_ceil(4)
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn is_user_prompt(record: &LogRecord) -> bool {
    record.kind == RecordKind::User && record.role() == Some("user") && !record.is_meta
}

pub fn analyze_session<I>(records: I, classifier: &Classifier) -> SessionAnalysis
where
    I: IntoIterator<Item = LogRecord>,
{
    let mut analysis = SessionAnalysis::default();
    // Index into analysis.prompts of the most recent prompt.
    let mut last: Option<usize> = None;

    for record in records {
        if analysis.session_id.is_none() {
            analysis.session_id = record.session_id.clone();
        }

        match record.kind {
            RecordKind::User if is_user_prompt(&record) => {
                let text = record.text();
                if text.is_empty() {
                    continue;
                }
                let class = classifier.classify(&text);
                let char_count = text.chars().count();

                if class.is_correction
                    && let Some(prev) = last
                {
                    analysis.prompts[prev].followed_by_correction = true;
                }

                analysis.prompts.push(Prompt {
                    timestamp: parse_timestamp(record.timestamp.as_deref()),
                    char_count,
                    est_tokens: estimate_tokens(char_count),
                    is_correction: class.is_correction,
                    is_acknowledgment: class.is_acknowledgment,
                    uuid: record.uuid,
                    parent_uuid: record.parent_uuid,
                    session_id: record.session_id,
                    project: String::new(),
                    followed_by_correction: false,
                    usage: None,
                    text,
                });
                last = Some(analysis.prompts.len() - 1);
            }
            RecordKind::Assistant => {
                let Some(counters) = record.usage() else {
                    continue;
                };
                let usage = Usage::from(counters);
                analysis.usage += usage;
                analysis.turn_count += 1;
                if let Some(prev) = last {
                    analysis.prompts[prev].usage = Some(usage);
                }
            }
            _ => {}
        }
    }

    analysis
}
