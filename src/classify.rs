//! Correction / acknowledgment classifier for user messages.
//!
//! Two ordered pattern lists, each evaluated as "any match". Both lists run
//! unconditionally, so a message may be flagged as both.

use crate::LensError;
use crate::config::ClassifyConfig;
use regex::{RegexSet, RegexSetBuilder};
use serde::Serialize;
use std::sync::LazyLock;

const CORRECTION_PATTERNS: &[&str] = &[
    // Negation
    r"^no[,.!]",
    r"^wrong\b",
    r"^(that['’]?s|that is) (not|wrong)\b",
    // Retry requests ("fix it" on its own is a plain instruction)
    r"^try again\b",
    r"^fix (this|that|it)\W+\w",
    r"^(undo|revert)\b",
    // Breakage reports
    r"^(that|this|it) broke\b",
    r"^(it['’]?s|it is) (still )?not working\b",
    r"^(it['’]?s|it is) still (broken|failing|wrong)\b",
    // Polite correction requests
    r"^please (fix|correct|redo)\b",
    // Failure phrases, anywhere
    r"(didn['’]?t|did not|doesn['’]?t|does not) work",
    r"not what i (wanted|meant|asked)",
    // Interrupts
    r"^(wait|stop)[,.!]",
    r"^cancel\b",
    r"^ignore (that|this|previous)\b",
];

const ACKNOWLEDGMENT_PATTERNS: &[&str] = &[
    // Gratitude
    r"^(thanks|thank you|thx|ty)\b",
    // Praise
    r"^(perfect|great|awesome|nice|excellent)\b",
    r"^(good job|well done|nice work|great work)\b",
    // Confirmation
    r"^(that['’]?s|that is) (it|right|correct|perfect)\b",
    // Bare affirmatives, whole message only
    r"^(yes|yep|yeah|yup)[.!?]*$",
    r"^(looks good|lgtm)\b",
];

static DEFAULT: LazyLock<Classifier> = LazyLock::new(|| {
    Classifier::with_patterns(&[], &[]).expect("built-in classifier patterns compile")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_correction: bool,
    pub is_acknowledgment: bool,
}

/// Classification plus the source of every pattern that matched.
#[derive(Debug, Serialize)]
pub struct Explained {
    pub is_correction: bool,
    pub is_acknowledgment: bool,
    pub matched: Vec<String>,
}

pub struct Classifier {
    corrections: RegexSet,
    acknowledgments: RegexSet,
}

impl Classifier {
    /// Built-in lists followed by the given extras. All patterns are case-insensitive.
    pub fn with_patterns(
        extra_corrections: &[String],
        extra_acknowledgments: &[String],
    ) -> Result<Self, LensError> {
        Ok(Self {
            corrections: build_set(CORRECTION_PATTERNS, extra_corrections)?,
            acknowledgments: build_set(ACKNOWLEDGMENT_PATTERNS, extra_acknowledgments)?,
        })
    }

    pub fn from_config(config: &ClassifyConfig) -> Result<Self, LensError> {
        Self::with_patterns(&config.extra_corrections, &config.extra_acknowledgments)
    }

    pub fn classify(&self, text: &str) -> Classification {
        let text = text.trim();
        Classification {
            is_correction: self.corrections.is_match(text),
            is_acknowledgment: self.acknowledgments.is_match(text),
        }
    }

    pub fn explain(&self, text: &str) -> Explained {
        let text = text.trim();
        let mut matched = Vec::new();
        for set in [&self.corrections, &self.acknowledgments] {
            matched.extend(set.matches(text).iter().map(|i| set.patterns()[i].clone()));
        }
        let c = self.classify(text);
        Explained {
            is_correction: c.is_correction,
            is_acknowledgment: c.is_acknowledgment,
            matched,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            corrections: DEFAULT.corrections.clone(),
            acknowledgments: DEFAULT.acknowledgments.clone(),
        }
    }
}

fn build_set(builtin: &[&str], extra: &[String]) -> Result<RegexSet, LensError> {
    let all: Vec<String> = builtin
        .iter()
        .map(|p| (*p).to_string())
        .chain(extra.iter().cloned())
        .collect();
    RegexSetBuilder::new(&all)
        .case_insensitive(true)
        .build()
        .map_err(|e| LensError::Config(format!("classifier pattern: {e}")))
}

/// Classify with the built-in pattern lists only.
pub fn classify(text: &str) -> Classification {
    DEFAULT.classify(text)
}
