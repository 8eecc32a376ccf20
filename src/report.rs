//! Pipeline entry point: discovery → transcripts → sessions → corpus → report.

use crate::LensError;
use crate::analyze::{Prompt, Usage, analyze_session};
use crate::classify::Classifier;
use crate::cli::AnalyzeArgs;
use crate::config::{AnalyzeConfig, LensConfig, default_projects_dir};
use crate::corpus::{self, Corpus, CorrectionChain, Metrics, SessionResult, truncate_chars};
use crate::discover::{TranscriptFile, discover};
use crate::insight::{Insight, generate};
use crate::project::project_label;
use crate::transcript::read_transcript;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const DEFAULT_DAYS: u32 = 7;
pub const EXAMPLE_TEXT_CHARS: usize = 200;
const MAX_EXAMPLES: usize = 3;
const MAX_SESSIONS: usize = 10;

/// Resolved options for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub projects_dir: PathBuf,
    pub days: u32,
    pub limit: usize,
    /// Keep example prompt text whole instead of cutting it at 200 characters.
    pub verbose: bool,
    pub project: Option<String>,
    pub output: Option<PathBuf>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            projects_dir: default_projects_dir(),
            days: DEFAULT_DAYS,
            limit: corpus::DEFAULT_LIMIT,
            verbose: false,
            project: None,
            output: None,
        }
    }
}

impl AnalyzeOptions {
    /// CLI flags over config file values over built-in defaults.
    pub fn resolve(args: &AnalyzeArgs, config: &AnalyzeConfig) -> Result<Self, LensError> {
        let defaults = Self::default();
        let limit = args.limit.or(config.limit).unwrap_or(defaults.limit);
        if limit == 0 {
            return Err(LensError::Config("limit must be at least 1".into()));
        }
        Ok(Self {
            projects_dir: args
                .projects_dir
                .clone()
                .or_else(|| config.projects_dir.clone())
                .unwrap_or(defaults.projects_dir),
            days: args.days.or(config.days).unwrap_or(defaults.days),
            limit,
            verbose: args.verbose,
            project: args.project.clone(),
            output: args.output.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub no_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub summary: Summary,
    pub metrics: Metrics,
    pub patterns: PatternCounts,
    pub insights: Vec<Insight>,
    pub examples: Examples,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub period: Period,
    /// Sessions that contributed at least one prompt.
    pub sessions: usize,
    pub prompts_found: usize,
    pub prompts_analyzed: usize,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub days: u32,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCounts {
    pub very_short: usize,
    pub very_long: usize,
    pub correction_chains: usize,
    pub triggered_corrections: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examples {
    pub short_prompts: Vec<ExamplePrompt>,
    pub long_prompts: Vec<ExamplePrompt>,
    pub triggered_corrections: Vec<ExamplePrompt>,
    pub correction_chains: Vec<CorrectionChain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamplePrompt {
    pub project: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub char_count: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub project: String,
    pub date: NaiveDate,
    pub prompt_count: usize,
    pub correction_count: usize,
    pub usage: Usage,
}

impl ExamplePrompt {
    fn from_prompt(p: &Prompt, verbose: bool) -> Self {
        Self {
            project: p.project.clone(),
            timestamp: p.timestamp,
            char_count: p.char_count,
            text: if verbose {
                p.text.clone()
            } else {
                truncate_chars(&p.text, EXAMPLE_TEXT_CHARS)
            },
        }
    }
}

/// Summary of one session, keyed by when it started.
fn summarize_session(
    file: &TranscriptFile,
    result: &SessionResult,
) -> (DateTime<Utc>, SessionSummary) {
    let analysis = &result.analysis;
    let session_id = analysis.session_id.clone().unwrap_or_else(|| {
        file.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let started = analysis
        .prompts
        .iter()
        .find_map(|p| p.timestamp)
        .unwrap_or_else(|| DateTime::<Utc>::from(file.modified));

    let summary = SessionSummary {
        session_id,
        project: result.project.clone(),
        date: started.date_naive(),
        prompt_count: analysis.prompts.len(),
        correction_count: analysis.prompts.iter().filter(|p| p.is_correction).count(),
        usage: analysis.usage,
    };
    (started, summary)
}

/// Start of the reporting window; clamps to the epoch for windows chrono cannot represent.
fn period_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn build_examples(corpus: &Corpus, verbose: bool) -> Examples {
    let pick = |indices: &[usize]| -> Vec<ExamplePrompt> {
        indices
            .iter()
            .take(MAX_EXAMPLES)
            .map(|&i| ExamplePrompt::from_prompt(corpus.prompt(i), verbose))
            .collect()
    };
    let patterns = &corpus.patterns;
    Examples {
        short_prompts: pick(&patterns.very_short),
        long_prompts: pick(&patterns.very_long),
        triggered_corrections: pick(&patterns.triggered_corrections),
        correction_chains: patterns
            .correction_chains
            .iter()
            .take(MAX_EXAMPLES)
            .cloned()
            .collect(),
    }
}

/// Run the whole pipeline over `opts.projects_dir` as of `now`.
pub fn build_report(
    opts: &AnalyzeOptions,
    classifier: &Classifier,
    now: DateTime<Utc>,
) -> Result<Report, LensError> {
    let files = discover(
        &opts.projects_dir,
        opts.days,
        opts.project.as_deref(),
        SystemTime::from(now),
    )?;

    let mut results = Vec::new();
    let mut sessions = Vec::new();
    let mut usage = Usage::default();

    for file in &files {
        let records = match read_transcript(&file.path) {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping {}: {e}", file.path.display());
                continue;
            }
        };
        let analysis = analyze_session(records, classifier);
        if analysis.prompts.is_empty() {
            continue;
        }
        usage += analysis.usage;
        let result = SessionResult {
            project: project_label(&file.project_dir),
            analysis,
        };
        sessions.push(summarize_session(file, &result));
        results.push(result);
    }

    let corpus = corpus::merge(&results, opts.limit);
    let no_data = corpus.prompts.is_empty();
    info!(
        "analyzed {} prompts from {} sessions ({} transcripts)",
        corpus.prompts.len(),
        results.len(),
        files.len()
    );

    let insights = if no_data {
        Vec::new()
    } else {
        generate(&corpus.metrics, &corpus.patterns)
    };
    let message = no_data.then(|| {
        format!(
            "No prompts found in {} for the last {} days",
            opts.projects_dir.display(),
            opts.days
        )
    });

    sessions.sort_by(|a, b| b.0.cmp(&a.0));
    let sessions: Vec<SessionSummary> = sessions
        .into_iter()
        .take(MAX_SESSIONS)
        .map(|(_, summary)| summary)
        .collect();

    let patterns = &corpus.patterns;
    Ok(Report {
        no_data,
        message,
        summary: Summary {
            period: Period {
                days: opts.days,
                since: period_start(now, opts.days),
                until: now,
            },
            sessions: results.len(),
            prompts_found: corpus.total_found,
            prompts_analyzed: corpus.prompts.len(),
            usage,
        },
        metrics: corpus.metrics.clone(),
        patterns: PatternCounts {
            very_short: patterns.very_short.len(),
            very_long: patterns.very_long.len(),
            correction_chains: patterns.correction_chains.len(),
            triggered_corrections: patterns.triggered_corrections.len(),
        },
        insights,
        examples: build_examples(&corpus, opts.verbose),
        sessions,
    })
}

pub fn write_report(report: &Report, output: &Path) -> Result<(), LensError> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(output, json + "\n")?;
    Ok(())
}

pub fn handle_analyze(args: &AnalyzeArgs, config: &LensConfig) -> Result<(), LensError> {
    let opts = AnalyzeOptions::resolve(args, &config.analyze)?;
    let classifier = Classifier::from_config(&config.classify)?;
    let report = build_report(&opts, &classifier, Utc::now())?;

    match &opts.output {
        Some(path) => {
            write_report(&report, path)?;
            eprintln!(
                "promptlens: {} prompts from {} sessions → {}",
                report.summary.prompts_analyzed,
                report.summary.sessions,
                path.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn user_line(session: &str, text: &str, ts: &str) -> String {
        format!(
            r#"{{"type":"user","message":{{"role":"user","content":{}}},"timestamp":"{ts}","uuid":"{ts}","sessionId":"{session}"}}"#,
            serde_json::to_string(text).unwrap()
        )
    }

    fn assistant_line(input: u64, output: u64) -> String {
        format!(
            r#"{{"type":"assistant","message":{{"role":"assistant","content":[{{"type":"text","text":"done"}}],"usage":{{"input_tokens":{input},"output_tokens":{output}}}}}}}"#
        )
    }

    fn write_session(root: &Path, project: &str, name: &str, lines: &[String]) {
        let dir = root.join(project);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), lines.join("\n")).unwrap();
    }

    fn opts(root: &Path) -> AnalyzeOptions {
        AnalyzeOptions {
            projects_dir: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_projects_dir_reports_no_data() {
        let dir = TempDir::new().unwrap();
        let report = build_report(
            &opts(&dir.path().join("absent")),
            &Classifier::default(),
            Utc::now(),
        )
        .unwrap();
        assert!(report.no_data);
        assert!(report.message.is_some());
        assert_eq!(report.summary.sessions, 0);
        assert_eq!(report.summary.prompts_analyzed, 0);
        assert_eq!(report.metrics, Metrics::default());
        assert!(report.insights.is_empty());
        assert!(report.sessions.is_empty());
    }

    #[test]
    fn full_pipeline_over_two_projects() {
        let dir = TempDir::new().unwrap();
        write_session(
            dir.path(),
            "-work-alpha",
            "s1.jsonl",
            &[
                user_line("s1", "add pagination to the list endpoint", "2025-03-01T10:00:00Z"),
                assistant_line(1000, 200),
                user_line("s1", "no, use cursor pagination", "2025-03-01T10:02:00Z"),
                assistant_line(1500, 300),
                "{broken".into(),
                user_line("s1", "thanks", "2025-03-01T10:04:00Z"),
            ],
        );
        write_session(
            dir.path(),
            "-work-beta",
            "s2.jsonl",
            &[user_line("s2", "rename it", "2025-03-02T09:00:00Z")],
        );
        write_session(
            dir.path(),
            "-work-beta",
            "empty.jsonl",
            &[assistant_line(5, 5)],
        );

        let report = build_report(&opts(dir.path()), &Classifier::default(), Utc::now()).unwrap();
        assert!(!report.no_data);
        assert_eq!(report.message, None);
        assert_eq!(report.summary.sessions, 2);
        assert_eq!(report.summary.prompts_found, 4);
        assert_eq!(report.summary.prompts_analyzed, 4);
        assert_eq!(report.summary.usage.input_tokens, 2500);
        assert_eq!(report.summary.usage.output_tokens, 500);

        assert_eq!(report.metrics.corrections, 1);
        assert_eq!(report.metrics.acknowledgments, 1);
        // "add pagination..." was corrected, "rename it" was not
        assert_eq!(report.metrics.first_time_success_rate, 50.0);
        assert_eq!(report.metrics.avg_tokens_per_prompt, 1500);
        assert_eq!(report.patterns.very_short, 1);
        assert_eq!(report.patterns.triggered_corrections, 1);

        assert_eq!(report.examples.short_prompts[0].text, "rename it");
        assert_eq!(report.examples.short_prompts[0].project, "work-beta");

        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.sessions[0].session_id, "s2");
        assert_eq!(report.sessions[0].date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(report.sessions[1].prompt_count, 3);
        assert_eq!(report.sessions[1].correction_count, 1);
    }

    #[test]
    fn sessions_on_one_day_ordered_by_start_time() {
        let dir = TempDir::new().unwrap();
        write_session(
            dir.path(),
            "-work-alpha",
            "late.jsonl",
            &[user_line("late", "profile the slow query", "2025-03-01T15:00:00Z")],
        );
        write_session(
            dir.path(),
            "-work-alpha",
            "early.jsonl",
            &[user_line("early", "add an index on users.email", "2025-03-01T09:00:00Z")],
        );
        // The earlier session's file was touched last.
        let late = dir.path().join("-work-alpha").join("late.jsonl");
        fs::File::options()
            .write(true)
            .open(&late)
            .unwrap()
            .set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(3600))
            .unwrap();

        let report = build_report(&opts(dir.path()), &Classifier::default(), Utc::now()).unwrap();
        let ids: Vec<&str> = report.sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["late", "early"]);
    }

    #[test]
    fn huge_day_window_clamps_period_start() {
        let dir = TempDir::new().unwrap();
        let options = AnalyzeOptions {
            days: u32::MAX,
            ..opts(&dir.path().join("absent"))
        };
        let now = Utc::now();
        let report = build_report(&options, &Classifier::default(), now).unwrap();
        assert_eq!(report.summary.period.days, u32::MAX);
        assert_eq!(report.summary.period.until, now);
        assert_eq!(report.summary.period.since, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(period_start(now, 7), now - TimeDelta::days(7));
    }

    #[test]
    fn project_filter_and_limit_apply() {
        let dir = TempDir::new().unwrap();
        write_session(
            dir.path(),
            "-work-alpha",
            "a.jsonl",
            &[
                user_line("a", "first alpha prompt here", "2025-03-01T10:00:00Z"),
                user_line("a", "second alpha prompt here", "2025-03-01T11:00:00Z"),
                user_line("a", "third alpha prompt here", "2025-03-01T12:00:00Z"),
            ],
        );
        write_session(
            dir.path(),
            "-work-beta",
            "b.jsonl",
            &[user_line("b", "beta prompt", "2025-03-01T13:00:00Z")],
        );

        let options = AnalyzeOptions {
            project: Some("ALPHA".into()),
            limit: 2,
            ..opts(dir.path())
        };
        let report = build_report(&options, &Classifier::default(), Utc::now()).unwrap();
        assert_eq!(report.summary.sessions, 1);
        assert_eq!(report.summary.prompts_found, 3);
        assert_eq!(report.summary.prompts_analyzed, 2);
        assert_eq!(report.metrics.total_prompts, 2);
    }

    #[test]
    fn examples_truncated_unless_verbose() {
        let dir = TempDir::new().unwrap();
        let long = "explain every step of the migration in detail ".repeat(60);
        write_session(
            dir.path(),
            "-work-alpha",
            "a.jsonl",
            &[user_line("a", &long, "2025-03-01T10:00:00Z")],
        );

        let report = build_report(&opts(dir.path()), &Classifier::default(), Utc::now()).unwrap();
        let example = &report.examples.long_prompts[0];
        assert_eq!(example.text.chars().count(), EXAMPLE_TEXT_CHARS);
        assert_eq!(example.char_count, long.chars().count());

        let verbose = AnalyzeOptions {
            verbose: true,
            ..opts(dir.path())
        };
        let report = build_report(&verbose, &Classifier::default(), Utc::now()).unwrap();
        assert_eq!(report.examples.long_prompts[0].text, long);
    }

    #[test]
    fn report_round_trips_through_json() {
        let dir = TempDir::new().unwrap();
        write_session(
            dir.path(),
            "-work-alpha",
            "a.jsonl",
            &[
                user_line("a", "implement the retry policy", "2025-03-01T10:00:00Z"),
                assistant_line(300, 33),
                user_line("a", "try again", "2025-03-01T10:01:00Z"),
                user_line("a", "that broke the tests", "2025-03-01T10:02:00Z"),
            ],
        );
        let report = build_report(&opts(dir.path()), &Classifier::default(), Utc::now()).unwrap();
        assert_eq!(report.patterns.correction_chains, 1);

        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn write_report_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let report = build_report(
            &opts(&dir.path().join("absent")),
            &Classifier::default(),
            Utc::now(),
        )
        .unwrap();
        let output = dir.path().join("out").join("report.json");
        write_report(&report, &output).unwrap();
        let content = fs::read_to_string(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["no_data"], true);
        assert_eq!(value["summary"]["sessions"], 0);
    }

    #[test]
    fn resolve_prefers_flags_over_config() {
        let args = AnalyzeArgs {
            days: Some(3),
            ..Default::default()
        };
        let config = AnalyzeConfig {
            days: Some(14),
            limit: Some(50),
            projects_dir: Some(PathBuf::from("/data/projects")),
        };
        let opts = AnalyzeOptions::resolve(&args, &config).unwrap();
        assert_eq!(opts.days, 3);
        assert_eq!(opts.limit, 50);
        assert_eq!(opts.projects_dir, PathBuf::from("/data/projects"));

        let opts = AnalyzeOptions::resolve(&AnalyzeArgs::default(), &AnalyzeConfig::default())
            .unwrap();
        assert_eq!(opts.days, DEFAULT_DAYS);
        assert_eq!(opts.limit, corpus::DEFAULT_LIMIT);
    }

    #[test]
    fn resolve_rejects_zero_limit() {
        let args = AnalyzeArgs {
            limit: Some(0),
            ..Default::default()
        };
        assert!(AnalyzeOptions::resolve(&args, &AnalyzeConfig::default()).is_err());
    }
}
