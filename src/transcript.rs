//! Streaming reader for Claude Code JSONL transcripts.

use crate::LensError;
use log::warn;
use serde::Deserialize;
use std::io::{BufRead, ErrorKind};
use std::path::Path;

/// One line of a transcript file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(rename = "type", default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub is_meta: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    User,
    Assistant,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub usage: Option<UsageCounters>,
}

/// Either a bare string (typed prompts) or a list of typed blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Unknown(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Raw usage counters as written by the API; any of them may be absent or null.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct UsageCounters {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
    pub cache_creation_input_tokens: Option<u64>,
}

impl LogRecord {
    pub fn role(&self) -> Option<&str> {
        self.message.as_ref()?.role.as_deref()
    }

    pub fn usage(&self) -> Option<UsageCounters> {
        self.message.as_ref()?.usage
    }

    pub fn text(&self) -> String {
        extract_text(self.message.as_ref().and_then(|m| m.content.as_ref()))
    }
}

/// Plain text of a message's content. Blocks contribute only when typed "text".
pub fn extract_text(content: Option<&Content>) -> String {
    match content {
        Some(Content::Text(s)) => s.clone(),
        Some(Content::Blocks(blocks)) => blocks
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Content::Unknown(_)) | None => String::new(),
    }
}

pub fn parse_line(line: &str) -> Result<LogRecord, serde_json::Error> {
    serde_json::from_str(line)
}

/// Parse every non-blank line of `reader`, one result per line, in order.
/// Lines that are not valid UTF-8 are skipped; any other read error ends the
/// stream.
pub fn parse_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<LogRecord, serde_json::Error>> {
    reader
        .lines()
        .map_while(|line| match line {
            Ok(line) => Some(Some(line)),
            Err(e) if e.kind() == ErrorKind::InvalidData => Some(None),
            Err(e) => {
                warn!("transcript read stopped: {e}");
                None
            }
        })
        .flatten()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_line(line.trim()))
}

/// Stream the records of a transcript file, skipping lines that fail to parse.
/// The file handle is released when the iterator is dropped.
pub fn read_transcript(path: &Path) -> Result<impl Iterator<Item = LogRecord>, LensError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    Ok(parse_lines(reader).filter_map(Result::ok))
}
