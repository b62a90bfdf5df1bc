use crate::logging::{LogSink, SuppressionGuard};
use crate::models::{CodeEntry, Collection, SelectionKey};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;

/// Expiration shown when a source does not state one
pub const UNKNOWN_EXPIRATION: &str = "Unknown";

/// A source of redemption codes for one (game, platform) pair.
///
/// Implementations discover entries into the staged `collection` and return
/// `false` on failure. They never panic on bad input and must not touch any
/// state besides the collection they are handed.
///
/// Only codes absent from the collection as handed in count as discovered.
/// Removing or reordering existing entries has no effect on what is merged
/// back, and neither does re-inserting a known code.
#[cfg_attr(test, mockall::automock)]
pub trait CodeParser: Send + Sync {
    fn parse_keys(&self, collection: &mut Collection, log: &JobLog) -> bool;
}

/// Per-job logging context handed to a [`CodeParser`].
///
/// While it exists, log output from the job's thread is not forwarded to the
/// status surface. Dropping it ends the suppression scope.
#[derive(Debug)]
pub struct JobLog {
    key: SelectionKey,
    _scope: SuppressionGuard,
}

impl JobLog {
    /// Open a job scope on the current thread
    pub fn open(key: SelectionKey, sink: &LogSink) -> Self {
        Self {
            key,
            _scope: sink.suppress(),
        }
    }

    pub fn key(&self) -> SelectionKey {
        self.key
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        tracing::debug!(key = %self.key, "{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        tracing::info!(key = %self.key, "{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        tracing::warn!(key = %self.key, "{}", message.as_ref());
    }
}

/// Discovers codes in a plain-text source file.
///
/// Each line may contain one or more codes of the form
/// `XXXXX-XXXXX-XXXXX-XXXXX-XXXXX`. The text before the first code on a line
/// becomes the description; an `Expires: ...` marker supplies the expiration.
///
/// - `code_pattern`: `\b[A-Z0-9]{5}(?:-[A-Z0-9]{5}){4}\b`, case-insensitive
///   - Example match: "wwk3b-ssbzf-9tfkj-hbk3t-frrst" (stored uppercased)
/// - `expiry_pattern`: `Expires?:?\s*(.+)`, case-insensitive, up to the next `|`
///   - Example match: "Expires: 31 Oct 2019"
pub struct RegexCodeParser {
    source: Utf8PathBuf,
    code_pattern: Regex,
    expiry_pattern: Regex,
}

impl RegexCodeParser {
    pub fn new<P: AsRef<Utf8Path>>(source: P) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            code_pattern: Regex::new(r"(?i)\b[A-Z0-9]{5}(?:-[A-Z0-9]{5}){4}\b")
                .expect("Invalid code regex"),
            expiry_pattern: Regex::new(r"(?i)\bexpires?\b:?\s*([^|]+)")
                .expect("Invalid expiry regex"),
        }
    }

    pub fn source(&self) -> &Utf8Path {
        &self.source
    }

    /// Discover codes in `text`, returning how many were new to `collection`
    pub fn parse_text(&self, text: &str, collection: &mut Collection) -> usize {
        let mut added = 0;

        for line in text.lines() {
            let mut matches = self.code_pattern.find_iter(line).peekable();
            let Some(first) = matches.peek() else {
                continue;
            };

            let description = Self::clean_description(&line[..first.start()]);
            let expiration = self
                .expiry_pattern
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_EXPIRATION.to_string());

            for found in matches {
                let entry = CodeEntry::new(
                    found.as_str().to_ascii_uppercase(),
                    description.clone(),
                    expiration.clone(),
                );
                if collection.insert(entry) {
                    added += 1;
                }
            }
        }

        added
    }

    fn clean_description(raw: &str) -> String {
        let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || matches!(c, '|' | ':' | '-' | ','));
        if trimmed.is_empty() {
            "SHiFT code".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl CodeParser for RegexCodeParser {
    fn parse_keys(&self, collection: &mut Collection, log: &JobLog) -> bool {
        let text = match fs::read_to_string(&self.source) {
            Ok(text) => text,
            Err(e) => {
                log.warn(format!("Failed to read code source {}: {}", self.source, e));
                return false;
            }
        };

        let added = self.parse_text(&text, collection);
        log.info(format!("Found {} new codes in {}", added, self.source));
        true
    }
}
