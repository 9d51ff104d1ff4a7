// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reducing resource content before packing.

Transformation is line based. A line is either kept (possibly with trailing
whitespace trimmed) or removed. When line numbers are preserved, a removed
line leaves an empty line behind so diagnostics still point at the right
line of the original file.
*/

use {
    crate::error::PackError,
    regex::Regex,
    serde::{Deserialize, Serialize},
};

/// Something that rewrites resource content before it is packed.
pub trait ContentTransformer {
    /// Transform the content of the resource called `name`.
    fn transform(&self, name: &str, content: &[u8]) -> Result<Vec<u8>, PackError>;
}

/// Settings controlling a [Stripper].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StripConfig {
    /// Replace removed lines with empty lines and keep blank lines.
    pub preserve_line_numbers: bool,

    /// Trim trailing whitespace and drop blank lines.
    pub remove_whitespace: bool,

    /// Drop lines that only hold a comment.
    pub remove_comments: bool,

    /// Drop documentation blocks that start at the beginning of a line.
    pub remove_doc_blocks: bool,

    /// Drop statements matching `log_call_patterns`.
    pub remove_log_statements: bool,

    pub comment_prefix: String,
    pub doc_block_delimiter: String,

    /// Regular expressions matched against lines with leading whitespace removed.
    pub log_call_patterns: Vec<String>,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            preserve_line_numbers: false,
            remove_whitespace: false,
            remove_comments: false,
            remove_doc_blocks: false,
            remove_log_statements: false,
            comment_prefix: "#".to_string(),
            doc_block_delimiter: "\"\"\"".to_string(),
            log_call_patterns: vec![
                r"^(log|logging|logger)\.(trace|debug|info|warn|warning|error|critical|exception)\("
                    .to_string(),
            ],
        }
    }
}

impl StripConfig {
    /// Whether any setting alters content.
    pub fn is_active(&self) -> bool {
        self.remove_whitespace
            || self.remove_comments
            || self.remove_doc_blocks
            || self.remove_log_statements
    }
}

/// [ContentTransformer] removing comments, whitespace, documentation and logging.
#[derive(Clone, Debug)]
pub struct Stripper {
    config: StripConfig,
    log_patterns: Vec<Regex>,
}

impl Stripper {
    pub fn new(config: StripConfig) -> Result<Self, PackError> {
        let log_patterns = config
            .log_call_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| PackError::TransformerFailure {
                    name: "log_call_patterns".to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            log_patterns,
        })
    }

    pub fn config(&self) -> &StripConfig {
        &self.config
    }

    fn is_comment(&self, trimmed: &str) -> bool {
        self.config.remove_comments
            && !self.config.comment_prefix.is_empty()
            && trimmed.starts_with(&self.config.comment_prefix)
    }

    fn is_log_call(&self, trimmed: &str) -> bool {
        self.config.remove_log_statements && self.log_patterns.iter().any(|re| re.is_match(trimmed))
    }
}

/// Net change in parenthesis depth over a line.
fn paren_balance(line: &str) -> isize {
    line.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

impl ContentTransformer for Stripper {
    fn transform(&self, name: &str, content: &[u8]) -> Result<Vec<u8>, PackError> {
        let failure = |message: String| PackError::TransformerFailure {
            name: name.to_string(),
            message,
        };

        let text = std::str::from_utf8(content)
            .map_err(|e| failure(format!("content is not valid UTF-8: {}", e)))?;

        let delimiter = self.config.doc_block_delimiter.as_str();
        let mut res = String::with_capacity(text.len());

        // Line where the open doc block started.
        let mut doc_block_start = None;
        // Remaining parenthesis depth of a multi-line log call being removed.
        let mut log_call_depth = 0isize;

        for (index, raw) in text.split_inclusive('\n').enumerate() {
            let (line, newline) = match raw.strip_suffix('\n') {
                Some(line) => (line, "\n"),
                None => (raw, ""),
            };
            let trimmed = line.trim_start();

            let remove = if doc_block_start.is_some() {
                if line.contains(delimiter) {
                    doc_block_start = None;
                }
                true
            } else if log_call_depth > 0 {
                log_call_depth += paren_balance(line);
                true
            } else if self.config.remove_doc_blocks
                && !delimiter.is_empty()
                && trimmed.starts_with(delimiter)
            {
                if !trimmed[delimiter.len()..].contains(delimiter) {
                    doc_block_start = Some(index + 1);
                }
                true
            } else if self.is_comment(trimmed) {
                true
            } else if self.is_log_call(trimmed) {
                log_call_depth = paren_balance(line).max(0);
                true
            } else {
                self.config.remove_whitespace
                    && !self.config.preserve_line_numbers
                    && trimmed.is_empty()
            };

            if remove {
                if self.config.preserve_line_numbers {
                    res.push_str(newline);
                }
            } else if self.config.remove_whitespace {
                res.push_str(line.trim_end());
                res.push_str(newline);
            } else {
                res.push_str(raw);
            }
        }

        if let Some(line) = doc_block_start {
            return Err(failure(format!(
                "documentation block starting on line {} is not terminated",
                line
            )));
        }

        Ok(res.into_bytes())
    }
}
