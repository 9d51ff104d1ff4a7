// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Line number remapping for resources materialized from an archive.

A resource's content does not begin at line 1 of the artifact it is stored
in. The functions here translate between a resource's own line numbers and
absolute line numbers within the generated artifact, so diagnostics raised
while a host executes a resource can be pointed at the right place.
*/

use {
    crate::serialization::{
        EntryMetadata, ENTRY_DELIMITER_LINES, FIRST_LINE_NUMBER, FIXED_HEADER_LINES,
    },
    std::borrow::Cow,
};

/// Number of lines occupied by the header, TOC and boundary of an archive
/// holding `entries` resources.
pub fn header_and_toc_line_count(entries: usize) -> usize {
    FIXED_HEADER_LINES + entries
}

/// Line layout of an archive placed inside a generated artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineLayout {
    /// Number of artifact lines preceding the archive header line.
    pub archive_start_line: usize,

    /// Lines consumed by the header, TOC and boundary marker.
    pub header_and_toc_lines: usize,
}

impl LineLayout {
    pub fn new(archive_start_line: usize, header_and_toc_lines: usize) -> Self {
        Self {
            archive_start_line,
            header_and_toc_lines,
        }
    }

    /// Absolute 1-based artifact line holding the first content line of an entry.
    pub fn first_line(&self, metadata: &EntryMetadata) -> usize {
        self.archive_start_line
            + self.header_and_toc_lines
            + (metadata.order + 1) * ENTRY_DELIMITER_LINES
            + metadata.line_offset
            + FIRST_LINE_NUMBER
    }

    /// Translate a 1-based line within an entry to an absolute artifact line.
    pub fn translate(&self, metadata: &EntryMetadata, local_line: usize) -> usize {
        self.first_line(metadata) + local_line.saturating_sub(FIRST_LINE_NUMBER)
    }

    /// Translate an absolute artifact line to a 1-based line within an entry.
    ///
    /// `line_count` is the number of content lines of the entry. Returns
    /// `None` if the line is outside the entry's content.
    pub fn local_line(
        &self,
        metadata: &EntryMetadata,
        line_count: usize,
        absolute_line: usize,
    ) -> Option<usize> {
        let first = self.first_line(metadata);

        if absolute_line >= first && absolute_line < first + line_count {
            Some(absolute_line - first + FIRST_LINE_NUMBER)
        } else {
            None
        }
    }
}

/// Prefix every line of `content` with `marker`.
///
/// The result always ends with `\n`. Callers record whether one was added
/// via [EntryMetadata::unterminated].
pub fn apply_line_markers(content: &[u8], marker: Option<&str>) -> Vec<u8> {
    let mut stored = Vec::with_capacity(content.len() + 1);

    if content.is_empty() {
        return stored;
    }

    for line in content.split_inclusive(|b| *b == b'\n') {
        if let Some(marker) = marker {
            stored.extend_from_slice(marker.as_bytes());
        }
        stored.extend_from_slice(line);
    }

    if stored.last() != Some(&b'\n') {
        stored.push(b'\n');
    }

    stored
}

/// Inverse of [apply_line_markers].
///
/// Removes exactly one leading `marker` from each line and drops the
/// trailing newline added in storage when `unterminated` is set.
pub fn strip_line_markers<'a>(
    stored: &'a [u8],
    marker: Option<&str>,
    unterminated: bool,
) -> Cow<'a, [u8]> {
    let stored = if unterminated {
        stored.strip_suffix(b"\n").unwrap_or(stored)
    } else {
        stored
    };

    let marker = match marker {
        Some(marker) => marker.as_bytes(),
        None => return Cow::Borrowed(stored),
    };

    let mut content = Vec::with_capacity(stored.len());

    for line in stored.split_inclusive(|b| *b == b'\n') {
        content.extend_from_slice(line.strip_prefix(marker).unwrap_or(line));
    }

    Cow::Owned(content)
}

/// Template for the line-origin directive prepended to resolved content.
///
/// `{line}`, `{file}` and `{name}` are substituted when rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineDirective {
    /// Do not annotate content.
    None,

    /// Annotate content with a directive rendered from a template.
    Template(String),
}

impl Default for LineDirective {
    fn default() -> Self {
        Self::Template("#line {line} \"{file}\"".to_string())
    }
}

impl LineDirective {
    /// Render the directive line, without a trailing newline.
    pub fn render(&self, line: usize, file: &str, name: &str) -> Option<String> {
        match self {
            Self::None => None,
            Self::Template(template) => Some(
                template
                    .replace("{line}", &line.to_string())
                    .replace("{file}", file)
                    .replace("{name}", name),
            ),
        }
    }

    /// Produce annotated content: the directive line followed by `content`.
    pub fn annotate(&self, content: &[u8], line: usize, file: &str, name: &str) -> Vec<u8> {
        match self.render(line, file, name) {
            Some(directive) => {
                let mut annotated = Vec::with_capacity(directive.len() + 1 + content.len());
                annotated.extend_from_slice(directive.as_bytes());
                annotated.push(b'\n');
                annotated.extend_from_slice(content);
                annotated
            }
            None => content.to_vec(),
        }
    }
}
