// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Declares the foundational primitives of the packed sources archive.

Every structural line in an archive begins with [STRUCTURAL_PREFIX] and is
terminated by `\n`. The layout is:

```text
#%srcpack v1 entries=<N> lines=<L>[ marker=<M>]
#%toc <offset> <length> <order>;<line_offset>[;u] <name>
...
#%data
#%entry <name>
<stored content>
...
```

Writer and reader both derive line arithmetic from the constants in this
module. Changing any of them changes the line numbers reported for
resolved resources.
*/

use crate::error::{Error, Result};

/// Prefix shared by every structural line.
pub const STRUCTURAL_PREFIX: &str = "#%";

/// Leading text of the archive header line.
///
/// Note the trailing space: `#%srcpack-bootstrap` lines are not headers.
pub const HEADER_PREFIX: &str = "#%srcpack ";

/// Version token written into the header line.
pub const FORMAT_VERSION: &str = "v1";

/// Prefix of a table of contents line.
pub const TOC_LINE_PREFIX: &str = "#%toc ";

/// Line separating the table of contents from the data region.
pub const DATA_BOUNDARY: &str = "#%data";

/// Prefix of the delimiter line preceding each entry in the data region.
pub const ENTRY_DELIMITER_PREFIX: &str = "#%entry ";

/// Number of delimiter lines the format places before each entry's content.
pub const ENTRY_DELIMITER_LINES: usize = 1;

/// Line numbers reported to hosts are 1-based.
pub const FIRST_LINE_NUMBER: usize = 1;

/// Lines occupied by the header and boundary, excluding TOC lines.
pub const FIXED_HEADER_LINES: usize = 2;

/// Metadata flag recording that a trailing `\n` was added in storage.
const UNTERMINATED_FLAG: &str = "u";

/// Positional metadata stored with each TOC entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Zero-based rank in sorted name order.
    pub order: usize,

    /// Sum of the line counts of all preceding entries.
    pub line_offset: usize,

    /// Whether the original content lacked a trailing newline.
    pub unterminated: bool,
}

impl EntryMetadata {
    /// Serialize to the `<order>;<line_offset>[;u]` form.
    pub fn to_field(&self) -> String {
        if self.unterminated {
            format!("{};{};{}", self.order, self.line_offset, UNTERMINATED_FLAG)
        } else {
            format!("{};{}", self.order, self.line_offset)
        }
    }

    /// Parse the `<order>;<line_offset>[;u]` form.
    pub fn parse_field(value: &str) -> Result<Self> {
        let mut parts = value.split(';');

        let order = parts
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| Error::malformed(format!("invalid order in metadata: {}", value)))?;
        let line_offset = parts
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| {
                Error::malformed(format!("invalid line offset in metadata: {}", value))
            })?;

        let unterminated = match parts.next() {
            None => false,
            Some(UNTERMINATED_FLAG) => true,
            Some(flag) => {
                return Err(Error::malformed(format!(
                    "unknown metadata flag: {}",
                    flag
                )))
            }
        };

        if parts.next().is_some() {
            return Err(Error::malformed(format!(
                "too many metadata fields: {}",
                value
            )));
        }

        Ok(Self {
            order,
            line_offset,
            unterminated,
        })
    }
}

/// Settings carried in the archive header line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Number of entries declared by the writer.
    pub entries: usize,

    /// Total number of content lines across all entries.
    pub lines: usize,

    /// Marker prefixed to each stored content line, if any.
    pub line_marker: Option<String>,
}

impl ArchiveHeader {
    /// Render the header line, without its terminating newline.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{}{} entries={} lines={}",
            HEADER_PREFIX, FORMAT_VERSION, self.entries, self.lines
        );

        if let Some(marker) = &self.line_marker {
            line.push_str(" marker=");
            line.push_str(marker);
        }

        line
    }

    /// Parse a header line. The terminating newline must already be removed.
    pub fn parse_line(line: &str) -> Result<Self> {
        let rest = line
            .strip_prefix(HEADER_PREFIX)
            .ok_or_else(|| Error::malformed("missing archive header"))?;

        let mut tokens = rest.split(' ');

        match tokens.next() {
            Some(FORMAT_VERSION) => {}
            Some(version) => {
                return Err(Error::malformed(format!(
                    "unsupported format version: {}",
                    version
                )))
            }
            None => return Err(Error::malformed("missing format version")),
        }

        let mut entries = None;
        let mut lines = None;
        let mut line_marker = None;

        for token in tokens {
            match token.split_once('=') {
                Some(("entries", value)) => {
                    entries = Some(value.parse::<usize>().map_err(|_| {
                        Error::malformed(format!("invalid entries count: {}", value))
                    })?);
                }
                Some(("lines", value)) => {
                    lines = Some(value.parse::<usize>().map_err(|_| {
                        Error::malformed(format!("invalid lines count: {}", value))
                    })?);
                }
                Some(("marker", value)) if !value.is_empty() => {
                    line_marker = Some(value.to_string());
                }
                _ => {
                    return Err(Error::malformed(format!(
                        "unrecognized header field: {}",
                        token
                    )))
                }
            }
        }

        Ok(Self {
            entries: entries.ok_or_else(|| Error::malformed("header lacks entries count"))?,
            lines: lines.ok_or_else(|| Error::malformed("header lacks lines count"))?,
            line_marker,
        })
    }
}

/// A single parsed or to-be-written TOC line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocLine {
    pub name: String,
    pub offset: u64,
    pub length: u64,
    pub metadata: EntryMetadata,
}

impl TocLine {
    /// Render the TOC line, without its terminating newline.
    ///
    /// The name comes last so it may contain spaces.
    pub fn to_line(&self) -> String {
        format!(
            "{}{} {} {} {}",
            TOC_LINE_PREFIX,
            self.offset,
            self.length,
            self.metadata.to_field(),
            self.name
        )
    }

    /// Parse a TOC line. The terminating newline must already be removed.
    pub fn parse_line(line: &str) -> Result<Self> {
        let rest = line
            .strip_prefix(TOC_LINE_PREFIX)
            .ok_or_else(|| Error::malformed(format!("expected TOC line; got {:?}", line)))?;

        let mut fields = rest.splitn(4, ' ');

        let offset = fields
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| Error::malformed(format!("invalid offset in TOC line: {:?}", line)))?;
        let length = fields
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| Error::malformed(format!("invalid length in TOC line: {:?}", line)))?;
        let metadata = EntryMetadata::parse_field(
            fields
                .next()
                .ok_or_else(|| Error::malformed(format!("TOC line lacks metadata: {:?}", line)))?,
        )?;
        let name = fields
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::malformed(format!("TOC line lacks name: {:?}", line)))?;

        Ok(Self {
            name: name.to_string(),
            offset,
            length,
            metadata,
        })
    }
}

/// Render the delimiter line preceding an entry, including its newline.
pub fn entry_delimiter(name: &str) -> String {
    format!("{}{}\n", ENTRY_DELIMITER_PREFIX, name)
}

/// Validate a resource name for use as a TOC key.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidResourceName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }

    if name.contains('\n') || name.contains('\r') {
        return Err(Error::InvalidResourceName {
            name: name.to_string(),
            reason: "name contains a line break",
        });
    }

    if name.trim() != name {
        return Err(Error::InvalidResourceName {
            name: name.to_string(),
            reason: "name has leading or trailing whitespace",
        });
    }

    Ok(())
}

/// Validate a line marker.
pub fn validate_line_marker(marker: &str) -> Result<()> {
    if marker.is_empty() || marker.chars().any(char::is_whitespace) {
        Err(Error::InvalidLineMarker(marker.to_string()))
    } else {
        Ok(())
    }
}
