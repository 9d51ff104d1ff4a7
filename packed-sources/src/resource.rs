// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{remap::strip_line_markers, serialization::EntryMetadata},
    std::borrow::Cow,
};

/// Count the lines in a content blob.
///
/// Every `\n` terminates a line. A trailing partial line also counts.
/// Empty content has no lines.
pub fn count_lines(data: &[u8]) -> usize {
    let terminated = data.iter().filter(|b| **b == b'\n').count();

    match data.last() {
        Some(b'\n') | None => terminated,
        Some(_) => terminated + 1,
    }
}

/// A named unit of content to be packed.
///
/// Content is a `Cow` so callers can hand over borrowed data without
/// copying it until serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceEntry<'a> {
    /// The resource name, used as the TOC key.
    pub name: Cow<'a, str>,

    /// Raw content bytes.
    pub content: Cow<'a, [u8]>,
}

impl<'a> ResourceEntry<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>, content: impl Into<Cow<'a, [u8]>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Number of lines this entry contributes to the data region.
    pub fn line_count(&self) -> usize {
        count_lines(&self.content)
    }

    /// Convert into an instance that owns all of its data.
    pub fn to_owned_entry(&self) -> ResourceEntry<'static> {
        ResourceEntry {
            name: Cow::Owned(self.name.to_string()),
            content: Cow::Owned(self.content.to_vec()),
        }
    }
}

/// A resource read back out of an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedResource {
    /// The TOC key this resource was stored under.
    pub name: String,

    /// Bytes exactly as stored in the data region.
    pub stored: Vec<u8>,

    /// Positional metadata from the TOC.
    pub metadata: EntryMetadata,

    /// Marker the writer prefixed to each stored line, if any.
    pub line_marker: Option<String>,
}

impl PackedResource {
    /// Zero-based rank of this resource in sorted order.
    pub fn order(&self) -> usize {
        self.metadata.order
    }

    /// Lines contributed by all resources before this one.
    pub fn line_offset(&self) -> usize {
        self.metadata.line_offset
    }

    /// The original content, with storage markers removed.
    pub fn content(&self) -> Cow<'_, [u8]> {
        strip_line_markers(
            &self.stored,
            self.line_marker.as_deref(),
            self.metadata.unterminated,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a"), 1);
        assert_eq!(count_lines(b"a\n"), 1);
        assert_eq!(count_lines(b"\n"), 1);
        assert_eq!(count_lines(b"line1\nline2\n"), 2);
        assert_eq!(count_lines(b"a\n\nb\n"), 3);
        assert_eq!(count_lines(b"a\nb"), 2);
        assert_eq!(count_lines(b"a\r\nb\r\n"), 2);
    }

    #[test]
    fn test_entry_borrowed_and_owned() {
        let data = b"x\n".to_vec();
        let entry = ResourceEntry::new("B.pkg", data.as_slice());
        assert!(matches!(entry.content, Cow::Borrowed(_)));
        assert_eq!(entry.line_count(), 1);

        let owned = entry.to_owned_entry();
        assert!(matches!(owned.content, Cow::Owned(_)));
        assert_eq!(owned, entry);
    }
}
