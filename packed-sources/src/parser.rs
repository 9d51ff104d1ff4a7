// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parsing of the archive header and table of contents. */

use {
    crate::{
        error::{Error, Result},
        remap::{header_and_toc_line_count, LineLayout},
        serialization::{
            entry_delimiter, ArchiveHeader, EntryMetadata, TocLine, DATA_BOUNDARY,
        },
    },
    std::{collections::HashMap, io::BufRead},
};

/// Upper bound on entries reserved up front from the header's declared count.
const MAX_PREALLOCATED_ENTRIES: usize = 1024;

/// Location of a single entry within the data region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    pub name: String,

    /// Offset of stored content relative to the start of the data region.
    pub offset: u64,

    /// Byte length of stored content.
    ///
    /// This is the stored length. It includes any line markers and the
    /// newline appended to content flagged as unterminated.
    pub length: u64,

    pub metadata: EntryMetadata,

    /// Number of content lines. Derived from neighboring line offsets.
    pub line_count: usize,
}

impl TocEntry {
    /// Length of the delimiter line preceding this entry's content.
    pub fn delimiter_length(&self) -> u64 {
        entry_delimiter(&self.name).len() as u64
    }
}

/// Parsed header and table of contents of an archive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableOfContents {
    header: ArchiveHeader,

    /// Entries in sorted order.
    entries: Vec<TocEntry>,

    /// Name to index into `entries`.
    index: HashMap<String, usize>,

    /// Offset of the data region relative to the header line.
    data_start: u64,

    /// Lines consumed by the header, TOC and boundary marker.
    header_and_toc_lines: usize,
}

impl TableOfContents {
    /// Parse the table of contents from a reader positioned at the header line.
    ///
    /// Only the header, TOC lines and boundary marker are consumed. Nothing
    /// from the data region is read beyond whatever the reader buffers.
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut consumed = 0u64;
        let mut lines = 0usize;

        let header_line = read_structural_line(reader, &mut consumed, &mut lines)?
            .ok_or_else(|| Error::malformed("archive is empty"))?;
        let header = ArchiveHeader::parse_line(&header_line)?;

        // The declared count is untrusted until the TOC lines are read.
        let capacity = header.entries.min(MAX_PREALLOCATED_ENTRIES);
        let mut entries: Vec<TocEntry> = Vec::with_capacity(capacity);
        let mut index = HashMap::with_capacity(capacity);
        let mut expected_offset = 0u64;

        loop {
            let line = read_structural_line(reader, &mut consumed, &mut lines)?
                .ok_or_else(|| Error::malformed("missing data region boundary"))?;

            if line == DATA_BOUNDARY {
                break;
            }

            let toc = TocLine::parse_line(&line)?;

            if toc.metadata.order != entries.len() {
                return Err(Error::malformed(format!(
                    "entry {} has order {}; expected {}",
                    toc.name,
                    toc.metadata.order,
                    entries.len()
                )));
            }

            if let Some(previous) = entries.last_mut() {
                if toc.name <= previous.name {
                    return Err(Error::malformed(format!(
                        "entry {} is not sorted after {}",
                        toc.name, previous.name
                    )));
                }

                if toc.metadata.line_offset < previous.metadata.line_offset {
                    return Err(Error::malformed(format!(
                        "line offset of {} decreases",
                        toc.name
                    )));
                }

                previous.line_count = toc.metadata.line_offset - previous.metadata.line_offset;
            } else if toc.metadata.line_offset != 0 {
                return Err(Error::malformed(format!(
                    "first entry {} has non-zero line offset",
                    toc.name
                )));
            }

            expected_offset = expected_offset
                .checked_add(entry_delimiter(&toc.name).len() as u64)
                .ok_or_else(|| Error::malformed(format!("offset of {} overflows", toc.name)))?;
            if toc.offset != expected_offset {
                return Err(Error::malformed(format!(
                    "entry {} has offset {}; expected {}",
                    toc.name, toc.offset, expected_offset
                )));
            }
            expected_offset = expected_offset
                .checked_add(toc.length)
                .ok_or_else(|| Error::malformed(format!("length of {} overflows", toc.name)))?;

            index.insert(toc.name.clone(), entries.len());
            entries.push(TocEntry {
                name: toc.name,
                offset: toc.offset,
                length: toc.length,
                metadata: toc.metadata,
                line_count: 0,
            });
        }

        if entries.len() != header.entries {
            return Err(Error::malformed(format!(
                "header declares {} entries; table of contents has {}",
                header.entries,
                entries.len()
            )));
        }

        if let Some(last) = entries.last_mut() {
            last.line_count = header
                .lines
                .checked_sub(last.metadata.line_offset)
                .ok_or_else(|| Error::malformed("line count smaller than last line offset"))?;
        }

        debug_assert_eq!(lines, header_and_toc_line_count(entries.len()));

        Ok(Self {
            header,
            entries,
            index,
            data_start: consumed,
            header_and_toc_lines: lines,
        })
    }

    /// Parse the table of contents from in-memory archive data.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = data;
        Self::parse(&mut reader)
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Marker prefixed to each stored content line, if any.
    pub fn line_marker(&self) -> Option<&str> {
        self.header.line_marker.as_deref()
    }

    /// Offset of the first data region byte relative to the header line.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Lines consumed by the header, TOC and boundary marker.
    pub fn header_and_toc_lines(&self) -> usize {
        self.header_and_toc_lines
    }

    /// Line layout of this archive when it is preceded by `archive_start_line` lines.
    pub fn line_layout(&self, archive_start_line: usize) -> LineLayout {
        LineLayout::new(archive_start_line, self.header_and_toc_lines)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TocEntry> {
        self.index.get(name).map(|i| &self.entries[*i])
    }

    /// Iterate entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &TocEntry> {
        self.entries.iter()
    }

    /// Resolve an absolute artifact line to an entry and a line within it.
    ///
    /// Returns `None` for structural lines and lines outside the archive.
    pub fn entry_at_line(
        &self,
        layout: &LineLayout,
        absolute_line: usize,
    ) -> Option<(&TocEntry, usize)> {
        // Entries are sorted by position, so the candidate is the last one
        // whose content starts at or before the requested line.
        let position = self
            .entries
            .partition_point(|e| layout.first_line(&e.metadata) <= absolute_line);

        let entry = self.entries.get(position.checked_sub(1)?)?;
        let local = layout.local_line(&entry.metadata, entry.line_count, absolute_line)?;

        Some((entry, local))
    }
}

/// Read a single `\n` terminated line holding structural data.
fn read_structural_line<R: BufRead>(
    reader: &mut R,
    consumed: &mut u64,
    lines: &mut usize,
) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let count = reader.read_until(b'\n', &mut buf)?;

    if count == 0 {
        return Ok(None);
    }

    if buf.pop() != Some(b'\n') {
        return Err(Error::malformed("unterminated line in table of contents"));
    }

    *consumed += count as u64;
    *lines += 1;

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| Error::malformed("table of contents is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{resource::ResourceEntry, writer::write_archive, writer::WriterOptions},
    };

    fn archive(pairs: &[(&str, &str)]) -> Vec<u8> {
        let entries = pairs
            .iter()
            .map(|(name, content)| ResourceEntry::new(*name, content.as_bytes()))
            .collect::<Vec<_>>();

        let mut data = Vec::new();
        write_archive(&entries, &mut data, &WriterOptions::default()).unwrap();
        data
    }

    #[test]
    fn test_empty_data() {
        let res = TableOfContents::from_bytes(b"");
        assert!(matches!(res, Err(Error::MalformedArchive(_))));
    }

    #[test]
    fn test_unrecognized_header() {
        let res = TableOfContents::from_bytes(b"#%other v1 entries=0 lines=0\n#%data\n");
        assert!(matches!(res, Err(Error::MalformedArchive(_))));

        let res = TableOfContents::from_bytes(b"#%srcpack v9 entries=0 lines=0\n#%data\n");
        assert!(matches!(res, Err(Error::MalformedArchive(_))));
    }

    #[test]
    fn test_missing_boundary() {
        let res = TableOfContents::from_bytes(b"#%srcpack v1 entries=0 lines=0\n");
        assert!(matches!(res, Err(Error::MalformedArchive(_))));

        let res = TableOfContents::from_bytes(b"#%srcpack v1 entries=0 lines=0\n#%data");
        assert!(matches!(res, Err(Error::MalformedArchive(_))));
    }

    #[test]
    fn test_entry_count_mismatch() {
        let res = TableOfContents::from_bytes(b"#%srcpack v1 entries=1 lines=0\n#%data\n");
        assert!(matches!(res, Err(Error::MalformedArchive(message)) if message.contains("declares 1")));
    }

    #[test]
    fn test_bad_offsets() {
        let data = b"#%srcpack v1 entries=2 lines=2\n\
            #%toc 10 2 0;0 a\n\
            #%toc 12 2 1;1 b\n\
            #%data\n";
        let res = TableOfContents::from_bytes(data);
        assert!(matches!(res, Err(Error::MalformedArchive(message)) if message.contains("offset")));
    }

    #[test]
    fn test_huge_declared_entry_count() {
        let res = TableOfContents::from_bytes(
            b"#%srcpack v1 entries=18446744073709551615 lines=0\n#%data\n",
        );
        assert!(matches!(res, Err(Error::MalformedArchive(message)) if message.contains("declares")));
    }

    #[test]
    fn test_offset_overflow() {
        let data = b"#%srcpack v1 entries=2 lines=2\n\
            #%toc 10 18446744073709551610 0;0 a\n\
            #%toc 12 2 1;1 b\n\
            #%data\n";
        let res = TableOfContents::from_bytes(data);
        assert!(matches!(res, Err(Error::MalformedArchive(message)) if message.contains("overflows")));
    }

    #[test]
    fn test_unsorted_entries() {
        let data = b"#%srcpack v1 entries=2 lines=2\n\
            #%toc 10 2 0;0 b\n\
            #%toc 22 2 1;1 a\n\
            #%data\n";
        let res = TableOfContents::from_bytes(data);
        assert!(matches!(res, Err(Error::MalformedArchive(message)) if message.contains("sorted")));
    }

    #[test]
    fn test_parse_layout() -> Result<()> {
        let data = archive(&[("B.pkg", "x\n"), ("A.pkg", "line1\nline2\n")]);
        let toc = TableOfContents::from_bytes(&data)?;

        assert_eq!(toc.len(), 2);
        assert_eq!(toc.header_and_toc_lines(), 4);
        assert_eq!(
            &data[toc.data_start() as usize..toc.data_start() as usize + 8],
            b"#%entry "
        );

        let names = toc.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["A.pkg", "B.pkg"]);

        let a = toc.get("A.pkg").unwrap();
        assert_eq!(a.metadata.line_offset, 0);
        assert_eq!(a.line_count, 2);

        let b = toc.get("B.pkg").unwrap();
        assert_eq!(b.metadata.line_offset, 2);
        assert_eq!(b.line_count, 1);

        assert!(toc.get("C.pkg").is_none());

        Ok(())
    }

    #[test]
    fn test_parse_stops_at_boundary() -> Result<()> {
        let data = archive(&[("a", "1\n")]);

        let mut reader = std::io::Cursor::new(&data);
        let toc = TableOfContents::parse(&mut reader)?;

        // Cursor implements BufRead without read-ahead past what is consumed.
        assert_eq!(reader.position(), toc.data_start());

        Ok(())
    }

    #[test]
    fn test_entry_at_line() -> Result<()> {
        let data = archive(&[("a", "a1\na2\n"), ("b", ""), ("c", "c1\nc2\nc3")]);
        let toc = TableOfContents::from_bytes(&data)?;
        let layout = toc.line_layout(2);

        let text = String::from_utf8(data.clone()).unwrap();
        let artifact_lines = ["pre", "amble"]
            .iter()
            .map(|s| s.to_string())
            .chain(text.lines().map(|s| s.to_string()))
            .collect::<Vec<_>>();

        for (number, line) in artifact_lines.iter().enumerate() {
            let absolute = number + 1;

            match toc.entry_at_line(&layout, absolute) {
                Some((entry, local)) => {
                    assert!(!line.starts_with("#%"));
                    let expected = format!("{}{}", entry.name, local);
                    assert_eq!(line, &expected);
                }
                None => {
                    assert!(line.starts_with("#%") || absolute <= 2, "{}", line);
                }
            }
        }

        assert!(toc.entry_at_line(&layout, artifact_lines.len() + 1).is_none());

        Ok(())
    }
}
