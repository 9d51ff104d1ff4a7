// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Serialization of packed sources archives. */

use {
    crate::{
        error::{Error, Result},
        remap::{apply_line_markers, header_and_toc_line_count},
        resource::{count_lines, ResourceEntry},
        serialization::{
            entry_delimiter, validate_line_marker, validate_name, ArchiveHeader, EntryMetadata,
            TocLine, DATA_BOUNDARY, ENTRY_DELIMITER_LINES,
        },
    },
    log::{debug, warn},
    std::{borrow::Cow, collections::BTreeMap, io::Write},
};

/// How to treat a resource name that is added more than once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [Error::DuplicateResourceName].
    #[default]
    Reject,

    /// The last added content wins.
    Replace,
}

/// Options influencing archive serialization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriterOptions {
    /// Marker to prefix each stored content line with.
    pub line_marker: Option<String>,

    /// Whether an archive without entries is an error.
    pub require_entries: bool,
}

/// Computed placement of a single entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryLayout {
    pub name: String,

    /// Offset of stored content relative to the start of the data region.
    pub offset: u64,

    /// Byte length of stored content.
    pub length: u64,

    /// Number of lines of the original content.
    pub line_count: usize,

    pub metadata: EntryMetadata,
}

/// Layout of a serialized archive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub entries: Vec<EntryLayout>,

    /// Lines used by the header, TOC and boundary marker.
    pub header_and_toc_lines: usize,

    /// Byte length of the header, TOC and boundary marker.
    pub header_and_toc_length: u64,

    /// Byte length of the data region.
    pub data_length: u64,
}

impl ArchiveLayout {
    /// Total number of lines of the archive.
    pub fn line_count(&self) -> usize {
        self.header_and_toc_lines
            + self
                .entries
                .iter()
                .map(|e| ENTRY_DELIMITER_LINES + e.line_count)
                .sum::<usize>()
    }

    /// Find an entry by name.
    pub fn entry(&self, name: &str) -> Option<&EntryLayout> {
        self.entries.iter().find(|e| e.name == name)
    }
}

/// Serialize resources into an archive.
///
/// Entries are emitted in sorted name order regardless of the order of
/// `resources`. Names must be unique.
pub fn write_archive<W: Write>(
    resources: &[ResourceEntry],
    dest: &mut W,
    options: &WriterOptions,
) -> Result<ArchiveLayout> {
    let mut sorted = BTreeMap::new();

    for resource in resources {
        if sorted
            .insert(&*resource.name, &*resource.content)
            .is_some()
        {
            return Err(Error::DuplicateResourceName(resource.name.to_string()));
        }
    }

    write_sorted(&sorted, dest, options)
}

fn write_sorted<W: Write>(
    sorted: &BTreeMap<&str, &[u8]>,
    dest: &mut W,
    options: &WriterOptions,
) -> Result<ArchiveLayout> {
    if sorted.is_empty() && options.require_entries {
        return Err(Error::EmptyInput);
    }

    if let Some(marker) = &options.line_marker {
        validate_line_marker(marker)?;
    }

    let marker = options.line_marker.as_deref();

    // Stored forms and their positions are all known before anything is
    // written, so the TOC can precede the data without backpatching.
    let mut stored_entries = Vec::with_capacity(sorted.len());
    let mut layout = ArchiveLayout {
        header_and_toc_lines: header_and_toc_line_count(sorted.len()),
        ..ArchiveLayout::default()
    };

    let mut offset = 0u64;
    let mut line_offset = 0usize;

    for (order, (name, content)) in sorted.iter().enumerate() {
        validate_name(name)?;

        let delimiter = entry_delimiter(name);
        let stored = apply_line_markers(content, marker);
        let line_count = count_lines(content);

        offset += delimiter.len() as u64;

        layout.entries.push(EntryLayout {
            name: name.to_string(),
            offset,
            length: stored.len() as u64,
            line_count,
            metadata: EntryMetadata {
                order,
                line_offset,
                unterminated: !content.is_empty() && !content.ends_with(b"\n"),
            },
        });

        offset += stored.len() as u64;
        line_offset += line_count;

        stored_entries.push((delimiter, stored));
    }

    layout.data_length = offset;

    let mut head = String::new();
    head.push_str(
        &ArchiveHeader {
            entries: sorted.len(),
            lines: line_offset,
            line_marker: options.line_marker.clone(),
        }
        .to_line(),
    );
    head.push('\n');

    for entry in &layout.entries {
        head.push_str(
            &TocLine {
                name: entry.name.clone(),
                offset: entry.offset,
                length: entry.length,
                metadata: entry.metadata,
            }
            .to_line(),
        );
        head.push('\n');
    }

    head.push_str(DATA_BOUNDARY);
    head.push('\n');

    layout.header_and_toc_length = head.len() as u64;

    dest.write_all(head.as_bytes())?;

    for (delimiter, stored) in &stored_entries {
        dest.write_all(delimiter.as_bytes())?;
        dest.write_all(stored)?;
    }

    debug!(
        "wrote archive with {} entries ({} data bytes)",
        layout.entries.len(),
        layout.data_length
    );

    Ok(layout)
}

/// Accumulates resources and serializes them into an archive.
///
/// The writer owns resource content until serialization. Entries are always
/// written in sorted name order, so the insertion order does not influence
/// the produced bytes.
#[derive(Clone, Debug, Default)]
pub struct ArchiveWriter<'a> {
    entries: BTreeMap<Cow<'a, str>, Cow<'a, [u8]>>,
    duplicate_policy: DuplicatePolicy,
    options: WriterOptions,
}

impl<'a> ArchiveWriter<'a> {
    pub fn new(options: WriterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Set the policy applied when a name is added twice.
    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) {
        self.duplicate_policy = policy;
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Number of resources currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a resource with the given name was added.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names of added resources in the order they will be written.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|k| &**k).collect()
    }

    /// Add a resource.
    pub fn add(&mut self, entry: ResourceEntry<'a>) -> Result<()> {
        validate_name(&entry.name)?;

        if self.entries.contains_key(&*entry.name) {
            match self.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(Error::DuplicateResourceName(entry.name.to_string()));
                }
                DuplicatePolicy::Replace => {
                    warn!("replacing previously added resource {}", entry.name);
                }
            }
        }

        self.entries.insert(entry.name, entry.content);

        Ok(())
    }

    /// Add a resource from a name and content.
    pub fn add_content(
        &mut self,
        name: impl Into<Cow<'a, str>>,
        content: impl Into<Cow<'a, [u8]>>,
    ) -> Result<()> {
        self.add(ResourceEntry::new(name, content))
    }

    /// Serialize all added resources to a writer.
    pub fn write<W: Write>(&self, dest: &mut W) -> Result<ArchiveLayout> {
        let sorted = self
            .entries
            .iter()
            .map(|(name, content)| (&**name, &**content))
            .collect::<BTreeMap<&str, &[u8]>>();

        write_sorted(&sorted, dest, &self.options)
    }

    /// Serialize all added resources to a new buffer.
    pub fn to_bytes(&self) -> Result<(Vec<u8>, ArchiveLayout)> {
        let mut data = Vec::new();
        let layout = self.write(&mut data)?;

        Ok((data, layout))
    }
}
