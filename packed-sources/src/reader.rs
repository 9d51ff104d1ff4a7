// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Random access reading of packed sources archives.

The table of contents is parsed at most once per [ArchiveReader], on first
use. The cell holding the parse result moves through these states:

* empty: nothing parsed yet.
* initializing: one caller is parsing; concurrent callers block on the cell.
* [TocState::Ready]: lookups are answered from the parsed TOC.
* [TocState::Failed]: every later call reports the same parse error.

A filled cell is never reset.
*/

use {
    crate::{
        error::{Error, Result},
        parser::TableOfContents,
        resource::PackedResource,
        serialization::entry_delimiter,
    },
    log::debug,
    once_cell::sync::OnceCell,
    std::{
        io::{BufReader, Cursor, ErrorKind, Read, Seek, SeekFrom},
        sync::{Mutex, MutexGuard},
    },
};

/// Outcome of the one-time table of contents parse.
#[derive(Debug)]
enum TocState {
    Ready(TableOfContents),
    Failed(String),
}

/// Read-only, lazily indexed interface to an archive.
#[derive(Debug)]
pub struct ArchiveReader<R: Read + Seek> {
    /// Source of archive bytes. Guarded because every read seeks first.
    source: Mutex<R>,

    /// Absolute offset within the source where the archive header begins.
    base_offset: u64,

    toc: OnceCell<TocState>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Construct a reader for an archive starting at the beginning of `source`.
    pub fn new(source: R) -> Self {
        Self::with_offset(source, 0)
    }

    /// Construct a reader for an archive starting at `base_offset` within `source`.
    ///
    /// Nothing is read until the first lookup.
    pub fn with_offset(source: R, base_offset: u64) -> Self {
        Self {
            source: Mutex::new(source),
            base_offset,
            toc: OnceCell::new(),
        }
    }

    /// Absolute offset of the archive header within the source.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Whether the table of contents parse has already run.
    pub fn is_parsed(&self) -> bool {
        self.toc.get().is_some()
    }

    /// Obtain the inner source.
    pub fn into_inner(self) -> R {
        self.source
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_source(&self) -> MutexGuard<'_, R> {
        // Every access seeks to an absolute position before reading, so a
        // panic while the lock was held leaves nothing to repair.
        self.source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn parse_toc(&self) -> TocState {
        let mut source = self.lock_source();

        let res = source
            .seek(SeekFrom::Start(self.base_offset))
            .map_err(Error::from)
            .and_then(|_| TableOfContents::parse(&mut BufReader::new(&mut *source)));

        match res {
            Ok(toc) => {
                debug!(
                    "parsed table of contents with {} entries at offset {}",
                    toc.len(),
                    self.base_offset
                );
                TocState::Ready(toc)
            }
            Err(Error::MalformedArchive(message)) => TocState::Failed(message),
            Err(e) => TocState::Failed(e.to_string()),
        }
    }

    /// Obtain the parsed table of contents, parsing it if necessary.
    pub fn table_of_contents(&self) -> Result<&TableOfContents> {
        match self.toc.get_or_init(|| self.parse_toc()) {
            TocState::Ready(toc) => Ok(toc),
            TocState::Failed(message) => Err(Error::MalformedArchive(message.clone())),
        }
    }

    /// Whether the archive holds a resource with the given name.
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.table_of_contents()?.get(name).is_some())
    }

    /// Names of all resources in sorted order.
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self
            .table_of_contents()?
            .iter()
            .map(|e| e.name.clone())
            .collect())
    }

    /// Retrieve a resource by name.
    ///
    /// Returns `Ok(None)` if the archive does not contain the name. Only the
    /// entry's delimiter line and stored content are read.
    pub fn lookup(&self, name: &str) -> Result<Option<PackedResource>> {
        let toc = self.table_of_contents()?;

        let entry = match toc.get(name) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let truncated = || Error::malformed(format!("data for {} is truncated", name));

        let delimiter_length = entry.delimiter_length();
        let start = self
            .base_offset
            .checked_add(toc.data_start())
            .and_then(|v| v.checked_add(entry.offset))
            .and_then(|v| v.checked_sub(delimiter_length))
            .ok_or_else(truncated)?;
        let read_length = delimiter_length
            .checked_add(entry.length)
            .ok_or_else(truncated)?;

        let mut source = self.lock_source();

        // Lengths come from the TOC and are checked against the source before
        // anything is allocated for them.
        let source_length = source.seek(SeekFrom::End(0))?;
        let end = start.checked_add(read_length).ok_or_else(truncated)?;
        if end > source_length {
            return Err(truncated());
        }
        let read_length = usize::try_from(read_length).map_err(|_| truncated())?;

        let mut buf = vec![0u8; read_length];

        source.seek(SeekFrom::Start(start))?;
        source.read_exact(&mut buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                truncated()
            } else {
                Error::Io(e)
            }
        })?;
        drop(source);

        let stored = buf.split_off(delimiter_length as usize);

        if buf != entry_delimiter(name).as_bytes() {
            return Err(Error::malformed(format!(
                "entry delimiter mismatch for {}",
                name
            )));
        }

        Ok(Some(PackedResource {
            name: entry.name.clone(),
            stored,
            metadata: entry.metadata,
            line_marker: toc.line_marker().map(|s| s.to_string()),
        }))
    }
}

impl ArchiveReader<Cursor<Vec<u8>>> {
    /// Construct a reader over archive bytes held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(Cursor::new(data))
    }
}
