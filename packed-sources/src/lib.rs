// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Packed Sources

This crate defines and implements an archive format for storing named text
resources (library source units) so that any one of them can be retrieved
without parsing or materializing the others. We call this format
*packed sources*.

A producer collects resources, hands them to an [ArchiveWriter] and
serializes an archive: a header line, a table of contents mapping each name
to a byte range, a boundary marker and the data region holding every
resource's content back to back in sorted name order.

Later, an [ArchiveReader] is pointed at the archive, often in the middle of a
larger generated file. The table of contents is parsed once, on first use.
Every lookup after that is a hash lookup followed by a single positioned
read of exactly the requested entry.

Because archives are usually embedded in text artifacts that hosts execute,
the format is line oriented and tracks how many lines precede each entry.
[LineLayout] turns that bookkeeping into absolute line numbers so that
diagnostics raised while executing a resource point at the right place.
*/

mod error;
mod parser;
mod reader;
mod remap;
mod resource;
mod serialization;
mod writer;

pub use crate::{
    error::{Error, Result},
    parser::{TableOfContents, TocEntry},
    reader::ArchiveReader,
    remap::{
        apply_line_markers, header_and_toc_line_count, strip_line_markers, LineDirective,
        LineLayout,
    },
    resource::{count_lines, PackedResource, ResourceEntry},
    serialization::{
        validate_name, ArchiveHeader, EntryMetadata, DATA_BOUNDARY, ENTRY_DELIMITER_LINES,
        ENTRY_DELIMITER_PREFIX, FIRST_LINE_NUMBER, FORMAT_VERSION, HEADER_PREFIX,
        STRUCTURAL_PREFIX, TOC_LINE_PREFIX,
    },
    writer::{
        write_archive, ArchiveLayout, ArchiveWriter, DuplicatePolicy, EntryLayout, WriterOptions,
    },
};
