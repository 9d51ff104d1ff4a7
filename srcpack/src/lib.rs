// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Pack library source units into self-resolving artifacts.

A generated artifact is host script text followed by a packed sources
archive. The text carries bootstrap directives telling the runtime resolver
how requested unit names map to archive entries and where in the host's
loader chain to register.

Producing an artifact involves:

1. Locating resources on a search path ([locator]).
2. Optionally stripping comments, whitespace, documentation and logging
   from them ([stripper]).
3. Serializing them into an archive with [packed_sources::ArchiveWriter].
4. Rendering bootstrap text from a template ([bootstrap]) and assembling
   preamble, bootstrap, postamble and archive ([artifact]).
5. Emitting the result to a file or to the caller ([sink]).

[packing::Packer] ties these together from a [config::PackConfig].
*/

pub mod artifact;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod packing;
pub mod sink;
pub mod stripper;
