// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Runtime resolution of source units from packed sources artifacts.

A generated artifact is a host script whose tail is a packed sources
archive. At startup the artifact's bootstrap code opens the artifact (via a
memory map when it lives on disk), constructs a [LazyResolver] and installs
it into the host's [LoaderChain]. Afterwards, requests for source units are
served by reading just the requested entry from the archive, annotated with
a line-origin directive so diagnostics point into the artifact.
*/

mod artifact;
mod bootstrap;
mod error;
mod importer;
mod naming;
mod resolver;

pub use crate::{
    artifact::PackedArtifact,
    bootstrap::{
        BootstrapSettings, HookPosition, BOOTSTRAP_MARKER, DEFAULT_TRACE_ENV,
        RESOLVER_DIRECTIVE_PREFIX, RESOURCES_DIRECTIVE_PREFIX,
    },
    error::{LoadError, ResolveError},
    importer::{FilesystemFinder, LoaderChain, Resolution, ResolvedSource, SourceFinder},
    naming::NamingConvention,
    resolver::{LazyResolver, TRACE_TARGET},
};
