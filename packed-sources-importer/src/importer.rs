// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! A host loader chain that finders can be registered with.

Hosts consult an ordered list of finders when a source unit is requested.
Each finder either handles the request or declines it, in which case the
next finder is asked. Finders report failures distinctly from declining so
that a corrupt archive is not mistaken for a missing unit.
*/

use {
    crate::{bootstrap::HookPosition, LoadError, ResolveError},
    log::debug,
    packed_sources::LineDirective,
    std::{
        path::{Component, Path, PathBuf},
        sync::Arc,
    },
};

/// A source unit produced by a finder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Name the unit was requested under.
    pub requested: String,

    /// Name of the resource that satisfied the request.
    pub name: String,

    /// File that diagnostics should point at.
    pub origin_file: String,

    /// Line within `origin_file` holding the first line of `content`.
    pub first_line: usize,

    pub content: Vec<u8>,
}

impl ResolvedSource {
    /// Content preceded by a line-origin directive pointing at `origin_file`.
    pub fn annotated(&self, directive: &LineDirective) -> Vec<u8> {
        directive.annotate(&self.content, self.first_line, &self.origin_file, &self.name)
    }

    /// Translate a 1-based line of `content` to a line within `origin_file`.
    pub fn origin_line(&self, local_line: usize) -> usize {
        self.first_line + local_line.saturating_sub(1)
    }
}

/// Outcome of asking a finder for a source unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Handled(ResolvedSource),

    /// The finder does not know the name. The next finder should be asked.
    NotHandled,
}

/// Something that can resolve requested source units.
pub trait SourceFinder: Send + Sync {
    /// Name identifying this finder in diagnostics.
    fn name(&self) -> &str;

    fn find_source(&self, requested: &str) -> Result<Resolution, ResolveError>;
}

/// Ordered collection of finders consulted on every load.
#[derive(Clone, Default)]
pub struct LoaderChain {
    finders: Vec<Arc<dyn SourceFinder>>,
}

impl std::fmt::Debug for LoaderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderChain")
            .field("finders", &self.finder_names())
            .finish()
    }
}

impl LoaderChain {
    pub fn register(&mut self, finder: Arc<dyn SourceFinder>, position: HookPosition) {
        debug!("registering finder {} at {}", finder.name(), position);

        match position {
            HookPosition::Front => self.finders.insert(0, finder),
            HookPosition::Back => self.finders.push(finder),
        }
    }

    /// Names of registered finders in consultation order.
    pub fn finder_names(&self) -> Vec<String> {
        self.finders.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }

    /// Load a source unit from the first finder that handles it.
    pub fn load(&self, requested: &str) -> Result<ResolvedSource, LoadError> {
        for finder in &self.finders {
            match finder.find_source(requested) {
                Ok(Resolution::Handled(source)) => return Ok(source),
                Ok(Resolution::NotHandled) => continue,
                Err(e) => {
                    return Err(LoadError::Failed {
                        name: requested.to_string(),
                        finder: finder.name().to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }

        Err(LoadError::NotFound {
            name: requested.to_string(),
        })
    }
}

/// Finder resolving units from files beneath directories.
///
/// This is the ordinary resolution strategy packed artifacts are layered
/// in front of or behind.
#[derive(Clone, Debug)]
pub struct FilesystemFinder {
    roots: Vec<PathBuf>,
    naming: crate::NamingConvention,
}

impl FilesystemFinder {
    pub fn new(roots: Vec<PathBuf>, naming: crate::NamingConvention) -> Self {
        Self { roots, naming }
    }
}

/// Whether a candidate path stays beneath whatever root it is joined to.
fn is_relative_and_contained(candidate: &str) -> bool {
    Path::new(candidate)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl SourceFinder for FilesystemFinder {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn find_source(&self, requested: &str) -> Result<Resolution, ResolveError> {
        for candidate in self.naming.candidates(requested) {
            if !is_relative_and_contained(&candidate) {
                debug!("ignoring candidate {} escaping search roots", candidate);
                continue;
            }

            for root in &self.roots {
                let path = root.join(&candidate);

                if !path.is_file() {
                    continue;
                }

                let content = std::fs::read(&path).map_err(|source| ResolveError::Io {
                    path: path.clone(),
                    source,
                })?;

                return Ok(Resolution::Handled(ResolvedSource {
                    requested: requested.to_string(),
                    name: candidate,
                    origin_file: path.display().to_string(),
                    first_line: 1,
                    content,
                }));
            }
        }

        Ok(Resolution::NotHandled)
    }
}
