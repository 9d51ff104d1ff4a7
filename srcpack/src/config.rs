// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Packing configuration. */

use {
    crate::{error::PackError, stripper::StripConfig},
    packed_sources_importer::{HookPosition, DEFAULT_TRACE_ENV},
    serde::{Deserialize, Serialize},
    std::path::{Path, PathBuf},
};

/// Where generated bootstrap code registers the resolver.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolverPosition {
    #[default]
    Front,
    Back,
}

impl From<ResolverPosition> for HookPosition {
    fn from(v: ResolverPosition) -> Self {
        match v {
            ResolverPosition::Front => Self::Front,
            ResolverPosition::Back => Self::Back,
        }
    }
}

/// Every setting influencing a packing operation.
///
/// Instances are typically loaded from a JSON file and then amended with
/// command line arguments.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// Resource identifiers to pack.
    pub resources: Vec<String>,

    /// Directories searched for resources, in order.
    pub search_paths: Vec<PathBuf>,

    pub extension: String,
    pub package_index: Option<String>,

    pub preamble: Option<PathBuf>,
    pub postamble: Option<PathBuf>,
    pub bootstrap_template: Option<PathBuf>,

    pub resolver_position: ResolverPosition,

    /// Environment variable generated bootstraps consult to enable tracing.
    pub trace_env: String,

    /// Marker prefixed to every stored content line.
    pub line_marker: Option<String>,

    /// Let later resources replace earlier ones with the same name.
    pub allow_duplicates: bool,

    pub strip: StripConfig,

    pub output: Option<PathBuf>,
    pub overwrite: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            resources: vec![],
            search_paths: vec![],
            extension: ".pkg".to_string(),
            package_index: None,
            preamble: None,
            postamble: None,
            bootstrap_template: None,
            resolver_position: ResolverPosition::default(),
            trace_env: DEFAULT_TRACE_ENV.to_string(),
            line_marker: None,
            allow_duplicates: false,
            strip: StripConfig::default(),
            output: None,
            overwrite: false,
        }
    }
}

impl PackConfig {
    /// Parse a JSON config file.
    ///
    /// Relative paths in the file are interpreted relative to the directory
    /// holding it.
    pub fn from_path(path: &Path) -> Result<Self, PackError> {
        let data = std::fs::read(path).map_err(|e| PackError::io(path, e))?;

        let mut config: Self = serde_json::from_slice(&data).map_err(|e| PackError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }

        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        self.search_paths.iter_mut().for_each(rebase);
        self.preamble.iter_mut().for_each(rebase);
        self.postamble.iter_mut().for_each(rebase);
        self.bootstrap_template.iter_mut().for_each(rebase);
        self.output.iter_mut().for_each(rebase);
    }
}
