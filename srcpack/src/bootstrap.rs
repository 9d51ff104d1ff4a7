// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Rendering the bootstrap section of generated artifacts. */

use {
    crate::error::PackError,
    handlebars::Handlebars,
    packed_sources::FORMAT_VERSION,
    packed_sources_importer::{BootstrapSettings, BOOTSTRAP_MARKER},
    serde::Serialize,
    std::path::Path,
};

const BUILTIN_TEMPLATE: &str = include_str!("templates/bootstrap.hbs");

const TEMPLATE_NAME: &str = "bootstrap";

/// Values available to bootstrap templates.
#[derive(Clone, Debug, Serialize)]
pub struct BootstrapContext {
    pub position: String,
    pub extension: String,
    pub package_index: Option<String>,
    pub trace_env: String,
    pub resource_count: usize,
    pub resource_names: Vec<String>,
    pub format_version: String,
    pub bootstrap_marker: String,
    pub resolver_directive: String,
    pub resources_directive: String,
}

impl BootstrapContext {
    pub fn new(settings: &BootstrapSettings, resource_names: Vec<String>) -> Self {
        Self {
            position: settings.position.to_string(),
            extension: settings.naming.extension.clone(),
            package_index: settings.naming.package_index.clone(),
            trace_env: settings.trace_env.clone(),
            resource_count: resource_names.len(),
            format_version: FORMAT_VERSION.to_string(),
            bootstrap_marker: BOOTSTRAP_MARKER.to_string(),
            resolver_directive: settings.resolver_directive(),
            resources_directive: BootstrapSettings::resources_directive(resource_names.len()),
            resource_names,
        }
    }
}

/// A handlebars template producing bootstrap text.
pub struct BootstrapTemplate {
    handlebars: Handlebars<'static>,
}

impl BootstrapTemplate {
    fn from_source(source: &str) -> Result<Self, PackError> {
        let mut handlebars = Handlebars::new();
        // Output is host code, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);
        handlebars
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| PackError::Template(e.to_string()))?;

        Ok(Self { handlebars })
    }

    /// The template emitting only the directives the runtime resolver reads.
    pub fn builtin() -> Result<Self, PackError> {
        Self::from_source(BUILTIN_TEMPLATE)
    }

    /// Load a template from a file.
    pub fn from_path(path: &Path) -> Result<Self, PackError> {
        let source = std::fs::read_to_string(path).map_err(|e| PackError::io(path, e))?;

        Self::from_source(&source)
            .map_err(|e| PackError::Template(format!("{}: {}", path.display(), e)))
    }

    pub fn render(&self, context: &BootstrapContext) -> Result<String, PackError> {
        self.handlebars
            .render(TEMPLATE_NAME, context)
            .map_err(|e| PackError::Template(e.to_string()))
    }
}
