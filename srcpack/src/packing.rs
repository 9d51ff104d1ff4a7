// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Producing generated artifacts from a [PackConfig]. */

use {
    crate::{
        artifact::GeneratedArtifact,
        bootstrap::{BootstrapContext, BootstrapTemplate},
        config::PackConfig,
        error::PackError,
        locator::SearchPathLocator,
        sink::OutputSink,
        stripper::{ContentTransformer, Stripper},
    },
    anyhow::{Context, Result},
    log::{info, warn},
    packed_sources::{ArchiveLayout, ArchiveWriter, DuplicatePolicy, LineLayout, WriterOptions},
    packed_sources_importer::{BootstrapSettings, NamingConvention},
    std::path::Path,
};

/// A generated artifact and where its resources ended up.
#[derive(Clone, Debug)]
pub struct PackedOutput {
    pub data: Vec<u8>,
    pub layout: ArchiveLayout,

    /// Number of artifact lines preceding the archive header.
    pub archive_start_line: usize,
}

impl PackedOutput {
    /// Absolute artifact line of the first content line of a resource.
    pub fn first_line(&self, name: &str) -> Option<usize> {
        let entry = self.layout.entry(name)?;

        Some(
            LineLayout::new(self.archive_start_line, self.layout.header_and_toc_lines)
                .first_line(&entry.metadata),
        )
    }
}

/// Packs resources according to a [PackConfig].
#[derive(Clone, Debug)]
pub struct Packer {
    config: PackConfig,
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {} {}", what, path.display()))
}

impl Packer {
    pub fn new(config: PackConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    fn naming(&self) -> NamingConvention {
        NamingConvention::new(&self.config.extension, self.config.package_index.as_deref())
    }

    /// Resolver settings recorded in the bootstrap section.
    pub fn bootstrap_settings(&self) -> BootstrapSettings {
        BootstrapSettings {
            position: self.config.resolver_position.into(),
            naming: self.naming(),
            trace_env: self.config.trace_env.clone(),
            declared_resources: None,
        }
    }

    /// Locate, read and transform every configured resource.
    pub fn collect(&self) -> Result<ArchiveWriter<'static>> {
        let locator = SearchPathLocator::new(self.config.search_paths.clone(), self.naming());

        let transformer = if self.config.strip.is_active() {
            Some(Stripper::new(self.config.strip.clone())?)
        } else {
            if self.config.strip.preserve_line_numbers {
                warn!("preserving line numbers has no effect without a strip option");
            }
            None
        };

        let mut writer = ArchiveWriter::new(WriterOptions {
            line_marker: self.config.line_marker.clone(),
            require_entries: true,
        });

        if self.config.allow_duplicates {
            writer.set_duplicate_policy(DuplicatePolicy::Replace);
        }

        for identifier in &self.config.resources {
            for resource in locator.locate(identifier)? {
                let mut content = resource.read()?;

                if let Some(transformer) = &transformer {
                    let original_size = content.len();
                    content = transformer.transform(&resource.name, &content)?;
                    info!(
                        "{}: stripped {} bytes to {}",
                        resource.name,
                        original_size,
                        content.len()
                    );
                }

                writer
                    .add_content(resource.name, content)
                    .map_err(PackError::from)?;
            }
        }

        Ok(writer)
    }

    /// Produce the artifact without emitting it.
    pub fn build(&self) -> Result<PackedOutput> {
        let writer = self.collect()?;

        let template = match &self.config.bootstrap_template {
            Some(path) => BootstrapTemplate::from_path(path)?,
            None => BootstrapTemplate::builtin()?,
        };

        let names = writer.names().into_iter().map(|s| s.to_string()).collect();
        let context = BootstrapContext::new(&self.bootstrap_settings(), names);

        let artifact = GeneratedArtifact {
            preamble: self
                .config
                .preamble
                .as_deref()
                .map(|p| read_text(p, "preamble"))
                .transpose()?,
            bootstrap: template.render(&context)?,
            postamble: self
                .config
                .postamble
                .as_deref()
                .map(|p| read_text(p, "postamble"))
                .transpose()?,
        };

        let archive_start_line = artifact.archive_start_line()?;
        let (archive, layout) = writer.to_bytes().map_err(PackError::from)?;
        let data = artifact.assemble(&archive)?;

        for entry in &layout.entries {
            info!(
                "packed {} ({} lines) at line {}",
                entry.name,
                entry.line_count,
                LineLayout::new(archive_start_line, layout.header_and_toc_lines)
                    .first_line(&entry.metadata)
            );
        }

        Ok(PackedOutput {
            data,
            layout,
            archive_start_line,
        })
    }

    /// Produce the artifact and emit it to the configured output.
    ///
    /// Returns the artifact when no output path is configured.
    pub fn run(&self) -> Result<Option<Vec<u8>>> {
        let sink = match &self.config.output {
            Some(path) => OutputSink::Path {
                path: path.clone(),
                overwrite: self.config.overwrite,
            },
            None => OutputSink::Memory,
        };

        // Refuse early so nothing is read or transformed in vain.
        if let OutputSink::Path {
            path,
            overwrite: false,
        } = &sink
        {
            if path.exists() {
                return Err(PackError::OutputAlreadyExists { path: path.clone() }.into());
            }
        }

        let output = self.build()?;

        Ok(sink.emit(output.data)?)
    }
}
