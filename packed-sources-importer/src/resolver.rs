// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Lazy resolution of source units from a packed artifact. */

use {
    crate::{
        artifact::PackedArtifact,
        bootstrap::HookPosition,
        importer::{LoaderChain, Resolution, ResolvedSource, SourceFinder},
        naming::NamingConvention,
        ResolveError,
    },
    log::info,
    std::{
        io::{Read, Seek},
        sync::Arc,
    },
};

/// Log target receiving resolution traces.
pub const TRACE_TARGET: &str = "srcpack::trace";

/// Whether an environment variable value turns tracing on.
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Finder serving source units from an artifact's embedded archive.
///
/// Nothing beyond the bootstrap section is read until the first request.
/// Each request reads exactly one entry.
#[derive(Debug)]
pub struct LazyResolver<R: Read + Seek> {
    artifact: PackedArtifact<R>,
    naming: NamingConvention,
    trace: bool,
}

impl<R: Read + Seek> LazyResolver<R> {
    /// Construct an instance configured from the artifact's bootstrap settings.
    ///
    /// Tracing is enabled if the bootstrap's trace variable is set to a
    /// truthy value in the environment.
    pub fn new(artifact: PackedArtifact<R>) -> Self {
        let settings = artifact.settings();
        let naming = settings.naming.clone();
        let trace = std::env::var(&settings.trace_env)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Self {
            artifact,
            naming,
            trace,
        }
    }

    pub fn artifact(&self) -> &PackedArtifact<R> {
        &self.artifact
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Resolve a requested unit name.
    ///
    /// Returns `Ok(None)` if no candidate name is in the archive.
    pub fn resolve(&self, requested: &str) -> Result<Option<ResolvedSource>, ResolveError> {
        for candidate in self.naming.candidates(requested) {
            let resource = match self.artifact.lookup(&candidate)? {
                Some(resource) => resource,
                None => continue,
            };

            let first_line = self.artifact.line_layout()?.first_line(&resource.metadata);
            let origin = self.artifact.origin().to_string();

            if self.trace {
                info!(
                    target: TRACE_TARGET,
                    "hit {} -> {} at {}:{}",
                    requested,
                    candidate,
                    origin,
                    first_line
                );
            }

            return Ok(Some(ResolvedSource {
                requested: requested.to_string(),
                name: candidate,
                origin_file: origin,
                first_line,
                content: resource.content().into_owned(),
            }));
        }

        if self.trace {
            info!(
                target: TRACE_TARGET,
                "miss {} in {}",
                requested,
                self.artifact.origin()
            );
        }

        Ok(None)
    }
}

impl<R: Read + Seek + Send + Sync + 'static> LazyResolver<R> {
    /// Register this resolver with a loader chain at the position recorded
    /// in the artifact's bootstrap section.
    pub fn install(self, chain: &mut LoaderChain) -> Arc<Self> {
        let position = self.artifact.settings().position;
        self.install_at(chain, position)
    }

    pub fn install_at(self, chain: &mut LoaderChain, position: HookPosition) -> Arc<Self> {
        let resolver = Arc::new(self);
        chain.register(resolver.clone(), position);
        resolver
    }
}

impl<R: Read + Seek + Send> SourceFinder for LazyResolver<R> {
    fn name(&self) -> &str {
        self.artifact.origin()
    }

    fn find_source(&self, requested: &str) -> Result<Resolution, ResolveError> {
        Ok(match self.resolve(requested)? {
            Some(source) => Resolution::Handled(source),
            None => Resolution::NotHandled,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            bootstrap::{BootstrapSettings, BOOTSTRAP_MARKER},
            FilesystemFinder, LoadError,
        },
        packed_sources::{ArchiveWriter, LineDirective},
        std::io::Cursor,
    };

    fn artifact(preamble: &str, units: &[(&str, &str)]) -> PackedArtifact<Cursor<Vec<u8>>> {
        let mut writer = ArchiveWriter::default();
        for (name, content) in units {
            writer.add_content(*name, content.as_bytes()).unwrap();
        }

        let mut data = preamble.as_bytes().to_vec();
        data.extend(writer.to_bytes().unwrap().0);

        PackedArtifact::from_bytes(data, "app.run").unwrap()
    }

    #[test]
    fn test_resolve_with_line_numbers() -> Result<(), ResolveError> {
        let resolver = LazyResolver::new(artifact(
            "",
            &[("A.pkg", "line1\nline2\n"), ("B.pkg", "x\n")],
        ));

        let a = resolver.resolve("A.pkg")?.unwrap();
        assert_eq!(a.first_line, 6);
        assert_eq!(a.content, b"line1\nline2\n".to_vec());
        assert_eq!(
            a.annotated(&LineDirective::default()),
            b"#line 6 \"app.run\"\nline1\nline2\n".to_vec()
        );

        // Repeated resolution yields the same result.
        assert_eq!(resolver.resolve("A.pkg")?.unwrap(), a);

        let b = resolver.resolve("B.pkg")?.unwrap();
        assert_eq!(b.first_line, 9);

        assert!(resolver.resolve("C.pkg")?.is_none());
        assert!(resolver.resolve("")?.is_none());

        // Tracing does not change results.
        let mut traced = LazyResolver::new(artifact("", &[("A.pkg", "line1\nline2\n")]));
        traced.set_trace(true);
        assert!(traced.trace());
        assert_eq!(traced.resolve("A.pkg")?.unwrap(), a);
        assert!(traced.resolve("B.pkg")?.is_none());

        Ok(())
    }

    #[test]
    fn test_bootstrap_settings_apply() -> Result<(), ResolveError> {
        let settings = BootstrapSettings {
            naming: NamingConvention::new(".lua", Some("init")),
            ..BootstrapSettings::default()
        };
        let preamble = format!(
            "-- host glue\n{}\n{}\n",
            BOOTSTRAP_MARKER,
            settings.resolver_directive()
        );

        let resolver = LazyResolver::new(artifact(
            &preamble,
            &[("net/http.lua", "return {}\n"), ("net/init.lua", "\n")],
        ));

        let http = resolver.resolve("net.http")?.unwrap();
        assert_eq!(http.name, "net/http.lua");
        assert_eq!(http.requested, "net.http");
        assert_eq!(http.first_line, 3 + 4 + 1 + 1);

        assert_eq!(resolver.resolve("net")?.unwrap().name, "net/init.lua");

        Ok(())
    }

    #[test]
    fn test_chain_precedence() -> Result<(), LoadError> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pkg"), b"disk\n").unwrap();
        std::fs::write(dir.path().join("b.pkg"), b"disk only\n").unwrap();

        let mut chain = LoaderChain::default();
        chain.register(
            Arc::new(FilesystemFinder::new(
                vec![dir.path().to_path_buf()],
                NamingConvention::default(),
            )),
            HookPosition::Back,
        );

        LazyResolver::new(artifact("", &[("a.pkg", "packed\n")])).install(&mut chain);
        assert_eq!(chain.finder_names(), vec!["app.run", "filesystem"]);

        assert_eq!(chain.load("a")?.content, b"packed\n".to_vec());
        assert_eq!(chain.load("b")?.content, b"disk only\n".to_vec());

        let mut back = LoaderChain::default();
        back.register(
            Arc::new(FilesystemFinder::new(
                vec![dir.path().to_path_buf()],
                NamingConvention::default(),
            )),
            HookPosition::Back,
        );
        LazyResolver::new(artifact("", &[("a.pkg", "packed\n")]))
            .install_at(&mut back, HookPosition::Back);
        assert_eq!(back.load("a")?.content, b"disk\n".to_vec());

        Ok(())
    }

    #[test]
    fn test_malformed_archive_fails_chain() {
        let data = b"#%srcpack v1 entries=1 lines=1\n#%toc 0 999 0;0 a.pkg\n#%data\n".to_vec();

        let mut chain = LoaderChain::default();
        LazyResolver::new(PackedArtifact::from_bytes(data, "bad.run").unwrap()).install(&mut chain);

        assert!(matches!(
            chain.load("a"),
            Err(LoadError::Failed { finder, .. }) if finder == "bad.run"
        ));
    }

    #[test]
    fn test_truthy() {
        for value in ["1", "true", "YES", " on "] {
            assert!(is_truthy(value));
        }
        for value in ["", "0", "false", "off", "nope"] {
            assert!(!is_truthy(value));
        }
    }
}
