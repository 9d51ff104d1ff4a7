// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Assembling generated artifacts. */

use {
    crate::error::PackError,
    packed_sources::{count_lines, HEADER_PREFIX},
    packed_sources_importer::{
        BOOTSTRAP_MARKER, RESOLVER_DIRECTIVE_PREFIX, RESOURCES_DIRECTIVE_PREFIX,
    },
};

/// Text sections and archive bytes forming a generated artifact.
///
/// Layout: `[preamble] bootstrap [postamble] archive`. Every text section
/// is newline terminated on output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub preamble: Option<String>,
    pub bootstrap: String,
    pub postamble: Option<String>,
}

/// Whether a line outside the bootstrap section would be read as structure.
fn is_structural(line: &str) -> bool {
    line.starts_with(HEADER_PREFIX)
        || line.starts_with(RESOLVER_DIRECTIVE_PREFIX)
        || line.starts_with(RESOURCES_DIRECTIVE_PREFIX)
        || line == BOOTSTRAP_MARKER
}

fn terminated(section: &str) -> String {
    if section.is_empty() || section.ends_with('\n') {
        section.to_string()
    } else {
        format!("{}\n", section)
    }
}

impl GeneratedArtifact {
    fn sections(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("preamble", self.preamble.as_deref()),
            ("bootstrap", Some(self.bootstrap.as_str())),
            ("postamble", self.postamble.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, section)| section.map(|s| (label, s)))
    }

    /// Ensure no section line could be mistaken for the archive header.
    ///
    /// The preamble and postamble additionally may not carry bootstrap
    /// directives or the bootstrap marker.
    pub fn validate(&self) -> Result<(), PackError> {
        for (section, text) in self.sections() {
            let reserved = |line: &str| {
                if section == "bootstrap" {
                    line.starts_with(HEADER_PREFIX)
                } else {
                    is_structural(line)
                }
            };

            if let Some(index) = text.lines().position(reserved) {
                return Err(PackError::InvalidArtifactSection {
                    section,
                    line: index + 1,
                });
            }
        }

        Ok(())
    }

    /// The text preceding the archive.
    pub fn head(&self) -> Result<String, PackError> {
        self.validate()?;

        Ok(self
            .sections()
            .map(|(_, text)| terminated(text))
            .collect::<String>())
    }

    /// Number of artifact lines preceding the archive header.
    pub fn archive_start_line(&self) -> Result<usize, PackError> {
        Ok(count_lines(self.head()?.as_bytes()))
    }

    /// Assemble the full artifact.
    pub fn assemble(&self, archive: &[u8]) -> Result<Vec<u8>, PackError> {
        let head = self.head()?;

        let mut data = Vec::with_capacity(head.len() + archive.len());
        data.extend_from_slice(head.as_bytes());
        data.extend_from_slice(archive);

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble() -> Result<(), PackError> {
        let artifact = GeneratedArtifact {
            preamble: Some("#!/usr/bin/env host".to_string()),
            bootstrap: "boot 1\nboot 2\n".to_string(),
            postamble: Some(String::new()),
        };

        assert_eq!(artifact.archive_start_line()?, 3);
        assert_eq!(
            artifact.assemble(b"#%srcpack v1 entries=0 lines=0\n#%data\n")?,
            b"#!/usr/bin/env host\nboot 1\nboot 2\n#%srcpack v1 entries=0 lines=0\n#%data\n".to_vec()
        );

        let bare = GeneratedArtifact::default();
        assert_eq!(bare.archive_start_line()?, 0);
        assert_eq!(bare.assemble(b"x")?, b"x".to_vec());

        Ok(())
    }

    #[test]
    fn test_header_lookalike_rejected() {
        let artifact = GeneratedArtifact {
            preamble: None,
            bootstrap: "ok\n".to_string(),
            postamble: Some("fine\n#%srcpack v1 entries=1\n".to_string()),
        };

        assert!(matches!(
            artifact.assemble(b""),
            Err(PackError::InvalidArtifactSection { section: "postamble", line: 2 })
        ));

        // Other structural prefixes are allowed.
        let artifact = GeneratedArtifact {
            bootstrap: "#%srcpack-bootstrap v1\n#%toc x\n".to_string(),
            ..GeneratedArtifact::default()
        };
        assert!(artifact.validate().is_ok());
    }

    #[test]
    fn test_directives_outside_bootstrap_rejected() {
        let bootstrap = "#%srcpack-bootstrap v1\n#%resolver position=front\n#%resources 1\n";

        for (preamble, postamble, section, line) in [
            (Some("#!/bin/host\n#%resources many\n"), None, "preamble", 2),
            (Some("#%srcpack-bootstrap v1\n"), None, "preamble", 1),
            (None, Some("ok\n#%resolver position=back\n"), "postamble", 2),
        ] {
            let artifact = GeneratedArtifact {
                preamble: preamble.map(|s| s.to_string()),
                bootstrap: bootstrap.to_string(),
                postamble: postamble.map(|s| s.to_string()),
            };

            match artifact.validate() {
                Err(PackError::InvalidArtifactSection {
                    section: got_section,
                    line: got_line,
                }) => {
                    assert_eq!((got_section, got_line), (section, line));
                }
                other => panic!("expected invalid {} section; got {:?}", section, other),
            }
        }

        let artifact = GeneratedArtifact {
            preamble: Some("#%resourcesful but harmless\n".to_string()),
            bootstrap: bootstrap.to_string(),
            postamble: None,
        };
        assert!(artifact.validate().is_ok());
    }
}
