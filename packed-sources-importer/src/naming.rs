// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Mapping requested unit names to archive resource names. */

/// Convention translating dotted unit names into resource names.
///
/// `a.b` maps to `a/b<extension>` and, when a package index is configured,
/// then to `a/b/<index><extension>`. Requests already shaped like resource
/// names (containing `/` or ending with the extension) are used verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamingConvention {
    /// Suffix appended to mapped names, including any leading dot.
    pub extension: String,

    /// File stem of the resource standing for a package as a whole.
    pub package_index: Option<String>,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            extension: ".pkg".to_string(),
            package_index: None,
        }
    }
}

impl NamingConvention {
    pub fn new(extension: impl ToString, package_index: Option<&str>) -> Self {
        Self {
            extension: extension.to_string(),
            package_index: package_index.map(|s| s.to_string()),
        }
    }

    /// Resource names to try for a requested unit, in order.
    ///
    /// An empty request yields no candidates.
    pub fn candidates(&self, requested: &str) -> Vec<String> {
        let requested = requested.trim();

        if requested.is_empty() {
            return vec![];
        }

        if requested.contains('/')
            || (!self.extension.is_empty() && requested.ends_with(&self.extension))
        {
            return vec![requested.to_string()];
        }

        // `pkg.<index>` names the package itself.
        let requested = match &self.package_index {
            Some(index) => requested
                .strip_suffix(index.as_str())
                .and_then(|s| s.strip_suffix('.'))
                .filter(|s| !s.is_empty())
                .unwrap_or(requested),
            None => requested,
        };

        let base = requested.replace('.', "/");

        let mut candidates = vec![format!("{}{}", base, self.extension)];

        if let Some(index) = &self.package_index {
            candidates.push(format!("{}/{}{}", base, index, self.extension));
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates() {
        let naming = NamingConvention::new(".pkg", Some("__init__"));

        assert_eq!(naming.candidates("A.pkg"), vec!["A.pkg".to_string()]);
        assert_eq!(naming.candidates("lib/util"), vec!["lib/util".to_string()]);
        assert_eq!(
            naming.candidates("a.b"),
            vec!["a/b.pkg".to_string(), "a/b/__init__.pkg".to_string()]
        );
        assert_eq!(
            naming.candidates("a.__init__"),
            vec!["a.pkg".to_string(), "a/__init__.pkg".to_string()]
        );
        assert!(naming.candidates("").is_empty());
        assert!(naming.candidates("  ").is_empty());
    }

    #[test]
    fn test_candidates_without_index() {
        let naming = NamingConvention::new(".lua", None);
        assert_eq!(naming.candidates("x.y.z"), vec!["x/y/z.lua".to_string()]);

        let naming = NamingConvention::new("", None);
        assert_eq!(naming.candidates("x.y"), vec!["x/y".to_string()]);
    }
}
