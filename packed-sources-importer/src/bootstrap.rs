// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Bootstrap directives embedded in generated artifacts.

The bootstrap section sits between an artifact's preamble and its archive.
Besides whatever host glue a template emits, it carries a few structural
lines describing how the resolver should be configured:

```text
#%srcpack-bootstrap v1
#%resolver position=front extension=.pkg package-index=__init__ trace-env=SRCPACK_TRACE
#%resources 2
```
*/

use {
    crate::{naming::NamingConvention, ResolveError},
    log::warn,
    std::{fmt::Display, str::FromStr},
};

/// First line of a bootstrap section.
pub const BOOTSTRAP_MARKER: &str = "#%srcpack-bootstrap v1";

/// Prefix of the line configuring the resolver.
pub const RESOLVER_DIRECTIVE_PREFIX: &str = "#%resolver ";

/// Prefix of the line declaring how many resources the archive holds.
pub const RESOURCES_DIRECTIVE_PREFIX: &str = "#%resources ";

/// Environment variable consulted for resolution tracing by default.
pub const DEFAULT_TRACE_ENV: &str = "SRCPACK_TRACE";

/// Where a finder is registered in a [crate::LoaderChain].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HookPosition {
    /// Consulted before every other finder.
    #[default]
    Front,

    /// Consulted after every other finder.
    Back,
}

impl Display for HookPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Front => "front",
            Self::Back => "back",
        })
    }
}

impl FromStr for HookPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            _ => Err(format!("{} is not a valid hook position", s)),
        }
    }
}

/// Resolver configuration recorded in an artifact's bootstrap section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapSettings {
    pub position: HookPosition,
    pub naming: NamingConvention,

    /// Environment variable that enables resolution tracing.
    pub trace_env: String,

    /// Resource count announced by the bootstrap, if any.
    pub declared_resources: Option<usize>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            position: HookPosition::default(),
            naming: NamingConvention::default(),
            trace_env: DEFAULT_TRACE_ENV.to_string(),
            declared_resources: None,
        }
    }
}

impl BootstrapSettings {
    /// Render the `#%resolver` directive line, without a trailing newline.
    pub fn resolver_directive(&self) -> String {
        let mut line = format!(
            "{}position={} extension={}",
            RESOLVER_DIRECTIVE_PREFIX, self.position, self.naming.extension
        );

        if let Some(index) = &self.naming.package_index {
            line.push_str(&format!(" package-index={}", index));
        }

        line.push_str(&format!(" trace-env={}", self.trace_env));

        line
    }

    /// Render the `#%resources` directive line for `count` resources.
    pub fn resources_directive(count: usize) -> String {
        format!("{}{}", RESOURCES_DIRECTIVE_PREFIX, count)
    }

    /// Apply a bootstrap line to these settings.
    ///
    /// Returns `Ok(false)` if the line is not a recognized directive.
    pub fn apply_directive(&mut self, line: &str, origin: &str) -> Result<bool, ResolveError> {
        let error = |message: String| ResolveError::Bootstrap {
            origin: origin.to_string(),
            message,
        };

        if let Some(fields) = line.strip_prefix(RESOLVER_DIRECTIVE_PREFIX) {
            for field in fields.split_ascii_whitespace() {
                let (key, value) = field
                    .split_once('=')
                    .ok_or_else(|| error(format!("expected key=value; got {}", field)))?;

                match key {
                    "position" => {
                        self.position = HookPosition::from_str(value).map_err(error)?;
                    }
                    "extension" => {
                        self.naming.extension = value.to_string();
                    }
                    "package-index" => {
                        self.naming.package_index = Some(value.to_string());
                    }
                    "trace-env" => {
                        self.trace_env = value.to_string();
                    }
                    _ => {
                        warn!("{}: ignoring unknown resolver setting {}", origin, key);
                    }
                }
            }

            Ok(true)
        } else if let Some(count) = line.strip_prefix(RESOURCES_DIRECTIVE_PREFIX) {
            self.declared_resources = Some(
                count
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| error(format!("bad resource count {}: {}", count, e)))?,
            );

            Ok(true)
        } else {
            Ok(line == BOOTSTRAP_MARKER)
        }
    }
}
