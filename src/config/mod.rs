// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Build [`Outlets`] from an untyped configuration tree.
//!
//! The configuration is a sequence of entries, each a map with the keys `outlet` (`stdout`,
//! `tcp` or `syslog`), `level` and `format` (`human`, `logfmt` or `json`), plus the keys
//! specific to the outlet type:
//!
//! ```yaml
//! - outlet: stdout
//!   level: warn
//!   format: human
//! - outlet: tcp
//!   level: info
//!   format: json
//!   net: tcp
//!   address: logs.example.com:5140
//!   retry_interval: 10s
//!   tls:
//!     ca: /etc/logs/ca.pem
//!     cert: /etc/logs/client.pem
//!     key: /etc/logs/client.key
//! - outlet: syslog
//!   level: error
//!   format: logfmt
//!   retry_interval: 5s
//! ```
//!
//! An absent or empty sequence yields a single stdout outlet at `warn` level with the human
//! format.

use anyhow::Context;
use log::Level;
use serde_json::Value;

use crate::ConfigError;
use crate::Outlets;
use crate::append::OutletKind;
use crate::append::StdoutOutlet;
use crate::layout::HumanLayout;
use crate::tls::NativeTrustStore;
use crate::tls::TrustStore;

mod duration;
mod outlet;

/// The outlets of a parsed logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    outlets: Outlets,
}

impl LoggingConfig {
    /// Parse the outlet list, using the platform trust store for TLS blocks without a CA file.
    ///
    /// # Errors
    ///
    /// Return an error naming the failing entry if any entry cannot be parsed, or if more than
    /// one `stdout` or `syslog` outlet is configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_outlets::LoggingConfig;
    /// use serde_json::json;
    ///
    /// let raw = json!([
    ///     { "outlet": "stdout", "level": "info", "format": "logfmt" },
    ///     { "outlet": "syslog", "level": "error", "format": "human" },
    /// ]);
    /// let config = LoggingConfig::parse(Some(&raw)).unwrap();
    /// assert_eq!(config.outlets().len(), 2);
    /// ```
    pub fn parse(raw: Option<&Value>) -> anyhow::Result<LoggingConfig> {
        ConfigParser::default().parse(raw)
    }

    /// The configured outlets.
    pub fn outlets(&self) -> &Outlets {
        &self.outlets
    }

    /// Take the configured outlets.
    pub fn into_outlets(self) -> Outlets {
        self.outlets
    }
}

/// A configuration parser with a replaceable default trust store.
///
/// # Examples
///
/// ```
/// use logforth_outlets::ConfigParser;
/// use logforth_outlets::tls::FixedTrustStore;
///
/// let config = ConfigParser::default()
///     .with_trust_store(FixedTrustStore::default())
///     .parse(None)
///     .unwrap();
/// assert_eq!(config.outlets().len(), 1);
/// ```
#[derive(Debug)]
pub struct ConfigParser {
    trust_store: Box<dyn TrustStore>,
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self {
            trust_store: Box::new(NativeTrustStore::default()),
        }
    }
}

impl ConfigParser {
    /// Sets the trust store used by TLS blocks that name no CA file.
    ///
    /// Default to [`NativeTrustStore`].
    pub fn with_trust_store(mut self, trust_store: impl TrustStore + 'static) -> Self {
        self.trust_store = Box::new(trust_store);
        self
    }

    /// Parse the outlet list.
    ///
    /// See [`LoggingConfig::parse`].
    pub fn parse(&self, raw: Option<&Value>) -> anyhow::Result<LoggingConfig> {
        let entries = match raw {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(_) => anyhow::bail!("cannot decode outlet list: expected a sequence"),
        };

        let mut outlets = Outlets::new();
        if entries.is_empty() {
            let stdout = StdoutOutlet::default().with_layout(HumanLayout::default());
            outlets.add(stdout, Level::Warn);
            return Ok(LoggingConfig { outlets });
        }

        for (i, entry) in entries.iter().enumerate() {
            let (outlet, min_level) = outlet::parse_outlet(entry, self.trust_store.as_ref())
                .with_context(|| format!("cannot parse outlet #{i}"))?;
            outlets.add(outlet, min_level);
        }

        for kind in [OutletKind::Syslog, OutletKind::Stdout] {
            if outlets.count(kind) > 1 {
                return Err(ConfigError::DuplicateOutlet(kind).into());
            }
        }

        Ok(LoggingConfig { outlets })
    }
}
