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

use std::fmt;
use std::path::PathBuf;

use crate::append::OutletKind;

/// Classified configuration failures.
///
/// Errors returned by the configuration parser are [`anyhow::Error`] chains whose context
/// layers name the failing entry and field. When the root cause belongs to one of the classes
/// below, it can be recovered with [`anyhow::Error::downcast_ref`].
///
/// # Examples
///
/// ```
/// use logforth_outlets::ConfigError;
/// use logforth_outlets::LoggingConfig;
/// use serde_json::json;
///
/// let raw = json!([{ "outlet": "udp", "level": "info", "format": "human" }]);
/// let err = LoggingConfig::parse(Some(&raw)).unwrap_err();
/// assert!(matches!(
///     err.downcast_ref::<ConfigError>(),
///     Some(ConfigError::UnknownOutlet(name)) if name == "udp"
/// ));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// One of `outlet`, `level` or `format` is missing or empty.
    MissingCommonFields,
    /// The `outlet` field names no known outlet type.
    UnknownOutlet(String),
    /// The `format` field names no known formatter.
    UnknownFormat(String),
    /// The `format` field is not a string.
    WrongFormatType(String),
    /// The `net` field of a TCP outlet names no known network family.
    UnknownNetwork(String),
    /// More than one outlet of a capped kind is configured.
    DuplicateOutlet(OutletKind),
    /// A CA file yielded no parsable certificate.
    NoCertificates(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingCommonFields => {
                write!(f, "must specify 'outlet', 'level' and 'format' field")
            }
            ConfigError::UnknownOutlet(name) => write!(f, "unknown outlet type '{name}'"),
            ConfigError::UnknownFormat(name) => write!(f, "invalid log format: '{name}'"),
            ConfigError::WrongFormatType(ty) => {
                write!(f, "invalid log format: wrong type: {ty}")
            }
            ConfigError::UnknownNetwork(name) => write!(f, "unknown network '{name}'"),
            ConfigError::DuplicateOutlet(kind) => {
                write!(f, "can only define one '{kind}' outlet")
            }
            ConfigError::NoCertificates(path) => {
                write!(f, "cannot parse CA cert: no certificate in {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
