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

//! Formatters that render log records to text.

use std::fmt;

use crate::ConfigError;

mod human;
mod json;
mod kv;
mod logfmt;

pub use self::human::HumanLayout;
pub use self::json::JsonLayout;
pub use self::kv::KvDisplay;
pub use self::logfmt::LogfmtLayout;

/// A layout for formatting log records.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Formats a log record.
    fn format(&self, record: &log::Record) -> anyhow::Result<Vec<u8>>;

    /// Returns the metadata suppression capability, if this layout has one.
    ///
    /// Default to `None`.
    fn suppress_metadata(&mut self) -> Option<&mut dyn SuppressMetadata> {
        None
    }
}

/// The capability of omitting record metadata (timestamp and level) from the output.
///
/// Sinks that carry such metadata on their own, like syslog, switch it on.
pub trait SuppressMetadata {
    /// Enables or disables metadata suppression.
    fn set_no_metadata(&mut self, no_metadata: bool);

    /// Whether metadata is currently suppressed.
    fn no_metadata(&self) -> bool;
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// Select a layout by its configuration name: `human`, `logfmt` or `json`.
///
/// # Examples
///
/// ```
/// use logforth_outlets::layout::layout_from_name;
///
/// assert!(layout_from_name("logfmt").is_ok());
/// assert!(layout_from_name("xml").is_err());
/// ```
pub fn layout_from_name(name: &str) -> anyhow::Result<Box<dyn Layout>> {
    match name {
        "human" => Ok(Box::new(HumanLayout::default())),
        "logfmt" => Ok(Box::new(LogfmtLayout::default())),
        "json" => Ok(Box::new(JsonLayout::default())),
        _ => Err(ConfigError::UnknownFormat(name.to_string()).into()),
    }
}

fn format_timestamp(tz: Option<&jiff::tz::TimeZone>) -> String {
    let now = match tz {
        Some(tz) => jiff::Timestamp::now().to_zoned(tz.clone()),
        None => jiff::Zoned::now(),
    };
    now.strftime("%Y-%m-%dT%H:%M:%S.%6f%:z").to_string()
}
