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

use jiff::tz::TimeZone;

use crate::layout::KvDisplay;
use crate::layout::Layout;
use crate::layout::SuppressMetadata;
use crate::layout::format_timestamp;

/// A layout that formats log records as human-readable text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 ERROR replication: connection reset peer=10.0.0.2
/// 2024-08-11T22:44:57.172219+08:00  WARN replication: slow snapshot job=tank
/// ```
///
/// With metadata suppressed, the timestamp and level are omitted:
///
/// ```text
/// replication: connection reset peer=10.0.0.2
/// ```
///
/// # Examples
///
/// ```
/// use logforth_outlets::layout::HumanLayout;
///
/// let human_layout = HumanLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct HumanLayout {
    tz: Option<TimeZone>,
    no_metadata: bool,
}

impl HumanLayout {
    /// Sets the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logforth_outlets::layout::HumanLayout;
    ///
    /// let human_layout = HumanLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

impl Layout for HumanLayout {
    fn format(&self, record: &log::Record) -> anyhow::Result<Vec<u8>> {
        let target = record.target();
        let message = record.args();
        let kvs = KvDisplay::new(record.key_values());

        let text = if self.no_metadata {
            format!("{target}: {message}{kvs}")
        } else {
            let time = format_timestamp(self.tz.as_ref());
            let level = record.level();
            format!("{time} {level:>5} {target}: {message}{kvs}")
        };
        Ok(text.into_bytes())
    }

    fn suppress_metadata(&mut self) -> Option<&mut dyn SuppressMetadata> {
        Some(self)
    }
}

impl SuppressMetadata for HumanLayout {
    fn set_no_metadata(&mut self, no_metadata: bool) {
        self.no_metadata = no_metadata;
    }

    fn no_metadata(&self) -> bool {
        self.no_metadata
    }
}

#[cfg(test)]
mod tests {
    use log::Level;
    use log::Record;

    use super::*;

    fn render(layout: &HumanLayout) -> String {
        let kvs = vec![("job", "tank")];
        let bytes = layout
            .format(
                &Record::builder()
                    .args(format_args!("snapshot done"))
                    .level(Level::Warn)
                    .target("replication")
                    .key_values(&kvs)
                    .build(),
            )
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_format_with_metadata() {
        let layout = HumanLayout::default().timezone(TimeZone::UTC);
        let text = render(&layout);
        assert!(text.ends_with("  WARN replication: snapshot done job=tank"), "{text}");
        assert!(text.contains("+00:00"), "{text}");
    }

    #[test]
    fn test_format_without_metadata() {
        let mut layout = HumanLayout::default();
        layout.set_no_metadata(true);
        assert!(layout.no_metadata());
        assert_eq!(render(&layout), "replication: snapshot done job=tank");
    }
}
