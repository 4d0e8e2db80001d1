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

use std::fmt::Write;

use jiff::tz::TimeZone;

use crate::layout::Layout;
use crate::layout::SuppressMetadata;
use crate::layout::format_timestamp;

/// A logfmt layout for formatting log records.
///
/// Output format:
///
/// ```text
/// timestamp=2025-03-31T21:04:28.991273+08:00 level=WARN module=replication message="Hello warn!"
/// timestamp=2025-03-31T21:04:28.991277+08:00 level=ERROR module=replication message="Hello err!"
/// ```
///
/// With metadata suppressed, `timestamp` and `level` are omitted.
///
/// # Examples
///
/// ```
/// use logforth_outlets::layout::LogfmtLayout;
///
/// let logfmt_layout = LogfmtLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct LogfmtLayout {
    tz: Option<TimeZone>,
    no_metadata: bool,
}

impl LogfmtLayout {
    /// Sets the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logforth_outlets::layout::LogfmtLayout;
    ///
    /// let logfmt_layout = LogfmtLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

// The encode logic follows https://github.com/go-logfmt/logfmt/blob/76262ea7/encode.go.
fn encode_key_value(result: &mut String, key: &str, value: &str) -> anyhow::Result<()> {
    if key.contains([' ', '=', '"']) {
        // omit keys contain special chars
        anyhow::bail!("key contains special chars: {key}");
    }

    if !result.is_empty() {
        result.push(' ');
    }
    if value.contains([' ', '=', '"']) {
        write!(result, "{key}=\"{}\"", value.escape_debug())?;
    } else {
        write!(result, "{key}={value}")?;
    }

    Ok(())
}

struct KvFormatter {
    text: String,
}

impl<'kvs> log::kv::VisitSource<'kvs> for KvFormatter {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        match encode_key_value(&mut self.text, key.as_str(), value.to_string().as_str()) {
            Ok(()) => Ok(()),
            Err(err) => Err(log::kv::Error::boxed(err)),
        }
    }
}

impl Layout for LogfmtLayout {
    fn format(&self, record: &log::Record) -> anyhow::Result<Vec<u8>> {
        let mut visitor = KvFormatter {
            text: String::new(),
        };

        if !self.no_metadata {
            let time = format_timestamp(self.tz.as_ref());
            encode_key_value(&mut visitor.text, "timestamp", &time)?;
            encode_key_value(&mut visitor.text, "level", record.level().as_str())?;
        }
        encode_key_value(&mut visitor.text, "module", record.target())?;
        encode_key_value(&mut visitor.text, "message", &record.args().to_string())?;

        record.key_values().visit(&mut visitor)?;

        Ok(visitor.text.into_bytes())
    }

    fn suppress_metadata(&mut self) -> Option<&mut dyn SuppressMetadata> {
        Some(self)
    }
}

impl SuppressMetadata for LogfmtLayout {
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

    #[test]
    fn test_format_quotes_values() {
        let mut layout = LogfmtLayout::default();
        layout.set_no_metadata(true);

        let kvs = vec![("peer", "10.0.0.2"), ("reason", "connection reset")];
        let bytes = layout
            .format(
                &Record::builder()
                    .args(format_args!("send failed"))
                    .level(Level::Error)
                    .target("tcp")
                    .key_values(&kvs)
                    .build(),
            )
            .unwrap();

        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            r#"module=tcp message="send failed" peer=10.0.0.2 reason="connection reset""#
        );
    }

    #[test]
    fn test_format_with_metadata() {
        let layout = LogfmtLayout::default().timezone(TimeZone::UTC);
        let bytes = layout
            .format(
                &Record::builder()
                    .args(format_args!("ready"))
                    .level(Level::Info)
                    .target("main")
                    .build(),
            )
            .unwrap();

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("timestamp="), "{text}");
        assert!(text.ends_with(" level=INFO module=main message=ready"), "{text}");
    }

    #[test]
    fn test_reject_special_key() {
        let layout = LogfmtLayout::default();
        let kvs = vec![("bad key", "v")];
        let result = layout.format(
            &Record::builder()
                .args(format_args!("x"))
                .key_values(&kvs)
                .build(),
        );
        assert!(result.is_err());
    }
}
