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
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;

use crate::layout::Layout;
use crate::layout::format_timestamp;

const TIME_KEY: &str = "time";
const LEVEL_KEY: &str = "level";
const TARGET_KEY: &str = "target";
const MESSAGE_KEY: &str = "msg";

/// A JSON layout that renders each record as one flat object.
///
/// Record key-values become top-level fields, next to `time`, `level`, `target` and `msg`.
/// These four always win over a key-value of the same name. Numbers and booleans keep their
/// JSON type, everything else is rendered as a string.
///
/// Output format:
///
/// ```json
/// {"job":"tank","level":"error","msg":"replication failed","target":"replication","time":"2024-08-11T22:44:57.172051+08:00"}
/// {"level":"warn","msg":"snapshot skipped","target":"replication","time":"2024-08-11T22:44:57.172187+08:00"}
/// ```
///
/// The JSON layout always carries its metadata, it has no suppression capability.
///
/// # Examples
///
/// ```
/// use logforth_outlets::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonLayout {
    tz: Option<TimeZone>,
}

impl JsonLayout {
    /// Sets the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logforth_outlets::layout::JsonLayout;
    ///
    /// let json_layout = JsonLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

struct FieldCollector<'a> {
    fields: &'a mut Map<String, Value>,
}

impl<'kvs> log::kv::VisitSource<'kvs> for FieldCollector<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.fields.insert(key.to_string(), field_value(&value));
        Ok(())
    }
}

fn field_value(value: &log::kv::Value) -> Value {
    if let Some(b) = value.to_bool() {
        return Value::Bool(b);
    }
    if let Some(n) = value.to_i64() {
        return Value::Number(n.into());
    }
    if let Some(n) = value.to_u64() {
        return Value::Number(n.into());
    }
    if let Some(n) = value.to_f64().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(value.to_string())
}

impl Layout for JsonLayout {
    fn format(&self, record: &log::Record) -> anyhow::Result<Vec<u8>> {
        let mut fields = Map::new();
        record
            .key_values()
            .visit(&mut FieldCollector { fields: &mut fields })?;

        let time = format_timestamp(self.tz.as_ref());
        let level = record.level().as_str().to_ascii_lowercase();

        fields.insert(TIME_KEY.to_string(), time.into());
        fields.insert(LEVEL_KEY.to_string(), level.into());
        fields.insert(TARGET_KEY.to_string(), record.target().into());
        fields.insert(MESSAGE_KEY.to_string(), record.args().to_string().into());

        Ok(serde_json::to_vec(&fields)?)
    }
}

#[cfg(test)]
mod tests {
    use log::Level;
    use log::Record;

    use super::*;

    #[test]
    fn test_format_json_line() {
        let layout = JsonLayout::default().timezone(TimeZone::UTC);
        let kvs = vec![
            ("job", log::kv::Value::from("tank")),
            ("pruned", log::kv::Value::from(3u32)),
            ("dry_run", log::kv::Value::from(false)),
        ];
        let bytes = layout
            .format(
                &Record::builder()
                    .args(format_args!("pruned {} snapshots", 3))
                    .level(Level::Info)
                    .target("pruner")
                    .key_values(&kvs)
                    .build(),
            )
            .unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["target"], "pruner");
        assert_eq!(value["msg"], "pruned 3 snapshots");
        assert_eq!(value["job"], "tank");
        assert_eq!(value["pruned"], 3);
        assert_eq!(value["dry_run"], false);
        assert!(value["time"].as_str().unwrap().ends_with("+00:00"), "{value}");
    }

    #[test]
    fn test_reserved_keys_win() {
        let layout = JsonLayout::default();
        let kvs = vec![("msg", "shadowed"), ("level", "shadowed")];
        let bytes = layout
            .format(
                &Record::builder()
                    .args(format_args!("kept"))
                    .level(Level::Warn)
                    .target("pruner")
                    .key_values(&kvs)
                    .build(),
            )
            .unwrap();

        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["msg"], "kept");
        assert_eq!(value["level"], "warn");
    }
}
