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

use std::time::Duration;

use anyhow::Context;
use jiff::SignedDuration;

/// Longest accepted duration: `i64::MAX` nanoseconds, about 292 years.
const MAX_DURATION: Duration = Duration::from_nanos(i64::MAX as u64);

/// Parse a duration string such as `500ms`, `2s`, `1m30s` or `1.5s`.
///
/// A bare `0` is accepted as zero. Negative durations and durations longer than about 292
/// years are rejected.
pub(crate) fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let signed = s
        .parse::<SignedDuration>()
        .with_context(|| format!("invalid duration '{s}'"))?;
    let duration =
        Duration::try_from(signed).with_context(|| format!("negative duration '{s}'"))?;
    if duration > MAX_DURATION {
        anyhow::bail!("duration '{s}' out of range");
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("2562047h").unwrap(), Duration::from_secs(2562047 * 3600));
    }

    #[test]
    fn test_parse_invalid_duration() {
        for input in ["", "soon", "5", "-2s", "9223372036854775807s", "300y"] {
            assert!(parse_duration(input).is_err(), "{input}");
        }
    }
}
