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

//! Validated job names used to tag log records.

use std::fmt;

use serde::Serialize;
use serde::Serializer;

/// Characters that are not allowed anywhere in a dataset path.
const FORBIDDEN_CHARS: &[char] = &['@', '#', '|', '\t', '<', '>', '*'];

/// A job name that is safe to use as a dataset path component and as a hold tag.
///
/// Only [`JobId::new`] produces a usable value. A default-constructed `JobId` is a placeholder:
/// reading, displaying or serializing it panics.
///
/// # Examples
///
/// ```
/// use logforth_outlets::JobId;
///
/// let id = JobId::new("tank/backups").unwrap();
/// assert_eq!(id.as_str(), "tank/backups");
/// assert!(JobId::new("").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JobId {
    id: String,
}

/// The reason a string was rejected as a [`JobId`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum JobIdError {
    /// The string is empty.
    Empty,
    /// The string contains a character that is forbidden in dataset paths.
    ForbiddenChar(char),
    /// The string ends with a `/`.
    TrailingSlash,
    /// The string contains an empty path component.
    EmptyComponent,
}

impl fmt::Display for JobIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobIdError::Empty => write!(f, "must not be empty string"),
            JobIdError::ForbiddenChar(c) => write!(
                f,
                "must be usable in a dataset path: contains forbidden character {c:?}"
            ),
            JobIdError::TrailingSlash => {
                write!(f, "must be usable in a dataset path: must not end with a '/'")
            }
            JobIdError::EmptyComponent => write!(
                f,
                "must be usable in a dataset path: must not contain empty components"
            ),
        }
    }
}

impl std::error::Error for JobIdError {}

impl JobId {
    /// Validate `s` as a job name.
    ///
    /// # Errors
    ///
    /// Return an error if `s` is empty or unusable as a dataset path.
    pub fn new(s: impl Into<String>) -> Result<JobId, JobIdError> {
        let id = s.into();
        if id.is_empty() {
            return Err(JobIdError::Empty);
        }
        if let Some(c) = id.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
            return Err(JobIdError::ForbiddenChar(c));
        }
        if id.ends_with('/') {
            return Err(JobIdError::TrailingSlash);
        }
        if id.split('/').any(str::is_empty) {
            return Err(JobIdError::EmptyComponent);
        }
        Ok(JobId { id })
    }

    /// Validate `s` as a job name, for names known to be valid.
    ///
    /// # Panics
    ///
    /// Panic if `s` is not a valid job name.
    pub fn must_new(s: impl Into<String>) -> JobId {
        match JobId::new(s) {
            Ok(id) => id,
            Err(err) => panic!("invalid job id: {err}"),
        }
    }

    /// The validated name.
    ///
    /// # Panics
    ///
    /// Panic if this `JobId` was not produced by [`JobId::new`].
    pub fn as_str(&self) -> &str {
        assert!(!self.id.is_empty(), "use of uninitialized JobId");
        &self.id
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id = JobId::new("tank/backups").unwrap();
        assert_eq!(id.as_str(), "tank/backups");
        assert_eq!(id.to_string(), "tank/backups");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""tank/backups""#);
    }

    #[test]
    fn test_reject_invalid() {
        assert_eq!(JobId::new(""), Err(JobIdError::Empty));
        assert_eq!(JobId::new("tank@snap"), Err(JobIdError::ForbiddenChar('@')));
        assert_eq!(JobId::new("tank\tpool"), Err(JobIdError::ForbiddenChar('\t')));
        assert_eq!(JobId::new("tank/"), Err(JobIdError::TrailingSlash));
        assert_eq!(JobId::new("tank//backups"), Err(JobIdError::EmptyComponent));
        assert_eq!(JobId::new("/tank"), Err(JobIdError::EmptyComponent));
    }

    #[test]
    #[should_panic(expected = "use of uninitialized JobId")]
    fn test_default_as_str_panics() {
        let id = JobId::default();
        let _ = id.as_str();
    }

    #[test]
    #[should_panic(expected = "use of uninitialized JobId")]
    fn test_default_serialize_panics() {
        let _ = serde_json::to_string(&JobId::default());
    }

    #[test]
    #[should_panic(expected = "invalid job id")]
    fn test_must_new_panics() {
        let _ = JobId::must_new("a|b");
    }
}
