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

//! Configuration-driven log outlets.
//!
//! # Overview
//!
//! This crate turns an untyped configuration tree into a set of live outlets: the process
//! standard output, a TCP endpoint (optionally secured with TLS client authentication), and
//! the local syslog daemon. Each outlet has a minimum level and a formatter (`human`, `logfmt`
//! or `json`). The resulting [`Outlets`] implements [`log::Log`].
//!
//! Network delivery is best-effort and never blocks producers on a dead peer: broken
//! connections are re-established on the next record, and while that fails, records are
//! dropped until the outlet's retry interval elapses.
//!
//! # Examples
//!
//! ```
//! use logforth_outlets::LoggingConfig;
//! use serde_json::json;
//!
//! let raw = json!([
//!     { "outlet": "stdout", "level": "info", "format": "human" },
//! ]);
//! let outlets = LoggingConfig::parse(Some(&raw)).unwrap().into_outlets();
//! outlets.apply();
//!
//! log::info!("This is an info message.");
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod config;
pub mod layout;
pub mod tls;
pub mod trap;

mod error;
mod job_id;
mod outlets;

pub use append::Outlet;
pub use config::ConfigParser;
pub use config::LoggingConfig;
pub use error::ConfigError;
pub use job_id::JobId;
pub use job_id::JobIdError;
pub use layout::Layout;
pub use outlets::Outlets;
pub use trap::Trap;
