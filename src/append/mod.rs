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

//! Outlets that deliver formatted log records to their destinations.

use std::fmt;

mod reconnect;
mod stdout;
mod syslog;
mod tcp;

pub use self::stdout::StdoutOutlet;
pub use self::syslog::SyslogOutlet;
pub use self::syslog::SyslogOutletBuilder;
pub use self::tcp::Network;
pub use self::tcp::TcpOutlet;
pub use self::tcp::TcpOutletBuilder;

/// The kind of an [`Outlet`], named as in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutletKind {
    /// `stdout`, at most one per configuration.
    Stdout,
    /// `tcp`, any number per configuration.
    Tcp,
    /// `syslog`, at most one per configuration.
    Syslog,
}

impl fmt::Display for OutletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutletKind::Stdout => f.write_str("stdout"),
            OutletKind::Tcp => f.write_str("tcp"),
            OutletKind::Syslog => f.write_str("syslog"),
        }
    }
}

/// A configured destination for log records.
#[derive(Debug)]
pub enum Outlet {
    /// The process standard output.
    Stdout(StdoutOutlet),
    /// A TCP endpoint, optionally secured with TLS.
    Tcp(TcpOutlet),
    /// The local syslog daemon.
    Syslog(SyslogOutlet),
}

impl Outlet {
    /// The kind of this outlet.
    pub fn kind(&self) -> OutletKind {
        match self {
            Outlet::Stdout(_) => OutletKind::Stdout,
            Outlet::Tcp(_) => OutletKind::Tcp,
            Outlet::Syslog(_) => OutletKind::Syslog,
        }
    }

    /// Formats and delivers a log record.
    pub fn append(&self, record: &log::Record) -> anyhow::Result<()> {
        match self {
            Outlet::Stdout(outlet) => outlet.append(record),
            Outlet::Tcp(outlet) => outlet.append(record),
            Outlet::Syslog(outlet) => outlet.append(record),
        }
    }

    /// Flushes any buffered records.
    pub fn flush(&self) -> anyhow::Result<()> {
        match self {
            Outlet::Stdout(outlet) => outlet.flush(),
            Outlet::Tcp(outlet) => outlet.flush(),
            Outlet::Syslog(outlet) => outlet.flush(),
        }
    }
}

impl From<StdoutOutlet> for Outlet {
    fn from(outlet: StdoutOutlet) -> Self {
        Outlet::Stdout(outlet)
    }
}

impl From<TcpOutlet> for Outlet {
    fn from(outlet: TcpOutlet) -> Self {
        Outlet::Tcp(outlet)
    }
}

impl From<SyslogOutlet> for Outlet {
    fn from(outlet: SyslogOutlet) -> Self {
        Outlet::Syslog(outlet)
    }
}
