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

use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use fasyslog::Severity;
use fasyslog::format::SyslogContext;
use fasyslog::sender::SyslogSender;

use crate::Layout;
use crate::append::reconnect::Connect;
use crate::append::reconnect::Reconnect;
use crate::layout::HumanLayout;

/// Well-known local syslog sockets, tried in order.
#[cfg(unix)]
const WELL_KNOWN_SOCKETS: [&str; 3] = ["/dev/log", "/var/run/syslog", "/var/run/log"];

/// A builder to configure and create a [`SyslogOutlet`].
///
/// # Examples
///
/// ```
/// use logforth_outlets::append::SyslogOutletBuilder;
/// use logforth_outlets::layout::LogfmtLayout;
///
/// let outlet = SyslogOutletBuilder::new()
///     .layout(LogfmtLayout::default())
///     .build();
/// ```
#[derive(Debug)]
pub struct SyslogOutletBuilder {
    layout: Box<dyn Layout>,
    retry_interval: Duration,
    socket: Option<PathBuf>,
}

impl Default for SyslogOutletBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyslogOutletBuilder {
    /// Create a new builder for the local syslog daemon.
    pub fn new() -> Self {
        Self {
            layout: Box::new(HumanLayout::default()),
            retry_interval: Duration::ZERO,
            socket: None,
        }
    }

    /// Sets the layout for the logs.
    ///
    /// Syslog carries the timestamp and severity of each record on its own, so metadata
    /// suppression is switched on if the layout supports it.
    ///
    /// Default to [`HumanLayout`].
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Sets the minimum wait between reconnect attempts.
    ///
    /// Default to zero, which reconnects on every delivery after a failure.
    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Sends to the given Unix socket instead of probing the well-known locations.
    #[cfg(unix)]
    pub fn unix_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket = Some(path.into());
        self
    }

    /// Build the [`SyslogOutlet`].
    ///
    /// No connection is opened until the first record is delivered.
    pub fn build(self) -> SyslogOutlet {
        let SyslogOutletBuilder {
            mut layout,
            retry_interval,
            socket,
        } = self;

        if let Some(suppress) = layout.suppress_metadata() {
            suppress.set_no_metadata(true);
        }

        SyslogOutlet {
            layout,
            context: SyslogContext::default(),
            transport: Reconnect::new(SyslogConnector { socket }, retry_interval),
        }
    }
}

/// An outlet that writes log records to the local syslog daemon in RFC 3164 format.
#[derive(Debug)]
pub struct SyslogOutlet {
    layout: Box<dyn Layout>,
    context: SyslogContext,
    transport: Reconnect<SyslogConnector>,
}

impl SyslogOutlet {
    /// The minimum wait between reconnect attempts.
    pub fn retry_interval(&self) -> Duration {
        self.transport.retry_interval()
    }

    /// The layout used to render the message part of each syslog line.
    pub fn layout(&self) -> &dyn Layout {
        self.layout.as_ref()
    }

    pub(crate) fn append(&self, record: &log::Record) -> anyhow::Result<()> {
        let severity = syslog_severity(record.level());
        let message = self.layout.format(record)?;
        let message = String::from_utf8_lossy(&message);
        let line = format!("{}", self.context.format_rfc3164(severity, Some(message)));

        self.transport
            .deliver(line.as_bytes())
            .context("cannot send log record to syslog")?;
        Ok(())
    }

    pub(crate) fn flush(&self) -> anyhow::Result<()> {
        self.transport
            .flush()
            .context("cannot flush syslog connection")
    }
}

/// Syslog has no level below debug, trace records share it.
fn syslog_severity(level: log::Level) -> Severity {
    match level {
        log::Level::Error => Severity::ERROR,
        log::Level::Warn => Severity::WARNING,
        log::Level::Info => Severity::INFORMATIONAL,
        log::Level::Debug | log::Level::Trace => Severity::DEBUG,
    }
}

#[derive(Debug)]
struct SyslogConnector {
    #[cfg_attr(not(unix), allow(dead_code))]
    socket: Option<PathBuf>,
}

struct SyslogStream(SyslogSender);

impl Write for SyslogStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.send_formatted(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Connect for SyslogConnector {
    type Stream = SyslogStream;

    #[cfg(unix)]
    fn connect(&self) -> io::Result<SyslogStream> {
        if let Some(path) = &self.socket {
            return fasyslog::sender::unix(path).map(SyslogStream);
        }

        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no syslog socket found");
        for path in WELL_KNOWN_SOCKETS {
            match fasyslog::sender::unix(path) {
                Ok(sender) => return Ok(SyslogStream(sender)),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    #[cfg(not(unix))]
    fn connect(&self) -> io::Result<SyslogStream> {
        fasyslog::sender::udp_well_known().map(|sender| SyslogStream(SyslogSender::Udp(sender)))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixDatagram;

    use log::Level;
    use log::Record;
    use tempfile::TempDir;

    use super::*;
    use crate::layout::LogfmtLayout;

    #[test]
    fn test_layout_metadata_is_suppressed() {
        let mut outlet = SyslogOutletBuilder::new()
            .layout(LogfmtLayout::default())
            .build();
        let suppress = outlet.layout.suppress_metadata().unwrap();
        assert!(suppress.no_metadata());
        assert_eq!(outlet.retry_interval(), Duration::ZERO);
    }

    #[test]
    fn test_append_to_unix_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.sock");
        let server = UnixDatagram::bind(&path).unwrap();

        let outlet = SyslogOutletBuilder::new()
            .unix_socket(&path)
            .retry_interval(Duration::from_secs(2))
            .build();
        assert_eq!(outlet.retry_interval(), Duration::from_secs(2));

        outlet
            .append(
                &Record::builder()
                    .args(format_args!("pool degraded"))
                    .level(Level::Warn)
                    .target("zpool")
                    .build(),
            )
            .unwrap();

        let mut buf = [0u8; 1024];
        let n = server.recv(&mut buf).unwrap();
        let line = String::from_utf8_lossy(&buf[..n]);
        assert!(line.starts_with('<'), "{line}");
        assert!(line.contains("zpool: pool degraded"), "{line}");
    }

    #[test]
    fn test_missing_socket_is_reported() {
        let dir = TempDir::new().unwrap();
        let outlet = SyslogOutletBuilder::new()
            .unix_socket(dir.path().join("missing.sock"))
            .build();

        let err = outlet
            .append(
                &Record::builder()
                    .args(format_args!("lost"))
                    .level(Level::Error)
                    .build(),
            )
            .unwrap_err();
        assert!(format!("{err:#}").starts_with("cannot send log record to syslog"));
    }
}
