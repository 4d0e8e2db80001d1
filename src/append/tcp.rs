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
use std::io;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::str::FromStr;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use rustls::ClientConnection;
use rustls::StreamOwned;
use rustls::pki_types::ServerName;

use crate::ConfigError;
use crate::Layout;
use crate::append::reconnect::Connect;
use crate::append::reconnect::Reconnect;
use crate::layout::HumanLayout;
use crate::tls::TlsContext;

/// Upper bound for connecting to, and writing to, the remote end.
const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// The network family a [`TcpOutlet`] dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// IPv4 or IPv6.
    Tcp,
    /// IPv4 only.
    Tcp4,
    /// IPv6 only.
    Tcp6,
}

impl Network {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Network::Tcp => true,
            Network::Tcp4 => addr.is_ipv4(),
            Network::Tcp6 => addr.is_ipv6(),
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            _ => Err(ConfigError::UnknownNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Tcp => f.write_str("tcp"),
            Network::Tcp4 => f.write_str("tcp4"),
            Network::Tcp6 => f.write_str("tcp6"),
        }
    }
}

/// A builder to configure and create a [`TcpOutlet`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use logforth_outlets::append::Network;
/// use logforth_outlets::append::TcpOutletBuilder;
/// use logforth_outlets::layout::JsonLayout;
///
/// let outlet = TcpOutletBuilder::new(Network::Tcp, "logs.example.com:5140")
///     .layout(JsonLayout::default())
///     .retry_interval(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct TcpOutletBuilder {
    network: Network,
    address: String,
    layout: Box<dyn Layout>,
    retry_interval: Duration,
    tls: Option<TlsContext>,
}

impl TcpOutletBuilder {
    /// Create a new builder dialing `address` over `network`.
    pub fn new(network: Network, address: impl Into<String>) -> Self {
        Self {
            network,
            address: address.into(),
            layout: Box::new(HumanLayout::default()),
            retry_interval: Duration::ZERO,
            tls: None,
        }
    }

    /// Sets the layout for the logs.
    ///
    /// Default to [`HumanLayout`].
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Sets the minimum wait between reconnect attempts.
    pub fn retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Secures the connection with the given TLS context.
    pub fn tls(mut self, tls: TlsContext) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Build the [`TcpOutlet`].
    ///
    /// No connection is opened until the first record is delivered.
    ///
    /// # Errors
    ///
    /// Return an error if TLS is configured and no server name can be derived from the address.
    pub fn build(self) -> anyhow::Result<TcpOutlet> {
        let TcpOutletBuilder {
            network,
            address,
            layout,
            retry_interval,
            tls,
        } = self;

        let tls = match tls {
            Some(ctx) => {
                let name = server_name(&address)?;
                Some((ctx, name))
            }
            None => None,
        };

        let connector = TcpConnector {
            network,
            address,
            tls,
        };
        Ok(TcpOutlet {
            layout,
            transport: Reconnect::new(connector, retry_interval),
        })
    }
}

/// An outlet that writes log records, one per line, to a TCP endpoint, optionally over TLS.
///
/// Delivery is best-effort: a lost connection is re-established on the next record, and while
/// reconnecting fails, records are dropped until the retry interval elapses.
#[derive(Debug)]
pub struct TcpOutlet {
    layout: Box<dyn Layout>,
    transport: Reconnect<TcpConnector>,
}

impl TcpOutlet {
    /// The network family this outlet dials.
    pub fn network(&self) -> Network {
        self.transport.connector().network
    }

    /// The remote address.
    pub fn address(&self) -> &str {
        &self.transport.connector().address
    }

    /// The minimum wait between reconnect attempts.
    pub fn retry_interval(&self) -> Duration {
        self.transport.retry_interval()
    }

    /// The TLS context, if the connection is secured.
    pub fn tls(&self) -> Option<&TlsContext> {
        self.transport.connector().tls.as_ref().map(|(ctx, _)| ctx)
    }

    pub(crate) fn append(&self, record: &log::Record) -> anyhow::Result<()> {
        let mut bytes = self.layout.format(record)?;
        bytes.push(b'\n');
        self.transport
            .deliver(&bytes)
            .with_context(|| format!("cannot send log record to {}", self.address()))?;
        Ok(())
    }

    pub(crate) fn flush(&self) -> anyhow::Result<()> {
        self.transport
            .flush()
            .with_context(|| format!("cannot flush connection to {}", self.address()))
    }
}

fn server_name(address: &str) -> anyhow::Result<ServerName<'static>> {
    let host = match address.rsplit_once(':') {
        Some((host, _port)) => host,
        None => address,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    ServerName::try_from(host.to_string())
        .with_context(|| format!("cannot derive TLS server name from '{address}'"))
}

#[derive(Debug)]
struct TcpConnector {
    network: Network,
    address: String,
    tls: Option<(TlsContext, ServerName<'static>)>,
}

enum TcpTransport {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TcpTransport::Plain(stream) => stream.write(buf),
            TcpTransport::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TcpTransport::Plain(stream) => stream.flush(),
            TcpTransport::Tls(stream) => stream.flush(),
        }
    }
}

impl TcpConnector {
    fn dial(&self) -> io::Result<TcpStream> {
        let addrs = self.address.to_socket_addrs()?;
        connect_within(addrs, self.network, IO_TIMEOUT).map_err(|err| {
            if err.kind() == io::ErrorKind::AddrNotAvailable {
                io::Error::new(
                    err.kind(),
                    format!("no {} address found for {}", self.network, self.address),
                )
            } else {
                err
            }
        })
    }
}

/// Dial the first reachable address of `network`'s family.
///
/// All attempts together take at most `timeout`.
fn connect_within(
    addrs: impl IntoIterator<Item = SocketAddr>,
    network: Network,
    timeout: Duration,
) -> io::Result<TcpStream> {
    let deadline = Instant::now() + timeout;
    let mut last_err = None;
    for addr in addrs.into_iter().filter(|addr| network.accepts(addr)) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {addr} timed out"),
            ));
        }
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| io::ErrorKind::AddrNotAvailable.into()))
}

impl Connect for TcpConnector {
    type Stream = TcpTransport;

    fn connect(&self) -> io::Result<TcpTransport> {
        let stream = self.dial()?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;

        match &self.tls {
            None => Ok(TcpTransport::Plain(stream)),
            Some((ctx, name)) => {
                let conn = ClientConnection::new(ctx.client_config(), name.clone())
                    .map_err(io::Error::other)?;
                Ok(TcpTransport::Tls(Box::new(StreamOwned::new(conn, stream))))
            }
        }
    }
}
