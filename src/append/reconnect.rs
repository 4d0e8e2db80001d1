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
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

/// Opens a fresh transport to a log sink.
pub(crate) trait Connect: fmt::Debug + Send + Sync + 'static {
    type Stream: Write + Send + 'static;

    fn connect(&self) -> io::Result<Self::Stream>;
}

/// The outcome of a successful delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Sent,
    /// Dropped without an attempt, because the outlet is backing off.
    Skipped,
}

enum State<S> {
    Connected(S),
    Disconnected,
    Backoff(Instant),
}

impl<S> fmt::Debug for State<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Connected(_) => f.write_str("Connected"),
            State::Disconnected => f.write_str("Disconnected"),
            State::Backoff(until) => f.debug_tuple("Backoff").field(until).finish(),
        }
    }
}

/// A single logical connection that re-establishes itself on failure.
///
/// Reconnect attempts are paced by `retry_interval`: after a failed attempt, deliveries are
/// dropped until the interval elapses. Nothing is queued. A zero interval retries on every
/// delivery.
pub(crate) struct Reconnect<C: Connect> {
    connector: C,
    retry_interval: Duration,
    state: Mutex<State<C::Stream>>,
}

impl<C: Connect> fmt::Debug for Reconnect<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconnect")
            .field("connector", &self.connector)
            .field("retry_interval", &self.retry_interval)
            .field("state", &self.state)
            .finish()
    }
}

impl<C: Connect> Reconnect<C> {
    pub(crate) fn new(connector: C, retry_interval: Duration) -> Self {
        Self {
            connector,
            retry_interval,
            state: Mutex::new(State::Disconnected),
        }
    }

    pub(crate) fn connector(&self) -> &C {
        &self.connector
    }

    pub(crate) fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Write `payload` to the sink, reconnecting first if needed.
    ///
    /// A write failure on an open connection triggers one immediate reconnect. If that fails as
    /// well, the payload is dropped, the error returned and the backoff armed.
    pub(crate) fn deliver(&self, payload: &[u8]) -> io::Result<Delivery> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let State::Backoff(until) = *state {
            if Instant::now() < until {
                return Ok(Delivery::Skipped);
            }
            *state = State::Disconnected;
        }

        if let State::Connected(stream) = &mut *state {
            if send(stream, payload).is_ok() {
                return Ok(Delivery::Sent);
            }
            *state = State::Disconnected;
        }

        let reconnected = self.connector.connect().and_then(|mut stream| {
            send(&mut stream, payload)?;
            Ok(stream)
        });
        match reconnected {
            Ok(stream) => {
                *state = State::Connected(stream);
                Ok(Delivery::Sent)
            }
            Err(err) => {
                *state = State::Backoff(backoff_deadline(Instant::now(), self.retry_interval));
                Err(err)
            }
        }
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let State::Connected(stream) = &mut *state {
            if let Err(err) = stream.flush() {
                *state = State::Disconnected;
                return Err(err);
            }
        }
        Ok(())
    }
}

/// The end of a backoff period starting at `now`.
///
/// Saturates at the latest representable instant when `retry_interval` is too large.
fn backoff_deadline(now: Instant, retry_interval: Duration) -> Instant {
    if let Some(until) = now.checked_add(retry_interval) {
        return until;
    }
    // binary search for the furthest instant the platform clock can hold
    let (mut lo, mut hi) = (Duration::ZERO, retry_interval);
    while hi - lo > Duration::from_secs(1) {
        let mid = lo + (hi - lo) / 2;
        if now.checked_add(mid).is_some() {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    now + lo
}

fn send<W: Write>(stream: &mut W, payload: &[u8]) -> io::Result<()> {
    stream.write_all(payload)?;
    stream.flush()
}
