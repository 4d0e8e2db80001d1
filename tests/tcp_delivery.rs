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

use std::collections::BTreeSet;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use log::Level;
use log::Record;
use logforth_outlets::LoggingConfig;
use logforth_outlets::Outlets;
use logforth_outlets::Trap;
use rustls::ServerConfig;
use rustls::ServerConnection;
use rustls::StreamOwned;
use rustls::pki_types::PrivateKeyDer;
use rustls::pki_types::PrivatePkcs8KeyDer;
use serde_json::Value;
use serde_json::json;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default)]
struct CollectTrap {
    errors: Arc<Mutex<Vec<String>>>,
}

impl Trap for CollectTrap {
    fn trap(&self, err: &anyhow::Error) {
        self.errors.lock().unwrap().push(format!("{err:#}"));
    }
}

fn tcp_outlets(address: &str, level: &str, retry_interval: &str) -> Outlets {
    let raw = json!([{
        "outlet": "tcp", "level": level, "format": "json",
        "net": "tcp", "address": address, "retry_interval": retry_interval,
    }]);
    LoggingConfig::parse(Some(&raw)).unwrap().into_outlets()
}

fn emit(outlets: &Outlets, level: Level, message: &str) {
    outlets.dispatch(
        &Record::builder()
            .args(format_args!("{message}"))
            .level(level)
            .target("tcp_delivery")
            .build(),
    );
}

#[test]
fn test_delivers_records_meeting_threshold() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let trap = CollectTrap::default();
    let outlets = tcp_outlets(&address, "info", "1s").with_trap(trap.clone());

    emit(&outlets, Level::Info, "first");
    emit(&outlets, Level::Debug, "filtered");
    emit(&outlets, Level::Error, "second");

    let (stream, _) = listener.accept().unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut lines = BufReader::new(stream).lines();

    let first: Value = serde_json::from_str(&lines.next().unwrap().unwrap()).unwrap();
    assert_eq!(first["level"], "info");
    assert_eq!(first["msg"], "first");

    let second: Value = serde_json::from_str(&lines.next().unwrap().unwrap()).unwrap();
    assert_eq!(second["level"], "error");
    assert_eq!(second["msg"], "second");

    assert!(trap.errors.lock().unwrap().is_empty());
}

#[test]
fn test_unreachable_endpoint_drops_records_during_backoff() {
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };

    let trap = CollectTrap::default();
    let outlets = tcp_outlets(&address, "debug", "1h").with_trap(trap.clone());

    emit(&outlets, Level::Warn, "lost");
    emit(&outlets, Level::Warn, "skipped");
    emit(&outlets, Level::Error, "skipped too");

    let errors = trap.errors.lock().unwrap();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(
        errors[0].starts_with(&format!("cannot send log record to {address}")),
        "{errors:?}"
    );
}

#[test]
fn test_reconnects_after_peer_closes() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let outlets = tcp_outlets(&address, "info", "0s").with_trap(CollectTrap::default());

    emit(&outlets, Level::Info, "before");
    let (stream, _) = listener.accept().unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut lines = BufReader::new(stream).lines();
    let before: Value = serde_json::from_str(&lines.next().unwrap().unwrap()).unwrap();
    assert_eq!(before["msg"], "before");
    drop(lines);

    // a write to a freshly closed socket may still succeed locally, keep logging until the
    // outlet notices and dials again
    listener.set_nonblocking(true).unwrap();
    let mut accepted = None;
    for _ in 0..100 {
        emit(&outlets, Level::Info, "after");
        match listener.accept() {
            Ok((stream, _)) => {
                accepted = Some(stream);
                break;
            }
            Err(_) => std::thread::sleep(Duration::from_millis(20)),
        }
    }

    let stream = accepted.expect("outlet did not reconnect");
    stream.set_nonblocking(false).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut lines = BufReader::new(stream).lines();
    let after: Value = serde_json::from_str(&lines.next().unwrap().unwrap()).unwrap();
    assert_eq!(after["msg"], "after");
}

#[test]
fn test_concurrent_producers_do_not_interleave() {
    const PRODUCERS: usize = 8;
    const RECORDS: usize = 25;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let reader = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        BufReader::new(stream)
            .lines()
            .take(PRODUCERS * RECORDS)
            .map(|line| line.unwrap())
            .collect::<Vec<_>>()
    });

    let trap = CollectTrap::default();
    let outlets = tcp_outlets(&address, "info", "1h").with_trap(trap.clone());
    thread::scope(|scope| {
        for producer in 0..PRODUCERS {
            let outlets = &outlets;
            scope.spawn(move || {
                for record in 0..RECORDS {
                    emit(outlets, Level::Info, &format!("producer {producer} record {record}"));
                }
            });
        }
    });

    let lines = reader.join().unwrap();
    assert_eq!(lines.len(), PRODUCERS * RECORDS);
    let messages = lines
        .iter()
        .map(|line| {
            let value: Value = serde_json::from_str(line).unwrap();
            value["msg"].as_str().unwrap().to_string()
        })
        .collect::<BTreeSet<_>>();
    let expected = (0..PRODUCERS)
        .flat_map(|p| (0..RECORDS).map(move |r| format!("producer {p} record {r}")))
        .collect::<BTreeSet<_>>();
    assert_eq!(messages, expected);
    assert!(trap.errors.lock().unwrap().is_empty());
}

fn pem_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_delivers_over_tls() {
    let server = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let client = rcgen::generate_simple_self_signed(vec!["client.local".to_string()]).unwrap();
    let ca = pem_file(&server.cert.pem());
    let cert = pem_file(&client.cert.pem());
    let key = pem_file(&client.key_pair.serialize_pem());

    let server_config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(
            vec![server.cert.der().clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(server.key_pair.serialize_der())),
        )
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let reader = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let conn = ServerConnection::new(Arc::new(server_config)).unwrap();
        let mut tls = StreamOwned::new(conn, stream);
        let mut line = String::new();
        BufReader::new(&mut tls).read_line(&mut line).unwrap();
        line
    });

    let raw = json!([{
        "outlet": "tcp", "level": "info", "format": "json",
        "net": "tcp4", "address": format!("localhost:{port}"), "retry_interval": "1s",
        "tls": {
            "ca": ca.path(),
            "cert": cert.path(),
            "key": key.path(),
        },
    }]);
    let trap = CollectTrap::default();
    let outlets = LoggingConfig::parse(Some(&raw))
        .unwrap()
        .into_outlets()
        .with_trap(trap.clone());

    emit(&outlets, Level::Warn, "secured");

    let line = reader.join().unwrap();
    let value: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["level"], "warn");
    assert_eq!(value["msg"], "secured");
    assert!(trap.errors.lock().unwrap().is_empty(), "{:?}", trap.errors);
}
