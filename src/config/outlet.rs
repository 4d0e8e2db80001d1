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

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use log::Level;
use serde::Deserialize;
use serde_json::Value;

use crate::ConfigError;
use crate::Layout;
use crate::Outlet;
use crate::append::Network;
use crate::append::StdoutOutlet;
use crate::append::SyslogOutletBuilder;
use crate::append::TcpOutletBuilder;
use crate::config::duration::parse_duration;
use crate::layout::layout_from_name;
use crate::tls::TlsContext;
use crate::tls::TrustStore;

#[derive(Debug, Deserialize)]
struct CommonFields {
    #[serde(default)]
    outlet: String,
    #[serde(default)]
    level: String,
    #[serde(default)]
    format: Value,
}

#[derive(Debug, Deserialize)]
struct TcpFields {
    #[serde(default)]
    net: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    retry_interval: String,
    tls: Option<TlsFields>,
}

#[derive(Debug, Deserialize)]
struct TlsFields {
    #[serde(default)]
    ca: String,
    #[serde(default)]
    cert: String,
    #[serde(default)]
    key: String,
}

#[derive(Debug, Deserialize)]
struct SyslogFields {
    #[serde(default)]
    retry_interval: String,
}

/// Parse one outlet entry into the built outlet and the minimum level it accepts.
pub(crate) fn parse_outlet(
    raw: &Value,
    trust_store: &dyn TrustStore,
) -> anyhow::Result<(Outlet, Level)> {
    let common = CommonFields::deserialize(raw).context("cannot decode outlet entry")?;
    if common.outlet.is_empty() || common.level.is_empty() || is_blank(&common.format) {
        return Err(ConfigError::MissingCommonFields.into());
    }

    let level = common
        .level
        .parse::<Level>()
        .with_context(|| format!("cannot parse 'level' field '{}'", common.level))?;
    let layout = parse_format(&common.format).context("cannot parse 'format' field")?;

    let outlet = match common.outlet.as_str() {
        "stdout" => parse_stdout_outlet(layout),
        "tcp" => parse_tcp_outlet(raw, layout, trust_store)?,
        "syslog" => parse_syslog_outlet(raw, layout)?,
        other => return Err(ConfigError::UnknownOutlet(other.to_string()).into()),
    };
    Ok((outlet, level))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn parse_format(raw: &Value) -> anyhow::Result<Box<dyn Layout>> {
    match raw {
        Value::String(name) => layout_from_name(name),
        other => Err(ConfigError::WrongFormatType(value_type(other).to_string()).into()),
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}

fn parse_stdout_outlet(layout: Box<dyn Layout>) -> Outlet {
    StdoutOutlet::default().with_layout(layout).into()
}

fn parse_tcp_outlet(
    raw: &Value,
    layout: Box<dyn Layout>,
    trust_store: &dyn TrustStore,
) -> anyhow::Result<Outlet> {
    let fields = TcpFields::deserialize(raw).context("cannot decode tcp outlet")?;

    let retry_interval =
        parse_duration(&fields.retry_interval).context("cannot parse 'retry_interval'")?;
    let network = fields
        .net
        .parse::<Network>()
        .context("cannot parse 'net' field")?;
    if fields.address.is_empty() {
        anyhow::bail!("must specify 'address' field");
    }

    let mut builder = TcpOutletBuilder::new(network, fields.address)
        .layout(layout)
        .retry_interval(retry_interval);
    if let Some(tls) = fields.tls {
        builder = builder.tls(parse_tls(&tls, trust_store).context("cannot parse 'tls' field")?);
    }
    Ok(builder.build()?.into())
}

fn parse_tls(fields: &TlsFields, trust_store: &dyn TrustStore) -> anyhow::Result<TlsContext> {
    if fields.cert.is_empty() || fields.key.is_empty() {
        anyhow::bail!("must specify 'cert' and 'key' field");
    }
    let ca = (!fields.ca.is_empty()).then(|| Path::new(&fields.ca));
    TlsContext::load(
        Path::new(&fields.cert),
        Path::new(&fields.key),
        ca,
        trust_store,
    )
}

fn parse_syslog_outlet(raw: &Value, layout: Box<dyn Layout>) -> anyhow::Result<Outlet> {
    let fields = SyslogFields::deserialize(raw).context("cannot decode syslog outlet")?;

    // local syslog is assumed to just work
    let retry_interval = if fields.retry_interval.is_empty() {
        Duration::ZERO
    } else {
        parse_duration(&fields.retry_interval).context("cannot parse 'retry_interval'")?
    };

    Ok(SyslogOutletBuilder::new()
        .layout(layout)
        .retry_interval(retry_interval)
        .build()
        .into())
}
