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

//! Client-authentication material for the TCP outlet.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rustls::ClientConfig;
use rustls::RootCertStore;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::PrivateKeyDer;

use crate::ConfigError;

/// A provider of the default set of trusted root certificates.
///
/// Used when a TLS block names no CA file.
pub trait TrustStore: fmt::Debug + Send + Sync {
    /// Load the trusted root certificates.
    fn load(&self) -> anyhow::Result<Vec<CertificateDer<'static>>>;
}

/// The platform's trust store, as exposed by `rustls-native-certs`.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct NativeTrustStore {}

impl TrustStore for NativeTrustStore {
    fn load(&self) -> anyhow::Result<Vec<CertificateDer<'static>>> {
        let result = rustls_native_certs::load_native_certs();
        if result.certs.is_empty() {
            let err = anyhow::anyhow!("no certificate found in the platform trust store");
            return Err(match result.errors.into_iter().next() {
                Some(source) => anyhow::Error::new(source).context(err),
                None => err,
            });
        }
        Ok(result.certs)
    }
}

/// A fixed set of trusted root certificates.
///
/// # Examples
///
/// ```
/// use logforth_outlets::tls::FixedTrustStore;
///
/// let store = FixedTrustStore::new(vec![]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixedTrustStore {
    certs: Vec<CertificateDer<'static>>,
}

impl FixedTrustStore {
    /// Create a trust store that always yields `certs`.
    pub fn new(certs: Vec<CertificateDer<'static>>) -> Self {
        Self { certs }
    }
}

impl TrustStore for FixedTrustStore {
    fn load(&self) -> anyhow::Result<Vec<CertificateDer<'static>>> {
        Ok(self.certs.clone())
    }
}

/// A client certificate and trusted root set, ready to secure a TCP connection.
///
/// Built once at configuration time and immutable thereafter.
#[derive(Clone)]
pub struct TlsContext {
    roots: Vec<CertificateDer<'static>>,
    config: Arc<ClientConfig>,
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

impl TlsContext {
    /// Load the client identity from `cert` and `key`, and the trusted roots from `ca`.
    ///
    /// When `ca` is `None`, the roots come from `trust_store`.
    ///
    /// # Errors
    ///
    /// Return an error if any file cannot be read or parsed, if the CA file contains no
    /// certificate, or if the trust store cannot be loaded.
    pub fn load(
        cert: &Path,
        key: &Path,
        ca: Option<&Path>,
        trust_store: &dyn TrustStore,
    ) -> anyhow::Result<TlsContext> {
        let (chain, key) = load_identity(cert, key).context("cannot load client cert")?;

        let candidates = match ca {
            Some(ca) => {
                let certs = read_certs(ca).context("cannot load CA cert")?;
                if certs.is_empty() {
                    return Err(ConfigError::NoCertificates(ca.to_path_buf()).into());
                }
                certs
            }
            None => trust_store.load().context("cannot open system cert pool")?,
        };

        let mut store = RootCertStore::empty();
        let mut roots = Vec::with_capacity(candidates.len());
        for cert in candidates {
            if store.add(cert.clone()).is_ok() {
                roots.push(cert);
            }
        }
        if roots.is_empty() {
            return Err(match ca {
                Some(ca) => ConfigError::NoCertificates(ca.to_path_buf()).into(),
                None => anyhow::anyhow!("cannot load root ca pool: no usable certificate"),
            });
        }

        let config = ClientConfig::builder()
            .with_root_certificates(store)
            .with_client_auth_cert(chain, key)
            .context("cannot load client cert")?;

        Ok(TlsContext {
            roots,
            config: Arc::new(config),
        })
    }

    /// The trusted root certificates, in load order.
    pub fn roots(&self) -> &[CertificateDer<'static>] {
        &self.roots
    }

    pub(crate) fn client_config(&self) -> Arc<ClientConfig> {
        self.config.clone()
    }
}

fn load_identity(
    cert: &Path,
    key: &Path,
) -> anyhow::Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let chain = read_certs(cert)?;
    if chain.is_empty() {
        anyhow::bail!("no certificate found in {}", cert.display());
    }

    let file = File::open(key).with_context(|| format!("cannot open {}", key.display()))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(file))
        .with_context(|| format!("cannot read {}", key.display()))?
        .with_context(|| format!("no private key found in {}", key.display()))?;

    Ok((chain, key))
}

fn read_certs(path: &Path) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("cannot read {}", path.display()))
}
