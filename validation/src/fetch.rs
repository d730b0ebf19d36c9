// Copyright 2024 The firma-rs contributors. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Network collaborators: CRL download and trust-list retrieval.
//!
//! Every fetch is bounded by caller-configurable timeouts and attempted at
//! most once per validation call. A timed-out or failed fetch is treated as
//! "source unavailable"; the revocation cascade proceeds to its next
//! fallback instead of aborting the validation.

use std::{collections::HashMap, io::Read, time::Duration};

use log::{debug, warn};
use thiserror::Error;
use url::Url;

use crate::{cert_info::CertInfo, crl_info::CrlInfo, stores::PrincipalKey};

/// Largest response body accepted from a CRL or trust-list endpoint.
const MAX_RESPONSE_BYTES: u64 = 10_000_000;

/// Connect/read timeouts for the network collaborators.
///
/// HTTP and LDAP sources are configured independently.
#[derive(Clone, Copy, Debug)]
pub struct FetchTimeouts {
    /// HTTP connect timeout.
    pub http_connect: Duration,

    /// HTTP read timeout.
    pub http_read: Duration,

    /// LDAP operation timeout.
    pub ldap: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            http_connect: Duration::from_secs(10),
            http_read: Duration::from_secs(30),
            ldap: Duration::from_secs(15),
        }
    }
}

/// Fetches a CRL from a list of distribution-point URLs.
///
/// Implementations try each URL according to its scheme and return the
/// freshest successfully parsed CRL, or `None` when every source is
/// unavailable.
pub trait CrlFetcher: Send + Sync {
    /// Fetch the freshest CRL reachable through `urls`.
    fn fetch(&self, urls: &[String], timeouts: &FetchTimeouts) -> Option<CrlInfo>;
}

/// [`CrlFetcher`] for `http`/`https` distribution points.
///
/// `ldap` URLs are recognized but reported as unavailable; deployments that
/// need LDAP distribution points plug in their own [`CrlFetcher`].
#[derive(Debug, Default)]
pub struct HttpCrlFetcher;

impl CrlFetcher for HttpCrlFetcher {
    fn fetch(&self, urls: &[String], timeouts: &FetchTimeouts) -> Option<CrlInfo> {
        let mut best: Option<CrlInfo> = None;

        for raw_url in urls {
            let Ok(url) = Url::parse(raw_url) else {
                debug!("skipping unparsable CRL distribution point {raw_url}");
                continue;
            };

            let body = match url.scheme() {
                "http" | "https" => fetch_http(url.as_str(), timeouts),
                "ldap" | "ldaps" => {
                    debug!("LDAP CRL distribution point {raw_url} not supported by HttpCrlFetcher");
                    None
                }
                other => {
                    debug!("unsupported CRL distribution point scheme {other}");
                    None
                }
            };

            let Some(body) = body else {
                continue;
            };

            match CrlInfo::from_der(&body) {
                Ok(crl) => {
                    let fresher = match &best {
                        Some(current) => crl.is_fresher_than(current),
                        None => true,
                    };
                    if fresher {
                        best = Some(crl);
                    }
                }
                Err(e) => {
                    debug!("CRL from {raw_url} could not be parsed: {e}");
                }
            }
        }

        best
    }
}

fn fetch_http(url: &str, timeouts: &FetchTimeouts) -> Option<Vec<u8>> {
    let agent = ureq::builder()
        .timeout_connect(timeouts.http_connect)
        .timeout_read(timeouts.http_read)
        .build();

    let response = match agent.get(url).call() {
        Ok(r) => r,
        Err(e) => {
            debug!("CRL download from {url} failed: {e}");
            return None;
        }
    };

    let mut body: Vec<u8> = Vec::with_capacity(body_capacity(response.header("Content-Length")));

    if let Err(e) = response
        .into_reader()
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut body)
    {
        debug!("CRL download from {url} failed while reading: {e}");
        return None;
    }

    Some(body)
}

/// Capacity hint from a declared `Content-Length`, clamped so a hostile
/// endpoint cannot force a large allocation before the read cap applies.
pub(crate) fn body_capacity(content_length: Option<&str>) -> usize {
    content_length
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10000)
        .min(MAX_RESPONSE_BYTES as usize)
}

/// [`CrlFetcher`] that reports every source as unavailable.
///
/// Useful for strictly offline validation: the revocation cascade then
/// relies on cached, embedded, and caller-supplied CRLs only.
#[derive(Debug, Default)]
pub struct NullCrlFetcher;

impl CrlFetcher for NullCrlFetcher {
    fn fetch(&self, _urls: &[String], _timeouts: &FetchTimeouts) -> Option<CrlInfo> {
        None
    }
}

/// Retrieves the externally published list of accredited (qualified) CAs.
///
/// Used only as the online fallback of the trust-chain walker when a CA is
/// not already present in the local store.
pub trait QualifiedCaSource: Send + Sync {
    /// Fetch the accredited-CA list, keyed by subject principal and key id.
    fn fetch_qualified_cas(&self) -> Result<HashMap<PrincipalKey, CertInfo>, TrustListError>;
}

/// [`QualifiedCaSource`] that downloads a PEM bundle of CA certificates over
/// HTTP(S).
#[derive(Debug)]
pub struct HttpTrustListSource {
    url: String,
    timeouts: FetchTimeouts,
}

impl HttpTrustListSource {
    /// Returns a source reading the PEM bundle at `url`.
    pub fn new(url: impl Into<String>, timeouts: FetchTimeouts) -> Self {
        Self {
            url: url.into(),
            timeouts,
        }
    }
}

impl QualifiedCaSource for HttpTrustListSource {
    fn fetch_qualified_cas(&self) -> Result<HashMap<PrincipalKey, CertInfo>, TrustListError> {
        let body = fetch_http(&self.url, &self.timeouts)
            .ok_or_else(|| TrustListError::Transport(self.url.clone()))?;

        let mut cas = HashMap::new();

        for maybe_pem in x509_parser::pem::Pem::iter_from_buffer(&body) {
            let pem = maybe_pem.map_err(|e| TrustListError::Parse(e.to_string()))?;

            match CertInfo::from_der(&pem.contents) {
                Ok(cert) => {
                    let key =
                        PrincipalKey::new(cert.subject.clone(), cert.subject_key_id.clone());
                    cas.insert(key, cert);
                }
                Err(e) => {
                    // One bad entry does not poison the rest of the list.
                    warn!("skipping unparsable trust list entry: {e}");
                }
            }
        }

        Ok(cas)
    }
}

/// Describes errors reported by a [`QualifiedCaSource`].
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TrustListError {
    /// The trust list endpoint could not be reached.
    #[error("trust list endpoint unavailable: {0}")]
    Transport(String),

    /// The trust list payload could not be parsed.
    #[error("trust list could not be parsed: {0}")]
    Parse(String),
}
