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

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use x509_parser::prelude::*;

use crate::cert_info::{CertInfo, KeyId};

/// One entry of a CRL's revoked-certificates list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RevokedEntry {
    /// Serial number of the revoked certificate, uppercase hex.
    pub serial: String,

    /// Instant at which the certificate was revoked.
    pub revocation_date: DateTime<Utc>,

    /// RFC 5280 reason code, if present.
    pub reason: Option<u8>,
}

/// Owned summary of one certificate revocation list.
///
/// A CRL is *usable* for a reference date only if its `nextUpdate` field is
/// present and after that date.
#[derive(Clone, Debug, Serialize)]
pub struct CrlInfo {
    /// Issuer principal name.
    pub issuer: String,

    /// Authority key identifier, if the extension is present.
    pub authority_key_id: Option<KeyId>,

    /// `thisUpdate` field.
    pub this_update: DateTime<Utc>,

    /// `nextUpdate` field, if present.
    pub next_update: Option<DateTime<Utc>>,

    /// Revoked entries, in list order.
    pub revoked: Vec<RevokedEntry>,

    /// Raw CRL DER. May be empty for synthetic CRLs used in tests;
    /// signature verification then reports failure.
    #[serde(skip)]
    pub der: Vec<u8>,
}

impl CrlInfo {
    /// Parses a DER-encoded CRL into a `CrlInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self, CrlParseError> {
        let (_rem, crl) =
            parse_x509_crl(der).map_err(|e| CrlParseError::InvalidDer(e.to_string()))?;

        let this_update = DateTime::<Utc>::from_timestamp(crl.last_update().timestamp(), 0)
            .ok_or(CrlParseError::InvalidDate)?;
        let next_update = match crl.next_update() {
            Some(t) => {
                Some(DateTime::<Utc>::from_timestamp(t.timestamp(), 0)
                    .ok_or(CrlParseError::InvalidDate)?)
            }
            None => None,
        };

        let mut authority_key_id = None;
        for ext in crl.extensions() {
            if let ParsedExtension::AuthorityKeyIdentifier(aki) = ext.parsed_extension() {
                authority_key_id = aki.key_identifier.as_ref().map(|ki| KeyId::new(ki.0));
            }
        }

        let mut revoked = Vec::new();
        for rc in crl.iter_revoked_certificates() {
            let revocation_date =
                DateTime::<Utc>::from_timestamp(rc.revocation_date.timestamp(), 0)
                    .ok_or(CrlParseError::InvalidDate)?;

            revoked.push(RevokedEntry {
                serial: hex::encode_upper(rc.raw_serial()),
                revocation_date,
                reason: rc.reason_code().map(|(_critical, code)| code.0),
            });
        }

        Ok(CrlInfo {
            issuer: crl.issuer().to_string(),
            authority_key_id,
            this_update,
            next_update,
            revoked,
            der: der.to_vec(),
        })
    }

    /// Returns `true` if this CRL may be used to judge revocation at `at`.
    pub fn is_usable_at(&self, at: DateTime<Utc>) -> bool {
        match self.next_update {
            Some(nu) => nu > at,
            None => false,
        }
    }

    /// Returns `true` if this CRL is fresher than `other` by `nextUpdate`.
    pub fn is_fresher_than(&self, other: &CrlInfo) -> bool {
        match (self.next_update, other.next_update) {
            (Some(a), Some(b)) => a > b,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Looks up a serial number in the revoked-entries list.
    pub fn find_revoked(&self, serial: &str) -> Option<&RevokedEntry> {
        self.revoked.iter().find(|e| e.serial == serial)
    }
}

/// Verifies a CRL's signature against its issuer's public key.
///
/// This is a seam so that validation logic can be exercised without real
/// cryptographic material; production code uses [`X509CrlVerifier`].
pub trait CrlVerifier: Send + Sync {
    /// Returns `true` if `crl` was signed by `issuer`.
    fn verify(&self, crl: &CrlInfo, issuer: &CertInfo) -> bool;
}

/// [`CrlVerifier`] backed by `x509-parser`'s signature verification.
#[derive(Debug, Default)]
pub struct X509CrlVerifier;

impl CrlVerifier for X509CrlVerifier {
    fn verify(&self, crl: &CrlInfo, issuer: &CertInfo) -> bool {
        if crl.der.is_empty() || issuer.der.is_empty() {
            return false;
        }

        let Ok((_rem, parsed_crl)) = parse_x509_crl(&crl.der) else {
            return false;
        };

        let Ok((_rem, issuer_cert)) = X509Certificate::from_der(&issuer.der) else {
            return false;
        };

        x509_parser::verify::verify_signature(
            issuer_cert.public_key(),
            &parsed_crl.signature_algorithm,
            &parsed_crl.signature_value,
            parsed_crl.tbs_cert_list.as_ref(),
        )
        .is_ok()
    }
}

/// Maps an RFC 5280 CRL reason code to a human-readable label.
pub fn reason_label(code: u8) -> &'static str {
    match code {
        0 => "unspecified",
        1 => "keyCompromise",
        2 => "cACompromise",
        3 => "affiliationChanged",
        4 => "superseded",
        5 => "cessationOfOperation",
        6 => "certificateHold",
        8 => "removeFromCRL",
        9 => "privilegeWithdrawn",
        10 => "aACompromise",
        _ => "unknown",
    }
}

/// Describes errors that can occur when parsing a CRL.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CrlParseError {
    /// The data is not a valid DER-encoded CRL.
    #[error("the CRL could not be parsed: {0}")]
    InvalidDer(String),

    /// A date in the CRL could not be represented.
    #[error("a CRL date is out of range")]
    InvalidDate,
}
