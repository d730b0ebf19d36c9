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

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use x509_parser::{extensions::DistributionPointName, prelude::*};

/// A key identifier (subject or authority) from an X.509 extension.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KeyId(Vec<u8>);

impl KeyId {
    /// Wraps raw key-identifier bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw key-identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl Serialize for KeyId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

/// Key-usage bits relevant to signature validation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct KeyUsageInfo {
    /// `digitalSignature` bit.
    pub digital_signature: bool,

    /// `nonRepudiation` (`contentCommitment`) bit. Legal-value signatures
    /// require this bit to be set.
    pub non_repudiation: bool,

    /// `keyCertSign` bit.
    pub key_cert_sign: bool,
}

/// Position of an instant relative to a certificate's validity window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeValidity {
    /// Inside the validity window.
    Valid,

    /// After `notAfter`.
    Expired,

    /// Before `notBefore`.
    NotYetValid,
}

/// Owned summary of one X.509 certificate.
///
/// Produced once from DER by the extraction layer (or by
/// [`CertInfo::from_der`]) and consumed read-only by every checker. Principal
/// names are RFC 2253 strings; the serial number is uppercase hex exactly as
/// encoded in the certificate.
#[derive(Clone, Debug, Serialize)]
pub struct CertInfo {
    /// Subject principal name.
    pub subject: String,

    /// Issuer principal name.
    pub issuer: String,

    /// Serial number, uppercase hex.
    pub serial: String,

    /// Subject key identifier, if the extension is present.
    pub subject_key_id: Option<KeyId>,

    /// Authority key identifier, if the extension is present.
    pub authority_key_id: Option<KeyId>,

    /// Start of the validity window.
    pub not_before: DateTime<Utc>,

    /// End of the validity window.
    pub not_after: DateTime<Utc>,

    /// Key-usage bits, or `None` if the extension is absent.
    pub key_usage: Option<KeyUsageInfo>,

    /// CRL distribution point URLs, in certificate order.
    pub crl_distribution_points: Vec<String>,

    /// Raw certificate DER. May be empty for synthetic certificates used in
    /// tests; cryptographic operations then report failure instead of
    /// panicking.
    #[serde(skip)]
    pub der: Vec<u8>,
}

impl CertInfo {
    /// Parses a DER-encoded X.509 certificate into a `CertInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateParseError> {
        let (_rem, cert) = X509Certificate::from_der(der)
            .map_err(|e| CertificateParseError::InvalidDer(e.to_string()))?;

        let not_before = DateTime::<Utc>::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or(CertificateParseError::InvalidValidity)?;
        let not_after = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or(CertificateParseError::InvalidValidity)?;

        let mut subject_key_id = None;
        let mut authority_key_id = None;
        let mut key_usage = None;
        let mut crl_distribution_points = Vec::new();

        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(ki) => {
                    subject_key_id = Some(KeyId::new(ki.0));
                }
                ParsedExtension::AuthorityKeyIdentifier(aki) => {
                    authority_key_id = aki.key_identifier.as_ref().map(|ki| KeyId::new(ki.0));
                }
                ParsedExtension::KeyUsage(ku) => {
                    key_usage = Some(KeyUsageInfo {
                        digital_signature: ku.digital_signature(),
                        non_repudiation: ku.non_repudiation(),
                        key_cert_sign: ku.key_cert_sign(),
                    });
                }
                ParsedExtension::CRLDistributionPoints(points) => {
                    for point in points.iter() {
                        if let Some(DistributionPointName::FullName(names)) =
                            &point.distribution_point
                        {
                            for name in names {
                                if let GeneralName::URI(uri) = name {
                                    crl_distribution_points.push((*uri).to_string());
                                }
                            }
                        }
                    }
                }
                _ => (),
            }
        }

        Ok(CertInfo {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: hex::encode_upper(cert.raw_serial()),
            subject_key_id,
            authority_key_id,
            not_before,
            not_after,
            key_usage,
            crl_distribution_points,
            der: der.to_vec(),
        })
    }

    /// Returns `true` if the certificate's issuer principal equals its own
    /// subject principal.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    /// Locates `at` relative to the certificate's validity window.
    pub fn validity_at(&self, at: DateTime<Utc>) -> TimeValidity {
        if at < self.not_before {
            TimeValidity::NotYetValid
        } else if at > self.not_after {
            TimeValidity::Expired
        } else {
            TimeValidity::Valid
        }
    }
}

/// Describes errors that can occur when parsing a certificate.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateParseError {
    /// The data is not a valid DER-encoded X.509 certificate.
    #[error("the certificate could not be parsed: {0}")]
    InvalidDer(String),

    /// The validity dates could not be represented.
    #[error("the certificate validity dates are out of range")]
    InvalidValidity,
}
