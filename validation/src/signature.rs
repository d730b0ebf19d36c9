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
use sha2::{Digest, Sha256};

use crate::{cert_info::CertInfo, crl_info::CrlInfo};

/// Provenance of a signature's resolved reference date.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ReferenceDateKind {
    /// Caller-supplied external reference time (used for closing archival
    /// batches).
    ExternalReferenceTime,

    /// Generation time of a validated timestamp token (embedded, detached,
    /// or batch-wide), per regulation.
    TimestampPerRegulation,

    /// Caller-declared reference date, used verbatim.
    Declared,

    /// The signature's own claimed signing time, opted into by the caller.
    ClaimedSigningTime,

    /// The date supplied to the pipeline invocation (lowest priority).
    ValidationDate,
}

/// One signature extracted from an envelope, consumed read-only by the
/// checkers except for its reference date, which the resolver sets in place
/// before any other checker runs.
#[derive(Clone, Debug)]
pub struct Signature {
    /// The signer's certificate.
    pub cert: CertInfo,

    /// Signing time claimed by the signer, if any. Not trusted unless the
    /// caller opts in.
    pub claimed_signing_time: Option<DateTime<Utc>>,

    /// CRLs embedded in the envelope alongside this signature.
    pub embedded_crls: Vec<CrlInfo>,

    /// Validated timestamp token embedded in the envelope, if any.
    pub timestamp: Option<TimeStampToken>,

    /// Nested countersignatures, in envelope order.
    pub countersignatures: Vec<Signature>,

    reference_date: Option<DateTime<Utc>>,
    reference_date_kind: Option<ReferenceDateKind>,
}

impl Signature {
    /// Returns a new signature for the given signer certificate.
    pub fn new(cert: CertInfo) -> Self {
        Self {
            cert,
            claimed_signing_time: None,
            embedded_crls: Vec::new(),
            timestamp: None,
            countersignatures: Vec::new(),
            reference_date: None,
            reference_date_kind: None,
        }
    }

    /// Returns the resolved reference date, if the resolver has run.
    pub fn reference_date(&self) -> Option<DateTime<Utc>> {
        self.reference_date
    }

    /// Returns the provenance tag of the resolved reference date.
    pub fn reference_date_kind(&self) -> Option<ReferenceDateKind> {
        self.reference_date_kind
    }

    /// Sets the reference date and its provenance tag.
    ///
    /// Called by the reference date resolver before any downstream checker
    /// runs.
    pub fn set_reference_date(&mut self, date: DateTime<Utc>, kind: ReferenceDateKind) {
        self.reference_date = Some(date);
        self.reference_date_kind = Some(kind);
    }

    /// Returns the stable identity of this signature at the given position
    /// in the signature forest.
    ///
    /// The identity is a hash of the signer certificate and the position
    /// path, so two structurally identical countersignatures at different
    /// positions get distinct identities.
    pub fn id_at(&self, path: &[usize]) -> SignatureId {
        SignatureId::digest(&self.cert, path)
    }
}

/// One RFC3161-style timestamp token, as produced by the extraction layer.
#[derive(Clone, Debug)]
pub struct TimeStampToken {
    /// Generation time declared by the token. This is the token's own
    /// reference date.
    pub gen_time: DateTime<Utc>,

    /// Serial number of the TSA's signing certificate, as declared by the
    /// token's signer id (uppercase hex).
    pub signer_serial: String,

    /// Certificate set embedded in the token.
    pub certs: Vec<CertInfo>,

    /// CRLs embedded in the token.
    pub embedded_crls: Vec<CrlInfo>,

    /// Timestamp extensions (re-timestamping for long-term validity),
    /// validated recursively with the same rules.
    pub extensions: Vec<TimeStampToken>,
}

impl TimeStampToken {
    /// Returns a new token with the given generation time and signer serial.
    pub fn new(gen_time: DateTime<Utc>, signer_serial: impl Into<String>) -> Self {
        Self {
            gen_time,
            signer_serial: signer_serial.into(),
            certs: Vec::new(),
            embedded_crls: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Identifies the TSA signing certificate among the token's embedded
    /// certificate set by serial number.
    pub fn signer_certificate(&self) -> Option<&CertInfo> {
        self.certs.iter().find(|c| c.serial == self.signer_serial)
    }

    /// Returns the stable identity of this token at the given position.
    pub fn id_at(&self, path: &[usize]) -> SignatureId {
        match self.signer_certificate() {
            Some(cert) => SignatureId::digest(cert, path),
            None => {
                let mut hasher = Sha256::new();
                hasher.update(self.signer_serial.as_bytes());
                hasher.update(self.gen_time.timestamp().to_le_bytes());
                for p in path {
                    hasher.update(p.to_le_bytes());
                }
                SignatureId(hex::encode(&hasher.finalize()[..16]))
            }
        }
    }
}

/// Stable identity of a signature or timestamp token within one validation
/// run, used as the key of per-checker result maps.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SignatureId(String);

impl SignatureId {
    fn digest(cert: &CertInfo, path: &[usize]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&cert.der);
        hasher.update(cert.subject.as_bytes());
        hasher.update(cert.serial.as_bytes());
        for p in path {
            hasher.update(p.to_le_bytes());
        }
        SignatureId(hex::encode(&hasher.finalize()[..16]))
    }

    /// Returns the identity as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
