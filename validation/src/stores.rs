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

//! Store contracts for accredited CAs and CRLs, plus in-memory
//! implementations.
//!
//! Stores are shared between concurrently running pipeline instances.
//! Inserts are commutative upserts: last-writer-by-freshness for CRLs,
//! idempotent insert for CA entries, so races between two validations never
//! corrupt state or fail the caller. Store failures are best-effort by
//! contract; callers log them and continue.

use std::{
    collections::HashMap,
    sync::RwLock,
};

use thiserror::Error;

use crate::{
    cert_info::{CertInfo, KeyId},
    crl_info::CrlInfo,
};

/// Key of a CA or CRL store entry: a principal name plus an optional key
/// identifier.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PrincipalKey {
    /// Principal name (issuer or subject, RFC 2253).
    pub principal: String,

    /// Key identifier qualifying the principal, if known.
    pub key_id: Option<KeyId>,
}

impl PrincipalKey {
    /// Returns a new key.
    pub fn new(principal: impl Into<String>, key_id: Option<KeyId>) -> Self {
        Self {
            principal: principal.into(),
            key_id,
        }
    }
}

/// Persisted lookup of accredited CA certificates.
///
/// `insert` is best-effort: a failure to persist must be logged by the
/// caller, never propagated as a validation failure.
pub trait CaStore: Send + Sync {
    /// Looks up a CA certificate by subject principal and, when known, the
    /// authority key identifier being sought.
    fn lookup(&self, principal: &str, key_id: Option<&KeyId>) -> Option<CertInfo>;

    /// Inserts a CA certificate. Idempotent.
    fn insert(&self, cert: CertInfo) -> Result<(), StoreError>;
}

/// Persisted lookup of the most recent CRL per issuer.
pub trait CrlStore: Send + Sync {
    /// Looks up the freshest known CRL for an issuer principal and, when
    /// known, its authority key identifier.
    fn lookup(&self, principal: &str, key_id: Option<&KeyId>) -> Option<CrlInfo>;

    /// Records a CRL, keeping the freshest by `nextUpdate`.
    fn upsert(&self, crl: CrlInfo) -> Result<(), StoreError>;
}

/// Returns `true` if a stored key identifier is compatible with a requested
/// one. An entry without a key identifier cannot disprove a match.
fn key_id_matches(wanted: Option<&KeyId>, have: Option<&KeyId>) -> bool {
    match (wanted, have) {
        (Some(w), Some(h)) => w == h,
        _ => true,
    }
}

/// In-memory [`CaStore`], keyed by subject principal.
#[derive(Debug, Default)]
pub struct InMemoryCaStore {
    entries: RwLock<HashMap<String, Vec<CertInfo>>>,
}

impl InMemoryCaStore {
    /// Returns a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaStore for InMemoryCaStore {
    fn lookup(&self, principal: &str, key_id: Option<&KeyId>) -> Option<CertInfo> {
        let entries = self.entries.read().ok()?;
        let candidates = entries.get(principal)?;

        if let Some(wanted) = key_id {
            // Prefer an exact subject-key-id match over an entry that omits
            // the extension.
            if let Some(exact) = candidates
                .iter()
                .find(|c| c.subject_key_id.as_ref() == Some(wanted))
            {
                return Some(exact.clone());
            }
        }

        candidates
            .iter()
            .find(|c| key_id_matches(key_id, c.subject_key_id.as_ref()))
            .cloned()
    }

    fn insert(&self, cert: CertInfo) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let candidates = entries.entry(cert.subject.clone()).or_default();

        if !candidates.iter().any(|c| c.serial == cert.serial) {
            candidates.push(cert);
        }

        Ok(())
    }
}

/// In-memory [`CrlStore`], keeping one CRL per (issuer, key id).
#[derive(Debug, Default)]
pub struct InMemoryCrlStore {
    entries: RwLock<HashMap<PrincipalKey, CrlInfo>>,
}

impl InMemoryCrlStore {
    /// Returns a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CrlStore for InMemoryCrlStore {
    fn lookup(&self, principal: &str, key_id: Option<&KeyId>) -> Option<CrlInfo> {
        let entries = self.entries.read().ok()?;

        entries
            .iter()
            .filter(|(k, _)| {
                k.principal == principal && key_id_matches(key_id, k.key_id.as_ref())
            })
            .map(|(_, crl)| crl)
            .max_by_key(|crl| crl.next_update)
            .cloned()
    }

    fn upsert(&self, crl: CrlInfo) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let key = PrincipalKey::new(crl.issuer.clone(), crl.authority_key_id.clone());

        match entries.get(&key) {
            Some(existing) if !crl.is_fresher_than(existing) => (),
            _ => {
                entries.insert(key, crl);
            }
        }

        Ok(())
    }
}

/// Describes errors reported by a CA or CRL store.
///
/// Store failures never become validation failures; callers log them and
/// proceed.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum StoreError {
    /// The store's backing medium failed.
    #[error("store I/O failure: {0}")]
    Io(String),

    /// The store's lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}
