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

//! Trust-chain reliability checking.
//!
//! A signing certificate is reliable when its issuer chain resolves, hop by
//! hop, to a self-signed root through the accredited CA store. An expired
//! accredited CA only degrades the finding to a warning: accreditation
//! outlives the certificate's own validity window. A CA absent from the
//! store makes the whole chain unreliable.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use firma_status_tracker::{log_item, Outcome, ValidationResult};
use log::warn;
use serde::Serialize;

use crate::{
    cert_info::{CertInfo, TimeValidity},
    crl_info::CrlInfo,
    pipeline::{Pipeline, StepReport},
    revocation::{judge_revocation, obtain_crl, ObtainedCrl},
    signature::{Signature, SignatureId},
};

/// Upper bound on issuer hops before a chain is declared unresolvable.
const MAX_CHAIN_DEPTH: usize = 32;

/// One hop of a resolved trust chain.
///
/// `issuer` is the principal the hop asked the accredited store for; `ca`
/// is the certificate the store answered with, or `None` when the issuer
/// is not accredited.
#[derive(Clone, Debug, Serialize)]
pub struct TrustChainLink {
    /// Issuer principal sought at this hop.
    pub issuer: String,

    /// The accredited CA certificate resolved for this hop, if any.
    pub ca: Option<CertInfo>,

    /// The CRL consulted to judge this hop's CA certificate, when one was
    /// usable. Self-signed roots and unresolved hops carry `None`.
    pub crl: Option<CrlInfo>,
}

/// Pulls the qualified-CA list from the configured online source into the
/// accredited store. Failures are logged and otherwise ignored: the store
/// contents from earlier runs remain usable.
pub(crate) fn refresh_accredited_cas(pipeline: &Pipeline) {
    if !pipeline.options.online_ca_lookup {
        return;
    }

    let Some(source) = &pipeline.trust_list else {
        return;
    };

    match source.fetch_qualified_cas() {
        Ok(cas) => {
            for (_, cert) in cas {
                if let Err(e) = pipeline.ca_store.insert(cert) {
                    warn!("accredited CA store insert failed: {e}");
                }
            }
        }
        Err(e) => warn!("qualified CA list refresh failed: {e}"),
    }
}

/// Walks the issuer chain of `cert` through the accredited store.
///
/// Returns the resolved hops. Unaccredited issuers, cycles, and chains
/// deeper than [`MAX_CHAIN_DEPTH`] fail the result with
/// [`Outcome::Negative`]. Every resolved non-root hop gets a revocation
/// check, whether or not the chain ultimately reached a root.
pub(crate) fn walk_chain(
    pipeline: &Pipeline,
    cert: &CertInfo,
    embedded_crls: &[CrlInfo],
    reference_date: DateTime<Utc>,
    result: &mut ValidationResult,
) -> Vec<TrustChainLink> {
    let mut links = resolve_chain(pipeline, cert, reference_date, result);
    check_chain_revocation(pipeline, &mut links, embedded_crls, reference_date, result);
    links
}

fn resolve_chain(
    pipeline: &Pipeline,
    cert: &CertInfo,
    reference_date: DateTime<Utc>,
    result: &mut ValidationResult,
) -> Vec<TrustChainLink> {
    let mut links = Vec::new();
    let mut visited: HashSet<(String, String)> = HashSet::new();
    let mut current = cert.clone();

    for _ in 0..MAX_CHAIN_DEPTH {
        let ca = pipeline
            .ca_store
            .lookup(&current.issuer, current.authority_key_id.as_ref());

        let Some(ca) = ca else {
            log_item!(
                current.subject.clone(),
                format!("issuer \"{}\" is not an accredited CA", current.issuer),
                "check_reliability"
            )
            .failure(result, Outcome::Negative);
            result.set_outcome(Outcome::Negative);

            links.push(TrustChainLink {
                issuer: current.issuer.clone(),
                ca: None,
                crl: None,
            });
            return links;
        };

        match ca.validity_at(reference_date) {
            TimeValidity::Expired => {
                log_item!(
                    ca.subject.clone(),
                    "accredited CA certificate expired at the reference date",
                    "check_reliability"
                )
                .warning(result);
            }
            TimeValidity::NotYetValid => {
                log_item!(
                    ca.subject.clone(),
                    "accredited CA certificate not yet valid at the reference date",
                    "check_reliability"
                )
                .warning(result);
            }
            TimeValidity::Valid => (),
        }

        if !visited.insert((ca.subject.clone(), ca.serial.clone())) {
            log_item!(
                ca.subject.clone(),
                "trust chain contains a cycle",
                "check_reliability"
            )
            .failure(result, Outcome::Negative);
            result.set_outcome(Outcome::Negative);
            return links;
        }

        let root = ca.is_self_signed();

        links.push(TrustChainLink {
            issuer: current.issuer.clone(),
            ca: Some(ca.clone()),
            crl: None,
        });

        if root {
            log_item!(
                ca.subject.clone(),
                format!("trust chain anchored at self-signed root \"{}\"", ca.subject),
                "check_reliability"
            )
            .success(result);
            return links;
        }

        current = ca;
    }

    log_item!(
        cert.subject.clone(),
        format!("trust chain exceeds maximum depth of {MAX_CHAIN_DEPTH}"),
        "check_reliability"
    )
    .failure(result, Outcome::Negative);
    result.set_outcome(Outcome::Negative);
    links
}

/// Revocation check for every resolved non-root CA hop, resolved chain or
/// not. A revoked CA fails the result; an unobtainable or unusable CRL for
/// a hop only warns, so an offline CA endpoint cannot by itself break an
/// otherwise anchored chain. The CRL actually consulted is recorded on the
/// hop's link.
fn check_chain_revocation(
    pipeline: &Pipeline,
    links: &mut [TrustChainLink],
    embedded_crls: &[CrlInfo],
    reference_date: DateTime<Utc>,
    result: &mut ValidationResult,
) {
    for i in 0..links.len() {
        let Some(ca) = links[i].ca.clone() else {
            continue;
        };

        if ca.is_self_signed() {
            continue;
        }

        let issuer = links.get(i + 1).and_then(|next| next.ca.clone());

        let obtained = obtain_crl(
            pipeline,
            &ca,
            issuer.as_ref(),
            embedded_crls,
            pipeline.options.supplied_crl.as_ref(),
            reference_date,
        );

        match obtained {
            ObtainedCrl::Usable(crl) => {
                judge_revocation(&ca, &crl, Some(reference_date), result);
                links[i].crl = Some(crl);
            }
            _ => {
                log_item!(
                    ca.subject.clone(),
                    "revocation status of CA certificate could not be verified",
                    "check_reliability"
                )
                .warning(result);
            }
        }
    }
}

/// Checks trust-chain reliability for every signature in the list.
pub(crate) fn check(
    pipeline: &Pipeline,
    signatures: &[Signature],
    now: DateTime<Utc>,
) -> (bool, StepReport, BTreeMap<SignatureId, Vec<TrustChainLink>>) {
    refresh_accredited_cas(pipeline);

    let mut out = StepReport::new();
    let mut chains = BTreeMap::new();
    let mut all_valid = true;
    let mut path = Vec::new();

    for (i, signature) in signatures.iter().enumerate() {
        path.push(i);
        all_valid &= check_one(pipeline, signature, now, &mut path, &mut out, &mut chains);
        path.pop();
    }

    (all_valid, out, chains)
}

fn check_one(
    pipeline: &Pipeline,
    signature: &Signature,
    now: DateTime<Utc>,
    path: &mut Vec<usize>,
    out: &mut StepReport,
    chains: &mut BTreeMap<SignatureId, Vec<TrustChainLink>>,
) -> bool {
    let id = signature.id_at(path);
    let mut result = ValidationResult::new();

    let reference_date = signature.reference_date().unwrap_or(now);
    let links = walk_chain(
        pipeline,
        &signature.cert,
        &signature.embedded_crls,
        reference_date,
        &mut result,
    );

    let mut valid = result.is_valid();
    chains.insert(id.clone(), links);
    out.insert(id, result);

    if pipeline.options.check_countersignatures {
        for (i, countersignature) in signature.countersignatures.iter().enumerate() {
            path.push(i);
            valid &= check_one(pipeline, countersignature, now, path, out, chains);
            path.pop();
        }
    }

    valid
}
