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

//! Certificate revocation checking and the CRL fallback cascade.
//!
//! A CRL is *usable* for a reference date only if its `nextUpdate` is after
//! that date. The cascade tries, in order: the CRL store, the certificate's
//! distribution points, envelope-embedded CRLs (only when the issuer
//! certificate has expired), and finally a caller-supplied CRL. Each source
//! is attempted at most once; the first usable CRL wins. Every branch
//! produces a result instead of an error, so an unreachable CRL endpoint
//! never aborts validation.

use chrono::{DateTime, Utc};
use firma_status_tracker::{log_item, Outcome, ValidationResult};
use log::warn;

use crate::{
    cert_info::{CertInfo, TimeValidity},
    crl_info::{reason_label, CrlInfo},
    pipeline::{Pipeline, StepReport, STEP_EXPIRATION},
    signature::Signature,
};

/// Certificates whose issuer expired before this date get the more lenient
/// `CertificateExpiredBeforeCrlEra` outcome when no CRL can be obtained:
/// CRLs were not consistently published before 3 December 2009.
const CRL_ERA_CUTOFF_UNIX: i64 = 1_259_798_400;

pub(crate) fn crl_era_cutoff() -> DateTime<Utc> {
    DateTime::from_timestamp(CRL_ERA_CUTOFF_UNIX, 0).unwrap_or_default()
}

/// What the CRL fallback cascade produced.
pub(crate) enum ObtainedCrl {
    /// A CRL usable at the reference date.
    Usable(CrlInfo),

    /// Embedded CRLs were consulted but none verified against the issuer
    /// and was fresh.
    EmbeddedMismatch,

    /// The caller-supplied CRL failed verification against the issuer key.
    SuppliedInvalid,

    /// The caller-supplied CRL verified but its `nextUpdate` is not after
    /// the reference date.
    SuppliedStale(CrlInfo),

    /// No source produced a CRL.
    Unobtainable {
        /// `true` when the issuer certificate expired before the CRL era
        /// cutoff, which downgrades the finding to a warning.
        pre_crl_era: bool,
    },
}

/// Runs the CRL fallback cascade for one certificate.
///
/// `issuer` is the issuing CA's certificate when it could be resolved. The
/// cached and distribution-point branches do not need it, embedded CRLs are
/// skipped without it, and a caller-supplied CRL that cannot be verified
/// against an issuer is reported invalid.
pub(crate) fn obtain_crl(
    pipeline: &Pipeline,
    cert: &CertInfo,
    issuer: Option<&CertInfo>,
    embedded: &[CrlInfo],
    supplied: Option<&CrlInfo>,
    reference_date: DateTime<Utc>,
) -> ObtainedCrl {
    // 1. Cached/historical CRL.
    if let Some(cached) = pipeline
        .crl_store
        .lookup(&cert.issuer, cert.authority_key_id.as_ref())
    {
        if cached.is_usable_at(reference_date) {
            return ObtainedCrl::Usable(cached);
        }
    }

    // 2. Distribution-point download. The fetcher already keeps the
    // freshest CRL across URLs. A fetched-but-stale CRL is still recorded:
    // it is historically useful.
    if !cert.crl_distribution_points.is_empty() {
        if let Some(crl) = pipeline
            .crl_fetcher
            .fetch(&cert.crl_distribution_points, &pipeline.options.timeouts)
        {
            upsert_best_effort(pipeline, &crl);
            if crl.is_usable_at(reference_date) {
                return ObtainedCrl::Usable(crl);
            }
        }
    }

    // 3. Envelope-embedded CRLs, only once the issuer itself has expired
    // and stopped publishing.
    let issuer_expired = issuer
        .map(|i| i.validity_at(reference_date) == TimeValidity::Expired)
        .unwrap_or(false);

    let mut embedded_mismatch = false;
    if issuer_expired && !embedded.is_empty() {
        let mut best: Option<&CrlInfo> = None;

        for crl in embedded {
            let verified = issuer
                .map(|i| pipeline.crl_verifier.verify(crl, i))
                .unwrap_or(false);

            if verified && crl.is_usable_at(reference_date) {
                let fresher = best.map(|b| crl.is_fresher_than(b)).unwrap_or(true);
                if fresher {
                    best = Some(crl);
                }
            }
        }

        match best {
            Some(crl) => {
                upsert_best_effort(pipeline, crl);
                return ObtainedCrl::Usable(crl.clone());
            }
            None => embedded_mismatch = true,
        }
    }

    // 4. Caller-supplied CRL, same verification and freshness rules.
    if let Some(crl) = supplied {
        let verified = issuer
            .map(|i| pipeline.crl_verifier.verify(crl, i))
            .unwrap_or(false);

        if !verified {
            return ObtainedCrl::SuppliedInvalid;
        }

        upsert_best_effort(pipeline, crl);

        if crl.is_usable_at(reference_date) {
            return ObtainedCrl::Usable(crl.clone());
        }

        return ObtainedCrl::SuppliedStale(crl.clone());
    }

    if embedded_mismatch {
        return ObtainedCrl::EmbeddedMismatch;
    }

    // 5. Nothing worked. Before the CRL-era cutoff, unobtainability alone
    // is not suspicious.
    let cutoff_reference = issuer.unwrap_or(cert);
    ObtainedCrl::Unobtainable {
        pre_crl_era: cutoff_reference.not_after < crl_era_cutoff(),
    }
}

fn upsert_best_effort(pipeline: &Pipeline, crl: &CrlInfo) {
    if let Err(e) = pipeline.crl_store.upsert(crl.clone()) {
        warn!("CRL store upsert failed for issuer {}: {e}", crl.issuer);
    }
}

/// Judges one certificate against a usable CRL.
///
/// A serial listed with a revocation date before the reference date (or an
/// unknown reference date) is a definite revocation; a revocation dated
/// after the reference date leaves the certificate valid at that instant.
pub(crate) fn judge_revocation(
    cert: &CertInfo,
    crl: &CrlInfo,
    reference_date: Option<DateTime<Utc>>,
    result: &mut ValidationResult,
) {
    match crl.find_revoked(&cert.serial) {
        Some(entry)
            if reference_date
                .map(|r| entry.revocation_date < r)
                .unwrap_or(true) =>
        {
            let reason = entry
                .reason
                .map(|code| format!(", reason: {}", reason_label(code)))
                .unwrap_or_default();

            log_item!(
                cert.subject.clone(),
                format!(
                    "certificate revoked at {}{reason}",
                    entry.revocation_date
                ),
                "check_revocation"
            )
            .failure(result, Outcome::CertificateRevoked);
            result.set_outcome(Outcome::CertificateRevoked);
        }

        Some(entry) => {
            log_item!(
                cert.subject.clone(),
                format!(
                    "certificate revoked at {}, after the reference date",
                    entry.revocation_date
                ),
                "check_revocation"
            )
            .informational(result);
        }

        None => {
            log_item!(
                cert.subject.clone(),
                "serial number not listed in CRL",
                "check_revocation"
            )
            .success(result);
        }
    }
}

/// Records the outcome of a failed cascade into `result`.
pub(crate) fn record_cascade_failure(
    cert: &CertInfo,
    obtained: &ObtainedCrl,
    result: &mut ValidationResult,
) {
    match obtained {
        ObtainedCrl::Usable(_) => (),

        ObtainedCrl::EmbeddedMismatch => {
            log_item!(
                cert.subject.clone(),
                "no embedded CRL matches the issuer",
                "check_revocation"
            )
            .warning(result);
            result.set_outcome(Outcome::CrlInvalid);
        }

        ObtainedCrl::SuppliedInvalid => {
            log_item!(
                cert.subject.clone(),
                "supplied CRL failed verification against the issuer key",
                "check_revocation"
            )
            .failure(result, Outcome::CrlInvalid);
            result.set_outcome(Outcome::CrlInvalid);
        }

        ObtainedCrl::SuppliedStale(crl) => {
            let next_update = crl
                .next_update
                .map(|nu| nu.to_string())
                .unwrap_or_else(|| "absent".to_string());

            log_item!(
                cert.subject.clone(),
                format!("supplied CRL expired (nextUpdate {next_update})"),
                "check_revocation"
            )
            .failure(result, Outcome::CrlExpired);
            result.set_outcome(Outcome::CrlExpired);
        }

        ObtainedCrl::Unobtainable { pre_crl_era: true } => {
            log_item!(
                cert.subject.clone(),
                "no CRL obtainable; issuer certificate expired before the CRL era",
                "check_revocation"
            )
            .warning(result);
            result.set_outcome(Outcome::CertificateExpiredBeforeCrlEra);
        }

        ObtainedCrl::Unobtainable { pre_crl_era: false } => {
            log_item!(
                cert.subject.clone(),
                "no CRL could be obtained from any source",
                "check_revocation"
            )
            .failure(result, Outcome::CrlUnobtainable);
            result.set_outcome(Outcome::CrlUnobtainable);
        }
    }
}

/// Checks revocation for every signature in the list.
///
/// When the expiration step ran and already found a certificate expired or
/// malformed, revocation is skipped for it and recorded as
/// [`Outcome::NotApplicable`]. The checker tolerates a missing prior
/// expiration map.
pub(crate) fn check(
    pipeline: &Pipeline,
    signatures: &[Signature],
    prior_expiration: Option<&StepReport>,
    now: DateTime<Utc>,
) -> (bool, StepReport) {
    let mut out = StepReport::new();
    let mut all_valid = true;
    let mut path = Vec::new();

    for (i, signature) in signatures.iter().enumerate() {
        path.push(i);
        all_valid &= check_one(pipeline, signature, prior_expiration, now, &mut path, &mut out);
        path.pop();
    }

    (all_valid, out)
}

fn check_one(
    pipeline: &Pipeline,
    signature: &Signature,
    prior_expiration: Option<&StepReport>,
    now: DateTime<Utc>,
    path: &mut Vec<usize>,
    out: &mut StepReport,
) -> bool {
    let id = signature.id_at(path);
    let cert = &signature.cert;
    let mut result = ValidationResult::new();

    let already_unusable = pipeline.options.step_enabled(STEP_EXPIRATION)
        && prior_expiration
            .and_then(|m| m.get(&id))
            .map(|r| {
                matches!(
                    r.outcome(),
                    Outcome::CertificateExpired | Outcome::CertificateMalformed
                )
            })
            .unwrap_or(false);

    if already_unusable {
        log_item!(
            cert.subject.clone(),
            "revocation check skipped: certificate already found expired or malformed",
            "check_revocation"
        )
        .informational(&mut result);
        result.set_outcome(Outcome::NotApplicable);
    } else {
        let reference_date = signature.reference_date().unwrap_or(now);
        let issuer = pipeline
            .ca_store
            .lookup(&cert.issuer, cert.authority_key_id.as_ref());

        let obtained = obtain_crl(
            pipeline,
            cert,
            issuer.as_ref(),
            &signature.embedded_crls,
            pipeline.options.supplied_crl.as_ref(),
            reference_date,
        );

        match &obtained {
            ObtainedCrl::Usable(crl) => {
                judge_revocation(cert, crl, Some(reference_date), &mut result)
            }
            other => record_cascade_failure(cert, other, &mut result),
        }
    }

    let mut valid = result.is_valid();
    out.insert(id, result);

    if pipeline.options.check_countersignatures {
        for (i, countersignature) in signature.countersignatures.iter().enumerate() {
            path.push(i);
            valid &= check_one(pipeline, countersignature, prior_expiration, now, path, out);
            path.pop();
        }
    }

    valid
}
