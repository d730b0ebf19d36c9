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

//! Certificate validity-period checking at the reference date, plus the
//! key-usage sanity check.

use chrono::{DateTime, Utc};
use firma_status_tracker::{log_item, Outcome, ValidationResult};

use crate::{
    cert_info::TimeValidity,
    pipeline::{StepReport, ValidationOptions},
    signature::Signature,
};

/// Checks every signature's certificate validity window against its
/// reference date (or `now` when unresolved) and inspects the key-usage
/// extension.
///
/// A missing key-usage extension, or one without the non-repudiation bit,
/// is always fatal and overrides an otherwise positive date check.
pub(crate) fn check(
    signatures: &[Signature],
    options: &ValidationOptions,
    now: DateTime<Utc>,
) -> (bool, StepReport) {
    let mut out = StepReport::new();
    let mut all_valid = true;
    let mut path = Vec::new();

    for (i, signature) in signatures.iter().enumerate() {
        path.push(i);
        all_valid &= check_one(signature, options, now, &mut path, &mut out);
        path.pop();
    }

    (all_valid, out)
}

fn check_one(
    signature: &Signature,
    options: &ValidationOptions,
    now: DateTime<Utc>,
    path: &mut Vec<usize>,
    out: &mut StepReport,
) -> bool {
    let mut result = ValidationResult::new();
    let cert = &signature.cert;
    let at = signature.reference_date().unwrap_or(now);

    match cert.validity_at(at) {
        TimeValidity::Expired => {
            log_item!(
                cert.subject.clone(),
                format!("certificate expired {} before reference date {at}", cert.not_after),
                "check_expiration"
            )
            .failure(&mut result, Outcome::CertificateExpired);
            result.set_outcome(Outcome::CertificateExpired);
        }

        TimeValidity::NotYetValid => {
            log_item!(
                cert.subject.clone(),
                format!(
                    "certificate not valid until {}, after reference date {at}",
                    cert.not_before
                ),
                "check_expiration"
            )
            .failure(&mut result, Outcome::CertificateNotYetValid);
            result.set_outcome(Outcome::CertificateNotYetValid);
        }

        TimeValidity::Valid => {
            log_item!(
                cert.subject.clone(),
                "certificate inside validity window at reference date",
                "check_expiration"
            )
            .success(&mut result);
        }
    }

    // Legal-value signatures require the non-repudiation bit; its absence
    // overrides an otherwise positive date check.
    let key_usage_ok = cert.key_usage.map(|ku| ku.non_repudiation).unwrap_or(false);
    if !key_usage_ok {
        log_item!(
            cert.subject.clone(),
            "key-usage extension missing or without non-repudiation bit",
            "check_expiration"
        )
        .failure(&mut result, Outcome::CertificateMalformed);
        result.set_outcome(Outcome::CertificateMalformed);
    }

    let mut valid = result.is_valid();
    out.insert(signature.id_at(path), result);

    if options.check_countersignatures {
        for (i, countersignature) in signature.countersignatures.iter().enumerate() {
            path.push(i);
            valid &= check_one(countersignature, options, now, path, out);
            path.pop();
        }
    }

    valid
}
