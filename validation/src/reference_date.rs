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

//! Reference date resolution.
//!
//! Certificate validity and revocation are judged at a *reference date*, not
//! at "now". The resolver assigns exactly one date and one provenance tag to
//! each signature before any downstream checker runs, following a strict
//! priority order where the first matching rule wins. Countersignatures do
//! not inherit the parent's date; each resolves independently against the
//! same rules.

use chrono::{DateTime, Utc};
use firma_status_tracker::log_item;

use crate::{
    pipeline::{StepReport, ValidationOptions},
    signature::{ReferenceDateKind, Signature},
};

/// Resolves the reference date of every signature (and, recursively, every
/// countersignature) in place.
///
/// Priority order, first match wins:
///
/// 1. caller-supplied external reference time;
/// 2. embedded validated timestamp token's generation time;
/// 3. caller-indicated detached timestamp envelope date;
/// 4. generation time of the oldest detached timestamp for the batch;
/// 5. caller-declared reference date, verbatim;
/// 6. the signature's claimed signing time, when the caller opted in;
/// 7. `invocation_date` as the lowest-priority fallback.
///
/// Resolution is a pure function of the signature and options: resolving
/// twice with no mutation in between yields the same date and tag.
pub fn resolve_reference_dates(
    signatures: &mut [Signature],
    options: &ValidationOptions,
    invocation_date: DateTime<Utc>,
) {
    for signature in signatures {
        resolve_one(signature, options, invocation_date);
    }
}

fn resolve_one(
    signature: &mut Signature,
    options: &ValidationOptions,
    invocation_date: DateTime<Utc>,
) {
    let (date, kind) = if let Some(date) = options.external_reference_time {
        (date, ReferenceDateKind::ExternalReferenceTime)
    } else if let Some(token) = &signature.timestamp {
        (token.gen_time, ReferenceDateKind::TimestampPerRegulation)
    } else if let Some(date) = options.detached_timestamp_date {
        (date, ReferenceDateKind::TimestampPerRegulation)
    } else if let Some(date) = options.batch_timestamp_date {
        (date, ReferenceDateKind::TimestampPerRegulation)
    } else if let Some(date) = options.declared_reference_date {
        (date, ReferenceDateKind::Declared)
    } else if let (true, Some(date)) = (options.use_signing_time, signature.claimed_signing_time) {
        (date, ReferenceDateKind::ClaimedSigningTime)
    } else {
        (invocation_date, ReferenceDateKind::ValidationDate)
    };

    signature.set_reference_date(date, kind);

    for countersignature in &mut signature.countersignatures {
        resolve_one(countersignature, options, invocation_date);
    }
}

/// Builds the per-signature step report for the resolution step.
pub(crate) fn step_report(signatures: &[Signature], options: &ValidationOptions) -> StepReport {
    let mut out = StepReport::new();
    let mut path = Vec::new();

    for (i, signature) in signatures.iter().enumerate() {
        path.push(i);
        record_one(signature, options, &mut path, &mut out);
        path.pop();
    }

    out
}

fn record_one(
    signature: &Signature,
    options: &ValidationOptions,
    path: &mut Vec<usize>,
    out: &mut StepReport,
) {
    let mut result = crate::ValidationResult::new();

    match (signature.reference_date(), signature.reference_date_kind()) {
        (Some(date), Some(kind)) => {
            log_item!(
                signature.cert.subject.clone(),
                format!("reference date {date} ({kind:?})"),
                "resolve_reference_dates"
            )
            .informational(&mut result);
        }
        _ => {
            log_item!(
                signature.cert.subject.clone(),
                "no reference date resolved",
                "resolve_reference_dates"
            )
            .warning(&mut result);
        }
    }

    out.insert(signature.id_at(path), result);

    if options.check_countersignatures {
        for (i, countersignature) in signature.countersignatures.iter().enumerate() {
            path.push(i);
            record_one(countersignature, options, path, out);
            path.pop();
        }
    }
}
