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

//! Timestamp authority (TSA) checks.
//!
//! A timestamp from an untrusted TSA is still usable as a time reference,
//! so an unanchored TSA chain only warns here; the revocation check keeps
//! full strength, since a revoked TSA certificate undermines the token
//! itself. Both checks recurse into timestamp extensions, which carry
//! re-timestamps issued to extend a token's lifetime.

use firma_status_tracker::{log_item, Outcome, ValidationResult};

use crate::{
    pipeline::{Pipeline, StepReport},
    reliability::walk_chain,
    revocation::{judge_revocation, obtain_crl, record_cascade_failure, ObtainedCrl},
    signature::{Signature, TimeStampToken},
};

/// Checks TSA trust for every timestamp token reachable from the
/// signatures, plus any detached tokens.
pub(crate) fn check_reliability(
    pipeline: &Pipeline,
    signatures: &[Signature],
    detached: &[TimeStampToken],
) -> (bool, StepReport) {
    for_each_token(pipeline, signatures, detached, &mut |pipeline, token, id, out| {
        let mut result = ValidationResult::new();

        match token.signer_certificate() {
            None => {
                log_item!(
                    token.signer_serial.clone(),
                    "timestamp token carries no certificate matching its signer serial",
                    "check_tsa_reliability"
                )
                .failure(&mut result, Outcome::UnrecognizedFormat);
                result.set_outcome(Outcome::UnrecognizedFormat);
            }

            Some(cert) => {
                let directly_accredited = pipeline
                    .ca_store
                    .lookup(&cert.subject, cert.subject_key_id.as_ref())
                    .map(|found| found.serial == cert.serial)
                    .unwrap_or(false);

                if directly_accredited {
                    log_item!(
                        cert.subject.clone(),
                        "TSA certificate is directly accredited",
                        "check_tsa_reliability"
                    )
                    .success(&mut result);
                } else {
                    let mut scratch = ValidationResult::new();
                    walk_chain(
                        pipeline,
                        cert,
                        &token.embedded_crls,
                        token.gen_time,
                        &mut scratch,
                    );

                    if scratch.is_valid() {
                        result.append(&scratch);
                    } else {
                        log_item!(
                            cert.subject.clone(),
                            "timestamp usable as a time reference despite untrusted TSA",
                            "check_tsa_reliability"
                        )
                        .warning(&mut result);
                    }
                }
            }
        }

        let valid = result.is_valid();
        out.insert(id, result);
        valid
    })
}

/// Checks revocation for every TSA signing certificate, at each token's
/// own generation time.
pub(crate) fn check_revocation(
    pipeline: &Pipeline,
    signatures: &[Signature],
    detached: &[TimeStampToken],
) -> (bool, StepReport) {
    for_each_token(pipeline, signatures, detached, &mut |pipeline, token, id, out| {
        let mut result = ValidationResult::new();

        match token.signer_certificate() {
            None => {
                log_item!(
                    token.signer_serial.clone(),
                    "timestamp token carries no certificate matching its signer serial",
                    "check_tsa_revocation"
                )
                .failure(&mut result, Outcome::UnrecognizedFormat);
                result.set_outcome(Outcome::UnrecognizedFormat);
            }

            Some(cert) => {
                let issuer = pipeline
                    .ca_store
                    .lookup(&cert.issuer, cert.authority_key_id.as_ref());

                let obtained = obtain_crl(
                    pipeline,
                    cert,
                    issuer.as_ref(),
                    &token.embedded_crls,
                    pipeline.options.supplied_crl.as_ref(),
                    token.gen_time,
                );

                match &obtained {
                    ObtainedCrl::Usable(crl) => {
                        judge_revocation(cert, crl, Some(token.gen_time), &mut result)
                    }
                    other => record_cascade_failure(cert, other, &mut result),
                }
            }
        }

        let valid = result.is_valid();
        out.insert(id, result);
        valid
    })
}

type TokenCheck<'a> =
    dyn FnMut(&Pipeline, &TimeStampToken, crate::signature::SignatureId, &mut StepReport) -> bool
        + 'a;

/// Visits every token in the forest: each signature's embedded timestamp,
/// each detached token, and all of their extensions, depth first.
fn for_each_token(
    pipeline: &Pipeline,
    signatures: &[Signature],
    detached: &[TimeStampToken],
    check: &mut TokenCheck<'_>,
) -> (bool, StepReport) {
    let mut out = StepReport::new();
    let mut all_valid = true;
    let mut path = Vec::new();

    for (i, signature) in signatures.iter().enumerate() {
        path.push(i);
        all_valid &= visit_signature(pipeline, signature, check, &mut path, &mut out);
        path.pop();
    }

    for (i, token) in detached.iter().enumerate() {
        path.push(signatures.len() + i);
        all_valid &= visit_token(pipeline, token, check, &mut path, &mut out);
        path.pop();
    }

    (all_valid, out)
}

fn visit_signature(
    pipeline: &Pipeline,
    signature: &Signature,
    check: &mut TokenCheck<'_>,
    path: &mut Vec<usize>,
    out: &mut StepReport,
) -> bool {
    let mut valid = true;

    if let Some(token) = &signature.timestamp {
        valid &= visit_token(pipeline, token, check, path, out);
    }

    if pipeline.options.check_countersignatures {
        for (i, countersignature) in signature.countersignatures.iter().enumerate() {
            path.push(i);
            valid &= visit_signature(pipeline, countersignature, check, path, out);
            path.pop();
        }
    }

    valid
}

fn visit_token(
    pipeline: &Pipeline,
    token: &TimeStampToken,
    check: &mut TokenCheck<'_>,
    path: &mut Vec<usize>,
    out: &mut StepReport,
) -> bool {
    let mut valid = check(pipeline, token, token.id_at(path), out);

    for (i, extension) in token.extensions.iter().enumerate() {
        path.push(i);
        valid &= visit_token(pipeline, extension, check, path, out);
        path.pop();
    }

    valid
}
