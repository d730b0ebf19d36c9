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

use crate::{
    tests::fixtures::{chain, crl, date, options_at, pipeline, signature, INTER},
    Outcome, Signature, ValidationError, ValidationOptions, STEP_EXPIRATION,
    STEP_REFERENCE_DATE, STEP_RELIABILITY, STEP_REVOCATION, STEP_TSA_RELIABILITY,
    STEP_TSA_REVOCATION,
};

fn valid_setup() -> (crate::Pipeline, Vec<Signature>) {
    let (root, inter, _) = chain();
    let p = pipeline(vec![root, inter], options_at(date(2025, 6, 1)));
    p.crl_store
        .upsert(crl(INTER, Some(date(2026, 1, 1))))
        .unwrap();
    (p, vec![signature()])
}

#[test]
fn every_step_reports_and_a_clean_setup_passes() {
    let (p, mut sigs) = valid_setup();
    let report = p.run(&mut sigs);

    assert!(report.passed);
    for step in [
        STEP_REFERENCE_DATE,
        STEP_EXPIRATION,
        STEP_RELIABILITY,
        STEP_REVOCATION,
        STEP_TSA_RELIABILITY,
        STEP_TSA_REVOCATION,
    ] {
        assert!(report.step(step).is_some(), "missing step {step}");
    }

    let id = sigs[0].id_at(&[0]);
    assert!(report.chains.contains_key(&id));
    assert_eq!(report.chains[&id].len(), 2);
}

#[test]
fn one_failing_step_fails_the_run() {
    let (p, mut sigs) = valid_setup();
    sigs[0].cert.key_usage = None;

    let report = p.run(&mut sigs);

    assert!(!report.passed);
    // Other steps still ran and still passed.
    assert!(report.step(STEP_RELIABILITY).is_some());
}

#[test]
fn disabled_steps_leave_no_entry_and_no_verdict() {
    let (root, inter, _) = chain();
    let options = ValidationOptions {
        disabled_steps: [STEP_REVOCATION.to_string()].into_iter().collect(),
        ..options_at(date(2025, 6, 1))
    };
    // No CRL anywhere; with revocation disabled this must still pass.
    let p = pipeline(vec![root, inter], options);

    let mut sigs = vec![signature()];
    let report = p.run(&mut sigs);

    assert!(report.passed);
    assert!(report.step(STEP_REVOCATION).is_none());
}

#[test]
fn expired_certificate_short_circuits_revocation() {
    let (p, mut sigs) = valid_setup();
    sigs[0].cert.not_after = date(2024, 1, 1);

    let report = p.run(&mut sigs);

    assert!(!report.passed);
    let id = sigs[0].id_at(&[0]);
    assert_eq!(
        report.step(STEP_EXPIRATION).unwrap()[&id].outcome(),
        Outcome::CertificateExpired
    );
    assert_eq!(
        report.step(STEP_REVOCATION).unwrap()[&id].outcome(),
        Outcome::NotApplicable
    );
}

#[test]
fn revocation_runs_in_full_when_expiration_is_disabled() {
    let (p, mut sigs) = valid_setup();
    let options = ValidationOptions {
        disabled_steps: [STEP_EXPIRATION.to_string()].into_iter().collect(),
        ..p.options.clone()
    };
    let p = crate::Pipeline {
        options,
        ..p
    };
    sigs[0].cert.not_after = date(2024, 1, 1);

    let report = p.run(&mut sigs);

    let id = sigs[0].id_at(&[0]);
    assert!(report.step(STEP_EXPIRATION).is_none());
    assert_eq!(
        report.step(STEP_REVOCATION).unwrap()[&id].outcome(),
        Outcome::Positive
    );
}

#[test]
fn reference_dates_are_resolved_before_the_checkers_run() {
    let (p, mut sigs) = valid_setup();
    let report = p.run(&mut sigs);

    assert!(sigs[0].reference_date().is_some());
    assert!(report.step(STEP_REFERENCE_DATE).is_some());
}

#[test]
fn countersignature_results_are_keyed_by_position() {
    let (p, mut sigs) = valid_setup();
    sigs[0].countersignatures.push(signature());

    let report = p.run(&mut sigs);

    assert!(report.passed);
    let step = report.step(STEP_EXPIRATION).unwrap();
    assert_eq!(step.len(), 2);
    assert!(step.contains_key(&sigs[0].countersignatures[0].id_at(&[0, 0])));
}

#[test]
fn extraction_failure_aborts_with_unrecognized_format() {
    let (p, _) = valid_setup();

    let err = p
        .run_extraction(Err::<Vec<Signature>, _>("truncated envelope"))
        .unwrap_err();

    let ValidationError::ExtractionFailed { reason, partial } = err;
    assert_eq!(reason, "truncated envelope");
    assert!(!partial.is_valid());
    assert_eq!(partial.outcome(), Outcome::UnrecognizedFormat);
}

#[test]
fn extraction_success_runs_the_pipeline() {
    let (p, sigs) = valid_setup();

    let report = p.run_extraction(Ok::<_, String>(sigs)).unwrap();
    assert!(report.passed);
}
