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
    expiration,
    tests::fixtures::{date, signature},
    Outcome, ReferenceDateKind, ValidationOptions,
};

#[test]
fn valid_window_with_non_repudiation_passes() {
    let sigs = vec![signature()];
    let (passed, report) = expiration::check(&sigs, &ValidationOptions::default(), date(2025, 6, 1));

    assert!(passed);
    let result = &report[&sigs[0].id_at(&[0])];
    assert!(result.is_valid());
    assert_eq!(result.outcome(), Outcome::Positive);
}

#[test]
fn expired_at_reference_date_fails() {
    let mut sig = signature();
    sig.set_reference_date(date(2031, 1, 1), ReferenceDateKind::Declared);
    let sigs = vec![sig];

    // The invocation date is inside the window; only the reference date
    // matters.
    let (passed, report) = expiration::check(&sigs, &ValidationOptions::default(), date(2025, 6, 1));

    assert!(!passed);
    let result = &report[&sigs[0].id_at(&[0])];
    assert!(!result.is_valid());
    assert_eq!(result.outcome(), Outcome::CertificateExpired);
}

#[test]
fn not_yet_valid_at_reference_date_fails() {
    let mut sig = signature();
    sig.set_reference_date(date(2019, 1, 1), ReferenceDateKind::Declared);
    let sigs = vec![sig];

    let (passed, report) = expiration::check(&sigs, &ValidationOptions::default(), date(2025, 6, 1));

    assert!(!passed);
    assert_eq!(
        report[&sigs[0].id_at(&[0])].outcome(),
        Outcome::CertificateNotYetValid
    );
}

#[test]
fn missing_non_repudiation_bit_is_fatal() {
    let mut sig = signature();
    if let Some(ku) = sig.cert.key_usage.as_mut() {
        ku.non_repudiation = false;
    }
    let sigs = vec![sig];

    let (passed, report) = expiration::check(&sigs, &ValidationOptions::default(), date(2025, 6, 1));

    assert!(!passed);
    assert_eq!(
        report[&sigs[0].id_at(&[0])].outcome(),
        Outcome::CertificateMalformed
    );
}

#[test]
fn missing_key_usage_extension_is_fatal() {
    let mut sig = signature();
    sig.cert.key_usage = None;
    let sigs = vec![sig];

    let (passed, report) = expiration::check(&sigs, &ValidationOptions::default(), date(2025, 6, 1));

    assert!(!passed);
    assert_eq!(
        report[&sigs[0].id_at(&[0])].outcome(),
        Outcome::CertificateMalformed
    );
}

#[test]
fn key_usage_defect_overrides_expiry() {
    let mut sig = signature();
    sig.cert.key_usage = None;
    sig.set_reference_date(date(2031, 1, 1), ReferenceDateKind::Declared);
    let sigs = vec![sig];

    let (_, report) = expiration::check(&sigs, &ValidationOptions::default(), date(2025, 6, 1));

    assert_eq!(
        report[&sigs[0].id_at(&[0])].outcome(),
        Outcome::CertificateMalformed
    );
}

#[test]
fn countersignature_failure_fails_the_step_but_not_the_outer_entry() {
    let mut outer = signature();
    let mut counter = signature();
    counter.cert.key_usage = None;
    outer.countersignatures.push(counter);
    let sigs = vec![outer];

    let (passed, report) = expiration::check(&sigs, &ValidationOptions::default(), date(2025, 6, 1));

    assert!(!passed);
    assert!(report[&sigs[0].id_at(&[0])].is_valid());
    assert!(!report[&sigs[0].countersignatures[0].id_at(&[0, 0])].is_valid());
}

#[test]
fn countersignatures_skipped_when_disabled() {
    let mut outer = signature();
    let mut counter = signature();
    counter.cert.key_usage = None;
    outer.countersignatures.push(counter);
    let sigs = vec![outer];

    let options = ValidationOptions {
        check_countersignatures: false,
        ..Default::default()
    };
    let (passed, report) = expiration::check(&sigs, &options, date(2025, 6, 1));

    assert!(passed);
    assert_eq!(report.len(), 1);
}
