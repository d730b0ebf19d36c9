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
    resolve_reference_dates,
    tests::fixtures::{date, signature},
    ReferenceDateKind, Signature, TimeStampToken, ValidationOptions,
};

#[test]
fn external_reference_time_wins_over_everything() {
    let mut sig = signature();
    sig.timestamp = Some(TimeStampToken::new(date(2024, 3, 1), "TS"));
    sig.claimed_signing_time = Some(date(2024, 2, 1));

    let options = ValidationOptions {
        external_reference_time: Some(date(2024, 5, 5)),
        declared_reference_date: Some(date(2024, 4, 4)),
        use_signing_time: true,
        ..Default::default()
    };

    let mut sigs = vec![sig];
    resolve_reference_dates(&mut sigs, &options, date(2025, 1, 1));

    assert_eq!(sigs[0].reference_date(), Some(date(2024, 5, 5)));
    assert_eq!(
        sigs[0].reference_date_kind(),
        Some(ReferenceDateKind::ExternalReferenceTime)
    );
}

#[test]
fn embedded_timestamp_beats_declared_date() {
    let mut sig = signature();
    sig.timestamp = Some(TimeStampToken::new(date(2024, 3, 1), "TS"));

    let options = ValidationOptions {
        declared_reference_date: Some(date(2024, 4, 4)),
        ..Default::default()
    };

    let mut sigs = vec![sig];
    resolve_reference_dates(&mut sigs, &options, date(2025, 1, 1));

    assert_eq!(sigs[0].reference_date(), Some(date(2024, 3, 1)));
    assert_eq!(
        sigs[0].reference_date_kind(),
        Some(ReferenceDateKind::TimestampPerRegulation)
    );
}

#[test]
fn detached_timestamp_beats_batch_timestamp() {
    let options = ValidationOptions {
        detached_timestamp_date: Some(date(2024, 3, 2)),
        batch_timestamp_date: Some(date(2024, 3, 9)),
        ..Default::default()
    };

    let mut sigs = vec![signature()];
    resolve_reference_dates(&mut sigs, &options, date(2025, 1, 1));

    assert_eq!(sigs[0].reference_date(), Some(date(2024, 3, 2)));
    assert_eq!(
        sigs[0].reference_date_kind(),
        Some(ReferenceDateKind::TimestampPerRegulation)
    );
}

#[test]
fn claimed_signing_time_requires_opt_in() {
    let mut sig = signature();
    sig.claimed_signing_time = Some(date(2024, 2, 1));
    let mut sigs = vec![sig];

    resolve_reference_dates(&mut sigs, &ValidationOptions::default(), date(2025, 1, 1));
    assert_eq!(
        sigs[0].reference_date_kind(),
        Some(ReferenceDateKind::ValidationDate)
    );

    let options = ValidationOptions {
        use_signing_time: true,
        ..Default::default()
    };
    resolve_reference_dates(&mut sigs, &options, date(2025, 1, 1));
    assert_eq!(sigs[0].reference_date(), Some(date(2024, 2, 1)));
    assert_eq!(
        sigs[0].reference_date_kind(),
        Some(ReferenceDateKind::ClaimedSigningTime)
    );
}

#[test]
fn invocation_date_is_the_fallback() {
    let mut sigs = vec![signature()];
    resolve_reference_dates(&mut sigs, &ValidationOptions::default(), date(2025, 1, 1));

    assert_eq!(sigs[0].reference_date(), Some(date(2025, 1, 1)));
    assert_eq!(
        sigs[0].reference_date_kind(),
        Some(ReferenceDateKind::ValidationDate)
    );
}

#[test]
fn resolving_twice_is_idempotent() {
    let mut sig = signature();
    sig.timestamp = Some(TimeStampToken::new(date(2024, 3, 1), "TS"));
    let mut sigs = vec![sig];
    let options = ValidationOptions::default();

    resolve_reference_dates(&mut sigs, &options, date(2025, 1, 1));
    let first = (sigs[0].reference_date(), sigs[0].reference_date_kind());

    resolve_reference_dates(&mut sigs, &options, date(2025, 1, 1));
    assert_eq!(
        (sigs[0].reference_date(), sigs[0].reference_date_kind()),
        first
    );
}

#[test]
fn countersignatures_resolve_independently() {
    let mut outer = signature();
    outer.timestamp = Some(TimeStampToken::new(date(2024, 3, 1), "TS"));
    outer.countersignatures.push(signature());
    let mut sigs = vec![outer];

    resolve_reference_dates(&mut sigs, &ValidationOptions::default(), date(2025, 1, 1));

    assert_eq!(sigs[0].reference_date(), Some(date(2024, 3, 1)));

    let counter: &Signature = &sigs[0].countersignatures[0];
    assert_eq!(counter.reference_date(), Some(date(2025, 1, 1)));
    assert_eq!(
        counter.reference_date_kind(),
        Some(ReferenceDateKind::ValidationDate)
    );
}
