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
    tests::fixtures::{cert, chain, crl, date, options_at, pipeline, revoked_entry, signature},
    tsa, LogKind, Outcome, TimeStampToken,
};

const TSA_SUBJECT: &str = "CN=Example TSA";
const TSA_SERIAL: &str = "7A";

fn tsa_token() -> TimeStampToken {
    let mut token = TimeStampToken::new(date(2024, 3, 1), TSA_SERIAL);
    token
        .certs
        .push(cert(TSA_SUBJECT, "CN=Intermediate CA", TSA_SERIAL));
    token
}

#[test]
fn token_without_signer_certificate_is_unrecognized() {
    let p = pipeline(Vec::new(), options_at(date(2025, 6, 1)));
    let token = TimeStampToken::new(date(2024, 3, 1), TSA_SERIAL);

    let (passed, report) = tsa::check_reliability(&p, &[], &[token.clone()]);

    assert!(!passed);
    assert_eq!(
        report[&token.id_at(&[0])].outcome(),
        Outcome::UnrecognizedFormat
    );

    let (passed, _) = tsa::check_revocation(&p, &[], &[token]);
    assert!(!passed);
}

#[test]
fn anchored_tsa_chain_passes() {
    let (root, inter, _) = chain();
    let p = pipeline(vec![root, inter], options_at(date(2025, 6, 1)));

    let token = tsa_token();
    let (passed, report) = tsa::check_reliability(&p, &[], &[token.clone()]);

    assert!(passed);
    assert!(report[&token.id_at(&[0])].is_valid());
}

#[test]
fn directly_accredited_tsa_skips_the_walk() {
    let tsa_cert = cert(TSA_SUBJECT, "CN=Untracked Issuer", TSA_SERIAL);
    let p = pipeline(vec![tsa_cert], options_at(date(2025, 6, 1)));

    let token = tsa_token();
    let (passed, report) = tsa::check_reliability(&p, &[], &[token.clone()]);

    assert!(passed);
    let result = &report[&token.id_at(&[0])];
    assert!(result
        .items()
        .iter()
        .any(|i| i.kind == LogKind::Success && i.description.contains("directly accredited")));
}

#[test]
fn untrusted_tsa_degrades_to_a_warning() {
    let p = pipeline(Vec::new(), options_at(date(2025, 6, 1)));

    let token = tsa_token();
    let (passed, report) = tsa::check_reliability(&p, &[], &[token.clone()]);

    // The timestamp stays usable as a time reference.
    assert!(passed);
    let result = &report[&token.id_at(&[0])];
    assert!(result.is_valid());
    assert_eq!(result.outcome(), Outcome::Positive);
    assert!(result
        .items()
        .iter()
        .any(|i| i.kind == LogKind::Warning && i.description.contains("untrusted TSA")));
}

#[test]
fn revoked_tsa_certificate_fails_at_generation_time() {
    let (root, inter, _) = chain();
    let p = pipeline(vec![root, inter], options_at(date(2025, 6, 1)));

    let mut ca_crl = crl("CN=Intermediate CA", Some(date(2026, 1, 1)));
    ca_crl.revoked.push(revoked_entry(TSA_SERIAL, date(2024, 1, 1)));
    p.crl_store.upsert(ca_crl).unwrap();

    let token = tsa_token();
    let (passed, report) = tsa::check_revocation(&p, &[], &[token.clone()]);

    assert!(!passed);
    assert_eq!(
        report[&token.id_at(&[0])].outcome(),
        Outcome::CertificateRevoked
    );
}

#[test]
fn tsa_revocation_after_generation_time_passes() {
    let (root, inter, _) = chain();
    let p = pipeline(vec![root, inter], options_at(date(2025, 6, 1)));

    // Revoked after this token was issued.
    let mut ca_crl = crl("CN=Intermediate CA", Some(date(2026, 1, 1)));
    ca_crl.revoked.push(revoked_entry(TSA_SERIAL, date(2024, 6, 1)));
    p.crl_store.upsert(ca_crl).unwrap();

    let token = tsa_token();
    let (passed, _) = tsa::check_revocation(&p, &[], &[token]);

    assert!(passed);
}

#[test]
fn embedded_signature_timestamps_are_visited() {
    let p = pipeline(Vec::new(), options_at(date(2025, 6, 1)));

    let mut sig = signature();
    sig.timestamp = Some(tsa_token());
    let sigs = vec![sig];

    let (passed, report) = tsa::check_reliability(&p, &sigs, &[]);

    assert!(passed);
    assert_eq!(report.len(), 1);
}

#[test]
fn timestamp_extensions_are_validated_recursively() {
    let p = pipeline(Vec::new(), options_at(date(2025, 6, 1)));

    let mut token = tsa_token();
    token.extensions.push(TimeStampToken::new(date(2026, 3, 1), "7B"));

    let (passed, report) = tsa::check_reliability(&p, &[], &[token]);

    // The extension has no signer certificate, so it fails even though the
    // outer token only warns.
    assert!(!passed);
    assert_eq!(report.len(), 2);
}

#[test]
fn signatures_without_timestamps_produce_no_entries() {
    let p = pipeline(Vec::new(), options_at(date(2025, 6, 1)));
    let sigs = vec![signature()];

    let (passed, report) = tsa::check_reliability(&p, &sigs, &[]);

    assert!(passed);
    assert!(report.is_empty());
}
