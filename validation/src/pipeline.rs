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

//! The validation pipeline.
//!
//! [`Pipeline::run`] resolves reference dates first, then runs each enabled
//! checker over the full signature forest. Steps never abort the run; their
//! per-signature results land in the [`PipelineReport`], keyed by step name
//! and signature identity, and the overall verdict is the conjunction of
//! all step verdicts.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Display,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use firma_status_tracker::{log_item, Outcome, ValidationResult};
use log::info;
use serde::Serialize;

use crate::{
    crl_info::{CrlInfo, CrlVerifier, X509CrlVerifier},
    error::ValidationError,
    expiration,
    fetch::{CrlFetcher, FetchTimeouts, HttpCrlFetcher, QualifiedCaSource},
    reference_date,
    reliability::{self, TrustChainLink},
    revocation,
    signature::{Signature, SignatureId, TimeStampToken},
    stores::{CaStore, CrlStore},
    tsa,
};

/// Reference date resolution step.
pub const STEP_REFERENCE_DATE: &str = "reference_date";
/// Certificate validity window and key-usage step.
pub const STEP_EXPIRATION: &str = "expiration";
/// Trust-chain reliability step.
pub const STEP_RELIABILITY: &str = "reliability";
/// Certificate revocation step.
pub const STEP_REVOCATION: &str = "revocation";
/// Timestamp authority trust step.
pub const STEP_TSA_RELIABILITY: &str = "tsa_reliability";
/// Timestamp authority revocation step.
pub const STEP_TSA_REVOCATION: &str = "tsa_revocation";

const ALL_STEPS: &[&str] = &[
    STEP_REFERENCE_DATE,
    STEP_EXPIRATION,
    STEP_RELIABILITY,
    STEP_REVOCATION,
    STEP_TSA_RELIABILITY,
    STEP_TSA_REVOCATION,
];

/// Per-signature results of one pipeline step.
pub type StepReport = BTreeMap<SignatureId, ValidationResult>;

/// Caller-tunable knobs for one pipeline run.
#[derive(Clone, Debug)]
pub struct ValidationOptions {
    /// Validate countersignatures recursively. Defaults to `true`.
    pub check_countersignatures: bool,

    /// Refresh the accredited CA store from the online trust-list source
    /// before walking chains.
    pub online_ca_lookup: bool,

    /// Network timeouts for CRL and trust-list fetches.
    pub timeouts: FetchTimeouts,

    /// Step names to skip. Skipped steps leave no entry in the report and
    /// do not affect the verdict.
    pub disabled_steps: HashSet<String>,

    /// External reference time, highest reference date priority.
    pub external_reference_time: Option<DateTime<Utc>>,

    /// Generation time of a detached timestamp covering the document.
    pub detached_timestamp_date: Option<DateTime<Utc>>,

    /// Generation time of a batch-wide timestamp.
    pub batch_timestamp_date: Option<DateTime<Utc>>,

    /// Caller-declared reference date, used verbatim.
    pub declared_reference_date: Option<DateTime<Utc>>,

    /// Trust each signature's claimed signing time as a reference date.
    pub use_signing_time: bool,

    /// Pin the pipeline's notion of "now". Defaults to the wall clock.
    pub validation_date: Option<DateTime<Utc>>,

    /// Caller-supplied CRL, the last resort of the CRL fallback cascade.
    pub supplied_crl: Option<CrlInfo>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_countersignatures: true,
            online_ca_lookup: false,
            timeouts: FetchTimeouts::default(),
            disabled_steps: HashSet::new(),
            external_reference_time: None,
            detached_timestamp_date: None,
            batch_timestamp_date: None,
            declared_reference_date: None,
            use_signing_time: false,
            validation_date: None,
            supplied_crl: None,
        }
    }
}

impl ValidationOptions {
    /// Returns `true` unless the named step is disabled.
    pub fn step_enabled(&self, step: &str) -> bool {
        !self.disabled_steps.contains(step)
    }
}

/// Output of one pipeline run.
#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    /// `true` when every executed step passed for every signature.
    pub passed: bool,

    /// Step results, keyed by step name. Disabled steps are absent.
    pub steps: HashMap<String, StepReport>,

    /// Resolved trust chains, keyed by signature identity.
    pub chains: BTreeMap<SignatureId, Vec<TrustChainLink>>,
}

impl PipelineReport {
    /// Returns the result map of one step, if it ran.
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.get(name)
    }
}

/// Validates extracted signatures against accredited CA and CRL stores.
///
/// The pipeline is cheap to clone and safe to share across threads; all
/// mutable state lives behind the store traits.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) ca_store: Arc<dyn CaStore>,
    pub(crate) crl_store: Arc<dyn CrlStore>,
    pub(crate) crl_fetcher: Arc<dyn CrlFetcher>,
    pub(crate) crl_verifier: Arc<dyn CrlVerifier>,
    pub(crate) trust_list: Option<Arc<dyn QualifiedCaSource>>,
    pub(crate) options: ValidationOptions,
}

impl Pipeline {
    /// Returns a pipeline over the given stores, fetching CRLs over HTTP
    /// and verifying them with X.509 signature checks.
    pub fn new(
        ca_store: Arc<dyn CaStore>,
        crl_store: Arc<dyn CrlStore>,
        options: ValidationOptions,
    ) -> Self {
        Self {
            ca_store,
            crl_store,
            crl_fetcher: Arc::new(HttpCrlFetcher),
            crl_verifier: Arc::new(X509CrlVerifier),
            trust_list: None,
            options,
        }
    }

    /// Replaces the CRL fetcher.
    pub fn with_crl_fetcher(mut self, fetcher: Arc<dyn CrlFetcher>) -> Self {
        self.crl_fetcher = fetcher;
        self
    }

    /// Replaces the CRL signature verifier.
    pub fn with_crl_verifier(mut self, verifier: Arc<dyn CrlVerifier>) -> Self {
        self.crl_verifier = verifier;
        self
    }

    /// Sets the online qualified-CA source consulted when
    /// [`ValidationOptions::online_ca_lookup`] is enabled.
    pub fn with_trust_list_source(mut self, source: Arc<dyn QualifiedCaSource>) -> Self {
        self.trust_list = Some(source);
        self
    }

    /// Runs every enabled step over the signatures.
    pub fn run(&self, signatures: &mut [Signature]) -> PipelineReport {
        self.run_with_tokens(signatures, &[])
    }

    /// Runs every enabled step over the signatures plus detached timestamp
    /// tokens that cover the same document.
    pub fn run_with_tokens(
        &self,
        signatures: &mut [Signature],
        detached_tokens: &[TimeStampToken],
    ) -> PipelineReport {
        let now = self.options.validation_date.unwrap_or_else(Utc::now);
        let mut report = PipelineReport {
            passed: true,
            ..Default::default()
        };

        if self.options.step_enabled(STEP_REFERENCE_DATE) {
            reference_date::resolve_reference_dates(signatures, &self.options, now);
            report.steps.insert(
                STEP_REFERENCE_DATE.to_string(),
                reference_date::step_report(signatures, &self.options),
            );
        }

        if self.options.step_enabled(STEP_EXPIRATION) {
            let (passed, step) = expiration::check(signatures, &self.options, now);
            report.passed &= passed;
            report.steps.insert(STEP_EXPIRATION.to_string(), step);
        }

        if self.options.step_enabled(STEP_RELIABILITY) {
            let (passed, step, chains) = reliability::check(self, signatures, now);
            report.passed &= passed;
            report.steps.insert(STEP_RELIABILITY.to_string(), step);
            report.chains = chains;
        }

        if self.options.step_enabled(STEP_REVOCATION) {
            let (passed, step) = {
                let prior = report.steps.get(STEP_EXPIRATION);
                revocation::check(self, signatures, prior, now)
            };
            report.passed &= passed;
            report.steps.insert(STEP_REVOCATION.to_string(), step);
        }

        if self.options.step_enabled(STEP_TSA_RELIABILITY) {
            let (passed, step) = tsa::check_reliability(self, signatures, detached_tokens);
            report.passed &= passed;
            report.steps.insert(STEP_TSA_RELIABILITY.to_string(), step);
        }

        if self.options.step_enabled(STEP_TSA_REVOCATION) {
            let (passed, step) = tsa::check_revocation(self, signatures, detached_tokens);
            report.passed &= passed;
            report.steps.insert(STEP_TSA_REVOCATION.to_string(), step);
        }

        let executed = ALL_STEPS
            .iter()
            .filter(|s| self.options.step_enabled(s))
            .count();

        info!(
            "pipeline run over {} signature(s): {} step(s), passed={}",
            signatures.len(),
            executed,
            report.passed
        );

        report
    }

    /// Runs the pipeline over the output of an extraction layer.
    ///
    /// An extraction failure aborts the run with
    /// [`ValidationError::ExtractionFailed`], carrying a partial result
    /// whose outcome is [`Outcome::UnrecognizedFormat`].
    pub fn run_extraction<E: Display>(
        &self,
        extracted: Result<Vec<Signature>, E>,
    ) -> Result<PipelineReport, ValidationError> {
        match extracted {
            Ok(mut signatures) => Ok(self.run(&mut signatures)),
            Err(e) => {
                let reason = e.to_string();
                let mut partial = ValidationResult::new();

                log_item!(
                    "envelope".to_string(),
                    format!("unrecognized envelope format: {reason}"),
                    "run_extraction"
                )
                .failure(&mut partial, Outcome::UnrecognizedFormat);
                partial.set_outcome(Outcome::UnrecognizedFormat);

                Err(ValidationError::ExtractionFailed { reason, partial })
            }
        }
    }
}
