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

#![deny(missing_docs)]
#![deny(warnings)]
#![doc = include_str!("../README.md")]

pub use firma_status_tracker::{log_item, LogItem, LogKind, Outcome, ValidationResult};

mod cert_info;
pub use cert_info::{CertInfo, CertificateParseError, KeyId, KeyUsageInfo, TimeValidity};

mod crl_info;
pub use crl_info::{
    reason_label, CrlInfo, CrlParseError, CrlVerifier, RevokedEntry, X509CrlVerifier,
};

mod signature;
pub use signature::{ReferenceDateKind, Signature, SignatureId, TimeStampToken};

mod stores;
pub use stores::{CaStore, CrlStore, InMemoryCaStore, InMemoryCrlStore, PrincipalKey, StoreError};

mod fetch;
pub use fetch::{
    CrlFetcher, FetchTimeouts, HttpCrlFetcher, HttpTrustListSource, NullCrlFetcher,
    QualifiedCaSource, TrustListError,
};

mod reference_date;
pub use reference_date::resolve_reference_dates;

mod expiration;
mod reliability;
pub use reliability::TrustChainLink;

mod revocation;
mod tsa;

mod pipeline;
pub use pipeline::{
    Pipeline, PipelineReport, StepReport, ValidationOptions, STEP_EXPIRATION,
    STEP_REFERENCE_DATE, STEP_RELIABILITY, STEP_REVOCATION, STEP_TSA_RELIABILITY,
    STEP_TSA_REVOCATION,
};

mod error;
pub use error::ValidationError;

#[cfg(test)]
pub(crate) mod tests;
