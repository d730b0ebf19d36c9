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

/// Categorical outcome for one checked object.
///
/// An outcome starts out as [`Outcome::Positive`] and is overwritten by the
/// last check that detects a definite condition. This is a closed set:
/// consumers are expected to match it exhaustively so that a new outcome kind
/// forces a compiler-checked update at every use site.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Outcome {
    /// No definite negative condition was detected.
    #[default]
    Positive,

    /// The certificate's validity period ended before the reference date.
    CertificateExpired,

    /// The certificate's validity period starts after the reference date.
    CertificateNotYetValid,

    /// The certificate is structurally unacceptable (for example, the
    /// key-usage extension is missing or lacks the non-repudiation bit).
    CertificateMalformed,

    /// The certificate's serial number appears in a usable CRL with a
    /// revocation date before the reference date.
    CertificateRevoked,

    /// A CRL was obtained and verified but its `nextUpdate` is not after the
    /// reference date.
    CrlExpired,

    /// A CRL was obtained but failed verification against the issuer's
    /// public key, or no envelope-embedded CRL matched the issuer.
    CrlInvalid,

    /// No CRL could be obtained from any source.
    CrlUnobtainable,

    /// No CRL could be obtained, but the issuer certificate expired before
    /// 3 December 2009; CRLs were not consistently published before that
    /// date, so unobtainability alone is not treated as suspicious.
    CertificateExpiredBeforeCrlEra,

    /// The envelope format could not be recognized by any extraction layer.
    UnrecognizedFormat,

    /// The check did not apply to this object (for example, revocation
    /// checking was skipped because the certificate was already found
    /// expired or malformed).
    NotApplicable,

    /// A definite negative condition not covered by a more specific variant
    /// (for example, the issuing CA is not in the accredited list).
    Negative,
}
