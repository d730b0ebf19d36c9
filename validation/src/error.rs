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

use firma_status_tracker::ValidationResult;

/// Errors that abort a pipeline run before any checker executes.
///
/// Checker findings are never errors; they accumulate in the
/// [`ValidationResult`]s of the report. The only abortive condition is an
/// envelope the extraction layer could not parse at all.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The envelope could not be parsed into signatures.
    #[error("envelope extraction failed: {reason}")]
    ExtractionFailed {
        /// Description from the extraction layer.
        reason: String,

        /// Partial result carrying the failure item, with outcome
        /// [`crate::Outcome::UnrecognizedFormat`].
        partial: ValidationResult,
    },
}
