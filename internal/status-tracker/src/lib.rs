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

mod log;
pub use log::{LogItem, LogKind};

mod outcome;
pub use outcome::Outcome;

mod validation_result;
pub use validation_result::ValidationResult;

#[cfg(test)]
pub(crate) mod tests;
