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

use crate::{LogItem, LogKind, Outcome};

/// A `ValidationResult` accumulates log messages and one categorical
/// [`Outcome`] for a single checked object.
///
/// Each checker creates a fresh `ValidationResult` per signature or token it
/// examines; results are never shared across checkers.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationResult {
    items: Vec<LogItem>,
    outcome: Outcome,
}

impl ValidationResult {
    /// Returns a new, empty `ValidationResult` with an implicit-positive
    /// outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no failure-kind item has been recorded.
    ///
    /// An object with only warnings is still valid.
    pub fn is_valid(&self) -> bool {
        !self.items.iter().any(|i| i.kind == LogKind::Failure)
    }

    /// Returns the categorical outcome recorded so far.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Overwrites the categorical outcome.
    ///
    /// The last check that detects a definite condition wins.
    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    /// Returns the current list of log items.
    pub fn items(&self) -> &[LogItem] {
        &self.items
    }

    /// Returns the failure-kind items.
    pub fn errors(&self) -> impl Iterator<Item = &LogItem> {
        self.items.iter().filter(|i| i.kind == LogKind::Failure)
    }

    /// Returns the warning-kind items.
    pub fn warnings(&self) -> impl Iterator<Item = &LogItem> {
        self.items.iter().filter(|i| i.kind == LogKind::Warning)
    }

    /// Adds a [`LogItem`] to this result.
    ///
    /// Primarily intended for use by [`LogItem::success`],
    /// [`LogItem::warning`], and [`LogItem::failure`].
    pub fn add(&mut self, item: LogItem) {
        self.items.push(item);
    }

    /// Appends the items of another `ValidationResult` to this one.
    ///
    /// The other result's outcome replaces this one's only if it is a
    /// definite (non-`Positive`) outcome.
    pub fn append(&mut self, other: &ValidationResult) {
        self.items.extend_from_slice(other.items());

        if other.outcome != Outcome::Positive {
            self.outcome = other.outcome;
        }
    }
}
