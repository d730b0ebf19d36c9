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

use std::{borrow::Cow, fmt::Debug};

use crate::ValidationResult;

/// Detailed information about an error or other noteworthy condition.
///
/// Use the [`log_item`](crate::log_item) macro to create a `LogItem`.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LogItem {
    /// Label for the checked object (typically the signer's subject name
    /// or a similar stable identifier).
    pub label: Cow<'static, str>,

    /// Human-readable description of the condition.
    pub description: Cow<'static, str>,

    /// Source file where the condition was detected.
    pub file: Cow<'static, str>,

    /// Function where the condition was detected.
    pub function: Cow<'static, str>,

    /// Source line number where the condition was detected.
    pub line: u32,

    /// Severity of this item.
    pub kind: LogKind,

    /// Underlying error value, captured via its `Debug` representation.
    pub err_val: Option<Cow<'static, str>>,
}

impl LogItem {
    /// Captures the description from the value (typically an `Error` enum) as
    /// additional information for this `LogItem` struct.
    ///
    /// This is captured using the [`Debug`] trait, which the `Error` enum from
    /// any crate is likely to implement.
    pub fn error<E: Debug>(self, err: E) -> Self {
        LogItem {
            err_val: Some(format!("{err:?}").into()),
            ..self
        }
    }

    /// Record this item as a success in the given [`ValidationResult`].
    pub fn success(mut self, result: &mut ValidationResult) {
        self.kind = LogKind::Success;
        result.add(self);
    }

    /// Record this item as informational in the given [`ValidationResult`].
    pub fn informational(mut self, result: &mut ValidationResult) {
        self.kind = LogKind::Informational;
        result.add(self);
    }

    /// Record this item as a warning in the given [`ValidationResult`].
    ///
    /// Warnings describe degraded-but-usable conditions; they do not make
    /// the owning object invalid.
    pub fn warning(mut self, result: &mut ValidationResult) {
        self.kind = LogKind::Warning;
        result.add(self);
    }

    /// Record this item as a failure in the given [`ValidationResult`],
    /// capturing `err` as its error value.
    ///
    /// A failure makes the owning object invalid but never interrupts
    /// validation of its siblings.
    pub fn failure<E: Debug>(mut self, result: &mut ValidationResult, err: E) {
        self.kind = LogKind::Failure;
        self.err_val = Some(format!("{err:?}").into());
        result.add(self);
    }
}

/// Severity of a [`LogItem`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LogKind {
    /// A check that passed.
    Success,

    /// Context that is neither a pass nor a defect.
    Informational,

    /// A degraded-but-usable condition.
    Warning,

    /// A definite negative condition.
    Failure,
}

/// Creates a [`LogItem`] struct that is annotated with the source file and
/// line number where the log condition was discovered.
///
/// Takes three parameters, each of which may be a `'static str` or `String`:
///
/// * `label`: identity of the object this item refers to
/// * `description`: human-readable reason for this item to exist
/// * `function`: name of the function generating this item
///
/// The item starts out as informational; use one of [`LogItem::success`],
/// [`LogItem::warning`], or [`LogItem::failure`] to record it.
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::LogItem {
            label: $label.into(),
            description: $description.into(),
            file: file!().into(),
            function: $function.into(),
            line: line!(),
            kind: $crate::LogKind::Informational,
            err_val: None,
        }
    }};
}
