// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the data model.

use thiserror::Error;

/// Errors raised while validating model values.
#[derive(Error, Debug)]
pub enum Error {
    /// A required experiment field was empty or missing.
    #[error("experiment {field} should not be empty")]
    EmptyExperimentField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The experiment descriptor was not valid JSON.
    #[error("invalid experiment descriptor: {0}")]
    InvalidDescriptor(#[from] serde_json::Error),
}
