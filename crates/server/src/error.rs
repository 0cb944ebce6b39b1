// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the HTTP boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can take the server down or keep it from starting.
#[derive(Error, Debug)]
pub enum Error {
    /// The settings file could not be read or parsed.
    #[error("cannot load settings from '{path}': {details}")]
    Settings {
        /// Path of the settings file.
        path: PathBuf,
        /// Human-readable details of the failure.
        details: String,
    },

    /// The configured bind address is invalid and could not be parsed.
    #[error("invalid bind address '{bind_address}': {details}")]
    InvalidBindAddress {
        /// The bind address that failed to parse.
        bind_address: String,
        /// Human-readable details of the parsing failure.
        details: String,
    },

    /// Failed to bind the TCP listener on the given address.
    #[error("failed to bind ingestion server on '{addr}': {details}")]
    BindFailed {
        /// The address we attempted to bind to.
        addr: String,
        /// Human-readable details of the bind failure.
        details: String,
    },

    /// The HTTP server encountered a fatal error while serving.
    #[error("ingestion server error on '{addr}': {details}")]
    ServerError {
        /// The address the server was bound to.
        addr: String,
        /// Human-readable details of the server failure.
        details: String,
    },
}
