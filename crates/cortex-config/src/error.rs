// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the config crate.

use miette::Diagnostic;

/// Context in which a config error occurred, used to prefix error messages
/// with the file or resource under consideration.
#[derive(Debug, Default, Clone)]
pub struct Context {
    /// Human readable description of what was being loaded, e.g. a file path.
    pub description: String,
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.description.is_empty() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}", self.description)
        }
    }
}

impl Context {
    /// Build a context describing a file path.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            description: path.into(),
        }
    }
}

/// Errors that can occur while loading or validating Cortex configuration.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// An error occurred while reading a configuration file.
    #[error("file read error: {details}\ncontext: {context}")]
    #[diagnostic(code(cortex_config::file_read_error))]
    FileReadError {
        /// The context in which the error occurred.
        context: Context,
        /// A description of the error that occurred.
        details: String,
    },

    /// An error occurred while deserializing a configuration document.
    #[error("{format} deserialization error: {details}\ncontext: {context}")]
    #[diagnostic(code(cortex_config::deserialization_error))]
    DeserializationError {
        /// The context in which the error occurred.
        context: Context,
        /// The format of the document (e.g. "JSON").
        format: String,
        /// A description of the error that occurred.
        details: String,
    },

    /// The merged configuration failed validation.
    #[error("invalid configuration: {details}\ncontext: {context}")]
    #[diagnostic(code(cortex_config::invalid_configuration))]
    InvalidConfiguration {
        /// The context in which the error occurred.
        context: Context,
        /// A description of the validation failure.
        details: String,
    },
}
