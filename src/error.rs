#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the report crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint, so the lint is disabled
//! for this module.

use std::path::{Path, PathBuf};

/// Unified error type returned by configuration loading, API access, report
/// writing and the CLI.
///
/// Variants never carry the API token. HTTP failures keep the requested URL
/// and the `message` field reported by GitHub so users can tell an expired
/// credential from a missing repository.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading input files.
    #[error("failed to read {path:?}: {source}")]
    Io {
        /// Location of the input file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when configuration or input violates invariants.
    #[error("invalid input: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Wraps JSON serialization errors when writing reports.
    #[error("failed to serialize report: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// Wraps CSV writer errors.
    #[error("failed to write CSV report: {source}")]
    Csv {
        /// Underlying CSV error.
        source: csv::Error
    },
    /// Wraps I/O errors that occur while writing report artifacts.
    #[error("failed to write report artifact at {path:?}: {source}")]
    ReportIo {
        /// Location of the artifact being produced.
        path:   PathBuf,
        /// Underlying I/O error reported by the operating system.
        source: std::io::Error
    },
    /// The API rejected the credential or denied access.
    #[error("authentication failed for {url} (HTTP {status}): {message}")]
    Unauthorized {
        /// Requested URL.
        url:     String,
        /// HTTP status code (401 or 403).
        status:  u16,
        /// Message returned by the API.
        message: String
    },
    /// The API kept answering with rate-limit responses.
    #[error("rate limit still exceeded for {url} after {waits} waits")]
    RateLimited {
        /// Requested URL.
        url:   String,
        /// Number of waits performed before giving up.
        waits: u32
    },
    /// Any other non-success HTTP status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    Http {
        /// Requested URL.
        url:     String,
        /// HTTP status code.
        status:  u16,
        /// Message returned by the API.
        message: String
    },
    /// Network or client-level failure before a response was received.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url:    String,
        /// Error reported by the GitHub client.
        source: octocrab::Error
    },
    /// Response body was not the JSON document we expected.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// Requested URL.
        url:    String,
        /// Underlying decoding error.
        source: serde_json::Error
    },
    /// The async runtime could not be started.
    #[error("failed to start async runtime: {source}")]
    Runtime {
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Service errors that do not fit a more specific variant.
    #[error("service error: {message}")]
    Service {
        /// Human readable message describing the service error.
        message: String
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a service error from the provided displayable value.
    pub fn service<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Service {
            message: message.into()
        }
    }

    /// Reports whether retrying the same request may succeed.
    ///
    /// Transport failures, request timeouts (408) and server errors (5xx) are
    /// transient. Everything else, rate limiting included, is handled
    /// elsewhere or is final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport {
                ..
            } => true,
            Self::Http {
                status, ..
            } => *status == 408 || *status >= 500,
            _ => false
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation
    /// and is what the CLI prints before exiting.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

impl From<csv::Error> for Error {
    fn from(source: csv::Error) -> Self {
        Self::Csv {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the input file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

/// Creates an [`Error::ReportIo`] variant capturing the failing path and
/// source.
///
/// # Parameters
///
/// * `path` - Location of the report artifact that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn report_io_error(path: &Path, source: std::io::Error) -> Error {
    Error::ReportIo {
        path: path.to_path_buf(),
        source
    }
}
