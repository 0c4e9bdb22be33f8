// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::result;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Generic,
    JsonDeserialization,
    JsonSerialization,
    DoesNotExist,
    DuplicateNode,
    DuplicateEdge,
    RejectedConnection,
    BadConfig,
    Cycle,
    Timeout,
    LayoutCancelled,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            Generic => "generic",
            JsonDeserialization => "json_deserialization",
            JsonSerialization => "json_serialization",
            DoesNotExist => "does_not_exist",
            DuplicateNode => "duplicate_node",
            DuplicateEdge => "duplicate_edge",
            RejectedConnection => "rejected_connection",
            BadConfig => "bad_config",
            Cycle => "cycle",
            Timeout => "timeout",
            LayoutCancelled => "layout_cancelled",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Import,
    Edit,
    Layout,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            ErrorKind::Import => "ImportError",
            ErrorKind::Edit => "EditError",
            ErrorKind::Layout => "LayoutError",
            ErrorKind::Config => "ConfigError",
        };
        write!(f, "{kind}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}{{{code}{}}}", .details.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Every structural violation found by whole-diagram validation, in the
/// order the checks ran.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("{}", .0.join("; "))]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if any message mentions `needle`, ignoring case.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.0.iter().any(|m| m.to_lowercase().contains(&needle))
    }
}

#[macro_export]
macro_rules! edit_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Edit, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Edit, ErrorCode::$code, None))
    }};
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Edit,
        ErrorCode::DoesNotExist,
        Some("node 'x'".to_string()),
    );
    assert_eq!(format!("{err}"), "EditError{does_not_exist: node 'x'}");

    let err = Error::new(ErrorKind::Import, ErrorCode::JsonDeserialization, None);
    assert_eq!(format!("{err}"), "ImportError{json_deserialization}");
}

#[test]
fn test_validation_errors_mentions() {
    let errs = ValidationErrors(vec![
        "Diagram must contain exactly one hazard (found 0)".to_string(),
    ]);
    assert!(errs.mentions("HAZARD"));
    assert!(!errs.mentions("top event"));
    assert_eq!(errs.len(), 1);
    assert_eq!(format!("{errs}"), "Diagram must contain exactly one hazard (found 0)");
}
