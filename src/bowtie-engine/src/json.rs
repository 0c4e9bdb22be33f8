// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! JSON import and export of diagrams.

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::datamodel::Diagram;

pub fn from_json_str(json: &str) -> Result<Diagram> {
    serde_json::from_str(json).map_err(|err| {
        Error::new(
            ErrorKind::Import,
            ErrorCode::JsonDeserialization,
            Some(err.to_string()),
        )
    })
}

pub fn to_json_string(diagram: &Diagram) -> Result<String> {
    serde_json::to_string_pretty(diagram).map_err(|err| {
        Error::new(
            ErrorKind::Import,
            ErrorCode::JsonSerialization,
            Some(err.to_string()),
        )
    })
}
