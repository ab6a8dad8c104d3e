// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared row-formatting helper: quote fields the way `csv` would, without
//! paying for a full `Writer` (and its header tracking) per trace file.

use crate::error::TracerError;

pub fn format_row(fields: &[String]) -> Result<String, TracerError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields).map_err(|source| TracerError::Csv { path: "<row>".to_string(), source })?;
    let bytes = writer.into_inner().map_err(|e| TracerError::Csv {
        path: "<row>".to_string(),
        source: csv::Error::from(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
    })?;
    String::from_utf8(bytes).map_err(|e| {
        TracerError::Csv {
            path: "<row>".to_string(),
            source: csv::Error::from(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        }
    })
}
