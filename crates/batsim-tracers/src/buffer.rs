// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A buffered, append-only text writer, one per trace file.
//!
//! A fixed-size buffer in front of the output file, flushed explicitly
//! rather than on every write, so the hot path of the simulation loop never
//! pays for a syscall per row.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::TracerError;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

pub struct TraceFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TraceFile {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TracerError> {
        Self::create_with_capacity(path, DEFAULT_BUFFER_SIZE)
    }

    pub fn create_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self, TracerError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| TracerError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            writer: BufWriter::with_capacity(capacity, file),
            path,
        })
    }

    pub fn append(&mut self, text: &str) -> Result<(), TracerError> {
        self.writer.write_all(text.as_bytes()).map_err(|source| TracerError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }

    pub fn flush(&mut self) -> Result<(), TracerError> {
        self.writer.flush().map_err(|source| TracerError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TraceFile {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
