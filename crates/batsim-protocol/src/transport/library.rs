// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Library-mode EDC transport: `init`/`take_decisions`/`deinit` symbols
//! loaded via `dlopen`.
//!
//! Libraries may be loaded in private memory namespaces to avoid symbol
//! collisions with the host process; on Unix this is `RTLD_DEEPBIND`, which
//! `libloading`'s platform-specific `unix::Library::open` exposes.

use crate::transport::EdcTransport;
use batsim_core::ProtocolError;
use libloading::Library;
use std::os::raw::{c_char, c_int};

type InitFn = unsafe extern "C" fn(buf: *const c_char, size: usize, flags: c_int) -> c_int;
type TakeDecisionsFn = unsafe extern "C" fn(
    input: *const c_char,
    input_size: usize,
    output: *mut *mut c_char,
    output_size: *mut usize,
) -> c_int;
type DeinitFn = unsafe extern "C" fn() -> c_int;

pub struct LibraryTransport {
    _lib: Library,
    take_decisions: TakeDecisionsFn,
    deinit: Option<DeinitFn>,
}

impl LibraryTransport {
    /// Load `path`, call `init(buf, size, flags)`, and resolve the remaining
    /// symbols. `deep_bind` mirrors the original's private-namespace loading
    /// option.
    pub fn load(path: &str, init_buf: &[u8], flags: i32, deep_bind: bool) -> Result<Self, ProtocolError> {
        let lib = unsafe { Self::open_library(path, deep_bind)? };

        let init: InitFn = unsafe {
            *lib.get::<InitFn>(b"init\0")
                .map_err(|e| ProtocolError::LibrarySymbol { symbol: "init", reason: e.to_string() })?
        };
        let take_decisions: TakeDecisionsFn = unsafe {
            *lib.get::<TakeDecisionsFn>(b"take_decisions\0").map_err(|e| ProtocolError::LibrarySymbol {
                symbol: "take_decisions",
                reason: e.to_string(),
            })?
        };
        let deinit: Option<DeinitFn> = unsafe { lib.get::<DeinitFn>(b"deinit\0").ok().map(|s| *s) };

        let rc = unsafe { init(init_buf.as_ptr() as *const c_char, init_buf.len(), flags) };
        if rc != 0 {
            return Err(ProtocolError::EdcNonZeroReturn(rc));
        }

        Ok(Self { _lib: lib, take_decisions, deinit })
    }

    #[cfg(unix)]
    unsafe fn open_library(path: &str, deep_bind: bool) -> Result<Library, ProtocolError> {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_DEEPBIND, RTLD_NOW};
        let flags = if deep_bind { RTLD_NOW | RTLD_DEEPBIND } else { RTLD_NOW };
        UnixLibrary::open(Some(path), flags)
            .map(Library::from)
            .map_err(|e| ProtocolError::LibrarySymbol { symbol: "dlopen", reason: e.to_string() })
    }

    #[cfg(not(unix))]
    unsafe fn open_library(path: &str, _deep_bind: bool) -> Result<Library, ProtocolError> {
        Library::new(path).map_err(|e| ProtocolError::LibrarySymbol { symbol: "dlopen", reason: e.to_string() })
    }
}

impl EdcTransport for LibraryTransport {
    fn request(&mut self, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut out_ptr: *mut c_char = std::ptr::null_mut();
        let mut out_size: usize = 0;
        let rc = unsafe {
            (self.take_decisions)(
                request.as_ptr() as *const c_char,
                request.len(),
                &mut out_ptr as *mut *mut c_char,
                &mut out_size as *mut usize,
            )
        };
        if rc != 0 {
            return Err(ProtocolError::EdcNonZeroReturn(rc));
        }
        if out_ptr.is_null() {
            return Ok(Vec::new());
        }
        let bytes = unsafe { std::slice::from_raw_parts(out_ptr as *const u8, out_size).to_vec() };
        Ok(bytes)
    }
}

impl Drop for LibraryTransport {
    fn drop(&mut self) {
        if let Some(deinit) = self.deinit {
            let _ = unsafe { deinit() };
        }
    }
}
