// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two interchangeable EDC invocation modes: library mode
//! (symbols loaded via `dlopen`) and socket mode (request/reply over TCP).

mod library;
mod socket;

pub use library::LibraryTransport;
pub use socket::SocketTransport;

use batsim_core::ProtocolError;

/// A synchronous request/reply round-trip with the EDC.
///
/// The Server drives this on its own thread — implementations MUST NOT spawn their own threads or
/// assume concurrent access.
pub trait EdcTransport {
    /// Send one encoded request frame and block for the encoded reply frame.
    fn request(&mut self, request: &[u8]) -> Result<Vec<u8>, ProtocolError>;
}

/// Either transport, selected once at EDC-registration time and immutable
/// for the run.
pub enum EdcTransportHandle {
    Library(LibraryTransport),
    Socket(SocketTransport),
}

impl EdcTransport for EdcTransportHandle {
    fn request(&mut self, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        match self {
            EdcTransportHandle::Library(t) => t.request(request),
            EdcTransportHandle::Socket(t) => t.request(request),
        }
    }
}
