// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket-mode EDC transport: a strict request/reply pair with an external
//! process, framed with a 4-byte big-endian length prefix.

use crate::codec::{frame, read_frame_len};
use crate::transport::EdcTransport;
use batsim_core::ProtocolError;
use std::io::{Read, Write};
use std::net::TcpStream;

pub struct SocketTransport {
    stream: TcpStream,
}

impl SocketTransport {
    pub fn connect(endpoint: &str) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(endpoint).map_err(|e| ProtocolError::Transport(e.to_string()))?;
        stream.set_nodelay(true).map_err(|e| ProtocolError::Transport(e.to_string()))?;
        Ok(Self { stream })
    }

    fn write_frame(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        self.stream.write_all(&frame(payload)).map_err(|e| ProtocolError::Transport(e.to_string()))
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).map_err(|e| ProtocolError::Transport(e.to_string()))?;
        let len = read_frame_len(len_buf);
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).map_err(|e| ProtocolError::Transport(e.to_string()))?;
        Ok(payload)
    }
}

impl EdcTransport for SocketTransport {
    fn request(&mut self, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        self.write_frame(request)?;
        self.read_frame()
    }
}
