// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON wire encoding: the same object shape as the binary encoding, with
//! human-readable enum names.

use batsim_core::ProtocolError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(value)
        .map_err(|e| ProtocolError::EncodeFailure { wire: "json", reason: e.to_string() })
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ProtocolError::DecodeFailure { wire: "json", reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OutboundEvent;
    use crate::message::OutboundMessage;

    #[test]
    fn encode_decode_round_trip() {
        let msg = OutboundMessage::new(1.5, vec![OutboundEvent::SimulationEnds]);
        let bytes = encode(&msg).unwrap();
        let decoded: OutboundMessage = decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result: Result<OutboundMessage, _> = decode(b"not json");
        assert!(result.is_err());
    }
}
