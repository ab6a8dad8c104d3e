// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed binary wire encoding: a stable schema with
//! forward-compatible default values, via MessagePack (`rmp-serde`).
//! MessagePack is self-describing, so the same tagged-enum representation
//! used by the JSON codec decodes correctly here
//! too; `#[serde(default)]` fields are what let an old frame parse against a
//! newer schema.

use batsim_core::ProtocolError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    rmp_serde::to_vec_named(value)
        .map_err(|e| ProtocolError::EncodeFailure { wire: "binary", reason: e.to_string() })
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    rmp_serde::from_slice(bytes).map_err(|e| ProtocolError::DecodeFailure { wire: "binary", reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OutboundEvent;
    use crate::message::OutboundMessage;

    #[test]
    fn encode_decode_round_trip() {
        let msg = OutboundMessage::new(2.5, vec![OutboundEvent::SimulationEnds, OutboundEvent::Nop]);
        let bytes = encode(&msg).unwrap();
        let decoded: OutboundMessage = decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        let result: Result<OutboundMessage, _> = decode(&[0u8; 2]);
        assert!(result.is_err());
    }
}
