//! Payload encoders for [`DataPacket`](feedbus_messages::DataPacket) bodies.
//!
//! The bus moves opaque bytes; what those bytes mean is an agreement
//! between publisher and subscriber. These encoders capture the two usual
//! agreements, JSON for interoperability and bincode for compactness.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EncodeError;

/// Turns typed values into packet bodies and back.
pub trait ByteEncoder {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, EncodeError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, EncodeError>;
}

/// JSON bodies via `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonByteEncoder;

impl ByteEncoder for JsonByteEncoder {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, EncodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Compact binary bodies via `bincode`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryByteEncoder;

impl ByteEncoder for BinaryByteEncoder {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, EncodeError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
