use akonadi_proto::{Command, CommandEnvelope, Response, ResponseEnvelope, Tag};
use serde::{Serialize, de::DeserializeOwned};

use crate::IpcError;

/// Serializes a value to CBOR bytes for wire transmission.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, IpcError> {
    serde_cbor::to_vec(value).map_err(|err| IpcError::Encode(err.to_string()))
}

/// Deserializes a CBOR frame payload into a typed value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, IpcError> {
    serde_cbor::from_slice(bytes).map_err(|err| IpcError::Decode(err.to_string()))
}

/// Builds the payload of one tagged command frame.
pub fn encode_command(tag: Tag, command: &Command) -> Result<Vec<u8>, IpcError> {
    encode(&CommandEnvelope { tag, body: command })
}

/// Parses one server frame.
pub fn decode_response(bytes: &[u8]) -> Result<ResponseEnvelope<Response>, IpcError> {
    decode(bytes)
}

/// Builds the payload of one server frame. Used by brokers and test peers.
pub fn encode_response(tag: Tag, response: &Response) -> Result<Vec<u8>, IpcError> {
    encode(&ResponseEnvelope {
        tag,
        body: response,
    })
}

/// Parses one client frame. Used by brokers and test peers.
pub fn decode_command(bytes: &[u8]) -> Result<CommandEnvelope<Command>, IpcError> {
    decode(bytes)
}
