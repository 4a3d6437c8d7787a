//! On-archive encodings of an [`Envelope`]
//!
//! Binary is the protobuf wire form. Text is pretty-printed JSON; stamped
//! envelopes are expanded one level so that the timestamp stays readable.
//! Readers accept either form regardless of the entry's extension.

use crate::error::{BagError, BagResult};
use crate::proto::{Envelope, StampedMessage, STAMPED_MESSAGE_TYPE_URL};
use prost::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an entry's envelope is serialized inside the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Protobuf wire format
    #[default]
    Binary,
    /// Human-readable JSON
    Text,
}

impl Encoding {
    /// File extension used for auto-derived entry names
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::Binary => "bin",
            Encoding::Text => "json",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Binary => write!(f, "binary"),
            Encoding::Text => write!(f, "text"),
        }
    }
}

impl FromStr for Encoding {
    type Err = BagError;

    fn from_str(s: &str) -> BagResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bin" | "protobin" => Ok(Encoding::Binary),
            "text" | "json" | "prototext" => Ok(Encoding::Text),
            other => Err(BagError::invalid_argument(format!(
                "unknown encoding '{}'",
                other
            ))),
        }
    }
}

/// JSON document for one envelope
#[derive(Serialize, Deserialize)]
struct TextEnvelope {
    type_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stamped: Option<StampedMessage>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        with = "crate::proto::base64_bytes"
    )]
    value: Vec<u8>,
}

/// Serialize `envelope` with `encoding`
pub fn encode_envelope(envelope: &Envelope, encoding: Encoding) -> BagResult<Vec<u8>> {
    match encoding {
        Encoding::Binary => Ok(envelope.encode_to_vec()),
        Encoding::Text => {
            let stamped = if envelope.type_url == STAMPED_MESSAGE_TYPE_URL {
                StampedMessage::decode(envelope.value.as_slice()).ok()
            } else {
                None
            };
            let doc = match stamped {
                Some(stamped) => TextEnvelope {
                    type_url: envelope.type_url.clone(),
                    stamped: Some(stamped),
                    value: Vec::new(),
                },
                None => TextEnvelope {
                    type_url: envelope.type_url.clone(),
                    stamped: None,
                    value: envelope.value.clone(),
                },
            };
            serde_json::to_vec_pretty(&doc).map_err(|e| BagError::decode("json encode", e))
        }
    }
}

/// Parse an envelope written in either encoding
pub fn decode_envelope(bytes: &[u8]) -> BagResult<Envelope> {
    let looks_like_json = bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map_or(false, |b| *b == b'{');

    if looks_like_json {
        match decode_text(bytes) {
            Ok(env) => Ok(env),
            Err(json_err) => decode_binary(bytes).map_err(|bin_err| both_failed(json_err, bin_err)),
        }
    } else {
        match decode_binary(bytes) {
            Ok(env) => Ok(env),
            Err(bin_err) => decode_text(bytes).map_err(|json_err| both_failed(json_err, bin_err)),
        }
    }
}

fn decode_binary(bytes: &[u8]) -> Result<Envelope, String> {
    Envelope::decode(bytes).map_err(|e| e.to_string())
}

fn decode_text(bytes: &[u8]) -> Result<Envelope, String> {
    let doc: TextEnvelope = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    let value = match doc.stamped {
        Some(stamped) => stamped.encode_to_vec(),
        None => doc.value,
    };
    Ok(Envelope::new(doc.type_url, value))
}

fn both_failed(json_err: String, bin_err: String) -> BagError {
    BagError::decode(
        "envelope",
        format!("not binary ({}) and not text ({})", bin_err, json_err),
    )
}
