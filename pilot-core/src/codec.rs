//! Payload codec
//!
//! Drivers encode a callable and its arguments into the opaque payloads of a
//! [`TaskDefn`]; workers decode them, run the call and encode the return
//! value. The coordinator never touches this module.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::task::TaskDefn;

/// Errors raised while encoding or decoding payloads
#[derive(Debug, Error)]
pub enum CodecError {
    /// The function payload is not a valid name
    #[error("Invalid function payload: {0}")]
    InvalidFunction(String),

    /// Arguments or return value could not be (de)serialized
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A decoded call: what to run and with which arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub function: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl Call {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

/// The three opaque payloads of an encoded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub function: Vec<u8>,
    pub args: Vec<u8>,
    pub kwargs: Vec<u8>,
}

impl EncodedCall {
    /// Wraps the payloads into a task definition ready for submission
    pub fn into_task(self, task_id: impl Into<String>, kind: impl Into<String>) -> TaskDefn {
        TaskDefn {
            task_id: task_id.into(),
            function: self.function,
            args: self.args,
            kwargs: self.kwargs,
            kind: kind.into(),
        }
    }
}

/// Turns calls and values into bytes and back
pub trait Codec: Send + Sync {
    fn encode_call(&self, call: &Call) -> Result<EncodedCall, CodecError>;

    fn decode_call(&self, function: &[u8], args: &[u8], kwargs: &[u8])
    -> Result<Call, CodecError>;

    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    /// Decodes the call carried by a task definition
    fn decode_task(&self, task: &TaskDefn) -> Result<Call, CodecError> {
        self.decode_call(&task.function, &task.args, &task.kwargs)
    }
}

/// JSON codec
///
/// The function is referenced by its registered name, arguments are a JSON
/// array, keyword arguments a JSON object and return values plain JSON.
/// Empty argument payloads decode as "no arguments".
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_call(&self, call: &Call) -> Result<EncodedCall, CodecError> {
        if call.function.trim().is_empty() {
            return Err(CodecError::InvalidFunction(
                "function name cannot be empty".to_string(),
            ));
        }

        Ok(EncodedCall {
            function: call.function.as_bytes().to_vec(),
            args: serde_json::to_vec(&call.args)?,
            kwargs: serde_json::to_vec(&call.kwargs)?,
        })
    }

    fn decode_call(
        &self,
        function: &[u8],
        args: &[u8],
        kwargs: &[u8],
    ) -> Result<Call, CodecError> {
        let function = std::str::from_utf8(function)
            .map_err(|e| CodecError::InvalidFunction(e.to_string()))?
            .trim()
            .to_string();

        if function.is_empty() {
            return Err(CodecError::InvalidFunction(
                "function name cannot be empty".to_string(),
            ));
        }

        let args = if args.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(args)?
        };

        let kwargs = if kwargs.is_empty() {
            Map::new()
        } else {
            serde_json::from_slice(kwargs)?
        };

        Ok(Call {
            function,
            args,
            kwargs,
        })
    }

    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}
