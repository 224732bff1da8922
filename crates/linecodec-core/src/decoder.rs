//! The pluggable `RecordDecoder` trait and the default JSON decoder.
//!
//! A decoder populates a caller-supplied value from one raw record. The
//! trait is object-safe so decoders can be shared across workers as
//! `Arc<dyn RecordDecoder<T>>`.

use crate::error::DecodeError;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Populates a fresh value from the bytes of one record.
///
/// # Thread Safety
/// One decoder instance is shared by every worker of a session, so
/// implementations must be `Send + Sync`. Each call receives its own
/// value instance.
pub trait RecordDecoder<T>: Send + Sync {
    /// Decode `record` (delimiter included) into `value`.
    fn decode(&self, record: &[u8], value: &mut T) -> Result<(), DecodeError>;

    /// Short name used in diagnostics.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Blanket impl so closures can be used as decoders.
impl<T, F> RecordDecoder<T> for F
where
    F: Fn(&[u8], &mut T) -> Result<(), DecodeError> + Send + Sync,
{
    fn decode(&self, record: &[u8], value: &mut T) -> Result<(), DecodeError> {
        self(record, value)
    }
}

/// Default decoder: one JSON document per record, via `serde_json`.
///
/// The value produced by the factory is replaced wholesale, so any
/// `DeserializeOwned` type works as a target.
pub struct JsonDecoder<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonDecoder")
    }
}

impl<T: DeserializeOwned> RecordDecoder<T> for JsonDecoder<T> {
    fn decode(&self, record: &[u8], value: &mut T) -> Result<(), DecodeError> {
        *value = serde_json::from_slice(record)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Key {
        name: String,
        size: u64,
    }

    #[test]
    fn json_decoder_populates_struct() {
        let dec = JsonDecoder::<Key>::new();
        let mut key = Key::default();
        dec.decode(b"{\"name\":\"a.txt\",\"size\":42}\n", &mut key)
            .unwrap();
        assert_eq!(
            key,
            Key {
                name: "a.txt".into(),
                size: 42
            }
        );
        assert_eq!(RecordDecoder::<Key>::name(&dec), "json");
    }

    #[test]
    fn json_decoder_replaces_factory_value() {
        let dec = JsonDecoder::<serde_json::Value>::new();
        let mut v = serde_json::json!({"keep": true});
        dec.decode(b"{\"a\":2}\n", &mut v).unwrap();
        assert_eq!(v, serde_json::json!({"a": 2}));

        // missing fields are an error, not a merge
        let dec = JsonDecoder::<Key>::new();
        let mut key = Key { name: String::new(), size: 7 };
        assert!(dec.decode(b"{\"name\":\"a\"}\n", &mut key).is_err());
    }

    #[test]
    fn json_decoder_rejects_malformed_line() {
        let dec = JsonDecoder::<serde_json::Value>::new();
        let mut v = serde_json::Value::Null;
        let err = dec.decode(b"{bad\n", &mut v).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn json_decoder_rejects_blank_line() {
        let dec = JsonDecoder::<serde_json::Value>::new();
        let mut v = serde_json::Value::Null;
        assert!(dec.decode(b"\n", &mut v).is_err());
    }

    #[test]
    fn closure_is_a_decoder() {
        let upper: Arc<dyn RecordDecoder<String>> =
            Arc::new(|raw: &[u8], out: &mut String| -> Result<(), DecodeError> {
                let line = std::str::from_utf8(raw)?;
                *out = line.trim_end().to_uppercase();
                Ok(())
            });
        let mut s = String::new();
        upper.decode(b"hello\n", &mut s).unwrap();
        assert_eq!(s, "HELLO");
        assert_eq!(upper.name(), "custom");
    }
}
