//! CBOR encoding of stored records.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Encode a record as CBOR.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| StoreError::codec(e.to_string()))?;
    Ok(buf)
}

/// Decode a CBOR record.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| StoreError::codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::{Coins, ServiceParams};

    #[test]
    fn test_record_roundtrip() {
        let params = ServiceParams::default().with_min_deposit_multiple(3);
        let bytes = encode(&params).unwrap();
        let back: ServiceParams = decode(&bytes).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode::<Coins>(&[0xff, 0x00]),
            Err(StoreError::Codec(_))
        ));
    }
}
