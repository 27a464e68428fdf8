//! Serde support: addresses as `cdt1` strings, hashes as lowercase hex.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::identity::{address_from_string, address_to_string};
use crate::{Address, Hash};

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address_to_string(self))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        address_from_string(&s).map_err(D::Error::custom)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::{module_address, tagged_hash, Address, Hash, DOMAIN_MODULE};

    #[test]
    fn test_address_json() {
        let address = module_address("service_tax");
        let json = serde_json::to_string(&address).unwrap();
        assert!(json.starts_with("\"cdt1"));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_hash_json() {
        let hash = tagged_hash(DOMAIN_MODULE, &[b"x"]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json.len(), 66);
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_bad_address_rejected() {
        assert!(serde_json::from_str::<Address>("\"ndl1abc\"").is_err());
    }
}
