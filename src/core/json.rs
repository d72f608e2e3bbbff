//! Serde helpers for the node's JSON conventions

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cid::Cid;
use fvm_ipld_encoding::BytesDe;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Bytes as base64, with `null` standing in for empty
pub mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if bytes.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.serialize_str(&STANDARD.encode(bytes))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Vec::new()),
            Some(s) => STANDARD.decode(s).map_err(de::Error::custom),
        }
    }
}

/// A CBOR byte string that reads as base64 in JSON
pub mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            STANDARD.decode(s).map_err(de::Error::custom)
        } else {
            let BytesDe(bytes) = BytesDe::deserialize(deserializer)?;
            Ok(bytes)
        }
    }
}

/// A CID in the `{"/": "bafy..."}` link form
pub mod cid_link {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Link {
        #[serde(rename = "/")]
        root: String,
    }

    pub fn serialize<S: Serializer>(cid: &Cid, serializer: S) -> Result<S::Ok, S::Error> {
        Link {
            root: cid.to_string(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cid, D::Error> {
        let link = Link::deserialize(deserializer)?;
        Cid::try_from(link.root.as_str()).map_err(de::Error::custom)
    }
}

/// Treats an explicit `null` like a missing value
pub fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
