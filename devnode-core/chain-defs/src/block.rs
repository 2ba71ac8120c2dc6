use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hash::{blake2_256, BlockHash, TxHash};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub parent_hash: BlockHash,
    pub number: u64,
}

/// Block body as stored by the node, extrinsics in inclusion order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub extrinsics: Vec<ExtrinsicData>,
}

impl Block {
    #[must_use]
    pub fn new(header: Header, encoded_extrinsics: Vec<Vec<u8>>) -> Self {
        let extrinsics = encoded_extrinsics
            .into_iter()
            .enumerate()
            .map(|(index, bytes)| ExtrinsicData::new(index as u32, bytes))
            .collect();
        Self { header, extrinsics }
    }

    #[must_use]
    pub fn position_of(&self, hash: &TxHash) -> Option<u32> {
        self.extrinsics
            .iter()
            .find(|extrinsic| &extrinsic.hash == hash)
            .map(|extrinsic| extrinsic.index)
    }

    #[must_use]
    pub fn extrinsic(&self, index: u32) -> Option<&ExtrinsicData> {
        self.extrinsics.get(index as usize)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExtrinsicData {
    pub index: u32,
    pub hash: TxHash,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl ExtrinsicData {
    #[must_use]
    pub fn new(index: u32, bytes: Vec<u8>) -> Self {
        Self {
            index,
            hash: blake2_256(&bytes).into(),
            bytes,
        }
    }
}

/// Identity of a block sealed on demand, with how long sealing took.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockCreated {
    pub hash: BlockHash,
    pub duration: Duration,
}

mod hex_bytes {
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&const_hex::encode_prefixed(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        const_hex::decode(s).map_err(serde::de::Error::custom)
    }
}
