use devnode_core::{Block, BlockHash, Header, SignedExtrinsic};
use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub peers: u64,
    pub is_syncing: bool,
    pub should_have_peers: bool,
}

/// Result of `engine_createBlock`; the import auxiliary data is ignored.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CreatedBlock {
    pub hash: BlockHash,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedBlock {
    pub block: RpcBlock,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcBlock {
    pub header: RpcHeader,
    pub extrinsics: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcHeader {
    pub parent_hash: BlockHash,
    /// Hex encoded block number.
    pub number: String,
}

impl TryFrom<RpcHeader> for Header {
    type Error = Error;

    fn try_from(header: RpcHeader) -> Result<Self, Self::Error> {
        let digits = header.number.trim_start_matches("0x");
        let number = u64::from_str_radix(digits, 16).map_err(|e| {
            devnode_core::hash::Error::InvalidHex(format!("block number {}: {e}", header.number))
        })?;
        Ok(Self {
            parent_hash: header.parent_hash,
            number,
        })
    }
}

impl TryFrom<RpcBlock> for Block {
    type Error = Error;

    fn try_from(block: RpcBlock) -> Result<Self, Self::Error> {
        let header = Header::try_from(block.header)?;
        let extrinsics = block
            .extrinsics
            .iter()
            .map(|hex| SignedExtrinsic::from_hex(hex).map(|ext| ext.bytes().to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(header, extrinsics))
    }
}
