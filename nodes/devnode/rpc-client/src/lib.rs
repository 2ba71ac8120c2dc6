//! JSON-RPC over HTTP client for the dev node's `--rpc-port`.

pub mod types;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use devnode_core::{Block, BlockHash, Header, RawTransaction, SignedExtrinsic, TxHash};
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

pub use crate::types::{CreatedBlock, Health, RpcBlock, RpcHeader, SignedBlock};

pub const SYSTEM_HEALTH: &str = "system_health";
pub const ENGINE_CREATE_BLOCK: &str = "engine_createBlock";
pub const CHAIN_GET_BLOCK: &str = "chain_getBlock";
pub const CHAIN_GET_HEADER: &str = "chain_getHeader";
pub const AUTHOR_SUBMIT_EXTRINSIC: &str = "author_submitExtrinsic";
pub const ETH_SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";
pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("{method} returned an undecodable result: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    InvalidHex(#[from] devnode_core::hash::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    result: Value,
    error: Option<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

#[derive(Clone)]
pub struct RpcClient {
    url: Url,
    client: Client,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self::new_with_client(Client::new(), url)
    }

    #[must_use]
    pub fn new_with_client(client: Client, url: Url) -> Self {
        Self {
            url,
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn from_port(host: &str, port: u16) -> Result<Self, Error> {
        Ok(Self::new(Url::parse(&format!("http://{host}:{port}"))?))
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    pub async fn request<R>(&self, method: &str, params: Value) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        tracing::trace!(method, id = request.id, "rpc request");

        let response: Response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(Error::Rpc {
                method: method.to_owned(),
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(response.result).map_err(|source| Error::Decode {
            method: method.to_owned(),
            source,
        })
    }

    pub async fn system_health(&self) -> Result<Health, Error> {
        self.request(SYSTEM_HEALTH, json!([])).await
    }

    /// Seals one block out of the current pool via manual seal.
    pub async fn create_block(
        &self,
        create_empty: bool,
        finalize: bool,
        parent_hash: Option<BlockHash>,
    ) -> Result<CreatedBlock, Error> {
        let mut params = vec![json!(create_empty), json!(finalize)];
        if let Some(parent) = parent_hash {
            params.push(json!(parent));
        }
        self.request(ENGINE_CREATE_BLOCK, Value::Array(params)).await
    }

    pub async fn get_block(&self, hash: BlockHash) -> Result<Option<Block>, Error> {
        let block: Option<SignedBlock> = self.request(CHAIN_GET_BLOCK, json!([hash])).await?;
        block.map(|signed| Block::try_from(signed.block)).transpose()
    }

    pub async fn get_header(&self, hash: Option<BlockHash>) -> Result<Option<Header>, Error> {
        let params = hash.map_or_else(|| json!([]), |hash| json!([hash]));
        let header: Option<RpcHeader> = self.request(CHAIN_GET_HEADER, params).await?;
        header.map(Header::try_from).transpose()
    }

    pub async fn submit_extrinsic(&self, extrinsic: &SignedExtrinsic) -> Result<TxHash, Error> {
        self.request(AUTHOR_SUBMIT_EXTRINSIC, json!([extrinsic.to_hex()]))
            .await
    }

    pub async fn send_raw_transaction(
        &self,
        method: &str,
        raw: &RawTransaction,
    ) -> Result<TxHash, Error> {
        self.request(method, json!([raw.as_str()])).await
    }

    /// `None` until the node has indexed the receipt.
    pub async fn transaction_receipt(
        &self,
        method: &str,
        hash: &TxHash,
    ) -> Result<Option<Value>, Error> {
        self.request(method, json!([hash])).await
    }
}
