//! Connection to a real dev node: JSON-RPC over HTTP for sealing, lookups and
//! pre-encoded submissions, plus a `subxt` client over ws for everything that
//! needs runtime metadata.

use std::{
    str::FromStr as _,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use devnode_core::{
    AccountId, Block, BlockHash, CallArg, EventField, EventRecord, EventValue, ModuleErrorInfo,
    Phase, RawTransaction, RuntimeCall, SignedExtrinsic, TxHash,
};
use devnode_rpc_client::RpcClient;
use subxt::{
    config::substrate::H256,
    dynamic::Value,
    ext::scale_value::{self, Composite, Primitive, ValueDef},
    OnlineClient, PolkadotConfig,
};
use subxt_signer::{sr25519::Keypair, SecretUri};
use tokio::sync::RwLock;

use super::{ChainConnection, ConnectionError, Connector, NodeEndpoint, SigningIdentity};
use crate::config::EthereumConfig;

type Api = OnlineClient<PolkadotConfig>;

pub struct DevKeypair(Keypair);

impl DevKeypair {
    #[must_use]
    pub const fn keypair(&self) -> &Keypair {
        &self.0
    }
}

impl SigningIdentity for DevKeypair {
    fn account_id(&self) -> AccountId {
        AccountId::new(self.0.public_key().0)
    }
}

pub struct SubstrateConnection {
    rpc: RpcClient,
    api: RwLock<Option<Api>>,
    closed: AtomicBool,
    ethereum: EthereumConfig,
}

impl SubstrateConnection {
    #[must_use]
    pub fn new(rpc: RpcClient, api: Api, ethereum: EthereumConfig) -> Self {
        Self {
            rpc,
            api: RwLock::new(Some(api)),
            closed: AtomicBool::new(false),
            ethereum,
        }
    }

    fn rpc(&self) -> Result<&RpcClient, ConnectionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed);
        }
        Ok(&self.rpc)
    }

    async fn api(&self) -> Result<Api, ConnectionError> {
        self.api.read().await.clone().ok_or(ConnectionError::Closed)
    }
}

#[async_trait]
impl ChainConnection for SubstrateConnection {
    type Signer = DevKeypair;

    fn derive_signer(&self, uri: &str) -> Result<Self::Signer, ConnectionError> {
        let uri = SecretUri::from_str(uri).map_err(|e| ConnectionError::Signer(e.to_string()))?;
        let keypair = Keypair::from_uri(&uri).map_err(|e| ConnectionError::Signer(e.to_string()))?;
        Ok(DevKeypair(keypair))
    }

    async fn is_ready(&self) -> Result<bool, ConnectionError> {
        let rpc = self.rpc()?;
        rpc.system_health().await?;
        // Sealing needs a best block to build on.
        Ok(rpc.get_header(None).await?.is_some())
    }

    async fn submit_signed(&self, extrinsic: &SignedExtrinsic) -> Result<TxHash, ConnectionError> {
        Ok(self.rpc()?.submit_extrinsic(extrinsic).await?)
    }

    async fn sign_and_submit(
        &self,
        call: &RuntimeCall,
        signer: &Self::Signer,
    ) -> Result<TxHash, ConnectionError> {
        let payload = subxt::dynamic::tx(
            call.pallet.as_str(),
            call.call.as_str(),
            call.args.iter().map(to_value).collect::<Vec<_>>(),
        );
        let hash = self
            .api()
            .await?
            .tx()
            .sign_and_submit_default(&payload, signer.keypair())
            .await?;
        Ok(TxHash::new(hash.0))
    }

    async fn submit_raw(&self, raw: &RawTransaction) -> Result<TxHash, ConnectionError> {
        Ok(self
            .rpc()?
            .send_raw_transaction(&self.ethereum.send_raw_method, raw)
            .await?)
    }

    async fn seal_block(
        &self,
        parent: Option<BlockHash>,
        finalize: bool,
    ) -> Result<BlockHash, ConnectionError> {
        Ok(self.rpc()?.create_block(true, finalize, parent).await?.hash)
    }

    async fn events_at(&self, block: BlockHash) -> Result<Vec<EventRecord>, ConnectionError> {
        let events = self
            .api()
            .await?
            .events()
            .at(H256::from(*block.as_bytes()))
            .await?;
        events
            .iter()
            .map(|event| {
                let event = event.map_err(subxt::Error::from)?;
                Ok(EventRecord {
                    phase: match event.phase() {
                        subxt::events::Phase::ApplyExtrinsic(index) => Phase::ApplyExtrinsic(index),
                        subxt::events::Phase::Finalization => Phase::Finalization,
                        subxt::events::Phase::Initialization => Phase::Initialization,
                    },
                    pallet: event.pallet_name().to_owned(),
                    variant: event.variant_name().to_owned(),
                    fields: from_composite(event.field_values().map_err(subxt::Error::from)?),
                })
            })
            .collect()
    }

    async fn block_by_hash(&self, block: BlockHash) -> Result<Block, ConnectionError> {
        self.rpc()?
            .get_block(block)
            .await?
            .ok_or(ConnectionError::BlockNotFound(block))
    }

    async fn module_error(
        &self,
        module_index: u8,
        error_index: u8,
    ) -> Result<Option<ModuleErrorInfo>, ConnectionError> {
        let metadata = self.api().await?.metadata();
        let Some(pallet) = metadata.pallet_by_index(module_index) else {
            return Ok(None);
        };
        Ok(pallet
            .error_variant_by_index(error_index)
            .map(|variant| ModuleErrorInfo {
                pallet: pallet.name().to_owned(),
                name: variant.name.clone(),
                docs: variant.docs.clone(),
                module_index,
                error_index,
            }))
    }

    async fn raw_receipt_visible(&self, hash: &TxHash) -> Result<bool, ConnectionError> {
        Ok(self
            .rpc()?
            .transaction_receipt(&self.ethereum.receipt_method, hash)
            .await?
            .is_some())
    }

    async fn disconnect(&self) -> Result<(), ConnectionError> {
        self.closed.store(true, Ordering::Release);
        if self.api.write().await.take().is_none() {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SubstrateConnector {
    ethereum: EthereumConfig,
}

impl SubstrateConnector {
    #[must_use]
    pub const fn new(ethereum: EthereumConfig) -> Self {
        Self { ethereum }
    }
}

#[async_trait]
impl Connector for SubstrateConnector {
    type Connection = SubstrateConnection;

    async fn connect(&self, endpoint: &NodeEndpoint) -> Result<Self::Connection, ConnectionError> {
        let rpc = RpcClient::new(endpoint.rpc_url()?);
        let api = Api::from_insecure_url(endpoint.ws_url()?.as_str()).await?;
        tracing::debug!(rpc = %rpc.url(), "connected to node");
        Ok(SubstrateConnection::new(rpc, api, self.ethereum.clone()))
    }
}

fn to_value(arg: &CallArg) -> Value {
    match arg {
        CallArg::Bool(b) => Value::bool(*b),
        CallArg::U128(n) => Value::u128(*n),
        CallArg::I128(n) => Value::i128(*n),
        CallArg::Str(s) => Value::string(s.clone()),
        CallArg::Bytes(bytes) => Value::from_bytes(bytes),
        CallArg::Composite(items) => Value::unnamed_composite(items.iter().map(to_value)),
        CallArg::Named(items) => Value::named_composite(
            items
                .iter()
                .map(|(name, value)| (name.clone(), to_value(value))),
        ),
        CallArg::Variant { name, fields } => {
            Value::unnamed_variant(name.clone(), fields.iter().map(to_value))
        }
    }
}

fn from_composite<T>(composite: Composite<T>) -> Vec<EventField> {
    match composite {
        Composite::Named(fields) => fields
            .into_iter()
            .map(|(name, value)| EventField::named(name, from_value(value)))
            .collect(),
        Composite::Unnamed(values) => values
            .into_iter()
            .map(|value| EventField::unnamed(from_value(value)))
            .collect(),
    }
}

fn from_value<T>(value: scale_value::Value<T>) -> EventValue {
    match value.value {
        ValueDef::Composite(composite) => EventValue::Composite(from_composite(composite)),
        ValueDef::Variant(variant) => EventValue::Variant {
            name: variant.name,
            fields: from_composite(variant.values),
        },
        ValueDef::BitSequence(bits) => EventValue::Str(format!("{bits:?}")),
        ValueDef::Primitive(primitive) => match primitive {
            Primitive::Bool(b) => EventValue::Bool(b),
            Primitive::Char(c) => EventValue::Char(c),
            Primitive::String(s) => EventValue::Str(s),
            Primitive::U128(n) => EventValue::U128(n),
            Primitive::I128(n) => EventValue::I128(n),
            Primitive::U256(bytes) | Primitive::I256(bytes) => EventValue::Bytes(bytes.to_vec()),
        },
    }
}
