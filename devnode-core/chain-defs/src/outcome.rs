use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    block::{BlockCreated, ExtrinsicData},
    event::EventRecord,
    hash::TxHash,
    tx::{PendingTransaction, RawTransaction, RuntimeCall, SignedExtrinsic, SubstrateTx, TxFamily},
};

/// Acknowledgment of a dispatched transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PendingReceipt {
    family: TxFamily,
    hash: TxHash,
}

impl PendingReceipt {
    #[must_use]
    pub const fn new(family: TxFamily, hash: TxHash) -> Self {
        Self { family, hash }
    }

    #[must_use]
    pub const fn family(&self) -> TxFamily {
        self.family
    }

    #[must_use]
    pub const fn hash(&self) -> TxHash {
        self.hash
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ModuleErrorInfo {
    pub pallet: String,
    pub name: String,
    pub docs: Vec<String>,
    pub module_index: u8,
    pub error_index: u8,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorDescriptor {
    /// Module error resolved against chain metadata.
    Module(ModuleErrorInfo),
    /// String form of a failure that could not be resolved.
    Other { name: String },
}

impl ErrorDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Module(info) => &info.name,
            Self::Other { name } => name,
        }
    }

    #[must_use]
    pub fn pallet(&self) -> Option<&str> {
        match self {
            Self::Module(info) => Some(&info.pallet),
            Self::Other { .. } => None,
        }
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(info) => write!(f, "{}.{}", info.pallet, info.name),
            Self::Other { name } => f.write_str(name),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtrinsicOutcome {
    /// `None` when the receipt could not be located in the sealed block.
    pub extrinsic: Option<ExtrinsicData>,
    pub events: Vec<EventRecord>,
    pub error: Option<ErrorDescriptor>,
    pub successful: bool,
    pub hash: TxHash,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CreationResult {
    Single(ExtrinsicOutcome),
    Batch(Vec<ExtrinsicOutcome>),
}

impl CreationResult {
    #[must_use]
    pub const fn as_single(&self) -> Option<&ExtrinsicOutcome> {
        match self {
            Self::Single(outcome) => Some(outcome),
            Self::Batch(_) => None,
        }
    }

    #[must_use]
    pub fn as_batch(&self) -> Option<&[ExtrinsicOutcome]> {
        match self {
            Self::Single(_) => None,
            Self::Batch(outcomes) => Some(outcomes),
        }
    }

    #[must_use]
    pub fn outcomes(&self) -> &[ExtrinsicOutcome] {
        match self {
            Self::Single(outcome) => core::slice::from_ref(outcome),
            Self::Batch(outcomes) => outcomes,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockCreationResponse {
    pub block: BlockCreated,
    /// `None` when no transaction was submitted with the block.
    pub result: Option<CreationResult>,
}

/// Input of a block creation, preserving whether the caller passed one
/// transaction or a batch so the result can mirror it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Transactions {
    #[default]
    None,
    Single(PendingTransaction),
    Batch(Vec<PendingTransaction>),
}

impl Transactions {
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PendingTransaction] {
        match self {
            Self::None => &[],
            Self::Single(tx) => core::slice::from_ref(tx),
            Self::Batch(txs) => txs,
        }
    }
}

macro_rules! single_transaction_from {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Transactions {
                fn from(tx: $ty) -> Self {
                    Self::Single(tx.into())
                }
            }
        )+
    };
}

single_transaction_from!(
    PendingTransaction,
    RawTransaction,
    SubstrateTx,
    RuntimeCall,
    SignedExtrinsic
);

impl From<Vec<PendingTransaction>> for Transactions {
    fn from(txs: Vec<PendingTransaction>) -> Self {
        Self::Batch(txs)
    }
}
