use core::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::AccountId;

/// Transaction families accepted by the dev node. Each family has its own
/// wire format, hash and inclusion signal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxFamily {
    /// Pre-encoded Ethereum-style raw transaction.
    Ethereum,
    /// Native substrate extrinsic.
    Substrate,
}

impl TxFamily {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ethereum => "eth",
            Self::Substrate => "sub",
        }
    }
}

impl fmt::Display for TxFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A transaction waiting to be dispatched by the block producer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PendingTransaction {
    Ethereum(RawTransaction),
    Substrate(SubstrateTx),
}

impl PendingTransaction {
    #[must_use]
    pub const fn family(&self) -> TxFamily {
        match self {
            Self::Ethereum(_) => TxFamily::Ethereum,
            Self::Substrate(_) => TxFamily::Substrate,
        }
    }
}

impl From<RawTransaction> for PendingTransaction {
    fn from(tx: RawTransaction) -> Self {
        Self::Ethereum(tx)
    }
}

impl From<SubstrateTx> for PendingTransaction {
    fn from(tx: SubstrateTx) -> Self {
        Self::Substrate(tx)
    }
}

impl From<RuntimeCall> for PendingTransaction {
    fn from(call: RuntimeCall) -> Self {
        Self::Substrate(SubstrateTx::Unsigned(call))
    }
}

impl From<SignedExtrinsic> for PendingTransaction {
    fn from(extrinsic: SignedExtrinsic) -> Self {
        Self::Substrate(SubstrateTx::Signed(extrinsic))
    }
}

/// Opaque hex string of a fully formed Ethereum-style transaction.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTransaction(String);

impl RawTransaction {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubstrateTx {
    /// Carries its own signature and is dispatched as is.
    Signed(SignedExtrinsic),
    /// Signed by the harness identity right before dispatch.
    Unsigned(RuntimeCall),
}

impl SubstrateTx {
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Signed(_))
    }
}

/// SCALE encoded extrinsic, including its compact length prefix.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SignedExtrinsic {
    bytes: Vec<u8>,
}

impl SignedExtrinsic {
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn from_hex(hex: &str) -> Result<Self, crate::hash::Error> {
        const_hex::decode(hex)
            .map(Self::from_bytes)
            .map_err(|e| crate::hash::Error::InvalidHex(e.to_string()))
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        const_hex::encode_prefixed(&self.bytes)
    }

    /// The hash the node reports for this extrinsic once included.
    #[must_use]
    pub fn hash(&self) -> crate::hash::TxHash {
        crate::hash::blake2_256(&self.bytes).into()
    }
}

/// Runtime call described by pallet, call name and argument tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RuntimeCall {
    pub pallet: String,
    pub call: String,
    pub args: Vec<CallArg>,
}

impl RuntimeCall {
    #[must_use]
    pub fn new(pallet: impl Into<String>, call: impl Into<String>, args: Vec<CallArg>) -> Self {
        Self {
            pallet: pallet.into(),
            call: call.into(),
            args,
        }
    }
}

impl fmt::Display for RuntimeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.pallet, self.call)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallArg {
    Bool(bool),
    U128(u128),
    I128(i128),
    Str(String),
    Bytes(Vec<u8>),
    Composite(Vec<CallArg>),
    Named(Vec<(String, CallArg)>),
    Variant { name: String, fields: Vec<CallArg> },
}

impl CallArg {
    /// `MultiAddress::Id(account)`, the address form most pallets take.
    #[must_use]
    pub fn address(account: &AccountId) -> Self {
        Self::Variant {
            name: "Id".to_owned(),
            fields: vec![Self::Bytes(account.as_bytes().to_vec())],
        }
    }
}

impl From<u128> for CallArg {
    fn from(value: u128) -> Self {
        Self::U128(value)
    }
}

impl From<bool> for CallArg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::U128(v) => write!(f, "{v}"),
            Self::I128(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => f.write_str(&const_hex::encode_prefixed(v)),
            Self::Composite(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Named(items) => {
                f.write_str("{ ")?;
                for (i, (name, item)) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {item}")?;
                }
                f.write_str(" }")
            }
            Self::Variant { name, fields } => {
                f.write_str(name)?;
                if fields.is_empty() {
                    return Ok(());
                }
                write!(f, "{}", Self::Composite(fields.clone()))
            }
        }
    }
}
