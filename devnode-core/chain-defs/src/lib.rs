pub mod block;
pub mod event;
pub mod hash;
pub mod outcome;
pub mod tx;

pub use block::{Block, BlockCreated, ExtrinsicData, Header};
pub use event::{EventField, EventRecord, EventValue, Phase};
pub use hash::{AccountId, BlockHash, TxHash};
pub use outcome::{
    BlockCreationResponse, CreationResult, ErrorDescriptor, ExtrinsicOutcome, ModuleErrorInfo,
    PendingReceipt, Transactions,
};
pub use tx::{
    CallArg, PendingTransaction, RawTransaction, RuntimeCall, SignedExtrinsic, SubstrateTx,
    TxFamily,
};
