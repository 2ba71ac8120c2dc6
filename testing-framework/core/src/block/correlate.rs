use devnode_core::{
    Block, BlockHash, ErrorDescriptor, EventRecord, EventValue, ExtrinsicOutcome, PendingReceipt,
    TxFamily,
};

use super::CreateBlockError;
use crate::{config::EthereumConfig, nodes::ChainConnection};

const SYSTEM: &str = "System";
const EXTRINSIC_FAILED: &str = "ExtrinsicFailed";
const DISPATCH_ERROR: &str = "dispatch_error";

/// Failure reported by `System.ExtrinsicFailed`, before metadata lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    Module {
        index: u8,
        error: u8,
        /// String form, used when the indices cannot be resolved.
        rendered: String,
    },
    Other(String),
}

/// Position of the receipt's extrinsic inside the sealed block.
#[must_use]
pub fn locate(
    receipt: &PendingReceipt,
    block: &Block,
    events: &[EventRecord],
    ethereum: &EthereumConfig,
) -> Option<u32> {
    match receipt.family() {
        TxFamily::Ethereum => events.iter().find_map(|event| {
            let index = event.phase.extrinsic_index()?;
            let hash = event
                .is(&ethereum.pallet, &ethereum.executed_event)
                .then(|| event.field_at(ethereum.hash_field))
                .flatten()?
                .as_bytes()?;
            (hash == receipt.hash().as_bytes()).then_some(index)
        }),
        TxFamily::Substrate => block.position_of(&receipt.hash()),
    }
}

/// Events emitted while applying the extrinsic at `index`, in log order.
#[must_use]
pub fn events_for(events: &[EventRecord], index: u32) -> Vec<EventRecord> {
    events
        .iter()
        .filter(|event| event.phase.extrinsic_index() == Some(index))
        .cloned()
        .collect()
}

#[must_use]
pub fn extract_failure(events: &[EventRecord]) -> Option<Failure> {
    let failed = events
        .iter()
        .find(|event| event.is(SYSTEM, EXTRINSIC_FAILED))?;
    let Some(dispatch_error) = failed.field(DISPATCH_ERROR, 0) else {
        return Some(Failure::Other(failed.to_string()));
    };

    if let EventValue::Variant { name, fields } = dispatch_error {
        if name == "Module" {
            // Newer runtimes wrap `ModuleError` in a single unnamed field.
            let module = match fields.as_slice() {
                [only] if only.name.is_none() => &only.value,
                _ => dispatch_error,
            };
            let index = module.member("index", 0).and_then(EventValue::leading_u8);
            let error = module.member("error", 1).and_then(EventValue::leading_u8);
            if let (Some(index), Some(error)) = (index, error) {
                return Some(Failure::Module {
                    index,
                    error,
                    rendered: dispatch_error.to_string(),
                });
            }
        }
    }
    Some(Failure::Other(dispatch_error.to_string()))
}

async fn resolve<C: ChainConnection>(connection: &C, failure: Failure) -> ErrorDescriptor {
    match failure {
        Failure::Module {
            index,
            error,
            rendered,
        } => match connection.module_error(index, error).await {
            Ok(Some(info)) => ErrorDescriptor::Module(info),
            Ok(None) => ErrorDescriptor::Other { name: rendered },
            Err(e) => {
                tracing::debug!(index, error, "module error lookup failed: {e}");
                ErrorDescriptor::Other { name: rendered }
            }
        },
        Failure::Other(name) => ErrorDescriptor::Other { name },
    }
}

/// Maps every receipt to its outcome in the sealed block, in input order.
pub async fn correlate<C: ChainConnection>(
    connection: &C,
    block_hash: BlockHash,
    receipts: &[PendingReceipt],
    ethereum: &EthereumConfig,
) -> Result<Vec<ExtrinsicOutcome>, CreateBlockError> {
    let fetch_failed = |source| CreateBlockError::Fetch {
        block: block_hash,
        source,
    };
    let events = connection.events_at(block_hash).await.map_err(fetch_failed)?;
    let block = connection
        .block_by_hash(block_hash)
        .await
        .map_err(fetch_failed)?;

    let mut outcomes = Vec::with_capacity(receipts.len());
    for receipt in receipts {
        let Some(index) = locate(receipt, &block, &events, ethereum) else {
            tracing::debug!(hash = %receipt.hash(), family = %receipt.family(), "receipt not found in block");
            outcomes.push(ExtrinsicOutcome {
                extrinsic: None,
                events: Vec::new(),
                error: None,
                successful: false,
                hash: receipt.hash(),
            });
            continue;
        };

        let extrinsic_events = events_for(&events, index);
        let error = match extract_failure(&extrinsic_events) {
            Some(failure) => Some(resolve(connection, failure).await),
            None => None,
        };
        outcomes.push(ExtrinsicOutcome {
            extrinsic: block.extrinsic(index).cloned(),
            events: extrinsic_events,
            successful: error.is_none(),
            error,
            hash: receipt.hash(),
        });
    }
    Ok(outcomes)
}
