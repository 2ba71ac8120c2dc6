use devnode_core::{PendingTransaction, RawTransaction, RuntimeCall, SignedExtrinsic, SubstrateTx, TxFamily};

/// Dispatch route of one pending transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classified<'a> {
    Ethereum(&'a RawTransaction),
    SubstrateSigned(&'a SignedExtrinsic),
    SubstrateUnsigned(&'a RuntimeCall),
}

impl Classified<'_> {
    #[must_use]
    pub const fn family(&self) -> TxFamily {
        match self {
            Self::Ethereum(_) => TxFamily::Ethereum,
            Self::SubstrateSigned(_) | Self::SubstrateUnsigned(_) => TxFamily::Substrate,
        }
    }

    /// Raw Ethereum transactions carry their own signature.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        !matches!(self, Self::SubstrateUnsigned(_))
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Ethereum(_) => "eth_sendRawTransaction".to_owned(),
            Self::SubstrateSigned(extrinsic) => format!("signed extrinsic {}", extrinsic.hash()),
            Self::SubstrateUnsigned(call) => call.to_string(),
        }
    }
}

#[must_use]
pub const fn classify(tx: &PendingTransaction) -> Classified<'_> {
    match tx {
        PendingTransaction::Ethereum(raw) => Classified::Ethereum(raw),
        PendingTransaction::Substrate(SubstrateTx::Signed(extrinsic)) => {
            Classified::SubstrateSigned(extrinsic)
        }
        PendingTransaction::Substrate(SubstrateTx::Unsigned(call)) => {
            Classified::SubstrateUnsigned(call)
        }
    }
}

#[cfg(test)]
mod tests {
    use devnode_core::CallArg;

    use super::*;

    #[test]
    fn raw_transactions_never_take_the_signing_path() {
        let tx = PendingTransaction::from(RawTransaction::new("0xf86c"));
        let classified = classify(&tx);
        assert_eq!(classified.family(), TxFamily::Ethereum);
        assert!(classified.is_signed());
    }

    #[test]
    fn substrate_signedness_is_taken_from_the_input() {
        let signed = PendingTransaction::from(SignedExtrinsic::from_bytes(vec![4, 0]));
        let unsigned = PendingTransaction::from(RuntimeCall::new(
            "Balances",
            "transfer_keep_alive",
            vec![CallArg::Bytes(vec![0xbe, 0xef]), CallArg::U128(10)],
        ));

        assert!(matches!(classify(&signed), Classified::SubstrateSigned(_)));
        let classified = classify(&unsigned);
        assert!(!classified.is_signed());
        assert_eq!(classified.family(), TxFamily::Substrate);
        assert_eq!(classified.label(), "Balances.transfer_keep_alive(0xbeef; 10)");

        let signed_extrinsic = SignedExtrinsic::from_bytes(vec![4, 0]);
        let label = classify(&signed).label();
        assert_eq!(label, format!("signed extrinsic {}", signed_extrinsic.hash()));
    }
}
