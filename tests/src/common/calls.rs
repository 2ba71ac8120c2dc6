use devnode_core::{AccountId, CallArg, RuntimeCall};

pub const BALANCES: &str = "Balances";
pub const TRANSFER: &str = "transfer_allow_death";

#[must_use]
pub fn transfer(dest: &AccountId, amount: u128) -> RuntimeCall {
    RuntimeCall::new(
        BALANCES,
        TRANSFER,
        vec![CallArg::address(dest), CallArg::U128(amount)],
    )
}

#[must_use]
pub fn remark(payload: &[u8]) -> RuntimeCall {
    RuntimeCall::new("System", "remark", vec![CallArg::Bytes(payload.to_vec())])
}
