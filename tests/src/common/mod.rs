pub mod calls;
pub mod mock;
