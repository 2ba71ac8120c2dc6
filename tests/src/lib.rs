pub mod common;

pub use devnode_testing_core::{adjust_timeout, logging::init_test_tracing, IS_DEBUG_MODE};
