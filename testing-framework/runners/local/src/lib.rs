//! Runs the dev node as a local child process.

mod launcher;
mod readiness;

use devnode_testing_core::{
    nodes::{AttachLauncher, NodeLauncher},
    IS_DEBUG_MODE,
};

pub use crate::{
    launcher::{LocalLauncher, BIN_ENV, DEFAULT_BIN_PATH},
    readiness::wait_for_rpc,
};

/// Attaches to an already running node when `DEBUG_MODE=true` (forked ports
/// for forked groups, debug ports otherwise), otherwise spawns the node binary.
#[must_use]
pub fn launcher_from_env() -> Box<dyn NodeLauncher> {
    if *IS_DEBUG_MODE {
        Box::new(AttachLauncher)
    } else {
        Box::new(LocalLauncher::from_env())
    }
}
