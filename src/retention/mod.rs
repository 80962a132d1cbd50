//! Output cache retention: policy config, filename classification,
//! persisted accounting, and the cleanup manager.

pub mod classify;
pub mod manager;
pub mod policy;
pub mod state;
