pub mod channel;
pub mod config;
pub mod fibonacci;
pub mod job;
pub mod logging;
pub mod retry;
pub mod stopper;
pub mod store;
pub mod test_utils;
pub mod worker;
