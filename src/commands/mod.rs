pub mod checkout;
pub mod common;
pub mod create;
pub mod list;
pub mod remove;
pub mod session;
pub mod sessions;
