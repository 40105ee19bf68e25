// market-common: Shared error classification and logging setup
// Used by market-store (library and CLI)

pub mod error;
pub mod logging;
