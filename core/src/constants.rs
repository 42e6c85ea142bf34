use alloy::primitives::{Address, address};

pub const ENTRYPOINT_ADDRESS_V0_7: Address =
    address!("0x0000000071727de22e5e9d8baf0edac6f37da032");

/// Smart Sessions validator module
pub const SMART_SESSIONS_ADDRESS: Address =
    address!("0x82e5e20582d976f5db5e36c5a72c70d5711cef8b");

pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_BUNDLER_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_COSIGNER_TIMEOUT_SECS: u64 = 10;
