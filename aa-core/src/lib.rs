pub mod dummy_signature;
pub mod nonce;
pub mod signers;
pub mod smart_account;
pub mod smart_session;
pub mod userop;
