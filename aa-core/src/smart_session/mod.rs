//! Smart Sessions permission context handling.
//!
//! A permission context is `validator(20) ∥ smart session signature`, and the smart session
//! signature itself is `mode(1) ∥ permissionId(32) ∥ flz(abi payload)`.

mod codec;
mod context;
mod enable_sig;
mod format;

use alloy::primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wallet_aa_types::smart_sessions::EnableSession;
use wallet_core::error::WalletError;

use crate::signers::SignerCodecError;

pub use codec::{decode_smart_session_signature, encode_smart_session_signature};
pub use context::PermissionContext;
pub use enable_sig::{decode_permission_enable_sig, encode_permission_enable_sig};
pub use format::{SessionSignatureFormatter, encode_for_session_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SmartSessionMode {
    Use = 0x00,
    Enable = 0x01,
    UnsafeEnable = 0x02,
}

impl SmartSessionMode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SmartSessionMode {
    type Error = SmartSessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Use),
            0x01 => Ok(Self::Enable),
            0x02 => Ok(Self::UnsafeEnable),
            mode => Err(SmartSessionError::UnknownMode { mode }),
        }
    }
}

/// Smart account flavours, which differ in how `permissionEnableSig` names its validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "erc7579-implementation")]
    Erc7579Implementation,

    #[serde(rename = "kernel")]
    Kernel,

    #[serde(rename = "safe")]
    Safe,

    #[serde(rename = "nexus")]
    Nexus,
}

/// A decoded enable-session payload.
///
/// `enable_session.permissionEnableSig` holds the bare signature; the validator and the
/// account-type specific framing are kept separately and restored on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableSessionData {
    pub enable_session: EnableSession,
    pub validator: Address,
    pub account_type: AccountType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartSessionSignature {
    pub mode: SmartSessionMode,
    pub permission_id: B256,
    pub signature: Bytes,
    /// Present iff `mode` is not [`SmartSessionMode::Use`].
    pub enable_session_data: Option<EnableSessionData>,
}

impl SmartSessionSignature {
    pub fn use_session(permission_id: B256, signature: Bytes) -> Self {
        Self {
            mode: SmartSessionMode::Use,
            permission_id,
            signature,
            enable_session_data: None,
        }
    }

    pub fn enable_session(
        mode: SmartSessionMode,
        permission_id: B256,
        signature: Bytes,
        enable_session_data: EnableSessionData,
    ) -> Result<Self, SmartSessionError> {
        if mode == SmartSessionMode::Use {
            return Err(SmartSessionError::EnableDataMismatch { mode });
        }
        Ok(Self {
            mode,
            permission_id,
            signature,
            enable_session_data: Some(enable_session_data),
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmartSessionError {
    #[error("unknown smart session mode {mode:#04x}")]
    UnknownMode { mode: u8 },

    #[error("enable session data must be present iff mode is not USE (mode {mode:?})")]
    EnableDataMismatch { mode: SmartSessionMode },

    #[error("{what} is too short: need {needed} bytes, got {actual}")]
    TooShort {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("failed to decompress session payload: {message}")]
    Decompression { message: String },

    #[error("failed to compress session payload: {message}")]
    Compression { message: String },

    #[error("failed to ABI decode session payload: {message}")]
    AbiDecode { message: String },

    #[error("permissionEnableSig is untagged but account type is kernel")]
    KernelSigNotTagged,

    #[error("cannot tell which account convention permissionEnableSig uses")]
    UnresolvedAccountType,

    #[error("permission context is {actual} bytes, shorter than a validator address")]
    ContextTooShort { actual: usize },

    #[error("permission context validator {actual} does not match smart sessions module {expected}")]
    ValidatorMismatch { expected: Address, actual: Address },

    #[error("USE-mode permission context carries no session to derive signers from")]
    MissingEnableSessionData,

    #[error("session validator init data: {0}")]
    Signers(#[from] SignerCodecError),
}

impl From<SmartSessionError> for WalletError {
    fn from(error: SmartSessionError) -> Self {
        match error {
            SmartSessionError::ValidatorMismatch { .. } | SmartSessionError::ContextTooShort { .. } => {
                WalletError::InvalidPermissionContext {
                    message: error.to_string(),
                }
            }
            other => WalletError::EncodingError {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use alloy::primitives::{Address, B256, Bytes, FixedBytes, address, b256};
    use wallet_aa_types::smart_sessions::{
        ActionData, ChainDigest, ERC7739Data, EnableSession, PolicyData, Session,
    };

    use super::*;
    use crate::signers::{Signer, encode_signers};

    pub const MULTI_KEY_VALIDATOR: Address = address!("0x207b90941d9cff79A750C1E5c05dDaA17eA01B9F");
    pub const OWNER_VALIDATOR: Address = address!("0x2483DA3A338895199E5e538530213157e931Bf06");

    fn policy(byte: u8, data: &[u8]) -> PolicyData {
        PolicyData {
            policy: Address::repeat_byte(byte),
            initData: Bytes::copy_from_slice(data),
        }
    }

    pub fn session(signers: &[Signer]) -> Session {
        Session {
            sessionValidator: MULTI_KEY_VALIDATOR,
            sessionValidatorInitData: encode_signers(signers).unwrap(),
            salt: B256::repeat_byte(0x5a),
            // deliberately unsorted
            userOpPolicies: vec![policy(0x33, &[3]), policy(0x11, &[1, 1])],
            erc7739Policies: ERC7739Data {
                allowedERC7739Content: vec!["Permit".to_string()],
                erc1271Policies: vec![policy(0x44, &[])],
            },
            actions: vec![
                ActionData {
                    actionTargetSelector: FixedBytes::from([0xa9, 0x05, 0x9c, 0xbb]),
                    actionTarget: Address::repeat_byte(0x77),
                    actionPolicies: vec![policy(0x99, &[9]), policy(0x22, &[2, 2])],
                },
                ActionData {
                    actionTargetSelector: FixedBytes::from([0x09, 0x5e, 0xa7, 0xb3]),
                    actionTarget: Address::repeat_byte(0x66),
                    actionPolicies: vec![],
                },
            ],
        }
    }

    pub fn enable_data(signers: &[Signer], account_type: AccountType) -> EnableSessionData {
        EnableSessionData {
            enable_session: EnableSession {
                chainDigestIndex: 1,
                hashesAndChainIds: vec![
                    ChainDigest {
                        chainId: 1,
                        sessionDigest: b256!(
                            "0x0101010101010101010101010101010101010101010101010101010101010101"
                        ),
                    },
                    ChainDigest {
                        chainId: 8453,
                        sessionDigest: b256!(
                            "0x0202020202020202020202020202020202020202020202020202020202020202"
                        ),
                    },
                ],
                sessionToEnable: session(signers),
                permissionEnableSig: Bytes::from(vec![0xee; 65]),
            },
            validator: OWNER_VALIDATOR,
            account_type,
        }
    }

    pub fn two_signers() -> Vec<Signer> {
        vec![
            Signer::Ecdsa {
                address: address!("0x1111111111111111111111111111111111111111"),
            },
            Signer::Passkey {
                x: B256::repeat_byte(0x0a),
                y: B256::repeat_byte(0x0b),
            },
        ]
    }
}
