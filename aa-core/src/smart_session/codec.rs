use alloy::{
    primitives::{B256, Bytes},
    sol_types::SolValue,
};
use wallet_aa_types::smart_sessions::EnableSession;

use super::{
    AccountType, EnableSessionData, SmartSessionError, SmartSessionMode, SmartSessionSignature,
    decode_permission_enable_sig, encode_permission_enable_sig,
};

const HEADER_LEN: usize = 1 + 32;

fn compress(payload: &[u8]) -> Result<Vec<u8>, SmartSessionError> {
    let mut compress_state = fastlz_rs::CompressState::new();
    compress_state
        .compress_to_vec(payload, fastlz_rs::CompressionLevel::Default)
        .map_err(|e| SmartSessionError::Compression {
            message: e.to_string(),
        })
}

fn decompress(compressed: &[u8]) -> Result<Vec<u8>, SmartSessionError> {
    fastlz_rs::decompress_to_vec(compressed, None).map_err(|e| SmartSessionError::Decompression {
        message: e.to_string(),
    })
}

/// `mode ∥ permissionId ∥ flz(payload)` where the payload is `abi.encode(bytes signature)` for
/// USE and `abi.encode(EnableSession, bytes signature)` for the enable modes.
pub fn encode_smart_session_signature(
    signature: &SmartSessionSignature,
) -> Result<Bytes, SmartSessionError> {
    let payload = match (signature.mode, &signature.enable_session_data) {
        (SmartSessionMode::Use, None) => signature.signature.abi_encode(),
        (SmartSessionMode::Enable | SmartSessionMode::UnsafeEnable, Some(data)) => {
            let enable_session = EnableSession {
                permissionEnableSig: encode_permission_enable_sig(
                    data.account_type,
                    data.validator,
                    &data.enable_session.permissionEnableSig,
                ),
                ..data.enable_session.clone()
            };
            (enable_session, signature.signature.clone()).abi_encode_params()
        }
        (mode, _) => return Err(SmartSessionError::EnableDataMismatch { mode }),
    };

    let compressed = compress(&payload)?;

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.push(signature.mode.as_byte());
    out.extend_from_slice(signature.permission_id.as_slice());
    out.extend_from_slice(&compressed);
    Ok(out.into())
}

/// Inverse of [`encode_smart_session_signature`].
///
/// `account_type` disambiguates the untagged `permissionEnableSig` framing; it is not
/// consulted for USE signatures.
pub fn decode_smart_session_signature(
    data: &[u8],
    account_type: Option<AccountType>,
) -> Result<SmartSessionSignature, SmartSessionError> {
    if data.len() < HEADER_LEN {
        return Err(SmartSessionError::TooShort {
            what: "smart session signature",
            needed: HEADER_LEN,
            actual: data.len(),
        });
    }

    let mode = SmartSessionMode::try_from(data[0])?;
    let permission_id = B256::from_slice(&data[1..HEADER_LEN]);
    let payload = decompress(&data[HEADER_LEN..])?;

    match mode {
        SmartSessionMode::Use => {
            let signature =
                Bytes::abi_decode(&payload).map_err(|e| SmartSessionError::AbiDecode {
                    message: e.to_string(),
                })?;
            Ok(SmartSessionSignature::use_session(permission_id, signature))
        }
        SmartSessionMode::Enable | SmartSessionMode::UnsafeEnable => {
            let (mut enable_session, signature) =
                <(EnableSession, Bytes)>::abi_decode_params(&payload).map_err(|e| {
                    SmartSessionError::AbiDecode {
                        message: e.to_string(),
                    }
                })?;

            let (account_type, validator, enable_sig) =
                decode_permission_enable_sig(&enable_session.permissionEnableSig, account_type)?;
            enable_session.permissionEnableSig = enable_sig;

            SmartSessionSignature::enable_session(
                mode,
                permission_id,
                signature,
                EnableSessionData {
                    enable_session,
                    validator,
                    account_type,
                },
            )
        }
    }
}
