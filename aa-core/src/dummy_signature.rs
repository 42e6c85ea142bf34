//! Placeholder signatures with the same ABI shape as real session signatures, so that
//! gas estimation sees representative calldata before anything is signed.

use alloy::{
    hex,
    primitives::{Address, Bytes, U256, bytes},
    sol_types::SolValue,
};
use wallet_core::{chain::Chain, error::WalletError};

use crate::{
    signers::{Signer, SignerCodecError, decode_signers},
    smart_session::{SessionSignatureFormatter, SmartSessionError, SmartSessionSignature},
};

/// 65-byte `r ∥ s ∥ v` placeholder.
pub const DUMMY_ECDSA_SIGNATURE: Bytes = bytes!(
    "e8b94748580ca0b4993c9a1b86b5be851bfc076ff5ce3a1ff65bf16392acfcb800f9b4f1aef1555c7fce5599fffb17e7c635502154a0333ba21f3ae491839af51c"
);

const DUMMY_AUTHENTICATOR_DATA: [u8; 37] =
    hex!("49960de5880e8c687434170f6476605b8fe4aeb9a28632c7995cf3ba831d97630500000000");

const DUMMY_CLIENT_DATA_JSON: &str = r#"{"type":"webauthn.get","challenge":"tbxXNFS9X_4Byr1cMwqKrIGB-_30a0QhZ6y7ucM0BOE","origin":"http://localhost:3000","crossOrigin":false}"#;

/// Index of `"type":"webauthn.get"` in the client data.
const DUMMY_RESPONSE_TYPE_LOCATION: u64 = 1;

/// WebAuthn assertion placeholder:
/// `abi.encode(authenticatorData, clientDataJSON, responseTypeLocation, r, s, usePrecompiled)`.
pub fn dummy_passkey_signature() -> Bytes {
    (
        Bytes::from(DUMMY_AUTHENTICATOR_DATA),
        DUMMY_CLIENT_DATA_JSON.to_string(),
        U256::from(DUMMY_RESPONSE_TYPE_LOCATION),
        U256::from_be_bytes(hex!(
            "ccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc1"
        )),
        U256::from_be_bytes(hex!(
            "7ccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc01"
        )),
        false,
    )
        .abi_encode_params()
        .into()
}

fn dummy_for(signer: &Signer) -> Bytes {
    match signer {
        Signer::Ecdsa { .. } => DUMMY_ECDSA_SIGNATURE,
        Signer::Passkey { .. } => dummy_passkey_signature(),
    }
}

/// `abi.encode(bytes[])` with one placeholder per signer in `session_validator_init_data`.
pub fn dummy_signer_signatures(session_validator_init_data: &[u8]) -> Result<Bytes, SignerCodecError> {
    let signatures = decode_signers(session_validator_init_data)?
        .iter()
        .map(dummy_for)
        .collect::<Vec<_>>();
    Ok(signatures.abi_encode().into())
}

pub struct DummySignatureBuilder<'a, C: Chain> {
    formatter: SessionSignatureFormatter<'a, C>,
}

impl<'a, C: Chain> DummySignatureBuilder<'a, C> {
    pub fn new(chain: &'a C, smart_sessions: Address) -> Self {
        Self {
            formatter: SessionSignatureFormatter::new(chain, smart_sessions),
        }
    }

    /// Dummy signature for `session`, wrapped exactly like the final signature will be.
    pub async fn build(
        &self,
        account: Address,
        session: &SmartSessionSignature,
    ) -> Result<Bytes, WalletError> {
        let enable_data = session
            .enable_session_data
            .as_ref()
            .ok_or(SmartSessionError::MissingEnableSessionData)?;

        let placeholder = dummy_signer_signatures(
            &enable_data
                .enable_session
                .sessionToEnable
                .sessionValidatorInitData,
        )
        .map_err(SmartSessionError::from)?;

        self.formatter.format(account, session, placeholder).await
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256};

    use super::*;
    use crate::signers::encode_signers;

    fn ecdsa() -> Signer {
        Signer::Ecdsa {
            address: Address::repeat_byte(0x01),
        }
    }

    fn passkey() -> Signer {
        Signer::Passkey {
            x: B256::repeat_byte(0x02),
            y: B256::repeat_byte(0x03),
        }
    }

    #[test]
    fn placeholders_follow_signer_order() {
        let init_data = encode_signers(&[passkey(), ecdsa()]).unwrap();
        let encoded = dummy_signer_signatures(&init_data).unwrap();
        let decoded = Vec::<Bytes>::abi_decode(&encoded).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], dummy_passkey_signature());
        assert_eq!(decoded[1], DUMMY_ECDSA_SIGNATURE);
        assert_eq!(DUMMY_ECDSA_SIGNATURE.len(), 65);
    }

    #[test]
    fn length_is_stable_for_a_signer_shape() {
        let first = encode_signers(&[ecdsa(), passkey()]).unwrap();
        let second = encode_signers(&[
            Signer::Ecdsa {
                address: Address::repeat_byte(0xfe),
            },
            Signer::Passkey {
                x: B256::repeat_byte(0xfd),
                y: B256::repeat_byte(0xfc),
            },
        ])
        .unwrap();
        let a = dummy_signer_signatures(&first).unwrap();
        let b = dummy_signer_signatures(&second).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a, dummy_signer_signatures(&first).unwrap());
    }

    #[test]
    fn passkey_placeholder_is_webauthn_shaped() {
        let (auth_data, client_data, type_location, _r, _s, precompile) =
            <(Bytes, String, U256, U256, U256, bool)>::abi_decode_params(
                &dummy_passkey_signature(),
            )
            .unwrap();
        assert_eq!(auth_data.len(), 37);
        assert!(client_data.contains("webauthn.get"));
        assert_eq!(type_location, U256::from(1));
        assert!(!precompile);
    }

    #[test]
    fn malformed_init_data_is_rejected() {
        assert!(matches!(
            dummy_signer_signatures(&[1, 9]),
            Err(SignerCodecError::UnknownSignerType { signer_type: 9, .. })
        ));
    }
}
