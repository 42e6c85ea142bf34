//! Dense encoding of the multi-key session validator's signer list.
//!
//! Layout: `count:u8` then, per signer, `type:u8 ∥ payload` where type `0` is an
//! ECDSA address (20 bytes) and type `1` is a P-256 passkey point `x ∥ y` (64 bytes).

use alloy::primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ECDSA_TYPE: u8 = 0;
const PASSKEY_TYPE: u8 = 1;
const ECDSA_LEN: usize = 20;
const PASSKEY_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Signer {
    Ecdsa { address: Address },
    Passkey { x: B256, y: B256 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKind {
    Ecdsa,
    Passkey,
}

impl Signer {
    pub fn kind(&self) -> SignerKind {
        match self {
            Signer::Ecdsa { .. } => SignerKind::Ecdsa,
            Signer::Passkey { .. } => SignerKind::Passkey,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignerCodecError {
    #[error("at most 255 signers can be encoded, got {count}")]
    TooManySigners { count: usize },

    #[error("signer data is empty")]
    Empty,

    #[error("unknown signer type {signer_type} at index {index}")]
    UnknownSignerType { signer_type: u8, index: usize },

    #[error("signer {index} is truncated: expected {expected} bytes, {available} available")]
    Truncated {
        index: usize,
        expected: usize,
        available: usize,
    },

    #[error("{count} trailing bytes after the last signer")]
    TrailingBytes { count: usize },
}

pub fn encode_signers(signers: &[Signer]) -> Result<Bytes, SignerCodecError> {
    let count = u8::try_from(signers.len()).map_err(|_| SignerCodecError::TooManySigners {
        count: signers.len(),
    })?;

    let mut out = Vec::with_capacity(1 + signers.len() * (1 + PASSKEY_LEN));
    out.push(count);
    for signer in signers {
        match signer {
            Signer::Ecdsa { address } => {
                out.push(ECDSA_TYPE);
                out.extend_from_slice(address.as_slice());
            }
            Signer::Passkey { x, y } => {
                out.push(PASSKEY_TYPE);
                out.extend_from_slice(x.as_slice());
                out.extend_from_slice(y.as_slice());
            }
        }
    }
    Ok(out.into())
}

pub fn decode_signers(data: &[u8]) -> Result<Vec<Signer>, SignerCodecError> {
    let (&count, mut rest) = data.split_first().ok_or(SignerCodecError::Empty)?;

    let mut signers = Vec::with_capacity(count as usize);
    for index in 0..count as usize {
        let (&signer_type, tail) = rest.split_first().ok_or(SignerCodecError::Truncated {
            index,
            expected: 1,
            available: 0,
        })?;

        let expected = match signer_type {
            ECDSA_TYPE => ECDSA_LEN,
            PASSKEY_TYPE => PASSKEY_LEN,
            _ => return Err(SignerCodecError::UnknownSignerType { signer_type, index }),
        };

        let (payload, tail) = tail
            .split_at_checked(expected)
            .ok_or(SignerCodecError::Truncated {
                index,
                expected,
                available: tail.len(),
            })?;

        signers.push(match signer_type {
            ECDSA_TYPE => Signer::Ecdsa {
                address: Address::from_slice(payload),
            },
            _ => Signer::Passkey {
                x: B256::from_slice(&payload[..32]),
                y: B256::from_slice(&payload[32..]),
            },
        });
        rest = tail;
    }

    if !rest.is_empty() {
        return Err(SignerCodecError::TrailingBytes { count: rest.len() });
    }

    Ok(signers)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};

    use super::*;

    fn passkey() -> Signer {
        Signer::Passkey {
            x: b256!("0x1111111111111111111111111111111111111111111111111111111111111111"),
            y: b256!("0x2222222222222222222222222222222222222222222222222222222222222222"),
        }
    }

    fn ecdsa() -> Signer {
        Signer::Ecdsa {
            address: address!("0xabababababababababababababababababababab"),
        }
    }

    #[test]
    fn mixed_signers_keep_their_order() {
        let signers = vec![passkey(), ecdsa(), passkey()];
        let encoded = encode_signers(&signers).unwrap();
        assert_eq!(encoded.len(), 1 + 65 + 21 + 65);
        assert_eq!(encoded[0], 3);
        assert_eq!(encoded[1], PASSKEY_TYPE);
        assert_eq!(encoded[66], ECDSA_TYPE);
        assert_eq!(decode_signers(&encoded).unwrap(), signers);
    }

    #[test]
    fn empty_list_is_a_single_zero_byte() {
        let encoded = encode_signers(&[]).unwrap();
        assert_eq!(encoded.as_ref(), &[0u8]);
        assert!(decode_signers(&encoded).unwrap().is_empty());
    }

    #[test]
    fn unknown_signer_type_is_rejected() {
        let mut encoded = encode_signers(&[ecdsa(), ecdsa()]).unwrap().to_vec();
        encoded[22] = 7;
        assert_eq!(
            decode_signers(&encoded).unwrap_err(),
            SignerCodecError::UnknownSignerType {
                signer_type: 7,
                index: 1
            }
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut encoded = encode_signers(&[ecdsa()]).unwrap().to_vec();
        encoded.push(0);
        assert_eq!(
            decode_signers(&encoded).unwrap_err(),
            SignerCodecError::TrailingBytes { count: 1 }
        );
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let encoded = encode_signers(&[passkey()]).unwrap();
        let err = decode_signers(&encoded[..40]).unwrap_err();
        assert!(matches!(err, SignerCodecError::Truncated { index: 0, expected: 64, .. }));
        assert_eq!(decode_signers(&[]).unwrap_err(), SignerCodecError::Empty);
    }

    #[test]
    fn too_many_signers_fail_to_encode() {
        let signers = vec![ecdsa(); 256];
        assert_eq!(
            encode_signers(&signers).unwrap_err(),
            SignerCodecError::TooManySigners { count: 256 }
        );
    }
}
