use alloy::primitives::{Address, Bytes};

use super::{AccountType, SmartSessionError};

const KERNEL_TAG: u8 = 0x01;

/// Frame the owner's enable signature with its validator the way `account_type` expects:
/// kernel uses `0x01 ∥ validator ∥ sig`, every other account `validator ∥ sig`.
pub fn encode_permission_enable_sig(
    account_type: AccountType,
    validator: Address,
    signature: &[u8],
) -> Bytes {
    let mut out = Vec::with_capacity(21 + signature.len());
    if account_type == AccountType::Kernel {
        out.push(KERNEL_TAG);
    }
    out.extend_from_slice(validator.as_slice());
    out.extend_from_slice(signature);
    out.into()
}

/// Split a framed `permissionEnableSig` into `(account type, validator, signature)`.
///
/// The tagged kernel form is tried first. An untagged blob only tells us that the account is
/// not kernel, so the non-kernel flavour must come from `hint`; without one the account type
/// is reported as unresolved rather than guessed.
pub fn decode_permission_enable_sig(
    data: &[u8],
    hint: Option<AccountType>,
) -> Result<(AccountType, Address, Bytes), SmartSessionError> {
    let split = |framed: &[u8]| -> Result<(Address, Bytes), SmartSessionError> {
        let (validator, signature) =
            framed
                .split_at_checked(20)
                .ok_or(SmartSessionError::TooShort {
                    what: "permissionEnableSig",
                    needed: 20,
                    actual: framed.len(),
                })?;
        Ok((Address::from_slice(validator), Bytes::copy_from_slice(signature)))
    };

    match hint {
        Some(AccountType::Kernel) | None => match data.split_first() {
            Some((&KERNEL_TAG, rest)) if rest.len() >= 20 => {
                let (validator, signature) = split(rest)?;
                Ok((AccountType::Kernel, validator, signature))
            }
            _ if hint == Some(AccountType::Kernel) => Err(SmartSessionError::KernelSigNotTagged),
            _ => Err(SmartSessionError::UnresolvedAccountType),
        },
        Some(account_type) => {
            let (validator, signature) = split(data)?;
            Ok((account_type, validator, signature))
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    const VALIDATOR: Address = address!("0x2483DA3A338895199E5e538530213157e931Bf06");

    #[test]
    fn kernel_sig_is_tagged() {
        let framed = encode_permission_enable_sig(AccountType::Kernel, VALIDATOR, &[0xaa, 0xbb]);
        assert_eq!(framed[0], KERNEL_TAG);
        assert_eq!(framed.len(), 1 + 20 + 2);

        let (account_type, validator, sig) = decode_permission_enable_sig(&framed, None).unwrap();
        assert_eq!(account_type, AccountType::Kernel);
        assert_eq!(validator, VALIDATOR);
        assert_eq!(sig.as_ref(), &[0xaa, 0xbb]);
    }

    #[test]
    fn untagged_sig_uses_the_hinted_account_type() {
        for account_type in [
            AccountType::Safe,
            AccountType::Nexus,
            AccountType::Erc7579Implementation,
        ] {
            let framed = encode_permission_enable_sig(account_type, VALIDATOR, &[0xcc]);
            assert_eq!(framed.len(), 21);
            let decoded = decode_permission_enable_sig(&framed, Some(account_type)).unwrap();
            assert_eq!(decoded, (account_type, VALIDATOR, Bytes::from(vec![0xcc])));
        }
    }

    #[test]
    fn untagged_sig_without_hint_is_unresolved() {
        let framed = encode_permission_enable_sig(AccountType::Safe, VALIDATOR, &[0xcc]);
        assert_eq!(
            decode_permission_enable_sig(&framed, None).unwrap_err(),
            SmartSessionError::UnresolvedAccountType
        );
    }

    #[test]
    fn kernel_hint_requires_the_tag() {
        let framed = encode_permission_enable_sig(AccountType::Nexus, VALIDATOR, &[0xcc]);
        assert_eq!(
            decode_permission_enable_sig(&framed, Some(AccountType::Kernel)).unwrap_err(),
            SmartSessionError::KernelSigNotTagged
        );
    }

    #[test]
    fn validator_starting_with_tag_byte_is_fine_with_hint() {
        let validator = address!("0x01000000000000000000000000000000000000aa");
        let framed = encode_permission_enable_sig(AccountType::Safe, validator, &[0x01]);
        assert_eq!(framed[0], KERNEL_TAG);
        let decoded = decode_permission_enable_sig(&framed, Some(AccountType::Safe)).unwrap();
        assert_eq!(decoded, (AccountType::Safe, validator, Bytes::from(vec![0x01])));
    }

    #[test]
    fn short_sig_is_rejected() {
        let err = decode_permission_enable_sig(&[0u8; 5], Some(AccountType::Safe)).unwrap_err();
        assert!(matches!(err, SmartSessionError::TooShort { actual: 5, .. }));
    }
}
