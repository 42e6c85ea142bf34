use alloy::primitives::{Address, Bytes};

use super::{AccountType, SmartSessionError, SmartSessionSignature, decode_smart_session_signature};

/// A permission context split into its validator module and smart session signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionContext {
    pub validator: Address,
    pub signature: Bytes,
}

impl PermissionContext {
    /// Split `context` and check that it targets `expected_validator`.
    pub fn parse(context: &[u8], expected_validator: Address) -> Result<Self, SmartSessionError> {
        let (validator, signature) =
            context
                .split_at_checked(20)
                .ok_or(SmartSessionError::ContextTooShort {
                    actual: context.len(),
                })?;

        let validator = Address::from_slice(validator);
        if validator != expected_validator {
            return Err(SmartSessionError::ValidatorMismatch {
                expected: expected_validator,
                actual: validator,
            });
        }

        Ok(Self {
            validator,
            signature: Bytes::copy_from_slice(signature),
        })
    }

    pub fn decode(
        &self,
        account_type: Option<AccountType>,
    ) -> Result<SmartSessionSignature, SmartSessionError> {
        decode_smart_session_signature(&self.signature, account_type)
    }

    pub fn to_bytes(&self) -> Bytes {
        [self.validator.as_slice(), self.signature.as_ref()]
            .concat()
            .into()
    }
}
