use alloy::primitives::{Address, Bytes};
use wallet_aa_types::smart_sessions::ISmartSession;
use wallet_core::{
    chain::Chain,
    error::{ContractErrorToWalletError, WalletError},
};

use super::{SmartSessionError, SmartSessionMode, SmartSessionSignature, encode_smart_session_signature};

/// Encode `signature` as USE once the session is enabled on-chain, otherwise keep the
/// context's enable mode and carry its enable data along.
pub fn encode_for_session_state(
    session: &SmartSessionSignature,
    signature: Bytes,
    session_enabled: bool,
) -> Result<Bytes, SmartSessionError> {
    let formatted = if session_enabled || session.mode == SmartSessionMode::Use {
        SmartSessionSignature::use_session(session.permission_id, signature)
    } else {
        SmartSessionSignature {
            signature,
            ..session.clone()
        }
    };
    encode_smart_session_signature(&formatted)
}

/// Chooses between USE and ENABLE encodings by asking the Smart Sessions module.
pub struct SessionSignatureFormatter<'a, C: Chain> {
    pub chain: &'a C,
    pub smart_sessions: Address,
}

impl<'a, C: Chain> SessionSignatureFormatter<'a, C> {
    pub fn new(chain: &'a C, smart_sessions: Address) -> Self {
        Self {
            chain,
            smart_sessions,
        }
    }

    pub async fn is_session_enabled(
        &self,
        account: Address,
        session: &SmartSessionSignature,
    ) -> Result<bool, WalletError> {
        if session.mode == SmartSessionMode::Use {
            return Ok(true);
        }

        let module = ISmartSession::new(self.smart_sessions, self.chain.provider().clone());
        module
            .isSessionEnabled(session.permission_id, account)
            .call()
            .await
            .map_err(|e| e.to_wallet_error(self.chain, self.smart_sessions))
    }

    pub async fn format(
        &self,
        account: Address,
        session: &SmartSessionSignature,
        signature: Bytes,
    ) -> Result<Bytes, WalletError> {
        let enabled = self.is_session_enabled(account, session).await?;
        tracing::debug!(
            permission_id = %session.permission_id,
            enabled,
            "Formatting smart session signature"
        );
        Ok(encode_for_session_state(session, signature, enabled)?)
    }
}
