use alloy::primitives::{Address, B256, Bytes};
use alloy::rpc::types::UserOperationReceipt;
use serde::{Deserialize, Serialize};
use wallet_aa_types::{UserOperationHex, UserOperationV07, compute_user_op_v07_hash, unsigned_user_op};
use wallet_core::{
    chain::Chain,
    constants::{ENTRYPOINT_ADDRESS_V0_7, SMART_SESSIONS_ADDRESS},
    cosigner::{CoSignRequest, CosignerClient},
    error::{AlloyRpcErrorToWalletError, WalletError},
    transaction::Call,
};

use crate::{
    dummy_signature::DummySignatureBuilder,
    nonce::{get_nonce_with_key, key_from_validator_address},
    smart_account::{Erc7579Account, SmartAccount},
    smart_session::{AccountType, PermissionContext, SessionSignatureFormatter, SmartSessionSignature},
};

fn default_entrypoint() -> Address {
    ENTRYPOINT_ADDRESS_V0_7
}

fn default_smart_sessions() -> Address {
    SMART_SESSIONS_ADDRESS
}

fn default_account_type() -> AccountType {
    AccountType::Safe
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartSessionConfig {
    #[serde(default = "default_entrypoint")]
    pub entrypoint: Address,
    #[serde(default = "default_smart_sessions")]
    pub smart_sessions: Address,
    #[serde(default = "default_account_type")]
    pub account_type: AccountType,
}

impl Default for SmartSessionConfig {
    fn default() -> Self {
        Self {
            entrypoint: default_entrypoint(),
            smart_sessions: default_smart_sessions(),
            account_type: default_account_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareCallsRequest {
    pub from: Address,
    pub chain_id: u64,
    pub pci: String,
    pub calls: Vec<Call>,
}

/// Gas-estimated operation plus the hash the session key has to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedCalls {
    pub chain_id: u64,
    pub pci: String,
    pub user_op: UserOperationV07,
    pub hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPreparedCallsRequest {
    pub prepared_calls: PreparedCalls,
    /// Session key signature over `prepared_calls.hash`.
    pub signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentCalls {
    pub chain_id: u64,
    pub user_op_hash: B256,
}

/// Nonce, call data and dummy signature set; no gas yet.
struct PreparedUserOp {
    user_op: UserOperationV07,
}

/// Gas fields filled and hash computed.
struct EstimatedUserOp {
    user_op: UserOperationV07,
    hash: B256,
}

/// Carries the caller's session key signature.
struct SignedUserOp {
    user_op: UserOperationV07,
}

struct CosignedUserOp {
    user_op: UserOperationV07,
    cosignature: Bytes,
}

/// Signature in its final smart session encoding. The only state that can be submitted.
struct FinalizedUserOp {
    user_op: UserOperationV07,
}

impl EstimatedUserOp {
    fn sign(mut self, signature: Bytes) -> SignedUserOp {
        self.user_op.signature = signature;
        SignedUserOp {
            user_op: self.user_op,
        }
    }
}

pub struct SmartSessionUserOpBuilder<'a, C: Chain> {
    chain: &'a C,
    cosigner: &'a CosignerClient,
    config: &'a SmartSessionConfig,
}

impl<'a, C: Chain> SmartSessionUserOpBuilder<'a, C> {
    pub fn new(chain: &'a C, cosigner: &'a CosignerClient, config: &'a SmartSessionConfig) -> Self {
        Self {
            chain,
            cosigner,
            config,
        }
    }

    fn check_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if chain_id != self.chain.chain_id() {
            return Err(WalletError::ValidationError {
                message: format!(
                    "request targets chain {chain_id} but builder is bound to chain {}",
                    self.chain.chain_id()
                ),
            });
        }
        Ok(())
    }

    /// Resolve `pci` through the cosigner and decode the smart session it points at.
    async fn fetch_session(
        &self,
        account: Address,
        pci: &str,
    ) -> Result<(PermissionContext, SmartSessionSignature), WalletError> {
        let context = self
            .cosigner
            .get_permissions_context(account, pci)
            .await?
            .context;

        let context = PermissionContext::parse(&context, self.config.smart_sessions)?;
        let session = context.decode(Some(self.config.account_type))?;

        tracing::debug!(
            %account,
            pci,
            mode = ?session.mode,
            permission_id = %session.permission_id,
            "Permission context resolved"
        );

        Ok((context, session))
    }

    pub async fn prepare_calls(
        &self,
        request: &PrepareCallsRequest,
    ) -> Result<PreparedCalls, WalletError> {
        self.check_chain(request.chain_id)?;
        if request.calls.is_empty() {
            return Err(WalletError::ValidationError {
                message: "at least one call is required".to_string(),
            });
        }

        let (context, session) = self.fetch_session(request.from, &request.pci).await?;

        let dummy_signer = DummySignatureBuilder::new(self.chain, self.config.smart_sessions);
        let (nonce, dummy_signature) = tokio::try_join!(
            get_nonce_with_key(
                self.chain,
                self.config.entrypoint,
                request.from,
                key_from_validator_address(context.validator),
            ),
            dummy_signer.build(request.from, &session),
        )?;

        let account = Erc7579Account {
            address: request.from,
        };
        let call_data = account.encode_calls(&request.calls);

        let mut user_op = unsigned_user_op(request.from, nonce, call_data);
        user_op.signature = dummy_signature;

        let estimated = self.estimate_gas(PreparedUserOp { user_op }).await?;

        tracing::info!(
            account = %request.from,
            chain_id = request.chain_id,
            hash = %estimated.hash,
            "Prepared smart session user operation"
        );

        Ok(PreparedCalls {
            chain_id: request.chain_id,
            pci: request.pci.clone(),
            user_op: estimated.user_op,
            hash: estimated.hash,
        })
    }

    async fn estimate_gas(&self, prepared: PreparedUserOp) -> Result<EstimatedUserOp, WalletError> {
        let mut user_op = prepared.user_op;

        let prices = self
            .chain
            .bundler_client()
            .get_user_op_gas_price()
            .await
            .map_err(|e| e.to_bundler_error(self.chain))?;

        tracing::debug!("Gas prices determined");

        user_op.max_fee_per_gas = prices.fast.max_fee_per_gas;
        user_op.max_priority_fee_per_gas = prices.fast.max_priority_fee_per_gas;

        let mut sponsored_limits = None;
        if let Some(paymaster) = self.chain.paymaster_client() {
            let pm_response = paymaster
                .sponsor_user_op(&UserOperationHex::from(&user_op), self.config.entrypoint)
                .await
                .map_err(|e| e.to_paymaster_error(self.chain))?;

            tracing::debug!("Userop paymaster and data determined");

            user_op.paymaster = Some(pm_response.paymaster);
            user_op.paymaster_data = Some(pm_response.paymaster_data);

            if let (Some(call), Some(verification), Some(pre), Some(pm_verification), Some(pm_post)) = (
                pm_response.call_gas_limit,
                pm_response.verification_gas_limit,
                pm_response.pre_verification_gas,
                pm_response.paymaster_verification_gas_limit,
                pm_response.paymaster_post_op_gas_limit,
            ) {
                sponsored_limits = Some((call, verification, pre, Some(pm_verification), Some(pm_post)));
            }
        }

        let (
            call_gas_limit,
            verification_gas_limit,
            pre_verification_gas,
            paymaster_verification_gas_limit,
            paymaster_post_op_gas_limit,
        ) = match sponsored_limits {
            Some(limits) => limits,
            None => {
                tracing::debug!("No paymaster provided gas limits, getting from bundler");

                let estimate = self
                    .chain
                    .bundler_client()
                    .estimate_user_op_gas(&UserOperationHex::from(&user_op), self.config.entrypoint)
                    .await
                    .map_err(|e| e.to_bundler_error(self.chain))?;

                let has_paymaster = user_op.paymaster.is_some();
                (
                    estimate.call_gas_limit,
                    estimate.verification_gas_limit,
                    estimate.pre_verification_gas,
                    has_paymaster.then(|| estimate.paymaster_verification_gas_limit.unwrap_or_default()),
                    has_paymaster.then(|| estimate.paymaster_post_op_gas_limit.unwrap_or_default()),
                )
            }
        };

        tracing::debug!("Gas limits determined");

        user_op.call_gas_limit = call_gas_limit;
        user_op.verification_gas_limit = verification_gas_limit;
        user_op.pre_verification_gas = pre_verification_gas;
        user_op.paymaster_verification_gas_limit = paymaster_verification_gas_limit;
        user_op.paymaster_post_op_gas_limit = paymaster_post_op_gas_limit;

        let hash = self.user_op_hash(&user_op)?;
        Ok(EstimatedUserOp { user_op, hash })
    }

    fn user_op_hash(&self, user_op: &UserOperationV07) -> Result<B256, WalletError> {
        compute_user_op_v07_hash(user_op, self.config.entrypoint, self.chain.chain_id()).map_err(
            |e| WalletError::ValidationError {
                message: e.to_string(),
            },
        )
    }

    /// Cosign, format and submit a prepared operation.
    ///
    /// The permission context is fetched again since the session may have been enabled
    /// on-chain after preparation. Nothing is submitted unless cosigning and formatting succeed.
    pub async fn send_prepared_calls(
        &self,
        request: SendPreparedCallsRequest,
    ) -> Result<SentCalls, WalletError> {
        let SendPreparedCallsRequest {
            prepared_calls,
            signature,
        } = request;
        self.check_chain(prepared_calls.chain_id)?;

        let hash = self.user_op_hash(&prepared_calls.user_op)?;
        if hash != prepared_calls.hash {
            return Err(WalletError::ValidationError {
                message: format!(
                    "prepared user operation hashes to {hash}, expected {}",
                    prepared_calls.hash
                ),
            });
        }

        let account = prepared_calls.user_op.sender;
        let (_, session) = self.fetch_session(account, &prepared_calls.pci).await?;

        let signed = EstimatedUserOp {
            user_op: prepared_calls.user_op,
            hash,
        }
        .sign(signature);

        let cosigned = self.cosign(&prepared_calls.pci, signed).await?;
        let finalized = self.finalize(&session, cosigned).await?;
        let user_op_hash = self.submit(finalized).await?;

        Ok(SentCalls {
            chain_id: prepared_calls.chain_id,
            user_op_hash,
        })
    }

    async fn cosign(&self, pci: &str, signed: SignedUserOp) -> Result<CosignedUserOp, WalletError> {
        let account = signed.user_op.sender;
        let response = self
            .cosigner
            .co_sign_user_operation(
                account,
                &CoSignRequest {
                    pci: pci.to_string(),
                    user_op: UserOperationHex::from(&signed.user_op),
                },
            )
            .await
            .inspect_err(|e| tracing::error!(%account, pci, error = %e, "Cosigning failed"))?;

        tracing::debug!(%account, "UserOp cosigned");

        Ok(CosignedUserOp {
            user_op: signed.user_op,
            cosignature: response.signature,
        })
    }

    async fn finalize(
        &self,
        session: &SmartSessionSignature,
        cosigned: CosignedUserOp,
    ) -> Result<FinalizedUserOp, WalletError> {
        let CosignedUserOp {
            mut user_op,
            cosignature,
        } = cosigned;

        user_op.signature = SessionSignatureFormatter::new(self.chain, self.config.smart_sessions)
            .format(user_op.sender, session, cosignature)
            .await?;

        Ok(FinalizedUserOp { user_op })
    }

    async fn submit(&self, finalized: FinalizedUserOp) -> Result<B256, WalletError> {
        let user_op_hash = self
            .chain
            .bundler_client()
            .send_user_op(
                &UserOperationHex::from(&finalized.user_op),
                self.config.entrypoint,
            )
            .await
            .map_err(|e| e.to_bundler_error(self.chain))?;

        tracing::info!(
            account = %finalized.user_op.sender,
            %user_op_hash,
            "UserOp submitted to bundler"
        );

        Ok(user_op_hash)
    }

    pub async fn get_user_op_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, WalletError> {
        self.chain
            .bundler_client()
            .get_user_op_receipt(user_op_hash)
            .await
            .map_err(|e| e.to_bundler_error(self.chain))
    }
}
