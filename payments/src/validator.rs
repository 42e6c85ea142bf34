use alloy::primitives::{Address, U256};
use chrono::Utc;
use futures::future::join_all;
use wallet_core::transaction::Call;

use crate::{
    caip::{AccountId, AssetId, EIP155, ERC20, SLIP44},
    checkout::{
        CheckoutRequest, DetailedPaymentOption, EVM_CALLS, FeasiblePayments, PaymentKind,
        PaymentOption,
    },
    error::CheckoutError,
    registry::{AssetRegistry, unresolved_asset, unresolved_chain},
    simulation::{Asset, AssetReader, PaymentSimulator},
};

/// A payment option that parsed cleanly and targets a supported asset.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    option: &'a PaymentOption,
    asset_id: AssetId,
    chain_id: u64,
    asset: Asset,
    calls: Vec<Call>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Evaluation {
    has_matching_asset: bool,
    simulated: bool,
}

enum Parsed<'a> {
    Supported(Candidate<'a>),
    Unsupported(String),
    Malformed(String),
}

fn parse_option(option: &PaymentOption) -> Parsed<'_> {
    let Some(kind) = option.kind() else {
        return Parsed::Malformed("exactly one of recipient or contractInteraction is required".into());
    };

    let asset_id: AssetId = match option.asset.parse() {
        Ok(asset_id) => asset_id,
        Err(e) => return Parsed::Malformed(e.to_string()),
    };

    let Some(chain_id) = asset_id.chain_id.eip155_id() else {
        return Parsed::Unsupported(format!("chain namespace {}", asset_id.chain_id.namespace));
    };

    let asset = match asset_id.asset_namespace.as_str() {
        SLIP44 => Asset::Native,
        ERC20 => match asset_id.asset_reference.parse::<Address>() {
            Ok(token) => Asset::Erc20(token),
            Err(_) => return Parsed::Malformed(format!("invalid erc20 address in {asset_id}")),
        },
        other => return Parsed::Unsupported(format!("asset namespace {other}")),
    };

    let calls = match kind {
        PaymentKind::Direct => {
            let recipient = option.recipient.as_deref().unwrap_or_default();
            let recipient = match recipient.parse::<AccountId>() {
                Ok(recipient) => recipient,
                Err(e) => return Parsed::Malformed(e.to_string()),
            };
            if recipient.chain_id != asset_id.chain_id {
                return Parsed::Malformed(format!(
                    "recipient chain {} does not match asset chain {}",
                    recipient.chain_id, asset_id.chain_id
                ));
            }
            let recipient = match recipient.evm_address() {
                Ok(recipient) => recipient,
                Err(e) => return Parsed::Malformed(e.to_string()),
            };
            vec![asset.transfer_call(recipient, option.amount)]
        }
        PaymentKind::Contract => match &option.contract_interaction {
            Some(interaction) if interaction.interaction_type == EVM_CALLS && !interaction.data.is_empty() => {
                interaction.data.clone()
            }
            Some(interaction) if interaction.interaction_type != EVM_CALLS => {
                return Parsed::Malformed(format!(
                    "unsupported contract interaction type {}",
                    interaction.interaction_type
                ));
            }
            _ => return Parsed::Malformed("contract interaction has no calls".into()),
        },
    };

    Parsed::Supported(Candidate {
        option,
        asset_id,
        chain_id,
        asset,
        calls,
    })
}

/// Filters a checkout's accepted payments down to the ones an account can actually pay.
pub struct PaymentFeasibilityValidator<B, R> {
    pub backend: B,
    pub registry: R,
}

impl<B, R> PaymentFeasibilityValidator<B, R>
where
    B: AssetReader + PaymentSimulator,
    R: AssetRegistry,
{
    pub fn new(backend: B, registry: R) -> Self {
        Self { backend, registry }
    }

    /// Feasible options in the order the requester listed them.
    pub async fn get_feasible_payments(
        &self,
        account: Address,
        request: &CheckoutRequest,
    ) -> Result<FeasiblePayments, CheckoutError> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        if let Some(expiry) = request.expiry {
            if expiry < now {
                return Err(CheckoutError::Expired { expiry, now });
            }
        }

        if request.accepted_payments.is_empty() {
            return Err(CheckoutError::InvalidRequest {
                message: "acceptedPayments is empty".to_string(),
            });
        }

        let mut candidates = Vec::new();
        let mut malformed = Vec::new();
        for (index, option) in request.accepted_payments.iter().enumerate() {
            match parse_option(option) {
                Parsed::Supported(candidate) => candidates.push(candidate),
                Parsed::Unsupported(reason) => {
                    tracing::debug!(index, asset = %option.asset, reason = %reason, "Dropping unsupported payment option");
                }
                Parsed::Malformed(reason) => {
                    tracing::debug!(index, asset = %option.asset, reason = %reason, "Dropping malformed payment option");
                    malformed.push(format!("acceptedPayments[{index}]: {reason}"));
                }
            }
        }

        if malformed.len() == request.accepted_payments.len() {
            return Err(CheckoutError::InvalidRequest {
                message: malformed.join("; "),
            });
        }

        let evaluations = join_all(
            candidates
                .iter()
                .map(|candidate| self.evaluate(account, candidate)),
        )
        .await;

        if !evaluations.iter().any(|e| e.has_matching_asset) {
            return Err(CheckoutError::NoMatchingAssets);
        }

        let options: Vec<_> = candidates
            .iter()
            .zip(&evaluations)
            .filter(|(_, evaluation)| evaluation.simulated)
            .map(|(candidate, _)| self.enrich(candidate))
            .collect();

        if options.is_empty() {
            return Err(CheckoutError::InsufficientFunds);
        }

        tracing::info!(
            account = %account,
            accepted = request.accepted_payments.len(),
            feasible = options.len(),
            "Resolved feasible payments"
        );
        Ok(FeasiblePayments { options })
    }

    /// Balance and simulation are independent signals and a failure in either is
    /// recorded as a negative result for this candidate only.
    async fn evaluate(&self, account: Address, candidate: &Candidate<'_>) -> Evaluation {
        let (balance, simulated) = futures::join!(
            self.backend
                .balance_of(candidate.chain_id, candidate.asset, account),
            self.backend
                .simulate_calls(candidate.chain_id, account, &candidate.calls),
        );

        let has_matching_asset = match balance {
            Ok(balance) => balance > U256::ZERO,
            Err(e) => {
                tracing::warn!(asset = %candidate.asset_id, error = %e, "Balance lookup failed");
                false
            }
        };
        let simulated = match simulated {
            Ok(simulated) => simulated,
            Err(e) => {
                tracing::warn!(asset = %candidate.asset_id, error = %e, "Payment simulation errored");
                false
            }
        };

        tracing::debug!(
            asset = %candidate.asset_id,
            has_matching_asset,
            simulated,
            "Evaluated payment option"
        );
        Evaluation {
            has_matching_asset,
            simulated,
        }
    }

    fn enrich(&self, candidate: &Candidate<'_>) -> DetailedPaymentOption {
        let chain = &candidate.asset_id.chain_id;
        DetailedPaymentOption {
            option: candidate.option.clone(),
            asset_metadata: self
                .registry
                .asset_metadata(&candidate.asset_id)
                .unwrap_or_else(|| unresolved_asset(&candidate.asset_id)),
            chain_metadata: self
                .registry
                .chain_metadata(chain)
                .unwrap_or_else(|| unresolved_chain(chain)),
        }
    }
}
