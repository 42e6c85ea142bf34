use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use alloy::{
    primitives::{Address, B256, Bytes, FixedBytes, U256, address, hex},
    sol_types::SolCall,
};
use serde_json::{Value, json};
use wallet_aa_core::{
    nonce::IEntryPointNonces,
    signers::{Signer, encode_signers},
    smart_session::{
        AccountType, EnableSessionData, PermissionContext, SmartSessionMode,
        SmartSessionSignature, decode_smart_session_signature, encode_smart_session_signature,
    },
    userop::builder::{
        PrepareCallsRequest, SendPreparedCallsRequest, SmartSessionConfig,
        SmartSessionUserOpBuilder,
    },
};
use wallet_aa_types::{
    compute_user_op_v07_hash,
    smart_sessions::{ChainDigest, ERC7739Data, EnableSession, ISmartSession, Session, permission_id},
};
use wallet_core::{
    chain::{ChainConfig, RpcChain},
    constants::{ENTRYPOINT_ADDRESS_V0_7, SMART_SESSIONS_ADDRESS},
    cosigner::{ContextLookup, CosignerClient, CosignerConfig},
    error::WalletError,
    transaction::Call,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const CHAIN_ID: u64 = 84532;
const ACCOUNT: Address = address!("0x5555555555555555555555555555555555555555");
const NONCE: u64 = 7;
const SENT_HASH: &str = "0x4242424242424242424242424242424242424242424242424242424242424242";

/// Answers chain and bundler JSON-RPC calls the builder makes.
#[derive(Clone, Default)]
struct RpcResponder {
    session_enabled: Arc<AtomicBool>,
    sent: Arc<AtomicUsize>,
    last_sent: Arc<Mutex<Option<Value>>>,
}

fn word(value: u64) -> String {
    format!("0x{value:064x}")
}

impl Respond for RpcResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let id = body["id"].clone();
        let params = &body["params"];

        let result = match body["method"].as_str().unwrap() {
            "eth_call" => {
                let input = params[0]["input"]
                    .as_str()
                    .or_else(|| params[0]["data"].as_str())
                    .unwrap();
                let input = hex::decode(input).unwrap();
                if input[..4] == IEntryPointNonces::getNonceCall::SELECTOR {
                    json!(word(NONCE))
                } else if input[..4] == ISmartSession::isSessionEnabledCall::SELECTOR {
                    json!(word(self.session_enabled.load(Ordering::SeqCst) as u64))
                } else {
                    panic!("unexpected eth_call selector {:?}", &input[..4]);
                }
            }
            "pimlico_getUserOperationGasPrice" => {
                let tier = json!({ "maxFeePerGas": "0x3b9aca00", "maxPriorityFeePerGas": "0x5f5e100" });
                json!({ "slow": tier, "standard": tier, "fast": tier })
            }
            "eth_estimateUserOperationGas" => json!({
                "callGasLimit": "0x186a0",
                "verificationGasLimit": "0x30d40",
                "preVerificationGas": "0xc350"
            }),
            "eth_sendUserOperation" => {
                self.sent.fetch_add(1, Ordering::SeqCst);
                *self.last_sent.lock().unwrap() = Some(params[0].clone());
                json!(SENT_HASH)
            }
            other => panic!("unexpected rpc method {other}"),
        };

        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
    }
}

fn session_signers() -> Vec<Signer> {
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

fn enable_context(validator: Address) -> Bytes {
    enable_context_with_salt(validator, B256::repeat_byte(0x01))
}

fn session_with_salt(salt: B256) -> Session {
    Session {
        sessionValidator: address!("0x207b90941d9cff79A750C1E5c05dDaA17eA01B9F"),
        sessionValidatorInitData: encode_signers(&session_signers()).unwrap(),
        salt,
        userOpPolicies: vec![],
        erc7739Policies: ERC7739Data {
            allowedERC7739Content: vec![],
            erc1271Policies: vec![],
        },
        actions: vec![],
    }
}

fn enable_context_with_salt(validator: Address, salt: B256) -> Bytes {
    let session = session_with_salt(salt);
    let id = permission_id(&session);
    let signature = SmartSessionSignature::enable_session(
        SmartSessionMode::Enable,
        id,
        Bytes::new(),
        EnableSessionData {
            enable_session: EnableSession {
                chainDigestIndex: 0,
                hashesAndChainIds: vec![ChainDigest {
                    chainId: CHAIN_ID,
                    sessionDigest: FixedBytes::repeat_byte(0x0c),
                }],
                sessionToEnable: session,
                permissionEnableSig: Bytes::from(vec![0xee; 65]),
            },
            validator: address!("0x2483DA3A338895199E5e538530213157e931Bf06"),
            account_type: AccountType::Safe,
        },
    )
    .unwrap();

    PermissionContext {
        validator,
        signature: encode_smart_session_signature(&signature).unwrap(),
    }
    .to_bytes()
}

struct Harness {
    rpc: MockServer,
    cosigner_server: MockServer,
    responder: RpcResponder,
    chain: RpcChain,
    cosigner: CosignerClient,
    config: SmartSessionConfig,
}

impl Harness {
    async fn start(context: Bytes) -> Self {
        let rpc = MockServer::start().await;
        let responder = RpcResponder::default();
        Mock::given(method("POST"))
            .respond_with(responder.clone())
            .mount(&rpc)
            .await;

        let cosigner_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{ACCOUNT}/pci-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "context": context })))
            .mount(&cosigner_server)
            .await;

        let chain = ChainConfig {
            chain_id: CHAIN_ID,
            rpc_url: rpc.uri(),
            bundler_url: rpc.uri(),
            paymaster_url: None,
            read_timeout_secs: 5,
            bundler_timeout_secs: 5,
        }
        .to_chain()
        .unwrap();

        let cosigner = CosignerClient::new(&CosignerConfig {
            base_url: cosigner_server.uri(),
            project_id: "test".to_string(),
            timeout_secs: 5,
            context_lookup: ContextLookup::PathSegment,
        })
        .unwrap();

        Self {
            rpc,
            cosigner_server,
            responder,
            chain,
            cosigner,
            config: SmartSessionConfig::default(),
        }
    }

    fn builder(&self) -> SmartSessionUserOpBuilder<'_, RpcChain> {
        SmartSessionUserOpBuilder::new(&self.chain, &self.cosigner, &self.config)
    }
}

fn prepare_request() -> PrepareCallsRequest {
    PrepareCallsRequest {
        from: ACCOUNT,
        chain_id: CHAIN_ID,
        pci: "pci-1".to_string(),
        calls: vec![Call::new(
            address!("0x7777777777777777777777777777777777777777"),
            U256::ZERO,
            Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
        )],
    }
}

#[tokio::test]
async fn prepare_calls_estimates_with_enable_mode_dummy() {
    let harness = Harness::start(enable_context(SMART_SESSIONS_ADDRESS)).await;

    let prepared = harness.builder().prepare_calls(&prepare_request()).await.unwrap();
    let op = &prepared.user_op;

    assert_eq!(op.sender, ACCOUNT);
    assert_eq!(op.nonce, U256::from(NONCE));
    assert_eq!(op.call_gas_limit, U256::from(100_000));
    assert_eq!(op.verification_gas_limit, U256::from(200_000));
    assert_eq!(op.pre_verification_gas, U256::from(50_000));
    assert_eq!(op.max_fee_per_gas, U256::from(1_000_000_000u64));
    assert!(op.paymaster.is_none());
    assert_eq!(
        prepared.hash,
        compute_user_op_v07_hash(op, ENTRYPOINT_ADDRESS_V0_7, CHAIN_ID).unwrap()
    );

    let dummy = decode_smart_session_signature(&op.signature, Some(AccountType::Safe)).unwrap();
    assert_eq!(dummy.mode, SmartSessionMode::Enable);
    assert!(dummy.enable_session_data.is_some());
}

#[tokio::test]
async fn send_prepared_calls_cosigns_then_submits_use_signature() {
    let harness = Harness::start(enable_context(SMART_SESSIONS_ADDRESS)).await;
    let prepared = harness.builder().prepare_calls(&prepare_request()).await.unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/{ACCOUNT}/sign")))
        .and(body_partial_json(json!({
            "pci": "pci-1",
            "userOp": { "signature": "0xc0ffee", "nonce": "0x7" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "signature": "0xabcdef" })))
        .expect(1)
        .mount(&harness.cosigner_server)
        .await;

    // enabled between prepare and send
    harness.responder.session_enabled.store(true, Ordering::SeqCst);

    let sent = harness
        .builder()
        .send_prepared_calls(SendPreparedCallsRequest {
            prepared_calls: prepared,
            signature: Bytes::from(vec![0xc0, 0xff, 0xee]),
        })
        .await
        .unwrap();

    assert_eq!(sent.user_op_hash, SENT_HASH.parse::<B256>().unwrap());
    assert_eq!(harness.responder.sent.load(Ordering::SeqCst), 1);

    let submitted = harness.responder.last_sent.lock().unwrap().clone().unwrap();
    let signature = hex::decode(submitted["signature"].as_str().unwrap()).unwrap();
    let decoded = decode_smart_session_signature(&signature, None).unwrap();
    assert_eq!(decoded.mode, SmartSessionMode::Use);
    assert_eq!(decoded.signature.as_ref(), &[0xab, 0xcd, 0xef]);
    assert_eq!(submitted["nonce"], "0x7");

    harness.cosigner_server.verify().await;

    let context_fetches = harness
        .cosigner_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == format!("/{ACCOUNT}/pci-1"))
        .count();
    assert_eq!(context_fetches, 2, "context is fetched on prepare and again on send");
}

#[tokio::test]
async fn send_prepared_calls_uses_the_context_current_at_send_time() {
    let harness = Harness::start(enable_context(SMART_SESSIONS_ADDRESS)).await;
    let prepared = harness.builder().prepare_calls(&prepare_request()).await.unwrap();

    // session rotated between prepare and send
    let rotated_salt = B256::repeat_byte(0x02);
    harness.cosigner_server.reset().await;
    Mock::given(method("GET"))
        .and(path(format!("/{ACCOUNT}/pci-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "context": enable_context_with_salt(SMART_SESSIONS_ADDRESS, rotated_salt)
        })))
        .expect(1)
        .mount(&harness.cosigner_server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/{ACCOUNT}/sign")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "signature": "0xabcdef" })))
        .expect(1)
        .mount(&harness.cosigner_server)
        .await;
    harness.responder.session_enabled.store(true, Ordering::SeqCst);

    harness
        .builder()
        .send_prepared_calls(SendPreparedCallsRequest {
            prepared_calls: prepared,
            signature: Bytes::from(vec![0xc0, 0xff, 0xee]),
        })
        .await
        .unwrap();

    let submitted = harness.responder.last_sent.lock().unwrap().clone().unwrap();
    let signature = hex::decode(submitted["signature"].as_str().unwrap()).unwrap();
    let decoded = decode_smart_session_signature(&signature, None).unwrap();
    assert_eq!(decoded.mode, SmartSessionMode::Use);
    assert_eq!(decoded.permission_id, permission_id(&session_with_salt(rotated_salt)));
    assert_ne!(
        decoded.permission_id,
        permission_id(&session_with_salt(B256::repeat_byte(0x01)))
    );

    harness.cosigner_server.verify().await;
}

#[tokio::test]
async fn cosigner_failure_never_reaches_the_bundler() {
    let harness = Harness::start(enable_context(SMART_SESSIONS_ADDRESS)).await;
    let prepared = harness.builder().prepare_calls(&prepare_request()).await.unwrap();

    Mock::given(method("POST"))
        .and(path(format!("/{ACCOUNT}/sign")))
        .respond_with(ResponseTemplate::new(403).set_body_string("policy violation"))
        .mount(&harness.cosigner_server)
        .await;

    let err = harness
        .builder()
        .send_prepared_calls(SendPreparedCallsRequest {
            prepared_calls: prepared,
            signature: Bytes::from(vec![0x01]),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::CosignerError { .. }));
    assert_eq!(harness.responder.sent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tampered_operation_is_rejected_before_cosigning() {
    let harness = Harness::start(enable_context(SMART_SESSIONS_ADDRESS)).await;
    let mut prepared = harness.builder().prepare_calls(&prepare_request()).await.unwrap();
    prepared.user_op.call_gas_limit = U256::from(1);

    let err = harness
        .builder()
        .send_prepared_calls(SendPreparedCallsRequest {
            prepared_calls: prepared,
            signature: Bytes::from(vec![0x01]),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::ValidationError { .. }));
    assert_eq!(harness.responder.sent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn foreign_validator_context_is_rejected() {
    let harness =
        Harness::start(enable_context(address!("0x000000000000000000000000000000000000dead"))).await;

    let err = harness
        .builder()
        .prepare_calls(&prepare_request())
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::InvalidPermissionContext { .. }));
    let rpc_requests = harness.rpc.received_requests().await.unwrap();
    assert!(rpc_requests.is_empty(), "no nonce lookup after a validator mismatch");
}
