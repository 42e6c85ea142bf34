use alloy::{
    primitives::{Address, B256, Bytes},
    sol,
    sol_types::{SolCall, SolValue},
};
use wallet_core::transaction::Call;

sol! {
    function execute(bytes32 mode, bytes executionCalldata);

    struct Execution {
        address target;
        uint256 value;
        bytes callData;
    }
}

/// ERC-7579 mode word: `callType ∥ execType ∥ unused ∥ selector ∥ payload`, all zero
/// except the call type.
fn mode_code(call_type: u8) -> B256 {
    let mut mode = [0u8; 32];
    mode[0] = call_type;
    B256::from(mode)
}

const CALLTYPE_SINGLE: u8 = 0x00;
const CALLTYPE_BATCH: u8 = 0x01;

pub trait SmartAccount {
    fn address(&self) -> &Address;

    /// `execute` in single mode with `target ∥ value ∥ data` packed
    fn encode_execute(&self, call: &Call) -> Bytes {
        executeCall {
            mode: mode_code(CALLTYPE_SINGLE),
            executionCalldata: (call.to, call.value, call.data.clone())
                .abi_encode_packed()
                .into(),
        }
        .abi_encode()
        .into()
    }

    /// `execute` in batch mode with `abi.encode(Execution[])`
    fn encode_execute_batch(&self, calls: &[Call]) -> Bytes {
        let executions = calls
            .iter()
            .map(|call| Execution {
                target: call.to,
                value: call.value,
                callData: call.data.clone(),
            })
            .collect::<Vec<_>>();

        executeCall {
            mode: mode_code(CALLTYPE_BATCH),
            executionCalldata: executions.abi_encode().into(),
        }
        .abi_encode()
        .into()
    }

    fn encode_calls(&self, calls: &[Call]) -> Bytes {
        match calls {
            [call] => self.encode_execute(call),
            calls => self.encode_execute_batch(calls),
        }
    }
}

/// An ERC-7579 modular account at a known address.
#[derive(Clone, Debug)]
pub struct Erc7579Account {
    pub address: Address,
}

impl SmartAccount for Erc7579Account {
    fn address(&self) -> &Address {
        &self.address
    }
}
