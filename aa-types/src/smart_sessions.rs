//! ABI surface of the Smart Sessions ERC-7579 validator module.

use alloy::{
    primitives::{B256, keccak256},
    sol,
    sol_types::SolValue,
};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct PolicyData {
        address policy;
        bytes initData;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ActionData {
        bytes4 actionTargetSelector;
        address actionTarget;
        PolicyData[] actionPolicies;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ERC7739Data {
        string[] allowedERC7739Content;
        PolicyData[] erc1271Policies;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Session {
        address sessionValidator;
        bytes sessionValidatorInitData;
        bytes32 salt;
        PolicyData[] userOpPolicies;
        ERC7739Data erc7739Policies;
        ActionData[] actions;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ChainDigest {
        uint64 chainId;
        bytes32 sessionDigest;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct EnableSession {
        uint8 chainDigestIndex;
        ChainDigest[] hashesAndChainIds;
        Session sessionToEnable;
        bytes permissionEnableSig;
    }

    #[sol(rpc)]
    interface ISmartSession {
        function isSessionEnabled(bytes32 permissionId, address account) external view returns (bool);
    }
}

/// On-chain permission id of a session: `keccak256(abi.encode(validator, initData, salt))`
pub fn permission_id(session: &Session) -> B256 {
    keccak256(
        (
            session.sessionValidator,
            session.sessionValidatorInitData.clone(),
            session.salt,
        )
            .abi_encode_params(),
    )
}
