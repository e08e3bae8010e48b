// In-memory EVM doubles shared by service tests.

use async_trait::async_trait;
use ethers::abi::{encode, AbiEncode, Token};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, U256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::onchain::{CallError, CallResult, EvmClient, EvmInvoker, EvmReader};
use super::token_abi::erc20;
use crate::error::{AppError, Result};

pub const TEST_PRIVATE_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub fn test_wallet() -> LocalWallet {
    TEST_PRIVATE_KEY.trim_start_matches("0x").parse().unwrap()
}

pub fn word(value: U256) -> Bytes {
    Bytes::from(encode(&[Token::Uint(value)]))
}

pub fn abi_string(value: &str) -> Bytes {
    Bytes::from(encode(&[Token::String(value.to_string())]))
}

pub fn abi_bool(value: bool) -> Bytes {
    Bytes::from(encode(&[Token::Bool(value)]))
}

pub fn bytes32(value: &str) -> Bytes {
    let mut out = [0u8; 32];
    out[..value.len()].copy_from_slice(value.as_bytes());
    Bytes::from(out.to_vec())
}

#[derive(Default)]
pub struct Ledger {
    pub submitted: Mutex<Vec<(Address, Address, Bytes)>>,
    /// Zero-based index of the submission that reverts.
    pub fail_at: Mutex<Option<usize>>,
}

impl Ledger {
    pub fn submissions(&self) -> Vec<(Address, Address, Bytes)> {
        self.submitted.lock().unwrap().clone()
    }
}

pub struct FakeEvm {
    endpoint: String,
    unreachable: bool,
    code_size: usize,
    responses: HashMap<Vec<u8>, CallResult<Bytes>>,
    pub ledger: Arc<Ledger>,
}

impl FakeEvm {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            unreachable: false,
            code_size: 2048,
            responses: HashMap::new(),
            ledger: Arc::new(Ledger::default()),
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn without_code(mut self) -> Self {
        self.code_size = 0;
        self
    }

    /// Answers an exact calldata with `value`.
    pub fn respond(mut self, calldata: impl Into<Vec<u8>>, value: Bytes) -> Self {
        self.responses.insert(calldata.into(), Ok(value));
        self
    }

    pub fn revert(mut self, calldata: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(
            calldata.into(),
            Err(CallError::Failed("execution reverted".to_string())),
        );
        self
    }

    pub fn fail_submission_at(self, index: usize) -> Self {
        *self.ledger.fail_at.lock().unwrap() = Some(index);
        self
    }

    /// An 18-decimal "Reward Token" where `holder` owns `balance` base units.
    pub fn erc20_token(endpoint: &str, holder: Address, balance: U256) -> Self {
        Self::new(endpoint)
            .respond(erc20::NameCall.encode(), abi_string("Reward Token"))
            .respond(erc20::SymbolCall.encode(), abi_string("RWD"))
            .respond(erc20::DecimalsCall.encode(), word(U256::from(18)))
            .respond(erc20::TotalSupplyCall.encode(), word(U256::exp10(27)))
            .respond(erc20::BalanceOfCall { owner: holder }.encode(), word(balance))
    }
}

#[async_trait]
impl EvmReader for FakeEvm {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn block_number(&self) -> CallResult<u64> {
        if self.unreachable {
            return Err(CallError::Unreachable("connection refused".to_string()));
        }
        Ok(19_000_000)
    }

    async fn call(&self, _to: Address, data: Bytes) -> CallResult<Bytes> {
        if self.unreachable {
            return Err(CallError::Unreachable("connection refused".to_string()));
        }
        self.responses
            .get(data.as_ref())
            .cloned()
            .unwrap_or_else(|| Err(CallError::Failed("execution reverted".to_string())))
    }

    async fn code_size(&self, _address: Address) -> CallResult<usize> {
        if self.unreachable {
            return Err(CallError::Unreachable("connection refused".to_string()));
        }
        Ok(self.code_size)
    }
}

impl EvmClient for FakeEvm {
    fn invoker(&self, wallet: LocalWallet) -> Arc<dyn EvmInvoker> {
        Arc::new(FakeInvoker {
            sender: wallet.address(),
            ledger: self.ledger.clone(),
        })
    }
}

struct FakeInvoker {
    sender: Address,
    ledger: Arc<Ledger>,
}

#[async_trait]
impl EvmInvoker for FakeInvoker {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn submit(&self, to: Address, data: Bytes) -> Result<String> {
        let mut submitted = self.ledger.submitted.lock().unwrap();
        let index = submitted.len();
        if *self.ledger.fail_at.lock().unwrap() == Some(index) {
            return Err(AppError::DistributionFailure(format!(
                "transaction 0x{:064x} reverted",
                index
            )));
        }
        submitted.push((self.sender, to, data));
        Ok(format!("0x{:064x}", index + 1))
    }
}
