//! Scripted chain client for tests
//!
//! Reads answer from a table (quotes default to twice the input), writes
//! succeed with sequential hashes unless scripted otherwise. Reads, submits
//! and inclusions can each be held behind a gate so tests decide when and
//! in which order responses come back.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use evm_client::{ChainClient, ChainStatus, Inclusion, ReadCall, SwapEvent, WriteCall};
use swiftswap_core::{Address, ClientError, Network, TokenDescriptor, TxHash, U256};
use tokio::sync::watch;

use crate::resolver::PoolRegistry;
use crate::state::PoolHandle;

pub const OWNER: Address = Address::new([0x77; 20]);

pub fn swift() -> TokenDescriptor {
    TokenDescriptor::new(Address::repeat_byte(0x01), "SWIFT", 18).with_name("Swift Protocol")
}

pub fn bolt() -> TokenDescriptor {
    TokenDescriptor::new(Address::repeat_byte(0x02), "BOLT", 18).with_name("Bolt Network")
}

pub fn flash() -> TokenDescriptor {
    TokenDescriptor::new(Address::repeat_byte(0x03), "FLASH", 18).with_name("Flash Finance")
}

/// SWIFT-BOLT pool
pub fn pool() -> PoolHandle {
    PoolHandle {
        address: Address::repeat_byte(0xee),
        token0: swift(),
        token1: bolt(),
        fee: Some(500),
    }
}

/// SWIFT, BOLT and FLASH with a single SWIFT-BOLT pool
pub fn registry() -> PoolRegistry {
    let mut registry = PoolRegistry::new();
    for token in [swift(), bolt(), flash()] {
        registry.add_token(token).unwrap();
    }
    registry.add_pool(pool()).unwrap();
    registry
}

#[derive(Default)]
struct Script {
    reads: HashMap<ReadCall, U256>,
    read_errors: HashMap<ReadCall, ClientError>,
    read_log: Vec<ReadCall>,
    gated_calls: HashSet<ReadCall>,
    gate_all_reads: bool,

    submit_results: VecDeque<Result<TxHash, ClientError>>,
    submitted: Vec<(WriteCall, Address)>,
    gate_submits: bool,

    inclusion_results: VecDeque<Result<bool, ClientError>>,
    inclusion_calls: usize,
    gate_inclusions: bool,

    swap_events: Vec<SwapEvent>,
    event_lookbacks: Vec<u64>,
}

pub struct FakeChainClient {
    script: Mutex<Script>,
    changes: watch::Sender<u64>,
}

impl Default for FakeChainClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChainClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            changes: watch::channel(0).0,
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn update<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let result = f(&mut self.script.lock().unwrap());
        self.changes.send_modify(|v| *v += 1);
        result
    }

    fn peek<R>(&self, f: impl FnOnce(&Script) -> R) -> R {
        f(&self.script.lock().unwrap())
    }

    async fn wait_until(&self, ready: impl Fn(&Script) -> bool) {
        let mut rx = self.changes.subscribe();
        while !self.peek(&ready) {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn set_read(&self, call: ReadCall, value: U256) {
        self.update(|s| {
            s.read_errors.remove(&call);
            s.reads.insert(call, value);
        });
    }

    pub fn fail_read(&self, call: ReadCall, err: ClientError) {
        self.update(|s| {
            s.read_errors.insert(call, err);
        });
    }

    /// Hold every read until the gate is opened
    pub fn gate_reads(&self, closed: bool) {
        self.update(|s| s.gate_all_reads = closed);
    }

    /// Hold reads of one specific call
    pub fn gate_call(&self, call: ReadCall, closed: bool) {
        self.update(|s| {
            if closed {
                s.gated_calls.insert(call);
            } else {
                s.gated_calls.remove(&call);
            }
        });
    }

    pub fn read_count(&self, call: &ReadCall) -> usize {
        self.peek(|s| s.read_log.iter().filter(|c| *c == call).count())
    }

    pub fn total_reads(&self) -> usize {
        self.peek(|s| s.read_log.len())
    }

    /// Wait until `call` has been issued at least `n` times
    pub async fn wait_for_reads(&self, call: &ReadCall, n: usize) {
        self.wait_until(|s| s.read_log.iter().filter(|c| *c == call).count() >= n)
            .await;
    }

    pub fn script_submit(&self, result: Result<TxHash, ClientError>) {
        self.update(|s| s.submit_results.push_back(result));
    }

    pub fn gate_submits(&self, closed: bool) {
        self.update(|s| s.gate_submits = closed);
    }

    pub fn submitted(&self) -> Vec<(WriteCall, Address)> {
        self.peek(|s| s.submitted.clone())
    }

    pub async fn wait_for_submits(&self, n: usize) {
        self.wait_until(|s| s.submitted.len() >= n).await;
    }

    /// Script the next inclusion: `Ok(false)` is a mined revert
    pub fn script_inclusion(&self, result: Result<bool, ClientError>) {
        self.update(|s| s.inclusion_results.push_back(result));
    }

    pub fn gate_inclusions(&self, closed: bool) {
        self.update(|s| s.gate_inclusions = closed);
    }

    pub fn inclusion_calls(&self) -> usize {
        self.peek(|s| s.inclusion_calls)
    }

    pub async fn wait_for_inclusion_calls(&self, n: usize) {
        self.wait_until(|s| s.inclusion_calls >= n).await;
    }

    /// Emit a `Swap` log; events come back in push order
    pub fn push_swap_event(&self, event: SwapEvent) {
        self.update(|s| s.swap_events.push(event));
    }

    /// Lookback windows requested so far
    pub fn event_lookbacks(&self) -> Vec<u64> {
        self.peek(|s| s.event_lookbacks.clone())
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn read(&self, call: &ReadCall) -> Result<U256, ClientError> {
        self.update(|s| s.read_log.push(call.clone()));
        self.wait_until(|s| !s.gate_all_reads && !s.gated_calls.contains(call))
            .await;

        self.peek(|s| {
            if let Some(err) = s.read_errors.get(call) {
                return Err(err.clone());
            }
            if let Some(value) = s.reads.get(call) {
                return Ok(*value);
            }
            Ok(match call {
                ReadCall::GetQuote { amount_in, .. } => *amount_in * U256::from(2),
                _ => U256::ZERO,
            })
        })
    }

    async fn submit(&self, call: &WriteCall, from: Address) -> Result<TxHash, ClientError> {
        let n = self.update(|s| {
            s.submitted.push((call.clone(), from));
            s.submitted.len()
        });
        self.wait_until(|s| !s.gate_submits).await;

        self.update(|s| s.submit_results.pop_front())
            .unwrap_or_else(|| Ok(TxHash::with_last_byte(n as u8)))
    }

    async fn wait_for_inclusion(&self, hash: TxHash) -> Result<Inclusion, ClientError> {
        self.update(|s| s.inclusion_calls += 1);
        self.wait_until(|s| !s.gate_inclusions).await;

        let success = self
            .update(|s| s.inclusion_results.pop_front())
            .unwrap_or(Ok(true))?;
        Ok(Inclusion {
            hash,
            block_number: Some(1),
            success,
        })
    }

    async fn swap_events(
        &self,
        pool: Address,
        lookback_blocks: u64,
    ) -> Result<Vec<SwapEvent>, ClientError> {
        self.update(|s| {
            s.event_lookbacks.push(lookback_blocks);
            Ok(s.swap_events
                .iter()
                .filter(|e| e.pool == pool)
                .cloned()
                .collect())
        })
    }

    async fn status(&self) -> ChainStatus {
        ChainStatus {
            is_online: true,
            chain_id: Some(Network::Localhost.chain_id()),
            block_number: 1,
            expected_chain_id: Network::Localhost.chain_id(),
        }
    }
}
