//! In-memory manual-seal chain implementing the connection seam, for testing
//! the harness without a node binary.

use std::{
    collections::HashMap,
    process::Command,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use async_trait::async_trait;
use devnode_core::{
    hash::blake2_256, AccountId, Block, BlockHash, CallArg, EventField, EventRecord, EventValue,
    Header, ModuleErrorInfo, Phase, RawTransaction, RuntimeCall, SignedExtrinsic, TxHash,
};

use crate::{
    config::HarnessConfig,
    nodes::{
        ChainConnection, ConnectionError, Connector, LaunchError, LaunchOptions, NodeEndpoint,
        NodeLauncher, NodeProcess, RunningNode, SigningIdentity,
    },
};

pub const ALICE: &str = "//Alice";
pub const BOB: &str = "//Bob";
pub const INITIAL_BALANCE: u128 = 1_000_000_000_000_000_000;

pub const BALANCES_INDEX: u8 = 5;
pub const INSUFFICIENT_BALANCE: u8 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockSigner {
    uri: String,
    account: AccountId,
}

impl MockSigner {
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        Self {
            uri: uri.to_owned(),
            account: AccountId::new(blake2_256(uri.as_bytes())),
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl SigningIdentity for MockSigner {
    fn account_id(&self) -> AccountId {
        self.account
    }
}

#[derive(Clone, Debug)]
enum Effect {
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: u128,
    },
    BadOrigin,
    Ethereum(TxHash),
    Noop,
}

#[derive(Clone, Debug)]
struct PendingEntry {
    bytes: Vec<u8>,
    effect: Effect,
}

struct SealedBlock {
    block: Block,
    events: Vec<EventRecord>,
}

struct State {
    balances: HashMap<AccountId, u128>,
    pending: Vec<PendingEntry>,
    blocks: HashMap<BlockHash, SealedBlock>,
    genesis: BlockHash,
    head: BlockHash,
    sealed: usize,
    nonce: u64,
    errors: HashMap<(u8, u8), ModuleErrorInfo>,
    resolve_errors: bool,
    timestamp_inherent: bool,
    submissions: usize,
    reject_at: Option<usize>,
    fail_sealing: bool,
    ready_after: usize,
    receipt_lag: u32,
    receipts: HashMap<TxHash, u32>,
    receipt_polls: usize,
    event_fetches: usize,
    block_fetches: usize,
    disconnects: usize,
}

impl State {
    fn new() -> Self {
        let genesis = BlockHash::new(blake2_256(b"genesis"));
        let mut blocks = HashMap::new();
        blocks.insert(
            genesis,
            SealedBlock {
                block: Block::new(
                    Header {
                        parent_hash: BlockHash::default(),
                        number: 0,
                    },
                    Vec::new(),
                ),
                events: Vec::new(),
            },
        );
        let balances = [ALICE, BOB]
            .iter()
            .map(|uri| (MockSigner::from_uri(uri).account_id(), INITIAL_BALANCE))
            .collect();
        let errors = HashMap::from([(
            (BALANCES_INDEX, INSUFFICIENT_BALANCE),
            ModuleErrorInfo {
                pallet: "Balances".to_owned(),
                name: "InsufficientBalance".to_owned(),
                docs: vec!["Balance too low to send value.".to_owned()],
                module_index: BALANCES_INDEX,
                error_index: INSUFFICIENT_BALANCE,
            },
        )]);

        Self {
            balances,
            pending: Vec::new(),
            blocks,
            genesis,
            head: genesis,
            sealed: 0,
            nonce: 0,
            errors,
            resolve_errors: true,
            timestamp_inherent: false,
            submissions: 0,
            reject_at: None,
            fail_sealing: false,
            ready_after: 0,
            receipt_lag: 0,
            receipts: HashMap::new(),
            receipt_polls: 0,
            event_fetches: 0,
            block_fetches: 0,
            disconnects: 0,
        }
    }

    fn next_nonce(&mut self) -> u64 {
        self.nonce += 1;
        self.nonce
    }

    fn accept(&mut self, entry: PendingEntry) -> Result<(), ConnectionError> {
        let position = self.submissions;
        self.submissions += 1;
        if self.reject_at == Some(position) {
            self.reject_at = None;
            return Err(ConnectionError::Backend("1010: Invalid Transaction".into()));
        }
        self.pending.push(entry);
        Ok(())
    }

    fn apply(&mut self, effect: &Effect, index: u32) -> Vec<EventRecord> {
        let phase = Phase::ApplyExtrinsic(index);
        let mut events = Vec::new();
        let dispatch_error = match effect {
            Effect::Transfer { from, to, amount } => {
                let balance = self.balances.get(from).copied().unwrap_or_default();
                if balance < *amount {
                    let module = EventValue::Composite(vec![
                        EventField::named("index", EventValue::U128(u128::from(BALANCES_INDEX))),
                        EventField::named(
                            "error",
                            EventValue::Bytes(vec![INSUFFICIENT_BALANCE, 0, 0, 0]),
                        ),
                    ]);
                    Some(EventValue::variant("Module", vec![EventField::unnamed(module)]))
                } else {
                    self.balances.insert(*from, balance - amount);
                    *self.balances.entry(*to).or_default() += amount;
                    events.push(event(
                        phase,
                        "Balances",
                        "Transfer",
                        vec![
                            EventField::named("from", EventValue::Bytes(from.as_bytes().to_vec())),
                            EventField::named("to", EventValue::Bytes(to.as_bytes().to_vec())),
                            EventField::named("amount", EventValue::U128(*amount)),
                        ],
                    ));
                    None
                }
            }
            Effect::BadOrigin => Some(EventValue::variant("BadOrigin", Vec::new())),
            Effect::Ethereum(hash) => {
                events.push(event(
                    phase,
                    "Ethereum",
                    "Executed",
                    vec![
                        EventField::named("from", EventValue::Bytes(vec![0; 20])),
                        EventField::named("to", EventValue::Bytes(vec![0; 20])),
                        EventField::named(
                            "transaction_hash",
                            EventValue::Composite(vec![EventField::unnamed(EventValue::Bytes(
                                hash.as_bytes().to_vec(),
                            ))]),
                        ),
                        EventField::named(
                            "exit_reason",
                            EventValue::variant(
                                "Succeed",
                                vec![EventField::unnamed(EventValue::variant("Stopped", Vec::new()))],
                            ),
                        ),
                    ],
                ));
                self.receipts.insert(*hash, self.receipt_lag);
                None
            }
            Effect::Noop => None,
        };

        events.push(match dispatch_error {
            Some(error) => event(
                phase,
                "System",
                "ExtrinsicFailed",
                vec![
                    EventField::named("dispatch_error", error),
                    EventField::named("dispatch_info", EventValue::Composite(Vec::new())),
                ],
            ),
            None => event(
                phase,
                "System",
                "ExtrinsicSuccess",
                vec![EventField::named("dispatch_info", EventValue::Composite(Vec::new()))],
            ),
        });
        events
    }

    fn seal(&mut self, parent: Option<BlockHash>) -> Result<BlockHash, ConnectionError> {
        if self.fail_sealing {
            return Err(ConnectionError::Backend("block production failed".into()));
        }
        let parent = parent.unwrap_or(self.head);
        let number = self
            .blocks
            .get(&parent)
            .map(|sealed| sealed.block.header.number + 1)
            .ok_or(ConnectionError::BlockNotFound(parent))?;

        let mut entries = std::mem::take(&mut self.pending);
        if self.timestamp_inherent {
            let nonce = self.next_nonce();
            entries.insert(
                0,
                PendingEntry {
                    bytes: [b"timestamp:".as_slice(), &nonce.to_le_bytes()].concat(),
                    effect: Effect::Noop,
                },
            );
        }

        let mut events = Vec::new();
        let mut extrinsics = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            events.extend(self.apply(&entry.effect, index as u32));
            extrinsics.push(entry.bytes);
        }
        events.push(event(Phase::Finalization, "Treasury", "Rollover", Vec::new()));

        let nonce = self.next_nonce();
        let hash = BlockHash::new(blake2_256(
            &[parent.as_bytes().as_slice(), &number.to_le_bytes(), &nonce.to_le_bytes()].concat(),
        ));
        let block = Block::new(
            Header {
                parent_hash: parent,
                number,
            },
            extrinsics,
        );
        self.blocks.insert(hash, SealedBlock { block, events });
        self.head = hash;
        self.sealed += 1;
        Ok(hash)
    }
}

fn event(phase: Phase, pallet: &str, variant: &str, fields: Vec<EventField>) -> EventRecord {
    EventRecord {
        phase,
        pallet: pallet.to_owned(),
        variant: variant.to_owned(),
        fields,
    }
}

fn transfer_effect(call: &RuntimeCall, from: AccountId) -> Effect {
    let to = match call.args.first() {
        Some(CallArg::Variant { fields, .. }) => match fields.first() {
            Some(CallArg::Bytes(bytes)) => AccountId::try_from(bytes.as_slice()).ok(),
            _ => None,
        },
        _ => None,
    };
    let amount = match call.args.get(1) {
        Some(CallArg::U128(amount)) => Some(*amount),
        _ => None,
    };
    match (to, amount) {
        (Some(to), Some(amount)) => Effect::Transfer { from, to, amount },
        _ => Effect::BadOrigin,
    }
}

/// Shared handle to the mock chain; clones observe the same state.
#[derive(Clone)]
pub struct MockChain {
    state: Arc<Mutex<State>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn connection(&self) -> MockConnection {
        MockConnection {
            chain: self.clone(),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn alice(&self) -> MockSigner {
        MockSigner::from_uri(ALICE)
    }

    #[must_use]
    pub fn bob(&self) -> MockSigner {
        MockSigner::from_uri(BOB)
    }

    /// Prepends a timestamp inherent to every block, shifting user
    /// extrinsics to index 1.
    #[must_use]
    pub fn with_timestamp_inherent(self) -> Self {
        self.state().timestamp_inherent = true;
        self
    }

    pub fn disable_error_resolution(&self) {
        self.state().resolve_errors = false;
    }

    pub fn reject_next_submission(&self) {
        self.reject_submission_at(0);
    }

    /// Rejects the submission `offset` positions after the next one.
    pub fn reject_submission_at(&self, offset: usize) {
        let mut state = self.state();
        state.reject_at = Some(state.submissions + offset);
    }

    pub fn fail_sealing(&self, fail: bool) {
        self.state().fail_sealing = fail;
    }

    /// Readiness probes answer `false` this many times first.
    pub fn set_ready_after(&self, probes: usize) {
        self.state().ready_after = probes;
    }

    /// Ethereum receipts stay invisible for this many polls after sealing.
    pub fn set_receipt_lag(&self, polls: u32) {
        self.state().receipt_lag = polls;
    }

    pub fn index_receipt_now(&self, hash: TxHash) -> TxHash {
        let mut state = self.state();
        let lag = state.receipt_lag;
        state.receipts.insert(hash, lag);
        hash
    }

    #[must_use]
    pub fn head(&self) -> BlockHash {
        self.state().head
    }

    #[must_use]
    pub fn genesis(&self) -> BlockHash {
        self.state().genesis
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.state().sealed
    }

    #[must_use]
    pub fn parent_of(&self, hash: BlockHash) -> Option<BlockHash> {
        self.state()
            .blocks
            .get(&hash)
            .filter(|sealed| sealed.block.header.number > 0)
            .map(|sealed| sealed.block.header.parent_hash)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.state().balances.get(account).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn receipt_polls(&self) -> usize {
        self.state().receipt_polls
    }

    #[must_use]
    pub fn event_fetches(&self) -> usize {
        self.state().event_fetches
    }

    #[must_use]
    pub fn block_fetches(&self) -> usize {
        self.state().block_fetches
    }

    #[must_use]
    pub fn disconnects(&self) -> usize {
        self.state().disconnects
    }
}

pub struct MockConnection {
    chain: MockChain,
    closed: AtomicBool,
}

impl MockConnection {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn open(&self) -> Result<MutexGuard<'_, State>, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }
        Ok(self.chain.state())
    }
}

#[async_trait]
impl ChainConnection for MockConnection {
    type Signer = MockSigner;

    fn derive_signer(&self, uri: &str) -> Result<Self::Signer, ConnectionError> {
        if !uri.starts_with("//") {
            return Err(ConnectionError::Signer(format!("unsupported secret uri {uri}")));
        }
        Ok(MockSigner::from_uri(uri))
    }

    async fn is_ready(&self) -> Result<bool, ConnectionError> {
        let mut state = self.open()?;
        if state.ready_after == 0 {
            return Ok(true);
        }
        state.ready_after -= 1;
        Ok(false)
    }

    async fn submit_signed(&self, extrinsic: &SignedExtrinsic) -> Result<TxHash, ConnectionError> {
        self.open()?.accept(PendingEntry {
            bytes: extrinsic.bytes().to_vec(),
            effect: Effect::Noop,
        })?;
        Ok(extrinsic.hash())
    }

    async fn sign_and_submit(
        &self,
        call: &RuntimeCall,
        signer: &Self::Signer,
    ) -> Result<TxHash, ConnectionError> {
        let mut state = self.open()?;
        let nonce = state.next_nonce();
        let bytes = format!("{}:{nonce}:{call}", signer.uri()).into_bytes();
        let hash = TxHash::new(blake2_256(&bytes));
        let effect = match (call.pallet.as_str(), call.call.as_str()) {
            ("Balances", name) if name.starts_with("transfer") => {
                transfer_effect(call, signer.account_id())
            }
            ("Mock", "bad_origin") => Effect::BadOrigin,
            _ => Effect::Noop,
        };
        state.accept(PendingEntry { bytes, effect })?;
        Ok(hash)
    }

    async fn submit_raw(&self, raw: &RawTransaction) -> Result<TxHash, ConnectionError> {
        let mut state = self.open()?;
        let hash = TxHash::new(blake2_256(raw.as_str().as_bytes()));
        let nonce = state.next_nonce();
        state.accept(PendingEntry {
            bytes: format!("eth:{nonce}:{}", raw.as_str()).into_bytes(),
            effect: Effect::Ethereum(hash),
        })?;
        Ok(hash)
    }

    async fn seal_block(
        &self,
        parent: Option<BlockHash>,
        _finalize: bool,
    ) -> Result<BlockHash, ConnectionError> {
        self.open()?.seal(parent)
    }

    async fn events_at(&self, block: BlockHash) -> Result<Vec<EventRecord>, ConnectionError> {
        let mut state = self.open()?;
        state.event_fetches += 1;
        state
            .blocks
            .get(&block)
            .map(|sealed| sealed.events.clone())
            .ok_or(ConnectionError::BlockNotFound(block))
    }

    async fn block_by_hash(&self, block: BlockHash) -> Result<Block, ConnectionError> {
        let mut state = self.open()?;
        state.block_fetches += 1;
        state
            .blocks
            .get(&block)
            .map(|sealed| sealed.block.clone())
            .ok_or(ConnectionError::BlockNotFound(block))
    }

    async fn module_error(
        &self,
        module_index: u8,
        error_index: u8,
    ) -> Result<Option<ModuleErrorInfo>, ConnectionError> {
        let state = self.open()?;
        if !state.resolve_errors {
            return Err(ConnectionError::Backend("metadata unavailable".into()));
        }
        Ok(state.errors.get(&(module_index, error_index)).cloned())
    }

    async fn raw_receipt_visible(&self, hash: &TxHash) -> Result<bool, ConnectionError> {
        let mut state = self.open()?;
        state.receipt_polls += 1;
        Ok(match state.receipts.get_mut(hash) {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        })
    }

    async fn disconnect(&self) -> Result<(), ConnectionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ConnectionError::Closed);
        }
        self.chain.state().disconnects += 1;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    chain: MockChain,
    fail: bool,
    connects: Arc<AtomicUsize>,
}

impl MockConnector {
    #[must_use]
    pub fn new(chain: MockChain) -> Self {
        Self {
            chain,
            fail: false,
            connects: Arc::default(),
        }
    }

    #[must_use]
    pub fn failing(chain: MockChain) -> Self {
        Self {
            fail: true,
            ..Self::new(chain)
        }
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, _endpoint: &NodeEndpoint) -> Result<Self::Connection, ConnectionError> {
        if self.fail {
            return Err(ConnectionError::Backend("connection refused".into()));
        }
        self.connects.fetch_add(1, Ordering::AcqRel);
        Ok(self.chain.connection())
    }
}

/// Launcher that spawns nothing, or an arbitrary stand-in process when the
/// process lifecycle itself is under test.
#[derive(Clone, Debug, Default)]
pub struct MockLauncher {
    command: Option<(String, Vec<String>)>,
    fail: bool,
    launches: Arc<AtomicUsize>,
}

impl MockLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_process(mut self, program: &str, args: &[&str]) -> Self {
        self.command = Some((
            program.to_owned(),
            args.iter().map(|arg| (*arg).to_owned()).collect(),
        ));
        self
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::Acquire)
    }
}

#[async_trait]
impl NodeLauncher for MockLauncher {
    async fn launch(
        &self,
        _options: &LaunchOptions,
        config: &HarnessConfig,
    ) -> Result<RunningNode, LaunchError> {
        self.launches.fetch_add(1, Ordering::AcqRel);
        if self.fail {
            return Err(LaunchError::Timeout(config.spawn_timeout));
        }
        let process = match &self.command {
            Some((program, args)) => {
                let child = Command::new(program)
                    .args(args)
                    .spawn()
                    .map_err(|source| LaunchError::Spawn {
                        binary: program.clone(),
                        source,
                    })?;
                Some(NodeProcess::new(child, None))
            }
            None => None,
        };
        let ports = config.debug_ports;
        Ok(RunningNode {
            process,
            endpoint: NodeEndpoint::local(ports.p2p, ports.rpc, ports.ws),
        })
    }
}
