//! Output scanning and balance reconciliation
//!
//! One call to [`SyncEngine::sync`] brings an account's history up to the
//! node's tip: it locates the last checkpoint that survived any reorg, scans
//! the outputs created since then for ones the wallet can rewind, re-checks
//! previously seen outputs for spends and reorgs, confirms pending sends, and
//! returns the new history together with balance deltas. The caller's state is
//! never modified; a failed pass leaves it as it was.

use crate::ladder;
use crate::node::{Node, NodeOutput, OutputType, Tip};
use crate::progress::{ProgressReporter, ProgressSink};
use crate::replay;
use crate::{Error, Result};
use mwc_core::{
    decode_message, encode_operation_id, ConsensusParams, Currency, Identifier, Operation,
    OperationExtra, OperationType, ProofBuilder, RecentHeight, Secp256k1Zkp, SwitchType,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sync configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Outputs requested per `get_outputs` page
    pub output_group_size: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let is_mobile = cfg!(target_os = "android") || cfg!(target_os = "ios");
        if is_mobile {
            Self::low_memory()
        } else {
            Self {
                output_group_size: 1_000,
            }
        }
    }
}

impl SyncConfig {
    /// Smaller pages for memory-constrained devices
    pub fn low_memory() -> Self {
        Self {
            output_group_size: 250,
        }
    }
}

/// Durable account state the engine reconciles
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountScanState {
    /// Confirmed history, newest first
    pub operations: Vec<Operation>,
    /// Unconfirmed operations created by the transaction layer
    pub pending_operations: Vec<Operation>,
    /// Checkpoint ladder, newest first
    pub recent_heights: Vec<RecentHeight>,
    /// Highest height the account has been synced to
    pub account_height: u64,
    /// Next unused output identifier
    pub next_identifier: Identifier,
}

/// Result of one sync pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// New authoritative history, newest first
    pub operations: Vec<Operation>,
    /// New checkpoint ladder
    pub recent_heights: Vec<RecentHeight>,
    /// New account height
    pub account_height: u64,
    /// New next identifier
    pub next_identifier: Identifier,
    /// Change in total balance
    pub balance_change: i128,
    /// Change in spendable balance
    pub spendable_balance_change: i128,
}

impl SyncOutcome {
    /// State for the next pass, keeping `pending_operations` as they are
    pub fn into_state(self, pending_operations: Vec<Operation>) -> AccountScanState {
        AccountScanState {
            operations: self.operations,
            pending_operations,
            recent_heights: self.recent_heights,
            account_height: self.account_height,
            next_identifier: self.next_identifier,
        }
    }

    fn unchanged(state: &AccountScanState, recent_heights: Vec<RecentHeight>, tip_height: u64) -> Self {
        Self {
            operations: state.operations.clone(),
            recent_heights,
            account_height: tip_height.max(state.account_height),
            next_identifier: state.next_identifier,
            balance_change: 0,
            spendable_balance_change: 0,
        }
    }
}

#[derive(Debug, Default)]
struct BalanceDeltas {
    balance: i128,
    spendable: i128,
}

impl BalanceDeltas {
    fn credit(&mut self, value: u64, spendable: bool) {
        self.balance += i128::from(value);
        if spendable {
            self.spendable += i128::from(value);
        }
    }

    fn debit(&mut self, value: u64, spendable: bool) {
        self.balance -= i128::from(value);
        if spendable {
            self.spendable -= i128::from(value);
        }
    }
}

/// Outputs found by the scan, in discovery order
#[derive(Debug, Default)]
struct ScanResult {
    discovered: Vec<Operation>,
    highest_identifier: Option<Identifier>,
}

/// Scans one account against a node
pub struct SyncEngine {
    currency: Currency,
    consensus: ConsensusParams,
    proof_builder: ProofBuilder,
    account_id: String,
    zkp: Arc<dyn Secp256k1Zkp>,
    config: SyncConfig,
}

impl SyncEngine {
    /// Create an engine for an account
    pub fn new(
        currency: Currency,
        root_public_key: &[u8],
        account_id: impl Into<String>,
        zkp: Arc<dyn Secp256k1Zkp>,
    ) -> Result<Self> {
        Self::with_config(currency, root_public_key, account_id, zkp, SyncConfig::default())
    }

    /// Create with custom config
    pub fn with_config(
        currency: Currency,
        root_public_key: &[u8],
        account_id: impl Into<String>,
        zkp: Arc<dyn Secp256k1Zkp>,
        config: SyncConfig,
    ) -> Result<Self> {
        if config.output_group_size == 0 {
            return Err(Error::Sync("Output group size must be non-zero".to_string()));
        }
        Ok(Self {
            currency,
            consensus: currency.consensus(),
            proof_builder: ProofBuilder::new(root_public_key)?,
            account_id: account_id.into(),
            zkp,
            config,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile `state` with the node's chain
    ///
    /// Node errors abort the pass and are returned as is. Outputs that fail
    /// to rewind, decode or verify are simply not the wallet's.
    pub async fn sync<N>(
        &self,
        node: &N,
        state: &AccountScanState,
        observer: Option<&mut dyn ProgressSink>,
    ) -> Result<SyncOutcome>
    where
        N: Node + ?Sized,
    {
        let mut progress = ProgressReporter::new(observer);
        let mut recent_heights = state.recent_heights.clone();
        let tip = node.get_tip().await?;

        let behind_checkpoints = recent_heights
            .first()
            .is_some_and(|newest| tip.height < newest.height());
        if tip.height == 0 || behind_checkpoints {
            debug!(tip_height = tip.height, "Node not ready, skipping sync");
            progress.finish();
            return Ok(SyncOutcome::unchanged(state, recent_heights, tip.height));
        }

        if let Some(newest) = recent_heights.first() {
            if newest.height() != tip.height || !newest.matches(&tip.hash) {
                let discarded = ladder::discard_orphaned(node, &mut recent_heights).await?;
                if discarded > 0 {
                    warn!(
                        discarded,
                        remaining = recent_heights.len(),
                        "Chain reorganization detected, discarding checkpoints"
                    );
                }
            }
        }

        let start_height = recent_heights
            .first()
            .map_or(self.consensus.hardware_wallet_starting_height, |checkpoint| {
                checkpoint.height() + 1
            })
            .min(state.account_height.saturating_add(1));
        if tip.height < start_height {
            debug!(tip_height = tip.height, start_height, "Already synced");
            progress.finish();
            return Ok(SyncOutcome::unchanged(state, recent_heights, tip.height));
        }

        info!(
            currency = %self.currency,
            start_height,
            tip_height = tip.height,
            "Starting sync"
        );

        let scan = self
            .scan_outputs(node, start_height, &tip, &mut progress)
            .await?;
        let next_identifier = scan
            .highest_identifier
            .filter(|highest| highest.includes_value(&state.next_identifier))
            .and_then(|highest| highest.next())
            .unwrap_or(state.next_identifier);

        let mut deltas = BalanceDeltas::default();
        let mut operations = state.operations.clone();
        self.detect_spends(node, &mut operations, start_height, state.account_height, &mut deltas)
            .await?;

        // Newest discoveries first; the first occurrence of an id wins.
        let mut new_operations: Vec<Operation> = Vec::with_capacity(scan.discovered.len());
        let mut checked: HashMap<String, usize> = HashMap::new();
        for operation in scan.discovered.into_iter().rev() {
            if checked.contains_key(&operation.id) {
                continue;
            }
            let spendable = self.is_spendable(&operation, tip.height);
            deltas.credit(operation.value, spendable);
            checked.insert(operation.id.clone(), new_operations.len());
            new_operations.push(operation);
        }
        let discovered_count = new_operations.len();

        let mut retained = Vec::with_capacity(operations.len());
        for mut operation in operations {
            if let Some(index) = checked.remove(&operation.id) {
                if operation.block_height.is_some() || operation.extra.spent {
                    let spendable = operation.extra.spent
                        || self.is_spendable(&operation, state.account_height);
                    deltas.debit(operation.value, spendable);
                }
                new_operations[index].fold_from(&operation);
                continue;
            }
            self.reconcile_existing(node, &mut operation, start_height, &tip, state.account_height, &mut deltas)
                .await?;
            retained.push(operation);
        }

        let mut materialized = Vec::new();
        for pending in &state.pending_operations {
            if let Some(&index) = checked.get(&pending.id) {
                if pending.op_type == OperationType::None {
                    deltas.balance -= i128::from(pending.value);
                }
                new_operations[index].fold_from(pending);
            }
            if pending.op_type != OperationType::Out
                || retained.iter().any(|operation| operation.id == pending.id)
            {
                continue;
            }
            let Some(excess) = pending.extra.kernel_excess.as_deref() else {
                continue;
            };
            let kernel = node.get_kernel(excess, start_height, tip.height).await?;
            if let Some(height) = kernel.height {
                let header = node.get_header(height).await?;
                let mut confirmed = pending.clone();
                confirmed.set_confirmation(Some((height, &header.hash[..])));
                confirmed.extra = OperationExtra {
                    kernel_excess: pending.extra.kernel_excess.clone(),
                    recipient_payment_proof_signature: pending
                        .extra
                        .recipient_payment_proof_signature
                        .clone(),
                    ..Default::default()
                };
                deltas.balance -= i128::from(pending.value) + i128::from(pending.fee.unwrap_or(0));
                debug!(id = %pending.id, height, "Pending send confirmed");
                materialized.push(confirmed);
            }
        }

        let mut new_operations: Vec<Operation> =
            materialized.into_iter().rev().chain(new_operations).collect();
        new_operations.sort_by(|first, second| second.date.cmp(&first.date));
        let operations = merge_by_date(new_operations, retained);

        let recent_heights = ladder::rebuild(
            node,
            &tip,
            &recent_heights,
            self.consensus.block_time_seconds,
        )
        .await?;

        progress.finish();
        info!(
            tip_height = tip.height,
            discovered = discovered_count,
            balance_change = deltas.balance,
            spendable_balance_change = deltas.spendable,
            "Sync complete"
        );

        Ok(SyncOutcome {
            operations,
            recent_heights,
            account_height: tip.height.max(state.account_height),
            next_identifier,
            balance_change: deltas.balance,
            spendable_balance_change: deltas.spendable,
        })
    }

    /// Page through every output created in `start_height..=tip`
    ///
    /// The next page is requested while the current one is being processed.
    async fn scan_outputs<N>(
        &self,
        node: &N,
        start_height: u64,
        tip: &Tip,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<ScanResult>
    where
        N: Node + ?Sized,
    {
        let mut scan = ScanResult::default();
        let indices = node.get_pmmr_indices(start_height, tip.height).await?;
        if indices.start_index > indices.end_index {
            return Ok(scan);
        }

        let group_size = self.config.output_group_size;
        let mut page = node
            .get_outputs(indices.start_index, indices.end_index, group_size)
            .await?;
        loop {
            let outputs = std::mem::take(&mut page.outputs);
            if !page.has_more() {
                self.process_outputs(node, outputs, start_height, tip, progress, &mut scan)
                    .await?;
                break;
            }
            let next_start = page.last_retrieved_index + 1;
            let (next_page, processed) = tokio::join!(
                node.get_outputs(next_start, indices.end_index, group_size),
                self.process_outputs(node, outputs, start_height, tip, progress, &mut scan),
            );
            processed?;
            page = next_page?;
        }
        Ok(scan)
    }

    async fn process_outputs<N>(
        &self,
        node: &N,
        outputs: Vec<NodeOutput>,
        start_height: u64,
        tip: &Tip,
        progress: &mut ProgressReporter<'_>,
        scan: &mut ScanResult,
    ) -> Result<()>
    where
        N: Node + ?Sized,
    {
        for output in outputs {
            progress.output_at(output.height, start_height, tip.height);
            if let Some(operation) = self.identify_output(node, output, scan).await? {
                scan.discovered.push(operation);
            }
        }
        Ok(())
    }

    /// Build an operation for `output` if it belongs to the wallet
    async fn identify_output<N>(
        &self,
        node: &N,
        output: NodeOutput,
        scan: &mut ScanResult,
    ) -> Result<Option<Operation>>
    where
        N: Node + ?Sized,
    {
        let Ok(nonce) = self.proof_builder.rewind_nonce(&output.commitment) else {
            return Ok(None);
        };
        let Some(rewound) = self
            .zkp
            .rewind_bulletproof(&output.proof, &output.commitment, &nonce)
            .await
        else {
            return Ok(None);
        };
        let Ok((identifier, switch_type)) = decode_message(&rewound.message) else {
            return Ok(None);
        };
        if !self
            .zkp
            .verify_bulletproof(&output.proof, &output.commitment, &[])
            .await
        {
            return Ok(None);
        }
        if switch_type == SwitchType::None {
            debug!(commitment = %output.commitment, "Ignoring output without switch commitment");
            return Ok(None);
        }
        if let Some(identifier_height) = identifier.height(self.currency) {
            if replay::is_replayed(
                identifier_height,
                output.height,
                self.consensus.identifier_height_overage_threshold(),
                self.consensus.replay_detection_threshold(),
            ) {
                debug!(commitment = %output.commitment, "Ignoring replayed output");
                return Ok(None);
            }
        }

        let highest = scan.highest_identifier.get_or_insert_with(Identifier::root);
        if identifier.includes_value(highest) {
            *highest = identifier.remove_extras(self.currency);
        }

        let header = node.get_header(output.height).await?;
        debug!(commitment = %output.commitment, height = output.height, value = rewound.value, "Found output");
        let commitment = output.commitment.to_string();
        Ok(Some(Operation {
            id: encode_operation_id(&self.account_id, &commitment, OperationType::In),
            hash: String::new(),
            op_type: match output.output_type {
                OutputType::Coinbase => OperationType::CoinbaseReward,
                OutputType::Transaction => OperationType::In,
            },
            value: rewound.value,
            fee: None,
            senders: Vec::new(),
            recipients: Vec::new(),
            block_height: Some(output.height),
            block_hash: Some(hex::encode(header.hash)),
            account_id: self.account_id.clone(),
            date: header.timestamp,
            extra: OperationExtra {
                output_commitment: Some(output.commitment),
                identifier: Some(identifier),
                switch_type: Some(switch_type),
                ..Default::default()
            },
        }))
    }

    /// Mark outputs confirmed below `start_height` as spent once the node no longer has them
    async fn detect_spends<N>(
        &self,
        node: &N,
        operations: &mut [Operation],
        start_height: u64,
        account_height: u64,
        deltas: &mut BalanceDeltas,
    ) -> Result<()>
    where
        N: Node + ?Sized,
    {
        for operation in operations.iter_mut().rev() {
            let Some(block_height) = operation.block_height else {
                continue;
            };
            if operation.op_type == OperationType::Out
                || operation.extra.spent
                || block_height >= start_height
            {
                continue;
            }
            let Some(commitment) = operation.extra.output_commitment else {
                continue;
            };
            let output = node.get_output(&commitment).await?;
            if output.height == Some(block_height) {
                continue;
            }
            let spendable = self.is_spendable(operation, account_height);
            deltas.debit(operation.value, spendable);
            operation.extra.spent = true;
            debug!(id = %operation.id, "Output spent");
        }
        Ok(())
    }

    /// Bring an operation the rescan did not rediscover up to date
    async fn reconcile_existing<N>(
        &self,
        node: &N,
        operation: &mut Operation,
        start_height: u64,
        tip: &Tip,
        account_height: u64,
        deltas: &mut BalanceDeltas,
    ) -> Result<()>
    where
        N: Node + ?Sized,
    {
        let Some(block_height) = operation.block_height else {
            if operation.op_type == OperationType::Out {
                if let Some(excess) = operation.extra.kernel_excess.as_deref() {
                    let kernel = node.get_kernel(excess, start_height, tip.height).await?;
                    if let Some(height) = kernel.height {
                        let header = node.get_header(height).await?;
                        operation.set_confirmation(Some((height, &header.hash[..])));
                    }
                }
            }
            return Ok(());
        };

        if block_height < start_height {
            let maturing = !operation.extra.spent
                && operation.op_type == OperationType::CoinbaseReward
                && !self.consensus.is_coinbase_mature(block_height, account_height)
                && self.consensus.is_coinbase_mature(block_height, tip.height);
            if maturing {
                deltas.spendable += i128::from(operation.value);
            }
            return Ok(());
        }

        if operation.op_type == OperationType::Out || operation.extra.spent {
            if let Some(excess) = operation.extra.kernel_excess.clone() {
                let confirmation = self.find_kernel_near(node, &excess, block_height, tip).await?;
                operation.set_confirmation(confirmation.as_ref().map(|(h, hash)| (*h, &hash[..])));
            }
            return Ok(());
        }

        let Some(commitment) = operation.extra.output_commitment else {
            return Ok(());
        };
        let status = node.get_output(&commitment).await?;
        let owned_height = match status.height {
            Some(height) if self.still_owns(operation, &status.proof).await => Some(height),
            _ => None,
        };

        if let Some(height) = owned_height {
            let header = node.get_header(height).await?;
            let is_coinbase = operation.op_type == OperationType::CoinbaseReward;
            if is_coinbase && self.consensus.is_coinbase_mature(block_height, account_height) {
                deltas.spendable -= i128::from(operation.value);
            }
            operation.set_confirmation(Some((height, &header.hash[..])));
            if is_coinbase && self.consensus.is_coinbase_mature(height, tip.height) {
                deltas.spendable += i128::from(operation.value);
            }
            return Ok(());
        }

        let spendable = self.is_spendable(operation, account_height);
        deltas.debit(operation.value, spendable);
        let confirmation = match operation.extra.kernel_excess.clone() {
            Some(excess) => self.find_kernel_near(node, &excess, block_height, tip).await?,
            None => None,
        };
        match confirmation {
            Some((height, hash)) => {
                operation.extra.spent = true;
                operation.set_confirmation(Some((height, &hash[..])));
            }
            None => {
                warn!(id = %operation.id, "Output no longer on chain, unconfirming");
                operation.set_confirmation(None);
            }
        }
        Ok(())
    }

    /// Rewind and verify the node's current proof against what the operation recorded
    async fn still_owns(&self, operation: &Operation, proof: &[u8]) -> bool {
        let Some(commitment) = operation.extra.output_commitment else {
            return false;
        };
        let Ok(nonce) = self.proof_builder.rewind_nonce(&commitment) else {
            return false;
        };
        let Some(rewound) = self.zkp.rewind_bulletproof(proof, &commitment, &nonce).await else {
            return false;
        };
        let Ok((identifier, switch_type)) = decode_message(&rewound.message) else {
            return false;
        };
        if rewound.value != operation.value
            || operation.extra.identifier != Some(identifier)
            || operation.extra.switch_type != Some(switch_type)
        {
            return false;
        }
        self.zkp.verify_bulletproof(proof, &commitment, &[]).await
    }

    /// Kernel confirmation within a week of `block_height`, capped at the tip
    async fn find_kernel_near<N>(
        &self,
        node: &N,
        excess: &[u8],
        block_height: u64,
        tip: &Tip,
    ) -> Result<Option<(u64, mwc_core::BlockHash)>>
    where
        N: Node + ?Sized,
    {
        let variation = self.consensus.kernel_height_variation_threshold();
        let kernel = node
            .get_kernel(
                excess,
                block_height.saturating_sub(variation),
                block_height.saturating_add(variation).min(tip.height),
            )
            .await?;
        match kernel.height {
            Some(height) => Ok(Some((height, node.get_header(height).await?.hash))),
            None => Ok(None),
        }
    }

    /// Whether an unspent operation counts toward the spendable balance at `height`
    fn is_spendable(&self, operation: &Operation, height: u64) -> bool {
        if operation.op_type != OperationType::CoinbaseReward {
            return true;
        }
        operation
            .block_height
            .is_some_and(|block_height| self.consensus.is_coinbase_mature(block_height, height))
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("currency", &self.currency)
            .field("account_id", &self.account_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Merge two lists sorted newest first, keeping `new` entries ahead on equal dates
fn merge_by_date(new: Vec<Operation>, existing: Vec<Operation>) -> Vec<Operation> {
    let mut merged = Vec::with_capacity(new.len() + existing.len());
    let mut new = new.into_iter().peekable();
    let mut existing = existing.into_iter().peekable();
    loop {
        let take_existing = match (new.peek(), existing.peek()) {
            (Some(first), Some(second)) => second.date > first.date,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_existing { existing.next() } else { new.next() };
        merged.extend(next);
    }
    merged
}
