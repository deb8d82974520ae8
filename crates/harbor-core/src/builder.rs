//! Proposal assembly
//!
//! Turns a caller's desired outputs (plus optional caller-pinned inputs)
//! into a fully balanced, multi-token transaction ready for signing. The
//! build has two phases: reconciliation (partition outputs per token,
//! resolve pinned inputs, fund the remainder through utxo selection,
//! append change) and finalization (compute the sighash once, attach
//! unlocking data per input).
//!
//! When at least one change output was appended the full output list is
//! reordered, so change position carries no information; with no change
//! the declared order is preserved exactly.

use crate::keys::Signer;
use crate::selection::UtxoSelector;
use crate::transaction::{
    Capabilities, Input, Output, OutputScript, TokenId, Transaction, TxId, TRANSFER_TX_VERSION,
};
use crate::wallet::{Utxo, UtxoQuery, WalletAdapter};
use crate::{Address, Error, Result};
use rand::seq::SliceRandom;

/// A declared output, prior to reconciliation
#[derive(Debug, Clone)]
pub enum OutputRequest {
    /// Monetary transfer to an address
    Transfer {
        /// Destination address
        address: Address,
        /// Amount in base units
        value: u64,
        /// Token being transferred
        token: TokenId,
        /// Optional absolute timelock
        timelock: Option<u32>,
    },
    /// Authority output conferring mint/melt capability
    Authority {
        /// Destination address
        address: Address,
        /// Token whose authority is conferred
        token: TokenId,
        /// Capabilities carried
        capabilities: Capabilities,
        /// Optional absolute timelock
        timelock: Option<u32>,
    },
    /// Opaque data output, inserted verbatim
    Data {
        /// Raw payload
        payload: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
enum PinnedInput {
    Outpoint { tx_id: TxId, index: u8 },
    Resolved(Utxo),
}

/// A reconciled, unsigned proposal
#[derive(Debug, Clone)]
pub struct PendingProposal {
    /// The balanced, unsigned transaction
    pub transaction: Transaction,
    /// Utxos backing the inputs, in input order
    pub resolved_inputs: Vec<Utxo>,
    /// Whether a change output was appended (and the outputs reordered)
    pub change_added: bool,
}

/// Proposal builder over a wallet adapter
pub struct ProposalBuilder<'a, W: WalletAdapter> {
    wallet: &'a W,
    version: u16,
    outputs: Vec<OutputRequest>,
    pinned: Vec<PinnedInput>,
    change_address: Option<Address>,
    selector: UtxoSelector,
}

impl<'a, W: WalletAdapter> ProposalBuilder<'a, W> {
    /// Create a builder for a plain transfer transaction.
    pub fn new(wallet: &'a W) -> Self {
        Self {
            wallet,
            version: TRANSFER_TX_VERSION,
            outputs: Vec::new(),
            pinned: Vec::new(),
            change_address: None,
            selector: UtxoSelector::new(),
        }
    }

    /// Declare a monetary output.
    pub fn add_output(
        &mut self,
        address: Address,
        value: u64,
        token: TokenId,
        timelock: Option<u32>,
    ) -> &mut Self {
        self.outputs.push(OutputRequest::Transfer {
            address,
            value,
            token,
            timelock,
        });
        self
    }

    /// Declare an authority output.
    pub fn add_authority_output(
        &mut self,
        address: Address,
        token: TokenId,
        capabilities: Capabilities,
        timelock: Option<u32>,
    ) -> &mut Self {
        self.outputs.push(OutputRequest::Authority {
            address,
            token,
            capabilities,
            timelock,
        });
        self
    }

    /// Declare a data output. It bypasses address and script resolution.
    pub fn add_data_output(&mut self, payload: Vec<u8>) -> &mut Self {
        self.outputs.push(OutputRequest::Data { payload });
        self
    }

    /// Pin an input by outpoint; it is resolved against the wallet during
    /// reconciliation.
    pub fn pin_input(&mut self, tx_id: TxId, index: u8) -> &mut Self {
        self.pinned.push(PinnedInput::Outpoint { tx_id, index });
        self
    }

    /// Pin an already-resolved utxo as an input.
    pub fn pin_utxo(&mut self, utxo: Utxo) -> &mut Self {
        self.pinned.push(PinnedInput::Resolved(utxo));
        self
    }

    /// Direct all change to an explicit address instead of freshly
    /// allocated wallet addresses.
    pub fn change_address(&mut self, address: Address) -> &mut Self {
        self.change_address = Some(address);
        self
    }

    /// Number of declared outputs (change not included)
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Run reconciliation, producing a balanced unsigned proposal.
    pub async fn build_pending(&self) -> Result<PendingProposal> {
        tracing::debug!(
            outputs = self.outputs.len(),
            pinned = self.pinned.len(),
            "assembling proposal"
        );

        let mut book = TokenBook::default();

        // Partition declared outputs per token
        for request in &self.outputs {
            match request {
                OutputRequest::Transfer { token, value, .. } => {
                    let slot = book.slot(token);
                    book.required[slot] =
                        book.required[slot].checked_add(*value).ok_or_else(|| {
                            Error::InvalidValue(format!("output sum overflow for token {token}"))
                        })?;
                }
                OutputRequest::Authority { token, .. } => {
                    if token.is_native() {
                        return Err(Error::InvalidValue(
                            "the native token has no authorities".to_string(),
                        ));
                    }
                    book.slot(token);
                }
                OutputRequest::Data { .. } => {}
            }
        }

        // Resolve caller-pinned inputs
        let mut resolved: Vec<Utxo> = Vec::new();
        for pin in &self.pinned {
            let utxo = match pin {
                PinnedInput::Outpoint { tx_id, index } => self
                    .wallet
                    .get_utxo(tx_id, *index)
                    .await?
                    .ok_or_else(|| {
                        Error::InvalidInputSelection(format!(
                            "Input {tx_id} ({index}) not found in the wallet."
                        ))
                    })?,
                PinnedInput::Resolved(utxo) => utxo.clone(),
            };

            let slot = book.find(&utxo.token).ok_or_else(|| {
                Error::InvalidInputSelection(format!(
                    "Input {} ({}) carries token {}, which is not present among the outputs.",
                    utxo.tx_id, utxo.index, utxo.token
                ))
            })?;
            book.has_pinned[slot] = true;
            if !utxo.is_authority() {
                book.pinned_sum[slot] =
                    book.pinned_sum[slot].checked_add(utxo.value).ok_or_else(|| {
                        Error::InvalidValue(format!("input sum overflow for token {}", utxo.token))
                    })?;
            }
            resolved.push(utxo);
        }

        // Fund every token: pinned inputs must cover their token in full,
        // everything else goes through utxo selection
        let mut change_pending: Vec<(TokenId, u64)> = Vec::new();
        for slot in 0..book.order.len() {
            let token = book.order[slot].clone();
            let required = book.required[slot];

            if book.has_pinned[slot] {
                let pinned_sum = book.pinned_sum[slot];
                if pinned_sum < required {
                    return Err(Error::InvalidInputSelection(format!(
                        "Sum of inputs ({pinned_sum}) is smaller than the sum of outputs \
                         ({required}) for token {token}."
                    )));
                }
                if pinned_sum > required {
                    change_pending.push((token, pinned_sum - required));
                }
            } else if required > 0 {
                let candidates = self
                    .wallet
                    .query_utxos(&token, &UtxoQuery::amount(required))
                    .await?;
                let selection = self.selector.select_amount(candidates, &token, required)?;
                resolved.extend(selection.utxos);
                if selection.change > 0 {
                    change_pending.push((token, selection.change));
                }
            }
        }

        // Change addresses: allocation goes through the wallet-wide
        // cursor, one await at a time
        let mut change_outputs: Vec<(TokenId, u64, Address)> = Vec::new();
        for (token, value) in change_pending {
            let address = match &self.change_address {
                Some(address) => address.clone(),
                None => self.wallet.next_unused_address().await?.0,
            };
            tracing::debug!(token = %token, value, change_address = %address, "appending change");
            change_outputs.push((token, value, address));
        }
        let change_added = !change_outputs.is_empty();

        // Materialize outputs in declaration order, change last
        let mut outputs: Vec<Output> = Vec::with_capacity(self.outputs.len() + change_outputs.len());
        for request in &self.outputs {
            match request {
                OutputRequest::Transfer {
                    address,
                    value,
                    token,
                    timelock,
                } => outputs.push(Output::new(
                    *value,
                    book.token_data(token),
                    OutputScript::for_address(address.clone(), *timelock),
                )),
                OutputRequest::Authority {
                    address,
                    token,
                    capabilities,
                    timelock,
                } => outputs.push(Output::authority(
                    *capabilities,
                    book.token_data(token),
                    OutputScript::for_address(address.clone(), *timelock),
                )),
                OutputRequest::Data { payload } => outputs.push(Output::data(payload.clone())),
            }
        }
        for (token, value, address) in change_outputs {
            outputs.push(Output::new(
                value,
                book.token_data(&token),
                OutputScript::for_address(address, None),
            ));
        }

        if change_added {
            shuffle_outputs(&mut outputs, &mut rand::thread_rng());
        }

        let mut transaction = Transaction::new(self.version);
        transaction.inputs = resolved
            .iter()
            .map(|u| Input::new(u.tx_id.clone(), u.index))
            .collect();
        transaction.outputs = outputs;
        transaction.tokens = book.listed();

        tracing::info!(
            inputs = transaction.inputs.len(),
            outputs = transaction.outputs.len(),
            tokens = transaction.tokens.len(),
            change_added,
            "proposal assembled"
        );

        Ok(PendingProposal {
            transaction,
            resolved_inputs: resolved,
            change_added,
        })
    }

    /// Reconcile and finalize in one step.
    pub async fn build_and_sign<S: Signer>(&self, signer: &S) -> Result<Transaction> {
        let pending = self.build_pending().await?;
        finalize(pending, signer)
    }
}

/// Finalize a pending proposal: compute the signature hash once, then
/// attach unlocking data to every input using its utxo's derivation path.
pub fn finalize<S: Signer + ?Sized>(mut pending: PendingProposal, signer: &S) -> Result<Transaction> {
    let digest = pending.transaction.sighash_digest()?;
    for (input, utxo) in pending
        .transaction
        .inputs
        .iter_mut()
        .zip(&pending.resolved_inputs)
    {
        input.data = Some(signer.unlocking_data(&digest, &utxo.path)?);
    }
    Ok(pending.transaction)
}

/// Fisher–Yates reorder of the output list.
pub(crate) fn shuffle_outputs<R: rand::Rng>(outputs: &mut [Output], rng: &mut R) {
    outputs.shuffle(rng);
}

/// Per-token bookkeeping: first-reference order, required sums, pinned sums.
#[derive(Debug, Default)]
struct TokenBook {
    order: Vec<TokenId>,
    required: Vec<u64>,
    pinned_sum: Vec<u64>,
    has_pinned: Vec<bool>,
}

impl TokenBook {
    fn slot(&mut self, token: &TokenId) -> usize {
        if let Some(slot) = self.find(token) {
            return slot;
        }
        self.order.push(token.clone());
        self.required.push(0);
        self.pinned_sum.push(0);
        self.has_pinned.push(false);
        self.order.len() - 1
    }

    fn find(&self, token: &TokenId) -> Option<usize> {
        self.order.iter().position(|t| t == token)
    }

    /// Token-data byte (without authority flag) for a declared token.
    fn token_data(&self, token: &TokenId) -> u8 {
        if token.is_native() {
            return 0;
        }
        let position = self
            .order
            .iter()
            .filter(|t| !t.is_native())
            .position(|t| t == token)
            .expect("token was declared during partitioning");
        position as u8 + 1
    }

    /// The transaction token list: non-native tokens in first-reference order.
    fn listed(&self) -> Vec<TokenId> {
        self.order.iter().filter(|t| !t.is_native()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::MemoryWallet;
    use harbor_params::Network;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn address(seq: u8) -> Address {
        Address::from_pubkey_hash([seq; 20], &Network::mainnet())
    }

    fn utxo(value: u64, token: TokenId, seq: u8) -> Utxo {
        Utxo {
            tx_id: TxId::new(vec![seq; 32]),
            index: 0,
            address: address(seq),
            path: format!("m/44'/280'/0'/0/{seq}"),
            token,
            value,
            authorities: 0,
            timelock: None,
            heightlock: None,
            locked: false,
        }
    }

    fn token() -> TokenId {
        "01".parse().unwrap()
    }

    fn wallet_with_addresses(n: u8) -> MemoryWallet {
        let wallet = MemoryWallet::new();
        for i in 0..n {
            wallet.add_address(address(0xf0 + i), format!("m/44'/280'/0'/0/{i}"));
        }
        wallet
    }

    #[tokio::test]
    async fn test_exact_pinned_input_no_change_no_shuffle() {
        let wallet = wallet_with_addresses(2);
        wallet.add_utxo(utxo(25, token(), 1));

        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 10, token(), None)
            .add_output(address(11), 15, token(), None)
            .pin_input(TxId::new(vec![1; 32]), 0);

        let pending = builder.build_pending().await.unwrap();
        assert!(!pending.change_added);
        assert_eq!(pending.transaction.inputs.len(), 1);
        assert_eq!(pending.transaction.outputs.len(), 2);

        // Declared order is preserved byte-for-byte when nothing was added
        assert_eq!(pending.transaction.outputs[0].value, 10);
        assert_eq!(pending.transaction.outputs[1].value, 15);
        assert_eq!(pending.transaction.tokens, vec![token()]);
        assert_eq!(wallet.allocated(), 0);
    }

    #[tokio::test]
    async fn test_overfunded_pinned_input_appends_change() {
        let wallet = wallet_with_addresses(2);
        wallet.add_utxo(utxo(30, token(), 1));

        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 10, token(), None)
            .pin_input(TxId::new(vec![1; 32]), 0);

        let pending = builder.build_pending().await.unwrap();
        assert!(pending.change_added);
        assert_eq!(pending.transaction.outputs.len(), 2);

        let mut values: Vec<u64> = pending.transaction.outputs.iter().map(|o| o.value).collect();
        values.sort_unstable();
        assert_eq!(values, vec![10, 20]);
        // Change went to a freshly allocated wallet address
        assert_eq!(wallet.allocated(), 1);
    }

    #[tokio::test]
    async fn test_pinned_input_not_found() {
        let wallet = wallet_with_addresses(1);
        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 10, token(), None)
            .pin_input(TxId::new(vec![9; 32]), 3);

        let err = builder.build_pending().await.unwrap_err();
        match err {
            Error::InvalidInputSelection(msg) => {
                assert!(msg.contains("not found"));
                assert!(msg.contains("(3)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_pinned_input_for_undeclared_token() {
        let wallet = wallet_with_addresses(1);
        let token_02: TokenId = "02".parse().unwrap();
        wallet.add_utxo(utxo(10, token_02.clone(), 1));

        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 10, token(), None)
            .pin_input(TxId::new(vec![1; 32]), 0);

        let err = builder.build_pending().await.unwrap_err();
        match err {
            Error::InvalidInputSelection(msg) => {
                assert!(msg.contains("02"), "message should name the token: {msg}");
                assert!(msg.contains(&TxId::new(vec![1; 32]).to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_pinned_sum_below_outputs() {
        let wallet = wallet_with_addresses(1);
        wallet.add_utxo(utxo(5, token(), 1));

        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 10, token(), None)
            .pin_input(TxId::new(vec![1; 32]), 0);

        let err = builder.build_pending().await.unwrap_err();
        match err {
            Error::InvalidInputSelection(msg) => {
                assert!(msg.contains("Sum of inputs (5)"));
                assert!(msg.contains("(10)"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_selection_funds_unpinned_tokens() {
        let wallet = wallet_with_addresses(2);
        wallet.add_utxo(utxo(30, token(), 1));

        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 10, token(), None)
            .add_output(address(11), 15, token(), None);

        let pending = builder.build_pending().await.unwrap();
        assert_eq!(pending.transaction.inputs.len(), 1);
        assert_eq!(pending.transaction.outputs.len(), 3);
        assert!(pending.change_added);

        let mut values: Vec<u64> = pending.transaction.outputs.iter().map(|o| o.value).collect();
        values.sort_unstable();
        assert_eq!(values, vec![5, 10, 15]);
        assert_eq!(pending.transaction.tokens, vec![token()]);
    }

    #[tokio::test]
    async fn test_no_utxos_error_names_token_and_amount() {
        let wallet = wallet_with_addresses(1);
        let mut builder = ProposalBuilder::new(&wallet);
        builder.add_output(address(10), 10, token(), None);

        let err = builder.build_pending().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "No utxos available to fill the request. Token: 01 - Amount: 10."
        );
    }

    #[tokio::test]
    async fn test_explicit_change_address() {
        let wallet = wallet_with_addresses(2);
        wallet.add_utxo(utxo(100, TokenId::native(), 1));

        let change_to = address(0x77);
        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 40, TokenId::native(), None)
            .change_address(change_to.clone());

        let pending = builder.build_pending().await.unwrap();
        let change = pending
            .transaction
            .outputs
            .iter()
            .find(|o| o.value == 60)
            .expect("change output present");
        assert_eq!(change.script.address(), Some(&change_to));
        // Explicit change address: the wallet cursor is untouched
        assert_eq!(wallet.allocated(), 0);
    }

    #[tokio::test]
    async fn test_multi_token_bookkeeping() {
        let wallet = wallet_with_addresses(4);
        let token_02: TokenId = "02".parse().unwrap();
        wallet.add_utxo(utxo(10, token(), 1));
        wallet.add_utxo(utxo(50, token_02.clone(), 2));
        wallet.add_utxo(utxo(7, TokenId::native(), 3));

        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 7, TokenId::native(), None)
            .add_output(address(11), 10, token(), None)
            .add_output(address(12), 20, token_02.clone(), None);

        let pending = builder.build_pending().await.unwrap();
        // Token list excludes the native token, first-reference order
        assert_eq!(pending.transaction.tokens, vec![token(), token_02]);
        assert_eq!(pending.transaction.inputs.len(), 3);
        // Only token 02 was overfunded
        assert!(pending.change_added);
        assert_eq!(pending.transaction.outputs.len(), 4);

        for output in &pending.transaction.outputs {
            match output.value {
                7 => assert_eq!(output.token_data, 0),
                10 => assert_eq!(output.token_data, 1),
                20 | 30 => assert_eq!(output.token_data, 2),
                other => panic!("unexpected output value {other}"),
            }
        }
    }

    #[tokio::test]
    async fn test_data_output_passthrough() {
        let wallet = wallet_with_addresses(1);
        wallet.add_utxo(utxo(10, token(), 1));

        let mut builder = ProposalBuilder::new(&wallet);
        builder
            .add_output(address(10), 10, token(), None)
            .add_data_output(vec![0xca, 0xfe]);

        let pending = builder.build_pending().await.unwrap();
        assert_eq!(pending.transaction.outputs.len(), 2);
        assert_eq!(
            pending.transaction.outputs[1].script.to_bytes(),
            vec![0xca, 0xfe]
        );
        assert_eq!(pending.transaction.outputs[1].token_data, 0);
    }

    #[tokio::test]
    async fn test_native_authority_rejected() {
        let wallet = wallet_with_addresses(1);
        let mut builder = ProposalBuilder::new(&wallet);
        builder.add_authority_output(address(10), TokenId::native(), Capabilities::mint(), None);

        assert!(builder.build_pending().await.is_err());
    }

    #[test]
    fn test_shuffle_preserves_multiset_and_permutes() {
        let base: Vec<Output> = (1..=6u64)
            .map(|v| {
                Output::new(
                    v,
                    0,
                    OutputScript::for_address(address(v as u8), None),
                )
            })
            .collect();

        let mut any_permuted = false;
        for seed in 0..8u64 {
            let mut outputs = base.clone();
            let mut rng = StdRng::seed_from_u64(seed);
            shuffle_outputs(&mut outputs, &mut rng);

            let mut values: Vec<u64> = outputs.iter().map(|o| o.value).collect();
            values.sort_unstable();
            assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);

            if outputs.iter().map(|o| o.value).collect::<Vec<_>>()
                != base.iter().map(|o| o.value).collect::<Vec<_>>()
            {
                any_permuted = true;
            }
        }
        assert!(any_permuted, "shuffle never changed the order across seeds");
    }
}
