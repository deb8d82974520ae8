//! Token lifecycle operations
//!
//! Create-token, mint, melt, delegate-authority and destroy-authority
//! recipes, composed from the utxo selection engine, the deposit formula
//! and the shared finalization step. Outputs are appended in a fixed
//! order — token amount, mint authority, melt authority, data, change —
//! and recipes never reorder them.
//!
//! Authority destinations not owned by the wallet are rejected before any
//! utxo query unless the caller explicitly opts into external addresses.

use crate::builder::{finalize, PendingProposal};
use crate::fees::DepositCalculator;
use crate::keys::Signer;
use crate::selection::UtxoSelector;
use crate::transaction::{
    Capabilities, Input, Output, OutputScript, TokenId, TokenInfo, Transaction,
    CREATE_TOKEN_TX_VERSION, TRANSFER_TX_VERSION,
};
use crate::wallet::{Utxo, UtxoQuery, WalletAdapter};
use crate::{Address, Error, Result};

/// Options for [`TokenManager::create_token`]
#[derive(Debug, Clone)]
pub struct CreateTokenOptions {
    /// Destination of the minted amount; a fresh wallet address when unset
    pub destination: Option<Address>,
    /// Emit a mint-authority output so more units can be minted later
    pub create_mint_authority: bool,
    /// Emit a melt-authority output so units can be melted later
    pub create_melt_authority: bool,
    /// Destination of the mint authority; a fresh wallet address when unset
    pub mint_authority_address: Option<Address>,
    /// Destination of the melt authority; a fresh wallet address when unset
    pub melt_authority_address: Option<Address>,
    /// Allow authority destinations outside the wallet
    pub allow_external_authority: bool,
    /// Data outputs appended after the authorities
    pub data: Vec<Vec<u8>>,
    /// Explicit change address for the deposit surplus
    pub change_address: Option<Address>,
}

impl Default for CreateTokenOptions {
    fn default() -> Self {
        Self {
            destination: None,
            create_mint_authority: true,
            create_melt_authority: true,
            mint_authority_address: None,
            melt_authority_address: None,
            allow_external_authority: false,
            data: Vec::new(),
            change_address: None,
        }
    }
}

/// Options for [`TokenManager::mint`]
#[derive(Debug, Clone)]
pub struct MintOptions {
    /// Destination of the minted amount; a fresh wallet address when unset
    pub destination: Option<Address>,
    /// Emit a fresh mint-authority output, keeping the capability alive
    pub keep_authority: bool,
    /// Destination of the kept authority; a fresh wallet address when unset
    pub authority_address: Option<Address>,
    /// Allow authority destinations outside the wallet
    pub allow_external_authority: bool,
    /// Data outputs appended after the authority
    pub data: Vec<Vec<u8>>,
    /// Explicit change address for the deposit surplus
    pub change_address: Option<Address>,
}

impl Default for MintOptions {
    fn default() -> Self {
        Self {
            destination: None,
            keep_authority: true,
            authority_address: None,
            allow_external_authority: false,
            data: Vec::new(),
            change_address: None,
        }
    }
}

/// Options for [`TokenManager::melt`]
#[derive(Debug, Clone)]
pub struct MeltOptions {
    /// Destination of the released native tokens; a fresh wallet address
    /// when unset
    pub withdrawal_address: Option<Address>,
    /// Emit a fresh melt-authority output, keeping the capability alive
    pub keep_authority: bool,
    /// Destination of the kept authority; a fresh wallet address when unset
    pub authority_address: Option<Address>,
    /// Allow authority destinations outside the wallet
    pub allow_external_authority: bool,
    /// Explicit change address for over-selected token units
    pub change_address: Option<Address>,
}

impl Default for MeltOptions {
    fn default() -> Self {
        Self {
            withdrawal_address: None,
            keep_authority: true,
            authority_address: None,
            allow_external_authority: false,
            change_address: None,
        }
    }
}

/// Token operations over a wallet adapter and a signer
pub struct TokenManager<'a, W: WalletAdapter, S: Signer> {
    wallet: &'a W,
    signer: &'a S,
    selector: UtxoSelector,
    deposit: DepositCalculator,
}

impl<'a, W: WalletAdapter, S: Signer> TokenManager<'a, W, S> {
    /// Create a token manager.
    pub fn new(wallet: &'a W, signer: &'a S) -> Self {
        Self {
            wallet,
            signer,
            selector: UtxoSelector::new(),
            deposit: DepositCalculator::new(),
        }
    }

    /// Create a new token, minting `amount` units.
    ///
    /// Funds the native-token deposit through utxo selection and emits a
    /// version-2 transaction whose outputs reference the token being
    /// created as index 1.
    pub async fn create_token(
        &self,
        name: &str,
        symbol: &str,
        amount: u64,
        options: CreateTokenOptions,
    ) -> Result<Transaction> {
        let info = TokenInfo {
            name: name.to_string(),
            symbol: symbol.to_string(),
        };
        info.validate()?;
        self.check_authority_destination(
            options.mint_authority_address.as_ref(),
            options.allow_external_authority,
        )
        .await?;
        self.check_authority_destination(
            options.melt_authority_address.as_ref(),
            options.allow_external_authority,
        )
        .await?;

        let deposit = self.deposit.mint_deposit(amount)?;
        let selection = self.fund_native(deposit).await?;
        tracing::info!(name, symbol, amount, deposit, "creating token");

        let destination = self.resolve_destination(options.destination).await?;
        let mut outputs = vec![Output::new(
            amount,
            1,
            OutputScript::for_address(destination, None),
        )];
        if options.create_mint_authority {
            let address = self
                .resolve_destination(options.mint_authority_address)
                .await?;
            outputs.push(Output::authority(
                Capabilities::mint(),
                1,
                OutputScript::for_address(address, None),
            ));
        }
        if options.create_melt_authority {
            let address = self
                .resolve_destination(options.melt_authority_address)
                .await?;
            outputs.push(Output::authority(
                Capabilities::melt(),
                1,
                OutputScript::for_address(address, None),
            ));
        }
        for payload in options.data {
            outputs.push(Output::data(payload));
        }
        let change_added = self
            .append_native_change(&mut outputs, selection.change, options.change_address)
            .await?;

        let mut transaction = assemble(CREATE_TOKEN_TX_VERSION, &selection.utxos, outputs);
        transaction.token_info = Some(info);
        finalize(
            PendingProposal {
                transaction,
                resolved_inputs: selection.utxos,
                change_added,
            },
            self.signer,
        )
    }

    /// Mint `amount` new units of an existing token.
    ///
    /// Requires one mint-authority utxo in the wallet and funds the
    /// native-token deposit through utxo selection.
    pub async fn mint(
        &self,
        token: &TokenId,
        amount: u64,
        options: MintOptions,
    ) -> Result<Transaction> {
        self.check_authority_destination(
            options.authority_address.as_ref(),
            options.allow_external_authority,
        )
        .await?;

        let authority = self.fetch_authority(token, Capabilities::mint()).await?;
        let deposit = self.deposit.mint_deposit(amount)?;
        let selection = self.fund_native(deposit).await?;
        tracing::info!(token = %token, amount, deposit, "minting tokens");

        let destination = self.resolve_destination(options.destination).await?;
        let mut outputs = vec![Output::new(
            amount,
            1,
            OutputScript::for_address(destination, None),
        )];
        if options.keep_authority {
            let address = self.resolve_destination(options.authority_address).await?;
            outputs.push(Output::authority(
                Capabilities::mint(),
                1,
                OutputScript::for_address(address, None),
            ));
        }
        for payload in options.data {
            outputs.push(Output::data(payload));
        }
        let change_added = self
            .append_native_change(&mut outputs, selection.change, options.change_address)
            .await?;

        let mut spent = vec![authority];
        spent.extend(selection.utxos);
        let mut transaction = assemble(TRANSFER_TX_VERSION, &spent, outputs);
        transaction.tokens = vec![token.clone()];
        finalize(
            PendingProposal {
                transaction,
                resolved_inputs: spent,
                change_added,
            },
            self.signer,
        )
    }

    /// Melt `amount` units of a token, releasing the corresponding
    /// native-token withdrawal.
    ///
    /// Requires one melt-authority utxo in the wallet.
    pub async fn melt(
        &self,
        token: &TokenId,
        amount: u64,
        options: MeltOptions,
    ) -> Result<Transaction> {
        self.check_authority_destination(
            options.authority_address.as_ref(),
            options.allow_external_authority,
        )
        .await?;

        let authority = self.fetch_authority(token, Capabilities::melt()).await?;
        let candidates = self
            .wallet
            .query_utxos(token, &UtxoQuery::amount(amount))
            .await?;
        let selection = self.selector.select_amount(candidates, token, amount)?;
        let withdrawal = self.deposit.melt_withdrawal(amount)?;
        tracing::info!(token = %token, amount, withdrawal, "melting tokens");

        let mut outputs = Vec::new();
        if withdrawal > 0 {
            let address = self
                .resolve_destination(options.withdrawal_address)
                .await?;
            outputs.push(Output::new(
                withdrawal,
                0,
                OutputScript::for_address(address, None),
            ));
        }
        if options.keep_authority {
            let address = self.resolve_destination(options.authority_address).await?;
            outputs.push(Output::authority(
                Capabilities::melt(),
                1,
                OutputScript::for_address(address, None),
            ));
        }
        let mut change_added = false;
        if selection.change > 0 {
            let address = match options.change_address {
                Some(address) => address,
                None => self.wallet.next_unused_address().await?.0,
            };
            outputs.push(Output::new(
                selection.change,
                1,
                OutputScript::for_address(address, None),
            ));
            change_added = true;
        }

        let mut spent = vec![authority];
        spent.extend(selection.utxos);
        let mut transaction = assemble(TRANSFER_TX_VERSION, &spent, outputs);
        // The token list is only needed when an output still references
        // the token
        if transaction.outputs.iter().any(|o| o.token_index().is_some()) {
            transaction.tokens = vec![token.clone()];
        }
        finalize(
            PendingProposal {
                transaction,
                resolved_inputs: spent,
                change_added,
            },
            self.signer,
        )
    }

    /// Hand an authority over to `destination`, optionally keeping a
    /// second authority output in the wallet.
    pub async fn delegate_authority(
        &self,
        token: &TokenId,
        capabilities: Capabilities,
        destination: Address,
        create_another: bool,
        allow_external_authority: bool,
    ) -> Result<Transaction> {
        self.check_authority_destination(Some(&destination), allow_external_authority)
            .await?;

        let authority = self.fetch_authority(token, capabilities).await?;
        tracing::info!(token = %token, ?capabilities, "delegating authority");

        let mut outputs = vec![Output::authority(
            capabilities,
            1,
            OutputScript::for_address(destination, None),
        )];
        if create_another {
            let address = self.wallet.next_unused_address().await?.0;
            outputs.push(Output::authority(
                capabilities,
                1,
                OutputScript::for_address(address, None),
            ));
        }

        let spent = vec![authority];
        let mut transaction = assemble(TRANSFER_TX_VERSION, &spent, outputs);
        transaction.tokens = vec![token.clone()];
        finalize(
            PendingProposal {
                transaction,
                resolved_inputs: spent,
                change_added: false,
            },
            self.signer,
        )
    }

    /// Destroy `count` authority utxos of a token. The consumed
    /// capabilities are gone for good; no authority output is emitted.
    pub async fn destroy_authority(
        &self,
        token: &TokenId,
        capabilities: Capabilities,
        count: usize,
    ) -> Result<Transaction> {
        let candidates = self
            .wallet
            .query_utxos(token, &UtxoQuery::authorities(capabilities, count))
            .await?;
        let spent = self
            .selector
            .select_authorities(candidates, token, capabilities, count)?;
        tracing::info!(token = %token, count, "destroying authorities");

        let transaction = assemble(TRANSFER_TX_VERSION, &spent, Vec::new());
        finalize(
            PendingProposal {
                transaction,
                resolved_inputs: spent,
                change_added: false,
            },
            self.signer,
        )
    }

    /// Reject authority destinations outside the wallet unless the caller
    /// explicitly opted in. Runs before any utxo query, so a bad address
    /// fails fast.
    async fn check_authority_destination(
        &self,
        address: Option<&Address>,
        allow_external: bool,
    ) -> Result<()> {
        let Some(address) = address else {
            return Ok(());
        };
        if allow_external {
            return Ok(());
        }
        if !self.wallet.is_address_mine(address).await? {
            return Err(Error::AuthorityAddress(format!(
                "{address} does not belong to the wallet; set allow_external_authority to use it"
            )));
        }
        Ok(())
    }

    async fn fetch_authority(&self, token: &TokenId, capabilities: Capabilities) -> Result<Utxo> {
        let candidates = self
            .wallet
            .query_utxos(token, &UtxoQuery::authorities(capabilities, 1))
            .await?;
        let mut selected = self
            .selector
            .select_authorities(candidates, token, capabilities, 1)?;
        Ok(selected.remove(0))
    }

    async fn fund_native(&self, amount: u64) -> Result<crate::selection::SelectionResult> {
        let native = TokenId::native();
        let candidates = self
            .wallet
            .query_utxos(&native, &UtxoQuery::amount(amount))
            .await?;
        self.selector.select_amount(candidates, &native, amount)
    }

    async fn resolve_destination(&self, address: Option<Address>) -> Result<Address> {
        match address {
            Some(address) => Ok(address),
            None => Ok(self.wallet.next_unused_address().await?.0),
        }
    }

    async fn append_native_change(
        &self,
        outputs: &mut Vec<Output>,
        change: u64,
        change_address: Option<Address>,
    ) -> Result<bool> {
        if change == 0 {
            return Ok(false);
        }
        let address = match change_address {
            Some(address) => address,
            None => self.wallet.next_unused_address().await?.0,
        };
        outputs.push(Output::new(
            change,
            0,
            OutputScript::for_address(address, None),
        ));
        Ok(true)
    }
}

fn assemble(version: u16, spent: &[Utxo], outputs: Vec<Output>) -> Transaction {
    let mut transaction = Transaction::new(version);
    transaction.inputs = spent
        .iter()
        .map(|u| Input::new(u.tx_id.clone(), u.index))
        .collect();
    transaction.outputs = outputs;
    transaction
}
