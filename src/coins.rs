//! Coins and the coin view consulted during validation

use crate::script::Script;
use crate::types::*;
use std::collections::HashMap;

/// Coin: an output plus the provenance needed by the validation rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub outpoint: OutPoint,
    pub version: i32,
    /// Confirmation height, -1 when unknown or unconfirmed
    pub height: i32,
    pub coinbase: bool,
    pub value: Integer,
    pub script: Script,
}

impl Coin {
    /// Coin for a bare output with unknown height and origin
    pub fn from_output(outpoint: OutPoint, output: &TransactionOutput) -> Self {
        Self {
            outpoint,
            version: 1,
            height: -1,
            coinbase: false,
            value: output.value,
            script: output.script_pubkey.clone(),
        }
    }

    /// Coin for output `index` of `tx`, confirmed at `height`
    pub fn from_tx(tx: &Transaction, index: u32, height: i32) -> Option<Self> {
        let output = tx.outputs.get(index as usize)?;
        Some(Self {
            outpoint: OutPoint::new(tx.hash(), index),
            version: tx.version,
            height,
            coinbase: tx.is_coinbase(),
            value: output.value,
            script: output.script_pubkey.clone(),
        })
    }

    pub fn to_output(&self) -> TransactionOutput {
        TransactionOutput {
            value: self.value,
            script_pubkey: self.script.clone(),
        }
    }
}

/// CoinView: 𝒞𝒱 = 𝒪 → 𝒞
///
/// Not internally synchronized. Share it read-only across threads or give
/// each worker its own copy.
#[derive(Debug, Clone, Default)]
pub struct CoinView {
    coins: HashMap<OutPoint, Coin>,
}

impl CoinView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a coin under its own outpoint
    pub fn add_coin(&mut self, coin: Coin) {
        self.coins.insert(coin.outpoint, coin);
    }

    pub fn add_output(&mut self, outpoint: OutPoint, output: &TransactionOutput) {
        self.add_coin(Coin::from_output(outpoint, output));
    }

    /// Indexes every output of `tx` at `height` (-1 for unconfirmed)
    pub fn add_tx(&mut self, tx: &Transaction, height: i32) {
        let hash = tx.hash();
        let coinbase = tx.is_coinbase();
        for (index, output) in tx.outputs.iter().enumerate() {
            self.add_coin(Coin {
                outpoint: OutPoint::new(hash, index as u32),
                version: tx.version,
                height,
                coinbase,
                value: output.value,
                script: output.script_pubkey.clone(),
            });
        }
    }

    /// The coin spent by `input`, `None` when the view has no such coin
    pub fn get_output(&self, input: &TransactionInput) -> Option<&Coin> {
        self.coins.get(&input.prevout)
    }

    pub fn get_coin(&self, outpoint: &OutPoint) -> Option<&Coin> {
        self.coins.get(outpoint)
    }

    pub fn has_coin(&self, outpoint: &OutPoint) -> bool {
        self.coins.contains_key(outpoint)
    }

    /// Removes and returns the coin spent by `input`
    pub fn spend_output(&mut self, input: &TransactionInput) -> Option<Coin> {
        self.coins.remove(&input.prevout)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}
