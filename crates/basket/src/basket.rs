use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId, UserId};

/// One basket row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketEntry {
    pub product: ProductId,
    pub amount: i64,
}

/// A user's basket. Entries keep insertion order and hold at most one row per
/// product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    user: UserId,
    entries: Vec<BasketEntry>,
    updated_at: Option<DateTime<Utc>>,
}

impl Basket {
    pub fn empty(user: UserId) -> Self {
        Self {
            user,
            entries: Vec::new(),
            updated_at: None,
        }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn entries(&self) -> &[BasketEntry] {
        &self.entries
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn amount_of(&self, product: ProductId) -> Option<i64> {
        self.entries
            .iter()
            .find(|e| e.product == product)
            .map(|e| e.amount)
    }

    fn position(&self, product: ProductId) -> Option<usize> {
        self.entries.iter().position(|e| e.product == product)
    }

    /// Upsert: add a new row or increase the existing row's amount.
    pub fn add(&mut self, product: ProductId, amount: i64, at: DateTime<Utc>) -> DomainResult<BasketEntry> {
        ensure_positive(amount)?;
        let entry = match self.position(product) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                entry.amount = entry
                    .amount
                    .checked_add(amount)
                    .ok_or_else(|| DomainError::validation("basket amount overflow"))?;
                *entry
            }
            None => {
                let entry = BasketEntry { product, amount };
                self.entries.push(entry);
                entry
            }
        };
        self.updated_at = Some(at);
        Ok(entry)
    }

    /// Replace the amount of an existing row.
    pub fn set_amount(&mut self, product: ProductId, amount: i64, at: DateTime<Utc>) -> DomainResult<BasketEntry> {
        ensure_positive(amount)?;
        let idx = self
            .position(product)
            .ok_or_else(|| DomainError::not_found("basket entry", product))?;
        self.entries[idx].amount = amount;
        self.updated_at = Some(at);
        Ok(self.entries[idx])
    }

    pub fn remove(&mut self, product: ProductId, at: DateTime<Utc>) -> DomainResult<BasketEntry> {
        let idx = self
            .position(product)
            .ok_or_else(|| DomainError::not_found("basket entry", product))?;
        self.updated_at = Some(at);
        Ok(self.entries.remove(idx))
    }

    pub fn clear(&mut self, at: DateTime<Utc>) {
        self.entries.clear();
        self.updated_at = Some(at);
    }

    /// Take ordered quantities out of the basket; rows that reach zero go away.
    ///
    /// Lines for products no longer in the basket (or larger than the row) are
    /// tolerated: the basket may have been edited while the order was placed.
    pub fn subtract(&mut self, ordered: &[BasketEntry], at: DateTime<Utc>) {
        for line in ordered {
            if let Some(idx) = self.position(line.product) {
                let remaining = self.entries[idx].amount - line.amount;
                if remaining > 0 {
                    self.entries[idx].amount = remaining;
                } else {
                    self.entries.remove(idx);
                }
            }
        }
        self.updated_at = Some(at);
    }
}

impl Entity for Basket {
    type Id = UserId;
    const NAME: &'static str = "basket";

    fn id(&self) -> UserId {
        self.user
    }
}

fn ensure_positive(amount: i64) -> DomainResult<()> {
    if amount <= 0 {
        return Err(DomainError::validation("amount must be positive"));
    }
    Ok(())
}
