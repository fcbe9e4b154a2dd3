//! Fixed-price payment gate and treasury.
//!
//! Creating a record costs exactly `record_price`. Collected funds accumulate
//! here until the administrator withdraws them.

use credscore_types::{Amount, Identity};

use crate::error::CreditError;

#[derive(Debug, Clone)]
pub struct Treasury {
    admin: Identity,
    price: Amount,
    balance: Amount,
}

impl Treasury {
    pub fn new(admin: Identity, price: Amount) -> Self {
        Self {
            admin,
            price,
            balance: Amount::ZERO,
        }
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Check that `paid` is exactly the price and can be credited.
    /// Nothing is credited until [`deposit`](Self::deposit).
    pub fn require_payment(&self, paid: Amount) -> Result<(), CreditError> {
        if paid != self.price || self.balance.checked_add(paid).is_none() {
            return Err(CreditError::InvalidPayment {
                expected: self.price,
                got: paid,
            });
        }
        Ok(())
    }

    pub fn deposit(&mut self, paid: Amount) -> Result<(), CreditError> {
        self.require_payment(paid)?;
        self.balance = self
            .balance
            .checked_add(paid)
            .ok_or(CreditError::InvalidPayment {
                expected: self.price,
                got: paid,
            })?;
        Ok(())
    }

    /// Drain the balance to the administrator.
    pub fn withdraw(&mut self, caller: &Identity) -> Result<Amount, CreditError> {
        if caller != &self.admin {
            return Err(CreditError::Unauthorized(caller.clone()));
        }
        Ok(std::mem::take(&mut self.balance))
    }

    pub(crate) fn restore_balance(&mut self, balance: Amount) {
        self.balance = balance;
    }
}
