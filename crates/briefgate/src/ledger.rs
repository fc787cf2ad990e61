//! User records, credit balances and run history.
//!
//! Every balance change goes through [`Storage::update`], so a debit or
//! refund is a single read-modify-write transaction.

use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::records::{HistoryEntry, Tier, UserRecord};
use crate::storage::{keys, Storage};

/// Credit and history bookkeeping for users.
#[derive(Debug, Clone, Copy)]
pub struct Ledger<'a> {
    store: &'a Storage,
    clock: &'a Clock,
    free_credits: i64,
    history_limit: usize,
}

impl<'a> Ledger<'a> {
    /// Create a ledger.
    ///
    /// New users start with `free_credits`; each history keeps at most
    /// `history_limit` runs.
    #[must_use]
    pub fn new(store: &'a Storage, clock: &'a Clock, free_credits: i64, history_limit: usize) -> Self {
        Self {
            store,
            clock,
            free_credits,
            history_limit,
        }
    }

    fn new_user(&self, email: &str, credits: i64, tier: Tier) -> UserRecord {
        let now = self.clock.stamp();
        UserRecord {
            email: keys::normalize_email(email),
            credits,
            tier,
            created_at: now,
            last_login: now,
        }
    }

    /// Create the user on first login or refresh `last_login` afterwards.
    ///
    /// An existing user keeps the tier they were created with.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record is unreadable or the write fails.
    pub fn ensure_user(&self, email: &str, tier: Tier) -> Result<UserRecord> {
        self.store.update(&keys::user(email), |current: Option<UserRecord>| {
            Ok(match current {
                Some(mut user) => {
                    user.last_login = self.clock.stamp();
                    user
                }
                None => {
                    info!(email = %keys::normalize_email(email), %tier, credits = self.free_credits, "Created user");
                    self.new_user(email, self.free_credits, tier)
                }
            })
        })
    }

    /// Look up a user without touching it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record is unreadable.
    pub fn lookup(&self, email: &str) -> Result<Option<UserRecord>> {
        self.store.get(&keys::user(email))
    }

    /// Overwrite a user's balance, creating a general-tier user if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if `credits` is negative or the write fails.
    pub fn set_credits(&self, email: &str, credits: i64) -> Result<UserRecord> {
        if credits < 0 {
            return Err(Error::ConfigValidation {
                message: format!("credits cannot be negative: {credits}"),
            });
        }
        let user = self.store.update(&keys::user(email), |current: Option<UserRecord>| {
            let mut user = current.unwrap_or_else(|| self.new_user(email, credits, Tier::General));
            user.credits = credits;
            Ok(user)
        })?;
        info!(email = %user.email, credits, "Set credits");
        Ok(user)
    }

    /// Take one credit. The balance never drops below zero.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record is unreadable or the write fails.
    pub fn debit(&self, email: &str) -> Result<i64> {
        let user = self.store.update(&keys::user(email), |current: Option<UserRecord>| {
            let mut user = current
                .unwrap_or_else(|| self.new_user(email, self.free_credits, Tier::General));
            user.credits = (user.credits - 1).max(0);
            Ok(user)
        })?;
        debug!(email = %user.email, remaining = user.credits, "Debited credit");
        Ok(user.credits)
    }

    /// Give back one credit after a failed run.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored record is unreadable or the write fails.
    pub fn refund(&self, email: &str) -> Result<i64> {
        let user = self.store.update(&keys::user(email), |current: Option<UserRecord>| {
            let mut user =
                current.unwrap_or_else(|| self.new_user(email, 0, Tier::General));
            user.credits += 1;
            Ok(user)
        })?;
        info!(email = %user.email, remaining = user.credits, "Refunded credit");
        Ok(user.credits)
    }

    /// Prepend a run to the user's history, dropping the oldest beyond the limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored history is unreadable or the write fails.
    pub fn record_run(&self, email: &str, entry: HistoryEntry) -> Result<()> {
        let limit = self.history_limit;
        self.store
            .update(&keys::history(email), |current: Option<Vec<HistoryEntry>>| {
                let mut history = current.unwrap_or_default();
                history.insert(0, entry);
                history.truncate(limit);
                Ok(history)
            })?;
        Ok(())
    }

    /// The user's runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored history is unreadable.
    pub fn history(&self, email: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .store
            .get(&keys::history(email))?
            .unwrap_or_default())
    }
}
