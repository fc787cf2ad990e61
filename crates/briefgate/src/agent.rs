//! The credit-gated brief run.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::brief::{AccountInputs, Brief, BriefProvider};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::records::{HistoryEntry, Tier};
use crate::storage::{keys, Storage};

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    /// The brief.
    pub brief: Brief,
    /// Balance after the run was charged.
    pub credits_remaining: i64,
    /// Whether the brief came from this week's cache.
    pub cache_hit: bool,
}

/// A brief cached for the week it was generated in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedBrief {
    /// ISO week of generation.
    pub week_id: String,
    /// When the entry was written.
    pub cached_at: chrono::DateTime<chrono::FixedOffset>,
    /// The brief.
    pub brief: Brief,
}

/// Runs the agent on behalf of a user.
pub struct AgentRunner<'a> {
    provider: &'a dyn BriefProvider,
    ledger: Ledger<'a>,
    store: &'a Storage,
    clock: &'a Clock,
}

impl std::fmt::Debug for AgentRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl<'a> AgentRunner<'a> {
    /// Create a runner.
    #[must_use]
    pub fn new(
        provider: &'a dyn BriefProvider,
        ledger: Ledger<'a>,
        store: &'a Storage,
        clock: &'a Clock,
    ) -> Self {
        Self {
            provider,
            ledger,
            store,
            clock,
        }
    }

    /// Generate a brief for `email`, charging one credit.
    ///
    /// A brief for identical inputs and model from the current week is
    /// served from the cache; it still costs the credit. If producing or
    /// recording the brief fails, the credit is refunded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCredits`] when the balance is spent,
    /// [`Error::MissingField`] for incomplete inputs, or the provider or
    /// storage error that stopped the run.
    #[instrument(skip(self, inputs), fields(company = %inputs.company))]
    pub async fn run(&self, email: &str, inputs: &AccountInputs, model: &str) -> Result<RunOutcome> {
        let user = self.ledger.ensure_user(email, Tier::General)?;
        if user.credits <= 0 {
            return Err(Error::NoCredits);
        }

        let inputs = inputs.trimmed();
        inputs.validate()?;

        let week_id = self.clock.week_id();
        let cache_key = keys::cache(&inputs.fingerprint(model, &week_id)?);
        let credits_remaining = self.ledger.debit(email)?;

        match self
            .produce(email, &inputs, model, &week_id, &cache_key, credits_remaining)
            .await
        {
            Ok((brief, cache_hit)) => {
                info!(cache_hit, credits_remaining, "Brief ready");
                Ok(RunOutcome {
                    brief,
                    credits_remaining,
                    cache_hit,
                })
            }
            Err(e) => Err(self.refund_after_failure(email, e)),
        }
    }

    /// Refund the credit charged for a failed run and hand back the run's
    /// error. A failed refund is logged; it never masks the original error.
    fn refund_after_failure(&self, email: &str, run_error: Error) -> Error {
        warn!(error = %run_error, "Run failed, refunding credit");
        if let Err(refund_error) = self.ledger.refund(email) {
            error!(
                error = %refund_error,
                run_error = %run_error,
                "Refund failed, credit not returned"
            );
        }
        run_error
    }

    async fn produce(
        &self,
        email: &str,
        inputs: &AccountInputs,
        model: &str,
        week_id: &str,
        cache_key: &str,
        credits_remaining: i64,
    ) -> Result<(Brief, bool)> {
        let cached: Option<CachedBrief> = self.store.get(cache_key)?;
        let (brief, cache_hit) = match cached {
            Some(entry) if entry.week_id == week_id => (entry.brief, true),
            _ => {
                let brief = self.provider.generate(inputs, model).await?;
                let entry = CachedBrief {
                    week_id: week_id.to_string(),
                    cached_at: self.clock.stamp(),
                    brief,
                };
                self.store.put(cache_key, &entry)?;
                (entry.brief, false)
            }
        };

        self.ledger.record_run(
            email,
            HistoryEntry {
                ran_at: self.clock.stamp(),
                company: inputs.company.clone(),
                persona: inputs.persona.clone(),
                model: model.to_string(),
                credits_remaining_after: credits_remaining,
                brief: brief.clone(),
            },
        )?;
        Ok((brief, cache_hit))
    }

    /// Delete cached briefs generated before the current week.
    ///
    /// Returns how many entries were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be listed or an entry cannot be
    /// deleted.
    pub fn prune_cache(&self) -> Result<usize> {
        prune_cache(self.store, self.clock)
    }
}

/// Delete cached briefs generated before the current week.
///
/// Entries that no longer decode are removed too.
///
/// # Errors
///
/// Returns an error if the cache cannot be listed or an entry cannot be
/// deleted.
pub fn prune_cache(store: &Storage, clock: &Clock) -> Result<usize> {
    let week_id = clock.week_id();
    let mut removed = 0;
    for key in store.keys_with_prefix(&keys::prefix(keys::CACHE))? {
        let stale = match store.get::<CachedBrief>(&key) {
            Ok(Some(entry)) => entry.week_id != week_id,
            Ok(None) => false,
            Err(Error::RecordDecode { .. }) => true,
            Err(e) => return Err(e),
        };
        if stale && store.delete(&key)? {
            removed += 1;
        }
    }
    info!(removed, week_id = %week_id, "Pruned brief cache");
    Ok(removed)
}
