//! Token budget accounting for the active model.
//!
//! Pure value types only: every operation returns a new budget, so the
//! tracker can be unit tested in isolation and the session remains the
//! single owner of the mutable copy.

use log::warn;
use thiserror::Error;

/// Static model → token budget table. Kept in sync with the backend's
/// deployed model set.
const MODEL_BUDGETS: &[(&str, u32)] = &[
    ("gpt4o", 128_000),
    ("gpt4omini", 100_000),
    ("gpt35", 16_000),
];

/// Model assumed when the configured one is missing from the table.
pub const DEFAULT_MODEL: &str = "gpt4omini";

/// Budget applied when falling back to [`DEFAULT_MODEL`].
pub const DEFAULT_MODEL_BUDGET: u32 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown model id '{0}' in the budget table")]
pub struct UnknownModelError(pub String);

/// Deterministic lookup of the total token budget for a model.
pub fn resolve_budget(model_id: &str) -> Result<u32, UnknownModelError> {
    MODEL_BUDGETS
        .iter()
        .find(|(id, _)| *id == model_id)
        .map(|(_, budget)| *budget)
        .ok_or_else(|| UnknownModelError(model_id.to_string()))
}

/// Model ids with a known budget, in table order.
pub fn known_models() -> impl Iterator<Item = (&'static str, u32)> {
    MODEL_BUDGETS.iter().copied()
}

/// Token allowance for the currently selected model.
///
/// `used` never decreases except through [`TokenBudget::reset`], and never
/// exceeds `total`: consumption is clamped rather than rejected, because a
/// display metric should degrade gracefully instead of aborting the
/// conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBudget {
    model_id: String,
    total: u32,
    used: u32,
}

impl TokenBudget {
    /// Bind a fresh budget to `model_id`, falling back to the default
    /// budget when the model is unknown. The fallback is logged, never
    /// fatal: configuration drift should not take the chat down.
    pub fn for_model(model_id: &str) -> Self {
        let total = match resolve_budget(model_id) {
            Ok(total) => total,
            Err(err) => {
                warn!("{err}; falling back to the default budget of {DEFAULT_MODEL_BUDGET}");
                DEFAULT_MODEL_BUDGET
            }
        };

        Self {
            model_id: model_id.to_string(),
            total,
            used: 0,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.total - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Record `tokens` consumed by a completed exchange. Clamped at
    /// `total` so `remaining` can never go negative.
    #[must_use]
    pub fn apply(&self, tokens: u32) -> Self {
        Self {
            model_id: self.model_id.clone(),
            total: self.total,
            used: self.used.saturating_add(tokens).min(self.total),
        }
    }

    /// Zero the usage counter, keeping the model binding.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            model_id: self.model_id.clone(),
            total: self.total,
            used: 0,
        }
    }

    /// Re-resolve the total for a model switch mid-session. Usage already
    /// consumed stays consumed, clamped to the new total.
    #[must_use]
    pub fn rebind(&self, model_id: &str) -> Self {
        let fresh = Self::for_model(model_id);
        Self {
            used: self.used.min(fresh.total),
            ..fresh
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_models() {
        assert_eq!(resolve_budget("gpt4o").unwrap(), 128_000);
        assert_eq!(resolve_budget("gpt4omini").unwrap(), 100_000);
        assert_eq!(resolve_budget("gpt35").unwrap(), 16_000);
    }

    #[test]
    fn resolve_unknown_model_errors() {
        let err = resolve_budget("gpt9").unwrap_err();
        assert_eq!(err, UnknownModelError("gpt9".to_string()));
    }

    #[test]
    fn unknown_model_falls_back_to_default_budget() {
        let budget = TokenBudget::for_model("gpt9");
        assert_eq!(budget.total(), DEFAULT_MODEL_BUDGET);
        assert_eq!(budget.model_id(), "gpt9");
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn apply_accumulates_and_clamps() {
        let budget = TokenBudget::for_model("gpt4omini");

        let budget = budget.apply(1_000);
        assert_eq!(budget.used(), 1_000);

        let budget = budget.apply(2_000);
        assert_eq!(budget.used(), 3_000);

        // 3_000 + 97_500 exceeds the 100_000 total: clamp, don't overflow.
        let budget = budget.apply(97_500);
        assert_eq!(budget.used(), 100_000);
        assert_eq!(budget.remaining(), 0);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn apply_at_cap_is_idempotent() {
        let budget = TokenBudget::for_model("gpt35").apply(u32::MAX);
        assert_eq!(budget.used(), 16_000);
        assert_eq!(budget.apply(1).used(), 16_000);
    }

    #[test]
    fn reset_zeroes_usage_only() {
        let budget = TokenBudget::for_model("gpt4o").apply(5_000);
        let reset = budget.reset();
        assert_eq!(reset.used(), 0);
        assert_eq!(reset.total(), 128_000);
        assert_eq!(reset.model_id(), "gpt4o");
    }

    #[test]
    fn rebind_keeps_usage_clamped_to_new_total() {
        let budget = TokenBudget::for_model("gpt4o").apply(50_000);

        let rebound = budget.rebind("gpt35");
        assert_eq!(rebound.model_id(), "gpt35");
        assert_eq!(rebound.total(), 16_000);
        assert_eq!(rebound.used(), 16_000);

        let rebound = budget.rebind("gpt4omini");
        assert_eq!(rebound.used(), 50_000);
        assert_eq!(rebound.remaining(), 50_000);
    }
}
