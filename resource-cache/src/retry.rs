use crate::error::CacheError;

/// Bounded countdown of permitted consecutive source-load failures.
///
/// A negative `max_attempts` disables the budget entirely: `countdown` never
/// fails and the engine retries best-effort forever. Otherwise the budget
/// raises `AttemptsExhausted` when it runs out, resetting itself so the next
/// reload cycle starts with a full budget again.
#[derive(Debug)]
pub(crate) struct RetryBudget {
    resource: String,
    max_attempts: i32,
    remaining: i32,
}

impl RetryBudget {
    pub fn new(resource: &str, max_attempts: i32) -> Self {
        RetryBudget {
            resource: resource.to_string(),
            max_attempts,
            remaining: max_attempts,
        }
    }

    pub fn countdown(&mut self) -> Result<(), CacheError> {
        if self.max_attempts < 0 {
            return Ok(());
        }
        self.remaining -= 1;
        if self.remaining <= 0 {
            self.reset();
            return Err(CacheError::AttemptsExhausted {
                resource: self.resource.clone(),
            });
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.remaining = self.max_attempts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_budget_raises_on_the_last_attempt() {
        let mut budget = RetryBudget::new("rates", 3);
        assert!(budget.countdown().is_ok());
        assert!(budget.countdown().is_ok());
        let err = budget.countdown().unwrap_err();
        assert!(matches!(
            err,
            CacheError::AttemptsExhausted { resource } if resource == "rates"
        ));
    }

    #[test]
    fn exhaustion_resets_the_budget() {
        let mut budget = RetryBudget::new("rates", 2);
        assert!(budget.countdown().is_ok());
        assert!(budget.countdown().is_err());
        // Fresh budget after raising.
        assert!(budget.countdown().is_ok());
        assert!(budget.countdown().is_err());
    }

    #[test]
    fn unbounded_budget_never_raises() {
        let mut budget = RetryBudget::new("rates", -1);
        for _ in 0..1000 {
            assert!(budget.countdown().is_ok());
        }
    }

    #[test]
    fn reset_restores_a_partially_spent_budget() {
        let mut budget = RetryBudget::new("rates", 3);
        assert!(budget.countdown().is_ok());
        budget.reset();
        assert!(budget.countdown().is_ok());
        assert!(budget.countdown().is_ok());
        assert!(budget.countdown().is_err());
    }
}
