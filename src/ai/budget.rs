//! Token Budget Calculation
//!
//! Sizes each completion request: the model's context window minus the
//! encoded prompt and a fixed safety overhead.

use std::sync::Arc;

use tracing::debug;

use super::deployment::DeploymentProfiles;
use super::tokenizer::{BpeEncoder, TokenEncoder};
use crate::constants::budget as budget_constants;
use crate::types::Result;

/// Breakdown of one budget computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Context window used for this call (table value or override)
    pub max_tokens: i64,
    /// Tokens in the encoded prompt fragments
    pub prompt_tokens: usize,
    /// Safety margin added on top of the prompt
    pub overhead: usize,
    /// Tokens left for the response; may be zero or negative
    pub remaining: i64,
}

impl TokenBudget {
    /// Whether a request can be sent with this budget
    pub fn is_usable(&self) -> bool {
        self.remaining > 0
    }
}

/// Computes the response budget for a deployment
#[derive(Clone)]
pub struct BudgetCalculator {
    profiles: Arc<DeploymentProfiles>,
    overhead: usize,
    encoder: Option<Arc<dyn TokenEncoder>>,
}

impl BudgetCalculator {
    /// Calculator that counts with each deployment's BPE encoding
    pub fn new(profiles: Arc<DeploymentProfiles>) -> Self {
        Self {
            profiles,
            overhead: budget_constants::DEFAULT_TOKEN_OVERHEAD,
            encoder: None,
        }
    }

    pub fn with_overhead(mut self, overhead: usize) -> Self {
        self.overhead = overhead;
        self
    }

    /// Use a fixed encoder for every deployment
    pub fn with_encoder(mut self, encoder: Arc<dyn TokenEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Remaining response tokens for `fragments` on `deployment`.
    ///
    /// `override_max` replaces the table value only when it is greater than 0.
    /// The result is returned as-is even when it is not positive.
    pub fn compute_budget(
        &self,
        fragments: &[String],
        deployment: &str,
        override_max: Option<i64>,
    ) -> Result<i64> {
        Ok(self.compute(fragments, deployment, override_max)?.remaining)
    }

    /// Same as [`compute_budget`](Self::compute_budget), with the breakdown
    pub fn compute(
        &self,
        fragments: &[String],
        deployment: &str,
        override_max: Option<i64>,
    ) -> Result<TokenBudget> {
        let table_max = self.profiles.max_tokens(deployment)?;
        let max_tokens = match override_max {
            Some(max) if max > 0 => max,
            _ => table_max as i64,
        };

        let prompt_tokens = self.count_fragments(fragments, deployment)?;
        let remaining = max_tokens - (self.overhead + prompt_tokens) as i64;

        debug!(
            deployment,
            max_tokens, prompt_tokens, overhead = self.overhead, remaining, "Computed token budget"
        );

        Ok(TokenBudget {
            max_tokens,
            prompt_tokens,
            overhead: self.overhead,
            remaining,
        })
    }

    fn count_fragments(&self, fragments: &[String], deployment: &str) -> Result<usize> {
        let loaded;
        let encoder: &dyn TokenEncoder = match &self.encoder {
            Some(encoder) => encoder.as_ref(),
            None => {
                loaded = BpeEncoder::for_deployment(deployment)?;
                &loaded
            }
        };

        fragments
            .iter()
            .try_fold(0usize, |total, fragment| Ok(total + encoder.count(fragment)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssistError;
    use proptest::prelude::*;

    /// One token per whitespace-separated word
    struct WordEncoder;

    impl TokenEncoder for WordEncoder {
        fn count(&self, text: &str) -> Result<usize> {
            Ok(text.split_whitespace().count())
        }
    }

    struct BrokenEncoder;

    impl TokenEncoder for BrokenEncoder {
        fn count(&self, _text: &str) -> Result<usize> {
            Err(AssistError::Encoding("encoder unavailable".to_string()))
        }
    }

    fn calculator() -> BudgetCalculator {
        BudgetCalculator::new(Arc::new(DeploymentProfiles::builtin()))
            .with_encoder(Arc::new(WordEncoder))
    }

    #[test]
    fn test_overhead_applied_to_empty_prompt() {
        let budget = calculator().compute(&[], "text-davinci-003", None).unwrap();
        assert_eq!(budget.remaining, 4097 - 100);
        assert_eq!(budget.prompt_tokens, 0);
        assert_eq!(budget.overhead, 100);
    }

    #[test]
    fn test_prompt_tokens_subtracted() {
        let fragments = vec!["generate S3 bucket".to_string(), "with versioning".to_string()];
        let remaining = calculator()
            .compute_budget(&fragments, "gpt-4-0314", None)
            .unwrap();
        assert_eq!(remaining, 8192 - 100 - 5);
    }

    #[test]
    fn test_override_replaces_table_value() {
        let remaining = calculator()
            .compute_budget(&[], "gpt-4-0314", Some(1000))
            .unwrap();
        assert_eq!(remaining, 900);
    }

    #[test]
    fn test_non_positive_override_ignored() {
        let calc = calculator();
        assert_eq!(calc.compute_budget(&[], "gpt-4-0314", Some(0)).unwrap(), 8092);
        assert_eq!(calc.compute_budget(&[], "gpt-4-0314", Some(-20)).unwrap(), 8092);
    }

    #[test]
    fn test_budget_can_go_negative() {
        let budget = calculator()
            .compute(&["a b c".to_string()], "gpt-4-0314", Some(50))
            .unwrap();
        assert_eq!(budget.remaining, 50 - 103);
        assert!(!budget.is_usable());
    }

    #[test]
    fn test_unknown_deployment() {
        let err = calculator().compute_budget(&[], "gpt-9", None).unwrap_err();
        assert!(matches!(err, AssistError::UnknownDeployment { .. }));
    }

    #[test]
    fn test_encoding_failure() {
        let calc = BudgetCalculator::new(Arc::new(DeploymentProfiles::builtin()))
            .with_encoder(Arc::new(BrokenEncoder));
        let err = calc
            .compute_budget(&["x".to_string()], "gpt-4-0314", None)
            .unwrap_err();
        assert!(matches!(err, AssistError::Encoding(_)));
    }

    #[test]
    fn test_custom_overhead() {
        let calc = calculator().with_overhead(10);
        assert_eq!(calc.compute_budget(&[], "gpt-3.5-turbo", None).unwrap(), 4086);
    }

    #[test]
    fn test_bpe_encoder_used_by_default() {
        let calc = BudgetCalculator::new(Arc::new(DeploymentProfiles::builtin()));
        let empty = calc.compute_budget(&[], "gpt-3.5-turbo", None).unwrap();
        let with_prompt = calc
            .compute_budget(&["generate S3 bucket".to_string()], "gpt-3.5-turbo", None)
            .unwrap();
        assert_eq!(empty, 3996);
        assert!(with_prompt < empty);
    }

    proptest! {
        #[test]
        fn prop_empty_context_is_max_minus_overhead(index in 0usize..7, overhead in 0usize..500) {
            let calc = calculator().with_overhead(overhead);
            let profiles = DeploymentProfiles::builtin();
            let name = profiles.names().nth(index).unwrap().to_string();
            let max = profiles.max_tokens(&name).unwrap() as i64;
            prop_assert_eq!(calc.compute_budget(&[], &name, None).unwrap(), max - overhead as i64);
        }

        #[test]
        fn prop_unknown_deployments_rejected(name in "[a-z]{1,12}-unknown") {
            let result = calculator().compute_budget(&[], &name, None);
            let is_unknown = matches!(result, Err(AssistError::UnknownDeployment { .. }));
            prop_assert!(is_unknown);
        }

        #[test]
        fn prop_override_only_when_positive(override_max in -10_000i64..10_000) {
            let remaining = calculator()
                .compute_budget(&[], "text-davinci-003", Some(override_max))
                .unwrap();
            let expected_max = if override_max > 0 { override_max } else { 4097 };
            prop_assert_eq!(remaining, expected_max - 100);
        }
    }
}
