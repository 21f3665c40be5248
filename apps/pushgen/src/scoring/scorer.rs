//! Benefit Scorer: one `ProductScore` per catalog product for a profile.
//!
//! The scorer sits behind a trait so the pipeline never depends on a concrete
//! rule set. `RuleBasedScorer` applies the formulas in `scoring::rules`.

use serde::Serialize;

use crate::features::aggregator::ClientFeatureProfile;
use crate::scoring::catalog::Product;
use crate::scoring::rules::{self, BenefitRates, FormulaInput};

// ────────────────────────────────────────────────────────────────────────────
// Output data model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductScore {
    pub product: Product,
    /// Estimated benefit in KZT, never negative.
    pub benefit: f64,
    pub inputs: Vec<FormulaInput>,
    pub rationale: &'static str,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

pub trait BenefitScorer: Send + Sync {
    /// Scores every catalog product, in catalog order.
    fn score(&self, profile: &ClientFeatureProfile) -> Vec<ProductScore>;
}

// ────────────────────────────────────────────────────────────────────────────
// RuleBasedScorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RuleBasedScorer {
    rates: BenefitRates,
}

impl RuleBasedScorer {
    pub fn new(rates: BenefitRates) -> Self {
        Self { rates }
    }
}

impl BenefitScorer for RuleBasedScorer {
    fn score(&self, profile: &ClientFeatureProfile) -> Vec<ProductScore> {
        Product::ALL
            .into_iter()
            .map(|product| {
                let benefit = rules::evaluate(product, profile, &self.rates);
                ProductScore {
                    product,
                    benefit: benefit.value,
                    inputs: benefit.inputs,
                    rationale: rules::rationale(product),
                }
            })
            .collect()
    }
}
