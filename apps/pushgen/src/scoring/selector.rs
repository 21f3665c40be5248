//! Product Selector: the maximal benefit wins, catalog order breaks ties.

use std::cmp::Ordering;

use serde::Serialize;

use crate::scoring::catalog::Product;
use crate::scoring::scorer::ProductScore;

/// How many runner-ups are kept for logging and prompt context.
pub const ALTERNATIVES_KEPT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedProduct {
    pub best: ProductScore,
    /// Remaining products, descending benefit then catalog order.
    pub alternatives: Vec<ProductScore>,
}

impl SelectedProduct {
    pub fn product(&self) -> Product {
        self.best.product
    }

    pub fn benefit(&self) -> f64 {
        self.best.benefit
    }

    /// The first `n` runner-ups.
    pub fn top_alternatives(&self, n: usize) -> &[ProductScore] {
        &self.alternatives[..n.min(self.alternatives.len())]
    }

    /// One-line account of the choice: winner, its formula inputs and
    /// rationale, then the runner-ups.
    /// `credit_card=10000 [favorite_spend=100000, online_spend=0] (…); next: travel_card=4000`
    pub fn explain(&self) -> String {
        let inputs = self
            .best
            .inputs
            .iter()
            .map(|i| format!("{}={:.0}", i.name, i.value))
            .collect::<Vec<_>>()
            .join(", ");
        let next = self
            .top_alternatives(ALTERNATIVES_KEPT)
            .iter()
            .map(|s| format!("{}={:.0}", s.product.id(), s.benefit))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{}={:.0} [{inputs}] ({}); next: {next}",
            self.product().id(),
            self.benefit(),
            self.best.rationale
        )
    }
}

/// Orders scores by descending benefit, then by catalog priority.
pub fn rank(mut scores: Vec<ProductScore>) -> Vec<ProductScore> {
    scores.sort_by(compare);
    scores
}

fn compare(a: &ProductScore, b: &ProductScore) -> Ordering {
    b.benefit
        .total_cmp(&a.benefit)
        .then_with(|| a.product.priority().cmp(&b.product.priority()))
}

/// Picks the winner. All-zero scores still select the first catalog product;
/// `None` only for an empty score list.
pub fn select(scores: Vec<ProductScore>) -> Option<SelectedProduct> {
    let mut ranking = rank(scores).into_iter();
    let best = ranking.next()?;
    Some(SelectedProduct {
        best,
        alternatives: ranking.collect(),
    })
}
