//! The fixed product catalog. Declaration order doubles as tie-break priority.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    TravelCard,
    PremiumCard,
    CreditCard,
    FxExchange,
    CashLoan,
    DepositMulticurrency,
    DepositSavings,
    DepositAccumulation,
    Investments,
    GoldBars,
}

impl Product {
    /// Every product, in tie-break priority order.
    pub const ALL: [Product; 10] = [
        Product::TravelCard,
        Product::PremiumCard,
        Product::CreditCard,
        Product::FxExchange,
        Product::CashLoan,
        Product::DepositMulticurrency,
        Product::DepositSavings,
        Product::DepositAccumulation,
        Product::Investments,
        Product::GoldBars,
    ];

    /// Stable machine identifier.
    pub fn id(self) -> &'static str {
        match self {
            Product::TravelCard => "travel_card",
            Product::PremiumCard => "premium_card",
            Product::CreditCard => "credit_card",
            Product::FxExchange => "fx_exchange",
            Product::CashLoan => "cash_loan",
            Product::DepositMulticurrency => "deposit_multicurrency",
            Product::DepositSavings => "deposit_savings",
            Product::DepositAccumulation => "deposit_accumulation",
            Product::Investments => "investments",
            Product::GoldBars => "gold_bars",
        }
    }

    /// Client-facing product name.
    pub fn display_name(self) -> &'static str {
        match self {
            Product::TravelCard => "Карта для путешествий",
            Product::PremiumCard => "Премиальная карта",
            Product::CreditCard => "Кредитная карта",
            Product::FxExchange => "Обмен валют",
            Product::CashLoan => "Кредит наличными",
            Product::DepositMulticurrency => "Депозит мультивалютный",
            Product::DepositSavings => "Депозит сберегательный",
            Product::DepositAccumulation => "Депозит накопительный",
            Product::Investments => "Инвестиции",
            Product::GoldBars => "Золотые слитки",
        }
    }

    /// Position in [`Product::ALL`]; lower wins ties.
    pub fn priority(self) -> usize {
        Product::ALL
            .iter()
            .position(|&p| p == self)
            .unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<_> = Product::ALL.iter().map(|p| p.id()).collect();
        assert_eq!(ids.len(), Product::ALL.len());
    }

    #[test]
    fn test_priority_follows_declaration_order() {
        for (i, p) in Product::ALL.iter().enumerate() {
            assert_eq!(p.priority(), i);
        }
    }
}
