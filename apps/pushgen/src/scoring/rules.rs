//! Benefit formulas, one pure function per catalog product.
//!
//! Every formula reads only the `ClientFeatureProfile` and `BenefitRates`,
//! clamps its inputs to non-negative values and returns the benefit in KZT
//! together with the named inputs it used. Caps bound cashback only; fee
//! savings are added on top of the capped amount.

use serde::Serialize;

use crate::features::aggregator::ClientFeatureProfile;
use crate::scoring::catalog::Product;

/// Rates, caps and thresholds of the catalog formulas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenefitRates {
    pub travel_cashback: f64,
    pub travel_cap: f64,

    pub premium_base_rate: f64,
    pub premium_high_rate: f64,
    pub premium_high_balance: f64,
    pub premium_category_boost: f64,
    pub premium_cap: f64,
    pub atm_fee: f64,
    pub payment_fee: f64,

    pub credit_favorite_rate: f64,
    pub credit_online_rate: f64,
    pub credit_cap: f64,

    pub fx_spread: f64,

    pub cash_loan_rate: f64,
    pub cash_loan_min_need_ratio: f64,

    pub deposit_multicurrency_rate: f64,
    pub deposit_multicurrency_fx_bonus: f64,
    pub deposit_savings_rate: f64,
    pub deposit_accumulation_rate: f64,
    pub investments_rate: f64,
    pub gold_rate: f64,
}

impl Default for BenefitRates {
    fn default() -> Self {
        Self {
            travel_cashback: 0.04,
            travel_cap: 15_000.0,

            premium_base_rate: 0.02,
            premium_high_rate: 0.04,
            premium_high_balance: 2_000_000.0,
            premium_category_boost: 0.04,
            premium_cap: 25_000.0,
            atm_fee: 300.0,
            payment_fee: 100.0,

            credit_favorite_rate: 0.10,
            credit_online_rate: 0.10,
            credit_cap: 30_000.0,

            fx_spread: 0.005,

            cash_loan_rate: 0.01,
            cash_loan_min_need_ratio: 1.5,

            deposit_multicurrency_rate: 0.07,
            deposit_multicurrency_fx_bonus: 0.001,
            deposit_savings_rate: 0.13,
            deposit_accumulation_rate: 0.10,
            investments_rate: 0.003,
            gold_rate: 0.002,
        }
    }
}

/// A named value a formula read from the profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaInput {
    pub name: &'static str,
    pub value: f64,
}

impl FormulaInput {
    fn new(name: &'static str, value: f64) -> Self {
        Self { name, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Benefit {
    pub value: f64,
    pub inputs: Vec<FormulaInput>,
}

impl Benefit {
    fn new(value: f64, inputs: Vec<FormulaInput>) -> Self {
        Self {
            value: non_negative(value),
            inputs,
        }
    }
}

/// Negative and non-finite values count as zero.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Dispatches to the formula of `product`.
pub fn evaluate(product: Product, p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    match product {
        Product::TravelCard => travel_card(p, r),
        Product::PremiumCard => premium_card(p, r),
        Product::CreditCard => credit_card(p, r),
        Product::FxExchange => fx_exchange(p, r),
        Product::CashLoan => cash_loan(p, r),
        Product::DepositMulticurrency => deposit_multicurrency(p, r),
        Product::DepositSavings => deposit_savings(p, r),
        Product::DepositAccumulation => deposit_accumulation(p, r),
        Product::Investments => investments(p, r),
        Product::GoldBars => gold_bars(p, r),
    }
}

/// One-line explanation of how the benefit of `product` is estimated.
pub fn rationale(product: Product) -> &'static str {
    match product {
        Product::TravelCard => "cashback on travel, taxi, hotel and fuel spend, capped monthly",
        Product::PremiumCard => {
            "balance-tiered cashback plus premium category boost, capped; ATM and transfer fees waived"
        }
        Product::CreditCard => "cashback on favourite and online categories, capped monthly",
        Product::FxExchange => "spread saved on currency exchange turnover",
        Product::CashLoan => "cost of covering an outflow gap when outflows clearly exceed inflows",
        Product::DepositMulticurrency => "quarterly interest on free balance plus FX turnover bonus",
        Product::DepositSavings => "quarterly interest on free balance at the savings rate",
        Product::DepositAccumulation => "quarterly interest on free balance at the accumulation rate",
        Product::Investments => "expected return on free balance placed in investments",
        Product::GoldBars => "expected return on free balance placed in gold",
    }
}

pub fn travel_card(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    let travel = non_negative(p.travel_spend);
    Benefit::new(
        (r.travel_cashback * travel).min(r.travel_cap),
        vec![FormulaInput::new("travel_spend", travel)],
    )
}

pub fn premium_card(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    let balance = non_negative(p.avg_monthly_balance);
    let total = non_negative(p.total_spend);
    let premium = non_negative(p.premium_spend);
    let base = if balance >= r.premium_high_balance {
        r.premium_high_rate
    } else {
        r.premium_base_rate
    };

    let cashback = (base * total + r.premium_category_boost * premium).min(r.premium_cap);
    let fees = r.atm_fee * f64::from(p.atm_withdrawals) + r.payment_fee * f64::from(p.outgoing_payments);

    Benefit::new(
        cashback + fees,
        vec![
            FormulaInput::new("avg_monthly_balance", balance),
            FormulaInput::new("total_spend", total),
            FormulaInput::new("premium_spend", premium),
            FormulaInput::new("atm_withdrawals", f64::from(p.atm_withdrawals)),
            FormulaInput::new("outgoing_payments", f64::from(p.outgoing_payments)),
        ],
    )
}

pub fn credit_card(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    let favorite = non_negative(p.favorite_spend);
    let online = non_negative(p.online_spend);
    Benefit::new(
        (r.credit_favorite_rate * favorite + r.credit_online_rate * online).min(r.credit_cap),
        vec![
            FormulaInput::new("favorite_spend", favorite),
            FormulaInput::new("online_spend", online),
        ],
    )
}

pub fn fx_exchange(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    let fx = non_negative(p.fx_turnover);
    Benefit::new(r.fx_spread * fx, vec![FormulaInput::new("fx_turnover", fx)])
}

/// Only a clear, uncovered outflow gap counts. A missing `need_ratio`
/// (no inflows at all) is treated as unbounded.
pub fn cash_loan(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    let shortfall = non_negative(p.shortfall);
    let needy = p
        .need_ratio
        .map_or(true, |ratio| ratio >= r.cash_loan_min_need_ratio);
    let value = if needy && shortfall > 0.0 {
        r.cash_loan_rate * shortfall
    } else {
        0.0
    };

    let mut inputs = vec![FormulaInput::new("shortfall", shortfall)];
    if let Some(ratio) = p.need_ratio {
        inputs.push(FormulaInput::new("need_ratio", non_negative(ratio)));
    }
    Benefit::new(value, inputs)
}

pub fn deposit_multicurrency(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    let free = non_negative(p.free_balance_3m);
    let fx = non_negative(p.fx_turnover);
    Benefit::new(
        free * r.deposit_multicurrency_rate / 4.0 + r.deposit_multicurrency_fx_bonus * fx,
        vec![
            FormulaInput::new("free_balance_3m", free),
            FormulaInput::new("fx_turnover", fx),
        ],
    )
}

pub fn deposit_savings(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    quarterly(p, r.deposit_savings_rate)
}

pub fn deposit_accumulation(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    quarterly(p, r.deposit_accumulation_rate)
}

pub fn investments(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    share_of_free_balance(p, r.investments_rate)
}

pub fn gold_bars(p: &ClientFeatureProfile, r: &BenefitRates) -> Benefit {
    share_of_free_balance(p, r.gold_rate)
}

fn quarterly(p: &ClientFeatureProfile, annual_rate: f64) -> Benefit {
    share_of_free_balance(p, annual_rate / 4.0)
}

fn share_of_free_balance(p: &ClientFeatureProfile, rate: f64) -> Benefit {
    let free = non_negative(p.free_balance_3m);
    Benefit::new(free * rate, vec![FormulaInput::new("free_balance_3m", free)])
}
