//! The bounded set of client facts a message may draw on.
//!
//! Facts are the only source of numbers allowed in a message. Values are
//! preformatted for the client (`1 234 ₸`) and truncated so prompts stay small.

use std::collections::BTreeSet;

use crate::features::aggregator::ClientFeatureProfile;
use crate::models::client::{Client, ClientId, ClientStatus};
use crate::notification::format::{kzt, month_prepositional, truncate_chars, CURRENT_MONTH};
use crate::notification::postprocess::allowed_numbers;
use crate::scoring::catalog::Product;
use crate::scoring::selector::SelectedProduct;

const MAX_VALUE_CHARS: usize = 80;
const MAX_NAME_CHARS: usize = 40;
const MAX_DETAILS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub label: &'static str,
    pub value: String,
}

impl Fact {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label,
            value: truncate_chars(&value, MAX_VALUE_CHARS).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageFacts {
    pub client_id: ClientId,
    pub name: Option<String>,
    pub status: ClientStatus,
    pub city: Option<String>,
    pub product: Product,
    /// Analysis month in the prepositional case, `"этом месяце"` without activity.
    pub month: &'static str,
    pub benefit: f64,
    pub benefit_text: String,
    /// Product-relevant figures, at most `MAX_DETAILS`.
    pub details: Vec<Fact>,
}

impl MessageFacts {
    pub fn build(client: &Client, profile: &ClientFeatureProfile, selected: &SelectedProduct) -> Self {
        let product = selected.product();
        let month = profile
            .window
            .map(|w| month_prepositional(w.month()))
            .unwrap_or(CURRENT_MONTH);
        let short = |s: &String| truncate_chars(s.trim(), MAX_NAME_CHARS).to_string();

        let mut details = product_details(product, profile);
        details.truncate(MAX_DETAILS);

        Self {
            client_id: client.id.clone(),
            name: client.name.as_ref().map(short).filter(|s| !s.is_empty()),
            status: client.status,
            city: client.city.as_ref().map(short).filter(|s| !s.is_empty()),
            product,
            month,
            benefit: selected.benefit(),
            benefit_text: kzt(selected.benefit()),
            details,
        }
    }

    /// Seed for deterministic variant choices of this client and product.
    pub fn seed_key(&self) -> String {
        format!("{}|{}", self.client_id, self.product.id())
    }

    pub fn detail(&self, label: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    /// Whether the estimated benefit is worth quoting.
    pub fn has_benefit(&self) -> bool {
        self.benefit >= 1.0
    }

    /// Numbers a message may contain.
    pub fn allowed_numbers(&self) -> BTreeSet<String> {
        let mut texts: Vec<&str> = vec![self.benefit_text.as_str()];
        texts.extend(self.details.iter().map(|f| f.value.as_str()));
        texts.extend(self.name.as_deref());
        texts.extend(self.city.as_deref());
        allowed_numbers(texts)
    }

    /// Bullet list for the prompt.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if let Some(name) = &self.name {
            lines.push(format!("- Имя: {name}"));
        }
        if let Some(city) = &self.city {
            lines.push(format!("- Город: {city}"));
        }
        lines.push(format!("- Период: в {}", self.month));
        lines.push(format!("- Продукт: {}", self.product.display_name()));
        if self.has_benefit() {
            lines.push(format!("- Оценка выгоды: {}", self.benefit_text));
        }
        for fact in &self.details {
            lines.push(format!("- {}: {}", capitalize(fact.label), fact.value));
        }
        lines.join("\n")
    }
}

pub const TRAVEL_SPEND: &str = "траты на поездки и такси";
pub const PREMIUM_SPEND: &str = "рестораны, косметика и украшения";
pub const BALANCE: &str = "средний остаток";
pub const ATM_WITHDRAWALS: &str = "снятия в банкоматах";
pub const PAID_TRANSFERS: &str = "платные переводы";
pub const FAVORITES: &str = "любимые категории";
pub const ONLINE_SPEND: &str = "онлайн-сервисы";
pub const FX_TURNOVER: &str = "валютные операции";
pub const SHORTFALL: &str = "расходы выше поступлений на";

fn product_details(product: Product, p: &ClientFeatureProfile) -> Vec<Fact> {
    let mut facts = Vec::new();
    match product {
        Product::TravelCard if p.travel_spend > 0.0 => {
            facts.push(Fact::new(TRAVEL_SPEND, kzt(p.travel_spend)))
        }
        Product::PremiumCard => {
            if p.avg_monthly_balance > 0.0 {
                facts.push(Fact::new(BALANCE, kzt(p.avg_monthly_balance)));
            }
            if p.premium_spend > 0.0 {
                facts.push(Fact::new(PREMIUM_SPEND, kzt(p.premium_spend)));
            }
            if p.atm_withdrawals > 0 {
                facts.push(Fact::new(ATM_WITHDRAWALS, p.atm_withdrawals.to_string()));
            }
            if p.outgoing_payments > 0 {
                facts.push(Fact::new(PAID_TRANSFERS, p.outgoing_payments.to_string()));
            }
        }
        Product::CreditCard => {
            if !p.favorite_categories.is_empty() {
                facts.push(Fact::new(FAVORITES, p.favorite_categories.join(", ")));
            }
            if p.online_spend > 0.0 {
                facts.push(Fact::new(ONLINE_SPEND, kzt(p.online_spend)));
            }
        }
        Product::FxExchange if p.fx_turnover > 0.0 => {
            facts.push(Fact::new(FX_TURNOVER, kzt(p.fx_turnover)))
        }
        Product::CashLoan if p.shortfall > 0.0 => {
            facts.push(Fact::new(SHORTFALL, kzt(p.shortfall)))
        }
        Product::DepositMulticurrency => {
            if p.avg_monthly_balance > 0.0 {
                facts.push(Fact::new(BALANCE, kzt(p.avg_monthly_balance)));
            }
            if p.fx_turnover > 0.0 {
                facts.push(Fact::new(FX_TURNOVER, kzt(p.fx_turnover)));
            }
        }
        Product::DepositSavings
        | Product::DepositAccumulation
        | Product::Investments
        | Product::GoldBars
            if p.avg_monthly_balance > 0.0 =>
        {
            facts.push(Fact::new(BALANCE, kzt(p.avg_monthly_balance)))
        }
        _ => {}
    }
    facts
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
