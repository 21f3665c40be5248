//! Deterministic template messages. Used as the `template` backend and as
//! the fallback text when generation fails.
//!
//! Phrasing varies per client through seeded choices, never randomly. Every
//! number comes from `MessageFacts`, so template output passes validation.

use crate::models::client::ClientStatus;
use crate::notification::facts::{
    MessageFacts, FAVORITES, FX_TURNOVER, PREMIUM_SPEND, SHORTFALL, TRAVEL_SPEND,
};
use crate::notification::postprocess::finalize;
use crate::notification::tone::{product_pitch, ToneOfVoice};
use crate::notification::variant::{choose_cta, seeded_choice};
use crate::scoring::catalog::Product;

/// Renders the finished message, already clamped to `max_chars`.
pub fn render(facts: &MessageFacts, tone: &ToneOfVoice, max_chars: usize) -> String {
    let key = facts.seed_key();
    let cta = choose_cta(facts.product, &key);

    let parts = [
        preamble(facts, tone),
        lead(facts),
        format!("{}: {}.", facts.product.display_name(), product_pitch(facts.product)),
        benefit_phrase(facts, &key),
        format!("{cta}."),
    ];
    let text = parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    finalize(&text, facts.product, &key, max_chars)
}

fn preamble(facts: &MessageFacts, tone: &ToneOfVoice) -> String {
    let address = match &facts.name {
        Some(name) => format!("{name},"),
        None => tone.greeting.to_string(),
    };
    let line = match tone.status {
        ClientStatus::Student => "есть способ тратить выгоднее.",
        ClientStatus::Salary => "давайте сделаем повседневные платежи удобнее.",
        ClientStatus::Premium => "с вашим профилем можно получить больше от сервиса.",
        ClientStatus::Standard => "мы посмотрели ваши последние операции.",
    };
    format!("{address} {line}")
}

fn lead(facts: &MessageFacts) -> String {
    let month = facts.month;
    match facts.product {
        Product::TravelCard => match facts.detail(TRAVEL_SPEND) {
            Some(sum) => format!("В {month} на поездки и такси ушло {sum}."),
            None => "Вы часто в дороге.".to_string(),
        },
        Product::PremiumCard => match facts.detail(PREMIUM_SPEND) {
            Some(sum) => format!("У вас стабильный остаток, а на рестораны и косметику ушло {sum}."),
            None => "У вас стабильный остаток и активные платежи.".to_string(),
        },
        Product::CreditCard => match facts.detail(FAVORITES) {
            Some(cats) => format!("Ваши топ-категории: {cats}."),
            None => "Вы часто платите картой и онлайн.".to_string(),
        },
        Product::FxExchange => match facts.detail(FX_TURNOVER) {
            Some(sum) => format!("В {month} валютные операции составили {sum}."),
            None => "Вы работаете с валютой.".to_string(),
        },
        Product::CashLoan => match facts.detail(SHORTFALL) {
            Some(sum) => format!("В {month} расходы превысили поступления на {sum}."),
            None => "Бывают месяцы с крупными тратами.".to_string(),
        },
        Product::DepositMulticurrency => "Храните тенге и валюту вместе.".to_string(),
        Product::DepositSavings => "Если деньги лежат без снятий, они могут приносить доход.".to_string(),
        Product::DepositAccumulation => "Копите на цель с регулярным пополнением.".to_string(),
        Product::Investments => "Можно аккуратно начать инвестировать.".to_string(),
        Product::GoldBars => "Часть сбережений можно держать в золоте.".to_string(),
    }
}

fn benefit_phrase(facts: &MessageFacts, key: &str) -> String {
    if !facts.has_benefit() {
        return seeded_choice(
            &format!("{key}|nobenefit"),
            &["Подойдёт под ваш профиль расходов.", "Это упростит платежи."],
        )
        .to_string();
    }
    let (month, sum) = (facts.month, facts.benefit_text.as_str());
    let options = [
        format!("Выгода в {month} могла бы составить около {sum}."),
        format!("По вашему профилю в {month} вернулось бы около {sum}."),
        format!("Оценка выгоды за месяц: около {sum}."),
    ];
    let refs: Vec<&str> = options.iter().map(String::as_str).collect();
    seeded_choice(&format!("{key}|benefit"), &refs).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::facts::tests::facts_for;
    use crate::notification::postprocess::{char_len, ending_cta, find_cta, validate};
    use crate::notification::tone::tone_for;

    fn check(facts: &MessageFacts) -> String {
        let tone = tone_for(facts.status);
        let text = render(facts, &tone, 220);
        let violations = validate(&text, &tone, facts.product, &facts.allowed_numbers(), 220);
        assert!(violations.is_empty(), "{text}: {violations:?}");
        text
    }

    #[test]
    fn test_template_valid_for_every_product_shape() {
        let cases: Vec<MessageFacts> = vec![
            facts_for("1", 0.0, |p| p.travel_spend = 180_000.0),
            facts_for("2", 3_000_000.0, |p| {
                p.total_spend = 400_000.0;
                p.premium_spend = 90_000.0;
                p.atm_withdrawals = 4;
            }),
            facts_for("3", 0.0, |p| {
                p.favorite_categories = vec!["Кафе и рестораны".into(), "Такси".into()];
                p.favorite_spend = 200_000.0;
                p.online_spend = 30_000.0;
            }),
            facts_for("4", 0.0, |p| p.fx_turnover = 2_000_000.0),
            facts_for("5", 0.0, |p| {
                p.shortfall = 900_000.0;
                p.outflows = 900_000.0;
            }),
            facts_for("6", 5_000_000.0, |_| {}),
            facts_for("7", 0.0, |_| {}),
        ];
        let products: Vec<_> = cases.iter().map(|f| f.product).collect();
        assert!(products.contains(&Product::FxExchange));
        assert!(products.contains(&Product::CashLoan));
        for facts in &cases {
            let text = check(facts);
            assert!(char_len(&text) <= 220);
            assert!(ending_cta(&text, facts.product).is_some());
        }
    }

    #[test]
    fn test_template_is_deterministic() {
        let facts = facts_for("11", 0.0, |p| p.travel_spend = 70_000.0);
        let tone = tone_for(facts.status);
        assert_eq!(render(&facts, &tone, 220), render(&facts, &tone, 220));
    }

    #[test]
    fn test_template_quotes_benefit() {
        let facts = facts_for("12", 0.0, |p| p.travel_spend = 100_000.0);
        let text = check(&facts);
        assert!(text.contains("Тест,"));
        assert!(text.contains("Карта для путешествий"));
    }

    #[test]
    fn test_template_respects_small_limit() {
        let facts = facts_for("13", 0.0, |p| p.travel_spend = 100_000.0);
        let tone = tone_for(facts.status);
        let text = render(&facts, &tone, 120);
        assert!(char_len(&text) <= 120);
        assert!(find_cta(&text).is_some());
    }
}
