//! Tone of voice: maps client status to style, forbidden phrasing and the
//! CTA pool of each product.
//!
//! Every CTA in every pool must start with a verb from `CTA_VERBS`, otherwise
//! `postprocess::find_cta` would not recognise the text as having one.

use crate::models::client::ClientStatus;
use crate::scoring::catalog::Product;

/// Style guide for one client status.
#[derive(Debug, Clone)]
pub struct ToneOfVoice {
    pub status: ClientStatus,
    /// One-sentence style instruction placed in the system prompt.
    pub style: &'static str,
    /// Opening line used by the template backend when no name is known.
    pub greeting: &'static str,
    /// Phrases that must not appear in this status's messages, on top of `FORBIDDEN_ALWAYS`.
    pub forbidden: Vec<&'static str>,
}

/// Banned for every status: pressure tactics and promises the bank can't back.
pub const FORBIDDEN_ALWAYS: &[&str] = &[
    "срочно",
    "только сегодня",
    "последний шанс",
    "гарантируем",
    "гарантированно",
    "бесплатно навсегда",
    "уважаемый клиент",
];

/// Words a CTA may start with.
pub const CTA_VERBS: &[&str] = &[
    "Открыть",
    "Оформить",
    "Подключить",
    "Подключите",
    "Посмотреть",
    "Настроить",
    "Узнать",
];

/// Longer CTA forms recognised before bare verbs, longest first.
pub const CTA_PHRASES: &[&str] = &[
    "Открыть в приложении",
    "Посмотреть условия",
    "Подключить карту",
    "Оформить сейчас",
    "Настроить обмен",
    "Посмотреть курс",
    "Оформить карту",
    "Открыть вклад",
    "Узнать лимит",
    "Открыть счёт",
];

pub fn tone_for(status: ClientStatus) -> ToneOfVoice {
    match status {
        ClientStatus::Student => ToneOfVoice {
            status,
            style: "Дружелюбно и просто, на «вы», без канцелярита; короткие фразы, польза в быту.",
            greeting: "Здравствуйте,",
            forbidden: vec!["инвестиционный портфель", "диверсификация активов", "статус"],
        },
        ClientStatus::Salary => ToneOfVoice {
            status,
            style: "Спокойно и по делу, на «вы»; акцент на удобстве повседневных платежей.",
            greeting: "Здравствуйте,",
            forbidden: vec!["вы обязаны", "не упустите"],
        },
        ClientStatus::Premium => ToneOfVoice {
            status,
            style: "Сдержанно и уважительно, на «вы»; без восклицаний и сленга, акцент на сервисе и экономии.",
            greeting: "Добрый день,",
            forbidden: vec!["халява", "круто", "не упустите"],
        },
        ClientStatus::Standard => ToneOfVoice {
            status,
            style: "Доброжелательно и нейтрально, на «вы»; одна мысль и один призыв к действию.",
            greeting: "Здравствуйте,",
            forbidden: vec!["не упустите"],
        },
    }
}

impl ToneOfVoice {
    /// All phrases banned for this status.
    pub fn all_forbidden(&self) -> impl Iterator<Item = &'static str> + '_ {
        FORBIDDEN_ALWAYS.iter().copied().chain(self.forbidden.iter().copied())
    }
}

/// CTA variants for a product. Never empty.
pub fn cta_pool(product: Product) -> &'static [&'static str] {
    match product {
        Product::TravelCard => &["Оформить карту", "Оформить сейчас"],
        Product::PremiumCard => &["Оформить сейчас", "Подключить карту"],
        Product::CreditCard => &["Оформить карту", "Подключить карту"],
        Product::FxExchange => &["Настроить обмен", "Посмотреть курс"],
        Product::CashLoan => &["Узнать лимит", "Посмотреть условия"],
        Product::DepositMulticurrency | Product::DepositSavings | Product::DepositAccumulation => {
            &["Открыть вклад", "Посмотреть условия"]
        }
        Product::Investments => &["Открыть счёт", "Посмотреть условия"],
        Product::GoldBars => &["Посмотреть условия", "Открыть в приложении"],
    }
}

/// Short client-facing pitch of what the product gives. Contains no numbers.
pub fn product_pitch(product: Product) -> &'static str {
    match product {
        Product::TravelCard => "кешбэк на поездки, такси, отели и АЗС",
        Product::PremiumCard => "повышенный кешбэк, бесплатные снятия и переводы",
        Product::CreditCard => "повышенный кешбэк в любимых категориях и онлайн-сервисах",
        Product::FxExchange => "выгодный курс и автопокупка валюты по целевому курсу",
        Product::CashLoan => "запас денег на крупные траты с понятными выплатами",
        Product::DepositMulticurrency => "вклад в тенге и валюте с начислением процентов",
        Product::DepositSavings => "максимальная ставка для денег без снятий",
        Product::DepositAccumulation => "накопления на цель с регулярным пополнением",
        Product::Investments => "низкий порог входа и сниженные комиссии",
        Product::GoldBars => "физическое золото для сохранения стоимости",
    }
}
