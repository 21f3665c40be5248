//! Spend category clusters and transfer type groups used by the benefit formulas.
//! Category names match the values found in the bank's transaction exports.

pub const TRAVEL_CATEGORIES: &[&str] = &["Путешествия", "Такси", "Отели", "АЗС"];

pub const PREMIUM_CATEGORIES: &[&str] = &[
    "Ювелирные украшения",
    "Косметика и Парфюмерия",
    "Кафе и рестораны",
];

pub const ONLINE_CATEGORIES: &[&str] = &["Едим дома", "Смотрим дома", "Играем дома"];

pub const ATM_WITHDRAWAL: &str = "atm_withdrawal";

/// Outgoing payment types that carry a per-transfer fee on a standard card.
pub const PAYMENT_TYPES: &[&str] = &["p2p_out", "card_out", "utilities_out"];

pub const FX_TYPES: &[&str] = &["fx_buy", "fx_sell"];

/// How many top categories count as the client's favourites.
pub const FAVORITE_CATEGORY_COUNT: usize = 3;

pub fn is_travel(category: &str) -> bool {
    TRAVEL_CATEGORIES.contains(&category)
}

pub fn is_premium(category: &str) -> bool {
    PREMIUM_CATEGORIES.contains(&category)
}

pub fn is_online(category: &str) -> bool {
    ONLINE_CATEGORIES.contains(&category)
}
