//! Client-facing formatting of amounts and months.

/// Month names in the prepositional case ("в августе").
const MONTHS_PREPOSITIONAL: [&str; 12] = [
    "январе", "феврале", "марте", "апреле", "мае", "июне", "июле", "августе", "сентябре",
    "октябре", "ноябре", "декабре",
];

pub const CURRENT_MONTH: &str = "этом месяце";

/// `1234567.8` → `"1 234 568 ₸"`. Negative and non-finite amounts render as zero.
pub fn kzt(amount: f64) -> String {
    let rounded = if amount.is_finite() && amount > 0.0 {
        amount.round() as u64
    } else {
        0
    };
    format!("{} ₸", group_thousands(rounded))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// `8` → `"августе"`; out of range → `"этом месяце"`.
pub fn month_prepositional(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTHS_PREPOSITIONAL.get(i as usize))
        .copied()
        .unwrap_or(CURRENT_MONTH)
}

/// Truncates to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
