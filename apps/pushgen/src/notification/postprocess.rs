//! Post-processing and validation of message text.
//!
//! Lengths are counted in `char`s; byte offsets are only used for slicing and
//! always come from `char_indices`.

use std::collections::BTreeSet;

use crate::notification::tone::{cta_pool, ToneOfVoice, CTA_PHRASES, CTA_VERBS};
use crate::notification::variant::choose_cta;
use crate::scoring::catalog::Product;

/// Lower bound of the target length range.
pub const TARGET_MIN_CHARS: usize = 180;

/// A CTA found in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtaMatch {
    /// Byte offset of the first character.
    pub start: usize,
    /// Canonical phrase as listed in the tone tables.
    pub phrase: &'static str,
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offsets of every case-insensitive, whole-word occurrence of `needle`.
pub fn find_word_ci(haystack: &str, needle: &str) -> Vec<usize> {
    let hay: Vec<(usize, char)> = haystack
        .char_indices()
        .map(|(i, c)| (i, lower(c)))
        .collect();
    let pat: Vec<char> = needle.chars().map(lower).collect();
    if pat.is_empty() || pat.len() > hay.len() {
        return Vec::new();
    }

    let is_word = |c: char| c.is_alphanumeric();
    (0..=hay.len() - pat.len())
        .filter(|&i| {
            hay[i..i + pat.len()]
                .iter()
                .zip(&pat)
                .all(|(&(_, h), &p)| h == p)
        })
        .filter(|&i| i == 0 || !is_word(hay[i - 1].1))
        .filter(|&i| i + pat.len() == hay.len() || !is_word(hay[i + pat.len()].1))
        .map(|i| hay[i].0)
        .collect()
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// The first CTA in `text`. Longer phrases win over a bare verb at the same position.
pub fn find_cta(text: &str) -> Option<CtaMatch> {
    let mut best: Option<CtaMatch> = None;
    for &phrase in CTA_PHRASES.iter().chain(CTA_VERBS) {
        if let Some(&start) = find_word_ci(text, phrase).first() {
            if best.map_or(true, |b| start < b.start) {
                best = Some(CtaMatch { start, phrase });
            }
        }
    }
    best
}

/// Number of CTA verbs in `text`, in any case. A compliant message has one.
pub fn cta_count(text: &str) -> usize {
    CTA_VERBS.iter().map(|verb| find_word_ci(text, verb).len()).sum()
}

/// The phrase from the product's CTA pool that closes `text`, ignoring
/// trailing `.`/`!` and whitespace.
pub fn ending_cta(text: &str, product: Product) -> Option<&'static str> {
    let body = text.trim_end().trim_end_matches(['.', '!']).trim_end();
    cta_pool(product).iter().copied().find(|phrase| {
        find_word_ci(body, phrase)
            .last()
            .is_some_and(|&start| char_len(&body[start..]) == char_len(phrase))
    })
}

fn last_cta_start(text: &str) -> Option<usize> {
    CTA_VERBS
        .iter()
        .filter_map(|verb| find_word_ci(text, verb).last().copied())
        .max()
}

/// Collapses runs of `!` and keeps only the first one; later ones become `.`.
pub fn collapse_exclamations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut seen = false;
    let mut prev_bang = false;
    for c in text.chars() {
        if c == '!' {
            if !prev_bang {
                out.push(if seen { '.' } else { '!' });
                seen = true;
            }
            prev_bang = true;
        } else {
            out.push(c);
            prev_bang = false;
        }
    }
    out
}

/// Appends a CTA from the product pool unless the text already ends with one.
pub fn ensure_cta(text: &str, product: Product, key: &str) -> String {
    if text.trim().is_empty() || ending_cta(text, product).is_some() {
        return text.to_string();
    }
    let cleaned = text.trim_end().trim_end_matches(['.', '!', '?']).trim_end();
    format!("{cleaned}. {}.", choose_cta(product, key))
}

/// Limits `text` to `max_chars`, keeping the tail that starts at the last CTA intact.
pub fn smart_clamp(text: &str, max_chars: usize) -> String {
    let t = collapse_exclamations(text.trim());
    if char_len(&t) <= max_chars {
        return t;
    }

    if let Some(start) = last_cta_start(&t) {
        let mut tail = t[start..].trim_end().to_string();
        if !tail.ends_with(['.', '!', '?']) {
            tail.push('.');
        }
        let tail_len = char_len(&tail);
        // room for head + "…" + " "
        if tail_len + 2 >= max_chars {
            return truncate(&tail, max_chars).to_string();
        }
        let budget = max_chars - tail_len - 2;
        let head = t[..start].trim_end();
        if head.is_empty() {
            return tail;
        }
        if char_len(head) <= budget + 1 {
            return format!("{head} {tail}");
        }
        let cut = cut_head(truncate(head, budget), budget);
        return format!("{cut} {tail}");
    }

    let budget = max_chars.saturating_sub(1);
    cut_head(truncate(&t, budget), budget)
}

/// Shortens `head` at a sentence end near `budget`, else at a word boundary with an ellipsis.
fn cut_head(head: &str, budget: usize) -> String {
    for stop in [". ", "! ", "? "] {
        if let Some(i) = head.rfind(stop) {
            if char_len(&head[..i]) + 40 >= budget {
                return head[..=i].trim_end().to_string();
            }
        }
    }
    let mut cut = head;
    let space = head
        .char_indices()
        .filter(|&(i, c)| c == ' ' && !splits_number(head, i))
        .map(|(i, _)| i)
        .last();
    if let Some(i) = space {
        if char_len(&head[..i]) + 25 >= budget {
            cut = &head[..i];
        }
    }
    format!("{}…", cut.trim_end_matches([' ', ',', ';']))
}

/// A space between digit groups, as in `1 234`. A digit followed by a trailing
/// space also counts, the rest of the number may have been truncated away.
fn splits_number(s: &str, space_at: usize) -> bool {
    let before = s[..space_at].chars().next_back();
    let after = s[space_at + 1..].chars().next();
    match (before, after) {
        (Some(b), Some(a)) => b.is_ascii_digit() && a.is_ascii_digit(),
        (Some(b), None) => b.is_ascii_digit(),
        _ => false,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    crate::notification::format::truncate_chars(s, max)
}

/// Whitespace-normalized, `!`-collapsed, CTA-guaranteed and clamped text.
pub fn finalize(raw: &str, product: Product, key: &str, max_chars: usize) -> String {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = collapse_exclamations(&text);
    let text = ensure_cta(&text, product, key);
    smart_clamp(&text, max_chars)
}

/// Numbers in `text`, normalized: group separators removed, `,` → `.`.
/// `"1 234 ₸ и 4,5%"` → `["1234", "4.5"]`.
pub fn extract_numbers(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let digit_at = |i: usize| chars.get(i).is_some_and(|c| c.is_ascii_digit());
    let mut numbers = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let mut number = String::new();
        while i < chars.len() {
            let c = chars[i];
            if c.is_ascii_digit() {
                number.push(c);
                i += 1;
            } else if matches!(c, ' ' | '\u{a0}' | '\u{202f}')
                && (1..=3).all(|k| digit_at(i + k))
                && !digit_at(i + 4)
            {
                i += 1;
            } else if matches!(c, ',' | '.') && digit_at(i + 1) {
                number.push('.');
                i += 1;
            } else {
                break;
            }
        }
        numbers.push(number);
    }
    numbers
}

/// Every number mentioned in `facts`.
pub fn allowed_numbers<'a>(facts: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    facts.into_iter().flat_map(extract_numbers).collect()
}

/// Constraint violations of `text`. Empty means the text is acceptable.
pub fn validate(
    text: &str,
    tone: &ToneOfVoice,
    product: Product,
    allowed: &BTreeSet<String>,
    max_chars: usize,
) -> Vec<String> {
    let mut violations = Vec::new();
    if text.trim().is_empty() {
        violations.push("пустой текст".to_string());
        return violations;
    }

    let len = char_len(text);
    if len > max_chars {
        violations.push(format!("длина {len} > {max_chars}"));
    }
    if text.matches('!').count() > 1 {
        violations.push("больше одного '!'".to_string());
    }
    match cta_count(text) {
        0 => violations.push("нет призыва к действию".to_string()),
        1 => {}
        n => violations.push(format!("призывов к действию {n}, нужен один в конце")),
    }
    if ending_cta(text, product).is_none() {
        let pool = cta_pool(product)
            .iter()
            .map(|c| format!("«{c}»"))
            .collect::<Vec<_>>()
            .join(" или ");
        violations.push(format!("текст должен заканчиваться призывом {pool}"));
    }
    for phrase in tone.all_forbidden() {
        if !find_word_ci(text, phrase).is_empty() {
            violations.push(format!("запрещённая фраза «{phrase}»"));
        }
    }
    for number in extract_numbers(text) {
        if !allowed.contains(&number) {
            violations.push(format!("число {number} отсутствует в фактах"));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::client::ClientStatus;
    use crate::notification::tone::tone_for;

    #[test]
    fn test_find_word_ci_respects_boundaries() {
        assert_eq!(find_word_ci("Оформить карту", "оформить"), vec![0]);
        assert!(find_word_ci("Подключите", "Подключить").is_empty());
        assert!(find_word_ci("многого", "ого").is_empty());
    }

    #[test]
    fn test_find_cta_prefers_phrase() {
        let cta = find_cta("Выгода рядом. Оформить карту.").unwrap();
        assert_eq!(cta.phrase, "Оформить карту");
        let cta = find_cta("Можно оформить в приложении").unwrap();
        assert_eq!(cta.phrase, "Оформить");
        assert!(find_cta("Просто текст без призыва").is_none());
    }

    #[test]
    fn test_collapse_exclamations() {
        assert_eq!(collapse_exclamations("Ура!!! Ещё!"), "Ура! Ещё.");
        assert_eq!(collapse_exclamations("Без восклицаний."), "Без восклицаний.");
    }

    #[test]
    fn test_ensure_cta_appends_when_missing() {
        let out = ensure_cta("Вам подойдёт карта для путешествий!", Product::TravelCard, "1");
        assert!(find_cta(&out).is_some());
        assert!(out.starts_with("Вам подойдёт карта для путешествий. "));
        assert!(out.ends_with('.'));

        let kept = ensure_cta("Текст. Оформить карту.", Product::TravelCard, "1");
        assert_eq!(kept, "Текст. Оформить карту.");
    }

    #[test]
    fn test_smart_clamp_keeps_short_text() {
        assert_eq!(smart_clamp("  Коротко. Оформить карту. ", 220), "Коротко. Оформить карту.");
    }

    #[test]
    fn test_smart_clamp_keeps_cta_tail() {
        let head = "Очень длинное предложение о тратах на такси и поездки ".repeat(8);
        let text = format!("{head}Оформить карту");
        let out = smart_clamp(&text, 220);
        assert!(char_len(&out) <= 220, "len {}", char_len(&out));
        assert!(out.ends_with("Оформить карту."));
    }

    #[test]
    fn test_smart_clamp_without_cta() {
        let text = "слово ".repeat(80);
        let out = smart_clamp(&text, 100);
        assert!(char_len(&out) <= 100);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_smart_clamp_prefers_sentence_end() {
        let text = format!(
            "{}. {} Посмотреть условия.",
            "а".repeat(170),
            "б ".repeat(60)
        );
        let out = smart_clamp(&text, 220);
        assert_eq!(out, format!("{}. Посмотреть условия.", "а".repeat(170)));
    }

    #[test]
    fn test_clamp_never_splits_digit_groups() {
        let text = format!("{} 1 234 567 ₸ и ещё немного слов", "слово ".repeat(9));
        let out = smart_clamp(&text, 62);
        assert!(char_len(&out) <= 62);
        assert!(!out.contains("1…") && !out.contains("234…"), "{out}");
    }

    #[test]
    fn test_extract_numbers() {
        assert_eq!(extract_numbers("1 234 ₸ и 4,5%"), vec!["1234", "4.5"]);
        assert_eq!(extract_numbers("в 2 раза и 300"), vec!["2", "300"]);
        assert_eq!(extract_numbers("27 400 ₸."), vec!["27400"]);
        assert!(extract_numbers("без чисел").is_empty());
    }

    #[test]
    fn test_validate_flags_every_problem() {
        let tone = tone_for(ClientStatus::Standard);
        let allowed = allowed_numbers(["27 400 ₸"]);
        let text = "Срочно!! Выгода 27 400 ₸, а ещё 99 ₸!";
        let v = validate(text, &tone, Product::TravelCard, &allowed, 220);
        assert!(v.iter().any(|m| m.contains("'!'")));
        assert!(v.iter().any(|m| m.contains("призыва")));
        assert!(v.iter().any(|m| m.contains("срочно")));
        assert!(v.iter().any(|m| m.contains("99")));
        assert!(!v.iter().any(|m| m.contains("27400")));
    }

    #[test]
    fn test_validate_accepts_clean_text() {
        let tone = tone_for(ClientStatus::Standard);
        let allowed = allowed_numbers(["1 500 ₸"]);
        let text = "Алия, в августе вы потратили на такси прилично. С картой вернули бы 1 500 ₸. Оформить карту.";
        assert!(validate(text, &tone, Product::TravelCard, &allowed, 220).is_empty());
        assert!(!validate(text, &tone, Product::TravelCard, &allowed, 50).is_empty());
    }

    #[test]
    fn test_ending_cta_is_anchored_to_product_pool() {
        assert_eq!(
            ending_cta("Текст. Оформить карту.", Product::TravelCard),
            Some("Оформить карту")
        );
        assert_eq!(ending_cta("Текст. Оформить сейчас!", Product::TravelCard), Some("Оформить сейчас"));
        assert_eq!(ending_cta("Текст. Открыть вклад.", Product::TravelCard), None);
        assert_eq!(ending_cta("Оформить карту, и кешбэк ваш.", Product::TravelCard), None);
        assert_eq!(ending_cta("Текст. Открыть вклад.", Product::DepositSavings), Some("Открыть вклад"));
    }

    #[test]
    fn test_cta_count_ignores_similar_words() {
        assert_eq!(cta_count("Оформите заявку. Оформить карту."), 1);
        assert_eq!(cta_count("Можно посмотреть условия. Оформить карту."), 2);
        assert_eq!(cta_count("Без призыва."), 0);
    }

    #[test]
    fn test_validate_rejects_misplaced_or_foreign_cta() {
        let tone = tone_for(ClientStatus::Standard);
        let allowed = allowed_numbers(["4 000 ₸"]);
        let rejected = [
            "Оформить карту, и вернём около 4 000 ₸ за поездки.",
            "Кешбэк на поездки около 4 000 ₸. Открыть вклад.",
            "Можно посмотреть условия в приложении. Кешбэк около 4 000 ₸. Оформить карту.",
            "Оформить сейчас. Кешбэк около 4 000 ₸. Оформить карту.",
        ];
        for text in rejected {
            let v = validate(text, &tone, Product::TravelCard, &allowed, 220);
            assert!(!v.is_empty(), "accepted: {text}");
        }
        let ok = "Кешбэк на поездки около 4 000 ₸. Оформить карту.";
        assert!(validate(ok, &tone, Product::TravelCard, &allowed, 220).is_empty());
    }

    #[test]
    fn test_ensure_cta_appends_after_foreign_cta() {
        let out = ensure_cta("Текст. Открыть вклад.", Product::TravelCard, "1");
        assert!(ending_cta(&out, Product::TravelCard).is_some());
        assert_eq!(cta_count(&out), 2);
    }

    #[test]
    fn test_finalize_pipeline() {
        let out = finalize("  Хорошая   новость!!\nКарта ждёт!  ", Product::TravelCard, "7", 220);
        assert_eq!(out.matches('!').count(), 1);
        assert!(find_cta(&out).is_some());
    }
}
