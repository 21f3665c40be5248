// Shared prompt fragments. Feature-specific prompts live next to the code
// that uses them (see `notification::prompts`).

/// System prompt fragment that enforces a bare message reply.
pub const PLAIN_TEXT_ONLY: &str = "Ответ: только текст уведомления одной строкой. \
    Без кавычек, без markdown, без пояснений и вариантов.";

/// Forbids numbers that are not present in the supplied facts.
pub const GROUNDING_INSTRUCTION: &str = "\
    КРИТИЧНО: используй только числа из блока ФАКТЫ, в том же написании. \
    Не придумывай проценты, суммы, сроки и количества. \
    Если факта нет, обойдись без числа.";

/// Appended to a re-ask after a rejected reply.
pub fn correction_note(violations: &[String]) -> String {
    format!(
        "Предыдущий вариант отклонён: {}. Исправь и пришли новый текст.",
        violations.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correction_note_lists_violations() {
        let note = correction_note(&["длина 250".to_string(), "нет CTA".to_string()]);
        assert!(note.contains("длина 250; нет CTA"));
    }
}
