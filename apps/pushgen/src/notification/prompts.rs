// Prompt constants for the notification generator.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{correction_note, GROUNDING_INSTRUCTION, PLAIN_TEXT_ONLY};
use crate::notification::facts::MessageFacts;
use crate::notification::postprocess::TARGET_MIN_CHARS;
use crate::notification::tone::{product_pitch, ToneOfVoice};

/// System prompt. Replace: {tone_style}, {plain_text_only}
const PUSH_SYSTEM_TEMPLATE: &str = "Ты пишешь короткие персональные push-уведомления банка \
    на русском языке. Одна мысль и один призыв к действию в конце. \
    Обращение на «вы», без давления и без канцелярита. \
    Тон: {tone_style} \
    {plain_text_only}";

/// User prompt. Replace: {grounding_instruction}, {facts}, {product}, {pitch},
/// {cta}, {min_chars}, {max_chars}, {forbidden}, {correction}
const PUSH_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

ФАКТЫ:
{facts}

ЗАДАЧА: напиши push-уведомление, которое предлагает продукт «{product}» ({pitch}).
Свяжи выгоду с поведением клиента из фактов.

ПРАВИЛА:
- длина от {min_chars} до {max_chars} символов, включая пробелы;
- не больше одного восклицательного знака;
- закончи ровно этим призывом: «{cta}.»;
- других призывов в тексте нет, глаголы «оформить», «открыть», «посмотреть», «узнать» встречаются только в нём;
- суммы пиши как в фактах, с пробелами между разрядами и знаком ₸;
- не используй фразы: {forbidden}.
{correction}"#;

pub fn system_prompt(tone: &ToneOfVoice) -> String {
    PUSH_SYSTEM_TEMPLATE
        .replace("{tone_style}", tone.style)
        .replace("{plain_text_only}", PLAIN_TEXT_ONLY)
}

pub fn build_prompt(
    facts: &MessageFacts,
    tone: &ToneOfVoice,
    cta: &str,
    max_chars: usize,
    violations: &[String],
) -> String {
    let forbidden = tone
        .all_forbidden()
        .map(|p| format!("«{p}»"))
        .collect::<Vec<_>>()
        .join(", ");
    let correction = if violations.is_empty() {
        String::new()
    } else {
        correction_note(violations)
    };

    PUSH_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{facts}", &facts.render())
        .replace("{product}", facts.product.display_name())
        .replace("{pitch}", product_pitch(facts.product))
        .replace("{cta}", cta)
        .replace("{min_chars}", &TARGET_MIN_CHARS.min(max_chars).to_string())
        .replace("{max_chars}", &max_chars.to_string())
        .replace("{forbidden}", &forbidden)
        .replace("{correction}", &correction)
        .trim_end()
        .to_string()
}
