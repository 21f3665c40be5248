//! Notification Generator: one message per client.
//!
//! Flow per client:
//! 1. Build the prompt from `MessageFacts` and the status tone of voice.
//! 2. Ask the backend, post-process the reply, validate it.
//! 3. On a rule violation re-ask with the violations listed, up to `attempts`.
//! 4. If the backend still fails, apply the run's fallback policy
//!    (or return the error in fail-fast mode).

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::FallbackPolicy;
use crate::llm_client::{GenerationConstraints, GenerationError, TextGenerator};
use crate::models::client::ClientId;
use crate::notification::facts::MessageFacts;
use crate::notification::postprocess::{finalize, validate};
use crate::notification::prompts::{build_prompt, system_prompt};
use crate::notification::template;
use crate::notification::tone::{tone_for, ToneOfVoice};
use crate::notification::variant::choose_cta;
use crate::scoring::catalog::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSource {
    /// Accepted reply from the generation service.
    Generated,
    /// Template backend chosen for the run.
    Template,
    /// Template text used after a generation failure.
    Fallback,
}

impl fmt::Display for NotificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationSource::Generated => "generated",
            NotificationSource::Template => "template",
            NotificationSource::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub client_id: ClientId,
    pub product: Product,
    pub text: String,
    pub source: NotificationSource,
}

/// Result for one client under the run's fallback policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Delivered(Notification),
    Excluded {
        client_id: ClientId,
        product: Product,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub max_chars: usize,
    pub attempts: u32,
    pub fallback: FallbackPolicy,
    pub fail_fast: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_chars: 220,
            attempts: 2,
            fallback: FallbackPolicy::Template,
            fail_fast: false,
        }
    }
}

pub struct NotificationGenerator {
    /// `None` runs the template backend.
    backend: Option<Arc<dyn TextGenerator>>,
    settings: GeneratorSettings,
}

impl NotificationGenerator {
    pub fn new(backend: Option<Arc<dyn TextGenerator>>, settings: GeneratorSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.as_ref().map_or("template", |b| b.name())
    }

    /// Produces the outcome for one client. Errors only in fail-fast mode.
    pub async fn notify(&self, facts: &MessageFacts) -> Result<Outcome, GenerationError> {
        let tone = tone_for(facts.status);

        let Some(backend) = &self.backend else {
            return Ok(Outcome::Delivered(
                self.from_template(facts, &tone, NotificationSource::Template),
            ));
        };

        match self.generate(backend.as_ref(), facts, &tone).await {
            Ok(text) => Ok(Outcome::Delivered(Notification {
                client_id: facts.client_id.clone(),
                product: facts.product,
                text,
                source: NotificationSource::Generated,
            })),
            Err(e) if self.settings.fail_fast => Err(e),
            Err(e) => {
                warn!(
                    client = %facts.client_id,
                    kind = e.kind(),
                    "Generation failed, applying {:?} fallback: {e}",
                    self.settings.fallback
                );
                Ok(match self.settings.fallback {
                    FallbackPolicy::Template => Outcome::Delivered(self.from_template(
                        facts,
                        &tone,
                        NotificationSource::Fallback,
                    )),
                    FallbackPolicy::Exclude => Outcome::Excluded {
                        client_id: facts.client_id.clone(),
                        product: facts.product,
                        reason: format!("{}: {e}", e.kind()),
                    },
                })
            }
        }
    }

    /// Asks the backend until a reply passes validation. Transport failures are
    /// final here, the client has already retried them.
    async fn generate(
        &self,
        backend: &dyn TextGenerator,
        facts: &MessageFacts,
        tone: &ToneOfVoice,
    ) -> Result<String, GenerationError> {
        let key = facts.seed_key();
        let cta = choose_cta(facts.product, &key);
        let system = system_prompt(tone);
        let allowed = facts.allowed_numbers();
        let constraints = GenerationConstraints {
            system: &system,
            max_chars: self.settings.max_chars,
        };

        let mut violations: Vec<String> = Vec::new();
        let mut last_error = GenerationError::EmptyContent;

        for attempt in 1..=self.settings.attempts.max(1) {
            let prompt = build_prompt(facts, tone, cta, self.settings.max_chars, &violations);

            let raw = match backend.generate(&prompt, constraints).await {
                Ok(raw) => raw,
                Err(GenerationError::EmptyContent) => {
                    debug!(client = %facts.client_id, attempt, "Empty reply, asking again");
                    last_error = GenerationError::EmptyContent;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let text = finalize(&raw, facts.product, &key, self.settings.max_chars);
            violations = validate(&text, tone, facts.product, &allowed, self.settings.max_chars);
            if violations.is_empty() {
                return Ok(text);
            }

            debug!(
                client = %facts.client_id,
                attempt,
                "Reply rejected: {}",
                violations.join("; ")
            );
            last_error = GenerationError::Policy(violations.clone());
        }

        Err(last_error)
    }

    fn from_template(
        &self,
        facts: &MessageFacts,
        tone: &ToneOfVoice,
        source: NotificationSource,
    ) -> Notification {
        Notification {
            client_id: facts.client_id.clone(),
            product: facts.product,
            text: template::render(facts, tone, self.settings.max_chars),
            source,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::notification::facts::tests::facts_for;
    use crate::notification::postprocess::{char_len, ending_cta, find_cta};

    /// Replays scripted replies; repeats the last one when the script runs out.
    pub(crate) struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    fn clone_reply(r: &Result<String, GenerationError>) -> Result<String, GenerationError> {
        match r {
            Ok(s) => Ok(s.clone()),
            Err(GenerationError::Timeout) => Err(GenerationError::Timeout),
            Err(GenerationError::EmptyContent) => Err(GenerationError::EmptyContent),
            Err(e) => Err(GenerationError::Api {
                status: 500,
                message: e.to_string(),
            }),
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _constraints: GenerationConstraints<'_>,
        ) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push(prompt.to_string());
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                clone_reply(replies.front().unwrap())
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn generator(script: Arc<ScriptedGenerator>, settings: GeneratorSettings) -> NotificationGenerator {
        NotificationGenerator::new(Some(script as Arc<dyn TextGenerator>), settings)
    }

    fn travel_facts() -> MessageFacts {
        facts_for("21", 0.0, |p| p.travel_spend = 100_000.0)
    }

    const GOOD: &str = "Тест, в этом месяце на поездки и такси ушло 100 000 ₸. \
        С картой для путешествий вернули бы около 4 000 ₸. Оформить карту.";

    #[tokio::test]
    async fn test_accepts_valid_reply() {
        let script = Arc::new(ScriptedGenerator::new(vec![Ok(GOOD.to_string())]));
        let gen = generator(script.clone(), GeneratorSettings::default());

        let outcome = gen.notify(&travel_facts()).await.unwrap();
        let Outcome::Delivered(n) = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(n.source, NotificationSource::Generated);
        assert_eq!(n.text, GOOD.split_whitespace().collect::<Vec<_>>().join(" "));
        assert_eq!(script.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reasks_after_fabricated_number() {
        let script = Arc::new(ScriptedGenerator::new(vec![
            Ok("Тест, вернём 15% и 9 999 ₸ каждый месяц. Оформить карту.".to_string()),
            Ok(GOOD.to_string()),
        ]));
        let gen = generator(script.clone(), GeneratorSettings::default());

        let Outcome::Delivered(n) = gen.notify(&travel_facts()).await.unwrap() else {
            panic!("expected delivery");
        };
        assert_eq!(n.source, NotificationSource::Generated);
        assert_eq!(script.call_count(), 2);
        let second_prompt = &script.calls.lock().unwrap()[1];
        assert!(second_prompt.contains("отклонён"));
    }

    #[tokio::test]
    async fn test_missing_cta_is_appended_not_rejected() {
        let reply = "Тест, в этом месяце на поездки и такси ушло 100 000 ₸. Кешбэк вернул бы около 4 000 ₸.";
        let script = Arc::new(ScriptedGenerator::new(vec![Ok(reply.to_string())]));
        let gen = generator(script.clone(), GeneratorSettings::default());

        let Outcome::Delivered(n) = gen.notify(&travel_facts()).await.unwrap() else {
            panic!("expected delivery");
        };
        assert!(ending_cta(&n.text, Product::TravelCard).is_some());
        assert_eq!(script.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reasks_when_cta_is_misplaced_or_foreign() {
        let replies = [
            "Открыть вклад можно в приложении. Тест, можно посмотреть условия карты: \
             на поездки ушло 100 000 ₸, вернули бы 4 000 ₸ за месяц.",
            "Тест, на поездки и такси ушло 100 000 ₸, вернули бы 4 000 ₸. Открыть вклад.",
            "Оформить карту, Тест, и на поездки вернётся около 4 000 ₸ в месяц.",
        ];
        for reply in replies {
            let script = Arc::new(ScriptedGenerator::new(vec![
                Ok(reply.to_string()),
                Ok(GOOD.to_string()),
            ]));
            let gen = generator(script.clone(), GeneratorSettings::default());

            let Outcome::Delivered(n) = gen.notify(&travel_facts()).await.unwrap() else {
                panic!("expected delivery");
            };
            assert_eq!(script.call_count(), 2, "accepted on first try: {reply}");
            assert_eq!(n.source, NotificationSource::Generated);
            assert!(n.text.ends_with("Оформить карту."));
            assert!(script.calls.lock().unwrap()[1].contains("отклонён"));
        }
    }

    #[tokio::test]
    async fn test_failing_backend_falls_back_to_template() {
        let script = Arc::new(ScriptedGenerator::new(vec![Err(GenerationError::Timeout)]));
        let gen = generator(script, GeneratorSettings::default());

        let Outcome::Delivered(n) = gen.notify(&travel_facts()).await.unwrap() else {
            panic!("expected delivery");
        };
        assert_eq!(n.source, NotificationSource::Fallback);
        assert!(char_len(&n.text) <= 220);
        assert!(find_cta(&n.text).is_some());
    }

    #[tokio::test]
    async fn test_persistent_policy_violation_falls_back() {
        let script = Arc::new(ScriptedGenerator::new(vec![Ok(
            "Срочно оформите, гарантируем 50 000 ₸! Оформить карту.".to_string(),
        )]));
        let settings = GeneratorSettings {
            attempts: 3,
            ..GeneratorSettings::default()
        };
        let gen = generator(script.clone(), settings);

        let Outcome::Delivered(n) = gen.notify(&travel_facts()).await.unwrap() else {
            panic!("expected delivery");
        };
        assert_eq!(n.source, NotificationSource::Fallback);
        assert_eq!(script.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exclude_policy() {
        let script = Arc::new(ScriptedGenerator::new(vec![Err(GenerationError::Timeout)]));
        let settings = GeneratorSettings {
            fallback: FallbackPolicy::Exclude,
            ..GeneratorSettings::default()
        };
        let gen = generator(script, settings);

        match gen.notify(&travel_facts()).await.unwrap() {
            Outcome::Excluded { reason, product, .. } => {
                assert!(reason.starts_with("timeout"));
                assert_eq!(product, Product::TravelCard);
            }
            other => panic!("expected exclusion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fail_fast_returns_error() {
        let script = Arc::new(ScriptedGenerator::new(vec![Err(GenerationError::Timeout)]));
        let settings = GeneratorSettings {
            fail_fast: true,
            ..GeneratorSettings::default()
        };
        let gen = generator(script, settings);
        let err = gen.notify(&travel_facts()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Timeout));
    }

    #[tokio::test]
    async fn test_template_backend_needs_no_service() {
        let gen = NotificationGenerator::new(None, GeneratorSettings::default());
        assert_eq!(gen.backend_name(), "template");
        let Outcome::Delivered(n) = gen.notify(&travel_facts()).await.unwrap() else {
            panic!("expected delivery");
        };
        assert_eq!(n.source, NotificationSource::Template);
        assert!(!n.text.is_empty());
    }
}
