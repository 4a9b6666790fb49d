//! Synthesis strategies: how retrieved passages are combined into an answer.
//!
//! `stuff` makes one generation call over all passages. `refine` seeds a
//! draft from the first passage and revises it once per further passage.
//! `auto` picks between them by total passage length.

use crate::rag::grounding::{allowed_documents, check_grounding};
use crate::types::ScoredPassage;
use attest_core::{AppError, AppResult, PipelineConfig, RetryPolicy};
use attest_llm::{LlmClient, LlmRequest};
use attest_prompt::{
    build_prompt, resolve_prompt, BuiltPrompt, PromptDefinition, REFINE_INITIAL_PROMPT_ID,
    REFINE_STEP_PROMPT_ID, STUFF_PROMPT_ID,
};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Strategy names accepted in configuration.
pub const STRATEGY_NAMES: [&str; 3] = ["stuff", "refine", "auto"];

/// Generation settings shared by every strategy.
#[derive(Clone)]
pub struct Generator {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("provider", &self.llm.provider_name())
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Generator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature,
            max_tokens,
            retry,
        }
    }

    /// Generator using `pipeline.synthesis` sampling and the generation retry policy.
    pub fn from_config(llm: Arc<dyn LlmClient>, model: impl Into<String>, config: &PipelineConfig) -> Self {
        Self::new(
            llm,
            model,
            config.synthesis.temperature,
            config.synthesis.max_tokens,
            config.generation_retry(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one generation call under the retry policy.
    ///
    /// Empty output and answers naming documents outside `allowed` count as
    /// failed attempts.
    pub async fn generate(
        &self,
        label: &str,
        prompt: &BuiltPrompt,
        allowed: &BTreeSet<String>,
    ) -> AppResult<String> {
        let mut request = LlmRequest::new(prompt.user.clone(), self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);
        if let Some(system) = &prompt.system {
            request = request.with_system(system.clone());
        }

        let request = &request;
        let llm = self.llm.as_ref();

        self.retry
            .run(label, move || async move {
                let response = llm.complete(request).await?;
                let text = response.content.trim().to_string();
                if text.is_empty() {
                    return Err(AppError::Generation(
                        "Model returned an empty answer".to_string(),
                    ));
                }
                check_grounding(&text, allowed)?;
                Ok(text)
            })
            .await
    }
}

/// Render passages as labelled excerpts for a prompt.
pub fn format_context(passages: &[ScoredPassage]) -> String {
    passages
        .iter()
        .map(|s| {
            format!(
                "[Source: {}, page {}]\n{}",
                s.passage.document,
                s.passage.page_number,
                s.passage.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn variables(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// An algorithm for combining passages into one answer.
#[async_trait::async_trait]
pub trait SynthesisStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Produce an answer from non-empty `passages`, best first.
    async fn synthesize(
        &self,
        generator: &Generator,
        question: &str,
        passages: &[ScoredPassage],
    ) -> AppResult<String>;
}

/// Single pass over all passages.
#[derive(Debug, Clone)]
pub struct StuffStrategy {
    prompt: PromptDefinition,
}

impl StuffStrategy {
    /// Load the prompt, preferring an override under `workspace`.
    pub fn new(workspace: Option<&Path>) -> AppResult<Self> {
        Ok(Self {
            prompt: resolve_prompt(workspace, STUFF_PROMPT_ID)?,
        })
    }
}

#[async_trait::async_trait]
impl SynthesisStrategy for StuffStrategy {
    fn name(&self) -> &'static str {
        "stuff"
    }

    async fn synthesize(
        &self,
        generator: &Generator,
        question: &str,
        passages: &[ScoredPassage],
    ) -> AppResult<String> {
        let context = format_context(passages);
        let prompt = build_prompt(
            &self.prompt,
            variables(&[("question", question), ("context", &context)]),
        )?;

        generator
            .generate("generate answer", &prompt, &allowed_documents(passages))
            .await
    }
}

/// One call per passage, each revising the running answer.
#[derive(Debug, Clone)]
pub struct RefineStrategy {
    initial: PromptDefinition,
    step: PromptDefinition,
}

impl RefineStrategy {
    pub fn new(workspace: Option<&Path>) -> AppResult<Self> {
        Ok(Self {
            initial: resolve_prompt(workspace, REFINE_INITIAL_PROMPT_ID)?,
            step: resolve_prompt(workspace, REFINE_STEP_PROMPT_ID)?,
        })
    }
}

#[async_trait::async_trait]
impl SynthesisStrategy for RefineStrategy {
    fn name(&self) -> &'static str {
        "refine"
    }

    async fn synthesize(
        &self,
        generator: &Generator,
        question: &str,
        passages: &[ScoredPassage],
    ) -> AppResult<String> {
        let (first, rest) = passages
            .split_first()
            .ok_or_else(|| AppError::Generation("No passages to synthesize from".to_string()))?;

        // The draft may keep citing documents from earlier steps
        let mut allowed = BTreeSet::from([first.passage.document.clone()]);

        let context = format_context(std::slice::from_ref(first));
        let prompt = build_prompt(
            &self.initial,
            variables(&[("question", question), ("context", &context)]),
        )?;
        let mut answer = generator
            .generate("generate initial answer", &prompt, &allowed)
            .await?;

        for (i, passage) in rest.iter().enumerate() {
            allowed.insert(passage.passage.document.clone());

            let context = format_context(std::slice::from_ref(passage));
            let prompt = build_prompt(
                &self.step,
                variables(&[
                    ("question", question),
                    ("existing_answer", &answer),
                    ("context", &context),
                ]),
            )?;

            let label = format!("refine answer {}/{}", i + 1, rest.len());
            answer = generator.generate(&label, &prompt, &allowed).await?;
        }

        Ok(answer)
    }
}

/// Stuff when the passages fit the context budget, refine otherwise.
#[derive(Debug, Clone)]
pub struct AdaptiveStrategy {
    stuff: StuffStrategy,
    refine: RefineStrategy,
    budget_chars: usize,
}

impl AdaptiveStrategy {
    pub fn new(workspace: Option<&Path>, budget_chars: usize) -> AppResult<Self> {
        Ok(Self {
            stuff: StuffStrategy::new(workspace)?,
            refine: RefineStrategy::new(workspace)?,
            budget_chars,
        })
    }

    fn fits(&self, passages: &[ScoredPassage]) -> bool {
        let total: usize = passages.iter().map(|s| s.passage.text.chars().count()).sum();
        total <= self.budget_chars
    }
}

#[async_trait::async_trait]
impl SynthesisStrategy for AdaptiveStrategy {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn synthesize(
        &self,
        generator: &Generator,
        question: &str,
        passages: &[ScoredPassage],
    ) -> AppResult<String> {
        if self.fits(passages) {
            self.stuff.synthesize(generator, question, passages).await
        } else {
            tracing::debug!(
                "Passages exceed {} chars, refining instead of stuffing",
                self.budget_chars
            );
            self.refine.synthesize(generator, question, passages).await
        }
    }
}

/// Build the strategy named `name`.
pub fn create_strategy(
    name: &str,
    workspace: Option<&Path>,
    budget_chars: usize,
) -> AppResult<Box<dyn SynthesisStrategy>> {
    match name {
        "stuff" => Ok(Box::new(StuffStrategy::new(workspace)?)),
        "refine" => Ok(Box::new(RefineStrategy::new(workspace)?)),
        "auto" => Ok(Box::new(AdaptiveStrategy::new(workspace, budget_chars)?)),
        other => Err(AppError::Config(format!(
            "Unknown synthesis strategy: '{}'. Supported strategies: {}",
            other,
            STRATEGY_NAMES.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;
    use attest_llm::{LlmResponse, LlmUsage};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records prompts and replies with a scripted or echoed answer.
    struct ScriptedLlm {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.prompts.lock().unwrap().push(request.clone());
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| "unscripted".to_string());
            Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    fn generator(llm: Arc<ScriptedLlm>) -> Generator {
        Generator::new(
            llm,
            "test-model",
            0.1,
            500,
            RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2), Duration::from_secs(5)),
        )
    }

    fn passages() -> Vec<ScoredPassage> {
        vec![
            ScoredPassage {
                passage: Passage::new("policy.pdf", 2, 0, "Backup retention is 30 days.".to_string()),
                score: 0.8,
            },
            ScoredPassage {
                passage: Passage::new("policy.pdf", 1, 0, "Backups run nightly to region A".to_string()),
                score: 0.6,
            },
            ScoredPassage {
                passage: Passage::new("dr-plan.md", 1, 0, "Restores are tested quarterly.".to_string()),
                score: 0.55,
            },
        ]
    }

    #[test]
    fn test_format_context_labels_sources() {
        let context = format_context(&passages()[..2]);
        assert_eq!(
            context,
            "[Source: policy.pdf, page 2]\nBackup retention is 30 days.\n\n[Source: policy.pdf, page 1]\nBackups run nightly to region A"
        );
    }

    #[tokio::test]
    async fn test_stuff_makes_one_call_with_all_passages() {
        let llm = ScriptedLlm::new(&["Nightly backups, kept 30 days (policy.pdf)."]);
        let strategy = StuffStrategy::new(None).unwrap();

        let answer = strategy
            .synthesize(&generator(llm.clone()), "Backup frequency?", &passages())
            .await
            .unwrap();

        assert_eq!(answer, "Nightly backups, kept 30 days (policy.pdf).");
        assert_eq!(llm.prompt_count(), 1);
        let request = llm.prompts.lock().unwrap()[0].clone();
        assert!(request.prompt.contains("Backup frequency?"));
        assert!(request.prompt.contains("Restores are tested quarterly."));
        assert!(request.system.is_some());
        assert_eq!(request.temperature, Some(0.1));
    }

    #[tokio::test]
    async fn test_refine_makes_one_call_per_passage() {
        let llm = ScriptedLlm::new(&["draft 1", "draft 2", "final (dr-plan.md)"]);
        let strategy = RefineStrategy::new(None).unwrap();

        let answer = strategy
            .synthesize(&generator(llm.clone()), "Backup frequency?", &passages())
            .await
            .unwrap();

        assert_eq!(answer, "final (dr-plan.md)");
        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].prompt.contains("draft 1"));
        assert!(prompts[2].prompt.contains("draft 2"));
        assert!(prompts[2].prompt.contains("Restores are tested quarterly."));
    }

    #[tokio::test]
    async fn test_ungrounded_answer_is_retried() {
        let llm = ScriptedLlm::new(&["See vendor.pdf", "Grounded in policy.pdf"]);
        let strategy = StuffStrategy::new(None).unwrap();

        let answer = strategy
            .synthesize(&generator(llm.clone()), "Backups?", &passages())
            .await
            .unwrap();

        assert_eq!(answer, "Grounded in policy.pdf");
        assert_eq!(llm.prompt_count(), 2);
    }

    #[tokio::test]
    async fn test_persistently_ungrounded_answer_fails() {
        let llm = ScriptedLlm::new(&["vendor.pdf", "vendor.pdf", "vendor.pdf"]);
        let strategy = StuffStrategy::new(None).unwrap();

        let result = strategy
            .synthesize(&generator(llm.clone()), "Backups?", &passages())
            .await;

        assert!(matches!(result, Err(AppError::Generation(_))));
        assert_eq!(llm.prompt_count(), 3);
    }

    #[tokio::test]
    async fn test_refine_rejects_document_not_yet_supplied() {
        // The initial step only sees policy.pdf
        let llm = ScriptedLlm::new(&["dr-plan.md", "dr-plan.md", "dr-plan.md"]);
        let strategy = RefineStrategy::new(None).unwrap();

        let result = strategy
            .synthesize(&generator(llm), "Backups?", &passages())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_adaptive_switches_on_budget() {
        let llm = ScriptedLlm::new(&["a", "b", "c"]);
        let strategy = AdaptiveStrategy::new(None, 10).unwrap();
        strategy
            .synthesize(&generator(llm.clone()), "Backups?", &passages())
            .await
            .unwrap();
        assert_eq!(llm.prompt_count(), 3);

        let llm = ScriptedLlm::new(&["a"]);
        let strategy = AdaptiveStrategy::new(None, 10_000).unwrap();
        strategy
            .synthesize(&generator(llm.clone()), "Backups?", &passages())
            .await
            .unwrap();
        assert_eq!(llm.prompt_count(), 1);
    }

    #[test]
    fn test_create_strategy() {
        assert_eq!(create_strategy("stuff", None, 100).unwrap().name(), "stuff");
        assert_eq!(create_strategy("refine", None, 100).unwrap().name(), "refine");
        assert_eq!(create_strategy("auto", None, 100).unwrap().name(), "auto");
        assert!(create_strategy("map_reduce", None, 100).is_err());
    }
}
