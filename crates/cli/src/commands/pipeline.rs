//! Pipeline assembly shared by the commands.

use attest_core::{config::AppConfig, AppError, AppResult, PipelineConfig};
use attest_knowledge::{
    create_provider, AnswerSynthesizer, EmbeddingConfig, EmbeddingProvider, LearnOutcome,
    ProgressReporter, Retriever,
};
use attest_llm::{create_client, LlmClient};
use attest_questionnaire::Orchestrator;
use std::path::Path;
use std::sync::Arc;

/// Pipeline settings with an optional strategy override, validated.
pub fn pipeline_config(config: &AppConfig, strategy: Option<&str>) -> AppResult<PipelineConfig> {
    let mut pipeline = config.pipeline.clone();
    if let Some(strategy) = strategy {
        pipeline.synthesis.strategy = strategy.to_string();
    }
    pipeline.validate()?;
    Ok(pipeline)
}

/// Reporter printing progress lines to stderr, or only logging when `quiet`.
pub fn progress_reporter(quiet: bool) -> ProgressReporter {
    if quiet {
        return ProgressReporter::noop();
    }
    ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
}

pub fn embedding_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(&EmbeddingConfig::from_app_config(config))
}

pub fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    config.validate()?;
    let endpoint = config.resolve_endpoint(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())
        .map_err(AppError::Config)
}

/// Index `corpus`, reusing the workspace snapshot when it still matches.
pub async fn index_corpus(
    config: &AppConfig,
    pipeline: &PipelineConfig,
    corpus: &Path,
    provider: &dyn EmbeddingProvider,
    progress: &ProgressReporter,
) -> AppResult<LearnOutcome> {
    config.ensure_attest_dir()?;
    let snapshot = config.index_path();
    let outcome =
        attest_knowledge::learn(corpus, pipeline, provider, Some(&snapshot), progress).await?;

    for skipped in &outcome.skipped {
        tracing::debug!("Skipped {}: {}", skipped.file, skipped.cause);
    }

    Ok(outcome)
}

/// Index `corpus` and wire the retriever and synthesizer around it.
pub async fn build_orchestrator(
    config: &AppConfig,
    pipeline: &PipelineConfig,
    corpus: &Path,
    progress: &ProgressReporter,
) -> AppResult<Orchestrator> {
    let llm = llm_client(config)?;
    let provider = embedding_provider(config)?;
    let outcome = index_corpus(config, pipeline, corpus, provider.as_ref(), progress).await?;

    let retriever = Retriever::from_config(Arc::new(outcome.index), provider, pipeline);
    let synthesizer = AnswerSynthesizer::from_config(
        llm,
        config.model.clone(),
        pipeline,
        Some(&config.workspace),
    )?;

    Ok(Orchestrator::new(retriever, synthesizer).with_progress(progress.clone()))
}
