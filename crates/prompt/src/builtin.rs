//! Prompts compiled into the binary.
//!
//! A workspace can shadow any of these by placing `<id>.yml` in `.attest/prompts/`.

use crate::types::PromptDefinition;
use attest_core::{AppError, AppResult};

/// Single-pass answer over every retrieved passage.
pub const STUFF_PROMPT_ID: &str = "synthesis.stuff";

/// First call of the refine chain.
pub const REFINE_INITIAL_PROMPT_ID: &str = "synthesis.refine.initial";

/// Every later call of the refine chain.
pub const REFINE_STEP_PROMPT_ID: &str = "synthesis.refine.step";

const BUILTIN_PROMPTS: [(&str, &str); 3] = [
    (STUFF_PROMPT_ID, include_str!("../prompts/synthesis.stuff.yml")),
    (
        REFINE_INITIAL_PROMPT_ID,
        include_str!("../prompts/synthesis.refine.initial.yml"),
    ),
    (
        REFINE_STEP_PROMPT_ID,
        include_str!("../prompts/synthesis.refine.step.yml"),
    ),
];

/// Look up a built-in prompt by ID.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<Option<PromptDefinition>> {
    let Some((_, source)) = BUILTIN_PROMPTS.iter().find(|(id, _)| *id == prompt_id) else {
        return Ok(None);
    };

    let definition: PromptDefinition = serde_yaml::from_str(source).map_err(|e| {
        AppError::Prompt(format!("Built-in prompt {} is invalid: {}", prompt_id, e))
    })?;

    Ok(Some(definition))
}

/// IDs of all built-in prompts.
pub fn builtin_prompt_ids() -> Vec<&'static str> {
    BUILTIN_PROMPTS.iter().map(|(id, _)| *id).collect()
}
