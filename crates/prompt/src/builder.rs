//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use attest_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the system template (if any) and the user template are rendered
/// with the same variables. HTML escaping is disabled: prompts are plain text.
///
/// # Example
/// ```no_run
/// use attest_prompt::{build_prompt, resolve_prompt, STUFF_PROMPT_ID};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = resolve_prompt(None, STUFF_PROMPT_ID)?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "How often are backups taken?".to_string());
/// vars.insert("context".to_string(), "[policy.pdf, page 1]\nBackups run nightly.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?
        .map(|s| s.trim_end().to_string());

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptBehavior, PromptOutputSpec};

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior {
                tone: "professional".to_string(),
                style: "concise".to_string(),
            },
            system: system.map(str::to_string),
            template: "Question: {{question}}".to_string(),
            output: PromptOutputSpec {
                format: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_render_does_not_escape() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "<policy> & \"quotes\"".to_string());

        let result = render_template("{{context}}", &vars).unwrap();
        assert_eq!(result, "<policy> & \"quotes\"");
    }

    #[test]
    fn test_build_prompt_with_system() {
        let def = create_test_definition(Some("Auditor for {{question}}\n"));
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "backups".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.user, "Question: backups");
        assert_eq!(built.system.as_deref(), Some("Auditor for backups"));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_without_system() {
        let def = create_test_definition(None);
        let built = build_prompt(&def, HashMap::new()).unwrap();
        assert!(built.system.is_none());
        // Handlebars renders missing variables as empty string
        assert_eq!(built.user, "Question: ");
    }

    #[test]
    fn test_render_invalid_template() {
        assert!(render_template("{{#if}}", &HashMap::new()).is_err());
    }
}
