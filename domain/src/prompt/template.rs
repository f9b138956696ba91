//! Step prompt templates
//!
//! Templates are plain format strings with `{name}` placeholders filled
//! from the task context. `{{` and `}}` produce literal braces.

use crate::agent::step::Step;
use crate::core::error::DomainError;
use std::collections::BTreeMap;

const UNDERSTAND: &str = r#"Analyze the task: {task}

Restate the problem in your own words. List the inputs, the expected outputs,
the constraints and any edge cases worth handling."#;

const PLAN: &str = r#"Create a plan based on task analysis:
{understanding}

Task: {task}

Break the solution down into concrete, ordered steps."#;

const IMPLEMENT: &str = r#"Execute the plan:
{plan}

Task: {task}

Write the complete solution. Put the final code between [CODE] and [/CODE] markers."#;

const VERIFY: &str = r#"Verify the result:
{implementation}

Task: {task}

Check the solution for correctness and edge cases and point out any problems."#;

/// Templates keyed by step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPromptTemplates {
    templates: BTreeMap<Step, String>,
}

impl Default for StepPromptTemplates {
    fn default() -> Self {
        let templates = [
            (Step::Understand, UNDERSTAND),
            (Step::Plan, PLAN),
            (Step::Implement, IMPLEMENT),
            (Step::Verify, VERIFY),
        ]
        .into_iter()
        .map(|(step, text)| (step, text.to_string()))
        .collect();
        Self { templates }
    }
}

impl StepPromptTemplates {
    /// Replace the template for one step
    pub fn with_template(mut self, step: Step, template: impl Into<String>) -> Self {
        self.templates.insert(step, template.into());
        self
    }

    pub fn get(&self, step: Step) -> Option<&str> {
        self.templates.get(&step).map(String::as_str)
    }

    /// Fill the template for `step` from `context`.
    ///
    /// Every placeholder must have a context entry; a missing one is an
    /// error rather than an empty substitution.
    pub fn render(
        &self,
        step: Step,
        context: &BTreeMap<String, String>,
    ) -> Result<String, DomainError> {
        let template = self.get(step).ok_or_else(|| {
            DomainError::config(format!("no prompt template for step '{}'", step))
        })?;

        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for k in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if !closed {
                        return Err(DomainError::config(format!(
                            "unterminated placeholder in template for step '{}'",
                            step
                        )));
                    }
                    let value = context.get(key.trim()).ok_or_else(|| {
                        DomainError::MissingTemplateKey {
                            step: step.to_string(),
                            key: key.trim().to_string(),
                        }
                    })?;
                    out.push_str(value);
                }
                _ => out.push(c),
            }
        }
        Ok(out)
    }
}
