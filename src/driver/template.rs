//! Command templates for collaborator invocations.
//!
//! Driver, backend and hook commands are configured as strings with
//! `{variable}` placeholders, e.g.
//! `{target} {platform} {configuration} {project} {args} -generatemanifest`.
//!
//! # Syntax
//!
//! - `{name}` - Substitutes the value of variable `name`
//! - `{{` - Renders as literal `{`
//! - `}}` - Renders as literal `}`
//!
//! Undefined variables are an error rather than an empty substitution, so a
//! typo in config never silently drops an argument. Rendered commands are split
//! into argv with `shell-words`; no shell is involved. Values that must stay a
//! single argument (paths) are quoted by the caller with [`quote_arg`].

use crate::error::{MeldError, Result};
use std::collections::HashMap;
use std::fmt;

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A variable was referenced but not provided.
    UndefinedVariable { name: String, position: usize },
    /// A `{` was found without a matching `}`.
    UnmatchedBrace { position: usize },
    /// An empty variable name was found (e.g., `{}`).
    EmptyVariableName { position: usize },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UndefinedVariable { name, position } => {
                write!(
                    f,
                    "undefined variable '{}' at position {} in template",
                    name, position
                )
            }
            TemplateError::UnmatchedBrace { position } => {
                write!(f, "unmatched '{{' at position {} in template", position)
            }
            TemplateError::EmptyVariableName { position } => {
                write!(
                    f,
                    "empty variable name '{{}}' at position {} in template",
                    position
                )
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Render a template string by substituting variables.
pub fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> std::result::Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' => {
                if let Some((_, '{')) = chars.peek() {
                    chars.next();
                    result.push('{');
                    continue;
                }

                let mut var_name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, c)) => var_name.push(c),
                        None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                    }
                }

                let var_name = var_name.trim();
                if var_name.is_empty() {
                    return Err(TemplateError::EmptyVariableName { position: pos });
                }

                match variables.get(var_name) {
                    Some(value) => result.push_str(value),
                    None => {
                        return Err(TemplateError::UndefinedVariable {
                            name: var_name.to_string(),
                            position: pos,
                        });
                    }
                }
            }
            '}' => {
                // `}}` collapses to one brace; a lone `}` is literal.
                if let Some((_, '}')) = chars.peek() {
                    chars.next();
                }
                result.push('}');
            }
            _ => result.push(ch),
        }
    }

    Ok(result)
}

/// Render a command template and split it into an argv vector.
///
/// `what` names the config field the template came from, for error messages.
pub fn render_argv(
    what: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<Vec<String>> {
    let rendered = render_template(template, variables).map_err(|e| match e {
        TemplateError::UndefinedVariable { name, .. } => MeldError::UserError(format!(
            "{} references undefined variable '{}'\n\
             Template: {}\n\
             Available variables: {}",
            what,
            name,
            template,
            format_vars(variables)
        )),
        other => MeldError::UserError(format!("{} is malformed: {}", what, other)),
    })?;

    let args = shell_words::split(&rendered).map_err(|e| {
        MeldError::UserError(format!(
            "failed to parse {} '{}': {}\n\
             Fix: check for unmatched quotes or invalid escape sequences.",
            what, rendered, e
        ))
    })?;

    if args.is_empty() {
        return Err(MeldError::UserError(format!(
            "{} is empty after rendering: '{}'",
            what, rendered
        )));
    }

    Ok(args)
}

/// Quote a value so it survives argv splitting as exactly one argument.
///
/// Empty values render as nothing, so optional arguments simply disappear.
pub fn quote_arg(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        shell_words::quote(value).into_owned()
    }
}

/// Helper to create a variables map from a list of key-value pairs.
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

fn format_vars(vars: &HashMap<String, String>) -> String {
    let mut keys: Vec<_> = vars.keys().map(|k| k.as_str()).collect();
    keys.sort();
    keys.join(", ")
}
