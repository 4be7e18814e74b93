//! Configuration validation with detailed error reporting.
//!
//! [`validate`] checks a parsed [`Config`] for structural errors:
//! empty or reserved provider names, empty default provider names and a
//! zero timeout. [`check_kinds`] additionally checks every configured
//! provider against a [`Registry`], which is what `herald validate`
//! reports before a document ever reaches a running server.

use super::model::{Config, ALL_PROVIDERS};
use crate::error::ValidationError;
use crate::provider::registry::Registry;
use crate::provider::Category;

const CATEGORIES: [(Category, &str); 2] = [(Category::Email, "emails"), (Category::Sms, "smses")];

/// Validate a single provider name. Returns `Ok(())` or a human-readable error.
pub fn validate_provider_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("provider name cannot be empty".into());
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("provider name '{name}' cannot contain whitespace"));
    }
    if name == ALL_PROVIDERS {
        return Err(format!(
            "'{ALL_PROVIDERS}' is reserved for sending through every provider"
        ));
    }
    Ok(())
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeout == 0 {
        errors.push(ValidationError {
            section: "(root)".into(),
            field: "timeout".into(),
            message: "timeout must be greater than zero".into(),
            suggestion: Some("omit it to use the 30000ms default".into()),
        });
    }

    for (field, value) in [
        ("default_email_provider", &config.default_email_provider),
        ("default_sms_provider", &config.default_sms_provider),
    ] {
        if value.as_deref().is_some_and(str::is_empty) {
            errors.push(ValidationError {
                section: "(root)".into(),
                field: field.into(),
                message: "default provider name cannot be empty".into(),
                suggestion: Some("remove the field instead".into()),
            });
        }
    }

    for (category, section) in CATEGORIES {
        for name in config.providers(category).keys() {
            if let Err(msg) = validate_provider_name(name) {
                errors.push(ValidationError {
                    section: section.into(),
                    field: if name.is_empty() {
                        "(empty)".into()
                    } else {
                        name.clone()
                    },
                    message: msg,
                    suggestion: None,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Report configured providers whose kind is not in `registry`.
///
/// Returns nothing when the document sets `ignore_not_supported_provider`,
/// since such entries are skipped at load time.
#[must_use]
pub fn check_kinds(config: &Config, registry: &Registry) -> Vec<ValidationError> {
    if config.ignore_not_supported_provider {
        return Vec::new();
    }

    let mut errors = Vec::new();
    for (category, section) in CATEGORIES {
        for name in config.providers(category).keys() {
            if !registry.contains(category, name) {
                errors.push(ValidationError {
                    section: section.into(),
                    field: name.clone(),
                    message: format!("no {category} provider named '{name}' is available"),
                    suggestion: Some(format!(
                        "known {category} providers: {}",
                        registry.kinds(category).join(", ")
                    )),
                });
            }
        }
    }
    errors
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} email providers, {} sms providers\n",
        config.emails.len(),
        config.smses.len()
    )];

    for (category, section) in CATEGORIES {
        let providers = config.providers(category);
        if providers.is_empty() {
            continue;
        }
        let default = config.default_provider(category).unwrap_or(match category {
            Category::Email => "plain (fallback)",
            Category::Sms => "none",
        });
        lines.push(format!("  {section}  (default: {default})"));
        for (name, settings) in providers {
            let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
            lines.push(format!("    {name}: {}", keys.join(", ")));
        }
    }

    lines.push(format!("  timeout: {}ms", config.timeout));
    lines.push(format!(
        "  GET sending: {}",
        if config.allow_get { "enabled" } else { "disabled" }
    ));

    format!("{} is valid\n{}", path, lines.join("\n"))
}
