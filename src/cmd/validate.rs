//! `herald validate`: check a configuration file for errors.
//!
//! Parses and validates the config file, checks every provider kind
//! against the built-in registry, and reports results in either
//! human-readable text or machine-readable JSON format.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::sources::parse_config_str;
use crate::config::validation;
use crate::error::HeraldError;
use crate::provider::registry::Registry;

pub fn execute(args: &ValidateArgs) -> Result<(), HeraldError> {
    let path = &args.config;

    if !path.exists() {
        return Err(HeraldError::ConfigFileNotFound { path: path.clone() });
    }

    let content = std::fs::read_to_string(path)?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let config = parse_config_str(ext, &content, &path.display().to_string())?;

    let registry = Registry::with_builtin()?;
    let mut errors = validation::validate(&config).err().unwrap_or_default();
    errors.extend(validation::check_kinds(&config, &registry));

    if !errors.is_empty() {
        match args.format {
            ValidateFormat::Text => {
                eprintln!("\u{2717} {} has {} errors\n", path.display(), errors.len());
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            ValidateFormat::Json => {
                let json_errors: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "section": e.section,
                            "field": e.field,
                            "message": e.message,
                            "suggestion": e.suggestion,
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "errors": json_errors,
                    })
                );
            }
        }
        return Err(HeraldError::ConfigValidation { errors });
    }

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&path.display().to_string(), &config)
            );
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "providers": config.total_providers(),
                    "emails": config.emails.keys().collect::<Vec<_>>(),
                    "smses": config.smses.keys().collect::<Vec<_>>(),
                })
            );
        }
    }

    Ok(())
}
