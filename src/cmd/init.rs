//! `herald init`: generate a starter configuration file.
//!
//! Creates a YAML, JSON, or TOML config file with either minimal
//! or fully documented templates.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::HeraldError;

pub fn execute(args: &InitArgs) -> Result<(), HeraldError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("herald.{}", args.format.extension())));

    if output.exists() {
        return Err(HeraldError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# Herald config
#
# Messages are written to the log until a real provider is configured.

emails:
  log: {}

smses:
  log: {}
"#;

const YAML_FULL: &str = r#"# Herald config
#
# Values shown for top-level options are defaults.

# Accept GET requests with query parameters on /v1/email and /v1/sms.
allow_get: false

# Skip providers whose kind is not built into this binary instead of
# rejecting the whole configuration.
ignore_not_supported_provider: false

# Provider used when a request has no "provider". Email falls back to
# "plain"; SMS has no fallback. "all" tries every provider in name order.
# default_email_provider: "plain"
# default_sms_provider: "log"

# Per-attempt send timeout in milliseconds.
timeout: 30000

emails:
  # SMTP with opportunistic STARTTLS.
  # plain:
  #   host: "smtp.example.com"
  #   port: "587"                # Default: 25
  #   username: "herald"
  #   password: "changeme"
  #   from: "noreply@example.com"

  # Writes messages to the log. level: debug | info | warn
  log:
    level: "info"

smses:
  log:
    level: "info"
"#;

const JSON_MINIMAL: &str = r#"{
  "emails": {
    "log": {}
  },
  "smses": {
    "log": {}
  }
}
"#;

const JSON_FULL: &str = r#"{
  "allow_get": false,
  "ignore_not_supported_provider": false,
  "default_email_provider": "plain",
  "default_sms_provider": "log",
  "timeout": 30000,
  "emails": {
    "plain": {
      "host": "smtp.example.com",
      "port": "587",
      "username": "herald",
      "password": "changeme",
      "from": "noreply@example.com"
    },
    "log": {
      "level": "info"
    }
  },
  "smses": {
    "log": {
      "level": "info"
    }
  }
}
"#;

const TOML_MINIMAL: &str = r#"# Herald config
#
# Messages are written to the log until a real provider is configured.

[emails.log]

[smses.log]
"#;

const TOML_FULL: &str = r#"# Herald config
#
# Values shown for top-level options are defaults.

# Accept GET requests with query parameters on /v1/email and /v1/sms.
allow_get = false

# Skip providers whose kind is not built into this binary.
ignore_not_supported_provider = false

# Provider used when a request has no "provider". Email falls back to
# "plain"; SMS has no fallback. "all" tries every provider in name order.
# default_email_provider = "plain"
# default_sms_provider = "log"

# Per-attempt send timeout in milliseconds.
timeout = 30000

# SMTP with opportunistic STARTTLS.
# [emails.plain]
# host = "smtp.example.com"
# port = "587"                 # Default: 25
# username = "herald"
# password = "changeme"
# from = "noreply@example.com"

# Writes messages to the log. level: debug | info | warn
[emails.log]
level = "info"

[smses.log]
level = "info"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sources::parse_config_str;
    use crate::config::validation;

    fn check(format: &ConfigFormat) {
        for full in [false, true] {
            let config = parse_config_str(format.extension(), template(format, full), "template")
                .unwrap_or_else(|e| panic!("{format:?} full={full}: {e}"));
            validation::validate(&config).unwrap();
            assert!(config.emails.contains_key("log"));
            assert!(config.smses.contains_key("log"));
        }
    }

    #[test]
    fn json_templates_are_valid() {
        check(&ConfigFormat::Json);
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml_templates_are_valid() {
        check(&ConfigFormat::Yaml);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_templates_are_valid() {
        check(&ConfigFormat::Toml);
    }

    #[test]
    fn refuses_to_overwrite() {
        let path = std::env::temp_dir().join(format!("herald-init-{}.json", uuid::Uuid::new_v4()));
        let args = InitArgs {
            format: ConfigFormat::Json,
            output: Some(path.clone()),
            full: false,
        };
        execute(&args).unwrap();
        let err = execute(&args).unwrap_err();
        assert!(matches!(err, HeraldError::FileExists { .. }));
        std::fs::remove_file(&path).unwrap();
    }
}
