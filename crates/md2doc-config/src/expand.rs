//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a config value.
///
/// # Errors
///
/// Returns [`ConfigError::EnvVar`] when a referenced variable is unset and
/// no default is given, or when the reference itself is malformed.
pub fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let context = |name: &str| -> Result<Option<String>, String> {
        let (var, default) = match name.split_once(":-") {
            Some((var, default)) => (var, Some(default)),
            None => (name, None),
        };
        match std::env::var(var) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => match default {
                Some(default) => Ok(Some(default.to_owned())),
                None => Err(format!("${{{var}}} not set")),
            },
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(format!("${{{var}}} contains invalid UTF-8"))
            }
        }
    };

    match shellexpand::env_with_context(value, context) {
        Ok(expanded) => Ok(expanded.into_owned()),
        Err(err) => Err(ConfigError::EnvVar {
            field: field.to_owned(),
            message: err.cause,
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_plain_value_passes_through() {
        assert_eq!(
            expand_env("https://example.com", "service.base_url").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_set_variable_expands() {
        // SAFETY: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("MD2DOC_TEST_EXPAND", "hello") };
        assert_eq!(
            expand_env("${MD2DOC_TEST_EXPAND}", "service.access_token").unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_unset_variable_with_default() {
        assert_eq!(
            expand_env("${MD2DOC_TEST_UNSET_XYZ:-fallback}", "f").unwrap(),
            "fallback"
        );
    }

    #[test]
    fn test_unset_variable_without_default_errors() {
        let err = expand_env("${MD2DOC_TEST_UNSET_XYZ}", "service.access_token").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MD2DOC_TEST_UNSET_XYZ"));
    }
}
