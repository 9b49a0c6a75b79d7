//! Per-request configuration resolution.
//!
//! The effective `(model identifier, api key)` pair is merged from two
//! sources with fixed precedence: request-scoped transport headers first,
//! the process environment second. Keys are matched case-insensitively, so
//! a header `IMAGENX_MODEL` and an environment variable `imagenx_model`
//! name the same field. This supports both a single-tenant deployment
//! configured once via environment and a multi-tenant one where every
//! caller ships its own provider and credential per request.

use crate::error::{ImagenxError, Result};
use std::collections::HashMap;

/// Field selecting the `provider:model` identifier.
pub const MODEL_FIELD: &str = "imagenx_model";
/// Field carrying the provider credential.
pub const API_KEY_FIELD: &str = "imagenx_api_key";

/// Effective configuration for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// The `provider:model` identifier.
    pub model: String,
    /// The provider credential. Never logged.
    pub api_key: String,
}

/// Looks `field` up in `headers`, then `env`, case-insensitively.
/// Empty and whitespace-only values count as absent.
fn lookup(
    field: &str,
    headers: &HashMap<String, String>,
    env: &HashMap<String, String>,
) -> Option<String> {
    let field = field.to_ascii_lowercase();
    let find = |map: &HashMap<String, String>| {
        map.iter()
            .find(|(key, value)| key.to_ascii_lowercase() == field && !value.trim().is_empty())
            .map(|(_, value)| value.clone())
    };
    find(headers).or_else(|| find(env))
}

/// Resolves the effective configuration from a header map and an
/// environment map. Absence of either field fails the request, never the
/// process.
pub fn resolve(
    headers: &HashMap<String, String>,
    env: &HashMap<String, String>,
) -> Result<ResolvedConfig> {
    let model = lookup(MODEL_FIELD, headers, env).ok_or_else(|| ImagenxError::missing(MODEL_FIELD))?;
    let api_key =
        lookup(API_KEY_FIELD, headers, env).ok_or_else(|| ImagenxError::missing(API_KEY_FIELD))?;
    Ok(ResolvedConfig { model, api_key })
}

/// Task-scoped resolution: `imagenx_<task>` selects the identifier and
/// `imagenx_<provider>_api_key` the credential, falling back to the plain
/// `imagenx_api_key` field when no provider-scoped key is set.
pub fn resolve_task(
    task: &str,
    headers: &HashMap<String, String>,
    env: &HashMap<String, String>,
) -> Result<ResolvedConfig> {
    let task = task.trim();
    let model_field = format!("imagenx_{task}");
    let model =
        lookup(&model_field, headers, env).ok_or_else(|| ImagenxError::missing(&model_field))?;

    let provider = model.split(':').next().unwrap_or_default();
    let provider_key_field = format!("imagenx_{provider}_api_key");
    let api_key = lookup(&provider_key_field, headers, env)
        .or_else(|| lookup(API_KEY_FIELD, headers, env))
        .ok_or_else(|| ImagenxError::missing(&provider_key_field))?;

    Ok(ResolvedConfig { model, api_key })
}

/// Snapshots the process environment in the map shape the resolver takes.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_header_wins_over_environment() {
        let headers = map(&[("imagenx_model", "A"), ("imagenx_api_key", "hk")]);
        let env = map(&[("IMAGENX_MODEL", "B"), ("IMAGENX_API_KEY", "ek")]);
        let config = resolve(&headers, &env).unwrap();
        assert_eq!(config.model, "A");
        assert_eq!(config.api_key, "hk");
    }

    #[test]
    fn test_environment_fallback() {
        let headers = HashMap::new();
        let env = map(&[("IMAGENX_MODEL", "B"), ("IMAGENX_API_KEY", "ek")]);
        let config = resolve(&headers, &env).unwrap();
        assert_eq!(config.model, "B");
        assert_eq!(config.api_key, "ek");
    }

    #[test]
    fn test_missing_model_fails() {
        let headers = map(&[("imagenx_api_key", "k")]);
        let err = resolve(&headers, &HashMap::new()).unwrap_err();
        assert!(
            matches!(err, ImagenxError::MissingConfiguration { field } if field == MODEL_FIELD)
        );
    }

    #[test]
    fn test_missing_api_key_fails() {
        let headers = map(&[("imagenx_model", "doubao:m")]);
        let err = resolve(&headers, &HashMap::new()).unwrap_err();
        assert!(
            matches!(err, ImagenxError::MissingConfiguration { field } if field == API_KEY_FIELD)
        );
    }

    #[test]
    fn test_case_insensitive_keys() {
        let headers = map(&[("Imagenx_Model", "A"), ("IMAGENX_API_KEY", "k")]);
        let config = resolve(&headers, &HashMap::new()).unwrap();
        assert_eq!(config.model, "A");
    }

    #[test]
    fn test_empty_header_value_falls_back_to_environment() {
        let headers = map(&[("imagenx_model", ""), ("imagenx_api_key", "  ")]);
        let env = map(&[("imagenx_model", "B"), ("imagenx_api_key", "ek")]);
        let config = resolve(&headers, &env).unwrap();
        assert_eq!(config.model, "B");
        assert_eq!(config.api_key, "ek");
    }

    #[test]
    fn test_task_scoped_resolution() {
        let headers = map(&[
            ("imagenx_image", "doubao:doubao-seedream-4-0-250828"),
            ("imagenx_doubao_api_key", "dk"),
        ]);
        let config = resolve_task("image", &headers, &HashMap::new()).unwrap();
        assert_eq!(config.model, "doubao:doubao-seedream-4-0-250828");
        assert_eq!(config.api_key, "dk");
    }

    #[test]
    fn test_task_scoped_falls_back_to_plain_api_key() {
        let headers = map(&[("imagenx_image", "doubao:m"), ("imagenx_api_key", "pk")]);
        let config = resolve_task(" image ", &headers, &HashMap::new()).unwrap();
        assert_eq!(config.api_key, "pk");
    }

    #[test]
    fn test_task_scoped_missing_model() {
        let err = resolve_task("image", &HashMap::new(), &HashMap::new()).unwrap_err();
        assert!(
            matches!(err, ImagenxError::MissingConfiguration { field } if field == "imagenx_image")
        );
    }
}
