//! Configuration loader: merges .env, config.toml and environment variables.

use std::path::Path;

use common::config::DashboardConfig;
use common::Error;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

pub(crate) fn validate_config(config: &DashboardConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        issues.push("api.base_url must not be empty".into());
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        issues.push(format!("api.base_url must start with http:// or https:// (got {base_url})"));
    }
    if config.api.timeout_secs == 0 {
        issues.push("api.timeout_secs must be > 0".into());
    }
    if config.api.page_size == 0 {
        issues.push("api.page_size must be > 0".into());
    }
    if config.cache.ttl_secs == 0 {
        issues.push("cache.ttl_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply `SPACE_*` overrides read through `get`.
pub(crate) fn apply_env_overrides(
    config: &mut DashboardConfig,
    get: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(url) = get("SPACE_API_BASE_URL") {
        config.api.base_url = url.trim().to_string();
    }
    if let Some(raw) = get("SPACE_API_TIMEOUT_SECS") {
        config.api.timeout_secs = parse_positive_u64(&raw, "SPACE_API_TIMEOUT_SECS")?;
    }
    if let Some(raw) = get("SPACE_API_PAGE_SIZE") {
        let parsed = parse_positive_u64(&raw, "SPACE_API_PAGE_SIZE")?;
        config.api.page_size = u32::try_from(parsed)
            .map_err(|_| Error::Config("SPACE_API_PAGE_SIZE is too large".into()))?;
    }
    if let Some(raw) = get("SPACE_CACHE_TTL_SECS") {
        config.cache.ttl_secs = parse_positive_u64(&raw, "SPACE_CACHE_TTL_SECS")?;
    }
    if let Some(basename) = get("SPACE_BASENAME") {
        config.basename = basename.trim().to_string();
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<DashboardConfig, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load dashboard configuration from an optional file and the environment.
///
/// An explicit `path` must exist; otherwise `config.toml` in the working
/// directory is used when present.
pub fn load_config(path: Option<&Path>) -> Result<DashboardConfig, Error> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            let default_path = Path::new("config.toml");
            if default_path.exists() {
                read_config_file(default_path)?
            } else {
                DashboardConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DashboardConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("SPACE_API_BASE_URL", " https://space.example.com/api "),
                ("SPACE_API_TIMEOUT_SECS", "5"),
                ("SPACE_API_PAGE_SIZE", "250"),
                ("SPACE_CACHE_TTL_SECS", "60"),
                ("SPACE_BASENAME", "/dashboard"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://space.example.com/api");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.page_size, 250);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.basename, "/dashboard");
    }

    #[test]
    fn test_bad_env_values_rejected() {
        let mut config = DashboardConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("SPACE_API_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            Error::Config("SPACE_API_TIMEOUT_SECS must be an integer > 0".into())
        );

        assert!(apply_env_overrides(&mut config, env(&[("SPACE_CACHE_TTL_SECS", "0")])).is_err());
        assert!(
            apply_env_overrides(&mut config, env(&[("SPACE_API_PAGE_SIZE", "99999999999")]))
                .is_err()
        );
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let mut config = DashboardConfig::default();
        config.api.base_url = "ftp://example.com".into();
        config.api.timeout_secs = 0;
        config.cache.ttl_secs = 0;

        let Err(Error::Config(message)) = validate_config(&config) else {
            panic!("expected config error");
        };
        assert!(message.contains("api.base_url"));
        assert!(message.contains("api.timeout_secs"));
        assert!(message.contains("cache.ttl_secs"));
        assert!(!message.contains("api.page_size"));
    }

    #[test]
    fn test_toml_sections_with_defaults() {
        let config: DashboardConfig = toml::from_str(
            r#"
            basename = "/app"

            [api]
            base_url = "https://api.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.page_size, 1000);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.basename, "/app");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/spacecap.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
