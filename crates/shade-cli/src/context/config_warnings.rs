use shade_config::{AuditConfig, DatabaseConfig, ShadeConfig};

/// Emit warnings for likely mistyped env var keys that silently fell back to defaults.
pub fn warn_unconfigured(config: &ShadeConfig) {
    for warning in collect_unconfigured_warnings(config, std::env::vars()) {
        tracing::warn!("{warning}");
    }
}

fn collect_unconfigured_warnings<I>(config: &ShadeConfig, env: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_keys = env.into_iter().map(|(key, _)| key).collect::<Vec<_>>();

    let mut warnings = Vec::new();

    if config.database.path == DatabaseConfig::default().path
        && has_single_underscore_key(&env_keys, "SHADE_DATABASE")
    {
        warnings.push(
            "Database config appears default while SHADE_DATABASE* env vars exist. Use double underscores (example: SHADE_DATABASE__PATH)."
                .to_string(),
        );
    }

    if config.audit.table_prefix == AuditConfig::default().table_prefix
        && has_single_underscore_key(&env_keys, "SHADE_AUDIT")
    {
        warnings.push(
            "Audit config appears default while SHADE_AUDIT* env vars exist. Use double underscores (example: SHADE_AUDIT__TABLE_PREFIX)."
                .to_string(),
        );
    }

    warnings
}

fn has_single_underscore_key(keys: &[String], prefix: &str) -> bool {
    let nested = format!("{prefix}__");
    keys.iter()
        .any(|key| key.starts_with(prefix) && !key.starts_with(&nested))
}

#[cfg(test)]
mod tests {
    use shade_config::ShadeConfig;

    use super::collect_unconfigured_warnings;

    #[test]
    fn warns_for_single_underscore_keys() {
        let config = ShadeConfig::default();
        let warnings = collect_unconfigured_warnings(
            &config,
            vec![
                ("SHADE_DATABASE_PATH".to_string(), "/tmp/a.db".to_string()),
                ("SHADE_AUDIT_TABLE_PREFIX".to_string(), "hist_".to_string()),
            ],
        );

        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn does_not_warn_for_nested_keys() {
        let config = ShadeConfig::default();
        let warnings = collect_unconfigured_warnings(
            &config,
            vec![(
                "SHADE_DATABASE__PATH".to_string(),
                ".shade/shade.db".to_string(),
            )],
        );

        assert!(warnings.is_empty());
    }

    #[test]
    fn does_not_warn_when_sections_are_configured() {
        let mut config = ShadeConfig::default();
        config.database.path = "/tmp/a.db".to_string();
        let warnings = collect_unconfigured_warnings(
            &config,
            vec![("SHADE_DATABASE_PATH".to_string(), "/tmp/a.db".to_string())],
        );

        assert!(warnings.is_empty());
    }
}
