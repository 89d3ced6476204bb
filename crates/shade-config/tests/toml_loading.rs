//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for sandboxed files and env vars.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use shade_config::ShadeConfig;

#[test]
fn loads_all_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/var/lib/shade/portal.db"

[audit]
table_prefix = "hist_"

[general]
default_limit = 10
"#,
        )?;

        let config: ShadeConfig = Figment::from(Serialized::defaults(ShadeConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "/var/lib/shade/portal.db");
        assert_eq!(config.audit.table_prefix, "hist_");
        assert_eq!(config.general.default_limit, 10);
        Ok(())
    });
}

#[test]
fn partial_toml_keeps_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = ":memory:"
"#,
        )?;

        let config: ShadeConfig = Figment::from(Serialized::defaults(ShadeConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.database.is_in_memory());
        assert_eq!(config.audit.table_prefix, "audit_");
        assert_eq!(config.general.default_limit, 50);
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.set_env("SHADE_DATABASE__PATH", "/tmp/from-env.db");

        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/tmp/from-toml.db"
"#,
        )?;

        let config: ShadeConfig = Figment::from(Serialized::defaults(ShadeConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("SHADE_").split("__"))
            .extract()?;

        assert_eq!(config.database.path, "/tmp/from-env.db");
        Ok(())
    });
}

#[test]
fn project_config_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".shade")?;
        jail.create_file(
            ".shade/config.toml",
            r#"
[audit]
table_prefix = "shadow_"
"#,
        )?;

        let config = ShadeConfig::load().expect("config loads");
        assert_eq!(config.audit.table_prefix, "shadow_");
        Ok(())
    });
}

#[test]
fn invalid_prefix_fails_load() {
    Jail::expect_with(|jail| {
        jail.set_env("SHADE_AUDIT__TABLE_PREFIX", "bad-prefix");
        assert!(ShadeConfig::load().is_err());
        Ok(())
    });
}

#[test]
fn load_in_reads_project_layer_from_given_root() {
    Jail::expect_with(|jail| {
        std::fs::create_dir_all(jail.directory().join("app/.shade"))
            .map_err(|e| e.to_string())?;
        jail.create_file(
            "app/.shade/config.toml",
            r#"
[audit]
table_prefix = "app_audit_"
"#,
        )?;

        let config = ShadeConfig::load_in(&jail.directory().join("app"))
            .map_err(|e| e.to_string())?;
        assert_eq!(config.audit.table_prefix, "app_audit_");
        Ok(())
    });
}
