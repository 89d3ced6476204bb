//! Audit table naming.

use serde::{Deserialize, Serialize};
use shade_core::entity::check_identifier;

use crate::ConfigError;

fn default_table_prefix() -> String {
    "audit_".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Prefix of every generated audit table name. Audit tables are named
    /// `{table_prefix}{entity}_{YYYYMMDD}`.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
        }
    }
}

impl AuditConfig {
    /// The prefix must keep generated names plain identifiers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the prefix is not an identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_identifier("table prefix", &self.table_prefix).map_err(|e| {
            ConfigError::InvalidValue {
                field: "audit.table_prefix".into(),
                reason: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix_is_valid() {
        let config = AuditConfig::default();
        assert_eq!(config.table_prefix, "audit_");
        config.validate().unwrap();
    }

    #[test]
    fn rejects_non_identifier_prefix() {
        for prefix in ["", "1x_", "audit-", "a;b"] {
            let config = AuditConfig {
                table_prefix: prefix.into(),
            };
            assert!(config.validate().is_err(), "prefix '{prefix}' accepted");
        }
    }

    #[test]
    fn prefix_rule_matches_entity_identifiers() {
        let config = AuditConfig {
            table_prefix: "audit-".into(),
        };
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string().contains("invalid table prefix identifier 'audit-'"),
            "{err}"
        );
    }
}
