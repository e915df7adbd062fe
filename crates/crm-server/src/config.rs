use anyhow::{Context, Result};
use crm_access::AccessConfig;
use crm_db::DbConfig;

/// Server configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub access: AccessConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: var("CRM_DB_URL").unwrap_or(db_defaults.url),
            namespace: var("CRM_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: var("CRM_DB_DATABASE").unwrap_or(db_defaults.database),
            username: var("CRM_DB_USER").unwrap_or(db_defaults.username),
            password: var("CRM_DB_PASSWORD").unwrap_or(db_defaults.password),
        };

        let defaults = AccessConfig::default();
        let access = AccessConfig {
            super_admin_bypasses_gate: parse_or(
                &var,
                "CRM_SUPER_ADMIN_BYPASSES_GATE",
                defaults.super_admin_bypasses_gate,
            )?,
            super_admin_bypasses_scope: parse_or(
                &var,
                "CRM_SUPER_ADMIN_BYPASSES_SCOPE",
                defaults.super_admin_bypasses_scope,
            )?,
            pepper: var("CRM_PASSWORD_PEPPER").filter(|p| !p.is_empty()),
            min_password_length: parse_or(
                &var,
                "CRM_MIN_PASSWORD_LENGTH",
                defaults.min_password_length,
            )?,
        };

        Ok(Self { db, access })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("parse {key}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db.namespace, "crm");
        assert!(config.access.super_admin_bypasses_gate);
        assert!(!config.access.super_admin_bypasses_scope);
        assert_eq!(config.access.pepper, None);
        assert_eq!(config.access.min_password_length, 12);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CRM_DB_URL", "db.internal:8000"),
            ("CRM_SUPER_ADMIN_BYPASSES_GATE", "false"),
            ("CRM_SUPER_ADMIN_BYPASSES_SCOPE", "true"),
            ("CRM_PASSWORD_PEPPER", "s3cret"),
            ("CRM_MIN_PASSWORD_LENGTH", " 16 "),
        ]))
        .unwrap();
        assert_eq!(config.db.url, "db.internal:8000");
        assert!(!config.access.super_admin_bypasses_gate);
        assert!(config.access.super_admin_bypasses_scope);
        assert_eq!(config.access.pepper.as_deref(), Some("s3cret"));
        assert_eq!(config.access.min_password_length, 16);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = ServerConfig::from_lookup(lookup(&[("CRM_MIN_PASSWORD_LENGTH", "twelve")]))
            .unwrap_err();
        assert!(err.to_string().contains("CRM_MIN_PASSWORD_LENGTH"));

        let err = ServerConfig::from_lookup(lookup(&[("CRM_SUPER_ADMIN_BYPASSES_GATE", "yes")]))
            .unwrap_err();
        assert!(err.to_string().contains("CRM_SUPER_ADMIN_BYPASSES_GATE"));
    }

    #[test]
    fn empty_pepper_is_ignored() {
        let config = ServerConfig::from_lookup(lookup(&[("CRM_PASSWORD_PEPPER", "")])).unwrap();
        assert_eq!(config.access.pepper, None);
    }
}
