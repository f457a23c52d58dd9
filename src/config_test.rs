use super::*;
use std::collections::HashMap;

fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    ServerConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn postgres_is_the_default_store() {
    let config = config_from(&[("DATABASE_URL", "postgres://localhost/codeblocks")]).expect("config");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.ws_channel_capacity, DEFAULT_WS_CHANNEL_CAPACITY);
    assert_eq!(
        config.store,
        StoreKind::Postgres {
            database_url: "postgres://localhost/codeblocks".into(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    );
}

#[test]
fn postgres_requires_database_url() {
    assert_eq!(config_from(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    assert_eq!(config_from(&[("DATABASE_URL", "  ")]), Err(ConfigError::Missing("DATABASE_URL")));
}

#[test]
fn memory_store_needs_no_database() {
    let config = config_from(&[("EXERCISE_STORE", "memory"), ("PORT", "8080")]).expect("config");
    assert_eq!(config.store, StoreKind::Memory);
    assert_eq!(config.port, 8080);
}

#[test]
fn overrides_are_parsed() {
    let config = config_from(&[
        ("DATABASE_URL", "postgres://db/x"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("WS_CHANNEL_CAPACITY", "32"),
    ])
    .expect("config");
    assert_eq!(config.ws_channel_capacity, 32);
    assert!(matches!(config.store, StoreKind::Postgres { max_connections: 12, .. }));
}

#[test]
fn bad_values_are_reported() {
    assert_eq!(
        config_from(&[("EXERCISE_STORE", "memory"), ("PORT", "abc")]),
        Err(ConfigError::Invalid { var: "PORT", value: "abc".into() })
    );
    assert_eq!(
        config_from(&[("EXERCISE_STORE", "redis")]),
        Err(ConfigError::Invalid { var: "EXERCISE_STORE", value: "redis".into() })
    );
    assert!(matches!(
        config_from(&[("EXERCISE_STORE", "memory"), ("WS_CHANNEL_CAPACITY", "0")]),
        Err(ConfigError::Invalid { var: "WS_CHANNEL_CAPACITY", .. })
    ));
}
