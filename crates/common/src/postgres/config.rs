use serde::{Deserialize, Serialize};

/// PostgreSQL configuration for the device registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_pool_size: usize,
    pub migrations_dir: String,
    pub goose_binary_path: String,
}

impl PostgresConfig {
    /// DSN in the form the goose migration binary expects
    pub fn goose_dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "service_io".to_string(),
            username: "service_io".to_string(),
            password: "service_io".to_string(),
            max_pool_size: 5,
            migrations_dir: "crates/service_io/migrations/postgres".to_string(),
            goose_binary_path: "goose".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goose_dsn_disables_ssl() {
        let config = PostgresConfig {
            host: "db".to_string(),
            port: 6543,
            ..Default::default()
        };
        assert_eq!(
            config.goose_dsn(),
            "postgres://service_io:service_io@db:6543/service_io?sslmode=disable"
        );
    }
}
