//! PostgreSQL record store for departments.

use super::RecordStore;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use tollgate_core::{Department, StoreError, TollgateError, TollgateResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS department (
    id           VARCHAR(4)  PRIMARY KEY,
    dept_name    VARCHAR(40) NOT NULL UNIQUE,
    active       BOOLEAN     NOT NULL,
    created_by   BIGINT      NOT NULL,
    created_date TIMESTAMP   NOT NULL,
    updated_by   BIGINT      NOT NULL,
    updated_date TIMESTAMP   NOT NULL
)";

const COLUMNS: &str =
    "id, dept_name, active, created_by, created_date, updated_by, updated_date";

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "tollgate".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl PgConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("TOLLGATE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("TOLLGATE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("TOLLGATE_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("TOLLGATE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("TOLLGATE_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("TOLLGATE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("TOLLGATE_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn create_pool(&self) -> TollgateResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::record(format!("Failed to create pool: {}", e)))?;
        Ok(pool)
    }
}

/// [`RecordStore`] for departments backed by a `department` table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: Pool,
}

impl PgRecordStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &PgConfig) -> TollgateResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create the `department` table if it does not exist.
    pub async fn ensure_schema(&self) -> TollgateResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await.map_err(StoreError::record)?;
        tracing::debug!("department schema ready");
        Ok(())
    }

    async fn get_conn(&self) -> TollgateResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get database connection");
            TollgateError::from(StoreError::record(e))
        })
    }
}

fn department_from_row(row: &Row) -> Result<Department, StoreError> {
    Ok(Department {
        id: row.try_get("id").map_err(StoreError::record)?,
        name: row.try_get("dept_name").map_err(StoreError::record)?,
        active: row.try_get("active").map_err(StoreError::record)?,
        created_by: row.try_get("created_by").map_err(StoreError::record)?,
        created_date: row.try_get("created_date").map_err(StoreError::record)?,
        updated_by: row.try_get("updated_by").map_err(StoreError::record)?,
        updated_date: row.try_get("updated_date").map_err(StoreError::record)?,
    })
}

#[async_trait]
impl RecordStore<Department> for PgRecordStore {
    async fn get_by_id(&self, id: &str) -> TollgateResult<Option<Department>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM department WHERE id = $1", COLUMNS);
        let row = conn
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(StoreError::record)?;
        Ok(row.as_ref().map(department_from_row).transpose()?)
    }

    async fn get_all(&self) -> TollgateResult<Vec<Department>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM department ORDER BY id ASC", COLUMNS);
        let rows = conn
            .query(sql.as_str(), &[])
            .await
            .map_err(StoreError::record)?;
        let departments = rows
            .iter()
            .map(department_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(departments)
    }

    async fn insert(&self, entity: Department) -> TollgateResult<Department> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "INSERT INTO department ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {cols}",
            cols = COLUMNS
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[
                    &entity.id,
                    &entity.name,
                    &entity.active,
                    &entity.created_by,
                    &entity.created_date,
                    &entity.updated_by,
                    &entity.updated_date,
                ],
            )
            .await
            .map_err(StoreError::record)?;
        Ok(department_from_row(&row)?)
    }

    async fn save(&self, entity: Department) -> TollgateResult<Department> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "INSERT INTO department ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                 dept_name = EXCLUDED.dept_name, \
                 active = EXCLUDED.active, \
                 updated_by = EXCLUDED.updated_by, \
                 updated_date = EXCLUDED.updated_date \
             RETURNING {cols}",
            cols = COLUMNS
        );
        let row = conn
            .query_one(
                sql.as_str(),
                &[
                    &entity.id,
                    &entity.name,
                    &entity.active,
                    &entity.created_by,
                    &entity.created_date,
                    &entity.updated_by,
                    &entity.updated_date,
                ],
            )
            .await
            .map_err(StoreError::record)?;
        Ok(department_from_row(&row)?)
    }

    async fn delete_by_id(&self, id: &str) -> TollgateResult<bool> {
        let conn = self.get_conn().await?;
        let removed = conn
            .execute("DELETE FROM department WHERE id = $1", &[&id])
            .await
            .map_err(StoreError::record)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PgConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "tollgate");
        assert_eq!(config.max_size, 16);
    }

    #[test]
    fn test_create_pool_is_lazy() {
        // deadpool does not connect until the first `get`.
        let pool = PgConfig::default().create_pool();
        assert!(pool.is_ok());
    }
}
