use crate::config::AppConfig;
use crate::storage::{DiskStorage, PhotoStorage};
use crate::users::{PgUserStore, UserStore};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub photos: Arc<dyn PhotoStorage>,
}

impl AppState {
    /// Connects every collaborator; any failure here keeps the server from starting.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env().context("read configuration")?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let disk = DiskStorage::new(&config.uploads_dir);
        disk.ensure_layout().await?;

        Ok(Self {
            users: Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>,
            photos: Arc::new(disk) as Arc<dyn PhotoStorage>,
            config,
        })
    }
}
