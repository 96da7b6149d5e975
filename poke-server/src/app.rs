use std::{ops::Deref, sync::Arc};

use sqlx::MySqlPool;
use tracing::{info, warn};

use poke_slo::Result;
use poke_storage::{
    pokemon::Pokemon,
    poketeam::PokeTeam,
    user::{AccessLevel, User},
    CredentialStore, MariaDb, Memory, Repository,
};

use crate::AppConfig;

pub struct App {
    pub config: AppConfig,
    pub store: Store,
}

impl App {
    pub fn new(config: AppConfig, store: Store) -> Self {
        Self { config, store }
    }

    /// Makes sure the configured admin token belongs to an ADMIN user.
    pub async fn ensure_admin(&self) -> Result<()> {
        let Some(token) = self.config.admin_token.as_deref() else {
            return Ok(());
        };
        match self.store.credentials.find_by_token(token).await? {
            Some(user) if user.level() == Some(AccessLevel::Admin) => {
                info!("admin token already registered to {}", user.name());
            }
            Some(user) => {
                warn!(
                    "admin token belongs to {} without ADMIN access",
                    user.name()
                );
            }
            None => {
                let admin = self
                    .store
                    .users
                    .save(&User::new("admin", token, AccessLevel::Admin))
                    .await?;
                info!("registered admin user {:?}", admin.id);
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Store {
    pub credentials: Arc<dyn CredentialStore>,
    pub users: Arc<dyn Repository<User>>,
    pub pokemon: Arc<dyn Repository<Pokemon>>,
    pub teams: Arc<dyn Repository<PokeTeam>>,
}

impl Store {
    pub fn mariadb(pool: MySqlPool) -> Self {
        let users = Arc::new(MariaDb::<User>::new(pool.clone()));
        Self {
            credentials: Arc::clone(&users) as Arc<dyn CredentialStore>,
            users,
            pokemon: Arc::new(MariaDb::<Pokemon>::new(pool.clone())),
            teams: Arc::new(MariaDb::<PokeTeam>::new(pool)),
        }
    }

    pub fn memory() -> Self {
        let users = Arc::new(Memory::<User>::new());
        Self {
            credentials: Arc::clone(&users) as Arc<dyn CredentialStore>,
            users,
            pokemon: Arc::new(Memory::<Pokemon>::new()),
            teams: Arc::new(Memory::<PokeTeam>::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState(pub Arc<App>);

impl Deref for AppState {
    type Target = App;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
