use axum::extract::FromRef;

use crate::archive_store::ArchiveStore;
use crate::search::SearchVault;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedArchiveStore = Arc<dyn ArchiveStore>;
pub type GuardedSearchVault = Arc<dyn SearchVault>;
pub type GuardedUserManager = Arc<UserManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub archive_store: GuardedArchiveStore,
    pub search_vault: GuardedSearchVault,
    pub user_manager: GuardedUserManager,
    pub version: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        archive_store: GuardedArchiveStore,
        search_vault: GuardedSearchVault,
        user_manager: GuardedUserManager,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            archive_store,
            search_vault,
            user_manager,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedArchiveStore {
    fn from_ref(input: &ServerState) -> Self {
        input.archive_store.clone()
    }
}

impl FromRef<ServerState> for GuardedSearchVault {
    fn from_ref(input: &ServerState) -> Self {
        input.search_vault.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
