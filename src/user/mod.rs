pub mod auth;
pub mod favorites;
pub mod permissions;
pub mod settings;
mod sqlite_user_store;
mod user_manager;
mod user_store;

pub use auth::{
    AuthToken, AuthTokenValue, PasswordHasherKind, UserAuthCredentials,
    UsernamePasswordCredentials,
};
pub use favorites::{Favorite, FavoriteError, FavoriteQuery, FavoriteToggle, FavoriteView};
pub use permissions::{Permission, UserRole};
pub use settings::{UserSettings, UserSettingsUpdate, UserSettingsView, ViewMode};
pub use sqlite_user_store::{SqliteUserStore, USER_VERSIONED_SCHEMAS};
pub use user_manager::UserManager;
pub use user_store::{
    FullUserStore, UserAuthCredentialsStore, UserAuthTokenStore, UserFavoritesStore,
    UserSettingsStore, UserStore,
};
