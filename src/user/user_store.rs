use super::auth::{AuthToken, AuthTokenValue, UserAuthCredentials};
use super::favorites::{Favorite, FavoriteQuery};
use super::permissions::{Permission, UserRole};
use super::settings::UserSettings;
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the user's authentication credentials given the user handle.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>>;

    /// Replaces the user's stored credentials. A credentials object without
    /// a password removes the stored password.
    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns a user's authentication token given an AuthTokenValue.
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token given the token value.
    /// Returns Ok(None) if the token does not exist.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Updates an auth token with the latest timestamp.
    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    /// Adds a new auth token.
    fn add_user_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Returns all user's authentication tokens.
    fn get_all_user_auth_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>>;

    /// Deletes tokens not used for the given number of days.
    /// Returns the number of tokens that were deleted.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str) -> Result<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>>;

    fn get_all_user_handles(&self) -> Result<Vec<String>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    /// Returns all roles assigned to a user.
    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>>;

    /// Assigns a role to a user. Assigning a role twice is a no-op.
    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;

    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;

    /// The union of the permissions of every role the user holds.
    fn resolve_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>>;
}

pub trait UserFavoritesStore: Send + Sync {
    /// Inserts a favorite and returns it with its id and creation time.
    /// Fails with a constraint violation if the user already saved the verse.
    fn add_favorite(&self, user_id: usize, poem_id: i64, verse_id: i64) -> Result<Favorite>;

    /// Returns Ok(None) if the favorite does not exist or belongs to
    /// someone else.
    fn get_favorite(&self, user_id: usize, favorite_id: usize) -> Result<Option<Favorite>>;

    fn find_favorite(
        &self,
        user_id: usize,
        poem_id: i64,
        verse_id: i64,
    ) -> Result<Option<Favorite>>;

    /// Newest first.
    fn list_favorites(&self, user_id: usize, query: &FavoriteQuery) -> Result<Vec<Favorite>>;

    /// Returns false if nothing was deleted.
    fn delete_favorite(&self, user_id: usize, favorite_id: usize) -> Result<bool>;
}

pub trait UserSettingsStore: Send + Sync {
    /// Returns Ok(None) if the user never saved settings.
    fn get_user_settings(&self, user_id: usize) -> Result<Option<UserSettings>>;

    /// Inserts or replaces the user's settings and returns the stored row.
    fn save_user_settings(&self, settings: &UserSettings) -> Result<UserSettings>;
}

/// Everything the server needs from the user database.
pub trait FullUserStore: UserStore + UserFavoritesStore + UserSettingsStore {}

impl<T: UserStore + UserFavoritesStore + UserSettingsStore> FullUserStore for T {}
