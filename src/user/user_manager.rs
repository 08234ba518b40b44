use crate::archive_store::{ArchiveStore, ValidationError, NON_FIELD_ERRORS};

use super::{
    auth::PasswordHasherKind,
    favorites::{format_created_at, Favorite, FavoriteError, FavoriteQuery, FavoriteToggle, FavoriteView},
    permissions::{Permission, UserRole},
    settings::{UserSettings, UserSettingsUpdate, UserSettingsView},
    AuthToken, AuthTokenValue, FullUserStore, UserAuthCredentials, UsernamePasswordCredentials,
};
use anyhow::{bail, Context, Result};
use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};
use tracing::{debug, info};

pub struct UserManager {
    archive: Arc<dyn ArchiveStore>,
    user_store: Arc<Mutex<Box<dyn FullUserStore>>>,
}

impl UserManager {
    pub fn new(archive: Arc<dyn ArchiveStore>, user_store: Box<dyn FullUserStore>) -> Self {
        Self {
            archive,
            user_store: Arc::new(Mutex::new(user_store)),
        }
    }

    pub fn add_user<T: AsRef<str>>(&self, user_handle: T) -> Result<usize> {
        let user_handle = user_handle.as_ref().trim();
        if user_handle.is_empty() {
            bail!("The user handle cannot be empty.")
        }

        let locked_store = self.user_store.lock().unwrap();
        if locked_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle already exists.");
        }

        let user_id = locked_store.create_user(user_handle)?;
        info!("Created user {} with id {}", user_handle, user_id);
        Ok(user_id)
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.user_store.lock().unwrap().get_user_auth_token(value)
    }

    pub fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store
            .lock()
            .unwrap()
            .update_user_auth_token_last_used_timestamp(value)
    }

    pub fn generate_auth_token(&self, credentials: &UserAuthCredentials) -> Result<AuthToken> {
        let token = AuthToken {
            user_id: credentials.user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store
            .lock()
            .unwrap()
            .add_user_auth_token(token.clone())?;
        Ok(token)
    }

    fn create_hashed_password(user_id: usize, password: &str) -> Result<UsernamePasswordCredentials> {
        if password.is_empty() {
            bail!("The password cannot be empty.");
        }
        let hasher = PasswordHasherKind::Argon2;
        let salt = hasher.generate_b64_salt()?;
        let hash = hasher.hash(password.as_bytes(), &salt)?;
        Ok(UsernamePasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: SystemTime::now(),
            last_tried: None,
            last_used: None,
        })
    }

    pub fn create_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        let mut credentials = user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        if credentials.username_password.is_some() {
            bail!("User with handle {} already has password credentials. Maybe you want to modify them?", user_handle);
        }

        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        user_store.update_user_auth_credentials(credentials)
    }

    pub fn update_password_credentials(&self, user_handle: &str, password: &str) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        let mut credentials = user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        if credentials.username_password.is_none() {
            bail!(
                "Cannot update password of user with handle {} since it never had one.",
                user_handle
            );
        }
        credentials.username_password =
            Some(Self::create_hashed_password(credentials.user_id, password)?);
        user_store.update_user_auth_credentials(credentials)
    }

    pub fn delete_password_credentials(&self, user_handle: &str) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        let mut credentials = user_store
            .get_user_auth_credentials(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        credentials.username_password = None;
        user_store.update_user_auth_credentials(credentials)
    }

    pub fn get_user_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        self.user_store
            .lock()
            .unwrap()
            .get_user_auth_credentials(user_handle)
    }

    /// Returns the credentials of `user_handle` if `password` matches.
    pub fn check_password(&self, user_handle: &str, password: &str) -> Result<Option<UserAuthCredentials>> {
        let Some(credentials) = self.get_user_credentials(user_handle)? else {
            return Ok(None);
        };
        let matches = match &credentials.username_password {
            Some(password_credentials) => password_credentials.verify(password)?,
            None => false,
        };
        Ok(matches.then_some(credentials))
    }

    pub fn delete_auth_token(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        let user_store = self.user_store.lock().unwrap();
        let removed = user_store.delete_user_auth_token(token_value)?;
        match removed {
            Some(removed) if removed.user_id == user_id => Ok(()),
            Some(removed) => {
                user_store.add_user_auth_token(removed.clone())?;
                bail!(
                    "Tried to delete an auth token of user {}, but the authenticated user was {}.",
                    removed.user_id,
                    user_id
                )
            }
            None => bail!("Auth token not found."),
        }
    }

    pub fn get_user_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        self.user_store
            .lock()
            .unwrap()
            .get_all_user_auth_tokens(user_handle)
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store
            .lock()
            .unwrap()
            .prune_unused_auth_tokens(unused_for_days)
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.lock().unwrap().get_all_user_handles()
    }

    pub fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        self.user_store.lock().unwrap().get_user_id(user_handle)
    }

    pub fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        self.user_store.lock().unwrap().get_user_handle(user_id)
    }

    pub fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        self.user_store.lock().unwrap().get_user_roles(user_id)
    }

    pub fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store.lock().unwrap().add_user_role(user_id, role)
    }

    pub fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store
            .lock()
            .unwrap()
            .remove_user_role(user_id, role)
    }

    pub fn get_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>> {
        self.user_store
            .lock()
            .unwrap()
            .resolve_user_permissions(user_id)
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Joins a stored favorite with the archive. Returns None when the poem or
    /// verse it points at no longer exists.
    fn favorite_view(&self, favorite: Favorite, user_handle: &str) -> Result<Option<FavoriteView>> {
        let Some(poem) = self.archive.get_poem_summary(favorite.poem_id)? else {
            return Ok(None);
        };
        let Some(verse) = self.archive.get_verse(favorite.verse_id)? else {
            return Ok(None);
        };
        Ok(Some(FavoriteView {
            id: favorite.id,
            user: favorite.user_id,
            user_username: user_handle.to_string(),
            poem: favorite.poem_id,
            poem_title: poem.poem.title,
            verse: favorite.verse_id,
            verse_text: verse.verse.text,
            poet_name: poem.poet_name,
            created_at: format_created_at(favorite.created_at),
        }))
    }

    fn require_user_handle(&self, user_id: usize) -> Result<String> {
        self.get_user_handle(user_id)?
            .with_context(|| format!("User {} not found.", user_id))
    }

    fn validate_favorite_target(&self, poem_id: i64, verse_id: i64) -> Result<()> {
        if self.archive.get_poem_summary(poem_id)?.is_none() {
            return Err(ValidationError::missing_reference("poem", poem_id).into());
        }
        let verse = self
            .archive
            .get_verse(verse_id)?
            .ok_or_else(|| ValidationError::missing_reference("verse", verse_id))?;
        if verse.verse.poem_id != poem_id {
            return Err(ValidationError::invalid(
                NON_FIELD_ERRORS,
                "This verse does not belong to this poem.",
                "این مصرع متعلق به این شعر نیست.",
            )
            .into());
        }
        Ok(())
    }

    pub fn add_favorite(&self, user_id: usize, poem_id: i64, verse_id: i64) -> Result<FavoriteView> {
        self.validate_favorite_target(poem_id, verse_id)?;
        let user_handle = self.require_user_handle(user_id)?;

        let favorite = {
            let user_store = self.user_store.lock().unwrap();
            if user_store.find_favorite(user_id, poem_id, verse_id)?.is_some() {
                return Err(FavoriteError::Duplicate.into());
            }
            user_store.add_favorite(user_id, poem_id, verse_id)?
        };
        debug!("User {} saved verse {} of poem {}", user_id, verse_id, poem_id);

        self.favorite_view(favorite, &user_handle)?
            .context("Favorite target vanished while saving")
    }

    /// Removes the favorite if present, otherwise adds it.
    pub fn toggle_favorite(&self, user_id: usize, poem_id: i64, verse_id: i64) -> Result<FavoriteToggle> {
        let existing = self
            .user_store
            .lock()
            .unwrap()
            .find_favorite(user_id, poem_id, verse_id)?;
        match existing {
            Some(favorite) => {
                self.user_store
                    .lock()
                    .unwrap()
                    .delete_favorite(user_id, favorite.id)?;
                Ok(FavoriteToggle::Removed)
            }
            None => Ok(FavoriteToggle::Added(self.add_favorite(user_id, poem_id, verse_id)?)),
        }
    }

    pub fn get_favorite(&self, user_id: usize, favorite_id: usize) -> Result<Option<FavoriteView>> {
        let Some(favorite) = self
            .user_store
            .lock()
            .unwrap()
            .get_favorite(user_id, favorite_id)?
        else {
            return Ok(None);
        };
        let user_handle = self.require_user_handle(user_id)?;
        self.favorite_view(favorite, &user_handle)
    }

    /// The user's favorites, newest first. Favorites whose poem or verse was
    /// removed from the archive are left out.
    pub fn list_favorites(&self, user_id: usize, query: &FavoriteQuery) -> Result<Vec<FavoriteView>> {
        let favorites = self
            .user_store
            .lock()
            .unwrap()
            .list_favorites(user_id, query)?;
        let user_handle = self.require_user_handle(user_id)?;

        let mut views = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            let favorite_id = favorite.id;
            match self.favorite_view(favorite, &user_handle)? {
                Some(view) => views.push(view),
                None => debug!("Skipping dangling favorite {}", favorite_id),
            }
        }
        Ok(views)
    }

    pub fn delete_favorite(&self, user_id: usize, favorite_id: usize) -> Result<bool> {
        self.user_store
            .lock()
            .unwrap()
            .delete_favorite(user_id, favorite_id)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn get_settings(&self, user_id: usize) -> Result<Option<UserSettingsView>> {
        let Some(settings) = self.user_store.lock().unwrap().get_user_settings(user_id)? else {
            return Ok(None);
        };
        Ok(Some(UserSettingsView {
            username: self.require_user_handle(user_id)?,
            settings,
        }))
    }

    /// Creates the user's settings from defaults or updates the stored ones.
    /// The flag is true when the settings were created.
    pub fn save_settings(&self, user_id: usize, update: &UserSettingsUpdate) -> Result<(UserSettingsView, bool)> {
        let username = self.require_user_handle(user_id)?;
        let user_store = self.user_store.lock().unwrap();
        let existing = user_store.get_user_settings(user_id)?;
        let created = existing.is_none();

        let mut settings = existing.unwrap_or_else(|| UserSettings::defaults_for(user_id));
        settings.apply(update)?;
        let settings = user_store.save_user_settings(&settings)?;

        Ok((UserSettingsView { username, settings }, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive_store::{Category, Century, Poem, Poet, SqliteArchiveStore, Verse, VersePosition};
    use crate::user::SqliteUserStore;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        manager: UserManager,
        archive: Arc<SqliteArchiveStore>,
        poem_id: i64,
        verse_ids: Vec<i64>,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let archive = Arc::new(SqliteArchiveStore::new(temp_dir.path().join("archive.db"), 1).unwrap());
        let poet = archive
            .create_poet(Poet {
                id: 0,
                name: "حافظ".to_string(),
                description: String::new(),
                century: Century::Classical,
                image: None,
                image_slug: None,
            })
            .unwrap();
        let category = archive
            .create_category(Category {
                id: 0,
                poet_id: poet.id,
                title: "غزلیات".to_string(),
                parent_id: None,
                url: None,
            })
            .unwrap();
        let poem = archive
            .create_poem(Poem {
                id: 0,
                category_id: category.id,
                title: "غزل ۱".to_string(),
                url: String::new(),
            })
            .unwrap();
        let mut verse_ids = Vec::new();
        for (order, text) in ["الا یا ایها الساقی", "ادر کاسا و ناولها"].iter().enumerate() {
            let verse = archive
                .create_verse(Verse {
                    id: 0,
                    poem_id: poem.id,
                    order: order as i64 + 1,
                    position: VersePosition::Right,
                    text: text.to_string(),
                })
                .unwrap();
            verse_ids.push(verse.id);
        }

        let user_store = SqliteUserStore::new(temp_dir.path().join("user.db")).unwrap();
        let manager = UserManager::new(archive.clone(), Box::new(user_store));
        Fixture {
            _temp_dir: temp_dir,
            manager,
            archive,
            poem_id: poem.id,
            verse_ids,
        }
    }

    #[test]
    fn rejects_empty_and_duplicate_handles() {
        let f = fixture();
        assert!(f.manager.add_user("  ").is_err());
        f.manager.add_user("reader").unwrap();
        assert!(f.manager.add_user("reader").is_err());
    }

    #[test]
    fn password_credentials_lifecycle() {
        let f = fixture();
        f.manager.add_user("reader").unwrap();
        assert!(f.manager.update_password_credentials("reader", "pw").is_err());

        f.manager.create_password_credentials("reader", "pw").unwrap();
        assert!(f.manager.create_password_credentials("reader", "pw").is_err());
        assert!(f.manager.check_password("reader", "pw").unwrap().is_some());
        assert!(f.manager.check_password("reader", "nope").unwrap().is_none());
        assert!(f.manager.check_password("ghost", "pw").unwrap().is_none());

        f.manager.update_password_credentials("reader", "pw2").unwrap();
        assert!(f.manager.check_password("reader", "pw").unwrap().is_none());
        assert!(f.manager.check_password("reader", "pw2").unwrap().is_some());

        f.manager.delete_password_credentials("reader").unwrap();
        assert!(f.manager.check_password("reader", "pw2").unwrap().is_none());
    }

    #[test]
    fn tokens_can_only_be_deleted_by_their_owner() {
        let f = fixture();
        let owner = f.manager.add_user("owner").unwrap();
        let other = f.manager.add_user("other").unwrap();
        f.manager.create_password_credentials("owner", "pw").unwrap();
        let credentials = f.manager.check_password("owner", "pw").unwrap().unwrap();
        let token = f.manager.generate_auth_token(&credentials).unwrap();

        assert!(f.manager.delete_auth_token(other, &token.value).is_err());
        assert!(f.manager.get_auth_token(&token.value).unwrap().is_some());

        f.manager.delete_auth_token(owner, &token.value).unwrap();
        assert!(f.manager.get_auth_token(&token.value).unwrap().is_none());
    }

    #[test]
    fn favorite_view_is_joined_with_the_archive() {
        let f = fixture();
        let user_id = f.manager.add_user("reader").unwrap();
        let view = f.manager.add_favorite(user_id, f.poem_id, f.verse_ids[0]).unwrap();

        assert_eq!(view.user, user_id);
        assert_eq!(view.user_username, "reader");
        assert_eq!(view.poem_title, "غزل ۱");
        assert_eq!(view.verse_text, "الا یا ایها الساقی");
        assert_eq!(view.poet_name, "حافظ");
        assert!(view.created_at.ends_with("+00:00"));
    }

    #[test]
    fn duplicate_favorite_is_reported() {
        let f = fixture();
        let user_id = f.manager.add_user("reader").unwrap();
        f.manager.add_favorite(user_id, f.poem_id, f.verse_ids[0]).unwrap();
        let err = f
            .manager
            .add_favorite(user_id, f.poem_id, f.verse_ids[0])
            .unwrap_err();
        assert_eq!(err.downcast_ref::<FavoriteError>(), Some(&FavoriteError::Duplicate));
    }

    #[test]
    fn favorite_verse_must_belong_to_poem() {
        let f = fixture();
        let user_id = f.manager.add_user("reader").unwrap();

        let err = f.manager.add_favorite(user_id, f.poem_id + 100, f.verse_ids[0]).unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>().map(|e| e.field()), Some("poem"));

        let err = f.manager.add_favorite(user_id, f.poem_id, 9999).unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>().map(|e| e.field()), Some("verse"));

        let other_poem = f
            .archive
            .create_poem(Poem {
                id: 0,
                category_id: f.archive.get_poem_summary(f.poem_id).unwrap().unwrap().poem.category_id,
                title: "غزل ۲".to_string(),
                url: String::new(),
            })
            .unwrap();
        let err = f.manager.add_favorite(user_id, other_poem.id, f.verse_ids[0]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>().map(|e| e.field()),
            Some(NON_FIELD_ERRORS)
        );
    }

    #[test]
    fn toggle_adds_then_removes() {
        let f = fixture();
        let user_id = f.manager.add_user("reader").unwrap();

        let first = f.manager.toggle_favorite(user_id, f.poem_id, f.verse_ids[1]).unwrap();
        assert!(matches!(first, FavoriteToggle::Added(_)));
        let second = f.manager.toggle_favorite(user_id, f.poem_id, f.verse_ids[1]).unwrap();
        assert!(matches!(second, FavoriteToggle::Removed));
        assert!(f
            .manager
            .list_favorites(user_id, &FavoriteQuery::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn favorites_are_private_and_skip_dangling_rows() {
        let f = fixture();
        let alice = f.manager.add_user("alice").unwrap();
        let bob = f.manager.add_user("bob").unwrap();
        let saved = f.manager.add_favorite(alice, f.poem_id, f.verse_ids[0]).unwrap();
        f.manager.add_favorite(alice, f.poem_id, f.verse_ids[1]).unwrap();

        assert!(f.manager.get_favorite(bob, saved.id).unwrap().is_none());
        assert!(!f.manager.delete_favorite(bob, saved.id).unwrap());
        assert_eq!(f.manager.list_favorites(alice, &FavoriteQuery::default()).unwrap().len(), 2);

        f.archive.delete_verse(f.verse_ids[0]).unwrap();
        let remaining = f.manager.list_favorites(alice, &FavoriteQuery::default()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].verse, f.verse_ids[1]);
        assert!(f.manager.get_favorite(alice, saved.id).unwrap().is_none());
    }

    #[test]
    fn settings_are_created_then_partially_updated() {
        let f = fixture();
        let user_id = f.manager.add_user("reader").unwrap();
        assert!(f.manager.get_settings(user_id).unwrap().is_none());

        let update: UserSettingsUpdate = serde_json::from_str(r#"{"font_size": 20}"#).unwrap();
        let (view, created) = f.manager.save_settings(user_id, &update).unwrap();
        assert!(created);
        assert_eq!(view.username, "reader");
        assert_eq!(view.settings.font_size, 20.0);

        let update: UserSettingsUpdate = serde_json::from_str(r#"{"view_mode": "ltr"}"#).unwrap();
        let (view, created) = f.manager.save_settings(user_id, &update).unwrap();
        assert!(!created);
        assert_eq!(view.settings.font_size, 20.0);
        assert_eq!(view.settings.view_mode.as_str(), "ltr");

        let invalid: UserSettingsUpdate = serde_json::from_str(r#"{"font_size": 100}"#).unwrap();
        let err = f.manager.save_settings(user_id, &invalid).unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
        assert_eq!(f.manager.get_settings(user_id).unwrap().unwrap().settings.font_size, 20.0);
    }
}
