use crate::sqlite_column;
use crate::sqlite_persistence::{
    migrate_if_needed, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{info, warn};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};
const USER_ROLE_TABLE_V_0: Table = Table {
    name: "user_role",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("role", &SqlType::Text, non_null = true),
    ],
    unique_constraints: &[&["user_id", "role"]],
    indices: &[],
};
const FAVORITE_TABLE_V_0: Table = Table {
    name: "favorite",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("poem_id", &SqlType::Integer, non_null = true),
        sqlite_column!("verse_id", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "poem_id", "verse_id"]],
    indices: &[("idx_favorite_user", "user_id")],
};

/// V 1
const USER_SETTINGS_TABLE_V_1: Table = Table {
    name: "user_settings",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!(
            "view_mode",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'centered'")
        ),
        sqlite_column!(
            "font_size",
            &SqlType::Real,
            non_null = true,
            default_value = Some("16")
        ),
        sqlite_column!(
            "show_line_numbers",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!("last_highlight", &SqlType::Text),
        sqlite_column!(
            "browse_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "comments_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "copy_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "print_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "home_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "random_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "editor_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "download_button_visible",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
    ],
    unique_constraints: &[],
    indices: &[],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USER_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            USER_ROLE_TABLE_V_0,
            FAVORITE_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            AUTH_TOKEN_TABLE_V_0,
            USER_PASSWORD_CREDENTIALS_V_0,
            USER_ROLE_TABLE_V_0,
            FAVORITE_TABLE_V_0,
            USER_SETTINGS_TABLE_V_1,
        ],
        migration: Some(|conn: &Connection| {
            USER_SETTINGS_TABLE_V_1.create(conn)?;
            Ok(())
        }),
    },
];

const SETTINGS_COLUMNS: &str = "id, user_id, view_mode, font_size, show_line_numbers, \
     last_highlight, browse_button_visible, comments_button_visible, copy_button_visible, \
     print_button_visible, home_button_visible, random_button_visible, \
     editor_button_visible, download_button_visible";

fn system_time_from_column_result(value: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn system_time_to_column(value: SystemTime) -> i64 {
    value
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn parse_auth_token(row: &Row) -> rusqlite::Result<AuthToken> {
    Ok(AuthToken {
        user_id: row.get(0)?,
        value: AuthTokenValue(row.get(1)?),
        created: system_time_from_column_result(row.get(2)?),
        last_used: row
            .get::<_, Option<i64>>(3)?
            .map(system_time_from_column_result),
    })
}

fn parse_favorite(row: &Row) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: row.get(0)?,
        user_id: row.get(1)?,
        poem_id: row.get(2)?,
        verse_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn parse_settings(row: &Row) -> rusqlite::Result<UserSettings> {
    let raw_view_mode: String = row.get(2)?;
    let view_mode = ViewMode::from_str(&raw_view_mode).unwrap_or_else(|_| {
        warn!("Unknown view mode '{}' in settings, using default", raw_view_mode);
        ViewMode::default()
    });
    Ok(UserSettings {
        id: row.get(0)?,
        user_id: row.get(1)?,
        view_mode,
        font_size: row.get(3)?,
        show_line_numbers: row.get(4)?,
        last_highlight: row.get(5)?,
        browse_button_visible: row.get(6)?,
        comments_button_visible: row.get(7)?,
        copy_button_visible: row.get(8)?,
        print_button_visible: row.get(9)?,
        home_button_visible: row.get(10)?,
        random_button_visible: row.get(11)?,
        editor_button_visible: row.get(12)?,
        download_button_visible: row.get(13)?,
    })
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let db_path = db_path.as_ref();
        let mut conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open user database at {:?}", db_path))?;

        migrate_if_needed(&mut conn, USER_VERSIONED_SCHEMAS, "user")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let user_count: usize =
            conn.query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))?;
        info!("Opened user db with {} users", user_count);

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO user (handle) VALUES (?1)", params![user_handle])?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT handle FROM user WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_all_user_handles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT handle FROM user ORDER BY handle")?;
        let handles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(handles)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT role FROM user_role WHERE user_id = ?1")?;
        let raw_roles = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        let mut roles = Vec::with_capacity(raw_roles.len());
        for raw in raw_roles {
            match UserRole::from_str(&raw) {
                Some(role) => roles.push(role),
                None => warn!("Ignoring unknown role '{}' of user {}", raw, user_id),
            }
        }
        Ok(roles)
    }

    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO user_role (user_id, role) VALUES (?1, ?2)",
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM user_role WHERE user_id = ?1 AND role = ?2",
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn resolve_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>> {
        let mut permissions: Vec<Permission> = Vec::new();
        for role in self.get_user_roles(user_id)? {
            for permission in role.permissions() {
                if !permissions.contains(permission) {
                    permissions.push(*permission);
                }
            }
        }
        Ok(permissions)
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                parse_auth_token,
            )
            .optional()?)
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let existing = conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![token.0],
                parse_auth_token,
            )
            .optional()?;
        if existing.is_some() {
            conn.execute("DELETE FROM auth_token WHERE value = ?1", params![token.0])?;
        }
        Ok(existing)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE auth_token SET last_used = {} WHERE value = ?1",
                DEFAULT_TIMESTAMP
            ),
            params![token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created) VALUES (?1, ?2, ?3)",
            params![
                token.user_id,
                token.value.0,
                system_time_to_column(token.created)
            ],
        )?;
        Ok(())
    }

    fn get_all_user_auth_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.user_id, t.value, t.created, t.last_used FROM auth_token t \
             JOIN user u ON u.id = t.user_id WHERE u.handle = ?1 ORDER BY t.created",
        )?;
        let tokens = stmt
            .query_map(params![user_handle], parse_auth_token)?
            .collect::<rusqlite::Result<Vec<AuthToken>>>()?;
        Ok(tokens)
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let cutoff = system_time_to_column(SystemTime::now())
            - (unused_for_days as i64) * 24 * 60 * 60;
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_token WHERE COALESCE(last_used, created) < ?1",
            params![cutoff],
        )?;
        if deleted > 0 {
            info!("Pruned {} unused auth tokens", deleted);
        }
        Ok(deleted)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let user_id = match self.get_user_id(user_handle)? {
            Some(id) => id,
            None => return Ok(None),
        };
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT user_id, salt, hash, hasher, created, last_tried, last_used \
                 FROM user_password_credentials WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, usize>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()?;

        let username_password = match raw {
            Some((user_id, salt, hash, hasher, created, last_tried, last_used)) => {
                Some(UsernamePasswordCredentials {
                    user_id,
                    salt,
                    hash,
                    hasher: PasswordHasherKind::from_str(&hasher)?,
                    created: system_time_from_column_result(created),
                    last_tried: last_tried.map(system_time_from_column_result),
                    last_used: last_used.map(system_time_from_column_result),
                })
            }
            None => None,
        };

        Ok(Some(UserAuthCredentials {
            user_id,
            username_password,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let user_id = credentials.user_id;
        match credentials.username_password.as_ref() {
            Some(password_credentials) => {
                conn.execute(
                    "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, last_tried, last_used) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(user_id) DO UPDATE SET salt = excluded.salt, hash = excluded.hash, \
                     hasher = excluded.hasher, last_tried = excluded.last_tried, last_used = excluded.last_used",
                    params![
                        user_id,
                        password_credentials.salt,
                        password_credentials.hash,
                        password_credentials.hasher.to_string(),
                        password_credentials.last_tried.map(system_time_to_column),
                        password_credentials.last_used.map(system_time_to_column),
                    ],
                )?;
            }
            None => {
                conn.execute(
                    "DELETE FROM user_password_credentials WHERE user_id = ?1",
                    params![user_id],
                )?;
            }
        }
        Ok(())
    }
}

impl UserFavoritesStore for SqliteUserStore {
    fn add_favorite(&self, user_id: usize, poem_id: i64, verse_id: i64) -> Result<Favorite> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO favorite (user_id, poem_id, verse_id) VALUES (?1, ?2, ?3)",
            params![user_id, poem_id, verse_id],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            "SELECT id, user_id, poem_id, verse_id, created FROM favorite WHERE id = ?1",
            params![id],
            parse_favorite,
        )?)
    }

    fn get_favorite(&self, user_id: usize, favorite_id: usize) -> Result<Option<Favorite>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, user_id, poem_id, verse_id, created FROM favorite \
                 WHERE id = ?1 AND user_id = ?2",
                params![favorite_id, user_id],
                parse_favorite,
            )
            .optional()?)
    }

    fn find_favorite(
        &self,
        user_id: usize,
        poem_id: i64,
        verse_id: i64,
    ) -> Result<Option<Favorite>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, user_id, poem_id, verse_id, created FROM favorite \
                 WHERE user_id = ?1 AND poem_id = ?2 AND verse_id = ?3",
                params![user_id, poem_id, verse_id],
                parse_favorite,
            )
            .optional()?)
    }

    fn list_favorites(&self, user_id: usize, query: &FavoriteQuery) -> Result<Vec<Favorite>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, poem_id, verse_id, created FROM favorite \
             WHERE user_id = ?1 AND (?2 IS NULL OR poem_id = ?2) AND (?3 IS NULL OR verse_id = ?3) \
             ORDER BY created DESC, id DESC",
        )?;
        let favorites = stmt
            .query_map(params![user_id, query.poem, query.verse], parse_favorite)?
            .collect::<rusqlite::Result<Vec<Favorite>>>()?;
        Ok(favorites)
    }

    fn delete_favorite(&self, user_id: usize, favorite_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM favorite WHERE id = ?1 AND user_id = ?2",
            params![favorite_id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

impl UserSettingsStore for SqliteUserStore {
    fn get_user_settings(&self, user_id: usize) -> Result<Option<UserSettings>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM user_settings WHERE user_id = ?1",
                    SETTINGS_COLUMNS
                ),
                params![user_id],
                parse_settings,
            )
            .optional()?)
    }

    fn save_user_settings(&self, settings: &UserSettings) -> Result<UserSettings> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_settings (user_id, view_mode, font_size, show_line_numbers, \
             last_highlight, browse_button_visible, comments_button_visible, copy_button_visible, \
             print_button_visible, home_button_visible, random_button_visible, \
             editor_button_visible, download_button_visible) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
             ON CONFLICT(user_id) DO UPDATE SET view_mode = excluded.view_mode, \
             font_size = excluded.font_size, show_line_numbers = excluded.show_line_numbers, \
             last_highlight = excluded.last_highlight, \
             browse_button_visible = excluded.browse_button_visible, \
             comments_button_visible = excluded.comments_button_visible, \
             copy_button_visible = excluded.copy_button_visible, \
             print_button_visible = excluded.print_button_visible, \
             home_button_visible = excluded.home_button_visible, \
             random_button_visible = excluded.random_button_visible, \
             editor_button_visible = excluded.editor_button_visible, \
             download_button_visible = excluded.download_button_visible",
            params![
                settings.user_id,
                settings.view_mode.as_str(),
                settings.font_size,
                settings.show_line_numbers,
                settings.last_highlight,
                settings.browse_button_visible,
                settings.comments_button_visible,
                settings.copy_button_visible,
                settings.print_button_visible,
                settings.home_button_visible,
                settings.random_button_visible,
                settings.editor_button_visible,
                settings.download_button_visible,
            ],
        )?;
        Ok(conn.query_row(
            &format!(
                "SELECT {} FROM user_settings WHERE user_id = ?1",
                SETTINGS_COLUMNS
            ),
            params![settings.user_id],
            parse_settings,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteUserStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("user.db");
        let store = SqliteUserStore::new(&db_path).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn creates_and_finds_users() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("reader").unwrap();

        assert_eq!(store.get_user_id("reader").unwrap(), Some(user_id));
        assert_eq!(
            store.get_user_handle(user_id).unwrap().as_deref(),
            Some("reader")
        );
        assert_eq!(store.get_user_id("nobody").unwrap(), None);
        assert!(store.create_user("reader").is_err());
    }

    #[test]
    fn roles_resolve_to_deduplicated_permissions() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("editor").unwrap();
        assert!(store.resolve_user_permissions(user_id).unwrap().is_empty());

        store.add_user_role(user_id, UserRole::Regular).unwrap();
        store.add_user_role(user_id, UserRole::Regular).unwrap();
        store.add_user_role(user_id, UserRole::Admin).unwrap();
        assert_eq!(store.get_user_roles(user_id).unwrap().len(), 2);
        assert_eq!(store.resolve_user_permissions(user_id).unwrap().len(), 5);

        store.remove_user_role(user_id, UserRole::Admin).unwrap();
        let permissions = store.resolve_user_permissions(user_id).unwrap();
        assert!(!permissions.contains(&Permission::ServerAdmin));
        assert!(permissions.contains(&Permission::EditArchive));
    }

    #[test]
    fn auth_tokens_lifecycle() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("reader").unwrap();
        let value = AuthTokenValue::generate();
        store
            .add_user_auth_token(AuthToken {
                user_id,
                created: SystemTime::now(),
                last_used: None,
                value: value.clone(),
            })
            .unwrap();

        let token = store.get_user_auth_token(&value).unwrap().unwrap();
        assert_eq!(token.user_id, user_id);
        assert!(token.last_used.is_none());

        store
            .update_user_auth_token_last_used_timestamp(&value)
            .unwrap();
        let token = store.get_user_auth_token(&value).unwrap().unwrap();
        assert!(token.last_used.is_some());
        assert_eq!(store.get_all_user_auth_tokens("reader").unwrap().len(), 1);

        assert!(store.delete_user_auth_token(&value).unwrap().is_some());
        assert!(store.delete_user_auth_token(&value).unwrap().is_none());
        assert!(store.get_user_auth_token(&value).unwrap().is_none());
    }

    #[test]
    fn prunes_stale_tokens_only() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("reader").unwrap();
        let stale = AuthTokenValue::generate();
        let fresh = AuthTokenValue::generate();
        store
            .add_user_auth_token(AuthToken {
                user_id,
                created: SystemTime::now() - Duration::from_secs(40 * 24 * 60 * 60),
                last_used: None,
                value: stale.clone(),
            })
            .unwrap();
        store
            .add_user_auth_token(AuthToken {
                user_id,
                created: SystemTime::now(),
                last_used: None,
                value: fresh.clone(),
            })
            .unwrap();

        assert_eq!(store.prune_unused_auth_tokens(30).unwrap(), 1);
        assert!(store.get_user_auth_token(&stale).unwrap().is_none());
        assert!(store.get_user_auth_token(&fresh).unwrap().is_some());
    }

    #[test]
    fn password_credentials_are_upserted_and_removed() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("reader").unwrap();
        let credentials = store.get_user_auth_credentials("reader").unwrap().unwrap();
        assert!(credentials.username_password.is_none());

        for password in ["first", "second"] {
            let salt = PasswordHasherKind::Argon2.generate_b64_salt().unwrap();
            let hash = PasswordHasherKind::Argon2
                .hash(password.as_bytes(), &salt)
                .unwrap();
            store
                .update_user_auth_credentials(UserAuthCredentials {
                    user_id,
                    username_password: Some(UsernamePasswordCredentials {
                        user_id,
                        salt,
                        hash,
                        hasher: PasswordHasherKind::Argon2,
                        created: SystemTime::now(),
                        last_tried: None,
                        last_used: None,
                    }),
                })
                .unwrap();
        }

        let stored = store
            .get_user_auth_credentials("reader")
            .unwrap()
            .unwrap()
            .username_password
            .unwrap();
        assert!(stored.verify("second").unwrap());
        assert!(!stored.verify("first").unwrap());

        store
            .update_user_auth_credentials(UserAuthCredentials {
                user_id,
                username_password: None,
            })
            .unwrap();
        assert!(store
            .get_user_auth_credentials("reader")
            .unwrap()
            .unwrap()
            .username_password
            .is_none());
        assert!(store.get_user_auth_credentials("nobody").unwrap().is_none());
    }

    #[test]
    fn favorites_are_unique_per_user_and_scoped() {
        let (store, _temp_dir) = create_tmp_store();
        let alice = store.create_user("alice").unwrap();
        let bob = store.create_user("bob").unwrap();

        let favorite = store.add_favorite(alice, 10, 100).unwrap();
        assert_eq!(favorite.user_id, alice);
        assert!(store.add_favorite(alice, 10, 100).is_err());
        store.add_favorite(bob, 10, 100).unwrap();
        store.add_favorite(alice, 11, 110).unwrap();

        assert_eq!(
            store
                .find_favorite(alice, 10, 100)
                .unwrap()
                .map(|f| f.id),
            Some(favorite.id)
        );
        assert!(store.get_favorite(bob, favorite.id).unwrap().is_none());

        let all = store
            .list_favorites(alice, &FavoriteQuery::default())
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].poem_id, 11);

        let filtered = store
            .list_favorites(
                alice,
                &FavoriteQuery {
                    poem: Some(10),
                    verse: None,
                },
            )
            .unwrap();
        assert_eq!(filtered.len(), 1);

        assert!(!store.delete_favorite(bob, favorite.id).unwrap());
        assert!(store.delete_favorite(alice, favorite.id).unwrap());
        assert!(store.find_favorite(alice, 10, 100).unwrap().is_none());
    }

    #[test]
    fn settings_are_inserted_then_replaced() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("reader").unwrap();
        assert!(store.get_user_settings(user_id).unwrap().is_none());

        let mut settings = UserSettings::defaults_for(user_id);
        settings.font_size = 22.5;
        settings.view_mode = ViewMode::Justified;
        let saved = store.save_user_settings(&settings).unwrap();
        assert!(saved.id > 0);
        assert_eq!(saved.font_size, 22.5);

        settings.last_highlight = Some("4:1".to_string());
        settings.print_button_visible = false;
        let updated = store.save_user_settings(&settings).unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.view_mode, ViewMode::Justified);
        assert_eq!(updated.last_highlight.as_deref(), Some("4:1"));
        assert!(!updated.print_button_visible);
    }

    #[test]
    fn deleting_a_user_cascades() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("reader").unwrap();
        store.add_favorite(user_id, 1, 1).unwrap();
        store
            .save_user_settings(&UserSettings::defaults_for(user_id))
            .unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute("DELETE FROM user WHERE id = ?1", params![user_id])
                .unwrap();
        }
        assert!(store.get_user_settings(user_id).unwrap().is_none());
        assert!(store
            .list_favorites(user_id, &FavoriteQuery::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn migrates_v0_database_to_latest() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("user.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            USER_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
            conn.execute("INSERT INTO user (handle) VALUES ('old')", [])
                .unwrap();
        }

        let store = SqliteUserStore::new(&db_path).unwrap();
        let user_id = store.get_user_id("old").unwrap().unwrap();
        store
            .save_user_settings(&UserSettings::defaults_for(user_id))
            .unwrap();

        let conn = store.conn.lock().unwrap();
        USER_VERSIONED_SCHEMAS[1].validate(&conn).unwrap();
    }
}
