//! Test fixture creation for the archive and user databases

use super::constants::*;
use anyhow::Result;
use ganjoor_server::archive_store::{
    ArchiveStore, Category, Century, Poem, PoemAudio, Poet, SqliteArchiveStore, Verse,
    VersePosition,
};
use ganjoor_server::user::{SqliteUserStore, UserManager, UserRole};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn poet(id: i64, name: &str, century: Century) -> Poet {
    Poet {
        id,
        name: name.to_string(),
        description: format!("About {}", name),
        century,
        image: None,
        image_slug: None,
    }
}

fn category(id: i64, poet_id: i64, title: &str, parent_id: Option<i64>) -> Category {
    Category {
        id,
        poet_id,
        title: title.to_string(),
        parent_id,
        url: None,
    }
}

fn poem(id: i64, category_id: i64, title: &str) -> Poem {
    Poem {
        id,
        category_id,
        title: title.to_string(),
        url: format!("/poem-{}", id),
    }
}

fn verse(id: i64, poem_id: i64, order: i64, position: VersePosition, text: &str) -> Verse {
    Verse {
        id,
        poem_id,
        order,
        position,
        text: text.to_string(),
    }
}

/// Fills `archive.db` inside `dir` with 2 poets, 3 categories, 3 poems,
/// 7 verses and one uploaded recitation of poem 1.
pub fn create_test_archive(dir: &Path) -> Result<()> {
    let db_path = dir.join("archive.db");
    let store = SqliteArchiveStore::new(&db_path, 1)?;

    store.insert_poets_batch(&[
        poet(POET_1_ID, POET_1_NAME, Century::Classical),
        poet(POET_2_ID, POET_2_NAME, Century::Modern),
    ])?;
    store.insert_categories_batch(&[
        category(CATEGORY_DIVAN_ID, POET_1_ID, CATEGORY_DIVAN_TITLE, None),
        category(CATEGORY_GHAZALS_ID, POET_1_ID, CATEGORY_GHAZALS_TITLE, None),
        category(CATEGORY_COLLECTION_ID, POET_2_ID, CATEGORY_COLLECTION_TITLE, None),
    ])?;
    store.set_category_parents(&[(CATEGORY_GHAZALS_ID, CATEGORY_DIVAN_ID)])?;
    store.insert_poems_batch(&[
        poem(POEM_1_ID, CATEGORY_GHAZALS_ID, POEM_1_TITLE),
        poem(POEM_2_ID, CATEGORY_GHAZALS_ID, POEM_2_TITLE),
        poem(POEM_3_ID, CATEGORY_COLLECTION_ID, POEM_3_TITLE),
    ])?;
    store.insert_verses_batch(&[
        verse(VERSE_1_ID, POEM_1_ID, 1, VersePosition::Right, "الا یا ایها الساقی ادر کاسا و ناولها"),
        verse(VERSE_2_ID, POEM_1_ID, 1, VersePosition::Left, "که عشق آسان نمود اول ولی افتاد مشکل‌ها"),
        verse(1002, POEM_1_ID, 2, VersePosition::Right, "به بوی نافه‌ای کاخر صبا زان طره بگشاید"),
        verse(1003, POEM_1_ID, 2, VersePosition::Left, "ز تاب جعد مشکینش چه خون افتاد در دل‌ها"),
        verse(VERSE_POEM_2_ID, POEM_2_ID, 1, VersePosition::Right, "صلاح کار کجا و من خراب کجا"),
        verse(1011, POEM_2_ID, 1, VersePosition::Left, "ببین تفاوت ره کز کجاست تا به کجا"),
        verse(VERSE_POEM_3_ID, POEM_3_ID, 1, VersePosition::Single, "در این بن‌بست"),
    ])?;

    let audio = store.create_audio(PoemAudio {
        id: 0,
        poem_id: POEM_1_ID,
        file: "ghazal-1.mp3".to_string(),
        description: Some("Recitation".to_string()),
        download_url: "https://example.com/ghazal-1.mp3".to_string(),
        is_direct: true,
        sync_guid: String::new(),
        file_checksum: String::new(),
        is_uploaded: false,
    })?;
    drop(store);

    // Uploads are never flagged through the store API.
    let conn = Connection::open(&db_path)?;
    conn.execute(
        "UPDATE poem_audios SET is_uploaded = 1 WHERE id = ?1",
        params![audio.id],
    )?;
    Ok(())
}

/// Creates `user.db` inside `dir` with a regular user, an admin and a user
/// holding no role.
pub fn create_test_users(dir: &Path) -> Result<()> {
    let archive: Arc<dyn ArchiveStore> =
        Arc::new(SqliteArchiveStore::new(dir.join("archive.db"), 1)?);
    let user_store = SqliteUserStore::new(dir.join("user.db"))?;
    let user_manager = UserManager::new(archive, Box::new(user_store));

    create_user_with_password_and_role(&user_manager, TEST_USER, TEST_PASS, Some(UserRole::Regular))?;
    create_user_with_password_and_role(&user_manager, ADMIN_USER, ADMIN_PASS, Some(UserRole::Admin))?;
    create_user_with_password_and_role(&user_manager, READER_USER, READER_PASS, None)?;
    Ok(())
}

/// Creates a user with the given credentials and, optionally, a role
pub fn create_user_with_password_and_role(
    user_manager: &UserManager,
    username: &str,
    password: &str,
    role: Option<UserRole>,
) -> Result<usize> {
    let user_id = user_manager.add_user(username)?;
    user_manager.create_password_credentials(username, password)?;
    if let Some(role) = role {
        user_manager.add_user_role(user_id, role)?;
    }
    Ok(user_id)
}

/// Creates a temporary db directory holding both databases.
pub fn create_test_db_dir() -> Result<TempDir> {
    let dir = TempDir::new()?;
    create_test_archive(dir.path())?;
    create_test_users(dir.path())?;
    Ok(dir)
}
