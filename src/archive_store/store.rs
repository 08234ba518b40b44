//! SQLite-backed archive store.
//!
//! One write connection serializes all writes (`BEGIN IMMEDIATE`), while reads
//! rotate over a small pool of read-only connections in WAL mode.

use super::models::*;
use super::schema::ARCHIVE_VERSIONED_SCHEMAS;
use super::trait_def::ArchiveStore;
use super::validation::{self, ValidationError, NON_FIELD_ERRORS};
use crate::navigation::{CategoryForest, MAX_BREADCRUMB_DEPTH};
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Tables that bulk import writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveTable {
    Poets,
    Categories,
    Poems,
    Verses,
}

impl ArchiveTable {
    fn table_name(&self) -> &'static str {
        match self {
            ArchiveTable::Poets => "poets",
            ArchiveTable::Categories => "categories",
            ArchiveTable::Poems => "poems",
            ArchiveTable::Verses => "verses",
        }
    }
}

/// SQLite-backed archive store.
#[derive(Clone)]
pub struct SqliteArchiveStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

/// WHERE clause under construction, with positional parameters.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Filter {
    fn by_id(column: &str, id: i64) -> Self {
        let mut filter = Filter::default();
        filter.push(&format!("{} = ?", column), [Value::from(id)]);
        filter
    }

    fn push<const N: usize>(&mut self, clause: &str, values: [Value; N]) {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
    }

    fn push_opt<T: Into<Value>>(&mut self, clause: &str, value: Option<T>) {
        if let Some(value) = value {
            self.push(clause, [value.into()]);
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn search_term(search: &Option<String>) -> Option<String> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn order_sql(ordering: Option<SortOrder>, default: &str, tie_breaker: &str) -> String {
    match ordering {
        Some(order) => format!("{}, {}", order.to_sql(), tie_breaker),
        None => format!("{}, {}", default, tie_breaker),
    }
}

// Column layouts shared by the SELECT statements below.
const POET_COLUMNS: &str = "p.id, p.name, p.description, p.century, p.image, p.image_slug";
const CATEGORY_COLUMNS: &str = "c.id, c.poet_id, c.title, c.parent_id, c.url";
const POEM_COLUMNS: &str = "pm.id, pm.category_id, pm.title, pm.url";
const VERSE_COLUMNS: &str = "v.id, v.poem_id, v.verse_order, v.position, v.text";
const AUDIO_COLUMNS: &str = "a.id, a.poem_id, a.file, a.description, a.download_url, a.is_direct, a.sync_guid, a.file_checksum, a.is_uploaded";
const SYNC_COLUMNS: &str = "s.id, s.poem_id, s.audio_id, s.verse_order, s.millisec";

const CATEGORY_SUMMARY_FROM: &str = "categories c \
    JOIN poets pt ON pt.id = c.poet_id \
    LEFT JOIN categories par ON par.id = c.parent_id";
const POEM_SUMMARY_FROM: &str = "poems pm \
    JOIN categories c ON c.id = pm.category_id \
    JOIN poets pt ON pt.id = c.poet_id";

const POEM_SEARCH_CLAUSE: &str = "(instr(lower(pm.title), lower(?)) > 0 OR EXISTS \
    (SELECT 1 FROM verses sv WHERE sv.poem_id = pm.id AND instr(lower(sv.text), lower(?)) > 0))";

fn parse_poet(row: &Row) -> rusqlite::Result<Poet> {
    let century: String = row.get(3)?;
    Ok(Poet {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        century: century.parse().unwrap_or_default(),
        image: row.get(4)?,
        image_slug: row.get(5)?,
    })
}

fn parse_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        poet_id: row.get(1)?,
        title: row.get(2)?,
        parent_id: row.get(3)?,
        url: row.get(4)?,
    })
}

fn parse_poem(row: &Row) -> rusqlite::Result<Poem> {
    Ok(Poem {
        id: row.get(0)?,
        category_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
    })
}

fn parse_verse(row: &Row) -> rusqlite::Result<Verse> {
    Ok(Verse {
        id: row.get(0)?,
        poem_id: row.get(1)?,
        order: row.get(2)?,
        position: VersePosition::from(row.get::<_, i64>(3)?),
        text: row.get(4)?,
    })
}

fn parse_audio(row: &Row) -> rusqlite::Result<PoemAudio> {
    Ok(PoemAudio {
        id: row.get(0)?,
        poem_id: row.get(1)?,
        file: row.get(2)?,
        description: row.get(3)?,
        download_url: row.get(4)?,
        is_direct: row.get(5)?,
        sync_guid: row.get(6)?,
        file_checksum: row.get(7)?,
        is_uploaded: row.get(8)?,
    })
}

fn parse_sync(row: &Row) -> rusqlite::Result<AudioSync> {
    Ok(AudioSync {
        id: row.get(0)?,
        poem_id: row.get(1)?,
        audio_id: row.get(2)?,
        verse_order: row.get(3)?,
        millisec: row.get(4)?,
    })
}

fn parse_category_summary(row: &Row) -> rusqlite::Result<CategorySummary> {
    Ok(CategorySummary {
        category: parse_category(row)?,
        poet_name: row.get(5)?,
        parent_title: row.get(6)?,
        poems_count: row.get::<_, i64>(7)? as usize,
    })
}

fn parse_poem_summary(row: &Row) -> rusqlite::Result<PoemSummary> {
    Ok(PoemSummary {
        poem: parse_poem(row)?,
        category_title: row.get(4)?,
        poet_name: row.get(5)?,
        verses_count: row.get::<_, i64>(6)? as usize,
    })
}

fn row_exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let exists = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table),
        params![id],
        |r| r.get(0),
    )?;
    Ok(exists)
}

fn require_reference(conn: &Connection, table: &str, field: &'static str, id: i64) -> Result<()> {
    if !row_exists(conn, table, id)? {
        return Err(ValidationError::missing_reference(field, id).into());
    }
    Ok(())
}

fn fetch_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            &format!("SELECT {} FROM categories c WHERE c.id = ?1", CATEGORY_COLUMNS),
            params![id],
            parse_category,
        )
        .optional()?;
    Ok(category)
}

impl SqliteArchiveStore {
    /// Opens (creating if needed) the archive database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open archive database at {:?}", db_path))?;

        migrate_if_needed(&mut write_conn, ARCHIVE_VERSIONED_SCHEMAS, "archive")?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        let store = SqliteArchiveStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        };

        let counts = store.counts()?;
        info!(
            "Opened archive: {} poets, {} categories, {} poems, {} verses",
            counts.poets, counts.categories, counts.poems, counts.verses
        );
        Ok(store)
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    /// Runs `f` inside an immediate transaction on the write connection.
    fn with_write_tx<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        match f(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Runs a SELECT built from `columns`, `from` and `filter`. With a page,
    /// also counts every matching row; without one the count is the row count.
    fn select_page<T>(
        &self,
        columns: &str,
        from: &str,
        filter: Filter,
        order: &str,
        page: Option<PageRequest>,
        parse: impl Fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Page<T>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let where_sql = filter.where_sql();

        let count = match page {
            Some(_) => {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {} {}", from, where_sql),
                    params_from_iter(filter.values.iter()),
                    |r| r.get(0),
                )?;
                Some(count as usize)
            }
            None => None,
        };

        let mut sql = format!("SELECT {} FROM {} {} ORDER BY {}", columns, from, where_sql, order);
        let mut values = filter.values;
        if let Some(page) = page {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Value::from(page.limit as i64));
            values.push(Value::from(page.offset as i64));
        }
        debug!("Archive query: {}", sql);

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), parse)?
            .collect::<Result<Vec<T>, _>>()?;

        Ok(Page {
            count: count.unwrap_or(items.len()),
            items,
        })
    }

    fn select_one<T>(
        &self,
        columns: &str,
        from: &str,
        filter: Filter,
        parse: impl Fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        let page = self.select_page(columns, from, filter, "1", None, parse)?;
        Ok(page.items.into_iter().next())
    }

    fn poet_summaries(&self, filter: Filter, order: &str, page: Option<PageRequest>) -> Result<Page<PoetSummary>> {
        self.select_page(
            &format!(
                "{}, (SELECT COUNT(*) FROM poems pm JOIN categories c ON c.id = pm.category_id WHERE c.poet_id = p.id)",
                POET_COLUMNS
            ),
            "poets p",
            filter,
            order,
            page,
            |row| {
                Ok(PoetSummary {
                    poet: parse_poet(row)?,
                    poems_count: row.get::<_, i64>(6)? as usize,
                })
            },
        )
    }

    fn category_summaries(
        &self,
        filter: Filter,
        order: &str,
        page: Option<PageRequest>,
    ) -> Result<Page<CategorySummary>> {
        self.select_page(
            &format!(
                "{}, pt.name, par.title, (SELECT COUNT(*) FROM poems pm WHERE pm.category_id = c.id)",
                CATEGORY_COLUMNS
            ),
            CATEGORY_SUMMARY_FROM,
            filter,
            order,
            page,
            parse_category_summary,
        )
    }

    fn poem_summaries(&self, filter: Filter, order: &str, page: Option<PageRequest>) -> Result<Page<PoemSummary>> {
        self.select_page(
            &format!(
                "{}, c.title, pt.name, (SELECT COUNT(*) FROM verses v WHERE v.poem_id = pm.id)",
                POEM_COLUMNS
            ),
            POEM_SUMMARY_FROM,
            filter,
            order,
            page,
            parse_poem_summary,
        )
    }

    fn verse_views(&self, filter: Filter, order: &str, page: Option<PageRequest>) -> Result<Page<VerseView>> {
        self.select_page(VERSE_COLUMNS, "verses v", filter, order, page, |row| {
            parse_verse(row).map(VerseView::from)
        })
    }

    fn audio_views(&self, filter: Filter, page: Option<PageRequest>) -> Result<Page<AudioView>> {
        self.select_page(
            &format!("{}, pm.title", AUDIO_COLUMNS),
            "poem_audios a JOIN poems pm ON pm.id = a.poem_id",
            filter,
            "a.id ASC",
            page,
            |row| {
                Ok(AudioView {
                    audio: parse_audio(row)?,
                    poem_title: row.get(9)?,
                })
            },
        )
    }

    fn sync_views(&self, filter: Filter, order: &str, page: Option<PageRequest>) -> Result<Page<AudioSyncView>> {
        self.select_page(
            &format!(
                "{}, pm.title, (SELECT v.text FROM verses v WHERE v.poem_id = s.poem_id AND v.verse_order = s.verse_order ORDER BY v.position, v.id LIMIT 1)",
                SYNC_COLUMNS
            ),
            "audio_syncs s JOIN poems pm ON pm.id = s.poem_id",
            filter,
            order,
            page,
            |row| {
                Ok(AudioSyncView {
                    sync: parse_sync(row)?,
                    poem_title: row.get(5)?,
                    verse_text: row.get(6)?,
                })
            },
        )
    }

    /// Categories from `id` up through its ancestors, at most
    /// `MAX_BREADCRUMB_DEPTH + 1` of them so truncation stays observable.
    fn load_lineage(conn: &Connection, id: i64) -> Result<Option<Vec<Category>>> {
        let Some(start) = fetch_category(conn, id)? else {
            return Ok(None);
        };
        let mut seen = HashSet::from([start.id]);
        let mut next_parent = start.parent_id;
        let mut lineage = vec![start];
        while let Some(parent_id) = next_parent {
            if lineage.len() > MAX_BREADCRUMB_DEPTH || !seen.insert(parent_id) {
                break;
            }
            match fetch_category(conn, parent_id)? {
                Some(parent) => {
                    next_parent = parent.parent_id;
                    lineage.push(parent);
                }
                None => break,
            }
        }
        Ok(Some(lineage))
    }

    fn verse_position_taken(conn: &Connection, verse: &Verse) -> Result<bool> {
        let taken = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM verses WHERE poem_id = ?1 AND verse_order = ?2 AND position = ?3 AND id != ?4)",
            params![verse.poem_id, verse.order, verse.position.code(), verse.id],
            |r| r.get(0),
        )?;
        Ok(taken)
    }

    fn check_audio_sync_references(conn: &Connection, sync: &AudioSync) -> Result<()> {
        require_reference(conn, "poems", "poem", sync.poem_id)?;
        let audio_poem: Option<i64> = conn
            .query_row(
                "SELECT poem_id FROM poem_audios WHERE id = ?1",
                params![sync.audio_id],
                |r| r.get(0),
            )
            .optional()?;
        match audio_poem {
            None => return Err(ValidationError::missing_reference("audio", sync.audio_id).into()),
            Some(poem_id) if poem_id != sync.poem_id => {
                return Err(ValidationError::invalid(
                    NON_FIELD_ERRORS,
                    "This audio file does not belong to this poem.",
                    "این فایل صوتی متعلق به این شعر نیست.",
                )
                .into())
            }
            Some(_) => {}
        }
        let verse_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM verses WHERE poem_id = ?1 AND verse_order = ?2)",
            params![sync.poem_id, sync.verse_order],
            |r| r.get(0),
        )?;
        if !verse_exists {
            return Err(ValidationError::invalid(
                NON_FIELD_ERRORS,
                "A verse with this order does not exist in this poem.",
                "مصرعی با این ترتیب در این شعر وجود ندارد.",
            )
            .into());
        }
        Ok(())
    }

    fn delete_row(&self, table: &str, id: i64) -> Result<bool> {
        self.with_write_tx(|conn| {
            let deleted = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
            Ok(deleted > 0)
        })
    }

    // =========================================================================
    // Bulk import
    // =========================================================================

    /// Ids currently stored in `table`.
    pub fn existing_ids(&self, table: ArchiveTable) -> Result<HashSet<i64>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT id FROM {}", table.table_name()))?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<HashSet<i64>, _>>()?;
        Ok(ids)
    }

    fn insert_batch<T>(
        &self,
        rows: &[T],
        sql: &str,
        insert: impl Fn(&mut rusqlite::Statement<'_>, &T) -> rusqlite::Result<usize>,
    ) -> Result<usize> {
        self.with_write_tx(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let mut inserted = 0;
            for row in rows {
                inserted += insert(&mut stmt, row)?;
            }
            Ok(inserted)
        })
    }

    /// Inserts poets with their explicit ids in one transaction. Rows whose
    /// id already exists are left untouched. Returns the number inserted.
    pub fn insert_poets_batch(&self, poets: &[Poet]) -> Result<usize> {
        self.insert_batch(
            poets,
            "INSERT OR IGNORE INTO poets (id, name, description, century, image, image_slug) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            |stmt, p| {
                stmt.execute(params![
                    p.id,
                    p.name,
                    p.description,
                    p.century.as_str(),
                    p.image,
                    p.image_slug
                ])
            },
        )
    }

    /// Inserts categories without their parent link, see [`Self::set_category_parents`].
    pub fn insert_categories_batch(&self, categories: &[Category]) -> Result<usize> {
        self.insert_batch(
            categories,
            "INSERT OR IGNORE INTO categories (id, poet_id, title, parent_id, url) VALUES (?1, ?2, ?3, NULL, ?4)",
            |stmt, c| stmt.execute(params![c.id, c.poet_id, c.title, c.url]),
        )
    }

    /// Applies `(category_id, parent_id)` links. Returns how many were set.
    pub fn set_category_parents(&self, links: &[(i64, i64)]) -> Result<usize> {
        self.insert_batch(
            links,
            "UPDATE categories SET parent_id = ?2 WHERE id = ?1",
            |stmt, (id, parent_id)| stmt.execute(params![id, parent_id]),
        )
    }

    pub fn insert_poems_batch(&self, poems: &[Poem]) -> Result<usize> {
        self.insert_batch(
            poems,
            "INSERT OR IGNORE INTO poems (id, category_id, title, url) VALUES (?1, ?2, ?3, ?4)",
            |stmt, p| stmt.execute(params![p.id, p.category_id, p.title, p.url]),
        )
    }

    /// Verses clashing on (poem, order, position) are ignored like duplicate ids.
    pub fn insert_verses_batch(&self, verses: &[Verse]) -> Result<usize> {
        self.insert_batch(
            verses,
            "INSERT OR IGNORE INTO verses (id, poem_id, verse_order, position, text) VALUES (?1, ?2, ?3, ?4, ?5)",
            |stmt, v| stmt.execute(params![v.id, v.poem_id, v.order, v.position.code(), v.text]),
        )
    }
}

impl ArchiveStore for SqliteArchiveStore {
    // =========================================================================
    // Poets
    // =========================================================================

    fn list_poets(&self, query: &PoetQuery, page: Option<PageRequest>) -> Result<Page<PoetSummary>> {
        let mut filter = Filter::default();
        filter.push_opt("p.century = ?", query.century.map(|c| c.as_str().to_string()));
        if let Some(term) = search_term(&query.search) {
            filter.push(
                "(instr(lower(p.name), lower(?)) > 0 OR instr(lower(p.description), lower(?)) > 0)",
                [Value::from(term.clone()), Value::from(term)],
            );
        }
        let order = order_sql(query.ordering, "p.name ASC", "p.id ASC");
        self.poet_summaries(filter, &order, page)
    }

    fn get_poet(&self, id: i64) -> Result<Option<PoetDetail>> {
        let poet = self.select_one(
            &format!(
                "{}, (SELECT COUNT(*) FROM categories c WHERE c.poet_id = p.id), \
                 (SELECT COUNT(*) FROM poems pm JOIN categories c ON c.id = pm.category_id WHERE c.poet_id = p.id)",
                POET_COLUMNS
            ),
            "poets p",
            Filter::by_id("p.id", id),
            |row| {
                let poet = parse_poet(row)?;
                Ok(PoetDetail {
                    century_display: poet.century.display_name(),
                    poet,
                    categories_count: row.get::<_, i64>(6)? as usize,
                    poems_count: row.get::<_, i64>(7)? as usize,
                })
            },
        )?;
        Ok(poet)
    }

    fn create_poet(&self, mut poet: Poet) -> Result<Poet> {
        validation::validate_poet(&mut poet)?;
        self.with_write_tx(|conn| {
            conn.execute(
                "INSERT INTO poets (name, description, century, image, image_slug) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    poet.name,
                    poet.description,
                    poet.century.as_str(),
                    poet.image,
                    poet.image_slug
                ],
            )?;
            poet.id = conn.last_insert_rowid();
            Ok(poet)
        })
    }

    fn update_poet(&self, mut poet: Poet) -> Result<Option<Poet>> {
        validation::validate_poet(&mut poet)?;
        self.with_write_tx(|conn| {
            let updated = conn.execute(
                "UPDATE poets SET name = ?1, description = ?2, century = ?3, image = ?4, image_slug = ?5 WHERE id = ?6",
                params![
                    poet.name,
                    poet.description,
                    poet.century.as_str(),
                    poet.image,
                    poet.image_slug,
                    poet.id
                ],
            )?;
            Ok((updated > 0).then_some(poet))
        })
    }

    fn delete_poet(&self, id: i64) -> Result<bool> {
        self.delete_row("poets", id)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    fn list_categories(
        &self,
        query: &CategoryQuery,
        page: Option<PageRequest>,
    ) -> Result<Page<CategorySummary>> {
        let mut filter = Filter::default();
        filter.push_opt("c.poet_id = ?", query.poet);
        filter.push_opt("c.parent_id = ?", query.parent);
        if query.top_level_only {
            filter.push("c.parent_id IS NULL", []);
        }
        if let Some(term) = search_term(&query.search) {
            filter.push("instr(lower(c.title), lower(?)) > 0", [Value::from(term)]);
        }
        let order = order_sql(query.ordering, "c.title ASC", "c.id ASC");
        self.category_summaries(filter, &order, page)
    }

    fn get_category(&self, id: i64) -> Result<Option<CategoryDetail>> {
        let Some(summary) = self
            .category_summaries(Filter::by_id("c.id", id), "c.id", None)?
            .items
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        let children = self
            .list_categories(
                &CategoryQuery {
                    parent: Some(id),
                    ..Default::default()
                },
                None,
            )?
            .items;

        let breadcrumbs = match self.category_lineage(id)? {
            Some(forest) => forest
                .breadcrumbs(forest.get(id))
                .into_iter()
                .map(Breadcrumb::from)
                .collect(),
            None => Vec::new(),
        };

        Ok(Some(CategoryDetail {
            summary,
            children,
            breadcrumbs,
        }))
    }

    fn create_category(&self, mut category: Category) -> Result<Category> {
        category.id = 0;
        validation::validate_category(&mut category)?;
        self.with_write_tx(|conn| {
            require_reference(conn, "poets", "poet", category.poet_id)?;
            if let Some(parent_id) = category.parent_id {
                require_reference(conn, "categories", "parent", parent_id)?;
            }
            conn.execute(
                "INSERT INTO categories (poet_id, title, parent_id, url) VALUES (?1, ?2, ?3, ?4)",
                params![category.poet_id, category.title, category.parent_id, category.url],
            )?;
            category.id = conn.last_insert_rowid();
            Ok(category)
        })
    }

    fn update_category(&self, mut category: Category) -> Result<Option<Category>> {
        validation::validate_category(&mut category)?;
        self.with_write_tx(|conn| {
            if !row_exists(conn, "categories", category.id)? {
                return Ok(None);
            }
            require_reference(conn, "poets", "poet", category.poet_id)?;
            if let Some(parent_id) = category.parent_id {
                require_reference(conn, "categories", "parent", parent_id)?;
            }
            conn.execute(
                "UPDATE categories SET poet_id = ?1, title = ?2, parent_id = ?3, url = ?4 WHERE id = ?5",
                params![
                    category.poet_id,
                    category.title,
                    category.parent_id,
                    category.url,
                    category.id
                ],
            )?;
            Ok(Some(category))
        })
    }

    fn delete_category(&self, id: i64) -> Result<bool> {
        self.delete_row("categories", id)
    }

    fn category_forest(&self, id: i64) -> Result<Option<CategoryForest>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();

        let Some(mut categories) = Self::load_lineage(&conn, id)? else {
            return Ok(None);
        };

        // UNION (not UNION ALL) drops revisited ids, so parent cycles terminate.
        let subtree_cte = "WITH RECURSIVE subtree(id) AS (\
                SELECT ?1 UNION SELECT c.id FROM categories c JOIN subtree s ON c.parent_id = s.id\
            )";

        let mut stmt = conn.prepare(&format!(
            "{} SELECT {} FROM categories c WHERE c.id IN (SELECT id FROM subtree) ORDER BY c.title, c.id",
            subtree_cte, CATEGORY_COLUMNS
        ))?;
        let descendants = stmt
            .query_map(params![id], parse_category)?
            .collect::<Result<Vec<_>, _>>()?;
        categories.extend(descendants);

        let mut stmt = conn.prepare(&format!(
            "{} SELECT {} FROM poems pm WHERE pm.category_id IN (SELECT id FROM subtree) ORDER BY pm.title, pm.id",
            subtree_cte, POEM_COLUMNS
        ))?;
        let poems = stmt
            .query_map(params![id], parse_poem)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CategoryForest::new(categories, poems)))
    }

    fn category_lineage(&self, id: i64) -> Result<Option<CategoryForest>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let lineage = Self::load_lineage(&conn, id)?;
        Ok(lineage.map(|categories| CategoryForest::new(categories, Vec::new())))
    }

    // =========================================================================
    // Poems
    // =========================================================================

    fn list_poems(&self, query: &PoemQuery, page: Option<PageRequest>) -> Result<Page<PoemSummary>> {
        let mut filter = Filter::default();
        filter.push_opt("pm.category_id = ?", query.category);
        filter.push_opt("c.poet_id = ?", query.poet);
        if let Some(term) = search_term(&query.search) {
            filter.push(POEM_SEARCH_CLAUSE, [Value::from(term.clone()), Value::from(term)]);
        }
        let order = order_sql(query.ordering, "pm.title ASC", "pm.id ASC");
        self.poem_summaries(filter, &order, page)
    }

    fn get_poem(&self, id: i64) -> Result<Option<PoemDetail>> {
        let Some((summary, poet_id)) = self.select_one(
            &format!(
                "{}, c.title, pt.name, (SELECT COUNT(*) FROM verses v WHERE v.poem_id = pm.id), c.poet_id",
                POEM_COLUMNS
            ),
            POEM_SUMMARY_FROM,
            Filter::by_id("pm.id", id),
            |row| Ok((parse_poem_summary(row)?, row.get::<_, i64>(7)?)),
        )?
        else {
            return Ok(None);
        };

        let verses = self
            .verse_views(
                Filter::by_id("v.poem_id", id),
                "v.verse_order ASC, v.position ASC, v.id ASC",
                None,
            )?
            .items;

        let mut audio_filter = Filter::by_id("a.poem_id", id);
        audio_filter.push("a.is_uploaded = 1", []);
        let audios = self.audio_views(audio_filter, None)?.items;

        Ok(Some(PoemDetail {
            summary,
            poet_id,
            verses,
            audios,
        }))
    }

    fn get_poem_summary(&self, id: i64) -> Result<Option<PoemSummary>> {
        let page = self.poem_summaries(Filter::by_id("pm.id", id), "pm.id", None)?;
        Ok(page.items.into_iter().next())
    }

    fn create_poem(&self, mut poem: Poem) -> Result<Poem> {
        validation::validate_poem(&mut poem)?;
        self.with_write_tx(|conn| {
            require_reference(conn, "categories", "category", poem.category_id)?;
            conn.execute(
                "INSERT INTO poems (category_id, title, url) VALUES (?1, ?2, ?3)",
                params![poem.category_id, poem.title, poem.url],
            )?;
            poem.id = conn.last_insert_rowid();
            Ok(poem)
        })
    }

    fn update_poem(&self, mut poem: Poem) -> Result<Option<Poem>> {
        validation::validate_poem(&mut poem)?;
        self.with_write_tx(|conn| {
            if !row_exists(conn, "poems", poem.id)? {
                return Ok(None);
            }
            require_reference(conn, "categories", "category", poem.category_id)?;
            conn.execute(
                "UPDATE poems SET category_id = ?1, title = ?2, url = ?3 WHERE id = ?4",
                params![poem.category_id, poem.title, poem.url, poem.id],
            )?;
            Ok(Some(poem))
        })
    }

    fn delete_poem(&self, id: i64) -> Result<bool> {
        self.delete_row("poems", id)
    }

    fn search_poems(&self, query: &str, poet: Option<i64>, limit: usize) -> Result<Vec<PoemSummary>> {
        let term = query.trim();
        let mut filter = Filter::default();
        filter.push_opt("c.poet_id = ?", poet);
        filter.push(
            POEM_SEARCH_CLAUSE,
            [Value::from(term.to_string()), Value::from(term.to_string())],
        );
        let page = self.poem_summaries(
            filter,
            "pm.title ASC, pm.id ASC",
            Some(PageRequest { offset: 0, limit }),
        )?;
        Ok(page.items)
    }

    // =========================================================================
    // Verses
    // =========================================================================

    fn list_verses(&self, query: &VerseQuery, page: Option<PageRequest>) -> Result<Page<VerseView>> {
        let mut filter = Filter::default();
        filter.push_opt("v.poem_id = ?", query.poem);
        filter.push_opt("v.position = ?", query.position.map(|p| p.code()));
        if let Some(term) = search_term(&query.search) {
            filter.push("instr(lower(v.text), lower(?)) > 0", [Value::from(term)]);
        }
        let order = order_sql(query.ordering, "v.verse_order ASC", "v.position ASC, v.id ASC");
        self.verse_views(filter, &order, page)
    }

    fn get_verse(&self, id: i64) -> Result<Option<VerseView>> {
        let page = self.verse_views(Filter::by_id("v.id", id), "v.id", None)?;
        Ok(page.items.into_iter().next())
    }

    fn create_verse(&self, mut verse: Verse) -> Result<Verse> {
        verse.id = 0;
        validation::validate_verse(&mut verse)?;
        self.with_write_tx(|conn| {
            require_reference(conn, "poems", "poem", verse.poem_id)?;
            if Self::verse_position_taken(conn, &verse)? {
                return Err(ValidationError::invalid(
                    NON_FIELD_ERRORS,
                    "A verse with this order and position already exists in this poem.",
                    "مصرعی با این ترتیب و موقعیت در این شعر وجود دارد.",
                )
                .into());
            }
            conn.execute(
                "INSERT INTO verses (poem_id, verse_order, position, text) VALUES (?1, ?2, ?3, ?4)",
                params![verse.poem_id, verse.order, verse.position.code(), verse.text],
            )?;
            verse.id = conn.last_insert_rowid();
            Ok(verse)
        })
    }

    fn update_verse(&self, mut verse: Verse) -> Result<Option<Verse>> {
        validation::validate_verse(&mut verse)?;
        self.with_write_tx(|conn| {
            if !row_exists(conn, "verses", verse.id)? {
                return Ok(None);
            }
            require_reference(conn, "poems", "poem", verse.poem_id)?;
            if Self::verse_position_taken(conn, &verse)? {
                return Err(ValidationError::invalid(
                    NON_FIELD_ERRORS,
                    "A verse with this order and position already exists in this poem.",
                    "مصرعی با این ترتیب و موقعیت در این شعر وجود دارد.",
                )
                .into());
            }
            conn.execute(
                "UPDATE verses SET poem_id = ?1, verse_order = ?2, position = ?3, text = ?4 WHERE id = ?5",
                params![
                    verse.poem_id,
                    verse.order,
                    verse.position.code(),
                    verse.text,
                    verse.id
                ],
            )?;
            Ok(Some(verse))
        })
    }

    fn delete_verse(&self, id: i64) -> Result<bool> {
        self.delete_row("verses", id)
    }

    // =========================================================================
    // Audio
    // =========================================================================

    fn list_audios(&self, query: &AudioQuery, page: Option<PageRequest>) -> Result<Page<AudioView>> {
        let mut filter = Filter::default();
        filter.push_opt("a.poem_id = ?", query.poem);
        filter.push_opt("a.is_uploaded = ?", query.is_uploaded);
        filter.push_opt("a.is_direct = ?", query.is_direct);
        self.audio_views(filter, page)
    }

    fn get_audio(&self, id: i64) -> Result<Option<AudioView>> {
        let page = self.audio_views(Filter::by_id("a.id", id), None)?;
        Ok(page.items.into_iter().next())
    }

    fn create_audio(&self, mut audio: PoemAudio) -> Result<PoemAudio> {
        validation::validate_audio(&mut audio)?;
        audio.is_uploaded = false;
        self.with_write_tx(|conn| {
            require_reference(conn, "poems", "poem", audio.poem_id)?;
            conn.execute(
                "INSERT INTO poem_audios (poem_id, file, description, download_url, is_direct, sync_guid, file_checksum, is_uploaded) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    audio.poem_id,
                    audio.file,
                    audio.description,
                    audio.download_url,
                    audio.is_direct,
                    audio.sync_guid,
                    audio.file_checksum,
                    audio.is_uploaded
                ],
            )?;
            audio.id = conn.last_insert_rowid();
            Ok(audio)
        })
    }

    fn update_audio(&self, mut audio: PoemAudio) -> Result<Option<PoemAudio>> {
        validation::validate_audio(&mut audio)?;
        self.with_write_tx(|conn| {
            let stored_upload_flag: Option<bool> = conn
                .query_row(
                    "SELECT is_uploaded FROM poem_audios WHERE id = ?1",
                    params![audio.id],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(is_uploaded) = stored_upload_flag else {
                return Ok(None);
            };
            audio.is_uploaded = is_uploaded;
            require_reference(conn, "poems", "poem", audio.poem_id)?;
            conn.execute(
                "UPDATE poem_audios SET poem_id = ?1, file = ?2, description = ?3, download_url = ?4, \
                 is_direct = ?5, sync_guid = ?6, file_checksum = ?7 WHERE id = ?8",
                params![
                    audio.poem_id,
                    audio.file,
                    audio.description,
                    audio.download_url,
                    audio.is_direct,
                    audio.sync_guid,
                    audio.file_checksum,
                    audio.id
                ],
            )?;
            Ok(Some(audio))
        })
    }

    fn delete_audio(&self, id: i64) -> Result<bool> {
        self.delete_row("poem_audios", id)
    }

    fn list_audio_syncs(
        &self,
        query: &AudioSyncQuery,
        page: Option<PageRequest>,
    ) -> Result<Page<AudioSyncView>> {
        let mut filter = Filter::default();
        filter.push_opt("s.poem_id = ?", query.poem);
        filter.push_opt("s.audio_id = ?", query.audio);
        let order = order_sql(query.ordering, "s.verse_order ASC", "s.id ASC");
        self.sync_views(filter, &order, page)
    }

    fn get_audio_sync(&self, id: i64) -> Result<Option<AudioSyncView>> {
        let page = self.sync_views(Filter::by_id("s.id", id), "s.id", None)?;
        Ok(page.items.into_iter().next())
    }

    fn create_audio_sync(&self, mut sync: AudioSync) -> Result<AudioSync> {
        validation::validate_audio_sync(&sync)?;
        self.with_write_tx(|conn| {
            Self::check_audio_sync_references(conn, &sync)?;
            conn.execute(
                "INSERT INTO audio_syncs (poem_id, audio_id, verse_order, millisec) VALUES (?1, ?2, ?3, ?4)",
                params![sync.poem_id, sync.audio_id, sync.verse_order, sync.millisec],
            )?;
            sync.id = conn.last_insert_rowid();
            Ok(sync)
        })
    }

    fn update_audio_sync(&self, sync: AudioSync) -> Result<Option<AudioSync>> {
        validation::validate_audio_sync(&sync)?;
        self.with_write_tx(|conn| {
            if !row_exists(conn, "audio_syncs", sync.id)? {
                return Ok(None);
            }
            Self::check_audio_sync_references(conn, &sync)?;
            conn.execute(
                "UPDATE audio_syncs SET poem_id = ?1, audio_id = ?2, verse_order = ?3, millisec = ?4 WHERE id = ?5",
                params![sync.poem_id, sync.audio_id, sync.verse_order, sync.millisec, sync.id],
            )?;
            Ok(Some(sync))
        })
    }

    fn delete_audio_sync(&self, id: i64) -> Result<bool> {
        self.delete_row("audio_syncs", id)
    }

    fn counts(&self) -> Result<ArchiveCounts> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(ArchiveCounts {
            poets: count("poets")?,
            categories: count("categories")?,
            poems: count("poems")?,
            verses: count("verses")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteArchiveStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteArchiveStore::new(temp_dir.path().join("archive.db"), 2).unwrap();
        (temp_dir, store)
    }

    fn poet(name: &str, century: Century) -> Poet {
        Poet {
            id: 0,
            name: name.to_string(),
            description: String::new(),
            century,
            image: None,
            image_slug: None,
        }
    }

    fn category(poet_id: i64, title: &str, parent_id: Option<i64>) -> Category {
        Category {
            id: 0,
            poet_id,
            title: title.to_string(),
            parent_id,
            url: None,
        }
    }

    fn poem(category_id: i64, title: &str) -> Poem {
        Poem {
            id: 0,
            category_id,
            title: title.to_string(),
            url: String::new(),
        }
    }

    fn verse(poem_id: i64, order: i64, position: VersePosition, text: &str) -> Verse {
        Verse {
            id: 0,
            poem_id,
            order,
            position,
            text: text.to_string(),
        }
    }

    fn validation_error(err: &anyhow::Error) -> &ValidationError {
        err.downcast_ref::<ValidationError>()
            .expect("expected a validation error")
    }

    #[test]
    fn poet_crud_round() {
        let (_dir, store) = open_store();
        let created = store.create_poet(poet("  حافظ ", Century::Classical)).unwrap();
        assert!(created.id > 0);
        assert_eq!(created.name, "حافظ");

        let mut renamed = created.clone();
        renamed.century = Century::Ancient;
        store.update_poet(renamed).unwrap().unwrap();

        let detail = store.get_poet(created.id).unwrap().unwrap();
        assert_eq!(detail.poet.century, Century::Ancient);
        assert_eq!(detail.century_display, "باستانی");

        assert!(store.delete_poet(created.id).unwrap());
        assert!(store.get_poet(created.id).unwrap().is_none());
        assert!(!store.delete_poet(created.id).unwrap());
    }

    #[test]
    fn update_of_missing_row_returns_none() {
        let (_dir, store) = open_store();
        let mut ghost = poet("x", Century::Modern);
        ghost.id = 404;
        assert!(store.update_poet(ghost).unwrap().is_none());
    }

    #[test]
    fn poet_list_filters_and_counts() {
        let (_dir, store) = open_store();
        let hafez = store.create_poet(poet("حافظ", Century::Classical)).unwrap();
        store.create_poet(poet("نیما", Century::Modern)).unwrap();
        let divan = store.create_category(category(hafez.id, "دیوان", None)).unwrap();
        store.create_poem(poem(divan.id, "غزل ۱")).unwrap();

        let classical = store
            .list_poets(
                &PoetQuery {
                    century: Some(Century::Classical),
                    ..Default::default()
                },
                Some(PageRequest { offset: 0, limit: 10 }),
            )
            .unwrap();
        assert_eq!(classical.count, 1);
        assert_eq!(classical.items[0].poems_count, 1);

        let searched = store
            .list_poets(
                &PoetQuery {
                    search: Some("نیم".to_string()),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(searched.items.len(), 1);
        assert_eq!(searched.items[0].poet.name, "نیما");
    }

    #[test]
    fn pagination_reports_total_count() {
        let (_dir, store) = open_store();
        for name in ["a", "b", "c", "d", "e"] {
            store.create_poet(poet(name, Century::Classical)).unwrap();
        }
        let page = store
            .list_poets(&PoetQuery::default(), Some(PageRequest { offset: 2, limit: 2 }))
            .unwrap();
        assert_eq!(page.count, 5);
        let names: Vec<&str> = page.items.iter().map(|p| p.poet.name.as_str()).collect();
        assert_eq!(names, vec!["c", "d"]);
    }

    #[test]
    fn category_requires_existing_poet() {
        let (_dir, store) = open_store();
        let err = store.create_category(category(77, "x", None)).unwrap_err();
        assert_eq!(validation_error(&err).field(), "poet");
    }

    #[test]
    fn category_detail_has_children_and_breadcrumbs() {
        let (_dir, store) = open_store();
        let p = store.create_poet(poet("مولوی", Century::Classical)).unwrap();
        let root = store.create_category(category(p.id, "مثنوی", None)).unwrap();
        let mid = store.create_category(category(p.id, "دفتر اول", Some(root.id))).unwrap();
        let leaf = store.create_category(category(p.id, "بخش ۱", Some(mid.id))).unwrap();

        let detail = store.get_category(mid.id).unwrap().unwrap();
        assert_eq!(detail.children.len(), 1);
        assert_eq!(detail.children[0].category.id, leaf.id);
        assert_eq!(detail.summary.parent_title.as_deref(), Some("مثنوی"));
        let crumbs: Vec<i64> = detail.breadcrumbs.iter().map(|b| b.id).collect();
        assert_eq!(crumbs, vec![root.id, mid.id]);
    }

    #[test]
    fn deleting_poet_cascades() {
        let (_dir, store) = open_store();
        let p = store.create_poet(poet("سعدی", Century::Classical)).unwrap();
        let c = store.create_category(category(p.id, "گلستان", None)).unwrap();
        let pm = store.create_poem(poem(c.id, "دیباچه")).unwrap();
        store
            .create_verse(verse(pm.id, 1, VersePosition::Paragraph, "منت خدای را"))
            .unwrap();

        store.delete_poet(p.id).unwrap();

        assert!(store.get_category(c.id).unwrap().is_none());
        assert!(store.get_poem(pm.id).unwrap().is_none());
        assert_eq!(store.counts().unwrap(), ArchiveCounts::default());
    }

    #[test]
    fn forest_collects_subtree_poems() {
        let (_dir, store) = open_store();
        let p = store.create_poet(poet("عطار", Century::Classical)).unwrap();
        let root = store.create_category(category(p.id, "آثار", None)).unwrap();
        let child = store.create_category(category(p.id, "منطق الطیر", Some(root.id))).unwrap();
        store.create_poem(poem(root.id, "الف")).unwrap();
        store.create_poem(poem(root.id, "ب")).unwrap();
        for title in ["ج", "د", "ه"] {
            store.create_poem(poem(child.id, title)).unwrap();
        }

        let forest = store.category_forest(root.id).unwrap().unwrap();
        let titles: Vec<&str> = forest
            .collect_poems(forest.get(root.id).unwrap())
            .iter()
            .map(|p| p.title.as_str())
            .collect();

        assert_eq!(titles, vec!["الف", "ب", "ج", "د", "ه"]);
        assert!(store.category_forest(9999).unwrap().is_none());
    }

    #[test]
    fn poem_detail_orders_verses_and_hides_pending_audio() {
        let (_dir, store) = open_store();
        let p = store.create_poet(poet("حافظ", Century::Classical)).unwrap();
        let c = store.create_category(category(p.id, "غزلیات", None)).unwrap();
        let pm = store.create_poem(poem(c.id, "غزل ۱")).unwrap();
        store.create_verse(verse(pm.id, 2, VersePosition::Right, "r2")).unwrap();
        store.create_verse(verse(pm.id, 1, VersePosition::Left, "l1")).unwrap();
        store.create_verse(verse(pm.id, 1, VersePosition::Right, "r1")).unwrap();
        store
            .create_audio(PoemAudio {
                id: 0,
                poem_id: pm.id,
                file: "a.mp3".to_string(),
                description: None,
                download_url: "https://example.com/a.mp3".to_string(),
                is_direct: true,
                sync_guid: "g".to_string(),
                file_checksum: "c".to_string(),
                is_uploaded: true,
            })
            .unwrap();

        let detail = store.get_poem(pm.id).unwrap().unwrap();
        let texts: Vec<&str> = detail.verses.iter().map(|v| v.verse.text.as_str()).collect();
        assert_eq!(texts, vec!["r1", "l1", "r2"]);
        assert_eq!(detail.poet_id, p.id);
        assert_eq!(detail.summary.verses_count, 3);
        // is_uploaded is read-only, so the new audio is not listed yet
        assert!(detail.audios.is_empty());
    }

    #[test]
    fn duplicate_verse_slot_is_rejected() {
        let (_dir, store) = open_store();
        let p = store.create_poet(poet("حافظ", Century::Classical)).unwrap();
        let c = store.create_category(category(p.id, "غزلیات", None)).unwrap();
        let pm = store.create_poem(poem(c.id, "غزل ۱")).unwrap();
        store.create_verse(verse(pm.id, 1, VersePosition::Right, "a")).unwrap();

        let err = store
            .create_verse(verse(pm.id, 1, VersePosition::Right, "b"))
            .unwrap_err();
        assert_eq!(validation_error(&err).field(), NON_FIELD_ERRORS);
    }

    #[test]
    fn audio_sync_checks_verse_and_audio_ownership() {
        let (_dir, store) = open_store();
        let p = store.create_poet(poet("حافظ", Century::Classical)).unwrap();
        let c = store.create_category(category(p.id, "غزلیات", None)).unwrap();
        let first = store.create_poem(poem(c.id, "یک")).unwrap();
        let second = store.create_poem(poem(c.id, "دو")).unwrap();
        store.create_verse(verse(first.id, 1, VersePosition::Right, "مصرع")).unwrap();
        let audio = store
            .create_audio(PoemAudio {
                id: 0,
                poem_id: first.id,
                file: "a.mp3".to_string(),
                description: None,
                download_url: "http://example.com/a.mp3".to_string(),
                is_direct: false,
                sync_guid: String::new(),
                file_checksum: String::new(),
                is_uploaded: false,
            })
            .unwrap();

        let sync = AudioSync {
            id: 0,
            poem_id: first.id,
            audio_id: audio.id,
            verse_order: 1,
            millisec: 1500,
        };
        let created = store.create_audio_sync(sync.clone()).unwrap();
        let view = store.get_audio_sync(created.id).unwrap().unwrap();
        assert_eq!(view.verse_text.as_deref(), Some("مصرع"));

        let wrong_poem = AudioSync {
            poem_id: second.id,
            ..sync.clone()
        };
        assert!(store.create_audio_sync(wrong_poem).is_err());

        let missing_verse = AudioSync {
            verse_order: 9,
            ..sync
        };
        assert!(store.create_audio_sync(missing_verse).is_err());
    }

    #[test]
    fn search_matches_titles_and_verses_once() {
        let (_dir, store) = open_store();
        let p = store.create_poet(poet("حافظ", Century::Classical)).unwrap();
        let c = store.create_category(category(p.id, "غزلیات", None)).unwrap();
        let by_title = store.create_poem(poem(c.id, "Morning Wind")).unwrap();
        let by_verse = store.create_poem(poem(c.id, "Another")).unwrap();
        store
            .create_verse(verse(by_verse.id, 1, VersePosition::Right, "the wind blows"))
            .unwrap();
        store
            .create_verse(verse(by_verse.id, 1, VersePosition::Left, "WIND again"))
            .unwrap();

        let found = store.search_poems("wind", None, 100).unwrap();
        let ids: Vec<i64> = found.iter().map(|p| p.poem.id).collect();
        assert_eq!(ids, vec![by_verse.id, by_title.id]);

        assert_eq!(store.search_poems("wind", Some(p.id + 1), 100).unwrap().len(), 0);
        assert_eq!(store.search_poems("wind", None, 1).unwrap().len(), 1);
    }

    #[test]
    fn batch_import_skips_existing_ids() {
        let (_dir, store) = open_store();
        let mut first = poet("رودکی", Century::Ancient);
        first.id = 10;
        assert_eq!(store.insert_poets_batch(&[first.clone()]).unwrap(), 1);
        assert_eq!(store.insert_poets_batch(&[first]).unwrap(), 0);

        let mut parent = category(10, "parent", None);
        parent.id = 1;
        let mut child = category(10, "child", None);
        child.id = 2;
        assert_eq!(store.insert_categories_batch(&[parent, child]).unwrap(), 2);
        assert_eq!(store.set_category_parents(&[(2, 1)]).unwrap(), 1);

        let detail = store.get_category(2).unwrap().unwrap();
        assert_eq!(detail.summary.category.parent_id, Some(1));
        assert_eq!(
            store.existing_ids(ArchiveTable::Categories).unwrap(),
            HashSet::from([1, 2])
        );
    }

    #[tokio::test]
    async fn concurrent_reads_do_not_block() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteArchiveStore::new(temp_dir.path().join("archive.db"), 4).unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                tokio::spawn({
                    let store = store.clone();
                    async move {
                        for _ in 0..50 {
                            let _ = store.counts();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
