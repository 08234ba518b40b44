use super::csv_reader::{CsvRow, CsvTable};
use crate::archive_store::{
    ArchiveTable, Category, Century, Poem, Poet, SqliteArchiveStore, Verse, VersePosition,
};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    /// Categories only.
    pub parents_set: usize,
}

/// Outcome of reading one row.
enum RowOutcome<T> {
    Accept(T),
    /// Already stored or repeated in the file.
    Existing,
    Invalid,
}

/// Loads Ganjoor CSV exports into the archive, one entity kind per file.
pub struct ArchiveImporter<'a> {
    store: &'a SqliteArchiveStore,
    batch_size: usize,
}

impl<'a> ArchiveImporter<'a> {
    pub fn new(store: &'a SqliteArchiveStore, batch_size: usize) -> Self {
        ArchiveImporter {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Reads every row of `table`, writing accepted rows in batches.
    fn run<R: BufRead, T>(
        &self,
        kind: &str,
        mut table: CsvTable<R>,
        mut parse: impl FnMut(&CsvRow) -> RowOutcome<T>,
        write: impl Fn(&[T]) -> Result<usize>,
    ) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut pending = Vec::with_capacity(self.batch_size);

        while let Some(row) = table.next_row() {
            let row = row.with_context(|| format!("Malformed {} file", kind))?;
            match parse(&row) {
                RowOutcome::Accept(item) => pending.push(item),
                RowOutcome::Existing => report.skipped += 1,
                RowOutcome::Invalid => report.skipped += 1,
            }

            if pending.len() >= self.batch_size {
                report.imported += write(&pending)?;
                pending.clear();
                info!("  Imported {} {}...", report.imported, kind);
            }
        }
        if !pending.is_empty() {
            report.imported += write(&pending)?;
        }
        Ok(report)
    }

    /// Columns: Id, Name, Description (optional), Century (optional).
    pub fn import_poets<R: BufRead>(&self, table: CsvTable<R>) -> Result<ImportReport> {
        let mut known = self.store.existing_ids(ArchiveTable::Poets)?;
        self.run(
            "poets",
            table,
            |row| {
                let (Some(id), Some(name)) = (row.get_i64("Id"), row.get("Name")) else {
                    warn!("Skipping invalid poet row on line {}", row.line_number);
                    return RowOutcome::Invalid;
                };
                if known.contains(&id) {
                    return RowOutcome::Existing;
                }
                let century = match row.get("Century").map(Century::from_str) {
                    None => Century::default(),
                    Some(Ok(century)) => century,
                    Some(Err(err)) => {
                        warn!("Skipping poet {}: {}", id, err);
                        return RowOutcome::Invalid;
                    }
                };
                known.insert(id);
                RowOutcome::Accept(Poet {
                    id,
                    name: name.to_string(),
                    description: row.get("Description").unwrap_or_default().to_string(),
                    century,
                    image: None,
                    image_slug: None,
                })
            },
            |batch| self.store.insert_poets_batch(batch),
        )
    }

    /// Columns: Id, PoetId, ParentId (optional), Title, Url (optional).
    ///
    /// Categories are inserted without parents first; parents are linked in a
    /// second pass so a child may precede its parent in the file.
    pub fn import_categories<R: BufRead>(&self, table: CsvTable<R>) -> Result<ImportReport> {
        let poets = self.store.existing_ids(ArchiveTable::Poets)?;
        let mut known = self.store.existing_ids(ArchiveTable::Categories)?;
        let mut links: Vec<(i64, i64)> = Vec::new();

        let mut report = self.run(
            "categories",
            table,
            |row| {
                let (Some(id), Some(poet_id), Some(title)) =
                    (row.get_i64("Id"), row.get_i64("PoetId"), row.get("Title"))
                else {
                    warn!("Skipping invalid category row on line {}", row.line_number);
                    return RowOutcome::Invalid;
                };
                match row.get("ParentId") {
                    None | Some("0") => {}
                    Some(raw) => match raw.parse::<i64>() {
                        Ok(parent_id) => links.push((id, parent_id)),
                        Err(_) => warn!("Could not set parent {} for category {}", raw, id),
                    },
                }
                if known.contains(&id) {
                    return RowOutcome::Existing;
                }
                if !poets.contains(&poet_id) {
                    warn!("Poet {} not found for category {}", poet_id, id);
                    return RowOutcome::Invalid;
                }
                known.insert(id);
                RowOutcome::Accept(Category {
                    id,
                    poet_id,
                    title: title.to_string(),
                    parent_id: None,
                    url: row.get("Url").map(str::to_string),
                })
            },
            |batch| self.store.insert_categories_batch(batch),
        )?;

        info!("  Setting parent relationships...");
        let (valid, missing): (Vec<_>, Vec<_>) = links
            .into_iter()
            .partition(|(id, parent_id)| known.contains(id) && known.contains(parent_id) && id != parent_id);
        for (id, parent_id) in missing {
            warn!("Could not set parent {} for category {}", parent_id, id);
        }
        for chunk in valid.chunks(self.batch_size) {
            report.parents_set += self.store.set_category_parents(chunk)?;
        }
        Ok(report)
    }

    /// Columns: Id, CatId, Title, Url.
    pub fn import_poems<R: BufRead>(&self, table: CsvTable<R>) -> Result<ImportReport> {
        let categories = self.store.existing_ids(ArchiveTable::Categories)?;
        let mut known = self.store.existing_ids(ArchiveTable::Poems)?;
        self.run(
            "poems",
            table,
            |row| {
                let (Some(id), Some(category_id), Some(title)) =
                    (row.get_i64("Id"), row.get_i64("CatId"), row.get("Title"))
                else {
                    warn!("Skipping invalid poem row on line {}", row.line_number);
                    return RowOutcome::Invalid;
                };
                if known.contains(&id) {
                    return RowOutcome::Existing;
                }
                if !categories.contains(&category_id) {
                    warn!("Category {} not found for poem {}", category_id, id);
                    return RowOutcome::Invalid;
                }
                known.insert(id);
                RowOutcome::Accept(Poem {
                    id,
                    category_id,
                    title: title.to_string(),
                    url: row.get("Url").unwrap_or_default().to_string(),
                })
            },
            |batch| self.store.insert_poems_batch(batch),
        )
    }

    /// Columns: Id, PoemId, VOrder, Position (defaults to 0), Text.
    pub fn import_verses<R: BufRead>(&self, table: CsvTable<R>) -> Result<ImportReport> {
        let poems = self.store.existing_ids(ArchiveTable::Poems)?;
        let mut known = self.store.existing_ids(ArchiveTable::Verses)?;
        let mut slots: HashSet<(i64, i64, i64)> = HashSet::new();
        self.run(
            "verses",
            table,
            |row| {
                let (Some(id), Some(poem_id), Some(order), Some(text)) = (
                    row.get_i64("Id"),
                    row.get_i64("PoemId"),
                    row.get_i64("VOrder"),
                    row.get("Text"),
                ) else {
                    warn!("Skipping invalid verse row on line {}", row.line_number);
                    return RowOutcome::Invalid;
                };
                if known.contains(&id) {
                    return RowOutcome::Existing;
                }
                let position = match row.get("Position") {
                    None => VersePosition::default(),
                    Some(raw) => match raw.parse::<i64>().map(VersePosition::from) {
                        Ok(position) if position.is_recognized() => position,
                        _ => {
                            warn!("Skipping verse {} with unknown position {}", id, raw);
                            return RowOutcome::Invalid;
                        }
                    },
                };
                if order < 0 {
                    warn!("Skipping verse {} with negative order {}", id, order);
                    return RowOutcome::Invalid;
                }
                if !poems.contains(&poem_id) {
                    warn!("Poem {} not found for verse {}", poem_id, id);
                    return RowOutcome::Invalid;
                }
                if !slots.insert((poem_id, order, position.code())) {
                    warn!(
                        "Skipping verse {}: poem {} already has order {} at position {}",
                        id,
                        poem_id,
                        order,
                        position.code()
                    );
                    return RowOutcome::Invalid;
                }
                known.insert(id);
                RowOutcome::Accept(Verse {
                    id,
                    poem_id,
                    order,
                    position,
                    text: text.to_string(),
                })
            },
            |batch| self.store.insert_verses_batch(batch),
        )
    }
}

/// Files to import; any subset may be given.
#[derive(Debug, Default, Clone)]
pub struct ImportFiles<P: AsRef<Path>> {
    pub poets: Option<P>,
    pub categories: Option<P>,
    pub poems: Option<P>,
    pub verses: Option<P>,
}

impl<P: AsRef<Path>> ImportFiles<P> {
    pub fn is_empty(&self) -> bool {
        self.poets.is_none()
            && self.categories.is_none()
            && self.poems.is_none()
            && self.verses.is_none()
    }
}

/// Imports the given files in dependency order and logs one summary line per
/// file.
pub fn import_files<P: AsRef<Path>>(
    store: &SqliteArchiveStore,
    files: &ImportFiles<P>,
    batch_size: usize,
) -> Result<()> {
    let importer = ArchiveImporter::new(store, batch_size);

    if let Some(path) = &files.poets {
        info!("Importing poets from {:?}...", path.as_ref());
        let report = importer
            .import_poets(CsvTable::open(path)?)
            .context("Error importing poets")?;
        info!("Imported {} poets ({} skipped)", report.imported, report.skipped);
    }
    if let Some(path) = &files.categories {
        info!("Importing categories from {:?}...", path.as_ref());
        let report = importer
            .import_categories(CsvTable::open(path)?)
            .context("Error importing categories")?;
        info!(
            "Imported {} categories ({} skipped, {} parent relationships set)",
            report.imported, report.skipped, report.parents_set
        );
    }
    if let Some(path) = &files.poems {
        info!("Importing poems from {:?}...", path.as_ref());
        let report = importer
            .import_poems(CsvTable::open(path)?)
            .context("Error importing poems")?;
        info!("Imported {} poems ({} skipped)", report.imported, report.skipped);
    }
    if let Some(path) = &files.verses {
        info!("Importing verses from {:?}...", path.as_ref());
        let report = importer
            .import_verses(CsvTable::open(path)?)
            .context("Error importing verses")?;
        info!("Imported {} verses ({} skipped)", report.imported, report.skipped);
    }
    Ok(())
}
