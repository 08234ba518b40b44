//! ArchiveStore trait definition.

use super::models::*;
use crate::navigation::CategoryForest;
use anyhow::Result;

/// Trait for archive storage backends.
///
/// Reads return `Ok(None)` for missing rows. Writes validate their input and
/// fail with a [`ValidationError`](super::ValidationError) wrapped in the
/// returned `anyhow::Error` when it is rejected; updates and deletes report
/// whether the target row existed.
pub trait ArchiveStore: Send + Sync {
    // =========================================================================
    // Poets
    // =========================================================================

    fn list_poets(&self, query: &PoetQuery, page: Option<PageRequest>) -> Result<Page<PoetSummary>>;

    fn get_poet(&self, id: i64) -> Result<Option<PoetDetail>>;

    /// Inserts a poet, ignoring `poet.id`. Returns the stored record.
    fn create_poet(&self, poet: Poet) -> Result<Poet>;

    fn update_poet(&self, poet: Poet) -> Result<Option<Poet>>;

    fn delete_poet(&self, id: i64) -> Result<bool>;

    // =========================================================================
    // Categories
    // =========================================================================

    fn list_categories(
        &self,
        query: &CategoryQuery,
        page: Option<PageRequest>,
    ) -> Result<Page<CategorySummary>>;

    fn get_category(&self, id: i64) -> Result<Option<CategoryDetail>>;

    fn create_category(&self, category: Category) -> Result<Category>;

    fn update_category(&self, category: Category) -> Result<Option<Category>>;

    fn delete_category(&self, id: i64) -> Result<bool>;

    /// Loads `id`, its ancestors and every descendant category together with
    /// the poems filed under the subtree.
    fn category_forest(&self, id: i64) -> Result<Option<CategoryForest>>;

    /// Loads `id` and its ancestors only, without poems.
    fn category_lineage(&self, id: i64) -> Result<Option<CategoryForest>>;

    // =========================================================================
    // Poems
    // =========================================================================

    fn list_poems(&self, query: &PoemQuery, page: Option<PageRequest>) -> Result<Page<PoemSummary>>;

    fn get_poem(&self, id: i64) -> Result<Option<PoemDetail>>;

    /// Like `get_poem` without verses and audios.
    fn get_poem_summary(&self, id: i64) -> Result<Option<PoemSummary>>;

    fn create_poem(&self, poem: Poem) -> Result<Poem>;

    fn update_poem(&self, poem: Poem) -> Result<Option<Poem>>;

    fn delete_poem(&self, id: i64) -> Result<bool>;

    /// Distinct poems whose title or any verse contains `query`, ignoring
    /// case, ordered by title and capped at `limit`.
    fn search_poems(&self, query: &str, poet: Option<i64>, limit: usize) -> Result<Vec<PoemSummary>>;

    // =========================================================================
    // Verses
    // =========================================================================

    fn list_verses(&self, query: &VerseQuery, page: Option<PageRequest>) -> Result<Page<VerseView>>;

    fn get_verse(&self, id: i64) -> Result<Option<VerseView>>;

    fn create_verse(&self, verse: Verse) -> Result<Verse>;

    fn update_verse(&self, verse: Verse) -> Result<Option<Verse>>;

    fn delete_verse(&self, id: i64) -> Result<bool>;

    // =========================================================================
    // Audio
    // =========================================================================

    fn list_audios(&self, query: &AudioQuery, page: Option<PageRequest>) -> Result<Page<AudioView>>;

    fn get_audio(&self, id: i64) -> Result<Option<AudioView>>;

    fn create_audio(&self, audio: PoemAudio) -> Result<PoemAudio>;

    fn update_audio(&self, audio: PoemAudio) -> Result<Option<PoemAudio>>;

    fn delete_audio(&self, id: i64) -> Result<bool>;

    fn list_audio_syncs(
        &self,
        query: &AudioSyncQuery,
        page: Option<PageRequest>,
    ) -> Result<Page<AudioSyncView>>;

    fn get_audio_sync(&self, id: i64) -> Result<Option<AudioSyncView>>;

    fn create_audio_sync(&self, sync: AudioSync) -> Result<AudioSync>;

    fn update_audio_sync(&self, sync: AudioSync) -> Result<Option<AudioSync>>;

    fn delete_audio_sync(&self, id: i64) -> Result<bool>;

    // =========================================================================
    // Counts (for metrics)
    // =========================================================================

    fn counts(&self) -> Result<ArchiveCounts>;
}
