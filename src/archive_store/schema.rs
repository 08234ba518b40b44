//! SQLite schema definitions for the poetry archive database.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const POET_FK: ForeignKey = ForeignKey {
    foreign_table: "poets",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const CATEGORY_FK: ForeignKey = ForeignKey {
    foreign_table: "categories",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const POEM_FK: ForeignKey = ForeignKey {
    foreign_table: "poems",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const AUDIO_FK: ForeignKey = ForeignKey {
    foreign_table: "poem_audios",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const POETS_TABLE_V_0: Table = Table {
    name: "poets",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "description",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!(
            "century",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'classical'")
        ),
        sqlite_column!("image", &SqlType::Text),
    ],
    indices: &[("idx_poets_name", "name"), ("idx_poets_century", "century")],
    unique_constraints: &[],
};

/// V1 adds the transliterated image slug.
const POETS_TABLE_V_1: Table = Table {
    name: "poets",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "description",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!(
            "century",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'classical'")
        ),
        sqlite_column!("image", &SqlType::Text),
        sqlite_column!("image_slug", &SqlType::Text),
    ],
    indices: &[("idx_poets_name", "name"), ("idx_poets_century", "century")],
    unique_constraints: &[],
};

/// Parent is a nullable self-reference; the schema does not prevent cycles.
const CATEGORIES_TABLE: Table = Table {
    name: "categories",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "poet_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&POET_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "parent_id",
            &SqlType::Integer,
            foreign_key = Some(&CATEGORY_FK)
        ),
        sqlite_column!("url", &SqlType::Text),
    ],
    indices: &[
        ("idx_categories_poet", "poet_id"),
        ("idx_categories_parent", "parent_id"),
        ("idx_categories_title", "title"),
    ],
    unique_constraints: &[],
};

const POEMS_TABLE: Table = Table {
    name: "poems",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "category_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&CATEGORY_FK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "url",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
    ],
    indices: &[
        ("idx_poems_category", "category_id"),
        ("idx_poems_title", "title"),
        ("idx_poems_url", "url"),
    ],
    unique_constraints: &[],
};

const VERSES_TABLE: Table = Table {
    name: "verses",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "poem_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&POEM_FK)
        ),
        sqlite_column!("verse_order", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "position",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("text", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_verses_order", "verse_order")],
    unique_constraints: &[&["poem_id", "verse_order", "position"]],
};

const POEM_AUDIOS_TABLE: Table = Table {
    name: "poem_audios",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "poem_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&POEM_FK)
        ),
        sqlite_column!("file", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("download_url", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_direct",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("sync_guid", &SqlType::Text, non_null = true),
        sqlite_column!("file_checksum", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_uploaded",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_poem_audios_poem", "poem_id"),
        ("idx_poem_audios_sync_guid", "sync_guid"),
    ],
    unique_constraints: &[],
};

const AUDIO_SYNCS_TABLE: Table = Table {
    name: "audio_syncs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "poem_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&POEM_FK)
        ),
        sqlite_column!(
            "audio_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&AUDIO_FK)
        ),
        sqlite_column!("verse_order", &SqlType::Integer, non_null = true),
        sqlite_column!("millisec", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_audio_syncs_poem", "poem_id"),
        ("idx_audio_syncs_audio", "audio_id"),
    ],
    unique_constraints: &[],
};

pub const ARCHIVE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            POETS_TABLE_V_0,
            CATEGORIES_TABLE,
            POEMS_TABLE,
            VERSES_TABLE,
            POEM_AUDIOS_TABLE,
            AUDIO_SYNCS_TABLE,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            POETS_TABLE_V_1,
            CATEGORIES_TABLE,
            POEMS_TABLE,
            VERSES_TABLE,
            POEM_AUDIOS_TABLE,
            AUDIO_SYNCS_TABLE,
        ],
        migration: Some(|conn: &rusqlite::Connection| {
            conn.execute("ALTER TABLE poets ADD COLUMN image_slug TEXT", [])?;
            Ok(())
        }),
    },
];
