//! Shared constants for end-to-end tests
//!
//! When fixture data changes (user credentials, archive ids, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user handle
pub const TEST_USER: &str = "testuser";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Admin test user handle
pub const ADMIN_USER: &str = "admin";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

/// User with no roles at all
pub const READER_USER: &str = "reader";

/// Password of the role-less user
pub const READER_PASS: &str = "readerpass123";

// ============================================================================
// Test Archive IDs
// ============================================================================

/// Classical poet with a nested category tree
pub const POET_1_ID: i64 = 1;

/// Modern poet with a single category
pub const POET_2_ID: i64 = 2;

/// Top-level category of poet 1
pub const CATEGORY_DIVAN_ID: i64 = 10;

/// Child of the divan, holding the ghazals
pub const CATEGORY_GHAZALS_ID: i64 = 11;

/// Top-level category of poet 2
pub const CATEGORY_COLLECTION_ID: i64 = 20;

/// First ghazal, two couplets and an uploaded recitation
pub const POEM_1_ID: i64 = 100;

/// Second ghazal, one couplet
pub const POEM_2_ID: i64 = 101;

/// Free verse poem of poet 2
pub const POEM_3_ID: i64 = 200;

/// Right hemistich of the first couplet of poem 1
pub const VERSE_1_ID: i64 = 1000;

/// Left hemistich of the first couplet of poem 1
pub const VERSE_2_ID: i64 = 1001;

/// Right hemistich of the first couplet of poem 2
pub const VERSE_POEM_2_ID: i64 = 1010;

/// Single line of poem 3
pub const VERSE_POEM_3_ID: i64 = 2000;

/// Id missing from every archive table
pub const MISSING_ID: i64 = 999_999;

// ============================================================================
// Test Archive Metadata
// ============================================================================

pub const POET_1_NAME: &str = "Hafez";

pub const POET_2_NAME: &str = "Shamlou";

pub const CATEGORY_DIVAN_TITLE: &str = "Divan";

pub const CATEGORY_GHAZALS_TITLE: &str = "Ghazaliyat";

pub const CATEGORY_COLLECTION_TITLE: &str = "Collected Poems";

pub const POEM_1_TITLE: &str = "Ghazal 1";

pub const POEM_2_TITLE: &str = "Ghazal 2";

pub const POEM_3_TITLE: &str = "Morning";

/// Word appearing only in the first verse of poem 1
pub const POEM_1_VERSE_WORD: &str = "ساقی";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Page size configured on test servers
pub const TEST_PAGE_SIZE: usize = 2;

/// Largest page size accepted by test servers
pub const TEST_MAX_PAGE_SIZE: usize = 5;
