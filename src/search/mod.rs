mod search_vault;

pub use search_vault::*;
