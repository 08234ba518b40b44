use crate::archive_store::{Verse, VersePosition};
use serde::Serialize;
use std::collections::HashMap;

/// Right and left hemistich of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HemistichPair {
    pub order: i64,
    pub right: String,
    pub left: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerseLayout {
    /// One entry per distinct `order` of Right/Left verses, in first-seen order.
    pub pairs: Vec<HemistichPair>,
    /// Every other verse, unchanged and in input order.
    pub singles: Vec<Verse>,
}

/// Groups a poem's verses into hemistich pairs and standalone lines.
///
/// Expects `verses` sorted by `(order, position)` and does not re-sort them.
/// A pair missing one half keeps an empty string there.
pub fn layout(verses: &[Verse]) -> VerseLayout {
    let mut result = VerseLayout::default();
    let mut slot_by_order: HashMap<i64, usize> = HashMap::new();

    for verse in verses {
        let is_right = match verse.position {
            VersePosition::Right => true,
            VersePosition::Left => false,
            _ => {
                result.singles.push(verse.clone());
                continue;
            }
        };

        let slot = *slot_by_order.entry(verse.order).or_insert_with(|| {
            result.pairs.push(HemistichPair {
                order: verse.order,
                right: String::new(),
                left: String::new(),
            });
            result.pairs.len() - 1
        });
        let pair = &mut result.pairs[slot];
        if is_right {
            pair.right = verse.text.clone();
        } else {
            pair.left = verse.text.clone();
        }
    }
    result
}
