use crate::archive_store::{Category, Poem};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// Longest ancestor chain `breadcrumbs` will return.
pub const MAX_BREADCRUMB_DEPTH: usize = 10;

/// Arena of categories keyed by id, with children lists and the poems filed
/// directly under each category.
///
/// Parent links are plain ids; a link to an id missing from the arena is a
/// dangling reference and ends any walk that reaches it.
#[derive(Debug, Clone, Default)]
pub struct CategoryForest {
    categories: HashMap<i64, Category>,
    children: HashMap<i64, Vec<i64>>,
    poems: HashMap<i64, Vec<Poem>>,
}

impl CategoryForest {
    /// Builds the arena. Children and poems keep the order they are given in.
    pub fn new(
        categories: impl IntoIterator<Item = Category>,
        poems: impl IntoIterator<Item = Poem>,
    ) -> Self {
        let mut forest = CategoryForest::default();
        for category in categories {
            if forest.categories.contains_key(&category.id) {
                continue;
            }
            if let Some(parent_id) = category.parent_id {
                forest
                    .children
                    .entry(parent_id)
                    .or_default()
                    .push(category.id);
            }
            forest.categories.insert(category.id, category);
        }
        for poem in poems {
            forest.poems.entry(poem.category_id).or_default().push(poem);
        }
        forest
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.categories.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Ancestor chain of `category`, root first and `category` last.
    ///
    /// Stops at a dangling parent, and after [`MAX_BREADCRUMB_DEPTH`] nodes,
    /// returning whatever was collected up to that point.
    pub fn breadcrumbs<'a>(&'a self, category: Option<&'a Category>) -> Vec<&'a Category> {
        let mut chain = VecDeque::new();
        let mut current = category;
        while let Some(node) = current {
            if chain.len() == MAX_BREADCRUMB_DEPTH {
                warn!(
                    "Breadcrumbs for category {:?} truncated at depth {}",
                    category.map(|c| c.id),
                    MAX_BREADCRUMB_DEPTH
                );
                break;
            }
            chain.push_front(node);
            current = node.parent_id.and_then(|id| self.categories.get(&id));
        }
        chain.into()
    }

    /// Poems filed under `category` and all of its descendants.
    ///
    /// Depth first, each category's own poems before those of its children.
    /// Categories already visited are skipped, so parent cycles terminate.
    pub fn collect_poems(&self, category: &Category) -> Vec<&Poem> {
        let mut collected = Vec::new();
        let mut visited = HashSet::new();
        let mut worklist = vec![category.id];

        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(poems) = self.poems.get(&id) {
                collected.extend(poems.iter());
            }
            if let Some(children) = self.children.get(&id) {
                worklist.extend(children.iter().rev().copied());
            }
        }
        collected
    }
}
