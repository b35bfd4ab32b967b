//! Navigation menu and category tree.

use serde::{Deserialize, Serialize};
use vitrine_core::CategoryId;

/// A navigation entry, possibly with nested entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub children: Vec<MenuItem>,
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: Option<CategoryId>,
}

/// Response of `GET menu`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    #[serde(default)]
    pub items: Vec<MenuItem>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Menu {
    /// Top-level categories (no parent).
    pub fn root_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.parent.is_none())
    }

    /// Direct children of a category.
    pub fn children_of(&self, id: CategoryId) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(move |c| c.parent == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, parent: Option<i64>) -> Category {
        Category {
            id: CategoryId::new(id),
            title: format!("c{id}"),
            slug: String::new(),
            parent: parent.map(CategoryId::new),
        }
    }

    #[test]
    fn test_category_tree_queries() {
        let menu = Menu {
            items: Vec::new(),
            categories: vec![category(1, None), category(2, Some(1)), category(3, Some(1))],
        };
        assert_eq!(menu.root_categories().count(), 1);
        assert_eq!(menu.children_of(CategoryId::new(1)).count(), 2);
        assert_eq!(menu.children_of(CategoryId::new(2)).count(), 0);
    }
}
