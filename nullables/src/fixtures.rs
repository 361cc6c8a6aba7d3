//! Sample records for tests.

use award_types::{Category, CategoryId, VoteOption};

/// Panics on zero; fixture ids are literals.
pub fn category_id(id: u64) -> CategoryId {
    CategoryId::new(id).expect("fixture category ids are positive")
}

/// A locked category titled `Award {id}` with nominees `Nominee {id}{letter}`.
pub fn category(id: u64) -> Category {
    let nominees = VoteOption::ALL
        .iter()
        .map(|option| (*option, format!("Nominee {id}{option}")));
    Category::new(category_id(id), format!("Award {id}"), nominees)
        .expect("fixture categories are well-formed")
}
