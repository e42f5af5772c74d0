//! Queue priority for a newly detected article.

use crate::models::Article;

const FEATURED_BONUS: i32 = 10;
const CORE_CATEGORY_BONUS: i32 = 5;
const LONG_READ_BONUS: i32 = 3;

const CORE_CATEGORIES: [&str; 3] = ["fitness", "nutrition", "health"];
const LONG_READ_WORDS: usize = 1000;

/// Higher runs first. Featured articles, core categories and long reads
/// each add a bonus.
pub fn priority_for(article: &Article) -> i32 {
    let mut priority = 0;

    if article.featured || article.tags.iter().any(|t| t == "featured") {
        priority += FEATURED_BONUS;
    }
    if CORE_CATEGORIES.contains(&article.category.as_str()) {
        priority += CORE_CATEGORY_BONUS;
    }
    if article.word_count() > LONG_READ_WORDS {
        priority += LONG_READ_BONUS;
    }

    priority
}
