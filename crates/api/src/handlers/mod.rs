//! Route handlers, one module per resource.

pub mod articles;
pub mod auth;
pub mod automation;
pub mod categories;
pub mod platforms;
pub mod rules;
pub mod settings;
pub mod tracking;

/// Lower-case, ASCII alphanumerics separated by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_owned()
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  10 Tips: Eat *Better* Today! "), "10-tips-eat-better-today");
        assert_eq!(slugify("Weight Loss"), "weight-loss");
        assert_eq!(slugify("!!!"), "");
    }
}
