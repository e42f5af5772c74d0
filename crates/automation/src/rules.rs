//! Rule matching and platform selection.

use std::collections::BTreeSet;

use publishers::Platform;
use serde::Serialize;

use crate::models::{Article, AutomationRule, NewAutomationRule, RuleConditions, RuleType};

impl AutomationRule {
    /// Whether `article` satisfies this rule.
    ///
    /// The type-specific check runs first, then the common word-count and
    /// image conditions.
    pub fn matches(&self, article: &Article) -> bool {
        let c = &self.conditions;

        let type_check = match self.rule_type {
            RuleType::CategoryBased => match c.categories.as_deref() {
                Some(categories) if !categories.is_empty() => categories.iter().any(|cat| *cat == article.category),
                _ => true,
            },
            RuleType::KeywordBased => match c.keywords.as_deref() {
                Some(keywords) if !keywords.is_empty() => contains_keyword(article, keywords),
                _ => true,
            },
            // Neither has an article-level check yet.
            RuleType::TimeBased | RuleType::EngagementBased => true,
        };

        type_check && common_checks(c, article)
    }
}

fn contains_keyword(article: &Article, keywords: &[String]) -> bool {
    let text = format!("{} {} {}", article.title, article.excerpt, article.content).to_lowercase();
    keywords.iter().any(|k| text.contains(&k.to_lowercase()))
}

fn common_checks(c: &RuleConditions, article: &Article) -> bool {
    let words = article.word_count();
    if c.min_word_count.is_some_and(|min| words < min) {
        return false;
    }
    if c.max_word_count.is_some_and(|max| words > max) {
        return false;
    }
    if c.requires_image == Some(true) && !article.has_image() {
        return false;
    }
    true
}

/// Platforms to queue `article` for.
///
/// The union of every matching rule's platforms, minus those the article was
/// already posted to, restricted to active platforms. Sorted.
pub fn select_platforms(
    rules: &[AutomationRule],
    article: &Article,
    already_posted: &[Platform],
    active: &[Platform],
) -> Vec<Platform> {
    rules
        .iter()
        .filter(|r| r.is_active && r.matches(article))
        .flat_map(|r| r.platforms.iter().copied())
        .filter(|p| !already_posted.contains(p) && active.contains(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Dry-run result for the rule tester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTestResult {
    pub matching_rules: Vec<String>,
    pub platforms: Vec<Platform>,
}

/// Which rules match `article` and what they would select, ignoring
/// posting history and platform activation.
pub fn test_article(rules: &[AutomationRule], article: &Article) -> RuleTestResult {
    let matching: Vec<&AutomationRule> = rules.iter().filter(|r| r.matches(article)).collect();
    let platforms: BTreeSet<Platform> = matching.iter().flat_map(|r| r.platforms.iter().copied()).collect();

    RuleTestResult {
        matching_rules: matching.iter().map(|r| r.name.clone()).collect(),
        platforms: platforms.into_iter().collect(),
    }
}

/// The rule set a fresh installation starts with.
pub fn default_rules() -> Vec<NewAutomationRule> {
    use Platform::*;

    let rule = |name: &str, description: &str, rule_type, conditions, platforms: &[Platform], priority| NewAutomationRule {
        name: name.to_owned(),
        description: Some(description.to_owned()),
        rule_type,
        conditions,
        platforms: platforms.to_vec(),
        is_active: true,
        priority,
    };
    let words = |list: &[&str]| Some(list.iter().map(|s| s.to_string()).collect::<Vec<_>>());

    vec![
        rule(
            "Fitness Articles - All Platforms",
            "Post fitness articles to all major platforms",
            RuleType::CategoryBased,
            RuleConditions {
                categories: words(&["fitness"]),
                min_word_count: Some(500),
                requires_image: Some(true),
                ..Default::default()
            },
            &[Facebook, Twitter, Instagram, Reddit],
            10,
        ),
        rule(
            "Nutrition Content - Health Focused",
            "Share nutrition articles on health-focused platforms",
            RuleType::CategoryBased,
            RuleConditions {
                categories: words(&["nutrition"]),
                min_word_count: Some(400),
                ..Default::default()
            },
            &[Facebook, Reddit],
            8,
        ),
        rule(
            "Workout Keywords - Fitness Platforms",
            "Post articles with workout keywords to fitness communities",
            RuleType::KeywordBased,
            RuleConditions {
                keywords: words(&["workout", "exercise", "training", "gym"]),
                min_word_count: Some(300),
                ..Default::default()
            },
            &[Instagram, Reddit],
            7,
        ),
        rule(
            "High Engagement Content",
            "Repost high-performing content across platforms",
            RuleType::EngagementBased,
            RuleConditions {
                min_engagement: Some(100),
                time_since_last_post: Some(168),
                ..Default::default()
            },
            &[Facebook, Twitter],
            5,
        ),
        rule(
            "Weight Loss Success Stories",
            "Share weight loss content on supportive communities",
            RuleType::KeywordBased,
            RuleConditions {
                keywords: words(&["weight loss", "transformation", "before after"]),
                requires_image: Some(true),
                ..Default::default()
            },
            &[Facebook, Instagram, Reddit],
            9,
        ),
        rule(
            "Quick Tips - Twitter Focus",
            "Short articles perfect for Twitter",
            RuleType::CategoryBased,
            RuleConditions {
                categories: words(&["fitness", "nutrition", "health"]),
                min_word_count: Some(200),
                max_word_count: Some(500),
                ..Default::default()
            },
            &[Twitter],
            6,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn article(category: &str, words: usize, image: bool) -> Article {
        Article {
            id: Uuid::new_v4(),
            title: "Leg day".into(),
            slug: "leg-day".into(),
            category: category.into(),
            content: "word ".repeat(words),
            featured_image: image.then(|| "https://cdn.example.com/a.jpg".to_string()),
            published: true,
            ..Default::default()
        }
    }

    fn rule(rule_type: RuleType, conditions: RuleConditions, platforms: &[Platform]) -> AutomationRule {
        AutomationRule {
            id: Uuid::new_v4(),
            name: format!("{rule_type}"),
            description: None,
            rule_type,
            conditions,
            platforms: platforms.to_vec(),
            is_active: true,
            priority: 0,
        }
    }

    #[test]
    fn category_rule_requires_listed_category() {
        let r = rule(
            RuleType::CategoryBased,
            RuleConditions { categories: Some(vec!["fitness".into()]), ..Default::default() },
            &[Platform::Reddit],
        );
        assert!(r.matches(&article("fitness", 10, false)));
        assert!(!r.matches(&article("style", 10, false)));
    }

    #[test]
    fn empty_category_list_matches_everything() {
        let r = rule(
            RuleType::CategoryBased,
            RuleConditions { categories: Some(vec![]), ..Default::default() },
            &[Platform::Reddit],
        );
        assert!(r.matches(&article("style", 10, false)));
    }

    #[test]
    fn keyword_match_is_case_insensitive_across_fields() {
        let r = rule(
            RuleType::KeywordBased,
            RuleConditions { keywords: Some(vec!["GYM".into()]), ..Default::default() },
            &[Platform::Reddit],
        );
        let mut a = article("fitness", 10, false);
        assert!(!r.matches(&a));
        a.excerpt = "Your first week at the gym".into();
        assert!(r.matches(&a));
    }

    #[test]
    fn word_count_bounds_and_image_requirement_apply_to_every_type() {
        let conditions = RuleConditions {
            min_word_count: Some(200),
            max_word_count: Some(500),
            requires_image: Some(true),
            ..Default::default()
        };
        let r = rule(RuleType::EngagementBased, conditions, &[Platform::Twitter]);

        assert!(r.matches(&article("x", 300, true)));
        assert!(!r.matches(&article("x", 199, true)));
        assert!(!r.matches(&article("x", 501, true)));
        assert!(!r.matches(&article("x", 300, false)));
    }

    #[test]
    fn platform_selection_unions_and_filters() {
        let rules = vec![
            rule(RuleType::CategoryBased, RuleConditions::default(), &[Platform::Twitter, Platform::Reddit]),
            rule(RuleType::TimeBased, RuleConditions::default(), &[Platform::Facebook, Platform::Reddit]),
            rule(
                RuleType::CategoryBased,
                RuleConditions { categories: Some(vec!["style".into()]), ..Default::default() },
                &[Platform::Instagram],
            ),
        ];
        let a = article("fitness", 10, false);

        let selected = select_platforms(
            &rules,
            &a,
            &[Platform::Twitter],
            &[Platform::Reddit, Platform::Facebook, Platform::Twitter, Platform::Instagram],
        );
        assert_eq!(selected, vec![Platform::Reddit, Platform::Facebook]);

        let only_reddit_active = select_platforms(&rules, &a, &[], &[Platform::Reddit]);
        assert_eq!(only_reddit_active, vec![Platform::Reddit]);
    }

    #[test]
    fn default_fitness_rule_targets_all_platforms() {
        let rules: Vec<AutomationRule> = default_rules()
            .into_iter()
            .map(|r| AutomationRule {
                id: Uuid::new_v4(),
                name: r.name,
                description: r.description,
                rule_type: r.rule_type,
                conditions: r.conditions,
                platforms: r.platforms,
                is_active: r.is_active,
                priority: r.priority,
            })
            .collect();
        assert_eq!(rules.len(), 6);

        let result = test_article(&rules, &article("fitness", 600, true));
        assert!(result.matching_rules.contains(&"Fitness Articles - All Platforms".to_string()));
        assert_eq!(result.platforms, Platform::ALL.to_vec());
    }
}
