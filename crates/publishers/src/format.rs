//! Platform-specific content formatting.
//!
//! Each platform gets its own shape: Facebook a hook plus excerpt and
//! hashtags, Reddit a plain title, Twitter a 280-character tweet and
//! Instagram a long caption with a hashtag block. Hook and hashtag choice is
//! random; the caller supplies the RNG so tests can seed it.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{Platform, PostSource, SocialContent};

/// Twitter wraps every URL to a fixed-length t.co link.
pub const TWITTER_LINK_LENGTH: usize = 23;
pub const TWITTER_MAX_CHARS: usize = 280;
pub const REDDIT_MAX_TITLE: usize = 300;
pub const INSTAGRAM_MAX_CAPTION: usize = 2200;
pub const INSTAGRAM_MAX_HASHTAGS: usize = 30;
pub const FACEBOOK_MAX_CHARS: usize = 63206;

const FACEBOOK_TAGS: &[&str] = &[
    "#MensHealth", "#FitnessMotivation", "#HealthyLiving", "#WorkoutTips", "#Nutrition",
];
const TWITTER_TAGS: &[&str] = &["#MensHealth", "#Fitness", "#Health"];
const INSTAGRAM_TAGS: &[&str] = &[
    "#MensHealth", "#FitnessMotivation", "#GymLife", "#HealthyLifestyle",
    "#WorkoutMotivation", "#FitnessTips", "#NutritionTips", "#MensFitness",
    "#HealthyLiving", "#FitnessJourney", "#GymMotivation", "#FitLife",
    "#TrainHard", "#HealthyChoices", "#FitnessGoals", "#StayFit",
];

/// Formats articles into [`SocialContent`] for each platform.
#[derive(Debug, Clone)]
pub struct ContentFormatter {
    base_url: String,
    site_name: String,
}

impl ContentFormatter {
    pub fn new(base_url: impl Into<String>, site_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            site_name: site_name.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn format<R: Rng + ?Sized>(&self, source: &PostSource, platform: Platform, rng: &mut R) -> SocialContent {
        match platform {
            Platform::Facebook  => self.format_facebook(source, rng),
            Platform::Reddit    => self.format_reddit(source, rng),
            Platform::Twitter   => self.format_twitter(source, rng),
            Platform::Instagram => self.format_instagram(source, rng),
        }
    }

    /// Direct article link carrying a UTM source for `platform`.
    pub fn tracking_link(&self, slug: &str, platform: Platform) -> String {
        format!(
            "{}/articles/{slug}?utm_source={platform}&utm_medium=social&utm_campaign=auto",
            self.base_url
        )
    }

    fn format_facebook<R: Rng + ?Sized>(&self, source: &PostSource, rng: &mut R) -> SocialContent {
        let title = clean_title(&source.title);
        let excerpt = clean_excerpt(&source.excerpt, 200);
        let link = self.tracking_link(&source.slug, Platform::Facebook);

        let hooks = [
            format!("💪 {title}"),
            format!("Did you know? {excerpt}"),
            format!("New on {}: {title}", self.site_name),
            format!("Transform your {} game! {title}", source.category),
            format!("🎯 {title}\n\n{excerpt}"),
        ];
        let hook = pick(&hooks, rng);
        let hashtags = hashtags_for(source, 5, Platform::Facebook, rng);

        SocialContent {
            text: format!("{hook}\n\nRead more: {link}\n\n{}", hashtags.join(" ")),
            hashtags,
            media_url: source.featured_image.clone().filter(|s| !s.is_empty()),
            link,
        }
    }

    /// Reddit wants a natural title: no emoji, no hashtags, no media.
    fn format_reddit<R: Rng + ?Sized>(&self, source: &PostSource, rng: &mut R) -> SocialContent {
        let title = clean_title(&source.title);
        let link = self.tracking_link(&source.slug, Platform::Reddit);

        let templates = match source.category.to_lowercase().as_str() {
            "nutrition" => vec![
                format!("{title} - Evidence-based nutrition for men"),
                format!("[Nutrition Guide] {title}"),
                format!("{title} - Practical meal planning tips"),
                format!("Science says: {title}"),
            ],
            "health" => vec![
                format!("{title} - Comprehensive guide"),
                format!("[Men's Health] {title}"),
                format!("{title} - Expert advice and tips"),
                format!("Guide: {title}"),
            ],
            _ => vec![
                format!("{title} - Science-backed guide for men"),
                format!("[Article] {title}"),
                format!("New guide: {title} (with research citations)"),
                format!("{title} - What actually works"),
            ],
        };

        SocialContent {
            text: truncate_with_ellipsis(&pick(&templates, rng), REDDIT_MAX_TITLE),
            hashtags: Vec::new(),
            media_url: None,
            link,
        }
    }

    fn format_twitter<R: Rng + ?Sized>(&self, source: &PostSource, rng: &mut R) -> SocialContent {
        let title = truncate_with_ellipsis(&clean_title(&source.title), 100);
        let link = self.tracking_link(&source.slug, Platform::Twitter);
        let hashtags = hashtags_for(source, 3, Platform::Twitter, rng);
        let tag_line = hashtags.join(" ");

        let available = TWITTER_MAX_CHARS
            .saturating_sub(TWITTER_LINK_LENGTH)
            .saturating_sub(tag_line.chars().count())
            .saturating_sub(4);

        let hooks = [
            format!("💪 {title}"),
            format!("New: {title}"),
            format!("{} {title}", category_emoji(&source.category)),
            format!("Just published: {title}"),
            format!("{title} 🔥"),
        ];
        let text = truncate_with_ellipsis(&pick(&hooks, rng), available);

        SocialContent {
            text: format!("{text}\n\n{link}\n\n{tag_line}"),
            hashtags,
            media_url: source.featured_image.clone().filter(|s| !s.is_empty()),
            link,
        }
    }

    fn format_instagram<R: Rng + ?Sized>(&self, source: &PostSource, rng: &mut R) -> SocialContent {
        let title = clean_title(&source.title);
        let excerpt = clean_excerpt(&source.excerpt, 150);
        let link = self.tracking_link(&source.slug, Platform::Instagram);
        let hashtags = hashtags_for(source, 20, Platform::Instagram, rng);
        let emoji = category_emoji(&source.category);

        let templates = [
            format!("{emoji} {title}\n\n{excerpt}\n\n✅ Swipe up for the full guide (link in bio)"),
            format!("NEW POST 🚨\n\n{title}\n\n{excerpt}\n\n👉 Full article link in bio"),
            format!("{title} 💯\n\n{excerpt}\n\n📖 Read more: Check our bio link"),
            format!(
                "Transform your {} game! 🎯\n\n{title}\n\n{excerpt}\n\n🔗 Link in bio for full article",
                source.category
            ),
        ];
        let caption = pick(&templates, rng);

        SocialContent {
            text: format!("{caption}\n.\n.\n.\n{}", hashtags.join(" ")),
            hashtags,
            media_url: source.featured_image.clone().filter(|s| !s.is_empty()),
            link,
        }
    }
}

/// Check `content` against `platform`'s hard limits. Returns every violation.
pub fn validate(content: &SocialContent, platform: Platform) -> Vec<String> {
    let mut errors = Vec::new();
    let chars = content.text.chars().count();

    match platform {
        Platform::Twitter => {
            if twitter_length(content) > TWITTER_MAX_CHARS {
                errors.push(format!("Text exceeds {TWITTER_MAX_CHARS} character limit"));
            }
            if content.hashtags.len() > 3 {
                errors.push("Too many hashtags (max 3 recommended)".to_owned());
            }
        }
        Platform::Instagram => {
            if content.media_url.as_deref().map_or(true, str::is_empty) {
                errors.push("Instagram requires an image".to_owned());
            }
            if content.hashtags.len() > INSTAGRAM_MAX_HASHTAGS {
                errors.push(format!("Too many hashtags (max {INSTAGRAM_MAX_HASHTAGS})"));
            }
            if chars > INSTAGRAM_MAX_CAPTION {
                errors.push(format!("Caption exceeds {INSTAGRAM_MAX_CAPTION} character limit"));
            }
        }
        Platform::Reddit => {
            if chars > REDDIT_MAX_TITLE {
                errors.push(format!("Title too long for Reddit (max {REDDIT_MAX_TITLE} chars)"));
            }
            if !content.hashtags.is_empty() {
                errors.push("Reddit does not use hashtags".to_owned());
            }
        }
        Platform::Facebook => {
            if chars > FACEBOOK_MAX_CHARS {
                errors.push("Text exceeds Facebook limit".to_owned());
            }
        }
    }

    errors
}

/// Tweet length as Twitter counts it: the link always weighs 23 characters.
pub fn twitter_length(content: &SocialContent) -> usize {
    let raw = content.text.chars().count();
    if !content.link.is_empty() && content.text.contains(&content.link) {
        raw - content.link.chars().count() + TWITTER_LINK_LENGTH
    } else {
        raw
    }
}

/// Category tag first, then random platform tags, then the article's own
/// tags; de-duplicated and capped at `max`.
fn hashtags_for<R: Rng + ?Sized>(source: &PostSource, max: usize, platform: Platform, rng: &mut R) -> Vec<String> {
    let mut tags = vec![to_hashtag(&source.category)];

    let pool: &[&str] = match platform {
        Platform::Facebook  => FACEBOOK_TAGS,
        Platform::Twitter   => TWITTER_TAGS,
        Platform::Instagram => INSTAGRAM_TAGS,
        Platform::Reddit    => &[],
    };
    let wanted = 5.min(max.saturating_sub(tags.len()));
    tags.extend(pool.choose_multiple(rng, wanted).map(|t| t.to_string()));

    let room = max.saturating_sub(tags.len());
    tags.extend(source.tags.iter().take(room).map(|t| to_hashtag(t)));

    let mut unique = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique.truncate(max);
    unique
}

fn to_hashtag(word: &str) -> String {
    let squashed: String = word.to_lowercase().split_whitespace().collect();
    format!("#{squashed}")
}

fn pick<R: Rng + ?Sized>(options: &[String], rng: &mut R) -> String {
    options.choose(rng).cloned().unwrap_or_default()
}

/// Normalise smart quotes and collapse whitespace.
pub fn clean_title(title: &str) -> String {
    let normalised: String = title
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();
    collapse_whitespace(&normalised)
}

/// Strip HTML tags, collapse whitespace and cap at `max` characters.
pub fn clean_excerpt(excerpt: &str, max: usize) -> String {
    let mut stripped = String::with_capacity(excerpt.len());
    let mut in_tag = false;
    for c in excerpt.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }
    truncate_with_ellipsis(&collapse_whitespace(&stripped), max)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap `s` at `max` characters, ending in `...` when it had to be cut.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn category_emoji(category: &str) -> &'static str {
    match category.to_lowercase().as_str() {
        "fitness"       => "💪",
        "nutrition"     => "🥗",
        "health"        => "❤️",
        "weight-loss"   => "⚖️",
        "style"         => "👔",
        "entertainment" => "🎬",
        "lifestyle"     => "🌟",
        _               => "📖",
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn source() -> PostSource {
        PostSource {
            title: "The “Best” 10-Minute   Workout".into(),
            slug: "best-10-minute-workout".into(),
            excerpt: "<p>Short on time?</p> This  routine hits <b>every</b> muscle.".into(),
            content: "word ".repeat(50),
            category: "fitness".into(),
            tags: vec!["Home Workout".into(), "hiit".into()],
            featured_image: Some("https://cdn.example.com/w.jpg".into()),
            ..Default::default()
        }
    }

    fn formatter() -> ContentFormatter {
        ContentFormatter::new("https://news.example.com/", "Newsroom")
    }

    #[test]
    fn title_cleanup_normalises_quotes_and_spacing() {
        assert_eq!(clean_title("  The “Best”   it’s \n here "), "The \"Best\" it's here");
    }

    #[test]
    fn excerpt_cleanup_strips_markup_and_truncates() {
        let cleaned = clean_excerpt("<p>Hello <em>there</em></p>   world", 200);
        assert_eq!(cleaned, "Hello there world");

        let cut = clean_excerpt("abcdefghij", 8);
        assert_eq!(cut, "abcde...");
        assert_eq!(cut.chars().count(), 8);
    }

    #[test]
    fn tracking_link_uses_trimmed_base_url() {
        let link = formatter().tracking_link("some-slug", Platform::Reddit);
        assert_eq!(
            link,
            "https://news.example.com/articles/some-slug?utm_source=reddit&utm_medium=social&utm_campaign=auto"
        );
    }

    #[test]
    fn reddit_posts_have_no_hashtags_or_media() {
        let mut rng = StdRng::seed_from_u64(7);
        let content = formatter().format(&source(), Platform::Reddit, &mut rng);
        assert!(content.hashtags.is_empty());
        assert!(content.media_url.is_none());
        assert!(content.text.contains("The \"Best\" 10-Minute Workout"));
        assert!(validate(&content, Platform::Reddit).is_empty());
    }

    #[test]
    fn tweets_stay_within_limit_for_long_titles() {
        let mut long = source();
        long.title = "Really ".repeat(60);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let content = formatter().format(&long, Platform::Twitter, &mut rng);
            assert!(twitter_length(&content) <= TWITTER_MAX_CHARS, "seed {seed}");
            assert!(content.hashtags.len() <= 3);
            assert_eq!(content.hashtags[0], "#fitness");
            assert!(validate(&content, Platform::Twitter).is_empty());
        }
    }

    #[test]
    fn hashtags_are_unique_lowercased_and_capped() {
        let mut src = source();
        src.tags = vec!["Fitness".into(), "Leg Day".into()];
        let mut rng = StdRng::seed_from_u64(3);
        let tags = hashtags_for(&src, 20, Platform::Instagram, &mut rng);

        assert_eq!(tags[0], "#fitness");
        assert!(tags.contains(&"#legday".to_string()));
        let mut dedup = tags.clone();
        dedup.dedup();
        assert_eq!(dedup.len(), tags.len());
        assert!(tags.len() <= 20);
    }

    #[test]
    fn instagram_caption_ends_with_hashtag_block() {
        let mut rng = StdRng::seed_from_u64(11);
        let content = formatter().format(&source(), Platform::Instagram, &mut rng);
        assert!(content.text.contains("\n.\n.\n.\n#fitness"));
        assert!(validate(&content, Platform::Instagram).is_empty());
    }

    #[test]
    fn instagram_without_image_fails_validation() {
        let mut src = source();
        src.featured_image = None;
        let mut rng = StdRng::seed_from_u64(1);
        let content = formatter().format(&src, Platform::Instagram, &mut rng);
        assert_eq!(validate(&content, Platform::Instagram), vec!["Instagram requires an image"]);
    }

    #[test]
    fn facebook_post_includes_read_more_link() {
        let mut rng = StdRng::seed_from_u64(5);
        let content = formatter().format(&source(), Platform::Facebook, &mut rng);
        assert!(content.text.contains(&format!("Read more: {}", content.link)));
        assert!(content.hashtags.len() <= 5);
        assert_eq!(content.media_url.as_deref(), Some("https://cdn.example.com/w.jpg"));
    }
}
