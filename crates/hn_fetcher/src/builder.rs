//! Turns fetched items and user profiles into retrievable documents.
//!
//! Each document carries a plain-text metadata header, the cleaned body
//! text, any URLs pulled out of the body, and a trailing tag line used for
//! retrieval filtering. Exactly one document is produced per valid item.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;

use hn_core::{Document, DocumentKind, Item, ItemKind, StoryCategory, UserProfile};

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r#"https?://[^\s\]\)<>"]+"#).unwrap();
}

const UNKNOWN_AUTHOR: &str = "Unknown";

/// Strip HTML tags and entities and collapse whitespace. HackerNews item
/// text arrives as an HTML fragment (`<p>`, `<a>`, `&gt;` quoting).
pub fn clean_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unique URLs found in already-cleaned text, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in URL_RE.find_iter(text) {
        let url = m.as_str().to_string();
        if !seen.contains(&url) {
            seen.push(url);
        }
    }
    seen
}

fn format_date(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => "Unknown".to_string(),
    }
}

fn is_placeholder(text: &str) -> bool {
    text.is_empty() || text == "[flagged]" || text == "[dead]" || text == "[deleted]"
}

/// Build the document for a story or job item. Tombstones and items
/// without a title yield `None`.
pub fn story_document(item: &Item, category: StoryCategory) -> Option<Document> {
    if item.is_tombstone() {
        return None;
    }
    let title = item.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        return None;
    }

    let author = item.by.clone().unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let score = item.score.unwrap_or(0);
    let comment_count = item.descendants.unwrap_or(item.kids.len() as u64);
    let text = clean_text(item.text.as_deref().unwrap_or(""));

    let (story_type, content_category) = match category {
        _ if title.starts_with("Ask HN:") || category == StoryCategory::Ask => {
            ("Ask HN", "ask_hn")
        }
        _ if title.starts_with("Show HN:") || category == StoryCategory::Show => {
            ("Show HN", "show_hn")
        }
        StoryCategory::Job => ("Job Posting", "jobs"),
        StoryCategory::Best => ("Best Story", "best"),
        _ => ("Story", "general"),
    };

    let mut doc = format!(
        "Metadata: type=story, category={content_category}\n\
         Story ID: {id}\n\
         Title: {title}\n\
         Description: {story_type}\n\
         Author: {author}\n\
         Time: {date}\n\
         Score: {score} points\n\
         Comments: {comments} total\n\
         Source Endpoint: {endpoint}",
        id = item.id,
        date = format_date(item.posted_at()),
        comments = comment_count,
        endpoint = category.as_str(),
    );

    if let Some(url) = item.url.as_deref().filter(|u| !u.is_empty()) {
        doc.push_str(&format!("\nLink: {}", url));
    }

    if !is_placeholder(&text) {
        doc.push_str(&format!("\nText: {}", text));
        let urls: Vec<String> = extract_urls(&text)
            .into_iter()
            .filter(|u| Some(u.as_str()) != item.url.as_deref())
            .collect();
        if !urls.is_empty() {
            doc.push_str(&format!("\nExtracted URLs: {}", urls.join(", ")));
        }
    }

    let mut tags = vec![content_category.to_string(), "story".to_string()];
    if score > 100 {
        tags.push("popular".to_string());
    }
    if score > 500 {
        tags.push("highly_popular".to_string());
    }
    if comment_count > 50 {
        tags.push("discussion_heavy".to_string());
    }
    doc.push_str(&format!("\nTags: {}", tags.join(", ")));

    Some(Document {
        id: item.id.to_string(),
        source_id: item.id.to_string(),
        kind: DocumentKind::Story,
        author,
        posted_at: item.posted_at().unwrap_or_else(Utc::now),
        category: category.as_str().to_string(),
        text: doc,
    })
}

/// Build the document for a comment, annotated with the category of the
/// story it hangs under and its depth in the thread.
pub fn comment_document(item: &Item, category: StoryCategory, depth: usize) -> Option<Document> {
    if item.is_tombstone() {
        return None;
    }
    let author = item.by.clone().unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    let text = clean_text(item.text.as_deref().unwrap_or(""));

    let mut doc = format!(
        "Metadata: type=comment, category=discussion\n\
         Comment ID: {id}\n\
         Author: {author}\n\
         Time: {date}\n\
         Source Category: {category}\n\
         Context: comment_on_{category}_story\n\
         Comment Depth: {depth}",
        id = item.id,
        date = format_date(item.posted_at()),
        category = category.as_str(),
    );

    if let Some(parent) = item.parent {
        doc.push_str(&format!("\nReplying to: {}", parent));
    }

    if !is_placeholder(&text) {
        doc.push_str(&format!("\nText: {}", text));
        let urls = extract_urls(&text);
        if !urls.is_empty() {
            doc.push_str(&format!("\nExtracted URLs: {}", urls.join(", ")));
        }
    } else {
        doc.push_str("\nText: [Deleted or empty]");
    }

    let mut tags = vec![category.as_str().to_string(), "comment".to_string()];
    if depth == 0 {
        tags.push("top_level_comment".to_string());
    } else {
        tags.push("reply".to_string());
    }
    doc.push_str(&format!("\nTags: {}", tags.join(", ")));

    Some(Document {
        id: item.id.to_string(),
        source_id: item.id.to_string(),
        kind: DocumentKind::Comment,
        author,
        posted_at: item.posted_at().unwrap_or_else(Utc::now),
        category: category.as_str().to_string(),
        text: doc,
    })
}

/// Build the profile document for an author encountered during a run.
/// `context` records how the user was met, e.g. `author_of_topstories_story`.
pub fn user_document(user: &UserProfile, context: &str) -> Option<Document> {
    if user.id.is_empty() {
        return None;
    }
    let karma = user.karma.unwrap_or(0);
    let about = clean_text(user.about.as_deref().unwrap_or(""));
    let created = match user.created_at() {
        Some(t) => t.format("%Y-%m-%d").to_string(),
        None => "Unknown".to_string(),
    };

    let mut doc = format!(
        "Metadata: type=user_profile, category=user_info\n\
         Username: {username}\n\
         Karma: {karma} points\n\
         Member since: {created}\n\
         Context: {context}",
        username = user.id,
    );

    if !about.is_empty() {
        doc.push_str(&format!("\nAbout: {}", about));
        let urls = extract_urls(&about);
        if !urls.is_empty() {
            doc.push_str(&format!("\nExtracted URLs: {}", urls.join(", ")));
        }
    }

    let mut tags = vec!["user_profile".to_string()];
    if karma > 1000 {
        tags.push("high_karma_user".to_string());
    }
    if context.contains("author") {
        tags.push("content_author".to_string());
    }
    if context.contains("commenter") {
        tags.push("active_commenter".to_string());
    }
    doc.push_str(&format!("\nTags: {}", tags.join(", ")));

    Some(Document {
        id: format!("user:{}", user.id),
        source_id: user.id.clone(),
        kind: DocumentKind::User,
        author: user.id.clone(),
        posted_at: user.created_at().unwrap_or_else(Utc::now),
        category: "user_info".to_string(),
        text: doc,
    })
}

/// Dispatch on item kind. Job items flow through the story format — the
/// jobs endpoint returns `type == "job"` items that are stories in every
/// respect that matters here.
pub fn document_for_item(item: &Item, category: StoryCategory, depth: usize) -> Option<Document> {
    match item.kind {
        ItemKind::Story | ItemKind::Job => story_document(item, category),
        ItemKind::Comment => comment_document(item, category, depth),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story_item() -> Item {
        Item {
            id: 8863,
            kind: ItemKind::Story,
            by: Some("dhouston".to_string()),
            time: Some(1175714200),
            text: None,
            parent: None,
            kids: vec![9224, 8917],
            url: Some("http://www.getdropbox.com/u/2/screencast.html".to_string()),
            score: Some(104),
            title: Some("My YC app: Dropbox".to_string()),
            descendants: Some(71),
            deleted: false,
            dead: false,
        }
    }

    #[test]
    fn story_document_carries_metadata() {
        let doc = story_document(&story_item(), StoryCategory::Top).unwrap();
        assert_eq!(doc.id, "8863");
        assert_eq!(doc.source_id, "8863");
        assert_eq!(doc.kind, DocumentKind::Story);
        assert_eq!(doc.author, "dhouston");
        assert_eq!(doc.category, "topstories");
        assert!(doc.text.contains("Story ID: 8863"));
        assert!(doc.text.contains("Title: My YC app: Dropbox"));
        assert!(doc.text.contains("Score: 104 points"));
        assert!(doc.text.contains("Comments: 71 total"));
        assert!(doc.text.contains("Link: http://www.getdropbox.com"));
        assert!(doc.text.contains("popular"));
    }

    #[test]
    fn ask_hn_stories_are_categorized_by_title() {
        let mut item = story_item();
        item.title = Some("Ask HN: How do you test?".to_string());
        let doc = story_document(&item, StoryCategory::Top).unwrap();
        assert!(doc.text.contains("category=ask_hn"));
        assert!(doc.text.contains("Description: Ask HN"));
    }

    #[test]
    fn tombstones_and_untitled_stories_yield_nothing() {
        let mut dead = story_item();
        dead.dead = true;
        assert!(story_document(&dead, StoryCategory::Top).is_none());

        let mut untitled = story_item();
        untitled.title = None;
        assert!(story_document(&untitled, StoryCategory::Top).is_none());
    }

    #[test]
    fn comment_document_strips_html_and_tracks_depth() {
        let item = Item {
            id: 9224,
            kind: ItemKind::Comment,
            by: Some("norvig".to_string()),
            time: Some(1175714400),
            text: Some("<p>Nice work!</p> See <a href=\"https://example.com/x\">https://example.com/x</a>".to_string()),
            parent: Some(8863),
            kids: vec![],
            url: None,
            score: None,
            title: None,
            descendants: None,
            deleted: false,
            dead: false,
        };

        let doc = comment_document(&item, StoryCategory::Top, 1).unwrap();
        assert!(doc.text.contains("Comment ID: 9224"));
        assert!(doc.text.contains("Replying to: 8863"));
        assert!(doc.text.contains("Comment Depth: 1"));
        assert!(doc.text.contains("Nice work!"));
        assert!(!doc.text.contains("<p>"));
        assert!(doc.text.contains("Extracted URLs: https://example.com/x"));
        assert!(doc.text.contains("reply"));
    }

    #[test]
    fn top_level_comments_are_tagged() {
        let item = Item {
            id: 1,
            kind: ItemKind::Comment,
            by: None,
            time: None,
            text: Some("plain".to_string()),
            parent: Some(2),
            kids: vec![],
            url: None,
            score: None,
            title: None,
            descendants: None,
            deleted: false,
            dead: false,
        };
        let doc = comment_document(&item, StoryCategory::Ask, 0).unwrap();
        assert!(doc.text.contains("top_level_comment"));
        assert_eq!(doc.author, "Unknown");
    }

    #[test]
    fn user_document_reflects_karma_and_context() {
        let user = UserProfile {
            id: "pg".to_string(),
            created: Some(1160418092),
            karma: Some(155111),
            about: Some("Bug fixer. <a href=\"http://paulgraham.com\">http://paulgraham.com</a>".to_string()),
            submitted: vec![],
        };
        let doc = user_document(&user, "author_of_topstories_story").unwrap();
        assert_eq!(doc.id, "user:pg");
        assert_eq!(doc.kind, DocumentKind::User);
        assert!(doc.text.contains("Username: pg"));
        assert!(doc.text.contains("high_karma_user"));
        assert!(doc.text.contains("content_author"));
        assert!(doc.text.contains("Extracted URLs: http://paulgraham.com"));
    }

    #[test]
    fn one_document_per_item() {
        let items = vec![story_item(), {
            let mut other = story_item();
            other.id = 8864;
            other
        }];
        let docs: Vec<_> = items
            .iter()
            .filter_map(|i| document_for_item(i, StoryCategory::Top, 0))
            .collect();
        assert_eq!(docs.len(), items.len());
    }
}
