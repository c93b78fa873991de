use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The story-list endpoints exposed by the HackerNews API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryCategory {
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

impl StoryCategory {
    pub fn all() -> [StoryCategory; 6] {
        [
            StoryCategory::Top,
            StoryCategory::New,
            StoryCategory::Best,
            StoryCategory::Ask,
            StoryCategory::Show,
            StoryCategory::Job,
        ]
    }

    /// Endpoint name, which doubles as the category tag stored on documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryCategory::Top => "topstories",
            StoryCategory::New => "newstories",
            StoryCategory::Best => "beststories",
            StoryCategory::Ask => "askstories",
            StoryCategory::Show => "showstories",
            StoryCategory::Job => "jobstories",
        }
    }
}

impl std::fmt::Display for StoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StoryCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "top" | "topstories" => Ok(StoryCategory::Top),
            "new" | "newstories" => Ok(StoryCategory::New),
            "best" | "beststories" => Ok(StoryCategory::Best),
            "ask" | "askstories" => Ok(StoryCategory::Ask),
            "show" | "showstories" => Ok(StoryCategory::Show),
            "job" | "jobstories" => Ok(StoryCategory::Job),
            other => Err(format!("Unknown story category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Story,
    Comment,
    Job,
    Poll,
    Pollopt,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One item as returned by `item/<id>.json`. Every field except `id` is
/// optional on the wire; deleted and dead items arrive as tombstones with
/// most fields missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub kids: Vec<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub descendants: Option<u64>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

impl Item {
    pub fn is_tombstone(&self) -> bool {
        self.deleted || self.dead
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.time.and_then(|t| Utc.timestamp_opt(t, 0).single())
    }
}

/// A user profile from `user/<name>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub karma: Option<i64>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub submitted: Vec<u64>,
}

impl UserProfile {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.and_then(|t| Utc.timestamp_opt(t, 0).single())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Story,
    Comment,
    User,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Story => "story",
            DocumentKind::Comment => "comment",
            DocumentKind::User => "user",
        }
    }
}

/// One retrievable text unit. The id is the source item id, with a `#<n>`
/// suffix for continuation chunks of oversized items and a `user:` prefix
/// for profile documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_id: String,
    pub kind: DocumentKind,
    pub author: String,
    pub posted_at: DateTime<Utc>,
    pub category: String,
    pub text: String,
}
