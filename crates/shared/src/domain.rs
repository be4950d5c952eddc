use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(ArticleId);
id_newtype!(CommentId);
id_newtype!(UserId);

/// Feed metadata that may arrive either as a single value or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// An article as sourced from the upstream feed. `link` is the stable external identity;
/// `article_id` is assigned by the backend on first view registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<OneOrMany>,
    #[serde(
        default,
        alias = "_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub article_id: Option<ArticleId>,
}

impl Article {
    pub fn from_link(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Self::default()
        }
    }
}

/// Per-viewer engagement on one article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementState {
    pub is_bookmarked: bool,
    pub is_liked: bool,
    pub like_count: u64,
}

impl EngagementState {
    /// Flips the like flag and moves the count one step in the same direction.
    pub fn flip_like(&mut self) {
        if self.is_liked {
            self.is_liked = false;
            self.like_count = self.like_count.saturating_sub(1);
        } else {
            self.is_liked = true;
            self.like_count = self.like_count.saturating_add(1);
        }
    }

    pub fn flip_bookmark(&mut self) {
        self.is_bookmarked = !self.is_bookmarked;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: CommentId,
    pub author_display_name: String,
    #[serde(alias = "commentText")]
    pub body_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub upvote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// The per-user article collections exposed by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedList {
    #[default]
    Bookmarks,
    Likes,
    History,
}

impl SavedList {
    pub const ALL: [SavedList; 3] = [Self::Bookmarks, Self::Likes, Self::History];

    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Bookmarks => "bookmarks",
            Self::Likes => "likes",
            Self::History => "history",
        }
    }
}
