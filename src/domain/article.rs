use std::fmt;
use std::ops::Deref;

use url::Url;
use uuid::Uuid;

/// Maximum length of an article title
const MAX_TITLE_LEN: usize = 256;

/// Article identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArticleId(Uuid);

impl ArticleId {
    pub const fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an identifier received from a client
    pub fn parse(id: &str) -> Result<Self, String> {
        Uuid::parse_str(id.trim())
            .map(Self)
            .map_err(|_| format!("{id} is not a valid article id"))
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for ArticleId {
    type Target = Uuid;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Article title
#[derive(Debug, Clone)]
pub struct ArticleTitle(String);

impl ArticleTitle {
    pub fn parse(title: String) -> Result<Self, String> {
        let title = title.trim().to_string();
        if title.is_empty() {
            Err("The article title cannot be empty".into())
        } else if title.chars().count() > MAX_TITLE_LEN {
            Err(format!("The article title must be at most {MAX_TITLE_LEN} characters long"))
        } else {
            Ok(Self(title))
        }
    }
}

impl AsRef<str> for ArticleTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Featured image of an article
#[derive(Debug, Clone)]
pub struct ImageUrl(String);

impl ImageUrl {
    pub fn parse(url: String) -> Result<Self, String> {
        match Url::parse(url.trim()) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(Self(parsed.into())),
            _ => Err(format!("{url} is not a valid image URL")),
        }
    }
}

impl AsRef<str> for ImageUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Body of an article
#[derive(Debug, Clone)]
pub struct ArticleContent(String);

impl ArticleContent {
    pub fn parse(content: String) -> Result<Self, String> {
        if content.trim().is_empty() {
            Err("The article content cannot be empty".into())
        } else {
            Ok(Self(content))
        }
    }
}

impl AsRef<str> for ArticleContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Casino rating, from one to five stars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn parse(rating: i32) -> Result<Self, String> {
        match u8::try_from(rating) {
            Ok(r) if (1..=Self::MAX).contains(&r) => Ok(Self(r)),
            _ => Err(format!(
                "The rating must be between 1 and {}, got {rating}",
                Self::MAX
            )),
        }
    }

    pub const fn stars(self) -> u8 {
        self.0
    }
}

impl From<Rating> for i32 {
    fn from(value: Rating) -> Self {
        Self::from(value.0)
    }
}

/// Validated article data, as submitted by an admin
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: ArticleTitle,
    pub image_url: ImageUrl,
    pub content: ArticleContent,
    pub rating: Rating,
}
