use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use validator::{Validate, ValidationError};

/// Comments are only written through the comment endpoints.
const COMMENTS_KEY: &str = "comments";

/// Free-form attributes kept alongside the typed fields of a book.
pub type Attributes = Map<String, Value>;

/// A catalog entry. Known fields are typed; everything else rides in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier for the book
    pub asin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Absent until the first comment is added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(flatten)]
    pub extra: Attributes,
}

impl Book {
    /// Build a stored book from a create payload and its server-generated id.
    pub fn from_new(asin: String, input: NewBook) -> Self {
        Self {
            asin,
            title: Some(input.title),
            category: input.category,
            comments: None,
            extra: input.extra,
        }
    }

    /// Shallow-merge `patch` over this book. Fields missing from the patch survive.
    pub fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        self.extra.extend(patch.extra);
    }
}

/// A reader comment stored inside its book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub comment: String,
    #[serde(rename = "_createdDate", with = "time::serde::rfc3339")]
    pub created_date: OffsetDateTime,
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBook {
    /// Only consulted for the duplicate check; the stored id is always generated
    #[serde(default)]
    pub asin: Option<String>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Category cannot be empty"))]
    #[serde(default)]
    pub category: Option<String>,
    #[validate(custom(function = "no_comments_key"))]
    #[serde(flatten)]
    pub extra: Attributes,
}

/// Request model for updating a book. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookPatch {
    /// Accepted only when it repeats the id from the path
    #[serde(default)]
    pub asin: Option<String>,
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    #[serde(default)]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Category cannot be empty"))]
    #[serde(default)]
    pub category: Option<String>,
    #[validate(custom(function = "no_comments_key"))]
    #[serde(flatten)]
    pub extra: Attributes,
}

/// Request model for adding a comment. Missing fields fail the length rules.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(min = 3, message = "Username is too short!"))]
    #[serde(default)]
    pub username: String,
    #[validate(length(min = 3, message = "Comment is too short!"))]
    #[serde(default)]
    pub comment: String,
}

/// Query parameters for listing books.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookQuery {
    pub category: Option<String>,
}

/// Body of a title search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchBooks {
    #[serde(default)]
    pub title: Option<String>,
}

fn no_comments_key(extra: &Attributes) -> Result<(), ValidationError> {
    if !extra.contains_key(COMMENTS_KEY) {
        return Ok(());
    }
    let mut error = ValidationError::new("reserved");
    error.message = Some(format!("'{}' cannot be set directly", COMMENTS_KEY).into());
    Err(error)
}
