//! Book catalog operations over the JSON store.
//!
//! Every call reads the whole collection. Mutations run through
//! [`JsonStore::modify`], so they are serialized against each other and only
//! write when something actually changed.

use std::sync::Arc;

use serde_json::json;
use shelf_http::{AppError, AppResult};
use shelf_store::{Change, JsonStore};
use time::OffsetDateTime;
use uuid::Uuid;

use super::models::{Book, BookPatch, Comment, NewBook, NewComment};

pub const DUPLICATE_BOOK: &str = "Book already in db";

/// What the comment listing found.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentListing {
    Comments(Vec<Comment>),
    NoComments,
    BookMissing,
}

/// What a comment removal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentRemoval {
    Removed,
    CommentMissing,
    NoComments,
    BookMissing,
}

pub struct BookService {
    store: Arc<JsonStore<Book>>,
}

impl BookService {
    pub fn new(store: Arc<JsonStore<Book>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &JsonStore<Book> {
        &self.store
    }

    /// All books, or only those whose category matches exactly.
    pub async fn list(&self, category: Option<&str>) -> AppResult<Vec<Book>> {
        let books = self.store.load().await?;

        Ok(match category.filter(|c| !c.is_empty()) {
            Some(category) => books
                .into_iter()
                .filter(|book| book.category.as_deref() == Some(category))
                .collect(),
            None => books,
        })
    }

    /// All books, or only those whose title contains `title` (case-sensitive).
    pub async fn search(&self, title: Option<&str>) -> AppResult<Vec<Book>> {
        let books = self.store.load().await?;

        Ok(match title.filter(|t| !t.is_empty()) {
            Some(fragment) => books
                .into_iter()
                .filter(|book| {
                    book.title
                        .as_deref()
                        .is_some_and(|title| title.contains(fragment))
                })
                .collect(),
            None => books,
        })
    }

    pub async fn get(&self, asin: &str) -> AppResult<Book> {
        self.store
            .load()
            .await?
            .into_iter()
            .find(|book| book.asin == asin)
            .ok_or_else(|| book_not_found(asin))
    }

    /// Append a new book under a freshly generated asin.
    pub async fn create(&self, input: NewBook) -> AppResult<Book> {
        self.store
            .modify(|books| {
                if let Some(requested) = input.asin.as_deref() {
                    if books.iter().any(|book| book.asin == requested) {
                        return Err(AppError::bad_request(DUPLICATE_BOOK));
                    }
                }

                let book = Book::from_new(Uuid::new_v4().to_string(), input);
                books.push(book.clone());
                Ok(Change::Save(book))
            })
            .await
    }

    /// Merge `patch` into the book and return the whole updated collection.
    pub async fn update(&self, asin: &str, patch: BookPatch) -> AppResult<Vec<Book>> {
        if let Some(requested) = patch.asin.as_deref().filter(|a| *a != asin) {
            return Err(AppError::validation(
                vec![json!({
                    "field": "asin",
                    "error": format!("asin cannot be changed (got '{}')", requested),
                })],
                "Invalid input",
            ));
        }

        self.store
            .modify(|books| {
                let book = books
                    .iter_mut()
                    .find(|book| book.asin == asin)
                    .ok_or_else(|| book_not_found(asin))?;
                book.apply(patch);
                Ok(Change::Save(books.clone()))
            })
            .await
    }

    pub async fn delete(&self, asin: &str) -> AppResult<()> {
        self.store
            .modify(|books| {
                let index = books
                    .iter()
                    .position(|book| book.asin == asin)
                    .ok_or_else(|| book_not_found(asin))?;
                books.remove(index);
                Ok(Change::Save(()))
            })
            .await
    }

    /// Append a comment to the book, creating its comment list if needed.
    pub async fn add_comment(&self, asin: &str, input: NewComment) -> AppResult<Comment> {
        self.store
            .modify(|books| {
                let book = books
                    .iter_mut()
                    .find(|book| book.asin == asin)
                    .ok_or_else(|| book_not_found(asin))?;

                let comment = Comment {
                    id: Uuid::new_v4().to_string(),
                    username: input.username,
                    comment: input.comment,
                    created_date: OffsetDateTime::now_utc(),
                };
                book.comments
                    .get_or_insert_with(Vec::new)
                    .push(comment.clone());
                Ok(Change::Save(comment))
            })
            .await
    }

    pub async fn list_comments(&self, asin: &str) -> AppResult<CommentListing> {
        let books = self.store.load().await?;

        Ok(match books.into_iter().find(|book| book.asin == asin) {
            None => CommentListing::BookMissing,
            Some(Book { comments: None, .. }) => CommentListing::NoComments,
            Some(Book {
                comments: Some(comments),
                ..
            }) => CommentListing::Comments(comments),
        })
    }

    pub async fn remove_comment(&self, asin: &str, comment_id: &str) -> AppResult<CommentRemoval> {
        self.store
            .modify(|books| {
                let Some(book) = books.iter_mut().find(|book| book.asin == asin) else {
                    return Ok(Change::Keep(CommentRemoval::BookMissing));
                };
                let Some(comments) = book.comments.as_mut() else {
                    return Ok(Change::Keep(CommentRemoval::NoComments));
                };
                let Some(index) = comments.iter().position(|c| c.id == comment_id) else {
                    return Ok(Change::Keep(CommentRemoval::CommentMissing));
                };

                comments.remove(index);
                Ok(Change::Save(CommentRemoval::Removed))
            })
            .await
    }
}

fn book_not_found(asin: &str) -> AppError {
    AppError::not_found(format!("no book with asin '{}'", asin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn service_with(books: serde_json::Value) -> (TempDir, BookService) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("books.json");
        std::fs::write(&path, books.to_string()).unwrap();
        let service = BookService::new(Arc::new(JsonStore::new(path)));
        (temp_dir, service)
    }

    fn catalog() -> serde_json::Value {
        json!([
            {"asin": "b1", "title": "Dune", "category": "scifi"},
            {"asin": "b2", "title": "Hyperion", "category": "scifi"},
            {"asin": "b3", "title": "The Hobbit", "category": "fantasy"},
            {"asin": "b4", "img": "no-title.png"}
        ])
    }

    fn new_book(value: serde_json::Value) -> NewBook {
        serde_json::from_value(value).unwrap()
    }

    fn new_comment(username: &str, comment: &str) -> NewComment {
        NewComment {
            username: username.to_string(),
            comment: comment.to_string(),
        }
    }

    fn asins(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.asin.as_str()).collect()
    }

    #[tokio::test]
    async fn list_filters_by_exact_category() {
        let (_dir, service) = service_with(catalog()).await;

        assert_eq!(asins(&service.list(Some("scifi")).await.unwrap()), ["b1", "b2"]);
        assert!(service.list(Some("SciFi")).await.unwrap().is_empty());
        assert_eq!(service.list(None).await.unwrap().len(), 4);
        assert_eq!(service.list(Some("")).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn search_is_case_sensitive_substring() {
        let (_dir, service) = service_with(catalog()).await;

        assert_eq!(asins(&service.search(Some("Hob")).await.unwrap()), ["b3"]);
        assert!(service.search(Some("hob")).await.unwrap().is_empty());
        assert_eq!(service.search(Some("e")).await.unwrap().len(), 3);
        assert_eq!(service.search(None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_dir, service) = service_with(catalog()).await;

        assert_eq!(service.get("b2").await.unwrap().title.as_deref(), Some("Hyperion"));
        let err = service.get("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_generates_fresh_asin() {
        let (_dir, service) = service_with(json!([])).await;

        let first = service
            .create(new_book(json!({"asin": "client-id", "title": "Dune"})))
            .await
            .unwrap();
        let second = service
            .create(new_book(json!({"title": "Dune"})))
            .await
            .unwrap();

        assert_ne!(first.asin, "client-id");
        assert_ne!(first.asin, second.asin);
        let stored = service.get(&first.asin).await.unwrap();
        assert_eq!(stored.title.as_deref(), Some("Dune"));
        assert!(stored.comments.is_none());
    }

    #[tokio::test]
    async fn create_with_existing_asin_is_rejected_without_write() {
        let (_dir, service) = service_with(catalog()).await;

        let err = service
            .create(new_book(json!({"asin": "b1", "title": "Dune again"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest { ref message, .. } if message == DUPLICATE_BOOK));
        assert_eq!(service.list(None).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn update_merges_patch_and_returns_collection() {
        let (_dir, service) = service_with(catalog()).await;
        let patch: BookPatch = serde_json::from_value(json!({"category": "classic", "year": 1965})).unwrap();

        let books = service.update("b1", patch).await.unwrap();

        assert_eq!(books.len(), 4);
        let dune = service.get("b1").await.unwrap();
        assert_eq!(dune.title.as_deref(), Some("Dune"));
        assert_eq!(dune.category.as_deref(), Some("classic"));
        assert_eq!(dune.extra["year"], json!(1965));
    }

    #[tokio::test]
    async fn update_rejects_foreign_asin_and_missing_book() {
        let (_dir, service) = service_with(catalog()).await;

        let patch = BookPatch {
            asin: Some("b2".to_string()),
            ..BookPatch::default()
        };
        let err = service.update("b1", patch).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = service.update("missing", BookPatch::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_only_target() {
        let (dir, service) = service_with(catalog()).await;

        service.delete("b2").await.unwrap();
        assert_eq!(asins(&service.list(None).await.unwrap()), ["b1", "b3", "b4"]);

        let before = std::fs::read(dir.path().join("books.json")).unwrap();
        let err = service.delete("b2").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(std::fs::read(dir.path().join("books.json")).unwrap(), before);
    }

    #[tokio::test]
    async fn add_comment_to_missing_book_is_not_found() {
        let (_dir, service) = service_with(catalog()).await;

        let err = service
            .add_comment("missing", new_comment("reader", "great read"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn comment_lifecycle() {
        let (_dir, service) = service_with(catalog()).await;

        assert_eq!(
            service.list_comments("b1").await.unwrap(),
            CommentListing::NoComments
        );

        let first = service
            .add_comment("b1", new_comment("reader", "great read"))
            .await
            .unwrap();
        let second = service
            .add_comment("b1", new_comment("critic", "too long"))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);

        let CommentListing::Comments(comments) = service.list_comments("b1").await.unwrap() else {
            panic!("expected comments");
        };
        assert_eq!(comments, vec![first.clone(), second.clone()]);

        assert_eq!(
            service.remove_comment("b1", "unknown").await.unwrap(),
            CommentRemoval::CommentMissing
        );
        assert_eq!(
            service.remove_comment("b1", &first.id).await.unwrap(),
            CommentRemoval::Removed
        );
        assert_eq!(
            service.list_comments("b1").await.unwrap(),
            CommentListing::Comments(vec![second])
        );
    }

    #[tokio::test]
    async fn comment_lookups_report_missing_parents() {
        let (_dir, service) = service_with(catalog()).await;

        assert_eq!(
            service.list_comments("missing").await.unwrap(),
            CommentListing::BookMissing
        );
        assert_eq!(
            service.remove_comment("missing", "c1").await.unwrap(),
            CommentRemoval::BookMissing
        );
        assert_eq!(
            service.remove_comment("b3", "c1").await.unwrap(),
            CommentRemoval::NoComments
        );
    }
}
