//! HTTP handlers for `/books`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use shelf_http::{AppError, AppResult, JsonOrDefault, QueryParams, ValidatedJson};

use super::models::{Book, BookPatch, BookQuery, NewBook, NewComment, SearchBooks};
use super::service::{BookService, CommentListing, CommentRemoval};

/// Path segment that turns a POST on `/{asin}` into a title search
pub const SEARCH_SEGMENT: &str = "search";

pub const COMMENT_ADDED: &str = "Comment successfully added";
pub const COMMENT_REMOVED: &str = "Comment successfully removed";
pub const BOOK_MISSING: &str = "No book with that asin found";
pub const NO_COMMENTS_FOR_BOOK: &str = "No comments found for that book";
pub const NO_COMMENTS_FOR_ASIN: &str = "No comments found for the provided asin";
pub const COMMENT_MISSING: &str = "Comment with that ID does not exist within the provided asin";

type SharedService = Arc<BookService>;

/// Routes relative to the module mount point
///
/// `search` shares the `/{asin}` route so that a book stored under that id is
/// still reachable through GET, PUT and DELETE.
pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{asin}",
            get(get_book)
                .post(search_books)
                .put(update_book)
                .delete(delete_book),
        )
        .route("/{asin}/comments", get(list_comments).post(add_comment))
        .route("/{asin}/comments/{comment_id}", delete(remove_comment))
        .with_state(service)
}

async fn list_books(
    State(service): State<SharedService>,
    QueryParams(query): QueryParams<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = service.list(query.category.as_deref()).await?;
    Ok(Json(books))
}

/// A missing or empty body returns the whole collection
async fn search_books(
    State(service): State<SharedService>,
    Path(segment): Path<String>,
    JsonOrDefault(search): JsonOrDefault<SearchBooks>,
) -> AppResult<Json<Vec<Book>>> {
    if segment != SEARCH_SEGMENT {
        return Err(AppError::not_found(format!(
            "no POST route for /books/{}",
            segment
        )));
    }
    let books = service.search(search.title.as_deref()).await?;
    Ok(Json(books))
}

async fn get_book(
    State(service): State<SharedService>,
    Path(asin): Path<String>,
) -> AppResult<Json<Book>> {
    Ok(Json(service.get(&asin).await?))
}

async fn create_book(
    State(service): State<SharedService>,
    ValidatedJson(input): ValidatedJson<NewBook>,
) -> AppResult<StatusCode> {
    let book = service.create(input).await?;
    tracing::info!(asin = %book.asin, "book created");
    Ok(StatusCode::CREATED)
}

async fn update_book(
    State(service): State<SharedService>,
    Path(asin): Path<String>,
    ValidatedJson(patch): ValidatedJson<BookPatch>,
) -> AppResult<Json<Vec<Book>>> {
    let books = service.update(&asin, patch).await?;
    tracing::info!(%asin, "book updated");
    Ok(Json(books))
}

async fn delete_book(
    State(service): State<SharedService>,
    Path(asin): Path<String>,
) -> AppResult<StatusCode> {
    service.delete(&asin).await?;
    tracing::info!(%asin, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_comment(
    State(service): State<SharedService>,
    Path(asin): Path<String>,
    ValidatedJson(input): ValidatedJson<NewComment>,
) -> AppResult<&'static str> {
    let comment = service.add_comment(&asin, input).await?;
    tracing::info!(%asin, comment_id = %comment.id, "comment added");
    Ok(COMMENT_ADDED)
}

async fn list_comments(
    State(service): State<SharedService>,
    Path(asin): Path<String>,
) -> AppResult<CommentListing> {
    service.list_comments(&asin).await
}

async fn remove_comment(
    State(service): State<SharedService>,
    Path((asin, comment_id)): Path<(String, String)>,
) -> AppResult<CommentRemoval> {
    let removal = service.remove_comment(&asin, &comment_id).await?;
    if removal == CommentRemoval::Removed {
        tracing::info!(%asin, %comment_id, "comment removed");
    }
    Ok(removal)
}

impl IntoResponse for CommentListing {
    fn into_response(self) -> Response {
        match self {
            CommentListing::Comments(comments) => Json(comments).into_response(),
            CommentListing::NoComments => NO_COMMENTS_FOR_BOOK.into_response(),
            CommentListing::BookMissing => BOOK_MISSING.into_response(),
        }
    }
}

impl IntoResponse for CommentRemoval {
    fn into_response(self) -> Response {
        match self {
            CommentRemoval::Removed => COMMENT_REMOVED,
            CommentRemoval::CommentMissing => COMMENT_MISSING,
            CommentRemoval::NoComments => NO_COMMENTS_FOR_ASIN,
            CommentRemoval::BookMissing => BOOK_MISSING,
        }
        .into_response()
    }
}
