pub mod models;
pub mod routes;
pub mod service;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{settings::StoreSettings, InitCtx, Module};
use shelf_store::JsonStore;

use models::Book;
use service::BookService;

/// Book catalog module backed by a single JSON document
pub struct BooksModule {
    service: Arc<BookService>,
    create_if_missing: bool,
}

impl BooksModule {
    pub fn new(store: Arc<JsonStore<Book>>, create_if_missing: bool) -> Self {
        Self {
            service: Arc::new(BookService::new(store)),
            create_if_missing,
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let store = self.service.store();

        if self.create_if_missing {
            store
                .ensure_exists()
                .await
                .context("failed to prepare book store")?;
        }

        let books = store
            .load()
            .await
            .with_context(|| format!("book store at {} is unusable", store.path().display()))?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            store = %store.path().display(),
            books = books.len(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module for the configured store
pub fn create_module(settings: &StoreSettings) -> Arc<dyn Module> {
    let store = Arc::new(JsonStore::new(settings.path.clone()));
    Arc::new(BooksModule::new(store, settings.create_if_missing))
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn text_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": { "text/plain": { "schema": { "type": "string" } } }
    })
}

fn json_body(schema_name: &str) -> serde_json::Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{}", schema_name) }
            }
        }
    })
}

fn path_param(name: &str, description: &str) -> serde_json::Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "description": description,
        "schema": { "type": "string" }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_list = json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } });
    let comment_list =
        json!({ "type": "array", "items": { "$ref": "#/components/schemas/Comment" } });
    let asin = path_param("asin", "Book identifier");

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books, optionally by category",
                    "tags": ["Books"],
                    "parameters": [{
                        "name": "category",
                        "in": "query",
                        "required": false,
                        "schema": { "type": "string" }
                    }],
                    "responses": {
                        "200": json_response("Books", book_list.clone()),
                        "500": error_response("Store failure")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": json_body("NewBook"),
                    "responses": {
                        "201": { "description": "Book created" },
                        "400": error_response("Invalid input or duplicate asin"),
                        "500": error_response("Store failure")
                    }
                }
            },
            "/search": {
                "post": {
                    "summary": "Search books by title fragment",
                    "tags": ["Books"],
                    "requestBody": json_body("SearchBooks"),
                    "responses": {
                        "200": json_response("Matching books", book_list.clone()),
                        "500": error_response("Store failure")
                    }
                }
            },
            "/{asin}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [asin.clone()],
                    "responses": {
                        "200": json_response("Book", json!({ "$ref": "#/components/schemas/Book" })),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "parameters": [asin.clone()],
                    "requestBody": json_body("BookPatch"),
                    "responses": {
                        "200": json_response("Whole catalog after the update", book_list),
                        "400": error_response("Invalid input"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [asin.clone()],
                    "responses": {
                        "204": { "description": "Book deleted" },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/{asin}/comments": {
                "get": {
                    "summary": "List a book's comments",
                    "tags": ["Comments"],
                    "parameters": [asin.clone()],
                    "responses": {
                        "200": {
                            "description": "Comments, or a message when the book or its comments are missing",
                            "content": {
                                "application/json": { "schema": comment_list },
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                },
                "post": {
                    "summary": "Add a comment",
                    "tags": ["Comments"],
                    "parameters": [asin.clone()],
                    "requestBody": json_body("NewComment"),
                    "responses": {
                        "200": text_response("Comment added"),
                        "400": error_response("Invalid input"),
                        "404": error_response("Book not found")
                    }
                }
            },
            "/{asin}/comments/{commentId}": {
                "delete": {
                    "summary": "Remove a comment",
                    "tags": ["Comments"],
                    "parameters": [asin, path_param("commentId", "Comment identifier")],
                    "responses": {
                        "200": text_response("Outcome of the removal")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "asin": { "type": "string", "description": "Unique identifier for the book" },
                        "title": { "type": "string" },
                        "category": { "type": "string" },
                        "comments": {
                            "type": "array",
                            "items": { "$ref": "#/components/schemas/Comment" }
                        }
                    },
                    "required": ["asin"],
                    "additionalProperties": true
                },
                "NewBook": {
                    "type": "object",
                    "properties": {
                        "asin": { "type": "string", "description": "Checked for duplicates, never stored" },
                        "title": { "type": "string", "minLength": 1 },
                        "category": { "type": "string", "minLength": 1 }
                    },
                    "required": ["title"],
                    "additionalProperties": true
                },
                "BookPatch": {
                    "type": "object",
                    "properties": {
                        "asin": { "type": "string", "description": "Must match the path when present" },
                        "title": { "type": "string", "minLength": 1 },
                        "category": { "type": "string", "minLength": 1 }
                    },
                    "additionalProperties": true
                },
                "SearchBooks": {
                    "type": "object",
                    "properties": { "title": { "type": "string" } }
                },
                "Comment": {
                    "type": "object",
                    "properties": {
                        "_id": { "type": "string" },
                        "username": { "type": "string" },
                        "comment": { "type": "string" },
                        "_createdDate": { "type": "string", "format": "date-time" }
                    },
                    "required": ["_id", "username", "comment", "_createdDate"]
                },
                "NewComment": {
                    "type": "object",
                    "properties": {
                        "username": { "type": "string", "minLength": 3 },
                        "comment": { "type": "string", "minLength": 3 }
                    },
                    "required": ["username", "comment"]
                }
            }
        }
    })
}
