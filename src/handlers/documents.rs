use crate::{
    models::{Document, DocumentSummary, ErrorResponse},
    ws::DocumentStore,
    AppState,
};
use axum::{extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, warn};

/// List the documents held in memory
pub async fn list_documents(State(app_state): State<Arc<AppState>>) -> Json<Vec<DocumentSummary>> {
    let docs = app_state.documents.list();
    debug!("Listing {} documents", docs.len());
    Json(docs)
}

/// Fetch one document, including its content and current participants
pub async fn get_document(
    State(app_state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<(StatusCode, Json<Document>), (StatusCode, Json<ErrorResponse>)> {
    match app_state.documents.get(&doc_id) {
        Some(doc) => Ok((StatusCode::OK, Json(doc))),
        None => {
            warn!("Document '{}' not found", doc_id);
            Err(ErrorResponse::reply(
                StatusCode::NOT_FOUND,
                format!("Document '{}' not found", doc_id),
            ))
        }
    }
}
