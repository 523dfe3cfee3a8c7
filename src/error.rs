// Parking Vecinal - Handler error type
// Anything a handler cannot recover from is logged server-side and
// rendered as the generic 500 page; no internal detail reaches the
// client.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::views;

#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "handler failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(views::internal_error_page()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
