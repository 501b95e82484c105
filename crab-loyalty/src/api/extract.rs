//! Extractors whose rejections use the `AppError` envelope

use axum::extract::{FromRequest, FromRequestParts};
use shared::error::AppError;

/// JSON body; malformed input answers 400 with an error code
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string, rejected like [`AppJson`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path parameters, rejected like [`AppJson`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
