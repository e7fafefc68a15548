use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;

use crate::error::AppError;
use crate::flash::Flash;

/// Advances the visitor's flash state before the handler runs
///
/// A message shown on the previous request is marked for removal, and one
/// already marked is wiped, so each message is rendered for exactly one
/// follow-up request after the one that raised it.
pub async fn flash_middleware(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mut flash = Flash::load(&session).await?;
    if flash.tick() {
        flash.save(&session).await?;
    }

    Ok(next.run(request).await)
}
