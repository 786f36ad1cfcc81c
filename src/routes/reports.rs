use axum::{Json, extract::State};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::ReportQuery;
use crate::pipeline::ReportResponse;

pub const MAX_PAGE_SIZE: u32 = 1000;

fn validate(query: &ReportQuery) -> AppResult<()> {
    if query.page_size == 0 {
        return Err(AppError::Validation("page_size must be at least 1".into()));
    }
    if query.page_size > MAX_PAGE_SIZE {
        return Err(AppError::Validation(format!(
            "page_size must not exceed {MAX_PAGE_SIZE}"
        )));
    }
    Ok(())
}

pub async fn create_report(
    State(state): State<AppState>,
    Json(query): Json<ReportQuery>,
) -> AppResult<ReportResponse> {
    validate(&query)?;

    let response = state
        .assembler
        .get_report(&query, state.shutdown.child_token())
        .await?;

    Ok(response)
}
