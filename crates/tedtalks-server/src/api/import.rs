use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use tedtalks_core::csv_import::{parse_csv, ImportError, ImportOutcome, MAX_IMPORT_BYTES};

use crate::middleware::{AuthenticatedUser, RequestId, Role};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub imported: u64,
    pub skipped: u64,
    pub warnings: Vec<String>,
}

impl ImportResponse {
    fn from_outcome(outcome: &ImportOutcome) -> Self {
        let message = match outcome {
            ImportOutcome::Success { .. } => "CSV import completed successfully".to_string(),
            ImportOutcome::Partial { skipped, .. } => {
                format!("CSV import completed ({skipped} records skipped due to errors)")
            }
        };
        Self {
            message,
            imported: outcome.imported(),
            skipped: outcome.skipped(),
            warnings: outcome.warnings().to_vec(),
        }
    }
}

/// Accepts a multipart upload under the `file` field, parses it as a talk
/// CSV, and bulk-inserts the valid rows in a single statement. Admin only.
pub async fn import_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    if user.role != Role::Admin {
        return Err(ApiError::new(
            req_id.0,
            "forbidden",
            "admin role required for CSV import",
        ));
    }

    let (filename, content) = read_file_field(&mut multipart)
        .await
        .map_err(|message| ApiError::new(req_id.0.clone(), "bad_request", message))?;

    let batch = parse_csv(&filename, &content, MAX_IMPORT_BYTES)
        .map_err(|e| map_import_error(req_id.0.clone(), &e))?;

    let inserted = tedtalks_db::insert_talks(&state.pool, &batch.talks)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let outcome = ImportOutcome::new(inserted.len() as u64, batch.skipped, batch.warnings);
    tracing::info!(
        file = %filename,
        imported = outcome.imported(),
        skipped = outcome.skipped(),
        "CSV import finished"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: ImportResponse::from_outcome(&outcome),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("invalid multipart body: {e}"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| format!("failed to read uploaded file: {e}"))?;
        return Ok((filename, content.to_vec()));
    }
    Err("multipart field 'file' is required".to_string())
}

fn map_import_error(request_id: String, error: &ImportError) -> ApiError {
    match error {
        ImportError::InvalidFileFormat(_) => ApiError::new(
            request_id,
            "bad_request",
            "Invalid file format. Only CSV files are accepted",
        ),
        ImportError::FileTooLarge { .. }
        | ImportError::MissingColumn(_)
        | ImportError::Malformed(_) => {
            ApiError::new(request_id, "bad_request", error.to_string())
        }
        ImportError::NoValidRecords => ApiError::new(
            request_id,
            "unprocessable",
            "no valid records found in CSV file",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_response_message_reflects_outcome() {
        let success = ImportOutcome::new(3, 0, Vec::new());
        let response = ImportResponse::from_outcome(&success);
        assert_eq!(response.message, "CSV import completed successfully");
        assert_eq!(response.imported, 3);
        assert!(response.warnings.is_empty());

        let partial = ImportOutcome::new(2, 1, vec!["row 3: views cannot be empty".to_string()]);
        let response = ImportResponse::from_outcome(&partial);
        assert_eq!(
            response.message,
            "CSV import completed (1 records skipped due to errors)"
        );
        assert_eq!(response.skipped, 1);
        assert_eq!(response.warnings.len(), 1);
    }

    #[test]
    fn import_error_mapping_uses_expected_codes() {
        let bad_format = map_import_error(
            "r1".to_string(),
            &ImportError::InvalidFileFormat("notes.txt".to_string()),
        );
        assert_eq!(bad_format.error.code, "bad_request");
        assert_eq!(
            bad_format.error.message,
            "Invalid file format. Only CSV files are accepted"
        );

        let empty = map_import_error("r2".to_string(), &ImportError::NoValidRecords);
        assert_eq!(empty.error.code, "unprocessable");

        let missing = map_import_error("r3".to_string(), &ImportError::MissingColumn("views"));
        assert_eq!(missing.error.code, "bad_request");
        assert!(missing.error.message.contains("views"));
    }
}
