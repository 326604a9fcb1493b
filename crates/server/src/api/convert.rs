//! Conversion API handlers: synchronous conversion and background jobs.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use sizefit_core::{
    ConversionOutcome, ConversionRequest, EncoderCapabilities, GpuVendor, JobError, JobId,
    JobRecord, JobStatus, MediaCategory, OptionsRecord, ParameterValue, RawOptions,
};

use crate::metrics::UPLOAD_BYTES;
use crate::state::AppState;
use crate::storage::{output_name, secure_filename};

// ============================================================================
// Request/Response types
// ============================================================================

/// Fields of the conversion form.
#[derive(Debug, Default)]
pub struct ConvertForm {
    pub file: Option<UploadedFile>,
    pub output_filename: Option<String>,
    pub compress: bool,
    pub advanced: bool,
    pub options: RawOptions,
}

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_parameter: Option<ParameterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    pub attempts: usize,
    pub forced: bool,
}

impl ConvertResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            download_url: None,
            chosen_parameter: None,
            output_size: None,
            attempts: 0,
            forced: false,
        }
    }

    fn from_outcome(outcome: ConversionOutcome, download_url: Option<String>) -> Self {
        Self {
            success: outcome.success,
            message: outcome.message,
            download_url,
            chosen_parameter: outcome.chosen_parameter,
            output_size: outcome.output_size,
            attempts: outcome.attempts,
            forced: outcome.forced,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobAcceptedResponse {
    pub job_id: JobId,
    pub status_url: String,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    #[serde(flatten)]
    pub record: JobRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type FormRejection = (StatusCode, Json<ConvertResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> FormRejection {
    (status, Json(ConvertResponse::failure(message)))
}

/// Download URL for a file in the converted directory.
pub fn download_url(name: &str) -> String {
    format!("/api/v1/download/{}", name)
}

// ============================================================================
// Form handling
// ============================================================================

/// Checkbox values accepted as "on".
fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "on" | "true" | "1"
    )
}

/// Hardware vendor a video request asks for that this host did not report.
fn unavailable_gpu(
    capabilities: &EncoderCapabilities,
    request: &ConversionRequest,
) -> Option<GpuVendor> {
    let gpu = request.options.gpu;
    (request.category == MediaCategory::Video
        && gpu.is_hardware()
        && !capabilities.supports(gpu))
    .then_some(gpu)
}

async fn text_field(field: Field<'_>) -> Result<Option<String>, FormRejection> {
    let name = field.name().unwrap_or_default().to_string();
    let text = field.text().await.map_err(|e| {
        reject(
            e.status(),
            format!("Failed to read form field {}: {}", name, e.body_text()),
        )
    })?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Reads the multipart conversion form. Unknown fields are ignored.
pub async fn read_form(mut multipart: Multipart) -> Result<ConvertForm, FormRejection> {
    let mut form = ConvertForm::default();

    loop {
        let field = multipart.next_field().await.map_err(|e| {
            reject(e.status(), format!("Invalid form data: {}", e.body_text()))
        })?;
        let Some(field) = field else { break };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| {
                    reject(
                        e.status(),
                        format!("Failed to read file: {}", e.body_text()),
                    )
                })?;
                form.file = Some(UploadedFile { filename, data });
            }
            "output_filename" => form.output_filename = text_field(field).await?,
            "compress" => form.compress = text_field(field).await?.is_some_and(|v| is_checked(&v)),
            "advanced" => form.advanced = text_field(field).await?.is_some_and(|v| is_checked(&v)),
            "target_size" => form.options.target_size = text_field(field).await?,
            "target_bitrate" => form.options.target_bitrate = text_field(field).await?,
            "target_resolution" => form.options.target_resolution = text_field(field).await?,
            "quality" => form.options.quality = text_field(field).await?,
            "gpu" => form.options.gpu = text_field(field).await?,
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Saves the upload and builds the conversion request.
///
/// Returns the request and the sanitized output file name.
async fn prepare_request(
    state: &AppState,
    form: ConvertForm,
) -> Result<(ConversionRequest, String), FormRejection> {
    let file = form
        .file
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "No file provided"))?;
    if file.filename.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "No file selected"));
    }

    let upload_name = secure_filename(&file.filename)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Invalid file name"))?;
    let out_name = output_name(form.output_filename.as_deref(), &upload_name)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Invalid output file name"))?;

    let storage = state.storage();
    let source = storage.upload_path(&upload_name);
    tokio::fs::write(&source, &file.data).await.map_err(|e| {
        tracing::error!(path = %source.display(), error = %e, "Failed to save upload");
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save uploaded file",
        )
    })?;
    UPLOAD_BYTES.observe(file.data.len() as f64);

    let request = ConversionRequest::new(source, storage.output_path(&out_name))
        .with_compress(form.compress)
        .with_advanced(form.advanced)
        .with_options(OptionsRecord::from_raw(&form.options))
        .with_cleanup_source(true);

    tracing::info!(
        request_id = %request.id,
        upload = %upload_name,
        output = %out_name,
        category = %request.category,
        bytes = file.data.len(),
        "Accepted upload"
    );
    if let Some(gpu) = unavailable_gpu(state.capabilities(), &request) {
        tracing::warn!(
            request_id = %request.id,
            encoder = gpu.h264_encoder(),
            "Requested hardware encoder was not detected; the conversion will likely fail"
        );
    }

    Ok((request, out_name))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/convert
///
/// Convert an uploaded file and wait for the result.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>, FormRejection> {
    let form = read_form(multipart).await?;
    let (request, out_name) = prepare_request(&state, form).await?;

    match state.jobs().run(request).await {
        Ok(outcome) => {
            if outcome.success {
                Ok(Json(ConvertResponse::from_outcome(
                    outcome,
                    Some(download_url(&out_name)),
                )))
            } else {
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ConvertResponse::from_outcome(outcome, None)),
                ))
            }
        }
        Err(e) => Err(reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// POST /api/v1/jobs
///
/// Queue a conversion and return immediately.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), FormRejection> {
    let form = read_form(multipart).await?;
    let (request, _) = prepare_request(&state, form).await?;

    let job_id = state.jobs().submit(request).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAcceptedResponse {
            job_id,
            status_url: format!("/api/v1/jobs/{}", job_id),
        }),
    ))
}

/// GET /api/v1/jobs/{id}
///
/// Poll a background job.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, (StatusCode, Json<ErrorResponse>)> {
    let record = match id.parse::<JobId>() {
        Ok(job_id) => state.jobs().status(&job_id).await,
        Err(e) => Err(e),
    };

    match record {
        Ok(record) => {
            let download_url = match &record.status {
                JobStatus::Finished { outcome } if outcome.success => {
                    Some(download_url(&record.output_name))
                }
                _ => None,
            };
            Ok(Json(JobResponse {
                record,
                download_url,
            }))
        }
        Err(JobError::NotFound(id)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Job not found: {}", id),
            }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_checked() {
        assert!(is_checked("y"));
        assert!(is_checked("Y"));
        assert!(is_checked("on"));
        assert!(is_checked("true"));
        assert!(!is_checked("n"));
        assert!(!is_checked(""));
        assert!(!is_checked("no"));
    }

    #[test]
    fn test_failure_response_shape() {
        let json = serde_json::to_value(ConvertResponse::failure("No file provided")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "No file provided");
        assert!(json.get("download_url").is_none());
    }

    #[test]
    fn test_unavailable_gpu() {
        let caps = EncoderCapabilities::from_encoder_list("V....D h264_nvenc  NVENC");
        let request = |dest: &str, gpu| {
            ConversionRequest::new("in.mkv", dest)
                .with_options(OptionsRecord::default().with_gpu(gpu))
        };

        assert_eq!(unavailable_gpu(&caps, &request("out.mp4", GpuVendor::Nvidia)), None);
        assert_eq!(unavailable_gpu(&caps, &request("out.mp4", GpuVendor::None)), None);
        assert_eq!(
            unavailable_gpu(&caps, &request("out.mp4", GpuVendor::Amd)),
            Some(GpuVendor::Amd)
        );
        assert_eq!(unavailable_gpu(&caps, &request("out.mp3", GpuVendor::Amd)), None);
    }

    #[test]
    fn test_download_url() {
        assert_eq!(download_url("out.jpg"), "/api/v1/download/out.jpg");
    }
}
