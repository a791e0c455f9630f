//! Request handlers.
//!
//! Every classification request goes through
//! `Received -> Decoding -> Predicting -> Responding`. A failure in any state
//! ends the request with a structured failure response; it never escapes the
//! handler, so one malformed request cannot affect other requests.

use super::response::{ApiResponse, ClassificationResult};
use crate::app::AppContext;
use crate::core::config::ExecutionMode;
use crate::core::constants::GENERIC_FAILURE_MESSAGE;
use crate::core::errors::{ClassifyError, ClassifyResult, ProcessingStage};
use crate::processors::{ImageDecoder, ImageSource};
use bytes::{BufMut, Bytes};
use futures_util::TryStreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, info_span, Instrument};
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::reply::Response;
use warp::Reply;

/// Multipart part carrying the uploaded image.
pub const IMAGE_PART: &str = "image";

/// JSON key carrying the base64 image.
pub const IMAGE_STRING_FIELD: &str = "imageString";

/// Runs decode and predict for one image and pairs the scores with the
/// configured labels.
///
/// This is the blocking core of every classify route.
pub fn classify(ctx: &AppContext, source: ImageSource) -> ClassifyResult<ClassificationResult> {
    debug!("decoding");
    let decoder = ImageDecoder::new(source)?;
    let input = decoder.to_model_input(Some(ctx.input_resize()))?;

    debug!(shape = ?input.shape(), "predicting");
    let scores = ctx.engine().predict_one(input.into_dyn())?;

    debug!(?scores, "responding");
    ClassificationResult::from_scores(ctx.class_labels(), &scores)
}

/// Runs [`classify`] on the blocking thread pool and waits for it.
pub async fn classify_blocking(
    ctx: Arc<AppContext>,
    source: ImageSource,
) -> ClassifyResult<ClassificationResult> {
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        classify(&ctx, source)
    })
    .await
    .map_err(|e| {
        ClassifyError::processing_error(
            ProcessingStage::Predicting,
            "classification task aborted",
            e,
        )
    })?
}

/// `GET /`
pub async fn handle_home() -> Result<impl Reply, Infallible> {
    Ok(json_reply(
        &ApiResponse::ok("Server is up and running."),
        StatusCode::OK,
    ))
}

/// `POST /classify/withImageFile`
pub async fn handle_classify_file(
    form: FormData,
    ctx: Arc<AppContext>,
) -> Result<Response, Infallible> {
    let span = info_span!("classify", id = ctx.next_request_id(), route = "withImageFile");
    let mode = ctx.mode();

    let outcome = async move {
        let bytes = read_image_part(form).await?;
        classify_blocking(ctx, ImageSource::Binary(bytes)).await
    }
    .instrument(span.clone())
    .await;

    let _entered = span.enter();
    Ok(outcome_response(outcome, mode))
}

/// `POST /classify/withImageString`
pub async fn handle_classify_string(
    body: Bytes,
    ctx: Arc<AppContext>,
) -> Result<Response, Infallible> {
    let span = info_span!("classify", id = ctx.next_request_id(), route = "withImageString");
    let mode = ctx.mode();

    let outcome = async move {
        let source = parse_image_string(&body)?;
        classify_blocking(ctx, source).await
    }
    .instrument(span.clone())
    .await;

    let _entered = span.enter();
    Ok(outcome_response(outcome, mode))
}

/// Extracts the `imageString` field of a JSON body as base64 image text, with
/// any data URL prefix removed.
pub fn parse_image_string(body: &[u8]) -> ClassifyResult<ImageSource> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(ClassifyError::InvalidJson)?;
    let field = value
        .get(IMAGE_STRING_FIELD)
        .ok_or_else(|| ClassifyError::missing_field(IMAGE_STRING_FIELD))?;
    Ok(ImageSource::from_json(field)?.without_data_url_prefix())
}

async fn read_image_part(mut form: FormData) -> ClassifyResult<Vec<u8>> {
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| ClassifyError::invalid_input(format!("malformed multipart body: {}", e)))?
    {
        if part.name() != IMAGE_PART {
            continue;
        }
        return part
            .stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.put(chunk);
                Ok(acc)
            })
            .await
            .map_err(|e| {
                ClassifyError::invalid_input(format!("failed to read multipart part: {}", e))
            });
    }
    Err(ClassifyError::missing_field(IMAGE_PART))
}

fn outcome_response(
    outcome: ClassifyResult<ClassificationResult>,
    mode: ExecutionMode,
) -> Response {
    match outcome {
        Ok(result) => json_reply(&ApiResponse::classified(result), StatusCode::OK),
        Err(err) => failure_response(&err, mode),
    }
}

/// Logs `err` and turns it into a `400` failure response.
///
/// Request-recoverable errors are reported as is. Other errors are only
/// described to the client in development mode.
pub fn failure_response(err: &ClassifyError, mode: ExecutionMode) -> Response {
    error!(class = ?err.class(), error = ?err, "{}", err);
    json_reply(
        &ApiResponse::failure(failure_message(err, mode)),
        StatusCode::BAD_REQUEST,
    )
}

/// Client-facing message for `err`.
pub fn failure_message(err: &ClassifyError, mode: ExecutionMode) -> String {
    if err.is_request_recoverable() || mode.is_development() {
        err.to_string()
    } else {
        GENERIC_FAILURE_MESSAGE.to_string()
    }
}

pub(crate) fn json_reply(body: &ApiResponse, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}
