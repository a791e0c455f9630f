//! Route table of the HTTP API.

use super::handlers::{handle_classify_file, handle_classify_string, handle_home, json_reply};
use super::response::ApiResponse;
use crate::app::AppContext;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Builds every route of the service around a shared context.
///
/// | Method | Path                          | Body                                   |
/// |--------|-------------------------------|----------------------------------------|
/// | GET    | `/`                           | none                                   |
/// | POST   | `/classify/withImageFile`     | multipart form, image in part `image`  |
/// | POST   | `/classify/withImageString`   | JSON object with `imageString`         |
pub fn routes(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let limit = ctx.max_upload_bytes();

    let home = warp::path::end().and(warp::get()).and_then(handle_home);

    let classify = warp::path("classify");

    let with_file = classify
        .and(warp::path("withImageFile"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(limit))
        .and(with_context(ctx.clone()))
        .and_then(handle_classify_file);

    let with_string = classify
        .and(warp::path("withImageString"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(limit))
        .and(warp::body::bytes())
        .and(with_context(ctx))
        .and_then(handle_classify_string);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    home.or(with_file)
        .or(with_string)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn with_context(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (Arc<AppContext>,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Reply to any request the route filters reject for a reason other than
/// path, method or size.
pub const MALFORMED_REQUEST_MESSAGE: &str = "malformed request. send a multipart form with an \
     'image' part, or a JSON object with 'imageString'.";

/// Turns filter rejections into failure envelopes.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "route not found.".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed.".to_string(),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "request body exceeds the upload limit.".to_string(),
        )
    } else {
        (StatusCode::BAD_REQUEST, MALFORMED_REQUEST_MESSAGE.to_string())
    };
    debug!(status = status.as_u16(), "request rejected: {:?}", err);
    Ok(json_reply(&ApiResponse::failure(message), status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ExecutionMode, ServiceConfig};
    use crate::core::constants::GENERIC_FAILURE_MESSAGE;
    use crate::core::testing::{rgb_png, FailingClassifier, MeanSoftmaxClassifier};
    use crate::core::traits::ImageClassifier;
    use crate::predictors::InferenceEngine;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::Value;

    const BOUNDARY: &str = "----classify-test-boundary";

    fn context_with(model: Arc<dyn ImageClassifier>, mode: ExecutionMode) -> Arc<AppContext> {
        let config = ServiceConfig {
            mode,
            max_upload_bytes: 64 * 1024,
            ..ServiceConfig::default()
        };
        let engine = InferenceEngine::from_model(model, (16, 16));
        Arc::new(AppContext::new(engine, &config).unwrap())
    }

    fn context() -> Arc<AppContext> {
        context_with(
            Arc::new(MeanSoftmaxClassifier { shape: None }),
            ExecutionMode::Production,
        )
    }

    fn multipart_body(part: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{part}\"; filename=\"upload.png\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    fn score_sum(value: &Value) -> f32 {
        value["mlOutput"]
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_str().unwrap().parse::<f32>().unwrap())
            .sum()
    }

    #[tokio::test]
    async fn test_home() {
        let resp = warp::test::request()
            .method("GET")
            .path("/")
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 200);
        let body = json(resp.body());
        assert_eq!(body["result"], "success");
        assert_eq!(body["message"], "Server is up and running.");
    }

    #[tokio::test]
    async fn test_classify_file() {
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageFile")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body("image", &rgb_png(40, 30)))
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 200);

        let body = json(resp.body());
        assert_eq!(body["result"], "success");
        let labels: Vec<_> = body["mlOutput"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(labels, vec!["Cat", "Dog"]);
        assert!((score_sum(&body) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_classify_file_missing_part() {
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageFile")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart_body("picture", &rgb_png(8, 8)))
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 400);
        let body = json(resp.body());
        assert_eq!(body["result"], "failure");
        assert!(body["message"].as_str().unwrap().contains("image"));
        assert!(body.get("mlOutput").is_none());
    }

    #[tokio::test]
    async fn test_classify_string_with_data_url() {
        let encoded = STANDARD.encode(rgb_png(20, 20));
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageString")
            .header("content-type", "application/json")
            .body(
                serde_json::json!({ "imageString": format!("data:image/png;base64,{encoded}") })
                    .to_string(),
            )
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 200);
        assert!((score_sum(&json(resp.body())) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_classify_string_missing_key() {
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageString")
            .body("{}")
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 400);
        let body = json(resp.body());
        assert_eq!(body["result"], "failure");
        assert!(body["message"].as_str().unwrap().contains("imageString"));
    }

    #[tokio::test]
    async fn test_classify_string_bad_inputs() {
        for payload in [
            r#"{"imageString": "%%% not base64 %%%"}"#,
            r#"{"imageString": 42}"#,
            r#"{"imageString": "QUJDRA=="}"#,
            "not json",
        ] {
            let resp = warp::test::request()
                .method("POST")
                .path("/classify/withImageString")
                .body(payload)
                .reply(&routes(context()))
                .await;
            assert_eq!(resp.status(), 400, "payload {payload}");
            assert_eq!(json(resp.body())["result"], "failure");
        }
    }

    #[tokio::test]
    async fn test_internal_errors_hidden_in_production() {
        let ctx = context_with(Arc::new(FailingClassifier), ExecutionMode::Production);
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageString")
            .body(serde_json::json!({ "imageString": STANDARD.encode(rgb_png(8, 8)) }).to_string())
            .reply(&routes(ctx))
            .await;
        assert_eq!(resp.status(), 400);
        let body = json(resp.body());
        assert_eq!(body["message"], GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_internal_errors_detailed_in_development() {
        let ctx = context_with(Arc::new(FailingClassifier), ExecutionMode::Development);
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageString")
            .body(serde_json::json!({ "imageString": STANDARD.encode(rgb_png(8, 8)) }).to_string())
            .reply(&routes(ctx))
            .await;
        assert_eq!(resp.status(), 400);
        let message = json(resp.body())["message"].as_str().unwrap().to_string();
        assert!(message.contains("forward pass"));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageString")
            .body(vec![b'a'; 128 * 1024])
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 413);
        assert_eq!(json(resp.body())["result"], "failure");
    }

    #[tokio::test]
    async fn test_malformed_request_gets_fixed_message() {
        let resp = warp::test::request()
            .method("POST")
            .path("/classify/withImageFile")
            .body(rgb_png(8, 8))
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 400);
        let body = json(resp.body());
        assert_eq!(body["result"], "failure");
        assert_eq!(body["message"], MALFORMED_REQUEST_MESSAGE);
        assert!(!body["message"].as_str().unwrap().contains("Missing"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let resp = warp::test::request()
            .method("GET")
            .path("/nope")
            .reply(&routes(context()))
            .await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_service_survives_failures() {
        let routes = routes(context());
        let bad = warp::test::request()
            .method("POST")
            .path("/classify/withImageString")
            .body("{}")
            .reply(&routes)
            .await;
        assert_eq!(bad.status(), 400);

        let good = warp::test::request()
            .method("POST")
            .path("/classify/withImageString")
            .body(serde_json::json!({ "imageString": STANDARD.encode(rgb_png(8, 8)) }).to_string())
            .reply(&routes)
            .await;
        assert_eq!(good.status(), 200);
    }
}
