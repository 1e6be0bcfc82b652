//! Client for the visual-recognition collaborator.
//!
//! The collaborator accepts a multipart upload with one image part and
//! answers with a JSON array of dishes:
//!
//! ```json
//! [{ "name": "Pizza", "recipe": "...", "keywords": ["cheese", "tomato"], "confidence": 0.92 }]
//! ```
//!
//! `recipe` and `confidence` may be omitted. Anything other than a 2xx status
//! with such an array fails the call; no defaults are substituted and the
//! call is never retried.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::error::{KhojError, Result, Stage};
use crate::models::{Detections, DishDetection};

/// Filename sent with the image part.
const UPLOAD_FILE_NAME: &str = "image.jpg";

/// Turns image bytes into dish detections.
#[async_trait]
pub trait DishDetector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> Result<Detections>;
}

/// [`DishDetector`] that calls the recognition service over HTTP.
pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
    field_name: String,
    timeout: Duration,
}

impl HttpDetector {
    pub fn new(url: &str, field_name: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KhojError::Collaborator(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            field_name: field_name.to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.detection.url,
            &config.detection.field_name,
            config.request_timeout(),
        )
    }

    /// Maps a send or body-read error. The client timeout covers both.
    fn transport_error(&self, err: reqwest::Error, what: &str) -> KhojError {
        if err.is_timeout() {
            KhojError::Timeout {
                stage: Stage::Detection,
                after: self.timeout,
            }
        } else {
            KhojError::Collaborator(format!("{}: {}", what, err))
        }
    }
}

#[async_trait]
impl DishDetector for HttpDetector {
    async fn detect(&self, image: &[u8]) -> Result<Detections> {
        if image.is_empty() {
            return Err(KhojError::Input("uploaded image is empty".to_string()));
        }

        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("application/octet-stream")
            .map_err(|e| KhojError::Collaborator(format!("invalid upload part: {}", e)))?;
        let form = reqwest::multipart::Form::new().part(self.field_name.clone(), part);

        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e, &format!("request to {} failed", self.url)))?;

        let status = response.status();
        tracing::debug!(status = %status, url = %self.url, "detection service responded");
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(KhojError::Collaborator(format!(
                "detection service returned {}: {}",
                status, body_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, "unreadable response body"))?;
        let detections = parse_detections(&body)?;

        tracing::info!(
            dishes = detections.len(),
            image_bytes = image.len(),
            latency_ms = %started.elapsed().as_millis(),
            "detection completed"
        );
        Ok(detections)
    }
}

/// Parses the collaborator's response body.
///
/// An object carrying an `error` string is reported with that message.
pub fn parse_detections(body: &str) -> Result<Detections> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| KhojError::Collaborator(format!("response is not JSON: {}", e)))?;

    if let Some(message) = value.get("error").and_then(Value::as_str) {
        return Err(KhojError::Collaborator(format!(
            "detection service reported: {}",
            message
        )));
    }

    let dishes: Vec<DishDetection> = serde_json::from_value(value).map_err(|e| {
        KhojError::Collaborator(format!("response is not a list of dishes: {}", e))
    })?;
    Ok(dishes.into_iter().collect())
}
