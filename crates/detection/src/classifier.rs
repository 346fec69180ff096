//! Classifier seam and a TensorFlow-Serving-style REST client.

use std::time::Duration;

use mapping_common::{MappingError, MappingResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::preprocess::Tile;

/// A binary classifier scoring tiles with a settlement probability.
pub trait Classifier {
    /// One score in `[0, 1]` per tile, in input order.
    fn predict(&self, batch: &[Tile]) -> MappingResult<Vec<f32>>;
}

impl<F> Classifier for F
where
    F: Fn(&[Tile]) -> MappingResult<Vec<f32>>,
{
    fn predict(&self, batch: &[Tile]) -> MappingResult<Vec<f32>> {
        self(batch)
    }
}

/// Default request timeout for the REST classifier.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct PredictRequest {
    /// `[tile][row][col][channel]`
    instances: Vec<Vec<Vec<[f32; 3]>>>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Value>,
}

/// Classifier served over HTTP.
///
/// Sends `POST {url}` with `{"instances": [...]}` and expects
/// `{"predictions": [...]}`, one entry per tile. An entry is either a bare
/// score or an array of class scores, in which case the last element is
/// the positive-class score.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>) -> MappingResult<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> MappingResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MappingError::Classifier(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn request_body(batch: &[Tile]) -> PredictRequest {
    let instances = batch
        .iter()
        .map(|tile| {
            (0..tile.height)
                .map(|row| {
                    (0..tile.width)
                        .map(|col| {
                            let p = tile.pixel(row, col);
                            [p[0], p[1], p[2]]
                        })
                        .collect()
                })
                .collect()
        })
        .collect();
    PredictRequest { instances }
}

fn parse_scores(predictions: &[Value], expected: usize) -> MappingResult<Vec<f32>> {
    if predictions.len() != expected {
        return Err(MappingError::Classifier(format!(
            "expected {} predictions, got {}",
            expected,
            predictions.len()
        )));
    }
    predictions
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let score = match value {
                Value::Number(n) => n.as_f64(),
                Value::Array(classes) => classes.last().and_then(Value::as_f64),
                _ => None,
            };
            score.map(|s| s as f32).ok_or_else(|| {
                MappingError::Classifier(format!("prediction {} is not a score: {}", i, value))
            })
        })
        .collect()
}

impl Classifier for HttpClassifier {
    fn predict(&self, batch: &[Tile]) -> MappingResult<Vec<f32>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&request_body(batch))
            .send()
            .map_err(|e| {
                MappingError::Classifier(format!("request to {} failed: {}", self.url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MappingError::Classifier(format!(
                "{} returned {}: {}",
                self.url, status, body
            )));
        }

        let parsed: PredictResponse = response
            .json()
            .map_err(|e| {
                MappingError::Classifier(format!("invalid response from {}: {}", self.url, e))
            })?;
        parse_scores(&parsed.predictions, batch.len())
    }
}
