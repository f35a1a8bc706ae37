//! Wire format of the model endpoint
//!
//! Request:
//!
//! ```json
//! {"target": [[0.1, 0.2]], "start": "2014-01-01 00:00:00", "source": []}
//! ```
//!
//! Response:
//!
//! ```json
//! {"forecasts": {"samples": [[[0.3]]], "start_date": "2014-01-01 02:00:00", "freq": "1H"},
//!  "agg_metrics": "{\"RMSE\": 0.12}"}
//! ```
//!
//! `agg_metrics` arrives as a JSON document encoded inside a string. It is
//! decoded as a second document; a plain object is accepted as well. The codec
//! only marshals values, it never rescales them.

use crate::data::{format_timestamp, parse_timestamp, Frequency};
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastRequest, ForecastResponse, SamplePaths};
use crate::metrics::ItemMetrics;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Request body sent to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    /// Series-major history
    pub target: Vec<Vec<f64>>,
    pub start: String,
    /// Covariates, empty when there are none
    pub source: Vec<Vec<f64>>,
}

/// Marshal a request for the endpoint
pub fn encode_request(request: &ForecastRequest) -> WireRequest {
    WireRequest {
        target: request.target().to_vec(),
        start: format_timestamp(&request.start()),
        source: request.covariates().to_vec(),
    }
}

/// Marshal a request straight to a JSON body
pub fn encode_request_json(request: &ForecastRequest) -> Result<String> {
    Ok(serde_json::to_string(&encode_request(request))?)
}

/// Parse a request body, as a serving endpoint would
pub fn decode_request(body: &str) -> Result<ForecastRequest> {
    let root = parse_document(body)?;
    let object = as_object(&root, "request")?;

    let target = matrix(field(object, "target", "request")?, "target")?;
    let start = timestamp(field(object, "start", "request")?, "start")?;
    let source = match object.get("source") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => matrix(value, "source")?,
    };

    ForecastRequest::new(target, start, source)
}

/// Parse the endpoint's response body
pub fn decode_response(body: &str) -> Result<ForecastResponse> {
    let root = parse_document(body)?;
    let object = as_object(&root, "response")?;

    let forecasts = as_object(field(object, "forecasts", "response")?, "forecasts")?;
    let samples = SamplePaths::new(tensor3(field(forecasts, "samples", "forecasts")?)?)?;
    let start = timestamp(field(forecasts, "start_date", "forecasts")?, "start_date")?;
    let freq = match field(forecasts, "freq", "forecasts")? {
        Value::String(raw) => raw
            .parse::<Frequency>()
            .map_err(|e| ForecastError::ProtocolError(format!("Bad freq '{}': {}", raw, e)))?,
        other => {
            return Err(ForecastError::ProtocolError(format!(
                "freq must be a string, got {}",
                other
            )))
        }
    };

    let agg_metrics = metric_map(&embedded(field(object, "agg_metrics", "response")?, "agg_metrics")?)?;
    let item_metrics = match object.get("item_metrics") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => {
            let items = embedded(value, "item_metrics")?;
            serde_json::from_value::<Vec<ItemMetrics>>(items).map_err(|e| {
                ForecastError::ProtocolError(format!("Bad item_metrics: {}", e))
            })?
        }
    };

    Ok(ForecastResponse {
        samples,
        start,
        freq,
        agg_metrics,
        item_metrics,
    })
}

/// Render a response body, as a serving endpoint would.
///
/// `agg_metrics` and `item_metrics` are written as JSON-encoded strings the
/// way the endpoint does; non-finite metric values become `null`.
pub fn encode_response(response: &ForecastResponse) -> Result<String> {
    let agg: Map<String, Value> = response
        .agg_metrics
        .iter()
        .map(|(key, value)| (key.clone(), finite_or_null(*value)))
        .collect();

    let mut body = serde_json::json!({
        "forecasts": {
            "samples": response.samples.as_nested(),
            "start_date": format_timestamp(&response.start),
            "freq": response.freq.to_string(),
        },
        "agg_metrics": serde_json::to_string(&agg)?,
    });
    if !response.item_metrics.is_empty() {
        body["item_metrics"] = Value::String(serde_json::to_string(&response.item_metrics)?);
    }
    Ok(serde_json::to_string(&body)?)
}

fn finite_or_null(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn parse_document(body: &str) -> Result<Value> {
    serde_json::from_str(&strict_json(body))
        .map_err(|e| ForecastError::ProtocolError(format!("Invalid JSON: {}", e)))
}

/// Python's encoder writes bare `NaN` and `Infinity` tokens, which are not
/// JSON. Outside string literals they are rewritten to `null`.
fn strict_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = ["NaN", "-Infinity", "Infinity"]
            .iter()
            .find(|t| rest.starts_with(**t))
        {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ForecastError::ProtocolError(format!("{} must be a JSON object", what)))
}

fn field<'a>(object: &'a Map<String, Value>, name: &str, parent: &str) -> Result<&'a Value> {
    object.get(name).ok_or_else(|| {
        ForecastError::ProtocolError(format!("Missing field '{}' in {}", name, parent))
    })
}

fn timestamp(value: &Value, name: &str) -> Result<chrono::NaiveDateTime> {
    match value {
        Value::String(raw) => parse_timestamp(raw)
            .map_err(|e| ForecastError::ProtocolError(format!("Bad {}: {}", name, e))),
        other => Err(ForecastError::ProtocolError(format!(
            "{} must be a timestamp string, got {}",
            name, other
        ))),
    }
}

/// A field that may hold a JSON document encoded as a string
fn embedded(value: &Value, name: &str) -> Result<Value> {
    match value {
        Value::String(raw) => serde_json::from_str(&strict_json(raw)).map_err(|e| {
            ForecastError::ProtocolError(format!("{} is not an encoded JSON document: {}", name, e))
        }),
        other => Ok(other.clone()),
    }
}

fn metric_map(value: &Value) -> Result<BTreeMap<String, f64>> {
    as_object(value, "agg_metrics")?
        .iter()
        .map(|(key, v)| match v {
            Value::Number(n) => n.as_f64().map(|f| (key.clone(), f)).ok_or_else(|| {
                ForecastError::ProtocolError(format!("Metric '{}' is not a float", key))
            }),
            Value::Null => Ok((key.clone(), f64::NAN)),
            other => Err(ForecastError::ProtocolError(format!(
                "Metric '{}' must be a number, got {}",
                key, other
            ))),
        })
        .collect()
}

fn number(value: &Value, name: &str) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ForecastError::ProtocolError(format!("{} holds a non-float", name))),
        Value::Array(_) => Err(ForecastError::ShapeMismatch(format!(
            "{} has an array where a number was expected",
            name
        ))),
        other => Err(ForecastError::ProtocolError(format!(
            "{} holds {} where a number was expected",
            name, other
        ))),
    }
}

fn array<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Number(_) => Err(ForecastError::ShapeMismatch(format!(
            "{} has a number where an array was expected",
            name
        ))),
        other => Err(ForecastError::ProtocolError(format!(
            "{} holds {} where an array was expected",
            name, other
        ))),
    }
}

fn vector(value: &Value, name: &str) -> Result<Vec<f64>> {
    array(value, name)?.iter().map(|v| number(v, name)).collect()
}

fn matrix(value: &Value, name: &str) -> Result<Vec<Vec<f64>>> {
    array(value, name)?.iter().map(|row| vector(row, name)).collect()
}

fn tensor3(value: &Value) -> Result<Vec<Vec<Vec<f64>>>> {
    array(value, "samples")?
        .iter()
        .map(|sample| matrix(sample, "samples"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_json_rewrites_python_tokens() {
        assert_eq!(
            strict_json(r#"{"MASE": NaN, "x": -Infinity, "NaN": "NaN"}"#),
            r#"{"MASE": null, "x": null, "NaN": "NaN"}"#
        );
        assert_eq!(strict_json(r#"{"a": "say \"NaN\""}"#), r#"{"a": "say \"NaN\""}"#);
    }

    #[test]
    fn test_encode_request_fields() {
        let start = parse_timestamp("2014-01-01 00:00:00").unwrap();
        let request = ForecastRequest::new(vec![vec![0.5, 1.0]], start, Vec::new()).unwrap();
        let wire = encode_request(&request);
        assert_eq!(wire.start, "2014-01-01 00:00:00");
        assert_eq!(wire.target, vec![vec![0.5, 1.0]]);
        assert!(wire.source.is_empty());

        let body = encode_request_json(&request).unwrap();
        assert!(body.contains("\"source\":[]"));
    }
}
