use std::time::Duration;

use serde_json::{json, Value};

use crate::error::StockscanError;
use crate::oracle::{HeaderOracle, HEADER_INSTRUCTIONS};

/// Header oracle backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiOracle {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, StockscanError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn request_body(&self, csv: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": HEADER_INSTRUCTIONS },
                { "role": "user", "content": csv },
            ],
        })
    }
}

impl HeaderOracle for OpenAiOracle {
    fn complete(&self, csv: &str) -> Result<String, StockscanError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(csv))
            .send()
            .map_err(|e| StockscanError::Oracle(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StockscanError::Oracle(format!("{status}: {body}")));
        }

        let body: Value = response
            .json()
            .map_err(|e| StockscanError::Oracle(e.to_string()))?;
        reply_content(&body)
    }
}

/// Text of the first choice in a chat-completions response.
fn reply_content(body: &Value) -> Result<String, StockscanError> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StockscanError::Oracle("response has no message content".into()))
}
