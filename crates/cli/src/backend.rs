//! HTTP translate backend speaking the LibreTranslate-style JSON protocol.

use anyhow::{Context, Result};
use ppt_translate_core::{LanguagePair, Translate, TranslateError};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for `POST <endpoint>`
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

/// A translate capability backed by an HTTP service for one language pair.
pub struct HttpTranslator {
    client: Client,
    endpoint: String,
    pair: LanguagePair,
    model: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTranslator {
    /// `timeout` bounds the whole request and is reported as
    /// [`TranslateError::Timeout`]; `None` waits indefinitely.
    pub fn new(
        endpoint: impl Into<String>,
        pair: LanguagePair,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            pair,
            model,
            timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> TranslateError {
        match self.timeout {
            Some(timeout) if e.is_timeout() => TranslateError::Timeout(timeout),
            _ if e.is_connect() => TranslateError::Disconnected,
            _ => TranslateError::Backend(format!("request to {} failed: {}", self.endpoint, e)),
        }
    }

    fn request<'a>(&'a self, text: &'a str) -> TranslateRequest<'a> {
        TranslateRequest {
            q: text,
            source: &self.pair.source,
            target: &self.pair.target,
            format: "text",
            model: self.model.as_deref(),
        }
    }
}

impl Translate for HttpTranslator {
    fn translate(&self, text: &str) -> std::result::Result<String, TranslateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request(text))
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranslateError::Backend(format!(
                "{} returned {}: {}",
                self.endpoint,
                status,
                body.trim()
            )));
        }

        let parsed: TranslateResponse = response.json().map_err(|e| match self.timeout {
            Some(timeout) if e.is_timeout() => TranslateError::Timeout(timeout),
            _ => TranslateError::Backend(format!("invalid response: {}", e)),
        })?;
        Ok(parsed.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_request_body() {
        let translator = HttpTranslator::new(
            "http://127.0.0.1:5000/translate",
            LanguagePair::new("en", "ru").unwrap(),
            None,
            None,
        )
        .unwrap();

        let body = serde_json::to_value(translator.request("Hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "q": "Hello", "source": "en", "target": "ru", "format": "text" })
        );
    }

    #[test]
    fn test_request_body_with_model() {
        let translator = HttpTranslator::new(
            "http://127.0.0.1:5000/translate",
            LanguagePair::new("ru", "en").unwrap(),
            Some("opus-mt-ru-en".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();

        let body = serde_json::to_value(translator.request("Привет")).unwrap();
        assert_eq!(body["model"], "opus-mt-ru-en");
        assert_eq!(body["source"], "ru");
    }

    #[test]
    fn test_response_parsing() {
        let parsed: TranslateResponse =
            serde_json::from_str(r#"{"translatedText": "Привет", "detectedLanguage": null}"#)
                .unwrap();
        assert_eq!(parsed.translated_text, "Привет");
    }

    #[test]
    fn test_refused_connection_is_disconnected() {
        // Bind then release a port so nothing is listening on it.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let translator = HttpTranslator::new(
            format!("http://127.0.0.1:{}/translate", port),
            LanguagePair::new("en", "ru").unwrap(),
            None,
            Some(Duration::from_secs(2)),
        )
        .unwrap();

        assert_eq!(translator.translate("Hello"), Err(TranslateError::Disconnected));
    }

    #[test]
    fn test_silent_server_times_out() {
        // Accepts connections (via the backlog) but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let timeout = Duration::from_millis(200);
        let translator = HttpTranslator::new(
            format!("http://{}/translate", listener.local_addr().unwrap()),
            LanguagePair::new("en", "ru").unwrap(),
            None,
            Some(timeout),
        )
        .unwrap();

        assert_eq!(translator.translate("Hello"), Err(TranslateError::Timeout(timeout)));
        drop(listener);
    }
}
