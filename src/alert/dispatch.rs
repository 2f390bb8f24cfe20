//! Alert Dispatcher boundary.
//!
//! The scorer hands a dispatcher nothing but the risk score; formatting and
//! routing the message is the dispatcher's job. A send either returns a
//! provider receipt or a `DispatchError`. Callers decide what a failure
//! means; the scorer only records it as `alert_fired = false`.

use std::time::Duration;

use serde::Deserialize;

use crate::config::SmsConfig;

/// Default REST endpoint of the SMS provider.
pub const SMS_API_BASE_URL: &str = "https://api.twilio.com";

const SMS_TIMEOUT_SECS: u64 = 10;

/// Sends high-risk alerts somewhere a human will see them.
pub trait AlertDispatcher: Send + Sync {
    /// Sends an alert for `risk_score`, returning a provider receipt on success.
    fn send(&self, risk_score: f64) -> Result<String, DispatchError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// Alerting is switched off or not configured.
    Disabled(String),
    /// The provider could not be reached.
    Transport(String),
    /// Non-2xx HTTP response from the provider.
    HttpError(u16),
    /// The provider's response body could not be understood.
    ParseError(String),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Disabled(reason) => write!(f, "Alerting disabled: {}", reason),
            DispatchError::Transport(msg) => write!(f, "Transport error: {}", msg),
            DispatchError::HttpError(code) => write!(f, "HTTP error: {}", code),
            DispatchError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Message body sent for a high-risk score.
pub fn alert_message(risk_score: f64) -> String {
    format!("⚠️ HIGH RISK ALERT! Water disease risk score: {:.2}", risk_score)
}

// ---------------------------------------------------------------------------
// SMS dispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

/// Sends alerts as SMS through the provider's Messages REST API.
pub struct SmsDispatcher {
    client: reqwest::blocking::Client,
    config: SmsConfig,
    base_url: String,
}

impl SmsDispatcher {
    pub fn new(config: SmsConfig) -> Result<Self, DispatchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(SMS_TIMEOUT_SECS))
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            config,
            base_url: SMS_API_BASE_URL.to_string(),
        })
    }

    /// Points the dispatcher at a different API host.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }
}

impl AlertDispatcher for SmsDispatcher {
    fn send(&self, risk_score: f64) -> Result<String, DispatchError> {
        let body = alert_message(risk_score);
        let form = [
            ("To", self.config.to_number.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DispatchError::HttpError(response.status().as_u16()));
        }

        let text = response
            .text()
            .map_err(|e| DispatchError::ParseError(e.to_string()))?;
        let message: MessageResponse =
            serde_json::from_str(&text).map_err(|e| DispatchError::ParseError(e.to_string()))?;
        Ok(message.sid)
    }
}

// ---------------------------------------------------------------------------
// Disabled dispatcher
// ---------------------------------------------------------------------------

/// Stand-in used when alerting is off or credentials are missing.
/// Every send fails with `DispatchError::Disabled`.
#[derive(Debug, Clone)]
pub struct DisabledDispatcher {
    reason: String,
}

impl DisabledDispatcher {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AlertDispatcher for DisabledDispatcher {
    fn send(&self, _risk_score: f64) -> Result<String, DispatchError> {
        Err(DispatchError::Disabled(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Request as seen by the stub provider: lower-cased head plus raw body.
    struct CapturedRequest {
        head: String,
        body: String,
    }

    /// Serves exactly one HTTP response on an ephemeral local port.
    /// Returns the base URL to point the dispatcher at and a handle yielding
    /// the request that was received.
    fn stub_provider(
        status_line: &'static str,
        reply: &'static str,
    ) -> (String, JoinHandle<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub provider");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);

            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read request line");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().expect("content-length");
                }
                head.push_str(&lower);
            }

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("read body");

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                reply.len(),
                reply
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).expect("write response");
            stream.flush().expect("flush");

            CapturedRequest {
                head,
                body: String::from_utf8(body).expect("utf-8 body"),
            }
        });

        (base_url, handle)
    }

    fn sms_config() -> SmsConfig {
        SmsConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from_number: "+15550001111".to_string(),
            to_number: "+15550002222".to_string(),
        }
    }

    #[test]
    fn test_alert_message_uses_two_decimals() {
        assert_eq!(
            alert_message(0.8567),
            "⚠️ HIGH RISK ALERT! Water disease risk score: 0.86"
        );
    }

    #[test]
    fn test_messages_url_includes_account() {
        let dispatcher = SmsDispatcher::new(sms_config())
            .expect("client")
            .with_base_url("http://localhost:8080/");
        assert_eq!(
            dispatcher.messages_url(),
            "http://localhost:8080/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_disabled_dispatcher_always_fails() {
        let dispatcher = DisabledDispatcher::new("no credentials");
        assert_eq!(
            dispatcher.send(0.9),
            Err(DispatchError::Disabled("no credentials".to_string()))
        );
    }

    fn dispatcher_for(base_url: &str) -> SmsDispatcher {
        SmsDispatcher::new(sms_config())
            .expect("client")
            .with_base_url(base_url)
    }

    #[test]
    fn test_created_response_returns_message_sid() {
        let (base_url, provider) = stub_provider(
            "201 Created",
            r#"{"sid": "SM0123456789", "status": "queued"}"#,
        );

        let result = dispatcher_for(&base_url).send(0.9);
        let request = provider.join().expect("stub provider");

        assert_eq!(result, Ok("SM0123456789".to_string()));
        assert!(
            request
                .head
                .starts_with("post /2010-04-01/accounts/ac123/messages.json http/1.1"),
            "{}",
            request.head
        );
        // base64("AC123:secret")
        assert!(request.head.contains("authorization: basic qumxmjm6c2vjcmv0"), "{}", request.head);
        assert!(
            request.head.contains("content-type: application/x-www-form-urlencoded"),
            "{}",
            request.head
        );
        assert!(request.body.contains("To=%2B15550002222"), "{}", request.body);
        assert!(request.body.contains("From=%2B15550001111"), "{}", request.body);
        assert!(request.body.contains("Body="), "{}", request.body);
        assert!(request.body.contains("score%3A+0.90"), "{}", request.body);
    }

    #[test]
    fn test_rejected_credentials_are_http_error() {
        let (base_url, provider) = stub_provider(
            "401 Unauthorized",
            r#"{"code": 20003, "message": "Authenticate"}"#,
        );
        let result = dispatcher_for(&base_url).send(0.9);
        provider.join().expect("stub provider");
        assert_eq!(result, Err(DispatchError::HttpError(401)));
    }

    #[test]
    fn test_bad_request_is_http_error() {
        let (base_url, provider) = stub_provider(
            "400 Bad Request",
            r#"{"code": 21211, "message": "Invalid 'To' Phone Number"}"#,
        );
        let result = dispatcher_for(&base_url).send(0.75);
        provider.join().expect("stub provider");
        assert_eq!(result, Err(DispatchError::HttpError(400)));
    }

    #[test]
    fn test_non_json_success_body_is_parse_error() {
        let (base_url, provider) = stub_provider("200 OK", "<html>maintenance</html>");
        let result = dispatcher_for(&base_url).send(0.9);
        provider.join().expect("stub provider");
        assert!(matches!(result, Err(DispatchError::ParseError(_))), "{:?}", result);
    }

    #[test]
    fn test_success_body_without_sid_is_parse_error() {
        let (base_url, provider) = stub_provider("201 Created", r#"{"status": "queued"}"#);
        let result = dispatcher_for(&base_url).send(0.9);
        provider.join().expect("stub provider");
        assert!(matches!(result, Err(DispatchError::ParseError(_))), "{:?}", result);
    }

    #[test]
    fn test_unreachable_provider_is_transport_error() {
        // Port 9 (discard) is closed on test machines; the connection is refused locally.
        let dispatcher = SmsDispatcher::new(sms_config())
            .expect("client")
            .with_base_url("http://127.0.0.1:9");
        assert!(matches!(dispatcher.send(0.9), Err(DispatchError::Transport(_))));
    }
}
