//! Retrieval of the SMS verification code from the browser's network traffic.
//!
//! The app renders the code asynchronously and may clear it again, so it is not read from the UI.
//! Instead, chromedriver's performance log is scanned for the request that issued the code and the
//! body of its response is fetched through the DevTools protocol.
//!
//! Sessions must be started with performance logging enabled. See
//! [`crate::session::enable_performance_logging`].

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use snafu::{ResultExt, Snafu};
use thirtyfour::WebDriver;
use thirtyfour::common::command::{Command, ExtensionCommand};
use thirtyfour::error::WebDriverError;
use thirtyfour::extensions::cdp::ChromeDevTools;

use crate::config::RetryPolicy;

#[derive(Debug, Snafu)]
pub enum PhoneCodeError {
    #[snafu(display(
        "PhoneCodeError: No phone confirmation code found after {attempts} attempts. \
         Only call 'retrieve_phone_code' after the code was requested in the app."
    ))]
    NotFound { attempts: u32 },
}

/// Reading browser state failed. Always treated as transient by the retriever.
#[derive(Debug, Snafu)]
pub enum LogAccessError {
    #[snafu(display("LogAccessError: WebDriver command failed"))]
    Command { source: WebDriverError },

    #[snafu(display("LogAccessError: Could not decode driver response"))]
    Decode { source: serde_json::Error },
}

/// A non-empty string of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Keeps only the digits of a response body. `None` if there are none.
    pub fn from_body(body: &str) -> Option<Self> {
        let digits = body
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>();
        match digits.is_empty() {
            true => None,
            false => Some(Self(digits)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for VerificationCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record of chromedriver's performance log.
///
/// `message` is itself a JSON document wrapping a DevTools event, e.g.
/// `{"message":{"method":"Network.responseReceived","params":{"requestId":"42.7",..}},"webview":".."}`.
/// The record's `level` and `timestamp` are not needed and are skipped when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    pub message: String,
}

impl LogEntry {
    pub fn references(&self, pattern: &str) -> bool {
        self.message.contains(pattern)
    }

    /// The network request this entry belongs to, if the message is a network event.
    pub fn request_id(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct Envelope {
            message: DevToolsEvent,
        }
        #[derive(Deserialize)]
        struct DevToolsEvent {
            #[serde(default)]
            params: EventParams,
        }
        #[derive(Default, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct EventParams {
            request_id: Option<String>,
        }

        match serde_json::from_str::<Envelope>(&self.message) {
            Ok(envelope) => envelope.message.params.request_id,
            Err(err) => {
                tracing::trace!(?err, "Skipping log entry with undecodable message.");
                None
            }
        }
    }
}

/// Read access to the network traffic a browser session has captured.
pub(crate) trait NetworkLog {
    /// Drains the performance log. Entries returned once are not returned again.
    async fn performance_log(&self) -> Result<Vec<LogEntry>, LogAccessError>;

    async fn response_body(&self, request_id: &str) -> Result<String, LogAccessError>;
}

/// `POST /session/{id}/se/log`, the log endpoint chromedriver serves in W3C mode.
#[derive(Debug)]
struct GetLog {
    log_type: &'static str,
}

impl GetLog {
    fn performance() -> Self {
        Self {
            log_type: "performance",
        }
    }
}

impl ExtensionCommand for GetLog {
    fn parameters_json(&self) -> Option<serde_json::Value> {
        Some(json!({ "type": self.log_type }))
    }

    fn method(&self) -> http::Method {
        http::Method::POST
    }

    fn endpoint(&self) -> Arc<str> {
        Arc::from("/se/log")
    }
}

impl NetworkLog for WebDriver {
    async fn performance_log(&self) -> Result<Vec<LogEntry>, LogAccessError> {
        let raw = self
            .handle
            .cmd(Command::ExtensionCommand(Box::new(GetLog::performance())))
            .await
            .and_then(|response| response.value_json())
            .context(CommandSnafu {})?;
        serde_json::from_value(raw).context(DecodeSnafu {})
    }

    async fn response_body(&self, request_id: &str) -> Result<String, LogAccessError> {
        #[derive(Deserialize)]
        struct ResponseBody {
            body: String,
        }
        let dev_tools = ChromeDevTools::new(self.handle.clone());
        let raw = dev_tools
            .execute_cdp_with_params(
                "Network.getResponseBody",
                json!({ "requestId": request_id }),
            )
            .await
            .context(CommandSnafu {})?;
        let response: ResponseBody = serde_json::from_value(raw).context(DecodeSnafu {})?;
        Ok(response.body)
    }
}

/// Returns the SMS code the app sent most recently.
///
/// Must only be called after the code was requested in the app. Polls according to `policy` and
/// returns as soon as a code is found.
pub async fn retrieve_phone_code(
    driver: &WebDriver,
    policy: &RetryPolicy,
) -> Result<VerificationCode, PhoneCodeError> {
    retrieve_from(driver, policy).await
}

pub(crate) async fn retrieve_from(
    log: &impl NetworkLog,
    policy: &RetryPolicy,
) -> Result<VerificationCode, PhoneCodeError> {
    // Oldest first. The log is drained on every read, so matches must outlive their attempt.
    let mut candidates: Vec<String> = Vec::new();

    for attempt in 1..=policy.attempts {
        match log.performance_log().await {
            Ok(entries) => {
                for request_id in entries
                    .iter()
                    .filter(|entry| entry.references(&policy.endpoint_pattern))
                    .filter_map(LogEntry::request_id)
                {
                    candidates.retain(|known| known != &request_id);
                    candidates.push(request_id);
                }
            }
            Err(err) => {
                tracing::debug!(attempt, ?err, "Performance log not available yet.");
            }
        }

        for request_id in candidates.iter().rev() {
            match log.response_body(request_id).await {
                Ok(body) => match VerificationCode::from_body(&body) {
                    Some(code) => {
                        tracing::info!(attempt, %request_id, "Found phone confirmation code.");
                        return Ok(code);
                    }
                    None => tracing::debug!(attempt, %request_id, "Response body holds no digits."),
                },
                Err(err) => {
                    tracing::debug!(attempt, %request_id, ?err, "Response body not available.");
                }
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    NotFoundSnafu {
        attempts: policy.attempts,
    }
    .fail()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;
    use thirtyfour::SessionId;
    use thirtyfour::common::command::FormatRequestData;

    fn network_entry(method: &str, request_id: &str, url: &str) -> LogEntry {
        let message = json!({
            "message": {
                "method": method,
                "params": {
                    "requestId": request_id,
                    "response": { "url": url },
                },
            },
            "webview": "F1E2D3",
        });
        LogEntry {
            message: message.to_string(),
        }
    }

    fn code_request(request_id: &str) -> LogEntry {
        network_entry(
            "Network.responseReceived",
            request_id,
            "https://urban.routes/api/v1/number?number=%2B1123456789",
        )
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    /// Serves one scripted performance log read per attempt and fixed bodies per request id.
    #[derive(Default)]
    struct ScriptedLog {
        reads: RefCell<VecDeque<Result<Vec<LogEntry>, ()>>>,
        bodies: HashMap<String, String>,
        log_reads: RefCell<u32>,
        body_requests: RefCell<Vec<String>>,
    }

    impl ScriptedLog {
        fn read(self, entries: Vec<LogEntry>) -> Self {
            self.reads.borrow_mut().push_back(Ok(entries));
            self
        }

        fn failing_read(self) -> Self {
            self.reads.borrow_mut().push_back(Err(()));
            self
        }

        fn body(mut self, request_id: &str, body: &str) -> Self {
            self.bodies.insert(request_id.to_owned(), body.to_owned());
            self
        }
    }

    impl NetworkLog for ScriptedLog {
        async fn performance_log(&self) -> Result<Vec<LogEntry>, LogAccessError> {
            *self.log_reads.borrow_mut() += 1;
            match self.reads.borrow_mut().pop_front() {
                Some(Ok(entries)) => Ok(entries),
                Some(Err(())) => Err(LogAccessError::Decode {
                    source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
                }),
                None => Ok(Vec::new()),
            }
        }

        async fn response_body(&self, request_id: &str) -> Result<String, LogAccessError> {
            self.body_requests.borrow_mut().push(request_id.to_owned());
            match self.bodies.get(request_id) {
                Some(body) => Ok(body.clone()),
                None => Err(LogAccessError::Decode {
                    source: serde_json::from_str::<serde_json::Value>("").unwrap_err(),
                }),
            }
        }
    }

    #[test]
    fn verification_code_keeps_only_digits() {
        let code = VerificationCode::from_body(r#"{"code":"4821"}"#).unwrap();
        assert_that(code.as_str()).is_equal_to("4821");
        assert_that(code.to_string()).is_equal_to("4821");
    }

    #[test]
    fn verification_code_requires_at_least_one_digit() {
        assert_that(VerificationCode::from_body(r#"{"code":""}"#).is_none()).is_true();
        assert_that(VerificationCode::from_body("").is_none()).is_true();
    }

    #[test]
    fn request_id_is_read_from_nested_message() {
        let entry = code_request("1234.5");
        assert_that(entry.request_id()).is_equal_to(Some("1234.5".to_owned()));
        assert_that(entry.references("api/v1/number?number")).is_true();
    }

    #[test]
    fn request_id_is_none_for_undecodable_or_foreign_messages() {
        let garbage = LogEntry {
            message: "not json at all".to_owned(),
        };
        assert_that(garbage.request_id().is_none()).is_true();

        let page_event = LogEntry {
            message: json!({"message": {"method": "Page.loadEventFired", "params": {"timestamp": 1.5}}})
                .to_string(),
        };
        assert_that(page_event.request_id().is_none()).is_true();
    }

    #[test]
    fn log_entries_decode_from_driver_response() {
        let raw = json!([
            {"level": "INFO", "message": "{}", "timestamp": 1700000000000u64},
            {"level": "INFO", "message": "{}", "timestamp": 1700000000001.5},
        ]);
        let entries: Vec<LogEntry> = serde_json::from_value(raw).unwrap();
        assert_that(entries.len()).is_equal_to(2);
        assert_that(entries[1].message.as_str()).is_equal_to("{}");
    }

    #[test]
    fn performance_log_is_read_through_chromedriver_log_endpoint() {
        let command = Command::ExtensionCommand(Box::new(GetLog::performance()));

        let request = command.format_request(&SessionId::from("4f2c9a"));

        assert_that(request.method).is_equal_to(http::Method::POST);
        assert_that(&*request.uri).is_equal_to("session/4f2c9a/se/log");
        assert_that(request.body).is_equal_to(Some(json!({ "type": "performance" })));
    }

    #[tokio::test]
    async fn returns_code_on_first_attempt() {
        let log = ScriptedLog::default()
            .read(vec![code_request("7.1")])
            .body("7.1", r#"{"code":"4821"}"#);

        let code = retrieve_from(&log, &policy(10)).await.unwrap();

        assert_that(code.as_str()).is_equal_to("4821");
        assert_that(*log.log_reads.borrow()).is_equal_to(1);
    }

    #[tokio::test]
    async fn ignores_entries_of_other_requests() {
        let log = ScriptedLog::default()
            .read(vec![
                network_entry("Network.responseReceived", "1.1", "https://urban.routes/api/v1/orders"),
                code_request("1.2"),
            ])
            .body("1.1", "order 999")
            .body("1.2", "code: 1357");

        let code = retrieve_from(&log, &policy(3)).await.unwrap();

        assert_that(code.as_str()).is_equal_to("1357");
        assert_that(log.body_requests.borrow().clone()).is_equal_to(vec!["1.2".to_owned()]);
    }

    #[tokio::test]
    async fn prefers_most_recent_request() {
        let log = ScriptedLog::default()
            .read(vec![code_request("2.1"), code_request("2.2")])
            .body("2.1", "1111")
            .body("2.2", "2222");

        let code = retrieve_from(&log, &policy(3)).await.unwrap();

        assert_that(code.as_str()).is_equal_to("2222");
    }

    #[tokio::test]
    async fn falls_back_to_older_request_when_newest_body_is_unavailable() {
        let log = ScriptedLog::default()
            .read(vec![code_request("3.1"), code_request("3.2")])
            .body("3.1", "5555");

        let code = retrieve_from(&log, &policy(1)).await.unwrap();

        assert_that(code.as_str()).is_equal_to("5555");
        assert_that(log.body_requests.borrow().clone())
            .is_equal_to(vec!["3.2".to_owned(), "3.1".to_owned()]);
    }

    #[tokio::test]
    async fn survives_transient_log_failures() {
        let log = ScriptedLog::default()
            .failing_read()
            .read(vec![])
            .read(vec![code_request("4.1")])
            .body("4.1", "8642");

        let code = retrieve_from(&log, &policy(5)).await.unwrap();

        assert_that(code.as_str()).is_equal_to("8642");
        assert_that(*log.log_reads.borrow()).is_equal_to(3);
    }

    #[tokio::test]
    async fn remembers_matches_from_drained_log() {
        // The body only becomes available after the entry has already been drained from the log.
        struct LateBody {
            inner: ScriptedLog,
        }

        impl NetworkLog for LateBody {
            async fn performance_log(&self) -> Result<Vec<LogEntry>, LogAccessError> {
                self.inner.performance_log().await
            }

            async fn response_body(&self, request_id: &str) -> Result<String, LogAccessError> {
                let reads = *self.inner.log_reads.borrow();
                match reads {
                    1 => Err(LogAccessError::Decode {
                        source: serde_json::from_str::<serde_json::Value>("").unwrap_err(),
                    }),
                    _ => self.inner.response_body(request_id).await,
                }
            }
        }

        let log = LateBody {
            inner: ScriptedLog::default()
                .read(vec![code_request("5.1")])
                .body("5.1", "9753"),
        };

        let code = retrieve_from(&log, &policy(3)).await.unwrap();

        assert_that(code.as_str()).is_equal_to("9753");
        assert_that(*log.inner.log_reads.borrow()).is_equal_to(2);
    }

    #[tokio::test]
    async fn fails_after_exhausting_attempts_when_code_was_never_requested() {
        let log = ScriptedLog::default();

        let result = retrieve_from(&log, &policy(4)).await;

        assert_that(matches!(result, Err(PhoneCodeError::NotFound { attempts: 4 }))).is_true();
        assert_that(*log.log_reads.borrow()).is_equal_to(4);
        let message = result.unwrap_err().to_string();
        assert_that(message.as_str()).contains("after the code was requested in the app");
    }

    #[tokio::test]
    async fn fails_when_bodies_never_contain_digits() {
        let log = ScriptedLog::default()
            .read(vec![code_request("6.1")])
            .body("6.1", r#"{"code":""}"#);

        let result = retrieve_from(&log, &policy(2)).await;

        assert_that(matches!(result, Err(PhoneCodeError::NotFound { attempts: 2 }))).is_true();
        assert_that(log.body_requests.borrow().len()).is_equal_to(2);
    }
}
