//! Client side of the Lambda custom-runtime API.
//!
//! Each turn of the loop long-polls `invocation/next`, runs the dispatcher
//! synchronously and posts either the response envelope or an error report
//! back for the same request id.
use crate::{
    action::Response, context::InvocationContext, dispatcher::Dispatcher, event::Event, version,
};
use anyhow::{anyhow, Result};
use reqwest::{header::HeaderMap, Client};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const API_VERSION: &str = "2018-06-01";
pub const HEADER_REQUEST_ID: &str = "lambda-runtime-aws-request-id";
pub const HEADER_FUNCTION_ARN: &str = "lambda-runtime-invoked-function-arn";
pub const HEADER_DEADLINE_MS: &str = "lambda-runtime-deadline-ms";
pub const HEADER_TRACE_ID: &str = "lambda-runtime-trace-id";
const HEADER_ERROR_TYPE: &str = "lambda-runtime-function-error-type";
pub const INVALID_EVENT: &str = "InvalidEvent";

/// Error document accepted by the runtime API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_type: String,
    pub error_message: String,
}

pub struct Invocation {
    pub context: InvocationContext,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Response(Response),
    Failure(ErrorReport),
}

/// Decodes the payload and dispatches it; never fails, failures become reports.
pub fn process(dispatcher: &Dispatcher, invocation: &Invocation) -> InvocationOutcome {
    let event: Event = match serde_json::from_slice(&invocation.payload) {
        Ok(event) => event,
        Err(e) => {
            return InvocationOutcome::Failure(ErrorReport {
                error_type: INVALID_EVENT.to_string(),
                error_message: format!("failed to decode event: {}", e),
            })
        }
    };
    match dispatcher.dispatch(&event, &invocation.context) {
        Ok(response) => InvocationOutcome::Response(response),
        Err(e) => InvocationOutcome::Failure(ErrorReport {
            error_type: e.kind().to_string(),
            error_message: e.to_string(),
        }),
    }
}

pub struct RuntimeClient {
    client: Client,
    endpoint: String,
}

impl RuntimeClient {
    /// `runtime_api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(runtime_api: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(version::get_useragent())
            .build()?;
        let endpoint = if runtime_api.starts_with("http://") || runtime_api.starts_with("https://")
        {
            runtime_api.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", runtime_api.trim_end_matches('/'))
        };
        Ok(Self {
            client,
            endpoint: format!("{}/{}/runtime", endpoint, API_VERSION),
        })
    }

    pub async fn next_invocation(&self) -> Result<Invocation> {
        let response = self
            .client
            .get(format!("{}/invocation/next", self.endpoint))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "runtime API returned {} for next invocation",
                response.status()
            ));
        }
        let context = context_from_headers(response.headers())?;
        let payload = response.bytes().await?.to_vec();
        Ok(Invocation { context, payload })
    }

    pub async fn send_response(&self, request_id: &str, response: &Response) -> Result<()> {
        let url = format!("{}/invocation/{}/response", self.endpoint, request_id);
        let resp = self.client.post(&url).json(response).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "runtime API rejected response for {}: {}",
                request_id,
                resp.status()
            ));
        }
        Ok(())
    }

    pub async fn send_error(&self, request_id: &str, report: &ErrorReport) -> Result<()> {
        let url = format!("{}/invocation/{}/error", self.endpoint, request_id);
        self.post_error(&url, report).await
    }

    /// Reports a failure that happened before the first invocation.
    pub async fn send_init_error(&self, report: &ErrorReport) -> Result<()> {
        let url = format!("{}/init/error", self.endpoint);
        self.post_error(&url, report).await
    }

    async fn post_error(&self, url: &str, report: &ErrorReport) -> Result<()> {
        let resp = self
            .client
            .post(url)
            .header(HEADER_ERROR_TYPE, &report.error_type)
            .json(report)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "runtime API rejected error report: {}",
                resp.status()
            ));
        }
        Ok(())
    }

    /// Serves invocations until `token` is cancelled or the runtime API fails.
    pub async fn run(&self, dispatcher: &Dispatcher, token: CancellationToken) -> Result<()> {
        info!(endpoint = %self.endpoint, "runtime loop started");
        loop {
            let invocation = select! {
                _ = token.cancelled() => {
                    info!("runtime loop cancelled");
                    return Ok(());
                }
                invocation = self.next_invocation() => invocation?,
            };
            let request_id = invocation.context.request_id.clone();
            let start_time = Instant::now();
            match process(dispatcher, &invocation) {
                InvocationOutcome::Response(response) => {
                    self.send_response(&request_id, &response).await?;
                    info!(
                        request_id = %request_id,
                        elapsed = start_time.elapsed().as_millis() as u64,
                        "invocation completed"
                    );
                }
                InvocationOutcome::Failure(report) => {
                    error!(
                        request_id = %request_id,
                        error_type = %report.error_type,
                        "invocation failed: {}",
                        report.error_message
                    );
                    self.send_error(&request_id, &report).await?;
                }
            }
        }
    }
}

fn context_from_headers(headers: &HeaderMap) -> Result<InvocationContext> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    let request_id =
        header(HEADER_REQUEST_ID).ok_or_else(|| anyhow!("missing {} header", HEADER_REQUEST_ID))?;
    let invoked_function_arn = header(HEADER_FUNCTION_ARN).unwrap_or_else(|| {
        warn!(request_id = %request_id, "invocation without {} header", HEADER_FUNCTION_ARN);
        String::new()
    });
    Ok(InvocationContext {
        request_id,
        invoked_function_arn,
        deadline_ms: header(HEADER_DEADLINE_MS).and_then(|v| v.parse().ok()),
        trace_id: header(HEADER_TRACE_ID),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotSettings;
    use reqwest::header::HeaderValue;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(BotSettings {
            bot_id: "BOTID".to_string(),
            bot_alias_id: "ALIASID".to_string(),
            region: "us-east-1".to_string(),
            language: "en".to_string(),
            hangup_placeholder: true,
        })
    }

    fn invocation(arn: &str, payload: &str) -> Invocation {
        Invocation {
            context: InvocationContext::new("req-1", arn),
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_REQUEST_ID, HeaderValue::from_static("req-42"));
        headers.insert(
            HEADER_FUNCTION_ARN,
            HeaderValue::from_static("arn:aws:lambda:us-east-1:111122223333:function:handler"),
        );
        headers.insert(HEADER_DEADLINE_MS, HeaderValue::from_static("1700000000000"));
        headers.insert(HEADER_TRACE_ID, HeaderValue::from_static("Root=1-abc"));

        let ctx = context_from_headers(&headers).unwrap();
        assert_eq!(ctx.request_id, "req-42");
        assert_eq!(ctx.account_id().unwrap(), "111122223333");
        assert_eq!(ctx.deadline_ms, Some(1_700_000_000_000));
        assert_eq!(ctx.trace_id.as_deref(), Some("Root=1-abc"));

        assert!(context_from_headers(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_process_invalid_payload() {
        let outcome = process(
            &dispatcher(),
            &invocation("arn:aws:lambda:us-east-1:111122223333:function:h", "not json"),
        );
        match outcome {
            InvocationOutcome::Failure(report) => assert_eq!(report.error_type, INVALID_EVENT),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_process_reports_typed_errors() {
        let payload = r#"{"InvocationEventType":"NEW_INBOUND_CALL","CallDetails":{"Participants":[{"CallId":"abc","From":"+1","To":"+2"}]}}"#;
        let outcome = process(&dispatcher(), &invocation("bad-arn", payload));
        match outcome {
            InvocationOutcome::Failure(report) => assert_eq!(report.error_type, "ParseError"),
            other => panic!("unexpected outcome {:?}", other),
        }

        let payload = r#"{"InvocationEventType":"HANGUP","CallDetails":{"Participants":[]}}"#;
        let outcome = process(
            &dispatcher(),
            &invocation("arn:aws:lambda:us-east-1:111122223333:function:h", payload),
        );
        match outcome {
            InvocationOutcome::Failure(report) => {
                assert_eq!(report.error_type, "MissingFieldError")
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_error_report_wire_format() {
        let report = ErrorReport {
            error_type: "ParseError".to_string(),
            error_message: "bad".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"errorType": "ParseError", "errorMessage": "bad"})
        );
    }

    #[test]
    fn test_endpoint_normalization() {
        let client = RuntimeClient::new("127.0.0.1:9001").unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:9001/2018-06-01/runtime");
        let client = RuntimeClient::new("http://localhost:9001/").unwrap();
        assert_eq!(client.endpoint, "http://localhost:9001/2018-06-01/runtime");
    }
}
