use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Identity metadata the invoking runtime supplies with every event.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: String,
    /// Unix epoch milliseconds after which the runtime abandons the invocation.
    pub deadline_ms: Option<u64>,
    pub trace_id: Option<String>,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>, invoked_function_arn: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            invoked_function_arn: invoked_function_arn.into(),
            deadline_ms: None,
            trace_id: None,
        }
    }

    pub fn account_id(&self) -> Result<String> {
        parse_account_id(&self.invoked_function_arn)
    }
}

/// Extracts the account from `arn:partition:service:region:account:resource`.
///
/// Only the field count is checked; the fifth field is returned as-is.
pub fn parse_account_id(arn: &str) -> Result<String> {
    arn.split(':')
        .nth(4)
        .map(|account| account.to_string())
        .ok_or_else(|| Error::Parse {
            input: arn.to_string(),
            reason: "expected at least five colon-delimited fields".to_string(),
        })
}
