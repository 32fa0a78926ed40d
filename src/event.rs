use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::{collections::HashMap, fmt};

pub const STATUS_CONNECTED: &str = "Connected";

/// Lifecycle transition reported by the SIP media application.
///
/// Matching is exact; anything else lands in `Other` with the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvocationEventType {
    NewInboundCall,
    ActionSuccessful,
    Hangup,
    Other(String),
}

impl InvocationEventType {
    pub fn as_str(&self) -> &str {
        match self {
            InvocationEventType::NewInboundCall => "NEW_INBOUND_CALL",
            InvocationEventType::ActionSuccessful => "ACTION_SUCCESSFUL",
            InvocationEventType::Hangup => "HANGUP",
            InvocationEventType::Other(value) => value,
        }
    }
}

impl From<String> for InvocationEventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "NEW_INBOUND_CALL" => InvocationEventType::NewInboundCall,
            "ACTION_SUCCESSFUL" => InvocationEventType::ActionSuccessful,
            "HANGUP" => InvocationEventType::Hangup,
            _ => InvocationEventType::Other(value),
        }
    }
}

impl From<&str> for InvocationEventType {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<InvocationEventType> for String {
    fn from(value: InvocationEventType) -> Self {
        match value {
            InvocationEventType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for InvocationEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    pub schema_version: Option<String>,
    pub sequence: Option<u64>,
    pub invocation_event_type: InvocationEventType,
    /// Result of the previous action, present on `ACTION_SUCCESSFUL`.
    pub action_data: Option<serde_json::Value>,
    pub call_details: Option<CallDetails>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallDetails {
    pub transaction_id: Option<String>,
    pub aws_account_id: Option<String>,
    pub aws_region: Option<String>,
    pub sip_media_application_id: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// One leg of the call. Fields stay optional here so that absence is reported
/// by name when the dispatcher asks for them.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Participant {
    pub call_id: Option<String>,
    pub participant_tag: Option<String>,
    pub to: Option<String>,
    pub from: Option<String>,
    pub direction: Option<String>,
    pub start_time_in_milliseconds: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(event_type: impl Into<InvocationEventType>, participants: Vec<Participant>) -> Self {
        Self {
            schema_version: Some("1.0".to_string()),
            sequence: None,
            invocation_event_type: event_type.into(),
            action_data: None,
            call_details: Some(CallDetails {
                participants,
                ..Default::default()
            }),
        }
    }

    pub fn call_details(&self) -> Result<&CallDetails> {
        self.call_details
            .as_ref()
            .ok_or_else(|| Error::missing("CallDetails"))
    }

    pub fn participants(&self) -> Result<&[Participant]> {
        Ok(&self.call_details()?.participants)
    }

    /// The first participant is the caller on inbound and fallback paths.
    pub fn primary_participant(&self) -> Result<&Participant> {
        self.participants()?
            .first()
            .ok_or_else(|| Error::missing("CallDetails.Participants[0]"))
    }
}

impl Participant {
    pub fn new(call_id: &str, from: &str, to: &str, status: &str) -> Self {
        Self {
            call_id: Some(call_id.to_string()),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    pub fn call_id(&self) -> Result<&str> {
        self.call_id
            .as_deref()
            .ok_or_else(|| Error::missing("Participant.CallId"))
    }

    pub fn from_number(&self) -> Result<&str> {
        self.from
            .as_deref()
            .ok_or_else(|| Error::missing("Participant.From"))
    }

    pub fn to_number(&self) -> Result<&str> {
        self.to
            .as_deref()
            .ok_or_else(|| Error::missing("Participant.To"))
    }

    pub fn status(&self) -> Result<&str> {
        self.status
            .as_deref()
            .ok_or_else(|| Error::missing("Participant.Status"))
    }

    pub fn is_connected(&self) -> Result<bool> {
        Ok(self.status()? == STATUS_CONNECTED)
    }
}
