use super::Dispatcher;
use crate::action::{
    Action, ActionSlot, Response, APOLOGY_TEXT, GOODBYE_TEXT, PHONE_NUMBER_ATTRIBUTE,
    SCHEMA_VERSION,
};
use crate::config::BotSettings;
use crate::context::InvocationContext;
use crate::error::Error;
use crate::event::{Event, Participant};
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

fn dispatch_with_logs(dispatcher: &Dispatcher, event: &Event) -> (Response, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let response = tracing::subscriber::with_default(subscriber, || {
        dispatcher.dispatch(event, &ctx()).unwrap()
    });
    (response, logs.text())
}

const FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:111122223333:function:ChimeSDKHandler";

fn settings(hangup_placeholder: bool) -> BotSettings {
    BotSettings {
        bot_id: "BOTID".to_string(),
        bot_alias_id: "ALIASID".to_string(),
        region: "us-east-1".to_string(),
        language: "en".to_string(),
        hangup_placeholder,
    }
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(settings(true))
}

fn ctx() -> InvocationContext {
    InvocationContext::new("req-1", FUNCTION_ARN)
}

fn caller(status: &str) -> Participant {
    Participant::new("abc", "+15551234567", "+15557654321", status)
}

#[test]
fn test_new_inbound_call() {
    let event = Event::new("NEW_INBOUND_CALL", vec![caller("Connected")]);
    let response = dispatcher().dispatch(&event, &ctx()).unwrap();

    assert_eq!(response.schema_version, SCHEMA_VERSION);
    let actions: Vec<&Action> = response.actions().collect();
    assert_eq!(actions.len(), 2);
    assert_eq!(*actions[0], Action::voice_focus("abc", true));

    match actions[1] {
        Action::StartBotConversation(params) => {
            assert_eq!(params.call_id, "abc");
            assert_eq!(
                params.bot_alias_arn,
                "arn:aws:lex:us-east-1:111122223333:bot-alias/BOTID/ALIASID"
            );
            assert_eq!(
                params.configuration.session_state.session_attributes[PHONE_NUMBER_ATTRIBUTE],
                "+15551234567"
            );
            assert_eq!(
                params.configuration.session_state.dialog_action.r#type,
                "ElicitIntent"
            );
        }
        other => panic!("expected StartBotConversation, got {:?}", other),
    }
}

#[test]
fn test_new_inbound_call_wire_payload() {
    let event: Event = serde_json::from_value(json!({
        "InvocationEventType": "NEW_INBOUND_CALL",
        "CallDetails": {
            "Participants": [{
                "CallId": "abc",
                "From": "+15551234567",
                "To": "+15557654321"
            }]
        }
    }))
    .unwrap();
    let response = dispatcher().dispatch(&event, &ctx()).unwrap();
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["SchemaVersion"], "1.0");
    assert_eq!(value["Actions"][0]["Type"], "VoiceFocus");
    assert_eq!(value["Actions"][0]["Parameters"]["Enable"], true);
    assert_eq!(value["Actions"][1]["Type"], "StartBotConversation");
    assert_eq!(
        value["Actions"][1]["Parameters"]["BotAliasArn"],
        "arn:aws:lex:us-east-1:111122223333:bot-alias/BOTID/ALIASID"
    );
    assert_eq!(
        value["Actions"][1]["Parameters"]["Configuration"]["SessionState"]["SessionAttributes"]
            ["phoneNumber"],
        "+15551234567"
    );
}

#[test]
fn test_action_successful_says_goodbye() {
    let mut event = Event::new("ACTION_SUCCESSFUL", vec![caller("Connected")]);
    event.action_data = Some(json!({"Type": "StartBotConversation"}));
    let response = dispatcher().dispatch(&event, &ctx()).unwrap();

    assert_eq!(
        response,
        Response::new(vec![
            Action::speak("abc", GOODBYE_TEXT),
            Action::hangup("abc")
        ])
    );
}

#[test]
fn test_hangup_targets_first_connected_leg() {
    let event = Event::new(
        "HANGUP",
        vec![
            Participant::new("leg-a", "+15551234567", "+15557654321", "Disconnected"),
            Participant::new("leg-b", "+15557654321", "+15550000000", "Connected"),
            Participant::new("leg-c", "+15557654321", "+15551111111", "Connected"),
        ],
    );
    let response = dispatcher().dispatch(&event, &ctx()).unwrap();
    assert_eq!(response, Response::new(vec![Action::hangup("leg-b")]));
}

#[test]
fn test_hangup_without_connected_leg_keeps_placeholder() {
    let event = Event::new("HANGUP", vec![caller("Disconnected")]);
    let response = dispatcher().dispatch(&event, &ctx()).unwrap();

    assert_eq!(response.schema_version, SCHEMA_VERSION);
    assert_eq!(
        response.actions,
        vec![ActionSlot::Placeholder(String::new())]
    );
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"SchemaVersion": "1.0", "Actions": [""]})
    );
}

#[test]
fn test_hangup_without_connected_leg_can_return_empty() {
    // The placeholder is not a real action; with it disabled the list is empty.
    let dispatcher = Dispatcher::new(settings(false));
    let event = Event::new("HANGUP", vec![caller("Disconnected")]);
    let response = dispatcher.dispatch(&event, &ctx()).unwrap();
    assert_eq!(response, Response::empty());
}

#[test]
fn test_hangup_without_connected_leg_logs_response() {
    let event = Event::new("HANGUP", vec![caller("Disconnected")]);

    let (response, logs) = dispatch_with_logs(&dispatcher(), &event);
    assert_eq!(response, Response::placeholder());
    assert!(logs.contains("all calls have been hung up"), "{logs}");
    assert!(logs.contains(r#"response={"SchemaVersion":"1.0","Actions":[""]}"#), "{logs}");

    let (response, logs) = dispatch_with_logs(&Dispatcher::new(settings(false)), &event);
    assert_eq!(response, Response::empty());
    assert!(logs.contains(r#"response={"SchemaVersion":"1.0","Actions":[]}"#), "{logs}");
}

#[test]
fn test_unknown_event_falls_back_to_apology() {
    for event_type in ["CALL_ANSWERED", "RINGING", "hangup", ""] {
        let event = Event::new(event_type, vec![caller("Connected")]);
        let response = dispatcher().dispatch(&event, &ctx()).unwrap();
        assert_eq!(
            response,
            Response::new(vec![
                Action::speak("abc", APOLOGY_TEXT),
                Action::hangup("abc")
            ]),
            "{event_type}"
        );
    }
}

#[test]
fn test_every_action_targets_a_call() {
    let events = [
        Event::new("NEW_INBOUND_CALL", vec![caller("Connected")]),
        Event::new("ACTION_SUCCESSFUL", vec![caller("Connected")]),
        Event::new("HANGUP", vec![caller("Connected")]),
        Event::new("INVALID_LEX_RESULT", vec![caller("Connected")]),
    ];
    for event in &events {
        let response = dispatcher().dispatch(event, &ctx()).unwrap();
        assert_eq!(response.schema_version, SCHEMA_VERSION);
        assert!(!response.actions.is_empty());
        assert!(response.actions().all(|action| action.call_id() == "abc"));
    }
}

#[test]
fn test_missing_fields_fail() {
    let event = Event::new("NEW_INBOUND_CALL", vec![]);
    assert_eq!(
        dispatcher().dispatch(&event, &ctx()).unwrap_err(),
        Error::missing("CallDetails.Participants[0]")
    );

    let mut event = Event::new("NEW_INBOUND_CALL", vec![caller("Connected")]);
    event.call_details = None;
    assert_eq!(
        dispatcher().dispatch(&event, &ctx()).unwrap_err(),
        Error::missing("CallDetails")
    );

    let mut participant = caller("Connected");
    participant.from = None;
    let event = Event::new("NEW_INBOUND_CALL", vec![participant]);
    assert_eq!(
        dispatcher().dispatch(&event, &ctx()).unwrap_err(),
        Error::missing("Participant.From")
    );

    let mut second = caller("Connected");
    second.status = None;
    let event = Event::new("HANGUP", vec![caller("Disconnected"), second]);
    assert_eq!(
        dispatcher().dispatch(&event, &ctx()).unwrap_err(),
        Error::missing("Participant.Status")
    );
}

#[test]
fn test_malformed_identity_fails() {
    let event = Event::new("NEW_INBOUND_CALL", vec![caller("Connected")]);
    let ctx = InvocationContext::new("req-1", "function:ChimeSDKHandler");
    let err = dispatcher().dispatch(&event, &ctx).unwrap_err();
    assert_eq!(err.kind(), "ParseError");
}
