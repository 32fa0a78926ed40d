use crate::{
    action::{Action, Response, APOLOGY_TEXT, GOODBYE_TEXT},
    config::{BotSettings, BotSettingsRef},
    context::InvocationContext,
    error::Result,
    event::{Event, InvocationEventType, Participant},
};
use std::sync::Arc;
use tracing::{error, info, info_span};

#[cfg(test)]
mod tests;

/// Maps one SIP media application event to the actions it should run next.
///
/// Holds only the immutable bot settings, so a single instance can serve
/// concurrent invocations.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    settings: BotSettingsRef,
}

impl Dispatcher {
    pub fn new(settings: BotSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn dispatch(&self, event: &Event, ctx: &InvocationContext) -> Result<Response> {
        let event_type = &event.invocation_event_type;
        let call_details = event.call_details()?;
        let caller = event.primary_participant()?;
        let call_id = caller.call_id()?;
        let from_number = caller.from_number()?;
        let to_number = caller.to_number()?;
        let account_id = ctx.account_id()?;

        let span = info_span!(
            "invocation",
            request_id = %ctx.request_id,
            call_id,
            from = from_number,
            to = to_number,
            event_type = %event_type,
        );
        let _enter = span.enter();

        info!(payload = %to_json(event), "event received");
        info!(call_details = %to_json(call_details), "call details");

        let actions = match event_type {
            InvocationEventType::NewInboundCall => {
                info!("NEW_INBOUND_CALL event received");
                self.new_call_actions(call_id, from_number, &account_id)
            }
            InvocationEventType::ActionSuccessful => {
                if let Some(action_data) = &event.action_data {
                    info!(action_data = %to_json(action_data), "action data");
                }
                info!("ACTION_SUCCESSFUL event received");
                vec![Action::speak(call_id, GOODBYE_TEXT), Action::hangup(call_id)]
            }
            InvocationEventType::Hangup => {
                info!("HANGUP event received");
                return self.hangup_response(&call_details.participants);
            }
            InvocationEventType::Other(_) => {
                error!(payload = %to_json(event), "unhandled event");
                vec![Action::speak(call_id, APOLOGY_TEXT), Action::hangup(call_id)]
            }
        };
        Ok(respond(actions))
    }

    fn new_call_actions(&self, call_id: &str, from_number: &str, account_id: &str) -> Vec<Action> {
        let bot_alias_arn = self.settings.bot_alias_arn(account_id);
        info!(call_id, bot_alias_arn = %bot_alias_arn, "sending StartBotConversation");
        vec![
            Action::voice_focus(call_id, true),
            Action::start_bot_conversation(call_id, bot_alias_arn, from_number),
        ]
    }

    /// Hangs up the first leg that is still connected, in participant order.
    fn hangup_response(&self, participants: &[Participant]) -> Result<Response> {
        for participant in participants {
            if participant.is_connected()? {
                return Ok(respond(vec![Action::hangup(participant.call_id()?)]));
            }
        }
        info!("all calls have been hung up");
        let response = if self.settings.hangup_placeholder {
            Response::placeholder()
        } else {
            Response::empty()
        };
        info!(response = %to_json(&response), "response");
        Ok(response)
    }
}

fn respond(actions: Vec<Action>) -> Response {
    for action in &actions {
        info!(
            action = action.type_name(),
            call_id = action.call_id(),
            "sending action"
        );
    }
    let response = Response::new(actions);
    info!(response = %to_json(&response), "response");
    response
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
