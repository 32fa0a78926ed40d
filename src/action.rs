use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SCHEMA_VERSION: &str = "1.0";

pub const SPEAK_LANGUAGE_CODE: &str = "en-US";
pub const SPEAK_VOICE_ID: &str = "Joanna";
pub const SPEAK_ENGINE: &str = "neural";
pub const SPEAK_TEXT_TYPE: &str = "text";
pub const HANGUP_SIP_RESPONSE_CODE: &str = "0";
pub const BOT_LOCALE_ID: &str = "en_US";

pub const GOODBYE_TEXT: &str =
    "Thank you for calling the Order Flowers Amazon Lex Bot.  Goodbye for now.";
pub const APOLOGY_TEXT: &str = "Sorry, we were unable to process your call.";
pub const WELCOME_TEXT: &str = "Welcome to the Order Flowers SIP Integration Demo using Amazon Chime SDK. To get started, you can say, Order Flowers.";

/// Session attribute carrying the caller's number into the bot.
pub const PHONE_NUMBER_ATTRIBUTE: &str = "phoneNumber";

/// Call-control instruction executed in order by the SIP media application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "Type", content = "Parameters")]
pub enum Action {
    Speak(SpeakParameters),
    Hangup(HangupParameters),
    VoiceFocus(VoiceFocusParameters),
    StartBotConversation(StartBotConversationParameters),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeakParameters {
    pub call_id: String,
    pub text: String,
    pub engine: String,
    pub language_code: String,
    pub text_type: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HangupParameters {
    pub call_id: String,
    pub sip_response_code: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceFocusParameters {
    pub enable: bool,
    pub call_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartBotConversationParameters {
    pub call_id: String,
    pub bot_alias_arn: String,
    pub locale_id: String,
    pub configuration: BotConfiguration,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BotConfiguration {
    pub session_state: SessionState,
    pub welcome_messages: Vec<WelcomeMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionState {
    pub session_attributes: HashMap<String, String>,
    pub dialog_action: DialogAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DialogAction {
    #[serde(rename = "Type")]
    pub r#type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WelcomeMessage {
    pub content: String,
    pub content_type: String,
}

impl Action {
    pub fn speak(call_id: &str, text: &str) -> Self {
        Action::Speak(SpeakParameters {
            call_id: call_id.to_string(),
            text: text.to_string(),
            engine: SPEAK_ENGINE.to_string(),
            language_code: SPEAK_LANGUAGE_CODE.to_string(),
            text_type: SPEAK_TEXT_TYPE.to_string(),
            voice_id: SPEAK_VOICE_ID.to_string(),
        })
    }

    pub fn hangup(call_id: &str) -> Self {
        Action::Hangup(HangupParameters {
            call_id: call_id.to_string(),
            sip_response_code: HANGUP_SIP_RESPONSE_CODE.to_string(),
        })
    }

    pub fn voice_focus(call_id: &str, enable: bool) -> Self {
        Action::VoiceFocus(VoiceFocusParameters {
            enable,
            call_id: call_id.to_string(),
        })
    }

    pub fn start_bot_conversation(call_id: &str, bot_alias_arn: String, phone_number: &str) -> Self {
        let session_attributes = HashMap::from([(
            PHONE_NUMBER_ATTRIBUTE.to_string(),
            phone_number.to_string(),
        )]);
        Action::StartBotConversation(StartBotConversationParameters {
            call_id: call_id.to_string(),
            bot_alias_arn,
            locale_id: BOT_LOCALE_ID.to_string(),
            configuration: BotConfiguration {
                session_state: SessionState {
                    session_attributes,
                    dialog_action: DialogAction {
                        r#type: "ElicitIntent".to_string(),
                    },
                },
                welcome_messages: vec![WelcomeMessage {
                    content: WELCOME_TEXT.to_string(),
                    content_type: "PlainText".to_string(),
                }],
            },
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Speak(_) => "Speak",
            Action::Hangup(_) => "Hangup",
            Action::VoiceFocus(_) => "VoiceFocus",
            Action::StartBotConversation(_) => "StartBotConversation",
        }
    }

    pub fn call_id(&self) -> &str {
        match self {
            Action::Speak(p) => &p.call_id,
            Action::Hangup(p) => &p.call_id,
            Action::VoiceFocus(p) => &p.call_id,
            Action::StartBotConversation(p) => &p.call_id,
        }
    }
}

/// One entry of `Actions`.
///
/// `Placeholder` reproduces the empty string the hangup path emits when no
/// participant is still connected.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ActionSlot {
    Action(Action),
    Placeholder(String),
}

impl From<Action> for ActionSlot {
    fn from(action: Action) -> Self {
        ActionSlot::Action(action)
    }
}

impl ActionSlot {
    pub fn as_action(&self) -> Option<&Action> {
        match self {
            ActionSlot::Action(action) => Some(action),
            ActionSlot::Placeholder(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub schema_version: String,
    pub actions: Vec<ActionSlot>,
}

impl Response {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            actions: actions.into_iter().map(ActionSlot::from).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn placeholder() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            actions: vec![ActionSlot::Placeholder(String::new())],
        }
    }

    /// Real actions only, skipping placeholders.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter_map(ActionSlot::as_action)
    }
}
