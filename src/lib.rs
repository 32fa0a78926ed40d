pub mod action;
pub mod app;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod runtime;
pub mod version;

pub use action::{Action, ActionSlot, Response};
pub use context::InvocationContext;
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use event::{Event, InvocationEventType, Participant};
