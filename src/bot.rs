pub mod command;
pub mod console;
pub mod dispatcher;
pub mod reply;
pub mod webhook;

pub use command::{parse_command, Command, ReportKind};
pub use dispatcher::{BotError, Dispatcher};
pub use reply::{CollectingSink, Reply, ReplySink, SinkError};
