pub mod bus;
pub mod cli;
pub mod config;
pub mod deputy;
pub mod event;
pub mod logging;
pub mod script;
pub mod sheriff;

pub use deputy::{CmdInfo, CmdOrder, Deputy, InfoFrame, OrdersFrame};
pub use event::{Event, EventBus, EventKind};
pub use script::{Action, IdentType, Script, WaitStatus};
pub use sheriff::{error::SheriffError, Sheriff};
