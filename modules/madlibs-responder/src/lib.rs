pub mod config;
pub mod dispatch;
pub mod routes;
pub mod sender;

pub use config::Config;
pub use dispatch::{Delivery, DispatchError, DispatchOutcome, Dispatcher};
pub use routes::build_router;
pub use sender::{CallbackSender, HttpCallbackSender};
