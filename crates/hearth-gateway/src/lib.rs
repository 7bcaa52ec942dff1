pub mod connection;
pub mod dispatcher;

use std::sync::Arc;

use hearth_db::Database;
use hearth_sync::EventPublisher;

pub use dispatcher::Dispatcher;

/// Everything a gateway connection needs after the HTTP upgrade.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Dispatcher,
    pub publisher: EventPublisher,
    pub db: Arc<Database>,
    pub jwt_secret: String,
}
