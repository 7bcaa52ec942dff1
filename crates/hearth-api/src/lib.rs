pub mod auth;
pub mod channels;
pub mod messages;
pub mod middleware;

use std::sync::Arc;

use hearth_db::Database;
use hearth_sync::EventPublisher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub publisher: EventPublisher,
}
