/// Database row types — these map directly to SQLite rows.
/// Distinct from hearth-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub body: String,
    pub created_at: String,
    pub read_at: Option<String>,
}

pub struct ChannelSummaryRow {
    pub channel_id: String,
    pub last_activity: String,
    pub preview: Option<String>,
    pub unread: i64,
}
