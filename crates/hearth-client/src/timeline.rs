use std::collections::HashSet;

use chrono::{DateTime, Utc};
use hearth_types::models::Message;
use uuid::Uuid;

/// One channel's materialized message list, ordered by creation time.
///
/// Every insertion path — optimistic send result, pushed event, authoritative
/// reload — goes through [`Timeline::insert`], so a message id can appear at
/// most once no matter how often or in what order the sources deliver it.
pub struct Timeline {
    local_user: Uuid,
    messages: Vec<Message>,
    ids: HashSet<Uuid>,
}

impl Timeline {
    pub fn new(local_user: Uuid) -> Self {
        Self {
            local_user,
            messages: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Insert-if-absent. Returns whether the message was new.
    ///
    /// A duplicate is almost a no-op: the one thing it may contribute is a
    /// `read_at` the existing entry lacks (a reload can carry a receipt the
    /// live event for it never delivered). The reverse never happens — a
    /// duplicate without `read_at` cannot clear an existing stamp.
    pub fn insert(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id) {
            if let Some(read_at) = message.read_at {
                if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
                    existing.read_at.get_or_insert(read_at);
                }
            }
            return false;
        }

        let pos = self
            .messages
            .partition_point(|m| (m.created_at, m.id) <= (message.created_at, message.id));
        self.messages.insert(pos, message);
        true
    }

    /// Merge an authoritative history page. Returns how many were new.
    pub fn merge_reload(&mut self, messages: Vec<Message>) -> usize {
        messages
            .into_iter()
            .filter(|m| self.insert(m.clone()))
            .count()
    }

    /// Apply a read receipt: stamp `read_at` on the local user's own messages
    /// that were still unread as of the receipt. Existing stamps are never
    /// altered, and messages sent after the receipt stay unread.
    pub fn apply_read(&mut self, read_by: Uuid, read_at: DateTime<Utc>) -> usize {
        if read_by == self.local_user {
            // Receipts describe the *other* party reading; our own ack echo
            // carries no information about our sent messages.
            return 0;
        }

        let mut stamped = 0;
        for message in &mut self.messages {
            if message.sender_id == self.local_user
                && message.read_at.is_none()
                && message.created_at <= read_at
            {
                message.read_at = Some(read_at);
                stamped += 1;
            }
        }
        stamped
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
