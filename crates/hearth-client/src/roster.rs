use chrono::{DateTime, Utc};
use hearth_types::models::{ChannelSummary, Message};
use hearth_types::ChannelId;
use uuid::Uuid;

/// One row of the channel list.
#[derive(Debug, Clone)]
pub struct ChannelEntry {
    pub channel_id: ChannelId,
    pub name: String,
    pub last_activity: DateTime<Utc>,
    pub preview: Option<String>,
    pub unread: u32,
}

impl From<ChannelSummary> for ChannelEntry {
    fn from(s: ChannelSummary) -> Self {
        Self {
            channel_id: s.channel_id,
            name: s.name,
            last_activity: s.last_activity,
            preview: s.preview,
            unread: s.unread,
        }
    }
}

/// Per-user channel list, most recent activity first, with unread badges.
///
/// Updated incrementally from deduplicated message inserts; a periodic
/// summaries reload is authoritative and overrides whatever the increments
/// and the optimistic zeroing left behind.
pub struct ChannelRoster {
    local_user: Uuid,
    active: Option<ChannelId>,
    entries: Vec<ChannelEntry>,
}

impl ChannelRoster {
    pub fn new(local_user: Uuid) -> Self {
        Self {
            local_user,
            active: None,
            entries: Vec::new(),
        }
    }

    /// Record one *newly inserted* message (callers dedupe first — feeding
    /// the same message twice would double-count the badge).
    ///
    /// Any activity moves the channel to rank 0. The badge only grows for
    /// messages from someone else in a channel that is not currently open.
    pub fn record_message(&mut self, message: &Message) {
        let from_self = message.sender_id == self.local_user;
        let is_open = self.active.as_ref() == Some(&message.channel_id);

        let idx = match self
            .entries
            .iter()
            .position(|e| e.channel_id == message.channel_id)
        {
            Some(idx) => idx,
            None => {
                // First sighting of this channel; a summaries reload will fix
                // the display name if our guess is off.
                let name = if from_self {
                    message.channel_id.to_string()
                } else {
                    message.sender_username.clone()
                };
                self.entries.push(ChannelEntry {
                    channel_id: message.channel_id.clone(),
                    name,
                    last_activity: message.created_at,
                    preview: None,
                    unread: 0,
                });
                self.entries.len() - 1
            }
        };

        let mut entry = self.entries.remove(idx);
        if message.created_at >= entry.last_activity {
            entry.last_activity = message.created_at;
            entry.preview = Some(message.body.clone());
        }
        if !from_self && !is_open {
            entry.unread += 1;
        }
        self.entries.insert(0, entry);
    }

    /// Select a channel: optimistically zero its badge right away. The caller
    /// fires the ack in the background; the next summaries reload reconciles
    /// whatever the optimistic zero got wrong.
    pub fn open(&mut self, channel: &ChannelId) {
        self.active = Some(channel.clone());
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.channel_id == channel) {
            entry.unread = 0;
        }
    }

    pub fn close(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&ChannelId> {
        self.active.as_ref()
    }

    /// Replace the list with an authoritative reload. Strict last-activity
    /// descending; the sort is stable so equal timestamps keep the server's
    /// relative order instead of flickering.
    pub fn reload(&mut self, entries: Vec<ChannelEntry>) {
        self.entries = entries;
        self.entries
            .sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    }

    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }

    pub fn get(&self, channel: &ChannelId) -> Option<&ChannelEntry> {
        self.entries.iter().find(|e| &e.channel_id == channel)
    }

    pub fn total_unread(&self) -> u32 {
        self.entries.iter().map(|e| e.unread).sum()
    }
}
