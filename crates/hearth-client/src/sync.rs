use std::collections::HashMap;
use std::time::Instant;

use hearth_types::events::ChatEvent;
use hearth_types::models::Message;
use hearth_types::ChannelId;
use uuid::Uuid;

use crate::roster::{ChannelEntry, ChannelRoster};
use crate::timeline::Timeline;
use crate::typing::TypingWatcher;

/// All client-side chat state for one user on one surface.
///
/// Owns a [`Timeline`] per channel, the [`ChannelRoster`], and the typing
/// watcher, and routes every update source through them so the invariants
/// compose: an event duplicated by the transport can neither duplicate a
/// message nor double-count a badge, because the badge only moves when the
/// timeline actually inserted something.
pub struct SyncState {
    local_user: Uuid,
    timelines: HashMap<ChannelId, Timeline>,
    roster: ChannelRoster,
    typing: TypingWatcher,
}

impl SyncState {
    pub fn new(local_user: Uuid) -> Self {
        Self {
            local_user,
            timelines: HashMap::new(),
            roster: ChannelRoster::new(local_user),
            typing: TypingWatcher::new(local_user),
        }
    }

    /// Apply one pushed gateway event.
    pub fn apply_event(&mut self, event: ChatEvent, now: Instant) {
        match event {
            ChatEvent::Ready { .. } => {}
            ChatEvent::NewMessage { message, .. } => {
                if self.timeline_mut(&message.channel_id).insert(message.clone()) {
                    self.roster.record_message(&message);
                }
            }
            ChatEvent::MessagesRead {
                channel_id,
                read_by,
                read_at,
            } => {
                self.timeline_mut(&channel_id).apply_read(read_by, read_at);
            }
            ChatEvent::UserTyping {
                channel_id,
                user_id,
                username,
                is_typing,
            } => {
                self.typing
                    .apply(channel_id, user_id, username, is_typing, now);
            }
        }
    }

    /// Optimistic path: insert the message a send action just returned,
    /// before any gateway echo arrives.
    pub fn record_send(&mut self, message: Message) {
        if self.timeline_mut(&message.channel_id).insert(message.clone()) {
            self.roster.record_message(&message);
        }
    }

    /// Authoritative history page for one channel. Does not touch badges —
    /// unread reconciliation comes from [`SyncState::reload_summaries`].
    pub fn merge_history(&mut self, channel: &ChannelId, messages: Vec<Message>) -> usize {
        self.timeline_mut(channel).merge_reload(messages)
    }

    /// Authoritative channel-list reload.
    pub fn reload_summaries(&mut self, entries: Vec<ChannelEntry>) {
        self.roster.reload(entries);
    }

    /// Select a channel. Zeroes its badge optimistically; the caller is
    /// responsible for firing the ack in the background.
    pub fn open_channel(&mut self, channel: &ChannelId) {
        self.roster.open(channel);
    }

    pub fn close_channel(&mut self) {
        self.roster.close();
    }

    pub fn timeline(&self, channel: &ChannelId) -> Option<&Timeline> {
        self.timelines.get(channel)
    }

    pub fn roster(&self) -> &ChannelRoster {
        &self.roster
    }

    pub fn typing_in(&self, channel: &ChannelId, now: Instant) -> Vec<(Uuid, String)> {
        self.typing.typing_in(channel, now)
    }

    pub fn sweep_typing(&mut self, now: Instant) {
        self.typing.sweep(now);
    }

    fn timeline_mut(&mut self, channel: &ChannelId) -> &mut Timeline {
        self.timelines
            .entry(channel.clone())
            .or_insert_with(|| Timeline::new(self.local_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn msg(id: u128, chan: &ChannelId, sender: Uuid, at: &str) -> Message {
        Message {
            id: uid(id),
            channel_id: chan.clone(),
            sender_id: sender,
            sender_username: if sender == uid(1) { "ana" } else { "ben" }.into(),
            body: format!("m{id}"),
            created_at: at.parse().unwrap(),
            read_at: None,
        }
    }

    fn push(chan: &ChannelId, m: &Message) -> ChatEvent {
        ChatEvent::NewMessage {
            channel_id: chan.clone(),
            message: m.clone(),
        }
    }

    #[test]
    fn duplicate_delivery_counts_once() {
        let mut state = SyncState::new(uid(2));
        let chan = ChannelId::direct(uid(1), uid(2));
        let m1 = msg(10, &chan, uid(1), "2026-08-06T10:00:00Z");
        let now = Instant::now();

        // At-least-once transport delivers the same event twice.
        state.apply_event(push(&chan, &m1), now);
        state.apply_event(push(&chan, &m1), now);

        assert_eq!(state.timeline(&chan).unwrap().len(), 1);
        assert_eq!(state.roster().get(&chan).unwrap().unread, 1);
    }

    #[test]
    fn optimistic_push_and_reload_converge_to_one_entry() {
        let mut state = SyncState::new(uid(1));
        let chan = ChannelId::direct(uid(1), uid(2));
        let m1 = msg(10, &chan, uid(1), "2026-08-06T10:00:00Z");
        let now = Instant::now();

        state.record_send(m1.clone());
        state.apply_event(push(&chan, &m1), now);
        state.merge_history(&chan, vec![m1.clone()]);

        assert_eq!(state.timeline(&chan).unwrap().len(), 1);
        // Our own message never badges, on any path.
        assert_eq!(state.roster().total_unread(), 0);
    }

    #[test]
    fn push_before_optimistic_insert_still_converges() {
        let mut state = SyncState::new(uid(1));
        let chan = ChannelId::direct(uid(1), uid(2));
        let m1 = msg(10, &chan, uid(1), "2026-08-06T10:00:00Z");
        let now = Instant::now();

        // The gateway echo can beat the HTTP response.
        state.apply_event(push(&chan, &m1), now);
        state.record_send(m1.clone());

        assert_eq!(state.timeline(&chan).unwrap().len(), 1);
    }

    #[test]
    fn receipt_flips_sender_view_and_survives_later_events() {
        let mut state = SyncState::new(uid(1));
        let chan = ChannelId::direct(uid(1), uid(2));
        let m1 = msg(10, &chan, uid(1), "2026-08-06T10:00:00Z");
        let now = Instant::now();

        state.record_send(m1.clone());
        let read_at = "2026-08-06T10:05:00Z".parse().unwrap();
        state.apply_event(
            ChatEvent::MessagesRead {
                channel_id: chan.clone(),
                read_by: uid(2),
                read_at,
            },
            now,
        );
        assert_eq!(state.timeline(&chan).unwrap().messages()[0].read_at, Some(read_at));

        // A duplicated unstamped copy of m1 cannot unset it.
        state.apply_event(push(&chan, &m1), now);
        assert_eq!(state.timeline(&chan).unwrap().messages()[0].read_at, Some(read_at));
    }

    #[test]
    fn open_channel_reads_without_badging() {
        let mut state = SyncState::new(uid(2));
        let chan = ChannelId::direct(uid(1), uid(2));
        let now = Instant::now();

        state.apply_event(push(&chan, &msg(10, &chan, uid(1), "2026-08-06T10:00:00Z")), now);
        assert_eq!(state.roster().total_unread(), 1);

        state.open_channel(&chan);
        assert_eq!(state.roster().total_unread(), 0);

        state.apply_event(push(&chan, &msg(11, &chan, uid(1), "2026-08-06T10:01:00Z")), now);
        assert_eq!(state.roster().total_unread(), 0);
    }

    #[test]
    fn typing_events_route_to_the_watcher() {
        let mut state = SyncState::new(uid(2));
        let chan = ChannelId::direct(uid(1), uid(2));
        let now = Instant::now();

        state.apply_event(
            ChatEvent::UserTyping {
                channel_id: chan.clone(),
                user_id: uid(1),
                username: "ana".into(),
                is_typing: true,
            },
            now,
        );
        assert_eq!(state.typing_in(&chan, now), vec![(uid(1), "ana".to_string())]);
    }
}
