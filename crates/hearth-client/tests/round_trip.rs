//! End-to-end synchronization round trip over the in-memory transport:
//! a send fans out to both participants, the recipient's state converges
//! under duplicate delivery, and the ack flows a read receipt back to the
//! sender's view.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use hearth_client::SyncState;
use hearth_db::time::fmt_ts;
use hearth_db::Database;
use hearth_sync::{publish, read_state, EventPublisher, MemorySink};
use hearth_types::models::Message;
use hearth_types::ChannelId;

fn uid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

struct Harness {
    db: Database,
    sink: Arc<MemorySink>,
    publisher: EventPublisher,
    channel: ChannelId,
}

impl Harness {
    fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&uid(1).to_string(), "ana", "x").unwrap();
        db.create_user(&uid(2).to_string(), "ben", "x").unwrap();
        db.create_user(&uid(3).to_string(), "cal", "x").unwrap();
        let sink = Arc::new(MemorySink::new());
        let publisher = EventPublisher::new(sink.clone());
        Self {
            db,
            sink,
            publisher,
            channel: ChannelId::direct(uid(1), uid(2)),
        }
    }

    /// What a send handler does: store the row, then fan out.
    fn send(&self, id: u128, sender: Uuid, body: &str, at: &str) -> Message {
        let message = Message {
            id: uid(id),
            channel_id: self.channel.clone(),
            sender_id: sender,
            sender_username: if sender == uid(1) { "ana" } else { "ben" }.into(),
            body: body.into(),
            created_at: ts(at),
            read_at: None,
        };
        self.db
            .insert_message(
                &message.id.to_string(),
                self.channel.as_str(),
                &sender.to_string(),
                body,
                &fmt_ts(message.created_at),
            )
            .unwrap();
        publish::fan_out_message(&self.db, &self.publisher, &message).unwrap();
        message
    }
}

#[test]
fn send_ack_receipt_round_trip() {
    let h = Harness::new();
    let now = Instant::now();
    let mut ana = SyncState::new(uid(1));
    let mut ben = SyncState::new(uid(2));

    // Ana sends; her own state takes the optimistic copy from the response.
    let m1 = h.send(10, uid(1), "claim approved?", "2026-08-06T10:00:00Z");
    ana.record_send(m1.clone());

    // Both private queues got the event; a third user got nothing.
    assert_eq!(h.sink.for_user(uid(1)).len(), 1);
    assert_eq!(h.sink.for_user(uid(2)).len(), 1);
    assert!(h.sink.for_user(uid(3)).is_empty());

    // Ana also receives her own echo (another open session would too) —
    // deduplicated against the optimistic copy, no badge.
    for event in h.sink.for_user(uid(1)) {
        ana.apply_event(event, now);
    }
    assert_eq!(ana.timeline(&h.channel).unwrap().len(), 1);
    assert_eq!(ana.roster().total_unread(), 0);

    // The transport redelivers Ben's copy: one message, one badge.
    for event in h.sink.for_user(uid(2)) {
        ben.apply_event(event.clone(), now);
        ben.apply_event(event, now);
    }
    assert_eq!(ben.timeline(&h.channel).unwrap().len(), 1);
    assert_eq!(ben.roster().get(&h.channel).unwrap().unread, 1);

    // Ben opens the channel and acks it.
    ben.open_channel(&h.channel);
    assert_eq!(ben.roster().total_unread(), 0);
    let before = h.sink.for_user(uid(1)).len();
    let outcome = read_state::mark_read_at(
        &h.db,
        &h.publisher,
        uid(2),
        &h.channel,
        ts("2026-08-06T10:01:00Z"),
    )
    .unwrap();
    assert_eq!(outcome.receipts, 1);

    // Exactly one receipt lands on Ana's queue and flips her copy of m1.
    let receipts: Vec<_> = h.sink.for_user(uid(1)).split_off(before);
    assert_eq!(receipts.len(), 1);
    for event in receipts {
        ana.apply_event(event, now);
    }
    assert_eq!(
        ana.timeline(&h.channel).unwrap().messages()[0].read_at,
        Some(ts("2026-08-06T10:01:00Z"))
    );

    // Ben's own copy of m1 is untouched — he is not the sender.
    assert_eq!(ben.timeline(&h.channel).unwrap().messages()[0].read_at, None);

    // Acking again with nothing new publishes nothing.
    let quiet = read_state::mark_read_at(
        &h.db,
        &h.publisher,
        uid(2),
        &h.channel,
        ts("2026-08-06T10:02:00Z"),
    )
    .unwrap();
    assert_eq!(quiet.receipts, 0);
    assert_eq!(h.sink.for_user(uid(1)).len(), before + 1);
}

#[test]
fn reload_after_missed_event_converges() {
    let h = Harness::new();
    let mut ben = SyncState::new(uid(2));

    // The live event for m1 is lost entirely; Ben later reloads history.
    let m1 = h.send(10, uid(1), "are you there?", "2026-08-06T10:00:00Z");
    let rows = h.db.get_messages(h.channel.as_str(), 50, None).unwrap();
    assert_eq!(rows.len(), 1);

    let reloaded = Message {
        id: rows[0].id.parse().unwrap(),
        channel_id: ChannelId::from(rows[0].channel_id.clone()),
        sender_id: rows[0].sender_id.parse().unwrap(),
        sender_username: rows[0].sender_username.clone(),
        body: rows[0].body.clone(),
        created_at: hearth_db::time::parse_ts(&rows[0].created_at).unwrap(),
        read_at: None,
    };
    assert_eq!(ben.merge_history(&h.channel, vec![reloaded]), 1);
    assert_eq!(ben.timeline(&h.channel).unwrap().len(), 1);

    // The pushed event finally shows up late — still one entry.
    let now = Instant::now();
    for event in h.sink.for_user(uid(2)) {
        ben.apply_event(event, now);
    }
    assert_eq!(ben.timeline(&h.channel).unwrap().len(), 1);
    assert_eq!(ben.timeline(&h.channel).unwrap().messages()[0].id, m1.id);
}
