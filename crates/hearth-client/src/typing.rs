use std::collections::HashMap;
use std::time::{Duration, Instant};

use hearth_types::ChannelId;
use uuid::Uuid;

/// Minimum gap between two `is_typing: true` publishes, however fast the
/// user types.
pub const TYPING_THROTTLE: Duration = Duration::from_secs(2);

/// Quiet period after the last keystroke before the sender publishes
/// `is_typing: false`.
pub const TYPING_QUIET: Duration = Duration::from_secs(2);

/// Receiving-side safety expiry, 2x the quiet period: if the stop signal is
/// lost, the indicator still clears on its own within this window.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start,
    Stop,
}

/// Sending-side throttle: Idle -> Typing on a keystroke, back to Idle after a
/// quiet period or blur.
///
/// Time is an argument everywhere, never sampled internally, so the machine is
/// deterministic and the UI layer decides what "now" means.
pub struct TypingThrottle {
    state: Option<Typing>,
}

struct Typing {
    last_signal: Instant,
    last_keystroke: Instant,
}

impl TypingThrottle {
    pub fn new() -> Self {
        Self { state: None }
    }

    /// A keystroke happened. Returns `Start` on the Idle -> Typing edge and
    /// again whenever the throttle window has elapsed; otherwise nothing.
    pub fn on_keystroke(&mut self, now: Instant) -> Option<TypingSignal> {
        match &mut self.state {
            None => {
                self.state = Some(Typing {
                    last_signal: now,
                    last_keystroke: now,
                });
                Some(TypingSignal::Start)
            }
            Some(typing) => {
                typing.last_keystroke = now;
                if now.duration_since(typing.last_signal) >= TYPING_THROTTLE {
                    typing.last_signal = now;
                    Some(TypingSignal::Start)
                } else {
                    None
                }
            }
        }
    }

    /// Periodic poll. Returns `Stop` once the quiet period elapses.
    pub fn tick(&mut self, now: Instant) -> Option<TypingSignal> {
        match &self.state {
            Some(typing) if now.duration_since(typing.last_keystroke) >= TYPING_QUIET => {
                self.state = None;
                Some(TypingSignal::Stop)
            }
            _ => None,
        }
    }

    /// Input lost focus: stop immediately if we were typing.
    pub fn on_blur(&mut self) -> Option<TypingSignal> {
        self.state.take().map(|_| TypingSignal::Stop)
    }

    pub fn is_typing(&self) -> bool {
        self.state.is_some()
    }
}

impl Default for TypingThrottle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving-side indicator state.
///
/// Each `is_typing: true` arms a fresh safety expiry, so a lost stop signal
/// can only ever leave the indicator up for [`TYPING_EXPIRY`] — the entry
/// self-heals instead of needing teardown.
pub struct TypingWatcher {
    local_user: Uuid,
    active: HashMap<(ChannelId, Uuid), Indicator>,
}

struct Indicator {
    username: String,
    expires_at: Instant,
}

impl TypingWatcher {
    pub fn new(local_user: Uuid) -> Self {
        Self {
            local_user,
            active: HashMap::new(),
        }
    }

    /// Apply a `UserTyping` event. The local user's own echo is ignored.
    pub fn apply(
        &mut self,
        channel: ChannelId,
        user_id: Uuid,
        username: String,
        is_typing: bool,
        now: Instant,
    ) {
        if user_id == self.local_user {
            return;
        }
        if is_typing {
            self.active.insert(
                (channel, user_id),
                Indicator {
                    username,
                    expires_at: now + TYPING_EXPIRY,
                },
            );
        } else {
            self.active.remove(&(channel, user_id));
        }
    }

    /// Who is visibly typing in `channel` right now. Expired entries are not
    /// reported even if `sweep` has not run yet.
    pub fn typing_in(&self, channel: &ChannelId, now: Instant) -> Vec<(Uuid, String)> {
        let mut users: Vec<(Uuid, String)> = self
            .active
            .iter()
            .filter(|((chan, _), ind)| chan == channel && now < ind.expires_at)
            .map(|((_, user), ind)| (*user, ind.username.clone()))
            .collect();
        users.sort_by_key(|(user, _)| *user);
        users
    }

    /// Drop expired entries. Safe to call at any cadence.
    pub fn sweep(&mut self, now: Instant) {
        self.active.retain(|_, ind| now < ind.expires_at);
    }
}
