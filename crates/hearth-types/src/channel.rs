use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation scope identifier.
///
/// Two forms exist on the wire:
///
///   `dm:<uuid>:<uuid>`  — direct 1:1 channel; the two participant ids are
///                         sorted ascending so both sides derive the same id
///   `grp:<uuid>`        — group channel backed by a membership roster
///
/// The direct form is the canonical encoding that lets fanout recover both
/// participants without a database round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Direct,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelIdError {
    #[error("malformed channel id: {0}")]
    Malformed(String),
    #[error("not a direct channel: {0}")]
    NotDirect(String),
}

impl ChannelId {
    /// Canonical id for the direct channel between two users.
    /// Order-independent: `direct(a, b) == direct(b, a)`.
    pub fn direct(a: Uuid, b: Uuid) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("dm:{lo}:{hi}"))
    }

    pub fn group(id: Uuid) -> Self {
        Self(format!("grp:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Result<ChannelKind, ChannelIdError> {
        if self.0.starts_with("dm:") {
            Ok(ChannelKind::Direct)
        } else if self.0.starts_with("grp:") {
            Ok(ChannelKind::Group)
        } else {
            Err(ChannelIdError::Malformed(self.0.clone()))
        }
    }

    /// Decode the two participants of a direct channel.
    ///
    /// Fails on group ids and on anything that does not parse back to two
    /// distinct, correctly ordered uuids — a malformed id must never silently
    /// resolve to someone else's conversation.
    pub fn direct_members(&self) -> Result<(Uuid, Uuid), ChannelIdError> {
        let rest = match self.0.strip_prefix("dm:") {
            Some(rest) => rest,
            None if self.0.starts_with("grp:") => {
                return Err(ChannelIdError::NotDirect(self.0.clone()));
            }
            None => return Err(ChannelIdError::Malformed(self.0.clone())),
        };

        let (a, b) = rest
            .split_once(':')
            .ok_or_else(|| ChannelIdError::Malformed(self.0.clone()))?;
        let a: Uuid = a
            .parse()
            .map_err(|_| ChannelIdError::Malformed(self.0.clone()))?;
        let b: Uuid = b
            .parse()
            .map_err(|_| ChannelIdError::Malformed(self.0.clone()))?;

        if a > b || a == b {
            return Err(ChannelIdError::Malformed(self.0.clone()));
        }
        Ok((a, b))
    }

    /// For a direct channel, the participant that is not `me`.
    pub fn direct_peer(&self, me: Uuid) -> Result<Uuid, ChannelIdError> {
        let (a, b) = self.direct_members()?;
        if me == a {
            Ok(b)
        } else if me == b {
            Ok(a)
        } else {
            Err(ChannelIdError::NotDirect(self.0.clone()))
        }
    }

    pub fn group_id(&self) -> Result<Uuid, ChannelIdError> {
        self.0
            .strip_prefix("grp:")
            .and_then(|rest| rest.parse().ok())
            .ok_or_else(|| ChannelIdError::Malformed(self.0.clone()))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ChannelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self(s.to_string());
        // Validate eagerly so handler paths can trust the id shape.
        match id.kind()? {
            ChannelKind::Direct => id.direct_members().map(|_| id),
            ChannelKind::Group => id.group_id().map(|_| id),
        }
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn direct_id_is_order_independent() {
        let a = uid(1);
        let b = uid(2);
        assert_eq!(ChannelId::direct(a, b), ChannelId::direct(b, a));
    }

    #[test]
    fn direct_members_round_trip() {
        let a = uid(7);
        let b = uid(3);
        let chan = ChannelId::direct(a, b);
        let (lo, hi) = chan.direct_members().unwrap();
        assert_eq!((lo, hi), (uid(3), uid(7)));
        assert_eq!(chan.direct_peer(a).unwrap(), b);
        assert_eq!(chan.direct_peer(b).unwrap(), a);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in [
            "dm:not-a-uuid:also-not",
            "dm:00000000-0000-0000-0000-000000000001",
            "chan:whatever",
            "",
        ] {
            assert!(ChannelId::from(bad.to_string()).direct_members().is_err());
        }

        // Wrong participant order is not canonical.
        let unsorted = ChannelId::from(format!("dm:{}:{}", uid(9), uid(2)));
        assert!(unsorted.direct_members().is_err());

        // Self-channel is not a conversation.
        let selfie = ChannelId::from(format!("dm:{}:{}", uid(4), uid(4)));
        assert!(selfie.direct_members().is_err());
    }

    #[test]
    fn group_ids_parse() {
        let chan = ChannelId::group(uid(42));
        assert_eq!(chan.kind().unwrap(), ChannelKind::Group);
        assert_eq!(chan.group_id().unwrap(), uid(42));
        assert!(matches!(
            chan.direct_members(),
            Err(ChannelIdError::NotDirect(_))
        ));
    }

    #[test]
    fn from_str_validates() {
        let a = uid(1);
        let b = uid(2);
        let ok: ChannelId = format!("dm:{a}:{b}").parse().unwrap();
        assert_eq!(ok, ChannelId::direct(a, b));
        assert!("dm:garbage".parse::<ChannelId>().is_err());
        assert!("grp:garbage".parse::<ChannelId>().is_err());
    }
}
