//! Domain types shared across planning and execution.

use std::collections::HashSet;
use std::fmt;

/// Remote-assigned message identifier. Keys all replies and likes that
/// target the message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An identity that can authenticate and act against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    /// Login handle used to authenticate as this actor.
    pub handle: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Group,
    Channel,
}

/// Immutable snapshot of a group or channel for the duration of one run.
#[derive(Debug, Clone)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub kind: ContainerKind,
    pub members: Vec<Actor>,
    /// Groups only; channels leave this empty.
    pub admins: Vec<Actor>,
}

impl Container {
    /// Every membership entry that plans posts: members followed by admins.
    /// An actor listed in both is deliberately kept as two entries, matching
    /// how the platform itself reports overlapping rosters.
    pub fn posting_identities(&self) -> Vec<Actor> {
        self.members
            .iter()
            .chain(self.admins.iter())
            .cloned()
            .collect()
    }

    /// Distinct actors (by handle) eligible to reply to or like a message by
    /// `author`.
    pub fn interaction_candidates(&self, author: &Actor) -> Vec<Actor> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.members
            .iter()
            .chain(self.admins.iter())
            .filter(|actor| actor.handle != author.handle)
            .filter(|actor| seen.insert(actor.handle.as_str()))
            .cloned()
            .collect()
    }
}

/// Record of a successful top-level post. Created only after the remote call
/// succeeds; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub id: MessageId,
    pub container_id: String,
    pub author: Actor,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(handle: &str) -> Actor {
        Actor {
            id: format!("255.{}", handle),
            display_name: handle.to_string(),
            handle: handle.to_string(),
        }
    }

    fn group(members: Vec<Actor>, admins: Vec<Actor>) -> Container {
        Container {
            id: "401.g1".to_string(),
            name: "Test group".to_string(),
            kind: ContainerKind::Group,
            members,
            admins,
        }
    }

    #[test]
    fn posting_identities_keep_member_admin_duplicates() {
        let overlap = actor("karinl");
        let container = group(
            vec![overlap.clone(), actor("jonasb")],
            vec![overlap.clone()],
        );
        let identities = container.posting_identities();
        assert_eq!(identities.len(), 3);
        assert_eq!(
            identities
                .iter()
                .filter(|a| a.handle == overlap.handle)
                .count(),
            2
        );
    }

    #[test]
    fn interaction_candidates_exclude_author_and_deduplicate() {
        let author = actor("karinl");
        let container = group(
            vec![author.clone(), actor("jonasb"), actor("miriams")],
            vec![author.clone(), actor("jonasb")],
        );
        let candidates = container.interaction_candidates(&author);
        let handles: Vec<&str> = candidates.iter().map(|a| a.handle.as_str()).collect();
        assert_eq!(handles, vec!["jonasb", "miriams"]);
    }
}
