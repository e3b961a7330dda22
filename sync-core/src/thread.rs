//! Conversation threads.

use devsync_types::{AccountId, ThreadId};
use serde::{Deserialize, Serialize};

/// A one-to-one conversation with a single account.
///
/// When `contact` is the local account this is the self-thread, the channel
/// used for device-to-device sync payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactThread {
    /// Thread identifier.
    pub id: ThreadId,
    /// The other party (or the local account, for the self-thread).
    pub contact: AccountId,
}

impl ContactThread {
    /// Create a new contact thread with a fresh id.
    pub fn new(contact: AccountId) -> Self {
        Self {
            id: ThreadId::new(),
            contact,
        }
    }

    /// True if this is the conversation of `local` with itself.
    pub fn is_self_thread(&self, local: AccountId) -> bool {
        self.contact == local
    }
}

/// A group conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupThread {
    /// Thread identifier.
    pub id: ThreadId,
    /// Display name of the group.
    pub name: String,
}

impl GroupThread {
    /// Create a new group thread with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ThreadId::new(),
            name: name.into(),
        }
    }
}

/// Any conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Thread {
    /// One-to-one conversation.
    Contact(ContactThread),
    /// Group conversation.
    Group(GroupThread),
}

impl Thread {
    /// The thread's identifier.
    pub fn id(&self) -> ThreadId {
        match self {
            Thread::Contact(t) => t.id,
            Thread::Group(t) => t.id,
        }
    }

    /// The contact thread, if this is one.
    pub fn as_contact(&self) -> Option<&ContactThread> {
        match self {
            Thread::Contact(t) => Some(t),
            Thread::Group(_) => None,
        }
    }
}

impl From<ContactThread> for Thread {
    fn from(thread: ContactThread) -> Self {
        Thread::Contact(thread)
    }
}

impl From<GroupThread> for Thread {
    fn from(thread: GroupThread) -> Self {
        Thread::Group(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_thread_detection() {
        let local = AccountId::new();
        assert!(ContactThread::new(local).is_self_thread(local));
        assert!(!ContactThread::new(AccountId::new()).is_self_thread(local));
    }

    #[test]
    fn thread_id_matches_variant() {
        let contact = ContactThread::new(AccountId::new());
        let group = GroupThread::new("family");
        assert_eq!(Thread::from(contact).id(), contact.id);
        assert_eq!(Thread::from(group.clone()).id(), group.id);
    }

    #[test]
    fn group_is_not_contact() {
        assert!(Thread::from(GroupThread::new("g")).as_contact().is_none());
    }
}
