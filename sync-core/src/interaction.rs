//! Concrete interactions that track read status.
//!
//! Each type implements [`ReadTrackable`] directly. There is no shared base
//! type; [`Interaction`] is a plain sum type for storage and listing.

use devsync_types::{AccountId, InteractionId, SortId, ThreadId, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ReadState, ReadTrackable};

/// A message received from another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Interaction identifier.
    pub id: InteractionId,
    /// Owning thread.
    pub thread_id: ThreadId,
    /// Ordering key within the thread.
    pub sort_id: SortId,
    /// Who sent the message.
    pub author: AccountId,
    /// Message text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// When this device received the message.
    pub received_at: Timestamp,
    /// Disappearing-message duration, counted from the first read.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "duration_secs")]
    pub expires_in: Option<Duration>,
    /// Read status.
    #[serde(default)]
    pub read: ReadState,
}

impl IncomingMessage {
    /// Create an unread message.
    pub fn new(
        thread_id: ThreadId,
        sort_id: SortId,
        author: AccountId,
        body: Option<String>,
        received_at: Timestamp,
    ) -> Self {
        Self {
            id: InteractionId::new(),
            thread_id,
            sort_id,
            author,
            body,
            received_at,
            expires_in: None,
            read: ReadState::unread(),
        }
    }

    /// Give the message a disappearing-message policy.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

impl ReadTrackable for IncomingMessage {
    fn unique_id(&self) -> InteractionId {
        self.id
    }

    fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    fn sort_id(&self) -> SortId {
        self.sort_id
    }

    fn read_state(&self) -> &ReadState {
        &self.read
    }

    fn read_state_mut(&mut self) -> &mut ReadState {
        &mut self.read
    }

    fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }
}

/// What happened on a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Nobody answered.
    Missed,
    /// Answered.
    Incoming,
    /// Rejected by the local user.
    Declined,
}

/// A call event shown in the conversation.
///
/// Call notifications never disappear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNotification {
    /// Interaction identifier.
    pub id: InteractionId,
    /// Owning thread.
    pub thread_id: ThreadId,
    /// Ordering key within the thread.
    pub sort_id: SortId,
    /// Who called.
    pub caller: AccountId,
    /// Outcome of the call.
    pub kind: CallKind,
    /// When the call started.
    pub started_at: Timestamp,
    /// Read status.
    #[serde(default)]
    pub read: ReadState,
}

impl CallNotification {
    /// Create an unread call notification.
    pub fn new(
        thread_id: ThreadId,
        sort_id: SortId,
        caller: AccountId,
        kind: CallKind,
        started_at: Timestamp,
    ) -> Self {
        Self {
            id: InteractionId::new(),
            thread_id,
            sort_id,
            caller,
            kind,
            started_at,
            read: ReadState::unread(),
        }
    }
}

impl ReadTrackable for CallNotification {
    fn unique_id(&self) -> InteractionId {
        self.id
    }

    fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    fn sort_id(&self) -> SortId {
        self.sort_id
    }

    fn read_state(&self) -> &ReadState {
        &self.read
    }

    fn read_state_mut(&mut self) -> &mut ReadState {
        &mut self.read
    }
}

/// Any stored interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    /// An incoming message.
    IncomingMessage(IncomingMessage),
    /// A call notification.
    Call(CallNotification),
}

impl Interaction {
    fn trackable(&self) -> &dyn ReadTrackable {
        match self {
            Interaction::IncomingMessage(m) => m,
            Interaction::Call(c) => c,
        }
    }

    fn trackable_mut(&mut self) -> &mut dyn ReadTrackable {
        match self {
            Interaction::IncomingMessage(m) => m,
            Interaction::Call(c) => c,
        }
    }
}

impl ReadTrackable for Interaction {
    fn unique_id(&self) -> InteractionId {
        self.trackable().unique_id()
    }

    fn thread_id(&self) -> ThreadId {
        self.trackable().thread_id()
    }

    fn sort_id(&self) -> SortId {
        self.trackable().sort_id()
    }

    fn read_state(&self) -> &ReadState {
        self.trackable().read_state()
    }

    fn read_state_mut(&mut self) -> &mut ReadState {
        self.trackable_mut().read_state_mut()
    }

    fn expires_in(&self) -> Option<Duration> {
        self.trackable().expires_in()
    }
}

impl From<IncomingMessage> for Interaction {
    fn from(message: IncomingMessage) -> Self {
        Interaction::IncomingMessage(message)
    }
}

impl From<CallNotification> for Interaction {
    fn from(call: CallNotification) -> Self {
        Interaction::Call(call)
    }
}

/// Serialize an optional duration as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
