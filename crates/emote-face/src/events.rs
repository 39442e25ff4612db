//! Reaction notifications.
//!
//! Observers register a callback with the [`NoticeBus`] and receive every
//! [`ReactionNotice`] raised afterwards, optionally filtered to one
//! [`NoticeKind`]. Notices are delivered synchronously, in subscription
//! order, from inside the tick or call that raised them.

use emote_types::{NoticeKind, ReactionNotice};
use tracing::debug;

/// Handle returned by [`NoticeBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Callback invoked for each delivered notice.
pub type NoticeCallback = Box<dyn FnMut(&ReactionNotice)>;

struct Subscription {
    id: SubscriptionId,
    filter: Option<NoticeKind>,
    callback: NoticeCallback,
}

/// Observer registry for reaction notices.
#[derive(Default)]
pub struct NoticeBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
    /// Notices raised since the last [`drain`](Self::drain).
    raised: Vec<ReactionNotice>,
}

impl core::fmt::Debug for NoticeBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NoticeBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("raised", &self.raised)
            .finish_non_exhaustive()
    }
}

impl NoticeBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every notice, or only for `filter` kinds.
    pub fn subscribe(&mut self, filter: Option<NoticeKind>, callback: NoticeCallback) -> SubscriptionId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription { id, filter, callback });
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Deliver `notice` to every matching subscriber and record it.
    pub fn emit(&mut self, notice: ReactionNotice) {
        debug!(kind = ?notice.kind, reaction = %notice.reaction, other = %notice.event.other_id, "Reaction notice");
        for sub in &mut self.subscriptions {
            if sub.filter.is_none_or(|kind| kind == notice.kind) {
                (sub.callback)(&notice);
            }
        }
        self.raised.push(notice);
    }

    /// Take the notices raised since the last drain.
    pub fn drain(&mut self) -> Vec<ReactionNotice> {
        core::mem::take(&mut self.raised)
    }
}
