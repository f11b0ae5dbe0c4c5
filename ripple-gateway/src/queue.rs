//! An in-process gate on how often a [`Shard`](crate::shard::Shard) may
//! send an `Identify` payload.
//!
//! Discord enforces a global limit on how often a process may start new
//! gateway sessions. This queue only serializes identify attempts made
//! within this one process — coordinating across processes is explicitly
//! out of scope for this core; a caller running shards in multiple
//! processes needs an external coordinator instead.

use once_cell::sync::Lazy;
use std::{
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        oneshot::{self, Sender},
        OnceCell,
    },
    time::sleep,
};

/// How often this process may start a new gateway session.
const IDENTIFY_INTERVAL: Duration = Duration::from_secs(5);

/// A gate a [`Shard`](crate::shard::Shard) consults before sending
/// `Identify`.
pub trait IdentifyQueue: Debug + Send + Sync {
    /// Request permission to identify. The returned future resolves once
    /// the shard is clear to proceed.
    fn request(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// A local, in-process [`IdentifyQueue`], releasing one waiting shard every
/// [`IDENTIFY_INTERVAL`].
///
/// The releaser task is spawned lazily, on the first [`LocalQueue::request`]
/// call, rather than from [`LocalQueue::new`] — constructing a `LocalQueue`
/// (and therefore a [`Shard`](crate::shard::Shard)) must not require an
/// already-running Tokio runtime.
#[derive(Debug, Default)]
pub struct LocalQueue {
    sender: OnceCell<UnboundedSender<Sender<()>>>,
}

impl LocalQueue {
    /// Create a new local queue. No task is spawned until the first
    /// [`LocalQueue::request`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sender: OnceCell::const_new(),
        }
    }

    async fn sender(&self) -> UnboundedSender<Sender<()>> {
        self.sender
            .get_or_init(|| async {
                let (tx, rx) = unbounded_channel();
                tokio::spawn(release(rx));
                tx
            })
            .await
            .clone()
    }
}

async fn release(mut rx: UnboundedReceiver<Sender<()>>) {
    while let Some(waiting) = rx.recv().await {
        if waiting.send(()).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!("identify waiter dropped before being released");
        }

        sleep(IDENTIFY_INTERVAL).await;
    }
}

impl IdentifyQueue for LocalQueue {
    fn request(&'_ self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let sender = self.sender().await;
            let (tx, rx) = oneshot::channel();

            if sender.send(tx).is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!("identify queue releaser task is gone, proceeding unthrottled");
                return;
            }

            let _ = rx.await;
        })
    }
}

/// An [`IdentifyQueue`] that never throttles, for use behind a
/// session-managing proxy gateway that already enforces the limit.
#[derive(Debug, Default)]
pub struct NoOpQueue;

impl IdentifyQueue for NoOpQueue {
    fn request(&'_ self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(std::future::ready(()))
    }
}

/// The process-wide [`LocalQueue`] every [`Shard`](crate::shard::Shard)
/// shares unless given an explicit [`ShardBuilder::identify_queue`]
/// override.
///
/// Identify throttling is only meaningful when every shard in a process
/// contends for the same gate; a queue built fresh per shard can never
/// actually serialize anything, since a shard can't race itself. The
/// `Lazy` wrapper defers construction (and, transitively, the releaser
/// task's spawn) to the first shard that actually requests to identify.
///
/// [`ShardBuilder::identify_queue`]: crate::shard::ShardBuilder::identify_queue
static DEFAULT_IDENTIFY_QUEUE: Lazy<Arc<LocalQueue>> = Lazy::new(|| Arc::new(LocalQueue::new()));

/// The shared default identify queue used by [`ShardBuilder::new`](crate::shard::ShardBuilder::new).
pub(crate) fn default_identify_queue() -> Arc<dyn IdentifyQueue> {
    Arc::clone(&DEFAULT_IDENTIFY_QUEUE) as Arc<dyn IdentifyQueue>
}

#[cfg(test)]
mod tests {
    use super::{default_identify_queue, IdentifyQueue, LocalQueue, NoOpQueue};
    use static_assertions::{assert_impl_all, assert_obj_safe};

    assert_impl_all!(LocalQueue: IdentifyQueue, Send, Sync);
    assert_impl_all!(NoOpQueue: IdentifyQueue, Send, Sync);
    assert_obj_safe!(IdentifyQueue);

    #[test]
    fn constructing_a_local_queue_needs_no_runtime() {
        // No #[tokio::test] here on purpose: `LocalQueue::new` must not
        // panic with "there is no reactor running" when called outside a
        // Tokio runtime, since it's the default `ShardBuilder::new` reaches
        // for and `Shard::new` is a plain synchronous constructor.
        let _queue = LocalQueue::new();
    }

    #[tokio::test]
    async fn noop_queue_never_blocks() {
        tokio::time::timeout(std::time::Duration::from_millis(50), NoOpQueue.request())
            .await
            .expect("NoOpQueue::request must resolve immediately");
    }

    #[tokio::test]
    async fn local_queue_releases_a_single_waiter_promptly() {
        let queue = LocalQueue::new();

        tokio::time::timeout(std::time::Duration::from_millis(200), queue.request())
            .await
            .expect("the first waiter should not be stuck behind anyone");
    }

    #[tokio::test]
    async fn the_default_queue_is_the_same_instance_across_calls() {
        use std::sync::Arc;

        let a = default_identify_queue();
        let b = default_identify_queue();

        assert!(Arc::ptr_eq(&a, &b));
    }
}
