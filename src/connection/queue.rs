use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::sync::Notify;

use crate::connection::Exchangeable;
use crate::error::Error;
use crate::protocol::server::ServerMessage;
use crate::protocol::ClientMessage;

/// What one queued exchange wants to put on the wire.
pub(crate) enum Request {
    /// A single client message followed by its response.
    Message(ClientMessage),

    /// A bidirectional contract producing requests over the lifetime of
    /// the exchange.
    Flow(Box<dyn Exchangeable>),
}

impl Request {
    /// Whether disposing this request before it reaches the wire
    /// releases payload buffers it owns. A flow is assumed to own the
    /// buffers of the requests it has yet to produce.
    pub(crate) fn is_disposable(&self) -> bool {
        match self {
            Request::Message(message) => message.is_disposable(),
            Request::Flow(_) => true,
        }
    }
}

/// One pending exchange: the request and the channel its server
/// messages are delivered on. Dropping the task releases any buffers
/// the request owns.
pub(crate) struct RequestTask {
    pub(crate) request: Request,
    pub(crate) tx: mpsc::UnboundedSender<Result<ServerMessage, Error>>,
}

/// Serialises concurrent exchanges onto the wire.
///
/// A FIFO with an internal *active* slot: [`submit`] either hands the
/// task to the I/O task immediately (slot empty) or enqueues it;
/// [`run`], invoked on each exchange completion, clears the slot and
/// activates the head of the queue. Tasks activate strictly in
/// submission order; the lock scope is the only cross-task hand-off
/// point.
///
/// [`submit`]: Self::submit
/// [`run`]: Self::run
pub(crate) struct RequestQueue {
    inner: Mutex<QueueInner>,
    wakeup: Notify,
}

struct QueueInner {
    active: bool,
    queue: VecDeque<RequestTask>,
    drained: bool,
}

impl RequestQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                active: false,
                queue: VecDeque::new(),
                drained: false,
            }),
            wakeup: Notify::new(),
        }
    }

    /// Admits a task, failing it immediately when the queue has been
    /// drained. May be called from any task or thread.
    pub(crate) fn submit(&self, task: RequestTask) {
        {
            let mut inner = self.inner.lock().expect("request queue poisoned");

            if !inner.drained {
                inner.queue.push_back(task);
                drop(inner);
                self.wakeup.notify_one();
                return;
            }
        }

        // Drained: dispose the request and deliver the deterministic
        // failure
        if task.request.is_disposable() {
            tracing::trace!("releasing buffers owned by a refused request");
        }

        let _ = task.tx.send(Err(Error::ExchangeClosed));
    }

    /// Awaits activation of the next task, in submission order. Returns
    /// `None` once drained.
    pub(crate) async fn next(&self) -> Option<RequestTask> {
        loop {
            let wakeup = self.wakeup.notified();

            {
                let mut inner = self.inner.lock().expect("request queue poisoned");

                if inner.drained {
                    return None;
                }

                if !inner.active {
                    if let Some(task) = inner.queue.pop_front() {
                        inner.active = true;
                        return Some(task);
                    }
                }
            }

            wakeup.await;
        }
    }

    /// Clears the active slot after an exchange terminates so the head
    /// of the queue may activate.
    pub(crate) fn run(&self) {
        let mut inner = self.inner.lock().expect("request queue poisoned");
        inner.active = false;
        drop(inner);

        self.wakeup.notify_one();
    }

    /// Fails every pending task with `error` and rejects all future
    /// submissions.
    pub(crate) fn dispose(&self, error: &Error) {
        let pending = {
            let mut inner = self.inner.lock().expect("request queue poisoned");
            inner.drained = true;
            inner.active = false;

            std::mem::take(&mut inner.queue)
        };

        if !pending.is_empty() {
            tracing::trace!(count = pending.len(), "draining pending exchanges");
        }

        for task in pending {
            if task.request.is_disposable() {
                tracing::trace!("releasing buffers owned by a drained request");
            }

            let _ = task.tx.send(Err(error.duplicate()));
        }

        self.wakeup.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn is_drained(&self) -> bool {
        self.inner.lock().expect("request queue poisoned").drained
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::{Request, RequestQueue, RequestTask};
    use crate::error::Error;
    use crate::protocol::ClientMessage;

    fn task() -> (
        RequestTask,
        mpsc::UnboundedReceiver<Result<crate::protocol::server::ServerMessage, Error>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            RequestTask {
                request: Request::Message(ClientMessage::ping()),
                tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn it_activates_tasks_in_submission_order() {
        let queue = RequestQueue::new();

        let (first, _rx1) = task();
        let (second, _rx2) = task();

        let first_tx = first.tx.clone();
        queue.submit(first);
        queue.submit(second);

        let active = queue.next().await.unwrap();
        assert!(active.tx.same_channel(&first_tx));

        // the second task stays queued until the first completes
        queue.run();
        let next = queue.next().await.unwrap();
        assert!(!next.tx.same_channel(&first_tx));
    }

    #[tokio::test]
    async fn it_holds_the_active_slot_until_run() {
        let queue = RequestQueue::new();

        let (first, _rx1) = task();
        queue.submit(first);
        let _active = queue.next().await.unwrap();

        let (second, _rx2) = task();
        queue.submit(second);

        // no activation while the slot is held
        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), queue.next());
        assert!(pending.await.is_err());
    }

    #[tokio::test]
    async fn it_fails_pending_tasks_on_dispose() {
        let queue = RequestQueue::new();

        let (first, mut rx) = task();
        queue.submit(first);

        queue.dispose(&Error::ExchangeClosed);

        assert!(queue.is_drained());
        assert!(matches!(rx.recv().await, Some(Err(Error::ExchangeClosed))));
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn it_rejects_submissions_after_dispose() {
        let queue = RequestQueue::new();
        queue.dispose(&Error::ExchangeClosed);

        let (late, mut rx) = task();
        queue.submit(late);

        assert!(matches!(rx.recv().await, Some(Err(Error::ExchangeClosed))));
    }
}
