//! Supervised background work.
//!
//! Every network call runs in its own task and reports back through the
//! session queue. A panicking task still reports: the supervisor turns the
//! panic into an event so no component is left waiting forever.

use std::any::Any;
use std::future::Future;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Spawns work whose result (or panic) is delivered as an event.
#[derive(Debug)]
pub struct Supervisor<E> {
    tx: UnboundedSender<E>,
    fault: fn(String) -> E,
}

impl<E> Clone for Supervisor<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            fault: self.fault,
        }
    }
}

impl<E: Send + 'static> Supervisor<E> {
    /// `fault` builds the event posted when a task spawned with
    /// [`spawn`](Self::spawn) panics.
    pub fn new(tx: UnboundedSender<E>, fault: fn(String) -> E) -> Self {
        Self { tx, fault }
    }

    pub fn sender(&self) -> UnboundedSender<E> {
        self.tx.clone()
    }

    /// Run `work` and post its event. A panic posts the fault event instead.
    pub fn spawn<F>(&self, name: &'static str, work: F) -> JoinHandle<()>
    where
        F: Future<Output = E> + Send + 'static,
    {
        let fault = self.fault;
        self.spawn_or(name, work, move |message| fault(message))
    }

    /// Like [`spawn`](Self::spawn), with a task-specific panic event.
    pub fn spawn_or<F, P>(&self, name: &'static str, work: F, on_panic: P) -> JoinHandle<()>
    where
        F: Future<Output = E> + Send + 'static,
        P: FnOnce(String) -> E + Send + 'static,
    {
        let tx = self.tx.clone();
        let inner = tokio::spawn(work);
        tokio::spawn(async move {
            let event = match inner.await {
                Ok(event) => event,
                Err(error) if error.is_panic() => {
                    let message = format!("{name} panicked: {}", panic_text(error.into_panic()));
                    tracing::error!(task = name, %message, "supervised task panicked");
                    on_panic(message)
                }
                Err(_) => {
                    tracing::debug!(task = name, "supervised task cancelled");
                    return;
                }
            };
            // Receiver gone means the session shut down.
            let _ = tx.send(event);
        })
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::from("unknown panic payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[derive(Debug, PartialEq)]
    enum Probe {
        Done(u32),
        Fault(String),
        Custom(String),
    }

    async fn explode(message: String) -> Probe {
        panic!("{message}")
    }

    #[tokio::test]
    async fn delivers_the_work_result() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(tx, Probe::Fault);

        supervisor.spawn("probe", async { Probe::Done(7) });
        assert_eq!(rx.recv().await, Some(Probe::Done(7)));
    }

    #[tokio::test]
    async fn panics_become_fault_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(tx, Probe::Fault);

        supervisor.spawn("probe", explode(String::from("boom")));
        match rx.recv().await {
            Some(Probe::Fault(message)) => assert!(message.contains("probe panicked: boom")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn custom_panic_event_overrides_fault() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(tx, Probe::Fault);

        supervisor.spawn_or("chart", explode(String::from("bad")), Probe::Custom);
        match rx.recv().await {
            Some(Probe::Custom(message)) => assert!(message.ends_with("bad")),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
