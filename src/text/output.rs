//! Cue delivery to the presentation sink
//!
//! The renderer runs on the playback thread. A sink either runs there too
//! ([`OutputDispatch::Direct`]) or on its own context, reached through a
//! post function ([`OutputDispatch::Posted`]). [`cue_channel`] builds a posted
//! dispatch over a tokio channel, which keeps updates in FIFO order.

use tokio::sync::mpsc;

use crate::text::cue::CueSet;

/// Receives cue updates. An empty set clears the display.
pub trait TextOutput: Send {
    fn on_cues(&mut self, cues: CueSet);
}

impl<F> TextOutput for F
where
    F: FnMut(CueSet) + Send,
{
    fn on_cues(&mut self, cues: CueSet) {
        self(cues)
    }
}

/// How the renderer reaches its sink
pub enum OutputDispatch {
    /// Call the sink on the playback thread
    Direct(Box<dyn TextOutput>),
    /// Hand each update to a function that delivers it on the output context
    Posted(Box<dyn Fn(CueSet) + Send>),
}

impl OutputDispatch {
    pub fn direct(output: impl TextOutput + 'static) -> Self {
        OutputDispatch::Direct(Box::new(output))
    }

    pub fn posted(post: impl Fn(CueSet) + Send + 'static) -> Self {
        OutputDispatch::Posted(Box::new(post))
    }

    /// Deliver one cue update.
    pub fn dispatch(&mut self, cues: CueSet) {
        match self {
            OutputDispatch::Direct(output) => output.on_cues(cues),
            OutputDispatch::Posted(post) => post(cues),
        }
    }
}

impl std::fmt::Debug for OutputDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputDispatch::Direct(_) => f.write_str("OutputDispatch::Direct"),
            OutputDispatch::Posted(_) => f.write_str("OutputDispatch::Posted"),
        }
    }
}

/// Output-context end of a [`cue_channel`].
#[derive(Debug)]
pub struct CueReceiver {
    rx: mpsc::UnboundedReceiver<CueSet>,
}

impl CueReceiver {
    /// Wait for the next update. `None` once the renderer side is dropped
    /// and every queued update has been taken.
    pub async fn recv(&mut self) -> Option<CueSet> {
        self.rx.recv().await
    }

    /// Deliver updates to `output` until the renderer side is dropped.
    pub async fn run<O: TextOutput>(mut self, mut output: O) -> O {
        while let Some(cues) = self.rx.recv().await {
            output.on_cues(cues);
        }
        output
    }

    /// Deliver every update queued so far without waiting. Returns how many
    /// were delivered.
    pub fn drain(&mut self, output: &mut dyn TextOutput) -> usize {
        let mut delivered = 0;
        while let Ok(cues) = self.rx.try_recv() {
            output.on_cues(cues);
            delivered += 1;
        }
        delivered
    }
}

/// A posted dispatch and the receiver that delivers its updates.
pub fn cue_channel() -> (OutputDispatch, CueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatch = OutputDispatch::posted(move |cues: CueSet| {
        if tx.send(cues).is_err() {
            tracing::trace!("cue receiver dropped, discarding update");
        }
    });
    (dispatch, CueReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::cue::Cue;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn set(text: &str) -> CueSet {
        CueSet::new(vec![Cue::new(text)])
    }

    #[test]
    fn test_direct_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut dispatch = OutputDispatch::direct(move |cues: CueSet| {
            sink.lock().push(cues);
        });

        dispatch.dispatch(set("A"));
        dispatch.dispatch(CueSet::empty());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].texts(), vec!["A"]);
        assert!(seen[1].ptr_eq(&CueSet::empty()));
    }

    #[test]
    fn test_drain_preserves_order() {
        let (mut dispatch, mut receiver) = cue_channel();
        for text in ["A", "B", "C"] {
            dispatch.dispatch(set(text));
        }

        let mut texts = Vec::new();
        let mut output = |cues: CueSet| texts.extend(cues.texts().into_iter().map(String::from));
        assert_eq!(receiver.drain(&mut output), 3);
        assert_eq!(receiver.drain(&mut output), 0);
        drop(output);
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (mut dispatch, receiver) = cue_channel();
        drop(receiver);
        dispatch.dispatch(set("lost"));
    }

    #[tokio::test]
    async fn test_run_until_sender_dropped() {
        let (mut dispatch, receiver) = cue_channel();
        let task = tokio::spawn(receiver.run(Collected::default()));

        dispatch.dispatch(set("A"));
        dispatch.dispatch(CueSet::empty());
        drop(dispatch);

        let Collected(delivered) = task.await.unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].texts(), vec!["A"]);
        assert!(delivered[1].is_empty());
    }

    #[derive(Default)]
    struct Collected(Vec<CueSet>);

    impl TextOutput for Collected {
        fn on_cues(&mut self, cues: CueSet) {
            self.0.push(cues);
        }
    }
}
