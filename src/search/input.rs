use std::time::Duration;

use tokio::sync::{mpsc, watch};

use super::debounce::debounce;

/// Raw search text plus its debounced stream of settled terms.
pub struct SearchInput {
    raw: watch::Sender<String>,
}

impl SearchInput {
    /// Starts empty. Settled terms arrive on the returned receiver, which
    /// closes when the `SearchInput` is dropped.
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::with_text("", window)
    }

    /// Starts with `text`, which counts as already settled.
    pub fn with_text(text: &str, window: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (raw, rx) = watch::channel(text.to_string());
        let settled = debounce(rx, window);
        (Self { raw }, settled)
    }

    pub fn text(&self) -> String {
        self.raw.borrow().clone()
    }

    /// Replace the raw text. Setting the current text again is a no-op and
    /// does not restart the debounce window.
    pub fn set_text(&self, text: &str) -> bool {
        self.raw.send_if_modified(|current| {
            if *current == text {
                return false;
            }
            *current = text.to_string();
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_typing_settles_once() {
        let (input, mut settled) = SearchInput::new(Duration::from_millis(500));
        assert_eq!(input.text(), "");

        for text in ["i", "in", "inc", "ince", "incep", "incept", "inception"] {
            assert!(input.set_text(text));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(input.text(), "inception");
        assert_eq!(settled.recv().await.as_deref(), Some("inception"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(settled.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_text_does_not_reset() {
        let (input, mut settled) = SearchInput::new(Duration::from_millis(500));

        assert!(input.set_text("up"));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!input.set_text("up"));
        tokio::time::sleep(Duration::from_millis(250)).await;
        // Settled 500ms after the only real change.
        assert_eq!(settled.try_recv().ok().as_deref(), Some("up"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_text_is_not_emitted() {
        let (input, mut settled) = SearchInput::with_text("dune", Duration::from_millis(500));
        assert_eq!(input.text(), "dune");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(settled.try_recv().is_err());

        assert!(input.set_text("dun"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(input.set_text("dune"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(settled.try_recv().is_err());

        assert!(input.set_text("heat"));
        assert_eq!(settled.recv().await.as_deref(), Some("heat"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_stream() {
        let (input, mut settled) = SearchInput::new(Duration::from_millis(500));
        drop(input);
        assert_eq!(settled.recv().await, None);
    }
}
