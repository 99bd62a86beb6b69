//! Progress events delivered from the worker to the foreground.

/// One worker invocation emits, in order: `Message(Some("executing"))`,
/// zero or more status messages, an optional `Exception`, then
/// `Message(None)` to clear the display and exactly one `Complete`.
/// A disposed harness suppresses everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskEvent {
    /// Status text for the display; `None` clears it.
    Message(Option<String>),
    /// A worker failure, already cleared from `best_world`.
    Exception(String),
    /// The worker finished, successfully or not.
    Complete,
}
