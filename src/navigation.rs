//! Pointer and key events from downstream into the document.

use crate::document::DocumentSession;
use crate::host::NavigationEvent;

/// Feed `event` to the document's input feature.
///
/// Call with the document lock held. Returns false when the document takes no input.
pub fn relay(session: &DocumentSession, event: &NavigationEvent) -> bool {
    let Some(input) = session.input() else {
        tracing::trace!(?event, "document has no input feature");
        return false;
    };
    match event {
        NavigationEvent::MouseMove { x, y } => input.feed_mouse_move(*x, *y),
        NavigationEvent::MouseButtonPress { button, x, y } => {
            input.feed_mouse_move(*x, *y);
            input.feed_mouse_down(*button);
        }
        NavigationEvent::MouseButtonRelease { button, x, y } => {
            input.feed_mouse_move(*x, *y);
            input.feed_mouse_up(*button);
        }
        NavigationEvent::KeyPress { key } => input.feed_key_down(key),
        NavigationEvent::KeyRelease { key } => input.feed_key_up(key),
    }
    true
}

#[cfg(test)]
#[path = "../tests/unit/navigation.rs"]
mod tests;
