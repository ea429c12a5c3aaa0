//! Window events crossing from the platform event thread into the frame loop

use std::collections::BTreeSet;
use std::sync::mpsc::{sync_channel, Receiver, SendError, SyncSender, TryRecvError};

/// Bound of the event queue. A full queue blocks the event thread, never the frame loop.
pub const EVENT_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    KeyDown { code: u32 },
    KeyUp { code: u32 },
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// Sending half, owned by the platform event thread.
#[derive(Clone)]
pub struct EventSender(SyncSender<WindowEvent>);
impl EventSender {
    /// Blocks while the queue is full. Fails once the frame loop has dropped its receiver.
    pub fn send(&self, e: WindowEvent) -> Result<(), SendError<WindowEvent>> {
        self.0.send(e)
    }
}

/// Receiving half, owned by the frame loop.
pub struct EventQueue(Receiver<WindowEvent>);
impl EventQueue {
    /// Takes every event queued so far without waiting for more.
    ///
    /// A disconnected sender simply ends the drain; the frame loop keeps running.
    pub fn drain(&self) -> impl Iterator<Item = WindowEvent> + '_ {
        std::iter::from_fn(move || match self.0.try_recv() {
            Ok(e) => Some(e),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        })
    }
}

pub fn event_queue() -> (EventSender, EventQueue) {
    let (tx, rx) = sync_channel(EVENT_QUEUE_CAPACITY);

    (EventSender(tx), EventQueue(rx))
}

/// A key press as seen by the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub code: u32,
    /// the key was already held (platform auto-repeat)
    pub repeat: bool,
}

/// Set of currently held keys, owned by whoever runs the frame loop.
#[derive(Debug, Default)]
pub struct KeyRepeatState {
    held: BTreeSet<u32>,
}
impl KeyRepeatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the held set from a window event. Returns the key press it represents, if any.
    pub fn apply(&mut self, e: &WindowEvent) -> Option<KeyPress> {
        match *e {
            WindowEvent::KeyDown { code } => Some(KeyPress {
                code,
                repeat: !self.held.insert(code),
            }),
            WindowEvent::KeyUp { code } => {
                self.held.remove(&code);
                None
            }
            WindowEvent::Resized { .. } | WindowEvent::CloseRequested => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_key_down_is_a_repeat() {
        let mut s = KeyRepeatState::new();

        assert_eq!(
            s.apply(&WindowEvent::KeyDown { code: 38 }),
            Some(KeyPress {
                code: 38,
                repeat: false
            })
        );
        assert_eq!(
            s.apply(&WindowEvent::KeyDown { code: 38 }),
            Some(KeyPress {
                code: 38,
                repeat: true
            })
        );
        assert!(s.held.contains(&38));
    }

    #[test]
    fn key_up_releases() {
        let mut s = KeyRepeatState::new();
        s.apply(&WindowEvent::KeyDown { code: 9 });
        s.apply(&WindowEvent::KeyDown { code: 38 });
        assert_eq!(s.apply(&WindowEvent::KeyUp { code: 9 }), None);

        assert!(!s.held.contains(&9));
        assert_eq!(s.held.iter().copied().collect::<Vec<_>>(), vec![38]);
        assert_eq!(
            s.apply(&WindowEvent::KeyDown { code: 9 }),
            Some(KeyPress {
                code: 9,
                repeat: false
            })
        );
    }

    #[test]
    fn non_key_events_leave_state_alone() {
        let mut s = KeyRepeatState::new();
        assert_eq!(s.apply(&WindowEvent::CloseRequested), None);
        assert_eq!(
            s.apply(&WindowEvent::Resized {
                width: 10,
                height: 10
            }),
            None
        );
        assert!(s.held.is_empty());
    }

    #[test]
    fn drain_is_non_blocking() {
        let (tx, q) = event_queue();
        assert_eq!(q.drain().count(), 0);

        tx.send(WindowEvent::KeyDown { code: 1 }).unwrap();
        tx.send(WindowEvent::CloseRequested).unwrap();
        assert_eq!(
            q.drain().collect::<Vec<_>>(),
            vec![WindowEvent::KeyDown { code: 1 }, WindowEvent::CloseRequested]
        );
        assert_eq!(q.drain().count(), 0);
    }

    #[test]
    fn drain_survives_disconnected_sender() {
        let (tx, q) = event_queue();
        tx.send(WindowEvent::KeyUp { code: 2 }).unwrap();
        drop(tx);

        assert_eq!(q.drain().collect::<Vec<_>>(), vec![WindowEvent::KeyUp { code: 2 }]);
        assert_eq!(q.drain().count(), 0);
    }

    #[test]
    fn queue_is_bounded() {
        let (tx, q) = event_queue();
        for n in 0..EVENT_QUEUE_CAPACITY as u32 {
            tx.0.try_send(WindowEvent::KeyDown { code: n }).unwrap();
        }
        assert!(tx.0.try_send(WindowEvent::CloseRequested).is_err());

        assert_eq!(q.drain().count(), EVENT_QUEUE_CAPACITY);
    }
}
