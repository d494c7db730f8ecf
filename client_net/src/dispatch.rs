//! Packet dispatch.
//!
//! One handler per tag, resolved through an explicit table. A handler failure
//! is contained at this boundary: it becomes a single log entry and the
//! dispatch loop keeps running, so one malformed packet never affects
//! unrelated packets or the session itself.

use std::collections::HashMap;

use client_shared::error::NetError;
use client_shared::packets::PacketTag;
use tracing::{error, trace, warn};

use crate::events::GameEventObserver;
use crate::session::SessionContext;

/// Handler for one packet kind. Implementations are stateless; all session
/// state arrives through the explicit context reference.
pub trait PacketHandler {
    fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        payload: &[u8],
    ) -> Result<(), NetError>;
}

/// Tag-to-handler table.
#[derive(Default)]
pub struct PacketDispatcher {
    handlers: HashMap<u8, Box<dyn PacketHandler>>,
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a tag, replacing any previous one.
    pub fn register(&mut self, tag: PacketTag, handler: Box<dyn PacketHandler>) {
        self.handlers.insert(tag as u8, handler);
    }

    /// Removes the handler for a tag. Returns whether one was registered.
    pub fn unregister(&mut self, tag: PacketTag) -> bool {
        self.handlers.remove(&(tag as u8)).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatches one raw packet. Always returns `true`: unknown tags and
    /// per-packet failures are logged and absorbed, never fatal.
    pub fn handle(
        &self,
        ctx: &mut SessionContext,
        observer: &mut dyn GameEventObserver,
        data: &[u8],
    ) -> bool {
        let Some((&tag, payload)) = data.split_first() else {
            warn!("dropping empty packet");
            return true;
        };

        trace!(tag, len = payload.len(), "received packet");

        match self.handlers.get(&tag) {
            Some(handler) => {
                if let Err(err) = handler.handle(ctx, observer, payload) {
                    error!(tag, error = %err, "failed to handle packet");
                }
            }
            None => {
                warn!(tag, "no handler for packet type");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::events::NullObserver;
    use client_shared::error::WireError;

    struct Recording {
        calls: Rc<RefCell<Vec<Vec<u8>>>>,
    }

    impl PacketHandler for Recording {
        fn handle(
            &self,
            _ctx: &mut SessionContext,
            _observer: &mut dyn GameEventObserver,
            payload: &[u8],
        ) -> Result<(), NetError> {
            self.calls.borrow_mut().push(payload.to_vec());
            Ok(())
        }
    }

    struct Failing;

    impl PacketHandler for Failing {
        fn handle(
            &self,
            _ctx: &mut SessionContext,
            _observer: &mut dyn GameEventObserver,
            _payload: &[u8],
        ) -> Result<(), NetError> {
            Err(NetError::Decode(WireError::UnexpectedEof {
                needed: 4,
                remaining: 0,
            }))
        }
    }

    #[test]
    fn handler_invoked_once_with_remainder() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let other_calls = Rc::new(RefCell::new(Vec::new()));

        let mut dispatcher = PacketDispatcher::new();
        dispatcher.register(
            PacketTag::DoDie,
            Box::new(Recording {
                calls: Rc::clone(&calls),
            }),
        );
        dispatcher.register(
            PacketTag::Respawn,
            Box::new(Recording {
                calls: Rc::clone(&other_calls),
            }),
        );

        let mut ctx = SessionContext::new();
        let data = [PacketTag::DoDie as u8, 0xAA, 0xBB];
        assert!(dispatcher.handle(&mut ctx, &mut NullObserver, &data));

        assert_eq!(&*calls.borrow(), &[vec![0xAA, 0xBB]]);
        assert!(other_calls.borrow().is_empty());
    }

    #[test]
    fn unknown_tag_keeps_session_alive() {
        let dispatcher = PacketDispatcher::new();
        let mut ctx = SessionContext::new();
        assert!(dispatcher.handle(&mut ctx, &mut NullObserver, &[42, 1, 2, 3]));
    }

    #[test]
    fn empty_buffer_keeps_session_alive() {
        let dispatcher = PacketDispatcher::new();
        let mut ctx = SessionContext::new();
        assert!(dispatcher.handle(&mut ctx, &mut NullObserver, &[]));
    }

    #[test]
    fn failing_handler_is_contained() {
        let calls = Rc::new(RefCell::new(Vec::new()));

        let mut dispatcher = PacketDispatcher::new();
        dispatcher.register(PacketTag::DoDie, Box::new(Failing));
        dispatcher.register(
            PacketTag::Respawn,
            Box::new(Recording {
                calls: Rc::clone(&calls),
            }),
        );

        let mut ctx = SessionContext::new();
        assert!(dispatcher.handle(&mut ctx, &mut NullObserver, &[PacketTag::DoDie as u8]));
        // The failure above does not affect the next packet.
        assert!(dispatcher.handle(&mut ctx, &mut NullObserver, &[PacketTag::Respawn as u8]));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn unregister_removes_handler() {
        let calls = Rc::new(RefCell::new(Vec::new()));

        let mut dispatcher = PacketDispatcher::new();
        dispatcher.register(
            PacketTag::DoDie,
            Box::new(Recording {
                calls: Rc::clone(&calls),
            }),
        );
        assert!(dispatcher.unregister(PacketTag::DoDie));
        assert!(!dispatcher.unregister(PacketTag::DoDie));
        assert!(dispatcher.is_empty());

        let mut ctx = SessionContext::new();
        dispatcher.handle(&mut ctx, &mut NullObserver, &[PacketTag::DoDie as u8]);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn reregistration_replaces_handler() {
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));

        let mut dispatcher = PacketDispatcher::new();
        dispatcher.register(
            PacketTag::DoDie,
            Box::new(Recording {
                calls: Rc::clone(&first),
            }),
        );
        dispatcher.register(
            PacketTag::DoDie,
            Box::new(Recording {
                calls: Rc::clone(&second),
            }),
        );

        let mut ctx = SessionContext::new();
        dispatcher.handle(&mut ctx, &mut NullObserver, &[PacketTag::DoDie as u8]);

        assert!(first.borrow().is_empty());
        assert_eq!(second.borrow().len(), 1);
    }
}
