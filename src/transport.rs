//! Transport abstraction standing in for the kernel's message-passing
//! primitive (SPEC_FULL.md §10). The kernel transport itself is out of
//! scope for this crate's behavior — we assume its ordering and
//! blocking-receive semantics as givens (§5) — but a runnable binary
//! needs *something* concrete to receive requests on.

use crate::protocol::{Envelope, Status};
use std::sync::mpsc;

/// Where a reply for one request is sent back to.
pub trait ReplyChannel {
    fn reply(self: Box<Self>, status: Status);
}

/// A request paired with the means to reply to it.
pub struct Inbound {
    pub envelope: Envelope,
    pub reply_to: Box<dyn ReplyChannel + Send>,
}

/// Receives inbound requests strictly in arrival order, matching §5's
/// ordering guarantee (no priorities, no reordering).
pub trait Transport {
    /// Blocks until the next request arrives, or returns `None` once the
    /// transport is permanently closed (all senders dropped).
    fn recv(&self) -> Option<Inbound>;
}

/// An `mpsc`-backed transport: the production stand-in for kernel IPC.
///
/// Unlike a plain channel wrapper, this does not hold on to a sender
/// itself — [`ChannelTransport::new`] hands the first sender back to the
/// caller, who is responsible for cloning it out to every request
/// producer. Once every clone is dropped, `recv` returns `None`, exactly
/// as a real transport would report "no more clients, shut down".
pub struct ChannelTransport {
    rx: mpsc::Receiver<Inbound>,
}

impl ChannelTransport {
    /// Creates a transport and the first handle request producers clone
    /// from to enqueue requests.
    pub fn new() -> (Self, mpsc::Sender<Inbound>) {
        let (tx, rx) = mpsc::channel();
        (ChannelTransport { rx }, tx)
    }
}

impl Transport for ChannelTransport {
    fn recv(&self) -> Option<Inbound> {
        self.rx.recv().ok()
    }
}

/// A reply channel backed by an `mpsc::Sender<Status>`, used by test
/// harnesses and the demo client to observe a handler's result.
pub struct OneshotReply(pub mpsc::Sender<Status>);

impl ReplyChannel for OneshotReply {
    fn reply(self: Box<Self>, status: Status) {
        // A dropped receiver (caller no longer interested) is not a
        // transport failure worth logging loudly; mirrors §4.E's "reply
        // failure is logged and ignored".
        let _ = self.0.send(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Endpoint;
    use crate::protocol::Request;

    #[test]
    fn delivers_requests_in_order() {
        let (transport, sender) = ChannelTransport::new();
        for i in 0..3 {
            let (reply_tx, _reply_rx) = mpsc::channel();
            sender
                .send(Inbound {
                    envelope: Envelope { source: Endpoint(i), request: Request::Initialize },
                    reply_to: Box::new(OneshotReply(reply_tx)),
                })
                .unwrap();
        }
        drop(sender);
        let mut sources = Vec::new();
        while let Some(inbound) = transport.recv() {
            sources.push(inbound.envelope.source.0);
        }
        assert_eq!(sources, vec![0, 1, 2]);
    }

    #[test]
    fn recv_returns_none_once_closed() {
        let (transport, sender) = ChannelTransport::new();
        drop(sender);
        assert!(transport.recv().is_none());
    }
}
