//! Pub/sub collaborator interfaces for the `PMD_INFO`/`PMD_ORDERS`
//! channels. The concrete wire encoding is a collaborator's
//! responsibility; this module only decouples a transport thread from
//! the sheriff's single-threaded event loop with a `crossbeam` channel.

use crossbeam::channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use crate::deputy::{InfoFrame, OrdersFrame};

#[derive(Debug, Clone)]
pub enum InboundMessage {
    Info(InfoFrame),
    Orders(OrdersFrame),
}

#[derive(Error, Debug)]
pub enum BusError {
    #[error("bus channel disconnected")]
    Disconnected,
}

pub struct InboundPublisher(Sender<InboundMessage>);
pub struct InboundConsumer(Receiver<InboundMessage>);

/// Creates the channel a transport layer uses to hand decoded
/// `PMD_INFO`/`PMD_ORDERS` frames to the sheriff's event loop.
pub fn inbound_channel() -> (InboundPublisher, InboundConsumer) {
    let (s, r) = unbounded();
    (InboundPublisher(s), InboundConsumer(r))
}

impl InboundPublisher {
    pub fn publish(&self, message: InboundMessage) -> Result<(), BusError> {
        self.0.send(message).map_err(|_| BusError::Disconnected)
    }
}

impl Clone for InboundPublisher {
    fn clone(&self) -> Self {
        InboundPublisher(self.0.clone())
    }
}

impl InboundConsumer {
    /// Drains every message currently queued without blocking; the
    /// sheriff's event loop calls this once per iteration.
    pub fn drain(&self) -> Vec<InboundMessage> {
        self.0.try_iter().collect()
    }

    pub fn recv(&self) -> Result<InboundMessage, BusError> {
        self.0.recv().map_err(|_| BusError::Disconnected)
    }
}

/// Outbound orders publishing: only the sheriff (non-observer mode)
/// publishes here, as the collaborator's wire transport.
pub trait OrdersTransport {
    fn publish_orders(&self, frame: &OrdersFrame) -> Result<(), BusError>;
}

pub struct OutboundPublisher(Sender<OrdersFrame>);
pub struct OutboundConsumer(Receiver<OrdersFrame>);

/// Creates the channel the sheriff hands built orders frames to; a
/// transport layer drains `OutboundConsumer` and puts them on the wire.
pub fn outbound_channel() -> (OutboundPublisher, OutboundConsumer) {
    let (s, r) = unbounded();
    (OutboundPublisher(s), OutboundConsumer(r))
}

impl OrdersTransport for OutboundPublisher {
    fn publish_orders(&self, frame: &OrdersFrame) -> Result<(), BusError> {
        self.0.send(frame.clone()).map_err(|_| BusError::Disconnected)
    }
}

impl Clone for OutboundPublisher {
    fn clone(&self) -> Self {
        OutboundPublisher(self.0.clone())
    }
}

impl OutboundConsumer {
    /// Drains every orders frame built since the last drain, without
    /// blocking.
    pub fn drain(&self) -> Vec<OrdersFrame> {
        self.0.try_iter().collect()
    }

    pub fn recv(&self) -> Result<OrdersFrame, BusError> {
        self.0.recv().map_err(|_| BusError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_collects_every_queued_message_in_order() {
        let (pub_, consumer) = inbound_channel();
        pub_.publish(InboundMessage::Info(InfoFrame::default())).unwrap();
        pub_.publish(InboundMessage::Orders(OrdersFrame::default())).unwrap();

        let drained = consumer.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], InboundMessage::Info(_)));
        assert!(matches!(drained[1], InboundMessage::Orders(_)));
    }

    #[test]
    fn publish_after_consumer_dropped_reports_disconnected() {
        let (pub_, consumer) = inbound_channel();
        drop(consumer);
        let err = pub_.publish(InboundMessage::Info(InfoFrame::default())).unwrap_err();
        assert!(matches!(err, BusError::Disconnected));
    }

    #[test]
    fn outbound_publisher_hands_frames_to_consumer() {
        let (pub_, consumer) = outbound_channel();
        let frame = OrdersFrame {
            host: "web1".into(),
            ..Default::default()
        };
        pub_.publish_orders(&frame).unwrap();

        let drained = consumer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].host, "web1");
    }

    #[test]
    fn outbound_publish_after_consumer_dropped_reports_disconnected() {
        let (pub_, consumer) = outbound_channel();
        drop(consumer);
        let err = pub_.publish_orders(&OrdersFrame::default()).unwrap_err();
        assert!(matches!(err, BusError::Disconnected));
    }
}
