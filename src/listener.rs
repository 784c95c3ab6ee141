// The receiving side of the transport.
//
// The receive loop only needs one thing from the transport: wait a bounded time for the next
// message.  That is the Subscriber trait; ZmqSubscriber implements it on a ZeroMQ SUB socket that
// binds the listen endpoint, so that any number of PUB producers can connect to us and no producer
// needs to be known in advance.
//
// The wait is bounded so that the caller gets control back regularly and can look at the shutdown
// flag.  A wait interrupted by a signal is reported the same way as a wait that timed out.

use crate::error::{ListenerError, TransportError};

use std::time::Duration;

pub trait Subscriber {
    // Ok(Some(message)) for a message, Ok(None) if nothing arrived within `timeout` or the wait was
    // interrupted, and Err for a transient fault that loses at most the message being received.
    fn receive(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;
}

pub struct ZmqSubscriber {
    socket: zmq::Socket,
    // Dropped after the socket.
    _ctx: zmq::Context,
}

impl ZmqSubscriber {
    pub fn bind(endpoint: &str) -> Result<ZmqSubscriber, ListenerError> {
        ZmqSubscriber::bind_in(&zmq::Context::new(), endpoint)
    }

    // Bind within an existing context, which `inproc://` endpoints require to be shared with the
    // publishers.
    pub fn bind_in(ctx: &zmq::Context, endpoint: &str) -> Result<ZmqSubscriber, ListenerError> {
        let fail = |source| ListenerError {
            endpoint: endpoint.to_string(),
            source,
        };
        let socket = ctx.socket(zmq::SUB).map_err(fail)?;
        socket.bind(endpoint).map_err(fail)?;
        // The empty prefix matches every topic.
        socket.set_subscribe(b"").map_err(fail)?;
        log::debug!("Listening on {endpoint}");
        Ok(ZmqSubscriber {
            socket,
            _ctx: ctx.clone(),
        })
    }
}

impl Subscriber for ZmqSubscriber {
    fn receive(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let timeout_ms = timeout.as_millis().min(i64::MAX as u128) as i64;
        match self.socket.poll(zmq::POLLIN, timeout_ms) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(zmq::Error::EINTR) => return Ok(None),
            Err(e) => return Err(TransportError::Recv(e)),
        }
        match self.socket.recv_string(zmq::DONTWAIT) {
            Ok(Ok(s)) => Ok(Some(s)),
            Ok(Err(bytes)) => Err(TransportError::NotUtf8(bytes.len())),
            Err(zmq::Error::EINTR) | Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(TransportError::Recv(e)),
        }
    }
}

// PUB drops messages until the subscription has propagated to it, so keep publishing until one
// gets through, then drain the extra copies.
#[cfg(test)]
fn publish_until_received(p: &zmq::Socket, sub: &mut ZmqSubscriber, msg: &str) -> Option<String> {
    let mut got = None;
    for _ in 0..40 {
        p.send(msg, 0).unwrap();
        got = sub.receive(Duration::from_millis(50)).unwrap();
        if got.is_some() {
            break;
        }
    }
    while sub.receive(Duration::from_millis(50)).unwrap().is_some() {}
    got
}

#[test]
pub fn test_inproc_fan_in() {
    let ctx = zmq::Context::new();
    let mut sub = ZmqSubscriber::bind_in(&ctx, "inproc://zmqlogsink-fan-in").unwrap();
    let p1 = ctx.socket(zmq::PUB).unwrap();
    p1.connect("inproc://zmqlogsink-fan-in").unwrap();
    let p2 = ctx.socket(zmq::PUB).unwrap();
    p2.connect("inproc://zmqlogsink-fan-in").unwrap();

    assert!(publish_until_received(&p1, &mut sub, "hello\n").as_deref() == Some("hello\n"));
    assert!(publish_until_received(&p2, &mut sub, "from two\n").as_deref() == Some("from two\n"));
}

#[test]
pub fn test_not_utf8_is_transient() {
    let ctx = zmq::Context::new();
    let mut sub = ZmqSubscriber::bind_in(&ctx, "inproc://zmqlogsink-utf8").unwrap();
    let p = ctx.socket(zmq::PUB).unwrap();
    p.connect("inproc://zmqlogsink-utf8").unwrap();

    let mut result = Ok(None);
    for _ in 0..40 {
        p.send(&[0xffu8, 0xfe, b'\n'][..], 0).unwrap();
        result = sub.receive(Duration::from_millis(50));
        if !matches!(result, Ok(None)) {
            break;
        }
    }
    assert!(matches!(result, Err(TransportError::NotUtf8(3))));
}

#[test]
pub fn test_receive_times_out() {
    let ctx = zmq::Context::new();
    let mut sub = ZmqSubscriber::bind_in(&ctx, "inproc://zmqlogsink-quiet").unwrap();
    let start = std::time::Instant::now();
    assert!(sub.receive(Duration::from_millis(100)).unwrap().is_none());
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
pub fn test_bind_errors() {
    let ctx = zmq::Context::new();
    match ZmqSubscriber::bind_in(&ctx, "not an endpoint") {
        Err(e) => assert!(e.endpoint == "not an endpoint"),
        Ok(_) => panic!("expected a bind error"),
    }
    let _first = ZmqSubscriber::bind_in(&ctx, "inproc://zmqlogsink-twice").unwrap();
    assert!(ZmqSubscriber::bind_in(&ctx, "inproc://zmqlogsink-twice").is_err());
}
