// A scripted stand-in for the ZeroMQ subscriber.  Each call to receive() consumes one step of the
// script; a message step also moves the manual clock to the time the message "arrives".  When the
// script runs out the subscriber behaves like an idle socket: it waits out the timeout and returns
// nothing.

use crate::error::TransportError;
use crate::interrupt::ShutdownController;
use crate::listener::Subscriber;
use crate::time::{Clock, LocalTime};

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

pub enum Step {
    Message(LocalTime, &'static str),
    Idle,
    Fault,
    // Shutdown is requested while a message is in flight, and the message is then delivered.
    ShutdownWith(&'static str),
}

pub struct MockSubscriber {
    script: VecDeque<Step>,
    now: Rc<Cell<LocalTime>>,
    shutdown: ShutdownController,
}

impl MockSubscriber {
    pub fn new(
        script: Vec<Step>,
        start: LocalTime,
        shutdown: &ShutdownController,
    ) -> (MockSubscriber, Clock) {
        let now = Rc::new(Cell::new(start));
        let clock = Clock::Manual(now.clone());
        (
            MockSubscriber {
                script: script.into(),
                now,
                shutdown: shutdown.clone(),
            },
            clock,
        )
    }
}

impl Subscriber for MockSubscriber {
    fn receive(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        match self.script.pop_front() {
            Some(Step::Message(t, s)) => {
                self.now.set(t);
                Ok(Some(s.to_string()))
            }
            Some(Step::Idle) => Ok(None),
            Some(Step::Fault) => Err(TransportError::NotUtf8(1)),
            Some(Step::ShutdownWith(s)) => {
                self.shutdown.request_shutdown();
                Ok(Some(s.to_string()))
            }
            None => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}
