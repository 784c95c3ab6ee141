// The receive loop: take one message off the subscriber, rotate the output if the message falls in a
// new window, append the message, repeat.
//
// run() returns under these circumstances *only*:
//
// - shutdown was requested (Ok)
// - rotating or writing the output failed (Err); these are not retried, a failed rotation means the
//   file system is in a state we can't reason about, and writing on to the old file would break the
//   naming contract
//
// Transport faults are logged and the loop carries on with the next message.  Either way the
// subscriber and the sink are dropped before run() returns, which closes the socket and the file.

use crate::datasink::OutputSink;
use crate::error::AggregatorError;
use crate::interrupt::ShutdownController;
use crate::listener::Subscriber;
use crate::time::Clock;

use std::time::Duration;

pub struct ReceiveLoop<S: Subscriber> {
    subscriber: S,
    sink: OutputSink,
    shutdown: ShutdownController,
    clock: Clock,
    receive_timeout: Duration,
}

impl<S: Subscriber> ReceiveLoop<S> {
    pub fn new(
        subscriber: S,
        sink: OutputSink,
        shutdown: ShutdownController,
        clock: Clock,
        receive_timeout: Duration,
    ) -> ReceiveLoop<S> {
        ReceiveLoop {
            subscriber,
            sink,
            shutdown,
            clock,
            receive_timeout,
        }
    }

    pub fn run(self) -> Result<(), AggregatorError> {
        let ReceiveLoop {
            mut subscriber,
            mut sink,
            shutdown,
            clock,
            receive_timeout,
        } = self;

        let result = pump(&mut subscriber, &mut sink, &shutdown, &clock, receive_timeout);
        drop(subscriber);
        sink.close();
        if result.is_ok() {
            log::info!("Exiting");
        }
        result
    }
}

fn pump<S: Subscriber>(
    subscriber: &mut S,
    sink: &mut OutputSink,
    shutdown: &ShutdownController,
    clock: &Clock,
    receive_timeout: Duration,
) -> Result<(), AggregatorError> {
    let mut received = 0u64;
    while !shutdown.is_shutdown_requested() {
        let message = match subscriber.receive(receive_timeout) {
            Ok(Some(m)) => m,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };
        if shutdown.is_shutdown_requested() {
            log::debug!("Discarding message received during shutdown");
            break;
        }
        sink.rotate_if_needed(clock.now())?;
        sink.write(&message)?;
        received += 1;
    }
    log::debug!("Wrote {received} messages");
    Ok(())
}
