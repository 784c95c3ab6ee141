// Error taxonomy.  Startup failures (output, listener, signals) and sink failures during the run are
// fatal and surface in main(); transport errors are transient and only ever logged by the receive
// loop.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("receive timeout must be positive")]
    ZeroReceiveTimeout,
    #[error("listen endpoint is empty")]
    EmptyEndpoint,
    #[error("output file name is empty")]
    EmptyOutputFile,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("{}: {source}", path.display())]
    Rotate { path: PathBuf, source: io::Error },
    #[error("{source}")]
    Write { source: io::Error },
}

#[derive(Debug, Error)]
#[error("{endpoint}: {source}")]
pub struct ListenerError {
    pub endpoint: String,
    pub source: zmq::Error,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("receive failed: {0}")]
    Recv(#[from] zmq::Error),
    #[error("dropped message of {0} bytes that is not valid UTF-8")]
    NotUtf8(usize),
}

#[derive(Debug, Error)]
#[error("could not install signal handlers: {0}")]
pub struct ShutdownError(#[from] pub io::Error);

// Everything that can end the process with a non-zero status.  The Display text is the one-line
// diagnostic main() prints: the failing operation, then the cause.

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Could not create ZMQ listener: {0}")]
    Listener(#[from] ListenerError),
    #[error("Could not set up signal handling: {0}")]
    Shutdown(#[from] ShutdownError),
    #[error("{}", describe_sink_error(.0))]
    Sink(#[from] SinkError),
}

fn describe_sink_error(e: &SinkError) -> String {
    match e {
        SinkError::Open { .. } => format!("Could not open output file: {e}"),
        SinkError::Rotate { .. } => format!("Could not rotate output file: {e}"),
        SinkError::Write { .. } => format!("Could not write output: {e}"),
    }
}

#[test]
pub fn test_diagnostics() {
    let e = AggregatorError::from(SinkError::Open {
        path: PathBuf::from("/nonexistent/x.log"),
        source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
    });
    assert!(e.to_string() == "Could not open output file: /nonexistent/x.log: No such file or directory");

    let e = AggregatorError::from(SinkError::Rotate {
        path: PathBuf::from("/ro/x_20240315.log"),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"),
    });
    assert!(e.to_string() == "Could not rotate output file: /ro/x_20240315.log: Permission denied");

    let e = AggregatorError::from(ListenerError {
        endpoint: "tcp://*:4000".to_string(),
        source: zmq::Error::EADDRINUSE,
    });
    assert!(e.to_string().starts_with("Could not create ZMQ listener: tcp://*:4000: "));

    let e = AggregatorError::from(ConfigError::ZeroReceiveTimeout);
    assert!(e.to_string() == "Invalid configuration: receive timeout must be positive");
}
