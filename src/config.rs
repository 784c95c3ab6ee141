// The configuration consumed by the aggregator core.  It is built once from the command line and
// never changes afterwards.

use crate::error::ConfigError;

use std::path::PathBuf;
use std::time::Duration;

// The name under which standard output is requested.
pub const STDOUT_SENTINEL: &str = "-";

pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 250;

#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum Rotation {
    /// One file per local calendar day
    Daily,
    /// One file per local calendar hour
    Hourly,
    #[value(skip)]
    Never,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub listen: String,
    pub output: OutputTarget,
    pub rotation: Rotation,
    pub receive_timeout: Duration,
}

impl Config {
    // Rotation is meaningless for stdout and is dropped without comment.
    pub fn new(
        listen: &str,
        output_file: &str,
        rotate: Option<Rotation>,
        receive_timeout_ms: u64,
    ) -> Result<Config, ConfigError> {
        if listen.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if output_file.is_empty() {
            return Err(ConfigError::EmptyOutputFile);
        }
        if receive_timeout_ms == 0 {
            return Err(ConfigError::ZeroReceiveTimeout);
        }
        let (output, rotation) = if output_file == STDOUT_SENTINEL {
            if rotate.is_some() {
                log::debug!("Rotation ignored for standard output");
            }
            (OutputTarget::Stdout, Rotation::Never)
        } else {
            (
                OutputTarget::File(PathBuf::from(output_file)),
                rotate.unwrap_or(Rotation::Never),
            )
        };
        Ok(Config {
            listen: listen.to_string(),
            output,
            rotation,
            receive_timeout: Duration::from_millis(receive_timeout_ms),
        })
    }
}

#[test]
pub fn test_stdout_forces_no_rotation() {
    let c = Config::new("tcp://*:4000", "-", Some(Rotation::Daily), 250).unwrap();
    assert!(c.output == OutputTarget::Stdout);
    assert!(c.rotation == Rotation::Never);
    let c = Config::new("tcp://*:4000", "-", Some(Rotation::Hourly), 250).unwrap();
    assert!(c.rotation == Rotation::Never);
}

#[test]
pub fn test_file_keeps_rotation() {
    let c = Config::new("tcp://*:4000", "/tmp/out.log", Some(Rotation::Hourly), 100).unwrap();
    assert!(c.output == OutputTarget::File(PathBuf::from("/tmp/out.log")));
    assert!(c.rotation == Rotation::Hourly);
    assert!(c.receive_timeout == Duration::from_millis(100));
    let c = Config::new("tcp://*:4000", "/tmp/out.log", None, 250).unwrap();
    assert!(c.rotation == Rotation::Never);
}

#[test]
pub fn test_config_errors() {
    assert!(matches!(
        Config::new("", "-", None, 250),
        Err(ConfigError::EmptyEndpoint)
    ));
    assert!(matches!(
        Config::new("tcp://*:4000", "", None, 250),
        Err(ConfigError::EmptyOutputFile)
    ));
    assert!(matches!(
        Config::new("tcp://*:4000", "-", None, 0),
        Err(ConfigError::ZeroReceiveTimeout)
    ));
}
