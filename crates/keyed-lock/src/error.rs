use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Timed out after {waited:?} waiting for lock '{key}'")]
    Timeout { key: String, waited: Duration },
}
