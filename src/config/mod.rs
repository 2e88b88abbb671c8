mod settings;

pub use settings::{LogFormat, LoggingConfig, RetryPolicy, SessionConfig, Settings, TransportKind};
