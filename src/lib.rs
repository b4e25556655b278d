pub mod config;
pub mod rotation;

pub use rotation::{
    log_rotate, LogReporter, MemoryReporter, Reporter, RotateOptions, RotationPolicy,
    RotationTarget, Rotator, RollingPolicy, SchedulerRegistry,
};

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Pattern(regex::Error),
    Walk(walkdir::Error),
    Archive(zip::result::ZipError),
    Config(toml::de::Error),
    InvalidTarget(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Pattern(e) => write!(f, "Pattern error: {}", e),
            Error::Walk(e) => write!(f, "Directory walk error: {}", e),
            Error::Archive(e) => write!(f, "Archive error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::InvalidTarget(s) => write!(f, "Invalid rotation target: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Pattern(e) => Some(e),
            Error::Walk(e) => Some(e),
            Error::Archive(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::InvalidTarget(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::Pattern(e)
    }
}

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        Error::Walk(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e)
    }
}
