use std::fmt;

#[derive(Debug)]
pub enum LevelError {
    /// The limit rebuild worker could not be started.
    Worker(rayon::ThreadPoolBuildError),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Worker(e) => write!(f, "limit worker: {}", e),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Worker(e) => Some(e),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for LevelError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        LevelError::Worker(e)
    }
}
