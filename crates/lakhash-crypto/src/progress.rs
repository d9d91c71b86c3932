//! Progress reporting for chunked operations

use std::sync::Arc;

/// Phase of an operation being reported
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Argon2id is running; the host may appear frozen
    DerivingKey,
    /// HMAC-SHA-512 over the payload
    Tagging,
    /// Ratcheted ChaCha20 layer
    StreamCipher,
    /// Serpent CBC layer
    BlockCipher,
    /// Sending transport chunks
    Uploading,
    /// Fetching transport chunks
    Downloading,
    /// Removing transport chunks
    Deleting,
}

impl Stage {
    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::DerivingKey => "deriving key (may freeze)",
            Self::Tagging => "computing tag",
            Self::StreamCipher => "stream cipher",
            Self::BlockCipher => "block cipher",
            Self::Uploading => "uploading",
            Self::Downloading => "downloading",
            Self::Deleting => "deleting",
        }
    }
}

/// Progress information for one stage
#[derive(Clone, Debug)]
pub struct Progress {
    /// Current stage
    pub stage: Stage,
    /// Units processed so far (bytes or chunks depending on the stage)
    pub processed: u64,
    /// Total units for the stage
    pub total: u64,
}

impl Progress {
    /// Get percentage complete
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.processed as f64 / self.total as f64) * 100.0
    }
}

/// Progress callback type
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Optional callback carried through a pipeline call
#[derive(Clone, Default)]
pub struct Reporter {
    callback: Option<ProgressCallback>,
}

impl Reporter {
    /// Report to `callback`
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Discard all progress
    pub fn silent() -> Self {
        Self::default()
    }

    /// Emit one progress event
    pub fn report(&self, stage: Stage, processed: u64, total: u64) {
        if let Some(callback) = &self.callback {
            callback(Progress {
                stage,
                processed,
                total,
            });
        }
    }
}

impl From<Option<ProgressCallback>> for Reporter {
    fn from(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
