use std::path::Path;

use tracing::warn;

use crate::dictionary::{ensure_rc_file, verify_dictionary};
use crate::error::{MecabError, Result};
use crate::feature::{parse_result, ParsedFeature};
use crate::runtime::{MecabLibrary, Tagger};

/// Lifecycle state of a [`MecabSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `init` has not been called.
    Uninitialized,
    /// A tagger is live.
    Initialized,
    /// The tagger was released; the session cannot be reused.
    Disposed,
    /// `init` failed; the session cannot be reused.
    Failed,
}

/// Owned analyzer session with an explicit state machine.
///
/// `init` is accepted once. After `dispose` or a failed `init` a new session
/// must be created.
pub struct MecabSession {
    library: MecabLibrary,
    state: SessionState,
    tagger: Option<Tagger>,
}

impl MecabSession {
    /// Creates an uninitialized session bound to `library`.
    pub fn new(library: MecabLibrary) -> Self {
        Self {
            library,
            state: SessionState::Uninitialized,
            tagger: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Verifies the dictionary, provisions `mecabrc` and creates the tagger.
    pub fn init(&mut self, dictionary_dir: impl AsRef<Path>) -> Result<()> {
        if self.state != SessionState::Uninitialized {
            let reason = match self.state {
                SessionState::Initialized => "has already been initialized",
                SessionState::Disposed => "has been disposed of",
                _ => "is in a failed state",
            };
            return Err(MecabError::Initialization(format!(
                "Cannot call `init(...)`, session {reason}."
            )));
        }

        match self.open(dictionary_dir.as_ref()) {
            Ok(tagger) => {
                self.tagger = Some(tagger);
                self.state = SessionState::Initialized;
                Ok(())
            }
            Err(error) => {
                warn!(%error, "session initialization failed");
                self.state = SessionState::Failed;
                Err(error)
            }
        }
    }

    fn open(&self, dictionary_dir: &Path) -> Result<Tagger> {
        verify_dictionary(dictionary_dir)?;
        ensure_rc_file(dictionary_dir)?;
        self.library.tagger(dictionary_dir)
    }

    fn live_tagger(&mut self) -> Result<&mut Tagger> {
        let message = match self.state {
            SessionState::Uninitialized => {
                "Session was not initialized. Did you forget to run `init(...)`?"
            }
            SessionState::Disposed => "This instance has been disposed of.",
            SessionState::Failed => "This instance is in a failed state.",
            SessionState::Initialized => "This instance has no live tagger.",
        };
        match self.tagger.as_mut() {
            Some(tagger) if self.state == SessionState::Initialized => Ok(tagger),
            _ => Err(MecabError::InvalidHandle(message.to_string())),
        }
    }

    /// Tokenizes `query` into `<surface>: <feature>` lines.
    pub fn tokenize(&mut self, query: &str) -> Result<String> {
        self.live_tagger()?.parse(query)
    }

    /// Tokenizes `query` and decodes the IPADIC feature columns.
    pub fn tokenize_features(&mut self, query: &str) -> Result<Vec<ParsedFeature>> {
        parse_result(&self.tokenize(query)?)
    }

    /// Releases the tagger.
    pub fn dispose(&mut self) -> Result<()> {
        self.live_tagger()?.dispose();
        self.tagger = None;
        self.state = SessionState::Disposed;
        Ok(())
    }
}
