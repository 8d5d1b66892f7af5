use std::env;
use std::ffi::CString;
use std::fmt;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::config::MecabHandle;
use crate::discovery::{default_library_candidates, discover_default_library_path};
use crate::error::{MecabError, Result};
use crate::model::Morpheme;
use crate::native::{cstr_to_string, describe_error, DynamicLibrary, LoadedLibrary, MecabApi};
use crate::node::{serialize, Nodes, RawNode};
use crate::types::TaggerConfig;

// `mecab_strerror(NULL)` reads a process-wide buffer, so construction and the
// follow-up error read must not interleave across threads.
static TAGGER_INIT_LOCK: Mutex<()> = Mutex::new(());

/// Handle to a loaded `libmecab` plus its resolved function table.
///
/// Cloning is cheap; every [`Tagger`] created from it keeps the library
/// mapped until the tagger is dropped.
#[derive(Clone)]
pub struct MecabLibrary {
    inner: Arc<LoadedLibrary>,
}

impl MecabLibrary {
    /// Loads `libmecab` from an explicit path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let library = DynamicLibrary::open(&path)?;
        debug!(path = %path.as_ref().display(), "loaded libmecab");
        Self::from_library(library)
    }

    /// Loads `libmecab` from common platform-specific locations and caches it.
    pub fn load_default() -> Result<Self> {
        static DEFAULT_LIBRARY: Mutex<Option<Arc<LoadedLibrary>>> = Mutex::new(None);

        let mut guard = DEFAULT_LIBRARY.lock().map_err(|_| {
            MecabError::LibraryLoad("failed to lock default library cache".to_string())
        })?;

        if let Some(inner) = guard.as_ref() {
            return Ok(Self {
                inner: inner.clone(),
            });
        }

        let loaded = Self::load_default_internal()?;
        *guard = Some(loaded.inner.clone());
        Ok(loaded)
    }

    fn load_default_internal() -> Result<Self> {
        let mut errors = Vec::new();

        if let Some(path) = discover_default_library_path() {
            match Self::load(&path) {
                Ok(loaded) => return Ok(loaded),
                Err(error) => errors.push(format!("{}: {}", path.display(), error)),
            }
        }

        for candidate in default_library_candidates() {
            match Self::load(candidate) {
                Ok(loaded) => return Ok(loaded),
                Err(error) => errors.push(format!("{candidate}: {error}")),
            }
        }

        Err(MecabError::LibraryLoad(format!(
            "set MECAB_LIBRARY_PATH to the dynamic library path. tried: {}",
            errors.join(" | ")
        )))
    }

    /// Loads from `MECAB_LIBRARY_PATH` if set, otherwise falls back to
    /// [`Self::load_default`].
    pub fn load_from_env_or_default() -> Result<Self> {
        if let Some(path) = env::var_os("MECAB_LIBRARY_PATH") {
            return Self::load(PathBuf::from(path));
        }
        Self::load_default()
    }

    fn from_library(library: DynamicLibrary) -> Result<Self> {
        let api = unsafe { MecabApi::load(&library)? };
        Ok(Self {
            inner: Arc::new(LoadedLibrary {
                _library: Some(library),
                api,
            }),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_api(api: MecabApi) -> Self {
        Self {
            inner: Arc::new(LoadedLibrary {
                _library: None,
                api,
            }),
        }
    }

    /// Returns the `mecab_version()` string.
    pub fn version(&self) -> String {
        cstr_to_string(unsafe { (self.inner.api.mecab_version)() })
    }

    /// Whether `mecab_new(argc, argv)` is exported, which is needed for
    /// dictionary paths that contain whitespace.
    pub fn supports_argv_init(&self) -> bool {
        self.inner.api.mecab_new.is_some()
    }

    /// Creates a tagger for `dictionary_dir` using `<dictionary_dir>/mecabrc`.
    pub fn tagger(&self, dictionary_dir: impl AsRef<Path>) -> Result<Tagger> {
        self.tagger_with_config(&TaggerConfig::default().with_dictionary_dir(dictionary_dir))
    }

    /// Creates a tagger from an explicit [`TaggerConfig`]. The config's
    /// `library_path` is ignored; this library is used.
    pub fn tagger_with_config(&self, config: &TaggerConfig) -> Result<Tagger> {
        let dictionary_dir = config.resolved_dictionary_dir()?;
        if !dictionary_dir.is_dir() {
            warn!(dictionary_dir = %dictionary_dir.display(), "dictionary directory not found");
            return Err(MecabError::Initialization(format!(
                "dictionary directory {} does not exist",
                dictionary_dir.display()
            )));
        }

        let arguments = config.arguments()?;
        let api = &self.inner.api;
        let needs_argv = arguments
            .iter()
            .any(|argument| argument.chars().any(char::is_whitespace));

        let _guard = TAGGER_INIT_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let factory = if needs_argv { "mecab_new" } else { "mecab_new2" };
        let handle = if needs_argv {
            let new = api.mecab_new.ok_or_else(|| {
                MecabError::Initialization(format!(
                    "arguments {arguments:?} contain whitespace and libmecab does not export mecab_new"
                ))
            })?;
            let mut argv_c = vec![CString::new("mecab")?];
            for argument in &arguments {
                argv_c.push(CString::new(argument.as_str())?);
            }
            let mut argv: Vec<*mut c_char> = argv_c
                .iter()
                .map(|value| value.as_ptr() as *mut c_char)
                .collect();
            unsafe { new(argv.len() as c_int, argv.as_mut_ptr()) }
        } else {
            let configuration = CString::new(arguments.join(" "))?;
            unsafe { (api.mecab_new2)(configuration.as_ptr()) }
        };

        if handle.is_null() {
            let fallback = format!("{factory} returned a null handle");
            let message = describe_error(api, ptr::null_mut(), &fallback);
            warn!(dictionary_dir = %dictionary_dir.display(), factory, %message, "tagger construction failed");
            return Err(MecabError::Initialization(message));
        }

        debug!(dictionary_dir = %dictionary_dir.display(), "tagger created");
        Ok(Tagger {
            inner: self.inner.clone(),
            handle,
            dictionary_dir: dictionary_dir.to_path_buf(),
        })
    }
}

/// A live MeCab tagger (`mecab_t*`).
///
/// Parsing takes `&mut self` because each call rebuilds the tagger's lattice
/// and invalidates the nodes of the previous call. The tagger may move
/// between threads but is not `Sync`.
pub struct Tagger {
    inner: Arc<LoadedLibrary>,
    handle: MecabHandle,
    dictionary_dir: PathBuf,
}

impl fmt::Debug for Tagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tagger")
            .field("dictionary_dir", &self.dictionary_dir)
            .field("live", &self.is_live())
            .finish()
    }
}

// mecab_t has no thread affinity; exclusive access is enforced by `&mut self`.
unsafe impl Send for Tagger {}

impl Tagger {
    /// Creates a tagger with the library from `MECAB_LIBRARY_PATH` or discovery.
    ///
    /// # Examples
    /// ```no_run
    /// use mecab_bridge::Tagger;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut tagger = Tagger::new("/usr/local/lib/mecab/dic/ipadic")?;
    /// let lines = tagger.parse("東京に行く")?;
    /// for line in lines.lines() {
    ///     println!("{line}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(dictionary_dir: impl AsRef<Path>) -> Result<Self> {
        MecabLibrary::load_from_env_or_default()?.tagger(dictionary_dir)
    }

    /// Creates a tagger from a full [`TaggerConfig`].
    pub fn from_config(config: TaggerConfig) -> Result<Self> {
        let library = match &config.library_path {
            Some(path) => MecabLibrary::load(path)?,
            None => MecabLibrary::load_from_env_or_default()?,
        };
        library.tagger_with_config(&config)
    }

    /// Dictionary directory this tagger was created from.
    pub fn dictionary_dir(&self) -> &Path {
        &self.dictionary_dir
    }

    /// `false` once [`Self::dispose`] has run.
    pub fn is_live(&self) -> bool {
        !self.handle.is_null()
    }

    /// Tokenizes `input` into `<surface>: <feature>` lines.
    ///
    /// Fails with [`MecabError::Parse`] if the output is not valid UTF-8;
    /// use [`Self::parse_bytes`] for dictionaries in other encodings.
    pub fn parse(&mut self, input: &str) -> Result<String> {
        let bytes = self.parse_bytes(input.as_bytes())?;
        String::from_utf8(bytes).map_err(|error| {
            MecabError::Parse(format!("tagger output is not valid UTF-8: {error}"))
        })
    }

    /// Byte-level [`Self::parse`]; input and output stay in the
    /// dictionary's encoding.
    pub fn parse_bytes(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(serialize(self.nodes(input)?.morphemes()))
    }

    /// Tokenizes `input` into morphemes, sentinels excluded.
    pub fn morphemes(&mut self, input: &str) -> Result<Vec<Morpheme>> {
        self.nodes(input.as_bytes())?
            .morphemes()
            .map(RawNode::to_morpheme)
            .collect()
    }

    // Node surfaces point into `input`, so the traversal borrows both.
    fn nodes<'a>(&'a mut self, input: &'a [u8]) -> Result<Nodes<'a>> {
        if self.handle.is_null() {
            return Err(MecabError::InvalidHandle(
                "tagger has been disposed".to_string(),
            ));
        }
        if input.is_empty() {
            return Ok(unsafe { Nodes::from_head(ptr::null()) });
        }

        let api = &self.inner.api;
        let head =
            unsafe { (api.mecab_sparse_tonode2)(self.handle, input.as_ptr().cast(), input.len()) };
        if head.is_null() {
            return Err(MecabError::Parse(describe_error(
                api,
                self.handle,
                "mecab_sparse_tonode2 returned no nodes",
            )));
        }
        Ok(unsafe { Nodes::from_head(head) })
    }

    /// Releases the native tagger. Calling it again is a no-op.
    pub fn dispose(&mut self) {
        if self.handle.is_null() {
            return;
        }
        unsafe {
            (self.inner.api.mecab_destroy)(self.handle);
        }
        self.handle = ptr::null_mut();
        debug!(dictionary_dir = %self.dictionary_dir.display(), "tagger disposed");
    }
}

impl Drop for Tagger {
    fn drop(&mut self) {
        self.dispose();
    }
}
