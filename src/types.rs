use std::env;
use std::path::{Path, PathBuf};

use crate::constants::MECAB_RC_FILE_NAME;
use crate::discovery::discover_default_dictionary_dir;
use crate::error::{MecabError, Result};

/// Settings used to construct a [`crate::Tagger`].
#[derive(Debug, Clone)]
pub struct TaggerConfig {
    /// Explicit `libmecab` path. Falls back to discovery when `None`.
    pub library_path: Option<PathBuf>,
    /// Directory holding the compiled dictionary and `mecabrc`.
    pub dictionary_dir: Option<PathBuf>,
    /// Runtime-config file; defaults to `<dictionary_dir>/mecabrc`.
    pub rc_file: Option<PathBuf>,
    /// Additional raw MeCab arguments appended after `--dicdir`/`--rcfile`.
    pub extra_arguments: Vec<String>,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            library_path: env::var_os("MECAB_LIBRARY_PATH").map(PathBuf::from),
            dictionary_dir: discover_default_dictionary_dir(),
            rc_file: None,
            extra_arguments: Vec::new(),
        }
    }
}

impl TaggerConfig {
    /// Loads `libmecab` from this path instead of discovering it.
    pub fn with_library_path(mut self, library_path: impl AsRef<Path>) -> Self {
        self.library_path = Some(library_path.as_ref().to_path_buf());
        self
    }

    /// Dictionary directory passed as `--dicdir`.
    pub fn with_dictionary_dir(mut self, dictionary_dir: impl AsRef<Path>) -> Self {
        self.dictionary_dir = Some(dictionary_dir.as_ref().to_path_buf());
        self
    }

    /// Explicit `--rcfile`; defaults to `<dictionary_dir>/mecabrc`.
    pub fn with_rc_file(mut self, rc_file: impl AsRef<Path>) -> Self {
        self.rc_file = Some(rc_file.as_ref().to_path_buf());
        self
    }

    /// Appends a raw MeCab argument such as `--node-format=%m`.
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.extra_arguments.push(argument.into());
        self
    }

    pub(crate) fn resolved_dictionary_dir(&self) -> Result<&Path> {
        self.dictionary_dir.as_deref().ok_or_else(|| {
            MecabError::InvalidArgument(
                "dictionary directory is not set (use with_dictionary_dir or MECAB_DICDIR)"
                    .to_string(),
            )
        })
    }

    /// Runtime-config path handed to `--rcfile`.
    pub fn resolved_rc_file(&self) -> Result<PathBuf> {
        match &self.rc_file {
            Some(rc_file) => Ok(rc_file.clone()),
            None => Ok(self.resolved_dictionary_dir()?.join(MECAB_RC_FILE_NAME)),
        }
    }

    /// Argument vector passed to the MeCab factory, without the program name.
    pub fn arguments(&self) -> Result<Vec<String>> {
        let dictionary_dir = self.resolved_dictionary_dir()?;
        let mut arguments = vec![
            "--dicdir".to_string(),
            dictionary_dir.to_string_lossy().to_string(),
            "--rcfile".to_string(),
            self.resolved_rc_file()?.to_string_lossy().to_string(),
        ];
        arguments.extend(self.extra_arguments.iter().cloned());
        Ok(arguments)
    }

    /// Configuration string in the form `mecab_new2` expects, e.g.
    /// `--dicdir /data/ipadic --rcfile /data/ipadic/mecabrc`.
    pub fn configuration_string(&self) -> Result<String> {
        Ok(self.arguments()?.join(" "))
    }
}
