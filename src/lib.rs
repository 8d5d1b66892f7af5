#![warn(missing_docs)]

//! Lifecycle-safe bridge between the MeCab morphological analyzer and
//! mobile runtimes.
//!
//! `libmecab` is loaded at runtime; this crate owns tagger lifetimes, node
//! traversal and the boundary encoding, never tokenization itself.
//!
//! ## Quick Start
//! ```no_run
//! use mecab_bridge::Tagger;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tagger = Tagger::new("/usr/local/lib/mecab/dic/ipadic")?;
//!     for morpheme in tagger.morphemes("東京に行く")? {
//!         println!("{}\t{}", morpheme.surface, morpheme.feature);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Boundary Handles
//! Hosts that can only pass integers (JNI `jlong`, React Native bridges) use
//! [`bridge`]: `create` returns an [`AnalyzerHandle`] backed by a
//! process-wide table, `run` validates it before touching the tagger, and
//! `destroy` is idempotent.
//!
//! ```no_run
//! use mecab_bridge::bridge;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = bridge::create("/data/ipadic")?;
//!     let lines = bridge::run(handle, "東京")?;
//!     print!("{lines}");
//!     bridge::destroy(handle)?;
//!     assert!(bridge::run(handle, "東京").is_err());
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//! - `MECAB_LIBRARY_PATH`: explicit `libmecab` path.
//! - `MECAB_DICDIR`: default dictionary directory for [`TaggerConfig`].

pub mod bridge;
mod config;
mod constants;
mod dictionary;
mod discovery;
mod error;
mod feature;
mod model;
mod native;
mod node;
mod registry;
mod runtime;
mod session;
mod types;

pub use constants::*;
pub use dictionary::{
    ensure_rc_file, install_dictionary, missing_dictionary_files, normalize_dictionary_name,
    verify_dictionary,
};
pub use error::{MecabError, Result};
pub use feature::{parse_result, ParsedFeature};
pub use model::{Morpheme, NodeStat};
pub use registry::{AnalyzerHandle, HandleTable, SharedTagger};
pub use runtime::{MecabLibrary, Tagger};
pub use session::{MecabSession, SessionState};
pub use types::TaggerConfig;

#[cfg(test)]
mod test_support;
