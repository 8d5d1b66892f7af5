//! Traversal over the tagger-owned `mecab_node_t` list.
//!
//! The list is produced by one `mecab_sparse_tonode2` call and lives in the
//! tagger's lattice until the next call on the same tagger, so [`Nodes`]
//! borrows for that span and is consumed once.

use std::ffi::CStr;
use std::marker::PhantomData;

use crate::config::MecabNodeRaw;
use crate::constants::RESULT_SEPARATOR;
use crate::error::{MecabError, Result};
use crate::model::{Morpheme, NodeStat};

/// Borrowed view of one node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawNode<'a> {
    pub(crate) surface: &'a [u8],
    pub(crate) feature: &'a [u8],
    pub(crate) stat: NodeStat,
}

impl<'a> RawNode<'a> {
    unsafe fn from_raw(node: &'a MecabNodeRaw) -> Self {
        Self {
            surface: surface_bytes(node),
            feature: feature_bytes(node),
            stat: NodeStat::from_raw(node.stat),
        }
    }

    /// Copies the node out; fails if the dictionary output is not UTF-8.
    pub(crate) fn to_morpheme(self) -> Result<Morpheme> {
        Ok(Morpheme {
            surface: utf8(self.surface, "surface")?,
            feature: utf8(self.feature, "feature")?,
            stat: self.stat,
        })
    }

    /// Appends `<surface>: <feature>\n`.
    pub(crate) fn write_line(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.surface);
        out.extend_from_slice(RESULT_SEPARATOR.as_bytes());
        out.extend_from_slice(self.feature);
        out.push(b'\n');
    }
}

fn utf8(bytes: &[u8], field: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|error| MecabError::Parse(format!("node {field} is not valid UTF-8: {error}")))
}

/// Forward iterator following `next` pointers, sentinels included.
pub(crate) struct Nodes<'a> {
    current: *const MecabNodeRaw,
    _lattice: PhantomData<&'a MecabNodeRaw>,
}

impl<'a> Nodes<'a> {
    /// # Safety
    /// `head` must be null or the first node of a list whose nodes, surface
    /// buffers and feature strings stay valid and unmodified for `'a`.
    pub(crate) unsafe fn from_head(head: *const MecabNodeRaw) -> Self {
        Self {
            current: head,
            _lattice: PhantomData,
        }
    }

    /// Nodes that carry a morpheme, with BOS/EOS skipped.
    pub(crate) fn morphemes(self) -> impl Iterator<Item = RawNode<'a>> {
        self.filter(|node| !node.stat.is_sentinel())
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = RawNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_null() {
            return None;
        }
        let node = unsafe { &*self.current };
        self.current = node.next;
        Some(unsafe { RawNode::from_raw(node) })
    }
}

/// Serializes every morpheme as one `<surface>: <feature>` line.
pub(crate) fn serialize<'a>(morphemes: impl Iterator<Item = RawNode<'a>>) -> Vec<u8> {
    let mut out = Vec::new();
    for node in morphemes {
        node.write_line(&mut out);
    }
    out
}

// `surface` points into the shared input buffer; only `length` bytes belong
// to this node.
unsafe fn surface_bytes(node: &MecabNodeRaw) -> &[u8] {
    if node.surface.is_null() || node.length == 0 {
        return &[];
    }
    std::slice::from_raw_parts(node.surface.cast::<u8>(), usize::from(node.length))
}

unsafe fn feature_bytes(node: &MecabNodeRaw) -> &[u8] {
    if node.feature.is_null() {
        return &[];
    }
    CStr::from_ptr(node.feature).to_bytes()
}
