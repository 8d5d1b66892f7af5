use crate::constants::{
    MECAB_BOS_NODE, MECAB_EON_NODE, MECAB_EOS_NODE, MECAB_NOR_NODE, MECAB_UNK_NODE,
};

/// Kind of a lattice node, mirrored from `MECAB_*_NODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStat {
    /// Morpheme found in the dictionary.
    Normal,
    /// Morpheme synthesized for an unknown word.
    Unknown,
    /// Begin-of-sentence sentinel.
    BeginOfSentence,
    /// End-of-sentence sentinel.
    EndOfSentence,
    /// End of an N-best enumeration.
    EndOfNBest,
    /// Value the bridge does not know about.
    Other(u8),
}

impl NodeStat {
    pub(crate) fn from_raw(stat: u8) -> Self {
        match stat {
            MECAB_NOR_NODE => NodeStat::Normal,
            MECAB_UNK_NODE => NodeStat::Unknown,
            MECAB_BOS_NODE => NodeStat::BeginOfSentence,
            MECAB_EOS_NODE => NodeStat::EndOfSentence,
            MECAB_EON_NODE => NodeStat::EndOfNBest,
            other => NodeStat::Other(other),
        }
    }

    /// Whether the node is a begin/end-of-sentence marker without surface text.
    pub fn is_sentinel(self) -> bool {
        matches!(self, NodeStat::BeginOfSentence | NodeStat::EndOfSentence)
    }
}

/// One morpheme of an analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    /// Input substring covered by the morpheme.
    pub surface: String,
    /// Comma-separated annotation produced by the dictionary, verbatim.
    pub feature: String,
    /// Node kind reported by the tagger.
    pub stat: NodeStat,
}
