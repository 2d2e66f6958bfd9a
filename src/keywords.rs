//! Keyword frequency extraction over playlist descriptions.
//!
//! Descriptions are mostly unsegmented CJK text, so tokenization sits behind
//! the `Tokenizer` trait. The default is a dictionary segmenter (jieba); a
//! Unicode word-boundary segmenter is available for whitespace languages.

use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use crate::group::count_frequencies;
use crate::models::{KeywordCount, PlaylistRecord};

/// Tokens shorter than this (in chars) are dropped.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Common function words plus domain-generic terms ("playlist", "music", "song").
pub const BUILTIN_STOPWORDS: &[&str] = &[
    "的", "了", "是", "在", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
    "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这", "啊", "吗",
    "歌单", "音乐", "歌曲",
];

static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Punctuation, symbols and whitespace with no word content.
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{P}\p{S}\s]+$").unwrap());

pub trait Tokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Dictionary-based segmentation with HMM for unknown words.
#[derive(Debug, Default, Clone, Copy)]
pub struct DictionaryTokenizer;

impl Tokenizer for DictionaryTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        JIEBA.cut(text, true)
    }
}

/// UAX #29 word boundaries.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnicodeWordTokenizer;

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        use unicode_segmentation::UnicodeSegmentation;
        text.unicode_words().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TokenizerKind {
    #[default]
    Dictionary,
    UnicodeWords,
}

impl TokenizerKind {
    pub fn build(self) -> Box<dyn Tokenizer> {
        match self {
            TokenizerKind::Dictionary => Box::new(DictionaryTokenizer),
            TokenizerKind::UnicodeWords => Box::new(UnicodeWordTokenizer),
        }
    }
}

/// Stopword set: the built-in list plus any configured extras.
#[derive(Debug, Clone)]
pub struct Stopwords(FxHashSet<String>);

impl Stopwords {
    pub fn builtin() -> Self {
        Self(BUILTIN_STOPWORDS.iter().map(|s| s.to_string()).collect())
    }

    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(extra.into_iter().map(Into::into));
        self
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::builtin()
    }
}

/// All present descriptions joined by a single space, in collection order.
pub fn description_corpus(playlists: &[PlaylistRecord]) -> String {
    playlists
        .iter()
        .filter_map(|p| p.description.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A token counts as a keyword when it has at least two characters, is not
/// made up only of punctuation, symbols or whitespace, and is not a stopword.
fn keep_token(token: &str, stopwords: &Stopwords) -> bool {
    token.chars().count() >= MIN_TOKEN_CHARS
        && !NON_WORD.is_match(token)
        && !stopwords.contains(token)
}

/// Top `n` description keywords by frequency, ties in first-seen order.
pub fn extract_keywords(
    playlists: &[PlaylistRecord],
    n: usize,
    tokenizer: &dyn Tokenizer,
    stopwords: &Stopwords,
) -> Vec<KeywordCount> {
    let corpus = description_corpus(playlists);
    if corpus.trim().is_empty() {
        return Vec::new();
    }

    let tokens = tokenizer
        .tokenize(&corpus)
        .into_iter()
        .map(str::trim)
        .filter(|t| keep_token(t, stopwords));

    let mut counts = count_frequencies(tokens);
    counts.truncate(n);
    counts
        .into_iter()
        .map(|(word, count)| KeywordCount { word, count })
        .collect()
}
