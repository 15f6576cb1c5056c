//! Loading and interning of word lists. Every word is normalized, then stored as a sequence of
//! glyph ids so the solver can compare crossing cells by integer instead of by string.

use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use unicode_normalization::UnicodeNormalization;

use crate::types::{GlyphId, WordId};
use crate::{MAX_GLYPH_COUNT, MAX_SLOT_LENGTH};

/// How many bad lines we'll record for a single source before giving up on it.
const MAX_ERRORS_PER_SOURCE: usize = 100;

/// A struct representing a word in the word list.
#[derive(Debug, Clone)]
pub struct Word {
    /// Lowercased, NFC-composed, whitespace-free; this is what goes in the grid.
    pub normalized_string: String,

    /// The entry as written in its source, trimmed.
    pub canonical_string: String,

    /// One glyph id per character of `normalized_string`.
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,
}

impl Word {
    /// The number of cells this word occupies in the grid.
    #[must_use]
    pub fn length(&self) -> usize {
        self.glyphs.len()
    }
}

/// Turn an entry from a word list into the form that's placed in the grid.
#[must_use]
pub fn normalize_word(canonical: &str) -> String {
    canonical
        .to_lowercase()
        .nfc()
        .filter(|ch| !ch.is_whitespace())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordListError {
    /// A file source that couldn't be read.
    InvalidPath(String),

    /// An entry with nothing left after normalization.
    InvalidWord(String),
}

impl fmt::Display for WordListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordListError::InvalidPath(path) => write!(f, "Can’t read file: “{path}”"),
            WordListError::InvalidWord(word) => write!(f, "Invalid word list entry: “{word}”"),
        }
    }
}

impl std::error::Error for WordListError {}

/// Where a word list's entries come from. File and contents sources hold one entry per line.
pub enum WordListSourceConfig {
    Memory { id: String, words: Vec<String> },
    File { id: String, path: OsString },
    FileContents { id: String, contents: String },
}

impl WordListSourceConfig {
    #[must_use]
    pub fn id(&self) -> String {
        let (WordListSourceConfig::Memory { id, .. }
        | WordListSourceConfig::File { id, .. }
        | WordListSourceConfig::FileContents { id, .. }) = self;
        id.clone()
    }

    /// Read and normalize this source's entries, recording problems instead of failing.
    fn load(&self) -> (Vec<Entry>, WordListSourceState) {
        let mut errors = vec![];

        let entries = match self {
            WordListSourceConfig::Memory { words, .. } => words
                .iter()
                .filter_map(|line| Entry::parse(line, &mut errors))
                .collect(),
            WordListSourceConfig::File { path, .. } => match fs::read_to_string(path) {
                Ok(contents) => parse_lines(&contents, &mut errors),
                Err(_) => {
                    errors.push(WordListError::InvalidPath(path.to_string_lossy().into()));
                    vec![]
                }
            },
            WordListSourceConfig::FileContents { contents, .. } => {
                parse_lines(contents, &mut errors)
            }
        };

        let state = WordListSourceState {
            id: self.id(),
            word_count: entries.len(),
            errors,
        };
        (entries, state)
    }
}

/// What happened when a source was loaded.
#[derive(Debug)]
pub struct WordListSourceState {
    pub id: String,

    /// Valid entries in this source, including ones an earlier source already supplied.
    pub word_count: usize,

    pub errors: Vec<WordListError>,
}

/// A normalized entry that hasn't been interned yet.
struct Entry {
    normalized: String,
    canonical: String,
}

impl Entry {
    fn parse(line: &str, errors: &mut Vec<WordListError>) -> Option<Entry> {
        let normalized = normalize_word(line);
        if normalized.is_empty() {
            errors.push(WordListError::InvalidWord(line.into()));
            return None;
        }

        Some(Entry {
            normalized,
            canonical: line.trim().to_string(),
        })
    }
}

/// One entry per line. Blank lines are skipped and anything after a `;` (such as a score) is
/// dropped. Stops early once a source has produced too many errors.
fn parse_lines(contents: &str, errors: &mut Vec<WordListError>) -> Vec<Entry> {
    let mut entries = vec![];

    for line in contents.lines() {
        if errors.len() > MAX_ERRORS_PER_SOURCE {
            break;
        }

        let word = line.split(';').next().unwrap_or_default();
        if word.trim().is_empty() {
            continue;
        }
        entries.extend(Entry::parse(word, errors));
    }

    entries
}

/// A struct representing the loaded word list(s). A word's `WordId` is its index in `words`,
/// which follows source order; when two sources share a word, the first one wins.
pub struct WordList {
    /// Every distinct character seen in a normalized word, indexed by `GlyphId`.
    pub glyphs: SmallVec<[char; MAX_GLYPH_COUNT]>,

    pub glyph_id_by_char: HashMap<char, GlyphId>,

    /// Every loaded word, regardless of length.
    pub words: Vec<Word>,

    /// Normalized string to `WordId`.
    pub word_id_by_string: HashMap<String, WordId>,

    /// `word_ids_by_length[n]` holds every word with `n` glyphs, ascending.
    pub word_ids_by_length: Vec<Vec<WordId>>,

    /// Longer entries were skipped while loading.
    pub max_length: Option<usize>,

    /// Per-source load results, keyed by source id.
    pub source_states: HashMap<String, WordListSourceState>,
}

impl WordList {
    /// Load the given sources in order, skipping entries longer than `max_length`. Unreadable
    /// sources and invalid entries end up in `source_states` rather than failing the load.
    #[must_use]
    pub fn new(source_configs: Vec<WordListSourceConfig>, max_length: Option<usize>) -> WordList {
        let mut word_list = WordList {
            glyphs: SmallVec::new(),
            glyph_id_by_char: HashMap::new(),
            words: vec![],
            word_id_by_string: HashMap::new(),
            word_ids_by_length: vec![],
            max_length,
            source_states: HashMap::new(),
        };
        let mut seen: HashSet<String> = HashSet::new();

        for source in &source_configs {
            let (entries, state) = source.load();
            word_list.source_states.insert(state.id.clone(), state);

            for entry in entries {
                let too_long =
                    max_length.map_or(false, |max| entry.normalized.chars().count() > max);
                if !too_long && seen.insert(entry.normalized.clone()) {
                    word_list.intern(entry);
                }
            }
        }

        word_list
    }

    /// Build a `WordList` from an in-memory list of words.
    #[must_use]
    pub fn from_words<I, S>(words: I) -> WordList
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WordList::new(
            vec![WordListSourceConfig::Memory {
                id: "0".into(),
                words: words.into_iter().map(Into::into).collect(),
            }],
            None,
        )
    }

    fn intern(&mut self, entry: Entry) -> WordId {
        let glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]> = entry
            .normalized
            .chars()
            .map(|ch| self.glyph_id_for_char(ch))
            .collect();

        let word_id = self.words.len();
        self.word_id_by_string
            .insert(entry.normalized.clone(), word_id);

        let length = glyphs.len();
        if self.word_ids_by_length.len() <= length {
            self.word_ids_by_length.resize_with(length + 1, Vec::new);
        }
        self.word_ids_by_length[length].push(word_id);
        self.words.push(Word {
            normalized_string: entry.normalized,
            canonical_string: entry.canonical,
            glyphs,
        });

        word_id
    }

    /// The glyph id for `ch`, allocating one the first time it's seen. Entries may contain digits,
    /// accented letters, or punctuation, so the alphabet isn't fixed up front.
    pub fn glyph_id_for_char(&mut self, ch: char) -> GlyphId {
        if let Some(&glyph_id) = self.glyph_id_by_char.get(&ch) {
            return glyph_id;
        }
        let glyph_id = self.glyphs.len();
        self.glyphs.push(ch);
        self.glyph_id_by_char.insert(ch, glyph_id);
        glyph_id
    }

    #[must_use]
    pub fn get_word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// Every word with exactly `length` glyphs, in ascending id order.
    #[must_use]
    pub fn word_ids_of_length(&self, length: usize) -> &[WordId] {
        self.word_ids_by_length
            .get(length)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up a word by its string, normalizing it first.
    #[must_use]
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.word_id_by_string.get(&normalize_word(word)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Errors recorded for each source, keyed by source id.
    #[must_use]
    pub fn get_source_errors(&self) -> HashMap<String, Vec<WordListError>> {
        self.source_states
            .values()
            .map(|state| (state.id.clone(), state.errors.clone()))
            .collect()
    }
}

impl fmt::Debug for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordList")
            .field("word_count", &self.words.len())
            .field("glyph_count", &self.glyphs.len())
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub mod tests {
    use crate::word_list::{WordList, WordListError, WordListSourceConfig};
    use std::path::PathBuf;

    /// Path to a fixture file in the crate's `resources` directory.
    #[must_use]
    pub fn resource_path(name: &str) -> PathBuf {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("resources");
        path.push(name);
        path
    }

    #[must_use]
    pub fn load_resource_word_list(name: &str) -> WordList {
        WordList::new(
            vec![WordListSourceConfig::File {
                id: "0".into(),
                path: resource_path(name).into(),
            }],
            None,
        )
    }

    #[test]
    fn test_loads_words_from_file() {
        let word_list = load_resource_word_list("words0.txt");

        assert_eq!(word_list.len(), 10);
        assert!(word_list.get_source_errors()["0"].is_empty());

        let word_id = word_list.word_id("Seven").expect("word list should include 'seven'");
        let word = word_list.get_word(word_id);
        assert_eq!(word.normalized_string, "seven");
        assert_eq!(word.length(), 5);
    }

    #[test]
    fn test_max_length_skips_long_words() {
        let word_list = WordList::new(
            vec![WordListSourceConfig::FileContents {
                id: "0".into(),
                contents: "one\nthree\nfour\n".into(),
            }],
            Some(4),
        );

        assert_eq!(word_list.len(), 2);
        assert!(word_list.word_id("three").is_none());
        assert_eq!(word_list.word_ids_of_length(3), &[0]);
        assert_eq!(word_list.word_ids_of_length(4), &[1]);
        assert!(word_list.word_ids_of_length(5).is_empty());
        assert_eq!(word_list.max_length, Some(4));
    }

    #[test]
    fn test_duplicates_keep_first_source() {
        let word_list = WordList::new(
            vec![
                WordListSourceConfig::Memory {
                    id: "a".into(),
                    words: vec!["Cat".into(), "dog".into()],
                },
                WordListSourceConfig::FileContents {
                    id: "b".into(),
                    contents: "CAT;60\n\nant\n".into(),
                },
            ],
            None,
        );

        let strings: Vec<_> = word_list
            .words
            .iter()
            .map(|word| word.normalized_string.as_str())
            .collect();
        assert_eq!(strings, vec!["cat", "dog", "ant"]);
        assert_eq!(word_list.words[0].canonical_string, "Cat");
        assert_eq!(word_list.source_states["b"].word_count, 2);
    }

    #[test]
    #[allow(clippy::unicode_not_nfc)]
    fn test_unusual_characters() {
        let word_list = WordList::from_words([
            // Non-English character expressed as one two-byte `char`
            "monsutâ",
            // Non-English character expressed as two chars w/ combining form
            "hélen",
        ]);

        assert_eq!(
            word_list.words.iter().map(|word| word.length()).collect::<Vec<_>>(),
            vec![7, 5]
        );
    }

    #[test]
    fn test_errors_are_collected_per_source() {
        let word_list = WordList::new(
            vec![
                WordListSourceConfig::File {
                    id: "missing".into(),
                    path: resource_path("no-such-file.txt").into(),
                },
                WordListSourceConfig::Memory {
                    id: "memory".into(),
                    words: vec!["  ".into(), "ok".into()],
                },
            ],
            None,
        );

        let errors = word_list.get_source_errors();
        assert!(matches!(
            errors["missing"].as_slice(),
            [WordListError::InvalidPath(_)]
        ));
        assert_eq!(
            errors["memory"],
            vec![WordListError::InvalidWord("  ".into())]
        );
        assert_eq!(word_list.len(), 1);
    }
}
