use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

pub type StopWords = HashSet<String>;

lazy_static! {
    static ref PUNCT: Regex = Regex::new(r"[\p{P}\p{S}]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

const DEFAULT_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
];

/// NFKC, lowercase, then strip punctuation and symbols.
fn preprocess(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    PUNCT.replace_all(&lowered, "").into_owned()
}

/// Tokenize text into normalized terms: lowercase, punctuation removal,
/// whitespace split, stop-word removal, then English stemming. Order is preserved.
pub fn tokenize(text: &str, stop_words: &StopWords) -> Vec<String> {
    preprocess(text)
        .split_whitespace()
        .filter(|token| !stop_words.contains(*token))
        .map(|token| STEMMER.stem(token).into_owned())
        .filter(|stem| !stem.is_empty())
        .collect()
}

/// Normalize raw stop words the same way document text is preprocessed, so
/// "don't" matches the stripped token "dont".
pub fn normalize_stop_words<I, S>(words: I) -> StopWords
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| preprocess(w.as_ref().trim()))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Built-in English stop-word list.
pub fn default_stop_words() -> StopWords {
    normalize_stop_words(DEFAULT_STOPWORDS)
}
