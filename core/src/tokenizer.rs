use crate::error::TokenizeError;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
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
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Turns raw content into the ordered sequence of index terms.
///
/// The position of a term is its index in the returned vector. Implementations must be
/// deterministic; the same text always yields the same terms.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError>;
}

/// NFKC normalization, lowercase, stopword removal and English stemming.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishTokenizer;

/// Lowercase and stopword removal only; terms keep their surface form.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl Tokenizer for EnglishTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        Ok(tokenize(text))
    }
}

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        let lowered = text.to_lowercase();
        Ok(words(&lowered).map(str::to_string).collect())
    }
}

/// Picks a built-in tokenizer by name, as used on the command line.
pub fn by_name(name: &str) -> Option<Box<dyn Tokenizer>> {
    match name {
        "english" => Some(Box::new(EnglishTokenizer)),
        "simple" => Some(Box::new(SimpleTokenizer)),
        _ => None,
    }
}

fn words(normalized: &str) -> impl Iterator<Item = &str> {
    RE.find_iter(normalized).map(|m| m.as_str()).filter(|t| !is_stopword(t))
}

/// Tokenize text using NFKC normalization, lowercase, stopword removal, and stemming.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    words(&normalized).map(|token| STEMMER.stem(token).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn positions_skip_removed_stopwords() {
        let t = SimpleTokenizer.tokenize("The quick fox").unwrap();
        assert_eq!(t, vec!["quick", "fox"]);
    }

    #[test]
    fn empty_content_yields_no_terms() {
        assert!(EnglishTokenizer.tokenize("").unwrap().is_empty());
        assert!(SimpleTokenizer.tokenize("  ,;  ").unwrap().is_empty());
    }
}
