use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;
use tracing::warn;

pub const MAX_VOCABULARY: usize = 1000;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

const KEYWORD_STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "up",
    "about", "into", "through",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

fn keyword_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[가-힣a-zA-Z]{2,}").expect("keyword pattern is valid"))
}

fn english_stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| ENGLISH_STOP_WORDS.iter().copied().collect())
}

/// Lower-cases `text` and splits it into word tokens of two or more
/// characters, dropping English stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stop_words = english_stop_words();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !stop_words.contains(token))
        .map(str::to_string)
        .collect()
}

/// Cosine similarity between the TF-IDF vectors of two texts, where the
/// corpus is exactly the two texts.
///
/// IDF is smoothed (`ln((1 + n) / (1 + df)) + 1`) and each vector is
/// L2-normalized. The vocabulary keeps the [`MAX_VOCABULARY`] most frequent
/// terms. Returns 0.0 when either text is empty or nothing survives
/// stop-word removal.
pub fn text_similarity(text1: &str, text2: &str) -> f64 {
    if text1.is_empty() || text2.is_empty() {
        return 0.0;
    }

    let documents = [term_counts(text1), term_counts(text2)];
    let vocabulary = build_vocabulary(&documents);
    if vocabulary.is_empty() {
        warn!(
            action = "vectorize",
            component = "text_similarity",
            "Empty vocabulary after stop-word removal"
        );
        return 0.0;
    }

    let n_docs = documents.len() as f64;
    let vectors: Vec<Vec<f64>> = documents
        .iter()
        .map(|counts| {
            let raw: Vec<f64> = vocabulary
                .iter()
                .map(|term| {
                    let tf = counts.get(term.as_str()).copied().unwrap_or(0) as f64;
                    let df = documents
                        .iter()
                        .filter(|doc| doc.contains_key(term.as_str()))
                        .count() as f64;
                    let idf = ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0;
                    tf * idf
                })
                .collect();
            l2_normalize(raw)
        })
        .collect();

    let similarity: f64 = vectors[0]
        .iter()
        .zip(&vectors[1])
        .map(|(a, b)| a * b)
        .sum();

    if similarity.is_finite() {
        similarity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

fn build_vocabulary(documents: &[HashMap<String, usize>]) -> Vec<String> {
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for doc in documents {
        for (term, count) in doc {
            *totals.entry(term.as_str()).or_insert(0) += count;
        }
    }

    let mut ranked: Vec<(&str, usize)> = totals.into_iter().collect();
    // Most frequent first; BTreeMap order keeps ties alphabetical under a stable sort.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(MAX_VOCABULARY);

    let mut vocabulary: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
    vocabulary.sort();
    vocabulary
}

fn l2_normalize(vector: Vec<f64>) -> Vec<f64> {
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vector;
    }
    vector.into_iter().map(|v| v / norm).collect()
}

/// Alphabetic or Hangul words (two characters or more) shared by both texts,
/// case-folded and minus a short list of English function words.
pub fn common_keywords(text1: &str, text2: &str) -> HashSet<String> {
    let words1 = keywords(text1);
    let words2 = keywords(text2);
    words1.intersection(&words2).cloned().collect()
}

fn keywords(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    keyword_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|word| !KEYWORD_STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}
