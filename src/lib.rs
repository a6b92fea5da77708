use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// One sentence as carved out of the raw input. `start`/`end` are byte
/// offsets into the original string and `raw_span_text` is exactly
/// `&text[start..end]`, trailing punctuation and surrounding whitespace
/// included.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub raw_span_text: String,
    pub normalized_text: String,
    pub word_count: usize,
    /// First two normalized words joined by a space; may be empty.
    pub opener: String,
    pub first_word: String,
}

impl Sentence {
    /// Span of the trimmed sentence text within the original document.
    fn trimmed_range(&self) -> (usize, usize) {
        let lead = self.raw_span_text.len() - self.raw_span_text.trim_start().len();
        let start = self.start + lead;
        (start, start + self.normalized_text.len())
    }
}

/// Baseline statistics reduced from an optional reference sample of the
/// author's own writing. Read-only input to scoring and suggestion
/// generation; never affects segmentation of the primary document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleProfile {
    pub avg_sentence_length: f64,
    pub sentence_length_std_dev: f64,
    pub comma_rate: f64,
    pub question_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub perplexity: i32,
    pub burstiness: i32,
    pub sentence_pattern_diversity: i32,
    pub vocabulary_predictability: i32,
    pub overall_risk: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBands {
    pub perplexity: Band,
    pub burstiness: Band,
    pub sentence_pattern_diversity: Band,
    pub vocabulary_predictability: Band,
    pub overall_risk: Band,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    VarySentenceLength,
    SwapPredictablePhrasing,
    AddStylisticTexture,
    DiversifyOpeners,
    ReduceHedging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

/// A literal, offset-addressed edit. `(start, end)` index into the exact
/// text string the suggestion was generated from; after any accepted edit
/// they are provisional until reconciled by [`apply_suggestion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: u32,
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub start: usize,
    pub end: usize,
    pub original: String,
    pub replacement: String,
    pub risk_impact: i32,
    pub status: SuggestionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    /// Unique words over total words.
    pub lexical_variety: f64,
    pub hedge_density: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub metrics: RiskMetrics,
    pub risk_bands: RiskBands,
    pub insights: Insights,
    pub suggestions: Vec<Suggestion>,
    pub style_profile: Option<StyleProfile>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("text is empty or blank")]
    EmptyInput,
    #[error("text is {len} characters, limit is {max}")]
    InputTooLong { len: usize, max: usize },
    #[error("no suggestion with id {id}")]
    UnknownSuggestion { id: u32 },
    #[error("suggestion {id} is stale: its recorded text no longer occurs in the document")]
    StaleSuggestion { id: u32 },
}

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

struct Hyperparameters {
    min_words: usize,
    min_sentences: usize,
    neutral_score: f64,
    band_low_max: f64,
    band_moderate_max: f64,
    entropy_weight: f64,
    repetition_weight: f64,
    burstiness_base: f64,
    burstiness_cv_weight: f64,
    baseline_flatness_bonus: f64,
    opener_diversity_weight: f64,
    dominant_opener_weight: f64,
    common_word_weight: f64,
    hapax_weight: f64,
    hedge_weight: f64,
    overall_perplexity_weight: f64,
    overall_burstiness_weight: f64,
    overall_pattern_weight: f64,
    overall_vocabulary_weight: f64,
    window_size: usize,
    window_std_dev_gate: f64,
    split_min_words: usize,
    split_risk_impact: i32,
    baseline_flatness_ratio: f64,
    baseline_split_excess: f64,
    phrase_candidate_valve: usize,
    phrase_swap_risk_impact: i32,
    texture_min_words: usize,
    texture_insert_after: usize,
    texture_comma_rate: f64,
    texture_risk_impact: i32,
    opener_repeat_min: usize,
    opener_risk_impact: i32,
    hedge_gate: f64,
    hedge_risk_impact: i32,
    max_suggestions: usize,
    max_input_chars: usize,
}

static HP: Hyperparameters = Hyperparameters {
    min_words: 20,
    min_sentences: 2,
    neutral_score: 50.0,
    band_low_max: 35.0,
    band_moderate_max: 65.0,
    entropy_weight: 85.0,
    repetition_weight: 45.0,
    burstiness_base: 92.0,
    burstiness_cv_weight: 125.0,
    baseline_flatness_bonus: 3.5,
    opener_diversity_weight: 70.0,
    dominant_opener_weight: 55.0,
    common_word_weight: 120.0,
    hapax_weight: 30.0,
    hedge_weight: 12.0,
    overall_perplexity_weight: 0.28,
    overall_burstiness_weight: 0.24,
    overall_pattern_weight: 0.22,
    overall_vocabulary_weight: 0.26,
    window_size: 3,
    window_std_dev_gate: 2.2,
    split_min_words: 20,
    split_risk_impact: 9,
    baseline_flatness_ratio: 0.75,
    baseline_split_excess: 7.0,
    phrase_candidate_valve: 40,
    phrase_swap_risk_impact: 6,
    texture_min_words: 14,
    texture_insert_after: 6,
    texture_comma_rate: 0.4,
    texture_risk_impact: 4,
    opener_repeat_min: 3,
    opener_risk_impact: 7,
    hedge_gate: 0.5,
    hedge_risk_impact: 5,
    max_suggestions: 20,
    max_input_chars: 120_000,
};

/// Static availability marker for the boundary layer's health endpoint.
pub const STATUS: &str = "ok";

// ---------------------------------------------------------------------------
// Compiled patterns
// ---------------------------------------------------------------------------

// Boundary heuristic, not linguistic sentence detection: a maximal run of
// non-terminal characters plus at most one terminal mark. Abbreviations,
// decimals, and ellipses mis-split; downstream code tolerates the resulting
// near-empty sentences.
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?\n]+[.!?]?").unwrap());

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w']+").unwrap());

static HEDGE_WORDS: &[&str] = &[
    "may",
    "might",
    "could",
    "perhaps",
    "possibly",
    "generally",
    "typically",
    "often",
    "somewhat",
    "largely",
    "arguably",
    "relatively",
];

static HEDGE_RE: Lazy<Regex> = Lazy::new(|| {
    let alt = HEDGE_WORDS.join("|");
    Regex::new(&format!(r"(?i)\b({alt})\b")).unwrap()
});

/// Templated connector -> colloquial form. Scanned case-insensitively as
/// whole words; literals go through `regex::escape` before compilation.
static PHRASE_CATALOG: &[(&str, &str)] = &[
    ("in conclusion", "to wrap up"),
    ("furthermore", "also"),
    ("moreover", "on top of that"),
    ("additionally", "plus"),
    ("it is important to note that", "note that"),
    ("it is worth noting that", "notably,"),
    ("in today's fast-paced world", "these days"),
    ("at the end of the day", "ultimately"),
    ("plays a crucial role in", "is central to"),
    ("delve into", "dig into"),
];

static PHRASE_SWAPS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    PHRASE_CATALOG
        .iter()
        .map(|(phrase, swap)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(phrase))).unwrap();
            (re, *swap)
        })
        .collect()
});

// ---------------------------------------------------------------------------
// Function words
// ---------------------------------------------------------------------------

static FUNCTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Articles
        "the", "a", "an",
        // Conjunctions
        "and", "or", "but", "nor", "so", "yet", "for",
        // Pronouns and demonstratives
        "it", "its", "they", "them", "their", "we", "us", "our", "you", "your", "he", "she",
        "his", "her", "i", "this", "that", "these", "those",
        // Modals
        "can", "could", "may", "might", "shall", "should", "will", "would", "must",
        // Auxiliaries
        "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "do", "does",
        "did",
        // Intensifiers
        "very", "quite", "rather", "really", "just", "too", "also", "only", "even",
    ]
    .into_iter()
    .collect()
});

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clamp_score(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

fn band_for(score: f64) -> Band {
    if score < HP.band_low_max {
        Band::Low
    } else if score < HP.band_moderate_max {
        Band::Moderate
    } else {
        Band::High
    }
}

/// Mean and population standard deviation; (0, 0) for an empty slice.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Normalize one raw token: lowercase, strip everything outside `[a-z']`,
/// drop if nothing survives. Contractions stay single tokens; numerals and
/// pure punctuation strip to empty and are filtered out.
fn normalize_token(raw: &str) -> Option<String> {
    let token: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || *c == '\'')
        .collect();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Word-like tokens of `text`, lowercased and stripped to `[a-z']`. The same
/// rule serves the whole document and each sentence span, so counts agree
/// across the two contexts.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .filter_map(|m| normalize_token(m.as_str()))
        .collect()
}

/// Split `text` into sentence records with exact byte spans. Whitespace-only
/// matches are dropped; runs of terminal punctuation may still yield spurious
/// short sentences, which the rest of the pipeline tolerates.
pub fn segment(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    for m in SENTENCE_RE.find_iter(text) {
        let raw = m.as_str();
        let normalized = raw.trim();
        if normalized.is_empty() {
            continue;
        }
        let words = tokenize(normalized);
        let opener = words
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let first_word = words.first().cloned().unwrap_or_default();
        sentences.push(Sentence {
            index: sentences.len(),
            start: m.start(),
            end: m.end(),
            raw_span_text: raw.to_string(),
            normalized_text: normalized.to_string(),
            word_count: words.len(),
            opener,
            first_word,
        });
    }
    sentences
}

// ---------------------------------------------------------------------------
// Style profiling
// ---------------------------------------------------------------------------

/// Reduce a reference sample to its baseline statistics, or `None` for a
/// blank sample. Rates are per measurable sentence (non-zero word count).
pub fn build_style_profile(sample: &str) -> Option<StyleProfile> {
    if sample.trim().is_empty() {
        return None;
    }
    let sentences = segment(sample);
    let lengths: Vec<f64> = sentences
        .iter()
        .filter(|s| s.word_count > 0)
        .map(|s| s.word_count as f64)
        .collect();
    let (avg, std) = mean_std(&lengths);
    let measurable = lengths.len();
    let commas = sample.matches(',').count();
    let questions = sample.matches('?').count();
    let (comma_rate, question_rate) = if measurable > 0 {
        (
            commas as f64 / measurable as f64,
            questions as f64 / measurable as f64,
        )
    } else {
        (0.0, 0.0)
    };
    Some(StyleProfile {
        avg_sentence_length: avg,
        sentence_length_std_dev: std,
        comma_rate,
        question_rate,
    })
}

// ---------------------------------------------------------------------------
// Risk scoring
// ---------------------------------------------------------------------------

/// Hedge-word matches per sentence, floored at one sentence.
pub fn hedge_density(words: &[String], sentence_count: usize) -> f64 {
    let hits = words
        .iter()
        .filter(|w| HEDGE_WORDS.contains(&w.as_str()))
        .count();
    hits as f64 / sentence_count.max(1) as f64
}

fn neutral_metrics() -> (RiskMetrics, RiskBands) {
    let n = HP.neutral_score as i32;
    (
        RiskMetrics {
            perplexity: n,
            burstiness: n,
            sentence_pattern_diversity: n,
            vocabulary_predictability: n,
            overall_risk: n,
        },
        RiskBands {
            perplexity: Band::Moderate,
            burstiness: Band::Moderate,
            sentence_pattern_diversity: Band::Moderate,
            vocabulary_predictability: Band::Moderate,
            overall_risk: Band::Moderate,
        },
    )
}

fn perplexity_risk(words: &[String]) -> f64 {
    let total = words.len() as f64;
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for w in words {
        *freq.entry(w.as_str()).or_insert(0) += 1;
    }
    let entropy: f64 = freq
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    let unique = freq.len();
    let entropy_ratio = if unique > 1 {
        entropy / (unique as f64).log2()
    } else {
        entropy
    };
    let max_count = freq.values().copied().max().unwrap_or(0);
    let repetition_ratio = max_count as f64 / total;
    clamp_score((1.0 - entropy_ratio) * HP.entropy_weight + repetition_ratio * HP.repetition_weight)
}

fn burstiness_risk(sentences: &[Sentence], style: Option<&StyleProfile>) -> f64 {
    let lengths: Vec<f64> = sentences.iter().map(|s| s.word_count as f64).collect();
    let (mean, std) = mean_std(&lengths);
    let cv = if mean > 0.0 { std / mean } else { 0.0 };
    let mut score = HP.burstiness_base - cv * HP.burstiness_cv_weight;
    // A document flatter than the author's known rhythm is more suspicious.
    if let Some(p) = style {
        if p.sentence_length_std_dev > 0.0 && p.sentence_length_std_dev > std {
            score += HP.baseline_flatness_bonus * (p.sentence_length_std_dev - std);
        }
    }
    clamp_score(score)
}

fn pattern_diversity_risk(sentences: &[Sentence]) -> f64 {
    let mut groups: HashMap<&str, usize> = HashMap::new();
    for s in sentences {
        let key = if s.opener.is_empty() {
            s.first_word.as_str()
        } else {
            s.opener.as_str()
        };
        *groups.entry(key).or_insert(0) += 1;
    }
    let n = sentences.len() as f64;
    let dominant = groups.values().copied().max().unwrap_or(0) as f64 / n;
    let diversity = groups.len() as f64 / n;
    clamp_score(
        (1.0 - diversity) * HP.opener_diversity_weight + dominant * HP.dominant_opener_weight,
    )
}

fn vocabulary_risk(words: &[String], hedge_density: f64) -> f64 {
    let total = words.len() as f64;
    let common = words
        .iter()
        .filter(|w| FUNCTION_WORDS.contains(w.as_str()))
        .count() as f64;
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for w in words {
        *freq.entry(w.as_str()).or_insert(0) += 1;
    }
    let hapax = freq.values().filter(|&&c| c == 1).count() as f64;
    let hapax_ratio = hapax / freq.len() as f64;
    let base = clamp_score(
        (common / total) * HP.common_word_weight + (1.0 - hapax_ratio) * HP.hapax_weight,
    );
    clamp_score(base + hedge_density * HP.hedge_weight)
}

/// Compute the four sub-scores and the weighted overall score. Documents
/// below the minimum-input floor get a flat neutral 50 across the board;
/// frequency statistics over tiny samples would mislead.
pub fn score_document(
    sentences: &[Sentence],
    words: &[String],
    style: Option<&StyleProfile>,
) -> (RiskMetrics, RiskBands) {
    if words.len() < HP.min_words || sentences.len() < HP.min_sentences {
        return neutral_metrics();
    }

    let perplexity = perplexity_risk(words);
    let burstiness = burstiness_risk(sentences, style);
    let pattern = pattern_diversity_risk(sentences);
    let vocabulary = vocabulary_risk(words, hedge_density(words, sentences.len()));
    let overall = clamp_score(
        perplexity * HP.overall_perplexity_weight
            + burstiness * HP.overall_burstiness_weight
            + pattern * HP.overall_pattern_weight
            + vocabulary * HP.overall_vocabulary_weight,
    );

    // Bands come from the pre-rounding scores.
    let bands = RiskBands {
        perplexity: band_for(perplexity),
        burstiness: band_for(burstiness),
        sentence_pattern_diversity: band_for(pattern),
        vocabulary_predictability: band_for(vocabulary),
        overall_risk: band_for(overall),
    };
    let metrics = RiskMetrics {
        perplexity: perplexity.round() as i32,
        burstiness: burstiness.round() as i32,
        sentence_pattern_diversity: pattern.round() as i32,
        vocabulary_predictability: vocabulary.round() as i32,
        overall_risk: overall.round() as i32,
    };
    (metrics, bands)
}

// ---------------------------------------------------------------------------
// Suggestion detectors
// ---------------------------------------------------------------------------

struct Candidate {
    kind: SuggestionKind,
    title: &'static str,
    description: String,
    start: usize,
    end: usize,
    original: String,
    replacement: String,
    risk_impact: i32,
}

/// Split a sentence at its first comma into two sentences, capitalizing the
/// second half. Returns the trimmed span and the rewritten text.
fn split_at_first_comma(sentence: &Sentence) -> Option<(usize, usize, String, String)> {
    let norm = &sentence.normalized_text;
    let idx = norm.find(',')?;
    let head = norm[..idx].trim_end();
    let tail = norm[idx + 1..].trim_start();
    if head.is_empty() || tail.is_empty() {
        return None;
    }
    let replacement = format!("{}. {}", head, capitalize_first(tail));
    let (start, end) = sentence.trimmed_range();
    Some((start, end, norm.clone(), replacement))
}

fn detect_uniform_runs(sentences: &[Sentence], candidates: &mut Vec<Candidate>) {
    if sentences.len() < HP.window_size {
        return;
    }
    for window in sentences.windows(HP.window_size) {
        let lengths: Vec<f64> = window.iter().map(|s| s.word_count as f64).collect();
        let (_, std) = mean_std(&lengths);
        let middle = &window[1];
        if std <= HP.window_std_dev_gate
            && middle.word_count > HP.split_min_words
            && middle.normalized_text.contains(',')
        {
            if let Some((start, end, original, replacement)) = split_at_first_comma(middle) {
                candidates.push(Candidate {
                    kind: SuggestionKind::VarySentenceLength,
                    title: "Vary sentence length",
                    description: format!(
                        "Three sentences in a row land near {} words each; splitting this one breaks the even cadence.",
                        middle.word_count
                    ),
                    start,
                    end,
                    original,
                    replacement,
                    risk_impact: HP.split_risk_impact,
                });
            }
        }
    }
}

fn detect_baseline_flatness(
    sentences: &[Sentence],
    mean: f64,
    std_dev: f64,
    style: Option<&StyleProfile>,
    candidates: &mut Vec<Candidate>,
) {
    let Some(profile) = style else { return };
    if profile.sentence_length_std_dev <= 0.0
        || std_dev >= HP.baseline_flatness_ratio * profile.sentence_length_std_dev
    {
        return;
    }
    let target = sentences.iter().find(|s| {
        (s.word_count as f64) > mean + HP.baseline_split_excess && s.normalized_text.contains(',')
    });
    if let Some(sentence) = target {
        if let Some((start, end, original, replacement)) = split_at_first_comma(sentence) {
            candidates.push(Candidate {
                kind: SuggestionKind::VarySentenceLength,
                title: "Vary sentence length",
                description: "Sentence lengths here are flatter than your reference sample; \
                              splitting this long sentence restores your usual rhythm."
                    .to_string(),
                start,
                end,
                original,
                replacement,
                risk_impact: HP.split_risk_impact,
            });
        }
    }
}

fn detect_templated_phrases(text: &str, candidates: &mut Vec<Candidate>) {
    'catalog: for (re, swap) in PHRASE_SWAPS.iter() {
        for m in re.find_iter(text) {
            // Safety valve on the running candidate count, distinct from the
            // final output cap.
            if candidates.len() >= HP.phrase_candidate_valve {
                break 'catalog;
            }
            let original = m.as_str();
            let capitalized = original.chars().next().is_some_and(|c| c.is_uppercase());
            let replacement = if capitalized {
                capitalize_first(swap)
            } else {
                (*swap).to_string()
            };
            candidates.push(Candidate {
                kind: SuggestionKind::SwapPredictablePhrasing,
                title: "Swap predictable phrasing",
                description: format!(
                    "\"{original}\" is a stock connector; \"{replacement}\" reads less templated."
                ),
                start: m.start(),
                end: m.end(),
                original: original.to_string(),
                replacement,
                risk_impact: HP.phrase_swap_risk_impact,
            });
        }
    }
}

fn detect_missing_texture(
    text: &str,
    sentences: &[Sentence],
    style: Option<&StyleProfile>,
    candidates: &mut Vec<Candidate>,
) {
    let has_texture = text.contains(|c: char| matches!(c, '(' | ')' | '?' | ';' | ':'));
    let baseline_commas = style.is_some_and(|p| p.comma_rate > HP.texture_comma_rate);
    if has_texture && !baseline_commas {
        return;
    }
    let target = sentences
        .iter()
        .find(|s| s.word_count >= HP.texture_min_words && !s.normalized_text.contains('('));
    if let Some(sentence) = target {
        let mut parts: Vec<&str> = sentence.normalized_text.split_whitespace().collect();
        let at = parts.len().min(HP.texture_insert_after);
        parts.insert(at, "(for context),");
        let (start, end) = sentence.trimmed_range();
        candidates.push(Candidate {
            kind: SuggestionKind::AddStylisticTexture,
            title: "Add stylistic texture",
            description: "The document has no parentheses, questions, semicolons, or colons; \
                          a small aside breaks the uniform surface."
                .to_string(),
            start,
            end,
            original: sentence.normalized_text.clone(),
            replacement: parts.join(" "),
            risk_impact: HP.texture_risk_impact,
        });
    }
}

fn opener_lead(first_word: &str) -> &'static str {
    match first_word {
        "this" => "In this case, ",
        "the" => "From another angle, ",
        "it" => "At a practical level, ",
        _ => "As written here, ",
    }
}

fn detect_repeated_openers(sentences: &[Sentence], candidates: &mut Vec<Candidate>) {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Sentence>> = HashMap::new();
    for s in sentences {
        if s.first_word.is_empty() {
            continue;
        }
        let entry = groups.entry(s.first_word.as_str()).or_default();
        if entry.is_empty() {
            order.push(s.first_word.as_str());
        }
        entry.push(s);
    }
    for first_word in order {
        let group = &groups[first_word];
        if group.len() < HP.opener_repeat_min {
            continue;
        }
        // Rewrite the 2nd and 3rd occurrence, leaving the first alone.
        for sentence in &group[1..3] {
            let lead = opener_lead(first_word);
            let replacement = format!("{lead}{}", lowercase_first(&sentence.normalized_text));
            let (start, end) = sentence.trimmed_range();
            candidates.push(Candidate {
                kind: SuggestionKind::DiversifyOpeners,
                title: "Diversify sentence openers",
                description: format!(
                    "\"{first_word}\" opens {} sentences; rewording this one varies the pattern.",
                    group.len()
                ),
                start,
                end,
                original: sentence.normalized_text.clone(),
                replacement,
                risk_impact: HP.opener_risk_impact,
            });
        }
    }
}

fn detect_hedge_runs(sentences: &[Sentence], hedge_density: f64, candidates: &mut Vec<Candidate>) {
    if hedge_density < HP.hedge_gate {
        return;
    }
    for sentence in sentences {
        let Some(m) = HEDGE_RE.find(&sentence.normalized_text) else {
            continue;
        };
        // Remove only the first hedge match and collapse the double space it
        // leaves behind.
        let mut cleaned = String::with_capacity(sentence.normalized_text.len());
        cleaned.push_str(&sentence.normalized_text[..m.start()]);
        cleaned.push_str(&sentence.normalized_text[m.end()..]);
        let cleaned = cleaned.replace("  ", " ").trim().to_string();
        if cleaned.is_empty() || cleaned == sentence.normalized_text {
            continue;
        }
        let (start, end) = sentence.trimmed_range();
        candidates.push(Candidate {
            kind: SuggestionKind::ReduceHedging,
            title: "Reduce hedging",
            description: format!(
                "Dropping \"{}\" thins out a uniform run of hedges.",
                m.as_str()
            ),
            start,
            end,
            original: sentence.normalized_text.clone(),
            replacement: cleaned,
            risk_impact: HP.hedge_risk_impact,
        });
    }
}

/// Run the five detectors over `text` in a fixed order and return at most 20
/// suggestions. Candidates keep generation order (not position order), invalid
/// spans are dropped, duplicates by `(start, end, replacement)` collapse to
/// the first occurrence, and ids come from a per-call counter.
pub fn generate_suggestions(
    text: &str,
    sentences: &[Sentence],
    sentence_length_mean: f64,
    sentence_length_std_dev: f64,
    hedge_density: f64,
    style: Option<&StyleProfile>,
) -> Vec<Suggestion> {
    let mut candidates: Vec<Candidate> = Vec::new();
    detect_uniform_runs(sentences, &mut candidates);
    detect_baseline_flatness(
        sentences,
        sentence_length_mean,
        sentence_length_std_dev,
        style,
        &mut candidates,
    );
    detect_templated_phrases(text, &mut candidates);
    detect_missing_texture(text, sentences, style, &mut candidates);
    detect_repeated_openers(sentences, &mut candidates);
    detect_hedge_runs(sentences, hedge_density, &mut candidates);

    let mut seen: HashSet<(usize, usize, String)> = HashSet::new();
    let mut suggestions = Vec::new();
    for c in candidates {
        if c.end <= c.start {
            continue;
        }
        if !seen.insert((c.start, c.end, c.replacement.clone())) {
            continue;
        }
        suggestions.push(Suggestion {
            id: suggestions.len() as u32 + 1,
            kind: c.kind,
            title: c.title.to_string(),
            description: c.description,
            start: c.start,
            end: c.end,
            original: c.original,
            replacement: c.replacement,
            risk_impact: c.risk_impact,
            status: SuggestionStatus::Pending,
        });
        if suggestions.len() == HP.max_suggestions {
            break;
        }
    }
    suggestions
}

// ---------------------------------------------------------------------------
// Offset reconciliation
// ---------------------------------------------------------------------------

/// Locate a suggestion's recorded text in the current document: exact span
/// first, then the first literal occurrence, then the first occurrence of the
/// trimmed text. Returns the located `(start, length)`.
fn locate_span(document: &str, suggestion: &Suggestion) -> Option<(usize, usize)> {
    if suggestion.start < suggestion.end
        && document.get(suggestion.start..suggestion.end) == Some(suggestion.original.as_str())
    {
        return Some((suggestion.start, suggestion.end - suggestion.start));
    }
    if let Some(at) = document.find(&suggestion.original) {
        return Some((at, suggestion.original.len()));
    }
    let trimmed = suggestion.original.trim();
    if !trimmed.is_empty() && trimmed.len() < suggestion.original.len() {
        if let Some(at) = document.find(trimmed) {
            return Some((at, trimmed.len()));
        }
    }
    None
}

/// Apply one accepted suggestion against the current document and re-derive
/// coordinates for the rest. Called once per accept, never batched; the
/// returned list is a fresh arena of value records.
///
/// Suggestions whose span overlaps the edited region without starting at or
/// after its end keep stale coordinates and must be treated as invalid until
/// the next full analysis.
pub fn apply_suggestion(
    document: &str,
    suggestions: &[Suggestion],
    target_id: u32,
) -> Result<(String, Vec<Suggestion>), Error> {
    let mut reconciled: Vec<Suggestion> = suggestions.to_vec();
    let target = reconciled
        .iter()
        .find(|s| s.id == target_id)
        .cloned()
        .ok_or(Error::UnknownSuggestion { id: target_id })?;
    // Status is monotonic; an already-resolved suggestion never re-applies.
    if target.status != SuggestionStatus::Pending {
        return Err(Error::StaleSuggestion { id: target_id });
    }
    let (located_start, located_len) =
        locate_span(document, &target).ok_or(Error::StaleSuggestion { id: target_id })?;
    let located_end = located_start + located_len;

    let mut new_document = String::with_capacity(document.len() + target.replacement.len());
    new_document.push_str(&document[..located_start]);
    new_document.push_str(&target.replacement);
    new_document.push_str(&document[located_end..]);

    let delta = target.replacement.len() as isize - located_len as isize;
    for s in reconciled.iter_mut() {
        if s.id == target_id {
            s.status = SuggestionStatus::Accepted;
            s.start = located_start;
            s.end = located_start + target.replacement.len();
        } else if s.start >= located_end {
            s.start = (s.start as isize + delta) as usize;
            s.end = (s.end as isize + delta) as usize;
        }
    }
    Ok((new_document, reconciled))
}

/// Scoring-only refresh after a reconciled edit. Suggestions are not
/// regenerated; the caller keeps its reconciled list.
pub fn rescore(text: &str, style: Option<&StyleProfile>) -> (RiskMetrics, RiskBands) {
    let sentences = segment(text);
    let words = tokenize(text);
    score_document(&sentences, &words, style)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Full analysis of `text`, optionally biased by a reference sample of the
/// author's own writing. Rejects blank input and input over the character
/// ceiling; everything else runs to completion.
pub fn analyze(text: &str, style_sample: Option<&str>) -> Result<AnalysisResult, Error> {
    if text.trim().is_empty() {
        return Err(Error::EmptyInput);
    }
    let len = text.chars().count();
    if len > HP.max_input_chars {
        return Err(Error::InputTooLong {
            len,
            max: HP.max_input_chars,
        });
    }

    let sentences = segment(text);
    let words = tokenize(text);
    let style = style_sample.and_then(build_style_profile);
    let (metrics, risk_bands) = score_document(&sentences, &words, style.as_ref());

    let lengths: Vec<f64> = sentences.iter().map(|s| s.word_count as f64).collect();
    let (mean, std_dev) = mean_std(&lengths);
    let density = hedge_density(&words, sentences.len());
    let unique: HashSet<&str> = words.iter().map(String::as_str).collect();
    let lexical_variety = if words.is_empty() {
        0.0
    } else {
        unique.len() as f64 / words.len() as f64
    };

    let insufficient = words.len() < HP.min_words || sentences.len() < HP.min_sentences;
    let suggestions = if insufficient {
        Vec::new()
    } else {
        generate_suggestions(text, &sentences, mean, std_dev, density, style.as_ref())
    };
    let note = insufficient.then(|| {
        format!(
            "Too little text to score reliably; supply at least {} sentences and {} words.",
            HP.min_sentences, HP.min_words
        )
    });

    Ok(AnalysisResult {
        metrics,
        risk_bands,
        insights: Insights {
            word_count: words.len(),
            sentence_count: sentences.len(),
            avg_sentence_length: round2(mean),
            lexical_variety: round2(lexical_variety),
            hedge_density: round2(density),
            note,
        },
        suggestions,
        style_profile: style,
    })
}
