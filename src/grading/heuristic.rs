use super::rubric::{
    self, BENEFICIARY_MARKERS, CONTRAST, FILLER, GENERIC_CLAIMS, IDEAL_MAX_CHARS, IDEAL_WORDS,
    JARGON, OUTCOME_VERBS, STOPWORDS,
};
use super::types::{Dimensions, GradingInput, GradingResult};

/// Deterministic rubric grader.
///
/// Pure and total: any validated input yields a result, and the same input
/// always yields the same result.
pub fn score(input: &GradingInput) -> GradingResult {
    let headline = Text::new(&input.headline);
    let pitch = Text::new(&format!("{} {}", input.headline, input.one_liner));

    let dimensions = Dimensions {
        clarity: clarity(&input.headline, &headline),
        specificity: specificity(&headline),
        differentiation: differentiation(&headline, &pitch),
        brevity: brevity(&input.headline),
        value_clarity: value_clarity(&pitch, input),
    };

    let differentiator = rubric::diagnostic(dimensions.weakest()).to_string();
    GradingResult::from_dimensions(&input.startup_name, dimensions, differentiator)
}

/// Lowercased word tokens. Hyphens and punctuation split words; `%` and `$`
/// stay attached so "80%" reads as one numeric token.
struct Text {
    tokens: Vec<String>,
}

impl Text {
    fn new(raw: &str) -> Self {
        let normalized: String = raw
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || matches!(c, '%' | '$' | '\'') { c } else { ' ' })
            .collect();
        Self {
            tokens: normalized.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Occurrences of each phrase, matched on whole tokens.
    fn count(&self, phrases: &[&str]) -> usize {
        phrases.iter().map(|p| self.count_phrase(p)).sum()
    }

    fn count_phrase(&self, phrase: &str) -> usize {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.is_empty() || words.len() > self.tokens.len() {
            return 0;
        }
        self.tokens
            .windows(words.len())
            .filter(|window| window.iter().zip(&words).all(|(t, w)| t == w))
            .count()
    }

    fn has_number(&self) -> bool {
        self.tokens.iter().any(|t| t.chars().any(|c| c.is_ascii_digit()))
    }

    /// Longer words outside every generic list, a rough stand-in for concrete nouns.
    fn concrete_words(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| t.chars().count() >= 6 && t.chars().all(char::is_alphabetic))
            .filter(|t| !is_listed(t))
            .count()
    }

    /// Best beneficiary credit: a named audience beats a vague one.
    fn beneficiary_credit(&self) -> i32 {
        let mut best = 0;
        for (i, token) in self.tokens.iter().enumerate() {
            let credit = match token.as_str() {
                "for" => match self.tokens.get(i + 1) {
                    Some(next) if FILLER.contains(&next.as_str()) => 10,
                    Some(next) if STOPWORDS.contains(&next.as_str()) => match self.tokens.get(i + 2) {
                        Some(after) if !FILLER.contains(&after.as_str()) => 25,
                        Some(_) => 10,
                        None => 0,
                    },
                    Some(_) => 25,
                    None => 0,
                },
                _ => 0,
            };
            best = best.max(credit);
        }
        let other_markers: Vec<&str> = BENEFICIARY_MARKERS.iter().copied().filter(|m| *m != "for").collect();
        if self.count(&other_markers) > 0 {
            best = best.max(25);
        }
        best
    }
}

fn is_listed(token: &str) -> bool {
    [JARGON, GENERIC_CLAIMS, FILLER, CONTRAST, STOPWORDS]
        .iter()
        .flat_map(|list| list.iter())
        .any(|phrase| phrase.split_whitespace().any(|w| w == token))
}

fn clamp(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

/// Jargon, shouting, heavy punctuation and long sentences in the headline.
fn clarity(raw: &str, headline: &Text) -> u8 {
    let mut score = 100;
    score -= headline.count(JARGON) as i32 * 15;

    let heavy_punct = raw.chars().filter(|c| matches!(c, '!' | '?' | ';')).count() as i32;
    score -= heavy_punct * 8;

    let shouting = raw
        .split_whitespace()
        .filter(|w| {
            let letters: Vec<char> = w.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= 4 && letters.iter().all(|c| c.is_uppercase())
        })
        .count() as i32;
    score -= shouting * 10;

    let longest_sentence = raw
        .split(['.', '!', '?'])
        .map(|s| s.split_whitespace().count())
        .max()
        .unwrap_or(0) as i32;
    score -= (longest_sentence - 14).max(0) * 3;

    let commas = raw.matches(',').count() as i32;
    score -= (commas - 2).max(0) * 5;

    clamp(score)
}

/// Numbers, outcome verbs and concrete words versus buzzwords and filler.
fn specificity(headline: &Text) -> u8 {
    let mut score = 40;
    if headline.has_number() {
        score += 25;
    }
    score += (headline.count(OUTCOME_VERBS) as i32 * 10).min(20);
    score += (headline.concrete_words() as i32 * 5).min(20);
    score -= headline.count(GENERIC_CLAIMS) as i32 * 12;
    score -= headline.count(FILLER) as i32 * 10;
    clamp(score)
}

/// Contrast language earns credit; generic claims cost more when nothing
/// (a contrast or a number) qualifies them.
fn differentiation(headline: &Text, pitch: &Text) -> u8 {
    let mut score = 50;
    let contrasts = pitch.count(CONTRAST) as i32;
    score += (contrasts * 20).min(40);
    if headline.has_number() {
        score += 10;
    }

    let qualified = contrasts > 0 || pitch.has_number();
    let per_claim = if qualified { 5 } else { 15 };
    score -= pitch.count(GENERIC_CLAIMS) as i32 * per_claim;
    clamp(score)
}

/// Length only: word count against the ideal band, then a character cap.
fn brevity(raw: &str) -> u8 {
    let words = raw.split_whitespace().count();
    let (min, max) = IDEAL_WORDS;
    let mut score: i32 = if words < min {
        100 - (min - words) as i32 * 12
    } else if words > max {
        100 - (words - max) as i32 * 8
    } else {
        100
    };

    let chars = raw.chars().count();
    if chars > IDEAL_MAX_CHARS {
        score -= ((chars - IDEAL_MAX_CHARS) / 2) as i32;
    }
    clamp(score)
}

/// Who gets what: a beneficiary, a named audience, an outcome. Missing
/// supporting fields cap the score instead of failing.
fn value_clarity(pitch: &Text, input: &GradingInput) -> u8 {
    let mut score = 20;
    score += pitch.beneficiary_credit();
    if !input.target_audience.is_empty() {
        score += 20;
    }
    if pitch.count(OUTCOME_VERBS) > 0 {
        score += 25;
    }
    if pitch.has_number() {
        score += 10;
    }

    let cap = match (input.one_liner.is_empty(), input.target_audience.is_empty()) {
        (true, true) => 60,
        (true, false) | (false, true) => 80,
        (false, false) => 100,
    };
    clamp(score.min(cap))
}
