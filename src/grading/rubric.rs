//! Pinned rubric tables.
//!
//! Every number and word list here feeds the heuristic score directly.
//! Changing any of them changes scores for existing inputs, so treat edits
//! as a versioned rubric change.

use super::types::Dimension;

/// Weight of each dimension in percent. Sums to 100.
pub fn weight(dimension: Dimension) -> u32 {
    match dimension {
        Dimension::Clarity => 25,
        Dimension::Specificity => 20,
        Dimension::Differentiation => 25,
        Dimension::Brevity => 10,
        Dimension::ValueClarity => 20,
    }
}

/// Letter bands, highest first. The last band catches everything down to 0.
const GRADE_BANDS: &[(u8, &str)] = &[
    (93, "A"),
    (90, "A-"),
    (87, "B+"),
    (83, "B"),
    (80, "B-"),
    (77, "C+"),
    (73, "C"),
    (70, "C-"),
    (60, "D"),
    (0, "F"),
];

const TIER_BANDS: &[(u8, &str)] = &[
    (85, "Strong"),
    (70, "Solid"),
    (50, "Needs Work"),
    (0, "Unclear"),
];

pub fn grade_for(score: u8) -> &'static str {
    band(GRADE_BANDS, score)
}

pub fn tier_for(score: u8) -> &'static str {
    band(TIER_BANDS, score)
}

fn band(bands: &'static [(u8, &'static str)], score: u8) -> &'static str {
    bands
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, label)| *label)
        // Tables end at floor 0; anything below falls into the lowest band.
        .unwrap_or_else(|| bands.last().map_or("", |(_, label)| *label))
}

/// Improvement pointer for the weakest dimension.
pub fn diagnostic(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Clarity => {
            "Clarity is the weak spot: drop the jargon and say it the way a customer would."
        }
        Dimension::Specificity => {
            "Specificity is the weak spot: trade generic claims for a number, a named customer, or a concrete outcome."
        }
        Dimension::Differentiation => {
            "Differentiation is the weak spot: say what you replace or do differently from the default option."
        }
        Dimension::Brevity => "Brevity is the weak spot: aim for a headline of 6 to 12 words.",
        Dimension::ValueClarity => {
            "Value clarity is the weak spot: name who it is for and what they get."
        }
    }
}

/// Words that cost clarity.
pub const JARGON: &[&str] = &[
    "synergy",
    "synergies",
    "leverage",
    "leveraging",
    "paradigm",
    "holistic",
    "seamless",
    "seamlessly",
    "robust",
    "scalable",
    "empower",
    "empowers",
    "empowering",
    "transformative",
    "ecosystem",
    "frictionless",
    "best in class",
    "world class",
    "cutting edge",
    "game changing",
    "mission critical",
    "end to end",
    "value add",
];

/// Claims every competitor can make.
pub const GENERIC_CLAIMS: &[&str] = &[
    "ai powered",
    "powered by ai",
    "next generation",
    "next gen",
    "revolutionary",
    "innovative",
    "disruptive",
    "platform",
    "all in one",
    "the future of",
    "smart",
    "cutting edge",
    "world class",
    "best in class",
    "game changing",
    "blockchain",
    "web3",
    "solution",
    "solutions",
];

/// Vague audiences and outcomes.
pub const FILLER: &[&str] = &[
    "businesses",
    "companies",
    "organizations",
    "everyone",
    "anyone",
    "people",
    "users",
    "customers",
    "things",
    "stuff",
    "better",
    "easier",
    "faster",
    "more efficient",
    "streamline",
    "optimize",
    "productivity",
    "workflows",
];

/// Explicit contrast or category displacement.
pub const CONTRAST: &[&str] = &[
    "unlike",
    "instead of",
    "rather than",
    "without",
    "replace",
    "replaces",
    "replacing",
    "alternative to",
    "vs",
    "versus",
    "not just",
    "no more",
    "only",
];

/// Verbs that name a concrete result.
pub const OUTCOME_VERBS: &[&str] = &[
    "cut", "cuts", "reduce", "reduces", "save", "saves", "increase", "increases", "grow", "grows",
    "boost", "boosts", "double", "doubles", "triple", "eliminate", "eliminates", "automate",
    "automates", "ship", "ships", "launch", "win", "close", "hire", "book", "track", "prevent",
    "stop", "get", "turn", "turns", "find", "catch",
];

/// Phrases that introduce who benefits.
pub const BENEFICIARY_MARKERS: &[&str] = &["for", "helps", "lets", "enables", "so you", "so your"];

pub const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "with", "your", "you", "our",
    "we", "that", "this", "it", "is", "are", "be", "by", "at", "from", "into", "their", "them",
    "through", "without", "within", "across", "anything", "everything", "something",
];

/// Headline word-count sweet spot (inclusive).
pub const IDEAL_WORDS: (usize, usize) = (6, 12);
/// Headlines longer than this many characters lose brevity credit.
pub const IDEAL_MAX_CHARS: usize = 90;
