use serde::Serialize;

use super::rubric;

/// Validated, trimmed grading request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingInput {
    pub startup_name: String,
    pub headline: String,
    pub one_liner: String,
    pub target_audience: String,
}

/// Rubric dimensions, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Clarity,
    Specificity,
    Differentiation,
    Brevity,
    ValueClarity,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Clarity,
        Dimension::Specificity,
        Dimension::Differentiation,
        Dimension::Brevity,
        Dimension::ValueClarity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Clarity => "clarity",
            Dimension::Specificity => "specificity",
            Dimension::Differentiation => "differentiation",
            Dimension::Brevity => "brevity",
            Dimension::ValueClarity => "valueClarity",
        }
    }
}

/// Sub-scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub clarity: u8,
    pub specificity: u8,
    pub differentiation: u8,
    pub brevity: u8,
    pub value_clarity: u8,
}

impl Dimensions {
    pub fn get(&self, dimension: Dimension) -> u8 {
        match dimension {
            Dimension::Clarity => self.clarity,
            Dimension::Specificity => self.specificity,
            Dimension::Differentiation => self.differentiation,
            Dimension::Brevity => self.brevity,
            Dimension::ValueClarity => self.value_clarity,
        }
    }

    /// Weighted aggregate, rounded half up.
    pub fn aggregate(&self) -> u8 {
        let weighted: u32 = Dimension::ALL
            .iter()
            .map(|d| self.get(*d) as u32 * rubric::weight(*d))
            .sum();
        ((weighted + 50) / 100).min(100) as u8
    }

    /// Lowest sub-score; ties go to the earlier dimension in `Dimension::ALL`.
    pub fn weakest(&self) -> Dimension {
        let mut weakest = Dimension::Clarity;
        for d in Dimension::ALL {
            if self.get(d) < self.get(weakest) {
                weakest = d;
            }
        }
        weakest
    }
}

/// Longest differentiator a result may carry; share tokens enforce the same bound.
pub const MAX_DIFFERENTIATOR_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub score: u8,
    pub grade: String,
    pub tier: String,
    pub dimensions: Dimensions,
    pub differentiator: String,
    pub name: String,
}

impl GradingResult {
    /// Assemble a result whose score, grade and tier all derive from `dimensions`.
    pub fn from_dimensions(name: &str, dimensions: Dimensions, differentiator: String) -> Self {
        let score = dimensions.aggregate();
        Self {
            score,
            grade: rubric::grade_for(score).to_string(),
            tier: rubric::tier_for(score).to_string(),
            dimensions,
            differentiator,
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(c: u8, s: u8, d: u8, b: u8, v: u8) -> Dimensions {
        Dimensions { clarity: c, specificity: s, differentiation: d, brevity: b, value_clarity: v }
    }

    #[test]
    fn test_aggregate_bounds() {
        assert_eq!(dims(0, 0, 0, 0, 0).aggregate(), 0);
        assert_eq!(dims(100, 100, 100, 100, 100).aggregate(), 100);
    }

    #[test]
    fn test_aggregate_rounds_half_up() {
        // 100*25 + 6*20 + 20*25 + 76*10 + 30*20 = 4480 -> 44.8 -> 45
        assert_eq!(dims(100, 6, 20, 76, 30).aggregate(), 45);
        // 2*25 = 50 -> 0.5 -> 1
        assert_eq!(dims(2, 0, 0, 0, 0).aggregate(), 1);
    }

    #[test]
    fn test_weakest_breaks_ties_in_order() {
        assert_eq!(dims(50, 40, 40, 90, 90).weakest(), Dimension::Specificity);
        assert_eq!(dims(10, 10, 10, 10, 10).weakest(), Dimension::Clarity);
        assert_eq!(dims(90, 90, 90, 90, 1).weakest(), Dimension::ValueClarity);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = GradingResult::from_dimensions("Acme", dims(80, 80, 80, 80, 80), "ok".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["score"], 80);
        assert_eq!(json["dimensions"]["valueClarity"], 80);
        assert_eq!(json["name"], "Acme");
    }
}
