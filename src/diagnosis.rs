//! Diagnosis data consumed by the report: the personality result, the eight
//! dimension accumulators and the optional AI advice.
//!
//! Field names deserialise from the web app's camelCase JSON.

use serde::{Deserialize, Serialize};

/// Balance reported for a pair with no signal on either side.
pub const NEUTRAL_BALANCE: u8 = 50;

/// Percentage weight of `a` against `b`, rounded to the nearest integer.
///
/// Ties round to even, and the larger side is derived from the smaller one,
/// so `balance(a, b) + balance(b, a) == 100` always holds. Negative inputs
/// count as zero; `balance(0, 0)` is [`NEUTRAL_BALANCE`].
pub fn balance(a: f64, b: f64) -> u8 {
    let a = a.max(0.0);
    let b = b.max(0.0);
    let total = a + b;
    if total <= 0.0 || !total.is_finite() {
        return NEUTRAL_BALANCE;
    }
    if a > b {
        return 100 - balance(b, a);
    }
    (100.0 * a / total).round_ties_even().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    #[serde(rename = "type")]
    pub type_code: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub work_style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_image: Option<String>,
}

/// The four opposing dimension pairs, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionPair {
    ExtraversionIntroversion,
    SensingIntuition,
    ThinkingFeeling,
    JudgingPerceiving,
}

impl DimensionPair {
    pub const ALL: [DimensionPair; 4] = [
        DimensionPair::ExtraversionIntroversion,
        DimensionPair::SensingIntuition,
        DimensionPair::ThinkingFeeling,
        DimensionPair::JudgingPerceiving,
    ];

    /// Labels for the left and right poles.
    pub fn labels(self) -> (&'static str, &'static str) {
        match self {
            DimensionPair::ExtraversionIntroversion => ("E(Extrovert)", "I(Introvert)"),
            DimensionPair::SensingIntuition => ("S(Sensing)", "N(Intuition)"),
            DimensionPair::ThinkingFeeling => ("T(Thinking)", "F(Feeling)"),
            DimensionPair::JudgingPerceiving => ("J(Judging)", "P(Perceiving)"),
        }
    }
}

/// Raw accumulators for the eight poles. Only the ratio within a pair means
/// anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    #[serde(rename = "E", default)]
    pub extraversion: f64,
    #[serde(rename = "I", default)]
    pub introversion: f64,
    #[serde(rename = "S", default)]
    pub sensing: f64,
    #[serde(rename = "N", default)]
    pub intuition: f64,
    #[serde(rename = "T", default)]
    pub thinking: f64,
    #[serde(rename = "F", default)]
    pub feeling: f64,
    #[serde(rename = "J", default)]
    pub judging: f64,
    #[serde(rename = "P", default)]
    pub perceiving: f64,
}

impl DimensionScores {
    pub fn pair(&self, pair: DimensionPair) -> (f64, f64) {
        match pair {
            DimensionPair::ExtraversionIntroversion => (self.extraversion, self.introversion),
            DimensionPair::SensingIntuition => (self.sensing, self.intuition),
            DimensionPair::ThinkingFeeling => (self.thinking, self.feeling),
            DimensionPair::JudgingPerceiving => (self.judging, self.perceiving),
        }
    }

    /// Balance of the left pole of `pair`.
    pub fn balance(&self, pair: DimensionPair) -> u8 {
        let (a, b) = self.pair(pair);
        balance(a, b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecommendation {
    #[serde(rename = "siteName")]
    pub name: String,
    #[serde(rename = "reason")]
    pub rationale: String,
    pub match_score: f64,
}

impl SiteRecommendation {
    /// Match score clamped to 0..=100 and rounded for display.
    pub fn display_score(&self) -> u8 {
        if !self.match_score.is_finite() {
            return 0;
        }
        self.match_score.clamp(0.0, 100.0).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceText {
    #[serde(rename = "careerAdvice")]
    pub career: String,
    #[serde(rename = "stressManagement")]
    pub stress: String,
    #[serde(rename = "teamCompatibility")]
    pub team: String,
    #[serde(
        rename = "personalizedSiteRecommendations",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub recommendations: Vec<SiteRecommendation>,
}

impl AdviceText {
    /// Recommendations ordered by match score, highest first. Ties keep
    /// their input order.
    pub fn ranked_recommendations(&self) -> Vec<&SiteRecommendation> {
        let mut ranked: Vec<&SiteRecommendation> = self.recommendations.iter().collect();
        ranked.sort_by(|a, b| b.display_score().cmp(&a.display_score()));
        ranked
    }
}

/// Everything one report run reads. Finalised before generation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub result: DiagnosisResult,
    pub scores: DimensionScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<AdviceText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub diagnosis_date: String,
}

impl ReportData {
    pub fn type_code(&self) -> &str {
        &self.result.type_code
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
