//! Competency taxonomy and per-competency results.

use serde::{Deserialize, Serialize};

/// A named evaluation dimension.
///
/// The set is closed: strategies declare which of these they score, and
/// gating bars refer to them by variant rather than by free-form name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Competency {
    ProblemDefinition,
    TechnicalDepth,
    Communication,
    SolutionDesign,
    ScalabilityConsiderations,
    TradeoffAnalysis,
    ImplementationDetails,
    EdgeCaseHandling,
    SystemIntegration,
}

impl Competency {
    /// Every competency, in catalog order.
    pub const ALL: [Competency; 9] = [
        Competency::ProblemDefinition,
        Competency::TechnicalDepth,
        Competency::Communication,
        Competency::SolutionDesign,
        Competency::ScalabilityConsiderations,
        Competency::TradeoffAnalysis,
        Competency::ImplementationDetails,
        Competency::EdgeCaseHandling,
        Competency::SystemIntegration,
    ];

    /// Human-readable name passed to the reasoning provider.
    pub fn name(&self) -> &'static str {
        match self {
            Competency::ProblemDefinition => "Problem Definition",
            Competency::TechnicalDepth => "Technical Depth",
            Competency::Communication => "Communication",
            Competency::SolutionDesign => "Solution Design",
            Competency::ScalabilityConsiderations => "Scalability Considerations",
            Competency::TradeoffAnalysis => "Trade-off Analysis",
            Competency::ImplementationDetails => "Implementation Details",
            Competency::EdgeCaseHandling => "Edge Case Handling",
            Competency::SystemIntegration => "System Integration",
        }
    }
}

impl std::fmt::Display for Competency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Presentation tier derived from a numeric score.
///
/// The tier never feeds back into scoring; it only labels the rationale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationaleTier {
    Strong,
    Adequate,
    NeedsImprovement,
}

impl RationaleTier {
    /// Bucket a score: `>= 4.0` strong, `[3.0, 4.0)` adequate, below 3.0
    /// needs improvement.
    pub fn for_score(score: f64) -> Self {
        if score >= 4.0 {
            RationaleTier::Strong
        } else if score >= 3.0 {
            RationaleTier::Adequate
        } else {
            RationaleTier::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RationaleTier::Strong => "strong",
            RationaleTier::Adequate => "adequate",
            RationaleTier::NeedsImprovement => "needs improvement",
        }
    }
}

impl std::fmt::Display for RationaleTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lowest score a competency can carry.
pub const MIN_SCORE: f64 = 1.0;

/// Highest score a competency can carry.
pub const MAX_SCORE: f64 = 5.0;

/// The scored outcome for one competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyScore {
    pub competency: Competency,
    /// Score in `[1.0, 5.0]`.
    pub score: f64,
    pub evidence: String,
    pub rationale: String,
    pub tier: RationaleTier,
}

impl CompetencyScore {
    /// Build a score record, deriving the tier from `score`.
    ///
    /// Callers are expected to have clamped `score` into range already.
    pub fn new(
        competency: Competency,
        score: f64,
        evidence: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            competency,
            score,
            evidence: evidence.into(),
            rationale: rationale.into(),
            tier: RationaleTier::for_score(score),
        }
    }
}
