use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::assessment::{Competency, ReasoningStrategy, MAX_SCORE, MIN_SCORE};
use crate::{Error, Result};

/// Gemini Pro pricing, USD per 1K tokens.
pub const DEFAULT_BASE_RATE: f64 = 0.00125;

/// Default bound on a single evaluation, provider calls included.
pub const DEFAULT_EVALUATION_TIMEOUT_MS: u64 = 30_000;

/// Default number of evaluation attempts per turn.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default number of consecutive failed turns before a session is abandoned.
pub const DEFAULT_ABANDON_AFTER_FAILED_TURNS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub strategies: StrategyCosts,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub gating: GatingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    /// Price per 1K tokens before the strategy multiplier.
    pub base_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_rate: DEFAULT_BASE_RATE,
        }
    }
}

/// Token and cost multipliers for one strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostProfile {
    pub token_multiplier: u32,
    pub cost_multiplier: f64,
}

/// Cost levers per strategy. These are the main cost/quality knobs of the
/// pipeline, so they live in configuration rather than in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyCosts {
    pub lean: CostProfile,
    pub chain_of_thought: CostProfile,
    pub step_back: CostProfile,
}

impl Default for StrategyCosts {
    fn default() -> Self {
        Self {
            lean: CostProfile {
                token_multiplier: 2,
                cost_multiplier: 1.0,
            },
            chain_of_thought: CostProfile {
                token_multiplier: 4,
                cost_multiplier: 1.5,
            },
            step_back: CostProfile {
                token_multiplier: 6,
                cost_multiplier: 2.0,
            },
        }
    }
}

impl StrategyCosts {
    pub fn profile(&self, strategy: ReasoningStrategy) -> CostProfile {
        match strategy {
            ReasoningStrategy::Lean => self.lean,
            ReasoningStrategy::ChainOfThought => self.chain_of_thought,
            ReasoningStrategy::StepBack => self.step_back,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Include a digest of the response text in the fingerprint. When off,
    /// equal-length responses in the same phase and complexity share a
    /// cached evaluation.
    pub content_addressed: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            content_addressed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub evaluation_timeout_ms: u64,
    pub max_attempts: u32,
    pub abandon_after_failed_turns: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            evaluation_timeout_ms: DEFAULT_EVALUATION_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            abandon_after_failed_turns: DEFAULT_ABANDON_AFTER_FAILED_TURNS,
        }
    }
}

impl OrchestratorConfig {
    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluation_timeout_ms)
    }
}

/// Minimum score for one competency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompetencyBar {
    pub competency: Competency,
    pub min_score: f64,
}

impl CompetencyBar {
    pub fn new(competency: Competency, min_score: f64) -> Self {
        Self {
            competency,
            min_score,
        }
    }
}

/// Minimum bar for leaving one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GateConfig {
    pub bars: Vec<CompetencyBar>,
    /// Minimum mean over every scored competency, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatingConfig {
    pub scoping: GateConfig,
    pub analysis: GateConfig,
    pub synthesis: GateConfig,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            scoping: GateConfig {
                bars: vec![CompetencyBar::new(Competency::ProblemDefinition, 3.0)],
                min_average: None,
            },
            analysis: GateConfig {
                bars: vec![CompetencyBar::new(Competency::TechnicalDepth, 3.0)],
                min_average: None,
            },
            synthesis: GateConfig {
                bars: vec![CompetencyBar::new(Competency::Communication, 3.0)],
                min_average: Some(3.0),
            },
        }
    }
}

impl Config {
    pub fn catalyst_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".catalyst"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::catalyst_dir()?.join("catalyst.toml"))
    }

    pub fn evaluations_path() -> Result<PathBuf> {
        Ok(Self::catalyst_dir()?.join("evaluations.jsonl"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Config::load");
        if !path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        debug!(
            base_rate = config.pricing.base_rate,
            content_addressed = config.cache.content_addressed,
            timeout_ms = config.orchestrator.evaluation_timeout_ms,
            "Config loaded"
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::catalyst_dir()?;
        if !dir.exists() {
            debug!(dir = %dir.display(), "Creating catalyst directory");
            fs::create_dir_all(&dir)?;
        }
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Reject values that would make costing or gating meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.pricing.base_rate > 0.0) {
            return Err(Error::Validation(format!(
                "pricing.base_rate must be positive, got {}",
                self.pricing.base_rate
            )));
        }
        for strategy in ReasoningStrategy::ALL {
            let profile = self.strategies.profile(strategy);
            if profile.token_multiplier == 0 || !(profile.cost_multiplier > 0.0) {
                return Err(Error::Validation(format!(
                    "strategies.{strategy} multipliers must be positive"
                )));
            }
        }
        // Deeper strategies must cost strictly more per token.
        for pair in ReasoningStrategy::ALL.windows(2) {
            let (cheaper, dearer) = (pair[0], pair[1]);
            let (low, high) = (
                self.strategies.profile(cheaper).cost_multiplier,
                self.strategies.profile(dearer).cost_multiplier,
            );
            if !(high > low) {
                return Err(Error::Validation(format!(
                    "strategies.{dearer}.cost_multiplier ({high}) must exceed strategies.{cheaper}.cost_multiplier ({low})"
                )));
            }
        }
        if self.orchestrator.evaluation_timeout_ms == 0 {
            return Err(Error::Validation(
                "orchestrator.evaluation_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.orchestrator.max_attempts == 0 {
            return Err(Error::Validation(
                "orchestrator.max_attempts must be at least 1".to_string(),
            ));
        }
        for (phase, gate) in [
            ("scoping", &self.gating.scoping),
            ("analysis", &self.gating.analysis),
            ("synthesis", &self.gating.synthesis),
        ] {
            let thresholds = gate
                .bars
                .iter()
                .map(|bar| bar.min_score)
                .chain(gate.min_average);
            for threshold in thresholds {
                if !(MIN_SCORE..=MAX_SCORE).contains(&threshold) {
                    return Err(Error::Validation(format!(
                        "gating.{phase} threshold {threshold} outside [{MIN_SCORE}, {MAX_SCORE}]"
                    )));
                }
            }
        }
        Ok(())
    }
}
