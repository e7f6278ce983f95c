//! Configuration types for calibration runs.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level calibration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Parameters under calibration, in cost-function order.
    pub parameters: Vec<ParameterConfig>,
    /// Optimization algorithm to use.
    pub algorithm: OptimizerAlgorithm,
    /// Driver loop limits.
    #[serde(default)]
    pub run: RunConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            parameters: vec![
                ParameterConfig {
                    name: "x".to_string(),
                    min: -5.0,
                    max: 5.0,
                    init: ParameterInit::Random,
                },
                ParameterConfig {
                    name: "y".to_string(),
                    min: -5.0,
                    max: 5.0,
                    init: ParameterInit::Value(1.0),
                },
            ],
            algorithm: OptimizerAlgorithm::default(),
            run: RunConfig::default(),
        }
    }
}

/// Optimization algorithm selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OptimizerAlgorithm {
    /// (mu/rho,lambda) evolution strategy.
    EvolutionStrategy(EsConfig),
    /// Powell's conjugate directions over a Brent line search.
    Powell(PowellConfig),
}

impl Default for OptimizerAlgorithm {
    fn default() -> Self {
        Self::EvolutionStrategy(EsConfig::default())
    }
}

/// One parameter under calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// How the initial value is chosen.
    #[serde(default)]
    pub init: ParameterInit,
}

impl ParameterConfig {
    /// Starting value for deterministic optimizers. Random parameters start
    /// at the center of their range.
    pub fn start_value(&self) -> f64 {
        match self.init {
            ParameterInit::Random => 0.5 * (self.min + self.max),
            ParameterInit::Value(v) => v,
        }
    }
}

/// Initial-value policy of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterInit {
    /// Uniformly random within `[min, max]`.
    #[default]
    Random,
    /// Fixed value within `[min, max]`.
    Value(f64),
}

/// Evolution strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsConfig {
    /// Population size.
    #[serde(default = "default_mu")]
    pub mu: usize,
    /// Parents per offspring.
    #[serde(default = "default_rho")]
    pub rho: usize,
    /// Offspring per generation.
    #[serde(default = "default_lambda")]
    pub lambda: usize,
    #[serde(default)]
    pub selection: SelectionKind,
    #[serde(default)]
    pub strategy_recombination: RecombinationKind,
    #[serde(default = "default_object_recombination")]
    pub object_recombination: RecombinationKind,
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Initial value of every strategy parameter.
    #[serde(default = "default_init_strategy_parameter")]
    pub init_strategy_parameter: f64,
    /// Number of best individuals kept in the archive.
    #[serde(default = "default_number_of_result_files")]
    pub number_of_result_files: usize,
    /// Evaluate offspring in parallel. Only safe for reentrant cost functions.
    #[serde(default)]
    pub parallel_evaluation: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EsConfig {
    fn default() -> Self {
        Self {
            mu: default_mu(),
            rho: default_rho(),
            lambda: default_lambda(),
            selection: SelectionKind::default(),
            strategy_recombination: RecombinationKind::default(),
            object_recombination: default_object_recombination(),
            mutation: MutationConfig::default(),
            init_strategy_parameter: default_init_strategy_parameter(),
            number_of_result_files: default_number_of_result_files(),
            parallel_evaluation: false,
            random_seed: None,
        }
    }
}

fn default_mu() -> usize {
    10
}
fn default_rho() -> usize {
    2
}
fn default_lambda() -> usize {
    70
}
fn default_object_recombination() -> RecombinationKind {
    RecombinationKind::Intermediate
}
fn default_init_strategy_parameter() -> f64 {
    1.0
}
fn default_number_of_result_files() -> usize {
    1
}

/// Survivor selection scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SelectionKind {
    /// Parents and offspring compete.
    #[default]
    Plus,
    /// Only offspring survive.
    Comma,
}

impl FromStr for SelectionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plus" => Ok(Self::Plus),
            "comma" => Ok(Self::Comma),
            _ => Err(ConfigError::UnknownKind {
                setting: "selection",
                value: s.to_string(),
                expected: "\"Plus\", \"Comma\"",
            }),
        }
    }
}

/// Recombination scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RecombinationKind {
    /// Per index, copy the value of a random parent.
    #[default]
    Discrete,
    /// Per index, average all parents.
    Intermediate,
}

impl FromStr for RecombinationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discrete" => Ok(Self::Discrete),
            "intermediate" => Ok(Self::Intermediate),
            _ => Err(ConfigError::UnknownKind {
                setting: "recombination",
                value: s.to_string(),
                expected: "\"Discrete\", \"Intermediate\"",
            }),
        }
    }
}

impl TryFrom<String> for SelectionKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for RecombinationKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Parameter mutation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", try_from = "MutationSettings")]
pub enum MutationConfig {
    /// One log-normally adapted step size.
    #[serde(rename = "singlestd")]
    SingleStd { learn_rate_coeff: f64 },
    /// One log-normally adapted step size per object parameter.
    #[serde(rename = "multistd")]
    MultiStd { learn_rate_coeff: f64 },
    /// One step size adapted by Rechenberg's 1/5 success rule.
    #[serde(rename = "1/5rule")]
    OneFifthRule {
        check_interval: usize,
        learn_rate_coeff: f64,
    },
}

/// Mutation settings as written in a configuration file.
#[derive(Deserialize)]
struct MutationSettings {
    #[serde(rename = "type")]
    kind: String,
    learn_rate_coeff: f64,
    #[serde(default)]
    check_interval: Option<usize>,
}

impl TryFrom<MutationSettings> for MutationConfig {
    type Error = ConfigError;

    fn try_from(settings: MutationSettings) -> Result<Self, Self::Error> {
        Self::from_name(
            &settings.kind,
            settings.learn_rate_coeff,
            settings.check_interval,
        )
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self::SingleStd {
            learn_rate_coeff: 1.0,
        }
    }
}

impl MutationConfig {
    /// Build from a type name (`SingleSTD`, `MultiSTD`, `1/5Rule`, case-insensitive).
    pub fn from_name(
        name: &str,
        learn_rate_coeff: f64,
        check_interval: Option<usize>,
    ) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "singlestd" => Ok(Self::SingleStd { learn_rate_coeff }),
            "multistd" => Ok(Self::MultiStd { learn_rate_coeff }),
            "1/5rule" => {
                let check_interval =
                    check_interval.ok_or(ConfigError::MissingSetting("check_interval"))?;
                Ok(Self::OneFifthRule {
                    check_interval,
                    learn_rate_coeff,
                })
            }
            _ => Err(ConfigError::UnknownKind {
                setting: "mutation",
                value: name.to_string(),
                expected: "\"SingleSTD\", \"MultiSTD\", \"1/5Rule\"",
            }),
        }
    }

    pub fn learn_rate_coeff(&self) -> f64 {
        match *self {
            Self::SingleStd { learn_rate_coeff }
            | Self::MultiStd { learn_rate_coeff }
            | Self::OneFifthRule {
                learn_rate_coeff, ..
            } => learn_rate_coeff,
        }
    }
}

/// Powell minimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowellConfig {
    /// Absolute function-value tolerance of a full direction sweep.
    #[serde(default = "default_multi_dim_tolerance")]
    pub tolerance: f64,
    /// Relative tolerance of the Brent line search.
    #[serde(default = "default_one_dim_tolerance")]
    pub line_tolerance: f64,
    /// Iteration limit of the Brent line search.
    #[serde(default = "default_one_dim_max_iterations")]
    pub line_max_iterations: usize,
}

impl Default for PowellConfig {
    fn default() -> Self {
        Self {
            tolerance: default_multi_dim_tolerance(),
            line_tolerance: default_one_dim_tolerance(),
            line_max_iterations: default_one_dim_max_iterations(),
        }
    }
}

fn default_multi_dim_tolerance() -> f64 {
    3.0e-5
}
fn default_one_dim_tolerance() -> f64 {
    1.0e-5
}
fn default_one_dim_max_iterations() -> usize {
    100
}

/// Driver loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum number of optimization steps.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Stop once the smallest error drops to this value.
    #[serde(default)]
    pub target_error: Option<f64>,
    /// Directory for result snapshots. Nothing is written when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            target_error: None,
            output_dir: None,
        }
    }
}

fn default_max_steps() -> usize {
    100
}

impl OptimizerConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parameters.is_empty() {
            return Err(ConfigError::NoParameters);
        }
        for p in &self.parameters {
            if p.min > p.max {
                return Err(ConfigError::InvalidBounds {
                    name: p.name.clone(),
                    min: p.min,
                    max: p.max,
                });
            }
            if let ParameterInit::Value(v) = p.init
                && !(p.min..=p.max).contains(&v)
            {
                return Err(ConfigError::ValueOutOfBounds {
                    name: p.name.clone(),
                    value: v,
                });
            }
        }
        match &self.algorithm {
            OptimizerAlgorithm::EvolutionStrategy(es) => es.validate(),
            OptimizerAlgorithm::Powell(powell) => powell.validate(),
        }
    }
}

impl EsConfig {
    /// Validate evolution strategy settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_population(self.mu, self.rho, self.lambda)?;
        if self.selection == SelectionKind::Comma && self.lambda < self.mu {
            return Err(ConfigError::TooFewOffspring {
                mu: self.mu,
                lambda: self.lambda,
            });
        }
        if self.mutation.learn_rate_coeff() <= 0.0 {
            return Err(ConfigError::InvalidLearnRate(self.mutation.learn_rate_coeff()));
        }
        if let MutationConfig::OneFifthRule { check_interval, .. } = self.mutation
            && check_interval == 0
        {
            return Err(ConfigError::InvalidCheckInterval);
        }
        if self.init_strategy_parameter <= 0.0 {
            return Err(ConfigError::InvalidStrategyParameter(
                self.init_strategy_parameter,
            ));
        }
        Ok(())
    }
}

impl PowellConfig {
    /// Validate minimizer settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tolerance < 0.0 || self.line_tolerance <= 0.0 {
            return Err(ConfigError::InvalidTolerance);
        }
        if self.line_max_iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }
        Ok(())
    }
}

/// Check the (mu, rho, lambda) sizes of an evolution run.
pub fn validate_population(mu: usize, rho: usize, lambda: usize) -> Result<(), ConfigError> {
    if mu == 0 || rho == 0 || lambda == 0 {
        return Err(ConfigError::InvalidPopulation { mu, rho, lambda });
    }
    Ok(())
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("mu ({mu}), rho ({rho}) and lambda ({lambda}) must be positive")]
    InvalidPopulation { mu: usize, rho: usize, lambda: usize },
    #[error("comma selection needs lambda ({lambda}) >= mu ({mu})")]
    TooFewOffspring { mu: usize, lambda: usize },
    #[error("No parameters to optimize")]
    NoParameters,
    #[error("Parameter {name}: min ({min}) > max ({max})")]
    InvalidBounds { name: String, min: f64, max: f64 },
    #[error("Parameter {name}: initial value {value} outside its bounds")]
    ValueOutOfBounds { name: String, value: f64 },
    #[error("Learn rate coefficient must be positive, got {0}")]
    InvalidLearnRate(f64),
    #[error("Check interval of the 1/5 rule must be positive")]
    InvalidCheckInterval,
    #[error("Initial strategy parameter must be positive, got {0}")]
    InvalidStrategyParameter(f64),
    #[error("Tolerances must be positive")]
    InvalidTolerance,
    #[error("Line search iteration limit must be positive")]
    InvalidIterations,
    #[error("Setting [{0}] is not defined")]
    MissingSetting(&'static str),
    #[error("The type \"{value}\" for [{setting}] is unknown! Possible types: {expected}")]
    UnknownKind {
        setting: &'static str,
        value: String,
        expected: &'static str,
    },
}
