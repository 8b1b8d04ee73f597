//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Functions in this crate return [`anyhow::Result`]; these variants can be recovered
/// from the returned error with `downcast_ref::<LockstepError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockstepError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A component declared a negative dimension.
    #[error("{component} declares a negative {space} space size: {value}")]
    NegativeSpaceSize {
        /// Name of the declaring component.
        component: String,
        /// Which of the four spaces.
        space: &'static str,
        /// The declared value.
        value: i64,
    },

    /// A declared space size does not match what the component actually binds to.
    #[error("{component}: declared {space} space size {declared}, found {actual}")]
    SpaceMismatch {
        /// Name of the component.
        component: String,
        /// Which of the four spaces.
        space: &'static str,
        /// The declared value.
        declared: usize,
        /// The value found at setup.
        actual: usize,
    },

    /// A metric was registered twice.
    #[error("Metric {0}/{1} is already registered")]
    DuplicateMetric(String, String),

    /// A metric was logged without being registered.
    #[error("Metric {0}/{1} is not registered")]
    UnknownMetric(String, String),

    /// A logged vector does not have one value per slot.
    #[error("Metric {key} expects {expected} values, got {got}")]
    MetricLength {
        /// `category/name` of the metric.
        key: String,
        /// Number of slots.
        expected: usize,
        /// Length of the logged vector.
        got: usize,
    },

    /// A plugin type tag was registered twice.
    #[error("{family} type '{tag}' is already registered")]
    DuplicateRegistration {
        /// Plugin family, e.g. `robot`.
        family: &'static str,
        /// The duplicated tag.
        tag: String,
    },

    /// A plugin type tag was not found in the registry.
    #[error("Unknown {family} type '{tag}'")]
    UnknownPluginType {
        /// Plugin family, e.g. `robot`.
        family: &'static str,
        /// The requested tag.
        tag: String,
    },

    /// The configuration file was written for another version.
    #[error("Configuration version {found} is not supported (expected {expected})")]
    ConfigVersion {
        /// Supported version.
        expected: u32,
        /// Version found in the configuration.
        found: u32,
    },

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The action batch does not have the composed shape.
    #[error("Action batch must be {expected:?}, got {got:?}")]
    ActionShape {
        /// `[num_envs, action_space]`.
        expected: [usize; 2],
        /// Shape of the given batch.
        got: [usize; 2],
    },

    /// The generator actions do not have the composed shape.
    #[error("Generator actions must be {expected:?}, got {got:?}")]
    GeneratorShape {
        /// `[n_env_ids, generator_space]`.
        expected: [usize; 2],
        /// Shape of the given batch.
        got: [usize; 2],
    },

    /// A component returned an observation or state of the wrong shape.
    #[error("{component} returned {kind} of shape {got:?}, expected {expected:?}")]
    ObservationShape {
        /// Name of the component.
        component: String,
        /// `observation` or `state`.
        kind: &'static str,
        /// Declared shape.
        expected: [usize; 2],
        /// Returned shape.
        got: [usize; 2],
    },

    /// An environment index outside `[0, num_envs)`.
    #[error("Environment id {id} is out of range (num_envs = {num_envs})")]
    EnvIdOutOfRange {
        /// The offending id.
        id: usize,
        /// Number of slots.
        num_envs: usize,
    },

    /// An environment index listed twice in one reset request.
    #[error("Environment id {0} is listed more than once")]
    DuplicateEnvId(usize),

    /// Per-slot seeds were given for a different number of slots.
    #[error("Expected {expected} seeds, got {got}")]
    SeedCount {
        /// Number of reset slots.
        expected: usize,
        /// Number of seeds.
        got: usize,
    },

    /// A joint name was not found in the articulation.
    #[error("Joint '{0}' not found in the articulation")]
    UnknownJoint(String),
}
