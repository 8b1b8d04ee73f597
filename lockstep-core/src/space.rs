//! Composition of action, observation, state and generator spaces.
//!
//! Every plugin declares how many dimensions it contributes to each of the four
//! spaces. The driver exposes the sums, and slices its batches with the
//! per-component column ranges computed here.
use crate::error::LockstepError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Space sizes as declared by a component.
///
/// Declarations are signed so that a broken declaration is reported at
/// construction instead of wrapping around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceDecl {
    /// Width of the action vector.
    pub action: i64,

    /// Width of the observation vector.
    pub observation: i64,

    /// Width of the privileged state vector.
    pub state: i64,

    /// Number of generator parameters used to vary initial conditions at reset.
    pub generator: i64,
}

impl SpaceDecl {
    /// Constructs a declaration.
    pub fn new(action: i64, observation: i64, state: i64, generator: i64) -> Self {
        Self {
            action,
            observation,
            state,
            generator,
        }
    }

    fn validate(&self, component: &str) -> Result<SpaceSizes> {
        let check = |space: &'static str, value: i64| -> Result<usize> {
            if value < 0 {
                return Err(LockstepError::NegativeSpaceSize {
                    component: component.to_string(),
                    space,
                    value,
                }
                .into());
            }
            Ok(value as usize)
        };

        Ok(SpaceSizes {
            action: check("action", self.action)?,
            observation: check("observation", self.observation)?,
            state: check("state", self.state)?,
            generator: check("generator", self.generator)?,
        })
    }
}

/// Validated space sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSizes {
    /// Width of the action vector.
    pub action: usize,

    /// Width of the observation vector.
    pub observation: usize,

    /// Width of the privileged state vector.
    pub state: usize,

    /// Number of generator parameters.
    pub generator: usize,
}

impl std::ops::Add for SpaceSizes {
    type Output = SpaceSizes;

    fn add(self, rhs: Self) -> Self::Output {
        SpaceSizes {
            action: self.action + rhs.action,
            observation: self.observation + rhs.observation,
            state: self.state + rhs.state,
            generator: self.generator + rhs.generator,
        }
    }
}

/// Selects one of the four spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// Action space.
    Action,
    /// Observation space.
    Observation,
    /// State space.
    State,
    /// Generator space.
    Generator,
}

impl Space {
    /// Observation and state put the last component's columns first.
    fn reversed(&self) -> bool {
        matches!(self, Self::Observation | Self::State)
    }
}

impl SpaceSizes {
    /// Size of one space.
    pub fn get(&self, space: Space) -> usize {
        match space {
            Space::Action => self.action,
            Space::Observation => self.observation,
            Space::State => self.state,
            Space::Generator => self.generator,
        }
    }
}

/// Spaces of a set of components and their sum.
///
/// Action and generator columns are laid out in the order the components were
/// given to [`compose`], observation and state columns in the reverse order.
/// With `[robot, task]` this gives `[robot | task]` actions and
/// `[task | robot]` observations.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedSpaces {
    names: Vec<String>,
    parts: Vec<SpaceSizes>,
    total: SpaceSizes,
}

impl ComposedSpaces {
    /// The composed sizes exposed by the driver.
    pub fn total(&self) -> &SpaceSizes {
        &self.total
    }

    /// Sizes declared by the `ix`-th component.
    pub fn part(&self, ix: usize) -> &SpaceSizes {
        &self.parts[ix]
    }

    /// Name of the `ix`-th component.
    pub fn name(&self, ix: usize) -> &str {
        &self.names[ix]
    }

    /// Number of composed components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if nothing was composed.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Columns of `space` owned by the `ix`-th component.
    pub fn range(&self, space: Space, ix: usize) -> Range<usize> {
        let preceding = match space.reversed() {
            true => &self.parts[ix + 1..],
            false => &self.parts[..ix],
        };
        let start: usize = preceding.iter().map(|p| p.get(space)).sum();
        start..start + self.parts[ix].get(space)
    }
}

/// Sums the declared spaces of the given components.
///
/// Fails with [`LockstepError::NegativeSpaceSize`] if any declared size is negative.
pub fn compose(components: &[(&str, SpaceDecl)]) -> Result<ComposedSpaces> {
    let mut names = Vec::with_capacity(components.len());
    let mut parts = Vec::with_capacity(components.len());
    let mut total = SpaceSizes::default();

    for (name, decl) in components {
        let sizes = decl.validate(name)?;
        total = total + sizes;
        names.push(name.to_string());
        parts.push(sizes);
    }

    Ok(ComposedSpaces {
        names,
        parts,
        total,
    })
}
