use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Resource;

/// A multiset over the five resource types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceBundle {
    counts: [u8; Resource::ALL.len()],
}

impl Default for ResourceBundle {
    fn default() -> Self {
        Self::zero()
    }
}

impl ResourceBundle {
    pub const fn from_counts(counts: [u8; 5]) -> Self {
        Self { counts }
    }

    pub const fn zero() -> Self {
        Self {
            counts: [0; Resource::ALL.len()],
        }
    }

    pub fn single(resource: Resource, amount: u8) -> Self {
        let mut bundle = Self::zero();
        bundle.add(resource, amount);
        bundle
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|&v| v as u32).sum()
    }

    pub fn add(&mut self, resource: Resource, amount: u8) {
        let idx = resource.index();
        self.counts[idx] = self.counts[idx].saturating_add(amount);
    }

    pub fn add_bundle(&mut self, other: &ResourceBundle) {
        for (idx, value) in other.counts.iter().enumerate() {
            self.counts[idx] = self.counts[idx].saturating_add(*value);
        }
    }

    pub fn subtract(&mut self, resource: Resource, amount: u8) -> Result<(), ResourceError> {
        let idx = resource.index();
        if self.counts[idx] < amount {
            return Err(ResourceError::InsufficientResource {
                resource,
                available: self.counts[idx],
                requested: amount,
            });
        }
        self.counts[idx] -= amount;
        Ok(())
    }

    pub fn subtract_bundle(&mut self, other: &ResourceBundle) -> Result<(), ResourceError> {
        if !self.can_afford(other) {
            return Err(ResourceError::InsufficientBundle);
        }
        for (idx, value) in other.counts.iter().enumerate() {
            self.counts[idx] -= *value;
        }
        Ok(())
    }

    /// Component-wise dominance: every count here is at least the other's.
    pub fn can_afford(&self, other: &ResourceBundle) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(have, need)| have >= need)
    }

    /// True when no resource type is present in both bundles.
    pub fn is_disjoint(&self, other: &ResourceBundle) -> bool {
        self.counts
            .iter()
            .zip(other.counts.iter())
            .all(|(a, b)| *a == 0 || *b == 0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&value| value == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Resource, u8)> + '_ {
        Resource::ALL.into_iter().zip(self.counts.iter().copied())
    }

    /// Only the resource types with a non-zero count.
    pub fn present(&self) -> impl Iterator<Item = (Resource, u8)> + '_ {
        self.iter().filter(|(_, amount)| *amount > 0)
    }

    pub fn get(&self, resource: Resource) -> u8 {
        self.counts[resource.index()]
    }

    /// Picks the `nth` card (0-based) when the bundle is laid out as a flat
    /// hand in resource order.
    pub fn nth_card(&self, mut nth: u32) -> Option<Resource> {
        for (resource, amount) in self.iter() {
            if nth < amount as u32 {
                return Some(resource);
            }
            nth -= amount as u32;
        }
        None
    }
}

impl FromIterator<(Resource, u8)> for ResourceBundle {
    fn from_iter<I: IntoIterator<Item = (Resource, u8)>>(iter: I) -> Self {
        let mut bundle = ResourceBundle::zero();
        for (resource, amount) in iter {
            bundle.add(resource, amount);
        }
        bundle
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .present()
            .map(|(resource, amount)| format!("{amount}x{resource}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("insufficient {resource:?}: have {available}, need {requested}")]
    InsufficientResource {
        resource: Resource,
        available: u8,
        requested: u8,
    },
    #[error("insufficient resources to cover bundle")]
    InsufficientBundle,
}

pub const COST_ROAD: ResourceBundle = ResourceBundle::from_counts([1, 1, 0, 0, 0]);
pub const COST_SETTLEMENT: ResourceBundle = ResourceBundle::from_counts([1, 1, 1, 1, 0]);
pub const COST_CITY: ResourceBundle = ResourceBundle::from_counts([0, 0, 0, 2, 3]);
pub const COST_DEVELOPMENT: ResourceBundle = ResourceBundle::from_counts([0, 0, 1, 1, 1]);
