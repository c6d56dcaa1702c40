//! Configuration module

use crate::defaults::{
    DEFAULT_CONNECTIVITY, DEFAULT_EXPANSION_ADD, DEFAULT_EXPANSION_SEARCH, ENV_PREFIX,
    MIN_CONNECTIVITY,
};
use crate::error::{IndexError, Result};
use crate::metric::{MetricKind, ScalarKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Construction record for an [`Index`](crate::Index)
///
/// Only `dimensions` is required; everything else has a documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Number of components per vector
    pub dimensions: usize,
    /// Slots allocated up front
    pub capacity: usize,
    /// Max links per node on upper levels (M)
    pub connectivity: usize,
    /// Candidate list size while inserting
    pub expansion_add: usize,
    /// Candidate list size while searching
    pub expansion_search: usize,
    /// Scalar encoding of stored vectors
    pub quantization: ScalarKind,
    pub metric: MetricKind,
    /// Seed for level sampling; random when unset
    pub seed: Option<u64>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            dimensions: 0,
            capacity: 0,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            quantization: ScalarKind::F32,
            metric: MetricKind::InnerProduct,
            seed: None,
        }
    }
}

impl IndexOptions {
    /// Options for `dimensions`-component vectors with all defaults
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_connectivity(mut self, connectivity: usize) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_expansion_add(mut self, expansion_add: usize) -> Self {
        self.expansion_add = expansion_add;
        self
    }

    pub fn with_expansion_search(mut self, expansion_search: usize) -> Self {
        self.expansion_search = expansion_search;
        self
    }

    pub fn with_quantization(mut self, quantization: ScalarKind) -> Self {
        self.quantization = quantization;
        self
    }

    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the options describe a constructible index
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(IndexError::invalid_argument("dimensions must be greater than 0"));
        }
        if self.connectivity < MIN_CONNECTIVITY {
            return Err(IndexError::invalid_argument(format!(
                "connectivity must be at least {}, got {}",
                MIN_CONNECTIVITY, self.connectivity
            )));
        }
        if self.expansion_add == 0 || self.expansion_search == 0 {
            return Err(IndexError::invalid_argument(
                "expansion factors must be greater than 0",
            ));
        }
        if self.metric == MetricKind::Haversine && self.dimensions != 2 {
            return Err(IndexError::invalid_argument(format!(
                "haversine needs 2 dimensions (lat, lon), got {}",
                self.dimensions
            )));
        }
        Ok(())
    }

    /// Load options from `VORTEX_DENSE_*` environment variables
    ///
    /// `VORTEX_DENSE_DIMENSIONS` is required. Recognized names: `CAPACITY`,
    /// `CONNECTIVITY`, `EXPANSION_ADD`, `EXPANSION_SEARCH`, `QUANTIZATION`,
    /// `METRIC`, `SEED`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let dimensions = lookup("DIMENSIONS").ok_or_else(|| {
            IndexError::invalid_argument(format!("{}DIMENSIONS is not set", ENV_PREFIX))
        })?;

        let options = Self {
            dimensions: parse_var("DIMENSIONS", &dimensions)?,
            capacity: parse_or(&lookup, "CAPACITY", defaults.capacity)?,
            connectivity: parse_or(&lookup, "CONNECTIVITY", defaults.connectivity)?,
            expansion_add: parse_or(&lookup, "EXPANSION_ADD", defaults.expansion_add)?,
            expansion_search: parse_or(&lookup, "EXPANSION_SEARCH", defaults.expansion_search)?,
            quantization: match lookup("QUANTIZATION") {
                Some(name) => ScalarKind::from_str(&name)?,
                None => defaults.quantization,
            },
            metric: match lookup("METRIC") {
                Some(name) => MetricKind::from_str(&name)?,
                None => defaults.metric,
            },
            seed: lookup("SEED")
                .map(|v| parse_var("SEED", &v))
                .transpose()?,
        };

        options.validate()?;
        Ok(options)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        IndexError::invalid_argument(format!("{}{}={:?} is not a number", ENV_PREFIX, name, value))
    })
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => parse_var(name, &value),
        None => Ok(default),
    }
}
