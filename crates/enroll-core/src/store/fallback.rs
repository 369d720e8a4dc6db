//! Read-through fallback across repository layers

use super::{Layer, StateRepository};
use crate::error::{EnrollError, Result};
use crate::session::MultiSessionState;
use std::sync::Arc;
use tracing::{info, warn};

/// A value together with the layer that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served<T> {
    pub value: T,
    pub layer: Layer,
}

/// Ordered list of layers tried one after another
#[derive(Clone, Default)]
pub struct FallbackChain {
    layers: Vec<Arc<dyn StateRepository>>,
}

impl FallbackChain {
    pub fn new(layers: Vec<Arc<dyn StateRepository>>) -> Self {
        Self { layers }
    }

    /// Append a layer at the lowest priority
    pub fn push(&mut self, layer: Arc<dyn StateRepository>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run `op` on each layer in order until one succeeds
    ///
    /// Returns the last layer's error if every layer fails.
    pub fn first_success<T>(
        &self,
        mut op: impl FnMut(&dyn StateRepository) -> Result<T>,
    ) -> Result<Served<T>> {
        let mut last_err = None;
        for repo in &self.layers {
            match op(repo.as_ref()) {
                Ok(value) => {
                    info!("Served by {} layer", repo.layer());
                    return Ok(Served {
                        value,
                        layer: repo.layer(),
                    });
                }
                Err(err) => {
                    warn!("{} layer failed, falling back: {}", repo.layer(), err);
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            EnrollError::NotConfigured("no persistence layer available".to_string())
        }))
    }

    /// Load the state from the first layer that can provide it
    pub fn load(&self) -> Result<Served<MultiSessionState>> {
        self.first_success(|repo| repo.load())
    }
}
