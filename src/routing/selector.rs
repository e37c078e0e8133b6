//! Backend selection for the movies routes.
//!
//! # Responsibilities
//! - Decide monolith vs movies service per request
//! - Honor the gradual-migration switch and percent
//!
//! # Design Decisions
//! - Percent is clamped here, at evaluation time, never at load time
//! - 0 and 100 short-circuit without drawing any randomness
//! - Draws come from the OS CSPRNG; no generator state is shared between requests
//! - No session affinity: consecutive requests from one client may differ

use rand::rngs::OsRng;
use rand::Rng;
use std::sync::Arc;

use crate::config::MigrationConfig;
use crate::observability::metrics;
use crate::routing::backend::{BackendChoice, BackendKind};

/// Source of uniformly distributed integers in `[0, 100)`.
pub trait PercentSource: Send + Sync + std::fmt::Debug {
    fn draw(&self) -> u32;
}

/// Production source backed by the operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngSource;

impl PercentSource for OsRngSource {
    fn draw(&self) -> u32 {
        OsRng.gen_range(0..100)
    }
}

/// Pick the backend for one request.
pub fn select_backend<S>(config: &MigrationConfig, source: &S) -> BackendChoice
where
    S: PercentSource + ?Sized,
{
    let monolith = || BackendChoice::new(BackendKind::Monolith, config.monolith_url.clone());
    let movies = || BackendChoice::new(BackendKind::Movies, config.movies_service_url.clone());

    if !config.gradual_migration {
        return monolith();
    }

    let percent = config.effective_percent();
    if percent == 0 {
        return monolith();
    }
    if percent >= 100 {
        return movies();
    }

    if source.draw() < percent {
        movies()
    } else {
        monolith()
    }
}

/// Selector bound to an immutable migration snapshot.
#[derive(Debug, Clone)]
pub struct BackendSelector {
    config: Arc<MigrationConfig>,
    source: Arc<dyn PercentSource>,
}

impl BackendSelector {
    /// Create a selector drawing from the OS CSPRNG.
    pub fn new(config: Arc<MigrationConfig>) -> Self {
        Self::with_source(config, Arc::new(OsRngSource))
    }

    /// Create a selector with a caller-supplied randomness source.
    pub fn with_source(config: Arc<MigrationConfig>, source: Arc<dyn PercentSource>) -> Self {
        Self { config, source }
    }

    pub fn select(&self) -> BackendChoice {
        let choice = select_backend(&self.config, self.source.as_ref());
        metrics::record_selection(choice.label());
        choice
    }
}
