/*!
 * Subsystem State
 *
 * Process-wide registry and scheduler binding, established once by `init`.
 */

use super::config::CondvarConfig;
use super::registry::Registry;
use crate::core::errors::{CondvarError, CondvarResult};
use crate::core::time::boot_instant;
use crate::scheduler::{ParkingScheduler, ThreadScheduler};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

static SYSTEM: OnceLock<CondvarSystem> = OnceLock::new();

pub(crate) struct CondvarSystem {
    config: CondvarConfig,
    registry: Registry,
    scheduler: Arc<dyn ThreadScheduler>,
}

impl CondvarSystem {
    fn new(config: CondvarConfig, scheduler: Arc<dyn ThreadScheduler>) -> Self {
        Self {
            registry: Registry::with_capacity(config.registry_capacity),
            config,
            scheduler,
        }
    }

    #[inline]
    pub(crate) fn config(&self) -> &CondvarConfig {
        &self.config
    }

    #[inline]
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub(crate) fn scheduler(&self) -> &dyn ThreadScheduler {
        self.scheduler.as_ref()
    }
}

/// Initialize the subsystem with configuration from the environment and the
/// hosted scheduler
///
/// Must be called exactly once, before any other operation.
pub fn init() -> CondvarResult<()> {
    init_with_config(CondvarConfig::from_env())
}

/// Initialize with an explicit configuration and the hosted scheduler
pub fn init_with_config(config: CondvarConfig) -> CondvarResult<()> {
    init_with(config, Arc::new(ParkingScheduler::new()))
}

/// Initialize with an explicit configuration and scheduler
pub fn init_with(config: CondvarConfig, scheduler: Arc<dyn ThreadScheduler>) -> CondvarResult<()> {
    boot_instant();
    let registry_capacity = config.registry_capacity;
    let scheduler_name = scheduler.name();

    SYSTEM
        .set(CondvarSystem::new(config, scheduler))
        .map_err(|_| CondvarError::AlreadyInitialized)?;

    info!(
        registry_capacity,
        scheduler = scheduler_name,
        "Condition variable subsystem initialized"
    );
    Ok(())
}

/// Whether `init` (or a lazy default initialization) has happened
pub fn is_initialized() -> bool {
    SYSTEM.get().is_some()
}

/// Scheduler the subsystem blocks and wakes threads through
pub fn thread_scheduler() -> &'static dyn ThreadScheduler {
    system().scheduler()
}

pub(crate) fn system() -> &'static CondvarSystem {
    SYSTEM.get_or_init(|| {
        warn!("Condition variable subsystem used before init(), using defaults");
        boot_instant();
        CondvarSystem::new(
            CondvarConfig::default(),
            Arc::new(ParkingScheduler::new()),
        )
    })
}
