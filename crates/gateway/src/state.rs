//! Shared application state threaded through every route handler, built
//! once in `main` and cloned cheaply (everything inside is an `Arc`).

use std::sync::Arc;
use std::time::Duration;

use sa_domain::registry::FilterRegistry;

use crate::distributor::Distributor;

#[derive(Clone)]
pub struct AppState {
    pub distributor: Arc<Distributor>,
    pub filter_registry: Arc<FilterRegistry>,
}

impl AppState {
    pub fn new(ttl_hours: u64) -> Self {
        Self {
            distributor: Arc::new(Distributor::new()),
            filter_registry: Arc::new(FilterRegistry::new(Duration::from_secs(ttl_hours * 3600))),
        }
    }
}
