//! Shared application state for all routes. The model is fixed after startup.

use crate::config::ResolvedModel;
use crate::service::{CrudService, Seeder};
use crate::store::RowStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ResolvedModel>,
    pub store: Arc<dyn RowStore>,
}

impl AppState {
    pub fn new(model: ResolvedModel, store: Arc<dyn RowStore>) -> Self {
        AppState {
            model: Arc::new(model),
            store,
        }
    }

    pub fn crud(&self) -> CrudService {
        CrudService::new(self.model.clone(), self.store.clone())
    }

    pub fn seeder(&self) -> Seeder {
        Seeder::new(self.model.clone(), self.store.clone())
    }
}
