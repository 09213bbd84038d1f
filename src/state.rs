//! Shared application state for all routes.

use crate::service::GiftService;
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub gifts: GiftService,
}

impl AppState {
    pub fn new(stores: Stores) -> Self {
        AppState {
            gifts: GiftService::new(stores.clone()),
            stores,
        }
    }
}
