use crate::service::FlagService;

#[derive(Clone)]
pub struct AppState {
    pub service: FlagService,
}
