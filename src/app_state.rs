use std::sync::Arc;

use crate::{api::referer::RefererPolicy, config::Config, dispatcher::Dispatcher, fetcher::Fetcher};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub referer_policy: Arc<RefererPolicy>,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &Config) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(
                fetcher,
                config.cache_capacity(),
                config.cache_max_bytes(),
            )),
            referer_policy: Arc::new(RefererPolicy::new(config.allowed_hosts())),
        }
    }
}
