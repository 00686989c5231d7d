use std::sync::Arc;

use crate::{config::Config, store::VoteLog};

pub struct State {
    pub config: Config,
    pub log: Arc<dyn VoteLog>,
}

impl State {
    pub fn new(config: Config, log: Arc<dyn VoteLog>) -> Arc<Self> {
        Arc::new(Self { config, log })
    }

    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.config.port)
    }
}
