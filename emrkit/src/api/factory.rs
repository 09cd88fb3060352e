// emrkit/src/api/factory.rs
//
// Runtime backend selection: live HTTP backend or in-memory demo data
//

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{EmrApi, HttpEmrClient, MemoryEmr};
use crate::config::ApiConfig;
use crate::errors::EmrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    #[default]
    Live,
    Demo,
}

impl From<&str> for ApiMode {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "demo" | "mock" | "memory" => ApiMode::Demo,
            _ => ApiMode::Live,
        }
    }
}

pub struct ApiFactory;

impl ApiFactory {
    pub fn create(mode: ApiMode, config: &ApiConfig) -> Result<Arc<dyn EmrApi>, EmrError> {
        match mode {
            ApiMode::Live => {
                info!("Using EMR backend at {}", config.base_url);
                Ok(Arc::new(HttpEmrClient::new(config)?))
            }
            ApiMode::Demo => {
                info!("Using in-memory demo backend");
                Ok(Arc::new(MemoryEmr::with_demo_data()))
            }
        }
    }
}
