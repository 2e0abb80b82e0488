//! HTTP front end configuration, resolved once at startup.

use patient_records_core::config::parse_var;
use patient_records_core::ConfigError;

pub const ADDR_VAR: &str = "PATIENT_RECORDS_ADDR";
pub const PAGE_SIZE_VAR: &str = "PATIENT_PAGE_SIZE";
pub const CONSULTANTS_VAR: &str = "PATIENT_CONSULTANTS";

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_CONSULTANTS: &str = "Dr. Y.S. Pawar & Dr. Manjula";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    addr: String,
    page_size: u32,
    consultants: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.into(),
            page_size: DEFAULT_PAGE_SIZE,
            consultants: DEFAULT_CONSULTANTS.into(),
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_size = parse_var(&lookup, PAGE_SIZE_VAR, DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                var: PAGE_SIZE_VAR,
                value: page_size.to_string(),
                reason: "must be at least 1",
            });
        }

        Ok(Self {
            addr: lookup(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.into()),
            page_size,
            consultants: lookup(CONSULTANTS_VAR).unwrap_or_else(|| DEFAULT_CONSULTANTS.into()),
        })
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn consultants(&self) -> &str {
        &self.consultants
    }
}
