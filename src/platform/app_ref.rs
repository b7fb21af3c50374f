// ABOUTME: Identity of one platform application for the duration of a run.
// ABOUTME: Builds the application-scoped API URLs.

use crate::types::{ApiTarget, AppName};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRef {
    name: AppName,
    target: ApiTarget,
}

impl ApplicationRef {
    pub fn new(name: AppName, target: ApiTarget) -> Self {
        Self { name, target }
    }

    pub fn name(&self) -> &AppName {
        &self.name
    }

    pub fn target(&self) -> &ApiTarget {
        &self.target
    }

    /// URL of `apps/{name}` followed by `suffix` (e.g. "/cname").
    pub fn url(&self, suffix: &str) -> String {
        self.target.join(&format!("apps/{}{}", self.name, suffix))
    }
}

impl fmt::Display for ApplicationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
