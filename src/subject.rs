//! Prediction stream identity.

use serde::Deserialize;
use std::fmt;

/// One (agency, route, stop) prediction stream plus a display label.
///
/// The three identifiers are upstream tags and are sent to the prediction
/// service verbatim. `label` is free text for consumers (e.g. the direction
/// of travel, `"Union Landing"`) and never leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Subject {
    agency: String,
    route: String,
    stop: String,
    label: String,
}

impl Subject {
    pub fn new(
        agency: impl Into<String>,
        route: impl Into<String>,
        stop: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            agency: agency.into(),
            route: route.into(),
            stop: stop.into(),
            label: label.into(),
        }
    }

    pub fn agency(&self) -> &str {
        &self.agency
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn stop(&self) -> &str {
        &self.stop
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.route, self.label)
    }
}
