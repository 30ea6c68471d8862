//! Weather alerts tied to the farmer's recent activities.
//!
//! The model may return zero, one, or several alerts; the schema only fixes
//! the shape of each one.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::flow::Flow;

/// A farm activity the alert should take into account.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct RecentActivity {
    /// The kind of activity (sowing, pesticide spraying, ...).
    pub activity: String,
    /// The crop the activity was for.
    pub crop: String,
    /// When it happened, in any human-readable form ("2 days ago").
    pub date: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherAlertsInput {
    pub recent_activities: Vec<RecentActivity>,
    /// Summary of the forecast: temperature, chance of rain, wind.
    #[schemars(length(min = 1))]
    pub current_weather: String,
    /// Farm location, e.g. "Alappuzha, Kerala".
    #[schemars(length(min = 1))]
    pub location: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct WeatherAlert {
    /// A short, clear title.
    pub title: String,
    /// What is happening and what the farmer should do.
    pub description: String,
    pub severity: Severity,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct WeatherAlertsOutput {
    pub alerts: Vec<WeatherAlert>,
}

impl WeatherAlertsOutput {
    /// Alerts ordered from most to least severe, keeping model order within
    /// a severity.
    pub fn by_severity(&self) -> Vec<&WeatherAlert> {
        let mut alerts: Vec<&WeatherAlert> = self.alerts.iter().collect();
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
        alerts
    }
}

const TEMPLATE: &str = "\
You are an expert agricultural advisor in Kerala, India.
Generate actionable weather alerts for a farmer from their recent activities and the current forecast.

Farmer's Location: {{location}}

Current Weather: {{currentWeather}}

Recent Activities:
{{#each recentActivities}}
- Activity: {{activity}}
- Crop: {{crop}}
- Date: {{date}}
{{/each}}

Produce one or two relevant alerts. For example, if pesticide was sprayed recently and rain is expected, warn that it may wash off. If seeds were just sown and strong winds are expected, warn about protecting the seedlings.
If nothing needs attention, return an empty list of alerts.
Alerts must be relevant to a farmer in the given location.
";

pub struct WeatherAlertsFlow;

impl Flow for WeatherAlertsFlow {
    type Input = WeatherAlertsInput;
    type Output = WeatherAlertsOutput;
    const NAME: &'static str = "weather_alerts";

    fn template(&self) -> &'static str {
        TEMPLATE
    }
}
