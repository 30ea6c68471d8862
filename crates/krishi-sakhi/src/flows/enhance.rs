//! Improvement suggestions for a logged farm activity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::flow::Flow;

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceActivityLogInput {
    /// The kind of activity (sowing, irrigation, spraying, ...).
    #[schemars(length(min = 1))]
    pub activity_type: String,
    /// What the farmer actually did.
    pub activity_details: String,
    /// The crop the activity was for.
    #[schemars(length(min = 1))]
    pub crop_type: String,
    /// The soil the crop is planted in.
    pub soil_type: String,
    /// How the crop is irrigated.
    pub irrigation_method: String,
    /// Where the activity took place.
    pub location: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct EnhanceActivityLogOutput {
    /// Specific, actionable suggestions.
    pub suggestions: Vec<String>,
    /// Why these suggestions apply.
    pub reasoning: String,
}

const TEMPLATE: &str = "\
You are an expert agricultural advisor for farmers in Kerala, India. Review the activity the farmer logged and suggest specific, actionable improvements that raise productivity and yield and keep the farm sustainable. Take into account the local climate, common farming practice in Kerala, and environmental impact.

Activity Type: {{activityType}}
Activity Details: {{activityDetails}}
Crop Type: {{cropType}}
Soil Type: {{soilType}}
Irrigation Method: {{irrigationMethod}}
Location: {{location}}

Give a list of concrete suggestions and explain the reasoning behind them.
";

pub struct EnhanceActivityLogFlow;

impl Flow for EnhanceActivityLogFlow {
    type Input = EnhanceActivityLogInput;
    type Output = EnhanceActivityLogOutput;
    const NAME: &'static str = "enhance_activity_log";

    fn template(&self) -> &'static str {
        TEMPLATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{ErrorKind, render_prompt};

    fn input() -> EnhanceActivityLogInput {
        EnhanceActivityLogInput {
            activity_type: "Irrigation".into(),
            activity_details: "Flooded the field for 3 hours".into(),
            crop_type: "Banana".into(),
            soil_type: "Sandy loam".into(),
            irrigation_method: "Flood".into(),
            location: "Thrissur".into(),
        }
    }

    #[test]
    fn all_six_fields_rendered() {
        let prompt = render_prompt(&EnhanceActivityLogFlow, &input()).unwrap();
        for line in [
            "Activity Type: Irrigation",
            "Activity Details: Flooded the field for 3 hours",
            "Crop Type: Banana",
            "Soil Type: Sandy loam",
            "Irrigation Method: Flood",
            "Location: Thrissur",
        ] {
            assert!(prompt.contains(line), "missing {line:?}");
        }
    }

    #[test]
    fn blank_crop_rejected() {
        let mut bad = input();
        bad.crop_type.clear();
        let err = render_prompt(&EnhanceActivityLogFlow, &bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.violations()[0].path, "/cropType");
    }
}
