//! Crop recommendations from soil, location, and past seasons.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::flow::Flow;

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CropRecommendationsInput {
    /// The type of soil the farmer has.
    #[schemars(length(min = 1))]
    pub soil_type: String,
    /// The location of the farm.
    #[schemars(length(min = 1))]
    pub location: String,
    /// Free-text history of previous crops and yields.
    pub historical_data: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct CropRecommendationsOutput {
    /// Recommended crop names.
    pub crops: Vec<String>,
    /// A short paragraph explaining the recommendations.
    pub reasoning: String,
}

const TEMPLATE: &str = "\
You are an expert agricultural advisor for farmers in Kerala.
Recommend the best crops to plant, based on the farmer's soil type, location, and history.

Soil Type: {{soilType}}
Location: {{location}}
Historical Data: {{historicalData}}

List the crops as a simple array of crop names, and explain your reasoning in one short paragraph.
";

pub struct CropRecommendationsFlow;

impl Flow for CropRecommendationsFlow {
    type Input = CropRecommendationsInput;
    type Output = CropRecommendationsOutput;
    const NAME: &'static str = "crop_recommendations";

    fn template(&self) -> &'static str {
        TEMPLATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::render_prompt;

    #[test]
    fn fields_land_in_prompt() {
        let input = CropRecommendationsInput {
            soil_type: "Laterite".into(),
            location: "Palakkad".into(),
            historical_data: "Paddy in 2023, poor yield due to late rains.".into(),
        };
        let prompt = render_prompt(&CropRecommendationsFlow, &input).unwrap();
        assert!(prompt.contains("Soil Type: Laterite\n"));
        assert!(prompt.contains("Location: Palakkad\n"));
        assert!(prompt.contains("Historical Data: Paddy in 2023, poor yield due to late rains.\n"));
    }

    #[test]
    fn history_may_be_empty() {
        let input = CropRecommendationsInput {
            soil_type: "Alluvial".into(),
            location: "Kuttanad".into(),
            historical_data: String::new(),
        };
        assert!(render_prompt(&CropRecommendationsFlow, &input).is_ok());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let value = serde_json::to_value(CropRecommendationsInput {
            soil_type: "a".into(),
            location: "b".into(),
            historical_data: "c".into(),
        })
        .unwrap();
        assert!(value.get("soilType").is_some());
        assert!(value.get("historicalData").is_some());
    }
}
