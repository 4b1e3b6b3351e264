use serde::Deserialize;

use crate::ai::PreviousStats;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionsRequest {
    pub topic: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub num_questions: Option<usize>,
}

/// 预测只需要问题的必填标记，题干和题型不影响公式
#[derive(Debug, Deserialize)]
pub struct PredictQuestion {
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictSurveyRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<PredictQuestion>,
    #[serde(default)]
    pub previous_stats: Option<PreviousStats>,
}
