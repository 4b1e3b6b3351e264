//! 生成式后端适配层：问题建议、表现预测、结构化分析三类派生产物，
//! 全部遵循同一个调用模式 —— 构造提示词、请求、从自由文本中抽取 JSON、
//! 失败则落到确定性兜底，对外永不报错。

use serde::{Deserialize, Serialize};

use crate::analytics::{self, SummaryStats, SurveyAnalysisResult, SurveyInsight};
use crate::routes::response::model::ResponseWithAnswers;
use crate::routes::survey::model::{QuestionType, SurveyResults};

mod client;
mod extract;
pub mod fallback;
pub mod prompts;

pub use client::{AiClient, AiError};
pub use extract::{Bracket, ParseError, extract_json};

pub const ANALYSIS_FAILURE_MESSAGE: &str = "Could not generate analysis due to an error.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedQuestion {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPrediction {
    #[serde(default)]
    pub expected_completion_rate: f64,
    #[serde(default)]
    pub expected_response_count: f64,
    #[serde(default = "unknown_demographic")]
    pub target_demographic: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

fn unknown_demographic() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousStats {
    #[serde(default)]
    pub avg_completion_rate: Option<f64>,
    #[serde(default)]
    pub avg_response_count: Option<f64>,
}

/// AI 返回的部分分析：字段全部可缺省，缺的用基础分析补
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiAnalysis {
    pub summary_stats: AiSummaryStats,
    pub key_insights: Vec<SurveyInsight>,
    pub question_analysis: Vec<AiQuestionAnalysis>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSummaryStats {
    pub total_responses: Option<usize>,
    pub average_satisfaction: Option<f64>,
    pub completion_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiQuestionAnalysis {
    pub question_id: i64,
    pub analysis: String,
}

fn normalize_question(mut q: SuggestedQuestion) -> SuggestedQuestion {
    if !q.question_type.needs_options() {
        q.options = None;
    }
    q
}

/// 按主题生成问题建议；任何内部错误都退回固定问题库
pub async fn generate_survey_questions(
    client: &AiClient,
    topic: &str,
    description: &str,
    num_questions: usize,
) -> Vec<SuggestedQuestion> {
    let prompt = prompts::questions_prompt(topic, description, num_questions);

    match request_questions(client, &prompt).await {
        Ok(questions) => questions,
        Err(e) => {
            tracing::warn!("Question generation fell back to defaults: {}", e);
            fallback::default_questions(topic, num_questions)
        }
    }
}

async fn request_questions(
    client: &AiClient,
    prompt: &str,
) -> Result<Vec<SuggestedQuestion>, AiError> {
    let text = client.generate(prompt).await?;
    let questions: Vec<SuggestedQuestion> = extract_json(&text, Bracket::Array)?;
    Ok(questions.into_iter().map(normalize_question).collect())
}

/// 预测问卷表现；任何内部错误都退回公式化预测
pub async fn generate_survey_predictions(
    client: &AiClient,
    title: &str,
    description: &str,
    question_count: usize,
    required_question_count: usize,
    previous_stats: Option<&PreviousStats>,
) -> SurveyPrediction {
    let prompt = prompts::predictions_prompt(
        title,
        description,
        question_count,
        required_question_count,
        previous_stats,
    );

    match request_prediction(client, &prompt).await {
        Ok(prediction) => prediction,
        Err(e) => {
            tracing::warn!("Prediction generation fell back to defaults: {}", e);
            fallback::default_prediction(title, question_count, required_question_count)
        }
    }
}

async fn request_prediction(client: &AiClient, prompt: &str) -> Result<SurveyPrediction, AiError> {
    let text = client.generate(prompt).await?;
    Ok(extract_json(&text, Bracket::Object)?)
}

/// 自由文本叙述式总结；失败时返回固定的失败句而不是错误
pub async fn generate_detailed_analysis(
    client: &AiClient,
    title: &str,
    description: &str,
    responses: &[ResponseWithAnswers],
) -> String {
    let responses_json =
        serde_json::to_string_pretty(responses).unwrap_or_else(|_| "[]".to_string());
    let prompt = prompts::detailed_analysis_prompt(title, description, &responses_json);

    match client.generate(&prompt).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::warn!("Detailed analysis failed: {}", e);
            ANALYSIS_FAILURE_MESSAGE.to_string()
        }
    }
}

/// 结构化分析：基础统计永远先算；响应不足 3 条时不请求 AI，
/// 否则请求并把 AI 字段合并在基础统计之上
pub async fn generate_survey_analysis(
    client: &AiClient,
    results: &SurveyResults,
) -> SurveyAnalysisResult {
    let basic = analytics::basic_analysis(results);

    if results.responses.len() < 3 {
        return basic;
    }

    let prompt = prompts::analysis_prompt(results);
    match request_analysis(client, &prompt).await {
        Ok(ai) => merge_analysis(basic, ai),
        Err(e) => {
            tracing::warn!("AI analysis fell back to basic statistics: {}", e);
            basic
        }
    }
}

async fn request_analysis(client: &AiClient, prompt: &str) -> Result<AiAnalysis, AiError> {
    let text = client.generate(prompt).await?;
    Ok(extract_json(&text, Bracket::Object)?)
}

/// 合并契约：AI 提供的字段优先，缺省字段保留基础分析的值；
/// 逐题统计始终来自基础分析，AI 只能替换分析文字
pub fn merge_analysis(basic: SurveyAnalysisResult, ai: AiAnalysis) -> SurveyAnalysisResult {
    let summary_stats = SummaryStats {
        total_responses: ai
            .summary_stats
            .total_responses
            .unwrap_or(basic.summary_stats.total_responses),
        average_satisfaction: ai
            .summary_stats
            .average_satisfaction
            .or(basic.summary_stats.average_satisfaction),
        completion_rate: ai
            .summary_stats
            .completion_rate
            .or(basic.summary_stats.completion_rate),
    };

    let key_insights = if ai.key_insights.is_empty() {
        basic.key_insights
    } else {
        ai.key_insights
    };

    let question_analysis = basic
        .question_analysis
        .into_iter()
        .map(|mut qa| {
            let ai_text = ai
                .question_analysis
                .iter()
                .find(|a| a.question_id == qa.question_id)
                .map(|a| a.analysis.trim())
                .filter(|t| !t.is_empty());
            if let Some(text) = ai_text {
                qa.analysis = text.to_string();
            }
            qa
        })
        .collect();

    SurveyAnalysisResult {
        summary_stats,
        key_insights,
        question_analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{QuestionAnalysis, QuestionStats};

    fn basic() -> SurveyAnalysisResult {
        SurveyAnalysisResult {
            summary_stats: SummaryStats {
                total_responses: 4,
                average_satisfaction: None,
                completion_rate: Some(1.0),
            },
            key_insights: vec![SurveyInsight {
                insight_type: "general".to_string(),
                title: "Response Summary".to_string(),
                description: "Your survey received 4 responses.".to_string(),
                confidence: 1.0,
                relevance: 10,
            }],
            question_analysis: vec![QuestionAnalysis {
                question_id: 1,
                question_text: "Q1".to_string(),
                analysis: "Received 4 responses to this question.".to_string(),
                stats: QuestionStats::Empty { response_count: 4 },
            }],
        }
    }

    #[test]
    fn merge_prefers_ai_fields_and_keeps_basic_defaults() {
        let ai = AiAnalysis {
            summary_stats: AiSummaryStats {
                total_responses: None,
                average_satisfaction: Some(4.2),
                completion_rate: None,
            },
            key_insights: vec![SurveyInsight {
                insight_type: "trend".to_string(),
                title: "Upward trend".to_string(),
                description: "Satisfaction is rising.".to_string(),
                confidence: 0.8,
                relevance: 7,
            }],
            question_analysis: vec![AiQuestionAnalysis {
                question_id: 1,
                analysis: "Respondents are broadly positive.".to_string(),
            }],
        };

        let merged = merge_analysis(basic(), ai);

        // AI 没给的字段保留基础值
        assert_eq!(merged.summary_stats.total_responses, 4);
        assert_eq!(merged.summary_stats.completion_rate, Some(1.0));
        // AI 给了的字段覆盖
        assert_eq!(merged.summary_stats.average_satisfaction, Some(4.2));
        assert_eq!(merged.key_insights[0].title, "Upward trend");
        assert_eq!(
            merged.question_analysis[0].analysis,
            "Respondents are broadly positive."
        );
        // 逐题统计永远来自基础分析
        assert_eq!(
            merged.question_analysis[0].stats,
            QuestionStats::Empty { response_count: 4 }
        );
    }

    #[test]
    fn merge_with_empty_ai_payload_is_the_basic_analysis() {
        let merged = merge_analysis(basic(), AiAnalysis::default());
        assert_eq!(merged, basic());
    }

    #[test]
    fn ai_question_analysis_with_blank_text_does_not_clobber_basic() {
        let ai = AiAnalysis {
            question_analysis: vec![AiQuestionAnalysis {
                question_id: 1,
                analysis: "   ".to_string(),
            }],
            ..AiAnalysis::default()
        };
        let merged = merge_analysis(basic(), ai);
        assert_eq!(
            merged.question_analysis[0].analysis,
            "Received 4 responses to this question."
        );
    }

    #[test]
    fn normalize_strips_options_from_non_choice_questions() {
        let q = SuggestedQuestion {
            text: "Rate us".to_string(),
            question_type: QuestionType::Rating,
            options: Some(vec!["1".to_string()]),
            required: true,
        };
        assert_eq!(normalize_question(q).options, None);

        let q = SuggestedQuestion {
            text: "Pick one".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: Some(vec!["A".to_string()]),
            required: true,
        };
        assert!(normalize_question(q).options.is_some());
    }

    #[test]
    fn ai_payload_deserializes_with_defensive_defaults() {
        let ai: AiAnalysis = serde_json::from_str(
            r#"{"keyInsights": [{"type": "general", "title": "T", "description": "D"}]}"#,
        )
        .unwrap();
        assert_eq!(ai.key_insights.len(), 1);
        assert_eq!(ai.key_insights[0].confidence, 0.0);
        assert_eq!(ai.key_insights[0].relevance, 0);
        assert!(ai.question_analysis.is_empty());

        let prediction: SurveyPrediction = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(prediction.expected_completion_rate, 0.0);
        assert_eq!(prediction.target_demographic, "Unknown");
        assert!(prediction.recommendations.is_empty());
    }
}
