//! 提示词模板：纯字符串构造，无副作用，可独立于网络调用测试。

use std::fmt::Write;

use super::PreviousStats;
use crate::routes::survey::model::SurveyResults;

pub fn questions_prompt(topic: &str, description: &str, num_questions: usize) -> String {
    format!(
        r#"
You are an expert survey designer. Please create {num_questions} well-crafted survey questions about the topic: "{topic}".
Additional context: "{description}"

Return a JSON array with each object having:
- text (string)
- type (multiple_choice | checkbox | text | rating)
- options (array<string>, for multiple_choice and checkbox only)
- required (boolean)

Format:
[
  {{
    "text": "...",
    "type": "multiple_choice",
    "options": ["A", "B", "C"],
    "required": true
  }},
  ...
]
"#
    )
}

pub fn predictions_prompt(
    title: &str,
    description: &str,
    question_count: usize,
    required_question_count: usize,
    previous_stats: Option<&PreviousStats>,
) -> String {
    let mut previous_stats_prompt = String::new();
    if let Some(stats) = previous_stats {
        let rate = stats
            .avg_completion_rate
            .map_or_else(|| "Unknown".to_string(), |r| r.to_string());
        let count = stats
            .avg_response_count
            .map_or_else(|| "Unknown".to_string(), |c| c.to_string());
        previous_stats_prompt = format!(
            "\nPrevious survey data:\n- Avg Completion Rate: {rate}%\n- Avg Response Count: {count}\n"
        );
    }

    format!(
        r#"
You are a survey analytics expert. Based on the details below, predict key metrics and give recommendations.

Survey Title: "{title}"
Description: "{description}"
Total Questions: {question_count}
Required Questions: {required_question_count}
{previous_stats_prompt}
Return JSON like:
{{
  "expectedCompletionRate": 85,
  "expectedResponseCount": 40,
  "targetDemographic": "Young professionals aged 25-35",
  "recommendations": [
    "Keep the survey concise",
    "Use incentives",
    ...
  ]
}}
"#
    )
}

pub fn analysis_prompt(results: &SurveyResults) -> String {
    let description = results
        .survey
        .description
        .as_deref()
        .unwrap_or("No description provided");

    let mut questions_block = String::new();
    for q in &results.questions {
        let options = q
            .option_list()
            .map(|o| format!("Options: {}", o.join(", ")))
            .unwrap_or_default();
        let answers = results
            .responses
            .iter()
            .flat_map(|r| r.answers.iter())
            .filter(|a| a.question_id == q.id)
            .map(|a| serde_json::to_string(&a.value).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(
            questions_block,
            "\nQuestion {}: \"{}\" (Type: {})\n{}\nResponses: {}\n",
            q.id, q.text, q.question_type, options, answers
        );
    }

    format!(
        r#"
You are a survey analysis expert. Analyze the following survey results and provide insights.

Survey: "{title}"
Description: "{description}"
Number of responses: {response_count}

The survey has {question_count} questions:
{questions_block}

Based on this data, please provide:
1. A summary of response statistics
2. 3-5 key insights from the data
3. An analysis for each question

Return your analysis as a JSON object with these properties:
{{
  "summaryStats": {{
    "totalResponses": number,
    "averageSatisfaction": number (if applicable),
    "completionRate": number
  }},
  "keyInsights": [
    {{
      "type": string (one of: "general", "improvement", "segment", "trend"),
      "title": string,
      "description": string,
      "confidence": number (between 0-1),
      "relevance": number (between 1-10)
    }}
  ],
  "questionAnalysis": [
    {{
      "questionId": number,
      "analysis": string
    }}
  ]
}}
"#,
        title = results.survey.title,
        response_count = results.responses.len(),
        question_count = results.questions.len(),
    )
}

pub fn detailed_analysis_prompt(title: &str, description: &str, responses_json: &str) -> String {
    format!(
        r#"
You are an expert data analyst. Given the following responses to the survey titled "{title}" with the description "{description}", analyze the responses.

Provide a detailed summary with key insights, trends, and any notable patterns.

Survey Responses:
{responses_json}

Return only the analysis as plain text.
"#
    )
}
