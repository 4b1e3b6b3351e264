//! 问卷结果的逐题统计与基础（非AI）分析。
//!
//! 统计全部在内存中对聚合读出的答案计算，除法统一走 `percentage`/`rounded_average`
//! 保证零答案时输出 0 而不是 NaN。

use serde::{Deserialize, Serialize};

use crate::routes::response::model::{Answer, AnswerValue};
use crate::routes::survey::model::{Question, QuestionType, SurveyResults};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionCount {
    pub option: String,
    pub count: usize,
    pub percentage: u32,
}

/// 单题统计，按题型取形
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum QuestionStats {
    Choice {
        response_count: usize,
        option_counts: Vec<OptionCount>,
    },
    Rating {
        response_count: usize,
        average: f64,
    },
    Text {
        response_count: usize,
        values: Vec<String>,
    },
    /// 未知题型或缺少选项定义：只报响应数
    Empty { response_count: usize },
}

impl QuestionStats {
    pub fn response_count(&self) -> usize {
        match self {
            QuestionStats::Choice { response_count, .. }
            | QuestionStats::Rating { response_count, .. }
            | QuestionStats::Text { response_count, .. }
            | QuestionStats::Empty { response_count } => *response_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyInsight {
    #[serde(rename = "type")]
    pub insight_type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub relevance: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryStats {
    pub total_responses: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_satisfaction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalysis {
    pub question_id: i64,
    pub question_text: String,
    pub analysis: String,
    pub stats: QuestionStats,
}

/// 持久化到 analyses.insights 的结构化洞察包
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnalysisResult {
    pub summary_stats: SummaryStats,
    pub key_insights: Vec<SurveyInsight>,
    pub question_analysis: Vec<QuestionAnalysis>,
}

fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

fn rounded_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().sum();
    (sum / values.len() as f64 * 10.0).round() / 10.0
}

fn count_options(options: &[String], matches: impl Fn(&str) -> usize) -> Vec<usize> {
    options.iter().map(|option| matches(option)).collect()
}

/// 单题统计推导。
///
/// 声明过的选项才计数，未声明的答案值静默忽略；评分做数字强转，强转失败的
/// 值不进分母；文本题原样给出有序值列表。
pub fn question_statistics(question: &Question, answers: &[&Answer]) -> QuestionStats {
    let response_count = answers.len();

    let Some(kind) = question.kind() else {
        return QuestionStats::Empty { response_count };
    };

    match kind {
        QuestionType::MultipleChoice => {
            let Some(options) = question.option_list() else {
                return QuestionStats::Empty { response_count };
            };
            let counts = count_options(options, |option| {
                answers
                    .iter()
                    .filter(|a| matches!(&a.value.0, AnswerValue::Single(v) if v == option))
                    .count()
            });
            QuestionStats::Choice {
                response_count,
                option_counts: build_option_counts(options, &counts, response_count),
            }
        }
        QuestionType::Checkbox => {
            let Some(options) = question.option_list() else {
                return QuestionStats::Empty { response_count };
            };
            // 一次作答可以同时命中多个选项
            let counts = count_options(options, |option| {
                answers
                    .iter()
                    .filter(
                        |a| matches!(&a.value.0, AnswerValue::Multi(vs) if vs.iter().any(|v| v == option)),
                    )
                    .count()
            });
            QuestionStats::Choice {
                response_count,
                option_counts: build_option_counts(options, &counts, response_count),
            }
        }
        QuestionType::Rating => {
            let values: Vec<f64> = answers.iter().filter_map(|a| a.value.0.as_rating()).collect();
            QuestionStats::Rating {
                response_count,
                average: rounded_average(&values),
            }
        }
        QuestionType::Text => {
            let values = answers
                .iter()
                .filter_map(|a| match &a.value.0 {
                    AnswerValue::Single(v) => Some(v.clone()),
                    _ => None,
                })
                .collect();
            QuestionStats::Text {
                response_count,
                values,
            }
        }
    }
}

fn build_option_counts(
    options: &[String],
    counts: &[usize],
    response_count: usize,
) -> Vec<OptionCount> {
    options
        .iter()
        .zip(counts)
        .map(|(option, &count)| OptionCount {
            option: option.clone(),
            count,
            percentage: percentage(count, response_count),
        })
        .collect()
}

fn answers_for_question<'a>(results: &'a SurveyResults, question_id: i64) -> Vec<&'a Answer> {
    results
        .responses
        .iter()
        .flat_map(|r| r.answers.iter())
        .filter(|a| a.question_id == question_id)
        .collect()
}

/// 基础统计分析：AI 不可用或响应过少时的兜底，同时也是 AI 结果合并时的默认值来源
pub fn basic_analysis(results: &SurveyResults) -> SurveyAnalysisResult {
    let total_responses = results.responses.len();

    let key_insights = vec![SurveyInsight {
        insight_type: "general".to_string(),
        title: "Response Summary".to_string(),
        description: format!("Your survey received {} responses.", total_responses),
        confidence: 1.0,
        relevance: 10,
    }];

    let question_analysis = results
        .questions
        .iter()
        .map(|question| {
            let answers = answers_for_question(results, question.id);
            let stats = question_statistics(question, &answers);
            let mut analysis = format!(
                "Received {} responses to this question.",
                answers.len()
            );

            match &stats {
                QuestionStats::Choice { option_counts, .. }
                    if question.kind() == Some(QuestionType::MultipleChoice) =>
                {
                    // 并列时取声明顺序靠前的选项
                    let most_common = option_counts
                        .iter()
                        .reduce(|best, o| if o.count > best.count { o } else { best })
                        .filter(|o| o.count > 0);
                    if let Some(most_common) = most_common {
                        analysis.push_str(&format!(
                            " Most common response: \"{}\" ({}%).",
                            most_common.option, most_common.percentage
                        ));
                    }
                }
                QuestionStats::Rating { average, .. } if !answers.is_empty() => {
                    analysis.push_str(&format!(" Average rating: {:.1} out of 5.", average));
                }
                _ => {}
            }

            QuestionAnalysis {
                question_id: question.id,
                question_text: question.text.clone(),
                analysis,
                stats,
            }
        })
        .collect();

    SurveyAnalysisResult {
        summary_stats: SummaryStats {
            total_responses,
            average_satisfaction: None,
            completion_rate: Some(if total_responses > 0 { 1.0 } else { 0.0 }),
        },
        key_insights,
        question_analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::response::model::{ResponseWithAnswers, SurveyResponse};
    use chrono::Utc;
    use sqlx::types::Json;

    fn question(id: i64, question_type: &str, options: Option<Vec<&str>>) -> Question {
        Question {
            id,
            survey_id: 1,
            text: format!("Question {}", id),
            question_type: question_type.to_string(),
            options: options.map(|o| Json(o.into_iter().map(String::from).collect())),
            order: 0,
            required: false,
        }
    }

    fn answer(question_id: i64, value: AnswerValue) -> Answer {
        Answer {
            id: 0,
            response_id: 0,
            question_id,
            value: Json(value),
        }
    }

    fn results_with(questions: Vec<Question>, answer_sets: Vec<Vec<Answer>>) -> SurveyResults {
        let responses = answer_sets
            .into_iter()
            .enumerate()
            .map(|(i, answers)| ResponseWithAnswers {
                response: SurveyResponse {
                    id: i as i64 + 1,
                    survey_id: 1,
                    user_id: None,
                    submitted_at: Utc::now(),
                },
                answers,
            })
            .collect();

        SurveyResults {
            survey: crate::routes::survey::model::Survey {
                id: 1,
                title: "Coffee habits".to_string(),
                description: None,
                user_id: 7,
                is_public: true,
                is_active: true,
                start_date: Utc::now(),
                end_date: None,
                created_at: Utc::now(),
            },
            questions,
            responses,
            analysis: None,
        }
    }

    #[test]
    fn multiple_choice_counts_and_percentages() {
        let q = question(1, "multiple_choice", Some(vec!["A", "B"]));
        let answers = [
            answer(1, AnswerValue::Single("A".into())),
            answer(1, AnswerValue::Single("A".into())),
            answer(1, AnswerValue::Single("B".into())),
        ];
        let refs: Vec<&Answer> = answers.iter().collect();

        let stats = question_statistics(&q, &refs);
        assert_eq!(
            stats,
            QuestionStats::Choice {
                response_count: 3,
                option_counts: vec![
                    OptionCount {
                        option: "A".into(),
                        count: 2,
                        percentage: 67
                    },
                    OptionCount {
                        option: "B".into(),
                        count: 1,
                        percentage: 33
                    },
                ],
            }
        );
    }

    #[test]
    fn undeclared_option_values_are_ignored() {
        let q = question(1, "multiple_choice", Some(vec!["A", "B"]));
        let answers = [answer(1, AnswerValue::Single("C".into()))];
        let refs: Vec<&Answer> = answers.iter().collect();

        let QuestionStats::Choice { option_counts, .. } = question_statistics(&q, &refs) else {
            panic!("expected choice stats");
        };
        assert!(option_counts.iter().all(|o| o.count == 0));
        assert_eq!(option_counts.len(), 2);
    }

    #[test]
    fn checkbox_answers_increment_every_matching_option() {
        let q = question(1, "checkbox", Some(vec!["Quality", "Price", "Other"]));
        let answers = [
            answer(1, AnswerValue::Multi(vec!["Quality".into(), "Price".into()])),
            answer(1, AnswerValue::Multi(vec!["Quality".into()])),
        ];
        let refs: Vec<&Answer> = answers.iter().collect();

        let QuestionStats::Choice { option_counts, .. } = question_statistics(&q, &refs) else {
            panic!("expected choice stats");
        };
        assert_eq!(option_counts[0].count, 2);
        assert_eq!(option_counts[1].count, 1);
        assert_eq!(option_counts[2].count, 0);
        assert_eq!(option_counts[0].percentage, 100);
    }

    #[test]
    fn rating_average_over_coerced_values() {
        let q = question(1, "rating", None);
        let answers = [
            answer(1, AnswerValue::Rating(3.0)),
            answer(1, AnswerValue::Rating(4.0)),
            answer(1, AnswerValue::Rating(5.0)),
        ];
        let refs: Vec<&Answer> = answers.iter().collect();

        assert_eq!(
            question_statistics(&q, &refs),
            QuestionStats::Rating {
                response_count: 3,
                average: 4.0
            }
        );
    }

    #[test]
    fn rating_excludes_uncoercible_values_from_denominator() {
        let q = question(1, "rating", None);
        let answers = [
            answer(1, AnswerValue::Rating(2.0)),
            answer(1, AnswerValue::Single("4".into())),
            answer(1, AnswerValue::Single("not a number".into())),
        ];
        let refs: Vec<&Answer> = answers.iter().collect();

        // 强转失败的值不进分母：(2 + 4) / 2
        assert_eq!(
            question_statistics(&q, &refs),
            QuestionStats::Rating {
                response_count: 3,
                average: 3.0
            }
        );
    }

    #[test]
    fn zero_answers_never_produce_nan() {
        let mc = question(1, "multiple_choice", Some(vec!["A"]));
        let rating = question(2, "rating", None);
        let refs: Vec<&Answer> = Vec::new();

        let QuestionStats::Choice { option_counts, .. } = question_statistics(&mc, &refs) else {
            panic!("expected choice stats");
        };
        assert_eq!(option_counts[0].percentage, 0);

        assert_eq!(
            question_statistics(&rating, &refs),
            QuestionStats::Rating {
                response_count: 0,
                average: 0.0
            }
        );
    }

    #[test]
    fn text_stats_expose_ordered_values() {
        let q = question(1, "text", None);
        let answers = [
            answer(1, AnswerValue::Single("first".into())),
            answer(1, AnswerValue::Single("second".into())),
        ];
        let refs: Vec<&Answer> = answers.iter().collect();

        assert_eq!(
            question_statistics(&q, &refs),
            QuestionStats::Text {
                response_count: 2,
                values: vec!["first".into(), "second".into()],
            }
        );
    }

    #[test]
    fn unknown_question_type_reports_count_only() {
        let q = question(1, "slider", None);
        let answers = [answer(1, AnswerValue::Rating(3.0))];
        let refs: Vec<&Answer> = answers.iter().collect();

        assert_eq!(
            question_statistics(&q, &refs),
            QuestionStats::Empty { response_count: 1 }
        );
    }

    #[test]
    fn basic_analysis_summarizes_each_question() {
        let results = results_with(
            vec![
                question(1, "multiple_choice", Some(vec!["Yes", "No"])),
                question(2, "rating", None),
                question(3, "text", None),
            ],
            vec![
                vec![
                    answer(1, AnswerValue::Single("Yes".into())),
                    answer(2, AnswerValue::Rating(4.0)),
                    answer(3, AnswerValue::Single("fine".into())),
                ],
                vec![
                    answer(1, AnswerValue::Single("Yes".into())),
                    answer(2, AnswerValue::Rating(5.0)),
                ],
            ],
        );

        let analysis = basic_analysis(&results);

        assert_eq!(analysis.summary_stats.total_responses, 2);
        assert_eq!(analysis.summary_stats.completion_rate, Some(1.0));
        assert_eq!(analysis.key_insights.len(), 1);
        assert!(
            analysis.key_insights[0]
                .description
                .contains("received 2 responses")
        );

        let mc = &analysis.question_analysis[0];
        assert!(mc.analysis.contains("Most common response: \"Yes\" (100%)"));

        let rating = &analysis.question_analysis[1];
        assert!(rating.analysis.contains("Average rating: 4.5 out of 5."));

        let text = &analysis.question_analysis[2];
        assert_eq!(text.analysis, "Received 1 responses to this question.");
    }

    #[test]
    fn basic_analysis_of_empty_survey_reports_zero_completion() {
        let results = results_with(vec![question(1, "text", None)], vec![]);
        let analysis = basic_analysis(&results);
        assert_eq!(analysis.summary_stats.total_responses, 0);
        assert_eq!(analysis.summary_stats.completion_rate, Some(0.0));
    }
}
