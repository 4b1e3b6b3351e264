//! AI 后端不可用或输出不可解析时的确定性兜底。

use super::{SuggestedQuestion, SurveyPrediction};
use crate::routes::survey::model::QuestionType;

/// 固定的五道通用问题，把主题代入题干后截断到请求数量
pub fn default_questions(topic: &str, num_questions: usize) -> Vec<SuggestedQuestion> {
    let questions = vec![
        SuggestedQuestion {
            text: format!("How would you rate your overall satisfaction with {topic}?"),
            question_type: QuestionType::Rating,
            options: None,
            required: true,
        },
        SuggestedQuestion {
            text: format!("What aspects of {topic} are most important to you?"),
            question_type: QuestionType::Checkbox,
            options: Some(vec![
                "Quality".to_string(),
                "Price".to_string(),
                "Features".to_string(),
                "Customer Service".to_string(),
                "Other".to_string(),
            ]),
            required: true,
        },
        SuggestedQuestion {
            text: format!("How likely are you to recommend {topic}?"),
            question_type: QuestionType::MultipleChoice,
            options: Some(vec![
                "Very likely".to_string(),
                "Somewhat likely".to_string(),
                "Neutral".to_string(),
                "Somewhat unlikely".to_string(),
                "Very unlikely".to_string(),
            ]),
            required: true,
        },
        SuggestedQuestion {
            text: format!("What improvements would you suggest for {topic}?"),
            question_type: QuestionType::Text,
            options: None,
            required: false,
        },
        SuggestedQuestion {
            text: format!("How often do you use or interact with {topic}?"),
            question_type: QuestionType::MultipleChoice,
            options: Some(vec![
                "Daily".to_string(),
                "Weekly".to_string(),
                "Monthly".to_string(),
                "Rarely".to_string(),
                "Never".to_string(),
            ]),
            required: true,
        },
    ];

    questions.into_iter().take(num_questions).collect()
}

/// 完成率按必答题占比估算并夹在 [50, 95]，响应数用固定常量
pub fn default_prediction(
    title: &str,
    question_count: usize,
    required_question_count: usize,
) -> SurveyPrediction {
    let rate = if question_count == 0 {
        100.0
    } else {
        100.0 - required_question_count as f64 / question_count as f64 * 15.0
    };

    SurveyPrediction {
        expected_completion_rate: rate.round().clamp(50.0, 95.0),
        expected_response_count: 30.0,
        target_demographic: format!("General audience interested in {title}"),
        recommendations: vec![
            "Keep surveys short".to_string(),
            "Use incentives".to_string(),
            "Use clear and engaging language".to_string(),
            "Use diverse question types".to_string(),
            "Share survey results with respondents".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_questions_substitute_topic_and_truncate() {
        let questions = default_questions("Topic", 3);
        assert_eq!(questions.len(), 3);
        for q in &questions {
            assert!(q.text.contains("Topic"));
        }
        assert_eq!(questions[0].question_type, QuestionType::Rating);
        assert_eq!(questions[1].question_type, QuestionType::Checkbox);
        assert_eq!(questions[2].question_type, QuestionType::MultipleChoice);
    }

    #[test]
    fn default_questions_cap_at_library_size() {
        assert_eq!(default_questions("X", 10).len(), 5);
    }

    #[test]
    fn prediction_formula_matches_expected_rate() {
        // round(100 - 5/10 * 15) = 93
        let prediction = default_prediction("Customer survey", 10, 5);
        assert_eq!(prediction.expected_completion_rate, 93.0);
        assert_eq!(prediction.expected_response_count, 30.0);
        assert!(prediction.target_demographic.contains("Customer survey"));
        assert_eq!(prediction.recommendations.len(), 5);
    }

    #[test]
    fn prediction_rate_is_clamped() {
        // 100 - 10/10 * 15 = 85；全部必答仍在上限内
        assert_eq!(default_prediction("T", 10, 10).expected_completion_rate, 85.0);
        // 必答数超过题数时强行压到下限
        assert_eq!(default_prediction("T", 1, 20).expected_completion_rate, 50.0);
        // 无必答题时夹到上限
        assert_eq!(default_prediction("T", 10, 0).expected_completion_rate, 95.0);
        // 零题不会除零
        assert_eq!(default_prediction("T", 0, 0).expected_completion_rate, 95.0);
    }
}
