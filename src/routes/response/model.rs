use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::routes::survey::model::{Question, QuestionType};

/// 答案值按所属问题类型取形：单选/文本是字符串，多选是字符串数组，评分是数字。
/// 写入边界做校验，聚合阶段可以穷举匹配而不用运行时探测形状。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Rating(f64),
    Single(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    pub fn matches_type(&self, question_type: QuestionType) -> bool {
        match (question_type, self) {
            (QuestionType::MultipleChoice | QuestionType::Text, AnswerValue::Single(_)) => true,
            (QuestionType::Checkbox, AnswerValue::Multi(_)) => true,
            (QuestionType::Rating, AnswerValue::Rating(n)) => (1.0..=5.0).contains(n),
            _ => false,
        }
    }

    /// 评分聚合用的数字强转：数字直接取值，字符串尝试解析，失败则排除
    pub fn as_rating(&self) -> Option<f64> {
        match self {
            AnswerValue::Rating(n) => Some(*n),
            AnswerValue::Single(s) => s.trim().parse::<f64>().ok(),
            AnswerValue::Multi(_) => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SurveyResponse {
    pub id: i64,
    pub survey_id: i64,
    pub user_id: Option<i64>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: i64,
    pub response_id: i64,
    pub question_id: i64,
    pub value: Json<AnswerValue>,
}

#[derive(Debug, Serialize)]
pub struct ResponseWithAnswers {
    #[serde(flatten)]
    pub response: SurveyResponse,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerInput {
    pub question_id: i64,
    pub value: AnswerValue,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub answers: Vec<AnswerInput>,
}

/// 提交前校验：每个答案必须指向该问卷的问题，且值的形状与题型一致
pub fn validate_answers(
    questions: &[Question],
    answers: &[AnswerInput],
) -> Result<(), String> {
    let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();

    for answer in answers {
        let Some(question) = by_id.get(&answer.question_id) else {
            return Err(format!(
                "Question {} does not belong to this survey",
                answer.question_id
            ));
        };
        let Some(kind) = question.kind() else {
            return Err(format!(
                "Question {} has an unsupported type",
                question.id
            ));
        };
        if !answer.value.matches_type(kind) {
            return Err(format!(
                "Answer value for question {} does not match its {} type",
                question.id,
                kind.as_str()
            ));
        }
    }

    Ok(())
}

impl SurveyResponse {
    /// 响应和答案在同一事务中写入
    pub async fn submit(
        pool: &PgPool,
        survey_id: i64,
        user_id: Option<i64>,
        answers: Vec<AnswerInput>,
    ) -> Result<ResponseWithAnswers, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let response = sqlx::query_as::<_, SurveyResponse>(
            "INSERT INTO responses (survey_id, user_id, submitted_at)
             VALUES ($1, $2, NOW())
             RETURNING id, survey_id, user_id, submitted_at",
        )
        .bind(survey_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut stored = Vec::with_capacity(answers.len());
        for answer in answers {
            let row = sqlx::query_as::<_, Answer>(
                "INSERT INTO answers (response_id, question_id, value)
                 VALUES ($1, $2, $3)
                 RETURNING id, response_id, question_id, value",
            )
            .bind(response.id)
            .bind(answer.question_id)
            .bind(Json(answer.value))
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row);
        }

        tx.commit().await?;

        Ok(ResponseWithAnswers {
            response,
            answers: stored,
        })
    }

    pub async fn list_by_survey(pool: &PgPool, survey_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SurveyResponse>(
            "SELECT id, survey_id, user_id, submitted_at FROM responses
             WHERE survey_id = $1
             ORDER BY submitted_at DESC",
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }
}

impl Answer {
    /// 按响应分组取出答案，调用方再按响应顺序拼装
    pub async fn group_by_response(
        pool: &PgPool,
        responses: &[SurveyResponse],
    ) -> Result<HashMap<i64, Vec<Answer>>, sqlx::Error> {
        let mut grouped: HashMap<i64, Vec<Answer>> = HashMap::new();
        if responses.is_empty() {
            return Ok(grouped);
        }

        let ids: Vec<i64> = responses.iter().map(|r| r.id).collect();
        let rows = sqlx::query_as::<_, Answer>(
            "SELECT id, response_id, question_id, value FROM answers
             WHERE response_id = ANY($1)
             ORDER BY id ASC",
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        for row in rows {
            grouped.entry(row.response_id).or_default().push(row);
        }

        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, question_type: &str, options: Option<Vec<String>>) -> Question {
        Question {
            id,
            survey_id: 1,
            text: "q".to_string(),
            question_type: question_type.to_string(),
            options: options.map(Json),
            order: 0,
            required: false,
        }
    }

    #[test]
    fn answer_value_deserializes_untagged() {
        let single: AnswerValue = serde_json::from_str(r#""Quality""#).unwrap();
        assert_eq!(single, AnswerValue::Single("Quality".into()));

        let multi: AnswerValue = serde_json::from_str(r#"["Quality", "Price"]"#).unwrap();
        assert_eq!(
            multi,
            AnswerValue::Multi(vec!["Quality".into(), "Price".into()])
        );

        let rating: AnswerValue = serde_json::from_str("4").unwrap();
        assert_eq!(rating, AnswerValue::Rating(4.0));
    }

    #[test]
    fn rating_coercion_parses_strings_and_excludes_arrays() {
        assert_eq!(AnswerValue::Rating(3.0).as_rating(), Some(3.0));
        assert_eq!(AnswerValue::Single("4".into()).as_rating(), Some(4.0));
        assert_eq!(AnswerValue::Single("four".into()).as_rating(), None);
        assert_eq!(AnswerValue::Multi(vec!["4".into()]).as_rating(), None);
    }

    #[test]
    fn rating_values_outside_scale_are_rejected() {
        assert!(AnswerValue::Rating(1.0).matches_type(QuestionType::Rating));
        assert!(AnswerValue::Rating(5.0).matches_type(QuestionType::Rating));
        assert!(!AnswerValue::Rating(0.0).matches_type(QuestionType::Rating));
        assert!(!AnswerValue::Rating(6.0).matches_type(QuestionType::Rating));
    }

    #[test]
    fn validate_answers_rejects_foreign_questions() {
        let questions = vec![question(1, "text", None)];
        let answers = vec![AnswerInput {
            question_id: 2,
            value: AnswerValue::Single("hello".into()),
        }];
        assert!(validate_answers(&questions, &answers).is_err());
    }

    #[test]
    fn validate_answers_checks_value_shape() {
        let questions = vec![
            question(1, "multiple_choice", Some(vec!["A".into(), "B".into()])),
            question(2, "checkbox", Some(vec!["A".into(), "B".into()])),
            question(3, "rating", None),
        ];

        let ok = vec![
            AnswerInput {
                question_id: 1,
                value: AnswerValue::Single("A".into()),
            },
            AnswerInput {
                question_id: 2,
                value: AnswerValue::Multi(vec!["A".into(), "B".into()]),
            },
            AnswerInput {
                question_id: 3,
                value: AnswerValue::Rating(5.0),
            },
        ];
        assert!(validate_answers(&questions, &ok).is_ok());

        let wrong_shape = vec![AnswerInput {
            question_id: 2,
            value: AnswerValue::Single("A".into()),
        }];
        assert!(validate_answers(&questions, &wrong_shape).is_err());
    }
}
