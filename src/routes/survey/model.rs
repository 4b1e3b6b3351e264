use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::routes::response::model::{Answer, ResponseWithAnswers, SurveyResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Checkbox,
    Text,
    Rating,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Text => "text",
            QuestionType::Rating => "rating",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "checkbox" => Some(QuestionType::Checkbox),
            "text" => Some(QuestionType::Text),
            "rating" => Some(QuestionType::Rating),
            _ => None,
        }
    }

    pub fn needs_options(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Checkbox)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Survey {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub is_public: bool,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub survey_id: i64,
    pub text: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,
    pub options: Option<Json<Vec<String>>>,
    pub order: i32,
    pub required: bool,
}

impl Question {
    pub fn kind(&self) -> Option<QuestionType> {
        QuestionType::parse(&self.question_type)
    }

    pub fn option_list(&self) -> Option<&[String]> {
        self.options.as_ref().map(|o| o.0.as_slice())
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Analysis {
    pub id: i64,
    pub survey_id: i64,
    pub insights: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SurveyWithQuestions {
    #[serde(flatten)]
    pub survey: Survey,
    pub questions: Vec<Question>,
}

/// 聚合结果：问卷 + 有序问题 + 全部响应（含答案）+ 最新分析
#[derive(Debug, Serialize)]
pub struct SurveyResults {
    #[serde(flatten)]
    pub survey: Survey,
    pub questions: Vec<Question>,
    pub responses: Vec<ResponseWithAnswers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuestionRequest {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Option<Vec<String>>,
    pub order: i32,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateSurveyRequest {
    pub title: String,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub is_active: Option<bool>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub questions: Vec<CreateQuestionRequest>,
}

impl CreateSurveyRequest {
    /// 创建前校验：标题非空、选项与题型匹配、order 在问卷内稠密且唯一（0..n-1）
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.questions.is_empty() {
            return Err("At least one question is required".to_string());
        }

        for q in &self.questions {
            if q.text.trim().is_empty() {
                return Err("Question text is required".to_string());
            }
            let has_options = q.options.as_ref().is_some_and(|o| !o.is_empty());
            if q.question_type.needs_options() && !has_options {
                return Err(format!(
                    "Question \"{}\" requires answer options",
                    q.text
                ));
            }
            if !q.question_type.needs_options() && q.options.is_some() {
                return Err(format!(
                    "Question \"{}\" must not carry answer options",
                    q.text
                ));
            }
        }

        let mut orders: Vec<i32> = self.questions.iter().map(|q| q.order).collect();
        orders.sort_unstable();
        let dense = orders
            .iter()
            .enumerate()
            .all(|(i, &o)| o == i as i32);
        if !dense {
            return Err("Question order must be unique and dense (0..n-1)".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
}

const SURVEY_COLUMNS: &str =
    "id, title, description, user_id, is_public, is_active, start_date, end_date, created_at";

const QUESTION_COLUMNS: &str = r#"id, survey_id, text, "type", options, "order", required"#;

/// 级联删除的清理步骤，顺序即不变量：答案 → 响应 → 问题 → 分析 → 问卷
pub const CASCADE_DELETE_STEPS: [&str; 5] = [
    "DELETE FROM answers WHERE response_id IN (SELECT id FROM responses WHERE survey_id = $1)",
    "DELETE FROM responses WHERE survey_id = $1",
    "DELETE FROM questions WHERE survey_id = $1",
    "DELETE FROM analyses WHERE survey_id = $1",
    "DELETE FROM surveys WHERE id = $1",
];

impl Survey {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        req: CreateSurveyRequest,
    ) -> Result<SurveyWithQuestions, sqlx::Error> {
        // 问卷和问题在同一事务中写入，校验失败或任一插入失败则整体回滚
        let mut tx = pool.begin().await?;

        let survey = sqlx::query_as::<_, Survey>(&format!(
            "INSERT INTO surveys (title, description, user_id, is_public, is_active, start_date, end_date, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
             RETURNING {SURVEY_COLUMNS}"
        ))
        .bind(&req.title)
        .bind(&req.description)
        .bind(user_id)
        .bind(req.is_public.unwrap_or(true))
        .bind(req.is_active.unwrap_or(true))
        .bind(req.start_date)
        .bind(req.end_date)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(req.questions.len());
        for q in req.questions {
            let options = if q.question_type.needs_options() {
                q.options.map(Json)
            } else {
                None
            };
            let question = sqlx::query_as::<_, Question>(&format!(
                r#"INSERT INTO questions (survey_id, text, "type", options, "order", required)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   RETURNING {QUESTION_COLUMNS}"#
            ))
            .bind(survey.id)
            .bind(&q.text)
            .bind(q.question_type.as_str())
            .bind(options)
            .bind(q.order)
            .bind(q.required)
            .fetch_one(&mut *tx)
            .await?;
            questions.push(question);
        }

        tx.commit().await?;

        Ok(SurveyWithQuestions { survey, questions })
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Survey>(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn with_questions(
        pool: &PgPool,
        id: i64,
    ) -> Result<Option<SurveyWithQuestions>, sqlx::Error> {
        let Some(survey) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let questions = Question::list_by_survey(pool, id).await?;
        Ok(Some(SurveyWithQuestions { survey, questions }))
    }

    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Survey>(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys
             WHERE user_id = $1 AND is_active = TRUE
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_public(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Survey>(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys
             WHERE is_public = TRUE AND is_active = TRUE
             ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// 可作答问卷：公开且启用，排除本人创建的以及已作答过的。
    /// 两个条件放在同一条语句里，作答集合与问卷集合取自同一快照。
    pub async fn list_answerable(
        pool: &PgPool,
        user_id: Option<i64>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match user_id {
            None => Self::list_public(pool).await,
            Some(user_id) => {
                sqlx::query_as::<_, Survey>(&format!(
                    "SELECT {SURVEY_COLUMNS} FROM surveys
                     WHERE is_public = TRUE AND is_active = TRUE
                       AND user_id <> $1
                       AND id NOT IN (SELECT survey_id FROM responses WHERE user_id = $1)
                     ORDER BY created_at DESC"
                ))
                .bind(user_id)
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn list_answered(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Survey>(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys
             WHERE id IN (SELECT survey_id FROM responses WHERE user_id = $1)
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_inactive(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Survey>(&format!(
            "SELECT {SURVEY_COLUMNS} FROM surveys
             WHERE user_id = $1 AND is_active = FALSE
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        is_active: Option<bool>,
        is_public: Option<bool>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Survey>(&format!(
            "UPDATE surveys
             SET is_active = COALESCE($2, is_active),
                 is_public = COALESCE($3, is_public)
             WHERE id = $1
             RETURNING {SURVEY_COLUMNS}"
        ))
        .bind(id)
        .bind(is_active)
        .bind(is_public)
        .fetch_one(pool)
        .await
    }

    /// 级联删除：按 CASCADE_DELETE_STEPS 的顺序在单个事务中执行，
    /// 任一步失败则全部回滚，不会留下孤儿行
    pub async fn delete_cascade(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for step in CASCADE_DELETE_STEPS {
            sqlx::query(step).bind(id).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// 聚合读取：各查询独立执行，不共享事务（读期间新提交的响应可容忍）
    pub async fn results(pool: &PgPool, id: i64) -> Result<Option<SurveyResults>, sqlx::Error> {
        let Some(SurveyWithQuestions { survey, questions }) =
            Self::with_questions(pool, id).await?
        else {
            return Ok(None);
        };

        let rows = SurveyResponse::list_by_survey(pool, id).await?;
        let mut grouped = Answer::group_by_response(pool, &rows).await?;

        let responses = rows
            .into_iter()
            .map(|response| {
                let answers = grouped.remove(&response.id).unwrap_or_default();
                ResponseWithAnswers { response, answers }
            })
            .collect();

        let analysis = Analysis::latest(pool, id).await?;

        Ok(Some(SurveyResults {
            survey,
            questions,
            responses,
            analysis,
        }))
    }
}

impl Question {
    pub async fn list_by_survey(pool: &PgPool, survey_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Question>(&format!(
            r#"SELECT {QUESTION_COLUMNS} FROM questions
               WHERE survey_id = $1
               ORDER BY "order" ASC"#
        ))
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }
}

impl Analysis {
    pub async fn create(
        pool: &PgPool,
        survey_id: i64,
        insights: Value,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Analysis>(
            "INSERT INTO analyses (survey_id, insights, created_at)
             VALUES ($1, $2, NOW())
             RETURNING id, survey_id, insights, created_at",
        )
        .bind(survey_id)
        .bind(Json(insights))
        .fetch_one(pool)
        .await
    }

    /// 历史分析可以有多条，读取永远取最新一条
    pub async fn latest(pool: &PgPool, survey_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Analysis>(
            "SELECT id, survey_id, insights, created_at FROM analyses
             WHERE survey_id = $1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(survey_id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request(questions: Vec<CreateQuestionRequest>) -> CreateSurveyRequest {
        CreateSurveyRequest {
            title: "Customer feedback".to_string(),
            description: None,
            is_public: None,
            is_active: None,
            start_date: Utc::now(),
            end_date: None,
            questions,
        }
    }

    fn question(
        question_type: QuestionType,
        options: Option<Vec<String>>,
        order: i32,
    ) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: "How satisfied are you?".to_string(),
            question_type,
            options,
            order,
            required: false,
        }
    }

    #[test]
    fn validate_accepts_dense_orders() {
        let req = base_request(vec![
            question(QuestionType::Rating, None, 1),
            question(QuestionType::Text, None, 0),
        ]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validate_rejects_gapped_orders() {
        let req = base_request(vec![
            question(QuestionType::Rating, None, 0),
            question(QuestionType::Text, None, 2),
        ]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_orders() {
        let req = base_request(vec![
            question(QuestionType::Rating, None, 0),
            question(QuestionType::Text, None, 0),
        ]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_requires_options_for_choice_questions() {
        let req = base_request(vec![question(QuestionType::MultipleChoice, None, 0)]);
        assert!(req.validate().is_err());

        let req = base_request(vec![question(
            QuestionType::MultipleChoice,
            Some(vec!["Yes".into(), "No".into()]),
            0,
        )]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validate_rejects_options_on_text_questions() {
        let req = base_request(vec![question(
            QuestionType::Text,
            Some(vec!["Yes".into()]),
            0,
        )]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_title() {
        let mut req = base_request(vec![question(QuestionType::Text, None, 0)]);
        req.title = "  ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn cascade_steps_delete_children_before_parent() {
        assert!(CASCADE_DELETE_STEPS[0].contains("answers"));
        assert!(CASCADE_DELETE_STEPS[1].contains("responses"));
        assert!(CASCADE_DELETE_STEPS[2].contains("questions"));
        assert!(CASCADE_DELETE_STEPS[3].contains("analyses"));
        assert!(CASCADE_DELETE_STEPS[4].contains("surveys"));
    }

    #[test]
    fn question_type_round_trips_through_strings() {
        for t in [
            QuestionType::MultipleChoice,
            QuestionType::Checkbox,
            QuestionType::Text,
            QuestionType::Rating,
        ] {
            assert_eq!(QuestionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(QuestionType::parse("slider"), None);
    }
}
