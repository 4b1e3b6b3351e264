use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON {0} found in model output")]
    Missing(&'static str),
    #[error("failed to parse extracted JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Object,
    Array,
}

impl Bracket {
    fn delimiters(self) -> (char, char, &'static str) {
        match self {
            Bracket::Object => ('{', '}', "object"),
            Bracket::Array => ('[', ']', "array"),
        }
    }
}

/// 从模型的自由文本回复中切出期望形状的 JSON 并解析。
///
/// 先剥掉 Markdown 代码围栏，再取第一个开括号到最后一个同类闭括号之间的
/// 片段交给 serde_json；任何一步失败都以 ParseError 返回，由调用方走兜底。
pub fn extract_json<T: DeserializeOwned>(text: &str, bracket: Bracket) -> Result<T, ParseError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let (open, close, label) = bracket.delimiters();
    let start = cleaned.find(open).ok_or(ParseError::Missing(label))?;
    let end = cleaned.rfind(close).ok_or(ParseError::Missing(label))?;
    if end < start {
        return Err(ParseError::Missing(label));
    }

    Ok(serde_json::from_str(&cleaned[start..=end])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let text = "Sure! Here is the analysis:\n{\"a\": 1}\nLet me know if you need more.";
        let value: Value = extract_json(text, Bracket::Object).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn strips_code_fences() {
        let text = "```json\n[{\"text\": \"Q1\"}]\n```";
        let value: Value = extract_json(text, Bracket::Array).unwrap();
        assert_eq!(value[0]["text"], "Q1");
    }

    #[test]
    fn uses_first_open_and_last_close_bracket() {
        let text = "{\"outer\": {\"inner\": true}} trailing";
        let value: Value = extract_json(text, Bracket::Object).unwrap();
        assert_eq!(value["outer"]["inner"], true);
    }

    #[test]
    fn missing_bracket_is_an_error() {
        let err = extract_json::<Value>("no json here", Bracket::Array).unwrap_err();
        assert!(matches!(err, ParseError::Missing("array")));
    }

    #[test]
    fn close_before_open_is_an_error() {
        let err = extract_json::<Value>("] oops [", Bracket::Array).unwrap_err();
        assert!(matches!(err, ParseError::Missing("array")));
    }

    #[test]
    fn unparseable_slice_is_an_error() {
        let err = extract_json::<Value>("{not json}", Bracket::Object).unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }
}
