use serde::{Deserialize, Serialize};

use crate::Embedding;

/// `question_type` discriminator for `POST /ask` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    CorpusSpecific,
    DocumentSpecific,
}

/// One element of `supporting_information`: the wire protocol allows
/// either article/document ids (as a string) or, in practice, cluster
/// labels passed as plain strings; spec §6 types the array as
/// `(string|int)[]` to allow numeric-looking ids without requiring callers
/// to quote them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SupportingInfo {
    Text(String),
    Number(i64),
}

impl SupportingInfo {
    pub fn as_str_value(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub supporting_information: Vec<SupportingInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embedding: Embedding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_document_specific_request() {
        let json = r#"{
            "question": "what dose was used?",
            "question_type": "document-specific",
            "supporting_information": ["123", 456]
        }"#;
        let req: AskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.question_type, QuestionType::DocumentSpecific);
        assert_eq!(req.supporting_information.len(), 2);
        assert_eq!(req.supporting_information[0].as_str_value(), "123");
        assert_eq!(req.supporting_information[1].as_str_value(), "456");
    }
}
