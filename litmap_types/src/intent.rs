use serde::{Deserialize, Serialize};

/// The three corpus-specific question intents the LLM gateway's intent
/// parser restricts itself to (spec §4.11, glossary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "parameters", rename_all = "snake_case")]
pub enum Intent {
    ListTopicsInCluster { cluster: Vec<String> },
    ListQuestionsInCluster { cluster: Vec<String> },
    GetCorpusInfo,
}
