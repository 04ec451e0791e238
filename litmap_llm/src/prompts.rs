//! The four prompt templates fixed by spec §6 ("Prompt contracts").

/// Accepts an ordered keyword list; must return JSON `{label, description}`.
pub const TOPIC_METADATA_PROMPT: &str = "\
You are labeling a topic discovered in a biomedical literature corpus.
The topic's most representative keywords, most important first, are:
{keywords}

Return only JSON of the form {{\"label\": string, \"description\": string}}.
`label` must be at most 3 words and contain no punctuation.
`description` must be at most 15 words.";

/// Accepts two child `{label, description}` pairs; returns the same shape.
pub const PARENT_CLUSTER_METADATA_PROMPT: &str = "\
You are labeling the parent of two topic clusters in a biomedical literature
hierarchy. The first child is labeled \"{left_label}\": {left_description}
The second child is labeled \"{right_label}\": {right_description}

Return only JSON of the form {{\"label\": string, \"description\": string}}
describing a topic general enough to cover both children.
`label` must be at most 3 words and contain no punctuation.
`description` must be at most 15 words.";

/// Returns `{intent, parameters}` restricted to the three intents in
/// spec §4.11.
pub const INTENT_PARSER_PROMPT: &str = "\
Classify the following question about a corpus of biomedical literature
into exactly one of these intents:
  - list_topics_in_cluster: parameters {{\"cluster\": [phrase, ...]}}
  - list_questions_in_cluster: parameters {{\"cluster\": [phrase, ...]}}
  - get_corpus_info: parameters {{}}

Question: {question}

Return only JSON of the form {{\"intent\": string, \"parameters\": object}}.";

/// Accepts `{user_query, retrieved_data}`; returns free text.
pub const ANSWER_SYNTHESIS_PROMPT: &str = "\
Answer the user's question using only the retrieved data below. If the
data does not contain the answer, say so plainly.

Question: {user_query}

Retrieved data:
{retrieved_data}";

pub fn topic_metadata_prompt(keywords: &[String]) -> String {
    TOPIC_METADATA_PROMPT.replace("{keywords}", &keywords.join(", "))
}

pub fn parent_cluster_metadata_prompt(
    left_label: &str,
    left_description: &str,
    right_label: &str,
    right_description: &str,
) -> String {
    PARENT_CLUSTER_METADATA_PROMPT
        .replace("{left_label}", left_label)
        .replace("{left_description}", left_description)
        .replace("{right_label}", right_label)
        .replace("{right_description}", right_description)
}

pub fn intent_parser_prompt(question: &str) -> String {
    INTENT_PARSER_PROMPT.replace("{question}", question)
}

pub fn answer_synthesis_prompt(user_query: &str, retrieved_data: &str) -> String {
    ANSWER_SYNTHESIS_PROMPT
        .replace("{user_query}", user_query)
        .replace("{retrieved_data}", retrieved_data)
}
