use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

/// Approximate token count used for context-window budgeting (spec §4.11).
/// The chat model behind the LLM gateway is configurable, so `cl100k_base`
/// is a stand-in tokenizer rather than the exact one the configured model
/// uses; it is close enough to keep the answer prompt under budget.
pub fn count_tokens(text: &str) -> usize {
    tokenizer().encode_ordinary(text).len()
}

fn tokenizer() -> &'static CoreBPE {
    static TOKENIZER: OnceLock<CoreBPE> = OnceLock::new();
    TOKENIZER.get_or_init(|| tiktoken_rs::cl100k_base().expect("failed to initialize cl100k tokenizer"))
}
