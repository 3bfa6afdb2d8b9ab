//! Static model catalog.
//!
//! The session controller only ever consumes the identifier string; the
//! display metadata exists for the picker and the status line.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Mistral,
    Google,
    Perplexity,
    Meta,
}

impl Provider {
    pub fn label(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Mistral => "Mistral",
            Provider::Google => "Google",
            Provider::Perplexity => "Perplexity",
            Provider::Meta => "Meta",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
    pub provider: Provider,
    pub premium: bool,
}

pub const MODEL_CATALOG: &[ModelOption] = &[
    ModelOption { id: "gpt-3.5-turbo", label: "GPT-3.5 Turbo", provider: Provider::OpenAi, premium: false },
    ModelOption { id: "gpt-4-turbo-preview", label: "GPT-4 Turbo Preview", provider: Provider::OpenAi, premium: true },
    ModelOption { id: "gpt-4o", label: "GPT-4o", provider: Provider::OpenAi, premium: true },
    ModelOption { id: "gpt-4o-mini", label: "GPT-4o mini", provider: Provider::OpenAi, premium: false },
    ModelOption { id: "claude-3-haiku-20240307", label: "Claude 3 Haiku", provider: Provider::Anthropic, premium: false },
    ModelOption { id: "claude-3-sonnet-20240229", label: "Claude 3 Sonnet", provider: Provider::Anthropic, premium: true },
    ModelOption { id: "claude-3-opus-20240229", label: "Claude 3 Opus", provider: Provider::Anthropic, premium: true },
    ModelOption { id: "claude-3-5-sonnet-20240620", label: "Claude 3.5 Sonnet", provider: Provider::Anthropic, premium: true },
    ModelOption { id: "mistral-tiny-2312", label: "Mistral Tiny", provider: Provider::Mistral, premium: false },
    ModelOption { id: "mistral-small-2312", label: "Mistral Small", provider: Provider::Mistral, premium: false },
    ModelOption { id: "mistral-small-2402", label: "Mistral Small Latest", provider: Provider::Mistral, premium: false },
    ModelOption { id: "mistral-medium-2312", label: "Mistral Medium Latest", provider: Provider::Mistral, premium: true },
    ModelOption { id: "mistral-large-2402", label: "Mistral Large Latest", provider: Provider::Mistral, premium: true },
    ModelOption { id: "gemini-1.0-pro", label: "Gemini 1.0 Pro", provider: Provider::Google, premium: false },
    ModelOption { id: "gemini-1.5-flash-latest", label: "Gemini 1.5 Flash", provider: Provider::Google, premium: false },
    ModelOption { id: "gemini-1.5-pro-latest", label: "Gemini 1.5 Pro", provider: Provider::Google, premium: true },
    ModelOption { id: "google/gemma-2b-it", label: "Gemma 2b", provider: Provider::Google, premium: false },
    ModelOption { id: "google/gemma-7b-it", label: "Gemma 7b", provider: Provider::Google, premium: false },
    ModelOption { id: "llama-3-sonar-small-32k-online", label: "Sonar Small 32k Online", provider: Provider::Perplexity, premium: false },
    ModelOption { id: "llama-3-sonar-small-32k-chat", label: "Sonar Small 32k Chat", provider: Provider::Perplexity, premium: true },
    ModelOption { id: "llama-3-sonar-large-32k-online", label: "Sonar Large 32k Online", provider: Provider::Perplexity, premium: false },
    ModelOption { id: "llama-3-sonar-large-32k-chat", label: "Sonar Large 32k Chat", provider: Provider::Perplexity, premium: true },
    ModelOption { id: "llama-3.1-sonar-small-128k-online", label: "Sonar Small 128k Online", provider: Provider::Perplexity, premium: true },
    ModelOption { id: "llama-3.1-sonar-small-128k-chat", label: "Sonar Small 128k Chat", provider: Provider::Perplexity, premium: true },
    ModelOption { id: "llama-3.1-sonar-large-128k-online", label: "Sonar Large 128k Online", provider: Provider::Perplexity, premium: true },
    ModelOption { id: "llama-3.1-sonar-large-128k-chat", label: "Sonar Large 128k Chat", provider: Provider::Perplexity, premium: true },
    ModelOption { id: "codellama/CodeLlama-34b-Instruct-hf", label: "Codellama 34b Instruct", provider: Provider::Meta, premium: false },
    ModelOption { id: "codellama/CodeLlama-70b-Instruct-hf", label: "Codellama 70b Instruct", provider: Provider::Meta, premium: true },
    ModelOption { id: "meta-llama/Llama-2-13b-chat-hf", label: "Meta Llama 2 13b Chat", provider: Provider::Meta, premium: false },
    ModelOption { id: "meta-llama/Llama-2-70b-chat-hf", label: "Meta Llama 2 70b Chat", provider: Provider::Meta, premium: true },
    ModelOption { id: "meta-llama/Llama-3-8b-chat-hf", label: "Meta Llama 3 8b Chat", provider: Provider::Meta, premium: false },
    ModelOption { id: "meta-llama/Llama-3-70b-chat-hf", label: "Meta Llama 3 70b Chat", provider: Provider::Meta, premium: true },
    ModelOption { id: "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo", label: "Meta Llama 3.1 8B Instruct Turbo", provider: Provider::Meta, premium: true },
    ModelOption { id: "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo", label: "Meta Llama 3.1 70B Instruct Turbo", provider: Provider::Meta, premium: true },
    ModelOption { id: "meta-llama/Meta-Llama-3.1-405B-Instruct-Turbo", label: "Meta Llama 3.1 405B Instruct Turbo", provider: Provider::Meta, premium: true },
];

pub fn find(id: &str) -> Option<&'static ModelOption> {
    MODEL_CATALOG.iter().find(|m| m.id == id)
}

pub fn default_model() -> &'static ModelOption {
    &MODEL_CATALOG[0]
}

/// Cyclic successor of `id` in catalog order; falls back to the first entry
/// when `id` is not recognized.
pub fn next_after(id: &str) -> &'static ModelOption {
    match MODEL_CATALOG.iter().position(|m| m.id == id) {
        Some(index) => &MODEL_CATALOG[(index + 1) % MODEL_CATALOG.len()],
        None => default_model(),
    }
}
