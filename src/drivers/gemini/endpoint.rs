//! Endpoint resolution: `{base}/{version}/models/{model}:{action}`.

/// Supplies the API version segment for a canonical model id.
pub trait VersionLookup {
    fn api_version(&self, model: &str) -> String;
}

impl<F> VersionLookup for F
where
    F: Fn(&str) -> String,
{
    fn api_version(&self, model: &str) -> String {
        self(model)
    }
}

const EMBEDDING_PREFIXES: [&str; 3] = ["text-embedding", "embedding", "gemini-embedding"];

/// Model families that select both the upstream action and the response handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Imagen,
    Embedding,
    Generative,
}

impl ModelFamily {
    pub fn of(model: &str) -> Self {
        if model.starts_with("imagen") {
            Self::Imagen
        } else if EMBEDDING_PREFIXES.iter().any(|p| model.starts_with(p)) {
            Self::Embedding
        } else {
            Self::Generative
        }
    }
}

/// Upstream action for `model`.
pub fn action(model: &str, stream: bool) -> &'static str {
    match ModelFamily::of(model) {
        ModelFamily::Imagen => "predict",
        ModelFamily::Embedding => "embedContent",
        ModelFamily::Generative if stream => "streamGenerateContent?alt=sse",
        ModelFamily::Generative => "generateContent",
    }
}

pub fn resolve_url(
    base_url: &str,
    model: &str,
    stream: bool,
    versions: &(impl VersionLookup + ?Sized),
) -> String {
    format!(
        "{}/{}/models/{}:{}",
        base_url.trim_end_matches('/'),
        versions.api_version(model),
        model,
        action(model, stream)
    )
}
