pub const CHANNEL_NAME: &str = "google gemini";

pub const MODEL_LIST: &[&str] = &[
    // generate
    "gemini-1.5-pro",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash-thinking-exp-01-21",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    // embedding
    "text-embedding-004",
    "embedding-001",
    "gemini-embedding-exp-03-07",
    // imagen
    "imagen-3.0-generate-002",
];
