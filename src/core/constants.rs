//! Shared constants used across the application

/// System prompt forwarded upstream whenever a request carries none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Solace, a helpful, empathetic AI assistant \
focused on providing supportive conversations.";

/// Model identifier sent with every completion request.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Upper bound on generated tokens per completion.
pub const MAX_OUTPUT_TOKENS: u32 = 4000;

/// Default listen port for the relay server.
pub const DEFAULT_PORT: u16 = 3005;

/// Environment variable holding the provider credential.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Local storage key for the persisted conversation snapshot.
pub const CONVERSATION_KEY: &str = "conversation";

/// Local storage key for the theme preference ("light" or "dark").
pub const THEME_KEY: &str = "theme";
