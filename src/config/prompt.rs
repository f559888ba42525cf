use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use log::info;

use crate::models::chat::{ ChatMessage, Role };

/// Built-in persona for the support assistant. Prepended to every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "
You are a customer support bot for Crescent Cloud Log, a specialized service that assists pharmaceutical companies and manufacturers in creating, managing, and distributing e-books. Your role is to provide prompt, professional, and accurate support to users. You should assist with inquiries related to the e-book creation process, troubleshoot technical issues, guide users through using the platform, and provide information about features and services. Be courteous, clear, and helpful, keeping responses concise and easy to understand. If a question is beyond your capability, guide the user on how to contact human support.

Key responsibilities:
- Help users navigate the Crescent Cloud Log platform, including how to create, edit, and distribute e-books.
- Troubleshoot common technical issues users may encounter with the platform.
- Provide information on the different features, pricing, and customization options available for e-books.
- Assist with account-related inquiries, such as login issues, subscription management, and billing questions.
- Redirect complex or sensitive inquiries to human support when necessary.
";

#[derive(Debug)]
pub enum PromptError {
    Empty(String),
    IoError(std::io::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::Empty(path) => write!(f, "System prompt file '{}' is empty", path),
            PromptError::IoError(e) => write!(f, "System prompt file IO error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

/// The fixed system instruction shared by every request. Built once at
/// startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemPrompt {
    text: String,
}

impl SystemPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn message(&self) -> ChatMessage {
        ChatMessage::new(Role::System, self.text.clone())
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

pub fn load_system_prompt<P: AsRef<Path>>(path: P) -> Result<SystemPrompt, PromptError> {
    let path_ref = path.as_ref();
    let text = fs::read_to_string(path_ref)?;
    if text.trim().is_empty() {
        return Err(PromptError::Empty(path_ref.display().to_string()));
    }
    info!("Loaded system prompt from '{}' ({} bytes)", path_ref.display(), text.len());
    Ok(SystemPrompt::new(text))
}

/// Resolves the prompt for this process: the file when one is configured,
/// otherwise the built-in persona.
pub fn resolve_system_prompt(path: Option<&str>) -> Result<Arc<SystemPrompt>, PromptError> {
    match path {
        Some(p) if !p.trim().is_empty() => Ok(Arc::new(load_system_prompt(p)?)),
        _ => {
            info!("Using built-in system prompt");
            Ok(Arc::new(SystemPrompt::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("chat-relay-{}-{}", std::process::id(), name));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn default_prompt_is_system_role() {
        let msg = SystemPrompt::default().message();
        assert_eq!(msg.role, Role::System);
        assert!(msg.content.contains("Crescent Cloud Log"));
    }

    #[test]
    fn resolve_without_path_uses_builtin() {
        let prompt = resolve_system_prompt(None).unwrap();
        assert_eq!(prompt.message().content, DEFAULT_SYSTEM_PROMPT);

        let prompt = resolve_system_prompt(Some("  ")).unwrap();
        assert_eq!(*prompt, SystemPrompt::default());
    }

    #[test]
    fn loads_prompt_from_file() {
        let path = temp_file("prompt.txt", "You are a pirate.");
        let prompt = resolve_system_prompt(path.to_str()).unwrap();
        assert_eq!(prompt.message(), ChatMessage::new(Role::System, "You are a pirate."));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn rejects_blank_file() {
        let path = temp_file("blank.txt", "\n   \n");
        let err = load_system_prompt(&path).unwrap_err();
        assert!(matches!(err, PromptError::Empty(_)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_system_prompt("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, PromptError::IoError(_)));
    }
}
