use std::fmt;

use crate::core::attachments::{Attachment, ObjectRef};
use crate::core::builtin_models::ModelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

/// Figures recorded for each assistant reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageMetadata {
    pub image: Option<ObjectRef>,
    pub tokens: Option<usize>,
    pub tokens_per_second: Option<f64>,
    /// Seconds until the reply arrived. Replies are not streamed, so this is
    /// the full request latency.
    pub time_to_first_token: Option<f64>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub model: Option<ModelId>,
    pub metadata: Option<MessageMetadata>,
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            model: None,
            metadata: None,
            attachments: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, model: ModelId, metadata: MessageMetadata) -> Self {
        Self {
            model: Some(model),
            metadata: Some(metadata),
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub fn generated_image(&self) -> Option<ObjectRef> {
        self.metadata.as_ref().and_then(|metadata| metadata.image)
    }

    /// Every object handle this message keeps alive.
    pub fn objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.attachments
            .iter()
            .map(|attachment| attachment.object)
            .chain(self.generated_image())
    }
}
