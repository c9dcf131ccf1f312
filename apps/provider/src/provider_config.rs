use std::env;

use permset_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

const DEFAULT_MESSAGE_GROUP_ID: &str = "PermissionSetAssignmentProvider";

/// Entry point served by this function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderHandler {
    OnEvent,
    IsComplete,
    Lifecycle,
}

impl ProviderHandler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnEvent => "on_event",
            Self::IsComplete => "is_complete",
            Self::Lifecycle => "lifecycle",
        }
    }

    fn parse(value: &str) -> AppResult<Self> {
        match value {
            "on_event" => Ok(Self::OnEvent),
            "is_complete" => Ok(Self::IsComplete),
            "lifecycle" => Ok(Self::Lifecycle),
            other => Err(AppError::Validation(format!(
                "PROVIDER_HANDLER must be one of 'on_event', 'is_complete' or 'lifecycle', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAppConfig {
    pub handler: ProviderHandler,
    pub provider_table_name: String,
    /// Work queue, required by the custom resource handlers only.
    pub queue_url: Option<String>,
    pub message_group_id: String,
}

impl ProviderAppConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let lookup = &lookup;
        let handler = ProviderHandler::parse(required_env(lookup, "PROVIDER_HANDLER")?.as_str())?;
        let provider_table_name = required_env(lookup, "PROVIDER_TABLE_NAME")?;
        let queue_url = match handler {
            ProviderHandler::OnEvent | ProviderHandler::IsComplete => {
                Some(required_env(lookup, "QUEUE_URL")?)
            }
            ProviderHandler::Lifecycle => None,
        };
        let message_group_id = lookup("MESSAGE_GROUP_ID")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE_GROUP_ID.to_owned());

        Ok(Self {
            handler,
            provider_table_name,
            queue_url,
            message_group_id,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();
}

fn required_env(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}
