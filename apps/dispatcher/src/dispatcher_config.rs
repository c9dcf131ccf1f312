use std::env;

use permset_core::{AppError, AppResult};
use permset_domain::ConcurrencyLimit;
use tracing_subscriber::EnvFilter;

const DEFAULT_MESSAGE_GROUP_ID: &str = "PermissionSetAssignmentProvider";
const DEFAULT_REDIS_KEY_PREFIX: &str = "permset:concurrency";

/// Which side of the concurrency gate this function serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherStep {
    Admit,
    Release,
}

impl DispatcherStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::Release => "release",
        }
    }

    fn parse(value: &str) -> AppResult<Self> {
        match value {
            "admit" => Ok(Self::Admit),
            "release" => Ok(Self::Release),
            other => Err(AppError::Validation(format!(
                "DISPATCHER_STEP must be either 'admit' or 'release', got '{other}'"
            ))),
        }
    }
}

/// Storage backing the execution counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterBackend {
    DynamoDb {
        table_name: String,
    },
    Redis {
        url: String,
        key_prefix: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherAppConfig {
    pub step: DispatcherStep,
    pub state_machine_arn: String,
    pub provider_table_name: String,
    pub max_concurrency: ConcurrencyLimit,
    pub queue_url: String,
    pub dlq_url: String,
    pub requeue_on_failure: bool,
    pub message_group_id: String,
    pub counter_backend: CounterBackend,
}

impl DispatcherAppConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let lookup = &lookup;
        let step = DispatcherStep::parse(required_env(lookup, "DISPATCHER_STEP")?.as_str())?;
        let state_machine_arn = required_env(lookup, "STATE_MACHINE_ARN")?;
        let provider_table_name = required_env(lookup, "PROVIDER_TABLE_NAME")?;
        let max_concurrency = ConcurrencyLimit::new(parse_env_u32(lookup, "MAX_CONCURRENCY", 1)?)
            .map_err(|_| {
                AppError::Validation("MAX_CONCURRENCY must be greater than zero".to_owned())
            })?;
        let queue_url = required_env(lookup, "QUEUE_URL")?;
        let dlq_url = required_env(lookup, "DLQ_URL")?;
        let requeue_on_failure = parse_env_bool(lookup, "REQUEUE_ON_FAILURE", false)?;
        let message_group_id = lookup("MESSAGE_GROUP_ID")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE_GROUP_ID.to_owned());

        let counter_backend = match lookup("COUNTER_BACKEND")
            .unwrap_or_else(|| "dynamodb".to_owned())
            .as_str()
        {
            "dynamodb" => CounterBackend::DynamoDb {
                table_name: required_env(lookup, "CONCURRENCY_TABLE_NAME")?,
            },
            "redis" => CounterBackend::Redis {
                url: required_env(lookup, "REDIS_URL")?,
                key_prefix: lookup("REDIS_KEY_PREFIX")
                    .filter(|value| !value.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_owned()),
            },
            other => {
                return Err(AppError::Validation(format!(
                    "COUNTER_BACKEND must be either 'dynamodb' or 'redis', got '{other}'"
                )));
            }
        };

        Ok(Self {
            step,
            state_machine_arn,
            provider_table_name,
            max_concurrency,
            queue_url,
            dlq_url,
            requeue_on_failure,
            message_group_id,
            counter_backend,
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

fn parse_env_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u32,
) -> AppResult<u32> {
    match lookup(name) {
        Some(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_env_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: bool,
) -> AppResult<bool> {
    match lookup(name) {
        Some(value) => value.trim().to_ascii_lowercase().parse::<bool>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
