/// Coarse category attached to a failed notification attempt, used as the
/// `reason` label on the failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    Default,
    Auth,
    Client,
    Server,
    Timeout,
}

impl FailureReason {
    pub const ALL: [FailureReason; 5] = [
        FailureReason::Default,
        FailureReason::Auth,
        FailureReason::Client,
        FailureReason::Server,
        FailureReason::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Default => "default",
            FailureReason::Auth => "auth",
            FailureReason::Client => "client",
            FailureReason::Server => "server",
            FailureReason::Timeout => "timeout",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            FailureReason::Default => 0,
            FailureReason::Auth => 1,
            FailureReason::Client => 2,
            FailureReason::Server => 3,
            FailureReason::Timeout => 4,
        }
    }
}

/// Error returned by a notifier. `retryable` decides whether the retry loop
/// keeps going or aborts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    pub message: String,
    pub retryable: bool,
    pub reason: FailureReason,
}

impl NotifyError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
            reason: FailureReason::Default,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
            reason: FailureReason::Default,
        }
    }

    pub fn with_reason(mut self, reason: FailureReason) -> Self {
        self.reason = reason;
        self
    }
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for NotifyError {}

/// Errors surfaced by pipeline stages. Store errors are not part of this
/// taxonomy: they are logged inside DedupStage/ClearStateStage and only skip
/// the affected alert.
#[derive(Debug)]
pub enum PipelineError {
    ReceiverMissing,
    GroupKeyMissing,
    RepeatIntervalMissing,
    NowMissing,
    FiringAlertsMissing,
    UnknownReceiver { receiver: String, group_key: String },
    UnknownTimeInterval { name: String },
    Notify { context: String, source: NotifyError },
    Fanout(Vec<PipelineError>),
    Internal(String),
}

impl PipelineError {
    /// Reason carried by the innermost notify failure; everything else maps
    /// to the default reason.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            PipelineError::Notify { source, .. } => source.reason,
            _ => FailureReason::Default,
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReceiverMissing => write!(f, "receiver missing"),
            Self::GroupKeyMissing => write!(f, "group key missing"),
            Self::RepeatIntervalMissing => write!(f, "repeat interval missing"),
            Self::NowMissing => write!(f, "missing now timestamp"),
            Self::FiringAlertsMissing => write!(f, "firing alerts missing"),
            Self::UnknownReceiver {
                receiver,
                group_key,
            } => write!(
                f,
                "stage for receiver [{receiver}] group [{group_key}] missing"
            ),
            Self::UnknownTimeInterval { name } => {
                write!(f, "time interval {name} doesn't exist in config")
            }
            Self::Notify { context, source } => write!(f, "{context}: {source}"),
            Self::Fanout(errors) => {
                write!(f, "{} error(s) occurred: ", errors.len())?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
            Self::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Notify { source, .. } => Some(source),
            _ => None,
        }
    }
}
