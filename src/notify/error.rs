use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email is not configured")]
    NotConfigured,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Could not build email: {0}")]
    Message(String),

    /// Permanent SMTP failure such as bad credentials or a refused recipient.
    #[error("Mail server rejected the message: {0}")]
    Rejected(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

impl EmailError {
    pub fn kind(&self) -> &'static str {
        match self {
            EmailError::NotConfigured => "not_configured",
            EmailError::InvalidAddress(_) => "invalid_address",
            EmailError::Message(_) => "message",
            EmailError::Rejected(_) => "rejected",
            EmailError::Transport(_) => "transport",
        }
    }
}

impl From<lettre::transport::smtp::Error> for EmailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        if err.is_permanent() {
            EmailError::Rejected(err.to_string())
        } else {
            EmailError::Transport(err.to_string())
        }
    }
}
