use std::fmt;
use std::fs;
use std::path::PathBuf;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use storywatch_core::ErrorKind;
use storywatch_logging::{watch_info, watch_warn};
use thiserror::Error;

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipient: String,
    pub attachment: Option<PathBuf>,
}

impl Notification {
    /// The "new story" message for `account`.
    pub fn new_story(account: &str, recipient: &str, attachment: Option<PathBuf>) -> Self {
        Self {
            subject: format!("New story posted by {account}!"),
            body: format!("Check out the latest story posted by @{account} on Instagram."),
            recipient: recipient.to_string(),
            attachment,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp transport failed: {0}")]
    Transport(String),
}

impl NotifyError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Notify
    }
}

/// One-shot mail sending.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sends mail through an implicit-TLS SMTP relay, authenticated as and sent
/// from `SmtpSettings::username`.
pub struct SmtpNotifier {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings) -> Result<Self, NotifyError> {
        let sender = parse_mailbox(&settings.username)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|err| NotifyError::Transport(err.to_string()))?
            .port(settings.port)
            .credentials(SmtpCredentials::new(settings.username, settings.password))
            .build();
        Ok(Self { sender, transport })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let recipient = parse_mailbox(&notification.recipient)?;
        let mut body = MultiPart::mixed().singlepart(SinglePart::plain(notification.body.clone()));

        if let Some(path) = &notification.attachment {
            match fs::read(path) {
                Ok(bytes) => {
                    let filename = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "attachment".to_string());
                    let content_type = ContentType::parse("application/octet-stream")
                        .map_err(|err| NotifyError::Build(err.to_string()))?;
                    body = body.singlepart(Attachment::new(filename).body(bytes, content_type));
                }
                // The mail still goes out, just without the file.
                Err(err) => watch_warn!("Failed to attach {:?}: {}", path, err),
            }
        }

        Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(notification.subject.clone())
            .multipart(body)
            .map_err(|err| NotifyError::Build(err.to_string()))
    }
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = self.build_message(notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        watch_info!("Email sent to {}", notification.recipient);
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|err: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: err.to_string(),
    })
}
