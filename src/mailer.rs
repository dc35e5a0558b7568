//! Sending the PDF report by e-mail.
//!
//! The SMTP transport sits behind `ReportMailer`, so the session can be
//! exercised without a network.

use std::path::{Path, PathBuf};

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("could not read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A fully specified message: who, what, and the file to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub recipient: String,
    pub sender: String,
    pub password: String,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

pub trait ReportMailer {
    fn send(&self, request: &EmailRequest) -> Result<(), MailError>;
}

/// Submits over implicit TLS to a relay.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    pub host: String,
    pub port: u16,
}

impl SmtpMailer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl ReportMailer for SmtpMailer {
    fn send(&self, request: &EmailRequest) -> Result<(), MailError> {
        let message = build_message(request)?;
        let transport = SmtpTransport::relay(&self.host)?
            .port(self.port)
            .credentials(Credentials::new(
                request.sender.clone(),
                request.password.clone(),
            ))
            .build();
        log::info!(
            "Sending report to {} via {}:{}",
            request.recipient,
            self.host,
            self.port
        );
        transport.send(&message)?;
        Ok(())
    }
}

/// Plain-text body plus the attachment as `application/pdf`.
pub fn build_message(request: &EmailRequest) -> Result<Message, MailError> {
    let from: Mailbox = request.sender.trim().parse()?;
    let to: Mailbox = request.recipient.trim().parse()?;

    let data = std::fs::read(&request.attachment).map_err(|source| MailError::Attachment {
        path: request.attachment.clone(),
        source,
    })?;
    let filename = attachment_name(&request.attachment);
    let pdf = ContentType::parse("application/pdf").unwrap_or(ContentType::TEXT_PLAIN);

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(request.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(request.body.clone()))
                .singlepart(Attachment::new(filename).body(data, pdf)),
        )?;
    Ok(message)
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.pdf".to_string())
}

// ---------------------------------------------------------------------------
// Form handling
// ---------------------------------------------------------------------------

/// The three fields the user types in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailForm {
    pub recipient: String,
    pub sender: String,
    pub password: String,
}

impl EmailForm {
    pub fn is_complete(&self) -> bool {
        [&self.recipient, &self.sender, &self.password]
            .iter()
            .all(|f| !f.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Sent,
    Failed,
    /// A field was empty; nothing was sent.
    Incomplete,
}

/// What the e-mail form shows after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailOutcome {
    pub kind: OutcomeKind,
    pub message: String,
}

impl MailOutcome {
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Sent
    }
}

/// Validate the form and make one delivery attempt.
pub fn submit(
    mailer: &dyn ReportMailer,
    form: &EmailForm,
    subject: &str,
    body: &str,
    attachment: &Path,
) -> MailOutcome {
    if !form.is_complete() {
        return MailOutcome {
            kind: OutcomeKind::Incomplete,
            message: "Please fill in all fields.".to_string(),
        };
    }

    let request = EmailRequest {
        recipient: form.recipient.trim().to_string(),
        sender: form.sender.trim().to_string(),
        password: form.password.clone(),
        subject: subject.to_string(),
        body: body.to_string(),
        attachment: attachment.to_path_buf(),
    };
    match mailer.send(&request) {
        Ok(()) => MailOutcome {
            kind: OutcomeKind::Sent,
            message: "E-mail sent successfully!".to_string(),
        },
        Err(e) => {
            log::error!("Failed to send e-mail: {e:#}");
            MailOutcome {
                kind: OutcomeKind::Failed,
                message: format!("Failed to send e-mail: {e}"),
            }
        }
    }
}
