//! `plain` email provider: authenticated SMTP via `lettre`.
//!
//! Config keys: `host` (required), `port` (default 25), `username`,
//! `password` and `from` (all required). The connection uses STARTTLS
//! when the server offers it.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{
    required, Configurable, EmailMessage, EmailProvider, LoadError, ProviderConfig, SendError,
};

const DEFAULT_PORT: u16 = 25;

struct Session {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

#[derive(Default)]
pub struct PlainEmail {
    session: RwLock<Option<Arc<Session>>>,
}

impl PlainEmail {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn session(&self) -> Option<Arc<Session>> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn parse_port(config: &ProviderConfig) -> Result<u16, LoadError> {
    config.get("port").map_or(Ok(DEFAULT_PORT), |raw| {
        raw.trim().parse().map_err(|e| LoadError::InvalidField {
            field: "port",
            message: format!("'{raw}': {e}"),
        })
    })
}

impl Configurable for PlainEmail {
    fn load(&self, config: &ProviderConfig) -> Result<(), LoadError> {
        let host = required(config, "host")?;
        let port = parse_port(config)?;
        let username = required(config, "username")?;
        let password = required(config, "password")?;
        let from: Address = required(config, "from")?
            .parse()
            .map_err(|e| LoadError::InvalidField {
                field: "from",
                message: format!("{e}"),
            })?;

        let tls = TlsParameters::new(host.to_string()).map_err(|e| LoadError::InvalidField {
            field: "host",
            message: e.to_string(),
        })?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .tls(Tls::Opportunistic(tls))
            .build();

        let session = Arc::new(Session {
            mailer,
            from: Mailbox::new(None, from),
        });

        match self.session.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }

        tracing::debug!(host = %host, port, "plain email provider loaded");
        Ok(())
    }
}

fn build_message(from: Mailbox, message: &EmailMessage) -> Result<Message, SendError> {
    let mut builder = Message::builder().from(from).subject(message.subject.as_str());

    for recipient in &message.to {
        let mailbox: Mailbox = recipient.trim().parse().map_err(|e| {
            SendError::InvalidMessage(format!("invalid recipient '{recipient}': {e}"))
        })?;
        builder = builder.to(mailbox);
    }

    let built = if message.attachments.is_empty() {
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.content.clone())
    } else {
        let octet_stream = ContentType::parse("application/octet-stream")
            .map_err(|e| SendError::InvalidMessage(e.to_string()))?;
        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(message.content.clone()));
        for (name, content) in &message.attachments {
            parts = parts.singlepart(
                Attachment::new(name.clone()).body(content.to_vec(), octet_stream.clone()),
            );
        }
        builder.multipart(parts)
    };

    built.map_err(|e| SendError::InvalidMessage(e.to_string()))
}

#[async_trait]
impl EmailProvider for PlainEmail {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), SendError> {
        // Clone the Arc<Session> so a concurrent load cannot swap credentials mid-send
        let session = self.session().ok_or(SendError::NotLoaded)?;
        let email = build_message(session.from.clone(), message)?;
        session
            .mailer
            .send(email)
            .await
            .map_err(SendError::transport)?;
        Ok(())
    }
}
