//! Operator notifications. Sends are fire-and-forget: failures are logged
//! and never reach the request that triggered them.

use crate::{
    api::models::{profiles::ServiceCategory, users::UserType},
    config::EmailConfig,
};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
    Message, Tokio1Executor,
};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    NewUserSignup {
        email: String,
        name: String,
        user_type: UserType,
    },
    NewCustomerRequest {
        title: String,
        service_category: ServiceCategory,
        location: String,
        contact_email: Option<String>,
    },
    VerificationNeeded {
        business_name: String,
        email: String,
    },
}

impl Notification {
    pub fn subject(&self) -> String {
        match self {
            Notification::NewUserSignup { user_type, .. } => format!("New {user_type:?} signup").to_lowercase(),
            Notification::NewCustomerRequest { service_category, .. } => {
                format!("New customer request: {service_category:?}")
            }
            Notification::VerificationNeeded { business_name, .. } => {
                format!("Professional verification needed: {business_name}")
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::NewUserSignup { email, name, user_type } => {
                format!("A new {user_type:?} account was registered.\n\nName: {name}\nEmail: {email}\n")
            }
            Notification::NewCustomerRequest {
                title,
                service_category,
                location,
                contact_email,
            } => format!(
                "A new request was posted.\n\nTitle: {title}\nCategory: {service_category:?}\nLocation: {location}\nContact: {}\n",
                contact_email.as_deref().unwrap_or("registered customer")
            ),
            Notification::VerificationNeeded { business_name, email } => format!(
                "A professional created a business profile and is waiting for verification.\n\nBusiness: {business_name}\nAccount: {email}\n"
            ),
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    admin_email: String,
}

impl Notifier {
    pub fn new(config: &EmailConfig) -> anyhow::Result<Self> {
        let transport = if config.enabled {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?.port(config.smtp_port);
            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            Some(builder.build())
        } else {
            info!("email notifications disabled; notifications will be logged only");
            None
        };

        Ok(Self {
            transport,
            from: config.from.clone(),
            admin_email: config.admin_email.clone(),
        })
    }

    /// Log-only notifier
    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: String::new(),
            admin_email: String::new(),
        }
    }

    /// Queue a notification to the operator without waiting for delivery
    pub fn notify(&self, notification: Notification) {
        let Some(transport) = self.transport.clone() else {
            info!(subject = %notification.subject(), "notification (email disabled)");
            return;
        };

        let from = self.from.clone();
        let to = self.admin_email.clone();
        tokio::spawn(async move {
            let subject = notification.subject();
            match build_message(&from, &to, &notification) {
                Ok(message) => match transport.send(message).await {
                    Ok(_) => info!(%subject, "notification sent"),
                    Err(e) => warn!(%subject, error = %e, "failed to send notification"),
                },
                Err(e) => warn!(%subject, error = %e, "failed to build notification"),
            }
        });
    }
}

fn build_message(from: &str, to: &str, notification: &Notification) -> anyhow::Result<Message> {
    Ok(Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(notification.subject())
        .header(ContentType::TEXT_PLAIN)
        .body(notification.body())?)
}
