
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::config::Config;
use crate::otp::OTP_EXPIRY_MINUTES;
use crate::{DocativeError, Result};

/// Source of the embeddable chat widget referenced in the script tag
const WIDGET_SRC: &str = "https://docative.com/widget.js";

/// Transactional email sender. All sends are fire-and-forget from the
/// pipelines' perspective; a failure here surfaces as
/// [`DocativeError::Notification`], distinct from ingestion failure, because
/// the index write has already succeeded by the time an email goes out.
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    sender: String,
    admin_email: String,
}

/// Render the embed snippet a user pastes into their site
#[inline]
pub fn generate_script_tag(bot_id: &str) -> String {
    format!(
        r#"<script src="{}" data-bot-id="{}"></script>"#,
        WIDGET_SRC, bot_id
    )
}

impl Mailer {
    /// Build the SMTP transport from config. An empty SMTP host leaves the
    /// mailer disabled; every send then fails as `Notification`, which the
    /// HTTP layer reports without undoing the upload.
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        if config.smtp.host.is_empty() {
            debug!("SMTP host not configured; mailer disabled");
            return Ok(Self {
                transport: None,
                sender: config.smtp.sender.clone(),
                admin_email: config.smtp.admin_email.clone(),
            });
        }

        let password = config
            .smtp_password()
            .map_err(|e| DocativeError::Config(e.to_string()))?;

        // Implicit TLS, matching the usual port-465 submission setup.
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.host)
            .map_err(|e| DocativeError::Notification(format!("invalid SMTP relay: {}", e)))?
            .credentials(Credentials::new(
                config.smtp.username.clone(),
                password,
            ));
        if config.smtp.port != 0 {
            builder = builder.port(config.smtp.port);
        }

        Ok(Self {
            transport: Some(builder.build()),
            sender: config.smtp.sender.clone(),
            admin_email: config.smtp.admin_email.clone(),
        })
    }

    /// Deliver the verification code
    #[inline]
    pub async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<()> {
        let body = render_otp_email(code);
        self.send(
            to_email,
            "Your Docative Verification Code",
            ContentType::TEXT_HTML,
            body,
        )
        .await
    }

    /// Deliver the embed script for a freshly created bot
    #[inline]
    pub async fn send_embed_script_email(
        &self,
        to_email: &str,
        bot_id: &str,
        display_name: &str,
    ) -> Result<()> {
        let body = render_embed_script_email(bot_id, display_name);
        self.send(
            to_email,
            "Your Custom Chatbot Embed Script",
            ContentType::TEXT_PLAIN,
            body,
        )
        .await
    }

    /// Tell the operator about a new upload; quietly skipped when no admin
    /// address is configured.
    #[inline]
    pub async fn send_admin_notification(
        &self,
        owner_email: &str,
        display_name: &str,
        bot_id: &str,
        source_name: &str,
    ) -> Result<()> {
        if self.admin_email.is_empty() {
            debug!("No admin email configured; skipping notification");
            return Ok(());
        }

        let body = format!(
            "New Docative upload\n\n\
             Owner: {}\n\
             Bot name: {}\n\
             Bot id: {}\n\
             Source: {}\n",
            owner_email, display_name, bot_id, source_name
        );
        self.send(
            &self.admin_email,
            "New Docative chatbot created",
            ContentType::TEXT_PLAIN,
            body,
        )
        .await
    }

    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        content_type: ContentType,
        body: String,
    ) -> Result<()> {
        let Some(transport) = &self.transport else {
            return Err(DocativeError::Notification(
                "SMTP is not configured".to_string(),
            ));
        };

        let message = Message::builder()
            .from(
                self.sender
                    .parse()
                    .map_err(|e| DocativeError::Notification(format!("invalid sender: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| DocativeError::Notification(format!("invalid recipient: {}", e)))?)
            .subject(subject)
            .header(content_type)
            .body(body)
            .map_err(|e| DocativeError::Notification(format!("failed to build message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| DocativeError::Notification(format!("SMTP send failed: {}", e)))?;

        info!("Sent '{}' to {}", subject, to_email);
        Ok(())
    }
}

/// HTML body of the verification email
fn render_otp_email(code: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background-color: #f8f9fa; border-radius: 10px; padding: 30px; text-align: center; border: 1px solid #e9ecef;">
      <div style="font-size: 24px; font-weight: bold; color: #6366f1; margin-bottom: 20px;">Docative</div>
      <h2>Verify Your Email Address</h2>
      <p>Thank you for creating a chatbot with Docative! To complete your setup, please enter the verification code below on the website:</p>
      <div style="font-size: 36px; font-weight: bold; color: #4f46e5; letter-spacing: 8px; margin: 30px 0; padding: 15px; background-color: #f0f1ff; border-radius: 8px; display: inline-block;">{code}</div>
      <p>This code will expire in {expiry} minutes for security reasons.</p>
      <p>If you didn't request this code, please ignore this email.</p>
      <p style="margin-top: 30px; font-size: 12px; color: #6c757d;">This is an automated message, please do not reply to this email.</p>
    </div>
  </body>
</html>
"#,
        code = code,
        expiry = OTP_EXPIRY_MINUTES
    )
}

/// Plain-text body of the embed-script email
fn render_embed_script_email(bot_id: &str, display_name: &str) -> String {
    format!(
        "Thanks for trying Docative!\n\n\
         Here's the script tag to embed \"{}\" on your site:\n\n\
         {}\n\n\
         Just paste it inside any HTML page where you want the bot to show up.\n",
        display_name,
        generate_script_tag(bot_id)
    )
}
