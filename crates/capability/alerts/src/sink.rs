//! 通知接收端
//!
//! 核心只决定"何时通知"；投递机制在 [`NotificationSink`] 后面。
//! 投递失败由调用方记日志，核心内不重试。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use upsmon_config::ConfigProvider;

/// 通知投递错误。
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("smtp transport error: {0}")]
    Transport(String),
    #[error("address parse error: {0}")]
    Address(String),
    #[error("message build error: {0}")]
    Build(String),
    #[error("config error: {0}")]
    Config(String),
}

/// 通知接收端抽象：一台设备本周期新触发的消息作为一个批次移交。
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, device_name: &str, messages: &[String]) -> Result<(), NotifyError>;
}

/// 仅写日志的接收端（用于接线与测试）。
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn send(&self, device_name: &str, messages: &[String]) -> Result<(), NotifyError> {
        info!(
            target: "upsmon.alerts",
            device = %device_name,
            count = messages.len(),
            "alert batch (log only)"
        );
        Ok(())
    }
}

/// 基于 lettre 的 SMTP 接收端。
///
/// 投递参数来自配置文档；未配置 SMTP 或收件人为空时静默丢弃
/// （告警簿记已在引擎侧完成，与投递无关）。
pub struct SmtpNotifier {
    provider: Arc<ConfigProvider>,
}

impl SmtpNotifier {
    pub fn new(provider: Arc<ConfigProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl NotificationSink for SmtpNotifier {
    async fn send(&self, device_name: &str, messages: &[String]) -> Result<(), NotifyError> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

        let config = self
            .provider
            .current()
            .await
            .map_err(|err| NotifyError::Config(err.to_string()))?;
        let Some(smtp) = config.smtp.as_ref() else {
            debug!(
                target: "upsmon.alerts",
                device = %device_name,
                "smtp not configured, dropping alert batch"
            );
            return Ok(());
        };
        if smtp.to_addrs.is_empty() {
            return Ok(());
        }

        let from = smtp
            .from_addr
            .clone()
            .or_else(|| smtp.username.clone())
            .unwrap_or_else(|| "ups@example".to_string());
        let subject = format!("{} {} alert", smtp.subject_prefix, device_name);

        let mut builder = Message::builder()
            .from(
                from.parse()
                    .map_err(|err: lettre::address::AddressError| {
                        NotifyError::Address(err.to_string())
                    })?,
            )
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &smtp.to_addrs {
            builder = builder.to(to
                .parse()
                .map_err(|err: lettre::address::AddressError| {
                    NotifyError::Address(err.to_string())
                })?);
        }
        let email = builder
            .body(messages.join("\n"))
            .map_err(|err| NotifyError::Build(err.to_string()))?;

        let mut transport_builder = if smtp.use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                .map_err(|err| NotifyError::Transport(err.to_string()))?
        } else if smtp.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                .map_err(|err| NotifyError::Transport(err.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
        };
        transport_builder = transport_builder.port(smtp.port);

        // 口令缺省时回退到环境变量
        let password = smtp
            .password
            .clone()
            .or_else(|| std::env::var("SMTP_PASSWORD").ok());
        if let (Some(username), Some(password)) = (smtp.username.clone(), password) {
            transport_builder = transport_builder.credentials(Credentials::new(username, password));
        }

        let mailer = transport_builder.build();
        mailer
            .send(email)
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        info!(
            target: "upsmon.alerts",
            device = %device_name,
            count = messages.len(),
            "alert email sent"
        );
        Ok(())
    }
}
