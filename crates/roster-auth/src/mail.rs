//! Outbound message delivery. Transport is out of scope; deployments plug
//! in their own [`Mailer`].

use serde::Serialize;
use tracing::info;

pub trait Mailer: Send + Sync {
  /// Deliver one message. Returns false when the transport refused it.
  fn send(&self, recipient: &str, subject: &str, body: &str) -> bool;
}

/// Writes every message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct TracingMailer {
  pub from: String,
}

impl Mailer for TracingMailer {
  fn send(&self, recipient: &str, subject: &str, body: &str) -> bool {
    info!(from = %self.from, to = %recipient, %subject, "{body}");
    true
  }
}

/// Outcome of handing a message to the [`Mailer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
  Sent,
  Failed,
}

impl From<bool> for Delivery {
  fn from(sent: bool) -> Self { if sent { Self::Sent } else { Self::Failed } }
}
