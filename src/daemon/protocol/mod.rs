//! Wire format spoken with the browser side. One JSON object per line:
//! stdin carries tab and focus events plus the odd query, stdout carries
//! query replies and notification requests.

pub mod reader;
pub mod writer;

use serde::{Deserialize, Serialize};

use crate::utils::time::ms_to_minutes;

/// Messages arriving from the browser extension.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Inbound {
    #[serde(rename = "TAB_ACTIVATED")]
    TabActivated { url: String },
    #[serde(rename = "URL_CHANGED")]
    UrlChanged { url: String },
    #[serde(rename = "WINDOW_FOCUS_CHANGED")]
    WindowFocusChanged {
        focused: bool,
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(rename = "GET_CURRENT_TIME")]
    GetCurrentTime,
}

/// Messages sent back to the browser extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    CurrentTime {
        #[serde(rename = "currentTime")]
        current_time: i64,
        username: String,
    },
    Notification(NotificationRequest),
}

/// A request for the browser to show a notification. The shape mirrors the
/// options object of the browser notification API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRequest {
    pub id: String,
    pub options: NotificationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub icon_url: String,
    pub title: String,
    pub message: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Basic,
}

const NOTIFICATION_ICON: &str = "icons/icon48.png";

impl NotificationRequest {
    pub fn limit_reached(domain: &str, total_ms: u64, limit_ms: u64) -> Self {
        Self {
            id: format!("limit-{domain}"),
            options: NotificationOptions {
                kind: NotificationKind::Basic,
                icon_url: NOTIFICATION_ICON.into(),
                title: "Time Limit Reached!".into(),
                message: format!(
                    "You've spent {} minutes on {domain} (Limit: {} minutes)",
                    ms_to_minutes(total_ms),
                    ms_to_minutes(limit_ms),
                ),
                priority: 2,
            },
        }
    }
}
