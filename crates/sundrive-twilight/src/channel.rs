//! Message channel to the watch.
//!
//! Inbound and outbound messages are JSON objects. [`JsonLinesChannel`]
//! carries them one per line over any async writer, which is how the
//! companion binary talks to the bridge on stdin/stdout.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::encoder::EncodedTwilight;
use crate::error::ChannelError;

/// Message from the watch
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundMessage {
    /// The watchface opened and the companion should announce itself
    Ready,
    /// Generic app message; a refresh request carries `timezone_string`
    #[serde(rename = "appmessage")]
    AppMessage {
        #[serde(default)]
        payload: AppMessagePayload,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppMessagePayload {
    #[serde(default)]
    pub timezone_string: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl AppMessagePayload {
    /// Requested timezone, with an empty string counting as absent.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone_string.as_deref().filter(|tz| !tz.is_empty())
    }
}

impl InboundMessage {
    /// Parse one inbound line.
    pub fn parse(line: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Message to the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Twilight(EncodedTwilight),
    Ready { js_ready: u8 },
}

impl OutboundMessage {
    pub fn ready() -> Self {
        Self::Ready { js_ready: 1 }
    }
}

/// Outbound side of the device channel.
pub trait DeviceChannel: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// Newline-delimited JSON over an async writer
pub struct JsonLinesChannel<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> DeviceChannel for JsonLinesChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe => ChannelError::Closed,
            _ => ChannelError::Io(e),
        })?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::TwilightDataset;

    #[test]
    fn test_parse_ready() {
        assert_eq!(
            InboundMessage::parse(r#"{"event":"ready"}"#).unwrap(),
            InboundMessage::Ready
        );
    }

    #[test]
    fn test_parse_timezone_message() {
        let msg =
            InboundMessage::parse(r#"{"event":"appmessage","payload":{"timezone_string":"UTC+1"}}"#)
                .unwrap();
        match msg {
            InboundMessage::AppMessage { payload } => assert_eq!(payload.timezone(), Some("UTC+1")),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_message_without_timezone() {
        let msg =
            InboundMessage::parse(r#"{"event":"appmessage","payload":{"show_day_of_week":1}}"#)
                .unwrap();
        let InboundMessage::AppMessage { payload } = msg else {
            panic!("expected app message");
        };
        assert_eq!(payload.timezone(), None);
        assert_eq!(payload.other["show_day_of_week"], 1);

        let msg = InboundMessage::parse(r#"{"event":"appmessage"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::AppMessage {
                payload: AppMessagePayload::default()
            }
        );
    }

    #[test]
    fn test_empty_timezone_is_absent() {
        let payload = AppMessagePayload {
            timezone_string: Some(String::new()),
            other: serde_json::Map::new(),
        };
        assert_eq!(payload.timezone(), None);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(InboundMessage::parse("hello").is_err());
        assert!(InboundMessage::parse(r#"{"event":"shutdown"}"#).is_err());
    }

    #[test]
    fn test_outbound_shapes() {
        let ready = serde_json::to_value(OutboundMessage::ready()).unwrap();
        assert_eq!(ready, serde_json::json!({ "js_ready": 1 }));

        let encoded = EncodedTwilight::from_dataset(&TwilightDataset::example());
        let twilight = serde_json::to_value(OutboundMessage::Twilight(encoded)).unwrap();
        assert_eq!(twilight["sunrise"], 371);
        assert!(twilight.get("js_ready").is_none());
    }

    #[tokio::test]
    async fn test_json_lines_channel_writes_one_line_per_message() {
        let channel = JsonLinesChannel::new(Vec::new());
        channel.send(&OutboundMessage::ready()).await.unwrap();
        channel
            .send(&OutboundMessage::Twilight(EncodedTwilight::from_dataset(
                &TwilightDataset::example(),
            )))
            .await
            .unwrap();

        let written = String::from_utf8(channel.into_inner()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"js_ready":1}"#);
        assert!(lines[1].starts_with(r#"{"sunrise":371,"#));
    }
}
