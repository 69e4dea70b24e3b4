//! Delivery of the finished message to the paired device.

use async_trait::async_trait;
use reqwest::Client;
use std::{
    fmt::Debug,
    io::Write,
    sync::Mutex,
};

use crate::{error::DeliveryError, model::OutboundMessage};

/// The send primitive. Called at most once per run; never retried.
#[async_trait]
pub trait MessageSink: Send + Sync + Debug {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

/// Writes each message as one line of compact JSON.
pub struct JsonLinesSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self { out: Mutex::new(Box::new(out)) }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{line}")?;
        out.flush()
    }
}

impl Debug for JsonLinesSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink").finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageSink for JsonLinesSink {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let line = serde_json::to_string(message)?;
        self.write_line(&line)?;
        Ok(())
    }
}

/// POSTs each message as JSON to a relay that talks to the watch.
#[derive(Debug, Clone)]
pub struct HttpSink {
    url: String,
    http: Client,
}

impl HttpSink {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self { url: url.into(), http }
    }
}

#[async_trait]
impl MessageSink for HttpSink {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let res = self.http.post(&self.url).json(message).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{condition::IconCategory, model::OutboundMessage};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_one_line_per_message() {
        let buf = SharedBuf::default();
        let sink = JsonLinesSink::new(buf.clone());
        let msg = OutboundMessage {
            cur_temp: 22,
            high_temp: 25,
            low_temp: 18,
            conditions: Some(IconCategory::Rain),
            location: "Springfield".into(),
        };

        sink.send(&msg).await.unwrap();
        sink.send(&msg).await.unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"CUR_TEMP":22,"HIGH_TEMP":25,"LOW_TEMP":18,"CONDITIONS":3,"LOCATION":"Springfield"}"#
        );
    }
}
