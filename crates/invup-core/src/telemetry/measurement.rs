//! Delivery of analytics events over the GA4 Measurement Protocol.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Properties, TelemetryEvent, TelemetrySink, TelemetryValue};

enum Command {
    Event(TelemetryEvent),
    UserProperties(Properties),
}

/// Sink that queues events for a background delivery task.
///
/// `emit` only pushes onto an unbounded channel. The task returned by
/// [`MeasurementProtocolSink::spawn`] finishes once every clone of the sink
/// has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct MeasurementProtocolSink {
    tx: mpsc::UnboundedSender<Command>,
}

impl MeasurementProtocolSink {
    /// Start the delivery task. Must be called inside a Tokio runtime.
    pub fn spawn(
        client: reqwest::Client,
        endpoint: &str,
        measurement_id: &str,
        api_secret: &str,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            client,
            endpoint: endpoint.to_string(),
            measurement_id: measurement_id.to_string(),
            api_secret: api_secret.to_string(),
            client_id: uuid::Uuid::new_v4().to_string(),
            user_properties: Properties::new(),
        };
        let handle = tokio::spawn(worker.run(rx));
        (Self { tx }, handle)
    }
}

impl TelemetrySink for MeasurementProtocolSink {
    fn emit(&self, event: TelemetryEvent) {
        if self.tx.send(Command::Event(event)).is_err() {
            debug!("telemetry worker stopped, dropping event");
        }
    }

    fn set_user_properties(&self, properties: Properties) {
        let _ = self.tx.send(Command::UserProperties(properties));
    }
}

struct Worker {
    client: reqwest::Client,
    endpoint: String,
    measurement_id: String,
    api_secret: String,
    client_id: String,
    user_properties: Properties,
}

#[derive(Serialize)]
struct Payload<'a> {
    client_id: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    user_properties: BTreeMap<&'a str, UserProperty<'a>>,
    events: [EventBody<'a>; 1],
}

#[derive(Serialize)]
struct UserProperty<'a> {
    value: &'a TelemetryValue,
}

#[derive(Serialize)]
struct EventBody<'a> {
    name: &'a str,
    params: &'a Properties,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Event(event) => {
                    if let Err(e) = self.deliver(&event).await {
                        warn!(event = %event.name, "failed to deliver telemetry: {}", e);
                    }
                }
                Command::UserProperties(properties) => {
                    self.user_properties.extend(properties);
                }
            }
        }
        debug!("telemetry worker finished");
    }

    async fn deliver(&self, event: &TelemetryEvent) -> Result<(), String> {
        let payload = Payload {
            client_id: &self.client_id,
            user_properties: self
                .user_properties
                .iter()
                .map(|(k, v)| (k.as_str(), UserProperty { value: v }))
                .collect(),
            events: [EventBody {
                name: &event.name,
                params: &event.properties,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("measurement_id", self.measurement_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("collector answered {}", response.status()));
        }

        debug!(event = %event.name, "telemetry delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_events_are_delivered_with_user_properties() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/mp/collect")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("measurement_id".into(), "G-TEST".into()),
                Matcher::UrlEncoded("api_secret".into(), "secret".into()),
            ]))
            .match_body(Matcher::PartialJson(json!({
                "user_properties": {"userType": {"value": "authenticated"}},
                "events": [{"name": "invoice_upload_error", "params": {"error": "denied"}}]
            })))
            .with_status(204)
            .create_async()
            .await;

        let endpoint = format!("{}/mp/collect", server.url());
        let (sink, handle) =
            MeasurementProtocolSink::spawn(reqwest::Client::new(), &endpoint, "G-TEST", "secret");

        let mut properties = Properties::new();
        properties.insert("userType".into(), "authenticated".into());
        sink.set_user_properties(properties);
        sink.emit(TelemetryEvent::upload_error("denied"));
        drop(sink);

        handle.await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/mp/collect")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let endpoint = format!("{}/mp/collect", server.url());
        let (sink, handle) =
            MeasurementProtocolSink::spawn(reqwest::Client::new(), &endpoint, "G-TEST", "secret");

        sink.emit(TelemetryEvent::interaction("upload_start"));
        sink.emit(TelemetryEvent::processing_error("boom"));
        drop(sink);

        handle.await.unwrap();
        mock.assert_async().await;
    }
}
