//! Device-client seam
//!
//! The panel talks to devices through [`DeviceClient`] and opens clients
//! through [`Connector`]; the INDI implementations live here.

use crate::error::PanelResult;
use crate::property::Value;
use async_trait::async_trait;
use maps_indi::{split_key, IndiClient, IndiTimeoutConfig, UpdateMessage};
use tokio::sync::mpsc;

/// An open connection to a device server
#[async_trait]
pub trait DeviceClient: Send {
    async fn subscribe(&mut self, device: &str, property: &str) -> PanelResult<()>;

    async fn unsubscribe(&mut self, device: &str, property: &str) -> PanelResult<()>;

    /// Write one value, addressed by its `device.property[.element]` key
    async fn send_value(&mut self, key: &str, value: &Value) -> PanelResult<()>;

    /// Hand out the update queue; `None` once taken
    fn take_updates(&mut self) -> Option<mpsc::Receiver<UpdateMessage>>;

    async fn close(&mut self) -> PanelResult<()>;
}

/// Opens device clients
#[async_trait]
pub trait Connector: Send {
    async fn open(&mut self, host: &str, port: u16) -> PanelResult<Box<dyn DeviceClient>>;
}

#[async_trait]
impl DeviceClient for IndiClient {
    async fn subscribe(&mut self, device: &str, property: &str) -> PanelResult<()> {
        Ok(IndiClient::subscribe(self, device, property).await?)
    }

    async fn unsubscribe(&mut self, device: &str, property: &str) -> PanelResult<()> {
        Ok(IndiClient::unsubscribe(self, device, property).await?)
    }

    async fn send_value(&mut self, key: &str, value: &Value) -> PanelResult<()> {
        let (device, property, element) = split_key(key)?;
        let element = element.unwrap_or(property);
        match value {
            Value::Float(v) => self.set_number(device, property, element, *v).await?,
            Value::Int(v) => self.set_number(device, property, element, *v as f64).await?,
            Value::Bool(v) => self.set_switch(device, property, element, *v).await?,
            Value::Text(_) | Value::Binary(_) => {
                self.set_text(device, property, element, &value.display())
                    .await?
            }
        }
        Ok(())
    }

    fn take_updates(&mut self) -> Option<mpsc::Receiver<UpdateMessage>> {
        IndiClient::take_updates(self)
    }

    async fn close(&mut self) -> PanelResult<()> {
        Ok(self.disconnect().await?)
    }
}

/// Opens TCP connections to an INDI server
#[derive(Debug, Clone, Default)]
pub struct IndiConnector {
    timeout_config: IndiTimeoutConfig,
}

impl IndiConnector {
    pub fn new(timeout_config: IndiTimeoutConfig) -> Self {
        Self { timeout_config }
    }
}

#[async_trait]
impl Connector for IndiConnector {
    async fn open(&mut self, host: &str, port: u16) -> PanelResult<Box<dyn DeviceClient>> {
        let mut client =
            IndiClient::with_timeout_config(host, Some(port), self.timeout_config.clone());
        client.connect().await?;
        Ok(Box::new(client))
    }
}
