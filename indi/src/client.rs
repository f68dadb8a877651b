//! INDI client implementation
//!
//! This module provides the INDI client used by the panels:
//! - Connection with timeout and split reader/writer tasks
//! - Stream subscriptions keyed by `(device, property)`
//! - A bounded update queue fed by the reader task
//! - XML parse timeout for incomplete messages
//! - BLOB decoding
//! - Property min/max extraction
//! - Permission checking before writes

use crate::error::{IndiError, IndiResult};
use crate::protocol;
use crate::{
    IndiPermission, IndiProperty, IndiPropertyState, IndiPropertyType, IndiTimeoutConfig,
    INDI_DEFAULT_PORT, UPDATE_QUEUE_CAPACITY,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use quick_xml::events::Event;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{timeout, Instant};

/// Value of a single property element as received from the server
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for ElementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementValue::Text(s) => write!(f, "{}", s),
            ElementValue::Blob(data) => write!(f, "{}", String::from_utf8_lossy(data)),
        }
    }
}

/// One batch of element updates, keyed by `device.property.element`,
/// in the order the server sent them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMessage {
    pub values: Vec<(String, ElementValue)>,
}

impl UpdateMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for text values
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.push(key.to_string(), ElementValue::Text(value.to_string()));
        self
    }

    pub fn push(&mut self, key: String, value: ElementValue) {
        self.values.push((key, value));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ElementValue)> {
        self.values.iter()
    }
}

/// Number element limits (min, max, step)
#[derive(Debug, Clone, Default)]
pub struct NumberLimits {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub format: Option<String>,
}

/// Type alias for property value storage
type PropertyValueMap = HashMap<(String, String, String), String>;

/// Type alias for number limits storage
type NumberLimitsMap = HashMap<(String, String, String), NumberLimits>;

/// State shared between the client handle and its reader task
#[derive(Default)]
pub struct ClientState {
    properties: RwLock<HashMap<(String, String), IndiProperty>>,
    property_values: RwLock<PropertyValueMap>,
    number_limits: RwLock<NumberLimitsMap>,
    subscriptions: RwLock<HashSet<(String, String)>>,
}

impl ClientState {
    async fn clear(&self) {
        self.properties.write().await.clear();
        self.property_values.write().await.clear();
        self.number_limits.write().await.clear();
        self.subscriptions.write().await.clear();
    }

    async fn is_subscribed(&self, device: &str, property: &str) -> bool {
        self.subscriptions
            .read()
            .await
            .contains(&(device.to_string(), property.to_string()))
    }
}

/// INDI client for communicating with an INDI server
pub struct IndiClient {
    host: String,
    port: u16,
    connected: Arc<AtomicBool>,
    state: Arc<ClientState>,
    tx: Option<mpsc::Sender<String>>,
    updates: Option<mpsc::Receiver<UpdateMessage>>,
    /// Shutdown signal sender
    shutdown_tx: Option<oneshot::Sender<()>>,
    timeout_config: IndiTimeoutConfig,
}

impl IndiClient {
    /// Create a new INDI client
    pub fn new(host: &str, port: Option<u16>) -> Self {
        Self::with_timeout_config(host, port, IndiTimeoutConfig::default())
    }

    /// Create a new INDI client with custom timeout configuration
    pub fn with_timeout_config(
        host: &str,
        port: Option<u16>,
        timeout_config: IndiTimeoutConfig,
    ) -> Self {
        Self {
            host: host.to_string(),
            port: port.unwrap_or(INDI_DEFAULT_PORT),
            connected: Arc::new(AtomicBool::new(false)),
            state: Arc::new(ClientState::default()),
            tx: None,
            updates: None,
            shutdown_tx: None,
            timeout_config,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the timeout configuration
    pub fn timeout_config(&self) -> &IndiTimeoutConfig {
        &self.timeout_config
    }

    /// Connect to the INDI server
    ///
    /// Does nothing if the client is already connected.
    pub async fn connect(&mut self) -> IndiResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let addr = format!("{}:{}", self.host, self.port);
        let connection_timeout = self.timeout_config.connection_timeout();

        let stream = match timeout(connection_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(IndiError::ConnectionFailed(format!(
                    "Failed to connect to INDI server at {}: {}. Check that the server is running and the address is correct.",
                    addr, e
                )));
            }
            Err(_) => {
                return Err(IndiError::ConnectionTimeout {
                    host: self.host.clone(),
                    port: self.port,
                    duration: connection_timeout,
                });
            }
        };

        let (read_half, write_half) = stream.into_split();

        // Create channel for sending commands
        let (tx, rx) = mpsc::channel::<String>(100);
        self.tx = Some(tx);

        let (updates_tx, updates_rx) = mpsc::channel::<UpdateMessage>(UPDATE_QUEUE_CAPACITY);
        self.updates = Some(updates_rx);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(Self::writer_task(write_half, rx));

        let state = self.state.clone();
        let connected = self.connected.clone();
        let timeout_config = self.timeout_config.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = Self::reader_task(read_half, state, connected.clone(), updates_tx, timeout_config) => {
                    if let Err(e) = result {
                        tracing::error!("INDI reader task failed: {}", e);
                    }
                }
                _ = shutdown_rx => {
                    tracing::info!("INDI reader task received shutdown signal - graceful stop");
                }
            }
            connected.store(false, Ordering::SeqCst);
        });

        self.connected.store(true, Ordering::SeqCst);
        tracing::info!("Connected to INDI server {}", addr);

        self.send_command(&protocol::get_properties(None, None))
            .await?;

        Ok(())
    }

    /// Writer task - sends commands to INDI server
    async fn writer_task<W: AsyncWrite + Unpin>(mut writer: W, mut rx: mpsc::Receiver<String>) {
        while let Some(cmd) = rx.recv().await {
            if let Err(e) = writer.write_all(cmd.as_bytes()).await {
                tracing::error!("INDI write error: {}", e);
                break;
            }
            if let Err(e) = writer.write_all(b"\n").await {
                tracing::error!("INDI write error: {}", e);
                break;
            }
        }
    }

    /// Reader task - parses the INDI XML stream, updates the cache and
    /// queues one update message per completed vector of a subscribed stream
    pub async fn reader_task<R: AsyncRead + Unpin>(
        reader: R,
        state: Arc<ClientState>,
        connected: Arc<AtomicBool>,
        updates: mpsc::Sender<UpdateMessage>,
        timeout_config: IndiTimeoutConfig,
    ) -> IndiResult<()> {
        let mut reader = quick_xml::reader::Reader::from_reader(tokio::io::BufReader::new(reader));
        reader.trim_text(true);

        let mut buf = Vec::new();

        let mut current_device = String::new();
        let mut current_property = String::new();
        let mut current_element = String::new();
        let mut in_blob = false;
        let mut pending = UpdateMessage::new();

        let xml_timeout = timeout_config.message_timeout();
        let read_poll = timeout_config.read_poll();

        let mut incomplete_message_start: Option<Instant> = None;
        let mut incomplete_message_bytes: usize = 0;

        loop {
            if let Some(start) = incomplete_message_start {
                if start.elapsed() > xml_timeout {
                    let err = IndiError::MessageParseTimeout {
                        duration: xml_timeout,
                        bytes_received: incomplete_message_bytes,
                    };
                    tracing::warn!("{}. Resetting parser.", err);
                    buf.clear();
                    pending = UpdateMessage::new();
                    incomplete_message_start = None;
                    incomplete_message_bytes = 0;
                    continue;
                }
            }

            let read_result = timeout(read_poll, reader.read_event_into_async(&mut buf)).await;

            match read_result {
                Ok(Ok(Event::Start(e))) => {
                    incomplete_message_start = None;
                    incomplete_message_bytes = 0;
                    let name_str = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    // Handle property definitions (def*Vector)
                    if name_str.starts_with("def") && name_str.ends_with("Vector") {
                        if let (Some(dev), Some(prop)) =
                            (get_attribute(&e, "device"), get_attribute(&e, "name"))
                        {
                            current_device = dev;
                            current_property = prop;
                            pending = UpdateMessage::new();

                            let prop_type = parse_type(&name_str);
                            let state_value = parse_state(
                                &get_attribute(&e, "state").unwrap_or_else(|| "Idle".to_string()),
                            );
                            let perm = IndiPermission::parse(
                                &get_attribute(&e, "perm").unwrap_or_else(|| "rw".to_string()),
                            );

                            state.properties.write().await.insert(
                                (current_device.clone(), current_property.clone()),
                                IndiProperty {
                                    device: current_device.clone(),
                                    name: current_property.clone(),
                                    label: get_attribute(&e, "label")
                                        .unwrap_or_else(|| current_property.clone()),
                                    group: get_attribute(&e, "group").unwrap_or_default(),
                                    property_type: prop_type,
                                    state: state_value,
                                    perm,
                                    elements: Vec::new(),
                                },
                            );
                        }
                    }
                    // Handle element definitions (defText, defNumber, etc. inside Vector)
                    else if name_str.starts_with("def") {
                        if let Some(elem_name) = get_attribute(&e, "name") {
                            current_element = elem_name.clone();
                            in_blob = name_str == "defBLOB";

                            if let Some(prop) = state
                                .properties
                                .write()
                                .await
                                .get_mut(&(current_device.clone(), current_property.clone()))
                            {
                                prop.elements.push(elem_name.clone());
                            }

                            if name_str == "defNumber" {
                                let limits = NumberLimits {
                                    min: get_attribute(&e, "min").and_then(|s| s.parse().ok()),
                                    max: get_attribute(&e, "max").and_then(|s| s.parse().ok()),
                                    step: get_attribute(&e, "step").and_then(|s| s.parse().ok()),
                                    format: get_attribute(&e, "format"),
                                };
                                state.number_limits.write().await.insert(
                                    (current_device.clone(), current_property.clone(), elem_name),
                                    limits,
                                );
                            }
                        }
                    }
                    // Handle property updates (set*Vector, new*Vector)
                    else if (name_str.starts_with("set") || name_str.starts_with("new"))
                        && name_str.ends_with("Vector")
                    {
                        if let (Some(dev), Some(prop)) =
                            (get_attribute(&e, "device"), get_attribute(&e, "name"))
                        {
                            current_device = dev;
                            current_property = prop;
                            pending = UpdateMessage::new();

                            if let Some(state_str) = get_attribute(&e, "state") {
                                if let Some(p) = state.properties.write().await.get_mut(&(
                                    current_device.clone(),
                                    current_property.clone(),
                                )) {
                                    p.state = parse_state(&state_str);
                                }
                            }
                        }
                    }
                    // Handle element values (oneNumber, oneBLOB, etc.)
                    else if name_str.starts_with("one") {
                        if let Some(elem) = get_attribute(&e, "name") {
                            current_element = elem;
                        }
                        in_blob = name_str == "oneBLOB";
                    }
                }
                Ok(Ok(Event::Text(e))) => {
                    incomplete_message_start = None;
                    incomplete_message_bytes = 0;
                    let text = e.unescape().unwrap_or_default().to_string();
                    if current_device.is_empty()
                        || current_property.is_empty()
                        || current_element.is_empty()
                    {
                        buf.clear();
                        continue;
                    }

                    state.property_values.write().await.insert(
                        (
                            current_device.clone(),
                            current_property.clone(),
                            current_element.clone(),
                        ),
                        text.clone(),
                    );

                    let value = if in_blob {
                        match BASE64.decode(text.trim()) {
                            Ok(data) => Some(ElementValue::Blob(data)),
                            Err(e) => {
                                tracing::warn!(
                                    "Failed to decode BLOB base64 for {}.{}.{}: {}",
                                    current_device,
                                    current_property,
                                    current_element,
                                    e
                                );
                                None
                            }
                        }
                    } else {
                        Some(ElementValue::Text(text))
                    };

                    if let Some(value) = value {
                        pending.push(
                            format!("{}.{}.{}", current_device, current_property, current_element),
                            value,
                        );
                    }
                }
                Ok(Ok(Event::End(e))) => {
                    incomplete_message_start = None;
                    incomplete_message_bytes = 0;
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    let is_vector = name.ends_with("Vector")
                        && ["set", "new", "def"].iter().any(|p| name.starts_with(p));
                    if is_vector {
                        let message = std::mem::take(&mut pending);
                        if !message.is_empty()
                            && state.is_subscribed(&current_device, &current_property).await
                        {
                            match updates.try_send(message) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    tracing::warn!(
                                        "Update queue full, dropping update for {}.{}",
                                        current_device,
                                        current_property
                                    );
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => {
                                    tracing::debug!("Update queue closed, consumer has gone away");
                                }
                            }
                        }
                        current_property.clear();
                    } else if name.starts_with("one") || name.starts_with("def") {
                        current_element.clear();
                        in_blob = false;
                    }
                }
                Ok(Ok(Event::Eof)) => {
                    tracing::info!("INDI connection closed (EOF)");
                    connected.store(false, Ordering::SeqCst);
                    break;
                }
                Ok(Err(quick_xml::Error::Io(e))) => {
                    connected.store(false, Ordering::SeqCst);
                    return Err(IndiError::ConnectionFailed(format!("INDI read error: {}", e)));
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        "INDI XML parse error: {}. Raw buffer (first 200 chars): {:?}",
                        e,
                        String::from_utf8_lossy(&buf[..buf.len().min(200)])
                    );
                }
                Err(_) => {
                    // Read timeout - check if connection is still alive
                    if !connected.load(Ordering::SeqCst) {
                        break;
                    }
                    if !buf.is_empty() {
                        if incomplete_message_start.is_none() {
                            incomplete_message_start = Some(Instant::now());
                        }
                        incomplete_message_bytes = buf.len();
                    }
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Disconnect from the INDI server
    ///
    /// Stops the reader task, closes the writer channel, drops the update
    /// queue and clears all cached property state and subscriptions.
    pub async fn disconnect(&mut self) -> IndiResult<()> {
        tracing::info!("Disconnecting from INDI server {}:{}", self.host, self.port);

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        self.tx = None;
        self.updates = None;
        self.connected.store(false, Ordering::SeqCst);
        self.state.clear().await;

        Ok(())
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Hand out the update queue receiver (once per connection)
    pub fn take_updates(&mut self) -> Option<mpsc::Receiver<UpdateMessage>> {
        self.updates.take()
    }

    /// Subscribe to a `device.property` stream
    pub async fn subscribe(&mut self, device: &str, property: &str) -> IndiResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(IndiError::NotConnected);
        }
        self.state
            .subscriptions
            .write()
            .await
            .insert((device.to_string(), property.to_string()));
        self.send_command(&protocol::get_properties(Some(device), Some(property)))
            .await
    }

    /// Stop forwarding updates for a `device.property` stream
    pub async fn unsubscribe(&mut self, device: &str, property: &str) -> IndiResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(IndiError::NotConnected);
        }
        let removed = self
            .state
            .subscriptions
            .write()
            .await
            .remove(&(device.to_string(), property.to_string()));
        if removed {
            Ok(())
        } else {
            Err(IndiError::PropertyNotFound {
                device: device.to_string(),
                property: property.to_string(),
            })
        }
    }

    /// Currently subscribed streams, sorted
    pub async fn subscriptions(&self) -> Vec<(String, String)> {
        let mut subs: Vec<_> = self.state.subscriptions.read().await.iter().cloned().collect();
        subs.sort();
        subs
    }

    /// Send a raw INDI command
    pub async fn send_command(&mut self, command: &str) -> IndiResult<()> {
        if let Some(tx) = &self.tx {
            tx.send(command.to_string()).await.map_err(|e| {
                IndiError::ChannelClosed(format!(
                    "Failed to send INDI command to {}:{}: {}. The connection may have been lost.",
                    self.host, self.port, e
                ))
            })
        } else {
            Err(IndiError::NotConnected)
        }
    }

    /// Get a property value
    pub async fn get_property_value(
        &self,
        device: &str,
        property: &str,
        element: &str,
    ) -> Option<String> {
        self.state
            .property_values
            .read()
            .await
            .get(&(
                device.to_string(),
                property.to_string(),
                element.to_string(),
            ))
            .cloned()
    }

    /// Get number limits for a property element
    pub async fn get_number_limits(
        &self,
        device: &str,
        property: &str,
        element: &str,
    ) -> Option<NumberLimits> {
        self.state
            .number_limits
            .read()
            .await
            .get(&(
                device.to_string(),
                property.to_string(),
                element.to_string(),
            ))
            .cloned()
    }

    /// Get property permission
    pub async fn get_property_permission(
        &self,
        device: &str,
        property: &str,
    ) -> Option<IndiPermission> {
        self.state
            .properties
            .read()
            .await
            .get(&(device.to_string(), property.to_string()))
            .map(|p| p.perm)
    }

    /// Check property permission before write
    fn check_write_permission(&self, perm: IndiPermission, property: &str) -> IndiResult<()> {
        if perm.is_writable() {
            Ok(())
        } else {
            Err(IndiError::PermissionDenied(format!(
                "Property '{}' is read-only",
                property
            )))
        }
    }

    async fn ensure_writable(&self, device: &str, property: &str) -> IndiResult<()> {
        if let Some(perm) = self.get_property_permission(device, property).await {
            self.check_write_permission(perm, property)?;
        }
        Ok(())
    }

    /// Validate number value against limits
    async fn validate_number_limits(
        &self,
        device: &str,
        property: &str,
        element: &str,
        value: f64,
    ) -> IndiResult<()> {
        if let Some(limits) = self.get_number_limits(device, property, element).await {
            if let (Some(min), Some(max)) = (limits.min, limits.max) {
                if value < min || value > max {
                    return Err(IndiError::ValueOutOfRange {
                        device: device.to_string(),
                        property: property.to_string(),
                        element: element.to_string(),
                        value,
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Set a switch property with permission check
    pub async fn set_switch(
        &mut self,
        device: &str,
        property: &str,
        element: &str,
        state: bool,
    ) -> IndiResult<()> {
        self.ensure_writable(device, property).await?;
        let state_str = if state { "On" } else { "Off" };
        let cmd = protocol::new_vector("Switch", device, property, element, state_str);
        self.send_command(&cmd).await
    }

    /// Set a number property with permission and limits check
    pub async fn set_number(
        &mut self,
        device: &str,
        property: &str,
        element: &str,
        value: f64,
    ) -> IndiResult<()> {
        self.ensure_writable(device, property).await?;
        self.validate_number_limits(device, property, element, value)
            .await?;
        let cmd = protocol::new_vector("Number", device, property, element, &value.to_string());
        self.send_command(&cmd).await
    }

    /// Set a text property with permission check
    pub async fn set_text(
        &mut self,
        device: &str,
        property: &str,
        element: &str,
        value: &str,
    ) -> IndiResult<()> {
        self.ensure_writable(device, property).await?;
        let cmd = protocol::new_vector("Text", device, property, element, value);
        self.send_command(&cmd).await
    }
}

/// Helper to get attribute from XML event
fn get_attribute(e: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn parse_type(vector: &str) -> IndiPropertyType {
    if vector.contains("Switch") {
        IndiPropertyType::Switch
    } else if vector.contains("Number") {
        IndiPropertyType::Number
    } else if vector.contains("Light") {
        IndiPropertyType::Light
    } else if vector.contains("BLOB") {
        IndiPropertyType::Blob
    } else {
        IndiPropertyType::Text
    }
}

fn parse_state(s: &str) -> IndiPropertyState {
    match s {
        "Idle" => IndiPropertyState::Idle,
        "Ok" => IndiPropertyState::Ok,
        "Busy" => IndiPropertyState::Busy,
        "Alert" => IndiPropertyState::Alert,
        _ => IndiPropertyState::Idle,
    }
}

impl Default for IndiClient {
    fn default() -> Self {
        Self::new("localhost", None)
    }
}
