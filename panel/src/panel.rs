//! Panel controller
//!
//! Owns the active module's records, the presentation model and the device
//! connection, and runs the refresh cycle ([`Panel::alarm`]).
//!
//! State machine:
//!
//! ```text
//! Disconnected (simulating) --connect ok--> Connected (live)
//! Connected --disconnect | subscribe failure--> Disconnected (simulating)
//! ```

use crate::config::PanelConfig;
use crate::error::{PanelError, PanelResult};
use crate::link::{Connector, DeviceClient};
use crate::paginate::{page_hint, paginate};
use crate::presentation::{Banner, ControlKind, PanelKind, Presentation, Widget};
use crate::property::{DataRange, Style, Value};
use crate::simulator::Simulator;
use crate::table::{self, Module, PropertyRecord, PropertyTable};
use maps_indi::{IndiError, UpdateMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// How long a live tick waits for one update message
pub const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// What one refresh tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One simulation step was applied
    Simulated,
    /// A message was dequeued; the count is how many keys were applied
    Applied(usize),
    /// Nothing arrived before the dequeue timeout
    Idle,
    /// The update queue is closed or absent
    QueueUnavailable,
}

pub struct Panel {
    kind: PanelKind,
    config: PanelConfig,
    module: Module,
    streams: Vec<(String, String)>,
    nelms: usize,
    page_hint: i64,
    view: Presentation,
    banner: Banner,
    connector: Box<dyn Connector>,
    client: Option<Box<dyn DeviceClient>>,
    updates: Option<mpsc::Receiver<UpdateMessage>>,
    simulator: Box<dyn Simulator>,
    connected: bool,
    simulating: bool,
    step: u64,
    dequeue_timeout: Duration,
}

impl Panel {
    /// Build a panel for `config.module` and lay out its pages
    pub fn new(
        kind: PanelKind,
        config: PanelConfig,
        table: PropertyTable,
        connector: Box<dyn Connector>,
        simulator: Box<dyn Simulator>,
    ) -> PanelResult<Self> {
        let module = table.into_module(&config.module)?;

        let (streams, nelms) = {
            let keys: Vec<&str> = module
                .records
                .iter()
                .filter(|(_, r)| !kind.writable_only() || r.is_writable())
                .map(|(k, _)| k)
                .collect();
            (table::streams(keys.iter().copied()), keys.len())
        };

        if kind == PanelKind::Control && nelms == 0 {
            tracing::warn!("No (writeable) controls selected in module '{}'", module.name);
        }
        tracing::debug!(
            "Module '{}' has {} entries over streams {:?}",
            module.name,
            nelms,
            streams
        );

        let mut panel = Self {
            kind,
            page_hint: page_hint(nelms, config.items),
            config,
            module,
            streams,
            nelms,
            view: Presentation::default(),
            banner: Banner::default(),
            connector,
            client: None,
            updates: None,
            simulator,
            connected: false,
            simulating: true,
            step: 0,
            dequeue_timeout: DEQUEUE_TIMEOUT,
        };
        panel.layout();
        Ok(panel)
    }

    pub fn with_dequeue_timeout(mut self, dequeue_timeout: Duration) -> Self {
        self.dequeue_timeout = dequeue_timeout;
        self
    }

    /// Rebuild pages and the `key -> widget` maps from the current records
    pub fn layout(&mut self) {
        let pagination = paginate(
            self.module.records.entries(self.kind.writable_only()),
            self.page_hint,
            self.config.items as i64,
        );
        self.view = Presentation::build(self.kind, &self.module, &pagination);
        tracing::debug!(
            "Laid out {} page(s) of {} for module '{}'",
            self.view.pages.len(),
            self.config.items,
            self.module.name
        );
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn record(&self, key: &str) -> Option<&PropertyRecord> {
        self.module.records.get(key)
    }

    pub fn streams(&self) -> &[(String, String)] {
        &self.streams
    }

    pub fn view(&self) -> &Presentation {
        &self.view
    }

    pub fn banner(&self) -> &Banner {
        &self.banner
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Whether a control panel has anything to offer
    pub fn has_controls(&self) -> bool {
        self.nelms > 0
    }

    /// Manual simulation toggle
    pub fn set_simulate(&mut self, state: bool) {
        self.simulating = state;
        if state {
            tracing::info!("Simulation mode enabled");
        } else {
            tracing::info!("Simulation mode disabled");
        }
    }

    fn update_banner(&mut self, connected: bool, text: String) {
        if connected {
            tracing::info!("{}", text);
        } else {
            tracing::error!("{}", text);
        }
        self.connected = connected;
        self.simulating = !connected;
        self.banner = Banner {
            text,
            ok: connected,
        };
    }

    /// Connect to the device server and subscribe to every stream.
    ///
    /// Does nothing when already connected.
    pub async fn connect(&mut self) {
        if self.connected {
            tracing::debug!(
                "Already connected to {}:{}",
                self.config.host,
                self.config.port
            );
            return;
        }

        let mut client = match self
            .connector
            .open(&self.config.host, self.config.port)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                self.client = None;
                self.updates = None;
                self.update_banner(false, format!("failed to connect to indi, error='{}'", e));
                return;
            }
        };

        self.updates = client.take_updates();
        self.update_banner(true, "connected to indi OK".to_string());

        let result = subscribe_all(client.as_mut(), &self.streams).await;
        self.client = Some(client);
        match result {
            Ok(()) => {
                tracing::debug!("Subscribed to {:?}", self.streams);
                self.update_banner(true, "subscribed to streams OK".to_string());
            }
            Err(e) => {
                self.update_banner(
                    false,
                    format!("failed to subscribe to streams, error='{}'", e),
                );
            }
        }
    }

    /// Unsubscribe every stream and drop the client.
    ///
    /// The panel ends up disconnected and simulating even when an
    /// unsubscribe fails.
    pub async fn disconnect(&mut self) {
        let result = match self.client.as_mut() {
            Some(client) => unsubscribe_all(client.as_mut(), &self.streams).await,
            None => Err(IndiError::NotConnected.into()),
        };

        match result {
            Ok(()) => self.update_banner(false, "Disconnected from INDI".to_string()),
            Err(e) => self.update_banner(
                false,
                format!("Failed to disconnect from indi streams, error='{}'", e),
            ),
        }

        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.close().await {
                tracing::warn!("Error closing device client: {}", e);
            }
        }
        self.updates = None;
    }

    /// One refresh tick
    pub async fn alarm(&mut self) -> TickOutcome {
        self.step += 1;
        let outcome = if self.simulating {
            self.simulate_tick();
            TickOutcome::Simulated
        } else {
            self.live_tick().await
        };
        tracing::trace!(
            "step={} connected={} simulating={} outcome={:?}",
            self.step,
            self.connected,
            self.simulating,
            outcome
        );
        outcome
    }

    fn simulate_tick(&mut self) {
        self.simulator.step(&mut self.module.records);
        for (key, record) in self.module.records.iter_mut() {
            match record.actval.coerce(record.datatype) {
                Ok(value) => record.actval = value,
                Err(e) => {
                    tracing::warn!("Simulated value for {} skipped: {}", key, e);
                    continue;
                }
            }
            if let Some(widget) = self.view.values.get_mut(key) {
                widget.refresh(record.datatype, &record.actval);
                recolor(key, record, widget);
            }
        }
    }

    async fn live_tick(&mut self) -> TickOutcome {
        let Some(updates) = self.updates.as_mut() else {
            tracing::error!("No update queue available");
            self.report_not_connected();
            return TickOutcome::QueueUnavailable;
        };

        match timeout(self.dequeue_timeout, updates.recv()).await {
            Err(_) => TickOutcome::Idle,
            Ok(None) => {
                tracing::error!("Update queue closed");
                self.report_not_connected();
                TickOutcome::QueueUnavailable
            }
            Ok(Some(message)) => TickOutcome::Applied(self.apply_update(&message)),
        }
    }

    fn report_not_connected(&self) {
        if !self.connected {
            tracing::error!("You are not connected to the INDI server!");
        }
    }

    /// Apply one update message in arrival order; the first value that
    /// cannot be coerced stops the rest of the message
    fn apply_update(&mut self, message: &UpdateMessage) -> usize {
        let mut applied = 0;
        for (key, element) in message.iter() {
            let Some(record) = self.module.records.get_mut(key) else {
                continue;
            };
            match Value::from_element(record.datatype, element) {
                Ok(value) => record.actval = value,
                Err(e) => {
                    tracing::error!("Dropping rest of update at {}: {}", key, e);
                    break;
                }
            }
            if let Some(widget) = self.view.values.get_mut(key) {
                widget.set_text(record.actval.display());
                recolor(key, record, widget);
            }
            applied += 1;
        }
        applied
    }

    fn writable(&self, key: &str) -> PanelResult<&PropertyRecord> {
        self.module
            .records
            .get(key)
            .filter(|r| r.is_writable())
            .ok_or_else(|| PanelError::UnknownKey(key.to_string()))
    }

    /// Slider moved: update the readout and colour it against the record range
    pub fn slider_moved(&mut self, key: &str, position: i64) -> PanelResult<Style> {
        let style = match &self.writable(key)?.datarange {
            Some(range @ DataRange::Interval { .. }) => range.classify_position(position),
            _ => Style::Neutral,
        };
        let control = self
            .view
            .controls
            .get_mut(key)
            .ok_or_else(|| PanelError::UnknownKey(key.to_string()))?;
        let ControlKind::Slider(spec) = &mut control.kind else {
            return Err(PanelError::NoControl {
                key: key.to_string(),
                control: "slider",
            });
        };

        let position = position.clamp(spec.lower, spec.upper);
        spec.value = position;
        control.lcd = Some(position);
        control.widget.set_text(position.to_string());
        control.widget.style = style;
        tracing::debug!("{} slider moved to {}", key, position);
        Ok(style)
    }

    /// Slider released: send its position
    pub async fn slider_released(&mut self, key: &str) -> PanelResult<()> {
        let datatype = self.writable(key)?.datatype;
        let position = match self.view.controls.get(key).map(|c| &c.kind) {
            Some(ControlKind::Slider(spec)) => spec.value,
            _ => {
                return Err(PanelError::NoControl {
                    key: key.to_string(),
                    control: "slider",
                })
            }
        };
        let value = Value::Int(position).coerce(datatype)?;
        self.submit(key, value).await
    }

    /// Radio button toggled on: send the chosen value
    pub async fn radio_toggled(&mut self, key: &str, choice: &Value) -> PanelResult<()> {
        let datatype = self.writable(key)?.datatype;
        let control = self
            .view
            .controls
            .get_mut(key)
            .ok_or_else(|| PanelError::UnknownKey(key.to_string()))?;
        let ControlKind::RadioGroup(choices) = &control.kind else {
            return Err(PanelError::NoControl {
                key: key.to_string(),
                control: "radio",
            });
        };
        if !choices.iter().any(|c| c.matches(choice)) {
            return Err(PanelError::Coercion {
                datatype,
                value: choice.display(),
            });
        }
        let value = choice.coerce(datatype)?;
        control.widget.set_text(value.display());
        self.submit(key, value).await
    }

    /// Line edit submitted: coerce the text and send it
    pub async fn line_edit_submitted(&mut self, key: &str, text: &str) -> PanelResult<()> {
        let datatype = self.writable(key)?.datatype;
        let value = Value::Text(text.to_string()).coerce(datatype)?;
        if let Some(control) = self.view.controls.get_mut(key) {
            control.widget.set_text(value.display());
        }
        self.submit(key, value).await
    }

    async fn submit(&mut self, key: &str, value: Value) -> PanelResult<()> {
        match self.client.as_mut() {
            Some(client) if self.connected => {
                if let Err(e) = client.send_value(key, &value).await {
                    tracing::error!("Failed to send {}={}: {}", key, value.display(), e);
                    return Err(e);
                }
                tracing::info!("Sent {}={}", key, value.display());
            }
            _ => {
                tracing::warn!(
                    "You are not connected to the INDI server! {} changed to {}",
                    key,
                    value.display()
                );
            }
        }
        Ok(())
    }
}

async fn subscribe_all(
    client: &mut dyn DeviceClient,
    streams: &[(String, String)],
) -> PanelResult<()> {
    for (device, property) in streams {
        tracing::debug!("Subscribing to device='{}', name='{}'", device, property);
        client.subscribe(device, property).await?;
    }
    Ok(())
}

async fn unsubscribe_all(
    client: &mut dyn DeviceClient,
    streams: &[(String, String)],
) -> PanelResult<()> {
    for (device, property) in streams {
        tracing::debug!("Unsubscribing from device='{}', name='{}'", device, property);
        client.unsubscribe(device, property).await?;
    }
    Ok(())
}

/// Restyle a value widget from its record's range; records without a range
/// keep their current style
fn recolor(key: &str, record: &PropertyRecord, widget: &mut Widget) {
    let Some(style) = record.range_style() else {
        return;
    };
    if style != widget.style {
        let value = record.actval.display();
        match (style, &record.datarange) {
            (Style::Cold, Some(DataRange::Interval { min, .. })) => {
                tracing::warn!("{} value too cold! {} < {}", key, value, min)
            }
            (Style::Hot, Some(DataRange::Interval { max, .. })) => {
                tracing::warn!("{} value too hot! {} > {}", key, value, max)
            }
            (Style::Invalid, _) => tracing::warn!("{} value invalid! {}", key, value),
            _ => {}
        }
    }
    widget.style = style;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::DataType;
    use crate::table::PropertyMap;
    use async_trait::async_trait;
    use maps_indi::{IndiPermission, UPDATE_QUEUE_CAPACITY};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Shared {
        log: Vec<String>,
        sender: Option<mpsc::Sender<UpdateMessage>>,
    }

    struct MockClient {
        shared: Arc<Mutex<Shared>>,
        updates: Option<mpsc::Receiver<UpdateMessage>>,
        fail_subscribe: bool,
        fail_unsubscribe: bool,
    }

    #[async_trait]
    impl DeviceClient for MockClient {
        async fn subscribe(&mut self, device: &str, property: &str) -> PanelResult<()> {
            if self.fail_subscribe {
                return Err(IndiError::NotConnected.into());
            }
            self.shared
                .lock()
                .unwrap()
                .log
                .push(format!("sub {}.{}", device, property));
            Ok(())
        }

        async fn unsubscribe(&mut self, device: &str, property: &str) -> PanelResult<()> {
            if self.fail_unsubscribe {
                return Err(IndiError::PropertyNotFound {
                    device: device.to_string(),
                    property: property.to_string(),
                }
                .into());
            }
            self.shared
                .lock()
                .unwrap()
                .log
                .push(format!("unsub {}.{}", device, property));
            Ok(())
        }

        async fn send_value(&mut self, key: &str, value: &Value) -> PanelResult<()> {
            self.shared
                .lock()
                .unwrap()
                .log
                .push(format!("send {}={}", key, value.display()));
            Ok(())
        }

        fn take_updates(&mut self) -> Option<mpsc::Receiver<UpdateMessage>> {
            self.updates.take()
        }

        async fn close(&mut self) -> PanelResult<()> {
            self.shared.lock().unwrap().log.push("close".to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockConnector {
        shared: Arc<Mutex<Shared>>,
        refuse: bool,
        fail_subscribe: bool,
        fail_unsubscribe: bool,
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn open(&mut self, host: &str, port: u16) -> PanelResult<Box<dyn DeviceClient>> {
            if self.refuse {
                let reason = format!("{}:{} refused", host, port);
                return Err(IndiError::ConnectionFailed(reason).into());
            }
            let (tx, rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
            let mut shared = self.shared.lock().unwrap();
            shared.log.push("open".to_string());
            shared.sender = Some(tx);
            Ok(Box::new(MockClient {
                shared: self.shared.clone(),
                updates: Some(rx),
                fail_subscribe: self.fail_subscribe,
                fail_unsubscribe: self.fail_unsubscribe,
            }))
        }
    }

    fn record(
        datatype: DataType,
        range: Option<DataRange>,
        actval: Value,
        perm: IndiPermission,
    ) -> PropertyRecord {
        PropertyRecord {
            datatype,
            datarange: range,
            actval,
            permission: perm,
            ..Default::default()
        }
    }

    fn table() -> PropertyTable {
        let mut m = Module::new("test", "Test", "#E2FDDB");
        m.insert(
            "dev.temp.value",
            record(
                DataType::Float,
                Some(DataRange::Interval { min: 10.0, max: 20.0 }),
                Value::Float(12.0),
                IndiPermission::ReadWrite,
            ),
        )
        .unwrap();
        m.insert(
            "dev.mode.value",
            record(
                DataType::Int,
                Some(DataRange::Choices(vec![Value::Int(1), Value::Int(2), Value::Int(3)])),
                Value::Int(1),
                IndiPermission::ReadWrite,
            ),
        )
        .unwrap();
        m.insert(
            "dev.note.text",
            record(DataType::Text, None, Value::Text("hello".into()), IndiPermission::ReadWrite),
        )
        .unwrap();
        m.insert(
            "other.count.value",
            record(DataType::Int, None, Value::Int(0), IndiPermission::ReadOnly),
        )
        .unwrap();
        let mut table = PropertyTable::new();
        table.add_module(m).unwrap();
        table
    }

    fn config() -> PanelConfig {
        PanelConfig {
            module: "test".to_string(),
            ..Default::default()
        }
    }

    /// Simulator that replays fixed values for one key
    fn replay(key: &'static str, values: Vec<Value>) -> Box<dyn Simulator> {
        let mut values = values.into_iter();
        Box::new(move |records: &mut PropertyMap| {
            if let (Some(value), Some(record)) = (values.next(), records.get_mut(key)) {
                record.actval = value;
            }
        })
    }

    fn panel(kind: PanelKind, connector: MockConnector, simulator: Box<dyn Simulator>) -> Panel {
        Panel::new(kind, config(), table(), Box::new(connector), simulator)
            .unwrap()
            .with_dequeue_timeout(Duration::from_millis(20))
    }

    fn style(panel: &Panel, key: &str) -> Style {
        panel.view().values[key].style
    }

    #[tokio::test]
    async fn test_simulated_interval_recolour() {
        let sim = replay(
            "dev.temp.value",
            vec![Value::Float(9.9), Value::Float(20.1), Value::Float(15.0)],
        );
        let mut p = panel(PanelKind::Status, MockConnector::default(), sim);
        assert!(p.is_simulating());

        assert_eq!(p.alarm().await, TickOutcome::Simulated);
        assert_eq!(style(&p, "dev.temp.value"), Style::Cold);
        assert_eq!(p.view().values["dev.temp.value"].text, "9.9");

        p.alarm().await;
        assert_eq!(style(&p, "dev.temp.value"), Style::Hot);

        p.alarm().await;
        assert_eq!(style(&p, "dev.temp.value"), Style::Neutral);
        assert_eq!(p.step(), 3);
    }

    #[tokio::test]
    async fn test_simulated_choice_recolour() {
        let sim = replay("dev.mode.value", vec![Value::Int(5), Value::Int(2)]);
        let mut p = panel(PanelKind::Status, MockConnector::default(), sim);

        p.alarm().await;
        assert_eq!(style(&p, "dev.mode.value"), Style::Invalid);
        p.alarm().await;
        assert_eq!(style(&p, "dev.mode.value"), Style::Neutral);
        assert_eq!(style(&p, "other.count.value"), Style::Neutral);
    }

    #[tokio::test]
    async fn test_simulated_rewrites() {
        let sim = replay("dev.temp.value", vec![Value::Float(15.0), Value::Float(15.0)]);
        let mut p = panel(PanelKind::Status, MockConnector::default(), sim);

        p.alarm().await;
        p.alarm().await;
        assert_eq!(p.view().values["dev.temp.value"].redraws, 1);
        assert_eq!(p.view().values["other.count.value"].redraws, 0);
        assert_eq!(p.view().values["dev.note.text"].redraws, 2);
    }

    #[tokio::test]
    async fn test_simulated_values_follow_datatype() {
        let sim: Box<dyn Simulator> = Box::new(|records: &mut PropertyMap| {
            if let Some(record) = records.get_mut("dev.temp.value") {
                record.actval = Value::Int(5);
            }
            if let Some(record) = records.get_mut("dev.mode.value") {
                record.actval = Value::Text("2".into());
            }
            if let Some(record) = records.get_mut("other.count.value") {
                record.actval = Value::Text("many".into());
            }
        });
        let mut p = panel(PanelKind::Status, MockConnector::default(), sim);

        p.alarm().await;
        assert_eq!(p.record("dev.temp.value").unwrap().actval, Value::Float(5.0));
        assert_eq!(p.view().values["dev.temp.value"].text, "5.0");
        assert_eq!(style(&p, "dev.temp.value"), Style::Cold);
        assert_eq!(p.record("dev.mode.value").unwrap().actval, Value::Int(2));
        assert_eq!(p.view().values["dev.mode.value"].text, "2");
        assert_eq!(p.view().values["other.count.value"].text, "0");
        assert_eq!(p.view().values["other.count.value"].redraws, 0);
    }

    #[tokio::test]
    async fn test_connect_failure_keeps_simulating() {
        let connector = MockConnector {
            refuse: true,
            ..Default::default()
        };
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));
        p.connect().await;
        assert!(!p.is_connected());
        assert!(p.is_simulating());
        assert!(!p.banner().ok);
        assert!(p.banner().text.starts_with("failed to connect to indi"));
    }

    #[tokio::test]
    async fn test_connect_subscribes_each_stream_once() {
        let connector = MockConnector::default();
        let shared = connector.shared.clone();
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));

        p.connect().await;
        p.connect().await;
        assert!(p.is_connected());
        assert!(!p.is_simulating());
        assert!(p.banner().ok);
        assert_eq!(p.banner().text, "subscribed to streams OK");
        assert_eq!(
            shared.lock().unwrap().log,
            vec![
                "open",
                "sub dev.mode",
                "sub dev.note",
                "sub dev.temp",
                "sub other.count"
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribe_failure_keeps_simulating() {
        let connector = MockConnector {
            fail_subscribe: true,
            ..Default::default()
        };
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));
        p.connect().await;
        assert!(!p.is_connected());
        assert!(p.is_simulating());
        assert!(p.banner().text.starts_with("failed to subscribe to streams"));
    }

    #[tokio::test]
    async fn test_live_timeout_is_a_no_op() {
        let mut p = panel(PanelKind::Status, MockConnector::default(), replay("x.y", vec![]));
        p.connect().await;
        let before = p.record("dev.temp.value").cloned();

        assert_eq!(p.alarm().await, TickOutcome::Idle);
        assert_eq!(p.record("dev.temp.value").cloned(), before);
        assert!(p.is_connected());
        assert_eq!(p.step(), 1);
    }

    #[tokio::test]
    async fn test_live_update_applies_and_recolours() {
        let connector = MockConnector::default();
        let shared = connector.shared.clone();
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));
        p.connect().await;

        let tx = shared.lock().unwrap().sender.clone().unwrap();
        tx.send(
            UpdateMessage::new()
                .with("dev.temp.value", "25.5")
                .with("unknown.key.value", "1")
                .with("dev.mode.value", "7"),
        )
        .await
        .unwrap();

        assert_eq!(p.alarm().await, TickOutcome::Applied(2));
        assert_eq!(p.record("dev.temp.value").unwrap().actval, Value::Float(25.5));
        assert_eq!(p.view().values["dev.temp.value"].text, "25.5");
        assert_eq!(style(&p, "dev.temp.value"), Style::Hot);
        assert_eq!(style(&p, "dev.mode.value"), Style::Invalid);
    }

    #[tokio::test]
    async fn test_live_update_stops_at_coercion_error() {
        let connector = MockConnector::default();
        let shared = connector.shared.clone();
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));
        p.connect().await;

        let tx = shared.lock().unwrap().sender.clone().unwrap();
        tx.send(
            UpdateMessage::new()
                .with("dev.temp.value", "11.0")
                .with("dev.mode.value", "abc")
                .with("other.count.value", "3"),
        )
        .await
        .unwrap();

        assert_eq!(p.alarm().await, TickOutcome::Applied(1));
        assert_eq!(p.record("dev.temp.value").unwrap().actval, Value::Float(11.0));
        assert_eq!(p.record("dev.mode.value").unwrap().actval, Value::Int(1));
        assert_eq!(p.record("other.count.value").unwrap().actval, Value::Int(0));
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let connector = MockConnector::default();
        let shared = connector.shared.clone();
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));
        p.connect().await;
        shared.lock().unwrap().sender = None;

        assert_eq!(p.alarm().await, TickOutcome::QueueUnavailable);
        assert!(p.is_connected());
    }

    #[tokio::test]
    async fn test_live_without_queue() {
        let mut p = panel(PanelKind::Status, MockConnector::default(), replay("x.y", vec![]));
        p.set_simulate(false);
        assert_eq!(p.alarm().await, TickOutcome::QueueUnavailable);
        p.set_simulate(true);
        assert_eq!(p.alarm().await, TickOutcome::Simulated);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let connector = MockConnector::default();
        let shared = connector.shared.clone();
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));
        p.connect().await;
        p.disconnect().await;

        assert!(!p.is_connected());
        assert!(p.is_simulating());
        assert!(!p.has_client());
        assert_eq!(p.banner().text, "Disconnected from INDI");
        let log = shared.lock().unwrap().log.clone();
        assert_eq!(log.iter().filter(|l| l.starts_with("unsub")).count(), 4);
        assert_eq!(log.last().map(String::as_str), Some("close"));
    }

    #[tokio::test]
    async fn test_disconnect_after_failed_unsubscribe() {
        let connector = MockConnector {
            fail_unsubscribe: true,
            ..Default::default()
        };
        let mut p = panel(PanelKind::Status, connector, replay("x.y", vec![]));
        p.connect().await;
        assert!(p.is_connected());

        p.disconnect().await;
        assert!(!p.is_connected());
        assert!(p.is_simulating());
        assert!(!p.has_client());
        assert!(p.banner().text.starts_with("Failed to disconnect from indi streams"));
    }

    #[tokio::test]
    async fn test_control_panel_offers_writable_records_only() {
        let p = panel(PanelKind::Control, MockConnector::default(), replay("x.y", vec![]));
        assert!(p.has_controls());
        assert_eq!(p.view().controls.len(), 3);
        assert!(!p.view().values.contains_key("other.count.value"));
        assert!(!p.streams().contains(&("other".to_string(), "count".to_string())));
    }

    #[tokio::test]
    async fn test_control_panel_without_writable_records() {
        let mut m = Module::new("test", "Test", "#fff");
        m.insert(
            "dev.ro.value",
            record(DataType::Int, None, Value::Int(0), IndiPermission::ReadOnly),
        )
        .unwrap();
        let mut table = PropertyTable::new();
        table.add_module(m).unwrap();
        let p = Panel::new(
            PanelKind::Control,
            config(),
            table,
            Box::new(MockConnector::default()),
            replay("x.y", vec![]),
        )
        .unwrap();
        assert!(!p.has_controls());
    }

    #[tokio::test]
    async fn test_slider_events() {
        let connector = MockConnector::default();
        let shared = connector.shared.clone();
        let mut p = panel(PanelKind::Control, connector, replay("x.y", vec![]));

        assert_eq!(p.slider_moved("dev.temp.value", 9).unwrap(), Style::Cold);
        assert_eq!(p.slider_moved("dev.temp.value", 21).unwrap(), Style::Hot);
        assert_eq!(p.slider_moved("dev.temp.value", 16).unwrap(), Style::Neutral);
        assert_eq!(p.view().controls["dev.temp.value"].lcd, Some(16));

        p.slider_released("dev.temp.value").await.unwrap();
        assert!(!shared.lock().unwrap().log.iter().any(|l| l.starts_with("send")));

        p.connect().await;
        p.slider_released("dev.temp.value").await.unwrap();
        assert!(shared
            .lock()
            .unwrap()
            .log
            .contains(&"send dev.temp.value=16.0".to_string()));

        assert!(matches!(
            p.slider_moved("dev.note.text", 1),
            Err(PanelError::NoControl { .. })
        ));
        assert!(matches!(
            p.slider_moved("other.count.value", 1),
            Err(PanelError::UnknownKey(_))
        ));
    }

    #[tokio::test]
    async fn test_radio_and_line_edit_events() {
        let connector = MockConnector::default();
        let shared = connector.shared.clone();
        let mut p = panel(PanelKind::Control, connector, replay("x.y", vec![]));
        p.connect().await;

        p.radio_toggled("dev.mode.value", &Value::Int(3)).await.unwrap();
        assert!(p.radio_toggled("dev.mode.value", &Value::Int(9)).await.is_err());
        p.line_edit_submitted("dev.note.text", "goodbye").await.unwrap();
        assert_eq!(p.view().controls["dev.note.text"].widget.text, "goodbye");

        let log = shared.lock().unwrap().log.clone();
        assert!(log.contains(&"send dev.mode.value=3".to_string()));
        assert!(log.contains(&"send dev.note.text=goodbye".to_string()));
    }
}
