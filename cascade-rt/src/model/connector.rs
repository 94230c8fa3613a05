//! The connector between the orchestrator stream and a model.
//!
//! Tracks readiness with two flags: `initialized` (the model passed its
//! initialization) and `ready_for_update` (its required subscriptions hold
//! at least one value). A model that is not initialized when woken answers
//! with `next_time = current timestamp` so it is retried within the tick;
//! progressing past the simulation start without becoming ready is fatal.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::debug;

// Layer 3: Internal module imports
use super::clients::UpdateDataClient;
use super::error::ModelError;
use super::init_data::InitDataHandler;
use super::traits::{InitializeResult, ModelSetup, SimulationModel};
use crate::mask::DataMask;
use crate::message::{
    AcknowledgeMessage, Message, NewTimeMessage, RegistrationMessage, ResultMessage, UpdateMessage,
};
use crate::settings::Settings;
use crate::timeline::{Moment, TimelineInfo, Timestamp};
use crate::transport::MessageDealer;

const CLOSE_LINGER: Duration = Duration::from_secs(1);

/// Whether the stream loop keeps running after a handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Continue,
    Done,
}

/// Drives a [`SimulationModel`] from the orchestrator's command stream.
pub struct ModelConnector {
    name: String,
    model: Box<dyn SimulationModel>,
    updates: UpdateDataClient,
    init_data: Box<dyn InitDataHandler>,
    settings: Settings,
    timeline_info: TimelineInfo,
    data_mask: DataMask,
    initialized: bool,
    ready_for_update: bool,
}

impl ModelConnector {
    pub fn new(
        name: impl Into<String>,
        model: Box<dyn SimulationModel>,
        updates: UpdateDataClient,
        init_data: Box<dyn InitDataHandler>,
        settings: Settings,
    ) -> Result<Self, ModelError> {
        let timeline_info = settings
            .timeline_info
            .ok_or(ModelError::MissingTimelineInfo)?;
        Ok(Self {
            name: name.into(),
            model,
            updates,
            init_data,
            settings,
            timeline_info,
            data_mask: DataMask::default(),
            initialized: false,
            ready_for_update: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the model's setup and produce its registration message.
    pub async fn initialize(&mut self) -> Result<RegistrationMessage, ModelError> {
        let mut setup = ModelSetup {
            settings: &self.settings,
            init_data: self.init_data.as_mut(),
        };
        self.data_mask = self.model.setup(&mut setup).await?;
        self.try_initialize()?;
        Ok(RegistrationMessage {
            pub_mask: self.data_mask.publish.clone(),
            sub_mask: self.data_mask.subscribe.clone(),
        })
    }

    /// Handle one orchestrator command; returns the reply and whether the
    /// loop continues.
    pub async fn handle_message(
        &mut self,
        message: Message,
    ) -> Result<(Message, LoopOutcome), ModelError> {
        match message {
            Message::NewTime(msg) => {
                self.new_time(msg).await?;
                Ok((
                    Message::Acknowledge(AcknowledgeMessage {}),
                    LoopOutcome::Continue,
                ))
            }
            Message::Update(msg) => {
                let result = self.update_batch(&[msg]).await?;
                Ok((Message::Result(result), LoopOutcome::Continue))
            }
            Message::UpdateSeries(msg) => {
                let result = self.update_batch(&msg.updates).await?;
                Ok((Message::Result(result), LoopOutcome::Continue))
            }
            Message::Quit(_) => {
                self.model.shutdown()?;
                Ok((
                    Message::Acknowledge(AcknowledgeMessage {}),
                    LoopOutcome::Done,
                ))
            }
            other => Err(ModelError::UnexpectedMessage(other.tag())),
        }
    }

    /// Close the data-service connections.
    pub async fn close(&mut self) {
        self.updates.close().await;
    }

    /// Best-effort shutdown on the failure path.
    pub fn shutdown_quietly(&mut self) {
        let _ = self.model.shutdown();
    }

    async fn new_time(&mut self, msg: NewTimeMessage) -> Result<(), ModelError> {
        // stale payloads from the previous tick must not be served again
        self.updates.clear().await?;
        let moment = Moment::new(msg.timestamp, self.timeline_info);
        self.model.new_time(moment)?;
        if !(self.initialized || self.ready_for_update) && msg.timestamp > 0 {
            return Err(ModelError::NotReadyPastStart {
                initialized: self.initialized,
                ready: self.ready_for_update,
            });
        }
        Ok(())
    }

    async fn update_batch(&mut self, updates: &[UpdateMessage]) -> Result<ResultMessage, ModelError> {
        let timestamp = updates
            .iter()
            .map(|update| update.timestamp)
            .max()
            .unwrap_or_else(|| self.timeline_info.start_time);
        let mut should_calculate = false;
        for update in updates {
            should_calculate |= self.process_one(update).await?;
        }
        self.try_calculate(timestamp, should_calculate).await
    }

    async fn process_one(&mut self, update: &UpdateMessage) -> Result<bool, ModelError> {
        let (Some(key), Some(address)) = (&update.key, &update.address) else {
            // a bare wake-up call always triggers a calculation
            return Ok(true);
        };
        let data = self
            .updates
            .get(address, key, self.data_mask.subscribe.as_ref())
            .await?;
        self.model.process_input(&data)
    }

    async fn try_calculate(
        &mut self,
        timestamp: Timestamp,
        should_calculate: bool,
    ) -> Result<ResultMessage, ModelError> {
        let mut result = ResultMessage {
            origin: Some(self.name.clone()),
            ..ResultMessage::default()
        };
        if !should_calculate {
            return Ok(result);
        }
        self.try_initialize()?;
        if !self.initialized {
            // retry within the current tick until the required inputs arrive
            result.next_time = Some(timestamp);
            return Ok(result);
        }
        if !self.ready_for_update && self.model.is_ready_for_update() {
            self.ready_for_update = true;
        }
        let mut produced = None;
        if self.ready_for_update {
            let moment = Moment::new(timestamp, self.timeline_info);
            let (data, next_time) = self.model.update(moment)?;
            produced = data;
            result.next_time = next_time;
        }
        if let Some(data) = produced {
            let (address, key) = self.updates.put(data).await?;
            debug!("Model '{}' published payload '{key}'", self.name);
            result.address = Some(address);
            result.key = Some(key);
        }
        Ok(result)
    }

    fn try_initialize(&mut self) -> Result<(), ModelError> {
        if self.initialized {
            return Ok(());
        }
        if let InitializeResult::Initialized = self.model.try_initialize()? {
            self.initialized = true;
        }
        Ok(())
    }
}

/// The model subprocess stream loop: register, then answer every command
/// until `END`.
pub async fn run_model_stream(
    connector: &mut ModelConnector,
    socket: &mut MessageDealer,
) -> Result<i32, ModelError> {
    let registration = connector.initialize().await?;
    socket.send(&Message::Registration(registration)).await?;
    loop {
        let message = socket.recv().await?;
        let (reply, outcome) = connector.handle_message(message).await?;
        socket.send(&reply).await?;
        if outcome == LoopOutcome::Done {
            connector.close().await;
            return Ok(0);
        }
    }
}

/// The linger applied to a model socket at teardown, long enough to flush
/// a final error message.
pub(crate) fn model_socket_linger() -> Duration {
    CLOSE_LINGER
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mask::MaskTree;
    use crate::services::{Service, UpdateDataService};
    use crate::settings::Settings;
    use crate::timeline::TimelineInfo;
    use crate::transport::MessageRouter;
    use async_trait::async_trait;

    /// A scripted model: publishes a fixed payload on its first update,
    /// then requests no further wake-ups.
    struct ScriptedModel {
        publish_payload: Option<Vec<u8>>,
        next_times: Vec<Option<Timestamp>>,
        not_ready_rounds: usize,
        updates_seen: usize,
        inputs_seen: usize,
        shutdown_called: bool,
    }

    impl ScriptedModel {
        fn new() -> Self {
            Self {
                publish_payload: None,
                next_times: Vec::new(),
                not_ready_rounds: 0,
                updates_seen: 0,
                inputs_seen: 0,
                shutdown_called: false,
            }
        }
    }

    #[async_trait]
    impl SimulationModel for ScriptedModel {
        async fn setup(&mut self, _setup: &mut ModelSetup<'_>) -> Result<DataMask, ModelError> {
            Ok(DataMask {
                publish: Some(serde_json::from_str::<MaskTree>(r#"{"out": null}"#).unwrap()),
                subscribe: Some(serde_json::from_str::<MaskTree>(r#"{"in": null}"#).unwrap()),
            })
        }

        fn try_initialize(&mut self) -> Result<InitializeResult, ModelError> {
            if self.not_ready_rounds > 0 {
                self.not_ready_rounds -= 1;
                return Ok(InitializeResult::NotReady);
            }
            Ok(InitializeResult::Initialized)
        }

        fn process_input(&mut self, _data: &[u8]) -> Result<bool, ModelError> {
            self.inputs_seen += 1;
            Ok(true)
        }

        fn update(
            &mut self,
            _moment: Moment,
        ) -> Result<(Option<Vec<u8>>, Option<Timestamp>), ModelError> {
            self.updates_seen += 1;
            let next_time = if self.next_times.is_empty() {
                None
            } else {
                self.next_times.remove(0)
            };
            Ok((self.publish_payload.take(), next_time))
        }

        fn shutdown(&mut self) -> Result<(), ModelError> {
            self.shutdown_called = true;
            Ok(())
        }
    }

    async fn spawn_update_service() -> String {
        let mut service = UpdateDataService::new();
        service.setup(&Settings::default()).unwrap();
        let mut router = MessageRouter::bind().await.unwrap();
        let address = router.address();
        tokio::spawn(async move {
            let _ = service.run(&mut router).await;
        });
        address
    }

    fn settings() -> Settings {
        Settings {
            timeline_info: Some(TimelineInfo::new(0.0, 1.0, 0, 10)),
            ..Settings::default()
        }
    }

    async fn connector(model: ScriptedModel) -> ModelConnector {
        let address = spawn_update_service().await;
        ModelConnector::new(
            "model_a",
            Box::new(model),
            UpdateDataClient::new("model_a", address),
            Box::new(crate::model::DirectoryInitDataHandler::new(".")),
            settings(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_produces_registration() {
        let mut connector = connector(ScriptedModel::new()).await;
        let registration = connector.initialize().await.unwrap();
        assert!(registration.pub_mask.is_some());
        assert!(registration.sub_mask.is_some());
    }

    #[tokio::test]
    async fn test_missing_timeline_info_is_an_error() {
        let address = spawn_update_service().await;
        let result = ModelConnector::new(
            "model_a",
            Box::new(ScriptedModel::new()),
            UpdateDataClient::new("model_a", address),
            Box::new(crate::model::DirectoryInitDataHandler::new(".")),
            Settings::default(),
        );
        assert!(matches!(result, Err(ModelError::MissingTimelineInfo)));
    }

    #[tokio::test]
    async fn test_new_time_acknowledges() {
        let mut connector = connector(ScriptedModel::new()).await;
        connector.initialize().await.unwrap();
        let (reply, outcome) = connector
            .handle_message(Message::NewTime(NewTimeMessage { timestamp: 0 }))
            .await
            .unwrap();
        assert_eq!(reply, Message::Acknowledge(AcknowledgeMessage {}));
        assert_eq!(outcome, LoopOutcome::Continue);
    }

    #[tokio::test]
    async fn test_wake_update_produces_result_with_payload() {
        let mut model = ScriptedModel::new();
        model.publish_payload = Some(br#"{"out": {"eg": {"x": 1}}}"#.to_vec());
        model.next_times = vec![Some(5)];
        let mut connector = connector(model).await;
        connector.initialize().await.unwrap();
        let (reply, _) = connector
            .handle_message(Message::Update(UpdateMessage::wake(0)))
            .await
            .unwrap();
        let Message::Result(result) = reply else {
            panic!("expected RESULT, got {reply:?}");
        };
        assert!(result.has_data());
        assert_eq!(result.key.as_deref(), Some("model_a_0"));
        assert_eq!(result.next_time, Some(5));
        assert_eq!(result.origin.as_deref(), Some("model_a"));
    }

    #[tokio::test]
    async fn test_update_without_production_has_no_data() {
        let mut connector = connector(ScriptedModel::new()).await;
        connector.initialize().await.unwrap();
        let (reply, _) = connector
            .handle_message(Message::Update(UpdateMessage::wake(0)))
            .await
            .unwrap();
        let Message::Result(result) = reply else {
            panic!("expected RESULT");
        };
        assert!(!result.has_data());
        assert_eq!(result.next_time, None);
    }

    #[tokio::test]
    async fn test_not_ready_model_requests_same_tick() {
        let mut model = ScriptedModel::new();
        model.not_ready_rounds = 2;
        let mut connector = connector(model).await;
        connector.initialize().await.unwrap();
        // still not ready on the first wake: ask to be retried at t=0
        let (reply, _) = connector
            .handle_message(Message::Update(UpdateMessage::wake(0)))
            .await
            .unwrap();
        let Message::Result(result) = reply else {
            panic!("expected RESULT");
        };
        assert_eq!(result.next_time, Some(0));
        assert!(!result.has_data());
        // initialization succeeds on the retry
        let (reply, _) = connector
            .handle_message(Message::Update(UpdateMessage::wake(0)))
            .await
            .unwrap();
        let Message::Result(result) = reply else {
            panic!("expected RESULT");
        };
        assert_eq!(result.next_time, None);
    }

    #[tokio::test]
    async fn test_uninitialized_model_past_start_is_fatal() {
        let mut model = ScriptedModel::new();
        model.not_ready_rounds = usize::MAX;
        let mut connector = connector(model).await;
        connector.initialize().await.unwrap();
        let result = connector
            .handle_message(Message::NewTime(NewTimeMessage { timestamp: 1 }))
            .await;
        assert!(matches!(
            result,
            Err(ModelError::NotReadyPastStart { .. })
        ));
    }

    #[tokio::test]
    async fn test_series_fetches_every_payload() {
        let producer_address = spawn_update_service().await;
        let mut producer = UpdateDataClient::new("dep", producer_address.clone());
        producer
            .put(br#"{"in": {"eg": {"x": 1}}}"#.to_vec())
            .await
            .unwrap();
        producer
            .put(br#"{"in": {"eg": {"y": 2}}}"#.to_vec())
            .await
            .unwrap();

        let mut connector = connector(ScriptedModel::new()).await;
        connector.initialize().await.unwrap();
        let series = crate::message::UpdateSeriesMessage::new(vec![
            UpdateMessage::wake(0),
            UpdateMessage::with_data(0, "dep_0", producer_address.clone(), Some("dep".into())),
            UpdateMessage::with_data(0, "dep_1", producer_address, Some("dep".into())),
        ]);
        let (reply, _) = connector
            .handle_message(Message::UpdateSeries(series))
            .await
            .unwrap();
        assert!(matches!(reply, Message::Result(_)));
    }

    #[tokio::test]
    async fn test_quit_shuts_down_and_ends_loop() {
        let mut connector = connector(ScriptedModel::new()).await;
        connector.initialize().await.unwrap();
        let (reply, outcome) = connector
            .handle_message(Message::Quit(crate::message::QuitMessage {}))
            .await
            .unwrap();
        assert_eq!(reply, Message::Acknowledge(AcknowledgeMessage {}));
        assert_eq!(outcome, LoopOutcome::Done);
    }

    #[tokio::test]
    async fn test_unexpected_message_is_an_error() {
        let mut connector = connector(ScriptedModel::new()).await;
        connector.initialize().await.unwrap();
        let result = connector
            .handle_message(Message::Acknowledge(AcknowledgeMessage {}))
            .await;
        assert!(matches!(result, Err(ModelError::UnexpectedMessage("ACK"))));
    }
}
