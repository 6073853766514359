//! Simulated streaming of assistant replies into the chat transcript.

use crate::api::{DeltaStream, ResponseSource};
use crate::error::{DashboardError, DashboardResult};
use crate::models::{ChatMessage, TrackedModel};
use crate::state::DashboardEvent;
use dashmap::DashMap;
use fastrand::Rng;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Delay after each revealed token is drawn from this range (milliseconds).
pub const TOKEN_DELAY_MS: std::ops::Range<u64> = 30..130;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StreamOutcome {
    Completed,
    Cancelled,
    Failed, // Source errored mid-reply; the message keeps what arrived
}

/// Returned by a successful submit. The stream keeps running in the
/// background whether or not the handle is awaited.
#[derive(Debug)]
pub struct StreamHandle {
    pub user_message: ChatMessage,
    pub assistant_message_id: Uuid,
    task: JoinHandle<StreamOutcome>,
}

impl StreamHandle {
    /// Waits for the stream to finish.
    pub async fn finished(self) -> StreamOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let id = self.assistant_message_id;
                log::error!("Stream task for {} did not finish: {:?}", id, e);
                StreamOutcome::Cancelled
            }
        }
    }
}

// Owns the transcript and at most one in-flight reply stream
#[derive(Clone)]
pub struct ResponseEngine {
    transcript: Arc<Mutex<Vec<ChatMessage>>>,
    active_stream: Arc<Mutex<Option<Uuid>>>, // Assistant message currently streaming
    cancelled_streams: Arc<DashMap<Uuid, bool>>,
    source: Arc<dyn ResponseSource>,
    rng: Arc<Mutex<Rng>>,
    events: broadcast::Sender<DashboardEvent>,
}

impl ResponseEngine {
    pub fn new(
        source: Arc<dyn ResponseSource>,
        rng: Rng,
        events: broadcast::Sender<DashboardEvent>,
    ) -> Self {
        Self {
            transcript: Arc::new(Mutex::new(Vec::new())),
            active_stream: Arc::new(Mutex::new(None)),
            cancelled_streams: Arc::new(DashMap::new()),
            source,
            rng: Arc::new(Mutex::new(rng)),
            events,
        }
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.clone()
    }

    pub async fn is_streaming(&self) -> bool {
        self.active_stream.lock().await.is_some()
    }

    /// Sends `prompt` to `model`: appends the user message and an empty
    /// assistant placeholder, then reveals the reply token by token in a
    /// background task. Rejected requests leave the transcript untouched.
    pub async fn submit(
        &self,
        prompt: &str,
        model: Option<&TrackedModel>,
    ) -> DashboardResult<StreamHandle> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DashboardError::EmptyField("Message"));
        }
        let model = model.ok_or(DashboardError::NoModelSelected)?;

        // Holding the slot lock makes the busy check and the claim atomic
        let mut active = self.active_stream.lock().await;
        if let Some(streaming_id) = *active {
            log::warn!("Rejected message while {} is still streaming", streaming_id);
            return Err(DashboardError::Busy);
        }

        let tokens = self
            .source
            .stream_reply(model, prompt)
            .await
            .map_err(|e| {
                log::error!("Failed to start reply stream for '{}': {:?}", model.name, e);
                DashboardError::ResponseFailed(e.to_string())
            })?;

        let user_message = ChatMessage::user(prompt);
        let placeholder = ChatMessage::assistant_placeholder(&model.name);
        let assistant_message_id = placeholder.id;
        {
            let mut transcript = self.transcript.lock().await;
            transcript.push(user_message.clone());
            transcript.push(placeholder);
        }
        *active = Some(assistant_message_id);
        drop(active);

        let stream_rng = self.rng.lock().await.fork();
        log::info!(
            "Streaming reply {} from '{}' for a {}-char prompt",
            assistant_message_id,
            model.name,
            prompt.len()
        );

        let engine = self.clone();
        let task = tokio::spawn(async move {
            engine.run_stream(assistant_message_id, tokens, stream_rng).await
        });

        Ok(StreamHandle {
            user_message,
            assistant_message_id,
            task,
        })
    }

    async fn run_stream(
        &self,
        message_id: Uuid,
        mut tokens: DeltaStream,
        mut rng: Rng,
    ) -> StreamOutcome {
        let mut content = String::new();
        let mut first_chunk = true;
        let mut outcome = StreamOutcome::Completed;

        while let Some(delta_result) = tokens.next().await {
            if self.cancelled_streams.contains_key(&message_id) {
                log::warn!("Cancellation requested for message {}. Stopping stream.", message_id);
                outcome = StreamOutcome::Cancelled;
                break;
            }

            let token = match delta_result {
                Ok(token) => token,
                Err(e) => {
                    log::error!(
                        "Error receiving token for {}: {:?}. Stopping stream.",
                        message_id,
                        e
                    );
                    outcome = StreamOutcome::Failed;
                    break;
                }
            };

            if !first_chunk {
                content.push(' ');
            }
            content.push_str(&token);

            {
                let mut transcript = self.transcript.lock().await;
                match transcript.iter_mut().find(|m| m.id == message_id) {
                    Some(message) => message.content.clone_from(&content),
                    None => {
                        log::warn!("Message {} left the transcript. Stopping stream.", message_id);
                        outcome = StreamOutcome::Cancelled;
                        break;
                    }
                }
            }

            self.emit(DashboardEvent::AssistantMessageChunk {
                message_id,
                delta: token,
                content: content.clone(),
                is_first_chunk: first_chunk,
            });
            first_chunk = false;

            let delay = rng.u64(TOKEN_DELAY_MS);
            log::debug!("Message {}: next token in {}ms", message_id, delay);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        {
            // Flags are only set under this lock, so none can appear after the removal
            let mut active = self.active_stream.lock().await;
            if *active == Some(message_id) {
                *active = None;
            }
            self.cancelled_streams.remove(&message_id);
        }

        self.emit(DashboardEvent::AssistantStreamFinished { message_id, outcome });
        log::info!("Stream {} finished ({:?}, {} chars)", message_id, outcome, content.len());
        outcome
    }

    /// Asks the stream for `message_id` to stop before its next token.
    /// Returns false if that message is not streaming.
    pub async fn stop(&self, message_id: Uuid) -> bool {
        let active = self.active_stream.lock().await;
        if *active != Some(message_id) {
            log::debug!("Stop requested for {}, which is not streaming", message_id);
            return false;
        }
        self.cancelled_streams.insert(message_id, true);
        drop(active);
        log::info!("Cancellation signal set for message ID: {}", message_id);
        true
    }

    /// Teardown: stops whatever is streaming so no further tokens land.
    pub async fn shutdown(&self) {
        let active = *self.active_stream.lock().await;
        if let Some(message_id) = active {
            self.stop(message_id).await;
        }
    }

    /// Empties the transcript. The stream slot stays locked throughout so a
    /// concurrent submit lands either before (Busy) or after the clear.
    pub async fn clear(&self) -> DashboardResult<()> {
        let active = self.active_stream.lock().await;
        if active.is_some() {
            return Err(DashboardError::Busy);
        }
        self.transcript.lock().await.clear();
        drop(active);
        log::info!("Cleared chat transcript");
        Ok(())
    }

    fn emit(&self, event: DashboardEvent) {
        if self.events.send(event).is_err() {
            log::trace!("No subscribers for stream event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{canned_reply, tokenize, CannedResponder, Persona};
    use crate::models::Role;
    use async_trait::async_trait;
    use futures::stream;

    // Yields one token, then fails
    struct BrokenSource;

    #[async_trait]
    impl ResponseSource for BrokenSource {
        async fn stream_reply(
            &self,
            _model: &TrackedModel,
            _prompt: &str,
        ) -> anyhow::Result<DeltaStream> {
            let items = vec![Ok("partial".to_string()), Err(anyhow::anyhow!("connection reset"))];
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn engine() -> (ResponseEngine, broadcast::Receiver<DashboardEvent>) {
        let (tx, rx) = broadcast::channel(512);
        let engine = ResponseEngine::new(Arc::new(CannedResponder::new()), Rng::with_seed(3), tx);
        (engine, rx)
    }

    fn chatgpt() -> TrackedModel {
        TrackedModel {
            id: "1".to_string(),
            name: "ChatGPT".to_string(),
            sentiment: 85,
            mentions: 12458,
            rank: 1,
            change: 0,
            response_time_ms: 850,
            accuracy: 94,
            persona: Some(Persona::ChatGpt),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_reveals_full_template() {
        let (engine, mut rx) = engine();
        let model = chatgpt();
        let handle = engine.submit("Tell me about Acme", Some(&model)).await.unwrap();
        assert_eq!(handle.user_message.content, "Tell me about Acme");

        let messages = engine.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].llm.as_deref(), Some("ChatGPT"));

        assert_eq!(handle.finished().await, StreamOutcome::Completed);
        let expected = canned_reply(&model, "Tell me about Acme");
        assert_eq!(engine.messages().await[1].content, expected);
        assert!(!engine.is_streaming().await);

        // Chunk contents grow monotonically, one token at a time
        let mut previous = String::new();
        let mut chunks = 0;
        while let Ok(event) = rx.try_recv() {
            if let DashboardEvent::AssistantMessageChunk { content, is_first_chunk, .. } = event {
                assert_eq!(is_first_chunk, chunks == 0);
                assert!(content.starts_with(&previous));
                previous = content;
                chunks += 1;
            }
        }
        assert_eq!(chunks, expected.split(' ').count());
        assert_eq!(previous, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_invalid_submissions() {
        let (engine, _rx) = engine();
        let model = chatgpt();
        assert_eq!(
            engine.submit("   ", Some(&model)).await.unwrap_err(),
            DashboardError::EmptyField("Message")
        );
        assert_eq!(
            engine.submit("hello", None).await.unwrap_err(),
            DashboardError::NoModelSelected
        );
        assert!(engine.messages().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_before_next_token() {
        let (engine, _rx) = engine();
        let model = chatgpt();
        let handle = engine.submit("hello", Some(&model)).await.unwrap();
        let id = handle.assistant_message_id;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(engine.stop(id).await);
        let partial = engine.messages().await[1].content.clone();

        assert_eq!(handle.finished().await, StreamOutcome::Cancelled);
        assert_eq!(engine.messages().await[1].content, partial);
        assert!(partial.len() < canned_reply(&model, "hello").len());
        assert!(!engine.stop(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_token_waits_within_delay_range() {
        for seed in 0..20 {
            let (tx, _rx) = broadcast::channel(512);
            let source = Arc::new(CannedResponder::new());
            let engine = ResponseEngine::new(source, Rng::with_seed(seed), tx);
            let model = chatgpt();
            let tokens = tokenize(&canned_reply(&model, "hi")).len() as u64;

            let started = tokio::time::Instant::now();
            let handle = engine.submit("hi", Some(&model)).await.unwrap();
            assert_eq!(handle.finished().await, StreamOutcome::Completed);
            let elapsed = started.elapsed().as_millis() as u64;

            assert!(elapsed >= TOKEN_DELAY_MS.start * tokens, "seed {seed}: {elapsed}ms");
            assert!(elapsed < TOKEN_DELAY_MS.end * tokens, "seed {seed}: {elapsed}ms");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_error_finishes_as_failed() {
        let (tx, mut rx) = broadcast::channel(64);
        let engine = ResponseEngine::new(Arc::new(BrokenSource), Rng::with_seed(3), tx);
        let handle = engine.submit("hello", Some(&chatgpt())).await.unwrap();
        let id = handle.assistant_message_id;

        assert_eq!(handle.finished().await, StreamOutcome::Failed);
        assert_eq!(engine.messages().await[1].content, "partial");
        assert!(!engine.is_streaming().await);

        let mut finished = None;
        while let Ok(event) = rx.try_recv() {
            if let DashboardEvent::AssistantStreamFinished { message_id, outcome } = event {
                assert_eq!(message_id, id);
                finished = Some(outcome);
            }
        }
        assert_eq!(finished, Some(StreamOutcome::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_leaves_no_stale_flags() {
        let (engine, _rx) = engine();
        let handle = engine.submit("hello", Some(&chatgpt())).await.unwrap();
        let id = handle.assistant_message_id;

        assert!(engine.stop(id).await);
        assert!(engine.cancelled_streams.contains_key(&id));
        assert_eq!(handle.finished().await, StreamOutcome::Cancelled);
        assert!(engine.cancelled_streams.is_empty());

        assert!(!engine.stop(id).await);
        assert!(engine.cancelled_streams.is_empty());
    }

    #[tokio::test]
    async fn test_clear_holds_stream_slot_until_done() {
        let (engine, _rx) = engine();
        let transcript = engine.transcript.lock().await;

        let clearing = tokio::spawn({
            let engine = engine.clone();
            async move { engine.clear().await }
        });
        // Let the clear claim the slot and block on the transcript
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(engine.active_stream.try_lock().is_err());

        drop(transcript);
        assert_eq!(clearing.await.unwrap(), Ok(()));
        assert!(engine.active_stream.try_lock().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_is_rejected_while_streaming() {
        let (engine, _rx) = engine();
        let handle = engine.submit("hello", Some(&chatgpt())).await.unwrap();
        assert_eq!(engine.clear().await, Err(DashboardError::Busy));
        handle.finished().await;
        assert!(engine.clear().await.is_ok());
        assert!(engine.messages().await.is_empty());
    }
}
