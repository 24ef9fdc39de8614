use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use blogdesk_schema::BusMessage;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Topic {
    Notice,
    Redirect,
    RequestsSettled,
    LoadingStarted,
    LoadingFinished,
    ScrollReset,
}

impl Topic {
    pub fn from_message(msg: &BusMessage) -> Self {
        match msg {
            BusMessage::Notice { .. } => Topic::Notice,
            BusMessage::Redirect { .. } => Topic::Redirect,
            BusMessage::RequestsSettled => Topic::RequestsSettled,
            BusMessage::LoadingStarted { .. } => Topic::LoadingStarted,
            BusMessage::LoadingFinished { .. } => Topic::LoadingFinished,
            BusMessage::ScrollReset => Topic::ScrollReset,
        }
    }
}

type Subscriber = mpsc::Sender<BusMessage>;
type Subscribers = Arc<RwLock<HashMap<Topic, Vec<Subscriber>>>>;

async fn deliver(subscribers: &Subscribers, msg: BusMessage) {
    let topic = Topic::from_message(&msg);
    let subs = subscribers.read().await;
    if let Some(subscribers) = subs.get(&topic) {
        for tx in subscribers {
            if tx.try_send(msg.clone()).is_err() {
                tracing::debug!(?topic, "bus subscriber full or closed, dropping message");
            }
        }
    }
}

pub struct EventBus {
    subscribers: Subscribers,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    pub async fn subscribe(&self, topic: Topic) -> mpsc::Receiver<BusMessage> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subs = self.subscribers.write().await;
        subs.entry(topic).or_default().push(tx);
        rx
    }

    /// One receiver fed by several topics.
    pub async fn subscribe_many(&self, topics: &[Topic]) -> mpsc::Receiver<BusMessage> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subs = self.subscribers.write().await;
        for topic in topics {
            subs.entry(*topic).or_default().push(tx.clone());
        }
        rx
    }

    pub async fn publish(&self, msg: BusMessage) -> Result<()> {
        deliver(&self.subscribers, msg).await;
        Ok(())
    }

    pub fn publisher(&self) -> BusPublisher {
        BusPublisher {
            subscribers: self.subscribers.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BusPublisher {
    subscribers: Subscribers,
}

impl BusPublisher {
    pub async fn publish(&self, msg: BusMessage) -> Result<()> {
        deliver(&self.subscribers, msg).await;
        Ok(())
    }
}
