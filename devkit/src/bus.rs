/*!
Enregistreur du bus sortant

Collecte tout ce que le bridge veut publier (côté récepteur de la file
sortante) et fournit les assertions par topic utilisées dans les tests.
*/

use charger_bridge::bridge::{BusReceiver, OutboundPublish};

pub struct BusRecorder {
    rx: BusReceiver,
    messages: Vec<OutboundPublish>,
}

impl BusRecorder {
    pub fn new(rx: BusReceiver) -> Self {
        Self {
            rx,
            messages: Vec::new(),
        }
    }

    /// Vide la file sortante dans le journal local.
    pub fn drain(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            log::debug!("[bus] {} <- {}", msg.topic, msg.payload);
            self.messages.push(msg);
        }
    }

    pub fn messages(&self) -> &[OutboundPublish] {
        &self.messages
    }

    pub fn for_topic(&self, topic: &str) -> Vec<&OutboundPublish> {
        self.messages.iter().filter(|m| m.topic == topic).collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.for_topic(topic).len()
    }

    /// Dernier payload publié sur un topic.
    pub fn last_payload(&self, topic: &str) -> Option<&str> {
        self.for_topic(topic).last().map(|m| m.payload.as_str())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
