pub mod envelope;

pub use envelope::SpecialEnvelope;

/// Identifies one consumer across every buffer it polls. Acknowledgment sets
/// hold these, so two consumers must never share an id.
#[derive(Eq, Hash, Debug, Clone)]
pub struct ConsumerId {
    pub id: String,
}

impl ConsumerId {
    pub fn new(id: String) -> Self {
        ConsumerId { id }
    }
}

impl From<&str> for ConsumerId {
    fn from(id: &str) -> Self {
        ConsumerId { id: id.to_string() }
    }
}

impl From<String> for ConsumerId {
    fn from(id: String) -> Self {
        ConsumerId { id }
    }
}

impl PartialEq for ConsumerId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Eq, Hash, Debug, Clone)]
pub struct BufferId {
    pub id: String,
}

impl BufferId {
    pub fn new(id: String) -> Self {
        BufferId { id }
    }
}

impl From<&str> for BufferId {
    fn from(id: &str) -> Self {
        BufferId { id: id.to_string() }
    }
}

impl From<String> for BufferId {
    fn from(id: String) -> Self {
        BufferId { id }
    }
}

impl PartialEq for BufferId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageClass {
    Ordinary,
    Special,
}

/// One message handed to a consumer by `try_consume`.
#[derive(Debug, Clone)]
pub struct Delivery<T> {
    pub payload: T,
    pub class: MessageClass,
}

impl<T> Delivery<T> {
    pub fn ordinary(payload: T) -> Self {
        Delivery {
            payload,
            class: MessageClass::Ordinary,
        }
    }

    pub fn special(payload: T) -> Self {
        Delivery {
            payload,
            class: MessageClass::Special,
        }
    }

    pub fn is_special(&self) -> bool {
        self.class == MessageClass::Special
    }
}
