//! Board message catalog
//!
//! TigerStyle: Every variant declares its processing time explicitly.

use crate::user_message::{CommunicationId, MessageId, UserMessage};
use mailroom_core::ActorId;
use mailroom_runtime::Message;
use serde::{Deserialize, Serialize};

/// Everything board actors tell each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardMessage {
    /// Begin shutdown (to the dispatcher, then broadcast to workers)
    Stop,
    /// A worker acknowledges `Stop`
    StopAck { worker: ActorId },
    /// Session traffic between clients, dispatcher, workers and helpers
    Client(ClientMessage),
    /// A helper's request to the message store
    Store(StoreRequest),
}

impl BoardMessage {
    /// The client message inside, if any
    pub fn as_client(&self) -> Option<&ClientMessage> {
        match self {
            BoardMessage::Client(message) => Some(message),
            _ => None,
        }
    }
}

impl From<ClientMessage> for BoardMessage {
    fn from(message: ClientMessage) -> Self {
        BoardMessage::Client(message)
    }
}

impl From<StoreRequest> for BoardMessage {
    fn from(request: StoreRequest) -> Self {
        BoardMessage::Store(request)
    }
}

impl Message for BoardMessage {
    fn duration_ticks(&self) -> u32 {
        match self {
            BoardMessage::Stop => 2,
            BoardMessage::StopAck { .. } => 2,
            BoardMessage::Client(message) => message.duration_ticks(),
            BoardMessage::Store(_) => 1,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BoardMessage::Stop => "Stop",
            BoardMessage::StopAck { .. } => "StopAck",
            BoardMessage::Client(message) => message.kind(),
            BoardMessage::Store(request) => request.operation.kind(),
        }
    }
}

/// Session-scoped messages, all tagged with a communication id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Open a session; `client` receives every reply
    InitCommunication {
        client: ActorId,
        communication_id: CommunicationId,
    },
    /// Session opened; further requests go straight to `worker`
    InitAck {
        worker: ActorId,
        communication_id: CommunicationId,
    },
    FinishCommunication {
        communication_id: CommunicationId,
    },
    FinishAck {
        communication_id: CommunicationId,
    },
    Publish {
        message: UserMessage,
        communication_id: CommunicationId,
    },
    RetrieveMessages {
        author: String,
        communication_id: CommunicationId,
    },
    FoundMessages {
        messages: Vec<UserMessage>,
        communication_id: CommunicationId,
    },
    Like {
        client_name: String,
        message_id: MessageId,
        communication_id: CommunicationId,
    },
    /// Success; carries the assigned id when the operation stored a message
    OperationAck {
        communication_id: CommunicationId,
        message_id: Option<MessageId>,
    },
    OperationFailed {
        communication_id: CommunicationId,
    },
}

impl ClientMessage {
    pub fn communication_id(&self) -> CommunicationId {
        match self {
            ClientMessage::InitCommunication {
                communication_id, ..
            }
            | ClientMessage::InitAck {
                communication_id, ..
            }
            | ClientMessage::FinishCommunication { communication_id }
            | ClientMessage::FinishAck { communication_id }
            | ClientMessage::Publish {
                communication_id, ..
            }
            | ClientMessage::RetrieveMessages {
                communication_id, ..
            }
            | ClientMessage::FoundMessages {
                communication_id, ..
            }
            | ClientMessage::Like {
                communication_id, ..
            }
            | ClientMessage::OperationAck {
                communication_id, ..
            }
            | ClientMessage::OperationFailed { communication_id } => *communication_id,
        }
    }

    /// Whether this is a request a worker acts on (as opposed to a reply)
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            ClientMessage::InitCommunication { .. }
                | ClientMessage::FinishCommunication { .. }
                | ClientMessage::Publish { .. }
                | ClientMessage::RetrieveMessages { .. }
                | ClientMessage::Like { .. }
        )
    }

    /// Whether this answers a request
    pub fn is_reply(&self) -> bool {
        !self.is_request()
    }

    pub fn duration_ticks(&self) -> u32 {
        match self {
            ClientMessage::InitCommunication { .. } => 2,
            ClientMessage::InitAck { .. } => 1,
            ClientMessage::FinishCommunication { .. } => 3,
            ClientMessage::FinishAck { .. } => 1,
            ClientMessage::Publish { .. } => 3,
            ClientMessage::RetrieveMessages { .. } => 3,
            ClientMessage::FoundMessages { .. } => 1,
            ClientMessage::Like { .. } => 1,
            ClientMessage::OperationAck { .. } => 1,
            ClientMessage::OperationFailed { .. } => 1,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::InitCommunication { .. } => "InitCommunication",
            ClientMessage::InitAck { .. } => "InitAck",
            ClientMessage::FinishCommunication { .. } => "FinishCommunication",
            ClientMessage::FinishAck { .. } => "FinishAck",
            ClientMessage::Publish { .. } => "Publish",
            ClientMessage::RetrieveMessages { .. } => "RetrieveMessages",
            ClientMessage::FoundMessages { .. } => "FoundMessages",
            ClientMessage::Like { .. } => "Like",
            ClientMessage::OperationAck { .. } => "OperationAck",
            ClientMessage::OperationFailed { .. } => "OperationFailed",
        }
    }
}

/// A request to the message store
///
/// The store replies to `reply_to` (always a helper) with a client message
/// carrying the same communication id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub reply_to: ActorId,
    pub communication_id: CommunicationId,
    pub operation: StoreOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreOperation {
    /// Insert a new message
    UpdateMessageStore(UserMessage),
    /// Every stored message by `author`
    RetrieveFromStore { author: String },
    /// Record that `client_name` likes `message_id`
    AddLike {
        client_name: String,
        message_id: MessageId,
    },
}

impl StoreOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreOperation::UpdateMessageStore(_) => "UpdateMessageStore",
            StoreOperation::RetrieveFromStore { .. } => "RetrieveFromStore",
            StoreOperation::AddLike { .. } => "AddLike",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        let client = ActorId::new(0);
        assert_eq!(BoardMessage::Stop.duration_ticks(), 2);
        assert_eq!(BoardMessage::StopAck { worker: client }.duration_ticks(), 2);

        let cases = [
            (
                ClientMessage::InitCommunication {
                    client,
                    communication_id: 1,
                },
                2,
            ),
            (ClientMessage::FinishCommunication { communication_id: 1 }, 3),
            (
                ClientMessage::Publish {
                    message: UserMessage::new("a", "b"),
                    communication_id: 1,
                },
                3,
            ),
            (
                ClientMessage::RetrieveMessages {
                    author: "a".into(),
                    communication_id: 1,
                },
                3,
            ),
            (ClientMessage::OperationFailed { communication_id: 1 }, 1),
        ];
        for (message, ticks) in cases {
            assert_eq!(BoardMessage::from(message).duration_ticks(), ticks);
        }

        let request = StoreRequest {
            reply_to: client,
            communication_id: 1,
            operation: StoreOperation::RetrieveFromStore { author: "a".into() },
        };
        assert_eq!(BoardMessage::from(request).duration_ticks(), 1);
    }

    #[test]
    fn test_communication_id_accessor() {
        let message = ClientMessage::Like {
            client_name: "bob".into(),
            message_id: MessageId::new(4),
            communication_id: -7,
        };
        assert_eq!(message.communication_id(), -7);
        assert!(message.is_request());

        let reply = ClientMessage::OperationAck {
            communication_id: -7,
            message_id: None,
        };
        assert!(reply.is_reply());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(BoardMessage::Stop.kind(), "Stop");
        let message = BoardMessage::from(ClientMessage::FinishAck { communication_id: 2 });
        assert_eq!(message.kind(), "FinishAck");
        assert!(message.as_client().is_some());
        assert!(BoardMessage::Stop.as_client().is_none());
    }
}
