//! DST tests for the message board session protocol
//!
//! TigerStyle: Every scenario runs on a seeded board with the full invariant
//! set checked after each tick.

use mailroom_board::{
    worker_index, BoardMessage, ClientMessage, CommunicationId, DispatcherMode, MessageId,
    UserMessage,
};
use mailroom_core::{ActorId, Result};
use mailroom_dst::{InvariantChecker, SimConfig, SimEnvironment, Simulation};

// =============================================================================
// Helpers
// =============================================================================

fn board(workers: usize) -> Simulation {
    Simulation::new(SimConfig::from_env_or_random().with_workers(workers))
        .with_invariants(InvariantChecker::new().with_board_invariants())
}

fn reply_count(env: &SimEnvironment, client: ActorId) -> usize {
    env.client(client).map(|c| c.replies().len()).unwrap_or(0)
}

/// Send `message` to `target` and wait for the client's next reply
fn request(
    env: &mut SimEnvironment,
    client: ActorId,
    target: ActorId,
    message: ClientMessage,
) -> Result<ClientMessage> {
    let before = reply_count(env, client);
    env.tell(target, message.into())?;
    env.run_until("client reply", |env| reply_count(env, client) > before)?;
    Ok(env.client(client).unwrap().replies()[before].clone())
}

/// Open a session and return the worker that acknowledged it
fn open(
    env: &mut SimEnvironment,
    client: ActorId,
    communication_id: CommunicationId,
) -> Result<ActorId> {
    let dispatcher = env.dispatcher();
    let init = ClientMessage::InitCommunication {
        client,
        communication_id,
    };
    match request(env, client, dispatcher, init)? {
        ClientMessage::InitAck { worker, .. } => Ok(worker),
        other => panic!("expected InitAck, got {:?}", other),
    }
}

fn publish(
    env: &mut SimEnvironment,
    client: ActorId,
    worker: ActorId,
    communication_id: CommunicationId,
    body: &str,
) -> Result<ClientMessage> {
    let message = ClientMessage::Publish {
        message: UserMessage::new("alice", body),
        communication_id,
    };
    request(env, client, worker, message)
}

// =============================================================================
// Session Lifecycle
// =============================================================================

#[test]
fn test_dst_session_open_finish_then_shutdown() {
    let result = board(2).run(|env| {
        let client = env.spawn_client("alice")?;

        let worker = open(env, client, 10)?;
        assert_eq!(worker, env.workers()[worker_index(10, 2)]);
        assert_eq!(env.client(client).unwrap().count("InitAck"), 1);

        let finished = request(
            env,
            client,
            worker,
            ClientMessage::FinishCommunication {
                communication_id: 10,
            },
        )?;
        assert_eq!(
            finished,
            ClientMessage::FinishAck {
                communication_id: 10
            }
        );

        // Stop and a new session arrive together; the session is refused.
        env.stop_board()?;
        let dispatcher = env.dispatcher();
        let refused = request(
            env,
            client,
            dispatcher,
            ClientMessage::InitCommunication {
                client,
                communication_id: 11,
            },
        )?;
        assert_eq!(
            refused,
            ClientMessage::OperationFailed {
                communication_id: 11
            }
        );
        assert_eq!(
            env.dispatcher_state().unwrap().mode(),
            DispatcherMode::Stopping
        );

        env.run_until("board stopped", |env| env.board_stopped())?;
        assert_eq!(env.client(client).unwrap().replies().len(), 3);
        Ok(())
    });

    assert!(result.is_ok(), "Test failed: {:?}", result.err());
}

#[test]
fn test_dst_publish_body_length_limit() {
    let result = board(2).run(|env| {
        let client = env.spawn_client("alice")?;
        let worker = open(env, client, 1)?;

        let accepted = publish(env, client, worker, 1, "0123456789")?;
        assert_eq!(
            accepted,
            ClientMessage::OperationAck {
                communication_id: 1,
                message_id: Some(MessageId::FIRST)
            }
        );

        let rejected = publish(env, client, worker, 1, "01234567890")?;
        assert_eq!(
            rejected,
            ClientMessage::OperationFailed {
                communication_id: 1
            }
        );

        assert_eq!(env.store_state().unwrap().len(), 1);
        Ok(())
    });

    assert!(result.is_ok(), "Test failed: {:?}", result.err());
}

#[test]
fn test_dst_duplicate_publish_rejected() {
    let result = board(3).run(|env| {
        let client = env.spawn_client("alice")?;
        let worker = open(env, client, 5)?;

        let first = publish(env, client, worker, 5, "same")?;
        assert!(matches!(first, ClientMessage::OperationAck { .. }));

        let second = publish(env, client, worker, 5, "same")?;
        assert_eq!(
            second,
            ClientMessage::OperationFailed {
                communication_id: 5
            }
        );

        let third = publish(env, client, worker, 5, "other")?;
        assert_eq!(
            third,
            ClientMessage::OperationAck {
                communication_id: 5,
                message_id: Some(MessageId::new(2))
            }
        );
        Ok(())
    });

    assert!(result.is_ok(), "Test failed: {:?}", result.err());
}

#[test]
fn test_dst_like_at_most_once_per_client() {
    let result = board(2).run(|env| {
        let client = env.spawn_client("alice")?;
        let worker = open(env, client, 7)?;
        publish(env, client, worker, 7, "likeable")?;

        let like = |name: &str| ClientMessage::Like {
            client_name: name.to_string(),
            message_id: MessageId::FIRST,
            communication_id: 7,
        };

        let first = request(env, client, worker, like("bob"))?;
        assert!(matches!(first, ClientMessage::OperationAck { .. }));
        let repeated = request(env, client, worker, like("bob"))?;
        assert!(matches!(repeated, ClientMessage::OperationFailed { .. }));
        let other = request(env, client, worker, like("carol"))?;
        assert!(matches!(other, ClientMessage::OperationAck { .. }));

        let unknown = request(
            env,
            client,
            worker,
            ClientMessage::Like {
                client_name: "bob".into(),
                message_id: MessageId::new(99),
                communication_id: 7,
            },
        )?;
        assert!(matches!(unknown, ClientMessage::OperationFailed { .. }));

        let stored = env.store_state().unwrap().get(MessageId::FIRST).unwrap();
        assert_eq!(stored.likes.len(), 2);
        Ok(())
    });

    assert!(result.is_ok(), "Test failed: {:?}", result.err());
}

#[test]
fn test_dst_retrieve_returns_author_messages() {
    let result = board(2).run(|env| {
        let client = env.spawn_client("alice")?;
        let worker = open(env, client, 3)?;
        publish(env, client, worker, 3, "one")?;
        publish(env, client, worker, 3, "two")?;

        let found = request(
            env,
            client,
            worker,
            ClientMessage::RetrieveMessages {
                author: "alice".into(),
                communication_id: 3,
            },
        )?;
        match found {
            ClientMessage::FoundMessages { messages, .. } => {
                let bodies: Vec<_> = messages.iter().map(|m| m.body.as_str()).collect();
                assert_eq!(bodies, vec!["one", "two"]);
            }
            other => panic!("expected FoundMessages, got {:?}", other),
        }

        let nobody = request(
            env,
            client,
            worker,
            ClientMessage::RetrieveMessages {
                author: "nobody".into(),
                communication_id: 3,
            },
        )?;
        assert!(matches!(nobody, ClientMessage::FoundMessages { ref messages, .. } if messages.is_empty()));
        Ok(())
    });

    assert!(result.is_ok(), "Test failed: {:?}", result.err());
}

// =============================================================================
// Routing
// =============================================================================

#[test]
fn test_dst_routing_is_deterministic_across_runs() {
    let ids: Vec<CommunicationId> = vec![-5, 0, 1, 2, 10, 11, 12, 1_000_003];

    let route = |ids: Vec<CommunicationId>| {
        Simulation::new(SimConfig::new(77).with_workers(4))
            .run(move |env| {
                let client = env.spawn_client("router")?;
                let mut workers = Vec::new();
                for communication_id in ids {
                    workers.push(open(env, client, communication_id)?);
                }
                Ok((env.workers(), workers))
            })
            .unwrap()
    };

    let (all_workers, first) = route(ids.clone());
    let (_, second) = route(ids.clone());
    assert_eq!(first, second);

    for (communication_id, worker) in ids.iter().zip(&first) {
        assert_eq!(*worker, all_workers[worker_index(*communication_id, 4)]);
    }
}

#[test]
fn test_dst_single_worker_takes_every_session() {
    let result = board(1).run(|env| {
        let client = env.spawn_client("solo")?;
        for communication_id in 0..5 {
            let worker = open(env, client, communication_id)?;
            assert_eq!(worker, env.workers()[0]);
        }
        Ok(())
    });

    assert!(result.is_ok(), "Test failed: {:?}", result.err());
}

#[test]
fn test_dst_stop_ack_before_stop_is_ignored() {
    let result = board(2).run(|env| {
        let dispatcher = env.dispatcher();
        let worker = env.workers()[0];
        env.tell(dispatcher, BoardMessage::StopAck { worker })?;
        env.run_for(20)?;

        assert!(env.system.is_active(worker));
        assert_eq!(
            env.dispatcher_state().unwrap().mode(),
            DispatcherMode::Normal
        );
        Ok(())
    });

    assert!(result.is_ok(), "Test failed: {:?}", result.err());
}
