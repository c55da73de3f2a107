//! Property-based tests for the message store's ordering invariant.
//!
//! For any interleaving of `seed` and `append` operations the store must
//! contain no duplicate identifiers and preserve first-seen order. Checked
//! against a reference model that tracks ids in a plain `Vec`.

use std::collections::HashSet;

use proptest::prelude::*;

use roomchat::session::store::MessageStore;
use roomchat_proto::message::{Message, MessageId, Timestamp};
use roomchat_proto::room::RoomId;
use roomchat_proto::user::User;

/// Operations the property exercises. Ids are drawn from a small range so
/// collisions (duplicate deliveries) actually happen.
#[derive(Debug, Clone)]
enum Op {
    Append(u8),
    Seed(Vec<u8>),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..20).prop_map(Op::Append),
        1 => prop::collection::vec(0u8..20, 0..10).prop_map(Op::Seed),
    ]
}

fn message(id: u8) -> Message {
    Message {
        id: MessageId::from_uuid(uuid::Uuid::from_u128(u128::from(id))),
        author: User::new("u-1", "alice", "alice@example.com"),
        content: format!("message {id}"),
        room_id: RoomId::new("general"),
        created_at: Timestamp::from_millis(0),
    }
}

/// Reference model: first-seen id order, reset wholesale by seed.
fn apply_model(model: &mut Vec<u8>, op: &Op) {
    match op {
        Op::Append(id) => {
            if !model.contains(id) {
                model.push(*id);
            }
        }
        Op::Seed(ids) => {
            model.clear();
            for id in ids {
                if !model.contains(id) {
                    model.push(*id);
                }
            }
        }
    }
}

proptest! {
    /// The store matches the reference model after any operation sequence.
    #[test]
    fn store_matches_first_seen_model(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut store = MessageStore::new();
        let mut model: Vec<u8> = Vec::new();

        for op in &ops {
            match op {
                Op::Append(id) => {
                    store.append(message(*id));
                }
                Op::Seed(ids) => {
                    store.seed(ids.iter().map(|id| message(*id)).collect());
                }
            }
            apply_model(&mut model, op);
        }

        let stored_ids: Vec<MessageId> = store.messages().iter().map(|m| m.id.clone()).collect();
        let expected: Vec<MessageId> = model
            .iter()
            .map(|id| MessageId::from_uuid(uuid::Uuid::from_u128(u128::from(*id))))
            .collect();
        prop_assert_eq!(stored_ids, expected);
    }

    /// No operation sequence ever produces a duplicate identifier.
    #[test]
    fn store_never_holds_duplicates(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut store = MessageStore::new();
        for op in &ops {
            match op {
                Op::Append(id) => {
                    store.append(message(*id));
                }
                Op::Seed(ids) => {
                    store.seed(ids.iter().map(|id| message(*id)).collect());
                }
            }
        }

        let mut seen = HashSet::new();
        for msg in store.messages() {
            prop_assert!(seen.insert(msg.id.clone()), "duplicate id {}", msg.id);
        }
    }

    /// Append returns false exactly when the id is already present, and a
    /// rejected append leaves the store untouched.
    #[test]
    fn append_result_reflects_novelty(ids in prop::collection::vec(0u8..20, 0..40)) {
        let mut store = MessageStore::new();
        let mut seen = HashSet::new();

        for id in ids {
            let before: Vec<String> = store.messages().iter().map(|m| m.content.clone()).collect();
            let inserted = store.append(message(id));
            prop_assert_eq!(inserted, seen.insert(id));
            if !inserted {
                let after: Vec<String> =
                    store.messages().iter().map(|m| m.content.clone()).collect();
                prop_assert_eq!(before, after);
            }
        }
    }
}
