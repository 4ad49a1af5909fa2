//! End-to-end scenarios exercising dialogue creation, promotion, and the
//! validity pipeline's rejection paths.

mod support;

use dialogue_core::{Address, DialogueMessage, DialogueReference, Dialogues, Message, MessageId, Target};
use std::sync::Arc;
use support::{NegotiationProtocol, Performative, end_states};
use test_log::test;

fn addr(s: &str) -> Address {
    Address::try_from(s.to_string()).unwrap()
}

#[test]
fn happy_self_initiated_two_turn_exchange() {
    let alice = addr("alice");
    let bob = addr("bob");
    let mut alices_dialogues = Dialogues::new(alice.clone(), Arc::new(NegotiationProtocol), &end_states());

    let (initial, _dialogue) = alices_dialogues
        .create(bob.clone(), Performative::Propose, "offer".to_string())
        .unwrap();
    assert_eq!(initial.message_id().into_inner(), 1);
    assert_eq!(initial.target().into_inner(), 0);
    assert!(initial.dialogue_reference().is_incomplete());
    let starter = initial.dialogue_reference().starter_reference().to_string();

    let mut reply = Message::new(
        initial.dialogue_reference().with_responder("resp1"),
        MessageId::try_new(2).unwrap(),
        Target::of(initial.message_id()),
        Performative::Accept,
        "accepted".to_string(),
    );
    reply.set_sender(bob);
    reply.set_to(alice);

    let dialogue = alices_dialogues.update(reply).expect("promotion should succeed");
    assert_eq!(dialogue.dialogue_label().dialogue_starter_reference(), starter);
    assert_eq!(dialogue.dialogue_label().dialogue_responder_reference(), "resp1");
}

#[test]
fn invalid_label_is_dropped() {
    let alice = addr("alice");
    let bob = addr("bob");
    let mut dialogues = Dialogues::new(alice.clone(), Arc::new(NegotiationProtocol), &end_states());

    let mut message = Message::new(
        DialogueReference::new("", ""),
        MessageId::try_new(1).unwrap(),
        Target::starting(),
        Performative::Propose,
        "offer".to_string(),
    );
    message.set_sender(bob);
    message.set_to(alice);

    assert!(dialogues.update(message).is_none());
    assert!(dialogues.dialogues().is_empty());
}

#[test]
fn out_of_order_message_id_is_rejected() {
    let alice = addr("alice");
    let bob = addr("bob");
    let mut dialogues = Dialogues::new(alice.clone(), Arc::new(NegotiationProtocol), &end_states());

    let (initial, _) = dialogues
        .create(bob.clone(), Performative::Propose, "offer".to_string())
        .unwrap();

    let mut accept = Message::new(
        initial.dialogue_reference().with_responder("resp1"),
        MessageId::try_new(2).unwrap(),
        Target::of(initial.message_id()),
        Performative::Accept,
        "accepted".to_string(),
    );
    accept.set_sender(bob.clone());
    accept.set_to(alice.clone());
    dialogues.update(accept).expect("first reply should be accepted");

    let mut out_of_order = Message::new(
        DialogueReference::new(initial.dialogue_reference().starter_reference().to_string(), "resp1"),
        MessageId::try_new(4).unwrap(),
        Target::new(3),
        Performative::Accept,
        "too far ahead".to_string(),
    );
    out_of_order.set_sender(bob);
    out_of_order.set_to(alice);

    assert!(dialogues.update(out_of_order).is_none());
    let dialogue = dialogues.get_dialogue(&initial).unwrap();
    assert_eq!(dialogue.last_message().unwrap().message_id().into_inner(), 2);
}

#[test]
fn reply_targeting_non_predecessor_fails_additional_validation() {
    let alice = addr("alice");
    let bob = addr("bob");
    let mut dialogues = Dialogues::new(alice.clone(), Arc::new(NegotiationProtocol), &end_states());

    let (initial, dialogue) = dialogues
        .create(bob.clone(), Performative::Propose, "offer".to_string())
        .unwrap();
    let initial = initial.clone();

    let reply = dialogue
        .reply(&initial, Performative::Accept, "accepted".to_string())
        .unwrap();
    assert_eq!(dialogue.last_message().unwrap().message_id().into_inner(), reply.message_id().into_inner());

    let err = dialogue
        .reply(&initial, Performative::Accept, "stale target".to_string())
        .unwrap_err();
    assert!(matches!(err, dialogue_core::DialogueError::InvalidDialogueMessage { .. }));
    assert_eq!(dialogue.last_message().unwrap().message_id().into_inner(), 2);
}

#[test]
fn opponent_initiated_dialogue_is_created_and_promoted() {
    let dave = addr("dave");
    let carol = addr("carol");
    let mut dialogues = Dialogues::new(dave.clone(), Arc::new(NegotiationProtocol), &end_states());

    let mut first = Message::new(
        DialogueReference::incomplete("n3"),
        MessageId::try_new(1).unwrap(),
        Target::starting(),
        Performative::Propose,
        "offer".to_string(),
    );
    first.set_sender(carol.clone());
    first.set_to(dave);

    let dialogue = dialogues.update(first.clone()).expect("opponent-initiated dialogue should be created");
    assert!(!dialogue.is_self_initiated());
    assert_eq!(dialogue.dialogue_label().dialogue_starter_addr(), &carol);
    assert_eq!(dialogue.dialogue_label().dialogue_opponent_addr(), &carol);
    assert!(dialogue.dialogue_label().dialogue_reference().is_complete());

    let promoted_label = dialogues.get_dialogue_label(&first).expect("promotion map routes the original reference");
    assert_eq!(&promoted_label, dialogues.get_dialogue(&first).unwrap().dialogue_label());
}

#[test]
fn forbidden_performative_reply_is_rejected() {
    let alice = addr("alice");
    let bob = addr("bob");
    let mut dialogues = Dialogues::new(alice.clone(), Arc::new(NegotiationProtocol), &end_states());

    let (initial, _) = dialogues
        .create(bob.clone(), Performative::Propose, "offer".to_string())
        .unwrap();

    let mut forbidden = Message::new(
        initial.dialogue_reference().with_responder("resp1"),
        MessageId::try_new(2).unwrap(),
        Target::of(initial.message_id()),
        Performative::Inform,
        "not a valid reply to propose".to_string(),
    );
    forbidden.set_sender(bob);
    forbidden.set_to(alice);

    assert!(dialogues.update(forbidden).is_none());
}
