//! Tests for composite bonds built by chaining `add`.

use std::sync::{Arc, Mutex};

use bark::{Bond, Emitter, Listener, Scope};

fn make_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Listener<u32> {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    Listener::new(move |_, n: &u32| log.lock().unwrap().push(format!("{tag}:{n}")))
}

/// Helper: `a` on "one", `b` on "two", `c` on "three", chained.
fn chain_of_three(emitter: &Emitter<u32>, log: &Arc<Mutex<Vec<String>>>) -> Bond<u32> {
    emitter
        .add("one", recorder(log, "a"))
        .add("two", recorder(log, "b"))
        .add("three", recorder(log, "c"))
}

fn emit_all(emitter: &Emitter<u32>, n: u32) {
    emitter.emit("one", &n).emit("two", &n).emit("three", &n);
}

#[test]
fn chained_add_registers_every_listener() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let _chain = chain_of_three(&emitter, &log);
    emit_all(&emitter, 1);

    assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "c:1"]);
}

#[test]
fn destroying_the_chain_destroys_every_registration() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let chain = chain_of_three(&emitter, &log);
    chain.destroy();
    emit_all(&emitter, 1);

    assert!(log.lock().unwrap().is_empty());
    assert!(chain.is_destroyed());
    assert!(emitter.event_types().is_empty());
}

#[test]
fn chains_nest_to_the_right() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let chain = chain_of_three(&emitter, &log);
    let Bond::Composite(outer) = &chain else {
        panic!("expected a composite, got {chain:?}");
    };
    assert!(matches!(outer.first(), Bond::Listener(_)));
    let Bond::Composite(inner) = outer.second() else {
        panic!("expected a nested composite, got {:?}", outer.second());
    };
    assert!(matches!(inner.first(), Bond::Listener(_)));
    assert!(matches!(inner.second(), Bond::Listener(_)));
}

#[test]
fn destroy_on_use_arms_every_registration_in_the_chain() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let chain = chain_of_three(&emitter, &log).destroy_on_use();
    emitter.emit("two", &1).emit("two", &2);
    assert!(!chain.is_destroyed(), "one and three have not fired yet");

    emit_all(&emitter, 3);
    emit_all(&emitter, 4);

    assert_eq!(*log.lock().unwrap(), vec!["b:1", "a:3", "c:3"]);
    assert!(chain.is_destroyed());
}

#[test]
fn destroy_reaches_the_second_child_when_the_first_is_already_gone() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let first = emitter.add("one", recorder(&log, "a"));
    let chain = first.add("two", recorder(&log, "b"));
    first.destroy();
    assert!(!chain.is_destroyed());

    chain.destroy();
    emit_all(&emitter, 1);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn adding_to_a_destroyed_chain_still_registers() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let chain = chain_of_three(&emitter, &log);
    chain.destroy();
    let extended = chain.add("one", recorder(&log, "d"));
    emit_all(&emitter, 1);

    assert_eq!(*log.lock().unwrap(), vec!["d:1"]);
    assert!(!extended.is_destroyed());
}

#[test]
fn chained_add_with_scope_passes_the_scope() {
    let emitter: Emitter<u32> = Emitter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::new("yard");

    let listener = {
        let seen = Arc::clone(&seen);
        Listener::new(move |scope: &Scope, _: &u32| seen.lock().unwrap().push(scope.clone()))
    };
    emitter
        .add("one", Listener::new(|_, _: &u32| {}))
        .add_with_scope("two", listener, scope.clone());
    emitter.emit("two", &0);

    assert!(seen.lock().unwrap()[0].ptr_eq(&scope));
}

#[test]
fn chaining_a_duplicate_shares_the_registration() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();
    let listener = recorder(&log, "dup");

    let chain = emitter
        .add("one", listener.clone())
        .add("one", listener);
    assert_eq!(emitter.listener_count("one"), 1);

    chain.destroy();
    assert_eq!(emitter.listener_count("one"), 0);
}

#[test]
fn chained_add_after_the_emitter_is_dropped_returns_the_chain() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();
    let chain = chain_of_three(&emitter, &log);
    drop(emitter);

    assert!(chain.add("four", recorder(&log, "d")).ptr_eq(&chain));
    assert!(chain.try_add("four", recorder(&log, "d")).is_err());
}

#[test]
fn debug_shows_both_children() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let chain = chain_of_three(&emitter, &log);
    assert_eq!(
        format!("{chain:?}"),
        "CompositeBond(firstBond=Bond(destroyed=false), \
         secondBond=CompositeBond(firstBond=Bond(destroyed=false), \
         secondBond=Bond(destroyed=false)))"
    );
}
