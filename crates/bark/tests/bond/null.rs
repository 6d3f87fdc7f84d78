//! Tests for the null bond handed out for null listeners.

use std::sync::{Arc, Mutex};

use bark::{Bond, Emitter, Listener};

fn make_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Listener<u32> {
    let log = Arc::clone(log);
    let tag = tag.to_string();
    Listener::new(move |_, n: &u32| log.lock().unwrap().push(format!("{tag}:{n}")))
}

fn null_bond(emitter: &Emitter<u32>) -> Bond<u32> {
    emitter.add("bark", None::<Listener<u32>>)
}

#[test]
fn destroy_and_destroy_on_use_do_nothing() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();
    emitter.add("bark", recorder(&log, "live"));

    let null = null_bond(&emitter);
    null.destroy();
    let armed = null.destroy_on_use();
    emitter.emit("bark", &1).emit("bark", &2);

    assert!(armed.ptr_eq(&null));
    assert!(null.is_destroyed());
    assert_eq!(*log.lock().unwrap(), vec!["live:1", "live:2"]);
}

#[test]
fn add_on_a_null_bond_registers_directly() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let bond = null_bond(&emitter).add("bark", recorder(&log, "l"));
    assert!(
        matches!(bond, Bond::Listener(_)),
        "no composite around a null bond, got {bond:?}"
    );

    emitter.emit("bark", &1);
    assert_eq!(*log.lock().unwrap(), vec!["l:1"]);
}

#[test]
fn chain_starting_with_a_null_listener() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let chain = emitter
        .add("one", None::<Listener<u32>>)
        .add("one", recorder(&log, "a"))
        .add("two", recorder(&log, "b"));
    emitter.emit("one", &1).emit("two", &2);
    assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:2"]);

    chain.destroy();
    assert!(emitter.event_types().is_empty());
}

#[test]
fn null_listener_in_the_middle_of_a_chain() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();

    let chain = emitter
        .add("one", recorder(&log, "a"))
        .add("one", None::<Listener<u32>>);
    assert_eq!(
        format!("{chain:?}"),
        "CompositeBond(firstBond=Bond(destroyed=false), secondBond=NullBond)"
    );

    chain.destroy();
    assert!(chain.is_destroyed());
    assert!(!emitter.has_listeners("one"));
}

#[test]
fn try_add_on_a_null_bond_of_a_dropped_emitter_fails() {
    let emitter: Emitter<u32> = Emitter::new();
    let log = make_log();
    let null = null_bond(&emitter);
    drop(emitter);

    assert!(null.try_add("bark", recorder(&log, "l")).is_err());
    assert!(null.add("bark", recorder(&log, "l")).ptr_eq(&null));
}

#[test]
fn debug_is_the_bare_name() {
    let emitter: Emitter<u32> = Emitter::new();
    assert_eq!(format!("{:?}", null_bond(&emitter)), "NullBond");
}
