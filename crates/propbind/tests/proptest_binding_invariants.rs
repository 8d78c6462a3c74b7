//! Property-based invariant tests for bindings and linked properties.
//!
//! Verifies:
//! 1. A push is never delivered to the endpoint it was pushed into
//! 2. Every push from either side reaches the peer, in order
//! 3. Delivery matches a reference model including completion
//! 4. Nothing is delivered after completion, and completion is seen once
//! 5. Linked properties hold equal values after every external change
//! 6. Linked slots that notify on every write settle without ping-pong

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use propbind::{
    Binding, Endpoint, Event, KeyPath, Lifecycle, Lifetime, Observable, Side, Subscription,
    bind_endpoints, create_property_binding,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Push(Side, Option<u8>),
    Complete,
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Left), Just(Side::Right)]
}

fn push_strategy() -> impl Strategy<Value = Op> {
    (side_strategy(), proptest::option::of(0u8..4)).prop_map(|(side, v)| Op::Push(side, v))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![9 => push_strategy(), 1 => Just(Op::Complete)]
}

type Log = Arc<Mutex<Vec<Event<u8>>>>;

fn record(endpoint: &Endpoint<u8>) -> (Log, Subscription) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let sub = endpoint.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    (log, sub)
}

const fn index(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

/// Expected delivery per side.
#[derive(Default)]
struct Model {
    delivered: [Vec<Event<u8>>; 2],
    completed: bool,
}

impl Model {
    fn push(&mut self, from: Side, value: Option<u8>) {
        if self.completed {
            return;
        }
        self.delivered[index(from.opposite())].push(Event::Next(value));
    }

    fn complete(&mut self) {
        if !self.completed {
            self.completed = true;
            for log in &mut self.delivered {
                log.push(Event::Completed);
            }
        }
    }
}

struct Host {
    value: Observable<i32>,
    lifetime: Lifetime,
}

impl Lifecycle for Host {
    fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }
}

fn host(value: i32) -> Arc<Host> {
    Arc::new(Host {
        value: Observable::new(value),
        lifetime: Lifetime::new(),
    })
}

/// Host whose slot notifies on every write, changed or not.
struct NoisyHost {
    value: Mutex<i32>,
    revision: Observable<u64>,
    writes: AtomicUsize,
    lifetime: Lifetime,
}

impl NoisyHost {
    fn new(value: i32) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value),
            revision: Observable::new(0),
            writes: AtomicUsize::new(0),
            lifetime: Lifetime::new(),
        })
    }

    fn value(&self) -> i32 {
        *self.value.lock().unwrap()
    }

    fn write(&self, value: i32) {
        *self.value.lock().unwrap() = value;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.revision.update(|r| *r += 1);
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Lifecycle for NoisyHost {
    fn lifetime(&self) -> &Lifetime {
        &self.lifetime
    }
}

fn noisy_value() -> KeyPath<NoisyHost, i32> {
    KeyPath::new(
        "value",
        |h: &NoisyHost| h.value(),
        |h: &NoisyHost, v| h.write(v),
        |h: &NoisyHost, hook| h.revision.subscribe(move |_| hook()),
    )
}

// ═════════════════════════════════════════════════════════════════════════
// 1-4. Routing and completion against the reference model
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn delivery_matches_model(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let binding = Binding::new();
        let (left_log, _l) = record(&binding.left_endpoint());
        let (right_log, _r) = record(&binding.right_endpoint());
        let mut model = Model::default();

        for op in &ops {
            match op {
                Op::Push(side, value) => {
                    binding.endpoint(*side).push(*value);
                    model.push(*side, *value);
                }
                Op::Complete => {
                    let first = binding.complete();
                    prop_assert_eq!(first, !model.completed);
                    model.complete();
                }
            }
        }

        prop_assert_eq!(&*left_log.lock().unwrap(), &model.delivered[0]);
        prop_assert_eq!(&*right_log.lock().unwrap(), &model.delivered[1]);
    }
}

proptest! {
    #[test]
    fn push_never_reaches_origin(
        values in proptest::collection::vec(proptest::option::of(any::<u8>()), 1..30),
        side in side_strategy(),
    ) {
        let binding = Binding::new();
        let (origin, _o) = record(&binding.endpoint(side));
        let (peer, _p) = record(&binding.endpoint(side.opposite()));

        for value in &values {
            binding.endpoint(side).push(*value);
        }

        prop_assert!(origin.lock().unwrap().is_empty());
        let expected: Vec<Event<u8>> = values.iter().copied().map(Event::Next).collect();
        prop_assert_eq!(&*peer.lock().unwrap(), &expected);
    }
}

proptest! {
    #[test]
    fn every_push_is_delivered(pushes in proptest::collection::vec(push_strategy(), 0..40)) {
        let binding = Binding::new();
        let (left_log, _l) = record(&binding.left_endpoint());
        let (right_log, _r) = record(&binding.right_endpoint());

        let mut to_left = Vec::new();
        let mut to_right = Vec::new();
        for op in &pushes {
            if let Op::Push(side, value) = op {
                binding.endpoint(*side).push(*value);
                match side {
                    Side::Left => to_right.push(Event::Next(*value)),
                    Side::Right => to_left.push(Event::Next(*value)),
                }
            }
        }

        prop_assert_eq!(&*left_log.lock().unwrap(), &to_left);
        prop_assert_eq!(&*right_log.lock().unwrap(), &to_right);
    }
}

proptest! {
    #[test]
    fn nothing_after_completion(
        before in proptest::collection::vec(push_strategy(), 0..20),
        after in proptest::collection::vec(push_strategy(), 0..20),
    ) {
        let binding = Binding::new();
        let (left_log, _l) = record(&binding.left_endpoint());
        let (right_log, _r) = record(&binding.right_endpoint());

        let run = |ops: &[Op]| {
            for op in ops {
                if let Op::Push(side, value) = op {
                    binding.endpoint(*side).push(*value);
                }
            }
        };

        run(&before);
        prop_assert!(binding.complete());
        let left_len = left_log.lock().unwrap().len();
        let right_len = right_log.lock().unwrap().len();
        run(&after);

        for log in [&left_log, &right_log] {
            let log = log.lock().unwrap();
            prop_assert_eq!(log.last(), Some(&Event::Completed));
            prop_assert_eq!(log.iter().filter(|e| e.is_completed()).count(), 1);
        }
        prop_assert_eq!(left_log.lock().unwrap().len(), left_len);
        prop_assert_eq!(right_log.lock().unwrap().len(), right_len);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Linked properties converge
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn linked_properties_converge(
        initial in (-5i32..5, -5i32..5),
        writes in proptest::collection::vec((any::<bool>(), -5i32..5), 0..30),
    ) {
        let view = host(initial.0);
        let model = host(initial.1);
        let path = || KeyPath::observable("value", |h: &Host| &h.value);
        let view_ep = create_property_binding(&view, path(), Some(0));
        let model_ep = create_property_binding(&model, path(), Some(0));
        let _link = bind_endpoints(&view_ep, &model_ep);
        prop_assert_eq!(view.value.get(), initial.1);

        for (on_view, value) in writes {
            if on_view {
                view.value.set(value);
            } else {
                model.value.set(value);
            }
            prop_assert_eq!(view.value.get(), value);
            prop_assert_eq!(model.value.get(), value);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Always-notifying slots settle
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn noisy_linked_slots_settle(
        initial in (-5i32..5, -5i32..5),
        writes in proptest::collection::vec((any::<bool>(), -5i32..5), 0..30),
    ) {
        let view = NoisyHost::new(initial.0);
        let model = NoisyHost::new(initial.1);
        let view_ep = create_property_binding(&view, noisy_value(), Some(0));
        let model_ep = create_property_binding(&model, noisy_value(), Some(0));
        let _link = bind_endpoints(&view_ep, &model_ep);
        prop_assert_eq!(view.value(), initial.1);

        for (on_view, value) in writes {
            let (origin, peer) = if on_view { (&view, &model) } else { (&model, &view) };
            let origin_before = origin.writes();
            let peer_before = peer.writes();

            origin.write(value);

            prop_assert_eq!(view.value(), value);
            prop_assert_eq!(model.value(), value);
            prop_assert_eq!(origin.writes(), origin_before + 1, "write came back to origin");
            prop_assert!(peer.writes() <= peer_before + 1, "peer written more than once");
        }
    }
}
