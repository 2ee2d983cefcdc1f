//! Inspector bridge for slice-store
//!
//! A middleware that forwards every state transition to an external
//! inspector: the seeded state once on `@@init`, then `{type, payload}`
//! plus a state snapshot for every action. The bridge observes and
//! always passes the chain along; it never gates. Without an inspector
//! attached it degrades to a pass-through no-op.

use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;
use slice_store::{ActionEvent, Middleware, Value};

/// Sink for inspector notifications.
///
/// Implementations decide where snapshots go: a socket, a log file, an
/// in-process recorder. Sinks must never fail loudly; a broken
/// inspector must not take the application down with it.
pub trait Inspector: Send + Sync {
    /// Called once with the seeded state when the store comes up.
    fn init(&self, state: &Value);

    /// Called for every effective transition after that.
    fn send(&self, action: &str, payload: &[Value], state: &Value);
}

/// Middleware that forwards transitions to an [`Inspector`].
pub struct DevtoolsMiddleware<I> {
    inspector: I,
}

impl<I: Inspector> DevtoolsMiddleware<I> {
    pub fn new(inspector: I) -> Self {
        Self { inspector }
    }
}

impl DevtoolsMiddleware<NoopInspector> {
    /// A bridge with no inspector attached: only calls `next()`.
    pub fn detached() -> Self {
        Self {
            inspector: NoopInspector,
        }
    }
}

impl<I: Inspector> Middleware for DevtoolsMiddleware<I> {
    fn handle(&self, event: &ActionEvent, state: &Value, next: &mut dyn FnMut()) {
        if event.is_init() {
            // The payload carries the seeded state the store came up with.
            let seeded = event.payload.first().unwrap_or(state);
            self.inspector.init(seeded);
        } else {
            self.inspector.send(&event.name, &event.payload, state);
        }
        next();
    }
}

/// Inspector that drops everything.
pub struct NoopInspector;

impl Inspector for NoopInspector {
    fn init(&self, _state: &Value) {}
    fn send(&self, _action: &str, _payload: &[Value], _state: &Value) {}
}

#[derive(Serialize)]
struct InitRecord<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    state: &'a Value,
}

#[derive(Serialize)]
struct ActionRecord<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: &'a [Value],
    state: &'a Value,
}

/// Inspector that writes one JSON object per line to any writer: a
/// log file, a pipe, a socket owned by the host application.
///
/// Write failures are logged and swallowed; the store never notices.
pub struct JsonLineInspector<W> {
    sink: Mutex<W>,
}

impl<W: Write + Send> JsonLineInspector<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    fn write_line(&self, record: &impl Serialize) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                log::warn!("inspector record did not serialize: {err}");
                return;
            }
        };
        let mut sink = match self.sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(sink, "{line}") {
            log::warn!("inspector sink write failed: {err}");
        }
    }
}

impl<W: Write + Send> Inspector for JsonLineInspector<W> {
    fn init(&self, state: &Value) {
        self.write_line(&InitRecord {
            kind: slice_store::INIT_ACTION,
            state,
        });
    }

    fn send(&self, action: &str, payload: &[Value], state: &Value) {
        self.write_line(&ActionRecord {
            kind: action,
            payload,
            state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slice_store::{Outcome, Reducer, Store};
    use std::sync::Arc;

    fn list_reducer() -> Reducer {
        Reducer::new()
            .action("add", |state, _actions, mut args| {
                let mut items = state.into_array().unwrap_or_default();
                if !args.is_empty() {
                    items.push(args.remove(0));
                }
                Ok(Outcome::Update(Value::Array(items)))
            })
            .with_state(Value::array())
    }

    #[derive(Default)]
    struct Recording {
        init: Mutex<Vec<Value>>,
        sent: Mutex<Vec<(String, Vec<Value>, Value)>>,
    }

    impl Inspector for Arc<Recording> {
        fn init(&self, state: &Value) {
            self.init.lock().unwrap().push(state.clone());
        }

        fn send(&self, action: &str, payload: &[Value], state: &Value) {
            self.sent
                .lock()
                .unwrap()
                .push((action.to_string(), payload.to_vec(), state.clone()));
        }
    }

    #[test]
    fn forwards_init_and_actions() {
        let recording = Arc::new(Recording::default());
        let store = Store::builder()
            .reducer("list", list_reducer())
            .middleware(DevtoolsMiddleware::new(Arc::clone(&recording)))
            .build()
            .unwrap();

        let seeded: Value = [("list", Value::array())].into_iter().collect();
        assert_eq!(*recording.init.lock().unwrap(), vec![seeded]);
        assert!(recording.sent.lock().unwrap().is_empty());

        store
            .actions()
            .invoke("list", "add", vec![Value::from("x")])
            .unwrap();

        let new_state: Value = [("list", Value::from(vec!["x"]))].into_iter().collect();
        let sent = recording.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "list.add");
        assert_eq!(sent[0].1, vec![Value::from("x")]);
        assert_eq!(sent[0].2, new_state);
    }

    #[test]
    fn detached_bridge_still_continues_the_chain() {
        let reached = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&reached);
        let store = Store::builder()
            .reducer("list", list_reducer())
            // Registered first, so it only runs if the bridge calls next().
            .middleware(move |_: &ActionEvent, _: &Value, next: &mut dyn FnMut()| {
                *counter.lock().unwrap() += 1;
                next();
            })
            .middleware(DevtoolsMiddleware::detached())
            .build()
            .unwrap();

        store
            .actions()
            .invoke("list", "add", vec![Value::from("x")])
            .unwrap();

        // @@init plus the one action made it through the bridge.
        assert_eq!(*reached.lock().unwrap(), 2);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_lines_carry_type_payload_and_state() {
        let buf = SharedBuf::default();
        let store = Store::builder()
            .reducer("list", list_reducer())
            .middleware(DevtoolsMiddleware::new(JsonLineInspector::new(buf.clone())))
            .build()
            .unwrap();

        store
            .actions()
            .invoke("list", "add", vec![Value::from("x")])
            .unwrap();

        let raw = buf.0.lock().unwrap().clone();
        let text = String::from_utf8(raw).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "@@init");
        assert_eq!(lines[0]["state"]["list"], serde_json::json!([]));
        assert_eq!(lines[1]["type"], "list.add");
        assert_eq!(lines[1]["payload"], serde_json::json!(["x"]));
        assert_eq!(lines[1]["state"]["list"], serde_json::json!(["x"]));
    }
}
