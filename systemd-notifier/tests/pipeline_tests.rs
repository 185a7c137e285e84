//! End-to-end tests: scripted listener -> dispatcher -> notification center.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use systemd_notifier::config::UnitConfig;
use systemd_notifier::listener::UnitListener;
use systemd_notifier::monitor::{
    ChangeHandler, EventSender, Monitor, TrackedUnit, TrackedUnitRegistry, UnitEvent, UnitId,
};
use systemd_notifier::notification::{Notification, NotificationCenter, NotificationKind, Notifier};
use systemd_notifier::{Error, Result};
use tokio_util::sync::CancellationToken;
use unit_state::{State, UnitCategory};

/// Replays a fixed list of `(active, sub)` snapshots per unit, then stops.
struct ScriptedListener {
    scripts: HashMap<String, Vec<(&'static str, &'static str)>>,
}

impl ScriptedListener {
    fn new(scripts: &[(&str, Vec<(&'static str, &'static str)>)]) -> Self {
        Self {
            scripts: scripts
                .iter()
                .map(|(name, steps)| (format!("{}.service", name), steps.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl UnitListener for ScriptedListener {
    async fn resolve(&self, name: &str) -> Result<UnitId> {
        let name = format!("{}.service", name);
        if self.scripts.contains_key(&name) {
            Ok(UnitId::new(name).with_service_type("simple"))
        } else {
            Err(Error::UnknownUnit(name))
        }
    }

    async fn listen(
        &self,
        unit: UnitId,
        category: UnitCategory,
        events: EventSender,
        _cancel: CancellationToken,
    ) -> Result<()> {
        for (active, sub) in self.scripts.get(unit.name()).cloned().unwrap_or_default() {
            let state = State::new(category, active, sub, "loaded", "enabled");
            if events.send(UnitEvent::new(unit.clone(), state)).is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    name: String,
    fail: bool,
    messages: Mutex<Vec<(NotificationKind, String)>>,
    lifecycle: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            ..Default::default()
        })
    }

    fn messages(&self) -> Vec<(NotificationKind, String)> {
        self.messages.lock().unwrap().clone()
    }

    fn lifecycle(&self) -> Vec<String> {
        self.lifecycle.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<()> {
        if self.fail {
            Err(Error::notifier(&self.name, "unreachable endpoint"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((notification.kind(), notification.message()));
        self.outcome()
    }

    async fn notify_start(&self, hostname: &str) -> Result<()> {
        self.lifecycle
            .lock()
            .unwrap()
            .push(format!("start {}", hostname));
        self.outcome()
    }

    async fn notify_stop(&self, hostname: &str) -> Result<()> {
        self.lifecycle
            .lock()
            .unwrap()
            .push(format!("stop {}", hostname));
        self.outcome()
    }
}

fn units(names: &[&str]) -> Vec<UnitConfig> {
    names.iter().map(|n| UnitConfig::Name(n.to_string())).collect()
}

async fn run_pipeline(
    listener: ScriptedListener,
    unit_names: &[&str],
    notifiers: &[Arc<RecordingNotifier>],
) -> TrackedUnitRegistry {
    let mut center = NotificationCenter::new();
    for notifier in notifiers {
        center.add_notifier(notifier.clone());
    }

    let mut monitor = Monitor::new("web-1", Arc::new(listener), Arc::new(center));
    monitor.register_units(&units(unit_names)).await.unwrap();
    monitor.run(std::future::pending()).await.unwrap()
}

#[tokio::test]
async fn test_failure_then_recovery_is_notified_twice() {
    let listener = ScriptedListener::new(&[(
        "nginx",
        vec![("active", "running"), ("failed", "failed"), ("active", "running")],
    )]);
    let recorder = RecordingNotifier::new("recorder");

    let registry = run_pipeline(listener, &["nginx"], &[recorder.clone()]).await;

    assert_eq!(
        recorder.messages(),
        vec![
            (
                NotificationKind::Alert,
                "alert: systemd unit nginx.service on web-1 failed".to_string()
            ),
            (
                NotificationKind::Ok,
                "ok: systemd unit nginx.service on web-1 recovered".to_string()
            ),
        ]
    );
    assert_eq!(recorder.lifecycle(), vec!["start web-1", "stop web-1"]);

    let tracked = registry.get(&UnitId::new("nginx.service").with_service_type("simple"));
    assert_eq!(tracked.unwrap().state_change().len(), 1);
}

#[tokio::test]
async fn test_auto_restart_is_not_notified() {
    let listener = ScriptedListener::new(&[(
        "worker",
        vec![
            ("active", "running"),
            ("active", "auto-restart"),
            ("active", "running"),
        ],
    )]);
    let recorder = RecordingNotifier::new("recorder");

    let registry = run_pipeline(listener, &["worker"], &[recorder.clone()]).await;

    assert!(recorder.messages().is_empty());

    let tracked = registry
        .get(&UnitId::new("worker.service").with_service_type("simple"))
        .unwrap();
    assert_eq!(tracked.state_change().len(), 3);
    assert_eq!(
        tracked.state_change().status_text(),
        "automatically restarted"
    );
}

#[tokio::test]
async fn test_failing_notifier_does_not_block_others() {
    let listener = ScriptedListener::new(&[("db", vec![("active", "running"), ("failed", "failed")])]);
    let first = RecordingNotifier::new("first");
    let broken = RecordingNotifier::failing("broken");
    let third = RecordingNotifier::new("third");

    run_pipeline(
        listener,
        &["db"],
        &[first.clone(), broken.clone(), third.clone()],
    )
    .await;

    for notifier in [&first, &broken, &third] {
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(notifier.lifecycle(), vec!["start web-1", "stop web-1"]);
    }
}

#[tokio::test]
async fn test_units_are_tracked_independently() {
    let listener = ScriptedListener::new(&[
        ("api", vec![("active", "running"), ("failed", "failed")]),
        ("cache", vec![("active", "running"), ("active", "running")]),
    ]);
    let recorder = RecordingNotifier::new("recorder");

    let registry = run_pipeline(listener, &["api", "cache"], &[recorder.clone()]).await;

    assert_eq!(registry.len(), 2);
    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("api.service"));
}

#[tokio::test]
async fn test_unknown_unit_fails_registration() {
    let listener = ScriptedListener::new(&[("nginx", vec![])]);
    let mut monitor = Monitor::new(
        "web-1",
        Arc::new(listener),
        Arc::new(NotificationCenter::new()),
    );

    let err = monitor
        .register_units(&units(&["nginx", "ghost"]))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unknown or unloaded systemd unit 'ghost.service'"
    );
}

#[derive(Default)]
struct CountingHandler {
    each: Mutex<usize>,
    important: Mutex<Vec<String>>,
}

#[async_trait]
impl ChangeHandler for CountingHandler {
    async fn on_each_change(&self, _unit: &TrackedUnit) -> Result<()> {
        *self.each.lock().unwrap() += 1;
        Ok(())
    }

    async fn on_important_change(&self, unit: &TrackedUnit) -> Result<()> {
        self.important
            .lock()
            .unwrap()
            .push(unit.state_change().status_text().to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_custom_handler_replaces_notifications() {
    let listener = ScriptedListener::new(&[(
        "nginx",
        vec![
            ("active", "running"),
            ("deactivating", "stop-sigterm"),
            ("active", "running"),
        ],
    )]);
    let recorder = RecordingNotifier::new("recorder");
    let handler = Arc::new(CountingHandler::default());

    let mut center = NotificationCenter::new();
    center.add_notifier(recorder.clone());

    let mut monitor = Monitor::new("web-1", Arc::new(listener), Arc::new(center))
        .with_handler(handler.clone());
    monitor.register_units(&units(&["nginx"])).await.unwrap();
    monitor.run(std::future::pending()).await.unwrap();

    assert_eq!(*handler.each.lock().unwrap(), 3);
    assert_eq!(*handler.important.lock().unwrap(), vec!["restarted".to_string()]);
    // lifecycle still goes through the center, transitions do not
    assert!(recorder.messages().is_empty());
    assert_eq!(recorder.lifecycle(), vec!["start web-1", "stop web-1"]);
}
