//! End-to-end tests: scripts on the script thread, views on the UI thread.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trellis_api::{Value, ViewTag};
use trellis_host::{Bridge, HostConfig, ROOT_TAG, UI_MANAGER_CONSTANTS};
use trellis_script::{ConsoleLevel, ConsoleSink};
use trellis_ui::{UiEvent, ViewManagerRegistry};

#[derive(Default)]
struct Lines(Mutex<Vec<(ConsoleLevel, String)>>);

impl Lines {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl ConsoleSink for Lines {
    fn write(&self, level: ConsoleLevel, message: &str) -> std::io::Result<()> {
        self.0.lock().unwrap().push((level, message.to_string()));
        Ok(())
    }
}

fn fast_config() -> HostConfig {
    let mut config = HostConfig::default();
    config.ui.frame_interval_ms = 2;
    config
}

fn start() -> (Bridge, Arc<Lines>) {
    let lines = Arc::new(Lines::default());
    let bridge =
        Bridge::with_sink(&fast_config(), ViewManagerRegistry::new(), lines.clone()).unwrap();
    bridge.mount_root(320.0, 480.0).unwrap();
    (bridge, lines)
}

fn root_children(bridge: &Bridge) -> Vec<ViewTag> {
    bridge
        .with_ui(|ui| ui.children(ROOT_TAG).map(<[ViewTag]>::to_vec).unwrap_or_default())
        .unwrap()
}

#[test]
fn test_script_flush_reaches_ui_thread() {
    let (bridge, _) = start();
    bridge
        .run_script(
            r#"
            __flushUiBatch([
                #{ op: "createView", tag: 2, className: "View", props: #{ opacity: 0.25 } },
                #{ op: "manageChildren", tag: rootTag, add: [#{ tag: 2, index: 0 }] },
                #{ op: "updateLayout", tag: 2, x: 1.0, y: 2.0, width: 30.0, height: 40.0 },
            ]);
            "#,
        )
        .unwrap();

    assert_eq!(root_children(&bridge), vec![ViewTag(2)]);
    let (opacity, width) = bridge
        .with_ui(|ui| {
            let element = ui.element(ViewTag(2)).unwrap();
            (element.opacity, element.frame.width)
        })
        .unwrap();
    assert_eq!(opacity, 0.25);
    assert_eq!(width, 30.0);
    bridge.shutdown();
}

#[test]
fn test_native_props_are_published() {
    let (bridge, _) = start();
    let constants = bridge.get_global(UI_MANAGER_CONSTANTS).unwrap();
    let props = constants
        .get("View")
        .and_then(|view| view.get("nativeProps"))
        .unwrap();
    assert_eq!(props.get("opacity"), Some(&Value::from("number")));
    assert_eq!(props.get("backgroundColor"), Some(&Value::from("Color")));
    assert!(constants.get("Text").is_some());

    bridge
        .run_script(r#"let opacity_type = UIManagerConstants.View.nativeProps.opacity;"#)
        .unwrap();
    assert_eq!(bridge.get_global("opacity_type").unwrap(), Value::from("number"));
}

#[test]
fn test_returned_queue_is_flushed() {
    let (bridge, _) = start();
    bridge
        .run_script(
            r#"
            let Screen = #{
                mount: |g, tag| [
                    #{ op: "createView", tag: tag, className: "Text", props: #{ text: "hi" } },
                    #{ op: "manageChildren", tag: 1, add: [#{ tag: tag, index: 0 }] },
                ],
                count: |g| 3,
            };
            "#,
        )
        .unwrap();

    let result = bridge
        .call_function("Screen", "mount", vec![Value::from(7i64)])
        .unwrap();
    assert_eq!(result.as_list().map(<[Value]>::len), Some(2));
    assert_eq!(root_children(&bridge), vec![ViewTag(7)]);

    let count = bridge.call_function("Screen", "count", vec![]).unwrap();
    assert_eq!(count, Value::from(3i64));
    assert_eq!(bridge.with_ui(|ui| ui.len()).unwrap(), 2);
}

#[test]
fn test_flushing_a_non_list_is_a_script_error() {
    let (bridge, _) = start();
    let err = bridge.run_script(r#"__flushUiBatch("views");"#).unwrap_err();
    assert!(err.to_string().contains("expects a list"), "{err:#}");
    // empty batches are dropped
    bridge.run_script("__flushUiBatch([]);").unwrap();
    assert_eq!(bridge.with_ui(|ui| ui.len()).unwrap(), 1);
}

#[test]
fn test_bad_item_does_not_stop_the_batch() {
    let (bridge, _) = start();
    let mut events = bridge.subscribe();
    bridge
        .run_script(
            r#"
            __flushUiBatch([
                #{ op: "updateView", tag: 99 },
                #{ op: "createView", tag: 2, className: "View" },
            ]);
            "#,
        )
        .unwrap();
    bridge.with_ui(|_| ()).unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        UiEvent::BatchApplied {
            applied: 1,
            failed: 1,
        }
    );
    assert!(bridge.with_ui(|ui| ui.contains(ViewTag(2))).unwrap());
}

#[test]
fn test_create_animation_settles() {
    let (bridge, _) = start();
    bridge
        .run_script(
            r#"
            __flushUiBatch([
                #{
                    op: "configureLayoutAnimation",
                    config: #{ duration: 30, create: #{ property: "opacity" } }
                },
                #{ op: "createView", tag: 2, className: "View" },
                #{ op: "manageChildren", tag: 1, add: [#{ tag: 2, index: 0 }] },
                #{ op: "updateLayout", tag: 2, x: 0.0, y: 0.0, width: 10.0, height: 10.0 },
            ]);
            "#,
        )
        .unwrap();

    assert!(bridge.with_ui(|ui| ui.is_animating(ViewTag(2))).unwrap());
    assert!(bridge.settle(Duration::from_secs(5)).unwrap());
    let opacity = bridge
        .with_ui(|ui| ui.element(ViewTag(2)).map(|e| e.opacity))
        .unwrap();
    assert_eq!(opacity, Some(1.0));
}

#[test]
fn test_settle_with_unbounded_timeout() {
    let (bridge, _) = start();
    bridge
        .run_script(
            r#"
            __flushUiBatch([
                #{ op: "configureLayoutAnimation", config: #{ create: #{ duration: 20 } } },
                #{ op: "createView", tag: 2, className: "View" },
                #{ op: "manageChildren", tag: 1, add: [#{ tag: 2, index: 0 }] },
                #{ op: "updateLayout", tag: 2, x: 0.0, y: 0.0, width: 8.0, height: 8.0 },
            ]);
            "#,
        )
        .unwrap();
    assert!(bridge.settle(Duration::MAX).unwrap());
    assert!(bridge.settle(Duration::from_millis(u64::MAX)).unwrap());
    assert_eq!(bridge.with_ui(|ui| ui.active_animations()).unwrap(), 0);
}

#[test]
fn test_huge_animation_duration_keeps_ui_thread_alive() {
    let (bridge, _) = start();
    bridge
        .run_script(
            r#"
            __flushUiBatch([
                #{
                    op: "configureLayoutAnimation",
                    config: #{ duration: 1.0e300, create: #{ type: "linear" } }
                },
                #{ op: "createView", tag: 2, className: "View" },
                #{ op: "manageChildren", tag: 1, add: [#{ tag: 2, index: 0 }] },
                #{ op: "updateLayout", tag: 2, x: 0.0, y: 0.0, width: 8.0, height: 8.0 },
            ]);
            "#,
        )
        .unwrap();
    assert!(bridge.with_ui(|ui| ui.is_animating(ViewTag(2))).unwrap());
    bridge
        .run_script(r#"__flushUiBatch([#{ op: "createView", tag: 3, className: "Text" }]);"#)
        .unwrap();
    assert!(bridge.with_ui(|ui| ui.contains(ViewTag(3))).unwrap());
}

#[test]
fn test_console_reaches_sink() {
    let (bridge, lines) = start();
    bridge
        .run_script(r#"console.warn("root", rootTag); print("plain");"#)
        .unwrap();
    assert_eq!(lines.messages(), vec!["\"root\" 1".to_string(), "plain".to_string()]);
    assert!(matches!(lines.0.lock().unwrap()[0].0, ConsoleLevel::Warn));
}

#[test]
fn test_demo_script_renders() {
    let (bridge, _) = start();
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/hello.rhai");
    bridge.run_file(&demo).unwrap();
    assert_eq!(root_children(&bridge), vec![ViewTag(100)]);

    bridge
        .call_function("App", "render", vec![Value::from("Hello")])
        .unwrap();
    assert_eq!(root_children(&bridge), vec![ViewTag(2), ViewTag(100)]);
    assert!(bridge.settle(Duration::from_secs(5)).unwrap());

    let snapshot = bridge.snapshot().unwrap();
    let root = &snapshot.as_list().unwrap()[0];
    let card = &root.get("children").and_then(Value::as_list).unwrap()[0];
    let text = &card.get("children").and_then(Value::as_list).unwrap()[0];
    assert_eq!(text.get("text"), Some(&Value::from("Hello")));
    assert_eq!(text.get("fontSize"), Some(&Value::from(18.0)));
    assert_eq!(card.get("opacity"), Some(&Value::from(1.0)));
}

#[test]
fn test_missing_script_file_is_reported() {
    let (bridge, _) = start();
    let err = bridge.run_file(Path::new("/nonexistent/app.rhai")).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read script"));
}
