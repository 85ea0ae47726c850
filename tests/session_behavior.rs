//! Behavior-driven tests for a full chart session.
//!
//! These tests drive an [`App`](klinescope_core::App) through its public
//! handle against a scripted backend, and check what a user would see:
//! - bootstrap defaults and the submit gate
//! - chart generation, rendering and the success alert
//! - request timeouts and duplicate submissions
//! - reset behavior

use std::time::Duration;

use klinescope_core::api::CHART_PATH;
use klinescope_core::app::{
    CHART_SUCCESS_ALERT, RESET_ALERT, STATUS_READY, STATUS_RESET, STATUS_SUBMITTING,
};
use klinescope_core::{
    App, AppConfig, BootstrapPhase, ChartView, FigureFileSink, HttpChartBackend, HttpMethod, HttpResponse, IndexName, RequestState, Severity,
    SinkCall, SymbolId, UserAction, TIMEOUT_MESSAGE,
};
use klinescope_tests::{
    bootstrapped, chart_body, charting, expected_gate, Arc, Harness, BASE_URL, HOT_FLAGSHIP,
    HOT_TWO,
};

fn id(raw: &str) -> SymbolId {
    SymbolId::parse(raw).expect("valid symbol")
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn when_bootstrap_succeeds_system_selects_flagship_and_default_index() {
    // Given: a backend whose hot pool holds the flagship and two indices
    let harness = Harness::start(bootstrapped(HOT_FLAGSHIP));

    // When: the session finishes loading
    let ready = harness.bootstrapped().await;

    // Then: the defaults are applied and the gate is open
    assert_eq!(ready.phase, BootstrapPhase::Ready);
    assert_eq!(ready.selection.symbols, vec![id("sh600519")]);
    assert_eq!(
        ready.selection.index,
        Some(IndexName::new("上证指数").expect("index"))
    );
    assert!(ready.can_submit);
    assert_eq!(ready.status.text, STATUS_READY);
    assert!(!ready.status.busy);
    assert!(ready.notification.is_none());
    assert_eq!(ready.view, ChartView::Placeholder);
}

#[tokio::test]
async fn when_bootstrap_runs_system_fetches_both_lists_once() {
    // Given: a fresh session
    let harness = Harness::start(bootstrapped(HOT_TWO));

    // When: bootstrap completes
    let ready = harness.bootstrapped().await;

    // Then: each list was requested exactly once and is exposed to pickers
    assert_eq!(harness.client.call_count("/api/stocks?limit=20"), 1);
    assert_eq!(harness.client.call_count("/api/indices"), 1);
    assert_eq!(ready.symbols.len(), 2);
    assert_eq!(ready.indices.len(), 2);
    assert_eq!(ready.label_for(&id("sz000001")), Some("平安银行"));
}

// ============================================================================
// Submit gate
// ============================================================================

#[tokio::test]
async fn when_selection_is_cleared_system_ignores_submit() {
    // Given: a ready session
    let harness = Harness::start(charting(HOT_FLAGSHIP, 1));
    harness.bootstrapped().await;

    // When: every symbol is deselected and the user submits
    harness
        .handle
        .dispatch(UserAction::SelectSymbols(Vec::new()))
        .expect("dispatch");
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    let after = harness.handle.sync().await.expect("sync");

    // Then: the gate is closed and nothing reached the backend
    assert!(!after.can_submit);
    assert_eq!(after.request_state, RequestState::Idle);
    assert_eq!(harness.chart_calls(), 0);
    assert_eq!(harness.sink.draw_count(), 0);
}

#[tokio::test]
async fn when_index_is_cleared_system_closes_gate() {
    // Given: a ready session
    let harness = Harness::start(charting(HOT_FLAGSHIP, 1));
    harness.bootstrapped().await;

    // When: the index is removed
    harness
        .handle
        .dispatch(UserAction::SetIndex(None))
        .expect("dispatch");
    let after = harness.handle.sync().await.expect("sync");

    // Then: the gate follows the form
    assert!(!after.can_submit);
    assert!(expected_gate(&after) == after.can_submit);
}

#[tokio::test]
async fn when_any_input_changes_system_publishes_consistent_gate() {
    // Given: a session with a slow chart endpoint
    let client = bootstrapped(HOT_TWO).on_delayed(
        HttpMethod::Post,
        CHART_PATH,
        HttpResponse::ok_json(chart_body(2, "上证指数")),
        Duration::from_millis(40),
    );
    let harness = Harness::start(client);
    harness.bootstrapped().await;

    let actions = [
        UserAction::SelectSymbols(vec![id("sh600519"), id("sz000001")]),
        UserAction::SetNormalize(true),
        UserAction::SetIndex(None),
        UserAction::SetIndex(Some(IndexName::new("深证成指").expect("index"))),
        UserAction::RemoveSymbol(id("sh600519")),
        UserAction::Submit,
    ];

    // When: each action is applied
    let mut last = harness.handle.snapshot();
    for action in actions {
        harness.handle.dispatch(action).expect("dispatch");
        last = harness.handle.sync().await.expect("sync");

        // Then: the published gate always equals valid && idle && !busy
        assert_eq!(last.can_submit, expected_gate(&last));
    }

    assert_eq!(last.request_state, RequestState::Loading);
    assert!(!last.can_submit);
}

// ============================================================================
// Chart generation
// ============================================================================

#[tokio::test]
async fn when_two_symbols_are_charted_system_renders_once_and_reports_count() {
    // Given: two selected symbols and a backend that confirms two stocks
    let harness = Harness::start(charting(HOT_TWO, 2));
    harness.bootstrapped().await;
    harness
        .handle
        .dispatch(UserAction::SelectSymbols(vec![id("sh600519"), id("sz000001")]))
        .expect("dispatch");

    // When: the user submits
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    let submitted = harness.handle.sync().await.expect("sync");
    let done = harness
        .handle
        .wait_for(|snapshot| matches!(snapshot.view, ChartView::Chart { .. }))
        .await
        .expect("chart");

    // Then: loading was shown first, then exactly one draw and a success alert
    assert_eq!(submitted.status.text, STATUS_SUBMITTING);
    assert!(submitted.status.busy);
    assert_eq!(submitted.view, ChartView::Loading);

    assert_eq!(harness.sink.draw_count(), 1);
    assert!(done.status.text.contains("2只股票"));
    assert_eq!(done.chart_info.as_deref(), Some("2只股票 + 上证指数"));
    let notification = done.notification.expect("success alert");
    assert_eq!(notification.severity, Severity::Success);
    assert_eq!(notification.text, CHART_SUCCESS_ALERT);
    assert_eq!(done.request_state, RequestState::Idle);
    assert!(done.can_submit);
}

#[tokio::test]
async fn when_chart_is_requested_system_posts_the_selection_snapshot() {
    // Given: a normalized two-symbol selection on a non-default index
    let harness = Harness::start(charting(HOT_TWO, 2));
    harness.bootstrapped().await;
    harness
        .handle
        .dispatch(UserAction::SelectSymbols(vec![id("sz000001"), id("sh600519")]))
        .expect("dispatch");
    harness
        .handle
        .dispatch(UserAction::SetIndex(Some(IndexName::new("深证成指").expect("index"))))
        .expect("dispatch");
    harness
        .handle
        .dispatch(UserAction::SetNormalize(true))
        .expect("dispatch");

    // When: the chart is generated
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    harness
        .handle
        .wait_for(|snapshot| matches!(snapshot.view, ChartView::Chart { .. }))
        .await
        .expect("chart");

    // Then: the POST body mirrors the selection, with open dates as null
    let request = harness
        .client
        .calls()
        .into_iter()
        .find(|request| request.path_and_query() == CHART_PATH)
        .expect("chart request");
    let body: serde_json::Value =
        serde_json::from_str(request.body.as_deref().expect("body")).expect("json body");
    assert_eq!(body["stocks"], serde_json::json!(["sz000001", "sh600519"]));
    assert_eq!(body["index"], "深证成指");
    assert_eq!(body["normalize"], true);
    assert!(body["start_date"].is_null());
    assert!(body["end_date"].is_null());
}

#[tokio::test]
async fn when_submit_is_pressed_twice_system_sends_one_request() {
    // Given: a slow chart endpoint
    let client = bootstrapped(HOT_FLAGSHIP).on_delayed(
        HttpMethod::Post,
        CHART_PATH,
        HttpResponse::ok_json(chart_body(1, "上证指数")),
        Duration::from_millis(40),
    );
    let harness = Harness::start(client);
    harness.bootstrapped().await;

    // When: the user double-clicks submit
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    harness
        .handle
        .wait_for(|snapshot| matches!(snapshot.view, ChartView::Chart { .. }))
        .await
        .expect("chart");

    // Then: only one request was ever in flight
    assert_eq!(harness.chart_calls(), 1);
    assert_eq!(harness.sink.draw_count(), 1);
}

#[tokio::test]
async fn when_figure_is_drawn_system_adds_interaction_defaults() {
    // Given: a ready session
    let harness = Harness::start(charting(HOT_FLAGSHIP, 1));
    harness.bootstrapped().await;

    // When: a chart is generated
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    harness
        .handle
        .wait_for(|snapshot| matches!(snapshot.view, ChartView::Chart { .. }))
        .await
        .expect("chart");

    // Then: the sink received the figure with pan and zoom defaults
    let calls = harness.sink.calls();
    let SinkCall::Draw { layout, options, .. } = &calls[0] else {
        panic!("expected a draw, got {calls:?}");
    };
    assert_eq!(layout["dragmode"], "pan");
    assert_eq!(layout["scrollZoom"], true);
    assert_eq!(layout["title"]["text"], "对比");
    assert!(options.responsive);
    assert!(options.scroll_zoom);
}

// ============================================================================
// Timeouts and notifications
// ============================================================================

#[tokio::test(start_paused = true)]
async fn when_backend_never_answers_system_times_out_after_thirty_seconds() {
    // Given: a chart endpoint that answers one millisecond past the deadline
    let client = bootstrapped(HOT_FLAGSHIP).on_delayed(
        HttpMethod::Post,
        CHART_PATH,
        HttpResponse::ok_json(chart_body(1, "上证指数")),
        Duration::from_millis(30_001),
    );
    let harness = Harness::start(client);
    harness.bootstrapped().await;

    // When: the user submits and waits
    let started = tokio::time::Instant::now();
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    let failed = harness
        .handle
        .wait_for(|snapshot| {
            snapshot
                .notification
                .as_ref()
                .is_some_and(|notification| notification.severity == Severity::Danger)
        })
        .await
        .expect("timeout alert");

    // Then: the timeout message is shown and the form is usable again
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(failed.notification.expect("alert").text, TIMEOUT_MESSAGE);
    assert_eq!(failed.status.text, TIMEOUT_MESSAGE);
    assert_eq!(failed.view, ChartView::Placeholder);
    assert_eq!(failed.request_state, RequestState::Idle);
    assert!(failed.can_submit);
    assert_eq!(harness.sink.draw_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn when_success_alert_is_shown_system_dismisses_it_after_three_seconds() {
    // Given: a chart was just generated
    let harness = Harness::start(charting(HOT_FLAGSHIP, 1));
    harness.bootstrapped().await;
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    harness
        .handle
        .wait_for(|snapshot| snapshot.notification.is_some())
        .await
        .expect("alert");
    let shown_at = tokio::time::Instant::now();

    // When: time passes
    let cleared = harness
        .handle
        .wait_for(|snapshot| snapshot.notification.is_none())
        .await
        .expect("dismissed");

    // Then: the alert went away on its own, and the chart stayed
    assert!(shown_at.elapsed() >= Duration::from_secs(3));
    assert!(matches!(cleared.view, ChartView::Chart { .. }));
}

#[tokio::test(start_paused = true)]
async fn when_danger_alert_is_shown_system_keeps_it_until_dismissed() {
    // Given: a chart request the backend rejects
    let client = bootstrapped(HOT_FLAGSHIP).on(
        HttpMethod::Post,
        CHART_PATH,
        r#"{"success":false,"error":"没有找到股票数据"}"#,
    );
    let harness = Harness::start(client);
    harness.bootstrapped().await;
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    harness
        .handle
        .wait_for(|snapshot| snapshot.notification.is_some())
        .await
        .expect("alert");

    // When: a long time passes
    tokio::time::sleep(Duration::from_secs(60)).await;
    let later = harness.handle.sync().await.expect("sync");

    // Then: the alert is still there until the user closes it
    let notification = later.notification.expect("still shown");
    assert_eq!(notification.text, "没有找到股票数据");
    assert_eq!(notification.auto_dismiss_ms, None);

    harness.handle.dispatch(UserAction::Dismiss).expect("dispatch");
    let dismissed = harness.handle.sync().await.expect("sync");
    assert!(dismissed.notification.is_none());
}

// ============================================================================
// Reset
// ============================================================================

#[tokio::test]
async fn when_form_is_reset_system_restores_defaults_and_placeholder() {
    // Given: a drawn chart over an edited form
    let harness = Harness::start(charting(HOT_TWO, 2));
    harness.bootstrapped().await;
    harness
        .handle
        .dispatch(UserAction::SelectSymbols(vec![id("sh600519"), id("sz000001")]))
        .expect("dispatch");
    harness
        .handle
        .dispatch(UserAction::SetNormalize(true))
        .expect("dispatch");
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");
    harness
        .handle
        .wait_for(|snapshot| matches!(snapshot.view, ChartView::Chart { .. }))
        .await
        .expect("chart");

    // When: the user resets twice
    harness.handle.dispatch(UserAction::Reset).expect("dispatch");
    let first = harness.handle.sync().await.expect("sync");
    harness.handle.dispatch(UserAction::Reset).expect("dispatch");
    let second = harness.handle.sync().await.expect("sync");

    // Then: defaults are back, the chart is cleared, and a second reset changes nothing
    assert_eq!(first.selection.symbols, vec![id("sh600519")]);
    assert!(!first.selection.normalize);
    assert_eq!(first.view, ChartView::Placeholder);
    assert!(first.chart_info.is_none());
    assert_eq!(first.status.text, STATUS_RESET);
    let notification = first.notification.as_ref().expect("reset alert");
    assert_eq!(notification.severity, Severity::Info);
    assert_eq!(notification.text, RESET_ALERT);
    assert!(first.can_submit);
    assert_eq!(first, second);

    assert!(harness
        .sink
        .calls()
        .iter()
        .any(|call| matches!(call, SinkCall::Clear { .. })));
}

#[tokio::test]
async fn when_reset_arrives_during_loading_system_ignores_it() {
    // Given: a chart request in flight
    let client = bootstrapped(HOT_FLAGSHIP).on_delayed(
        HttpMethod::Post,
        CHART_PATH,
        HttpResponse::ok_json(chart_body(1, "上证指数")),
        Duration::from_millis(40),
    );
    let harness = Harness::start(client);
    harness.bootstrapped().await;
    harness.handle.dispatch(UserAction::Submit).expect("dispatch");

    // When: the user resets before the chart arrives
    harness.handle.dispatch(UserAction::Reset).expect("dispatch");
    let during = harness.handle.sync().await.expect("sync");

    // Then: loading continues and the chart still lands
    assert_eq!(during.request_state, RequestState::Loading);
    assert_eq!(during.status.text, STATUS_SUBMITTING);
    let done = harness
        .handle
        .wait_for(|snapshot| matches!(snapshot.view, ChartView::Chart { .. }))
        .await
        .expect("chart");
    assert_eq!(done.request_state, RequestState::Idle);
}

// ============================================================================
// Figure output
// ============================================================================

#[tokio::test]
async fn when_session_writes_figures_system_replaces_the_file_per_chart() {
    // Given: a session rendering into a figure file
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("figure.json");
    let client = Arc::new(charting(HOT_FLAGSHIP, 1));
    let backend = Arc::new(HttpChartBackend::new(client.clone(), BASE_URL));
    let (app, handle) = App::new(
        AppConfig::default(),
        backend,
        Box::new(FigureFileSink::new(&path)),
    );
    app.spawn();
    handle
        .wait_for(|snapshot| snapshot.can_submit)
        .await
        .expect("ready");

    // When: a chart is generated
    handle.dispatch(UserAction::Submit).expect("dispatch");
    handle
        .wait_for(|snapshot| matches!(snapshot.view, ChartView::Chart { .. }))
        .await
        .expect("chart");

    // Then: the file holds the figure and interaction options, and reset removes it
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("figure file"))
            .expect("json");
    assert_eq!(written["container"], "plotlyChart");
    assert!(written["data"].is_array());
    assert_eq!(written["config"]["displaylogo"], false);

    handle.dispatch(UserAction::Reset).expect("dispatch");
    handle.sync().await.expect("sync");
    assert!(!path.exists());
}
