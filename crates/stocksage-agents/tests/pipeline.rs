//! End-to-end runs of the orchestrator against scripted collaborators.

use std::sync::Arc;
use std::time::Duration;

use stocksage_agents::test_support::{sample_series, test_config, ScriptedModel, StaticProvider};
use stocksage_agents::{AgentError, AnalysisError, Orchestrator};
use stocksage_models::{AgentRole, RunStage, Signal, StockSageConfig};
use tokio_util::sync::CancellationToken;

fn orchestrator_with(
    model: Arc<ScriptedModel>,
    provider: StaticProvider,
    config: StockSageConfig,
) -> Orchestrator {
    Orchestrator::new(Arc::new(provider), model, config).unwrap()
}

fn orchestrator(model: Arc<ScriptedModel>, provider: StaticProvider) -> Orchestrator {
    orchestrator_with(model, provider, test_config())
}

#[tokio::test]
async fn two_symbols_run_through_every_stage() {
    let model = Arc::new(ScriptedModel::new());
    let orch = orchestrator(model.clone(), StaticProvider::with_samples(&["AAPL", "MSFT"]));

    let result = orch.analyze(&["AAPL", "MSFT"]).await.unwrap();

    assert_eq!(result.symbols, vec!["AAPL", "MSFT"]);
    assert_eq!(result.focus_symbol, "AAPL");
    assert!(!result.suggestion.is_empty());
    assert!(!result.prediction.is_empty());
    assert!(!result.critique.is_empty());

    let calls = model.calls().await;
    let roles: Vec<_> = calls.iter().map(|c| c.role).collect();
    assert_eq!(
        roles,
        vec![
            Some(AgentRole::Suggestion),
            Some(AgentRole::Prediction),
            Some(AgentRole::Critique),
        ]
    );

    // Each downstream call carries the upstream output.
    assert!(calls[0].request.user.contains("### AAPL: AAPL Corp (Technology)"));
    assert!(calls[0].request.user.contains("### MSFT"));
    assert!(calls[0].request.user.contains("MSFT beats earnings estimates"));
    assert!(calls[1].request.user.contains(&result.suggestion));
    assert!(calls[2].request.user.contains(&result.prediction));
}

#[tokio::test]
async fn all_fetches_failing_stops_before_any_agent() {
    let model = Arc::new(ScriptedModel::new());
    let provider = StaticProvider::new().with_transient_failure("AAPL");
    let orch = orchestrator(model.clone(), provider);

    let err = orch.analyze(&["AAPL", "ZZZZ"]).await.unwrap_err();

    match &err {
        AnalysisError::AllSymbolsFailed { symbols } => assert_eq!(symbols, &["AAPL", "ZZZZ"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.stage(), RunStage::Init);
    assert!(model.calls().await.is_empty());
}

#[tokio::test]
async fn failed_symbols_are_dropped() {
    let model = Arc::new(ScriptedModel::new());
    let provider = StaticProvider::with_samples(&["MSFT"]).with_transient_failure("AAPL");
    let orch = orchestrator(model.clone(), provider);

    let result = orch.analyze(&["aapl", "msft"]).await.unwrap();

    assert_eq!(result.symbols, vec!["MSFT"]);
    assert_eq!(result.focus_symbol, "MSFT");
    let calls = model.calls().await;
    assert!(calls[0].request.user.contains("using one of: MSFT."));
}

#[tokio::test]
async fn prediction_timeout_aborts_the_run() {
    let model = Arc::new(ScriptedModel::new().time_out_on(AgentRole::Prediction));
    let orch = orchestrator(model.clone(), StaticProvider::with_samples(&["AAPL", "MSFT"]));

    let err = orch.analyze(&["AAPL", "MSFT"]).await.unwrap_err();

    match err {
        AnalysisError::Agent {
            stage,
            role,
            source: AgentError::ModelTimeout(_),
        } => {
            assert_eq!(stage, RunStage::Suggested);
            assert_eq!(role, AgentRole::Prediction);
        }
        other => panic!("unexpected error: {other}"),
    }
    // The critic never runs.
    assert_eq!(model.calls().await.len(), 2);
}

#[tokio::test]
async fn hanging_model_is_cut_off_by_timeout() {
    let model = Arc::new(ScriptedModel::new().hang_on(AgentRole::Suggestion));
    let mut config = test_config();
    config.model.timeout_seconds = 1;
    let orch = orchestrator_with(model, StaticProvider::with_samples(&["AAPL"]), config);

    let err = orch.analyze(&["AAPL"]).await.unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::Agent {
            stage: RunStage::Forecasted,
            source: AgentError::ModelTimeout(d),
            ..
        } if d == Duration::from_secs(1)
    ));
}

#[tokio::test]
async fn cancellation_stops_the_run() {
    let model = Arc::new(ScriptedModel::new().hang_on(AgentRole::Suggestion));
    let orch = orchestrator(model.clone(), StaticProvider::with_samples(&["AAPL"]));
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        })
    };
    let err = orch
        .analyze_with_cancel(&["AAPL"], token)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(
        err,
        AnalysisError::Cancelled {
            stage: RunStage::Forecasted
        }
    ));
    assert_eq!(model.calls().await.len(), 1);
}

#[tokio::test]
async fn cancellation_during_fetch() {
    let model = Arc::new(ScriptedModel::new());
    let provider =
        StaticProvider::with_samples(&["AAPL", "MSFT"]).with_delay(Duration::from_secs(5));
    let orch = orchestrator(model.clone(), provider);
    let token = CancellationToken::new();
    token.cancel();

    let err = orch
        .analyze_with_cancel(&["AAPL", "MSFT"], token)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::Cancelled {
            stage: RunStage::Init
        }
    ));
    assert!(model.calls().await.is_empty());
}

#[tokio::test]
async fn audit_log_follows_config() {
    let model = Arc::new(ScriptedModel::new());
    let orch = orchestrator(model, StaticProvider::with_samples(&["AAPL", "MSFT"]));
    let result = orch.analyze(&["AAPL", "MSFT"]).await.unwrap();

    let roles: Vec<_> = result.conversation.iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![AgentRole::Suggestion, AgentRole::Prediction, AgentRole::Critique]
    );
    assert_eq!(
        result.conversation[0].input_summary,
        "Analyzed stocks: AAPL, MSFT"
    );
    assert_eq!(result.conversation[2].output, result.critique);

    let mut config = test_config();
    config.pipeline.audit_log = false;
    let orch = orchestrator_with(
        Arc::new(ScriptedModel::new()),
        StaticProvider::with_samples(&["AAPL"]),
        config,
    );
    let result = orch.analyze(&["AAPL"]).await.unwrap();
    assert!(result.conversation.is_empty());
}

#[tokio::test]
async fn explicit_pick_selects_focus_symbol() {
    let model = Arc::new(ScriptedModel::new().with_reply(
        AgentRole::Suggestion,
        "AAPL is fairly valued. MSFT has stronger cloud growth.\nPICK: MSFT",
    ));
    let orch = orchestrator(model.clone(), StaticProvider::with_samples(&["AAPL", "MSFT"]));

    let result = orch.analyze(&["AAPL", "MSFT"]).await.unwrap();

    assert_eq!(result.focus_symbol, "MSFT");
    let calls = model.calls().await;
    assert!(calls[1].request.user.contains("Based on the data for MSFT"));
    assert!(calls[2].request.user.contains("Review this prediction for MSFT"));
    assert!(result.prediction.starts_with("MSFT:"));
}

#[tokio::test]
async fn focus_symbol_signals_come_from_the_forecast() {
    let model = Arc::new(ScriptedModel::new());
    let orch = orchestrator(model.clone(), StaticProvider::with_samples(&["AAPL"]));

    let result = orch.analyze(&["AAPL"]).await.unwrap();

    assert_eq!(result.signals.len(), 14);
    for pair in result.signals.windows(2) {
        assert_eq!(pair[1].date - pair[0].date, chrono::Duration::days(1));
    }
    assert!(result
        .signals
        .iter()
        .all(|r| r.yhat_lower <= r.yhat && r.yhat <= r.yhat_upper));
    assert!(result
        .signals
        .iter()
        .all(|r| matches!(r.signal, Signal::Buy | Signal::Sell | Signal::Hold)));

    let calls = model.calls().await;
    assert!(calls[0].request.user.contains("Forecast: 14 days ahead"));
}

#[tokio::test]
async fn short_history_skips_forecast_only() {
    let mut config = test_config();
    config.forecast.yearly_seasonality = true;
    let model = Arc::new(ScriptedModel::new());
    let orch = orchestrator_with(model.clone(), StaticProvider::with_samples(&["AAPL"]), config);

    let result = orch.analyze(&["AAPL"]).await.unwrap();

    assert!(result.signals.is_empty());
    assert!(model.calls().await[0]
        .request
        .user
        .contains("Forecast: unavailable"));
}

#[tokio::test]
async fn concurrent_runs_do_not_share_state() {
    let orch = Arc::new(orchestrator(
        Arc::new(ScriptedModel::new()),
        StaticProvider::with_samples(&["AAPL", "MSFT", "NVDA"]),
    ));

    let a = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.analyze(&["AAPL", "MSFT"]).await })
    };
    let b = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.analyze(&["NVDA"]).await })
    };
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.focus_symbol, "AAPL");
    assert_eq!(b.focus_symbol, "NVDA");
    assert_eq!(a.conversation.len(), 3);
    assert_eq!(b.conversation.len(), 3);
    assert!(b.conversation.iter().all(|e| !e.output.contains("AAPL")));
}

#[tokio::test]
async fn cancelling_one_run_leaves_the_other_running() {
    let orch = Arc::new(orchestrator(
        Arc::new(ScriptedModel::new()),
        StaticProvider::with_samples(&["AAPL", "MSFT"]).with_delay(Duration::from_millis(50)),
    ));
    let first_token = CancellationToken::new();
    let second_token = CancellationToken::new();

    let first = {
        let orch = orch.clone();
        let token = first_token.clone();
        tokio::spawn(async move { orch.analyze_with_cancel(&["AAPL"], token).await })
    };
    let second = {
        let orch = orch.clone();
        let token = second_token.clone();
        tokio::spawn(async move { orch.analyze_with_cancel(&["MSFT"], token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    first_token.cancel();

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert!(matches!(
        first,
        Err(AnalysisError::Cancelled {
            stage: RunStage::Init
        })
    ));
    assert!(!second_token.is_cancelled());
    let second = second.unwrap();
    assert_eq!(second.focus_symbol, "MSFT");
    assert_eq!(second.conversation.len(), 3);
    assert!(!second.critique.is_empty());
}

#[tokio::test]
async fn missing_profile_and_news_do_not_stop_the_run() {
    let model = Arc::new(ScriptedModel::new());
    let provider = StaticProvider::new().with_series(sample_series("AAPL", 90, 100.0));
    let orch = orchestrator(model.clone(), provider);

    let result = orch.analyze(&["AAPL"]).await.unwrap();

    assert_eq!(result.focus_symbol, "AAPL");
    let calls = model.calls().await;
    assert_eq!(calls.len(), 3);
    assert!(calls[0].request.user.contains("### AAPL\n"));
    assert!(!calls[0].request.user.contains("Recent headlines"));
}

#[tokio::test]
async fn enrichment_can_be_switched_off() {
    let mut config = test_config();
    config.pipeline.include_company_info = false;
    config.pipeline.include_news = false;
    let model = Arc::new(ScriptedModel::new());
    let orch = orchestrator_with(
        model.clone(),
        StaticProvider::with_samples(&["AAPL"]),
        config,
    );

    orch.analyze(&["AAPL"]).await.unwrap();

    let calls = model.calls().await;
    let prompt = &calls[0].request.user;
    assert!(!prompt.contains("Recent headlines"));
    assert!(!prompt.contains("AAPL beats earnings estimates"));
    assert!(!prompt.contains("AAPL Corp"));
}
