//! End-to-end engine runs against in-memory collaborators.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use krknai_aggregator::{AggregatorError, CollectedData, Collector, ResultsAggregator, Summary};
use krknai_engine::{summary_path, Engine, EngineConfig, EngineDeps, EngineError, Stage};
use krknai_llm::{LlmClient, LlmError, LlmResponse, ModelOverrides, ModelParams, ToolLoopClient};
use krknai_notify::{
    AnalysisReport, NotificationConfig, NotifyError, Reporter, ReporterConfig, ReporterRegistry,
};
use krknai_prompts::{PromptError, PromptRenderer, PromptStore, TemplateVars};
use krknai_tool_runtime::provider::mock::MockLlmProvider;
use krknai_tool_runtime::{ToolCall, ToolRegistry};

// ── Fakes ──────────────────────────────────────────────────────────

struct StaticCollector {
    data: Option<CollectedData>,
    calls: AtomicUsize,
}

impl StaticCollector {
    fn ok(data: CollectedData) -> Arc<Self> {
        Arc::new(Self {
            data: Some(data),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            data: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Collector for StaticCollector {
    async fn collect(&self, results_dir: &Path) -> Result<CollectedData, AggregatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.data
            .clone()
            .ok_or_else(|| AggregatorError::MissingResults(results_dir.join("reports/all.csv")))
    }
}

struct FailingRenderer;

impl PromptRenderer for FailingRenderer {
    fn render_prompt(&self, name: &str, _vars: &TemplateVars) -> Result<(String, ModelParams), PromptError> {
        Err(PromptError::UnknownTemplate(name.to_string()))
    }
}

enum Script {
    Answer(&'static str, Vec<&'static str>),
    Fail,
    Hang,
}

struct ScriptedClient {
    script: Script,
    seen: Mutex<Vec<(ModelParams, Vec<String>)>>,
}

impl ScriptedClient {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn analyze(
        &self,
        _prompt: &str,
        params: &ModelParams,
        tools: Arc<ToolRegistry>,
    ) -> Result<LlmResponse, LlmError> {
        let names = tools.names().into_iter().map(String::from).collect();
        self.seen.lock().unwrap().push((*params, names));
        match &self.script {
            Script::Answer(text, calls) => Ok(LlmResponse {
                content: text.to_string(),
                tool_calls: calls
                    .iter()
                    .enumerate()
                    .map(|(i, name)| ToolCall {
                        id: format!("call_{i}"),
                        name: name.to_string(),
                        input: json!({}),
                    })
                    .collect(),
            }),
            Script::Fail => Err(LlmError::EmptyResponse),
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

struct CountingReporter {
    kind: &'static str,
    fail: bool,
    sent: Arc<AtomicUsize>,
}

#[async_trait]
impl Reporter for CountingReporter {
    fn reporter_type(&self) -> &str {
        self.kind
    }

    async fn send(&self, report: &AnalysisReport, _config: &ReporterConfig) -> Result<(), NotifyError> {
        assert_eq!(report.count("total_scenarios"), 50);
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(NotifyError::Config("channel offline".into()))
        } else {
            Ok(())
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn collected() -> CollectedData {
    CollectedData {
        summary: Summary {
            total_scenario_count: 50,
            successful_scenario_count: 45,
            failed_scenario_count: 5,
            generations: 5,
            max_fitness_score: 12.5,
            avg_fitness_score: 6.0,
            scenario_types: BTreeMap::from([
                ("pod-scenarios".to_string(), 30),
                ("node-cpu-hog".to_string(), 20),
            ]),
        },
        ..Default::default()
    }
}

fn engine(
    dir: &Path,
    collector: Arc<dyn Collector>,
    renderer: Arc<dyn PromptRenderer>,
    client: Arc<dyn LlmClient>,
) -> Engine {
    let deps = EngineDeps {
        collector,
        renderer,
        client,
        reporters: ReporterRegistry::new(),
    };
    Engine::new(EngineConfig::new(dir, "test-key"), deps).unwrap()
}

fn builtin() -> Arc<dyn PromptRenderer> {
    Arc::new(PromptStore::builtin().unwrap())
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn metadata_matches_collected_counts() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new(Script::Answer("All good.", vec![]));
    let engine = engine(dir.path(), StaticCollector::ok(collected()), builtin(), client.clone());

    let result = engine.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.status, "completed");
    assert_eq!(result.content, "All good.");
    assert_eq!(result.metadata["total_scenarios"], 50);
    assert_eq!(result.metadata["failed_scenarios"], 5);
    assert_eq!(result.metadata["successful_scenarios"], 45);
    assert_eq!(result.metadata["generations"], 5);
    assert_eq!(result.metadata["artifacts_examined"], 0);
    assert!(result.prompt.contains("50"));

    // the model only ever sees the read_file tool
    let seen = client.seen.lock().unwrap();
    assert_eq!(seen[0].1, vec!["read_file".to_string()]);
}

#[tokio::test]
async fn read_file_calls_are_counted_separately() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new(Script::Answer(
        "Looked at logs.",
        vec!["read_file", "read_file", "other_tool"],
    ));
    let engine = engine(dir.path(), StaticCollector::ok(collected()), builtin(), client);

    let result = engine.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(result.metadata["artifacts_examined"], 2);
    assert_eq!(result.metadata["tool_calls"], 3);
    assert_eq!(result.tool_calls.len(), 3);
}

#[tokio::test]
async fn summary_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new(Script::Answer("## Findings\nnone", vec![]));
    let engine = engine(dir.path(), StaticCollector::ok(collected()), builtin(), client);

    let result = engine.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(result.summary_path, dir.path().join("llm-analysis/summary.yaml"));

    let doc: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&result.summary_path).unwrap()).unwrap();
    assert_eq!(doc["analysis_type"].as_str(), Some("krknai"));
    assert_eq!(doc["status"].as_str(), Some("completed"));
    assert_eq!(doc["response"].as_str(), Some("## Findings\nnone"));
    assert_eq!(doc["run_summary"]["total_scenarios"].as_u64(), Some(50));
    assert_eq!(doc["run_summary"]["scenario_types"]["node-cpu-hog"].as_u64(), Some(20));
    assert_eq!(doc["metadata"]["failed_scenarios"].as_u64(), Some(5));
}

#[tokio::test]
async fn overrides_replace_only_named_params() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new(Script::Answer("ok", vec![]));
    let deps = EngineDeps {
        collector: StaticCollector::ok(collected()),
        renderer: builtin(),
        client: client.clone(),
        reporters: ReporterRegistry::new(),
    };
    let config = EngineConfig::new(dir.path(), "test-key").with_overrides(ModelOverrides {
        temperature: Some(0.9),
        ..Default::default()
    });
    Engine::new(config, deps)
        .unwrap()
        .run(&CancellationToken::new())
        .await
        .unwrap();

    let defaults = PromptStore::builtin().unwrap().get("krknai").unwrap().model_params;
    let (params, _) = client.seen.lock().unwrap()[0].clone();
    assert_eq!(params.temperature, 0.9);
    assert_eq!(params.max_tokens, defaults.max_tokens);
    assert_eq!(params.top_p, defaults.top_p);
}

#[tokio::test]
async fn failing_reporter_does_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let failing = Arc::new(AtomicUsize::new(0));
    let working = Arc::new(AtomicUsize::new(0));

    let mut reporters = ReporterRegistry::new();
    reporters.register(Box::new(CountingReporter {
        kind: "broken",
        fail: true,
        sent: failing.clone(),
    }));
    reporters.register(Box::new(CountingReporter {
        kind: "working",
        fail: false,
        sent: working.clone(),
    }));

    let deps = EngineDeps {
        collector: StaticCollector::ok(collected()),
        renderer: builtin(),
        client: ScriptedClient::new(Script::Answer("ok", vec![])),
        reporters,
    };
    let notification = NotificationConfig {
        enabled: true,
        reporters: vec![
            ReporterConfig::new("broken"),
            ReporterConfig::new("unregistered"),
            ReporterConfig::new("working"),
        ],
    };
    let config = EngineConfig::new(dir.path(), "test-key").with_notification(notification);

    let result = Engine::new(config, deps)
        .unwrap()
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, "completed");
    assert_eq!(failing.load(Ordering::SeqCst), 1);
    assert_eq!(working.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn collect_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new(Script::Answer("unused", vec![]));
    let engine = engine(dir.path(), StaticCollector::failing(), builtin(), client.clone());

    let err = engine.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Collect(AggregatorError::MissingResults(_))));
    assert_eq!(client.calls(), 0);
    assert!(!summary_path(dir.path()).exists());
}

#[tokio::test]
async fn render_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new(Script::Answer("unused", vec![]));
    let engine = engine(
        dir.path(),
        StaticCollector::ok(collected()),
        Arc::new(FailingRenderer),
        client.clone(),
    );

    let err = engine.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Render(PromptError::UnknownTemplate(name)) if name == "krknai"));
    assert_eq!(client.calls(), 0);
    assert!(!summary_path(dir.path()).exists());
}

#[tokio::test]
async fn model_failure_keeps_previous_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = summary_path(dir.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "status: completed\nresponse: earlier run\n").unwrap();

    let engine = engine(
        dir.path(),
        StaticCollector::ok(collected()),
        builtin(),
        ScriptedClient::new(Script::Fail),
    );

    let err = engine.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Llm(LlmError::EmptyResponse)));
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "status: completed\nresponse: earlier run\n"
    );
}

#[tokio::test]
async fn cancelled_before_collection() {
    let dir = tempfile::tempdir().unwrap();
    let collector = StaticCollector::ok(collected());
    let engine = engine(
        dir.path(),
        collector.clone(),
        builtin(),
        ScriptedClient::new(Script::Answer("unused", vec![])),
    );

    let token = CancellationToken::new();
    token.cancel();
    let err = engine.run(&token).await.unwrap_err();

    assert!(matches!(err, EngineError::Cancelled { stage: Stage::Collecting }));
    assert_eq!(collector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_while_waiting_on_model() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new(Script::Hang);
    let engine = engine(dir.path(), StaticCollector::ok(collected()), builtin(), client.clone());

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let err = engine.run(&token).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled { stage: Stage::InvokingModel }));
    assert_eq!(client.calls(), 1);
    assert!(!summary_path(dir.path()).exists());
}

#[test]
fn empty_configuration_is_rejected() {
    let deps = EngineDeps {
        collector: StaticCollector::ok(collected()),
        renderer: builtin(),
        client: ScriptedClient::new(Script::Fail),
        reporters: ReporterRegistry::new(),
    };
    let err = Engine::new(EngineConfig::new("/results", ""), deps).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

// ── Real aggregator and tool loop ──────────────────────────────────

const ALL_CSV: &str = "\
generation_id,scenario_id,scenario,cmd,fitness_score,krkn_failure_score,health_check_failure_score,health_check_response_time_score
0,1,pod-scenarios,krknctl run pod-scenarios,4.0,0,0,0
0,2,node-cpu-hog,krknctl run node-cpu-hog,9.0,-1,2,0
1,3,pod-scenarios,krknctl run pod-scenarios,6.5,0,1,0
";

#[tokio::test]
async fn results_directory_to_summary() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("reports")).unwrap();
    std::fs::create_dir_all(dir.path().join("log")).unwrap();
    std::fs::write(dir.path().join("reports/all.csv"), ALL_CSV).unwrap();
    std::fs::write(
        dir.path().join("log/scenario_2.log"),
        "starting node-cpu-hog\nkube-apiserver: OOMKilled\n",
    )
    .unwrap();

    let provider = Arc::new(MockLlmProvider::new());
    provider.queue_tool_call("c1", "read_file", json!({"path": "scenario_2.log"}));
    provider.queue_text("## Findings\nScenario 2 exhausted apiserver memory.");
    let client = ToolLoopClient::new(provider.clone()).with_working_directory(dir.path());

    let deps = EngineDeps {
        collector: Arc::new(ResultsAggregator::new(2)),
        renderer: builtin(),
        client: Arc::new(client),
        reporters: ReporterRegistry::new(),
    };
    let result = Engine::new(EngineConfig::new(dir.path(), "test-key"), deps)
        .unwrap()
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.metadata["total_scenarios"], 3);
    assert_eq!(result.metadata["failed_scenarios"], 1);
    assert_eq!(result.metadata["generations"], 2);
    assert_eq!(result.metadata["artifacts_examined"], 1);
    assert!(result.content.contains("apiserver memory"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tool_names, vec!["read_file".to_string()]);
    assert!(format!("{:?}", requests[1].messages).contains("OOMKilled"));

    let doc: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(summary_path(dir.path())).unwrap()).unwrap();
    let top = doc["top_scenarios"].as_sequence().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["scenario_id"].as_i64(), Some(2));
    assert_eq!(doc["failed_scenarios"][0]["scenario"].as_str(), Some("node-cpu-hog"));
}
