//! State-machine trace tests for the tag lifecycle controller, using a
//! scripted store and prompt instead of a real repository and terminal.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::Result;
use gitscribe::ai::{OpenAiProvider, RequestAdapter};
use gitscribe::config::Config;
use gitscribe::git::TagStore;
use gitscribe::prompt::UserPrompt;
use gitscribe::tag::{TagLifecycleController, TagOptions, TagOutcome};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Scripted tag store recording every operation.
#[derive(Default)]
struct MockStore {
    latest: Option<String>,
    local: RefCell<HashMap<String, Option<String>>>,
    remote: RefCell<HashSet<(String, String)>>,
    remotes: Vec<String>,
    subjects: Vec<String>,
    failing_push_remotes: HashSet<String>,
    ops: RefCell<Vec<String>>,
}

impl MockStore {
    fn log(&self, op: impl Into<String>) {
        self.ops.borrow_mut().push(op.into());
    }

    fn ops(&self) -> Vec<String> {
        self.ops.borrow().clone()
    }

    fn position(&self, op: &str) -> Option<usize> {
        self.ops.borrow().iter().position(|o| o == op)
    }
}

impl TagStore for MockStore {
    fn latest_tag(&self) -> Result<Option<String>> {
        self.log("latest_tag");
        Ok(self.latest.clone())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        self.log(format!("tag_exists {name}"));
        Ok(self.local.borrow().contains_key(name))
    }

    fn tag_exists_on_remote(&self, remote: &str, name: &str) -> Result<bool> {
        self.log(format!("tag_exists_on_remote {remote} {name}"));
        Ok(self
            .remote
            .borrow()
            .contains(&(remote.to_string(), name.to_string())))
    }

    fn tag_message(&self, name: &str) -> Result<Option<String>> {
        self.log(format!("tag_message {name}"));
        Ok(self.local.borrow().get(name).cloned().flatten())
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.log(format!("delete_tag {name}"));
        self.local.borrow_mut().remove(name);
        Ok(())
    }

    fn delete_remote_tag(&self, remote: &str, name: &str) -> Result<()> {
        self.log(format!("delete_remote_tag {remote} {name}"));
        self.remote
            .borrow_mut()
            .remove(&(remote.to_string(), name.to_string()));
        Ok(())
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        self.log(format!("create_tag {name} :: {message}"));
        self.local
            .borrow_mut()
            .insert(name.to_string(), Some(message.to_string()));
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str, force: bool) -> Result<()> {
        self.log(format!("push_tag {remote} {name} force={force}"));
        if self.failing_push_remotes.contains(remote) {
            anyhow::bail!("remote '{remote}' rejected the push");
        }
        Ok(())
    }

    fn remotes(&self) -> Result<Vec<String>> {
        Ok(self.remotes.clone())
    }

    fn subjects_since(&self, base: Option<&str>) -> Result<Vec<String>> {
        self.log(format!("subjects_since {base:?}"));
        Ok(self.subjects.clone())
    }
}

/// Prompt answering from a script.
struct ScriptedPrompt {
    confirms: VecDeque<bool>,
    selection: Vec<String>,
    questions: Vec<String>,
}

impl ScriptedPrompt {
    fn new(confirms: &[bool], selection: &[&str]) -> Self {
        Self {
            confirms: confirms.iter().copied().collect(),
            selection: selection.iter().map(|s| s.to_string()).collect(),
            questions: Vec::new(),
        }
    }
}

impl UserPrompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.questions.push(question.to_string());
        self.confirms
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unexpected confirmation: {question}"))
    }

    fn select_remotes(&mut self, _remotes: &[String]) -> Result<Vec<String>> {
        Ok(self.selection.clone())
    }
}

fn offline_adapter(config: &Config) -> RequestAdapter {
    // Scenarios with an explicit message never touch the provider.
    RequestAdapter::new(
        OpenAiProvider::new(config.api_key.clone(), "http://127.0.0.1:1".to_string()),
        false,
        true,
    )
}

fn options(name: &str, message: Option<&str>) -> TagOptions {
    TagOptions {
        name: Some(name.to_string()),
        message: message.map(String::from),
        base: None,
    }
}

#[tokio::test]
async fn declining_local_deletion_cancels_without_mutation() {
    let store = MockStore {
        local: RefCell::new(HashMap::from([(
            "v1.2.3".to_string(),
            Some("old notes".to_string()),
        )])),
        remotes: vec!["origin".to_string()],
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    let mut prompt = ScriptedPrompt::new(&[false], &[]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(options("v1.2.3", Some("notes")))
        .await
        .unwrap();

    assert!(matches!(outcome, TagOutcome::Cancelled));
    // Tag safety: no deletion of any kind happened.
    let ops = store.ops();
    assert!(!ops.iter().any(|op| op.starts_with("delete_tag")));
    assert!(!ops.iter().any(|op| op.starts_with("delete_remote_tag")));
    assert!(!ops.iter().any(|op| op.starts_with("create_tag")));
}

#[tokio::test]
async fn declined_remote_deletion_forces_a_force_push() {
    // Tag exists locally and on origin; the user confirms the local delete,
    // declines the remote delete, then selects origin for publishing.
    let store = MockStore {
        local: RefCell::new(HashMap::from([(
            "v1.2.3".to_string(),
            Some("old notes".to_string()),
        )])),
        remote: RefCell::new(HashSet::from([(
            "origin".to_string(),
            "v1.2.3".to_string(),
        )])),
        remotes: vec!["origin".to_string()],
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    // yes: delete local; no: delete remote; yes: create; yes: force-push.
    let mut prompt = ScriptedPrompt::new(&[true, false, true, true], &["origin"]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(options("v1.2.3", Some("new notes")))
        .await
        .unwrap();

    match outcome {
        TagOutcome::Completed { pushed, failed, .. } => {
            assert_eq!(pushed, vec!["origin".to_string()]);
            assert!(failed.is_empty());
        }
        other => panic!("expected Completed, got {other:?}"),
    }

    let ops = store.ops();
    assert!(!ops.iter().any(|op| op.starts_with("delete_remote_tag")));
    assert!(ops.contains(&"push_tag origin v1.2.3 force=true".to_string()));
    assert!(prompt
        .questions
        .iter()
        .any(|q| q.contains("force-push")));
}

#[tokio::test]
async fn confirmed_remote_deletion_precedes_local_and_avoids_force() {
    let store = MockStore {
        local: RefCell::new(HashMap::from([(
            "v2.0.0".to_string(),
            Some("old".to_string()),
        )])),
        remote: RefCell::new(HashSet::from([(
            "origin".to_string(),
            "v2.0.0".to_string(),
        )])),
        remotes: vec!["origin".to_string()],
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    // yes: delete local; yes: delete remote; yes: create.
    let mut prompt = ScriptedPrompt::new(&[true, true, true], &["origin"]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(options("v2.0.0", Some("notes")))
        .await
        .unwrap();

    assert!(matches!(outcome, TagOutcome::Completed { .. }));

    let remote_delete = store
        .position("delete_remote_tag origin v2.0.0")
        .expect("remote tag deleted");
    let local_delete = store.position("delete_tag v2.0.0").expect("local tag deleted");
    assert!(remote_delete < local_delete);

    let ops = store.ops();
    assert!(ops.contains(&"push_tag origin v2.0.0 force=false".to_string()));
    assert!(!prompt.questions.iter().any(|q| q.contains("force-push")));
}

#[tokio::test]
async fn push_failures_are_isolated_per_remote() {
    // Three remotes selected, the second push fails, the remaining push
    // still runs and the run completes.
    let store = MockStore {
        remotes: vec![
            "origin".to_string(),
            "backup".to_string(),
            "mirror".to_string(),
        ],
        failing_push_remotes: HashSet::from(["backup".to_string()]),
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    let mut prompt = ScriptedPrompt::new(&[true], &["origin", "backup", "mirror"]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(options("v0.1.0", Some("first release")))
        .await
        .unwrap();

    match outcome {
        TagOutcome::Completed { pushed, failed, .. } => {
            assert_eq!(pushed, vec!["origin".to_string(), "mirror".to_string()]);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].0, "backup");
        }
        other => panic!("expected Completed, got {other:?}"),
    }

    // Pushes were issued sequentially in selection order.
    let ops: Vec<String> = store
        .ops()
        .into_iter()
        .filter(|op| op.starts_with("push_tag"))
        .collect();
    assert_eq!(
        ops,
        vec![
            "push_tag origin v0.1.0 force=false",
            "push_tag backup v0.1.0 force=false",
            "push_tag mirror v0.1.0 force=false",
        ]
    );
}

#[tokio::test]
async fn missing_name_auto_increments_latest_tag() {
    let store = MockStore {
        latest: Some("v1.2.3".to_string()),
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    let mut prompt = ScriptedPrompt::new(&[true], &[]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(TagOptions {
            name: None,
            message: Some("notes".to_string()),
            base: None,
        })
        .await
        .unwrap();

    match outcome {
        TagOutcome::Completed { tag, .. } => assert_eq!(tag, "v1.2.4"),
        other => panic!("expected Completed, got {other:?}"),
    }
    assert!(store
        .ops()
        .iter()
        .any(|op| op.starts_with("create_tag v1.2.4")));
}

#[tokio::test]
async fn missing_name_without_prior_tag_fails() {
    let store = MockStore::default();
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    let mut prompt = ScriptedPrompt::new(&[], &[]);

    let error = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(TagOptions::default())
        .await
        .unwrap_err();

    assert!(error.to_string().contains("no existing semver tag"));
    assert!(store.ops().iter().all(|op| !op.starts_with("create_tag")));
}

#[tokio::test]
async fn declining_creation_cancels_without_creating() {
    let store = MockStore {
        remotes: vec!["origin".to_string()],
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    let mut prompt = ScriptedPrompt::new(&[false], &[]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(options("v0.2.0", Some("notes")))
        .await
        .unwrap();

    assert!(matches!(outcome, TagOutcome::Cancelled));
    assert!(store.ops().iter().all(|op| !op.starts_with("create_tag")));
}

#[tokio::test]
async fn empty_remote_selection_skips_publishing() {
    let store = MockStore {
        remotes: vec!["origin".to_string(), "mirror".to_string()],
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    let mut prompt = ScriptedPrompt::new(&[true], &[]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(options("v0.3.0", Some("notes")))
        .await
        .unwrap();

    match outcome {
        TagOutcome::Completed { pushed, failed, .. } => {
            assert!(pushed.is_empty());
            assert!(failed.is_empty());
        }
        other => panic!("expected Completed, got {other:?}"),
    }
    assert!(store.ops().iter().all(|op| !op.starts_with("push_tag")));
}

#[tokio::test]
async fn generated_message_uses_subjects_and_style_references() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(wiremock::matchers::body_string_contains("feat: add parser"))
        .and(wiremock::matchers::body_string_contains("v1.0.0 release notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "scribe-large",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Adds the parser and fixes NUL handling."},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = MockStore {
        latest: Some("v1.0.0".to_string()),
        local: RefCell::new(HashMap::from([(
            "v1.0.0".to_string(),
            Some("v1.0.0 release notes".to_string()),
        )])),
        subjects: vec![
            "fix: handle NUL bytes".to_string(),
            "feat: add parser".to_string(),
        ],
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = RequestAdapter::new(
        OpenAiProvider::new("test-key".to_string(), server.uri()),
        false,
        true,
    );
    let mut prompt = ScriptedPrompt::new(&[true], &[]);

    let outcome = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(TagOptions {
            name: Some("v1.1.0".to_string()),
            message: None,
            base: None,
        })
        .await
        .unwrap();

    assert!(matches!(outcome, TagOutcome::Completed { .. }));
    assert!(store
        .ops()
        .iter()
        .any(|op| op == "create_tag v1.1.0 :: Adds the parser and fixes NUL handling."));
    // Subjects were collected relative to the base tag.
    assert!(store
        .ops()
        .iter()
        .any(|op| op == "subjects_since Some(\"v1.0.0\")"));

    server.verify().await;
}

#[tokio::test]
async fn generation_without_history_fails() {
    let store = MockStore {
        latest: Some("v1.0.0".to_string()),
        subjects: Vec::new(),
        ..Default::default()
    };
    let config = Config::for_tests();
    let adapter = offline_adapter(&config);
    let mut prompt = ScriptedPrompt::new(&[], &[]);

    let error = TagLifecycleController::new(&store, &mut prompt, &adapter, &config)
        .run(TagOptions {
            name: Some("v1.1.0".to_string()),
            message: None,
            base: None,
        })
        .await
        .unwrap_err();

    assert!(error.to_string().contains("No commits found"));
}
