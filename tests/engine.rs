use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use panelsh::core::config::Config;
use panelsh::core::SessionState;
use panelsh::error::EngineError;
use panelsh::input::history::NewHistoryEntry;
use panelsh::input::{HistoryEntry, HistoryScope};
use panelsh::process::{ExecOptions, ExecutionError, ExecutionResult, ShellExecutor};
use panelsh::shell::{Engine, Feedback, Outcome};
use panelsh::store::{Alias, AliasStore, FileStore, HistoryStore, MemoryStore, Store, StoreError};

// Records every command and answers with a fixed exit code.
#[derive(Clone, Default)]
struct FakeShell {
    calls: Rc<RefCell<Vec<String>>>,
    exit_code: i32,
    broken: bool,
}

impl FakeShell {
    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ShellExecutor for FakeShell {
    fn execute(&self, command: &str, _options: &ExecOptions) -> Result<ExecutionResult, ExecutionError> {
        if self.broken {
            return Err(ExecutionError::Spawn {
                program: "/nonexistent/sh".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        self.calls.borrow_mut().push(command.to_string());
        Ok(ExecutionResult {
            exit_code: self.exit_code,
            stdout: format!("ran {}\n", command),
            stderr: String::new(),
            duration: Duration::from_millis(1),
            timed_out: false,
        })
    }
}

fn config() -> Config {
    Config::from_yaml(
        r#"
rootPanelId: os
defaultPanels:
  - id: os
    aliases:
      - { token: du, template: "du -sh" }
  - id: git
    aliases:
      - { token: st, template: "git status" }
"#,
        "test",
    )
    .unwrap()
}

fn engine_with<E: ShellExecutor>(store: Arc<dyn Store>, executor: E) -> Engine<E> {
    Engine::new(&config(), store, executor, PathBuf::from(".")).unwrap()
}

fn setup() -> (Engine<FakeShell>, FakeShell, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let shell = FakeShell::default();
    let engine = engine_with(Arc::clone(&store) as Arc<dyn Store>, shell.clone());
    (engine, shell, store)
}

// Feeds lines through the engine, returning the final state and last outcome.
fn drive<E: ShellExecutor>(engine: &mut Engine<E>, lines: &[&str]) -> (SessionState, Outcome) {
    let mut state = engine.initial_state();
    let mut last = Outcome::Idle;
    for line in lines {
        let (next, outcome) = engine.step(state, line);
        state = next;
        last = outcome;
    }
    (state, last)
}

#[test]
fn test_alias_defined_in_one_panel_only() {
    let (mut engine, shell, _) = setup();
    let mut state = engine.initial_state();

    let (next, outcome) = engine.step(state, r#"alias add ll "ls -la""#);
    state = next;
    assert!(matches!(
        outcome,
        Outcome::Feedback(Feedback::AliasDefined { ref panel, ref alias, replaced: false })
            if panel == "os" && alias.template == "ls -la"
    ));

    let (next, outcome) = engine.step(state, "ll");
    state = next;
    match outcome {
        Outcome::Ran(execution) => {
            assert_eq!(execution.command, "ls -la");
            assert_eq!(execution.alias.as_deref(), Some("ll"));
            assert!(execution.recorded.is_ok());
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let (next, _) = engine.step(state, "panel git");
    state = next;
    assert_eq!(state.panel(), Some("git"));

    let (_, outcome) = engine.step(state, "ll");
    assert!(matches!(outcome, Outcome::Ran(ref e) if e.command == "ll" && e.alias.is_none()));
    assert_eq!(shell.calls(), vec!["ls -la", "ll"]);
}

#[test]
fn test_alias_arguments_are_appended() {
    let (mut engine, shell, _) = setup();
    drive(&mut engine, &["du /var"]);
    assert_eq!(shell.calls(), vec!["du -sh /var"]);
}

#[test]
fn test_alias_wins_over_external_command() {
    let (mut engine, shell, _) = setup();
    drive(&mut engine, &["alias add ls ls -1", "ls"]);
    assert_eq!(shell.calls(), vec!["ls -1"]);
}

#[test]
fn test_exit_sentinel_ends_session_without_history() {
    let (mut engine, shell, store) = setup();
    let (state, outcome) = drive(&mut engine, &["exit"]);

    assert_eq!(state, SessionState::Exited);
    assert!(matches!(outcome, Outcome::Farewell));
    assert!(shell.calls().is_empty());
    assert!(store.recent(10).unwrap().is_empty());

    let (state, outcome) = engine.step(SessionState::Exited, "echo late");
    assert_eq!(state, SessionState::Exited);
    assert!(matches!(outcome, Outcome::Idle));
}

#[test]
fn test_blank_line_is_idle() {
    let (mut engine, shell, _) = setup();
    let (state, outcome) = drive(&mut engine, &["   "]);
    assert_eq!(state.panel(), Some("os"));
    assert!(matches!(outcome, Outcome::Idle));
    assert!(shell.calls().is_empty());
}

#[test]
fn test_one_history_entry_per_command() {
    let store = Arc::new(MemoryStore::new());
    let shell = FakeShell {
        exit_code: 2,
        ..FakeShell::default()
    };
    let mut engine = engine_with(Arc::clone(&store) as Arc<dyn Store>, shell);

    drive(&mut engine, &["du", "alias list", "panel git", "st", "help"]);

    let entries = store.recent(10).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].panel, "git");
    assert_eq!(entries[0].input, "st");
    assert_eq!(entries[0].resolved_command, "git status");
    assert_eq!(entries[0].exit_code, 2);
    assert_eq!(entries[1].panel, "os");
    assert!(entries[0].id > entries[1].id);
}

#[test]
fn test_rejected_directives_record_nothing() {
    let (mut engine, shell, store) = setup();

    for line in ["alias rm", "alias add onlytoken", "panel a b", "history --panel", "alias add exit ls", "panel \"open"] {
        let (state, outcome) = drive(&mut engine, &[line]);
        assert_eq!(state.panel(), Some("os"), "{}", line);
        assert!(
            matches!(outcome, Outcome::Failed(EngineError::DirectiveSyntax { .. })),
            "{} gave {:?}",
            line,
            outcome
        );
    }
    assert!(shell.calls().is_empty());
    assert!(store.recent(10).unwrap().is_empty());
}

#[test]
fn test_remove_missing_alias() {
    let (mut engine, _, _) = setup();
    let (_, outcome) = drive(&mut engine, &["alias rm nope"]);
    assert!(matches!(
        outcome,
        Outcome::Failed(EngineError::AliasNotFound { ref panel, ref token }) if panel == "os" && token == "nope"
    ));

    let (_, outcome) = drive(&mut engine, &["alias rm du", "alias rm du"]);
    assert!(matches!(outcome, Outcome::Failed(EngineError::AliasNotFound { .. })));
    assert!(engine.registry().lookup("os", "du").is_none());
}

#[test]
fn test_switching_panels_keeps_aliases() {
    let (mut engine, _, _) = setup();
    let before: Vec<_> = engine.registry().list_aliases("git").unwrap();

    let (state, outcome) = drive(&mut engine, &["panel git", "panel os", "panel git"]);
    assert_eq!(state.panel(), Some("git"));
    assert!(matches!(outcome, Outcome::Feedback(Feedback::Switched { created: false, .. })));
    assert_eq!(engine.registry().list_aliases("git").unwrap(), before);
    assert!(engine.registry().lookup("os", "st").is_none());
}

#[test]
fn test_new_panel_is_created_on_switch() {
    let (mut engine, _, store) = setup();
    let (state, outcome) = drive(&mut engine, &["panel docker"]);

    assert_eq!(state.panel(), Some("docker"));
    assert!(matches!(outcome, Outcome::Feedback(Feedback::Switched { created: true, .. })));
    assert!(store.has_panel("docker").unwrap());
}

#[test]
fn test_panel_removal_rules() {
    let (mut engine, _, _) = setup();

    let (_, outcome) = drive(&mut engine, &["panel rm os"]);
    assert!(matches!(outcome, Outcome::Failed(EngineError::PanelProtected { .. })));

    let (_, outcome) = drive(&mut engine, &["panel git", "panel rm git"]);
    assert!(matches!(outcome, Outcome::Failed(EngineError::PanelProtected { .. })));

    let (_, outcome) = drive(&mut engine, &["panel rm ghost"]);
    assert!(matches!(outcome, Outcome::Failed(EngineError::PanelNotFound(ref p)) if p == "ghost"));

    let (state, outcome) = drive(&mut engine, &["panel rm git"]);
    assert_eq!(state.panel(), Some("os"));
    assert!(matches!(outcome, Outcome::Feedback(Feedback::PanelRemoved { ref panel }) if panel == "git"));
    assert!(!engine.registry().contains("git"));
}

#[test]
fn test_history_directive_scopes() {
    let (mut engine, _, _) = setup();
    drive(&mut engine, &["echo one", "panel git", "echo two", "echo three"]);

    let (_, outcome) = drive(&mut engine, &["history 1"]);
    match outcome {
        Outcome::Feedback(Feedback::History { scope, entries }) => {
            assert_eq!(scope, HistoryScope::All);
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].input, "echo three");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let (_, outcome) = drive(&mut engine, &["history --panel os"]);
    match outcome {
        Outcome::Feedback(Feedback::History { entries, .. }) => {
            let inputs: Vec<_> = entries.iter().map(|e| e.input.as_str()).collect();
            assert_eq!(inputs, vec!["echo one"]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_spawn_failure_is_not_recorded() {
    let store = Arc::new(MemoryStore::new());
    let shell = FakeShell {
        broken: true,
        ..FakeShell::default()
    };
    let mut engine = engine_with(Arc::clone(&store) as Arc<dyn Store>, shell);

    let (state, outcome) = drive(&mut engine, &["echo hi"]);
    assert_eq!(state.panel(), Some("os"));
    assert!(matches!(outcome, Outcome::Failed(EngineError::Execution(_))));
    assert!(store.recent(10).unwrap().is_empty());
}

#[test]
fn test_help_lists_directives() {
    let (mut engine, _, _) = setup();
    let (_, outcome) = drive(&mut engine, &["help"]);
    match outcome {
        Outcome::Feedback(Feedback::Help { entries }) => {
            assert_eq!(entries.len(), 8);
            assert!(entries.iter().any(|(usage, _)| usage == "exit"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_history_show_returns_one_entry() {
    let (mut engine, _, _) = setup();
    let (_, outcome) = drive(&mut engine, &["du /var", "history show 1"]);
    match outcome {
        Outcome::Feedback(Feedback::HistoryEntry(entry)) => {
            assert_eq!(entry.id, 1);
            assert_eq!(entry.input, "du /var");
            assert_eq!(entry.resolved_command, "du -sh /var");
            assert_eq!(entry.output_excerpt, "ran du -sh /var\n");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let (state, outcome) = drive(&mut engine, &["history show 7"]);
    assert_eq!(state.panel(), Some("os"));
    assert!(matches!(outcome, Outcome::Failed(EngineError::HistoryNotFound(7))));
}

#[test]
fn test_cd_changes_where_commands_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("file.txt"), "").unwrap();
    let root = dir.path().canonicalize().unwrap();

    let (mut engine, _, store) = setup();
    let (_, outcome) = drive(&mut engine, &["cd -"]);
    assert!(matches!(outcome, Outcome::Failed(EngineError::NoPrevious("directory"))));

    let target = format!("cd '{}'", root.display());
    let (_, outcome) = drive(&mut engine, &[target.as_str()]);
    assert!(matches!(outcome, Outcome::Feedback(Feedback::Directory { ref path }) if *path == root));
    assert_eq!(engine.options().cwd, root);

    drive(&mut engine, &["cd sub"]);
    assert_eq!(engine.options().cwd, root.join("sub"));

    drive(&mut engine, &["cd -"]);
    assert_eq!(engine.options().cwd, root);

    for bad in ["cd missing", "cd file.txt"] {
        let (state, outcome) = drive(&mut engine, &[bad]);
        assert_eq!(state.panel(), Some("os"));
        assert!(matches!(outcome, Outcome::Failed(EngineError::ChangeDir { .. })), "{}", bad);
        assert_eq!(engine.options().cwd, root);
    }

    drive(&mut engine, &["cd -", "cd -"]);
    assert_eq!(engine.options().cwd, root);
    assert!(store.recent(10).unwrap().is_empty());
}

#[test]
fn test_cd_home() {
    let Some(home) = dirs::home_dir().and_then(|h| h.canonicalize().ok()) else {
        return;
    };
    let (mut engine, _, _) = setup();
    drive(&mut engine, &["cd"]);
    assert_eq!(engine.options().cwd, home);

    drive(&mut engine, &["cd /", "cd ~"]);
    assert_eq!(engine.options().cwd, home);
}

#[test]
fn test_back_returns_to_previous_panels() {
    let (mut engine, _, _) = setup();
    let mut state = engine.initial_state();
    for line in ["panel git", "panel docker", "panel docker"] {
        state = engine.step(state, line).0;
    }
    assert_eq!(state.panel(), Some("docker"));

    let (state, outcome) = engine.step(state, "back");
    assert_eq!(state.panel(), Some("git"));
    assert!(matches!(outcome, Outcome::Feedback(Feedback::Switched { created: false, .. })));

    let (state, _) = engine.step(state, "back");
    assert_eq!(state.panel(), Some("os"));

    let (state, outcome) = engine.step(state, "back");
    assert_eq!(state.panel(), Some("os"));
    assert!(matches!(outcome, Outcome::Failed(EngineError::NoPrevious("panel"))));
}

#[test]
fn test_back_skips_removed_panels() {
    let (mut engine, _, _) = setup();
    let mut state = engine.initial_state();
    for line in ["panel scratch", "panel git", "panel rm scratch"] {
        state = engine.step(state, line).0;
    }
    assert!(!engine.registry().contains("scratch"));

    let (state, _) = engine.step(state, "back");
    assert_eq!(state.panel(), Some("os"));
}

#[test]
fn test_rerun_repeats_last_alias_of_the_panel() {
    let (mut engine, shell, store) = setup();

    let (_, outcome) = drive(&mut engine, &["rerun"]);
    assert!(matches!(outcome, Outcome::Failed(EngineError::NothingToRerun(ref p)) if p == "os"));

    let (_, outcome) = drive(&mut engine, &["du /var", "echo between", "rerun"]);
    assert!(matches!(outcome, Outcome::Ran(ref e) if e.input == "du /var" && e.alias.as_deref() == Some("du")));
    assert_eq!(shell.calls(), vec!["du -sh /var", "echo between", "du -sh /var"]);
    assert_eq!(store.recent(10).unwrap().len(), 3);

    let (_, outcome) = drive(&mut engine, &["panel git", "rerun"]);
    assert!(matches!(outcome, Outcome::Failed(EngineError::NothingToRerun(ref p)) if p == "git"));

    let (_, outcome) = drive(&mut engine, &["alias add du du -h", "rerun"]);
    assert!(matches!(outcome, Outcome::Ran(ref e) if e.command == "du -h /var"));

    let (_, outcome) = drive(&mut engine, &["alias rm du", "rerun"]);
    assert!(matches!(
        outcome,
        Outcome::Failed(EngineError::AliasNotFound { ref token, .. }) if token == "du"
    ));
}

// Reads come from the wrapped store; every write fails.
struct ReadOnlyStore {
    inner: MemoryStore,
}

fn denied() -> StoreError {
    StoreError::Io {
        path: PathBuf::from("aliases.json"),
        source: io::Error::from(io::ErrorKind::PermissionDenied),
    }
}

impl AliasStore for ReadOnlyStore {
    fn panels(&self) -> Result<Vec<String>, StoreError> {
        self.inner.panels()
    }

    fn has_panel(&self, panel: &str) -> Result<bool, StoreError> {
        self.inner.has_panel(panel)
    }

    fn ensure_panel(&self, _panel: &str) -> Result<bool, StoreError> {
        Err(denied())
    }

    fn import_panel(&self, _panel: &str, _aliases: &[Alias]) -> Result<bool, StoreError> {
        Err(denied())
    }

    fn remove_panel(&self, _panel: &str) -> Result<(), StoreError> {
        Err(denied())
    }

    fn get_alias(&self, panel: &str, token: &str) -> Result<Option<Alias>, StoreError> {
        self.inner.get_alias(panel, token)
    }

    fn set_alias(&self, _panel: &str, _alias: Alias) -> Result<(), StoreError> {
        Err(denied())
    }

    fn delete_alias(&self, _panel: &str, _token: &str) -> Result<Alias, StoreError> {
        Err(denied())
    }

    fn list_aliases(&self, panel: &str) -> Result<Vec<Alias>, StoreError> {
        self.inner.list_aliases(panel)
    }
}

impl HistoryStore for ReadOnlyStore {
    fn append(&self, _entry: NewHistoryEntry) -> Result<HistoryEntry, StoreError> {
        Err(denied())
    }

    fn search(&self, panel: Option<&str>, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        self.inner.search(panel, limit)
    }

    fn get(&self, id: u64) -> Result<Option<HistoryEntry>, StoreError> {
        self.inner.get(id)
    }
}

fn assert_writes_rejected(store: Arc<ReadOnlyStore>) {
    let mut engine = engine_with(Arc::clone(&store) as Arc<dyn Store>, FakeShell::default());
    let panels_before = store.inner.panels().unwrap();
    let aliases_before = store.inner.list_aliases("os").ok();

    for line in ["alias add ll ls -la", "panel newone", "alias rm du"] {
        let (state, outcome) = drive(&mut engine, &[line]);
        assert_eq!(state.panel(), Some("os"), "{}", line);
        assert!(matches!(outcome, Outcome::Failed(EngineError::Store(_))), "{} gave {:?}", line, outcome);
    }

    assert!(engine.registry().lookup("os", "ll").is_none());
    assert_eq!(
        engine.registry().lookup("os", "du").map(|a| a.template.as_str()),
        Some("du -sh")
    );
    assert!(!engine.registry().contains("newone"));
    assert_eq!(store.inner.panels().unwrap(), panels_before);
    assert_eq!(store.inner.list_aliases("os").ok(), aliases_before);

    let (_, outcome) = drive(&mut engine, &["du"]);
    assert!(matches!(outcome, Outcome::Ran(ref e) if e.recorded.is_err()));
}

#[test]
fn test_failed_store_write_changes_nothing() {
    assert_writes_rejected(Arc::new(ReadOnlyStore {
        inner: MemoryStore::new(),
    }));
}

#[test]
fn test_failed_store_write_on_persisted_panel_changes_nothing() {
    let inner = MemoryStore::new();
    inner.import_panel("os", &[Alias::new("du", "du -sh")]).unwrap();
    assert_writes_rejected(Arc::new(ReadOnlyStore { inner }));
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut engine = engine_with(store, FakeShell::default());
        drive(&mut engine, &["alias add gs git status -sb", "gs", "panel scratch"]);
    }

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let engine = engine_with(Arc::clone(&store) as Arc<dyn Store>, FakeShell::default());

    assert_eq!(
        engine.registry().lookup("os", "gs").map(|a| a.template.as_str()),
        Some("git status -sb")
    );
    assert!(engine.registry().contains("scratch"));
    assert_eq!(engine.initial_state().panel(), Some("os"));

    let entries = store.recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].resolved_command, "git status -sb");
}

#[cfg(unix)]
mod system_shell {
    use super::*;
    use panelsh::process::SystemShell;

    #[test]
    fn test_nonzero_exit_is_recorded() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = engine_with(Arc::clone(&store) as Arc<dyn Store>, SystemShell::default());

        let (state, outcome) = drive(&mut engine, &["exit 3"]);
        assert_eq!(state.panel(), Some("os"));
        match outcome {
            Outcome::Ran(execution) => {
                assert_eq!(execution.result.exit_code, 3);
                assert_eq!(execution.recorded.unwrap().exit_code, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.recent(10).unwrap().len(), 1);
    }

    #[test]
    fn test_commands_run_in_changed_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let mut engine = engine_with(Arc::new(MemoryStore::new()), SystemShell::default());

        let target = format!("cd '{}'", root.display());
        let (_, outcome) = drive(&mut engine, &[target.as_str(), "pwd"]);
        match outcome {
            Outcome::Ran(execution) => {
                let reported = PathBuf::from(execution.result.stdout.trim()).canonicalize().unwrap();
                assert_eq!(reported, root);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_alias_runs_through_sh() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = engine_with(Arc::clone(&store) as Arc<dyn Store>, SystemShell::default());

        let (_, outcome) = drive(&mut engine, &["alias add greet echo hello", "greet world"]);
        match outcome {
            Outcome::Ran(execution) => {
                assert_eq!(execution.result.stdout, "hello world\n");
                assert!(execution.result.success());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let entry = &store.recent(1).unwrap()[0];
        assert_eq!(entry.output_excerpt.trim(), "hello world");
    }
}
