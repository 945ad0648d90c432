use std::cell::RefCell;
use std::path::PathBuf;

use anyhow::anyhow;
use pretty_assertions::assert_eq;

use clockdefaults_core::api::{
    Client, ClientError, GetProjectParams, GetProjectsParams, GetTagsParams, GetTasksParams,
    Project, Tag, Task,
};
use clockdefaults_core::catalog::{Catalog, WorkspaceCatalog};
use clockdefaults_core::config::Settings;
use clockdefaults_core::defaults::{DefaultsError, DefaultsStore, ScanError};
use clockdefaults_core::entry::DefaultTimeEntry;
use clockdefaults_core::reconcile::{
    Overrides, Passthrough, Prompt, ReconcileError, Reconciler, WorkspaceSource,
};

/// Catalog-backed client that records every request.
struct RecordingClient {
    catalog: Catalog,
    calls: RefCell<Vec<String>>,
}

impl RecordingClient {
    fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Client for RecordingClient {
    fn get_project(&self, params: &GetProjectParams) -> Result<Project, ClientError> {
        self.calls.borrow_mut().push(format!(
            "get_project {} {} hydrate={}",
            params.workspace, params.project_id, params.hydrate
        ));
        self.catalog.get_project(params)
    }

    fn get_projects(&self, params: &GetProjectsParams) -> Result<Vec<Project>, ClientError> {
        self.calls
            .borrow_mut()
            .push(format!("get_projects {}", params.workspace));
        self.catalog.get_projects(params)
    }

    fn get_tasks(&self, params: &GetTasksParams) -> Result<Vec<Task>, ClientError> {
        self.calls.borrow_mut().push(format!(
            "get_tasks {} {} active={}",
            params.workspace, params.project_id, params.active_only
        ));
        self.catalog.get_tasks(params)
    }

    fn get_tags(&self, params: &GetTagsParams) -> Result<Vec<Tag>, ClientError> {
        self.calls.borrow_mut().push(format!(
            "get_tags {} archived={:?}",
            params.workspace, params.archived
        ));
        self.catalog.get_tags(params)
    }
}

#[derive(Default)]
struct MemoryStore {
    current: Option<DefaultTimeEntry>,
    fail_read: bool,
    written: RefCell<Vec<DefaultTimeEntry>>,
}

impl MemoryStore {
    fn with(entry: DefaultTimeEntry) -> Self {
        Self {
            current: Some(entry),
            ..Default::default()
        }
    }

    fn written(&self) -> Vec<DefaultTimeEntry> {
        self.written.borrow().clone()
    }
}

impl DefaultsStore for MemoryStore {
    fn read(&self) -> Result<DefaultTimeEntry, DefaultsError> {
        if self.fail_read {
            return Err(DefaultsError::Scan(ScanError::Open {
                path: PathBuf::from(".clockify-defaults.yaml"),
                source: std::io::Error::new(std::io::ErrorKind::Other, "failed"),
            }));
        }
        self.current.clone().ok_or(DefaultsError::NotFound)
    }

    fn write(&self, entry: &DefaultTimeEntry) -> Result<PathBuf, DefaultsError> {
        self.written.borrow_mut().push(entry.clone());
        Ok(PathBuf::from(".clockify-defaults.yaml"))
    }
}

struct Workspace(Option<&'static str>);

impl WorkspaceSource for Workspace {
    fn workspace_id(&self) -> anyhow::Result<String> {
        self.0.map(str::to_string).ok_or_else(|| anyhow!("failed"))
    }
}

/// Prompt that fills in a fixed project and task.
struct PickProject;

impl Prompt for PickProject {
    fn ask(
        &self,
        mut entry: DefaultTimeEntry,
        _client: &dyn Client,
        _settings: &Settings,
    ) -> anyhow::Result<DefaultTimeEntry> {
        entry.project_id = "p".to_string();
        entry.task_id = "tk".to_string();
        Ok(entry)
    }
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::default();
    catalog.workspaces.insert(
        "w".to_string(),
        WorkspaceCatalog {
            projects: vec![Project {
                id: "p".to_string(),
                name: "project".to_string(),
                archived: false,
                tasks: vec![Task {
                    id: "tk".to_string(),
                    name: "task".to_string(),
                    active: true,
                }],
            }],
            tags: vec![
                Tag {
                    id: "tg".to_string(),
                    name: "tag".to_string(),
                    archived: false,
                },
                Tag {
                    id: "tga".to_string(),
                    name: "old tag".to_string(),
                    archived: true,
                },
            ],
        },
    );
    catalog
}

fn ids_only() -> Settings {
    Settings::default()
}

fn by_name() -> Settings {
    Settings {
        allow_name_for_id: true,
        ..Settings::default()
    }
}

fn run(
    store: &MemoryStore,
    client: &RecordingClient,
    settings: Settings,
    overrides: Overrides,
) -> Result<DefaultTimeEntry, ReconcileError> {
    run_with_prompt(store, client, settings, &Passthrough, overrides)
}

fn run_with_prompt(
    store: &MemoryStore,
    client: &RecordingClient,
    settings: Settings,
    prompt: &dyn Prompt,
    overrides: Overrides,
) -> Result<DefaultTimeEntry, ReconcileError> {
    let workspace = Workspace(Some("w"));
    let reconciler = Reconciler {
        store,
        workspace: &workspace,
        client,
        prompt,
        settings,
    };
    reconciler.set(&overrides)
}

fn project(value: &str) -> Overrides {
    Overrides {
        project: Some(value.to_string()),
        ..Default::default()
    }
}

#[test]
fn no_overrides_and_same_workspace_skip_the_service() {
    let current = DefaultTimeEntry {
        workspace: "w".to_string(),
        project_id: "p1".to_string(),
        ..Default::default()
    };
    let store = MemoryStore::with(current.clone());
    let client = RecordingClient::new(catalog());

    let result = run(&store, &client, ids_only(), Overrides::default()).expect("set");
    assert_eq!(result, current);
    assert_eq!(store.written(), vec![current]);
    assert!(client.calls().is_empty());
}

#[test]
fn workspace_change_alone_triggers_validation() {
    let store = MemoryStore::with(DefaultTimeEntry {
        workspace: "old".to_string(),
        project_id: "p".to_string(),
        ..Default::default()
    });
    let client = RecordingClient::new(catalog());

    let result = run(&store, &client, ids_only(), Overrides::default()).expect("set");
    assert_eq!(result.workspace, "w");
    assert_eq!(client.calls(), vec!["get_project w p hydrate=false"]);
}

#[test]
fn missing_file_starts_from_empty_defaults() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());

    let result = run(&store, &client, ids_only(), project("p")).expect("set");
    assert_eq!(
        result,
        DefaultTimeEntry {
            workspace: "w".to_string(),
            project_id: "p".to_string(),
            ..Default::default()
        }
    );
}

#[test]
fn read_failure_aborts_before_anything_else() {
    let store = MemoryStore {
        fail_read: true,
        ..Default::default()
    };
    let client = RecordingClient::new(catalog());

    let err = run(&store, &client, ids_only(), project("p")).expect_err("should fail");
    assert!(matches!(err, ReconcileError::Defaults(_)));
    assert!(err.to_string().contains("failed"));
    assert!(client.calls().is_empty());
    assert!(store.written().is_empty());
}

#[test]
fn workspace_failure_is_fatal() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let workspace = Workspace(None);
    let reconciler = Reconciler {
        store: &store,
        workspace: &workspace,
        client: &client,
        prompt: &Passthrough,
        settings: ids_only(),
    };

    let err = reconciler.set(&Overrides::default()).expect_err("should fail");
    assert_eq!(err.to_string(), "failed");
    assert!(store.written().is_empty());
}

#[test]
fn conflicting_billable_flags_fail_before_reconciling() {
    let err = Overrides::default()
        .with_billable_flags(true, true)
        .expect_err("should fail");
    assert!(matches!(err, ReconcileError::ConflictingFlags));
    assert!(err.is_user_error());
}

#[test]
fn all_overrides_are_applied() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let overrides = Overrides {
        project: Some("p".to_string()),
        task: Some("tk".to_string()),
        tags: Some(vec!["tg".to_string(), "tg".to_string()]),
        ..Default::default()
    }
    .with_billable_flags(true, false)
    .expect("flags");

    let result = run(&store, &client, ids_only(), overrides).expect("set");
    let expected = DefaultTimeEntry {
        workspace: "w".to_string(),
        project_id: "p".to_string(),
        task_id: "tk".to_string(),
        description: String::new(),
        billable: Some(true),
        tag_ids: vec!["tg".to_string()],
    };
    assert_eq!(result, expected);
    assert_eq!(store.written(), vec![expected]);
    assert_eq!(
        client.calls(),
        vec!["get_project w p hydrate=true", "get_tags w archived=Some(false)"]
    );
}

#[test]
fn not_billable_overrides_stored_billable() {
    let current = DefaultTimeEntry {
        workspace: "w".to_string(),
        project_id: "p".to_string(),
        billable: Some(true),
        tag_ids: vec!["tg".to_string()],
        ..Default::default()
    };
    let store = MemoryStore::with(current.clone());
    let client = RecordingClient::new(catalog());
    let overrides = Overrides::default()
        .with_billable_flags(false, true)
        .expect("flags");

    let result = run(&store, &client, ids_only(), overrides).expect("set");
    assert_eq!(
        result,
        DefaultTimeEntry {
            billable: Some(false),
            ..current
        }
    );
}

#[test]
fn task_without_project_is_rejected_before_lookups() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let overrides = Overrides {
        task: Some("tk".to_string()),
        ..Default::default()
    };

    let err = run(&store, &client, ids_only(), overrides).expect_err("should fail");
    assert!(matches!(err, ReconcileError::TaskWithoutProject));
    assert_eq!(err.to_string(), "can't set task without project");
    assert!(client.calls().is_empty());
    assert!(store.written().is_empty());
}

#[test]
fn unknown_project_id_fails() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());

    let err = run(&store, &client, ids_only(), project("nope")).expect_err("should fail");
    assert!(matches!(err, ReconcileError::Client(ClientError::NotFound { .. })));
    assert!(store.written().is_empty());
}

#[test]
fn task_missing_from_project_fails() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let overrides = Overrides {
        project: Some("p".to_string()),
        task: Some("other".to_string()),
        ..Default::default()
    };

    let err = run(&store, &client, ids_only(), overrides).expect_err("should fail");
    assert_eq!(
        err.to_string(),
        r#"can't find task with ID "other" on project "p""#
    );
    assert!(store.written().is_empty());
}

#[test]
fn archived_or_unknown_tag_id_fails() {
    for tag in ["tga", "missing"] {
        let store = MemoryStore::default();
        let client = RecordingClient::new(catalog());
        let overrides = Overrides {
            project: Some("p".to_string()),
            tags: Some(vec!["tg".to_string(), tag.to_string()]),
            ..Default::default()
        };

        let err = run(&store, &client, ids_only(), overrides).expect_err("should fail");
        assert_eq!(err.to_string(), format!(r#"can't find tag with ID "{tag}""#));
        assert!(store.written().is_empty());
    }
}

#[test]
fn names_are_resolved_to_ids() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let overrides = Overrides {
        project: Some("project".to_string()),
        task: Some("task".to_string()),
        tags: Some(vec!["tag".to_string(), "tg".to_string()]),
        ..Default::default()
    };

    let result = run(&store, &client, by_name(), overrides).expect("set");
    assert_eq!(result.project_id, "p");
    assert_eq!(result.task_id, "tk");
    assert_eq!(result.tag_ids, vec!["tg"]);
    assert_eq!(
        client.calls(),
        vec![
            "get_projects w",
            "get_tasks w p active=true",
            "get_tags w archived=Some(false)",
        ]
    );
}

#[test]
fn archived_tags_are_searched_when_allowed() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let settings = Settings {
        allow_archived_tags: true,
        ..by_name()
    };
    let overrides = Overrides {
        tags: Some(vec!["old tag".to_string()]),
        ..Default::default()
    };

    let result = run(&store, &client, settings, overrides).expect("set");
    assert_eq!(result.tag_ids, vec!["tga"]);
    assert_eq!(client.calls(), vec!["get_tags w archived=None"]);
}

#[test]
fn any_failed_name_lookup_aborts_when_not_interactive() {
    let cases = [
        ("nope", "task", "tag", "can't find project with id/name nope"),
        ("project", "nope", "tag", "can't find task with id/name nope"),
        ("project", "task", "nope", "can't find tag with id/name nope"),
    ];
    for (project, task, tag, message) in cases {
        let store = MemoryStore::default();
        let client = RecordingClient::new(catalog());
        let overrides = Overrides {
            project: Some(project.to_string()),
            task: Some(task.to_string()),
            tags: Some(vec![tag.to_string()]),
            ..Default::default()
        };

        let err = run(&store, &client, by_name(), overrides).expect_err("should fail");
        assert_eq!(err.to_string(), message);
        assert!(store.written().is_empty());
    }
}

#[test]
fn interactive_mode_tolerates_failed_lookups_and_asks() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let settings = Settings {
        interactive: true,
        ..by_name()
    };
    let overrides = Overrides {
        project: Some("nope".to_string()),
        task: Some("task".to_string()),
        tags: Some(vec!["tag".to_string(), "unknown".to_string()]),
        ..Default::default()
    };

    let result =
        run_with_prompt(&store, &client, settings, &PickProject, overrides).expect("set");
    assert_eq!(result.project_id, "p");
    assert_eq!(result.task_id, "tk");
    assert_eq!(result.tag_ids, vec!["tag", "unknown"]);
    assert_eq!(store.written(), vec![result]);
}

#[test]
fn interactive_without_names_still_validates_ids() {
    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let settings = Settings {
        interactive: true,
        ..ids_only()
    };

    let err = run(&store, &client, settings, project("nope")).expect_err("should fail");
    assert!(matches!(err, ReconcileError::Client(_)));
}

#[test]
fn prompt_errors_surface_unchanged() {
    struct Refuse;
    impl Prompt for Refuse {
        fn ask(
            &self,
            _entry: DefaultTimeEntry,
            _client: &dyn Client,
            _settings: &Settings,
        ) -> anyhow::Result<DefaultTimeEntry> {
            Err(anyhow!("prompt cancelled"))
        }
    }

    let store = MemoryStore::default();
    let client = RecordingClient::new(catalog());
    let settings = Settings {
        interactive: true,
        ..by_name()
    };

    let err = run_with_prompt(&store, &client, settings, &Refuse, project("project"))
        .expect_err("should fail");
    assert_eq!(err.to_string(), "prompt cancelled");
    assert!(store.written().is_empty());
}
