use grove_core::{
    config::Config,
    names::NameGenerator,
    store::{State, StateStore, Workspace, WorkspaceKind, is_managed_session},
    tmux::TmuxProvider,
    workflow::{CreateRequest, StartReport, WorkflowError, Workflows},
};
use serde::Serialize;
use std::{
    collections::HashSet,
    fmt::Write as _,
    io::{self, BufRead, Write as _},
    path::PathBuf,
};

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Clone)]
pub struct CliError {
    message: String,
    code: i32,
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 1,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 2,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(value: anyhow::Error) -> Self {
        Self::system(format!("{value:#}"))
    }
}

impl From<WorkflowError> for CliError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::External(_) => Self::system(value.to_string()),
            _ => Self::user(value.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewArgs {
    pub target: Option<String>,
    pub branch: Option<String>,
    pub plain: bool,
    pub path: Option<PathBuf>,
    pub no_switch: bool,
}

#[derive(Debug, Clone)]
pub struct NotifyArgs {
    pub message: Vec<String>,
    pub session: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct WorkspaceOutput {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    path: PathBuf,
    session: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<String>,
}

impl WorkspaceOutput {
    fn new(workspace: &Workspace, running: bool) -> Self {
        let (kind, repo, branch) = match &workspace.kind {
            WorkspaceKind::Worktree { repo, branch, .. } => {
                ("worktree", Some(repo.clone()), Some(branch.clone()))
            }
            WorkspaceKind::Plain { .. } => ("plain", None, None),
        };
        Self {
            name: workspace.name.clone(),
            kind,
            repo,
            branch,
            path: workspace.dir().to_path_buf(),
            session: workspace.session_name.clone(),
            status: if running { "running" } else { "stopped" },
            notification: workspace.notification.clone(),
        }
    }
}

fn print_warnings<'a>(warnings: impl IntoIterator<Item = &'a str>) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

/// Ask a question on stdin. Returns the trimmed answer; EOF yields an empty string.
fn prompt(question: &str) -> CliResult<String> {
    print!("{question}");
    io::stdout().flush().map_err(|e| CliError::system(e.to_string()))?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CliError::system(e.to_string()))?;
    Ok(answer.trim().to_string())
}

/// Recreate the session if needed, then move the terminal to it.
fn open_session(workflows: &Workflows<'_>, workspace: &Workspace) -> CliResult<()> {
    workflows.ensure_session(workspace)?;
    workflows.tmux().switch_or_attach(&workspace.session_name)?;
    Ok(())
}

/// The workspace `start` lands on: `last_active` when still tracked, else the first one.
fn start_target(state: &State) -> Option<&Workspace> {
    state
        .last_active
        .as_deref()
        .and_then(|session| state.find_by_session(session))
        .or_else(|| state.workspaces.first())
}

fn print_start_report(report: &StartReport) {
    for session in &report.added {
        println!("added: {session}");
    }
    for session in &report.recreated {
        println!("recreated: {session}");
    }
    for session in &report.orphans {
        eprintln!("warning: tmux session {session} has no workspace record");
    }
    print_warnings(report.warnings.iter().map(String::as_str));
}

pub fn cmd_start(
    config: &Config,
    store: &StateStore,
    workflows: &Workflows<'_>,
    sidebar_command: &str,
) -> CliResult<()> {
    let (state, outcome) = store.update(|state| {
        let mut report = StartReport::default();
        workflows.apply_auto_start(state, &mut report);
        workflows.reconcile(state, &mut report);
        if let Err(e) = workflows.tmux().bind_popup(
            &config.prefix,
            &config.sidebar.width,
            config.sidebar.position.into(),
            sidebar_command,
        ) {
            let message = format!("binding sidebar key {}: {e:#}", config.prefix);
            log::warn!("{message}");
            report.warnings.push(message);
        }
        Ok::<_, std::convert::Infallible>(report)
    })?;
    let Ok(report) = outcome;
    print_start_report(&report);

    // The lock is released before attaching, which blocks until detach.
    let Some(target) = start_target(&state) else {
        println!("no workspaces yet; add repos or auto_start entries to the config, or run `grove new`");
        return Ok(());
    };
    open_session(workflows, target)
}

/// Pick the repo for `grove new` when none was named.
fn infer_repo(config: &Config) -> CliResult<String> {
    let names = config.repo_order();
    match names.as_slice() {
        [] => Err(CliError::user(
            "no repos configured; add one to the config or use --plain",
        )),
        [only] => Ok(only.clone()),
        _ => {
            let answer = prompt(&format!("Repo ({}): ", names.join(", ")))?;
            if answer.is_empty() {
                return Err(CliError::user("no repo selected"));
            }
            Ok(answer)
        }
    }
}

fn create_request(config: &Config, args: &NewArgs) -> CliResult<CreateRequest> {
    if args.plain {
        if args.branch.is_some() {
            return Err(CliError::user("--plain takes a single optional name"));
        }
        return Ok(CreateRequest::Plain {
            name: args.target.clone(),
            path: args.path.clone(),
        });
    }
    if args.path.is_some() {
        return Err(CliError::user("--path only applies to --plain workspaces"));
    }
    let repo = match &args.target {
        Some(repo) => repo.clone(),
        None => infer_repo(config)?,
    };
    Ok(CreateRequest::Worktree {
        repo,
        branch: args.branch.clone(),
    })
}

pub fn cmd_new(
    config: &Config,
    store: &StateStore,
    workflows: &Workflows<'_>,
    args: &NewArgs,
) -> CliResult<()> {
    let request = create_request(config, args)?;
    let mut names = NameGenerator::from_entropy();
    let (_, outcome) = store.update(|state| {
        let report = workflows.create(state, &request, &mut names)?;
        if !args.no_switch {
            state.last_active = Some(report.workspace.session_name.clone());
        }
        Ok::<_, WorkflowError>(report)
    })?;
    let report = outcome?;

    println!(
        "created: {} ({})",
        report.workspace.name, report.workspace.session_name
    );
    print_warnings(report.warnings.iter().map(String::as_str));

    if args.no_switch {
        return Ok(());
    }
    workflows
        .tmux()
        .switch_or_attach(&report.workspace.session_name)?;
    Ok(())
}

pub fn cmd_rm(
    store: &StateStore,
    workflows: &Workflows<'_>,
    query: &str,
    force: bool,
) -> CliResult<()> {
    let state = store.load()?;
    let workspace = state
        .find_workspace(query)
        .ok_or_else(|| CliError::from(WorkflowError::NotFound(query.to_string())))?;
    let session_name = workspace.session_name.clone();

    if !force {
        let answer = prompt(&format!("Delete workspace {}? (y/N): ", workspace.name))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let (_, outcome) = store.update(|state| workflows.delete(state, &session_name))?;
    let report = outcome?;
    println!("deleted: {}", report.workspace.name);
    print_warnings(report.warnings());
    Ok(())
}

pub fn cmd_switch(store: &StateStore, workflows: &Workflows<'_>, query: &str) -> CliResult<()> {
    let (_, outcome) = store.update(|state| {
        let session_name = state
            .find_workspace(query)
            .map(|ws| ws.session_name.clone())
            .ok_or_else(|| WorkflowError::NotFound(query.to_string()))?;
        workflows.activate(state, &session_name)
    })?;
    let workspace = outcome?;
    open_session(workflows, &workspace)
}

pub fn cmd_list(store: &StateStore, tmux: &dyn TmuxProvider, json: bool) -> CliResult<()> {
    let state = store.load()?;
    let running: HashSet<String> = tmux.list_sessions().into_iter().collect();
    let output: Vec<WorkspaceOutput> = state
        .workspaces
        .iter()
        .map(|ws| WorkspaceOutput::new(ws, running.contains(&ws.session_name)))
        .collect();

    if json {
        print_json(&output)?;
    } else {
        print!("{}", format_workspace_table(&output));
    }
    Ok(())
}

pub fn cmd_notify(store: &StateStore, tmux: &dyn TmuxProvider, args: &NotifyArgs) -> CliResult<()> {
    let session_name = match &args.session {
        Some(session) => session.clone(),
        None => tmux
            .current_session()
            .ok_or_else(|| CliError::user("not inside a tmux session; pass --session"))?,
    };
    if !is_managed_session(&session_name) {
        return Err(CliError::user(format!(
            "session {session_name} is not a grove workspace"
        )));
    }

    let clear = matches!(args.message.as_slice(), [word] if word == "clear");
    let message = args.message.join(" ");
    if !clear && message.trim().is_empty() {
        return Err(CliError::user("notification message is empty"));
    }

    let (_, outcome) = store.update(|state| {
        let found = if clear {
            state.clear_notification(&session_name)
        } else {
            state.set_notification(&session_name, message.trim())
        };
        if found {
            Ok(())
        } else {
            Err(WorkflowError::NotFound(session_name.clone()))
        }
    })?;
    outcome?;
    Ok(())
}

pub fn cmd_config(path: &std::path::Path, path_only: bool) -> CliResult<()> {
    if path_only {
        println!("{}", path.display());
        return Ok(());
    }
    grove_core::config::ensure_config_file(path)?;
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string());
    let status = std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} \"$1\""))
        .arg("sh")
        .arg(path)
        .status()
        .map_err(|e| CliError::system(format!("failed to start {editor}: {e}")))?;
    if !status.success() {
        return Err(CliError::system(format!("{editor} exited with {status}")));
    }
    Ok(())
}

fn format_workspace_table(rows: &[WorkspaceOutput]) -> String {
    let headers = ["REPO", "WORKTREE", "SESSION", "STATUS"];
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            let worktree = row.branch.clone().unwrap_or_else(|| row.name.clone());
            let worktree = if row.notification.is_some() {
                format!("{worktree} *")
            } else {
                worktree
            };
            [
                row.repo.clone().unwrap_or_else(|| "-".to_string()),
                worktree,
                row.session.clone(),
                row.status.to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<w0$}  {:<w1$}  {:<w2$}  {}",
        headers[0],
        headers[1],
        headers[2],
        headers[3],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    );
    for row in &cells {
        let _ = writeln!(
            out,
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            row[0],
            row[1],
            row[2],
            row[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        );
    }
    out
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!(
        "{}",
        serde_json::to_string(value).map_err(|e| CliError::system(e.to_string()))?
    );
    Ok(())
}

pub fn print_error(error: &CliError, json: bool) {
    if json {
        let payload = serde_json::json!({ "error": error.message() });
        eprintln!("{payload}");
    } else {
        eprintln!("error: {}", error.message());
    }
}
