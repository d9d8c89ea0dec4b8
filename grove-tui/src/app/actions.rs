use super::{Context, OpenAction};
use grove_core::{
    action::Action,
    sidebar::{CreateForm, CreateTarget, Mode, SidebarState, TextInput},
    tree::TreeNode,
    workflow::{CreateRequest, WorkflowError},
};

/// Join workflow warnings into one line for the error bar.
fn warnings_line<'a>(warnings: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let joined = warnings.into_iter().collect::<Vec<_>>().join("; ");
    (!joined.is_empty()).then_some(joined)
}

pub(super) fn handle_activate(
    state: &mut SidebarState,
    ctx: &Context<'_>,
) -> anyhow::Result<Option<OpenAction>> {
    let Some(node) = state.selected_node() else {
        return Ok(None);
    };
    if node.is_repo() {
        handle_toggle_expand(state, ctx)?;
        return Ok(None);
    }
    let Some(session_name) = state.selected_workspace().map(|ws| ws.session_name.clone()) else {
        return Ok(None);
    };

    let (doc, outcome) = ctx
        .store
        .update(|doc| ctx.workflows.activate(doc, &session_name))?;
    state.replace_document(doc);
    let workspace = match outcome {
        Ok(workspace) => workspace,
        Err(e) => {
            state.error = Some(e.to_string());
            return Ok(None);
        }
    };

    // The lock is released; recreating the session may take a moment.
    if let Err(e) = ctx.workflows.ensure_session(&workspace) {
        state.error = Some(format!("{e:#}"));
        return Ok(None);
    }
    Ok(Some(OpenAction::Switch { session_name }))
}

/// Fold or unfold the repo under the cursor (or the repo of the selected worktree).
pub(super) fn handle_toggle_expand(
    state: &mut SidebarState,
    ctx: &Context<'_>,
) -> anyhow::Result<()> {
    let Some(repo) = state.selected_repo().map(str::to_string) else {
        return Ok(());
    };
    let (doc, _) = ctx.store.update(|doc| {
        doc.toggle_collapsed(&repo);
        Ok::<_, std::convert::Infallible>(())
    })?;
    state.replace_document(doc);
    if !matches!(state.selected_node(), Some(TreeNode::Repo { name, .. }) if *name == repo) {
        // A collapsed worktree row disappears; land on its header instead.
        if let Some(idx) = state
            .nodes
            .iter()
            .position(|node| matches!(node, TreeNode::Repo { name, .. } if *name == repo))
        {
            state.cursor = Some(idx);
        }
        state.clamp_cursor();
    }
    Ok(())
}

pub(super) fn handle_new(state: &mut SidebarState) {
    let form = match state.selected_repo() {
        Some(repo) => CreateForm::worktree(repo),
        None => CreateForm::plain(),
    };
    state.mode = Mode::Create(form);
}

pub(super) fn handle_delete(state: &mut SidebarState) {
    if let Some(ws) = state.selected_workspace() {
        state.mode = Mode::Delete {
            session_name: ws.session_name.clone(),
            label: ws.label().to_string(),
        };
    }
}

pub(super) fn handle_rename(state: &mut SidebarState) {
    if let Some(ws) = state.selected_workspace() {
        state.mode = Mode::Rename {
            session_name: ws.session_name.clone(),
            input: TextInput::with_text(ws.label()),
        };
    }
}

pub(super) fn handle_start_filter(state: &mut SidebarState) {
    state.mode = Mode::Filter(TextInput::with_text(&state.filter));
}

pub(super) fn handle_reload(state: &mut SidebarState, ctx: &Context<'_>) -> anyhow::Result<()> {
    let doc = ctx.store.load()?;
    log::debug!("sidebar reloaded {} workspaces", doc.workspaces.len());
    state.replace_document(doc);
    Ok(())
}

pub(super) fn handle_input(state: &mut SidebarState, action: &Action) {
    let Some(input) = state.mode.input_mut() else {
        return;
    };
    match action {
        Action::InputPush(c) => input.insert_char(*c),
        Action::InputBackspace => {
            input.backspace();
        }
        Action::InputDeleteWord => input.delete_word(),
        Action::CursorLeft => input.cursor_left(),
        Action::CursorRight => input.cursor_right(),
        Action::CursorStart => input.cursor_start(),
        Action::CursorEnd => input.cursor_end(),
        _ => return,
    }

    if let Mode::Create(form) = &mut state.mode {
        form.error = None;
    }
    // The filter applies while typing.
    if matches!(state.mode, Mode::Filter(_)) {
        state.clamp_cursor();
    }
}

pub(super) fn handle_confirm(state: &mut SidebarState, ctx: &mut Context<'_>) -> anyhow::Result<()> {
    match std::mem::replace(&mut state.mode, Mode::Browse) {
        Mode::Browse => {}
        Mode::Create(form) => confirm_create(state, ctx, form)?,
        Mode::Delete { session_name, .. } => {
            let (doc, outcome) = ctx
                .store
                .update(|doc| ctx.workflows.delete(doc, &session_name))?;
            state.replace_document(doc);
            match outcome {
                Ok(report) => state.error = warnings_line(report.warnings()),
                Err(e) => {
                    log::warn!("delete {session_name} failed: {e}");
                    state.error = Some(e.to_string());
                }
            }
        }
        Mode::Filter(input) => {
            state.filter = input.value().to_string();
        }
        Mode::Rename {
            session_name,
            input,
        } => {
            let (doc, outcome) = ctx
                .store
                .update(|doc| ctx.workflows.rename(doc, &session_name, input.value()))?;
            state.replace_document(doc);
            match outcome {
                Ok(workspace) => state.focus_session(&workspace.session_name),
                Err(WorkflowError::NameUnchanged) => {}
                Err(e) => state.error = Some(e.to_string()),
            }
        }
    }
    state.clamp_cursor();
    Ok(())
}

fn confirm_create(
    state: &mut SidebarState,
    ctx: &mut Context<'_>,
    mut form: CreateForm,
) -> anyhow::Result<()> {
    let value = form.input.value();
    let value = (!value.is_empty()).then(|| value.to_string());
    let request = match &form.target {
        CreateTarget::Worktree { repo } => CreateRequest::Worktree {
            repo: repo.clone(),
            branch: value,
        },
        CreateTarget::Plain => CreateRequest::Plain {
            name: value,
            path: None,
        },
    };

    let workflows = &ctx.workflows;
    let names = &mut ctx.names;
    let (doc, outcome) = ctx
        .store
        .update(|doc| workflows.create(doc, &request, names))?;
    state.replace_document(doc);
    match outcome {
        Ok(report) => {
            state.focus_session(&report.workspace.session_name);
            state.error = warnings_line(report.warnings.iter().map(String::as_str));
        }
        Err(e) => {
            form.error = Some(e.to_string());
            state.mode = Mode::Create(form);
        }
    }
    Ok(())
}

pub(super) fn handle_cancel(state: &mut SidebarState) {
    if matches!(state.mode, Mode::Filter(_)) {
        state.filter.clear();
    }
    state.enter_browse();
}
