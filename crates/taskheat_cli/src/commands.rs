//! Subcommand handlers. Each one drives the store and writes its result to
//! `out` as text or JSON.

use crate::cli::{AddArgs, Commands, EditArgs, ListArgs, SubtaskCommands, TagArgs};
use crate::dates::{format_millis, parse_deadline};
use anyhow::{bail, Context};
use serde::Serialize;
use std::io::Write;
use taskheat_core::{Subtask, SubtaskId, Tag, Task, TaskEdit, TaskId, TaskStore};

/// Output mode shared by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

pub fn execute(
    store: &mut TaskStore,
    command: Commands,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Add(args) => add(store, args, output, out),
        Commands::List(args) => list(store, args, output, out),
        Commands::Show { id } => show(store, TaskId(id), output, out),
        Commands::Done { id } => set_completed(store, TaskId(id), true, output, out),
        Commands::Undo { id } => set_completed(store, TaskId(id), false, output, out),
        Commands::Edit(args) => edit(store, args, output, out),
        Commands::Rm { id } => remove(store, TaskId(id), output, out),
        Commands::Subtask { action } => subtask(store, action, output, out),
        Commands::Save => {
            store.save_now()?;
            let path = store.config().task_save_path.display().to_string();
            match output {
                Output::Json => emit_json(
                    out,
                    &serde_json::json!({ "saved": store.len(), "path": path }),
                ),
                Output::Text => {
                    writeln!(out, "saved {} task(s) to {path}", store.len())?;
                    Ok(())
                }
            }
        }
    }
}

fn add(
    store: &mut TaskStore,
    args: AddArgs,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let due = parse_deadline(&args.due)?;
    let mut task = store.new_task(args.title, due)?;
    task.set_description(args.description);
    task.set_tag(tag_from(args.tag)?);
    let id = store.add_task(task)?;
    report_task(store, id, "added", output, out)
}

fn list(
    store: &TaskStore,
    args: ListArgs,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let tasks = if args.overdue {
        store.overdue_tasks()
    } else {
        store.get_tasks(args.filter, args.sort)
    };

    if output == Output::Json {
        return emit_json(out, &tasks);
    }
    if tasks.is_empty() {
        writeln!(out, "no tasks")?;
    }
    for task in &tasks {
        writeln!(out, "{}", summary_line(task))?;
    }
    Ok(())
}

fn show(
    store: &mut TaskStore,
    id: TaskId,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let task = find_task(store, id)?;
    if !task.is_completed() {
        store.update_heat(id)?;
    }
    let task = find_task(store, id)?;

    if output == Output::Json {
        return emit_json(out, task);
    }
    writeln!(out, "{}", summary_line(task))?;
    if let Some(description) = task.description() {
        for line in description.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    writeln!(out, "    started  {}", format_millis(task.start_time()))?;
    if let Some(done_at) = task.actual_end_time() {
        writeln!(out, "    finished {}", format_millis(done_at))?;
    }
    for subtask in task.subtasks() {
        writeln!(out, "    {}", subtask_line(subtask))?;
    }
    Ok(())
}

fn set_completed(
    store: &mut TaskStore,
    id: TaskId,
    completed: bool,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    store.set_task_completed(id, completed)?;
    let verb = if completed { "completed" } else { "reopened" };
    report_task(store, id, verb, output, out)
}

fn edit(
    store: &mut TaskStore,
    args: EditArgs,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let id = TaskId(args.id);
    let mut edit = TaskEdit::default();
    if let Some(due) = args.due.as_deref() {
        edit.expected_end_time = Some(parse_deadline(due)?);
    }
    if args.clear_description {
        edit.description = Some(None);
    } else if let Some(description) = args.description {
        edit.description = Some(Some(description));
    }
    if args.clear_tag {
        edit.tag = Some(None);
    } else if let Some(tag) = tag_from(args.tag)? {
        edit.tag = Some(Some(tag));
    }
    if edit.is_empty() {
        bail!("nothing to change for task {id}");
    }

    store.edit_task(id, edit)?;
    report_task(store, id, "updated", output, out)
}

fn remove(
    store: &mut TaskStore,
    id: TaskId,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let Some(task) = store.remove_task(id) else {
        bail!("task not found: {id}");
    };
    match output {
        Output::Json => emit_json(out, &task),
        Output::Text => {
            writeln!(out, "removed #{} {}", task.id(), task.title())?;
            Ok(())
        }
    }
}

fn subtask(
    store: &mut TaskStore,
    action: SubtaskCommands,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match action {
        SubtaskCommands::Add {
            task_id,
            title,
            description,
        } => {
            let task_id = TaskId(task_id);
            let mut subtask = store.new_subtask(task_id, title)?;
            subtask.set_description(description);
            let id = store.add_subtask(task_id, subtask)?;
            report_subtask(store, id, "added", output, out)
        }
        SubtaskCommands::Done { id } => {
            store.set_subtask_completed(SubtaskId(id), true)?;
            report_subtask(store, SubtaskId(id), "completed", output, out)
        }
        SubtaskCommands::Undo { id } => {
            store.set_subtask_completed(SubtaskId(id), false)?;
            report_subtask(store, SubtaskId(id), "reopened", output, out)
        }
        SubtaskCommands::Rm { id } => {
            let Some(subtask) = store.remove_subtask(SubtaskId(id)) else {
                bail!("subtask not found: {id}");
            };
            match output {
                Output::Json => emit_json(out, &subtask),
                Output::Text => {
                    writeln!(out, "removed subtask #{} {}", subtask.id(), subtask.title())?;
                    Ok(())
                }
            }
        }
    }
}

fn tag_from(args: TagArgs) -> anyhow::Result<Option<Tag>> {
    match (args.tag_name, args.tag_color) {
        (Some(name), Some(color)) => Ok(Some(Tag::new(name, color, args.tag_icon)?)),
        (None, None) => Ok(None),
        _ => bail!("--tag-name and --tag-color must be given together"),
    }
}

fn find_task(store: &TaskStore, id: TaskId) -> anyhow::Result<&Task> {
    store
        .get_task_by_id(id)
        .with_context(|| format!("task not found: {id}"))
}

fn report_task(
    store: &TaskStore,
    id: TaskId,
    verb: &str,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let task = find_task(store, id)?;
    match output {
        Output::Json => emit_json(out, task),
        Output::Text => {
            writeln!(out, "{verb} {}", summary_line(task))?;
            Ok(())
        }
    }
}

fn report_subtask(
    store: &TaskStore,
    id: SubtaskId,
    verb: &str,
    output: Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let subtask = store
        .find_subtask(id)
        .with_context(|| format!("subtask not found: {id}"))?;
    match output {
        Output::Json => emit_json(out, subtask),
        Output::Text => {
            writeln!(out, "{verb} {}", subtask_line(subtask))?;
            Ok(())
        }
    }
}

fn summary_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] #{} {}  due {}  heat {}",
        check_mark(task.is_completed()),
        task.id(),
        task.title(),
        format_millis(task.expected_end_time()),
        task.heat_index()
    );
    let (done, total) = task.subtask_progress();
    if total > 0 {
        line.push_str(&format!("  ({done}/{total})"));
    }
    if let Some(tag) = task.tag() {
        line.push_str(&format!("  <{}>", tag.name()));
    }
    line
}

fn subtask_line(subtask: &Subtask) -> String {
    let mut line = format!(
        "[{}] #{} {}",
        check_mark(subtask.is_completed()),
        subtask.id(),
        subtask.title()
    );
    if let Some(description) = subtask.description() {
        line.push_str(&format!(" - {}", description.replace('\n', " ")));
    }
    line
}

fn check_mark(completed: bool) -> char {
    if completed {
        'x'
    } else {
        ' '
    }
}

fn emit_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
