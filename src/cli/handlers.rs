use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::cache::SqliteCache;
use crate::config::Config;
use crate::error::{MemoWeaveError, Result};
use crate::flows::{
    self, run_with_retry, ChecklistFlow, CompleteFlow, Flow, GoalPlanFlow, GrammarFlow,
    HttpBackend, LanguageInput, NoteFromPromptFlow, PlanInput, SmartPasteFlow, SummarizeFlow,
    TagsFlow, TemplateFlow, TextInput, TextOutput, TitleFlow, TranslateFlow,
};
use crate::gamify::{self, GamifyEvent};
use crate::note::{ChecklistItem, Note, NotePriority, NoteRevision, NoteStatus};
use crate::notify::{format_notice, MemoryNotifier, Notice};
use crate::prefs::PrefsStore;
use crate::storage::{find_workspace_root, NoteStore, NoteUpdate};
use crate::views::{
    archive_plan, build_board, build_calendar, builtin_templates, day_view, delete_plan,
    find_template, group_plans, month_view, project_list, project_todos, toggle_item,
    BoardSession, CalendarDay, DropTarget, GroupBy, ListOptions, ListScope, ListSort,
    NoteTemplate, PlanGroup,
};

/// Prefs key holding the user's custom templates.
const TEMPLATES_KEY: &str = "templates";

fn open_store() -> Result<NoteStore> {
    let root = find_workspace_root();
    NoteStore::open(&root)
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn gather_input(value: Option<String>, stdin: bool, what: &str) -> Result<String> {
    if stdin {
        return read_stdin();
    }
    value.ok_or_else(|| MemoWeaveError::InvalidOperation(format!("pass {} or use --stdin", what)))
}

fn parse_status(raw: &str) -> Result<NoteStatus> {
    raw.parse()
        .map_err(|_| MemoWeaveError::invalid("status", raw))
}

fn parse_priority(raw: &str) -> Result<NotePriority> {
    raw.parse()
        .map_err(|_| MemoWeaveError::invalid("priority", raw))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| MemoWeaveError::invalid("date", raw))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| MemoWeaveError::invalid("time", raw))
}

fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d")
        .map_err(|_| MemoWeaveError::invalid("month", raw))?;
    Ok((first.year(), first.month()))
}

/// Bump a usage counter; stats failures never fail the command. Unlock
/// notices go to stderr so JSON output stays parseable.
fn record_activity(store: &NoteStore, event: GamifyEvent) {
    let notifier = MemoryNotifier::new();
    let result = PrefsStore::open(store.data_dir())
        .and_then(|prefs| gamify::record(&prefs, &notifier, event));
    if let Err(e) = result {
        eprintln!("Warning: could not update stats: {}", e);
    }
    for notice in notifier.drain() {
        eprintln!("{}", format_notice(&notice));
    }
}

/// Built-ins plus the custom templates stored in prefs. A custom
/// template with a built-in's name shadows it.
fn all_templates(store: &NoteStore) -> Result<Vec<NoteTemplate>> {
    let prefs = PrefsStore::open(store.data_dir())?;
    let custom: Vec<NoteTemplate> = prefs.get(TEMPLATES_KEY)?.unwrap_or_default();
    let mut templates = builtin_templates();
    for template in custom {
        templates.retain(|t| !t.name.eq_ignore_ascii_case(&template.name));
        templates.push(template);
    }
    Ok(templates)
}

fn save_custom_template(prefs: &PrefsStore, template: NoteTemplate) -> Result<String> {
    let name = template.name.clone();
    let mut custom: Vec<NoteTemplate> = prefs.get(TEMPLATES_KEY)?.unwrap_or_default();
    custom.retain(|t| !t.name.eq_ignore_ascii_case(&name));
    custom.push(template);
    custom.sort_by(|a, b| a.name.cmp(&b.name));
    prefs.set(TEMPLATES_KEY, &custom)?;
    Ok(name)
}

/// The history entry preserving a note's current text, ready to store
/// alongside an edit that replaces it.
fn history_with_current(note: &Note) -> Vec<NoteRevision> {
    let mut with_revision = note.clone();
    with_revision.record_revision(NoteRevision {
        title: note.title.clone(),
        content: note.content.clone(),
        updated_at: note.updated_at,
    });
    with_revision.history
}

fn status_glyph(status: NoteStatus) -> &'static str {
    match status {
        NoteStatus::Todo => "[ ]",
        NoteStatus::InProgress => "[~]",
        NoteStatus::Done => "[x]",
    }
}

fn note_line(note: &Note) -> String {
    let mut line = format!(
        "{} ({}) {}",
        status_glyph(note.status),
        &note.id.to_string()[..7],
        note.title
    );
    if note.pinned {
        line.push_str(" *");
    }
    if note.priority != NotePriority::None {
        line.push_str(&format!(" !{}", note.priority));
    }
    if let Some(due) = note.due_date {
        line.push_str(&format!(" due {}", due));
    }
    let (done, total) = note.checklist_progress();
    if total > 0 {
        line.push_str(&format!(" [{}/{}]", done, total));
    }
    line
}

fn print_note(note: &Note) {
    println!("{} ({})", note.title, note.id);
    println!(
        "  status: {}  priority: {}  color: {}",
        note.status, note.priority, note.color
    );
    if !note.tags.is_empty() {
        println!("  tags: {}", note.tags.join(", "));
    }
    if let Some(due) = note.due_date {
        match (note.start_time, note.end_time) {
            (Some(start), Some(end)) => println!(
                "  due: {} {}-{}",
                due,
                start.format("%H:%M"),
                end.format("%H:%M")
            ),
            (Some(start), None) => println!("  due: {} {}", due, start.format("%H:%M")),
            _ => println!("  due: {}", due),
        }
    }
    let mut flags = Vec::new();
    if note.pinned {
        flags.push("pinned");
    }
    if note.draft {
        flags.push("draft");
    }
    if note.archived {
        flags.push("archived");
    }
    if note.trashed {
        flags.push("trashed");
    }
    if !note.show_on_board {
        flags.push("off-board");
    }
    if !flags.is_empty() {
        println!("  flags: {}", flags.join(", "));
    }
    if let Some(goal) = &note.plan_goal {
        println!("  plan: {}", goal);
    }
    if !note.checklist.is_empty() {
        let (done, total) = note.checklist_progress();
        println!("  checklist ({}/{}):", done, total);
        for item in &note.checklist {
            let mark = if item.completed { "[x]" } else { "[ ]" };
            println!("    {} {} ({})", mark, item.text, &item.id.to_string()[..7]);
        }
    }
    println!("  updated: {}", note.updated_at.format("%Y-%m-%d %H:%M"));
    if !note.history.is_empty() {
        println!("  revisions: {}", note.history.len());
    }
    if !note.content.is_empty() {
        println!("\n{}", note.content);
    }
}

// ========== Workspace and core note commands ==========

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;

    let _store = NoteStore::init(&root)?;

    println!("Initialized memoweave workspace in {}", root.display());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_add(
    title: String,
    content: Option<String>,
    stdin: bool,
    tags: Vec<String>,
    color: Option<String>,
    status: String,
    priority: String,
    due: Option<String>,
    start: Option<String>,
    end: Option<String>,
    pin: bool,
    draft: bool,
    template: Option<String>,
    items: Vec<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;

    let mut note = match template {
        Some(name) => {
            let catalog = all_templates(&store)?;
            let template = find_template(&catalog, &name)
                .ok_or_else(|| MemoWeaveError::invalid("template", name.clone()))?;
            let mut note = template.instantiate();
            // The explicit title wins over the template's.
            note.title = title;
            note
        }
        None => Note::new(title),
    };

    if let Some(content) = content {
        note.content = content;
    }
    if stdin {
        note.content = read_stdin()?;
    }
    if !tags.is_empty() {
        note.tags = tags;
    }
    if let Some(color) = color {
        note.color = color;
    }
    note.status = parse_status(&status)?;
    note.priority = parse_priority(&priority)?;
    if let Some(due) = due {
        note.due_date = Some(parse_date(&due)?);
    }
    if let Some(start) = start {
        note.start_time = Some(parse_time(&start)?);
    }
    if let Some(end) = end {
        note.end_time = Some(parse_time(&end)?);
    }
    note.pinned = pin;
    note.draft = draft;
    for text in items {
        note.checklist.push(ChecklistItem::new(text));
    }
    note.order = store.next_order()?;

    store.add_note(&note)?;
    store.save()?;
    record_activity(&store, GamifyEvent::NoteCreated);

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!(
            "Created note ({}) - {}",
            &note.id.to_string()[..7],
            note.title
        );
    }

    Ok(())
}

pub fn handle_list(
    query: Vec<String>,
    archived: bool,
    trash: bool,
    sort: String,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let notes = store.list_notes()?;

    let scope = if trash {
        ListScope::Trash
    } else if archived {
        ListScope::Archived
    } else {
        ListScope::Active
    };
    let sort: ListSort = sort
        .parse()
        .map_err(|_| MemoWeaveError::invalid("sort", sort))?;
    let options = ListOptions {
        scope,
        sort,
        query: if query.is_empty() {
            None
        } else {
            Some(query.join(" "))
        },
    };

    let today = Local::now().date_naive();
    let shown = project_list(&notes, &options, today);

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else if shown.is_empty() {
        println!("No notes found.");
    } else {
        for note in &shown {
            println!("{}", note_line(note));
        }
    }

    Ok(())
}

pub fn handle_get(id: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print_note(&note);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_update(
    id: String,
    title: Option<String>,
    content: Option<String>,
    stdin: bool,
    tags: Vec<String>,
    clear_tags: bool,
    color: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    due: Option<String>,
    clear_due: bool,
    start: Option<String>,
    end: Option<String>,
    clear_times: bool,
    order: Option<i64>,
    show_on_board: Option<bool>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let previous = store.resolve_note(&id)?;

    let content = if stdin { Some(read_stdin()?) } else { content };

    // An edit that changes the text keeps the old text in history.
    let text_changed = title.as_deref().is_some_and(|t| t != previous.title)
        || content.as_deref().is_some_and(|c| c != previous.content);

    let mut update = NoteUpdate {
        title,
        content,
        color,
        order,
        show_on_board,
        ..Default::default()
    };
    if text_changed {
        update.history = Some(history_with_current(&previous));
    }
    if clear_tags {
        update.tags = Some(Vec::new());
    } else if !tags.is_empty() {
        update.tags = Some(tags);
    }
    if let Some(status) = status {
        update.status = Some(parse_status(&status)?);
    }
    if let Some(priority) = priority {
        update.priority = Some(parse_priority(&priority)?);
    }
    if clear_due {
        update.due_date = Some(None);
    } else if let Some(due) = due {
        update.due_date = Some(Some(parse_date(&due)?));
    }
    if clear_times {
        update.start_time = Some(None);
        update.end_time = Some(None);
    } else {
        if let Some(start) = start {
            update.start_time = Some(Some(parse_time(&start)?));
        }
        if let Some(end) = end {
            update.end_time = Some(Some(parse_time(&end)?));
        }
    }

    store.update_note(&previous.id, update)?;
    store.save()?;

    let updated = store
        .get_note(&previous.id)?
        .ok_or(MemoWeaveError::NoteNotFound(id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!(
            "Updated note ({}) - {}",
            &updated.id.to_string()[..7],
            updated.title
        );
    }

    Ok(())
}

pub fn handle_trash(id: String) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    store.update_note(
        &note.id,
        NoteUpdate {
            trashed: Some(true),
            ..Default::default()
        },
    )?;
    store.save()?;

    println!("{}", format_notice(&Notice::NoteTrashed { title: note.title }));

    Ok(())
}

pub fn handle_restore(id: String) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    store.update_note(
        &note.id,
        NoteUpdate {
            trashed: Some(false),
            archived: Some(false),
            ..Default::default()
        },
    )?;
    store.save()?;

    println!(
        "Restored note ({}) - {}",
        &note.id.to_string()[..7],
        note.title
    );

    Ok(())
}

pub fn handle_archive(id: String) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    // Archiving unpins, same as archiving a whole plan.
    store.update_note(
        &note.id,
        NoteUpdate {
            archived: Some(true),
            pinned: Some(false),
            ..Default::default()
        },
    )?;
    store.save()?;

    println!(
        "Archived note ({}) - {}",
        &note.id.to_string()[..7],
        note.title
    );

    Ok(())
}

pub fn handle_pin(id: String, remove: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    store.update_note(
        &note.id,
        NoteUpdate {
            pinned: Some(!remove),
            ..Default::default()
        },
    )?;
    store.save()?;

    let verb = if remove { "Unpinned" } else { "Pinned" };
    println!(
        "{} note ({}) - {}",
        verb,
        &note.id.to_string()[..7],
        note.title
    );

    Ok(())
}

pub fn handle_delete(id: String, force: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    // Confirm deletion unless --force is used
    if !force {
        eprintln!(
            "Delete note ({}) - {}? [y/N] ",
            &note.id.to_string()[..7],
            note.title
        );

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(MemoWeaveError::InvalidOperation(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    store.remove_note(&note.id)?;
    store.save()?;

    println!(
        "Deleted note ({}) - {}",
        &note.id.to_string()[..7],
        note.title
    );

    Ok(())
}

// ========== Board ==========

pub fn handle_board_show(group_by: String, search: Option<String>, json: bool) -> Result<()> {
    let store = open_store()?;
    let notes = store.list_notes()?;

    let group_by: GroupBy = group_by
        .parse()
        .map_err(|_| MemoWeaveError::invalid("group-by", group_by))?;
    let board = build_board(&notes, group_by, search.as_deref());

    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }
    if board.note_count() == 0 {
        println!("Board is empty.");
        return Ok(());
    }

    for group in board.groups() {
        if group_by != GroupBy::None {
            println!("## {}", group);
        }
        for status in NoteStatus::ALL {
            let Some(column) = board.column(group, status) else {
                continue;
            };
            println!("  {} ({})", status, column.notes.len());
            for note in &column.notes {
                println!("    {}", note_line(note));
            }
        }
    }

    Ok(())
}

pub fn handle_board_move(
    id: String,
    group: Option<String>,
    status: Option<String>,
    onto: Option<String>,
    group_by: String,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    let group_by: GroupBy = group_by
        .parse()
        .map_err(|_| MemoWeaveError::invalid("group-by", group_by))?;
    let target = match (onto, group, status) {
        (Some(onto), _, _) => DropTarget::Note(store.resolve_note(&onto)?.id),
        (None, Some(group), Some(status)) => DropTarget::Column {
            group,
            status: parse_status(&status)?,
        },
        _ => {
            return Err(MemoWeaveError::InvalidOperation(
                "pass --onto NOTE, or --group KEY with --status STATUS".to_string(),
            ))
        }
    };

    let mut session = BoardSession::new(group_by, store.list_notes()?);
    session.drag_start(note.id)?;

    if let Some(batch) = session.drag_end(Some(target))? {
        let outcome = store.apply_batch(batch).and_then(|_| store.save());
        session.settle();
        if let Err(e) = outcome {
            eprintln!(
                "{}",
                format_notice(&Notice::BatchFailed {
                    context: "board move".to_string(),
                    message: e.to_string(),
                })
            );
            return Ok(());
        }
    }

    if json {
        let board = build_board(&store.list_notes()?, group_by, None);
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        println!(
            "Moved note ({}) - {}",
            &note.id.to_string()[..7],
            note.title
        );
    }

    Ok(())
}

// ========== Calendar, plans and todos ==========

fn print_calendar_day(day: &CalendarDay) {
    println!("{}", day.date.format("%Y-%m-%d (%a)"));
    for note in &day.all_day {
        println!("  all-day     {}", note_line(note));
    }
    for entry in &day.timed {
        println!(
            "  {:02}:{:02}-{:02}:{:02} lane {}  ({}) {}",
            entry.start_minute / 60,
            entry.start_minute % 60,
            entry.end_minute / 60,
            entry.end_minute % 60,
            entry.lane,
            &entry.note.id.to_string()[..7],
            entry.note.title
        );
    }
}

pub fn handle_calendar(month: Option<String>, day: Option<String>, json: bool) -> Result<()> {
    let store = open_store()?;
    let notes = store.list_notes()?;

    if let Some(day) = day {
        let view = day_view(&notes, parse_date(&day)?);
        if json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else if view.all_day.is_empty() && view.timed.is_empty() {
            println!("Nothing scheduled on {}.", view.date);
        } else {
            print_calendar_day(&view);
        }
        return Ok(());
    }

    let days = match month {
        Some(month) => {
            let (year, month) = parse_month(&month)?;
            month_view(&notes, year, month)
        }
        None => build_calendar(&notes),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&days)?);
    } else if days.is_empty() {
        println!("No dated notes.");
    } else {
        for day in &days {
            print_calendar_day(day);
        }
    }

    Ok(())
}

fn resolve_plan(groups: Vec<PlanGroup>, needle: &str) -> Result<PlanGroup> {
    if let Ok(id) = needle.parse::<Uuid>() {
        return groups
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| MemoWeaveError::InvalidOperation(format!("No plan matches '{}'", needle)));
    }

    let mut matches: Vec<PlanGroup> = groups
        .into_iter()
        .filter(|g| g.id.to_string().starts_with(needle))
        .collect();
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(MemoWeaveError::InvalidOperation(format!(
            "No plan matches '{}'",
            needle
        ))),
        n => Err(MemoWeaveError::InvalidOperation(format!(
            "Plan id prefix '{}' matches {} plans",
            needle, n
        ))),
    }
}

pub fn handle_plans_list(json: bool) -> Result<()> {
    let store = open_store()?;
    let groups = group_plans(&store.list_notes()?);

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else if groups.is_empty() {
        println!("No plans.");
    } else {
        for group in &groups {
            let goal = group.goal.as_deref().unwrap_or("(no goal)");
            println!(
                "({}) {} [{}/{}]",
                &group.id.to_string()[..7],
                goal,
                group.done,
                group.total
            );
            for note in &group.notes {
                println!("  {}", note_line(note));
            }
        }
    }

    Ok(())
}

pub fn handle_plans_archive(id: String) -> Result<()> {
    let store = open_store()?;
    let group = resolve_plan(group_plans(&store.list_notes()?), &id)?;
    let goal = group.goal.clone().unwrap_or_else(|| "(no goal)".to_string());
    let count = group.notes.len();

    store.apply_batch(archive_plan(&group))?;
    store.save()?;

    println!("{}", format_notice(&Notice::PlanArchived { goal, count }));

    Ok(())
}

pub fn handle_plans_delete(id: String, force: bool) -> Result<()> {
    let store = open_store()?;
    let group = resolve_plan(group_plans(&store.list_notes()?), &id)?;
    let goal = group.goal.clone().unwrap_or_else(|| "(no goal)".to_string());
    let count = group.notes.len();

    if !force {
        eprintln!("Delete plan '{}' and its {} notes? [y/N] ", goal, count);

        if atty::is(atty::Stream::Stdin) {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(MemoWeaveError::InvalidOperation(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    store.apply_batch(delete_plan(&group))?;
    store.save()?;

    println!("Deleted plan '{}' ({} notes)", goal, count);

    Ok(())
}

pub fn handle_todos_list(all: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let mut entries = project_todos(&store.list_notes()?);
    if !all {
        entries.retain(|e| !e.item.completed);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No open checklist items.");
    } else {
        for entry in &entries {
            let mark = if entry.item.completed { "[x]" } else { "[ ]" };
            println!(
                "{} {}  ({}) {}",
                mark,
                entry.item.text,
                &entry.note_id.to_string()[..7],
                entry.note_title
            );
        }
    }

    Ok(())
}

pub fn handle_todos_toggle(note: String, item: String) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&note)?;

    // The item argument is a 1-based position or an item id prefix.
    let item_id = match item.parse::<usize>() {
        Ok(index) => note
            .checklist
            .get(index.wrapping_sub(1))
            .map(|i| i.id)
            .ok_or_else(|| MemoWeaveError::invalid("item", item))?,
        Err(_) => {
            let matches: Vec<Uuid> = note
                .checklist
                .iter()
                .filter(|i| i.id.to_string().starts_with(&item))
                .map(|i| i.id)
                .collect();
            match matches.len() {
                1 => matches[0],
                0 => return Err(MemoWeaveError::invalid("item", item)),
                n => return Err(MemoWeaveError::AmbiguousId(item, n)),
            }
        }
    };

    let notifier = MemoryNotifier::new();
    let updated = toggle_item(&store, &notifier, &note.id, &item_id)?;
    store.save()?;

    let notices = notifier.drain();
    let finished = notices
        .iter()
        .any(|n| matches!(n, Notice::ChecklistCompleted { .. }));
    for notice in &notices {
        println!("{}", format_notice(notice));
    }
    if finished {
        record_activity(&store, GamifyEvent::ChecklistCompleted);
    }

    if let Some(toggled) = updated.checklist.iter().find(|i| i.id == item_id) {
        let mark = if toggled.completed { "[x]" } else { "[ ]" };
        println!("{} {}", mark, toggled.text);
    }

    Ok(())
}

// ========== Templates ==========

pub fn handle_templates_list(json: bool) -> Result<()> {
    let store = open_store()?;
    let templates = all_templates(&store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
    } else {
        for template in &templates {
            println!("{} - {}", template.name, template.title);
        }
    }

    Ok(())
}

pub fn handle_templates_show(name: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let templates = all_templates(&store)?;
    let template =
        find_template(&templates, &name).ok_or_else(|| MemoWeaveError::invalid("template", name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(template)?);
    } else {
        println!("{}", template.name);
        println!("  title: {}", template.title);
        if !template.tags.is_empty() {
            println!("  tags: {}", template.tags.join(", "));
        }
        if let Some(color) = &template.color {
            println!("  color: {}", color);
        }
        for item in &template.checklist {
            println!("  [ ] {}", item);
        }
        if !template.content.is_empty() {
            println!("\n{}", template.content);
        }
    }

    Ok(())
}

pub fn handle_templates_apply(name: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let templates = all_templates(&store)?;
    let template =
        find_template(&templates, &name).ok_or_else(|| MemoWeaveError::invalid("template", name))?;

    let mut note = template.instantiate();
    note.order = store.next_order()?;

    store.add_note(&note)?;
    store.save()?;
    record_activity(&store, GamifyEvent::NoteCreated);

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!(
            "Created note ({}) - {}",
            &note.id.to_string()[..7],
            note.title
        );
    }

    Ok(())
}

pub fn handle_templates_save(
    name: String,
    title: String,
    content: String,
    tags: Vec<String>,
    color: Option<String>,
    items: Vec<String>,
) -> Result<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(MemoWeaveError::invalid("template name", name));
    }

    let store = open_store()?;
    let prefs = PrefsStore::open(store.data_dir())?;

    let saved = save_custom_template(
        &prefs,
        NoteTemplate {
            name,
            title,
            content,
            tags,
            color,
            checklist: items,
        },
    )?;

    println!("Saved template '{}'", saved);

    Ok(())
}

pub fn handle_templates_delete(name: String) -> Result<()> {
    let store = open_store()?;
    let prefs = PrefsStore::open(store.data_dir())?;

    let mut custom: Vec<NoteTemplate> = prefs.get(TEMPLATES_KEY)?.unwrap_or_default();
    let before = custom.len();
    custom.retain(|t| !t.name.eq_ignore_ascii_case(&name));
    if custom.len() == before {
        return Err(MemoWeaveError::invalid("template", name));
    }
    prefs.set(TEMPLATES_KEY, &custom)?;

    println!("Deleted template '{}'", name);

    Ok(())
}

// ========== Search, history, prefs and stats ==========

pub fn handle_search(query: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let cache = SqliteCache::open(store.data_dir())?;

    // Sync cache with store
    store.sync_cache(&cache)?;

    let results = cache.search_notes(&query)?;

    if json {
        #[derive(serde::Serialize)]
        struct SearchResultJson {
            id: String,
            title: String,
            status: String,
            priority: String,
            snippet: Option<String>,
        }

        let json_results: Vec<SearchResultJson> = results
            .into_iter()
            .map(|r| SearchResultJson {
                id: r.id,
                title: r.title,
                status: r.status,
                priority: r.priority,
                snippet: r.content_snippet,
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    } else if results.is_empty() {
        println!("No results found for '{}'.", query);
    } else {
        println!("Search results for '{}':\n", query);
        for r in results {
            println!("  ({}) [{}] {}", &r.id[..7.min(r.id.len())], r.status, r.title);
            if let Some(snippet) = r.content_snippet {
                // Clean up FTS5 snippet
                let clean = snippet
                    .replace("<mark>", "\x1b[1m")
                    .replace("</mark>", "\x1b[0m");
                println!("      {}", clean);
            }
        }
    }

    Ok(())
}

pub fn handle_history(id: String, revert: Option<usize>, json: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    if let Some(index) = revert {
        let revision = note
            .history
            .get(index.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| MemoWeaveError::invalid("revision", index.to_string()))?;

        // The replaced text becomes a revision itself, so a revert can
        // itself be reverted.
        store.update_note(
            &note.id,
            NoteUpdate {
                title: Some(revision.title.clone()),
                content: Some(revision.content.clone()),
                history: Some(history_with_current(&note)),
                ..Default::default()
            },
        )?;
        store.save()?;

        println!(
            "Reverted note ({}) to revision {} - {}",
            &note.id.to_string()[..7],
            index,
            revision.title
        );
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&note.history)?);
    } else if note.history.is_empty() {
        println!(
            "No history for ({}) - {}",
            &note.id.to_string()[..7],
            note.title
        );
    } else {
        println!(
            "History for ({}) - {}:",
            &note.id.to_string()[..7],
            note.title
        );
        for (i, revision) in note.history.iter().enumerate() {
            println!(
                "{:>3}. {} - {}",
                i + 1,
                revision.updated_at.format("%Y-%m-%d %H:%M"),
                revision.title
            );
        }
    }

    Ok(())
}

pub fn handle_prefs_list() -> Result<()> {
    let store = open_store()?;
    let prefs = PrefsStore::open(store.data_dir())?;

    let keys = prefs.keys()?;
    if keys.is_empty() {
        println!("No preferences stored.");
    } else {
        for key in keys {
            println!("{}", key);
        }
    }

    Ok(())
}

pub fn handle_prefs_get(key: String) -> Result<()> {
    let store = open_store()?;
    let prefs = PrefsStore::open(store.data_dir())?;

    let value: Option<serde_json::Value> = prefs.get(&key)?;
    match value {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => println!("(not set)"),
    }

    Ok(())
}

pub fn handle_prefs_set(key: String, value: String) -> Result<()> {
    let store = open_store()?;
    let prefs = PrefsStore::open(store.data_dir())?;

    let value: serde_json::Value = serde_json::from_str(&value)?;
    prefs.set(&key, &value)?;

    println!("Set '{}'", key);

    Ok(())
}

pub fn handle_prefs_delete(key: String) -> Result<()> {
    let store = open_store()?;
    let prefs = PrefsStore::open(store.data_dir())?;

    if prefs.remove(&key)? {
        println!("Removed '{}'", key);
    } else {
        println!("'{}' was not set.", key);
    }

    Ok(())
}

pub fn handle_stats(json: bool) -> Result<()> {
    let store = open_store()?;
    let prefs = PrefsStore::open(store.data_dir())?;
    let state = gamify::load_state(&prefs)?;
    let notes = store.list_notes()?;

    let active = notes.iter().filter(|n| !n.archived && !n.trashed).count();
    let done = notes
        .iter()
        .filter(|n| !n.trashed && n.status == NoteStatus::Done)
        .count();

    if json {
        #[derive(serde::Serialize)]
        struct StatsJson {
            active_notes: usize,
            done_notes: usize,
            counters: gamify::GamifyState,
        }

        println!(
            "{}",
            serde_json::to_string_pretty(&StatsJson {
                active_notes: active,
                done_notes: done,
                counters: state,
            })?
        );
        return Ok(());
    }

    println!("Notes: {} active, {} done", active, done);
    println!(
        "Created: {}  Checklists finished: {}  Plans: {}  AI runs: {}",
        state.notes_created, state.checklists_completed, state.plans_created, state.flows_run
    );

    let catalog = gamify::achievement_catalog();
    let unlocked = catalog
        .iter()
        .filter(|a| state.unlocked.iter().any(|u| u == a.id))
        .count();
    println!("Achievements ({}/{}):", unlocked, catalog.len());
    for achievement in &catalog {
        let mark = if state.unlocked.iter().any(|u| u == achievement.id) {
            "[x]"
        } else {
            "[ ]"
        };
        println!("  {} {} - {}", mark, achievement.name, achievement.description);
    }

    Ok(())
}

// ========== AI commands ==========

/// Config, backend and runtime shared by every AI handler.
fn ai_context(store: &NoteStore) -> Result<(Config, HttpBackend, tokio::runtime::Runtime)> {
    let config = Config::load(store.data_dir())?;
    let backend = HttpBackend::new(config.ai.clone());
    let runtime = tokio::runtime::Runtime::new()?;
    Ok((config, backend, runtime))
}

fn run_flow<F>(
    runtime: &tokio::runtime::Runtime,
    config: &Config,
    backend: &HttpBackend,
    flow: &F,
    input: F::Input,
) -> Result<F::Output>
where
    F: Flow,
    F::Input: Clone,
{
    runtime.block_on(run_with_retry(
        flow,
        backend,
        input,
        config.ai.retry_attempts,
        Duration::from_millis(config.ai.retry_base_delay_ms),
    ))
}

fn print_text_output(output: &TextOutput, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(output)?);
    } else {
        println!("{}", output.text);
    }
    Ok(())
}

pub fn handle_ai_title(id: String, apply: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;
    let (config, backend, runtime) = ai_context(&store)?;

    let output = run_flow(
        &runtime,
        &config,
        &backend,
        &TitleFlow,
        TextInput {
            text: note.content.clone(),
        },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    if apply {
        store.update_note(
            &note.id,
            NoteUpdate {
                title: Some(output.title.clone()),
                history: Some(history_with_current(&note)),
                ..Default::default()
            },
        )?;
        store.save()?;
        println!(
            "Renamed note ({}) - {}",
            &note.id.to_string()[..7],
            output.title
        );
    } else if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", output.title);
    }

    Ok(())
}

pub fn handle_ai_summarize(id: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;
    let (config, backend, runtime) = ai_context(&store)?;

    let output = run_flow(
        &runtime,
        &config,
        &backend,
        &SummarizeFlow,
        TextInput { text: note.content },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", output.summary);
    }

    Ok(())
}

pub fn handle_ai_tags(id: String, apply: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;
    let (config, backend, runtime) = ai_context(&store)?;

    let text = format!("{}\n\n{}", note.title, note.content);
    let output = run_flow(&runtime, &config, &backend, &TagsFlow, TextInput { text })?;
    record_activity(&store, GamifyEvent::FlowRun);

    if apply {
        store.update_note(
            &note.id,
            NoteUpdate {
                tags: Some(output.tags.clone()),
                ..Default::default()
            },
        )?;
        store.save()?;
        println!(
            "Tagged note ({}) - {}",
            &note.id.to_string()[..7],
            output.tags.join(", ")
        );
    } else if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", output.tags.join(", "));
    }

    Ok(())
}

pub fn handle_ai_grammar(
    text: Option<String>,
    stdin: bool,
    language: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;

    let text = gather_input(text, stdin, "TEXT")?;
    let language = language.unwrap_or_else(|| config.ai.language.clone());

    let output = run_flow(
        &runtime,
        &config,
        &backend,
        &GrammarFlow,
        LanguageInput { text, language },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    print_text_output(&output, json)
}

pub fn handle_ai_complete(text: Option<String>, stdin: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;

    let text = gather_input(text, stdin, "TEXT")?;
    let output = run_flow(&runtime, &config, &backend, &CompleteFlow, TextInput { text })?;
    record_activity(&store, GamifyEvent::FlowRun);

    print_text_output(&output, json)
}

pub fn handle_ai_translate(
    language: String,
    text: Option<String>,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;

    let text = gather_input(text, stdin, "TEXT")?;
    let output = run_flow(
        &runtime,
        &config,
        &backend,
        &TranslateFlow,
        LanguageInput { text, language },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    print_text_output(&output, json)
}

pub fn handle_ai_checklist(id: String, apply: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;
    let (config, backend, runtime) = ai_context(&store)?;

    let output = run_flow(
        &runtime,
        &config,
        &backend,
        &ChecklistFlow,
        TextInput {
            text: note.content.clone(),
        },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    if apply {
        let mut checklist = note.checklist.clone();
        for item in &output.items {
            checklist.push(ChecklistItem::new(item.clone()));
        }
        store.update_note(
            &note.id,
            NoteUpdate {
                checklist: Some(checklist),
                ..Default::default()
            },
        )?;
        store.save()?;
        println!(
            "Added {} item(s) to ({}) - {}",
            output.items.len(),
            &note.id.to_string()[..7],
            note.title
        );
    } else if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for item in &output.items {
            println!("[ ] {}", item);
        }
    }

    Ok(())
}

pub fn handle_ai_paste(text: Option<String>, stdin: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;

    let text = gather_input(text, stdin, "TEXT")?;
    let draft = run_flow(&runtime, &config, &backend, &SmartPasteFlow, TextInput { text })?;
    record_activity(&store, GamifyEvent::FlowRun);

    let mut note = draft.into_note();
    note.order = store.next_order()?;

    store.add_note(&note)?;
    store.save()?;
    record_activity(&store, GamifyEvent::NoteCreated);

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!(
            "Created note ({}) - {}",
            &note.id.to_string()[..7],
            note.title
        );
    }

    Ok(())
}

pub fn handle_ai_template(description: String, save: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;

    let generated = run_flow(
        &runtime,
        &config,
        &backend,
        &TemplateFlow,
        TextInput { text: description },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    let template = generated.into_template();

    if save {
        let prefs = PrefsStore::open(store.data_dir())?;
        let saved = save_custom_template(&prefs, template)?;
        println!("Saved template '{}'", saved);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&template)?);
    } else {
        println!("{}", template.name);
        println!("  title: {}", template.title);
        if !template.checklist.is_empty() {
            for item in &template.checklist {
                println!("  [ ] {}", item);
            }
        }
        if !template.content.is_empty() {
            println!("\n{}", template.content);
        }
    }

    Ok(())
}

pub fn handle_ai_plan(
    goal: String,
    milestones: Option<u32>,
    language: Option<String>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;
    let today = Local::now().date_naive();

    let output = run_flow(
        &runtime,
        &config,
        &backend,
        &GoalPlanFlow,
        PlanInput {
            goal: goal.clone(),
            language,
            milestone_count: milestones,
            today,
        },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    let due_dates = flows::remap_due_dates(&output.milestones, today)?;

    if dry_run {
        if json {
            #[derive(serde::Serialize)]
            struct PlanPreview<'a> {
                title: &'a str,
                description: &'a str,
                due_date: NaiveDate,
            }

            let preview: Vec<PlanPreview> = output
                .milestones
                .iter()
                .zip(&due_dates)
                .map(|(m, due)| PlanPreview {
                    title: &m.title,
                    description: &m.description,
                    due_date: *due,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            println!("Plan for '{}':", goal);
            for (milestone, due) in output.milestones.iter().zip(&due_dates) {
                println!("  {} - {}", due, milestone.title);
            }
        }
        return Ok(());
    }

    let notes = flows::materialize_plan(&store, &goal, &output.milestones, &due_dates)?;
    store.save()?;
    record_activity(&store, GamifyEvent::PlanCreated);

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        println!("Created plan '{}' with {} notes:", goal, notes.len());
        for note in &notes {
            println!("  {}", note_line(note));
        }
    }

    Ok(())
}

pub fn handle_ai_note(prompt: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;

    let draft = run_flow(
        &runtime,
        &config,
        &backend,
        &NoteFromPromptFlow,
        TextInput { text: prompt },
    )?;
    record_activity(&store, GamifyEvent::FlowRun);

    let mut note = draft.into_note();
    note.order = store.next_order()?;

    store.add_note(&note)?;
    store.save()?;
    record_activity(&store, GamifyEvent::NoteCreated);

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!(
            "Created note ({}) - {}",
            &note.id.to_string()[..7],
            note.title
        );
    }

    Ok(())
}

pub fn handle_ai_transcribe(uri: Option<String>, stdin: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let (_config, backend, runtime) = ai_context(&store)?;

    let uri = gather_input(uri, stdin, "a data URI")?;
    let transcript = runtime.block_on(flows::transcribe(&backend, uri.trim()))?;
    record_activity(&store, GamifyEvent::FlowRun);

    if json {
        #[derive(serde::Serialize)]
        struct TranscriptJson {
            text: String,
        }

        println!(
            "{}",
            serde_json::to_string_pretty(&TranscriptJson { text: transcript })?
        );
    } else {
        println!("{}", transcript);
    }

    Ok(())
}

pub fn handle_ai_speak(text: String, out: Option<PathBuf>) -> Result<()> {
    let store = open_store()?;
    let (config, backend, runtime) = ai_context(&store)?;

    let uri = runtime.block_on(flows::speak(&backend, &text, &config.ai.voice))?;
    record_activity(&store, GamifyEvent::FlowRun);

    match out {
        Some(path) => {
            fs::write(&path, &uri)?;
            println!("Wrote audio data URI to {}", path.display());
        }
        None => println!("{}", uri),
    }

    Ok(())
}

pub fn handle_ai_pin(id: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let note = store.resolve_note(&id)?;

    let pin = flows::pin_note(&note)?;

    if json {
        #[derive(serde::Serialize)]
        struct PinJson {
            id: String,
            pin: String,
        }

        println!(
            "{}",
            serde_json::to_string_pretty(&PinJson {
                id: note.id.to_string(),
                pin,
            })?
        );
    } else {
        println!("{}", pin);
    }

    Ok(())
}
