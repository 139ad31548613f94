use clap::Parser;
use memoweave::cli::{
    handle_add, handle_ai_checklist, handle_ai_complete, handle_ai_grammar, handle_ai_note,
    handle_ai_paste, handle_ai_pin, handle_ai_plan, handle_ai_speak, handle_ai_summarize,
    handle_ai_tags, handle_ai_template, handle_ai_title, handle_ai_transcribe, handle_ai_translate,
    handle_archive, handle_board_move, handle_board_show, handle_calendar, handle_delete,
    handle_get, handle_history, handle_init, handle_list, handle_pin, handle_plans_archive,
    handle_plans_delete, handle_plans_list, handle_prefs_delete, handle_prefs_get,
    handle_prefs_list, handle_prefs_set, handle_restore, handle_search, handle_stats,
    handle_templates_apply, handle_templates_delete, handle_templates_list, handle_templates_save,
    handle_templates_show, handle_todos_list, handle_todos_toggle, handle_trash, handle_update,
    AiAction, BoardAction, Cli, Commands, PlansAction, PrefsAction, TemplatesAction, TodosAction,
};
use tracing_subscriber::EnvFilter;

fn main() {
    // Logging is opt-in: MEMOWEAVE_LOG=debug etc. Default keeps stderr
    // quiet apart from warnings.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MEMOWEAVE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Add {
            title,
            content,
            stdin,
            tags,
            color,
            status,
            priority,
            due,
            start,
            end,
            pin,
            draft,
            template,
            items,
            json,
        } => handle_add(
            title, content, stdin, tags, color, status, priority, due, start, end, pin, draft,
            template, items, json,
        ),
        Commands::List {
            query,
            archived,
            trash,
            sort,
            json,
        } => handle_list(query, archived, trash, sort, json),
        Commands::Get { id, json } => handle_get(id, json),
        Commands::Update {
            id,
            title,
            content,
            stdin,
            tags,
            clear_tags,
            color,
            status,
            priority,
            due,
            clear_due,
            start,
            end,
            clear_times,
            order,
            show_on_board,
            json,
        } => handle_update(
            id,
            title,
            content,
            stdin,
            tags,
            clear_tags,
            color,
            status,
            priority,
            due,
            clear_due,
            start,
            end,
            clear_times,
            order,
            show_on_board,
            json,
        ),
        Commands::Trash { id } => handle_trash(id),
        Commands::Restore { id } => handle_restore(id),
        Commands::Archive { id } => handle_archive(id),
        Commands::Pin { id, remove } => handle_pin(id, remove),
        Commands::Delete { id, force } => handle_delete(id, force),
        Commands::Board(board_cmd) => match board_cmd.action {
            BoardAction::Show {
                group_by,
                search,
                json,
            } => handle_board_show(group_by, search, json),
            BoardAction::Move {
                id,
                group,
                status,
                onto,
                group_by,
                json,
            } => handle_board_move(id, group, status, onto, group_by, json),
        },
        Commands::Calendar { month, day, json } => handle_calendar(month, day, json),
        Commands::Plans(plans_cmd) => match plans_cmd.action {
            PlansAction::List { json } => handle_plans_list(json),
            PlansAction::Archive { id } => handle_plans_archive(id),
            PlansAction::Delete { id, force } => handle_plans_delete(id, force),
        },
        Commands::Todos(todos_cmd) => match todos_cmd.action {
            TodosAction::List { all, json } => handle_todos_list(all, json),
            TodosAction::Toggle { note, item } => handle_todos_toggle(note, item),
        },
        Commands::Templates(templates_cmd) => match templates_cmd.action {
            TemplatesAction::List { json } => handle_templates_list(json),
            TemplatesAction::Show { name, json } => handle_templates_show(name, json),
            TemplatesAction::Apply { name, json } => handle_templates_apply(name, json),
            TemplatesAction::Save {
                name,
                title,
                content,
                tags,
                color,
                items,
            } => handle_templates_save(name, title, content, tags, color, items),
            TemplatesAction::Delete { name } => handle_templates_delete(name),
        },
        Commands::Search { query, json } => handle_search(query, json),
        Commands::History { id, revert, json } => handle_history(id, revert, json),
        Commands::Prefs(prefs_cmd) => match prefs_cmd.action {
            PrefsAction::List => handle_prefs_list(),
            PrefsAction::Get { key } => handle_prefs_get(key),
            PrefsAction::Set { key, value } => handle_prefs_set(key, value),
            PrefsAction::Delete { key } => handle_prefs_delete(key),
        },
        Commands::Stats { json } => handle_stats(json),
        Commands::Ai(ai_cmd) => match ai_cmd.action {
            AiAction::Title { id, apply, json } => handle_ai_title(id, apply, json),
            AiAction::Summarize { id, json } => handle_ai_summarize(id, json),
            AiAction::Tags { id, apply, json } => handle_ai_tags(id, apply, json),
            AiAction::Grammar {
                text,
                stdin,
                language,
                json,
            } => handle_ai_grammar(text, stdin, language, json),
            AiAction::Complete { text, stdin, json } => handle_ai_complete(text, stdin, json),
            AiAction::Translate {
                language,
                text,
                stdin,
                json,
            } => handle_ai_translate(language, text, stdin, json),
            AiAction::Checklist { id, apply, json } => handle_ai_checklist(id, apply, json),
            AiAction::Paste { text, stdin, json } => handle_ai_paste(text, stdin, json),
            AiAction::Template {
                description,
                save,
                json,
            } => handle_ai_template(description, save, json),
            AiAction::Plan {
                goal,
                milestones,
                language,
                dry_run,
                json,
            } => handle_ai_plan(goal, milestones, language, dry_run, json),
            AiAction::Note { prompt, json } => handle_ai_note(prompt, json),
            AiAction::Transcribe { uri, stdin, json } => handle_ai_transcribe(uri, stdin, json),
            AiAction::Speak { text, out } => handle_ai_speak(text, out),
            AiAction::Pin { id, json } => handle_ai_pin(id, json),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
