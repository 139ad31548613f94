mod commands;
mod handlers;

pub use commands::{
    AiAction, AiCommand, BoardAction, BoardCommand, Cli, Commands, PlansAction, PlansCommand,
    PrefsAction, PrefsCommand, TemplatesAction, TemplatesCommand, TodosAction, TodosCommand,
};
pub use handlers::{
    handle_add, handle_ai_checklist, handle_ai_complete, handle_ai_grammar, handle_ai_note,
    handle_ai_paste, handle_ai_pin, handle_ai_plan, handle_ai_speak, handle_ai_summarize,
    handle_ai_tags, handle_ai_template, handle_ai_title, handle_ai_transcribe, handle_ai_translate,
    handle_archive, handle_board_move, handle_board_show, handle_calendar, handle_delete,
    handle_get, handle_history, handle_init, handle_list, handle_pin, handle_plans_archive,
    handle_plans_delete, handle_plans_list, handle_prefs_delete, handle_prefs_get,
    handle_prefs_list, handle_prefs_set, handle_restore, handle_search, handle_stats,
    handle_templates_apply, handle_templates_delete, handle_templates_list, handle_templates_save,
    handle_templates_show, handle_todos_list, handle_todos_toggle, handle_trash, handle_update,
};
