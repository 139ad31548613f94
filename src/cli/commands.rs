use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "memoweave")]
#[command(version, about = "A local-first notes engine with board, calendar and AI flows")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new memoweave workspace in the current directory
    Init,

    /// Add a new note
    Add {
        /// Note title
        title: String,

        /// Note content (Markdown)
        #[arg(long, short = 'c')]
        content: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Tags in order; the first becomes the primary tag (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Card color
        #[arg(long)]
        color: Option<String>,

        /// Status (todo, in_progress, done)
        #[arg(long, default_value = "todo")]
        status: String,

        /// Priority (none, low, medium, high)
        #[arg(long, default_value = "none")]
        priority: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Start time of day (HH:MM)
        #[arg(long)]
        start: Option<String>,

        /// End time of day (HH:MM)
        #[arg(long)]
        end: Option<String>,

        /// Pin the note
        #[arg(long)]
        pin: bool,

        /// Mark as draft
        #[arg(long)]
        draft: bool,

        /// Start from a template (built-in or saved)
        #[arg(long)]
        template: Option<String>,

        /// Checklist items (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes
    List {
        /// Free text plus filter tokens (status:, priority:, tag:,
        /// color:, is:, due:<, due:>)
        query: Vec<String>,

        /// List archived notes instead of active ones
        #[arg(long, conflicts_with = "trash")]
        archived: bool,

        /// List trashed notes
        #[arg(long)]
        trash: bool,

        /// Sort key (updated, created, title, priority, due)
        #[arg(long, default_value = "updated")]
        sort: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Get {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update fields on a note
    Update {
        /// Note ID (UUID or unique prefix)
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, short = 'c')]
        content: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Replace the full tag list (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Remove every tag
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,

        #[arg(long)]
        color: Option<String>,

        /// Status (todo, in_progress, done)
        #[arg(long)]
        status: Option<String>,

        /// Priority (none, low, medium, high)
        #[arg(long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// Start time of day (HH:MM)
        #[arg(long)]
        start: Option<String>,

        /// End time of day (HH:MM)
        #[arg(long)]
        end: Option<String>,

        /// Remove start and end times
        #[arg(long, conflicts_with_all = ["start", "end"])]
        clear_times: bool,

        /// Manual board position
        #[arg(long)]
        order: Option<i64>,

        /// Whether the note appears on the board (true/false)
        #[arg(long)]
        show_on_board: Option<bool>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a note to the trash
    Trash {
        /// Note ID (UUID or unique prefix)
        id: String,
    },

    /// Restore a note from the trash or archive
    Restore {
        /// Note ID (UUID or unique prefix)
        id: String,
    },

    /// Archive a note
    Archive {
        /// Note ID (UUID or unique prefix)
        id: String,
    },

    /// Pin a note to the top of lists
    Pin {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Remove the pin instead
        #[arg(long)]
        remove: bool,
    },

    /// Permanently delete a note
    Delete {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Kanban board projections and moves
    Board(BoardCommand),

    /// Dated notes, grouped by day
    Calendar {
        /// Restrict to one month (YYYY-MM)
        #[arg(long, conflicts_with = "day")]
        month: Option<String>,

        /// Show a single day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plans generated from goals
    Plans(PlansCommand),

    /// Checklist items across all notes
    Todos(TodosCommand),

    /// Note templates
    Templates(TemplatesCommand),

    /// Full-text search backed by the local cache
    Search {
        /// FTS query
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Revision history of a note
    History {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Restore the numbered revision (1 = most recent)
        #[arg(long)]
        revert: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stored preferences
    Prefs(PrefsCommand),

    /// Usage counters and achievements
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// AI-assisted flows
    Ai(AiCommand),
}

#[derive(Args, Debug)]
pub struct BoardCommand {
    #[command(subcommand)]
    pub action: BoardAction,
}

#[derive(Subcommand, Debug)]
pub enum BoardAction {
    /// Render the board
    Show {
        /// Grouping mode (none, tag, priority)
        #[arg(long = "group-by", default_value = "none")]
        group_by: String,

        /// Narrow the board to matching notes
        #[arg(long)]
        search: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a note, as a drag would
    Move {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Destination group key
        #[arg(long, requires = "status")]
        group: Option<String>,

        /// Destination status (todo, in_progress, done)
        #[arg(long, requires = "group")]
        status: Option<String>,

        /// Drop onto another note, taking its position
        #[arg(long, conflicts_with_all = ["group", "status"])]
        onto: Option<String>,

        /// Grouping mode the move happens under (none, tag, priority)
        #[arg(long = "group-by", default_value = "none")]
        group_by: String,

        /// Output the persisted board as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct PlansCommand {
    #[command(subcommand)]
    pub action: PlansAction,
}

#[derive(Subcommand, Debug)]
pub enum PlansAction {
    /// List plans with completion counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Archive every note in a plan
    Archive {
        /// Plan ID (UUID or unique prefix)
        id: String,
    },

    /// Delete every note in a plan
    Delete {
        /// Plan ID (UUID or unique prefix)
        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct TodosCommand {
    #[command(subcommand)]
    pub action: TodosAction,
}

#[derive(Subcommand, Debug)]
pub enum TodosAction {
    /// List open checklist items across notes
    List {
        /// Include completed items
        #[arg(long)]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle one checklist item
    Toggle {
        /// Note ID (UUID or unique prefix)
        note: String,

        /// Item number (1-based) or item ID prefix
        item: String,
    },
}

#[derive(Args, Debug)]
pub struct TemplatesCommand {
    #[command(subcommand)]
    pub action: TemplatesAction,
}

#[derive(Subcommand, Debug)]
pub enum TemplatesAction {
    /// List built-in and saved templates
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one template
    Show {
        /// Template name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a note from a template
    Apply {
        /// Template name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save a custom template
    Save {
        /// Template name (lowercase, digits, hyphens)
        name: String,

        /// Title, may contain {{date}} / {{time}}
        #[arg(long)]
        title: String,

        /// Content, may contain {{date}} / {{time}}
        #[arg(long, default_value = "")]
        content: String,

        /// Tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Card color
        #[arg(long)]
        color: Option<String>,

        /// Checklist items (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
    },

    /// Delete a custom template
    Delete {
        /// Template name
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct PrefsCommand {
    #[command(subcommand)]
    pub action: PrefsAction,
}

#[derive(Subcommand, Debug)]
pub enum PrefsAction {
    /// List stored preference keys
    List,

    /// Print one preference blob
    Get {
        /// Preference key
        key: String,
    },

    /// Store a preference blob
    Set {
        /// Preference key (lowercase, digits, hyphens)
        key: String,

        /// JSON value
        value: String,
    },

    /// Remove a preference
    Delete {
        /// Preference key
        key: String,
    },
}

#[derive(Args, Debug)]
pub struct AiCommand {
    #[command(subcommand)]
    pub action: AiAction,
}

#[derive(Subcommand, Debug)]
pub enum AiAction {
    /// Suggest a title for a note
    Title {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Write the suggestion to the note
        #[arg(long)]
        apply: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a note
    Summarize {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Suggest tags for a note
    Tags {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Replace the note's tags with the suggestion
        #[arg(long)]
        apply: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fix spelling and grammar
    Grammar {
        /// Text to correct; use --stdin for longer input
        text: Option<String>,

        /// Read the text from stdin
        #[arg(long)]
        stdin: bool,

        /// Language of the text (defaults to the configured language)
        #[arg(long)]
        language: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Continue partially written text
    Complete {
        /// Text to continue; use --stdin for longer input
        text: Option<String>,

        /// Read the text from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Translate text
    Translate {
        /// Target language
        language: String,

        /// Text to translate; use --stdin for longer input
        text: Option<String>,

        /// Read the text from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract checklist items from a note's content
    Checklist {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Append the extracted items to the note's checklist
        #[arg(long)]
        apply: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Turn pasted text into a structured note
    Paste {
        /// Pasted text; use --stdin to pipe it in
        text: Option<String>,

        /// Read the text from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a note template from a description
    Template {
        /// What the template is for
        description: String,

        /// Save the template to the catalog
        #[arg(long)]
        save: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Break a goal into dated milestone notes
    Plan {
        /// The goal to plan
        goal: String,

        /// Number of milestones (2 to 12)
        #[arg(long)]
        milestones: Option<u32>,

        /// Language for milestone text
        #[arg(long)]
        language: Option<String>,

        /// Print the plan without writing notes
        #[arg(long = "dry-run")]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a complete note from a prompt
    Note {
        /// What the note should cover
        prompt: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transcribe audio from a base64 data URI
    Transcribe {
        /// data:audio/...;base64,... URI; use --stdin to pipe it in
        uri: Option<String>,

        /// Read the URI from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Speak text as a WAV data URI
    Speak {
        /// Text to speak
        text: String,

        /// Write the data URI to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Produce the note's deterministic content pin
    Pin {
        /// Note ID (UUID or unique prefix)
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
