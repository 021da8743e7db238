use std::fmt::Write as _;
use std::io::{self, Read as _};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::{SaveOutcome, Session};
use crate::config::AppConfig;
use crate::document::{Document, RemarkId, ALL_CATEGORY};
use crate::search::{self, FilterSpec, TagMode};

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Category view to show (defaults to "All")
    #[arg()]
    pub category: Option<String>,
    /// Case-insensitive substring to match against remark text
    #[arg(long, short = 'q')]
    pub query: Option<String>,
    /// Only show remarks carrying this tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Match remarks carrying any selected tag instead of all of them
    #[arg(long)]
    pub any_tag: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Remark text. If omitted, reads from stdin.
    #[arg()]
    pub text: Option<String>,
    /// Category to add into (created if missing; defaults to "Uncategorized")
    #[arg(long, short = 'c')]
    pub category: Option<String>,
    /// Tag to attach (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Category view holding the remark
    pub category: String,
    /// 1-based position of the remark within that view
    pub index: usize,
    /// Replacement text (unchanged if omitted)
    #[arg(long)]
    pub text: Option<String>,
    /// Move the remark to this category (created if missing)
    #[arg(long)]
    pub move_to: Option<String>,
    /// Replace the tag set with these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Remove every tag from the remark
    #[arg(long)]
    pub clear_tags: bool,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Category view holding the remarks
    pub category: String,
    /// 1-based positions within that view
    #[arg(required = true)]
    pub indices: Vec<usize>,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    /// Category to clear ("All" removes every remark but keeps categories)
    #[arg()]
    pub category: Option<String>,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Create an empty category
    Add(CategoryAddArgs),
    /// Rename a category, keeping its position and remarks
    Rename(CategoryRenameArgs),
    /// Move a category to another display position
    Move(CategoryMoveArgs),
    /// Delete a category and every remark it owns
    Remove(CategoryRemoveArgs),
    /// List categories with their display positions and remark counts
    List,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryAddArgs {
    /// Name of the new category
    pub name: String,
    /// Display position (1 = right after "All"; defaults to just before
    /// "Uncategorized")
    #[arg(long)]
    pub position: Option<usize>,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryRenameArgs {
    /// Existing category name
    pub from: String,
    /// New category name
    pub to: String,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryMoveArgs {
    /// Category to move
    pub name: String,
    /// New display position (1 = right after "All")
    pub position: usize,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryRemoveArgs {
    /// Category to delete
    pub name: String,
    /// Confirm a text save that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TagsArgs {
    /// Category view to collect tags from (defaults to "All")
    #[arg()]
    pub category: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Where to create the empty document (.txt or .json)
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Existing document to read
    pub source: PathBuf,
    /// Destination path; its extension picks the output format
    pub dest: PathBuf,
    /// Confirm a text destination that drops categories or tags
    #[arg(long)]
    pub allow_lossy: bool,
}

pub fn list(session: &Session, config: &AppConfig, args: &ListArgs) -> Result<String> {
    let category = view_name(session.document(), args.category.as_deref())?;
    let mode = if args.any_tag || config.match_any_tag {
        TagMode::Any
    } else {
        TagMode::All
    };
    let spec = FilterSpec::new(
        args.query.clone().unwrap_or_default(),
        args.tags.clone(),
        mode,
    );

    let view = session.document().remarks_in(&category);
    let shown: Vec<_> = view
        .iter()
        .enumerate()
        .filter(|(_, remark)| search::visible(remark, &spec))
        .collect();
    if shown.is_empty() {
        return Ok(format!("No matching remarks in '{category}'.\n"));
    }

    let mut out = String::new();
    let _ = writeln!(
        &mut out,
        "{}: showing {} of {} remark(s)",
        category,
        shown.len(),
        view.len()
    );
    for (position, remark) in shown {
        let _ = writeln!(&mut out, "{:>3}. {}", position + 1, remark.text);
        if !remark.tags.is_empty() {
            let tags: Vec<_> = remark.tags.iter().cloned().collect();
            let _ = writeln!(&mut out, "     tags {}", format_tags(&tags));
        }
    }
    Ok(out)
}

pub fn add(session: &mut Session, args: &AddArgs) -> Result<String> {
    let text = match &args.text {
        Some(text) => text.clone(),
        // Piped input carries its trailing newline; the remark should not.
        None => read_stdin()?
            .context("no remark text given and stdin is a terminal")?
            .trim()
            .to_string(),
    };
    let category = args.category.clone().unwrap_or_default();
    let Some(id) = session
        .document_mut()
        .add_remark(&text, &category, &args.tags)
    else {
        bail!("remark text cannot be empty");
    };
    let category = match session.document().get(id) {
        Some(remark) => remark.category.clone(),
        None => category,
    };
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!("Added remark to '{category}'. {saved}"))
}

pub fn edit(session: &mut Session, args: &EditArgs) -> Result<String> {
    let id = resolve_remark(session.document(), &args.category, args.index)?;
    let (current_text, current_category, current_tags) = match session.document().get(id) {
        Some(remark) => (
            remark.text.clone(),
            remark.category.clone(),
            remark.tags.iter().cloned().collect::<Vec<_>>(),
        ),
        None => bail!("no remark #{} in '{}'", args.index, args.category),
    };

    let text = args.text.clone().unwrap_or(current_text);
    let category = args.move_to.clone().unwrap_or(current_category);
    let tags = if args.clear_tags {
        Vec::new()
    } else if !args.tags.is_empty() {
        args.tags.clone()
    } else {
        current_tags
    };

    if !session.document_mut().edit_remark(id, &text, &category, &tags) {
        bail!("remark text cannot be empty");
    }
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!(
        "Updated remark #{} in '{}'. {saved}",
        args.index, args.category
    ))
}

pub fn remove(session: &mut Session, args: &RemoveArgs) -> Result<String> {
    let ids: Vec<RemarkId> = args
        .indices
        .iter()
        .map(|index| resolve_remark(session.document(), &args.category, *index))
        .collect::<Result<_>>()?;
    let removed = session.document_mut().remove_remarks(&ids);
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!(
        "Removed {removed} remark(s) from '{}'. {saved}",
        args.category
    ))
}

pub fn clear(session: &mut Session, args: &ClearArgs) -> Result<String> {
    let category = view_name(session.document(), args.category.as_deref())?;
    let cleared = session.document_mut().clear_category(&category);
    if cleared == 0 {
        return Ok(format!("'{category}' is already empty."));
    }
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!(
        "Cleared {cleared} remark(s) from '{category}'. {saved}"
    ))
}

pub fn category(session: &mut Session, args: &CategoryArgs) -> Result<String> {
    match &args.command {
        CategoryCommand::Add(args) => category_add(session, args),
        CategoryCommand::Rename(args) => category_rename(session, args),
        CategoryCommand::Move(args) => category_move(session, args),
        CategoryCommand::Remove(args) => category_remove(session, args),
        CategoryCommand::List => Ok(category_list(session.document())),
    }
}

pub fn tags(session: &Session, args: &TagsArgs) -> Result<String> {
    let category = view_name(session.document(), args.category.as_deref())?;
    let tags = session.document().tags_for(&category);
    if tags.is_empty() {
        return Ok(format!("No tags in '{category}'.\n"));
    }
    let mut out = String::new();
    let _ = writeln!(&mut out, "Tags in '{category}':");
    for tag in tags {
        let _ = writeln!(&mut out, "- {tag}");
    }
    Ok(out)
}

pub fn new_document(args: &NewArgs) -> Result<String> {
    if args.path.exists() {
        bail!("{} already exists", args.path.display());
    }
    let mut session = Session::new();
    match session.save_as(&args.path)? {
        SaveOutcome::Saved { message, .. } => Ok(message),
        SaveOutcome::PathRequired | SaveOutcome::LossyConfirmationRequired => {
            bail!("could not create {}", args.path.display())
        }
    }
}

pub fn convert(args: &ConvertArgs) -> Result<String> {
    let mut session = Session::new();
    session
        .open(&args.source)
        .with_context(|| format!("opening {}", args.source.display()))?;
    let count = session.document().remark_count();
    let outcome = if args.allow_lossy {
        session.save_as_allow_lossy(&args.dest)?
    } else {
        session.save_as(&args.dest)?
    };
    match outcome {
        SaveOutcome::Saved { .. } => Ok(format!(
            "Converted {count} remark(s) from {} to {}.",
            args.source.display(),
            args.dest.display()
        )),
        SaveOutcome::LossyConfirmationRequired => {
            bail!("converting to text would drop categories or tags; pass --allow-lossy to confirm")
        }
        SaveOutcome::PathRequired => bail!("destination path is required"),
    }
}

fn category_add(session: &mut Session, args: &CategoryAddArgs) -> Result<String> {
    let position = args.position.unwrap_or(usize::MAX);
    if !session.document_mut().add_category(&args.name, position) {
        bail!(
            "category '{}' already exists or the name is reserved",
            args.name
        );
    }
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!("Added category '{}'. {saved}", args.name))
}

fn category_rename(session: &mut Session, args: &CategoryRenameArgs) -> Result<String> {
    if !session.document_mut().rename_category(&args.from, &args.to) {
        bail!(
            "cannot rename '{}' to '{}' (missing, protected, or name taken)",
            args.from,
            args.to
        );
    }
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!(
        "Renamed category '{}' to '{}'. {saved}",
        args.from, args.to
    ))
}

fn category_move(session: &mut Session, args: &CategoryMoveArgs) -> Result<String> {
    if !session.document_mut().move_category(&args.name, args.position) {
        bail!("cannot move '{}' (missing or protected)", args.name);
    }
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!("Moved category '{}'. {saved}", args.name))
}

fn category_remove(session: &mut Session, args: &CategoryRemoveArgs) -> Result<String> {
    if !session.document_mut().remove_category(&args.name) {
        bail!("cannot remove '{}' (missing or protected)", args.name);
    }
    let saved = persist(session, args.allow_lossy)?;
    Ok(format!(
        "Removed category '{}' and its remarks. {saved}",
        args.name
    ))
}

fn category_list(document: &Document) -> String {
    let mut out = String::new();
    for (position, name) in document.category_names().iter().enumerate() {
        let count = document.remarks_in(name).len();
        let _ = writeln!(&mut out, "{position:>2}  {name} ({count})");
    }
    out
}

/// Maps an omitted category argument to the aggregate view and rejects names
/// the document does not know.
fn view_name(document: &Document, category: Option<&str>) -> Result<String> {
    let name = category.unwrap_or(ALL_CATEGORY);
    if !document.contains_category(name) {
        bail!("no category named '{name}'");
    }
    Ok(name.to_string())
}

fn resolve_remark(document: &Document, category: &str, index: usize) -> Result<RemarkId> {
    if !document.contains_category(category) {
        bail!("no category named '{category}'");
    }
    let view = document.remarks_in(category);
    if index == 0 || index > view.len() {
        bail!(
            "no remark #{index} in '{category}' ({} remark(s))",
            view.len()
        );
    }
    Ok(view[index - 1].id)
}

fn persist(session: &mut Session, allow_lossy: bool) -> Result<String> {
    let outcome = if allow_lossy {
        session.save_allow_lossy()?
    } else {
        session.save()?
    };
    match outcome {
        SaveOutcome::Saved { message, .. } => Ok(message),
        SaveOutcome::PathRequired => bail!("document has no file yet; create one with 'new <path>'"),
        SaveOutcome::LossyConfirmationRequired => {
            bail!("saving as text would drop categories or tags; pass --allow-lossy to confirm")
        }
    }
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ")
}
