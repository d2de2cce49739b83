use anyhow::anyhow;
use tracing::{debug, info, instrument};

use crate::category::{PERMITTED_CATEGORIES, is_permitted};
use crate::cli::Command;
use crate::config::Config;
use crate::datetime::parse_iso_date;
use crate::query::{
    CategoryFilter, QueryParams, SortKey, SortOrder, StatusFilter, derive_view,
    distinct_categories,
};
use crate::render::Renderer;
use crate::store::{Slot, TaskBook};
use crate::task::{Priority, TaskItem};

#[instrument(skip(book, cfg, renderer, command))]
pub fn dispatch<S: Slot>(
    book: &mut TaskBook<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Add {
            title,
            due,
            priority,
            category,
        } => cmd_add(book, title, due, priority, category),
        Command::List {
            search,
            status,
            category,
            sort,
            order,
        } => cmd_list(book, cfg, renderer, search, status, category, sort, order),
        Command::Edit {
            id,
            title,
            due,
            priority,
            category,
        } => cmd_edit(book, &id, title, due, priority, category),
        Command::Toggle { id } => cmd_toggle(book, &id),
        Command::Delete { id } => cmd_delete(book, &id),
        Command::Categories => cmd_categories(book),
    }
}

/// Form-boundary checks: the core assumes well-formed items on save, so
/// title and category are validated here.
fn validate_title(title: &str) -> anyhow::Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("title must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_category(label: &str) -> anyhow::Result<String> {
    if !is_permitted(label) {
        return Err(anyhow!(
            "unknown category {label:?} (permitted: {})",
            PERMITTED_CATEGORIES.join(", ")
        ));
    }
    Ok(label.to_string())
}

#[instrument(skip(book, title, due, priority, category))]
fn cmd_add<S: Slot>(
    book: &mut TaskBook<S>,
    title: String,
    due: Option<String>,
    priority: Option<Priority>,
    category: String,
) -> anyhow::Result<()> {
    info!("command add");

    let mut item = TaskItem::new(validate_title(&title)?, validate_category(&category)?);
    if let Some(raw) = due {
        item.due_date = Some(parse_iso_date(&raw)?);
    }
    if let Some(priority) = priority {
        item.priority = priority;
    }

    let id = item.id.clone();
    book.save(item);
    debug!(count = book.items().len(), "task added");
    println!("Created task {id}.");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip_all)]
fn cmd_list<S: Slot>(
    book: &mut TaskBook<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    search: Option<String>,
    status: Option<StatusFilter>,
    category: Option<String>,
    sort: Option<SortKey>,
    order: Option<SortOrder>,
) -> anyhow::Result<()> {
    info!("command list");

    let params = QueryParams {
        search: search.unwrap_or_default(),
        status: status.unwrap_or_default(),
        category: match category {
            None => CategoryFilter::All,
            Some(label) if label.eq_ignore_ascii_case("all") => CategoryFilter::All,
            Some(label) => CategoryFilter::Only(label),
        },
        sort_key: match sort {
            Some(key) => key,
            None => configured_sort_key(cfg)?,
        },
        order: match order {
            Some(order) => order,
            None => configured_sort_order(cfg)?,
        },
    };

    let view = derive_view(book.items(), &params);
    if view.is_empty() {
        println!("No tasks match your criteria.");
        return Ok(());
    }

    renderer.print_task_table(&view)
}

#[instrument(skip(book, title, due, priority, category))]
fn cmd_edit<S: Slot>(
    book: &mut TaskBook<S>,
    id: &str,
    title: Option<String>,
    due: Option<String>,
    priority: Option<Priority>,
    category: Option<String>,
) -> anyhow::Result<()> {
    info!("command edit");

    let Some(existing) = book.find(id) else {
        println!("No task with id {id}; nothing to edit.");
        return Ok(());
    };
    let mut item = existing.clone();

    if let Some(title) = title {
        item.title = validate_title(&title)?;
    }
    if let Some(raw) = due {
        item.due_date = if raw.trim().is_empty() {
            None
        } else {
            Some(parse_iso_date(&raw)?)
        };
    }
    if let Some(priority) = priority {
        item.priority = priority;
    }
    if let Some(label) = category {
        item.category = validate_category(&label)?;
    }

    book.save(item);
    println!("Updated task {id}.");
    Ok(())
}

#[instrument(skip(book))]
fn cmd_toggle<S: Slot>(book: &mut TaskBook<S>, id: &str) -> anyhow::Result<()> {
    info!("command toggle");

    if book.toggle(id) {
        let completed = book.find(id).map(|item| item.completed).unwrap_or(false);
        let state = if completed { "completed" } else { "pending" };
        println!("Task {id} is now {state}.");
    } else {
        println!("No task with id {id}; nothing to toggle.");
    }
    Ok(())
}

#[instrument(skip(book))]
fn cmd_delete<S: Slot>(book: &mut TaskBook<S>, id: &str) -> anyhow::Result<()> {
    info!("command delete");

    if book.delete(id) {
        println!("Deleted task {id}.");
    } else {
        println!("No task with id {id}; nothing to delete.");
    }
    Ok(())
}

#[instrument(skip(book))]
fn cmd_categories<S: Slot>(book: &mut TaskBook<S>) -> anyhow::Result<()> {
    info!("command categories");

    println!("Permitted: {}", PERMITTED_CATEGORIES.join(", "));
    let used = distinct_categories(book.items());
    if used.is_empty() {
        println!("In use:    (none)");
    } else {
        println!("In use:    {}", used.join(", "));
    }
    Ok(())
}

fn configured_sort_key(cfg: &Config) -> anyhow::Result<SortKey> {
    match cfg.get("default.sort") {
        Some(raw) => raw.parse(),
        None => Ok(SortKey::DueDate),
    }
}

fn configured_sort_order(cfg: &Config) -> anyhow::Result<SortOrder> {
    match cfg.get("default.order") {
        Some(raw) => raw.parse(),
        None => Ok(SortOrder::Asc),
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_category, validate_title};

    #[test]
    fn blank_titles_are_rejected_at_the_form_boundary() {
        assert!(validate_title("  ").is_err());
        assert_eq!(validate_title(" Buy milk ").expect("valid"), "Buy milk");
    }

    #[test]
    fn categories_outside_the_permitted_list_are_rejected() {
        assert!(validate_category("Chores").is_err());
        assert_eq!(validate_category("Work").expect("valid"), "Work");
    }
}
