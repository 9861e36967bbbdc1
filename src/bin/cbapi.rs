//! codeBeamer API CLI binary.
//!
//! A command-line interface for browsing and editing a codeBeamer server.

use cbapi::cli::{Cli, Command, Entity, Listing};
use cbapi::output::PrettyPrint;
use cbapi::{
    timestamp, CbError, Codebeamer, Field, FieldDefinition, FieldInput, FieldKind, Lookup, Project,
    Tracker, TrackerItem, User, DEFAULT_PAGE_SIZE,
};
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tabled::{Table, Tabled};
use tracing::Level;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let cb = match Codebeamer::from_env() {
        Ok(cb) => cb,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set CODEBEAMER_URL, CODEBEAMER_USERNAME and CODEBEAMER_PASSWORD");
            return ExitCode::FAILURE;
        }
    };

    match run(&cb, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cb: &Codebeamer, cli: Cli) -> cbapi::Result<()> {
    match cli.command {
        Command::Get { entity, id } => handle_get(cb, entity, id, cli.json).await,
        Command::List {
            entity,
            project,
            tracker,
            item,
            page,
            page_size,
        } => {
            let scope = Scope { project, tracker, item };
            let page = page.unwrap_or(1);
            let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
            handle_list(cb, entity, scope, page, page_size, cli.json).await
        }
        Command::Query { cbql, page, page_size } => {
            let items = cb
                .query_items(&cbql, page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
                .await?;
            output_list(&items, cli.json, |item| ItemRow::from(item))
        }
        Command::SetField { item, field, value } => {
            handle_set_field(cb, item, &field, &value, cli.json).await
        }
    }
}

struct Scope {
    project: Option<i64>,
    tracker: Option<i64>,
    item: Option<i64>,
}

fn not_found(entity_type: &'static str, id: impl ToString) -> CbError {
    CbError::NotFound {
        entity_type,
        id: id.to_string(),
    }
}

fn required(value: Option<i64>, flag: &str, listing: &str) -> cbapi::Result<i64> {
    value.ok_or_else(|| CbError::ConfigMissing(format!("--{flag} is required for listing {listing}")))
}

/// Numeric arguments address by id, anything else by name.
fn lookup_of(value: &str) -> Lookup {
    value
        .parse::<i64>()
        .map(Lookup::Id)
        .unwrap_or_else(|_| Lookup::from(value))
}

async fn handle_get(cb: &Codebeamer, entity: Entity, id: i64, json: bool) -> cbapi::Result<()> {
    match entity {
        Entity::Project => {
            let project = cb.get_project(id).await?.ok_or_else(|| not_found("project", id))?;
            project.load().await?;
            output_single(&project, json)
        }
        Entity::Tracker => {
            let tracker = cb.get_tracker(id).await?.ok_or_else(|| not_found("tracker", id))?;
            tracker.load().await?;
            output_single(&tracker, json)
        }
        Entity::Item => {
            let item = cb.get_item(id).await?.ok_or_else(|| not_found("item", id))?;
            item.load().await?;
            output_single(&item, json)
        }
        Entity::User => {
            let user = cb.get_user(id).await?.ok_or_else(|| not_found("user", id))?;
            user.load().await?;
            output_single(&user, json)
        }
    }
}

async fn handle_list(
    cb: &Codebeamer,
    entity: Listing,
    scope: Scope,
    page: u32,
    page_size: u32,
    json: bool,
) -> cbapi::Result<()> {
    match entity {
        Listing::Projects => {
            let projects = cb.get_projects().await?;
            output_list(&projects, json, |project| ProjectRow::from(project))
        }
        Listing::Trackers => {
            let id = required(scope.project, "project", "trackers")?;
            let project = cb.get_project(id).await?.ok_or_else(|| not_found("project", id))?;
            let trackers = project.get_trackers().await?;
            output_list(&trackers, json, |tracker| TrackerRow::from(tracker))
        }
        Listing::Items => {
            let id = required(scope.tracker, "tracker", "items")?;
            let tracker = cb.get_tracker(id).await?.ok_or_else(|| not_found("tracker", id))?;
            let items = tracker.get_items(page, page_size).await?;
            output_list(&items, json, |item| ItemRow::from(item))
        }
        Listing::Children => {
            let id = required(scope.item, "item", "children")?;
            let mut item = cb.get_item(id).await?.ok_or_else(|| not_found("item", id))?;
            let children = item.get_children(page, page_size).await?;
            output_list(&children, json, |item| ItemRow::from(item))
        }
        Listing::Fields => {
            let id = required(scope.tracker, "tracker", "fields")?;
            let tracker = cb.get_tracker(id).await?.ok_or_else(|| not_found("tracker", id))?;
            let fields = tracker.get_fields().await?;
            output_list(&fields, json, |field| FieldRow::from(field))
        }
        Listing::Users => {
            let users = cb.get_users(page, page_size).await?;
            output_list(&users, json, |user| UserRow::from(user))
        }
    }
}

async fn handle_set_field(
    cb: &Codebeamer,
    item_id: i64,
    field: &str,
    value: &str,
    json: bool,
) -> cbapi::Result<()> {
    let mut item = cb.get_item(item_id).await?.ok_or_else(|| not_found("item", item_id))?;
    let lookup = lookup_of(field);

    let input = {
        let target = item
            .field(lookup.clone())
            .await?
            .ok_or_else(|| not_found("field", &lookup))?;
        parse_input(target, value).await?
    };
    item.update_field(lookup.clone(), input).await?;

    let updated = item
        .field(lookup.clone())
        .await?
        .ok_or_else(|| not_found("field", &lookup))?;
    if json {
        println!("{}", serde_json::to_string_pretty(updated)?);
    } else {
        println!("Item #{}: {} = {}", item.id(), updated.name(), updated.value());
    }
    Ok(())
}

/// Interpret a command-line string according to the field's kind.
async fn parse_input(field: &Field, value: &str) -> cbapi::Result<FieldInput> {
    match field.kind() {
        Some(FieldKind::Integer) => value
            .parse::<i64>()
            .map(FieldInput::from)
            .map_err(|_| CbError::TypeMismatch {
                expected: "integer",
                found: "text",
            }),
        Some(FieldKind::Date) => timestamp::parse(value).map(FieldInput::from),
        Some(FieldKind::Choice) => {
            let choice = field
                .choice(lookup_of(value))
                .await?
                .ok_or_else(|| CbError::InvalidChoice {
                    field: field.name().to_string(),
                    choice: value.to_string(),
                })?;
            Ok(FieldInput::from(choice))
        }
        _ => Ok(FieldInput::from(value)),
    }
}

fn output_single<T: Serialize + PrettyPrint>(entity: &T, json: bool) -> cbapi::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entity)?);
    } else {
        println!("{}", entity.pretty_print());
    }
    Ok(())
}

fn output_list<T, R, F>(items: &[T], json: bool, to_row: F) -> cbapi::Result<()>
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        println!("{}", Table::new(rows));
        println!("\n{} item(s)", items.len());
    }
    Ok(())
}

// Table row types for non-JSON output

#[derive(Tabled)]
struct ProjectRow {
    id: i64,
    name: String,
}

impl From<&Project> for ProjectRow {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id(),
            name: p.name().to_string(),
        }
    }
}

#[derive(Tabled)]
struct TrackerRow {
    id: i64,
    name: String,
}

impl From<&Tracker> for TrackerRow {
    fn from(t: &Tracker) -> Self {
        Self {
            id: t.id(),
            name: t.name().to_string(),
        }
    }
}

#[derive(Tabled)]
struct ItemRow {
    id: i64,
    name: String,
    status: String,
}

impl From<&TrackerItem> for ItemRow {
    fn from(i: &TrackerItem) -> Self {
        Self {
            id: i.id(),
            name: i.name().to_string(),
            status: i
                .cached_detail()
                .and_then(|d| d.status.as_ref())
                .map(|s| s.value().to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    id: i64,
    name: String,
}

impl From<&FieldDefinition> for FieldRow {
    fn from(f: &FieldDefinition) -> Self {
        Self {
            id: f.id(),
            name: f.name().to_string(),
        }
    }
}

#[derive(Tabled)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id(),
            name: u.name().to_string(),
            email: u.email().unwrap_or_default().to_string(),
        }
    }
}
