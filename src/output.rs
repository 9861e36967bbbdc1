//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization. Only attributes that are
//! already loaded are printed; nothing here touches the network.

use crate::timestamp::Timestamp;
use crate::{Project, Tracker, TrackerItem, User};

/// Trait for human-readable key-value output.
///
/// Implemented by entity types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

fn header(kind: &str, id: i64, name: &str) -> Vec<String> {
    let title = format!("{kind} #{id}: {name}");
    let divider = "─".repeat(title.chars().count().max(30));
    vec![title, divider]
}

fn stamp(value: &Timestamp) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

impl PrettyPrint for Project {
    fn pretty_print(&self) -> String {
        let mut lines = header("Project", self.id(), self.name());

        if let Some(detail) = self.cached_detail() {
            if let Some(ref key) = detail.key_name {
                lines.push(format!("Key:            {}", key));
            }
            if let Some(ref category) = detail.category {
                lines.push(format!("Category:       {}", category));
            }
            if let Some(ref created) = detail.created_at {
                let by = detail.created_by.as_ref().map(User::name).unwrap_or("?");
                lines.push(format!("Created:        {} by {}", stamp(created), by));
            }
            if detail.closed == Some(true) {
                lines.push("State:          closed".to_string());
            }
            if let Some(ref description) = detail.description {
                lines.push(format!("Description:    {}", description));
            }
        }

        lines.join("\n")
    }
}

impl PrettyPrint for Tracker {
    fn pretty_print(&self) -> String {
        let mut lines = header("Tracker", self.id(), self.name());

        if let Some(detail) = self.cached_detail() {
            if let Some(ref key) = detail.key_name {
                lines.push(format!("Key:            {}", key));
            }
            if let Some(kind) = detail
                .tracker_type
                .as_ref()
                .and_then(|t| t.get("name"))
                .and_then(|n| n.as_str())
            {
                lines.push(format!("Type:           {}", kind));
            }
            if let Some(ref project) = detail.project {
                lines.push(format!("Project:        {} (#{})", project.name(), project.id()));
            }
            if let Some(workflow) = detail.using_workflow {
                lines.push(format!("Workflow:       {}", if workflow { "yes" } else { "no" }));
            }
            if let Some(ref description) = detail.description {
                lines.push(format!("Description:    {}", description));
            }
        }

        lines.join("\n")
    }
}

impl PrettyPrint for TrackerItem {
    fn pretty_print(&self) -> String {
        let mut lines = header("Item", self.id(), self.name());

        if let Some(detail) = self.cached_detail() {
            if let Some(ref tracker) = detail.tracker {
                lines.push(format!("Tracker:        {} (#{})", tracker.name(), tracker.id()));
            }
            if let Some(ref status) = detail.status {
                lines.push(format!("Status:         {}", status.value()));
            }
            if let Some(ref priority) = detail.priority {
                lines.push(format!("Priority:       {}", priority.value()));
            }
            if !detail.assigned_to.is_empty() {
                let names: Vec<&str> = detail.assigned_to.iter().map(User::name).collect();
                lines.push(format!("Assigned to:    {}", names.join(", ")));
            }
            if let Some(points) = detail.story_points {
                lines.push(format!("Story points:   {}", points));
            }
            if let Some(ref modified) = detail.modified_at {
                lines.push(format!("Modified:       {}", stamp(modified)));
            }
            for field in &detail.custom_fields {
                if !field.value().is_empty() {
                    lines.push(format!("{:<15} {}", format!("{}:", field.name()), field.value()));
                }
            }
            if !detail.children.is_empty() {
                lines.push(format!("Children:       {}", detail.children.len()));
            }
        }

        lines.join("\n")
    }
}

impl PrettyPrint for User {
    fn pretty_print(&self) -> String {
        let mut lines = header("User", self.id(), self.name());

        if let Some(email) = self.email() {
            lines.push(format!("Email:          {}", email));
        }

        if let Some(detail) = self.cached_detail() {
            let full_name = [detail.first_name.as_deref(), detail.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if !full_name.is_empty() {
                lines.push(format!("Name:           {}", full_name));
            }
            if let Some(ref company) = detail.company {
                lines.push(format!("Company:        {}", company));
            }
            if let Some(ref status) = detail.status {
                lines.push(format!("Status:         {}", status));
            }
            if let Some(ref last_login) = detail.last_login_date {
                lines.push(format!("Last login:     {}", stamp(last_login)));
            }
        }

        lines.join("\n")
    }
}
