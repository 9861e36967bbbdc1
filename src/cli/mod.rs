//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the cbapi binary.

use clap::{Parser, Subcommand, ValueEnum};

/// codeBeamer API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "cbapi", about = "codeBeamer API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Log HTTP requests and lazy loads to stderr.
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get a single entity by ID.
    Get {
        /// The type of entity to get.
        entity: Entity,

        /// The numeric ID of the entity.
        id: i64,
    },

    /// List entities, one page or all of them.
    List {
        /// The type of entity to list.
        entity: Listing,

        /// Project ID (required for trackers).
        #[arg(long)]
        project: Option<i64>,

        /// Tracker ID (required for items and fields).
        #[arg(long)]
        tracker: Option<i64>,

        /// Item ID (required for children).
        #[arg(long)]
        item: Option<i64>,

        /// Page number (1-indexed); 0 fetches every page.
        #[arg(long)]
        page: Option<u32>,

        /// Number of items per page (1-500).
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Search tracker items with a cbQL query.
    Query {
        /// The cbQL query, e.g. `tracker.id IN (1234)`.
        cbql: String,

        /// Page number (1-indexed); 0 fetches every page.
        #[arg(long)]
        page: Option<u32>,

        /// Number of items per page (1-500).
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Set one field of a tracker item.
    SetField {
        /// The tracker item ID.
        item: i64,

        /// Field ID or name.
        field: String,

        /// New value, coerced to the field's type.
        value: String,
    },
}

/// Entity types that can be fetched by ID.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    /// A codeBeamer project.
    Project,
    /// A tracker within a project.
    Tracker,
    /// A tracker item.
    Item,
    /// A user account.
    User,
}

/// Collections that can be listed.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listing {
    /// Every project visible to the user.
    #[value(alias = "project")]
    Projects,
    /// Trackers of a project (`--project`).
    #[value(alias = "tracker")]
    Trackers,
    /// Items of a tracker (`--tracker`).
    #[value(alias = "item")]
    Items,
    /// Children of an item (`--item`).
    #[value(alias = "child")]
    Children,
    /// Field definitions of a tracker (`--tracker`).
    #[value(alias = "field")]
    Fields,
    /// User accounts.
    #[value(alias = "user")]
    Users,
}
