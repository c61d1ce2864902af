use clap::{Parser, Subcommand};
use crate::cli::error::{parse_lead_value, user_error, validate_non_empty, validate_pipeline_name};
use crate::cli::output::{
    board_columns, format_board, format_lead_table, format_pipeline_list, format_stage_table,
    get_terminal_width, is_tty,
};
use crate::config::Config;
use crate::db::DbConnection;
use crate::engine::PipelineBoard;
use crate::models::{Direction, LeadId, Priority, StageId};
use crate::repo::{LeadRepo, NewLead, PipelineRepo};
use crate::service::SqlitePipelineService;
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "salesline")]
#[command(about = "Sales pipeline ledger - ordered stages, leads and stage transitions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Pipeline to work on (defaults to pipeline.default from the rc file)
    #[arg(long, short = 'p', global = true)]
    pub pipeline: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline management commands
    Pipelines {
        #[command(subcommand)]
        subcommand: PipelineCommands,
    },
    /// Stage management commands
    Stages {
        #[command(subcommand)]
        subcommand: StageCommands,
    },
    /// Lead management commands
    Leads {
        #[command(subcommand)]
        subcommand: LeadCommands,
    },
    /// Move a lead to another stage
    Move {
        /// Lead ID
        lead: LeadId,
        /// Target stage ID
        stage: StageId,
    },
    /// Show the pipeline board: stages in order with their leads
    Board {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PipelineCommands {
    /// List pipelines
    List,
    /// Create a pipeline
    Add {
        /// Pipeline name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// List stages in order
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Add a stage after the last one
    Add {
        /// Stage name
        name: String,
        /// Display color
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename a stage
    Rename {
        /// Stage ID
        id: StageId,
        /// New stage name
        name: String,
    },
    /// Delete an empty stage
    Delete {
        /// Stage ID
        id: StageId,
    },
    /// Move a stage one position up or down
    Move {
        /// Stage ID
        id: StageId,
        /// Direction to move
        #[arg(value_enum)]
        direction: Direction,
    },
}

#[derive(Subcommand)]
pub enum LeadCommands {
    /// List leads
    List {
        /// Only leads in this stage
        #[arg(long)]
        stage: Option<StageId>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Add a lead to a stage
    Add {
        /// Lead name
        name: String,
        /// Stage ID the lead starts in
        #[arg(long)]
        stage: StageId,
        /// Deal value (e.g. 50000 or 50,000.00)
        #[arg(long, default_value = "0")]
        value: String,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    log::debug!("Using database {}", config.data_location.display());

    let conn = DbConnection::connect_at(&config.data_location)
        .context("Failed to connect to database")?;
    let service = SqlitePipelineService::new(conn);

    let pipeline_name = cli.pipeline.unwrap_or(config.default_pipeline);
    if let Err(e) = validate_pipeline_name(&pipeline_name) {
        user_error(&e);
    }

    match cli.command {
        Commands::Pipelines { subcommand } => handle_pipelines(&service, subcommand),
        Commands::Stages { subcommand } => handle_stages(open_board(service, &pipeline_name)?, subcommand),
        Commands::Leads { subcommand } => handle_leads(open_board(service, &pipeline_name)?, subcommand),
        Commands::Move { lead, stage } => handle_move(open_board(service, &pipeline_name)?, lead, stage),
        Commands::Board { json } => handle_board(open_board(service, &pipeline_name)?, json),
    }
}

fn open_board(service: SqlitePipelineService, pipeline_name: &str) -> Result<PipelineBoard<SqlitePipelineService>> {
    let pipeline_id = service.pipeline_id(pipeline_name)?;
    let board = PipelineBoard::open(service, pipeline_id)
        .with_context(|| format!("Failed to load pipeline '{}'", pipeline_name))?;
    Ok(board)
}

fn handle_pipelines(service: &SqlitePipelineService, cmd: PipelineCommands) -> Result<()> {
    let conn = service.connection();
    match cmd {
        PipelineCommands::List => {
            print!("{}", format_pipeline_list(&PipelineRepo::list(&conn)?));
        }
        PipelineCommands::Add { name } => {
            if let Err(e) = validate_pipeline_name(&name) {
                user_error(&e);
            }
            if PipelineRepo::get_by_name(&conn, &name)?.is_some() {
                user_error(&format!("Pipeline '{}' already exists", name));
            }
            let pipeline = PipelineRepo::create(&conn, &name)?;
            println!("Created pipeline {}: {}", pipeline.id.unwrap_or_default(), pipeline.name);
        }
    }
    Ok(())
}

fn handle_stages(board: PipelineBoard<SqlitePipelineService>, cmd: StageCommands) -> Result<()> {
    match cmd {
        StageCommands::List { json } => {
            let view = board.view();
            if json {
                println!("{}", serde_json::to_string_pretty(view.stages.ordered())?);
            } else {
                print!("{}", format_stage_table(&view, is_tty()));
            }
        }
        StageCommands::Add { name, color } => {
            if let Err(e) = validate_non_empty(&name, "Stage name") {
                user_error(&e);
            }
            let stage = board.add_stage(&name)?;
            println!("Created stage {}: {} (order {})", stage.id, stage.name, stage.order);
            if let Some(color) = color {
                // The stage exists either way; a failed color is only a warning
                if let Err(e) = board.service().set_stage_color(board.pipeline_id(), stage.id, Some(&color)) {
                    log::warn!("Could not set color of stage {}: {}", stage.id, e);
                    eprintln!("Warning: stage {} created without color: {}", stage.id, e);
                }
            }
        }
        StageCommands::Rename { id, name } => {
            let stage = board.rename_stage(id, &name)?;
            println!("Renamed stage {} to '{}'", stage.id, stage.name);
        }
        StageCommands::Delete { id } => {
            board.delete_stage(id)?;
            println!("Deleted stage {}", id);
        }
        StageCommands::Move { id, direction } => {
            let outcome = board.move_stage(id, direction)?;
            if outcome.changed {
                println!("Moved stage {} {}", id, direction.as_str());
            } else {
                println!("Stage {} is already at the {}", id, if direction == Direction::Up { "top" } else { "bottom" });
            }
        }
    }
    Ok(())
}

fn handle_leads(board: PipelineBoard<SqlitePipelineService>, cmd: LeadCommands) -> Result<()> {
    match cmd {
        LeadCommands::List { stage, json } => {
            let view = board.view();
            let leads: Vec<_> = match stage {
                Some(stage_id) => {
                    if view.stages.get(stage_id).is_none() {
                        user_error(&format!("Stage {} not found", stage_id));
                    }
                    view.leads.leads_in_stage(stage_id).into_iter().cloned().collect()
                }
                None => view.leads.all().to_vec(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&leads)?);
            } else {
                print!("{}", format_lead_table(&leads, view.stages.ordered(), is_tty()));
            }
        }
        LeadCommands::Add { name, stage, value, priority, company, email, phone } => {
            if let Err(e) = validate_non_empty(&name, "Lead name") {
                user_error(&e);
            }
            let value = match parse_lead_value(&value) {
                Ok(v) => v,
                Err(e) => user_error(&e),
            };
            if board.view().stages.get(stage).is_none() {
                user_error(&format!("Stage {} not found", stage));
            }
            let fields = NewLead { name, company, email, phone, value, priority };
            let conn = board.service().connection();
            let lead = LeadRepo::create(&conn, board.pipeline_id(), stage, &fields)?;
            println!("Created lead {}: {}", lead.id, lead.name);
        }
    }
    Ok(())
}

fn handle_move(board: PipelineBoard<SqlitePipelineService>, lead_id: LeadId, stage_id: StageId) -> Result<()> {
    let outcome = board.transition(lead_id, stage_id)?;
    let stage_name = board
        .ordered_stages()
        .into_iter()
        .find(|s| s.id == stage_id)
        .map(|s| s.name)
        .unwrap_or_else(|| stage_id.to_string());
    if outcome.changed {
        println!("Moved lead {} to {}", lead_id, stage_name);
    } else {
        println!("Lead {} is already in {}", lead_id, stage_name);
    }
    Ok(())
}

fn handle_board(board: PipelineBoard<SqlitePipelineService>, json: bool) -> Result<()> {
    let view = board.view();
    if json {
        println!("{}", serde_json::to_string_pretty(&board_columns(&view))?);
    } else {
        print!("{}", format_board(&view, get_terminal_width(), is_tty()));
    }
    Ok(())
}
