//! dues-engine command line
//!
//! Runs one fee operation against the configured PostgreSQL database and
//! prints the result as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use dues_engine::adapters::postgres::{
    self, PostgresCatalog, PostgresFeeReader, PostgresRuleReader, PostgresUnitOfWork,
};
use dues_engine::adapters::SystemClock;
use dues_engine::application::{
    CalculationLayers, CompareFeeHandler, CompareFeeQuery, FeePipeline, GenerateFeesCommand,
    GenerateFeesHandler, PreviewRecalculationHandler, PreviewRecalculationQuery, PreviewTarget,
    RecalculateFeeCommand, RecalculateFeeHandler, RegenerateFeesCommand, RegenerateFeesHandler,
};
use dues_engine::config::AppConfig;
use dues_engine::domain::foundation::{CategoryId, CommandMetadata, FeeId, MemberId};
use dues_engine::logging::init_tracing;
use dues_engine::ports::{Clock, FeeReader, FeeScope, UnitOfWork};

#[derive(Parser)]
#[command(name = "dues-engine")]
#[command(about = "Monthly membership fee generation and recalculation")]
#[command(version)]
struct Cli {
    /// Actor recorded in fee history (defaults to engine.default_actor)
    #[arg(long, global = true)]
    actor: Option<String>,

    /// Free-text reason recorded in fee history
    #[arg(long, global = true)]
    reason: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate fees for every active member without one in the period
    Generate(PeriodArgs),

    /// Show what recalculating the period's fees would change
    Preview(PeriodArgs),

    /// Delete and rebuild the period's fees (refused if any is paid)
    Regenerate(PeriodArgs),

    /// Recalculate a single fee
    Recalculate {
        fee_id: Uuid,

        /// Leave discount rules out of the recalculation
        #[arg(long)]
        no_discounts: bool,
    },

    /// Compare a stored fee with a fresh calculation
    Compare { fee_id: Uuid },
}

#[derive(Args)]
struct PeriodArgs {
    year: i32,
    month: u32,

    /// Restrict to members of these categories
    #[arg(long = "category")]
    categories: Vec<Uuid>,

    /// Restrict to these members
    #[arg(long = "member")]
    members: Vec<Uuid>,

    /// Skip automatic discount rules
    #[arg(long)]
    no_discounts: bool,
}

impl PeriodArgs {
    fn scope(&self) -> FeeScope {
        FeeScope {
            category_ids: self.categories.iter().copied().map(CategoryId::from_uuid).collect(),
            member_ids: self.members.iter().copied().map(MemberId::from_uuid).collect(),
        }
    }
}

/// Adapters and handlers over one pool.
struct Engine {
    pipeline: Arc<FeePipeline>,
    fees: Arc<dyn FeeReader>,
    unit_of_work: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    generator: Arc<GenerateFeesHandler>,
}

impl Engine {
    fn new(pool: PgPool, config: &AppConfig) -> Self {
        let catalog = Arc::new(PostgresCatalog::new(pool.clone()));
        let rules = Arc::new(PostgresRuleReader::new(pool.clone()));
        let fees: Arc<dyn FeeReader> = Arc::new(PostgresFeeReader::new(pool.clone()));
        let unit_of_work: Arc<dyn UnitOfWork> = Arc::new(PostgresUnitOfWork::new(pool));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let pipeline = Arc::new(
            FeePipeline::new(
                catalog.clone(),
                catalog.clone(),
                catalog.clone(),
                catalog,
                clock.clone(),
            )
            .with_adjustments(rules.clone())
            .with_exemptions(rules.clone())
            .with_discount_rules(rules)
            .with_base_amount_key_prefix(config.engine.base_amount_key_prefix.clone()),
        );

        let generator = Arc::new(
            GenerateFeesHandler::new(pipeline.clone(), unit_of_work.clone())
                .with_concurrency(config.engine.generation_concurrency),
        );

        Self {
            pipeline,
            fees,
            unit_of_work,
            clock,
            generator,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    init_tracing(&config.logging).context("Failed to initialize tracing")?;

    let pool = postgres::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Migrations complete");
    }

    let engine = Engine::new(pool, &config);

    let mut metadata = CommandMetadata::new(
        cli.actor.unwrap_or_else(|| config.engine.default_actor.clone()),
    )
    .with_source("cli");
    if let Some(reason) = cli.reason {
        metadata = metadata.with_reason(reason);
    }

    match cli.command {
        Commands::Generate(args) => {
            let cmd = GenerateFeesCommand {
                year: args.year,
                month: args.month,
                scope: args.scope(),
                apply_discount_rules: config.engine.apply_discount_rules_on_generate
                    && !args.no_discounts,
            };
            let result = engine.generator.handle(cmd, metadata).await?;
            print_json(&result)
        }
        Commands::Preview(args) => {
            let handler = PreviewRecalculationHandler::new(engine.pipeline, engine.fees);
            let query = PreviewRecalculationQuery {
                target: PreviewTarget::Period {
                    year: args.year,
                    month: args.month,
                    scope: args.scope(),
                },
                layers: CalculationLayers::ALL.with_discounts(
                    config.engine.apply_discount_rules_on_recalculate && !args.no_discounts,
                ),
            };
            print_json(&handler.handle(query).await?)
        }
        Commands::Regenerate(args) => {
            let handler = RegenerateFeesHandler::new(
                engine.generator,
                engine.fees,
                engine.unit_of_work,
                engine.clock,
            );
            let cmd = RegenerateFeesCommand {
                year: args.year,
                month: args.month,
                scope: args.scope(),
                apply_discount_rules: config.engine.apply_discount_rules_on_generate
                    && !args.no_discounts,
            };
            print_json(&handler.handle(cmd, metadata).await?)
        }
        Commands::Recalculate {
            fee_id,
            no_discounts,
        } => {
            let handler =
                RecalculateFeeHandler::new(engine.pipeline, engine.fees, engine.unit_of_work);
            let cmd = RecalculateFeeCommand {
                fee_id: FeeId::from_uuid(fee_id),
                layers: CalculationLayers::ALL.with_discounts(
                    config.engine.apply_discount_rules_on_recalculate && !no_discounts,
                ),
            };
            print_json(&handler.handle(cmd, metadata).await?)
        }
        Commands::Compare { fee_id } => {
            let handler = CompareFeeHandler::new(engine.pipeline, engine.fees);
            let query = CompareFeeQuery {
                fee_id: FeeId::from_uuid(fee_id),
            };
            print_json(&handler.handle(query).await?)
        }
    }
}
