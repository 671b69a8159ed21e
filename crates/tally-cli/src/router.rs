//! Command routing logic for CLI

use crate::args::{Cli, Commands, MappingAction, StoreAction, ThreadAction};
use crate::commands;
use crate::context::AppContext;
use tally_core::config::TallyConfig;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: TallyConfig) -> anyhow::Result<()> {
    let verbose = cli.verbose;
    match cli.command {
        // Commands that never touch the store
        Commands::Config => commands::config::show(&config),
        Commands::Mapping { action } => route_mapping(&config, action, verbose),

        Commands::Gate {
            query,
            thread,
            files,
            json,
        } => {
            let ctx = AppContext::connect(config).await?;
            commands::gate::evaluate(&ctx, &query, thread.as_deref(), &files, json).await
        }
        Commands::Thread { action } => {
            let ctx = AppContext::connect(config).await?;
            match action {
                ThreadAction::Show { thread_id } => commands::thread::show(&ctx, &thread_id).await,
                ThreadAction::Reset { thread_id } => {
                    commands::thread::reset(&ctx, &thread_id).await
                }
                ThreadAction::CarryForward { from, to } => {
                    commands::thread::carry_forward(&ctx, &from, &to).await
                }
            }
        }
        Commands::Store {
            action: StoreAction::Ping,
        } => {
            let ctx = AppContext::connect(config).await?;
            commands::store::ping(&ctx).await
        }
    }
}

fn route_mapping(config: &TallyConfig, action: MappingAction, verbose: bool) -> anyhow::Result<()> {
    match action {
        MappingAction::Summary => commands::mapping::summary(config, verbose),
        MappingAction::Lookup { files } => commands::mapping::lookup(config, &files),
        MappingAction::Assess { topics, segments } => {
            commands::mapping::assess(config, &topics, &segments)
        }
    }
}
