//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `goaltree_core` linkage with deterministic output.
//! - Optionally open a goal database and print its statistics summary.
//!
//! Usage: `goaltree_cli [DB_PATH] [LOG_DIR]`

use goaltree_core::{
    init_logging, open_db, GoalMapRepository, GoalService, SortKey, SqliteKeyValueStore,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("goaltree_core ping={}", goaltree_core::ping());
    println!("goaltree_core version={}", goaltree_core::core_version());

    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    if let Some(log_dir) = args.next() {
        if let Err(err) = init_logging(goaltree_core::default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let Some(db_path) = db_path else {
        return ExitCode::SUCCESS;
    };
    match summarize(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_summary module=cli status=error error={}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn summarize(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let kv = SqliteKeyValueStore::try_new(&conn)?;
    let service = GoalService::open(GoalMapRepository::new(kv))?;

    if let Some(backup) = service.quarantined_key() {
        println!("unreadable goals moved to key={backup}");
    }
    let stats = service.statistics();
    println!(
        "goals total={} completed={} overdue={} completion_rate={}",
        stats.total_goals, stats.completed_goals, stats.overdue_goals, stats.completion_rate
    );
    for root in service.root_goals(SortKey::Order) {
        println!(
            "root id={} progress={:.0} name={}",
            root.id,
            service.progress(&root.id),
            root.name
        );
    }
    Ok(())
}
