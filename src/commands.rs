use crate::app::AppContext;
use crate::config::Config;
use crate::expr;
use crate::stats::{self, Ledger};
use crate::storage;
use crate::store::DirStore;
use crate::ui;
use crate::widgets::WidgetRegistry;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn tui(config: Config, store: DirStore) -> Result<()> {
    let mut ctx = AppContext::new(Box::new(store), config);
    ctx.init();
    ui::run(ctx)
}

pub fn export(mut store: DirStore, file: &Path) -> Result<()> {
    storage::migrate_legacy_keys(&mut store).context("migrating legacy keys")?;
    let bundle = storage::export_all(&store).context("reading stored documents")?;
    let encoded = serde_json::to_string_pretty(&bundle)?;
    fs::write(file, encoded).with_context(|| format!("writing {}", file.display()))?;
    println!("Exported to {}", file.display());
    Ok(())
}

pub fn import(mut store: DirStore, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let bundle: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    storage::import_all(&mut store, &bundle).context("importing backup")?;
    info!(file = %file.display(), "import complete");
    println!("Imported {}", file.display());
    Ok(())
}

pub fn stats(mut store: DirStore, json: bool) -> Result<()> {
    let doc = stats::read(&store);
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }
    let ledger = Ledger::new(&mut store);
    let now = ledger.get_today_stats();
    let goals = ledger.get_goals_progress();
    println!("Visits: {}", doc.sessions.total);
    println!(
        "Today: {} tasks, {} pomodoro sessions, {} bookmark clicks",
        now.tasks, now.pomodoro, now.bookmarks
    );
    println!(
        "Goals: pomodoro {}/{} ({:.0}%), tasks {}/{} ({:.0}%)",
        goals.pomodoro.current,
        goals.pomodoro.goal,
        goals.pomodoro.percentage,
        goals.tasks.current,
        goals.tasks.goal,
        goals.tasks.percentage
    );
    println!(
        "All time: {} tasks completed, {} focus sessions",
        doc.widget_count("tasks", "completed"),
        doc.widget_count("pomodoro", "sessions")
    );
    println!("Last 7 days:");
    for day in ledger.get_last_7_days_activity() {
        println!("  {} {}  {}", day.day, day.date, day.total);
    }
    let week: Vec<String> = ledger
        .get_week_stats()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(widget, count)| format!("{} {}", widget, count))
        .collect();
    if !week.is_empty() {
        println!("This week: {}", week.join(", "));
    }
    let top = ledger.get_top_bookmarks(5);
    if !top.is_empty() {
        println!("Top bookmarks:");
        for (rank, bookmark) in top.iter().enumerate() {
            println!(
                "  {}. {} ({}) - {} clicks",
                rank + 1,
                bookmark.name,
                bookmark.url,
                bookmark.clicks
            );
        }
    }
    Ok(())
}

pub fn widgets(store: DirStore) -> Result<()> {
    let registry = WidgetRegistry::with_builtins();
    let layout = storage::load_layout(&store);
    for widget in registry.all_as_map().into_values() {
        let placed = layout.iter().find(|n| n.id == widget.id());
        let marker = if placed.is_some() { "*" } else { " " };
        let size = placed
            .map(|n| (n.w, n.h))
            .unwrap_or_else(|| (widget.default_size().w, widget.default_size().h));
        println!(
            "{} {:<15} {:>2}x{:<2} {}",
            marker,
            widget.id(),
            size.0,
            size.1,
            widget.description()
        );
    }
    Ok(())
}

pub fn calc(expression: &str) -> Result<()> {
    let result = expr::evaluate(expression).with_context(|| format!("evaluating {:?}", expression))?;
    println!("{}", result);
    Ok(())
}

pub fn migrate(mut store: DirStore) -> Result<()> {
    if storage::migrate_legacy_keys(&mut store).context("migrating legacy keys")? {
        println!("Migrated legacy data in {}", store.dir().display());
    } else {
        println!("Nothing to migrate");
    }
    Ok(())
}

pub fn reset(mut store: DirStore, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to erase everything without --yes");
    }
    storage::reset(&mut store).context("resetting storage")?;
    println!("Reset {}", store.dir().display());
    Ok(())
}

pub fn goals(mut store: DirStore, tasks: Option<u64>, pomodoro: Option<u64>) -> Result<()> {
    if tasks.is_none() && pomodoro.is_none() {
        let goals = stats::read(&store).goals;
        println!("Goals: {} pomodoro sessions, {} tasks", goals.pomodoro, goals.tasks);
        return Ok(());
    }
    let goals = Ledger::new(&mut store)
        .set_goals(pomodoro, tasks)
        .context("saving goals")?;
    println!("Goals: {} pomodoro sessions, {} tasks", goals.pomodoro, goals.tasks);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use crate::store::{KeyValueStore, DATA_KEY};

    fn store(dir: &Path) -> DirStore {
        DirStore::open(dir).unwrap()
    }

    #[test]
    fn export_then_import_restores_data() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup.json");
        let mut data = storage::load(&mut store(dir.path()));
        data.add_task("carry over", Priority::Urgent).unwrap();
        storage::save(&mut store(dir.path()), &data).unwrap();

        export(store(dir.path()), &backup).unwrap();
        storage::reset(&mut store(dir.path())).unwrap();
        assert!(!store(dir.path()).contains(DATA_KEY).unwrap());

        import(store(dir.path()), &backup).unwrap();
        let restored = storage::load(&mut store(dir.path()));
        assert_eq!(restored.tasks.len(), 1);
        assert_eq!(restored.tasks[0].title, "carry over");
    }

    #[test]
    fn import_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("junk.json");
        fs::write(&file, "not json").unwrap();
        assert!(import(store(dir.path()), &file).is_err());
        assert!(import(store(dir.path()), &dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn reset_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let data = storage::load(&mut store(dir.path()));
        storage::save(&mut store(dir.path()), &data).unwrap();
        assert!(reset(store(dir.path()), false).is_err());
        assert!(store(dir.path()).contains(DATA_KEY).unwrap());
        reset(store(dir.path()), true).unwrap();
        assert!(!store(dir.path()).contains(DATA_KEY).unwrap());
    }

    #[test]
    fn goals_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        goals(store(dir.path()), Some(7), None).unwrap();
        let stored = stats::read(&store(dir.path())).goals;
        assert_eq!((stored.pomodoro, stored.tasks), (5, 7));
    }

    #[test]
    fn calc_reports_errors() {
        assert!(calc("2 + 3 * 4").is_ok());
        assert!(calc("8 / 0").is_err());
    }
}
