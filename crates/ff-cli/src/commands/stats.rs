//! Stats command for showing the active and paused tasks.

use std::io::Write;

use anyhow::Result;
use ff_core::{LiveTask, Snapshot, Task, summarize_site_time};

use super::util::{format_duration, format_timestamp};

pub fn run<W: Write>(writer: &mut W, snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(snapshot)?)?;
        return Ok(());
    }

    match &snapshot.active_task {
        Some(live) => write_active(writer, live)?,
        None => writeln!(writer, "No active task.")?,
    }

    if snapshot.paused_tasks.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "Paused ({}):", snapshot.paused_tasks.len())?;
    for task in &snapshot.paused_tasks {
        write_paused(writer, task)?;
    }

    Ok(())
}

fn write_active<W: Write>(writer: &mut W, live: &LiveTask) -> Result<()> {
    let task = live.task();
    writeln!(writer, "Active: {}", task.task_name)?;
    writeln!(writer, "  Started:      {}", format_timestamp(task.start_timestamp))?;
    writeln!(writer, "  Active time:  {}", format_duration(task.total_active_time))?;
    writeln!(
        writer,
        "  Focus:        {} ({})",
        live.focus_score(),
        live.focus_level()
    )?;
    writeln!(writer, "  Tab switches: {}", task.tab_switches)?;
    writeln!(writer, "  Pauses:       {}", task.pause_count())?;
    if !live.current_url().is_empty() {
        writeln!(writer, "  Current URL:  {}", live.current_url())?;
    }

    let sites = summarize_site_time(&task.site_time);
    if sites.is_empty() {
        return Ok(());
    }
    let mut sites: Vec<_> = sites.into_iter().collect();
    sites.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    writeln!(writer, "  Sites:")?;
    for (host, ms) in sites {
        writeln!(writer, "    {host:<24} {}", format_duration(ms))?;
    }
    Ok(())
}

fn write_paused<W: Write>(writer: &mut W, task: &Task) -> Result<()> {
    let since = task
        .pause_intervals
        .last()
        .map_or_else(String::new, |pause| {
            format!(", paused {}", format_timestamp(pause.paused_at))
        });
    writeln!(
        writer,
        "  - {} ({}{since})",
        task.task_name,
        format_duration(task.total_active_time)
    )?;
    Ok(())
}
