use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::pipeline::{RunOptions, RunPlan, RunSummary};

pub fn print_plan(plan: &RunPlan, options: &RunOptions, dry_run: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    write_plan(&mut stdout, plan, options, dry_run)
}

pub fn print_summary(summary: &RunSummary, options: &RunOptions) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    write_summary(&mut stdout, summary, options)
}

pub fn write_plan<W: WriteColor>(
    out: &mut W,
    run: &RunPlan,
    options: &RunOptions,
    dry_run: bool,
) -> io::Result<()> {
    let plan = &run.chunk_plan;
    write_heading(
        out,
        &format!(
            "Chunk {} of {}{}",
            plan.chunk.index,
            plan.chunk.num_chunks,
            if dry_run { " (dry run)" } else { "" }
        ),
    )?;
    writeln!(out, "  reviews loaded:   {}", run.reviews_loaded)?;
    writeln!(out, "  total listings:   {}", plan.total_listings)?;
    writeln!(out, "  chunk size:       {}", plan.chunk_size)?;
    writeln!(
        out,
        "  positions:        [{}, {})",
        plan.range.start, plan.range.end
    )?;
    writeln!(out, "  selected:         {}", plan.selected())?;
    writeln!(out, "  already done:     {}", plan.already_done)?;
    if plan.deferred > 0 {
        writeln!(out, "  deferred (limit): {}", plan.deferred)?;
    }
    write_count(out, "  to process:       ", plan.pending.len(), Color::Cyan)?;
    writeln!(out, "  output:           {}", options.output.display())?;
    Ok(())
}

pub fn write_summary<W: WriteColor>(
    out: &mut W,
    summary: &RunSummary,
    options: &RunOptions,
) -> io::Result<()> {
    write_heading(out, "Run complete")?;
    writeln!(out, "  listings rated:   {}", summary.scored)?;
    write_count(out, "  complete:         ", summary.complete, Color::Green)?;

    let degraded = summary.degraded_total();
    let color = if degraded == 0 { Color::Green } else { Color::Yellow };
    write_count(out, "  with nulls:       ", degraded, color)?;
    for (kind, count) in &summary.degraded {
        writeln!(out, "    {:<16}{}", kind, count)?;
    }

    writeln!(
        out,
        "  rows appended:    {} -> {}",
        summary.rows_written,
        options.output.display()
    )?;
    if let Some(failure_log) = &options.failure_log {
        writeln!(
            out,
            "  failures logged:  {} -> {}",
            summary.failures_logged,
            failure_log.display()
        )?;
    }
    Ok(())
}

fn write_heading<W: WriteColor>(out: &mut W, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "{}", text)?;
    out.reset()
}

fn write_count<W: WriteColor>(out: &mut W, label: &str, count: usize, color: Color) -> io::Result<()> {
    write!(out, "{}", label)?;
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", count)?;
    out.reset()?;
    writeln!(out)
}
