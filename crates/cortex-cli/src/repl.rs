//! Interactive operator REPL.
//!
//! Slash-commands against the running agent: inspect the blackboard,
//! pause/resume the scheduler, inject a voice reading, halt.  The REPL runs
//! on the main thread while the runtime ticks on its own workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use cortex_senses::ChannelFeed;
use cortex_state::Blackboard;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Handles the REPL needs from the assembled application.
pub struct ReplContext {
    pub blackboard: Arc<Blackboard>,
    pub paused: Arc<AtomicBool>,
    pub shutdown: Arc<AtomicBool>,
    pub voice_feed: Option<ChannelFeed>,
}

/// Run the REPL until `/quit`, Ctrl-D, or an external shutdown.
pub fn run(ctx: ReplContext) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to start line editor: {e}");
            ctx.shutdown.store(true, Ordering::Release);
            return;
        }
    };

    loop {
        if ctx.shutdown.load(Ordering::Acquire) {
            break;
        }
        match editor.readline("cortex> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if !handle_command(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                ctx.shutdown.store(true, Ordering::Release);
                break;
            }
            Err(e) => {
                eprintln!("Readline error: {e}");
                break;
            }
        }
    }
}

/// Execute one command line.  Returns `false` when the REPL should exit.
fn handle_command(ctx: &ReplContext, line: &str) -> bool {
    let (command, rest) = match line.split_once(' ') {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match command {
        "/help" => {
            println!("  {}    show the blackboard snapshot", "/status".bold());
            println!("  {}     pause the scheduler", "/pause".bold());
            println!("  {}    resume the scheduler", "/resume".bold());
            println!("  {} <text>  inject a voice reading", "/say".bold());
            println!("  {}      halt and exit", "/quit".bold());
        }
        "/status" => match serde_json::to_string_pretty(&ctx.blackboard.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("{}: {e}", "snapshot error".red()),
        },
        "/pause" => {
            ctx.paused.store(true, Ordering::Release);
            println!("{}", "Scheduler paused.".yellow());
        }
        "/resume" => {
            ctx.paused.store(false, Ordering::Release);
            println!("{}", "Scheduler resumed.".green());
        }
        "/say" => {
            if rest.is_empty() {
                println!("Usage: /say <text>");
            } else {
                match &ctx.voice_feed {
                    Some(feed) if feed.push(rest) => {
                        println!("{} {rest}", "heard:".dimmed());
                    }
                    Some(_) => println!("{}", "Voice source is gone.".red()),
                    None => println!("{}", "No channel-backed voice source configured.".red()),
                }
            }
        }
        "/quit" => {
            ctx.shutdown.store(true, Ordering::Release);
            println!("{}", "Halting.".yellow());
            return false;
        }
        other => {
            println!("Unknown command {other}; try {}", "/help".bold());
        }
    }
    true
}
