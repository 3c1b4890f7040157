use clap::{Parser, Subcommand};
use liferpg_core::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "liferpg")]
#[command(about = "Life RPG guided workout sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a guided workout session (default)
    Workout {
        /// Routine to run (base, swim-prep, calisthenics, abs)
        #[arg(long)]
        routine: Option<String>,

        /// Collapse every countdown to a second and tick fast
        #[arg(long)]
        fast_forward: bool,

        /// Auto-complete (for testing) - start every segment and accept the suggested reps
        #[arg(long)]
        auto_complete: bool,
    },

    /// Show the current target for an exercise
    Target {
        /// Exercise name, e.g. "Push-ups"
        exercise: String,
    },

    /// Show the last date the base routine was completed
    Last,

    /// List the available routines
    Routines,

    /// Roll up the rep WAL to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

struct DataPaths {
    wal_dir: PathBuf,
    wal_path: PathBuf,
    csv_path: PathBuf,
    daylog_path: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            wal_path: wal_dir.join("rep_history.wal"),
            csv_path: data_dir.join("rep_history.csv"),
            daylog_path: data_dir.join("daily_log.json"),
            wal_dir,
        }
    }
}

fn main() -> Result<()> {
    liferpg_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(&data_dir);

    match cli.command {
        Some(Commands::Workout {
            routine,
            fast_forward,
            auto_complete,
        }) => cmd_workout(&paths, config, routine, fast_forward, auto_complete),
        Some(Commands::Target { exercise }) => cmd_target(&paths, &config, &exercise),
        Some(Commands::Last) => cmd_last(&paths),
        Some(Commands::Routines) => cmd_routines(),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&paths, cleanup),
        None => cmd_workout(&paths, config, None, false, false),
    }
}

/// Where user commands come from
enum Input {
    /// Scripted: start everything, accept suggestions, finish
    Auto,
    /// Lines typed on stdin, read on a background thread
    Stdin(Receiver<String>),
}

impl Input {
    fn stdin() -> Self {
        let (tx, rx) = channel();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        Input::Stdin(rx)
    }

    /// Block for the next line; `None` once stdin is closed
    fn next_line(&self) -> Option<String> {
        match self {
            Input::Auto => Some(String::new()),
            Input::Stdin(rx) => rx.recv().ok(),
        }
    }
}

enum Control {
    Pause,
    Resume,
    Skip,
    MoreRest,
    Quit,
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_lowercase().as_str() {
        "p" => Some(Control::Pause),
        "r" => Some(Control::Resume),
        "s" | "" => Some(Control::Skip),
        "+" => Some(Control::MoreRest),
        "q" => Some(Control::Quit),
        _ => None,
    }
}

fn cmd_workout(
    paths: &DataPaths,
    mut config: Config,
    routine: Option<String>,
    fast_forward: bool,
    auto_complete: bool,
) -> Result<()> {
    config.session.fast_forward |= fast_forward;
    config.validate()?;

    std::fs::create_dir_all(&paths.wal_dir)?;

    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    let daily_log = DailyLog::load(&paths.daylog_path)?;
    match daily_log.last_workout_date() {
        Some(date) => println!("Last completed: {}", date),
        None => println!("Last completed: Never"),
    }

    let store = FileRepStore::new(&paths.wal_path, &paths.csv_path);
    let mut engine = WorkoutEngine::new(
        catalog,
        store,
        config.session.clone(),
        config.targets.clone(),
    );

    let input = if auto_complete {
        Input::Auto
    } else {
        Input::stdin()
    };

    let mut state = SessionState::new();

    // Selecting
    match routine {
        Some(name) => {
            if let Err(e) = engine.select_by_name(&mut state, &name) {
                eprintln!("{}", e);
                return Err(e);
            }
        }
        None if auto_complete => {
            engine.select(&mut state, RoutineSelection::Base)?;
        }
        None => {
            if !prompt_selection(&engine, &mut state, &input)? {
                return Ok(());
            }
        }
    }

    loop {
        match state.stage() {
            Stage::Selecting => {
                println!("\nSession ended.");
                break;
            }

            Stage::Previewing => {
                if let Some(preview) = engine.preview(&state) {
                    display_preview(&preview);
                }
                loop {
                    if !auto_complete {
                        prompt("Enter to start, 'q' to quit");
                    }
                    let Some(line) = input.next_line() else {
                        state.quit();
                        break;
                    };
                    match line.trim().to_lowercase().as_str() {
                        "" | "s" => {
                            state.start(engine.session_config());
                            break;
                        }
                        "q" => {
                            state.quit();
                            break;
                        }
                        other => println!("  Unknown command: {}", other),
                    }
                }
            }

            Stage::Counting(_) | Stage::Resting(_) => {
                run_countdown(&mut state, &engine, &input)?;
            }

            Stage::CollectingFeedback => {
                let suggested = engine.feedback_prefill(&state).unwrap_or(0);
                if !auto_complete {
                    prompt(&format!("Reps done? [{}] ('q' to quit)", suggested));
                }
                let Some(line) = input.next_line() else {
                    state.quit();
                    continue;
                };
                let trimmed = line.trim();
                if trimmed.eq_ignore_ascii_case("q") {
                    state.quit();
                    continue;
                }
                let reps = if trimmed.is_empty() {
                    suggested
                } else {
                    match parse_reps(trimmed) {
                        Ok(reps) => reps,
                        Err(e) => {
                            println!("  {}", e);
                            continue;
                        }
                    }
                };

                match engine.confirm_reps(&mut state, i64::from(reps), chrono::Utc::now())? {
                    FeedbackOutcome::Recorded => println!("  ✓ {} reps logged", reps),
                    FeedbackOutcome::NotDurable(msg) => {
                        println!("  ✓ {} reps counted for this session", reps);
                        eprintln!("  ⚠ Could not save to history: {}", msg);
                    }
                    FeedbackOutcome::Ignored => {}
                }
            }

            Stage::Summary => {
                if let Some(summary) = engine.summary(&state) {
                    display_summary(&summary);
                    fold_into_daily_log(paths, &summary);
                }
                if auto_complete {
                    state.finish();
                    continue;
                }
                prompt("Enter to finish, or a routine name to go again");
                match input.next_line() {
                    Some(line) if !line.trim().is_empty() => {
                        if let Err(e) = engine.select_by_name(&mut state, &line) {
                            println!("  {}", e);
                            state.finish();
                        }
                    }
                    _ => {
                        state.finish();
                    }
                }
            }
        }
    }

    Ok(())
}

/// Ask for a routine until a valid one is picked; `false` if the user leaves
fn prompt_selection<S: RepStore>(
    engine: &WorkoutEngine<'_, S>,
    state: &mut SessionState,
    input: &Input,
) -> Result<bool> {
    loop {
        println!("\nChoose a routine:");
        for selection in RoutineSelection::all() {
            println!("  {}", selection);
        }
        prompt("Routine name ('q' to quit)");

        let Some(line) = input.next_line() else {
            return Ok(false);
        };
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("q") {
            return Ok(false);
        }
        let name = if trimmed.is_empty() { "base" } else { trimmed };

        match engine.select_by_name(state, name) {
            Ok(_) => return Ok(true),
            Err(Error::InvalidSelection(name)) => println!("  Unknown routine: {}", name),
            Err(e) => return Err(e),
        }
    }
}

/// Drive a countdown stage: ticks on timeout, commands as they arrive
fn run_countdown<S: RepStore>(
    state: &mut SessionState,
    engine: &WorkoutEngine<'_, S>,
    input: &Input,
) -> Result<()> {
    let cadence = engine.session_config().tick_cadence();
    let resting = matches!(state.stage(), Stage::Resting(_));

    if resting {
        match engine.up_next(state) {
            Some(UpNext::Segment(next)) => println!(
                "\n  Rest. Up next: {} ({}/{})",
                next.exercise.name, next.position, next.total
            ),
            _ => println!("\n  Rest. Up next: finish!"),
        }
    }
    if matches!(input, Input::Stdin(_)) {
        println!(
            "  [Enter/s] {}  [p] pause  [r] resume{}  [q] quit",
            if resting { "skip rest" } else { "done" },
            if resting { "  [+] more rest" } else { "" }
        );
    }

    let mut clock = TickClock::start(cadence, Instant::now());
    let stage_name = state.stage().name();
    while state.stage().name() == stage_name {
        render_countdown(state, resting);

        let control = match input {
            Input::Auto => {
                std::thread::sleep(clock.wait(Instant::now()));
                None
            }
            Input::Stdin(rx) if state.timer_running() => {
                match rx.recv_timeout(clock.wait(Instant::now())) {
                    Ok(line) => parse_control(&line),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => Some(Control::Quit),
                }
            }
            Input::Stdin(rx) => match rx.recv() {
                Ok(line) => parse_control(&line),
                Err(_) => Some(Control::Quit),
            },
        };

        match control {
            Some(Control::Pause) => {
                state.pause();
            }
            Some(Control::Resume) => {
                if state.resume() {
                    clock.restart(Instant::now());
                }
            }
            Some(Control::Skip) => {
                state.skip();
            }
            Some(Control::MoreRest) => {
                state.add_rest(engine.session_config());
            }
            Some(Control::Quit) => state.quit(),
            None => {
                if state.timer_running() && clock.due(Instant::now()) {
                    *state = std::mem::take(state).tick(1);
                    clock.advance();
                }
            }
        }
    }
    println!();
    Ok(())
}

/// Deadline for the next tick; commands arriving in between don't move it
struct TickClock {
    cadence: Duration,
    next: Instant,
}

impl TickClock {
    fn start(cadence: Duration, now: Instant) -> Self {
        Self {
            cadence,
            next: now + cadence,
        }
    }

    /// How long to wait for input before the tick is due
    fn wait(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    fn due(&self, now: Instant) -> bool {
        now >= self.next
    }

    fn advance(&mut self) {
        self.next += self.cadence;
    }

    /// After a pause the first tick is a full cadence away
    fn restart(&mut self, now: Instant) {
        self.next = now + self.cadence;
    }
}

fn render_countdown(state: &SessionState, resting: bool) {
    let label = if resting {
        "Rest".to_string()
    } else {
        state
            .current_segment()
            .map(|s| s.exercise.clone())
            .unwrap_or_default()
    };
    let paused = if state.timer_running() { "" } else { " (paused)" };
    print!("\r  {:<20} {:>4}s{:<10}", label, state.remaining_seconds(), paused);
    let _ = io::stdout().flush();
}

fn fold_into_daily_log(paths: &DataPaths, summary: &SessionSummary) {
    let contribution = summary.day_contribution();
    let today = chrono::Local::now().date_naive();
    let result = DailyLog::update(&paths.daylog_path, |log| {
        log.record_session(today, &contribution, chrono::Utc::now());
        Ok(())
    });
    if let Err(e) = result {
        tracing::warn!("Failed to update daily log: {}", e);
        eprintln!("⚠ Could not update the daily log: {}", e);
    }
}

fn cmd_target(paths: &DataPaths, config: &Config, exercise: &str) -> Result<()> {
    let catalog = get_default_catalog();
    let store = FileRepStore::new(&paths.wal_path, &paths.csv_path);
    let info = catalog.lookup(exercise);
    let target = liferpg_core::history::target_reps(&store, exercise, &config.targets);

    println!("{}: {}", info.name, target);
    if !info.target_muscles.is_empty() {
        println!("  Muscles: {}", info.target_muscles);
    }
    Ok(())
}

fn cmd_last(paths: &DataPaths) -> Result<()> {
    let log = DailyLog::load(&paths.daylog_path)?;
    match log.last_workout_date() {
        Some(date) => println!("Last completed: {}", date),
        None => println!("Last completed: Never"),
    }
    Ok(())
}

fn cmd_routines() -> Result<()> {
    for selection in RoutineSelection::all() {
        let queue = liferpg_core::routine::build(selection)?;
        println!(
            "{:<14} {:>2} segments  ~{} min",
            selection.key(),
            queue.len(),
            queue.planned_seconds().div_ceil(60)
        );
    }
    Ok(())
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    if !paths.wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = liferpg_core::csv_rollup::wal_to_csv_and_archive(&paths.wal_path, &paths.csv_path)?;

    println!("✓ Rolled up {} rep records to CSV", count);
    println!("  CSV: {}", paths.csv_path.display());

    if cleanup {
        let cleaned = liferpg_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn prompt(text: &str) {
    print!("{} > ", text);
    let _ = io::stdout().flush();
}

fn display_preview(preview: &SegmentPreview) {
    println!("\n╭─────────────────────────────────────────╮");
    println!(
        "│  {}/{}  {}",
        preview.position, preview.total, preview.exercise.name
    );
    println!("╰─────────────────────────────────────────╯");
    println!("  Duration: {}s", preview.seconds);
    println!("  Target: {}", preview.target);
    if !preview.exercise.target_muscles.is_empty() {
        println!("  Muscles: {}", preview.exercise.target_muscles);
    }
    if !preview.exercise.form_tip.is_empty() {
        println!("  FORM CHECK: {}", preview.exercise.form_tip);
    }
    if let Some(ref url) = preview.exercise.demo_url {
        println!("  ℹ Demo: {}", url);
    }
}

fn display_summary(summary: &SessionSummary) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  Session complete: {}", summary.selection);
    println!("╰─────────────────────────────────────────╯");
    for result in &summary.results {
        println!(
            "  {:<20} {:>4} reps (target {}){}",
            result.exercise,
            result.session_reps,
            result.target,
            if result.personal_best {
                "  ★ personal best"
            } else {
                ""
            }
        );
    }
    if summary.bonus {
        println!("\n  ★ Bonus earned!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_do_not_push_back_the_tick() {
        let t0 = Instant::now();
        let clock = TickClock::start(Duration::from_millis(1000), t0);

        // A command read 600ms in leaves 400ms until the tick
        let after_command = t0 + Duration::from_millis(600);
        assert_eq!(clock.wait(after_command), Duration::from_millis(400));
        assert!(!clock.due(after_command));
        assert!(clock.due(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_ticks_keep_a_fixed_cadence() {
        let t0 = Instant::now();
        let mut clock = TickClock::start(Duration::from_millis(50), t0);

        // Serviced late; the next deadline still lines up with t0
        clock.advance();
        assert_eq!(clock.wait(t0 + Duration::from_millis(70)), Duration::from_millis(30));
        assert_eq!(clock.wait(t0 + Duration::from_millis(200)), Duration::ZERO);
    }

    #[test]
    fn test_restart_after_pause() {
        let t0 = Instant::now();
        let mut clock = TickClock::start(Duration::from_millis(1000), t0);

        let resumed = t0 + Duration::from_secs(30);
        assert!(clock.due(resumed));
        clock.restart(resumed);
        assert!(!clock.due(resumed));
        assert_eq!(clock.wait(resumed), Duration::from_millis(1000));
    }
}
