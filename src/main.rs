use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info};

use taxcompare::{
    app::{handle_key, App},
    comps::{ComparableSource, DemoSource},
    config::{Args, Config},
    logging, ui,
};

const TICK: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_file_logging(&args.log_file, &args.log_level)?;
    let config = Config::from(&args);
    info!(?config, "starting");

    let runtime = tokio::runtime::Runtime::new()?;
    let source: Arc<dyn ComparableSource> = Arc::new(DemoSource::new(config.search_latency));
    let app = App::new(&config, runtime.handle().clone(), source);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(?err, "exited with error");
        println!("{:?}", err)
    }
    info!("shutting down");
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| ui::ui(f, &mut app))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if handle_key(&mut app, key)? {
                return Ok(());
            }
        }
    }
}
