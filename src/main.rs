use std::{
    error::Error,
    io::{self, BufRead},
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    thread::{self, JoinHandle},
};

use alarm_cond::{
    communication::{Console, Message, MessageType},
    config::Config,
    parser::parse_request,
    Engine,
};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// use this config file instead of the one in the user config dir
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write a default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// show how a command line would be parsed, without running anything
    Parse { line: String },
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("alarm_cond").expect("couldn't initialize logger");

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    match args.command {
        Some(Command::Init { force }) => {
            if force || !config_path.exists() {
                Config::new().save(&config_path)?;
                println!("wrote default config to {}", config_path.display());
            } else {
                println!(
                    "{} already exists, use --force to overwrite it",
                    config_path.display()
                );
            }
            return Ok(());
        }
        Some(Command::Parse { line }) => {
            match parse_request(&line) {
                Some(request) => println!("{request}"),
                None => println!("Bad command"),
            }
            return Ok(());
        }
        None => {}
    }

    let config = Config::load_or_default(&config_path)?;
    let (tx, rx) = mpsc::channel();
    let printer = spawn_printer(rx, config.clone())?;
    let engine = Engine::start(tx.clone())?;

    let mut lines = io::stdin().lock().lines();
    loop {
        // the printer owns stdout, so the prompt goes through it too
        if tx.send(Message::new(MessageType::Prompt)).is_err() {
            break;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        match parse_request(&line) {
            Some(request) => {
                // rejections are reported through the outbox
                let _ = engine.submit(request);
            }
            None => {
                warn!("bad command {line:?}");
                if tx.send(Message::new(MessageType::BadCommand)).is_err() {
                    break;
                }
            }
        }
    }

    engine.shutdown()?;
    drop(tx);
    if printer.join().is_err() {
        error!("console printer panicked");
    }
    // end the prompt line left open at end of input
    println!();
    info!("bye");
    Ok(())
}

/// Writes every engine message and the prompt to stdout. A fatal message is
/// written and flushed, then ends the process.
fn spawn_printer(rx: Receiver<Message>, config: Config) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let time_format = config.time_format.clone();
            let mut console = Console::new(io::stdout(), config);
            for message in rx {
                let written = console.show(&message);
                if message.kind.is_fatal() {
                    error!("{}", message.render(&time_format));
                    std::process::exit(1);
                }
                if written.is_err() {
                    warn!("stdout closed, console printer stopping");
                    break;
                }
            }
        })
}
