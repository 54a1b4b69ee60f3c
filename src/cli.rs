use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::branch_spec::parse_branches;
use crate::conf::ConfReader;
use crate::container::BranchContainer;
use crate::display::{ProjectedScene, ProjectionView};
use crate::event_file::EventFile;
use crate::geometry::DetectorGeometry;
use crate::primitives::Primitive;
use crate::registry::BranchElement;
use crate::session::{LoadError, LoadReport, Session};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one event and print its content
    Show {
        /// Detector card listing the tree branches
        #[arg(long)]
        card: PathBuf,

        /// JSON event file
        #[arg(long)]
        input: PathBuf,

        /// Zero-based event index
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        event: i64,

        /// Print the containers and projected views as JSON
        #[arg(long)]
        json: bool,
    },
    /// Step through events with commands read from stdin (n, p, g N, q)
    Browse {
        /// Detector card listing the tree branches
        #[arg(long)]
        card: PathBuf,

        /// JSON event file
        #[arg(long)]
        input: PathBuf,
    },
}

type FileSession = Session<EventFile, ProjectedScene>;

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Show {
            card,
            input,
            event,
            json,
        } => show(&card, &input, event, json),
        Commands::Browse { card, input } => browse(&card, &input),
    }
}

fn open_session(card: &Path, input: &Path) -> Result<FileSession> {
    let conf = ConfReader::read_file(card)?;
    let source = EventFile::open(input)?;
    let geometry = DetectorGeometry::from_conf(&conf);
    log::info!(
        "Tracker radius {} cm, half-length {} cm, Bz {} T",
        geometry.tracker_radius,
        geometry.tracker_half_length,
        geometry.bz
    );
    let display = ProjectedScene::new(geometry.calo_radius());
    Ok(Session::new(parse_branches(&conf), &geometry, source, display))
}

#[derive(Serialize)]
struct EventDump<'a> {
    report: &'a LoadReport,
    branches: &'a [BranchElement],
    display: &'a ProjectedScene,
}

fn show(card: &Path, input: &Path, event: i64, json: bool) -> Result<()> {
    let mut session = open_session(card, input)?;
    let report = session
        .load_event(event)
        .with_context(|| format!("Cannot show event {}", event))?;

    if json {
        let dump = EventDump {
            report: &report,
            branches: session.registry().branches(),
            display: session.display(),
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
    } else {
        print_event(&session, &report, true);
    }
    Ok(())
}

fn browse(card: &Path, input: &Path) -> Result<()> {
    let mut session = open_session(card, input)?;
    println!("{} events. Commands: n(ext), p(revious), g(oto) N, q(uit)", session.event_count());

    let first = session.next_event();
    print_outcome(&session, first);

    for line in std::io::stdin().lock().lines() {
        let result = match parse_command(&line?) {
            BrowseCommand::Blank => continue,
            BrowseCommand::Quit => break,
            BrowseCommand::Next => session.next_event(),
            BrowseCommand::Previous => session.previous_event(),
            BrowseCommand::Goto(index) => session.load_event(index).map(Some),
            BrowseCommand::Invalid(message) => {
                println!("{}", message);
                continue;
            }
        };

        print_outcome(&session, result);
    }
    Ok(())
}

/// One line of `browse` input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseCommand {
    Blank,
    Next,
    Previous,
    Goto(i64),
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> BrowseCommand {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) => BrowseCommand::Blank,
        (Some("q"), _) => BrowseCommand::Quit,
        (Some("n"), _) => BrowseCommand::Next,
        (Some("p"), _) => BrowseCommand::Previous,
        (Some("g"), Some(n)) => match n.parse() {
            Ok(index) => BrowseCommand::Goto(index),
            Err(_) => BrowseCommand::Invalid(format!("Not an event number: {}", n)),
        },
        (Some("g"), None) => BrowseCommand::Invalid("Usage: g N".to_string()),
        (Some(other), _) => BrowseCommand::Invalid(format!("Unknown command: {}", other)),
    }
}

/// Load errors are reported and browsing goes on.
fn print_outcome(session: &FileSession, result: Result<Option<LoadReport>, LoadError>) {
    match result {
        Ok(Some(report)) => print_event(session, &report, false),
        Ok(None) => println!("No more events in that direction"),
        Err(e) => println!("Error: {}", e),
    }
}

fn print_event(session: &FileSession, report: &LoadReport, items: bool) {
    println!("Event {} of {}", report.index + 1, session.event_count());
    for branch in session.registry().branches() {
        println!(
            "  {:<16} {:<12} {:>5}{}",
            branch.name(),
            branch.class().as_str(),
            branch.container.len(),
            if branch.container.is_visible() { "" } else { "  (hidden)" }
        );
        if items {
            print_items(branch);
        }
    }
    if let Some(primary) = &report.primary {
        println!("  primary tracks: {}", primary);
    }
    let scene = session.display();
    for view in ProjectionView::ALL {
        println!("  {} view: {} shapes", view.name(), scene.view(view).shapes.len());
    }
    if let Some(lego) = &scene.lego {
        println!("  lego ({}): {} bins, {:.2} GeV", lego.branch, lego.bins.len(), lego.total());
    }
}

fn print_items(branch: &BranchElement) {
    match &branch.container {
        BranchContainer::Tracks(list) => {
            for track in &list.tracks {
                let title = track.title.replace('\n', " ");
                println!("      {}: {} ({} points)", track.name, title, track.path.len());
            }
        }
        BranchContainer::Calo(grid) => {
            for tower in &grid.towers {
                println!(
                    "      eta [{:.3}, {:.3}] phi [{:.3}, {:.3}]: EM {:.2} HAD {:.2}",
                    tower.eta_min, tower.eta_max, tower.phi_min, tower.phi_max, tower.slices[0], tower.slices[1]
                );
            }
        }
        BranchContainer::Elements(list) => {
            for element in &list.elements {
                let detail = match element {
                    Primitive::Cone(cone) => format!("axis at {:.1?}", cone.axis_point()),
                    Primitive::Arrow(arrow) => format!("tip at {:.1?}", arrow.tip()),
                };
                println!("      {}: {}", element.title().replace('\n', ""), detail);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_navigation_commands() {
        assert_eq!(parse_command("n"), BrowseCommand::Next);
        assert_eq!(parse_command("  p  "), BrowseCommand::Previous);
        assert_eq!(parse_command("q"), BrowseCommand::Quit);
        assert_eq!(parse_command(""), BrowseCommand::Blank);
        assert_eq!(parse_command("   \t"), BrowseCommand::Blank);
    }

    #[test]
    fn test_parse_goto() {
        assert_eq!(parse_command("g 12"), BrowseCommand::Goto(12));
        assert_eq!(parse_command("g -1"), BrowseCommand::Goto(-1));
        assert_eq!(
            parse_command("g twelve"),
            BrowseCommand::Invalid("Not an event number: twelve".to_string())
        );
        assert_eq!(parse_command("g"), BrowseCommand::Invalid("Usage: g N".to_string()));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse_command("next"),
            BrowseCommand::Invalid("Unknown command: next".to_string())
        );
    }
}
