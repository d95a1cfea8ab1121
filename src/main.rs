// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use soundscape::clock::{Clock, SystemClock};
use soundscape::director::Director;
use soundscape::engine::simulated::SimulatedSource;
use soundscape::engine::SoundSource;
use soundscape::listener::LoggingListener;
use soundscape::scene::{builtin, Scene};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A procedural ambient soundscape director."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the built-in scenes.
    Scenes {},
    /// Loads and verifies a scene file.
    Verify {
        /// The path to the scene YAML file.
        path: String,
    },
    /// Runs a scene in real time against the simulated engine.
    Run {
        /// A built-in scene name or the path to a scene YAML file.
        scene: String,
        /// Overrides the scene's duration, e.g. 30s.
        #[arg[short, long]]
        duration: Option<String>,
        /// Seeds the random generator so a run can be repeated.
        #[arg[short, long]]
        seed: Option<u64>,
        /// Don't log individual voice starts.
        #[arg[short, long]]
        quiet: bool,
    },
}

/// Resolves a built-in scene name or a scene file.
fn load_scene(scene: &str) -> Result<Scene, Box<dyn Error>> {
    match builtin::get(scene)? {
        Some(scene) => Ok(scene),
        None => Ok(soundscape::config::load_scene(&PathBuf::from(scene))?),
    }
}

fn print_scene(scene: &Scene) {
    println!("{}", scene);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scenes {} => {
            println!("Built-in scenes (count: {}):", builtin::NAMES.len());
            for scene in builtin::all()? {
                print_scene(&scene);
            }
        }
        Commands::Verify { path } => {
            let scene = soundscape::config::load_scene(&PathBuf::from(&path))?;
            println!("{} is valid.", path);
            print_scene(&scene);
        }
        Commands::Run {
            scene,
            duration,
            seed,
            quiet,
        } => {
            let scene = load_scene(&scene)?;
            let duration: Duration = match duration {
                Some(duration) => DurationString::from_string(duration)?.into(),
                None => scene.duration(),
            };
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };

            let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
            let sources: Vec<Arc<dyn SoundSource>> = scene
                .sources()
                .iter()
                .map(|spec| {
                    let source = SimulatedSource::from_spec(spec, Arc::clone(&clock));
                    if !quiet {
                        source.add_listener(Arc::new(LoggingListener::new(spec.name())));
                    }
                    Arc::new(source) as Arc<dyn SoundSource>
                })
                .collect();

            let director = Director::new(&scene, sources, rng, clock)?;
            let stop = director.stop_handle();
            let weights = scene.weights().clone();
            let mut run = tokio::task::spawn_blocking(move || director.run(duration, &weights));

            let report = tokio::select! {
                result = &mut run => result??,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received interrupt, stopping soundscape");
                    stop.stop();
                    run.await??
                }
            };
            println!("{}", report);
        }
    }

    Ok(())
}
